//! Class batch grouping.
//!
//! Partitions a flat list of application-file descriptors into per-class
//! batches so the fetcher can issue one query per class. Classes keep the
//! order in which they were first observed; descriptors keep input order
//! within their class.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One application file to synchronize: record identifier plus owning class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub record_id: String,
    pub class_name: String,
    /// The raw listing record this descriptor was built from.
    pub raw: Value,
}

impl FileDescriptor {
    pub fn new(record_id: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            class_name: class_name.into(),
            raw: Value::Null,
        }
    }
}

/// Per-class batches in first-seen class order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassBatches {
    order: Vec<String>,
    batches: HashMap<String, Vec<FileDescriptor>>,
}

impl ClassBatches {
    /// Iterate batches in first-seen class order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FileDescriptor])> {
        self.order
            .iter()
            .map(|class| (class.as_str(), self.batches[class].as_slice()))
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn get(&self, class_name: &str) -> Option<&[FileDescriptor]> {
        self.batches.get(class_name).map(Vec::as_slice)
    }

    /// Number of distinct classes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total number of descriptors across all batches.
    pub fn descriptor_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }
}

/// Groups descriptors by owning class.
pub struct ClassBatchGrouper;

impl ClassBatchGrouper {
    /// Single pass, O(n); never drops or duplicates a descriptor.
    pub fn group<I>(descriptors: I) -> ClassBatches
    where
        I: IntoIterator<Item = FileDescriptor>,
    {
        let mut batches = ClassBatches::default();
        for descriptor in descriptors {
            let class = descriptor.class_name.clone();
            match batches.batches.get_mut(&class) {
                Some(batch) => batch.push(descriptor),
                None => {
                    batches.order.push(class.clone());
                    batches.batches.insert(class, vec![descriptor]);
                }
            }
        }
        batches
    }
}
