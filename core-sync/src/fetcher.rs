//! Remote record fetching, one class batch at a time.
//!
//! Builds the filtered query for a class batch and streams matching records
//! from the instance page by page. The identifier predicate is distributed
//! over every alternative segment of the class's registered query: each
//! disjunct is conjoined with the id filter independently and the results
//! re-joined as a disjunction, so the id filter narrows the base query but
//! never replaces it.
//!
//! Batches are pre-sized upstream; this component assumes one batch's
//! identifiers always fit a safe query length and does not re-chunk.

use std::sync::Arc;

use bridge_traits::instance::{DisplayValue, InstanceClient, PageHandler, TableRequest};
use tracing::{debug, instrument};

use crate::batch::FileDescriptor;
use crate::collaborators::{Entity, EntityRequestParam};
use crate::error::{Result, SyncError};

/// Separator between alternative (disjunct) segments in an encoded query.
const NEW_QUERY_SEPARATOR: &str = "^NQ";

/// Default number of records per page.
const DEFAULT_PAGE_SIZE: u32 = 100;

/// Streams one class batch's records from the remote instance.
pub struct RemoteRecordFetcher {
    instance: Arc<dyn InstanceClient>,
    page_size: u32,
}

impl RemoteRecordFetcher {
    pub fn new(instance: Arc<dyn InstanceClient>) -> Self {
        Self {
            instance,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Build the encoded query for a batch: the `sys_id` membership
    /// predicate, distributed over the entity's disjunct segments if any.
    pub fn build_query(descriptors: &[FileDescriptor], entity: Option<&Entity>) -> String {
        let ids: Vec<&str> = descriptors.iter().map(|d| d.record_id.as_str()).collect();
        let id_predicate = format!("sys_idIN{}", ids.join(","));

        match entity {
            Some(entity) if !entity.query_segments.is_empty() => entity
                .query_segments
                .iter()
                .map(|segment| format!("{segment}^{id_predicate}"))
                .collect::<Vec<_>>()
                .join(NEW_QUERY_SEPARATOR),
            _ => id_predicate,
        }
    }

    /// Fetch all records of one class batch, delivering pages to `handler`
    /// as they arrive.
    ///
    /// # Errors
    ///
    /// A transport or authorization failure aborts the fetch and surfaces as
    /// `RemoteFetchFailed` naming the class. Pages already delivered to the
    /// handler are not rolled back.
    #[instrument(skip(self, descriptors, param, entity, handler), fields(class_name = %class_name, batch_size = descriptors.len()))]
    pub async fn fetch(
        &self,
        class_name: &str,
        descriptors: &[FileDescriptor],
        param: &EntityRequestParam,
        entity: Option<&Entity>,
        handler: &mut dyn PageHandler,
    ) -> Result<()> {
        let query = Self::build_query(descriptors, entity);
        let table = if param.class_name.is_empty() {
            class_name
        } else {
            param.class_name.as_str()
        };
        debug!(table, %query, "fetching class batch");

        // Display values are always requested at the richest level so
        // reference fields carry both machine value and display text.
        let request = TableRequest::new(table)
            .query(query)
            .fields(param.field_names.clone())
            .display_value(DisplayValue::All)
            .page_size(self.page_size);

        self.instance
            .get_files_from_table(request, handler)
            .await
            .map_err(|source| SyncError::RemoteFetchFailed {
                class_name: class_name.to_string(),
                source,
            })
    }
}
