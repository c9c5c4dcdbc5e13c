//! Remote Instance Abstraction
//!
//! Contract for reading versioned records from the remote
//! configuration-management platform's table API.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Display-value resolution level requested from the table API.
///
/// `All` returns reference fields as `{display_value, value}` objects so
/// callers get both the machine value and the human-readable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayValue {
    All,
    True,
    False,
}

impl DisplayValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayValue::All => "all",
            DisplayValue::True => "true",
            DisplayValue::False => "false",
        }
    }
}

/// A single table read, possibly spanning multiple pages.
#[derive(Debug, Clone)]
pub struct TableRequest {
    /// Table (class) to read from.
    pub table: String,

    /// Encoded query string, if any. `None` reads the whole table.
    pub query: Option<String>,

    /// Fields to return. Empty means all fields.
    pub fields: Vec<String>,

    /// Display-value resolution level for reference fields.
    pub display_value: DisplayValue,

    /// Page size. The implementation pages through the table in chunks of
    /// this many records.
    pub page_size: u32,
}

impl TableRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            query: None,
            fields: Vec::new(),
            display_value: DisplayValue::All,
            page_size: 100,
        }
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn display_value(mut self, level: DisplayValue) -> Self {
        self.display_value = level;
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }
}

/// Receives record pages as they arrive from the instance.
///
/// Pages are delivered strictly in fetch order; a handler error aborts the
/// remaining pages of the request. Pages already handled are not rolled back.
#[async_trait]
pub trait PageHandler: Send {
    async fn handle_page(&mut self, records: Vec<Value>) -> Result<()>;
}

/// Async remote-instance client trait
///
/// Streams matching records page by page, so arbitrarily large tables never
/// have to be buffered in memory.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::instance::{InstanceClient, TableRequest};
///
/// async fn list_scripts(client: &dyn InstanceClient, handler: &mut dyn PageHandler) -> Result<()> {
///     let request = TableRequest::new("sys_script").query("active=true");
///     client.get_files_from_table(request, handler).await
/// }
/// ```
#[async_trait]
pub trait InstanceClient: Send + Sync {
    /// Read records from a table, delivering each page to `handler` as it
    /// arrives. Completes once the instance reports no further pages.
    async fn get_files_from_table(
        &self,
        request: TableRequest,
        handler: &mut dyn PageHandler,
    ) -> Result<()>;

    /// Host name of the instance (used in commit messages and provenance).
    fn get_host_name(&self) -> String;
}
