//! Record materialization: provenance resolution plus persistence.
//!
//! Receives raw record pages from the fetcher, resolves display-name
//! fallbacks for the scope/application/author reference fields, attaches
//! provenance metadata under a reserved key and hands each record to the
//! project store, accumulating the files it reports written.
//!
//! Records are processed strictly in arrival order: later records in the
//! same export can be corrections to earlier content under the platform's
//! update semantics.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::instance::PageHandler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::collaborators::ProjectStore;
use crate::error::SyncError;

/// Reserved key the provenance block is attached under. Double underscore
/// keeps it out of the platform's field namespace.
pub const PROVENANCE_KEY: &str = "__provenance";

/// Fallback used when a provenance field cannot be resolved at all.
const UNKNOWN: &str = "unknown";

/// Traceability metadata attached to each materialized record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub host_name: String,
    pub class_name: String,
    pub app_name: String,
    pub scope_name: String,
    pub updated_by: String,
}

/// Resolve a reference field through the display-name fallback chain:
/// explicit `display_value`, then explicit `value`, then the raw field
/// value, then `default`.
pub fn display_or_value(record: &Value, field: &str, default: &str) -> String {
    match record.get(field) {
        Some(Value::Object(reference)) => reference
            .get("display_value")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                reference
                    .get("value")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or(default)
            .to_string(),
        Some(Value::String(raw)) if !raw.is_empty() => raw.clone(),
        _ => default.to_string(),
    }
}

/// The machine value of a field, ignoring display text: explicit `value`
/// for reference objects, the string itself otherwise.
pub fn machine_value(record: &Value, field: &str) -> Option<String> {
    match record.get(field) {
        Some(Value::Object(reference)) => reference
            .get("value")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Some(Value::String(raw)) if !raw.is_empty() => Some(raw.clone()),
        _ => None,
    }
}

/// Materializes one class's records through the project store.
///
/// Implements [`PageHandler`] so the fetcher can deliver pages directly;
/// the typed error of a failed save is kept on the handler because the page
/// delivery contract only carries bridge errors.
pub struct RecordMaterializer {
    project: Arc<dyn ProjectStore>,
    class_name: String,
    host_name: String,
    default_app_name: String,
    default_scope_name: String,
    written: Vec<PathBuf>,
    records_materialized: u64,
    error: Option<SyncError>,
}

impl RecordMaterializer {
    pub fn new(
        project: Arc<dyn ProjectStore>,
        class_name: impl Into<String>,
        host_name: impl Into<String>,
        default_app_name: impl Into<String>,
        default_scope_name: impl Into<String>,
    ) -> Self {
        Self {
            project,
            class_name: class_name.into(),
            host_name: host_name.into(),
            default_app_name: default_app_name.into(),
            default_scope_name: default_scope_name.into(),
            written: Vec::new(),
            records_materialized: 0,
            error: None,
        }
    }

    /// Provenance for one raw record, resolved through the fallback chain.
    fn resolve_provenance(&self, record: &Value) -> Provenance {
        Provenance {
            host_name: self.host_name.clone(),
            class_name: self.class_name.clone(),
            app_name: display_or_value(record, "sys_app", &self.default_app_name),
            scope_name: display_or_value(record, "sys_scope", &self.default_scope_name),
            updated_by: display_or_value(record, "sys_updated_by", UNKNOWN),
        }
    }

    /// Files written so far, in materialization order.
    pub fn take_written(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.written)
    }

    pub fn records_materialized(&self) -> u64 {
        self.records_materialized
    }

    /// The typed error behind an aborted page delivery, if any.
    pub fn take_error(&mut self) -> Option<SyncError> {
        self.error.take()
    }
}

#[async_trait]
impl PageHandler for RecordMaterializer {
    async fn handle_page(&mut self, records: Vec<Value>) -> BridgeResult<()> {
        for mut record in records {
            let record_id =
                machine_value(&record, "sys_id").unwrap_or_else(|| UNKNOWN.to_string());
            let provenance = self.resolve_provenance(&record);

            match record.as_object_mut() {
                Some(fields) => {
                    let block = serde_json::json!({
                        "host_name": provenance.host_name,
                        "class_name": provenance.class_name,
                        "app_name": provenance.app_name,
                        "scope_name": provenance.scope_name,
                        "updated_by": provenance.updated_by,
                    });
                    fields.insert(PROVENANCE_KEY.to_string(), block);
                }
                None => {
                    warn!(class = %self.class_name, %record_id, "skipping non-object record");
                    continue;
                }
            }

            match self.project.save(&record).await {
                Ok(paths) => {
                    debug!(class = %self.class_name, %record_id, files = paths.len(), "record materialized");
                    self.records_materialized += 1;
                    self.written.extend(paths);
                }
                Err(source) => {
                    // Remaining records of this class are not processed;
                    // already-written files stay on disk.
                    let message = format!(
                        "save failed for {}/{record_id}: {source}",
                        self.class_name
                    );
                    self.error = Some(SyncError::MaterializeFailed {
                        class_name: self.class_name.clone(),
                        record_id,
                        source,
                    });
                    return Err(BridgeError::OperationFailed(message));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct RecordingStore {
        saved: Mutex<Vec<Value>>,
        fail_on: Option<String>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(record_id: &str) -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
                fail_on: Some(record_id.to_string()),
            }
        }
    }

    #[async_trait]
    impl ProjectStore for RecordingStore {
        fn code_directory(&self) -> PathBuf {
            PathBuf::from("/tmp/project")
        }

        async fn get_entity_request_param(
            &self,
            _class_name: &str,
        ) -> BridgeResult<crate::collaborators::EntityRequestParam> {
            Ok(Default::default())
        }

        async fn get_entity(
            &self,
            _class_name: &str,
        ) -> BridgeResult<Option<crate::collaborators::Entity>> {
            Ok(None)
        }

        async fn save(&self, record: &Value) -> BridgeResult<Vec<PathBuf>> {
            let id = machine_value(record, "sys_id").unwrap_or_default();
            if self.fail_on.as_deref() == Some(id.as_str()) {
                return Err(BridgeError::OperationFailed("disk full".to_string()));
            }
            self.saved.lock().unwrap().push(record.clone());
            Ok(vec![PathBuf::from(format!("src/{id}.js"))])
        }
    }

    fn materializer(store: Arc<RecordingStore>) -> RecordMaterializer {
        RecordMaterializer::new(
            store,
            "sys_script",
            "dev.example.com",
            "widgets",
            "x_acme_widgets",
        )
    }

    #[test]
    fn test_fallback_prefers_display_value() {
        let record = json!({
            "sys_scope": { "display_value": "Widgets App", "value": "a1b2" }
        });
        assert_eq!(
            display_or_value(&record, "sys_scope", "default"),
            "Widgets App"
        );
    }

    #[test]
    fn test_fallback_uses_value_when_display_missing() {
        let record = json!({ "sys_scope": { "value": "a1b2" } });
        assert_eq!(display_or_value(&record, "sys_scope", "default"), "a1b2");
    }

    #[test]
    fn test_fallback_uses_raw_string() {
        let record = json!({ "sys_updated_by": "admin" });
        assert_eq!(
            display_or_value(&record, "sys_updated_by", "default"),
            "admin"
        );
    }

    #[test]
    fn test_fallback_uses_default_when_absent() {
        let record = json!({});
        assert_eq!(display_or_value(&record, "sys_scope", "default"), "default");
    }

    #[test]
    fn test_machine_value_ignores_display_text() {
        let record = json!({
            "sys_id": { "display_value": "Pretty Name", "value": "abc123" }
        });
        assert_eq!(machine_value(&record, "sys_id").as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_provenance_attached_and_saved_in_order() {
        let store = Arc::new(RecordingStore::new());
        let mut materializer = materializer(store.clone());

        materializer
            .handle_page(vec![
                json!({ "sys_id": "a", "sys_updated_by": "alice" }),
                json!({ "sys_id": "b", "sys_updated_by": "bob" }),
            ])
            .await
            .unwrap();

        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0][PROVENANCE_KEY]["updated_by"], "alice");
        assert_eq!(saved[0][PROVENANCE_KEY]["class_name"], "sys_script");
        assert_eq!(saved[0][PROVENANCE_KEY]["host_name"], "dev.example.com");
        assert_eq!(saved[1][PROVENANCE_KEY]["updated_by"], "bob");

        drop(saved);
        let written = materializer.take_written();
        assert_eq!(
            written,
            vec![PathBuf::from("src/a.js"), PathBuf::from("src/b.js")]
        );
        assert_eq!(materializer.records_materialized(), 2);
    }

    #[tokio::test]
    async fn test_save_failure_halts_remaining_records() {
        let store = Arc::new(RecordingStore::failing_on("b"));
        let mut materializer = materializer(store.clone());

        let result = materializer
            .handle_page(vec![
                json!({ "sys_id": "a" }),
                json!({ "sys_id": "b" }),
                json!({ "sys_id": "c" }),
            ])
            .await;

        assert!(result.is_err());
        // First record stays materialized; third was never attempted.
        assert_eq!(store.saved.lock().unwrap().len(), 1);

        match materializer.take_error() {
            Some(SyncError::MaterializeFailed {
                class_name,
                record_id,
                ..
            }) => {
                assert_eq!(class_name, "sys_script");
                assert_eq!(record_id, "b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
