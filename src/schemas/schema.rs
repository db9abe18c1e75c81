use once_cell::sync::OnceCell;
use schemars::schema::RootSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::types::ItineraryResult;

/// Cached JSON schema handle associated with a response type.
#[derive(Clone, Debug)]
pub struct SchemaHandle {
    schema_name: &'static str,
    schema_json: Arc<Value>,
}

impl SchemaHandle {
    pub fn from_root_schema(schema_name: &'static str, root: RootSchema) -> Self {
        let schema_json = serde_json::to_value(root)
            .unwrap_or_else(|err| panic!("failed to serialize schema for {}: {}", schema_name, err));

        Self {
            schema_name,
            schema_json: Arc::new(schema_json),
        }
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    pub fn schema_json(&self) -> &Value {
        self.schema_json.as_ref()
    }
}

/// A type a completion response can be decoded into.
pub trait CompletionSchema: DeserializeOwned + Send + Sync + 'static {
    fn schema() -> &'static SchemaHandle;
}

impl CompletionSchema for ItineraryResult {
    fn schema() -> &'static SchemaHandle {
        static HANDLE: OnceCell<SchemaHandle> = OnceCell::new();
        HANDLE.get_or_init(|| {
            let mut root = schemars::schema_for!(ItineraryResult);
            let metadata = root.schema.metadata();
            if metadata.description.is_none() {
                metadata.description =
                    Some("Day-by-day travel itinerary generated for a trip request".to_string());
            }
            SchemaHandle::from_root_schema("ItineraryResult", root)
        })
    }
}
