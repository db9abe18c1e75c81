//! Record storage keyed by table and id.
//!
//! Every operation exchanges [`StoredRecord`] envelopes whose `data_json` holds the
//! record itself; typed views are produced with [`crate::types::Stored`].

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub use local::LocalStore;

pub const TRIPS_TABLE: &str = "trips";
pub const ITINERARIES_TABLE: &str = "itineraries";
pub const BUDGET_CATEGORIES_TABLE: &str = "budget_categories";
pub const EXPENSES_TABLE: &str = "expenses";

pub const TABLES: [&str; 4] = [
    TRIPS_TABLE,
    ITINERARIES_TABLE,
    BUDGET_CATEGORIES_TABLE,
    EXPENSES_TABLE,
];

/// Envelope returned by every store operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub data_json: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Narrowing applied by [`RecordStore::get_records`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    All,
    UserId(String),
    TripId(String),
}

impl RecordFilter {
    pub fn matches(&self, record: &StoredRecord) -> bool {
        let (field, expected) = match self {
            RecordFilter::All => return true,
            RecordFilter::UserId(id) => ("user_id", id),
            RecordFilter::TripId(id) => ("trip_id", id),
        };

        record
            .data_json
            .get(field)
            .and_then(Value::as_str)
            .map(|value| value == expected)
            .unwrap_or(false)
    }
}

/// Anything that can fetch, create, update and delete records by table and id.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Records of `table` matching `filter`, in insertion order
    async fn get_records(&self, table: &str, filter: &RecordFilter) -> Result<Vec<StoredRecord>>;

    async fn get_record(&self, table: &str, id: &str) -> Result<Option<StoredRecord>>;

    /// Insert `data` (a JSON object). Uses `data.id` when present, otherwise assigns a UUID.
    async fn create_record(&self, table: &str, data: Value) -> Result<StoredRecord>;

    /// Shallow-merge the keys of `data` over the existing record
    async fn update_record(&self, table: &str, id: &str, data: Value) -> Result<StoredRecord>;

    async fn delete_record(&self, table: &str, id: &str) -> Result<()>;
}
