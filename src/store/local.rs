use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{RecordFilter, RecordStore, StoredRecord, TABLES};
use crate::error::{PlannerError, Result};

type Tables = BTreeMap<String, Vec<StoredRecord>>;

/// Record store kept in memory and, when opened from a path, mirrored to a JSON file
/// after every write.
#[derive(Debug, Default)]
pub struct LocalStore {
    tables: RwLock<Tables>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store, loading existing records when the file exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Tables::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Tables::new(),
            Err(err) => return Err(err.into()),
        };

        debug!(
            target: "tripai::store",
            path = %path.display(),
            tables = tables.len(),
            "opened local store"
        );

        Ok(Self {
            tables: RwLock::new(tables),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, tables: &Tables) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = serde_json::to_string_pretty(tables)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn check_table(table: &str) -> Result<()> {
    if TABLES.contains(&table) {
        Ok(())
    } else {
        Err(PlannerError::Storage(format!("unknown table `{}`", table)))
    }
}

fn not_found(table: &str, id: &str) -> PlannerError {
    PlannerError::RecordNotFound {
        table: table.to_string(),
        id: id.to_string(),
    }
}

fn find_mut<'a>(tables: &'a mut Tables, table: &str, id: &str) -> Option<&'a mut StoredRecord> {
    tables
        .get_mut(table)
        .and_then(|records| records.iter_mut().find(|record| record.id == id))
}

fn into_object(data: Value) -> Result<serde_json::Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(PlannerError::Storage(format!(
            "record data must be a JSON object, got `{}`",
            other
        ))),
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    async fn get_records(&self, table: &str, filter: &RecordFilter) -> Result<Vec<StoredRecord>> {
        check_table(table)?;
        let tables = self.tables.read().await;

        Ok(tables
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_record(&self, table: &str, id: &str) -> Result<Option<StoredRecord>> {
        check_table(table)?;
        let tables = self.tables.read().await;

        Ok(tables
            .get(table)
            .and_then(|records| records.iter().find(|record| record.id == id))
            .cloned())
    }

    async fn create_record(&self, table: &str, data: Value) -> Result<StoredRecord> {
        check_table(table)?;
        let mut data = into_object(data)?;

        let id = data
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        data.insert("id".to_string(), Value::String(id.clone()));

        let record = StoredRecord {
            id,
            data_json: Value::Object(data),
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut tables = self.tables.write().await;
        let records = tables.entry(table.to_string()).or_default();
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(PlannerError::Storage(format!(
                "record `{}` already exists in `{}`",
                record.id, table
            )));
        }
        records.push(record.clone());
        if let Err(err) = self.persist(&tables).await {
            if let Some(records) = tables.get_mut(table) {
                records.pop();
            }
            return Err(err);
        }

        debug!(target: "tripai::store", table, id = %record.id, "record created");
        Ok(record)
    }

    async fn update_record(&self, table: &str, id: &str, data: Value) -> Result<StoredRecord> {
        check_table(table)?;
        let updates = into_object(data)?;

        let mut tables = self.tables.write().await;
        let record = find_mut(&mut tables, table, id).ok_or_else(|| not_found(table, id))?;
        let previous = record.clone();

        if let Value::Object(existing) = &mut record.data_json {
            existing.extend(updates);
            existing.insert("id".to_string(), Value::String(id.to_string()));
        } else {
            let mut merged = updates;
            merged.insert("id".to_string(), Value::String(id.to_string()));
            record.data_json = Value::Object(merged);
        }
        record.updated_at = Some(Utc::now());

        let updated = record.clone();
        if let Err(err) = self.persist(&tables).await {
            if let Some(record) = find_mut(&mut tables, table, id) {
                *record = previous;
            }
            return Err(err);
        }

        debug!(target: "tripai::store", table, id, "record updated");
        Ok(updated)
    }

    async fn delete_record(&self, table: &str, id: &str) -> Result<()> {
        check_table(table)?;

        let mut tables = self.tables.write().await;
        let records = tables.get_mut(table).ok_or_else(|| not_found(table, id))?;
        let position = records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| not_found(table, id))?;
        let removed = records.remove(position);
        if let Err(err) = self.persist(&tables).await {
            if let Some(records) = tables.get_mut(table) {
                records.insert(position, removed);
            }
            return Err(err);
        }

        debug!(target: "tripai::store", table, id, "record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EXPENSES_TABLE, TRIPS_TABLE};
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_id_and_keeps_provided_one() {
        let store = LocalStore::in_memory();

        let generated = store
            .create_record(TRIPS_TABLE, json!({ "user_id": "u1", "destination": "Rome" }))
            .await
            .unwrap();
        assert!(Uuid::parse_str(&generated.id).is_ok());
        assert_eq!(generated.data_json["id"], generated.id.as_str());

        let provided = store
            .create_record(TRIPS_TABLE, json!({ "id": "trip-7", "user_id": "u2" }))
            .await
            .unwrap();
        assert_eq!(provided.id, "trip-7");

        let duplicate = store
            .create_record(TRIPS_TABLE, json!({ "id": "trip-7" }))
            .await;
        assert!(matches!(duplicate, Err(PlannerError::Storage(_))));
    }

    #[tokio::test]
    async fn filters_and_insertion_order() {
        let store = LocalStore::in_memory();
        for (trip, amount) in [("t1", 10), ("t2", 20), ("t1", 30)] {
            store
                .create_record(EXPENSES_TABLE, json!({ "trip_id": trip, "amount": amount }))
                .await
                .unwrap();
        }

        let t1 = store
            .get_records(EXPENSES_TABLE, &RecordFilter::TripId("t1".to_string()))
            .await
            .unwrap();
        let amounts: Vec<i64> = t1
            .iter()
            .filter_map(|record| record.data_json["amount"].as_i64())
            .collect();
        assert_eq!(amounts, vec![10, 30]);

        let all = store
            .get_records(EXPENSES_TABLE, &RecordFilter::All)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn update_merges_and_delete_removes() {
        let store = LocalStore::in_memory();
        let record = store
            .create_record(
                TRIPS_TABLE,
                json!({ "destination": "Rome", "status": "planned" }),
            )
            .await
            .unwrap();

        let updated = store
            .update_record(TRIPS_TABLE, &record.id, json!({ "status": "ongoing", "id": "other" }))
            .await
            .unwrap();
        assert_eq!(updated.data_json["destination"], "Rome");
        assert_eq!(updated.data_json["status"], "ongoing");
        assert_eq!(updated.data_json["id"], record.id.as_str());
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.created_at, record.created_at);

        store.delete_record(TRIPS_TABLE, &record.id).await.unwrap();
        assert!(store
            .get_record(TRIPS_TABLE, &record.id)
            .await
            .unwrap()
            .is_none());

        let missing = store.delete_record(TRIPS_TABLE, &record.id).await;
        assert!(matches!(missing, Err(PlannerError::RecordNotFound { .. })));

        let missing = store
            .update_record(TRIPS_TABLE, "nope", json!({ "status": "completed" }))
            .await;
        assert!(matches!(missing, Err(PlannerError::RecordNotFound { .. })));
    }

    #[tokio::test]
    async fn rejects_unknown_tables_and_non_objects() {
        let store = LocalStore::in_memory();

        let unknown = store.get_records("users", &RecordFilter::All).await;
        assert!(matches!(unknown, Err(PlannerError::Storage(_))));

        let scalar = store.create_record(TRIPS_TABLE, json!(42)).await;
        assert!(matches!(scalar, Err(PlannerError::Storage(_))));
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = LocalStore::open(&path).await.unwrap();
        let created = store
            .create_record(TRIPS_TABLE, json!({ "destination": "Kyoto" }))
            .await
            .unwrap();
        assert_eq!(store.path(), Some(path.as_path()));

        let reopened = LocalStore::open(&path).await.unwrap();
        let found = reopened
            .get_record(TRIPS_TABLE, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn failed_create_leaves_no_record_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("store.json");

        let store = LocalStore::open(&path).await.unwrap();
        let created = store
            .create_record(TRIPS_TABLE, json!({ "id": "t1", "destination": "Oslo" }))
            .await;
        assert!(matches!(created, Err(PlannerError::Io(_))));

        assert!(store.get_record(TRIPS_TABLE, "t1").await.unwrap().is_none());
        assert!(store
            .get_records(TRIPS_TABLE, &RecordFilter::All)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn failed_update_and_delete_keep_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        std::fs::create_dir(&nested).unwrap();
        let path = nested.join("store.json");

        let store = LocalStore::open(&path).await.unwrap();
        let created = store
            .create_record(TRIPS_TABLE, json!({ "id": "t1", "status": "planned" }))
            .await
            .unwrap();

        std::fs::remove_dir_all(&nested).unwrap();

        let updated = store
            .update_record(TRIPS_TABLE, "t1", json!({ "status": "completed" }))
            .await;
        assert!(updated.is_err());
        let current = store.get_record(TRIPS_TABLE, "t1").await.unwrap().unwrap();
        assert_eq!(current, created);

        assert!(store.delete_record(TRIPS_TABLE, "t1").await.is_err());
        assert!(store.get_record(TRIPS_TABLE, "t1").await.unwrap().is_some());
    }

    #[test]
    fn in_memory_store_starts_empty() {
        let store = LocalStore::in_memory();
        let records = tokio_test::block_on(store.get_records(TRIPS_TABLE, &RecordFilter::All))
            .unwrap();
        assert!(records.is_empty());
        assert!(store.path().is_none());
    }
}
