use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

use super::itinerary::{AccommodationPreference, DailyPlan, TransportationPreference};
use crate::{
    error::{PlannerError, Result},
    store::StoredRecord,
};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Lifecycle of a trip record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Planned,
    Ongoing,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Planned => "planned",
            TripStatus::Ongoing => "ongoing",
            TripStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TripStatus {
    type Err = PlannerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(Self::Planned),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            other => Err(PlannerError::Validation(format!(
                "unknown trip status `{}`",
                other
            ))),
        }
    }
}

/// A saved trip (`trips` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub user_id: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_budget: f64,
    pub currency: String,
    #[serde(default)]
    pub interests: Vec<String>,
    pub group_size: u32,
    #[serde(default)]
    pub accommodation_type: Option<AccommodationPreference>,
    #[serde(default)]
    pub transportation: Option<TransportationPreference>,
    pub status: TripStatus,
}

/// A saved itinerary (`itineraries` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryRecord {
    pub trip_id: String,
    pub title: String,
    pub description: String,
    pub ai_generated: bool,
    pub daily_plans: Vec<DailyPlan>,
    #[serde(default)]
    pub total_cost_estimate: Option<f64>,
    #[serde(default)]
    pub tips: Vec<String>,
}

/// Budget allocation for one spending category of a trip (`budget_categories` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub trip_id: String,
    pub category: String,
    pub allocated_amount: f64,
    pub spent_amount: f64,
    pub currency: String,
}

/// A single expense logged against a trip (`expenses` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub trip_id: String,
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

impl Expense {
    pub fn new(
        trip_id: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        amount: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            trip_id: trip_id.into(),
            category: category.into(),
            description: description.into(),
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            date,
            receipt_url: None,
            is_recurring: false,
        }
    }
}

/// A typed record together with its store identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub record: T,
}

impl<T: DeserializeOwned> Stored<T> {
    pub fn decode(stored: &StoredRecord) -> Result<Self> {
        let record = serde_path_to_error::deserialize(&stored.data_json).map_err(|err| {
            PlannerError::Storage(format!(
                "record `{}` has unexpected layout at {}: {}",
                stored.id,
                err.path(),
                err
            ))
        })?;

        Ok(Self {
            id: stored.id.clone(),
            created_at: stored.created_at,
            record,
        })
    }

    pub fn decode_all(records: &[StoredRecord]) -> Result<Vec<Self>> {
        records.iter().map(Self::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_reports_field_path() {
        let stored = StoredRecord {
            id: "exp-1".to_string(),
            data_json: json!({
                "trip_id": "trip-1",
                "category": "food",
                "description": "Lunch",
                "amount": "twelve",
                "currency": "USD",
                "date": "2024-07-15"
            }),
            created_at: Utc::now(),
            updated_at: None,
        };

        let err = Stored::<Expense>::decode(&stored).unwrap_err();
        assert!(err.to_string().contains("amount"), "{}", err);
    }

    #[test]
    fn decode_ignores_envelope_fields() {
        let stored = StoredRecord {
            id: "trip-1".to_string(),
            data_json: json!({
                "id": "trip-1",
                "user_id": "demo-user",
                "destination": "Paris, France",
                "start_date": "2024-07-15",
                "end_date": "2024-07-22",
                "total_budget": 2500,
                "currency": "USD",
                "interests": ["Museums"],
                "group_size": 2,
                "accommodation_type": "mid-range",
                "transportation": null,
                "status": "planned"
            }),
            created_at: Utc::now(),
            updated_at: None,
        };

        let trip = Stored::<Trip>::decode(&stored).unwrap();
        assert_eq!(trip.id, "trip-1");
        assert_eq!(
            trip.record.accommodation_type,
            Some(AccommodationPreference::MidRange)
        );
        assert_eq!(trip.record.transportation, None);
        assert_eq!(trip.record.status, TripStatus::Planned);
    }
}
