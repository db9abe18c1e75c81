//! tripai: itinerary generation with resilient response extraction and local budget tracking
//!
//! A [`TripPlanner`] sends a prompt built from a [`TripRequest`] to a completion endpoint,
//! recovers a structured [`ItineraryResult`] from whatever text comes back, and keeps trips,
//! itineraries, budget categories and expenses in a [`RecordStore`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tripai::{LocalStore, TripPlanner, TripRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(LocalStore::open("tripai-store.json").await?);
//!     let planner = TripPlanner::from_env(store)?;
//!
//!     let request = TripRequest::new(
//!         "Lisbon, Portugal",
//!         "2024-10-01".parse()?,
//!         "2024-10-04".parse()?,
//!         1200.0,
//!     )
//!     .with_interests(["Food & Dining", "Museums"]);
//!
//!     let planned = planner.plan_trip("user-1", &request).await?;
//!     println!("{}", planned.plan.summary());
//!     Ok(())
//! }
//! ```
//!
//! The extractor can also be used on its own:
//!
//! ```rust
//! let raw = r#"Sure! {"title":"Day trip","description":"Short","dailyPlans":[{"day":1,"date":"2024-01-01"}]}"#;
//! let itinerary = tripai::extract(raw).unwrap();
//! assert_eq!(itinerary.daily_plans.len(), 1);
//! ```

pub mod core;
pub mod error;
pub mod schemas;
pub mod services;
pub mod store;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use core::{
    extract, seed_demo_data, BudgetSummary, CategorySummary, Extracted, ExtractionError,
    ExtractionReason, ExtractionStage, Extractor, TripPlanner,
};
pub use error::{PlannerError, Result};
pub use schemas::{CompletionSchema, SchemaHandle, Validator};
pub use services::{ApiFlavor, CompletionEndpoint, HttpCompletionClient};
pub use store::{LocalStore, RecordFilter, RecordStore, StoredRecord};
pub use types::{
    AccommodationPreference, Activity, BudgetCategory, DailyPlan, Expense, ItineraryRecord,
    ItineraryResult, Meal, PlanResult, PlannedTrip, Stored, TransportationPreference, Trip,
    TripRequest, TripStatus,
};
