pub mod itinerary;
pub mod records;
pub mod response;
pub mod result;

pub use itinerary::{
    AccommodationPreference, Activity, DailyPlan, ItineraryResult, Meal, TransportationPreference,
    TripRequest,
};
pub use records::{
    BudgetCategory, Expense, ItineraryRecord, Stored, Trip, TripStatus, DEFAULT_CURRENCY,
};
pub use response::deserialize_structured_response;
pub use result::{PlanResult, PlannedTrip};
