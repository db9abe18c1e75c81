pub mod budget;
pub mod demo;
pub mod extractor;
pub mod planner;

pub use budget::{summarize, BudgetSummary, CategorySummary, DEFAULT_CATEGORIES};
pub use demo::seed_demo_data;
pub use extractor::{extract, Extracted, ExtractionError, ExtractionReason, ExtractionStage, Extractor};
pub use planner::TripPlanner;
