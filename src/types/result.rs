use crate::core::extractor::ExtractionStage;
use serde::Serialize;
use std::time::Duration;

use super::itinerary::ItineraryResult;

/// Result of a single itinerary generation
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    /// The recovered itinerary
    pub itinerary: ItineraryResult,
    /// Extraction stage that recovered the itinerary
    pub stage: ExtractionStage,
    /// Verbatim completion text the itinerary was recovered from
    pub raw_response: String,
    /// Time spent waiting on the completion endpoint and extracting
    pub duration: Duration,
}

/// Identifiers of everything `plan_trip` persisted
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTrip {
    pub trip_id: String,
    pub itinerary_id: String,
    pub budget_category_ids: Vec<String>,
    pub plan: PlanResult,
}

impl PlanResult {
    pub fn new(
        itinerary: ItineraryResult,
        stage: ExtractionStage,
        raw_response: String,
        duration: Duration,
    ) -> Self {
        Self {
            itinerary,
            stage,
            raw_response,
            duration,
        }
    }

    /// Whether the completion text needed any recovery beyond a plain parse
    pub fn was_recovered(&self) -> bool {
        self.stage != ExtractionStage::Direct
    }

    /// Generate a human-readable day-by-day rendering of the plan
    pub fn summary(&self) -> String {
        let itinerary = &self.itinerary;
        let mut lines = Vec::new();

        lines.push(format!("=== {} ===", itinerary.title));
        lines.push(itinerary.description.clone());
        lines.push(format!(
            "Generated in {:.2}s (extraction stage: {})",
            self.duration.as_secs_f64(),
            self.stage
        ));

        if let Some(total) = itinerary.total_cost_estimate {
            lines.push(format!("Estimated total: ${:.2}", total));
        }

        for plan in &itinerary.daily_plans {
            lines.push(String::new());
            lines.push(format!("--- Day {} ({}) ---", plan.day, plan.date));

            for activity in &plan.activities {
                let cost = activity
                    .cost
                    .map(|cost| format!(" [${:.2}]", cost))
                    .unwrap_or_default();
                lines.push(format!(
                    "{} {} ({}){}",
                    activity.time, activity.name, activity.category, cost
                ));
                if !activity.description.is_empty() {
                    lines.push(format!("   {}", activity.description));
                }
            }

            for meal in &plan.meals {
                let cost = meal
                    .cost
                    .map(|cost| format!(" [${:.2}]", cost))
                    .unwrap_or_default();
                lines.push(format!("{}: {}{}", meal.meal_type, meal.suggestion, cost));
            }

            if let Some(notes) = &plan.notes {
                lines.push(format!("Notes: {}", notes));
            }
        }

        if !itinerary.tips.is_empty() {
            lines.push(String::new());
            lines.push("--- Tips ---".to_string());
            for tip in &itinerary.tips {
                lines.push(format!("- {}", tip));
            }
        }

        lines.join("\n")
    }
}
