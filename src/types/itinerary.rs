use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{PlannerError, Result};

/// Preferred lodging style for a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AccommodationPreference {
    Budget,
    MidRange,
    Luxury,
    Flexible,
}

impl AccommodationPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccommodationPreference::Budget => "budget",
            AccommodationPreference::MidRange => "mid-range",
            AccommodationPreference::Luxury => "luxury",
            AccommodationPreference::Flexible => "flexible",
        }
    }
}

impl fmt::Display for AccommodationPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccommodationPreference {
    type Err = PlannerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "budget" => Ok(Self::Budget),
            "mid-range" | "midrange" => Ok(Self::MidRange),
            "luxury" => Ok(Self::Luxury),
            "flexible" => Ok(Self::Flexible),
            other => Err(PlannerError::Validation(format!(
                "unknown accommodation preference `{}`",
                other
            ))),
        }
    }
}

/// Preferred way of getting to and around the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TransportationPreference {
    Flight,
    Train,
    Car,
    Bus,
    Flexible,
}

impl TransportationPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportationPreference::Flight => "flight",
            TransportationPreference::Train => "train",
            TransportationPreference::Car => "car",
            TransportationPreference::Bus => "bus",
            TransportationPreference::Flexible => "flexible",
        }
    }
}

impl fmt::Display for TransportationPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportationPreference {
    type Err = PlannerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flight" => Ok(Self::Flight),
            "train" => Ok(Self::Train),
            "car" => Ok(Self::Car),
            "bus" => Ok(Self::Bus),
            "flexible" => Ok(Self::Flexible),
            other => Err(PlannerError::Validation(format!(
                "unknown transportation preference `{}`",
                other
            ))),
        }
    }
}

/// Parameters a caller supplies to generate an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    interests: Vec<String>,
    pub group_size: u32,
    pub accommodation: Option<AccommodationPreference>,
    pub transportation: Option<TransportationPreference>,
}

impl TripRequest {
    pub fn new(
        destination: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        budget: f64,
    ) -> Self {
        Self {
            destination: destination.into(),
            start_date,
            end_date,
            budget,
            interests: Vec::new(),
            group_size: 1,
            accommodation: None,
            transportation: None,
        }
    }

    /// Replace the interest tags. Tags are trimmed; empty and repeated tags are dropped.
    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests.clear();
        for interest in interests {
            self.push_interest(interest.into());
        }
        self
    }

    /// Append comma-separated custom interests, e.g. `"Photography, Wine tasting"`.
    pub fn with_custom_interests(mut self, list: &str) -> Self {
        for interest in list.split(',') {
            self.push_interest(interest.to_string());
        }
        self
    }

    pub fn with_group_size(mut self, group_size: u32) -> Self {
        self.group_size = group_size;
        self
    }

    pub fn with_accommodation(mut self, accommodation: AccommodationPreference) -> Self {
        self.accommodation = Some(accommodation);
        self
    }

    pub fn with_transportation(mut self, transportation: TransportationPreference) -> Self {
        self.transportation = Some(transportation);
        self
    }

    pub fn interests(&self) -> &[String] {
        &self.interests
    }

    /// Inclusive number of calendar days covered by the trip.
    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(PlannerError::Validation(
                "destination must not be empty".to_string(),
            ));
        }
        if self.start_date > self.end_date {
            return Err(PlannerError::Validation(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(PlannerError::Validation(format!(
                "budget must be a positive amount, got {}",
                self.budget
            )));
        }
        if self.group_size == 0 {
            return Err(PlannerError::Validation(
                "group size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn push_interest(&mut self, interest: String) {
        let trimmed = interest.trim();
        if trimmed.is_empty() || self.interests.iter().any(|known| known == trimmed) {
            return;
        }
        self.interests.push(trimmed.to_string());
    }
}

/// Structured itinerary recovered from a completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryResult {
    /// Short title for the trip
    pub title: String,
    /// Brief description of the itinerary
    pub description: String,
    /// One plan per calendar day, in order
    pub daily_plans: Vec<DailyPlan>,
    /// Estimated total cost of the trip; absent when the model gave none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost_estimate: Option<f64>,
    /// Practical tips for the traveler
    #[serde(default)]
    pub tips: Vec<String>,
}

impl ItineraryResult {
    /// Sum of every activity and meal cost that was stated.
    pub fn stated_costs(&self) -> f64 {
        self.daily_plans.iter().map(DailyPlan::stated_costs).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DailyPlan {
    /// 1-based day counter within the itinerary
    pub day: u32,
    /// Calendar date of the day (YYYY-MM-DD)
    pub date: NaiveDate,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DailyPlan {
    pub fn stated_costs(&self) -> f64 {
        let activities: f64 = self.activities.iter().filter_map(|a| a.cost).sum();
        let meals: f64 = self.meals.iter().filter_map(|m| m.cost).sum();
        activities + meals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Activity {
    /// Time of day, free text (usually HH:MM)
    pub time: String,
    #[serde(rename = "activity")]
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Meal {
    /// Breakfast, lunch, dinner or any other free-text label
    #[serde(rename = "type")]
    pub meal_type: String,
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn interests_are_trimmed_and_deduplicated() {
        let request = TripRequest::new("Lisbon", date("2024-04-01"), date("2024-04-03"), 900.0)
            .with_interests(["Food & Dining", " Museums ", "", "Food & Dining"])
            .with_custom_interests("Photography, museums,  , Museums");

        assert_eq!(
            request.interests(),
            ["Food & Dining", "Museums", "Photography", "museums"]
        );
    }

    #[test]
    fn day_count_is_inclusive() {
        let request = TripRequest::new("Rome", date("2024-07-15"), date("2024-07-22"), 2500.0);
        assert_eq!(request.day_count(), 8);

        let same_day = TripRequest::new("Rome", date("2024-07-15"), date("2024-07-15"), 100.0);
        assert_eq!(same_day.day_count(), 1);
    }

    #[test]
    fn validate_rejects_bad_requests() {
        let base = TripRequest::new("Rome", date("2024-07-15"), date("2024-07-22"), 2500.0);
        assert!(base.validate().is_ok());

        let reversed = TripRequest::new("Rome", date("2024-07-22"), date("2024-07-15"), 2500.0);
        assert!(matches!(reversed.validate(), Err(PlannerError::Validation(_))));

        let no_budget = TripRequest::new("Rome", date("2024-07-15"), date("2024-07-22"), 0.0);
        assert!(no_budget.validate().is_err());

        let nan_budget = TripRequest::new("Rome", date("2024-07-15"), date("2024-07-22"), f64::NAN);
        assert!(nan_budget.validate().is_err());

        let blank = TripRequest::new("  ", date("2024-07-15"), date("2024-07-22"), 10.0);
        assert!(blank.validate().is_err());

        let nobody = base.clone().with_group_size(0);
        assert!(nobody.validate().is_err());
    }

    #[test]
    fn preferences_parse_from_cli_values() {
        assert_eq!(
            "mid-range".parse::<AccommodationPreference>().unwrap(),
            AccommodationPreference::MidRange
        );
        assert_eq!(
            "Train".parse::<TransportationPreference>().unwrap(),
            TransportationPreference::Train
        );
        assert!("yacht".parse::<TransportationPreference>().is_err());
        assert_eq!(AccommodationPreference::MidRange.to_string(), "mid-range");
    }

    #[test]
    fn activity_uses_wire_field_names() {
        let activity: Activity = serde_json::from_value(serde_json::json!({
            "time": "09:00",
            "activity": "Louvre Museum",
            "description": "Art museum",
            "category": "activities"
        }))
        .unwrap();

        assert_eq!(activity.name, "Louvre Museum");
        assert_eq!(activity.cost, None);

        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["activity"], "Louvre Museum");
        assert!(value.get("cost").is_none());
    }
}
