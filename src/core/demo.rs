//! Sample trips for trying the planner without a completion endpoint.

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    error::{PlannerError, Result},
    store::{RecordStore, BUDGET_CATEGORIES_TABLE, EXPENSES_TABLE, ITINERARIES_TABLE, TRIPS_TABLE},
    types::{
        AccommodationPreference, BudgetCategory, DailyPlan, Expense, ItineraryRecord,
        TransportationPreference, Trip, TripStatus, DEFAULT_CURRENCY,
    },
};

struct DemoTrip {
    destination: &'static str,
    start: &'static str,
    end: &'static str,
    budget: f64,
    interests: &'static [&'static str],
    group_size: u32,
    accommodation: AccommodationPreference,
    status: TripStatus,
    title: &'static str,
    description: &'static str,
    total_cost_estimate: f64,
    first_day: fn() -> Value,
    // (category, description, amount, date)
    expenses: &'static [(&'static str, &'static str, f64, &'static str)],
    // (category, allocated, spent)
    categories: [(&'static str, f64, f64); 6],
}

static DEMO_TRIPS: [DemoTrip; 3] = [
    DemoTrip {
        destination: "Paris, France",
        start: "2024-07-15",
        end: "2024-07-22",
        budget: 2500.0,
        interests: &["Culture & History", "Food & Dining", "Photography", "Museums"],
        group_size: 2,
        accommodation: AccommodationPreference::MidRange,
        status: TripStatus::Planned,
        title: "Romantic Paris Getaway",
        description: "A 7-day romantic journey through the City of Light, featuring iconic landmarks, fine dining, and cultural experiences.",
        total_cost_estimate: 1500.0,
        first_day: paris_day_one,
        expenses: &[
            ("transportation", "Round-trip flights from NYC to Paris", 850.0, "2024-07-15"),
            ("accommodation", "7 nights at Hotel Le Marais", 1260.0, "2024-07-15"),
            ("food", "Dinner at Le Jules Verne", 250.0, "2024-07-15"),
            ("activities", "Louvre Museum tickets", 65.0, "2024-07-16"),
            ("activities", "Seine River cruise", 75.0, "2024-07-17"),
        ],
        categories: [
            ("accommodation", 1400.0, 1260.0),
            ("transportation", 900.0, 850.0),
            ("food", 600.0, 515.0),
            ("activities", 400.0, 225.0),
            ("shopping", 150.0, 0.0),
            ("misc", 50.0, 0.0),
        ],
    },
    DemoTrip {
        destination: "Tokyo, Japan",
        start: "2024-09-01",
        end: "2024-09-10",
        budget: 3500.0,
        interests: &[
            "Culture & History",
            "Food & Dining",
            "Adventure & Outdoors",
            "Nightlife & Entertainment",
        ],
        group_size: 1,
        accommodation: AccommodationPreference::Budget,
        status: TripStatus::Ongoing,
        title: "Tokyo Adventure",
        description: "A 10-day exploration of Japan's vibrant capital, blending traditional culture with modern innovation.",
        total_cost_estimate: 2200.0,
        first_day: tokyo_day_one,
        expenses: &[
            ("transportation", "Round-trip flights from NYC to Tokyo", 1200.0, "2024-09-01"),
            ("accommodation", "Capsule hotel in Shibuya", 45.0, "2024-09-01"),
            ("food", "Ichiran Ramen dinner", 25.0, "2024-09-01"),
            ("activities", "Tokyo Skytree observation deck", 35.0, "2024-09-02"),
            ("shopping", "Electronics and souvenirs", 150.0, "2024-09-03"),
        ],
        categories: [
            ("accommodation", 500.0, 225.0),
            ("transportation", 1300.0, 1200.0),
            ("food", 800.0, 405.0),
            ("activities", 600.0, 35.0),
            ("shopping", 200.0, 150.0),
            ("misc", 100.0, 0.0),
        ],
    },
    DemoTrip {
        destination: "Barcelona, Spain",
        start: "2024-05-10",
        end: "2024-05-17",
        budget: 1800.0,
        interests: &[
            "Culture & History",
            "Food & Dining",
            "Beach",
            "Nightlife & Entertainment",
        ],
        group_size: 3,
        accommodation: AccommodationPreference::MidRange,
        status: TripStatus::Completed,
        title: "Barcelona Cultural Journey",
        description: "A vibrant 7-day exploration of Catalonia's capital, featuring Gaudí architecture and Mediterranean culture.",
        total_cost_estimate: 1200.0,
        first_day: barcelona_day_one,
        expenses: &[
            ("transportation", "Round-trip flights from NYC to Barcelona", 600.0, "2024-05-10"),
            ("accommodation", "7 nights at Hotel Arts", 980.0, "2024-05-10"),
            ("food", "Tapas and paella dinners", 180.0, "2024-05-11"),
            ("activities", "Park Güell and Sagrada Familia", 90.0, "2024-05-12"),
        ],
        categories: [
            ("accommodation", 1000.0, 980.0),
            ("transportation", 650.0, 600.0),
            ("food", 400.0, 180.0),
            ("activities", 300.0, 90.0),
            ("shopping", 100.0, 0.0),
            ("misc", 50.0, 0.0),
        ],
    },
];

fn paris_day_one() -> Value {
    json!({
        "day": 1,
        "date": "2024-07-15",
        "activities": [
            { "time": "14:00", "activity": "Check into hotel in Le Marais", "description": "Boutique hotel with Parisian charm", "cost": 180, "category": "accommodation" },
            { "time": "16:00", "activity": "Visit Eiffel Tower", "description": "Iconic landmark with city views", "cost": 85, "category": "activities" }
        ],
        "meals": [
            { "type": "Lunch", "suggestion": "Café de Flore", "cost": 45 },
            { "type": "Dinner", "suggestion": "Le Jules Verne", "cost": 250 }
        ]
    })
}

fn tokyo_day_one() -> Value {
    json!({
        "day": 1,
        "date": "2024-09-01",
        "activities": [
            { "time": "15:00", "activity": "Check into capsule hotel in Shibuya", "description": "Modern capsule hotel", "cost": 45, "category": "accommodation" },
            { "time": "17:00", "activity": "Shibuya Crossing Experience", "description": "World's busiest pedestrian crossing", "cost": 0, "category": "activities" }
        ],
        "meals": [
            { "type": "Dinner", "suggestion": "Ichiran Ramen", "cost": 25 }
        ]
    })
}

fn barcelona_day_one() -> Value {
    json!({
        "day": 1,
        "date": "2024-05-10",
        "activities": [
            { "time": "14:00", "activity": "Check into hotel in Eixample", "description": "Modern hotel in the heart of the city", "cost": 120, "category": "accommodation" },
            { "time": "16:00", "activity": "Gothic Quarter Exploration", "description": "Medieval streets and historic architecture", "cost": 0, "category": "activities" }
        ],
        "meals": [
            { "type": "Dinner", "suggestion": "Tapas restaurant", "cost": 65 }
        ]
    })
}

fn date(value: &str) -> Result<NaiveDate> {
    value
        .parse()
        .map_err(|err| PlannerError::Validation(format!("invalid demo date `{}`: {}", value, err)))
}

impl DemoTrip {
    fn trip(&self, user_id: &str) -> Result<Trip> {
        Ok(Trip {
            user_id: user_id.to_string(),
            destination: self.destination.to_string(),
            start_date: date(self.start)?,
            end_date: date(self.end)?,
            total_budget: self.budget,
            currency: DEFAULT_CURRENCY.to_string(),
            interests: self.interests.iter().map(|i| i.to_string()).collect(),
            group_size: self.group_size,
            accommodation_type: Some(self.accommodation),
            transportation: Some(TransportationPreference::Flight),
            status: self.status,
        })
    }

    fn itinerary(&self, trip_id: &str) -> Result<ItineraryRecord> {
        let day: DailyPlan = serde_json::from_value((self.first_day)())?;
        Ok(ItineraryRecord {
            trip_id: trip_id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            ai_generated: true,
            daily_plans: vec![day],
            total_cost_estimate: Some(self.total_cost_estimate),
            tips: Vec::new(),
        })
    }

    fn expenses(&self, trip_id: &str) -> Result<Vec<Expense>> {
        self.expenses
            .iter()
            .map(|(category, description, amount, day)| {
                Ok(Expense::new(trip_id, *category, *description, *amount, date(day)?))
            })
            .collect()
    }

    fn budget_categories(&self, trip_id: &str) -> Vec<BudgetCategory> {
        self.categories
            .iter()
            .map(|(category, allocated, spent)| BudgetCategory {
                trip_id: trip_id.to_string(),
                category: category.to_string(),
                allocated_amount: *allocated,
                spent_amount: *spent,
                currency: DEFAULT_CURRENCY.to_string(),
            })
            .collect()
    }
}

async fn create_dependent(store: &dyn RecordStore, table: &str, data: Result<Value>) {
    let outcome = match data {
        Ok(data) => store.create_record(table, data).await.map(|_| ()),
        Err(err) => Err(err),
    };
    if let Err(err) = outcome {
        warn!(target: "tripai::demo", table, error = %err, "could not create demo record");
    }
}

fn to_value<T: serde::Serialize>(record: &T) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}

/// Create the demo trips for `user_id` together with their itineraries, expenses and
/// budget categories. Returns the ids of the trips that were created.
pub async fn seed_demo_data(store: &dyn RecordStore, user_id: &str) -> Result<Vec<String>> {
    let mut trip_ids = Vec::with_capacity(DEMO_TRIPS.len());

    for demo in &DEMO_TRIPS {
        let created = match demo.trip(user_id).and_then(|trip| to_value(&trip)) {
            Ok(data) => store.create_record(TRIPS_TABLE, data).await,
            Err(err) => Err(err),
        };
        let trip_id = match created {
            Ok(record) => record.id,
            Err(err) => {
                warn!(
                    target: "tripai::demo",
                    destination = demo.destination,
                    error = %err,
                    "could not create demo trip, skipping its records"
                );
                continue;
            }
        };

        let itinerary = demo.itinerary(&trip_id).and_then(|it| to_value(&it));
        create_dependent(store, ITINERARIES_TABLE, itinerary).await;

        match demo.expenses(&trip_id) {
            Ok(expenses) => {
                for expense in &expenses {
                    create_dependent(store, EXPENSES_TABLE, to_value(expense)).await;
                }
            }
            Err(err) => warn!(target: "tripai::demo", error = %err, "skipping demo expenses"),
        }

        for category in demo.budget_categories(&trip_id) {
            create_dependent(store, BUDGET_CATEGORIES_TABLE, to_value(&category)).await;
        }

        info!(target: "tripai::demo", trip_id = %trip_id, destination = demo.destination, "demo trip seeded");
        trip_ids.push(trip_id);
    }

    Ok(trip_ids)
}
