use async_trait::async_trait;
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tripai::{
    store::{BUDGET_CATEGORIES_TABLE, EXPENSES_TABLE, ITINERARIES_TABLE, TRIPS_TABLE},
    CompletionEndpoint, Expense, ExtractionReason, ExtractionStage, LocalStore, PlannerError,
    RecordFilter, RecordStore, StoredRecord, TripPlanner, TripRequest, TripStatus,
};

const ITINERARY_REPLY: &str = r#"Here's a plan for your trip!

```json
{
  "title": "Lisbon Long Weekend",
  "description": "Trams, tiles and pastries",
  "dailyPlans": [
    {"day": 1, "date": "2024-04-01", "activities": [{"time": "10:00", "activity": "Alfama walk", "description": "Old town", "cost": 0, "category": "culture"}]},
    {"day": 2, "date": "2024-04-02", "meals": [{"type": "Lunch", "suggestion": "Time Out Market", "cost": 25}]},
    {"day": 3, "date": "2024-04-03"}
  ],
  "totalCostEstimate": 640,
  "tips": ["Buy a Viva Viagem card"]
}
```
"#;

#[derive(Debug)]
struct FakeCompletion {
    reply: String,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeCompletion {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: ITINERARY_REPLY.to_string(),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionEndpoint for FakeCompletion {
    async fn send_completion(&self, _prompt: &str) -> tripai::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.clone())
    }
}

fn lisbon() -> TripRequest {
    TripRequest::new(
        "Lisbon, Portugal",
        "2024-04-01".parse().unwrap(),
        "2024-04-03".parse().unwrap(),
        1200.0,
    )
    .with_interests(["Food & Dining", "Museums"])
    .with_group_size(2)
}

fn planner(completion: Arc<FakeCompletion>) -> (TripPlanner, Arc<LocalStore>) {
    let store = Arc::new(LocalStore::in_memory());
    let planner = TripPlanner::new(completion, store.clone());
    (planner, store)
}

#[tokio::test]
async fn plan_trip_saves_trip_itinerary_and_budget_rows() {
    let completion = FakeCompletion::replying(ITINERARY_REPLY);
    let (planner, store) = planner(completion.clone());

    let planned = planner.plan_trip("user-1", &lisbon()).await.unwrap();
    assert_eq!(completion.calls(), 1);
    assert_eq!(planned.plan.stage, ExtractionStage::Embedded);
    assert!(planned.plan.was_recovered());
    assert_eq!(planned.plan.itinerary.title, "Lisbon Long Weekend");
    assert_eq!(planned.budget_category_ids.len(), 6);

    let trip = planner.trip(&planned.trip_id).await.unwrap().unwrap();
    assert_eq!(trip.record.user_id, "user-1");
    assert_eq!(trip.record.status, TripStatus::Planned);
    assert_eq!(trip.record.interests, vec!["Food & Dining", "Museums"]);
    assert_eq!(trip.record.currency, "USD");

    let itinerary = planner
        .itinerary_for_trip(&planned.trip_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(itinerary.id, planned.itinerary_id);
    assert!(itinerary.record.ai_generated);
    assert_eq!(itinerary.record.daily_plans.len(), 3);
    assert_eq!(itinerary.record.total_cost_estimate, Some(640.0));

    let categories = planner.budget_categories(&planned.trip_id).await.unwrap();
    let names: Vec<&str> = categories
        .iter()
        .map(|row| row.record.category.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["accommodation", "transportation", "food", "activities", "shopping", "misc"]
    );
    assert!(categories.iter().all(|row| row.record.allocated_amount == 0.0));

    let trips = planner.trips_for_user("user-1").await.unwrap();
    assert_eq!(trips.len(), 1);
    assert!(planner.trips_for_user("someone-else").await.unwrap().is_empty());

    let saved = store
        .get_records(TRIPS_TABLE, &RecordFilter::All)
        .await
        .unwrap();
    assert_eq!(saved.len(), 1);
}

#[tokio::test]
async fn unrecoverable_reply_keeps_raw_text_and_saves_nothing() {
    let reply = "Sorry, I can only help with travel questions.";
    let (planner, store) = planner(FakeCompletion::replying(reply));

    let err = planner.plan_trip("user-1", &lisbon()).await.unwrap_err();
    match &err {
        PlannerError::Extraction { source, raw } => {
            assert_eq!(source.reason(), ExtractionReason::NoStructuredContentFound);
            assert_eq!(raw, reply);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.raw_response(), Some(reply));
    assert!(err.is_retryable());

    let payload = err.to_error_payload();
    assert_eq!(payload["error"]["reason"], "no-structured-content-found");

    for table in [TRIPS_TABLE, ITINERARIES_TABLE, BUDGET_CATEGORIES_TABLE] {
        let records = store.get_records(table, &RecordFilter::All).await.unwrap();
        assert!(records.is_empty(), "{table} should be empty");
    }
}

#[tokio::test]
async fn wrong_shape_reply_is_a_shape_mismatch() {
    let (planner, _) = planner(FakeCompletion::replying(r#"{"foo": "bar"}"#));

    let err = planner.generate_itinerary(&lisbon()).await.unwrap_err();
    match err {
        PlannerError::Extraction { source, .. } => {
            assert_eq!(source.reason(), ExtractionReason::ShapeMismatch)
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn invalid_request_never_reaches_the_endpoint() {
    let completion = FakeCompletion::replying(ITINERARY_REPLY);
    let (planner, _) = planner(completion.clone());

    let backwards = TripRequest::new(
        "Lisbon",
        "2024-04-05".parse().unwrap(),
        "2024-04-01".parse().unwrap(),
        500.0,
    );
    let err = planner.generate_itinerary(&backwards).await.unwrap_err();
    assert!(matches!(err, PlannerError::Validation(_)));

    let blank = TripRequest::new(
        "   ",
        "2024-04-01".parse().unwrap(),
        "2024-04-02".parse().unwrap(),
        500.0,
    );
    assert!(planner.generate_itinerary(&blank).await.is_err());
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let completion = FakeCompletion::slow(Duration::from_secs(5));
    let (planner, _) = planner(completion);
    let planner = planner.with_timeout(Duration::from_millis(50));

    let err = planner.generate_itinerary(&lisbon()).await.unwrap_err();
    assert!(matches!(err, PlannerError::Timeout(_)));
}

#[tokio::test]
async fn expenses_allocations_and_summary() {
    let (planner, _) = planner(FakeCompletion::replying(ITINERARY_REPLY));
    let planned = planner.plan_trip("user-1", &lisbon()).await.unwrap();
    let trip_id = planned.trip_id.as_str();

    let food = planner.allocate_budget(trip_id, "food", 300.0).await.unwrap();
    assert_eq!(food.record.allocated_amount, 300.0);

    let missing = planner.allocate_budget(trip_id, "spa", 50.0).await;
    assert!(matches!(missing, Err(PlannerError::RecordNotFound { .. })));
    let negative = planner.allocate_budget(trip_id, "food", -1.0).await;
    assert!(matches!(negative, Err(PlannerError::Validation(_))));

    let day = "2024-04-02".parse().unwrap();
    planner
        .add_expense(Expense::new(trip_id, "food", "Pastéis de nata", 12.5, day))
        .await
        .unwrap();
    planner
        .add_expense(Expense::new(trip_id, "food", "Seafood dinner", 137.5, day))
        .await
        .unwrap();

    let zero = planner
        .add_expense(Expense::new(trip_id, "food", "Free sample", 0.0, day))
        .await;
    assert!(matches!(zero, Err(PlannerError::Validation(_))));
    let unknown_trip = planner
        .add_expense(Expense::new("no-such-trip", "food", "Coffee", 2.0, day))
        .await;
    assert!(matches!(unknown_trip, Err(PlannerError::RecordNotFound { .. })));

    let summary = planner.budget_summary(trip_id).await.unwrap();
    assert_eq!(summary.total_budget, 1200.0);
    assert_eq!(summary.total_spent, 150.0);
    assert_eq!(summary.remaining, 1050.0);
    let food = summary
        .categories
        .iter()
        .find(|c| c.category == "food")
        .unwrap();
    assert_eq!(food.spent, 150.0);
    assert_eq!(food.percentage, 50.0);

    let rows = planner.budget_categories(trip_id).await.unwrap();
    let food_row = rows.iter().find(|row| row.record.category == "food").unwrap();
    assert_eq!(food_row.record.spent_amount, 150.0);
    assert_eq!(food_row.record.allocated_amount, 300.0);
    let other_spent: f64 = rows
        .iter()
        .filter(|row| row.record.category != "food")
        .map(|row| row.record.spent_amount)
        .sum();
    assert_eq!(other_spent, 0.0);
}

#[tokio::test]
async fn expense_outside_default_categories_is_still_recorded() {
    let (planner, _) = planner(FakeCompletion::replying(ITINERARY_REPLY));
    let planned = planner.plan_trip("user-1", &lisbon()).await.unwrap();
    let trip_id = planned.trip_id.as_str();

    planner
        .add_expense(Expense::new(
            trip_id,
            "souvenirs",
            "Azulejo tile",
            18.0,
            "2024-04-03".parse().unwrap(),
        ))
        .await
        .unwrap();

    assert_eq!(planner.expenses_for_trip(trip_id).await.unwrap().len(), 1);
    let rows = planner.budget_categories(trip_id).await.unwrap();
    assert!(rows.iter().all(|row| row.record.spent_amount == 0.0));
}

/// Store that refuses to save itineraries
#[derive(Debug, Default)]
struct NoItineraryStore {
    inner: LocalStore,
}

#[async_trait]
impl RecordStore for NoItineraryStore {
    async fn get_records(
        &self,
        table: &str,
        filter: &RecordFilter,
    ) -> tripai::Result<Vec<StoredRecord>> {
        self.inner.get_records(table, filter).await
    }

    async fn get_record(&self, table: &str, id: &str) -> tripai::Result<Option<StoredRecord>> {
        self.inner.get_record(table, id).await
    }

    async fn create_record(&self, table: &str, data: Value) -> tripai::Result<StoredRecord> {
        if table == ITINERARIES_TABLE {
            return Err(PlannerError::Storage("itineraries unavailable".to_string()));
        }
        self.inner.create_record(table, data).await
    }

    async fn update_record(
        &self,
        table: &str,
        id: &str,
        data: Value,
    ) -> tripai::Result<StoredRecord> {
        self.inner.update_record(table, id, data).await
    }

    async fn delete_record(&self, table: &str, id: &str) -> tripai::Result<()> {
        self.inner.delete_record(table, id).await
    }
}

#[tokio::test]
async fn failed_plan_removes_the_half_saved_trip() {
    let store = Arc::new(NoItineraryStore::default());
    let planner = TripPlanner::new(FakeCompletion::replying(ITINERARY_REPLY), store.clone());

    let err = planner.plan_trip("user-1", &lisbon()).await.unwrap_err();
    assert!(matches!(err, PlannerError::Storage(_)));

    assert!(planner.trips_for_user("user-1").await.unwrap().is_empty());
    for table in [TRIPS_TABLE, ITINERARIES_TABLE, BUDGET_CATEGORIES_TABLE] {
        let records = store.get_records(table, &RecordFilter::All).await.unwrap();
        assert!(records.is_empty(), "{table} should be empty");
    }
}

#[tokio::test]
async fn status_update_and_cascading_delete() {
    let (planner, store) = planner(FakeCompletion::replying(ITINERARY_REPLY));
    let planned = planner.plan_trip("user-1", &lisbon()).await.unwrap();
    let trip_id = planned.trip_id.as_str();

    let updated = planner
        .update_trip_status(trip_id, TripStatus::Ongoing)
        .await
        .unwrap();
    assert_eq!(updated.record.status, TripStatus::Ongoing);
    assert_eq!(updated.record.destination, "Lisbon, Portugal");

    planner
        .add_expense(Expense::new(
            trip_id,
            "transportation",
            "Tram 28",
            3.0,
            "2024-04-01".parse().unwrap(),
        ))
        .await
        .unwrap();

    planner.delete_trip(trip_id).await.unwrap();
    assert!(planner.trip(trip_id).await.unwrap().is_none());

    let filter = RecordFilter::TripId(trip_id.to_string());
    for table in [ITINERARIES_TABLE, BUDGET_CATEGORIES_TABLE, EXPENSES_TABLE] {
        assert!(store.get_records(table, &filter).await.unwrap().is_empty());
    }

    let again = planner.delete_trip(trip_id).await;
    assert!(matches!(again, Err(PlannerError::RecordNotFound { .. })));
}
