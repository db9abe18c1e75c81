use serde_json::json;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::{
    core::{
        budget::{summarize, BudgetSummary, DEFAULT_CATEGORIES},
        extractor::Extractor,
    },
    error::{PlannerError, Result},
    services::{build_itinerary_prompt, CompletionEndpoint, HttpCompletionClient},
    store::{
        RecordFilter, RecordStore, BUDGET_CATEGORIES_TABLE, EXPENSES_TABLE, ITINERARIES_TABLE,
        TRIPS_TABLE,
    },
    types::{
        BudgetCategory, Expense, ItineraryRecord, PlanResult, PlannedTrip, Stored, Trip,
        TripRequest, TripStatus, DEFAULT_CURRENCY,
    },
};

/// Generates itineraries and keeps trips, itineraries and budgets in a record store
#[derive(Debug, Clone)]
pub struct TripPlanner {
    completion: Arc<dyn CompletionEndpoint>,
    store: Arc<dyn RecordStore>,
    extractor: Extractor,
    timeout: Duration,
    currency: String,
}

impl TripPlanner {
    pub fn new(completion: Arc<dyn CompletionEndpoint>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            completion,
            store,
            extractor: Extractor::new(),
            timeout: Duration::from_secs(120),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Planner backed by [`HttpCompletionClient::from_env`]
    pub fn from_env(store: Arc<dyn RecordStore>) -> Result<Self> {
        let client = HttpCompletionClient::from_env()?;
        Ok(Self::new(Arc::new(client), store))
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Ask the completion endpoint for an itinerary and recover it from the reply
    pub async fn generate_itinerary(&self, request: &TripRequest) -> Result<PlanResult> {
        request.validate()?;

        let started = Instant::now();
        let prompt = build_itinerary_prompt(request);
        info!(
            target: "tripai::planner",
            destination = %request.destination,
            days = request.day_count(),
            "requesting itinerary"
        );

        let raw = timeout(self.timeout, self.completion.send_completion(&prompt))
            .await
            .map_err(|_| PlannerError::Timeout("completion call timed out".to_string()))??;

        let extracted = match self.extractor.extract_with_stage(&raw) {
            Ok(extracted) => extracted,
            Err(source) => {
                error!(
                    target: "tripai::planner",
                    reason = source.reason().as_str(),
                    raw = %raw,
                    "could not recover itinerary from completion"
                );
                return Err(PlannerError::Extraction { source, raw });
            }
        };

        let planned_days = extracted.itinerary.daily_plans.len() as i64;
        if planned_days != request.day_count() {
            warn!(
                target: "tripai::planner",
                planned_days,
                trip_days = request.day_count(),
                "itinerary day count differs from trip span"
            );
        }

        info!(
            target: "tripai::planner",
            stage = %extracted.stage,
            days = planned_days,
            "itinerary generated"
        );

        Ok(PlanResult::new(
            extracted.itinerary,
            extracted.stage,
            raw,
            started.elapsed(),
        ))
    }

    /// Generate an itinerary, then save the trip, the itinerary and the default budget categories.
    ///
    /// If any record after the trip cannot be saved, the records already written for it are removed.
    pub async fn plan_trip(&self, user_id: &str, request: &TripRequest) -> Result<PlannedTrip> {
        let plan = self.generate_itinerary(request).await?;

        let trip = Trip {
            user_id: user_id.to_string(),
            destination: request.destination.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            total_budget: request.budget,
            currency: self.currency.clone(),
            interests: request.interests().to_vec(),
            group_size: request.group_size,
            accommodation_type: request.accommodation,
            transportation: request.transportation,
            status: TripStatus::Planned,
        };
        let trip_record = self
            .store
            .create_record(TRIPS_TABLE, serde_json::to_value(&trip)?)
            .await?;
        let trip_id = trip_record.id;

        let (itinerary_id, budget_category_ids) =
            match self.save_plan_records(&trip_id, &plan).await {
                Ok(ids) => ids,
                Err(err) => {
                    if let Err(cleanup) = self.remove_trip_records(&trip_id).await {
                        warn!(
                            target: "tripai::planner",
                            trip_id = %trip_id,
                            error = %cleanup,
                            "could not remove partially saved trip"
                        );
                    }
                    return Err(err);
                }
            };

        info!(target: "tripai::planner", trip_id = %trip_id, user_id, "trip saved");

        Ok(PlannedTrip {
            trip_id,
            itinerary_id,
            budget_category_ids,
            plan,
        })
    }

    async fn save_plan_records(
        &self,
        trip_id: &str,
        plan: &PlanResult,
    ) -> Result<(String, Vec<String>)> {
        let itinerary = ItineraryRecord {
            trip_id: trip_id.to_string(),
            title: plan.itinerary.title.clone(),
            description: plan.itinerary.description.clone(),
            ai_generated: true,
            daily_plans: plan.itinerary.daily_plans.clone(),
            total_cost_estimate: plan.itinerary.total_cost_estimate,
            tips: plan.itinerary.tips.clone(),
        };
        let itinerary_record = self
            .store
            .create_record(ITINERARIES_TABLE, serde_json::to_value(&itinerary)?)
            .await?;

        let mut budget_category_ids = Vec::with_capacity(DEFAULT_CATEGORIES.len());
        for category in DEFAULT_CATEGORIES {
            let row = BudgetCategory {
                trip_id: trip_id.to_string(),
                category: category.to_string(),
                allocated_amount: 0.0,
                spent_amount: 0.0,
                currency: self.currency.clone(),
            };
            let record = self
                .store
                .create_record(BUDGET_CATEGORIES_TABLE, serde_json::to_value(&row)?)
                .await?;
            budget_category_ids.push(record.id);
        }

        Ok((itinerary_record.id, budget_category_ids))
    }

    pub async fn trips_for_user(&self, user_id: &str) -> Result<Vec<Stored<Trip>>> {
        let records = self
            .store
            .get_records(TRIPS_TABLE, &RecordFilter::UserId(user_id.to_string()))
            .await?;
        Stored::decode_all(&records)
    }

    pub async fn trip(&self, trip_id: &str) -> Result<Option<Stored<Trip>>> {
        let record = self.store.get_record(TRIPS_TABLE, trip_id).await?;
        record.as_ref().map(Stored::decode).transpose()
    }

    pub async fn itinerary_for_trip(&self, trip_id: &str) -> Result<Option<Stored<ItineraryRecord>>> {
        let records = self
            .store
            .get_records(ITINERARIES_TABLE, &RecordFilter::TripId(trip_id.to_string()))
            .await?;
        records.first().map(Stored::decode).transpose()
    }

    pub async fn budget_categories(&self, trip_id: &str) -> Result<Vec<Stored<BudgetCategory>>> {
        let records = self
            .store
            .get_records(
                BUDGET_CATEGORIES_TABLE,
                &RecordFilter::TripId(trip_id.to_string()),
            )
            .await?;
        Stored::decode_all(&records)
    }

    pub async fn expenses_for_trip(&self, trip_id: &str) -> Result<Vec<Stored<Expense>>> {
        let records = self
            .store
            .get_records(EXPENSES_TABLE, &RecordFilter::TripId(trip_id.to_string()))
            .await?;
        Stored::decode_all(&records)
    }

    pub async fn update_trip_status(&self, trip_id: &str, status: TripStatus) -> Result<Stored<Trip>> {
        let record = self
            .store
            .update_record(TRIPS_TABLE, trip_id, json!({ "status": status }))
            .await?;
        Stored::decode(&record)
    }

    /// Set the allocation of one of the trip's budget categories
    pub async fn allocate_budget(
        &self,
        trip_id: &str,
        category: &str,
        amount: f64,
    ) -> Result<Stored<BudgetCategory>> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PlannerError::Validation(format!(
                "allocation must be a non-negative amount, got {}",
                amount
            )));
        }

        let row = self
            .budget_categories(trip_id)
            .await?
            .into_iter()
            .find(|row| row.record.category == category)
            .ok_or_else(|| PlannerError::RecordNotFound {
                table: BUDGET_CATEGORIES_TABLE.to_string(),
                id: format!("{}:{}", trip_id, category),
            })?;

        let record = self
            .store
            .update_record(
                BUDGET_CATEGORIES_TABLE,
                &row.id,
                json!({ "allocated_amount": amount }),
            )
            .await?;
        Stored::decode(&record)
    }

    /// Record an expense and add it to the `spent_amount` of the matching budget category
    pub async fn add_expense(&self, expense: Expense) -> Result<Stored<Expense>> {
        if !expense.amount.is_finite() || expense.amount <= 0.0 {
            return Err(PlannerError::Validation(format!(
                "expense amount must be positive, got {}",
                expense.amount
            )));
        }
        if expense.category.trim().is_empty() {
            return Err(PlannerError::Validation(
                "expense category must not be empty".to_string(),
            ));
        }
        self.require_trip(&expense.trip_id).await?;

        let record = self
            .store
            .create_record(EXPENSES_TABLE, serde_json::to_value(&expense)?)
            .await?;

        let row = self
            .budget_categories(&expense.trip_id)
            .await?
            .into_iter()
            .find(|row| row.record.category == expense.category);
        if let Some(row) = row {
            let spent = row.record.spent_amount + expense.amount;
            self.store
                .update_record(
                    BUDGET_CATEGORIES_TABLE,
                    &row.id,
                    json!({ "spent_amount": spent }),
                )
                .await?;
        }

        info!(
            target: "tripai::planner",
            trip_id = %expense.trip_id,
            category = %expense.category,
            amount = expense.amount,
            "expense recorded"
        );
        Stored::decode(&record)
    }

    pub async fn budget_summary(&self, trip_id: &str) -> Result<BudgetSummary> {
        let trip = self.require_trip(trip_id).await?;
        let categories: Vec<BudgetCategory> = self
            .budget_categories(trip_id)
            .await?
            .into_iter()
            .map(|row| row.record)
            .collect();
        let expenses: Vec<Expense> = self
            .expenses_for_trip(trip_id)
            .await?
            .into_iter()
            .map(|row| row.record)
            .collect();

        Ok(summarize(&trip.record, &categories, &expenses))
    }

    /// Delete a trip together with its itinerary, budget categories and expenses
    pub async fn delete_trip(&self, trip_id: &str) -> Result<()> {
        self.require_trip(trip_id).await?;
        self.remove_trip_records(trip_id).await?;

        info!(target: "tripai::planner", trip_id, "trip deleted");
        Ok(())
    }

    async fn remove_trip_records(&self, trip_id: &str) -> Result<()> {
        let filter = RecordFilter::TripId(trip_id.to_string());
        for table in [ITINERARIES_TABLE, BUDGET_CATEGORIES_TABLE, EXPENSES_TABLE] {
            for record in self.store.get_records(table, &filter).await? {
                self.store.delete_record(table, &record.id).await?;
            }
        }
        self.store.delete_record(TRIPS_TABLE, trip_id).await
    }

    async fn require_trip(&self, trip_id: &str) -> Result<Stored<Trip>> {
        self.trip(trip_id)
            .await?
            .ok_or_else(|| PlannerError::RecordNotFound {
                table: TRIPS_TABLE.to_string(),
                id: trip_id.to_string(),
            })
    }
}
