use serde::Serialize;

use crate::types::{BudgetCategory, Expense, Trip};

/// Categories every new trip starts with, all with a zero allocation
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "accommodation",
    "transportation",
    "food",
    "activities",
    "shopping",
    "misc",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub allocated: f64,
    pub spent: f64,
    /// Spent as a percentage of the allocation; 0 when nothing is allocated
    pub percentage: f64,
}

impl CategorySummary {
    pub fn is_over_budget(&self) -> bool {
        self.allocated > 0.0 && self.spent > self.allocated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub total_budget: f64,
    pub total_spent: f64,
    pub remaining: f64,
    pub currency: String,
    pub categories: Vec<CategorySummary>,
    /// Spending in categories the trip has no budget row for
    pub uncategorized_spent: f64,
}

impl BudgetSummary {
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "Budget: {:.2} {} | Spent: {:.2} | Remaining: {:.2}",
                self.total_budget, self.currency, self.total_spent, self.remaining
            ),
            String::new(),
        ];

        for category in &self.categories {
            let marker = if category.is_over_budget() { " (over)" } else { "" };
            lines.push(format!(
                "{:<15} allocated {:>10.2}  spent {:>10.2}  {:>6.1}%{}",
                category.category, category.allocated, category.spent, category.percentage, marker
            ));
        }

        if self.uncategorized_spent > 0.0 {
            lines.push(format!(
                "{:<15} spent {:>10.2}",
                "uncategorized", self.uncategorized_spent
            ));
        }

        lines.join("\n")
    }
}

/// Summarize spending for a trip from its budget rows and expenses.
pub fn summarize(trip: &Trip, categories: &[BudgetCategory], expenses: &[Expense]) -> BudgetSummary {
    let spent_in = |category: &str| -> f64 {
        expenses
            .iter()
            .filter(|expense| expense.category == category)
            .map(|expense| expense.amount)
            .sum()
    };

    let total_spent: f64 = expenses.iter().map(|expense| expense.amount).sum();

    let summaries: Vec<CategorySummary> = categories
        .iter()
        .map(|category| {
            let spent = spent_in(&category.category);
            let percentage = if category.allocated_amount > 0.0 {
                spent / category.allocated_amount * 100.0
            } else {
                0.0
            };
            CategorySummary {
                category: category.category.clone(),
                allocated: category.allocated_amount,
                spent,
                percentage,
            }
        })
        .collect();

    let uncategorized_spent = expenses
        .iter()
        .filter(|expense| !categories.iter().any(|c| c.category == expense.category))
        .map(|expense| expense.amount)
        .sum();

    BudgetSummary {
        total_budget: trip.total_budget,
        total_spent,
        remaining: trip.total_budget - total_spent,
        currency: trip.currency.clone(),
        categories: summaries,
        uncategorized_spent,
    }
}
