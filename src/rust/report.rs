//! Accumulated results and budget monitoring.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::classifier::ClassificationResult;

/// Share of a budget above which spending is flagged as approaching the limit.
pub const APPROACHING_THRESHOLD: f64 = 0.9;

const DEFAULT_BUDGETS: [(&str, f64); 4] = [
    ("Food", 10000.0),
    ("Shopping", 8000.0),
    ("Entertainment", 5000.0),
    ("Transportation", 7000.0),
];

/// Append-only log of classification results gathered across calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpendingLog {
    records: Vec<ClassificationResult>,
}

impl SpendingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ClassificationResult>) {
        self.records.extend(results);
    }

    pub fn records(&self) -> &[ClassificationResult] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of transactions per category, in order of first appearance.
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        self.group(|_| 1usize, |acc, n| *acc += n)
    }

    /// Sum of amounts per category, in order of first appearance.
    pub fn spending_by_category(&self) -> Vec<(String, f64)> {
        self.group(ClassificationResult::amount, |acc, amount| *acc += amount)
    }

    pub fn spent_on(&self, category: &str) -> f64 {
        self.records
            .iter()
            .filter(|r| r.category() == category)
            .map(ClassificationResult::amount)
            .sum()
    }

    /// One line per budget, in the order given.
    pub fn budget_report(&self, budgets: &[Budget]) -> Vec<BudgetLine> {
        budgets
            .iter()
            .map(|budget| BudgetLine::new(budget, self.spent_on(&budget.category)))
            .collect()
    }

    fn group<T: Default>(
        &self,
        value: impl Fn(&ClassificationResult) -> T,
        add: impl Fn(&mut T, T),
    ) -> Vec<(String, T)> {
        let mut groups: Vec<(String, T)> = Vec::new();
        for record in &self.records {
            let pos = match groups.iter().position(|(c, _)| c == record.category()) {
                Some(pos) => pos,
                None => {
                    groups.push((record.category().to_string(), T::default()));
                    groups.len() - 1
                }
            };
            add(&mut groups[pos].1, value(record));
        }
        groups
    }
}

/// Spending limit for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub category: String,
    pub limit: f64,
}

impl Budget {
    pub fn new(category: impl Into<String>, limit: f64) -> Self {
        Self {
            category: category.into(),
            limit,
        }
    }
}

/// Parses `CATEGORY=AMOUNT`.
impl FromStr for Budget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, limit) = s
            .split_once('=')
            .ok_or_else(|| format!("expected CATEGORY=AMOUNT, got '{}'", s))?;
        let category = category.trim();
        if category.is_empty() {
            return Err("budget category cannot be empty".to_string());
        }
        let limit: f64 = limit
            .trim()
            .parse()
            .map_err(|e| format!("invalid budget amount '{}': {}", limit.trim(), e))?;
        if !limit.is_finite() || limit < 0.0 {
            return Err(format!("budget amount must be a non-negative number, got {}", limit));
        }
        Ok(Self::new(category, limit))
    }
}

pub fn default_budgets() -> Vec<Budget> {
    DEFAULT_BUDGETS
        .iter()
        .map(|(category, limit)| Budget::new(*category, *limit))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetStatus {
    OnTrack,
    /// Spending is above 90% of the limit but not over it
    Approaching,
    Exceeded { by: f64 },
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnTrack => write!(f, "on track"),
            Self::Approaching => write!(f, "approaching limit"),
            Self::Exceeded { by } => write!(f, "exceeded by {:.2}", by),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetLine {
    pub category: String,
    pub spent: f64,
    pub limit: f64,
    /// Percent of the limit used, capped at 100. Zero for a non-positive limit.
    pub progress: f64,
    pub status: BudgetStatus,
}

impl BudgetLine {
    fn new(budget: &Budget, spent: f64) -> Self {
        let progress = if budget.limit > 0.0 {
            (spent / budget.limit * 100.0).min(100.0)
        } else {
            0.0
        };
        let status = if spent > budget.limit {
            BudgetStatus::Exceeded { by: spent - budget.limit }
        } else if spent > budget.limit * APPROACHING_THRESHOLD {
            BudgetStatus::Approaching
        } else {
            BudgetStatus::OnTrack
        };
        Self {
            category: budget.category.clone(),
            spent,
            limit: budget.limit,
            progress,
            status,
        }
    }
}
