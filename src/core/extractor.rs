//! Recovery of a typed itinerary from free-form completion text.
//!
//! Models often wrap their JSON in prose or markdown fences, or emit typographic
//! quotes. Extraction runs an ordered chain of candidates over the text and
//! returns the first one that both parses and validates:
//!
//! 1. [`ExtractionStage::Direct`]: the whole text.
//! 2. [`ExtractionStage::Embedded`]: the greedy `{...}` / `[...]` span.
//! 3. [`ExtractionStage::Normalized`]: that span with smart quotes replaced and
//!    whitespace collapsed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::{borrow::Cow, fmt};
use thiserror::Error;
use tracing::debug;

use crate::{schemas::Validator, types::ItineraryResult};

static FRAGMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}|\[.*\]").expect("fragment pattern is valid"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Why extraction gave up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no valid structured result found")]
    NoStructuredContent,

    #[error("result does not match expected itinerary shape: {detail}")]
    ShapeMismatch { detail: String },
}

/// Stable, machine-readable reason for an [`ExtractionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionReason {
    NoStructuredContentFound,
    ShapeMismatch,
}

impl ExtractionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionReason::NoStructuredContentFound => "no-structured-content-found",
            ExtractionReason::ShapeMismatch => "shape-mismatch",
        }
    }
}

impl ExtractionError {
    pub fn reason(&self) -> ExtractionReason {
        match self {
            ExtractionError::NoStructuredContent => ExtractionReason::NoStructuredContentFound,
            ExtractionError::ShapeMismatch { .. } => ExtractionReason::ShapeMismatch,
        }
    }
}

/// Which candidate of the fallback chain produced the itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    Direct,
    Embedded,
    Normalized,
}

impl ExtractionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStage::Direct => "direct",
            ExtractionStage::Embedded => "embedded",
            ExtractionStage::Normalized => "normalized",
        }
    }
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An itinerary together with the stage that recovered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub itinerary: ItineraryResult,
    pub stage: ExtractionStage,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    validator: Validator,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor that also applies schema and per-field checks.
    pub fn strict() -> Self {
        Self::with_validator(Validator::Strict)
    }

    pub fn with_validator(validator: Validator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> Validator {
        self.validator
    }

    pub fn extract(&self, raw: &str) -> Result<ItineraryResult, ExtractionError> {
        self.extract_with_stage(raw).map(|extracted| extracted.itinerary)
    }

    pub fn extract_with_stage(&self, raw: &str) -> Result<Extracted, ExtractionError> {
        // A candidate that parsed but failed validation outranks "nothing found".
        let mut first_mismatch: Option<ExtractionError> = None;

        for (stage, candidate) in candidates(raw) {
            let value = match serde_json::from_str::<Value>(&candidate) {
                Ok(value) => value,
                Err(err) => {
                    debug!(target: "tripai::extract", stage = %stage, error = %err, "candidate did not parse");
                    continue;
                }
            };

            match self.validator.validate(&value) {
                Ok(itinerary) => {
                    debug!(target: "tripai::extract", stage = %stage, days = itinerary.daily_plans.len(), "itinerary recovered");
                    return Ok(Extracted { itinerary, stage });
                }
                Err(err) => {
                    debug!(target: "tripai::extract", stage = %stage, error = %err, "candidate rejected");
                    first_mismatch.get_or_insert(err);
                }
            }
        }

        Err(first_mismatch.unwrap_or(ExtractionError::NoStructuredContent))
    }
}

/// Extract an itinerary with minimal validation.
pub fn extract(raw: &str) -> Result<ItineraryResult, ExtractionError> {
    Extractor::new().extract(raw)
}

fn candidates(raw: &str) -> Vec<(ExtractionStage, Cow<'_, str>)> {
    let mut candidates = vec![(ExtractionStage::Direct, Cow::Borrowed(raw))];

    if let Some(fragment) = locate_fragment(raw) {
        candidates.push((ExtractionStage::Embedded, Cow::Borrowed(fragment)));
        candidates.push((ExtractionStage::Normalized, Cow::Owned(normalize(fragment))));
    }

    candidates
}

/// Greedy span from the leftmost `{` or `[` to the last matching closer in the text.
pub(crate) fn locate_fragment(raw: &str) -> Option<&str> {
    FRAGMENT_PATTERN.find(raw).map(|found| found.as_str())
}

pub(crate) fn normalize(fragment: &str) -> String {
    let replaced: String = fragment
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\n' => ' ',
            other => other,
        })
        .collect();

    WHITESPACE_RUN.replace_all(&replaced, " ").into_owned()
}
