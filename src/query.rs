//! Submission input: question, tags and publication-year window.

use crate::error::{ResearchError, Result};
use chrono::{Datelike, Local};
use serde::Serialize;
use tracing::warn;

/// Earliest selectable publication year
pub const MIN_YEAR: i32 = 1900;

/// Inclusive publication-year window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    /// Build a range; an `end` before `start` is clamped up to `start`.
    pub fn new(start: i32, end: i32) -> Self {
        if end < start {
            warn!(start, end, "End year must be greater than or equal to start year");
            return Self { start, end: start };
        }
        Self { start, end }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    /// Reject years outside [`MIN_YEAR`, current year]
    pub fn check_bounds(&self) -> Result<()> {
        let current = current_year();
        if self.start < MIN_YEAR || self.end > current {
            return Err(ResearchError::Validation(format!(
                "Year range {}-{} must lie within {}-{}",
                self.start, self.end, MIN_YEAR, current
            )));
        }
        Ok(())
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(2020, 2023)
    }
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// One validated submission
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    question: String,
    tags: Vec<String>,
    years: YearRange,
}

impl Query {
    /// Validate a submission before any external call.
    ///
    /// Tags keep the order they were selected in; repeats are dropped.
    pub fn new(question: &str, tags: &[String], years: YearRange) -> Result<Self> {
        let question = question.trim();
        let mut unique: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !unique.iter().any(|u| u == tag) {
                unique.push(tag.to_string());
            }
        }

        if question.is_empty() || unique.is_empty() {
            return Err(ResearchError::Validation(
                "Please enter a research question and select at least one sub-field before submitting."
                    .to_string(),
            ));
        }
        years.check_bounds()?;

        Ok(Self {
            question: question.to_string(),
            tags: unique,
            years,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    /// Tags joined the way prompts and templates embed them
    pub fn joined_tags(&self) -> String {
        self.tags.join(", ")
    }
}
