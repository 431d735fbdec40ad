//! Conversion schedule
//!
//! Which conversion rate is active on which day. Periods may touch but not
//! overlap, so at most one rule answers for any date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::date_range::DateRange;
use super::error::DomainError;
use super::points::ConversionRate;

/// A conversion rate and the days it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRule {
    pub rate: ConversionRate,
    pub period: DateRange,
}

impl ConversionRule {
    pub fn new(rate: ConversionRate, period: DateRange) -> Self {
        Self { rate, period }
    }

    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.period.contains(date)
    }
}

/// Non-overlapping set of conversion rules, ordered by start date.
///
/// Serialized as the plain list of rules; deserializing re-checks overlaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ConversionRule>", into = "Vec<ConversionRule>")]
pub struct ConversionSchedule {
    rules: Vec<ConversionRule>,
}

impl TryFrom<Vec<ConversionRule>> for ConversionSchedule {
    type Error = DomainError;

    fn try_from(rules: Vec<ConversionRule>) -> Result<Self, Self::Error> {
        let mut schedule = Self::new();
        for rule in rules {
            schedule.insert(rule)?;
        }
        Ok(schedule)
    }
}

impl From<ConversionSchedule> for Vec<ConversionRule> {
    fn from(schedule: ConversionSchedule) -> Self {
        schedule.rules
    }
}

impl ConversionSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule.
    ///
    /// # Errors
    /// - `DomainError::OverlappingConversionRule` if its period overlaps an
    ///   existing rule's period
    pub fn insert(&mut self, rule: ConversionRule) -> Result<(), DomainError> {
        if self.rules.iter().any(|r| r.period.overlaps(&rule.period)) {
            return Err(DomainError::OverlappingConversionRule {
                start: rule.period.start(),
                end: rule.period.end(),
            });
        }

        let at = self
            .rules
            .partition_point(|r| r.period.start() <= rule.period.start());
        self.rules.insert(at, rule);
        Ok(())
    }

    /// Rate active on `date`.
    ///
    /// When two rules share a boundary day, the later rule wins that day.
    pub fn rate_on(&self, date: NaiveDate) -> Option<ConversionRate> {
        self.rules
            .iter()
            .rev()
            .find(|r| r.applies_on(date))
            .map(|r| r.rate)
    }

    pub fn rules(&self) -> &[ConversionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
