//! Widening and narrowing of estimates as the conversation progresses.
//!
//! Early in a conversation the baseline is scaled up by an uncertainty
//! factor and reported with coarse timelines. As the step counter grows the
//! factor falls to 1.0 and the match's own schedule is used.
//!
//! Confidence, accuracy percentage and display narrowing are each their own
//! function of the step. They are tuned independently and must not be
//! derived from one another.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationStep;
use crate::estimation::phases::Phase;
use crate::estimation::round_whole;

/// Band applied around the factor-scaled cost.
const RANGE_LOW: Decimal = dec!(0.8);
const RANGE_HIGH: Decimal = dec!(1.2);

pub const EARLY_TIMELINE: &str = "4-12 weeks";
pub const EARLY_TEAM_SIZE: u8 = 3;
pub const MIDDLE_TIMELINE: &str = "6-10 weeks";
pub const MIDDLE_TEAM_SIZE: u8 = 2;

/// Coarse confidence label shown next to an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// A min/max pair of whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    pub min: u64,
    pub max: u64,
}

impl Range {
    pub const ZERO: Range = Range { min: 0, max: 0 };

    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> u64 {
        self.max.saturating_sub(self.min)
    }

    /// Pull both ends toward the midpoint, keeping `keep` of the width.
    pub fn narrow(&self, keep: Decimal) -> Range {
        let trim = Decimal::from(self.width()) * (Decimal::ONE - keep) / dec!(2);
        Range {
            min: round_whole(Decimal::from(self.min) + trim),
            max: round_whole(Decimal::from(self.max) - trim),
        }
    }
}

/// Scaled numbers from the primary match, before uncertainty.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub hours: u64,
    pub cost: u64,
    pub phase_hours: BTreeMap<Phase, u64>,
    pub timeline: String,
    pub team_size: u8,
}

/// Baseline after the step-driven adjustments.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyOutcome {
    pub factor: Decimal,
    /// Cost band around the factor-scaled baseline.
    pub raw_cost_range: Range,
    /// `raw_cost_range` narrowed for display.
    pub cost_range: Range,
    /// Baseline hours up to factor-scaled hours.
    pub hours_range: Range,
    pub adjusted_hours: u64,
    pub adjusted_cost: u64,
    pub adjusted_phases: BTreeMap<Phase, u64>,
    pub timeline: String,
    pub team_size: u8,
    pub confidence: Confidence,
    pub accuracy_percentage: u8,
    pub range_reduction: Decimal,
}

/// Multiplicative widening for a step: 3.0, 2.0, 1.5, then 1.0 from step 5.
///
/// Steps below 2 never reach the estimator; they get the step-2 factor.
pub fn uncertainty_factor(step: ConversationStep) -> Decimal {
    match step.value() {
        0..=2 => dec!(3.0),
        3 => dec!(2.0),
        4 => dec!(1.5),
        _ => dec!(1.0),
    }
}

pub fn confidence(step: ConversationStep) -> Confidence {
    match step.value() {
        0..=2 => Confidence::Low,
        3 => Confidence::Medium,
        _ => Confidence::High,
    }
}

/// `min(95, 20 + (step - 2) * 15)`, floored at 0.
pub fn accuracy_percentage(step: ConversationStep) -> u8 {
    let raw = 20 + (i32::from(step.value()) - 2) * 15;
    raw.clamp(0, 95) as u8
}

/// Share of the range width kept for display: `max(0.1, 1 - (step - 2) * 0.15)`.
pub fn range_reduction(step: ConversationStep) -> Decimal {
    let steps_past_two = Decimal::from(step.value().saturating_sub(2));
    (Decimal::ONE - steps_past_two * dec!(0.15)).max(dec!(0.1))
}

/// Timeline and team size for a step. From step 4 the match's own values
/// are used unchanged.
pub fn schedule(step: ConversationStep, matched_timeline: &str, matched_team: u8) -> (String, u8) {
    match step.value() {
        0..=2 => (EARLY_TIMELINE.to_string(), EARLY_TEAM_SIZE),
        3 => (MIDDLE_TIMELINE.to_string(), MIDDLE_TEAM_SIZE),
        _ => (matched_timeline.to_string(), matched_team),
    }
}

/// Apply the step-driven uncertainty to a baseline.
pub fn apply_uncertainty(baseline: &Baseline, step: ConversationStep) -> UncertaintyOutcome {
    let factor = uncertainty_factor(step);
    let scaled_cost = Decimal::from(baseline.cost) * factor;

    let raw_cost_range = Range::new(
        round_whole(scaled_cost * RANGE_LOW),
        round_whole(scaled_cost * RANGE_HIGH),
    );
    let range_reduction = range_reduction(step);
    let cost_range = raw_cost_range.narrow(range_reduction);

    let adjusted_hours = round_whole(Decimal::from(baseline.hours) * factor);
    let hours_range = Range::new(baseline.hours, adjusted_hours);

    let adjusted_phases = baseline
        .phase_hours
        .iter()
        .map(|(phase, hours)| (*phase, round_whole(Decimal::from(*hours) * factor)))
        .collect();

    let (timeline, team_size) = schedule(step, &baseline.timeline, baseline.team_size);

    UncertaintyOutcome {
        factor,
        raw_cost_range,
        cost_range,
        hours_range,
        adjusted_hours,
        adjusted_cost: round_whole(scaled_cost),
        adjusted_phases,
        timeline,
        team_size,
        confidence: confidence(step),
        accuracy_percentage: accuracy_percentage(step),
        range_reduction,
    }
}
