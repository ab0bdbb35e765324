//! Cost, hours and timeline estimation for design projects.
//!
//! Estimates are based on:
//! - The closest completed project in the historical catalog
//! - Platform, feature and complexity multipliers
//! - An uncertainty factor that shrinks as the conversation progresses

pub mod catalog;
pub mod extractor;
pub mod features;
pub mod multiplier;
pub mod phases;
pub mod similarity;
pub mod team;
pub mod uncertainty;

pub use catalog::{Catalog, HistoricalProject, ReferenceData};
pub use extractor::{Extraction, ExtractionSource, FeatureExtractor};
pub use features::{Complexity, Platform, ProjectFeatureRecord};
pub use multiplier::{MultiplierTable, Multipliers, RulePrecedence};
pub use phases::{Phase, PhaseAllocation, PhaseDistribution};
pub use team::{TeamAssignment, TeamRoster};
pub use uncertainty::{Confidence, Range};

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::conversation::ConversationStep;
use crate::estimation::uncertainty::{Baseline, apply_uncertainty};

/// Shown while there is not enough conversation to estimate.
pub const PLACEHOLDER_TIMELINE: &str = "Determining...";

/// Hours used when no catalog project resembles the request.
pub const FALLBACK_HOURS: Range = Range { min: 100, max: 200 };
/// Cost used when no catalog project resembles the request.
pub const FALLBACK_COST: Range = Range {
    min: 2_250,
    max: 4_500,
};

/// Number of similar projects reported in the analysis.
const SIMILAR_PROJECTS_REPORTED: usize = 3;

/// Round to a whole unit, halves away from zero. Negative values clamp to 0.
pub(crate) fn round_whole(value: Decimal) -> u64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0)
}

/// Format a whole amount with thousands separators, e.g. `$29,250`.
pub fn format_money(amount: u64, currency: &str) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match currency {
        "USD" => format!("${}", grouped),
        "EUR" => format!("€{}", grouped),
        "GBP" => format!("£{}", grouped),
        other => format!("{} {}", grouped, other),
    }
}

/// The estimate shown next to the conversation.
///
/// Built fresh on every qualifying turn and never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEstimate {
    /// Cost band, narrowed for display.
    pub current_range: Range,
    /// Work-hours band.
    pub initial_range: Range,
    pub currency: String,
    pub confidence: Confidence,
    pub timeline: String,
    pub team: TeamAssignment,
    /// One display line per phase.
    pub phases: BTreeMap<Phase, String>,
    pub accuracy_percentage: u8,
    pub phase_details: Vec<PhaseAllocation>,
    pub step: ConversationStep,
}

/// A catalog project as reported in the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarProject {
    pub key: String,
    #[serde(rename = "type")]
    pub project_type: String,
    pub score: u32,
    pub breakdown: similarity::ScoreBreakdown,
}

/// How an estimate was reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateAnalysis {
    pub multipliers: Multipliers,
    pub similar_projects: Vec<SimilarProject>,
    pub reasoning: String,
    /// Key of the project the numbers are anchored to.
    pub primary_match: Option<String>,
    /// Baseline after multipliers, before uncertainty.
    pub baseline_hours: u64,
    pub baseline_cost: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub uncertainty_factor: Decimal,
    /// The primary match's own phase hours after multipliers and uncertainty.
    pub adjusted_phases: BTreeMap<Phase, u64>,
    /// True when no catalog project matched and fixed numbers were used.
    pub fallback: bool,
}

/// Estimate plus the analysis behind it. The analysis is absent for the
/// placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateReport {
    pub estimate: ProjectEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<EstimateAnalysis>,
}

/// Turns a feature record into an estimate.
///
/// Holds only immutable reference data, so one instance can serve any number
/// of concurrent requests.
#[derive(Debug, Clone)]
pub struct Estimator {
    reference: Arc<ReferenceData>,
    multipliers: MultiplierTable,
    currency: String,
}

impl Estimator {
    pub fn new(reference: Arc<ReferenceData>, currency: impl Into<String>) -> Self {
        Self {
            reference,
            multipliers: MultiplierTable::default(),
            currency: currency.into(),
        }
    }

    /// Replace the multiplier table.
    pub fn with_multipliers(mut self, multipliers: MultiplierTable) -> Self {
        self.multipliers = multipliers;
        self
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Estimate `record` at conversation `step`.
    ///
    /// Below step 2 the pipeline is skipped and the placeholder returned.
    pub fn estimate(&self, record: &ProjectFeatureRecord, step: ConversationStep) -> EstimateReport {
        if !step.is_estimable() {
            return EstimateReport {
                estimate: self.placeholder(step),
                analysis: None,
            };
        }

        let multipliers = self.multipliers.compose(record);
        let ranking = similarity::rank(record, self.reference.catalog.projects());
        let similar_projects: Vec<SimilarProject> = ranking
            .iter()
            .take(SIMILAR_PROJECTS_REPORTED)
            .map(|s| SimilarProject {
                key: s.project.key.clone(),
                project_type: s.project.project_type.clone(),
                score: s.score,
                breakdown: s.breakdown.clone(),
            })
            .collect();

        let Some(primary) = similarity::primary_match(&ranking) else {
            tracing::debug!(
                catalog_size = ranking.len(),
                "No catalog project matched, using fallback baseline"
            );
            return self.fallback(step, multipliers, similar_projects);
        };
        let project = primary.project;

        let baseline = Baseline {
            hours: multipliers.scale(project.total_hours),
            cost: multipliers.scale(project.total_cost),
            phase_hours: project
                .phase_hours
                .iter()
                .map(|(phase, hours)| (*phase, multipliers.scale(*hours)))
                .collect(),
            timeline: project.timeline.clone(),
            team_size: project.team_size,
        };
        let outcome = apply_uncertainty(&baseline, step);

        let phase_details = self
            .reference
            .phases
            .allocate(outcome.adjusted_hours, outcome.adjusted_cost);

        let reasoning = format!(
            "Anchored to {} ({}, similarity {}) at {} hours. Multipliers: platform x{}, \
             features x{}, complexity x{}, total x{}. Conversation step {} applies \
             uncertainty x{}.",
            project.key,
            project.project_type,
            primary.score,
            project.total_hours,
            multipliers.platform.normalize(),
            multipliers.feature.normalize(),
            multipliers.complexity.normalize(),
            multipliers.total.normalize(),
            step,
            outcome.factor.normalize(),
        );

        tracing::debug!(
            primary_match = %project.key,
            score = primary.score,
            total_multiplier = %multipliers.total,
            step = step.value(),
            hours = outcome.adjusted_hours,
            "Estimated project"
        );

        EstimateReport {
            estimate: ProjectEstimate {
                current_range: outcome.cost_range,
                initial_range: outcome.hours_range,
                currency: self.currency.clone(),
                confidence: outcome.confidence,
                timeline: outcome.timeline,
                team: self.reference.team.assign(outcome.team_size as usize),
                phases: self.phase_lines(&phase_details),
                accuracy_percentage: outcome.accuracy_percentage,
                phase_details,
                step,
            },
            analysis: Some(EstimateAnalysis {
                multipliers,
                similar_projects,
                reasoning,
                primary_match: Some(project.key.clone()),
                baseline_hours: baseline.hours,
                baseline_cost: baseline.cost,
                uncertainty_factor: outcome.factor,
                adjusted_phases: outcome.adjusted_phases,
                fallback: false,
            }),
        }
    }

    /// The all-zero estimate shown until the conversation is long enough.
    pub fn placeholder(&self, step: ConversationStep) -> ProjectEstimate {
        ProjectEstimate {
            current_range: Range::ZERO,
            initial_range: Range::ZERO,
            currency: self.currency.clone(),
            confidence: Confidence::Low,
            timeline: PLACEHOLDER_TIMELINE.to_string(),
            team: self.reference.team.assign(0),
            phases: Phase::ALL
                .iter()
                .map(|phase| (*phase, PLACEHOLDER_TIMELINE.to_string()))
                .collect(),
            accuracy_percentage: 0,
            phase_details: Vec::new(),
            step,
        }
    }

    fn fallback(
        &self,
        step: ConversationStep,
        multipliers: Multipliers,
        similar_projects: Vec<SimilarProject>,
    ) -> EstimateReport {
        let phase_details = self
            .reference
            .phases
            .allocate(FALLBACK_HOURS.max, FALLBACK_COST.max);
        let adjusted_phases = phase_details.iter().map(|a| (a.phase, a.hours)).collect();

        EstimateReport {
            estimate: ProjectEstimate {
                current_range: FALLBACK_COST,
                initial_range: FALLBACK_HOURS,
                currency: self.currency.clone(),
                confidence: Confidence::Low,
                timeline: uncertainty::EARLY_TIMELINE.to_string(),
                team: self
                    .reference
                    .team
                    .assign(uncertainty::EARLY_TEAM_SIZE as usize),
                phases: self.phase_lines(&phase_details),
                accuracy_percentage: uncertainty::accuracy_percentage(ConversationStep::new(2)),
                phase_details,
                step,
            },
            analysis: Some(EstimateAnalysis {
                multipliers,
                similar_projects,
                reasoning: "No similar project in the catalog. Using the default range for a \
                            small engagement until more details are known."
                    .to_string(),
                primary_match: None,
                baseline_hours: FALLBACK_HOURS.min,
                baseline_cost: FALLBACK_COST.min,
                uncertainty_factor: Decimal::ONE,
                adjusted_phases,
                fallback: true,
            }),
        }
    }

    fn phase_lines(&self, allocations: &[PhaseAllocation]) -> BTreeMap<Phase, String> {
        allocations
            .iter()
            .map(|a| {
                let line = format!(
                    "{} hours ({})",
                    a.hours,
                    format_money(a.cost, &self.currency)
                );
                (a.phase, line)
            })
            .collect()
    }
}
