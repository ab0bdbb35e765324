//! Splits an estimate across the five design-process phases.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::estimation::round_whole;

/// A design-process stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    UxResearch,
    UiDesign,
    Prototyping,
    DesignSystem,
    MobileAdaptive,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::UxResearch,
        Phase::UiDesign,
        Phase::Prototyping,
        Phase::DesignSystem,
        Phase::MobileAdaptive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::UxResearch => "ux-research",
            Phase::UiDesign => "ui-design",
            Phase::Prototyping => "prototyping",
            Phase::DesignSystem => "design-system",
            Phase::MobileAdaptive => "mobile-adaptive",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display priority of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhasePriority {
    High,
    Medium,
}

/// One row of the phase distribution table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseShare {
    pub phase: Phase,
    /// Share of the total, in percent.
    pub percentage: Decimal,
    pub description: String,
    pub priority: PhasePriority,
}

/// Hours and cost assigned to one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseAllocation {
    pub phase: Phase,
    pub hours: u64,
    pub cost: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    pub description: String,
    pub priority: PhasePriority,
}

/// Percentage table used to split totals across phases.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDistribution {
    shares: Vec<PhaseShare>,
}

impl PhaseDistribution {
    /// Build a distribution. Every phase must appear exactly once and the
    /// shares must add up to 100%.
    pub fn new(shares: Vec<PhaseShare>) -> Result<Self, CatalogError> {
        for phase in Phase::ALL {
            let count = shares.iter().filter(|s| s.phase == phase).count();
            if count != 1 {
                return Err(CatalogError::MissingPhase(phase.to_string()));
            }
        }

        let total: Decimal = shares.iter().map(|s| s.percentage).sum();
        if total != dec!(100) {
            return Err(CatalogError::PhaseShareSum {
                total: total.normalize().to_string(),
            });
        }

        Ok(Self { shares })
    }

    pub fn shares(&self) -> &[PhaseShare] {
        &self.shares
    }

    pub fn share(&self, phase: Phase) -> Option<&PhaseShare> {
        self.shares.iter().find(|s| s.phase == phase)
    }

    /// Split totals by percentage. Each phase is rounded on its own, so the
    /// parts may drift a few units from the totals.
    pub fn allocate(&self, total_hours: u64, total_cost: u64) -> Vec<PhaseAllocation> {
        let hours = Decimal::from(total_hours);
        let cost = Decimal::from(total_cost);

        self.shares
            .iter()
            .map(|share| {
                let fraction = share.percentage / dec!(100);
                PhaseAllocation {
                    phase: share.phase,
                    hours: round_whole(hours * fraction),
                    cost: round_whole(cost * fraction),
                    percentage: share.percentage,
                    description: share.description.clone(),
                    priority: share.priority,
                }
            })
            .collect()
    }
}

impl Default for PhaseDistribution {
    fn default() -> Self {
        let row = |phase, percentage, description: &str, priority| PhaseShare {
            phase,
            percentage,
            description: description.to_string(),
            priority,
        };
        Self {
            shares: vec![
                row(
                    Phase::UxResearch,
                    dec!(15),
                    "User interviews, competitor analysis and user flows",
                    PhasePriority::High,
                ),
                row(
                    Phase::UiDesign,
                    dec!(35),
                    "Visual design of all key screens",
                    PhasePriority::High,
                ),
                row(
                    Phase::Prototyping,
                    dec!(15),
                    "Clickable prototype for testing and hand-off",
                    PhasePriority::Medium,
                ),
                row(
                    Phase::DesignSystem,
                    dec!(20),
                    "Component library, tokens and usage guidelines",
                    PhasePriority::Medium,
                ),
                row(
                    Phase::MobileAdaptive,
                    dec!(15),
                    "Responsive and mobile layouts",
                    PhasePriority::Medium,
                ),
            ],
        }
    }
}
