//! Platform, feature and complexity multipliers.
//!
//! The three multipliers are combined by product and applied to the primary
//! match's hours and cost.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::estimation::features::{Complexity, Platform, ProjectFeatureRecord};
use crate::estimation::round_whole;

/// How overlapping platform rules are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RulePrecedence {
    /// Rules are evaluated top to bottom and the last matching rule wins.
    ///
    /// This is how quotes have always been priced: web plus both mobile
    /// platforms ends at 1.4 even though both-mobile alone is 1.5. That
    /// looks unintended, but changing it would change every such quote.
    #[default]
    LastMatchWins,
    /// The first matching rule wins.
    FirstMatchWins,
}

/// A platform combination and the multiplier it earns.
#[derive(Debug, Clone, Copy)]
pub struct PlatformRule {
    pub name: &'static str,
    pub applies: fn(&BTreeSet<Platform>) -> bool,
    pub multiplier: Decimal,
}

/// Feature tags that add a fixed increment to the feature multiplier.
///
/// Aliases within one rule count once.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRule {
    pub tags: &'static [&'static str],
    pub increment: Decimal,
}

/// The composed multipliers for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Multipliers {
    #[serde(with = "rust_decimal::serde::float")]
    pub platform: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub feature: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub complexity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// Platform rule that set the platform multiplier, if any.
    pub platform_rule: Option<&'static str>,
}

impl Multipliers {
    /// Scale a whole-unit quantity by the total multiplier.
    pub fn scale(&self, value: u64) -> u64 {
        round_whole(Decimal::from(value) * self.total)
    }
}

fn both_mobile(p: &BTreeSet<Platform>) -> bool {
    p.contains(&Platform::MobileIos) && p.contains(&Platform::MobileAndroid)
}

fn single_mobile(p: &BTreeSet<Platform>) -> bool {
    p.contains(&Platform::MobileIos) != p.contains(&Platform::MobileAndroid)
}

fn web_with_mobile(p: &BTreeSet<Platform>) -> bool {
    p.contains(&Platform::Web)
        && (p.contains(&Platform::MobileIos) || p.contains(&Platform::MobileAndroid))
}

/// Multiplier rules and lookup tables.
#[derive(Debug, Clone)]
pub struct MultiplierTable {
    platform_rules: Vec<PlatformRule>,
    precedence: RulePrecedence,
    feature_rules: Vec<FeatureRule>,
}

impl MultiplierTable {
    pub fn new(
        platform_rules: Vec<PlatformRule>,
        precedence: RulePrecedence,
        feature_rules: Vec<FeatureRule>,
    ) -> Self {
        Self {
            platform_rules,
            precedence,
            feature_rules,
        }
    }

    pub fn with_precedence(mut self, precedence: RulePrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn precedence(&self) -> RulePrecedence {
        self.precedence
    }

    /// Platform multiplier and the rule that produced it. No matching rule
    /// means 1.0.
    pub fn platform_multiplier(
        &self,
        platforms: &BTreeSet<Platform>,
    ) -> (Decimal, Option<&'static str>) {
        let mut matching = self
            .platform_rules
            .iter()
            .filter(|r| (r.applies)(platforms));
        let rule = match self.precedence {
            RulePrecedence::LastMatchWins => matching.last(),
            RulePrecedence::FirstMatchWins => matching.next(),
        };
        match rule {
            Some(rule) => (rule.multiplier, Some(rule.name)),
            None => (Decimal::ONE, None),
        }
    }

    /// 1.0 plus the increment of every feature rule the record hits.
    pub fn feature_multiplier(&self, features: &BTreeSet<String>) -> Decimal {
        self.feature_rules
            .iter()
            .filter(|rule| rule.tags.iter().any(|tag| features.contains(*tag)))
            .fold(Decimal::ONE, |acc, rule| acc + rule.increment)
    }

    pub fn complexity_multiplier(&self, complexity: Complexity) -> Decimal {
        match complexity {
            Complexity::Simple => dec!(0.8),
            Complexity::Medium => dec!(1.0),
            Complexity::Complex => dec!(1.3),
            Complexity::Enterprise => dec!(1.6),
            Complexity::Unknown => dec!(1.0),
        }
    }

    /// Compose all three multipliers for a record.
    pub fn compose(&self, record: &ProjectFeatureRecord) -> Multipliers {
        let (platform, platform_rule) = self.platform_multiplier(&record.platforms);
        let feature = self.feature_multiplier(&record.features);
        let complexity = self.complexity_multiplier(record.complexity);

        Multipliers {
            platform,
            feature,
            complexity,
            total: platform * feature * complexity,
            platform_rule,
        }
    }
}

impl Default for MultiplierTable {
    fn default() -> Self {
        Self {
            platform_rules: vec![
                PlatformRule {
                    name: "both-mobile",
                    applies: both_mobile,
                    multiplier: dec!(1.5),
                },
                PlatformRule {
                    name: "single-mobile",
                    applies: single_mobile,
                    multiplier: dec!(1.3),
                },
                PlatformRule {
                    name: "web-with-mobile",
                    applies: web_with_mobile,
                    multiplier: dec!(1.4),
                },
            ],
            precedence: RulePrecedence::LastMatchWins,
            feature_rules: vec![
                FeatureRule {
                    tags: &["ecommerce"],
                    increment: dec!(0.30),
                },
                FeatureRule {
                    tags: &["ai", "ai-filtering"],
                    increment: dec!(0.20),
                },
                FeatureRule {
                    tags: &["user-auth"],
                    increment: dec!(0.10),
                },
                FeatureRule {
                    tags: &["payments"],
                    increment: dec!(0.20),
                },
                FeatureRule {
                    tags: &["dashboard"],
                    increment: dec!(0.20),
                },
                FeatureRule {
                    tags: &["reports"],
                    increment: dec!(0.15),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platforms(list: &[Platform]) -> BTreeSet<Platform> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_platform_tiers() {
        let table = MultiplierTable::default();
        let cases = [
            (vec![], dec!(1.0), None),
            (vec![Platform::Web], dec!(1.0), None),
            (vec![Platform::Desktop], dec!(1.0), None),
            (vec![Platform::MobileIos], dec!(1.3), Some("single-mobile")),
            (vec![Platform::MobileAndroid], dec!(1.3), Some("single-mobile")),
            (
                vec![Platform::MobileIos, Platform::MobileAndroid],
                dec!(1.5),
                Some("both-mobile"),
            ),
            (
                vec![Platform::Web, Platform::MobileIos],
                dec!(1.4),
                Some("web-with-mobile"),
            ),
        ];
        for (list, expected, rule) in cases {
            let (multiplier, applied) = table.platform_multiplier(&platforms(&list));
            assert_eq!(multiplier, expected, "{:?}", list);
            assert_eq!(applied, rule, "{:?}", list);
        }
    }

    #[test]
    fn test_web_plus_both_mobile_last_match_wins() {
        let table = MultiplierTable::default();
        let all = platforms(&[Platform::Web, Platform::MobileIos, Platform::MobileAndroid]);
        assert_eq!(table.precedence(), RulePrecedence::LastMatchWins);
        assert_eq!(
            table.platform_multiplier(&all),
            (dec!(1.4), Some("web-with-mobile"))
        );
    }

    #[test]
    fn test_first_match_wins_policy() {
        let table = MultiplierTable::default().with_precedence(RulePrecedence::FirstMatchWins);
        let all = platforms(&[Platform::Web, Platform::MobileIos, Platform::MobileAndroid]);
        assert_eq!(
            table.platform_multiplier(&all),
            (dec!(1.5), Some("both-mobile"))
        );
        let one = platforms(&[Platform::Web, Platform::MobileIos]);
        assert_eq!(
            table.platform_multiplier(&one),
            (dec!(1.3), Some("single-mobile"))
        );
    }

    #[test]
    fn test_feature_increments_are_additive() {
        let table = MultiplierTable::default();
        let features = |tags: &[&str]| {
            tags.iter()
                .map(|t| t.to_string())
                .collect::<BTreeSet<String>>()
        };

        assert_eq!(table.feature_multiplier(&features(&[])), dec!(1.0));
        assert_eq!(table.feature_multiplier(&features(&["ecommerce"])), dec!(1.30));
        assert_eq!(table.feature_multiplier(&features(&["unknown-tag"])), dec!(1.0));
        assert_eq!(
            table.feature_multiplier(&features(&[
                "ecommerce",
                "ai",
                "user-auth",
                "payments",
                "dashboard",
                "reports"
            ])),
            dec!(2.15)
        );
    }

    #[test]
    fn test_ai_aliases_count_once() {
        let table = MultiplierTable::default();
        let both: BTreeSet<String> = ["ai", "ai-filtering"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(table.feature_multiplier(&both), dec!(1.20));
    }

    #[test]
    fn test_complexity_lookup() {
        let table = MultiplierTable::default();
        assert_eq!(table.complexity_multiplier(Complexity::Simple), dec!(0.8));
        assert_eq!(table.complexity_multiplier(Complexity::Medium), dec!(1.0));
        assert_eq!(table.complexity_multiplier(Complexity::Complex), dec!(1.3));
        assert_eq!(table.complexity_multiplier(Complexity::Enterprise), dec!(1.6));
        assert_eq!(table.complexity_multiplier(Complexity::Unknown), dec!(1.0));
    }

    #[test]
    fn test_web_ecommerce_medium() {
        let record = ProjectFeatureRecord::new(Complexity::Medium)
            .with_platform(Platform::Web)
            .with_feature("ecommerce");
        let m = MultiplierTable::default().compose(&record);
        assert_eq!(m.platform, dec!(1.0));
        assert_eq!(m.feature, dec!(1.30));
        assert_eq!(m.complexity, dec!(1.0));
        assert_eq!(m.total, dec!(1.30));
        assert_eq!(m.scale(500), 650);
    }

    #[test]
    fn test_web_and_both_mobile_enterprise() {
        let record = ProjectFeatureRecord::new(Complexity::Enterprise)
            .with_platform(Platform::Web)
            .with_platform(Platform::MobileIos)
            .with_platform(Platform::MobileAndroid);
        let m = MultiplierTable::default().compose(&record);
        assert_eq!(m.platform, dec!(1.4));
        assert_eq!(m.complexity, dec!(1.6));
        assert_eq!(m.total, dec!(2.24));
    }

    #[test]
    fn test_total_is_exact_product() {
        let table = MultiplierTable::default();
        let records = [
            ProjectFeatureRecord::default(),
            ProjectFeatureRecord::new(Complexity::Simple).with_platform(Platform::MobileIos),
            ProjectFeatureRecord::new(Complexity::Complex)
                .with_platform(Platform::MobileIos)
                .with_platform(Platform::MobileAndroid)
                .with_feature("reports")
                .with_feature("ai-filtering"),
            ProjectFeatureRecord::new(Complexity::Unknown).with_feature("payments"),
        ];
        for record in &records {
            let m = table.compose(record);
            assert_eq!(m.total, m.platform * m.feature * m.complexity);
            assert!(m.total > Decimal::ZERO);
        }
    }

    #[test]
    fn test_scale_rounds_half_up() {
        let record = ProjectFeatureRecord::new(Complexity::Complex);
        let m = MultiplierTable::default().compose(&record);
        assert_eq!(m.total, dec!(1.3));
        // 6.5 and 19.5 both round away from zero
        assert_eq!(m.scale(5), 7);
        assert_eq!(m.scale(15), 20);
        assert_eq!(m.scale(0), 0);
    }
}
