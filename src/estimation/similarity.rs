//! Ranks historical projects by similarity to a new request.

use serde::Serialize;

use crate::estimation::catalog::HistoricalProject;
use crate::estimation::features::ProjectFeatureRecord;

/// Awarded once if any requested platform overlaps the candidate's.
pub const PLATFORM_OVERLAP_POINTS: u32 = 30;
/// Awarded per shared feature tag.
pub const SHARED_FEATURE_POINTS: u32 = 10;
/// Awarded when the candidate type carries the requested complexity tier.
pub const COMPLEXITY_MATCH_POINTS: u32 = 20;

/// How a score was earned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub platform_overlap: bool,
    pub shared_features: Vec<String>,
    pub complexity_match: bool,
}

/// Similarity of one catalog project to the request.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityScore<'a> {
    pub score: u32,
    pub breakdown: ScoreBreakdown,
    pub project: &'a HistoricalProject,
}

impl SimilarityScore<'_> {
    pub fn project_key(&self) -> &str {
        &self.project.key
    }
}

/// Score one candidate.
pub fn score(record: &ProjectFeatureRecord, project: &HistoricalProject) -> (u32, ScoreBreakdown) {
    let platform_overlap = record
        .platforms
        .iter()
        .any(|p| project.platforms.contains(p));

    let shared_features: Vec<String> = record
        .features
        .intersection(&project.features)
        .cloned()
        .collect();

    let complexity_match = record
        .complexity
        .label()
        .is_some_and(|tier| project.project_type.to_lowercase().contains(tier));

    let mut points = 0;
    if platform_overlap {
        points += PLATFORM_OVERLAP_POINTS;
    }
    points += SHARED_FEATURE_POINTS * shared_features.len() as u32;
    if complexity_match {
        points += COMPLEXITY_MATCH_POINTS;
    }

    (
        points,
        ScoreBreakdown {
            platform_overlap,
            shared_features,
            complexity_match,
        },
    )
}

/// Rank every catalog project, best first.
///
/// Nothing is filtered out, zero scores included. Ties keep catalog order.
pub fn rank<'a>(
    record: &ProjectFeatureRecord,
    catalog: &'a [HistoricalProject],
) -> Vec<SimilarityScore<'a>> {
    let mut ranking: Vec<SimilarityScore<'a>> = catalog
        .iter()
        .map(|project| {
            let (score, breakdown) = score(record, project);
            SimilarityScore {
                score,
                breakdown,
                project,
            }
        })
        .collect();

    // sort_by is stable, which gives the catalog-order tie break.
    ranking.sort_by(|a, b| b.score.cmp(&a.score));
    ranking
}

/// First ranked project with a positive score.
pub fn primary_match<'r, 'a>(
    ranking: &'r [SimilarityScore<'a>],
) -> Option<&'r SimilarityScore<'a>> {
    ranking.first().filter(|top| top.score > 0)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::estimation::features::{Complexity, Platform};

    fn project(
        key: &str,
        kind: &str,
        platforms: &[Platform],
        features: &[&str],
    ) -> HistoricalProject {
        HistoricalProject {
            key: key.to_string(),
            project_type: kind.to_string(),
            platforms: platforms.iter().copied().collect(),
            features: features.iter().map(|f| f.to_string()).collect(),
            total_hours: 100,
            total_cost: 4500,
            phase_hours: BTreeMap::new(),
            timeline: "4 weeks".to_string(),
            team_size: 1,
        }
    }

    #[test]
    fn test_score_components() {
        let record = ProjectFeatureRecord::new(Complexity::Medium)
            .with_platform(Platform::Web)
            .with_platform(Platform::MobileIos)
            .with_feature("ecommerce")
            .with_feature("payments")
            .with_feature("reports");
        let candidate = project(
            "shop",
            "ecommerce-medium",
            &[Platform::Web],
            &["ecommerce", "payments", "user-auth"],
        );

        let (points, breakdown) = score(&record, &candidate);
        assert_eq!(points, 30 + 20 + 20);
        assert!(breakdown.platform_overlap);
        assert!(breakdown.complexity_match);
        assert_eq!(breakdown.shared_features, vec!["ecommerce", "payments"]);
    }

    #[test]
    fn test_platform_overlap_is_boolean() {
        let record = ProjectFeatureRecord::new(Complexity::Unknown)
            .with_platform(Platform::Web)
            .with_platform(Platform::MobileIos)
            .with_platform(Platform::MobileAndroid);
        let candidate = project(
            "all",
            "x",
            &[Platform::Web, Platform::MobileIos, Platform::MobileAndroid],
            &[],
        );
        assert_eq!(score(&record, &candidate).0, PLATFORM_OVERLAP_POINTS);
    }

    #[test]
    fn test_feature_points_uncapped() {
        let tags = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"];
        let mut record = ProjectFeatureRecord::new(Complexity::Unknown);
        for tag in tags {
            record = record.with_feature(tag);
        }
        let candidate = project("many", "x", &[], &tags);
        assert_eq!(score(&record, &candidate).0, 120);
    }

    #[test]
    fn test_unknown_complexity_never_matches() {
        let record = ProjectFeatureRecord::new(Complexity::Unknown);
        let candidate = project("any", "unknown-medium", &[], &[]);
        assert_eq!(score(&record, &candidate).0, 0);
    }

    #[test]
    fn test_rank_orders_descending_with_stable_ties() {
        let catalog = vec![
            project("first-zero", "landing-simple", &[], &[]),
            project("tie-a", "x", &[Platform::Web], &[]),
            project("best", "shop-medium", &[Platform::Web], &["ecommerce"]),
            project("tie-b", "y", &[Platform::Web], &[]),
        ];
        let record = ProjectFeatureRecord::new(Complexity::Medium)
            .with_platform(Platform::Web)
            .with_feature("ecommerce");

        let ranking = rank(&record, &catalog);
        let keys: Vec<&str> = ranking.iter().map(|s| s.project_key()).collect();
        assert_eq!(keys, vec!["best", "tie-a", "tie-b", "first-zero"]);
        assert_eq!(ranking[0].score, 60);
        assert_eq!(ranking[3].score, 0);
    }

    #[test]
    fn test_rank_keeps_zero_scores() {
        let catalog = vec![project("a", "x", &[], &[]), project("b", "y", &[], &[])];
        let record = ProjectFeatureRecord::default();
        let ranking = rank(&record, &catalog);
        assert_eq!(ranking.len(), 2);
        assert!(ranking.iter().all(|s| s.score == 0));
        assert!(primary_match(&ranking).is_none());
    }

    #[test]
    fn test_rank_empty_catalog() {
        let ranking = rank(&ProjectFeatureRecord::default(), &[]);
        assert!(ranking.is_empty());
        assert!(primary_match(&ranking).is_none());
    }

    #[test]
    fn test_shared_features_use_normalized_tags() {
        let record = ProjectFeatureRecord::default().with_feature("User Auth");
        let candidate = project("auth", "x", &[], &["user-auth"]);
        let (_, breakdown) = score(&record, &candidate);
        assert_eq!(breakdown.shared_features, vec!["user-auth".to_string()]);
    }
}
