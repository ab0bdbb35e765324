//! Catalog of completed projects that new estimates are anchored to.
//!
//! The catalog ships as a versioned JSON data file. It is loaded once at
//! start-up and never written.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::estimation::features::Platform;
use crate::estimation::phases::{Phase, PhaseDistribution, PhaseShare};
use crate::estimation::team::TeamRoster;

/// Catalog file format version this build understands.
pub const CATALOG_VERSION: u32 = 1;

const EMBEDDED_CATALOG: &str = include_str!("../../data/catalog.json");

/// A completed project with known effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalProject {
    pub key: String,
    /// Kind of project with its complexity tier embedded, e.g. `saas-complex`.
    #[serde(rename = "type")]
    pub project_type: String,
    pub platforms: BTreeSet<Platform>,
    pub features: BTreeSet<String>,
    pub total_hours: u64,
    pub total_cost: u64,
    /// Expected to add up to roughly `total_hours`.
    #[serde(default)]
    pub phase_hours: BTreeMap<Phase, u64>,
    pub timeline: String,
    pub team_size: u8,
}

/// Read-only list of historical projects, in file order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    projects: Vec<HistoricalProject>,
}

impl Catalog {
    pub fn new(projects: Vec<HistoricalProject>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[HistoricalProject] {
        &self.projects
    }

    pub fn get(&self, key: &str) -> Option<&HistoricalProject> {
        self.projects.iter().find(|p| p.key == key)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    version: u32,
    projects: Vec<HistoricalProject>,
    #[serde(default)]
    phase_distribution: Option<Vec<PhaseShare>>,
    #[serde(default)]
    team: Option<TeamRoster>,
}

/// Everything the estimator reads from the catalog file.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub catalog: Catalog,
    pub phases: PhaseDistribution,
    pub team: TeamRoster,
}

impl ReferenceData {
    /// Load from `path`, or the catalog compiled into the binary.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                let data = Self::from_json_str(&raw)?;
                tracing::info!(
                    path = %path.display(),
                    projects = data.catalog.len(),
                    "Loaded project catalog"
                );
                Ok(data)
            }
            None => Self::embedded(),
        }
    }

    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json_str(EMBEDDED_CATALOG)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        if file.version != CATALOG_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                found: file.version,
                expected: CATALOG_VERSION,
            });
        }

        for project in &file.projects {
            let phase_sum: u64 = project.phase_hours.values().sum();
            if !project.phase_hours.is_empty() && phase_sum.abs_diff(project.total_hours) > 5 {
                tracing::warn!(
                    project = %project.key,
                    phase_sum,
                    total_hours = project.total_hours,
                    "Catalog phase hours do not add up to the project total"
                );
            }
        }

        let phases = match file.phase_distribution {
            Some(shares) => PhaseDistribution::new(shares)?,
            None => PhaseDistribution::default(),
        };

        Ok(Self {
            catalog: Catalog::new(file.projects),
            phases,
            team: file.team.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_embedded_catalog_loads() {
        let data = ReferenceData::embedded().unwrap();
        assert!(!data.catalog.is_empty());
        assert!(!data.team.designers.is_empty());

        let store = data.catalog.get("fashion-store").unwrap();
        assert_eq!(store.project_type, "ecommerce-medium");
        assert!(store.platforms.contains(&Platform::Web));
        assert_eq!(store.total_hours, 500);
    }

    #[test]
    fn test_embedded_phase_hours_add_up() {
        let data = ReferenceData::embedded().unwrap();
        for project in data.catalog.projects() {
            let sum: u64 = project.phase_hours.values().sum();
            assert_eq!(sum, project.total_hours, "{}", project.key);
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version": 1, "projects": [{{
                "key": "tiny", "type": "landing-simple", "platforms": ["web"],
                "features": [], "totalHours": 80, "totalCost": 3600,
                "timeline": "2 weeks", "teamSize": 1
            }}]}}"#
        )
        .unwrap();

        let data = ReferenceData::load(Some(file.path())).unwrap();
        assert_eq!(data.catalog.len(), 1);
        assert_eq!(data.phases, PhaseDistribution::default());
        assert_eq!(data.team, TeamRoster::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReferenceData::load(Some(Path::new("/nonexistent/catalog.json"))).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = ReferenceData::from_json_str(r#"{"version": 2, "projects": []}"#).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnsupportedVersion { found: 2, .. }
        ));
    }

    #[test]
    fn test_rejects_bad_phase_distribution() {
        let raw = r#"{"version": 1, "projects": [], "phaseDistribution": [
            {"phase": "ux-research", "percentage": 50, "description": "", "priority": "high"}
        ]}"#;
        assert!(ReferenceData::from_json_str(raw).is_err());
    }

    #[test]
    fn test_empty_catalog_is_allowed() {
        let data = ReferenceData::from_json_str(r#"{"version": 1, "projects": []}"#).unwrap();
        assert!(data.catalog.is_empty());
    }
}
