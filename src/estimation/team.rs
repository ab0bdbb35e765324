//! Designers offered with an estimate.

use serde::{Deserialize, Serialize};

/// A designer in the agency roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
}

/// The roster an estimate draws its team from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoster {
    pub designers: Vec<TeamMember>,
    pub contact_person: String,
    pub contact_email: String,
}

/// Team proposed in an estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssignment {
    pub designers: Vec<TeamMember>,
    pub contact_person: String,
    pub contact_email: String,
}

impl TeamRoster {
    /// The first `size` designers plus the contact person.
    pub fn assign(&self, size: usize) -> TeamAssignment {
        TeamAssignment {
            designers: self.designers.iter().take(size).cloned().collect(),
            contact_person: self.contact_person.clone(),
            contact_email: self.contact_email.clone(),
        }
    }
}

impl Default for TeamRoster {
    fn default() -> Self {
        Self {
            designers: Vec::new(),
            contact_person: "Project desk".to_string(),
            contact_email: "hello@example.com".to_string(),
        }
    }
}
