//! Structured project description produced from a conversation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EstimationError, ExtractionError, json_type_name};

/// Target platform of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Web,
    MobileIos,
    MobileAndroid,
    Desktop,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Web => "web",
            Platform::MobileIos => "mobile-ios",
            Platform::MobileAndroid => "mobile-android",
            Platform::Desktop => "desktop",
        }
    }

    /// Parse the canonical name only.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "web" => Some(Platform::Web),
            "mobile-ios" => Some(Platform::MobileIos),
            "mobile-android" => Some(Platform::MobileAndroid),
            "desktop" => Some(Platform::Desktop),
            _ => None,
        }
    }

    /// Parse the canonical name or a common shorthand.
    fn parse_loose(s: &str) -> Option<Self> {
        Self::parse(s).or_else(|| match s.trim().to_lowercase().as_str() {
            "ios" | "iphone" => Some(Platform::MobileIos),
            "android" => Some(Platform::MobileAndroid),
            "website" | "web-app" | "webapp" => Some(Platform::Web),
            _ => None,
        })
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complexity tier of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
    Enterprise,
    /// A tier name nobody recognised. Priced like `Medium` and never
    /// matches a catalog tier.
    #[serde(other)]
    Unknown,
}

impl Complexity {
    /// Tier label as it appears inside catalog project types.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Complexity::Simple => Some("simple"),
            Complexity::Medium => Some("medium"),
            Complexity::Complex => Some("complex"),
            Complexity::Enterprise => Some("enterprise"),
            Complexity::Unknown => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Some(Complexity::Simple),
            "medium" => Some(Complexity::Medium),
            "complex" => Some(Complexity::Complex),
            "enterprise" => Some(Complexity::Enterprise),
            _ => None,
        }
    }
}

/// What a client wants built, as understood from the conversation.
///
/// Every estimation pass derives a fresh record from the whole
/// conversation; records are never merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFeatureRecord {
    #[serde(default)]
    pub platforms: BTreeSet<Platform>,
    #[serde(default)]
    pub features: BTreeSet<String>,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub integrations: BTreeSet<String>,
    /// The oracle's own hour guess. Informational only, the multiplier
    /// engine decides the numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<Value>,
}

impl ProjectFeatureRecord {
    pub fn new(complexity: Complexity) -> Self {
        Self {
            complexity,
            ..Self::default()
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platforms.insert(platform);
        self
    }

    pub fn with_feature(mut self, feature: impl AsRef<str>) -> Self {
        self.features.insert(normalize_tag(feature.as_ref()));
        self
    }

    pub fn with_business_type(mut self, business_type: impl Into<String>) -> Self {
        self.business_type = business_type.into();
        self
    }

    pub fn has_platform(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    pub fn has_feature(&self, tag: &str) -> bool {
        self.features.contains(tag)
    }

    /// Validate an oracle reply against the exact record schema.
    ///
    /// All five keys must be present with the right types, and platform and
    /// complexity values must come from the allowed sets.
    pub fn from_oracle_value(value: &Value) -> Result<Self, ExtractionError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ExtractionError::NotAnObject(json_type_name(value)))?;

        let mut platforms = BTreeSet::new();
        for raw in strict_string_array(obj, "platforms")? {
            let platform = Platform::parse(raw).ok_or_else(|| ExtractionError::InvalidValue {
                field: "platforms",
                value: raw.to_string(),
            })?;
            platforms.insert(platform);
        }

        let features = strict_string_array(obj, "features")?
            .into_iter()
            .map(normalize_tag)
            .filter(|tag| !tag.is_empty())
            .collect();

        let raw_complexity = strict_string(obj, "complexity")?;
        let complexity =
            Complexity::parse(raw_complexity).ok_or_else(|| ExtractionError::InvalidValue {
                field: "complexity",
                value: raw_complexity.to_string(),
            })?;

        let business_type = strict_string(obj, "businessType")?.trim().to_string();

        let integrations = strict_string_array(obj, "integrations")?
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            platforms,
            features,
            complexity,
            business_type,
            integrations,
            estimated_hours: obj.get("estimatedHours").cloned(),
        })
    }

    /// Accept a record from an API caller.
    ///
    /// Only a non-object is rejected. Missing or ill-typed fields take their
    /// defaults, unknown platforms are dropped and an unknown complexity is
    /// kept as [`Complexity::Unknown`].
    pub fn from_request_value(value: &Value) -> Result<Self, EstimationError> {
        let obj = value.as_object().ok_or(EstimationError::NotAnObject {
            field: "analysis",
            found: json_type_name(value),
        })?;

        let platforms = loose_string_array(obj, "platforms")
            .filter_map(|raw| {
                let platform = Platform::parse_loose(raw);
                if platform.is_none() {
                    tracing::debug!(platform = raw, "Ignoring unknown platform");
                }
                platform
            })
            .collect();

        let features = loose_string_array(obj, "features")
            .map(normalize_tag)
            .filter(|tag| !tag.is_empty())
            .collect();

        let complexity = match obj.get("complexity").and_then(Value::as_str) {
            Some(raw) => Complexity::parse(raw).unwrap_or_else(|| {
                tracing::debug!(complexity = raw, "Unknown complexity, pricing as medium");
                Complexity::Unknown
            }),
            None => Complexity::Medium,
        };

        let business_type = obj
            .get("businessType")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let integrations = loose_string_array(obj, "integrations")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            platforms,
            features,
            complexity,
            business_type,
            integrations,
            estimated_hours: obj.get("estimatedHours").cloned(),
        })
    }
}

/// Parse an oracle reply: locate the first JSON object and validate it.
pub fn parse_feature_record(text: &str) -> Result<ProjectFeatureRecord, ExtractionError> {
    let json = extract_json_object(text).ok_or(ExtractionError::NoJsonObject)?;
    let value: Value = serde_json::from_str(json)?;
    ProjectFeatureRecord::from_oracle_value(&value)
}

/// Find the first balanced `{...}` in text that may wrap it in prose.
///
/// Braces inside string literals are not counted.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset;
                    return Some(&text[start..=end]);
                }
            }
            _ => {}
        }
    }

    None
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace([' ', '_'], "-")
}

fn strict_string<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ExtractionError> {
    let value = obj.get(field).ok_or(ExtractionError::MissingField(field))?;
    value.as_str().ok_or_else(|| ExtractionError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn strict_string_array<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Vec<&'a str>, ExtractionError> {
    let value = obj.get(field).ok_or(ExtractionError::MissingField(field))?;
    let items = value.as_array().ok_or_else(|| ExtractionError::InvalidValue {
        field,
        value: value.to_string(),
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().ok_or_else(|| ExtractionError::InvalidValue {
                field,
                value: item.to_string(),
            })
        })
        .collect()
}

fn loose_string_array<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
) -> impl Iterator<Item = &'a str> {
    obj.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}
