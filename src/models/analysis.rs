use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Urgency classification returned by the triage engine.
///
/// Labels outside the known set are kept verbatim in `Unspecified` so a
/// result can still be shown and written back without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriageLevel {
    Emergency,
    Urgent,
    Routine,
    Unspecified(String),
}

impl TriageLevel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Emergency => "EMERGENCY",
            Self::Urgent => "URGENT",
            Self::Routine => "ROUTINE",
            Self::Unspecified(label) => label,
        }
    }

    /// Whether the label is one of the known levels.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unspecified(_))
    }
}

impl From<&str> for TriageLevel {
    fn from(label: &str) -> Self {
        match label {
            "EMERGENCY" => Self::Emergency,
            "URGENT" => Self::Urgent,
            "ROUTINE" => Self::Routine,
            other => Self::Unspecified(other.to_string()),
        }
    }
}

impl From<String> for TriageLevel {
    fn from(label: String) -> Self {
        match label.as_str() {
            "EMERGENCY" | "URGENT" | "ROUTINE" => Self::from(label.as_str()),
            _ => Self::Unspecified(label),
        }
    }
}

impl From<TriageLevel> for String {
    fn from(level: TriageLevel) -> Self {
        match level {
            TriageLevel::Unspecified(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional wire key that remembers whether it was sent.
///
/// `None` means the key was absent, `Some(None)` an explicit `null`. Absent
/// keys stay absent on encode and `null` is written back as `null`.
pub type Presence<T> = Option<Option<T>>;

/// Deserialize a present key (including `null`) as `Some(..)`. Paired with
/// `#[serde(default)]` so a missing key stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Presence<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A symptom the engine extracted from the narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub name: String,
    /// Opaque label such as "mild", "moderate" or "severe".
    pub severity: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub duration: Presence<String>,
    /// Keys not modeled here, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SymptomEntry {
    pub fn new(name: &str, severity: &str) -> Self {
        Self {
            name: name.to_string(),
            severity: severity.to_string(),
            duration: None,
            extra: Map::new(),
        }
    }

    pub fn with_duration(mut self, duration: &str) -> Self {
        self.duration = Some(Some(duration.to_string()));
        self
    }

    pub fn duration(&self) -> Option<&str> {
        self.duration.as_ref()?.as_deref()
    }
}

/// A flagged medication risk.
///
/// The two wire shapes differ only by the presence of `med_a`/`med_b`, so the
/// interaction variant is tried first. Unmodeled keys (e.g. a `condition` on
/// an interaction) land in `extra` and are written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SafetyAlert {
    Interaction {
        #[serde(rename = "med_a")]
        medication_a: String,
        #[serde(rename = "med_b")]
        medication_b: String,
        risk: String,
        #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
        severity: Presence<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    SingleMedication {
        #[serde(rename = "med")]
        medication: String,
        risk: String,
        #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
        condition: Presence<String>,
        #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
        severity: Presence<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl SafetyAlert {
    pub fn single(medication: &str, risk: &str) -> Self {
        Self::SingleMedication {
            medication: medication.to_string(),
            risk: risk.to_string(),
            condition: None,
            severity: None,
            extra: Map::new(),
        }
    }

    pub fn interaction(medication_a: &str, medication_b: &str, risk: &str) -> Self {
        Self::Interaction {
            medication_a: medication_a.to_string(),
            medication_b: medication_b.to_string(),
            risk: risk.to_string(),
            severity: None,
            extra: Map::new(),
        }
    }

    /// Medication label: `"A"` or `"A + B"`.
    pub fn subject(&self) -> String {
        match self {
            Self::SingleMedication { medication, .. } => medication.clone(),
            Self::Interaction {
                medication_a,
                medication_b,
                ..
            } => format!("{medication_a} + {medication_b}"),
        }
    }

    pub fn risk(&self) -> &str {
        match self {
            Self::SingleMedication { risk, .. } | Self::Interaction { risk, .. } => risk,
        }
    }

    pub fn severity(&self) -> Option<&str> {
        match self {
            Self::SingleMedication { severity, .. } | Self::Interaction { severity, .. } => {
                severity.as_ref()?.as_deref()
            }
        }
    }

    pub fn condition(&self) -> Option<&str> {
        match self {
            Self::SingleMedication { condition, .. } => condition.as_ref()?.as_deref(),
            Self::Interaction { .. } => None,
        }
    }
}

/// Structured triage result, immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub triage_level: TriageLevel,
    pub reasoning: String,
    pub symptoms: Vec<SymptomEntry>,
    pub safety_alerts: Vec<SafetyAlert>,
    pub recommendations: Vec<String>,
    pub disclaimer: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub confidence_score: Presence<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    /// Engine confidence in `0.0..=1.0`, when reported.
    pub fn confidence(&self) -> Option<f64> {
        self.confidence_score.flatten()
    }
}

/// A past result plus the moment it was produced.
///
/// Entries have no identity beyond their position in the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub result: AnalysisResult,
    /// ISO-8601 creation timestamp, kept as stored.
    pub date: String,
}

impl HistoryEntry {
    pub fn new(result: AnalysisResult, created_at: DateTime<Utc>) -> Self {
        Self {
            result,
            date: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Stamp a fresh result with the current time.
    pub fn now(result: AnalysisResult) -> Self {
        Self::new(result, Utc::now())
    }

    /// Calendar date of creation, if the stored timestamp parses.
    pub fn created_on(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.date)
            .map(|dt| dt.with_timezone(&Utc).date_naive())
            .ok()
            .or_else(|| NaiveDate::parse_from_str(self.date.get(..10)?, "%Y-%m-%d").ok())
    }

    /// Short label for history lists: first symptom name, else "Assessment".
    pub fn headline(&self) -> &str {
        self.result
            .symptoms
            .first()
            .map(|s| s.name.as_str())
            .unwrap_or("Assessment")
    }
}
