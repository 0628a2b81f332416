use serde::{Deserialize, Serialize};

/// Vital signs the intake form collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalSign {
    Temperature,
    HeartRate,
    BloodPressure,
}

impl VitalSign {
    /// Key used on the wire (`vitals.temp`, `vitals.hr`, `vitals.bp`).
    pub fn wire_key(self) -> &'static str {
        match self {
            VitalSign::Temperature => "temp",
            VitalSign::HeartRate => "hr",
            VitalSign::BloodPressure => "bp",
        }
    }
}

/// Free-text vital readings. Nothing is parsed or range-checked here;
/// empty readings are simply left off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    #[serde(rename = "temp", default, skip_serializing_if = "String::is_empty")]
    pub temperature: String,
    #[serde(rename = "hr", default, skip_serializing_if = "String::is_empty")]
    pub heart_rate: String,
    #[serde(rename = "bp", default, skip_serializing_if = "String::is_empty")]
    pub blood_pressure: String,
}

impl VitalsSnapshot {
    pub fn get(&self, sign: VitalSign) -> &str {
        match sign {
            VitalSign::Temperature => &self.temperature,
            VitalSign::HeartRate => &self.heart_rate,
            VitalSign::BloodPressure => &self.blood_pressure,
        }
    }

    pub fn set(&mut self, sign: VitalSign, value: impl Into<String>) {
        let slot = match sign {
            VitalSign::Temperature => &mut self.temperature,
            VitalSign::HeartRate => &mut self.heart_rate,
            VitalSign::BloodPressure => &mut self.blood_pressure,
        };
        *slot = value.into();
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty() && self.heart_rate.is_empty() && self.blood_pressure.is_empty()
    }
}

/// One submission to the triage engine. Serializes to the `/analyze` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(rename = "text")]
    pub narrative_text: String,
    pub medications: Vec<String>,
    pub vitals: VitalsSnapshot,
    /// Reserved; always sent empty for now.
    pub existing_conditions: Vec<String>,
}

impl AnalysisRequest {
    pub fn new(narrative_text: impl Into<String>) -> Self {
        Self {
            narrative_text: narrative_text.into(),
            medications: Vec::new(),
            vitals: VitalsSnapshot::default(),
            existing_conditions: Vec::new(),
        }
    }

    pub fn with_medications<I, S>(mut self, medications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.medications = medications.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_vitals(mut self, vitals: VitalsSnapshot) -> Self {
        self.vitals = vitals;
        self
    }

    pub fn has_narrative(&self) -> bool {
        !self.narrative_text.trim().is_empty()
    }
}

/// Editable intake form state, turned into an [`AnalysisRequest`] on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeDraft {
    pub text: String,
    pub medications: Vec<String>,
    pub vitals: VitalsSnapshot,
}

impl IntakeDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a medication. Input is trimmed; blank input is ignored.
    /// Duplicates are kept. Returns whether anything was added.
    pub fn add_medication(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.medications.push(name.to_string());
        true
    }

    /// Remove the medication at `index`, if present.
    pub fn remove_medication(&mut self, index: usize) -> Option<String> {
        (index < self.medications.len()).then(|| self.medications.remove(index))
    }

    pub fn set_vital(&mut self, sign: VitalSign, value: impl Into<String>) {
        self.vitals.set(sign, value);
    }

    /// Append dictated text, separated from existing text by one space.
    pub fn append_transcript(&mut self, transcript: &str) {
        if transcript.is_empty() {
            return;
        }
        if self.text.is_empty() {
            self.text = transcript.to_string();
        } else {
            self.text.push(' ');
            self.text.push_str(transcript);
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn to_request(&self) -> AnalysisRequest {
        AnalysisRequest::new(self.text.clone())
            .with_medications(self.medications.iter().cloned())
            .with_vitals(self.vitals.clone())
    }
}
