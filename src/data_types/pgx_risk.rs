
use serde::{Deserialize, Serialize};

/// The closed set of drug risk labels we report
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display, strum_macros::EnumString)]
pub enum RiskLabel {
    Safe,
    #[serde(rename = "Adjust Dosage")]
    #[strum(to_string = "Adjust Dosage")]
    AdjustDosage,
    Toxic,
    Ineffective,
    Unknown
}

/// Ordered severity, `None` is the lowest
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display, strum_macros::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
    Critical
}

/// The label/confidence/severity triple for one drug
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// The risk label
    risk_label: RiskLabel,
    /// Guideline concordance score in [0, 1], not a probability
    confidence_score: f64,
    /// The severity of the risk
    severity: Severity
}

impl RiskAssessment {
    pub fn new(risk_label: RiskLabel, confidence_score: f64, severity: Severity) -> RiskAssessment {
        RiskAssessment {
            risk_label,
            confidence_score,
            severity
        }
    }

    // getters
    pub fn risk_label(&self) -> RiskLabel {
        self.risk_label
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

/// The structured clinical recommendation that goes with a RiskAssessment
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClinicalRecommendation {
    /// Plain-language recommendation
    recommendation: String,
    /// The guideline text this recommendation is derived from
    cpic_recommendation: String,
    /// Whether the dose should be changed
    requires_dose_adjustment: bool,
    /// Whether the drug should be avoided entirely
    contraindicated: bool
}

impl ClinicalRecommendation {
    pub fn new(recommendation: String, cpic_recommendation: String, requires_dose_adjustment: bool, contraindicated: bool) -> ClinicalRecommendation {
        ClinicalRecommendation {
            recommendation,
            cpic_recommendation,
            requires_dose_adjustment,
            contraindicated
        }
    }

    // getters
    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    pub fn cpic_recommendation(&self) -> &str {
        &self.cpic_recommendation
    }

    pub fn requires_dose_adjustment(&self) -> bool {
        self.requires_dose_adjustment
    }

    pub fn contraindicated(&self) -> bool {
        self.contraindicated
    }
}
