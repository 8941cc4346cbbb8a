
/// Contains the errors an explanation backend can raise
pub mod errors;
/// Contains the chat-completions explanation backend
pub mod openai;
/// Contains the deterministic template explanations
pub mod rule_based;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::data_types::pgx_phenotype::Phenotype;
use crate::data_types::pgx_risk::{RiskLabel, Severity};
use crate::explanation::errors::ExplanationError;
use crate::explanation::rule_based::RuleBasedExplainer;

/// The structured facts an explanation is allowed to draw on; nothing else is given to a backend
#[derive(Clone, Debug, PartialEq)]
pub struct ExplanationFacts {
    /// Drug name as reported
    pub drug: String,
    /// Primary gene for the drug
    pub gene: String,
    /// Diplotype text, e.g. "*1/*4"
    pub diplotype: String,
    /// Called phenotype
    pub phenotype: Phenotype,
    /// Classified risk label
    pub risk_label: RiskLabel,
    /// Classified severity
    pub severity: Severity,
    /// Plain-language recommendation from the classifier
    pub recommendation: String,
    /// rsids of the detected variants in the primary gene
    pub rsids: Vec<String>
}

/// The four-part prose explanation for one drug
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Explanation {
    pub summary: String,
    pub mechanism: String,
    pub clinical_implications: String,
    pub monitoring: String,
    /// Every section, concatenated
    pub full_explanation: String,
    /// Identifier of the source that produced this text
    pub generated_by: String,
    /// Stamped by `Explainer` when the text is handed out; sources leave this empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// If a backend failed and we fell back, this is why
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_error: Option<String>
}

impl Explanation {
    /// The first of the four sections that is blank, if any
    pub fn missing_section(&self) -> Option<&'static str> {
        [
            ("summary", &self.summary),
            ("mechanism", &self.mechanism),
            ("clinical implications", &self.clinical_implications),
            ("monitoring", &self.monitoring)
        ].into_iter()
            .find(|(_, text)| text.trim().is_empty())
            .map(|(name, _)| name)
    }
}

/// Anything that can turn facts into an explanation
pub trait ExplanationSource: Send + Sync {
    /// Identifier reported as `generated_by`
    fn identifier(&self) -> &str;

    /// Generates the explanation
    /// # Errors
    /// * if the source could not produce usable text
    fn explain(&self, facts: &ExplanationFacts) -> Result<Explanation, ExplanationError>;
}

/// Wraps an optional primary source with the rule-based fallback, so explaining never fails
pub struct Explainer {
    /// The generative backend, if one is configured
    primary: Option<Box<dyn ExplanationSource>>,
    /// Always available
    fallback: RuleBasedExplainer
}

impl Explainer {
    /// Creates an explainer that tries `primary` first
    pub fn new(primary: Option<Box<dyn ExplanationSource>>) -> Explainer {
        Explainer {
            primary,
            fallback: RuleBasedExplainer
        }
    }

    /// Creates an explainer that only uses the templates
    pub fn rule_based() -> Explainer {
        Explainer::new(None)
    }

    /// Produces an explanation, falling back to the templates on any backend error.
    /// A backend explanation with a blank section counts as an invalid response.
    /// # Arguments
    /// * `facts` - the structured result so far
    pub fn explain(&self, facts: &ExplanationFacts) -> Explanation {
        let backend_error = match self.primary.as_ref() {
            Some(primary) => {
                let outcome = primary.explain(facts).and_then(|explanation| {
                    match explanation.missing_section() {
                        Some(section) => Err(ExplanationError::InvalidResponse(format!("reply has no {section} section"))),
                        None => Ok(explanation)
                    }
                });
                match outcome {
                    Ok(mut explanation) => {
                        debug!("{}: explanation generated by {}", facts.drug, primary.identifier());
                        explanation.generated_at = Some(Utc::now());
                        return explanation;
                    },
                    Err(e) => {
                        warn!("{}: {} failed, using {}: {e}", facts.drug, primary.identifier(), self.fallback.identifier());
                        Some(e.to_string())
                    }
                }
            },
            None => None
        };

        let mut explanation = self.fallback.render(facts);
        explanation.backend_error = backend_error;
        explanation.generated_at = Some(Utc::now());
        explanation
    }

    /// Identifier of the source we try first
    pub fn primary_identifier(&self) -> &str {
        match self.primary.as_ref() {
            Some(p) => p.identifier(),
            None => self.fallback.identifier()
        }
    }
}

/// Joins the four sections into the full explanation text
pub fn join_sections(summary: &str, mechanism: &str, clinical_implications: &str, monitoring: &str) -> String {
    format!("{summary}\n\nMechanism: {mechanism}\n\nClinical Implications: {clinical_implications}\n\nMonitoring: {monitoring}")
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::explanation::rule_based::FALLBACK_IDENTIFIER;

    struct FailingSource;

    impl ExplanationSource for FailingSource {
        fn identifier(&self) -> &str {
            "failing"
        }

        fn explain(&self, _facts: &ExplanationFacts) -> Result<Explanation, ExplanationError> {
            Err(ExplanationError::Timeout { seconds: 1 })
        }
    }

    struct FixedSource;

    impl ExplanationSource for FixedSource {
        fn identifier(&self) -> &str {
            "fixed"
        }

        fn explain(&self, _facts: &ExplanationFacts) -> Result<Explanation, ExplanationError> {
            Ok(Explanation {
                summary: "s".to_string(),
                mechanism: "m".to_string(),
                clinical_implications: "c".to_string(),
                monitoring: "o".to_string(),
                full_explanation: join_sections("s", "m", "c", "o"),
                generated_by: self.identifier().to_string(),
                generated_at: None,
                backend_error: None
            })
        }
    }

    fn facts() -> ExplanationFacts {
        ExplanationFacts {
            drug: "CODEINE".to_string(),
            gene: "CYP2D6".to_string(),
            diplotype: "*4/*4".to_string(),
            phenotype: Phenotype::PoorMetabolizer,
            risk_label: RiskLabel::Ineffective,
            severity: Severity::Moderate,
            recommendation: "Use something else.".to_string(),
            rsids: vec!["rs3892097".to_string()]
        }
    }

    #[test]
    fn test_no_backend() {
        let explainer = Explainer::rule_based();
        assert_eq!(explainer.primary_identifier(), FALLBACK_IDENTIFIER);
        let explanation = explainer.explain(&facts());
        assert_eq!(explanation.generated_by, FALLBACK_IDENTIFIER);
        assert!(explanation.backend_error.is_none());
        assert!(explanation.generated_at.is_some());
    }

    #[test]
    fn test_backend_failure_falls_back() {
        let explainer = Explainer::new(Some(Box::new(FailingSource)));
        let explanation = explainer.explain(&facts());
        assert_eq!(explanation.generated_by, FALLBACK_IDENTIFIER);
        assert_eq!(explanation.backend_error.as_deref(), Some("request timed out after 1 seconds"));
        assert_eq!(explanation.summary, RuleBasedExplainer.render(&facts()).summary);
    }

    struct SummaryOnlySource;

    impl ExplanationSource for SummaryOnlySource {
        fn identifier(&self) -> &str {
            "summary-only"
        }

        fn explain(&self, _facts: &ExplanationFacts) -> Result<Explanation, ExplanationError> {
            Ok(crate::explanation::openai::split_reply("Patient is a poor metabolizer.", self.identifier()))
        }
    }

    #[test]
    fn test_missing_section() {
        let explanation = RuleBasedExplainer.render(&facts());
        assert_eq!(explanation.missing_section(), None);

        let mut partial = explanation.clone();
        partial.monitoring = " ".to_string();
        assert_eq!(partial.missing_section(), Some("monitoring"));
        partial.mechanism = String::new();
        assert_eq!(partial.missing_section(), Some("mechanism"));
    }

    #[test]
    fn test_incomplete_backend_reply_falls_back() {
        let explainer = Explainer::new(Some(Box::new(SummaryOnlySource)));
        let explanation = explainer.explain(&facts());
        assert_eq!(explanation.generated_by, FALLBACK_IDENTIFIER);
        assert_eq!(explanation.backend_error.as_deref(), Some("invalid response: reply has no mechanism section"));
        assert_eq!(explanation.missing_section(), None);
        assert_eq!(explanation.mechanism, RuleBasedExplainer.render(&facts()).mechanism);
    }

    #[test]
    fn test_backend_success() {
        let explainer = Explainer::new(Some(Box::new(FixedSource)));
        let explanation = explainer.explain(&facts());
        assert_eq!(explanation.generated_by, "fixed");
        assert!(explanation.generated_at.is_some());
        assert_eq!(explanation.full_explanation, "s\n\nMechanism: m\n\nClinical Implications: c\n\nMonitoring: o");
    }
}
