
use crate::data_types::pgx_phenotype::Phenotype;
use crate::data_types::pgx_risk::RiskLabel;
use crate::explanation::{join_sections, Explanation, ExplanationFacts, ExplanationSource};
use crate::explanation::errors::ExplanationError;
use crate::guidelines::guideline_const::*;

/// Reported as `generated_by` for every template explanation
pub const FALLBACK_IDENTIFIER: &str = "rule-based-fallback";

/// Deterministic explanations built purely from templates.
/// The same facts always produce the same text.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleBasedExplainer;

impl RuleBasedExplainer {
    /// Renders all four sections; this cannot fail
    /// # Arguments
    /// * `facts` - the structured result so far
    pub fn render(&self, facts: &ExplanationFacts) -> Explanation {
        let summary = format!(
            "Patient carries the {} diplotype in {}, resulting in {} status. For {}, this translates to a '{}' risk assessment with {} severity. {}",
            facts.diplotype, facts.gene, facts.phenotype, facts.drug, facts.risk_label, facts.severity, facts.recommendation
        );
        let mechanism = mechanism_text(facts);
        let clinical_implications = clinical_implications_text(facts.risk_label, &facts.drug);
        let monitoring = monitoring_text(facts.risk_label).to_string();
        let full_explanation = join_sections(&summary, &mechanism, &clinical_implications, &monitoring);

        Explanation {
            summary,
            mechanism,
            clinical_implications,
            monitoring,
            full_explanation,
            generated_by: FALLBACK_IDENTIFIER.to_string(),
            generated_at: None,
            backend_error: None
        }
    }
}

impl ExplanationSource for RuleBasedExplainer {
    fn identifier(&self) -> &str {
        FALLBACK_IDENTIFIER
    }

    fn explain(&self, facts: &ExplanationFacts) -> Result<Explanation, ExplanationError> {
        Ok(self.render(facts))
    }
}

/// Gene-specific mechanism paragraph, with a generic one for anything else
fn mechanism_text(facts: &ExplanationFacts) -> String {
    let drug = &facts.drug;
    let diplotype = &facts.diplotype;
    let phenotype = facts.phenotype;
    let phenotype_lower = phenotype.to_string().to_lowercase();
    let poor = phenotype.is_poor();
    let variant_str = if facts.rsids.is_empty() {
        "no specific variants detected".to_string()
    } else {
        facts.rsids.join(", ")
    };

    match facts.gene.as_str() {
        CYP2D6 => format!(
            "CYP2D6 encodes a key hepatic enzyme responsible for metabolizing {drug}. The {diplotype} diplotype results in {phenotype_lower} status, meaning the enzyme activity is {}.",
            phenotype.activity_description()
        ),
        CYP2C19 => {
            let effect = if poor {
                "prevents drug activation"
            } else if phenotype == Phenotype::IntermediateMetabolizer {
                "reduces drug activation"
            } else {
                "enhances drug metabolism"
            };
            format!(
                "CYP2C19 is responsible for activating or metabolizing {drug}. Variant(s) {variant_str} result in the {diplotype} diplotype, leading to {phenotype_lower} status which {effect}."
            )
        },
        CYP2C9 => format!(
            "CYP2C9 is the primary enzyme metabolizing {drug}. The {diplotype} diplotype ({variant_str}) reduces enzyme activity, causing {drug} to accumulate to {} levels in the bloodstream.",
            if poor { "dangerous" } else { "elevated" }
        ),
        SLCO1B1 => format!(
            "SLCO1B1 encodes a hepatic uptake transporter that controls {drug} uptake into liver cells. The {diplotype} diplotype impairs this transporter, reducing {drug} clearance and increasing systemic exposure with risk of {} muscle toxicity.",
            if poor { "severe" } else { "moderate" }
        ),
        TPMT => format!(
            "TPMT metabolizes {drug} into inactive metabolites. The {diplotype} diplotype ({variant_str}) {} TPMT activity, causing toxic metabolites to accumulate and risk {} bone marrow suppression.",
            if poor { "abolishes" } else { "reduces" },
            if poor { "life-threatening" } else { "significant" }
        ),
        DPYD => format!(
            "DPYD is the rate-limiting enzyme in {drug} catabolism. The {diplotype} diplotype ({variant_str}) {} DPYD activity, leading to {drug} accumulation and {} toxicity.",
            if poor { "severely impairs" } else { "reduces" },
            if poor { "potentially fatal" } else { "serious" }
        ),
        gene => format!(
            "The {gene} gene affects {drug} metabolism. Variant {diplotype} results in {phenotype_lower} status."
        )
    }
}

fn clinical_implications_text(risk_label: RiskLabel, drug: &str) -> String {
    match risk_label {
        RiskLabel::Toxic => format!("This patient is at significant risk of {drug}-related toxicity. Dose modification or drug substitution is strongly recommended before prescribing."),
        RiskLabel::Ineffective => format!("{drug} is unlikely to provide therapeutic benefit for this patient due to impaired drug activation or metabolism. An alternative therapy should be considered."),
        RiskLabel::AdjustDosage => format!("Standard dosing of {drug} may not be appropriate. A dose adjustment based on the patient's metabolizer status is recommended to optimize efficacy and minimize harm."),
        RiskLabel::Safe => format!("This patient is expected to respond normally to standard {drug} dosing. No pharmacogenomic-based dose adjustments are necessary."),
        RiskLabel::Unknown => "Insufficient evidence exists to make a pharmacogenomic recommendation for this drug-gene combination.".to_string()
    }
}

fn monitoring_text(risk_label: RiskLabel) -> &'static str {
    match risk_label {
        RiskLabel::Toxic => "Monitor closely for signs of drug toxicity. Consider therapeutic drug monitoring if available.",
        RiskLabel::Ineffective => "Monitor for lack of therapeutic response. Consider switching to an alternative medication.",
        RiskLabel::AdjustDosage => "Monitor drug levels and clinical response after dose adjustment. Titrate based on therapeutic targets.",
        RiskLabel::Safe => "Routine clinical monitoring per standard of care.",
        RiskLabel::Unknown => "Standard clinical monitoring. Consult clinical pharmacist for additional guidance."
    }
}
