
use log::{debug, warn};

use crate::data_types::pgx_phenotype::Phenotype;
use crate::data_types::pgx_risk::{ClinicalRecommendation, RiskAssessment, RiskLabel, Severity};
use crate::guidelines::guideline_tables::{DrugGuideline, GuidelineTables};

/// Baseline for a supported drug where the phenotype has no rule
const NO_RULE_CONFIDENCE: f64 = 0.5;
/// Baseline for anything outside the tables
const UNSUPPORTED_CONFIDENCE: f64 = 0.0;

const NO_RULE_RECOMMENDATION: &str = "Insufficient pharmacogenomic data for this combination.";
const NO_RULE_CPIC: &str = "Consult clinical pharmacist for guidance.";
const UNSUPPORTED_CPIC: &str = "Consult clinical pharmacist.";

/// The full classifier output for one drug
#[derive(Clone, Debug, PartialEq)]
pub struct RiskClassification {
    /// Label, confidence, and severity
    risk_assessment: RiskAssessment,
    /// Recommendation text and flags
    clinical_recommendation: ClinicalRecommendation
}

impl RiskClassification {
    /// Shared constructor for every path that does not come from a rule
    fn unknown(confidence_score: f64, recommendation: String, cpic_recommendation: &str) -> RiskClassification {
        RiskClassification {
            risk_assessment: RiskAssessment::new(RiskLabel::Unknown, confidence_score, Severity::None),
            clinical_recommendation: ClinicalRecommendation::new(recommendation, cpic_recommendation.to_string(), false, false)
        }
    }

    // getters
    pub fn risk_assessment(&self) -> &RiskAssessment {
        &self.risk_assessment
    }

    pub fn clinical_recommendation(&self) -> &ClinicalRecommendation {
        &self.clinical_recommendation
    }
}

/// Looks up the drug entry, the only place we normalize drug names.
/// # Arguments
/// * `tables` - the guideline tables
/// * `drug_name` - the requested drug, any case, surrounding whitespace ignored
pub fn lookup_drug<'a>(tables: &'a GuidelineTables, drug_name: &str) -> Option<&'a DrugGuideline> {
    tables.drug(drug_name)
}

/// Classifies the risk for a drug given the phenotype of a gene.
/// This is a pure lookup, the same inputs always give the same output, and it never fails.
/// # Arguments
/// * `tables` - the guideline tables
/// * `gene_name` - the gene the phenotype was called for, expected to be the drug's primary gene
/// * `phenotype` - the phenotype of that gene
/// * `drug_name` - the requested drug, matched case-insensitively
pub fn classify_risk(tables: &GuidelineTables, gene_name: &str, phenotype: Phenotype, drug_name: &str) -> RiskClassification {
    let drug_entry = match lookup_drug(tables, drug_name) {
        Some(de) => de,
        None => {
            debug!("{drug_name} is not a supported drug");
            return RiskClassification::unknown(
                UNSUPPORTED_CONFIDENCE,
                format!("Drug '{}' is not in our pharmacogenomic database.", drug_name.trim()),
                UNSUPPORTED_CPIC
            );
        }
    };

    if drug_entry.primary_gene() != gene_name {
        warn!("{} is driven by {}, not {}", drug_entry.drug_name(), drug_entry.primary_gene(), gene_name);
        return RiskClassification::unknown(
            UNSUPPORTED_CONFIDENCE,
            format!("The drug/gene pair {}/{} is not in our pharmacogenomic database.", drug_entry.drug_name(), gene_name),
            UNSUPPORTED_CPIC
        );
    }

    match drug_entry.rule(phenotype) {
        Some(rule) => {
            RiskClassification {
                risk_assessment: RiskAssessment::new(rule.risk_label, rule.confidence_score, rule.severity),
                clinical_recommendation: ClinicalRecommendation::new(
                    rule.recommendation.clone(),
                    rule.cpic_recommendation.clone(),
                    rule.requires_dose_adjustment,
                    rule.contraindicated
                )
            }
        },
        None => {
            debug!("{}: no rule for {gene_name} {phenotype}", drug_entry.drug_name());
            RiskClassification::unknown(NO_RULE_CONFIDENCE, NO_RULE_RECOMMENDATION.to_string(), NO_RULE_CPIC)
        }
    }
}
