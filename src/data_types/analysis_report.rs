
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data_types::pgx_phenotype::Phenotype;
use crate::data_types::pgx_risk::{ClinicalRecommendation, RiskAssessment};
use crate::data_types::variant_record::VariantRecord;
use crate::explanation::Explanation;
use crate::guidelines::guideline_tables::GuidelineMetadata;
use crate::vcf_parser::ParseSummary;

/// Intended to be serialized to JSON as the final result
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    /// Version of the tool that generated the report
    pbpharmguard_version: String,
    /// Metadata for the guideline tables that were used
    guideline_metadata: GuidelineMetadata,
    /// The patient all results belong to
    patient_id: String,
    /// One result per requested drug, in request order
    results: Vec<AnalysisResult>
}

impl AnalysisReport {
    /// Basic constructor, results are added afterwards
    pub fn new(guideline_metadata: GuidelineMetadata, patient_id: &str) -> AnalysisReport {
        AnalysisReport {
            pbpharmguard_version: crate::cli::core::FULL_VERSION.to_string(),
            guideline_metadata,
            patient_id: patient_id.to_string(),
            results: vec![]
        }
    }

    /// Appends a result, keeping request order
    pub fn push(&mut self, result: AnalysisResult) {
        self.results.push(result);
    }

    pub fn guideline_metadata(&self) -> &GuidelineMetadata {
        &self.guideline_metadata
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }
}

/// The full result for one (patient, drug) pair, never modified after assembly
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisResult {
    pub patient_id: String,
    /// Drug name, upper-case
    pub drug: String,
    /// When the analysis that produced this ran
    pub timestamp: DateTime<Utc>,
    pub risk_assessment: RiskAssessment,
    pub pharmacogenomic_profile: PharmacogenomicProfile,
    pub clinical_recommendation: ClinicalRecommendation,
    #[serde(rename = "llm_generated_explanation")]
    pub explanation: Explanation,
    pub quality_metrics: QualityMetrics
}

/// The gene-level call behind a drug result
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PharmacogenomicProfile {
    /// The drug's primary gene, "Unknown" for unsupported drugs
    pub primary_gene: String,
    /// Diplotype text, "Unknown" for unsupported drugs
    pub diplotype: String,
    pub phenotype: Phenotype,
    /// Retained records for the primary gene, in file order
    pub detected_variants: Vec<VariantRecord>,
    /// Observed alleles that did not fit on the diplotype
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_alleles: Vec<String>
}

/// How much of the input could be used, repeated on every result
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// At least one data row parsed structurally
    pub vcf_parsing_success: bool,
    /// Retained records after filtering
    pub total_variants_parsed: usize,
    /// Sorted distinct genes across the retained records
    pub genes_detected: Vec<String>,
    /// The drug's primary gene appeared among the retained records
    pub primary_gene_found: bool,
    /// `generated_by` of the explanation
    pub explanation_source: String,
    /// The `##fileformat` header of the variant file, if it had one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcf_file_format: Option<String>,
    /// Line-level parsing counts
    pub parse_summary: ParseSummary
}
