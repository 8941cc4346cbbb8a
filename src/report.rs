
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

use crate::data_types::analysis_report::{AnalysisReport, AnalysisResult, PharmacogenomicProfile, QualityMetrics};
use crate::data_types::pgx_phenotype::Phenotype;
use crate::data_types::variant_record::VariantRecord;
use crate::diplotyper::call_gene_diplotype;
use crate::explanation::{Explainer, ExplanationFacts};
use crate::guidelines::guideline_const::UNKNOWN_LABEL;
use crate::guidelines::guideline_tables::GuidelineTables;
use crate::risk::{classify_risk, lookup_drug};
use crate::vcf_parser::ParsedVcf;

/// Patient identifier used for the built-in sample set
pub const SAMPLE_PATIENT_ID: &str = "PATIENT_DEMO01";
/// Upper bound on drugs analyzed at the same time, which also bounds concurrent backend requests
pub const MAX_CONCURRENT_DRUGS: usize = 4;

/// Errors that reject a whole analysis request
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AnalysisError {
    #[error("no drugs were requested")]
    NoDrugsRequested
}

/// Splits a comma-separated drug list; names are trimmed and upper-cased, empty entries dropped.
/// # Arguments
/// * `drugs` - e.g. "codeine, Warfarin"
/// # Errors
/// * `NoDrugsRequested` if nothing is left
pub fn parse_drug_list(drugs: &str) -> Result<Vec<String>, AnalysisError> {
    let drug_list: Vec<String> = drugs.split(',')
        .map(|d| d.trim().to_uppercase())
        .filter(|d| !d.is_empty())
        .collect();
    if drug_list.is_empty() {
        Err(AnalysisError::NoDrugsRequested)
    } else {
        Ok(drug_list)
    }
}

/// Stable identifier for a patient when none was provided; the same variant text always gives the same ID.
/// # Arguments
/// * `vcf_text` - the raw variant file content
pub fn default_patient_id(vcf_text: &str) -> String {
    let mut hasher = FxHasher::default();
    vcf_text.hash(&mut hasher);
    format!("PATIENT_{:06X}", hasher.finish() & 0xFF_FFFF)
}

/// Runs the full pipeline for every requested drug.
/// Drugs are processed independently on scoped threads, at most `MAX_CONCURRENT_DRUGS` at a time, and results come back in request order.
/// If a worker thread cannot be started, that drug runs on the calling thread instead.
/// # Arguments
/// * `parsed_vcf` - the parsed variant file
/// * `drugs` - requested drug names, see `parse_drug_list`
/// * `patient_id` - identifier copied onto every result
/// * `tables` - the guideline tables
/// * `explainer` - explanation source with fallback
/// # Errors
/// * `NoDrugsRequested` if `drugs` is empty
pub fn analyze(
    parsed_vcf: &ParsedVcf, drugs: &[String], patient_id: &str,
    tables: &GuidelineTables, explainer: &Explainer
) -> Result<AnalysisReport, AnalysisError> {
    if drugs.is_empty() {
        return Err(AnalysisError::NoDrugsRequested);
    }

    info!("Analyzing {} drug(s) for {patient_id}...", drugs.len());
    let timestamp: DateTime<Utc> = Utc::now();
    let detected: Vec<String> = parsed_vcf.genes_detected();
    let genes_detected: &[String] = &detected;

    let mut results: Vec<AnalysisResult> = Vec::with_capacity(drugs.len());
    for chunk in drugs.chunks(MAX_CONCURRENT_DRUGS) {
        std::thread::scope(|scope| {
            let handles: Vec<_> = chunk.iter()
                .map(|drug| {
                    std::thread::Builder::new()
                        .spawn_scoped(scope, move || {
                            analyze_drug(parsed_vcf, drug, patient_id, genes_detected, timestamp, tables, explainer)
                        })
                        .map_err(|e| {
                            warn!("Could not start a worker for {drug}, running it inline: {e}");
                            drug
                        })
                })
                .collect();

            for handle in handles.into_iter() {
                let result = match handle {
                    Ok(h) => match h.join() {
                        Ok(result) => result,
                        // analyze_drug has no failure paths, so this is a bug
                        Err(e) => std::panic::resume_unwind(e)
                    },
                    Err(drug) => analyze_drug(parsed_vcf, drug, patient_id, genes_detected, timestamp, tables, explainer)
                };
                results.push(result);
            }
        });
    }

    let mut report = AnalysisReport::new(tables.guideline_metadata().clone(), patient_id);
    for result in results.into_iter() {
        info!(
            "\t{}: {} {} => {}",
            result.drug, result.pharmacogenomic_profile.primary_gene,
            result.pharmacogenomic_profile.diplotype, result.risk_assessment.risk_label()
        );
        report.push(result);
    }
    Ok(report)
}

/// Assembles the result for a single drug; this never fails
fn analyze_drug(
    parsed_vcf: &ParsedVcf, drug: &str, patient_id: &str, genes_detected: &[String],
    timestamp: DateTime<Utc>, tables: &GuidelineTables, explainer: &Explainer
) -> AnalysisResult {
    let drug = drug.trim().to_uppercase();

    let profile = match lookup_drug(tables, &drug) {
        Some(drug_entry) => {
            let gene_name = drug_entry.primary_gene();
            let gene_records: Vec<&VariantRecord> = parsed_vcf.gene_records(gene_name);
            let gene_call = call_gene_diplotype(gene_name, tables.gene(gene_name), &gene_records);
            PharmacogenomicProfile {
                primary_gene: gene_name.to_string(),
                diplotype: gene_call.diplotype().to_string(),
                phenotype: gene_call.phenotype(),
                detected_variants: gene_records.into_iter().cloned().collect(),
                unresolved_alleles: gene_call.unresolved_alleles().to_vec()
            }
        },
        None => {
            debug!("{drug} is not supported, skipping diplotyping");
            PharmacogenomicProfile {
                primary_gene: UNKNOWN_LABEL.to_string(),
                diplotype: UNKNOWN_LABEL.to_string(),
                phenotype: Phenotype::Unknown,
                detected_variants: vec![],
                unresolved_alleles: vec![]
            }
        }
    };

    let classification = classify_risk(tables, &profile.primary_gene, profile.phenotype, &drug);
    let risk_assessment = classification.risk_assessment().clone();
    let clinical_recommendation = classification.clinical_recommendation().clone();

    let facts = ExplanationFacts {
        drug: drug.clone(),
        gene: profile.primary_gene.clone(),
        diplotype: profile.diplotype.clone(),
        phenotype: profile.phenotype,
        risk_label: risk_assessment.risk_label(),
        severity: risk_assessment.severity(),
        recommendation: clinical_recommendation.recommendation().to_string(),
        rsids: profile.detected_variants.iter().map(|v| v.rsid().to_string()).collect()
    };
    let explanation = explainer.explain(&facts);

    let quality_metrics = QualityMetrics {
        vcf_parsing_success: parsed_vcf.parsing_success(),
        total_variants_parsed: parsed_vcf.records().len(),
        genes_detected: genes_detected.to_vec(),
        primary_gene_found: genes_detected.iter().any(|g| g == &profile.primary_gene),
        explanation_source: explanation.generated_by.clone(),
        vcf_file_format: parsed_vcf.file_format().map(|f| f.to_string()),
        parse_summary: parsed_vcf.summary().clone()
    };

    AnalysisResult {
        patient_id: patient_id.to_string(),
        drug,
        timestamp,
        risk_assessment,
        pharmacogenomic_profile: profile,
        clinical_recommendation,
        explanation,
        quality_metrics
    }
}
