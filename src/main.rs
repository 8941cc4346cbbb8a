
use log::{LevelFilter, debug, error, info, warn};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use pbpharmguard::cli::analyze::{AnalyzeSettings, check_analyze_settings};
use pbpharmguard::cli::core::{Commands, get_cli};
use pbpharmguard::cli::export_guidelines::{ExportSettings, check_export_settings};
use pbpharmguard::cli::supported::{SupportedSettings, check_supported_settings};
use pbpharmguard::data_types::analysis_report::AnalysisReport;
use pbpharmguard::explanation::{Explainer, ExplanationSource};
use pbpharmguard::explanation::openai::{OpenAiExplainer, OpenAiSettings};
use pbpharmguard::guidelines::guideline_tables::GuidelineTables;
use pbpharmguard::report::{SAMPLE_PATIENT_ID, analyze, default_patient_id, parse_drug_list};
use pbpharmguard::util::file_io::{load_json, save_json};
use pbpharmguard::vcf_parser::{ParsedVcf, load_vcf_file, parse_vcf, sample_vcf};

/// Sets up the logger with our standard format
/// # Arguments
/// * `verbosity` - the number of times -v was provided
fn init_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

/// Loads the guideline tables from file if provided, otherwise the built-in tables; exits on failure
/// # Arguments
/// * `opt_filename` - optional guideline JSON file
fn load_guidelines(opt_filename: Option<&Path>) -> GuidelineTables {
    let tables: GuidelineTables = match opt_filename {
        Some(filename) => {
            info!("Loading guideline tables from {filename:?}...");
            match load_json(filename) {
                Ok(gt) => gt,
                Err(e) => {
                    error!("Error while loading guideline tables file: {e}");
                    std::process::exit(exitcode::IOERR);
                }
            }
        },
        None => GuidelineTables::default()
    };

    // we also need to validate that the tables are complete enough to run
    if let Err(e) = tables.validate() {
        error!("Error while validating guideline tables: {e}");
        std::process::exit(exitcode::DATAERR);
    }
    let metadata = tables.guideline_metadata();
    info!("Guideline tables loaded: {} {}", metadata.guideline_source, metadata.guideline_version);
    tables
}

/// This will run the "analyze" mode of the tool
/// # Arguments
/// * `settings` - the AnalyzeSettings object
fn run_analyze(settings: AnalyzeSettings) {
    init_logging(settings.verbosity);

    // okay, now we can check all the other settings
    let cli_settings: AnalyzeSettings = match check_analyze_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while processing CLI settings: {e}");
            std::process::exit(exitcode::USAGE);
        }
    };

    let tables = load_guidelines(cli_settings.guidelines_filename.as_deref());

    // load the variants, sample mode has a fixed patient
    let (parsed_vcf, default_id): (ParsedVcf, String) = match cli_settings.vcf_filename.as_ref() {
        Some(vcf_fn) => {
            info!("Loading variants from {vcf_fn:?}...");
            match load_vcf_file(vcf_fn, &tables) {
                Ok((text, parsed)) => (parsed, default_patient_id(&text)),
                Err(e) => {
                    error!("Error while loading VCF file: {e}");
                    std::process::exit(exitcode::IOERR);
                }
            }
        },
        None => {
            info!("Loading built-in sample variants...");
            (parse_vcf(sample_vcf(), &tables), SAMPLE_PATIENT_ID.to_string())
        }
    };
    let summary = parsed_vcf.summary();
    match parsed_vcf.file_format() {
        Some(file_format) => info!("Variant file format: {file_format}"),
        None => warn!("Variant file has no ##fileformat header")
    };
    for (key, value) in parsed_vcf.metadata().iter() {
        debug!("\t##{key}={value}");
    }
    info!(
        "Parsed {} of {} data lines, retained {} variant(s) in {} gene(s).",
        summary.parsed_lines(), summary.data_lines(), parsed_vcf.records().len(), parsed_vcf.genes_detected().len()
    );
    for (reason, count) in summary.skipped_lines().iter() {
        info!("\tSkipped {count} line(s): {reason}");
    }

    let patient_id: String = cli_settings.patient_id.clone().unwrap_or(default_id);

    // build the explanation backend, failures here just mean we use templates
    let primary: Option<Box<dyn ExplanationSource>> = match cli_settings.api_key.as_ref() {
        Some(api_key) if cli_settings.has_api_key() => {
            let backend_settings = OpenAiSettings {
                api_key: api_key.clone(),
                api_url: cli_settings.api_url.clone(),
                model: cli_settings.model.clone(),
                timeout_secs: cli_settings.timeout_secs
            };
            match OpenAiExplainer::new(backend_settings) {
                Ok(backend) => Some(Box::new(backend)),
                Err(e) => {
                    error!("Error while creating explanation backend, using templates: {e}");
                    None
                }
            }
        },
        _ => None
    };
    let explainer = Explainer::new(primary);
    info!("Explanation source: {}", explainer.primary_identifier());

    // settings were checked, so this cannot be empty
    let drug_list: Vec<String> = match parse_drug_list(&cli_settings.drugs) {
        Ok(dl) => dl,
        Err(e) => {
            error!("Error while parsing drug list: {e}");
            std::process::exit(exitcode::USAGE);
        }
    };

    let report: AnalysisReport = match analyze(&parsed_vcf, &drug_list, &patient_id, &tables, &explainer) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while analyzing drugs: {e}");
            std::process::exit(exitcode::DATAERR);
        }
    };

    match cli_settings.output_filename.as_ref() {
        Some(filename) => {
            info!("Saving analysis report to {filename:?}");
            if let Err(e) = save_json(&report, filename) {
                error!("Error while writing analysis report to file: {e}");
                std::process::exit(exitcode::IOERR);
            }
        },
        None => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    error!("Error while serializing analysis report: {e}");
                    std::process::exit(exitcode::SOFTWARE);
                }
            };
        }
    };

    if let Some(filename) = cli_settings.summary_tsv.as_ref() {
        info!("Saving drug summary to {filename:?}");
        if let Err(e) = save_summary_tsv(&report, filename) {
            error!("Error while writing drug summary to file: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }
}

/// Wrapper for the summary output
#[derive(Serialize)]
struct SummaryRow {
    #[serde(rename = "#drug")]
    drug: String,
    gene: String,
    diplotype: String,
    phenotype: String,
    risk_label: String,
    severity: String
}

/// Helper function to save a one-row-per-drug summary TSV
/// # Arguments
/// * `report` - our analysis report
/// * `filename` - the output filename, TSV
/// # Errors
/// * if we have any errors opening or writing to the file
fn save_summary_tsv(report: &AnalysisReport, filename: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let delimiter: u8 = b'\t';
    let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;

    // request order
    for result in report.results().iter() {
        let profile = &result.pharmacogenomic_profile;
        let row = SummaryRow {
            drug: result.drug.clone(),
            gene: profile.primary_gene.clone(),
            diplotype: profile.diplotype.clone(),
            phenotype: profile.phenotype.to_string(),
            risk_label: result.risk_assessment.risk_label().to_string(),
            severity: result.risk_assessment.severity().to_string()
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// This will run the "supported" mode of the tool
/// # Arguments
/// * `settings` - the SupportedSettings object
fn run_supported(settings: SupportedSettings) {
    init_logging(settings.verbosity);
    let cli_settings: SupportedSettings = check_supported_settings(settings);
    let tables = load_guidelines(cli_settings.guidelines_filename.as_deref());
    pbpharmguard::guideline_stat::print_stats(&tables);
}

/// This will run the "export-guidelines" mode of the tool
/// # Arguments
/// * `settings` - the ExportSettings object
fn run_export(settings: ExportSettings) {
    init_logging(settings.verbosity);
    let cli_settings: ExportSettings = check_export_settings(settings);

    let tables = load_guidelines(None);
    info!("Saving guideline tables to {:?}", cli_settings.output_filename);
    if let Err(e) = save_json(&tables, &cli_settings.output_filename) {
        error!("Error while writing guideline tables to file: {e}");
        std::process::exit(exitcode::IOERR);
    }
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Analyze(settings) => {
            run_analyze(*settings);
        },
        Commands::Supported(settings) => {
            run_supported(*settings);
        },
        Commands::ExportGuidelines(settings) => {
            run_export(*settings);
        }
    }

    info!("Process finished successfully.");
}
