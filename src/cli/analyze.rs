
use clap::Args;
use log::{info, warn};
use simple_error::bail;
use std::path::PathBuf;

use crate::cli::core::{AFTER_HELP, check_optional_filename, check_required_filename};
use crate::explanation::openai::{DEFAULT_API_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::report::parse_drug_list;

#[derive(Args, Clone, Default)]
#[clap(author, about,
    after_help = &**AFTER_HELP)]
pub struct AnalyzeSettings {
    /// Input variant file in VCF format, optionally gzip compressed
    #[clap(short = 'c')]
    #[clap(long = "vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub vcf_filename: Option<PathBuf>,

    /// Analyze the built-in demonstration variant set instead of a VCF file
    #[clap(long = "sample")]
    #[clap(help_heading = Some("Input/Output"))]
    pub sample: bool,

    /// Comma-separated list of drugs to analyze, e.g. "codeine,warfarin"
    #[clap(required = true)]
    #[clap(short = 'd')]
    #[clap(long = "drugs")]
    #[clap(value_name = "LIST")]
    #[clap(help_heading = Some("Input/Output"))]
    pub drugs: String,

    /// Patient identifier copied onto every result; derived from the VCF content if not provided
    #[clap(short = 'p')]
    #[clap(long = "patient-id")]
    #[clap(value_name = "ID")]
    #[clap(help_heading = Some("Input/Output"))]
    pub patient_id: Option<String>,

    /// Optional guideline tables (JSON) to use instead of the built-in tables
    #[clap(short = 'g')]
    #[clap(long = "guidelines")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub guidelines_filename: Option<PathBuf>,

    /// Output analysis report (JSON); written to stdout if not provided
    #[clap(short = 'o')]
    #[clap(long = "output-json")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_filename: Option<PathBuf>,

    /// Optional per-drug summary table
    #[clap(long = "summary-tsv")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub summary_tsv: Option<PathBuf>,

    /// Credential for the explanation backend; the rule-based templates are used if absent
    #[clap(long = "api-key")]
    #[clap(env = "OPENAI_API_KEY")]
    #[clap(hide_env_values = true)]
    #[clap(value_name = "KEY")]
    #[clap(help_heading = Some("Explanation backend"))]
    pub api_key: Option<String>,

    /// Chat-completions endpoint for the explanation backend
    #[clap(long = "api-url")]
    #[clap(value_name = "URL")]
    #[clap(default_value = DEFAULT_API_URL)]
    #[clap(help_heading = Some("Explanation backend"))]
    pub api_url: String,

    /// Model requested from the explanation backend
    #[clap(long = "model")]
    #[clap(value_name = "NAME")]
    #[clap(default_value = DEFAULT_MODEL)]
    #[clap(help_heading = Some("Explanation backend"))]
    pub model: String,

    /// Timeout for each explanation request, in seconds
    #[clap(long = "timeout")]
    #[clap(value_name = "SECS")]
    #[clap(default_value_t = DEFAULT_TIMEOUT_SECS)]
    #[clap(help_heading = Some("Explanation backend"))]
    pub timeout_secs: u64,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl AnalyzeSettings {
    /// True if a non-empty backend credential was provided
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

pub fn check_analyze_settings(settings: AnalyzeSettings) -> Result<AnalyzeSettings, Box<dyn std::error::Error>> {
    info!("Inputs:");
    match (settings.vcf_filename.as_ref(), settings.sample) {
        (Some(_), true) => bail!("Only one of --vcf and --sample can be specified."),
        (None, false) => bail!("Must provide a VCF file with --vcf, or use --sample."),
        (Some(vcf_fn), false) => {
            check_required_filename(vcf_fn, "VCF file");
            info!("\tVCF: {vcf_fn:?}");
        },
        (None, true) => info!("\tVCF: built-in sample set")
    };

    let drug_list = parse_drug_list(&settings.drugs)?;
    info!("\tDrugs: {}", drug_list.join(", "));

    if let Some(patient_id) = settings.patient_id.as_ref() {
        if patient_id.trim().is_empty() {
            bail!("--patient-id cannot be empty.");
        }
        info!("\tPatient ID: {patient_id}");
    }

    check_optional_filename(settings.guidelines_filename.as_deref(), "Guidelines JSON");
    match settings.guidelines_filename.as_ref() {
        Some(gfn) => info!("\tGuidelines: {gfn:?}"),
        None => info!("\tGuidelines: built-in")
    };

    info!("Outputs:");
    match settings.output_filename.as_ref() {
        Some(ofn) => info!("\tAnalysis report: {ofn:?}"),
        None => info!("\tAnalysis report: stdout")
    };
    if let Some(filename) = settings.summary_tsv.as_ref() {
        info!("\tSummary TSV: {filename:?}");
    }

    info!("Explanation settings:");
    if settings.has_api_key() {
        if settings.timeout_secs == 0 {
            bail!("--timeout must be greater than 0");
        }
        info!("\tBackend: {} via {}", settings.model, settings.api_url);
        info!("\tTimeout: {} seconds", settings.timeout_secs);
    } else {
        warn!("\tBackend: no API key provided, all explanations will use the rule-based templates");
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_settings() -> AnalyzeSettings {
        AnalyzeSettings {
            sample: true,
            drugs: "codeine".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            ..Default::default()
        }
    }

    #[test]
    fn test_check_sample_settings() {
        let settings = check_analyze_settings(sample_settings()).unwrap();
        assert!(settings.sample);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_check_errors() {
        let mut settings = sample_settings();
        settings.sample = false;
        assert!(check_analyze_settings(settings).is_err());

        let mut settings = sample_settings();
        settings.vcf_filename = Some(PathBuf::from("fake.vcf"));
        assert!(check_analyze_settings(settings).is_err());

        let mut settings = sample_settings();
        settings.drugs = " , ".to_string();
        assert!(check_analyze_settings(settings).is_err());

        let mut settings = sample_settings();
        settings.patient_id = Some("  ".to_string());
        assert!(check_analyze_settings(settings).is_err());

        let mut settings = sample_settings();
        settings.api_key = Some("key".to_string());
        settings.timeout_secs = 0;
        assert!(check_analyze_settings(settings).is_err());
    }
}
