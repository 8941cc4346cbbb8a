
use clap::Args;
use log::info;
use std::path::PathBuf;

use crate::cli::core::{check_optional_filename, AFTER_HELP};

#[derive(Clone, Args)]
#[clap(author, about,
    after_help = &**AFTER_HELP)]
pub struct SupportedSettings {
    /// Optional guideline tables (JSON) to use instead of the built-in tables
    #[clap(short = 'g')]
    #[clap(long = "guidelines")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub guidelines_filename: Option<PathBuf>,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_supported_settings(settings: SupportedSettings) -> SupportedSettings {
    // dump stuff to the logger
    check_optional_filename(settings.guidelines_filename.as_deref(), "Guidelines JSON");
    match settings.guidelines_filename.as_ref() {
        Some(gfn) => info!("Input guidelines: {gfn:?}"),
        None => info!("Input guidelines: built-in")
    };
    settings
}
