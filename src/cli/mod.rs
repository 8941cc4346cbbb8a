
/// the main CLI module
pub mod core;
/// the analyze CLI subcommand for assessing drug risks
pub mod analyze;
/// The export CLI subcommand for writing the built-in guideline tables
pub mod export_guidelines;
/// The supported CLI subcommand for listing drugs and genes
pub mod supported;
