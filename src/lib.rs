
/// Contains all the CLI related functionality
pub mod cli;
/// Contains any specialized data types that are shared across the tooling
pub mod data_types;
/// Contains the functionality for calling a diplotype and phenotype for a gene
pub mod diplotyper;
/// Contains the explanation sources, generative and rule-based
pub mod explanation;
/// Contains functionality for displaying the supported drugs and genes
pub mod guideline_stat;
/// Contains the guideline tables and their built-in content
pub mod guidelines;
/// Contains the per-drug pipeline and report assembly
pub mod report;
/// Contains the drug risk classifier
pub mod risk;
/// Contains generic utilities that are handy wrappers
pub mod util;
/// Contains the VCF text parser
pub mod vcf_parser;
