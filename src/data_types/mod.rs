
/// Contains the final report types that get serialized
pub mod analysis_report;
/// Contains definitions related to star alleles and the representation of a diplotype
pub mod pgx_diplotype;
/// Contains the allele function tiers and phenotype categories
pub mod pgx_phenotype;
/// Contains the risk label, severity, and recommendation types
pub mod pgx_risk;
/// Contains the parsed variant record
pub mod variant_record;
