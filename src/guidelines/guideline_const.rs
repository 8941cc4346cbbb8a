
// gene names to prevent dev typos
pub const CYP2C19: &str = "CYP2C19";
pub const CYP2C9: &str = "CYP2C9";
pub const CYP2D6: &str = "CYP2D6";
pub const DPYD: &str = "DPYD";
pub const SLCO1B1: &str = "SLCO1B1";
pub const TPMT: &str = "TPMT";

// drug names, always upper-case
pub const AZATHIOPRINE: &str = "AZATHIOPRINE";
pub const CLOPIDOGREL: &str = "CLOPIDOGREL";
pub const CODEINE: &str = "CODEINE";
pub const FLUOROURACIL: &str = "FLUOROURACIL";
pub const SIMVASTATIN: &str = "SIMVASTATIN";
pub const WARFARIN: &str = "WARFARIN";

/// Every gene in the built-in tables uses *1 as the reference (wild-type) allele
pub const REFERENCE_ALLELE: &str = "*1";

/// Label reported for the gene/diplotype of an unsupported drug
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Where the built-in rule content comes from
pub const GUIDELINE_SOURCE: &str = "CPIC";
/// Version label for the built-in tables
pub const GUIDELINE_VERSION: &str = "builtin-2024.1";
