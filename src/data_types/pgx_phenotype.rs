
use serde::{Deserialize, Serialize};

/// The functional activity tier of a single star allele
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display, strum_macros::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FunctionTier {
    NoFunction,
    DecreasedFunction,
    NormalFunction,
    IncreasedFunction,
    /// Any allele that is not in the guideline tables
    UnknownFunction
}

/// A categorical metabolizer or transporter function status for one gene
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display, strum_macros::EnumString)]
pub enum Phenotype {
    #[serde(rename = "Poor Metabolizer")]
    #[strum(to_string = "Poor Metabolizer")]
    PoorMetabolizer,
    #[serde(rename = "Intermediate Metabolizer")]
    #[strum(to_string = "Intermediate Metabolizer")]
    IntermediateMetabolizer,
    #[serde(rename = "Normal Metabolizer")]
    #[strum(to_string = "Normal Metabolizer")]
    NormalMetabolizer,
    #[serde(rename = "Rapid Metabolizer")]
    #[strum(to_string = "Rapid Metabolizer")]
    RapidMetabolizer,
    #[serde(rename = "Ultrarapid Metabolizer")]
    #[strum(to_string = "Ultrarapid Metabolizer")]
    UltrarapidMetabolizer,
    #[serde(rename = "Normal Function")]
    #[strum(to_string = "Normal Function")]
    NormalFunction,
    #[serde(rename = "Decreased Function")]
    #[strum(to_string = "Decreased Function")]
    DecreasedFunction,
    #[serde(rename = "Poor Function")]
    #[strum(to_string = "Poor Function")]
    PoorFunction,
    Unknown
}

impl Phenotype {
    /// Loose activity description used in explanation templates
    pub fn activity_description(&self) -> &'static str {
        match self {
            Phenotype::PoorMetabolizer |
            Phenotype::PoorFunction => "absent or severely reduced",
            Phenotype::IntermediateMetabolizer |
            Phenotype::DecreasedFunction => "reduced",
            Phenotype::RapidMetabolizer |
            Phenotype::UltrarapidMetabolizer => "increased",
            Phenotype::NormalMetabolizer |
            Phenotype::NormalFunction => "normal",
            Phenotype::Unknown => "unknown"
        }
    }

    /// True for the phenotypes at the "poor" end of the scale
    pub fn is_poor(&self) -> bool {
        matches!(self, Phenotype::PoorMetabolizer | Phenotype::PoorFunction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_phenotype_strings() {
        assert_eq!(Phenotype::PoorMetabolizer.to_string(), "Poor Metabolizer");
        assert_eq!(Phenotype::from_str("Decreased Function").unwrap(), Phenotype::DecreasedFunction);
        assert_eq!(serde_json::to_string(&Phenotype::UltrarapidMetabolizer).unwrap(), "\"Ultrarapid Metabolizer\"");
        assert_eq!(Phenotype::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_function_tier_strings() {
        assert_eq!(FunctionTier::NoFunction.to_string(), "no_function");
        assert_eq!(FunctionTier::from_str("increased_function").unwrap(), FunctionTier::IncreasedFunction);
        assert_eq!(serde_json::to_string(&FunctionTier::UnknownFunction).unwrap(), "\"unknown_function\"");
    }
}
