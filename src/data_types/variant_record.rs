
use serde::Serialize;

/// The zygosity we can extract from a sample GT field
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display)]
pub enum Zygosity {
    /// No GT column was provided, so we cannot tell; these are retained
    #[serde(rename = "not_provided")]
    #[strum(to_string = "not_provided")]
    NotProvided,
    /// 0/1, 1|0, etc.
    #[serde(rename = "heterozygous")]
    #[strum(to_string = "heterozygous")]
    Heterozygous,
    /// 1/1, 1|1, or a haploid 1
    #[serde(rename = "homozygous_alternate")]
    #[strum(to_string = "homozygous_alternate")]
    HomozygousAlternate
}

/// A single retained pharmacogenomic call from the variant file.
/// Only rows that carry GENE, STAR, and RS annotations and show evidence of an alternate allele become a VariantRecord.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariantRecord {
    /// Normalized dbSNP ID, always prefixed with "rs" if it was numeric
    rsid: String,
    /// Chromosome from CHROM
    chromosome: String,
    /// 1-based position from POS
    position: u64,
    /// Row identifier from ID, "." if absent
    variant_id: String,
    /// REF column
    ref_allele: String,
    /// ALT column
    alt_allele: String,
    /// Gene symbol from INFO GENE
    gene: String,
    /// Star allele from INFO STAR
    star_allele: String,
    /// FILTER column
    filter_status: String,
    /// Zygosity derived from GT, if present
    zygosity: Zygosity
}

impl VariantRecord {
    /// Constructor, normalizes the rsid
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chromosome: String, position: u64, variant_id: String,
        ref_allele: String, alt_allele: String, filter_status: String,
        gene: String, star_allele: String, rsid: &str, zygosity: Zygosity
    ) -> VariantRecord {
        VariantRecord {
            rsid: normalize_rsid(rsid),
            chromosome,
            position,
            variant_id,
            ref_allele,
            alt_allele,
            gene,
            star_allele,
            filter_status,
            zygosity
        }
    }

    // getters
    pub fn rsid(&self) -> &str {
        &self.rsid
    }

    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    pub fn alt_allele(&self) -> &str {
        &self.alt_allele
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn star_allele(&self) -> &str {
        &self.star_allele
    }

    pub fn filter_status(&self) -> &str {
        &self.filter_status
    }

    pub fn zygosity(&self) -> Zygosity {
        self.zygosity
    }
}

/// Bare numeric IDs get an "rs" prefix, everything else is left alone.
/// # Arguments
/// * `rsid` - the raw value from the INFO RS field
pub fn normalize_rsid(rsid: &str) -> String {
    let rsid = rsid.trim();
    if !rsid.is_empty() && rsid.chars().all(|c| c.is_ascii_digit()) {
        format!("rs{rsid}")
    } else {
        rsid.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rsid() {
        assert_eq!(normalize_rsid("rs3892097"), "rs3892097");
        assert_eq!(normalize_rsid("3892097"), "rs3892097");
        assert_eq!(normalize_rsid(" 12 "), "rs12");
        assert_eq!(normalize_rsid("COSV123"), "COSV123");
        assert_eq!(normalize_rsid(""), "");
    }

    #[test]
    fn test_serialized_fields() {
        let record = VariantRecord::new(
            "chr22".to_string(), 42522613, "rs3892097".to_string(),
            "C".to_string(), "T".to_string(), "PASS".to_string(),
            "CYP2D6".to_string(), "*4".to_string(), "3892097", Zygosity::Heterozygous
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["rsid"], "rs3892097");
        assert_eq!(value["position"], 42522613);
        assert_eq!(value["star_allele"], "*4");
        // echoed for audit
        assert_eq!(value["variant_id"], "rs3892097");
        assert_eq!(value["filter_status"], "PASS");
        assert_eq!(value["zygosity"], "heterozygous");
    }
}
