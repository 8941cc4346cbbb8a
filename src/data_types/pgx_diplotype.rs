
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Star allele notation: `*4`, `*2A`, `*1xN`, `*2x2`, `*41`
    static ref STAR_REGEX: Regex = Regex::new(r"^\*(?<number>[0-9]+)(?<suffix>[A-Za-z]*?)(?:[xX](?<copies>[0-9]+|[nN]))?$").unwrap();
}

/// Suffix we use to mark an allele that occurs in increased copy number
pub const AMPLIFIED_SUFFIX: &str = "xN";

/// A parsed star allele label, separating out any copy-number notation
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct StarAllele {
    /// The allele without copy-number notation, e.g. "*2A"
    base: String,
    /// True if the label carried copy-number notation (e.g. "x2", "xN")
    copy_number_gain: bool,
    /// (star number, suffix) used for canonical ordering; non-standard labels sort last
    sort_key: (u64, String)
}

impl StarAllele {
    /// Parses a raw label; anything that does not look like a star allele is kept verbatim
    /// # Arguments
    /// * `label` - the raw allele label, e.g. "*1xN"
    pub fn parse(label: &str) -> StarAllele {
        let label = label.trim();
        match STAR_REGEX.captures(label) {
            Some(captures) => {
                let number = &captures["number"];
                let suffix = &captures["suffix"];
                // copies of "1" is not actually a gain, e.g. "*1x1"
                let copy_number_gain = captures.name("copies")
                    .map(|c| c.as_str() != "1")
                    .unwrap_or(false);
                StarAllele {
                    base: format!("*{number}{suffix}"),
                    copy_number_gain,
                    sort_key: (number.parse().unwrap_or(u64::MAX), suffix.to_string())
                }
            },
            None => StarAllele {
                base: label.to_string(),
                copy_number_gain: false,
                sort_key: (u64::MAX, label.to_string())
            }
        }
    }

    /// Returns the label to report: the base allele, with "xN" if `amplified` is set
    pub fn label(&self, amplified: bool) -> String {
        if amplified {
            format!("{}{AMPLIFIED_SUFFIX}", self.base)
        } else {
            self.base.clone()
        }
    }

    // getters
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn copy_number_gain(&self) -> bool {
        self.copy_number_gain
    }

    pub fn sort_key(&self) -> &(u64, String) {
        &self.sort_key
    }
}

/// Contains all the information related to a single gene's diplotype result
#[derive(Clone, Debug, Deserialize, Eq, Serialize)]
pub struct Diplotype {
    /// short string for haplotype 1
    hap1: String,
    /// short string for haplotype 2
    hap2: String,
    /// combination diplotype call
    diplotype: String
}

impl Diplotype {
    pub fn new(hap1: &str, hap2: &str) -> Diplotype {
        Diplotype {
            hap1: hap1.to_string(),
            hap2: hap2.to_string(),
            diplotype: format!("{hap1}/{hap2}")
        }
    }

    /// Builds a diplotype in canonical order: the reference allele first, then by star number.
    /// # Arguments
    /// * `hap_a` - one haplotype label
    /// * `hap_b` - the other haplotype label
    /// * `reference_allele` - the gene's reference allele, which always goes first
    pub fn new_canonical(hap_a: &str, hap_b: &str, reference_allele: &str) -> Diplotype {
        let key = |h: &str| {
            let parsed = StarAllele::parse(h);
            // reference comes before everything, amplified labels after their base
            (parsed.base() != reference_allele, parsed.sort_key().clone(), parsed.copy_number_gain())
        };
        if key(hap_b) < key(hap_a) {
            Diplotype::new(hap_b, hap_a)
        } else {
            Diplotype::new(hap_a, hap_b)
        }
    }

    /// If homozygous, return the single haplotype
    pub fn homozygous_haplotype(&self) -> Option<&str> {
        if self.hap1 == self.hap2 {
            Some(&self.hap1)
        } else {
            None
        }
    }

    // getters
    pub fn hap1(&self) -> &str {
        &self.hap1
    }

    pub fn hap2(&self) -> &str {
        &self.hap2
    }

    pub fn diplotype(&self) -> &str {
        &self.diplotype
    }
}

impl PartialEq for Diplotype {
    fn eq(&self, other: &Self) -> bool {
        // this allows for a swap in hap1/hap2 and we still report identity
        (self.hap1 == other.hap1 && self.hap2 == other.hap2) ||
            (self.hap1 == other.hap2 && self.hap2 == other.hap1)
    }
}

impl std::fmt::Display for Diplotype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.diplotype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diplotype() {
        let diplotype = Diplotype::new("*4", "*1");
        assert_eq!(diplotype.diplotype(), "*4/*1");
        assert_eq!(diplotype, Diplotype::new("*1", "*4"));
        assert_eq!(diplotype.homozygous_haplotype(), None);
        assert_eq!(Diplotype::new("*4", "*4").homozygous_haplotype(), Some("*4"));
    }

    #[test]
    fn test_canonical_order() {
        assert_eq!(Diplotype::new_canonical("*4", "*1", "*1").diplotype(), "*1/*4");
        assert_eq!(Diplotype::new_canonical("*41", "*4", "*1").diplotype(), "*4/*41");
        assert_eq!(Diplotype::new_canonical("*17", "*2", "*1").diplotype(), "*2/*17");
        assert_eq!(Diplotype::new_canonical("*1xN", "*1", "*1").diplotype(), "*1/*1xN");
        assert_eq!(Diplotype::new_canonical("*3C", "*3A", "*1").diplotype(), "*3A/*3C");
    }

    #[test]
    fn test_star_allele_parse() {
        let plain = StarAllele::parse("*4");
        assert_eq!(plain.base(), "*4");
        assert!(!plain.copy_number_gain());
        assert_eq!(plain.sort_key(), &(4, String::new()));

        let suffixed = StarAllele::parse("*2A");
        assert_eq!(suffixed.base(), "*2A");
        assert!(!suffixed.copy_number_gain());

        for amplified in ["*1xN", "*1x2", "*1XN", "*1x3"] {
            let parsed = StarAllele::parse(amplified);
            assert_eq!(parsed.base(), "*1");
            assert!(parsed.copy_number_gain());
            assert_eq!(parsed.label(true), "*1xN");
            assert_eq!(parsed.label(false), "*1");
        }

        let single_copy = StarAllele::parse("*2x1");
        assert_eq!(single_copy.base(), "*2");
        assert!(!single_copy.copy_number_gain());

        let odd = StarAllele::parse("HapB3");
        assert_eq!(odd.base(), "HapB3");
        assert_eq!(odd.sort_key().0, u64::MAX);
    }
}
