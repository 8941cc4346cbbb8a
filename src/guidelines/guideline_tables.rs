
use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleError, bail};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry::{Occupied, Vacant};

use crate::data_types::pgx_diplotype::{AMPLIFIED_SUFFIX, StarAllele};
use crate::data_types::pgx_phenotype::{FunctionTier, Phenotype};
use crate::data_types::pgx_risk::{RiskLabel, Severity};

/// This is the full set of guideline information that every analysis reads from.
/// It is built once (or loaded once from JSON) and then only ever borrowed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GuidelineTables {
    /// Metadata for the tables
    guideline_metadata: GuidelineMetadata,
    /// Map from gene name to the allele function and phenotype rules for that gene
    gene_entries: BTreeMap<String, GeneGuideline>,
    /// Map from upper-case drug name to the risk rules for that drug
    drug_entries: BTreeMap<String, DrugGuideline>
}

impl GuidelineTables {
    /// Creates a new set of tables, making sure we do not double insert anything.
    /// # Arguments
    /// * `guideline_metadata` - where these tables came from
    /// * `genes` - the gene guidelines
    /// * `drugs` - the drug guidelines, names are upper-cased on insert
    /// # Errors
    /// * if a gene or drug is provided more than once
    pub fn new(guideline_metadata: GuidelineMetadata, genes: Vec<GeneGuideline>, drugs: Vec<DrugGuideline>) -> Result<GuidelineTables, SimpleError> {
        let mut gene_entries: BTreeMap<String, GeneGuideline> = Default::default();
        for gene in genes.into_iter() {
            match gene_entries.entry(gene.gene_name.clone()) {
                Vacant(entry) => { entry.insert(gene); },
                Occupied(entry) => bail!("Gene entry for {} is already occupied.", entry.key())
            };
        }

        let mut drug_entries: BTreeMap<String, DrugGuideline> = Default::default();
        for mut drug in drugs.into_iter() {
            drug.drug_name = drug.drug_name.to_uppercase();
            match drug_entries.entry(drug.drug_name.clone()) {
                Vacant(entry) => { entry.insert(drug); },
                Occupied(entry) => bail!("Drug entry for {} is already occupied.", entry.key())
            };
        }

        Ok(GuidelineTables {
            guideline_metadata,
            gene_entries,
            drug_entries
        })
    }

    /// Validates the loaded tables where possible.
    /// This does not prevent content errors, but it guarantees every lookup the pipeline performs has a defined fallback.
    /// # Errors
    /// * if a gene reference allele is missing or not a known function
    /// * if a gene combination rule is duplicated, or the reference pair does not resolve
    /// * if a drug refers to a gene that is not defined
    /// * if a drug rule has an unreachable phenotype or an invalid confidence
    pub fn validate(&self) -> Result<(), SimpleError> {
        for (gene_name, gene_entry) in self.gene_entries.iter() {
            if gene_name != &gene_entry.gene_name {
                bail!("Gene entry key \"{gene_name}\" does not match gene name \"{}\".", gene_entry.gene_name);
            }
            gene_entry.validate()?;
        }

        for (drug_name, drug_entry) in self.drug_entries.iter() {
            if drug_name != &drug_entry.drug_name || drug_name != &drug_name.to_uppercase() {
                bail!("Drug entry key \"{drug_name}\" must be the upper-case drug name, found \"{}\".", drug_entry.drug_name);
            }

            let gene_entry = match self.gene_entries.get(&drug_entry.primary_gene) {
                Some(ge) => ge,
                None => bail!("{drug_name} has primary gene {}, which is not in the gene tables.", drug_entry.primary_gene)
            };
            for secondary in drug_entry.secondary_genes.iter() {
                if !self.gene_entries.contains_key(secondary) {
                    bail!("{} has secondary gene {}, which is not in the gene tables.", drug_name, secondary);
                }
            }

            let reachable: HashSet<Phenotype> = gene_entry.reachable_phenotypes();
            let mut observed: HashSet<Phenotype> = Default::default();
            for rule in drug_entry.risk_rules.iter() {
                if !reachable.contains(&rule.phenotype) {
                    bail!("{drug_name} has a rule for \"{}\", which {} can never produce.", rule.phenotype, gene_entry.gene_name);
                }
                if !observed.insert(rule.phenotype) {
                    bail!("{drug_name} has multiple rules for \"{}\".", rule.phenotype);
                }
                if !(0.0..=1.0).contains(&rule.confidence_score) {
                    bail!("{drug_name} rule for \"{}\" has confidence {}, must be between 0.0 and 1.0.", rule.phenotype, rule.confidence_score);
                }
                if rule.risk_label == RiskLabel::Unknown {
                    bail!("{drug_name} rule for \"{}\" cannot have the Unknown label.", rule.phenotype);
                }
            }
            debug!("{drug_name} -> {}: {} rules", drug_entry.primary_gene, drug_entry.risk_rules.len());
        }

        Ok(())
    }

    /// Case-insensitive drug lookup
    /// # Arguments
    /// * `drug_name` - the drug to find, surrounding whitespace is ignored
    pub fn drug(&self, drug_name: &str) -> Option<&DrugGuideline> {
        self.drug_entries.get(&drug_name.trim().to_uppercase())
    }

    /// Exact gene lookup
    pub fn gene(&self, gene_name: &str) -> Option<&GeneGuideline> {
        self.gene_entries.get(gene_name)
    }

    /// The sorted list of supported drug names
    pub fn supported_drugs(&self) -> Vec<&str> {
        self.drug_entries.keys().map(|d| d.as_str()).collect()
    }

    /// The sorted list of supported gene names
    pub fn supported_genes(&self) -> Vec<&str> {
        self.gene_entries.keys().map(|g| g.as_str()).collect()
    }

    // getters
    pub fn guideline_metadata(&self) -> &GuidelineMetadata {
        &self.guideline_metadata
    }

    pub fn gene_entries(&self) -> &BTreeMap<String, GeneGuideline> {
        &self.gene_entries
    }

    pub fn drug_entries(&self) -> &BTreeMap<String, DrugGuideline> {
        &self.drug_entries
    }
}

impl Default for GuidelineTables {
    fn default() -> Self {
        crate::guidelines::builtin_tables::builtin_tables()
    }
}

/// Metadata describing where the tables came from
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GuidelineMetadata {
    /// The guideline body the rule content follows
    pub guideline_source: String,
    /// Version label for the rule content
    pub guideline_version: String
}

/// One unordered pair of function tiers and the phenotype it resolves to
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TierCombination {
    /// First tier of the pair
    pub tier_a: FunctionTier,
    /// Second tier of the pair, order does not matter
    pub tier_b: FunctionTier,
    /// The phenotype this combination resolves to
    pub phenotype: Phenotype
}

impl TierCombination {
    pub fn new(tier_a: FunctionTier, tier_b: FunctionTier, phenotype: Phenotype) -> TierCombination {
        TierCombination { tier_a, tier_b, phenotype }
    }

    /// True if this rule covers the pair, in either order
    fn matches(&self, t1: FunctionTier, t2: FunctionTier) -> bool {
        (self.tier_a == t1 && self.tier_b == t2) ||
            (self.tier_a == t2 && self.tier_b == t1)
    }

    /// Order-independent key for duplicate checks
    fn sorted_key(&self) -> (FunctionTier, FunctionTier) {
        if self.tier_a <= self.tier_b {
            (self.tier_a, self.tier_b)
        } else {
            (self.tier_b, self.tier_a)
        }
    }
}

/// Everything we know about one gene: allele functions and how pairs of them combine
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GeneGuideline {
    /// The gene name
    gene_name: String,
    /// The reference (wild-type) allele for the gene, e.g. "*1"
    reference_allele: String,
    /// Star allele to function; amplified alleles are listed with an "xN" suffix
    allele_functions: BTreeMap<String, FunctionTier>,
    /// How two function tiers combine into a phenotype
    combination_rules: Vec<TierCombination>
}

impl GeneGuideline {
    pub fn new(gene_name: &str, reference_allele: &str, allele_functions: BTreeMap<String, FunctionTier>, combination_rules: Vec<TierCombination>) -> GeneGuideline {
        GeneGuideline {
            gene_name: gene_name.to_string(),
            reference_allele: reference_allele.to_string(),
            allele_functions,
            combination_rules
        }
    }

    /// Checks that this gene can always resolve its own wild-type diplotype.
    fn validate(&self) -> Result<(), SimpleError> {
        let gene_name = &self.gene_name;
        let reference_tier = self.allele_function(&self.reference_allele);
        if reference_tier == FunctionTier::UnknownFunction {
            bail!("{gene_name} reference allele {} does not have a known function.", self.reference_allele);
        }

        let mut seen: HashSet<(FunctionTier, FunctionTier)> = Default::default();
        for rule in self.combination_rules.iter() {
            if rule.tier_a == FunctionTier::UnknownFunction || rule.tier_b == FunctionTier::UnknownFunction {
                bail!("{} has a combination rule using unknown_function, which always resolves to Unknown.", gene_name);
            }
            if rule.phenotype == Phenotype::Unknown {
                bail!("{} has a combination rule resolving to Unknown, remove the rule instead.", gene_name);
            }
            if !seen.insert(rule.sorted_key()) {
                bail!("{gene_name} has duplicate combination rules for {}/{}.", rule.tier_a, rule.tier_b);
            }
        }

        if self.combine(reference_tier, reference_tier) == Phenotype::Unknown {
            bail!("{gene_name} has no combination rule for the reference diplotype {0}/{0}.", self.reference_allele);
        }
        Ok(())
    }

    /// Function lookup; anything not in the table is `UnknownFunction`
    /// # Arguments
    /// * `star_allele` - the allele label, including any "xN" suffix
    pub fn allele_function(&self, star_allele: &str) -> FunctionTier {
        self.allele_functions.get(star_allele)
            .copied()
            .unwrap_or(FunctionTier::UnknownFunction)
    }

    /// True if the tables list this allele as occurring in increased copy number
    /// # Arguments
    /// * `base_allele` - the allele without copy-number notation
    pub fn is_amplifiable(&self, base_allele: &str) -> bool {
        self.allele_functions.contains_key(&format!("{base_allele}{AMPLIFIED_SUFFIX}"))
    }

    /// Converts a raw observed label into the label we report.
    /// Copy-number notation is only kept when the allele is known to be amplified.
    /// # Arguments
    /// * `raw_label` - the label from the variant file, e.g. "*2x3"
    pub fn resolve_label(&self, raw_label: &str) -> String {
        let parsed = StarAllele::parse(raw_label);
        let amplified = parsed.copy_number_gain() && self.is_amplifiable(parsed.base());
        parsed.label(amplified)
    }

    /// Combines two tiers using this gene's rules; unknown tiers or missing rules give Unknown
    pub fn combine(&self, t1: FunctionTier, t2: FunctionTier) -> Phenotype {
        if t1 == FunctionTier::UnknownFunction || t2 == FunctionTier::UnknownFunction {
            return Phenotype::Unknown;
        }
        self.combination_rules.iter()
            .find(|rule| rule.matches(t1, t2))
            .map(|rule| rule.phenotype)
            .unwrap_or(Phenotype::Unknown)
    }

    /// Phenotype for a pair of (already resolved) allele labels
    pub fn phenotype_for(&self, hap1: &str, hap2: &str) -> Phenotype {
        self.combine(self.allele_function(hap1), self.allele_function(hap2))
    }

    /// The set of phenotypes this gene can produce, used for validating drug rules
    pub fn reachable_phenotypes(&self) -> HashSet<Phenotype> {
        self.combination_rules.iter()
            .map(|rule| rule.phenotype)
            .collect()
    }

    /// Alleles the tables know about, in canonical star order
    pub fn known_alleles(&self) -> Vec<&str> {
        self.allele_functions.keys()
            .map(|k| k.as_str())
            .sorted_by_key(|k| {
                let parsed = StarAllele::parse(k);
                (parsed.sort_key().clone(), parsed.copy_number_gain())
            })
            .collect()
    }

    // getters
    pub fn gene_name(&self) -> &str {
        &self.gene_name
    }

    pub fn reference_allele(&self) -> &str {
        &self.reference_allele
    }

    pub fn allele_functions(&self) -> &BTreeMap<String, FunctionTier> {
        &self.allele_functions
    }

    pub fn combination_rules(&self) -> &[TierCombination] {
        &self.combination_rules
    }
}

/// A single (gene, phenotype, drug) rule
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DrugRiskRule {
    /// The phenotype of the primary gene this rule applies to
    pub phenotype: Phenotype,
    /// Reported risk label
    pub risk_label: RiskLabel,
    /// Reported severity
    pub severity: Severity,
    /// Fixed guideline-concordance baseline
    pub confidence_score: f64,
    /// Plain-language recommendation
    pub recommendation: String,
    /// Guideline citation text
    pub cpic_recommendation: String,
    /// Carried verbatim into the clinical recommendation
    pub contraindicated: bool,
    /// Carried verbatim into the clinical recommendation
    pub requires_dose_adjustment: bool
}

/// Everything we know about one drug
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DrugGuideline {
    /// Upper-case drug name
    drug_name: String,
    /// The gene whose phenotype drives the risk rules
    primary_gene: String,
    /// Other genes with guideline relevance, reported for reference only
    #[serde(default)]
    secondary_genes: Vec<String>,
    /// One rule per phenotype of the primary gene
    risk_rules: Vec<DrugRiskRule>
}

impl DrugGuideline {
    pub fn new(drug_name: &str, primary_gene: &str, secondary_genes: Vec<String>, risk_rules: Vec<DrugRiskRule>) -> DrugGuideline {
        DrugGuideline {
            drug_name: drug_name.to_uppercase(),
            primary_gene: primary_gene.to_string(),
            secondary_genes,
            risk_rules
        }
    }

    /// Rule lookup for a primary gene phenotype
    pub fn rule(&self, phenotype: Phenotype) -> Option<&DrugRiskRule> {
        self.risk_rules.iter().find(|r| r.phenotype == phenotype)
    }

    // getters
    pub fn drug_name(&self) -> &str {
        &self.drug_name
    }

    pub fn primary_gene(&self) -> &str {
        &self.primary_gene
    }

    pub fn secondary_genes(&self) -> &[String] {
        &self.secondary_genes
    }

    pub fn risk_rules(&self) -> &[DrugRiskRule] {
        &self.risk_rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::guidelines::guideline_const::*;

    fn simple_gene() -> GeneGuideline {
        let allele_functions: BTreeMap<String, FunctionTier> = [
            ("*1", FunctionTier::NormalFunction),
            ("*2", FunctionTier::NoFunction),
            ("*1xN", FunctionTier::IncreasedFunction)
        ].into_iter().map(|(a, t)| (a.to_string(), t)).collect();
        let combination_rules = vec![
            TierCombination::new(FunctionTier::NormalFunction, FunctionTier::NormalFunction, Phenotype::NormalMetabolizer),
            TierCombination::new(FunctionTier::NormalFunction, FunctionTier::NoFunction, Phenotype::IntermediateMetabolizer),
            TierCombination::new(FunctionTier::NormalFunction, FunctionTier::IncreasedFunction, Phenotype::UltrarapidMetabolizer)
        ];
        GeneGuideline::new("GENE1", "*1", allele_functions, combination_rules)
    }

    fn simple_rule(phenotype: Phenotype, risk_label: RiskLabel) -> DrugRiskRule {
        DrugRiskRule {
            phenotype,
            risk_label,
            severity: Severity::None,
            confidence_score: 0.9,
            recommendation: "rec".to_string(),
            cpic_recommendation: "cpic".to_string(),
            contraindicated: false,
            requires_dose_adjustment: false
        }
    }

    fn metadata() -> GuidelineMetadata {
        GuidelineMetadata {
            guideline_source: "test".to_string(),
            guideline_version: "0".to_string()
        }
    }

    #[test]
    fn test_gene_lookups() {
        let gene = simple_gene();
        assert_eq!(gene.allele_function("*1"), FunctionTier::NormalFunction);
        assert_eq!(gene.allele_function("*99"), FunctionTier::UnknownFunction);
        assert!(gene.is_amplifiable("*1"));
        assert!(!gene.is_amplifiable("*2"));
        assert_eq!(gene.resolve_label("*1x3"), "*1xN");
        assert_eq!(gene.resolve_label("*2x2"), "*2");
        assert_eq!(gene.resolve_label("*2"), "*2");

        // asymmetric pairs work in both orders
        assert_eq!(gene.phenotype_for("*1", "*2"), Phenotype::IntermediateMetabolizer);
        assert_eq!(gene.phenotype_for("*2", "*1"), Phenotype::IntermediateMetabolizer);
        assert_eq!(gene.phenotype_for("*1", "*1xN"), Phenotype::UltrarapidMetabolizer);

        // no rule for No/No, and unknown alleles propagate
        assert_eq!(gene.phenotype_for("*2", "*2"), Phenotype::Unknown);
        assert_eq!(gene.phenotype_for("*1", "*99"), Phenotype::Unknown);

        assert_eq!(gene.known_alleles(), vec!["*1", "*1xN", "*2"]);
    }

    #[test]
    fn test_builtin_validates() {
        let tables = GuidelineTables::default();
        tables.validate().unwrap();
        assert_eq!(tables.supported_drugs(), vec![AZATHIOPRINE, CLOPIDOGREL, CODEINE, FLUOROURACIL, SIMVASTATIN, WARFARIN]);
        assert_eq!(tables.supported_genes(), vec![CYP2C19, CYP2C9, CYP2D6, DPYD, SLCO1B1, TPMT]);
    }

    #[test]
    fn test_drug_lookup_case() {
        let tables = GuidelineTables::default();
        assert_eq!(tables.drug("codeine").unwrap().primary_gene(), CYP2D6);
        assert_eq!(tables.drug("  Warfarin ").unwrap().primary_gene(), CYP2C9);
        assert!(tables.drug("ASPIRIN").is_none());
    }

    #[test]
    fn test_error_duplicate_entries() {
        let result = GuidelineTables::new(metadata(), vec![simple_gene(), simple_gene()], vec![]);
        assert!(result.is_err());

        let drug = DrugGuideline::new("drug1", "GENE1", vec![], vec![simple_rule(Phenotype::NormalMetabolizer, RiskLabel::Safe)]);
        let result = GuidelineTables::new(metadata(), vec![simple_gene()], vec![drug.clone(), drug]);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_missing_gene() {
        let drug = DrugGuideline::new("drug1", "GENE2", vec![], vec![]);
        let tables = GuidelineTables::new(metadata(), vec![simple_gene()], vec![drug]).unwrap();
        assert!(tables.validate().is_err());
    }

    #[test]
    fn test_error_unreachable_phenotype() {
        let drug = DrugGuideline::new("drug1", "GENE1", vec![], vec![simple_rule(Phenotype::PoorFunction, RiskLabel::Toxic)]);
        let tables = GuidelineTables::new(metadata(), vec![simple_gene()], vec![drug]).unwrap();
        assert!(tables.validate().is_err());
    }

    #[test]
    fn test_error_bad_confidence() {
        let mut rule = simple_rule(Phenotype::NormalMetabolizer, RiskLabel::Safe);
        rule.confidence_score = 1.5;
        let drug = DrugGuideline::new("drug1", "GENE1", vec![], vec![rule]);
        let tables = GuidelineTables::new(metadata(), vec![simple_gene()], vec![drug]).unwrap();
        assert!(tables.validate().is_err());
    }

    #[test]
    fn test_error_missing_reference_rule() {
        let mut gene = simple_gene();
        gene.combination_rules.remove(0);
        let tables = GuidelineTables::new(metadata(), vec![gene], vec![]).unwrap();
        assert!(tables.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let tables = GuidelineTables::default();
        let json = serde_json::to_string(&tables).unwrap();
        let reloaded: GuidelineTables = serde_json::from_str(&json).unwrap();
        assert_eq!(tables, reloaded);
        reloaded.validate().unwrap();
    }
}
