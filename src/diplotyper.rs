
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::data_types::pgx_diplotype::Diplotype;
use crate::data_types::pgx_phenotype::Phenotype;
use crate::data_types::variant_record::{VariantRecord, Zygosity};
use crate::guidelines::guideline_const::REFERENCE_ALLELE;
use crate::guidelines::guideline_tables::GeneGuideline;

/// A single distinct allele observed for a gene
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObservedAllele {
    /// The reported label, copy-number notation already resolved
    star_allele: String,
    /// The strongest zygosity seen across every record for this allele
    zygosity: Zygosity,
    /// Supporting rsids, in file order
    rsids: Vec<String>
}

impl ObservedAllele {
    // getters
    pub fn star_allele(&self) -> &str {
        &self.star_allele
    }

    pub fn zygosity(&self) -> Zygosity {
        self.zygosity
    }

    pub fn rsids(&self) -> &[String] {
        &self.rsids
    }
}

/// The ordered, de-duplicated set of alleles observed for one gene
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneProfile {
    /// The gene symbol
    gene_name: String,
    /// Alleles in the order they first appear in the file
    observed_alleles: Vec<ObservedAllele>
}

impl GeneProfile {
    /// Collapses the records for a gene into a profile.
    /// Records for other genes are ignored.
    /// # Arguments
    /// * `gene_name` - the gene we are building a profile for
    /// * `records` - retained variant records, in file order
    /// * `opt_gene` - the gene's guideline entry, used to resolve copy-number notation; if None, labels are kept as-is
    pub fn from_records(gene_name: &str, records: &[&VariantRecord], opt_gene: Option<&GeneGuideline>) -> GeneProfile {
        let mut observed_alleles: Vec<ObservedAllele> = vec![];
        for record in records.iter().filter(|r| r.gene() == gene_name) {
            let star_allele = match opt_gene {
                Some(gene) => gene.resolve_label(record.star_allele()),
                None => record.star_allele().trim().to_string()
            };

            match observed_alleles.iter_mut().find(|o| o.star_allele == star_allele) {
                Some(existing) => {
                    existing.zygosity = existing.zygosity.max(record.zygosity());
                    if !existing.rsids.iter().any(|r| r == record.rsid()) {
                        existing.rsids.push(record.rsid().to_string());
                    }
                },
                None => {
                    observed_alleles.push(ObservedAllele {
                        star_allele,
                        zygosity: record.zygosity(),
                        rsids: vec![record.rsid().to_string()]
                    });
                }
            };
        }

        GeneProfile {
            gene_name: gene_name.to_string(),
            observed_alleles
        }
    }

    // getters
    pub fn gene_name(&self) -> &str {
        &self.gene_name
    }

    pub fn observed_alleles(&self) -> &[ObservedAllele] {
        &self.observed_alleles
    }
}

/// The diplotype and phenotype call for one gene
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneCall {
    /// The gene symbol
    gene_name: String,
    /// The called diplotype
    diplotype: Diplotype,
    /// The phenotype of the diplotype
    phenotype: Phenotype,
    /// Observed alleles that could not be placed on either haplotype
    unresolved_alleles: Vec<String>
}

impl GeneCall {
    // getters
    pub fn gene_name(&self) -> &str {
        &self.gene_name
    }

    pub fn diplotype(&self) -> &Diplotype {
        &self.diplotype
    }

    pub fn phenotype(&self) -> Phenotype {
        self.phenotype
    }

    pub fn unresolved_alleles(&self) -> &[String] {
        &self.unresolved_alleles
    }
}

/// Calls the diplotype and phenotype for a single gene.
/// This never fails, anything we cannot interpret degrades to an Unknown phenotype.
/// # Arguments
/// * `gene_name` - the gene to call
/// * `opt_gene` - the guideline entry for the gene; if None, the phenotype is always Unknown
/// * `records` - retained variant records, in file order; other genes are ignored
pub fn call_gene_diplotype(gene_name: &str, opt_gene: Option<&GeneGuideline>, records: &[&VariantRecord]) -> GeneCall {
    let profile = GeneProfile::from_records(gene_name, records, opt_gene);
    let reference_allele = opt_gene.map(|g| g.reference_allele()).unwrap_or(REFERENCE_ALLELE);

    let (diplotype, unresolved_alleles) = solve_diplotype(&profile, reference_allele);
    if !unresolved_alleles.is_empty() {
        warn!(
            "{gene_name}: observed {} distinct alleles, pairing {} and leaving {} unresolved",
            profile.observed_alleles().len(), diplotype, unresolved_alleles.iter().join(", ")
        );
    }

    let phenotype = match opt_gene {
        Some(gene) => gene.phenotype_for(diplotype.hap1(), diplotype.hap2()),
        None => {
            debug!("{gene_name}: no guideline entry, phenotype is Unknown");
            Phenotype::Unknown
        }
    };
    debug!("{gene_name}: {diplotype} => {phenotype}");

    GeneCall {
        gene_name: gene_name.to_string(),
        diplotype,
        phenotype,
        unresolved_alleles
    }
}

/// Pairs the observed alleles into a diplotype.
/// Returns the diplotype and any observed alleles that did not fit on it.
/// # Arguments
/// * `profile` - the observed alleles for the gene
/// * `reference_allele` - the gene's wild-type allele
fn solve_diplotype(profile: &GeneProfile, reference_allele: &str) -> (Diplotype, Vec<String>) {
    let observed = profile.observed_alleles();
    match observed {
        [] => {
            // nothing observed, assumed wild-type
            (Diplotype::new(reference_allele, reference_allele), vec![])
        },
        [single] => {
            // without other evidence, a lone allele sits opposite the reference
            let other = if single.zygosity == Zygosity::HomozygousAlternate {
                single.star_allele.as_str()
            } else {
                reference_allele
            };
            (Diplotype::new_canonical(&single.star_allele, other, reference_allele), vec![])
        },
        [first, second, rest @ ..] => {
            let unresolved: Vec<String> = rest.iter()
                .map(|o| o.star_allele.clone())
                .collect();
            (Diplotype::new_canonical(&first.star_allele, &second.star_allele, reference_allele), unresolved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::guidelines::guideline_const::*;
    use crate::guidelines::guideline_tables::GuidelineTables;

    fn record(gene: &str, star: &str, rsid: &str, zygosity: Zygosity) -> VariantRecord {
        VariantRecord::new(
            "chr1".to_string(), 100, rsid.to_string(),
            "A".to_string(), "G".to_string(), "PASS".to_string(),
            gene.to_string(), star.to_string(), rsid, zygosity
        )
    }

    fn call(tables: &GuidelineTables, gene_name: &str, records: &[VariantRecord]) -> GeneCall {
        let refs: Vec<&VariantRecord> = records.iter().collect();
        call_gene_diplotype(gene_name, tables.gene(gene_name), &refs)
    }

    #[test]
    fn test_wild_type() {
        let tables = GuidelineTables::default();
        let result = call(&tables, CYP2C9, &[]);
        assert_eq!(result.diplotype().diplotype(), "*1/*1");
        assert_eq!(result.phenotype(), Phenotype::NormalMetabolizer);
        assert!(result.unresolved_alleles().is_empty());

        // other genes do not leak in
        let records = vec![record(CYP2D6, "*4", "rs3892097", Zygosity::Heterozygous)];
        let result = call(&tables, SLCO1B1, &records);
        assert_eq!(result.diplotype().diplotype(), "*1/*1");
        assert_eq!(result.phenotype(), Phenotype::NormalFunction);
    }

    #[test]
    fn test_single_heterozygous() {
        let tables = GuidelineTables::default();
        let records = vec![record(CYP2C19, "*2", "rs4244285", Zygosity::Heterozygous)];
        let result = call(&tables, CYP2C19, &records);
        assert_eq!(result.diplotype().diplotype(), "*1/*2");
        assert_eq!(result.phenotype(), Phenotype::IntermediateMetabolizer);

        // no GT column behaves like heterozygous
        let records = vec![record(CYP2D6, "*4", "rs3892097", Zygosity::NotProvided)];
        let result = call(&tables, CYP2D6, &records);
        assert_eq!(result.diplotype().diplotype(), "*1/*4");
        assert_eq!(result.phenotype(), Phenotype::IntermediateMetabolizer);
    }

    #[test]
    fn test_homozygous_alternate() {
        let tables = GuidelineTables::default();
        let records = vec![record(CYP2D6, "*4", "rs3892097", Zygosity::HomozygousAlternate)];
        let result = call(&tables, CYP2D6, &records);
        assert_eq!(result.diplotype().diplotype(), "*4/*4");
        assert_eq!(result.diplotype().homozygous_haplotype(), Some("*4"));
        assert_eq!(result.phenotype(), Phenotype::PoorMetabolizer);
    }

    #[test]
    fn test_duplicate_records_collapse() {
        let tables = GuidelineTables::default();
        let records = vec![
            record(CYP2D6, "*4", "rs3892097", Zygosity::Heterozygous),
            record(CYP2D6, "*4", "rs1065852", Zygosity::HomozygousAlternate)
        ];
        let refs: Vec<&VariantRecord> = records.iter().collect();
        let profile = GeneProfile::from_records(CYP2D6, &refs, tables.gene(CYP2D6));
        assert_eq!(profile.observed_alleles().len(), 1);
        assert_eq!(profile.observed_alleles()[0].zygosity(), Zygosity::HomozygousAlternate);
        assert_eq!(profile.observed_alleles()[0].rsids(), &["rs3892097".to_string(), "rs1065852".to_string()]);

        let result = call(&tables, CYP2D6, &records);
        assert_eq!(result.diplotype().diplotype(), "*4/*4");
    }

    #[test]
    fn test_two_alleles_canonical_order() {
        let tables = GuidelineTables::default();
        let records = vec![
            record(CYP2D6, "*41", "rs28371725", Zygosity::Heterozygous),
            record(CYP2D6, "*4", "rs3892097", Zygosity::Heterozygous)
        ];
        let result = call(&tables, CYP2D6, &records);
        assert_eq!(result.diplotype().diplotype(), "*4/*41");
        assert_eq!(result.phenotype(), Phenotype::PoorMetabolizer);

        // reference goes first no matter the file order
        let records = vec![
            record(CYP2C19, "*17", "rs12248560", Zygosity::Heterozygous),
            record(CYP2C19, "*1", "rs0", Zygosity::Heterozygous)
        ];
        let result = call(&tables, CYP2C19, &records);
        assert_eq!(result.diplotype().diplotype(), "*1/*17");
        assert_eq!(result.phenotype(), Phenotype::RapidMetabolizer);
    }

    #[test]
    fn test_amplification() {
        let tables = GuidelineTables::default();
        let records = vec![record(CYP2D6, "*1x2", "rs0", Zygosity::Heterozygous)];
        let result = call(&tables, CYP2D6, &records);
        assert_eq!(result.diplotype().diplotype(), "*1/*1xN");
        assert_eq!(result.phenotype(), Phenotype::UltrarapidMetabolizer);

        // CYP2C19 *17 is not amplifiable, so the copy number is dropped
        let records = vec![record(CYP2C19, "*17xN", "rs12248560", Zygosity::Heterozygous)];
        let result = call(&tables, CYP2C19, &records);
        assert_eq!(result.diplotype().diplotype(), "*1/*17");
    }

    #[test]
    fn test_unknown_allele() {
        let tables = GuidelineTables::default();
        let records = vec![record(CYP2C9, "*99", "rs1", Zygosity::Heterozygous)];
        let result = call(&tables, CYP2C9, &records);
        assert_eq!(result.diplotype().diplotype(), "*1/*99");
        assert_eq!(result.phenotype(), Phenotype::Unknown);
    }

    #[test]
    fn test_unknown_gene() {
        let tables = GuidelineTables::default();
        let records = vec![record("NUDT15", "*3", "rs116855232", Zygosity::Heterozygous)];
        let result = call(&tables, "NUDT15", &records);
        assert_eq!(result.diplotype().diplotype(), "*1/*3");
        assert_eq!(result.phenotype(), Phenotype::Unknown);
    }

    #[test]
    fn test_more_than_two_alleles() {
        let tables = GuidelineTables::default();
        let records = vec![
            record(CYP2D6, "*10", "rs1065852", Zygosity::Heterozygous),
            record(CYP2D6, "*4", "rs3892097", Zygosity::Heterozygous),
            record(CYP2D6, "*41", "rs28371725", Zygosity::Heterozygous)
        ];
        let result = call(&tables, CYP2D6, &records);
        assert_eq!(result.diplotype().diplotype(), "*4/*10");
        assert_eq!(result.phenotype(), Phenotype::PoorMetabolizer);
        assert_eq!(result.unresolved_alleles(), &["*41".to_string()]);
    }
}
