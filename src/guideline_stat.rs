
use crate::guidelines::guideline_tables::GuidelineTables;

/// Prints the supported drugs and genes for a set of guideline tables
/// # Arguments
/// * `tables` - the tables to print the statistics for
pub fn print_stats(tables: &GuidelineTables) {
    let metadata = tables.guideline_metadata();
    println!("Guideline metadata:");
    println!("\tSource: {}", metadata.guideline_source);
    println!("\tVersion: {}", metadata.guideline_version);

    println!("Supported drugs: {}", tables.supported_drugs().join(", "));
    println!("Supported genes: {}", tables.supported_genes().join(", "));

    println!();
    println!("drug\tprimary_gene\tsecondary_genes\tphenotype_rules");
    for (drug_name, drug_entry) in tables.drug_entries().iter() {
        let secondary = if drug_entry.secondary_genes().is_empty() {
            ".".to_string()
        } else {
            drug_entry.secondary_genes().join(",")
        };
        println!("{drug_name}\t{}\t{secondary}\t{}", drug_entry.primary_gene(), drug_entry.risk_rules().len());
    }

    // per-allele detail only with elevated verbosity
    if log::log_enabled!(log::Level::Debug) {
        println!();
        println!("Gene allele functions:");
        println!("gene\tallele\tfunction");
        for (gene_name, gene_entry) in tables.gene_entries().iter() {
            for allele in gene_entry.known_alleles() {
                println!("{gene_name}\t{allele}\t{}", gene_entry.allele_function(allele));
            }
        }
        println!();

        println!("Gene combination rules:");
        println!("gene\ttier_a\ttier_b\tphenotype");
        for (gene_name, gene_entry) in tables.gene_entries().iter() {
            for rule in gene_entry.combination_rules().iter() {
                println!("{gene_name}\t{}\t{}\t{}", rule.tier_a, rule.tier_b, rule.phenotype);
            }
        }
        println!();
    }
}
