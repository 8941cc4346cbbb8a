
use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::data_types::variant_record::{VariantRecord, Zygosity};
use crate::guidelines::guideline_tables::GuidelineTables;
use crate::util::file_io::load_text;

/// The built-in demonstration variant set
const SAMPLE_VCF: &str = include_str!("../data/sample.vcf");

/// Minimum number of columns for a data row: CHROM, POS, ID, REF, ALT, QUAL, FILTER, INFO
const REQUIRED_COLUMNS: usize = 8;
/// Column index of FORMAT, the first sample follows it
const FORMAT_COLUMN: usize = 8;

// INFO keys we require
const INFO_GENE: &str = "GENE";
const INFO_STAR: &str = "STAR";
const INFO_RS: &str = "RS";

/// Why a data row did not make it into the working set
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Fewer than the required number of columns
    MalformedRow,
    /// POS is not a positive integer
    InvalidPosition,
    /// GT is present but not interpretable
    InvalidGenotype,
    /// One of GENE, STAR, or RS is absent
    MissingAnnotation,
    /// GENE is not covered by the guideline tables
    UnsupportedGene,
    /// GT shows only reference alleles
    HomozygousReference,
    /// GT is present but every allele is missing
    NoCall
}

impl SkipReason {
    /// True if the row was structurally parsed and only excluded afterwards
    pub fn is_exclusion(&self) -> bool {
        matches!(
            self,
            SkipReason::MissingAnnotation | SkipReason::UnsupportedGene | SkipReason::HomozygousReference | SkipReason::NoCall
        )
    }
}

/// Summary of how lossy parsing was
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParseSummary {
    /// Non-comment, non-blank lines
    data_lines: usize,
    /// Data lines that were structurally valid, including those excluded later
    parsed_lines: usize,
    /// Count of rows dropped, by reason
    skipped_lines: BTreeMap<SkipReason, usize>
}

impl ParseSummary {
    fn skip(&mut self, reason: SkipReason) {
        *self.skipped_lines.entry(reason).or_insert(0) += 1;
    }

    /// Number of rows dropped for any reason
    pub fn total_skipped(&self) -> usize {
        self.skipped_lines.values().sum()
    }

    /// Number of rows dropped for one reason
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skipped_lines.get(&reason).copied().unwrap_or(0)
    }

    // getters
    pub fn data_lines(&self) -> usize {
        self.data_lines
    }

    pub fn parsed_lines(&self) -> usize {
        self.parsed_lines
    }

    pub fn skipped_lines(&self) -> &BTreeMap<SkipReason, usize> {
        &self.skipped_lines
    }
}

/// The result of parsing one variant file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedVcf {
    /// Retained records, in file order
    records: Vec<VariantRecord>,
    /// Quality summary
    summary: ParseSummary,
    /// `##key=value` header lines, last one wins
    metadata: BTreeMap<String, String>
}

impl ParsedVcf {
    /// True if at least one data row was structurally valid
    pub fn parsing_success(&self) -> bool {
        self.summary.parsed_lines > 0
    }

    /// All retained records for a single gene, in file order
    pub fn gene_records(&self, gene: &str) -> Vec<&VariantRecord> {
        self.records.iter()
            .filter(|r| r.gene() == gene)
            .collect()
    }

    /// Sorted distinct gene symbols of the retained records
    pub fn genes_detected(&self) -> Vec<String> {
        let mut genes: Vec<String> = self.records.iter()
            .map(|r| r.gene().to_string())
            .collect();
        genes.sort();
        genes.dedup();
        genes
    }

    /// The fileformat header, if one was provided
    pub fn file_format(&self) -> Option<&str> {
        self.metadata.get("fileformat").map(|s| s.as_str())
    }

    // getters
    pub fn records(&self) -> &[VariantRecord] {
        &self.records
    }

    pub fn summary(&self) -> &ParseSummary {
        &self.summary
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// Returns the checked-in demonstration variant file
pub fn sample_vcf() -> &'static str {
    SAMPLE_VCF
}

/// Loads a variant file from disk, transparently handling gzip compression.
/// Returns the raw text alongside the parsed result.
/// # Arguments
/// * `filename` - the file to load, ".gz" files are decompressed
/// * `tables` - only genes in these tables are retained
/// # Errors
/// * if the file cannot be opened or read
/// * if the content is not valid UTF-8
pub fn load_vcf_file(filename: &Path, tables: &GuidelineTables) -> Result<(String, ParsedVcf), Box<dyn std::error::Error>> {
    let text = load_text(filename)?;
    let parsed = parse_vcf(&text, tables);
    Ok((text, parsed))
}

/// Parses the raw text of a variant file.
/// This never fails; malformed and non-actionable rows are counted in the summary instead.
/// # Arguments
/// * `text` - the full variant file content
/// * `tables` - rows for genes without a guideline entry are excluded as `UnsupportedGene`
pub fn parse_vcf(text: &str, tables: &GuidelineTables) -> ParsedVcf {
    let mut parsed = ParsedVcf::default();

    for (line_index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('#') {
            // "##key=value" is metadata, "#CHROM" is the column header
            if let Some((key, value)) = header.strip_prefix('#').and_then(|h| h.split_once('=')) {
                parsed.metadata.insert(key.trim().to_string(), value.trim().to_string());
            }
            continue;
        }

        parsed.summary.data_lines += 1;
        match parse_data_row(line, tables) {
            Ok(record) => {
                parsed.summary.parsed_lines += 1;
                trace!("Line {}: retained {} {} ({})", line_index + 1, record.gene(), record.star_allele(), record.rsid());
                parsed.records.push(record);
            },
            Err(reason) => {
                if reason.is_exclusion() {
                    parsed.summary.parsed_lines += 1;
                    trace!("Line {}: excluded, {reason}", line_index + 1);
                } else {
                    warn!("Line {}: skipped, {reason}", line_index + 1);
                }
                parsed.summary.skip(reason);
            }
        };
    }

    debug!(
        "Parsed variant file: {} data lines, {} parsed, {} retained, {} skipped",
        parsed.summary.data_lines, parsed.summary.parsed_lines, parsed.records.len(), parsed.summary.total_skipped()
    );
    parsed
}

/// Parses a single data row into a record, or the reason it was not retained
fn parse_data_row(line: &str, tables: &GuidelineTables) -> Result<VariantRecord, SkipReason> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < REQUIRED_COLUMNS {
        return Err(SkipReason::MalformedRow);
    }

    let position: u64 = match fields[1].trim().parse() {
        Ok(p) if p > 0 => p,
        _ => return Err(SkipReason::InvalidPosition)
    };

    let zygosity: Option<Zygosity> = if fields.len() > FORMAT_COLUMN + 1 {
        parse_sample_genotype(fields[FORMAT_COLUMN], fields[FORMAT_COLUMN + 1])?
    } else {
        // no sample column, we cannot tell zygosity so we keep the row
        Some(Zygosity::NotProvided)
    };

    let info = parse_info_field(fields[7]);
    let (gene, star_allele, rsid) = match (info.get(INFO_GENE), info.get(INFO_STAR), info.get(INFO_RS)) {
        (Some(&g), Some(&s), Some(&r)) => (g, s, r),
        _ => return Err(SkipReason::MissingAnnotation)
    };
    if tables.gene(gene).is_none() {
        return Err(SkipReason::UnsupportedGene);
    }

    let zygosity = match zygosity {
        Some(z) => z,
        None => return Err(SkipReason::HomozygousReference)
    };

    Ok(VariantRecord::new(
        fields[0].trim().to_string(),
        position,
        fields[2].trim().to_string(),
        fields[3].trim().to_string(),
        fields[4].trim().to_string(),
        fields[6].trim().to_string(),
        gene.to_string(),
        star_allele.to_string(),
        rsid,
        zygosity
    ))
}

/// Parses the INFO column into a key-value map.
/// Flags without "=" are ignored, as are keys with empty or "." values.
/// # Arguments
/// * `info` - the raw INFO column
pub fn parse_info_field(info: &str) -> BTreeMap<&str, &str> {
    info.split(';')
        .filter_map(|item| item.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(_, v)| !v.is_empty() && *v != ".")
        .collect()
}

/// Interprets the GT sub-field of the first sample.
/// Returns `Ok(None)` for homozygous reference, `Ok(Some(..))` when the row carries (or may carry) an alternate allele.
/// # Arguments
/// * `format` - the FORMAT column, e.g. "GT:DP"
/// * `sample` - the first sample column, e.g. "0/1:30"
/// # Errors
/// * `NoCall` if every allele is missing
/// * `InvalidGenotype` if an allele index is not a number
fn parse_sample_genotype(format: &str, sample: &str) -> Result<Option<Zygosity>, SkipReason> {
    let gt_index = match format.trim().split(':').position(|k| k == "GT") {
        Some(i) => i,
        None => return Ok(Some(Zygosity::NotProvided))
    };
    let gt = match sample.trim().split(':').nth(gt_index) {
        Some(g) if !g.is_empty() => g,
        _ => return Ok(Some(Zygosity::NotProvided))
    };
    parse_genotype(gt)
}

/// Converts a GT value such as "0/1", "1|1", "./.", or a haploid "1" into a zygosity.
/// # Arguments
/// * `gt` - the raw GT value
/// # Errors
/// * `NoCall` if every allele is missing
/// * `InvalidGenotype` if an allele index is not a number
pub fn parse_genotype(gt: &str) -> Result<Option<Zygosity>, SkipReason> {
    let mut alleles: Vec<usize> = vec![];
    let mut missing: usize = 0;
    for token in gt.split(|c| c == '/' || c == '|') {
        if token == "." {
            missing += 1;
        } else {
            match token.parse::<usize>() {
                Ok(index) => alleles.push(index),
                Err(_) => return Err(SkipReason::InvalidGenotype)
            };
        }
    }

    if alleles.is_empty() {
        if missing > 0 {
            return Err(SkipReason::NoCall);
        }
        return Err(SkipReason::InvalidGenotype);
    }

    let alt_count = alleles.iter().filter(|&&a| a > 0).count();
    let zygosity = if alt_count == 0 {
        None
    } else if alt_count == alleles.len() && missing == 0 {
        Some(Zygosity::HomozygousAlternate)
    } else {
        Some(Zygosity::Heterozygous)
    };
    Ok(zygosity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> GuidelineTables {
        GuidelineTables::default()
    }

    /// Joins columns with tabs so the fixtures stay readable
    fn row(columns: &[&str]) -> String {
        columns.join("\t")
    }

    fn header() -> String {
        [
            "##fileformat=VCFv4.2",
            "##INFO=<ID=GENE,Number=1,Type=String,Description=\"Gene symbol\">",
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE"
        ].join("\n")
    }

    #[test]
    fn test_genotypes() {
        assert_eq!(parse_genotype("0/0"), Ok(None));
        assert_eq!(parse_genotype("0|0"), Ok(None));
        assert_eq!(parse_genotype("0/1"), Ok(Some(Zygosity::Heterozygous)));
        assert_eq!(parse_genotype("1|0"), Ok(Some(Zygosity::Heterozygous)));
        assert_eq!(parse_genotype("1/1"), Ok(Some(Zygosity::HomozygousAlternate)));
        assert_eq!(parse_genotype("1/2"), Ok(Some(Zygosity::HomozygousAlternate)));
        assert_eq!(parse_genotype("1"), Ok(Some(Zygosity::HomozygousAlternate)));
        assert_eq!(parse_genotype("0"), Ok(None));
        assert_eq!(parse_genotype("1/."), Ok(Some(Zygosity::Heterozygous)));
        assert_eq!(parse_genotype("./."), Err(SkipReason::NoCall));
        assert_eq!(parse_genotype("A/B"), Err(SkipReason::InvalidGenotype));
        assert_eq!(parse_genotype(""), Err(SkipReason::InvalidGenotype));
    }

    #[test]
    fn test_info_field() {
        let info = parse_info_field("GENE=CYP2D6;STAR=*4;RS=rs3892097;DB;AF=.");
        assert_eq!(info.get("GENE"), Some(&"CYP2D6"));
        assert_eq!(info.get("STAR"), Some(&"*4"));
        assert_eq!(info.get("RS"), Some(&"rs3892097"));
        assert!(!info.contains_key("DB"));
        assert!(!info.contains_key("AF"));
    }

    #[test]
    fn test_sample_vcf() {
        let parsed = parse_vcf(sample_vcf(), &tables());
        assert!(parsed.parsing_success());
        assert_eq!(parsed.summary().data_lines(), 6);
        assert_eq!(parsed.summary().parsed_lines(), 6);
        assert_eq!(parsed.summary().total_skipped(), 0);
        assert_eq!(parsed.records().len(), 6);
        assert_eq!(parsed.file_format(), Some("VCFv4.2"));
        assert_eq!(parsed.genes_detected(), vec!["CYP2C19", "CYP2C9", "CYP2D6", "DPYD", "SLCO1B1", "TPMT"]);

        // no GT column, so we cannot tell zygosity
        let first = &parsed.records()[0];
        assert_eq!(first.gene(), "CYP2D6");
        assert_eq!(first.star_allele(), "*4");
        assert_eq!(first.chromosome(), "chr22");
        assert_eq!(first.position(), 42522613);
        assert_eq!(first.zygosity(), Zygosity::NotProvided);
    }

    #[test]
    fn test_homozygous_reference_excluded() {
        let text = [
            header(),
            row(&["chr22", "100", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097", "GT", "0/0"]),
            row(&["chr22", "200", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*10;RS=rs1065852", "GT:DP", "0|0:35"]),
            row(&["chr22", "300", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*41;RS=rs28371725", "GT:DP", "0/1:35"])
        ].join("\n");
        let parsed = parse_vcf(&text, &tables());
        assert_eq!(parsed.summary().data_lines(), 3);
        assert_eq!(parsed.summary().parsed_lines(), 3);
        assert_eq!(parsed.summary().skipped(SkipReason::HomozygousReference), 2);
        assert_eq!(parsed.records().len(), 1);
        assert_eq!(parsed.records()[0].star_allele(), "*41");
        assert_eq!(parsed.records()[0].zygosity(), Zygosity::Heterozygous);
    }

    #[test]
    fn test_missing_annotations_excluded() {
        let text = [
            header(),
            row(&["chr22", "100", ".", "C", "T", ".", "PASS", "STAR=*4;RS=rs3892097"]),
            row(&["chr22", "200", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;RS=rs3892097"]),
            row(&["chr22", "300", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4"]),
            row(&["chr22", "400", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=;RS=rs3892097"]),
            row(&["chr22", "500", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=3892097"])
        ].join("\n");
        let parsed = parse_vcf(&text, &tables());
        assert_eq!(parsed.summary().parsed_lines(), 5);
        assert_eq!(parsed.summary().skipped(SkipReason::MissingAnnotation), 4);
        assert_eq!(parsed.records().len(), 1);
        assert_eq!(parsed.records()[0].position(), 500);
        assert_eq!(parsed.records()[0].rsid(), "rs3892097");
    }

    #[test]
    fn test_malformed_rows() {
        let text = [
            header(),
            row(&["chr22", "100", ".", "C", "T", ".", "PASS"]),
            row(&["chr22", "abc", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097"]),
            row(&["chr22", "0", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097"]),
            row(&["chr22", "100", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097", "GT", "X/Y"]),
            row(&["chr22", "100", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097", "GT", "./."]),
            "this is not a variant line".to_string(),
            row(&["chr22", "100", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097", "GT", "1/1"])
        ].join("\n");
        let parsed = parse_vcf(&text, &tables());
        assert_eq!(parsed.summary().data_lines(), 7);
        // the no-call and the good row parsed
        assert_eq!(parsed.summary().parsed_lines(), 2);
        assert_eq!(parsed.summary().skipped(SkipReason::MalformedRow), 2);
        assert_eq!(parsed.summary().skipped(SkipReason::InvalidPosition), 2);
        assert_eq!(parsed.summary().skipped(SkipReason::InvalidGenotype), 1);
        assert_eq!(parsed.summary().skipped(SkipReason::NoCall), 1);
        assert_eq!(parsed.summary().total_skipped(), 6);
        assert_eq!(parsed.records().len(), 1);
        assert_eq!(parsed.records()[0].zygosity(), Zygosity::HomozygousAlternate);
    }

    #[test]
    fn test_unsupported_gene_excluded() {
        let text = [
            header(),
            row(&["chr17", "100", ".", "C", "T", ".", "PASS", "GENE=BRCA1;STAR=*9;RS=rs1", "GT", "0/1"]),
            row(&["chr22", "200", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097", "GT", "0/1"])
        ].join("\n");
        let parsed = parse_vcf(&text, &tables());
        assert_eq!(parsed.summary().parsed_lines(), 2);
        assert_eq!(parsed.summary().skipped(SkipReason::UnsupportedGene), 1);
        assert_eq!(parsed.records().len(), 1);
        assert_eq!(parsed.genes_detected(), vec!["CYP2D6"]);

        // nothing left when only unsupported genes are present
        let text = [
            header(),
            row(&["chr17", "100", ".", "C", "T", ".", "PASS", "GENE=BRCA1;STAR=*9;RS=rs1", "GT", "0/1"])
        ].join("\n");
        let parsed = parse_vcf(&text, &tables());
        assert!(parsed.parsing_success());
        assert!(parsed.records().is_empty());
        assert!(parsed.genes_detected().is_empty());
    }

    #[test]
    fn test_empty_and_header_only() {
        let parsed = parse_vcf("", &tables());
        assert!(!parsed.parsing_success());
        assert_eq!(parsed.summary().data_lines(), 0);

        let parsed = parse_vcf(&format!("{}\n\n   \n", header()), &tables());
        assert!(!parsed.parsing_success());
        assert_eq!(parsed.summary().data_lines(), 0);
        assert_eq!(parsed.summary().total_skipped(), 0);
        assert!(parsed.records().is_empty());
    }

    #[test]
    fn test_format_without_gt() {
        let text = row(&["chr22", "100", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097", "DP", "30"]);
        let parsed = parse_vcf(&text, &tables());
        assert_eq!(parsed.records().len(), 1);
        assert_eq!(parsed.records()[0].zygosity(), Zygosity::NotProvided);
    }

    #[test]
    fn test_windows_line_endings() {
        let text = format!("{}\r\n{}\r\n", header(), row(&["chr22", "100", ".", "C", "T", ".", "PASS", "GENE=CYP2D6;STAR=*4;RS=rs3892097", "GT", "0/1"]));
        let parsed = parse_vcf(&text, &tables());
        assert_eq!(parsed.records().len(), 1);
        assert_eq!(parsed.records()[0].zygosity(), Zygosity::Heterozygous);
    }

    #[test]
    fn test_load_gz_file() {
        use std::fs::File;
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("sample.vcf.gz");
        let mut encoder = flate2::write::GzEncoder::new(File::create(&filename).unwrap(), flate2::Compression::default());
        encoder.write_all(sample_vcf().as_bytes()).unwrap();
        encoder.finish().unwrap();

        let (text, parsed) = load_vcf_file(&filename, &tables()).unwrap();
        assert_eq!(text, sample_vcf());
        assert_eq!(parsed, parse_vcf(sample_vcf(), &tables()));
    }
}
