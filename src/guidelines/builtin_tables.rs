
use std::collections::BTreeMap;

use crate::data_types::pgx_phenotype::FunctionTier::{self, DecreasedFunction, IncreasedFunction, NoFunction, NormalFunction};
use crate::data_types::pgx_phenotype::Phenotype::{self, *};
use crate::data_types::pgx_risk::RiskLabel::{self, AdjustDosage, Ineffective, Safe, Toxic};
use crate::data_types::pgx_risk::Severity;
use crate::guidelines::guideline_const::*;
use crate::guidelines::guideline_tables::{DrugGuideline, DrugRiskRule, GeneGuideline, GuidelineMetadata, GuidelineTables, TierCombination};

// Allele function assignments follow CPIC allele functionality tables.
// Amplified alleles are listed with the "xN" suffix, which is how the inference engine knows a duplication is meaningful.
const GENE_ALLELES: [(&str, &[(&str, FunctionTier)]); 6] = [
    (CYP2D6, &[
        ("*1", NormalFunction), ("*2", NormalFunction),
        ("*3", NoFunction), ("*4", NoFunction), ("*5", NoFunction), ("*6", NoFunction),
        ("*9", DecreasedFunction), ("*10", DecreasedFunction), ("*17", DecreasedFunction), ("*41", DecreasedFunction),
        ("*1xN", IncreasedFunction), ("*2xN", IncreasedFunction)
    ]),
    (CYP2C19, &[
        ("*1", NormalFunction),
        ("*2", NoFunction), ("*3", NoFunction),
        ("*17", IncreasedFunction)
    ]),
    (CYP2C9, &[
        ("*1", NormalFunction),
        ("*2", DecreasedFunction),
        ("*3", NoFunction)
    ]),
    (SLCO1B1, &[
        ("*1", NormalFunction), ("*1a", NormalFunction), ("*1b", NormalFunction),
        ("*5", NoFunction), ("*15", NoFunction)
    ]),
    (TPMT, &[
        ("*1", NormalFunction),
        ("*2", NoFunction), ("*3A", NoFunction), ("*3B", NoFunction), ("*3C", NoFunction), ("*4", NoFunction)
    ]),
    (DPYD, &[
        ("*1", NormalFunction),
        ("*2A", NoFunction), ("*13", NoFunction)
    ])
];

/// CYP2D6: decreased alleles pair down with no-function alleles, gains offset a single loss
const CYP2D6_RULES: &[(FunctionTier, FunctionTier, Phenotype)] = &[
    (NormalFunction, NormalFunction, NormalMetabolizer),
    (NormalFunction, DecreasedFunction, IntermediateMetabolizer),
    (NormalFunction, NoFunction, IntermediateMetabolizer),
    (DecreasedFunction, DecreasedFunction, IntermediateMetabolizer),
    (DecreasedFunction, NoFunction, PoorMetabolizer),
    (NoFunction, NoFunction, PoorMetabolizer),
    (IncreasedFunction, NormalFunction, UltrarapidMetabolizer),
    (IncreasedFunction, IncreasedFunction, UltrarapidMetabolizer),
    (IncreasedFunction, DecreasedFunction, NormalMetabolizer),
    (IncreasedFunction, NoFunction, NormalMetabolizer)
];

/// CYP2C19: *17 is the increased allele, but a loss allele dominates it
const CYP2C19_RULES: &[(FunctionTier, FunctionTier, Phenotype)] = &[
    (NormalFunction, NormalFunction, NormalMetabolizer),
    (NormalFunction, NoFunction, IntermediateMetabolizer),
    (NoFunction, NoFunction, PoorMetabolizer),
    (NormalFunction, IncreasedFunction, RapidMetabolizer),
    (IncreasedFunction, IncreasedFunction, UltrarapidMetabolizer),
    (NoFunction, IncreasedFunction, IntermediateMetabolizer)
];

const CYP2C9_RULES: &[(FunctionTier, FunctionTier, Phenotype)] = &[
    (NormalFunction, NormalFunction, NormalMetabolizer),
    (NormalFunction, DecreasedFunction, IntermediateMetabolizer),
    (NormalFunction, NoFunction, IntermediateMetabolizer),
    (DecreasedFunction, DecreasedFunction, IntermediateMetabolizer),
    (DecreasedFunction, NoFunction, PoorMetabolizer),
    (NoFunction, NoFunction, PoorMetabolizer)
];

/// SLCO1B1 is a transporter, so the phenotypes are function labels; the tier and phenotype enums share variant names here
const SLCO1B1_RULES: &[(FunctionTier, FunctionTier, Phenotype)] = &[
    (NormalFunction, NormalFunction, Phenotype::NormalFunction),
    (NormalFunction, NoFunction, Phenotype::DecreasedFunction),
    (NoFunction, NoFunction, PoorFunction)
];

/// TPMT and DPYD share the simple one-loss / two-loss pattern
const LOSS_OF_FUNCTION_RULES: &[(FunctionTier, FunctionTier, Phenotype)] = &[
    (NormalFunction, NormalFunction, NormalMetabolizer),
    (NormalFunction, NoFunction, IntermediateMetabolizer),
    (NoFunction, NoFunction, PoorMetabolizer)
];

/// (phenotype, label, severity, confidence, recommendation, cpic text, contraindicated, requires dose adjustment)
type RuleRow = (Phenotype, RiskLabel, Severity, f64, &'static str, &'static str, bool, bool);

/// (drug, primary gene, secondary genes, rules)
type DrugRow = (&'static str, &'static str, &'static [&'static str], &'static [RuleRow]);

const DRUG_RULES: [DrugRow; 6] = [
    (CODEINE, CYP2D6, &[], &[
        (UltrarapidMetabolizer, Toxic, Severity::Critical, 0.95,
            "Avoid codeine. Use alternative non-opioid analgesic. Risk of life-threatening respiratory depression.",
            "Avoid codeine use. Alternative opioids such as morphine or non-opioid analgesics are recommended.",
            true, true),
        (NormalMetabolizer, Safe, Severity::None, 0.90,
            "Standard dose codeine is appropriate.",
            "Label recommended age- or weight-specific dosing.",
            false, false),
        (IntermediateMetabolizer, AdjustDosage, Severity::Moderate, 0.80,
            "Use with caution. Consider lower dose or alternative analgesic.",
            "Use label recommended age- or weight-specific dosing. If no response, consider alternative analgesic.",
            false, true),
        (PoorMetabolizer, Ineffective, Severity::Moderate, 0.92,
            "Codeine will not work effectively. Use alternative analgesic like morphine or tramadol.",
            "Avoid codeine use. Alternative non-opioid analgesics are recommended.",
            false, false)
    ]),
    (WARFARIN, CYP2C9, &[CYP2C19], &[
        (NormalMetabolizer, Safe, Severity::None, 0.88,
            "Standard warfarin dosing. Regular INR monitoring recommended.",
            "Initiate therapy with standard recommended doses.",
            false, false),
        (IntermediateMetabolizer, AdjustDosage, Severity::Moderate, 0.85,
            "Reduce warfarin dose by 25-50%. Increased bleeding risk. Close INR monitoring required.",
            "Consider 25-50% reduction in initiation dose. Titrate dose based on INR.",
            false, true),
        (PoorMetabolizer, Toxic, Severity::High, 0.93,
            "Significantly reduce warfarin dose (50-75% reduction). Very high bleeding risk. Frequent INR monitoring essential.",
            "Consider 50-75% reduction in initiation dose. More frequent INR monitoring.",
            false, true)
    ]),
    (CLOPIDOGREL, CYP2C19, &[], &[
        (NormalMetabolizer, Safe, Severity::None, 0.90,
            "Standard clopidogrel dosing is appropriate.",
            "Label recommended dosing.",
            false, false),
        (RapidMetabolizer, Safe, Severity::None, 0.88,
            "Standard dosing. May have slightly enhanced antiplatelet effect.",
            "Label recommended dosing.",
            false, false),
        (UltrarapidMetabolizer, Safe, Severity::None, 0.85,
            "Standard dosing with monitoring for excessive bleeding.",
            "Label recommended dosing.",
            false, false),
        (IntermediateMetabolizer, Ineffective, Severity::High, 0.87,
            "Clopidogrel may not work effectively. Consider alternative antiplatelet therapy (prasugrel or ticagrelor).",
            "Alternative antiplatelet therapy recommended if clinically feasible.",
            false, false),
        (PoorMetabolizer, Ineffective, Severity::Critical, 0.95,
            "Clopidogrel will not work. Use alternative antiplatelet agent (prasugrel or ticagrelor).",
            "Avoid clopidogrel. Use prasugrel or ticagrelor if no contraindications.",
            false, false)
    ]),
    (SIMVASTATIN, SLCO1B1, &[], &[
        (Phenotype::NormalFunction, Safe, Severity::None, 0.89,
            "Standard simvastatin dosing is appropriate.",
            "Prescribe desired starting dose and adjust doses based on disease-specific guidelines.",
            false, false),
        (Phenotype::DecreasedFunction, AdjustDosage, Severity::Moderate, 0.84,
            "Increased risk of statin-induced myopathy. Limit simvastatin dose to 20mg/day or consider alternative statin.",
            "Prescribe a lower dose or consider an alternative statin. Routine CK monitoring recommended.",
            false, true),
        (PoorFunction, Toxic, Severity::High, 0.91,
            "High risk of severe myopathy/rhabdomyolysis. Use alternative statin (pravastatin or rosuvastatin).",
            "Avoid simvastatin. Consider alternative statin therapy with lower myopathy risk.",
            false, true)
    ]),
    (AZATHIOPRINE, TPMT, &[], &[
        (NormalMetabolizer, Safe, Severity::None, 0.91,
            "Standard azathioprine dosing is appropriate.",
            "Start with normal starting dose.",
            false, false),
        (IntermediateMetabolizer, AdjustDosage, Severity::Moderate, 0.88,
            "Reduce azathioprine dose by 30-70%. Increased risk of myelosuppression.",
            "Start at 30-70% of full dose. Allow 2-4 weeks to reach steady state.",
            false, true),
        (PoorMetabolizer, Toxic, Severity::Critical, 0.96,
            "Azathioprine is contraindicated. Very high risk of life-threatening myelosuppression. Use alternative immunosuppressant.",
            "Avoid azathioprine. Consider non-thiopurine immunosuppressant therapy.",
            true, true)
    ]),
    (FLUOROURACIL, DPYD, &[], &[
        (NormalMetabolizer, Safe, Severity::None, 0.89,
            "Standard fluorouracil dosing is appropriate.",
            "Use label recommended dosing.",
            false, false),
        (IntermediateMetabolizer, AdjustDosage, Severity::High, 0.90,
            "Reduce starting dose by 50%. High risk of severe, potentially fatal toxicity at standard doses.",
            "Start with 50% reduction of normal starting dose. Increase dose in subsequent cycles if tolerated.",
            false, true),
        (PoorMetabolizer, Toxic, Severity::Critical, 0.97,
            "Fluorouracil is contraindicated. Extremely high risk of fatal toxicity. Use alternative chemotherapy.",
            "Avoid fluorouracil. Select alternative drug not metabolized by DPYD.",
            true, true)
    ])
];

/// Returns the combination rules for one of the built-in genes
fn gene_rules(gene_name: &str) -> &'static [(FunctionTier, FunctionTier, Phenotype)] {
    match gene_name {
        CYP2D6 => CYP2D6_RULES,
        CYP2C19 => CYP2C19_RULES,
        CYP2C9 => CYP2C9_RULES,
        SLCO1B1 => SLCO1B1_RULES,
        _ => LOSS_OF_FUNCTION_RULES
    }
}

/// Builds a fresh copy of the built-in guideline tables.
/// The tables are plain data, callers build them once and share them by reference.
pub fn builtin_tables() -> GuidelineTables {
    let genes: Vec<GeneGuideline> = GENE_ALLELES.iter()
        .map(|&(gene_name, alleles)| {
            let allele_functions: BTreeMap<String, FunctionTier> = alleles.iter()
                .map(|&(allele, tier)| (allele.to_string(), tier))
                .collect();
            let combination_rules: Vec<TierCombination> = gene_rules(gene_name).iter()
                .map(|&(a, b, phenotype)| TierCombination::new(a, b, phenotype))
                .collect();
            GeneGuideline::new(gene_name, REFERENCE_ALLELE, allele_functions, combination_rules)
        })
        .collect();

    let drugs: Vec<DrugGuideline> = DRUG_RULES.iter()
        .map(|&(drug_name, primary_gene, secondary_genes, rules)| {
            let risk_rules: Vec<DrugRiskRule> = rules.iter()
                .map(|&(phenotype, risk_label, severity, confidence_score, recommendation, cpic_recommendation, contraindicated, requires_dose_adjustment)| {
                    DrugRiskRule {
                        phenotype,
                        risk_label,
                        severity,
                        confidence_score,
                        recommendation: recommendation.to_string(),
                        cpic_recommendation: cpic_recommendation.to_string(),
                        contraindicated,
                        requires_dose_adjustment
                    }
                })
                .collect();
            DrugGuideline::new(
                drug_name, primary_gene,
                secondary_genes.iter().map(|s| s.to_string()).collect(),
                risk_rules
            )
        })
        .collect();

    let metadata = GuidelineMetadata {
        guideline_source: GUIDELINE_SOURCE.to_string(),
        guideline_version: GUIDELINE_VERSION.to_string()
    };

    // the constant arrays above have unique genes and drugs, so this cannot fail
    match GuidelineTables::new(metadata, genes, drugs) {
        Ok(tables) => tables,
        Err(e) => unreachable!("built-in guideline tables are inconsistent: {e}")
    }
}
