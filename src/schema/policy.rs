//! Column governance policies
//!
//! Declares, per policy, which raw attributes are excluded from modeling,
//! which are numeric, and which are categorical. The two policies trade
//! predictive signal against the exclusion of sensitive attributes: "strict"
//! drops sexe/taille/poids/smoker and discretizes age, "loose" keeps them and
//! leaves age continuous. Identity columns are excluded under both.

use serde::{Deserialize, Serialize};

/// Name of the regression target column.
pub const TARGET_COLUMN: &str = "montant_pret";

/// Identity attributes excluded from modeling under every policy.
const IDENTITY_COLUMNS: &[&str] = &["id", "nom", "prenom", "nationalite_francaise"];

/// Sensitive attributes excluded only under the strict policy.
const STRICT_SENSITIVE_COLUMNS: &[&str] = &["sexe", "taille", "poids", "smoker"];

/// Columns that receive a `{col}_manquant` missing-value indicator.
pub const INDICATOR_COLUMNS: &[&str] = &[
    "historique_credits",
    "risque_personnel",
    "score_credit",
    "loyer_mensuel",
    "quotient_caf",
    "situation_familiale",
];

/// Column-inclusion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPolicy {
    /// Exclude legally/ethically sensitive attributes, discretize age
    Strict,
    /// Retain sensitive attributes, keep age continuous
    Loose,
}

impl std::str::FromStr for ColumnPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ColumnPolicy::Strict),
            "loose" => Ok(ColumnPolicy::Loose),
            other => Err(format!("unknown policy '{other}', expected 'strict' or 'loose'")),
        }
    }
}

impl std::fmt::Display for ColumnPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnPolicy::Strict => write!(f, "strict"),
            ColumnPolicy::Loose => write!(f, "loose"),
        }
    }
}

/// The declarative column plan for one policy: three disjoint column lists
/// plus the passthrough indicators and the strict-only age-binning rule.
///
/// Consulted once per stage instead of scattering per-column existence checks
/// through the transform code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPlan {
    pub policy: ColumnPolicy,
    /// Columns removed before modeling (absent columns are skipped silently)
    pub drop: Vec<String>,
    /// Numeric columns: mean-imputed then standardized
    pub numerical: Vec<String>,
    /// Categorical columns: mode-imputed then one-hot encoded
    pub categorical: Vec<String>,
    /// Passthrough columns forwarded unscaled (missing-value indicators)
    pub passthrough: Vec<String>,
    /// Whether age is discretized into fixed buckets
    pub bin_age: bool,
}

impl ColumnPlan {
    pub fn for_policy(policy: ColumnPolicy) -> Self {
        let owned = |cols: &[&str]| cols.iter().map(|c| c.to_string()).collect::<Vec<_>>();

        let mut drop = owned(IDENTITY_COLUMNS);
        let (numerical, categorical) = match policy {
            ColumnPolicy::Strict => {
                drop.extend(owned(STRICT_SENSITIVE_COLUMNS));
                (
                    owned(&[
                        "revenu_estime_mois",
                        "historique_credits",
                        "risque_personnel",
                        "score_credit",
                        "loyer_mensuel",
                        "quotient_caf",
                        "nb_enfants",
                        "anciennete_compte_mois",
                    ]),
                    owned(&[
                        "tranche_age",
                        "sport_licence",
                        "niveau_etude",
                        "region",
                        "situation_familiale",
                    ]),
                )
            }
            ColumnPolicy::Loose => (
                owned(&[
                    "age",
                    "taille",
                    "poids",
                    "revenu_estime_mois",
                    "historique_credits",
                    "risque_personnel",
                    "score_credit",
                    "loyer_mensuel",
                    "quotient_caf",
                    "nb_enfants",
                    "anciennete_compte_mois",
                ]),
                owned(&[
                    "sexe",
                    "sport_licence",
                    "niveau_etude",
                    "region",
                    "smoker",
                    "situation_familiale",
                ]),
            ),
        };

        let passthrough = INDICATOR_COLUMNS
            .iter()
            .map(|c| format!("{c}_manquant"))
            .collect();

        Self {
            policy,
            drop,
            numerical,
            categorical,
            passthrough,
            bin_age: policy == ColumnPolicy::Strict,
        }
    }
}
