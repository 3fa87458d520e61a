//! Client record schema
//!
//! Typed representation of the raw tabular client rows consumed by the
//! pipeline, plus the validated partial-update merge used by the ingestion
//! layer.

mod policy;

pub use policy::{ColumnPlan, ColumnPolicy, INDICATOR_COLUMNS, TARGET_COLUMN};

use crate::error::{LoanflowError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One raw client row.
///
/// Every field is optional: historical schema revisions disagree on which
/// columns are present, and the pipeline tolerates absent values by design.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRecord {
    pub id: Option<i64>,
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub age: Option<f64>,
    pub taille: Option<f64>,
    pub poids: Option<f64>,
    pub sexe: Option<String>,
    pub sport_licence: Option<bool>,
    pub niveau_etude: Option<String>,
    pub region: Option<String>,
    pub smoker: Option<bool>,
    pub nationalite_francaise: Option<bool>,
    pub revenu_estime_mois: Option<f64>,
    pub situation_familiale: Option<String>,
    pub historique_credits: Option<f64>,
    pub risque_personnel: Option<f64>,
    pub score_credit: Option<f64>,
    pub loyer_mensuel: Option<f64>,
    pub quotient_caf: Option<f64>,
    pub nb_enfants: Option<f64>,
    /// Account-creation date as a parseable string (ingestion contract)
    pub date_creation_compte: Option<String>,
    /// Regression target; absent on inference requests
    pub montant_pret: Option<f64>,
}

impl ClientRecord {
    /// Build a DataFrame from a batch of records, one column per field.
    pub fn to_dataframe(records: &[ClientRecord]) -> Result<DataFrame> {
        let columns = vec![
            Column::new("id".into(), records.iter().map(|r| r.id).collect::<Vec<_>>()),
            Column::new("nom".into(), records.iter().map(|r| r.nom.clone()).collect::<Vec<_>>()),
            Column::new("prenom".into(), records.iter().map(|r| r.prenom.clone()).collect::<Vec<_>>()),
            Column::new("age".into(), records.iter().map(|r| r.age).collect::<Vec<_>>()),
            Column::new("taille".into(), records.iter().map(|r| r.taille).collect::<Vec<_>>()),
            Column::new("poids".into(), records.iter().map(|r| r.poids).collect::<Vec<_>>()),
            Column::new("sexe".into(), records.iter().map(|r| r.sexe.clone()).collect::<Vec<_>>()),
            Column::new(
                "sport_licence".into(),
                records.iter().map(|r| r.sport_licence).collect::<Vec<_>>(),
            ),
            Column::new(
                "niveau_etude".into(),
                records.iter().map(|r| r.niveau_etude.clone()).collect::<Vec<_>>(),
            ),
            Column::new("region".into(), records.iter().map(|r| r.region.clone()).collect::<Vec<_>>()),
            Column::new("smoker".into(), records.iter().map(|r| r.smoker).collect::<Vec<_>>()),
            Column::new(
                "nationalite_francaise".into(),
                records.iter().map(|r| r.nationalite_francaise).collect::<Vec<_>>(),
            ),
            Column::new(
                "revenu_estime_mois".into(),
                records.iter().map(|r| r.revenu_estime_mois).collect::<Vec<_>>(),
            ),
            Column::new(
                "situation_familiale".into(),
                records.iter().map(|r| r.situation_familiale.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                "historique_credits".into(),
                records.iter().map(|r| r.historique_credits).collect::<Vec<_>>(),
            ),
            Column::new(
                "risque_personnel".into(),
                records.iter().map(|r| r.risque_personnel).collect::<Vec<_>>(),
            ),
            Column::new(
                "score_credit".into(),
                records.iter().map(|r| r.score_credit).collect::<Vec<_>>(),
            ),
            Column::new(
                "loyer_mensuel".into(),
                records.iter().map(|r| r.loyer_mensuel).collect::<Vec<_>>(),
            ),
            Column::new(
                "quotient_caf".into(),
                records.iter().map(|r| r.quotient_caf).collect::<Vec<_>>(),
            ),
            Column::new(
                "nb_enfants".into(),
                records.iter().map(|r| r.nb_enfants).collect::<Vec<_>>(),
            ),
            Column::new(
                "date_creation_compte".into(),
                records.iter().map(|r| r.date_creation_compte.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                "montant_pret".into(),
                records.iter().map(|r| r.montant_pret).collect::<Vec<_>>(),
            ),
        ];

        DataFrame::new(columns).map_err(|e| LoanflowError::DataError(e.to_string()))
    }
}

/// Partial update of a client record.
///
/// Only fields explicitly present in the payload are applied; every applied
/// field is validated. Unknown keys are rejected at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientUpdate {
    pub age: Option<f64>,
    pub taille: Option<f64>,
    pub poids: Option<f64>,
    pub sexe: Option<String>,
    pub sport_licence: Option<bool>,
    pub niveau_etude: Option<String>,
    pub region: Option<String>,
    pub smoker: Option<bool>,
    pub revenu_estime_mois: Option<f64>,
    pub situation_familiale: Option<String>,
    pub historique_credits: Option<f64>,
    pub risque_personnel: Option<f64>,
    pub score_credit: Option<f64>,
    pub loyer_mensuel: Option<f64>,
    pub quotient_caf: Option<f64>,
    pub nb_enfants: Option<f64>,
    pub date_creation_compte: Option<String>,
    pub montant_pret: Option<f64>,
}

impl ClientUpdate {
    /// Merge this update into `record`, field by field.
    pub fn apply_to(&self, record: &mut ClientRecord) -> Result<()> {
        fn check(name: &str, value: f64, min: f64, max: f64) -> Result<f64> {
            if !value.is_finite() || value < min || value > max {
                return Err(LoanflowError::DataError(format!(
                    "invalid {name}: {value} (expected {min}..={max})"
                )));
            }
            Ok(value)
        }

        if let Some(v) = self.age {
            record.age = Some(check("age", v, 0.0, 130.0)?);
        }
        if let Some(v) = self.taille {
            record.taille = Some(check("taille", v, 0.0, 300.0)?);
        }
        if let Some(v) = self.poids {
            record.poids = Some(check("poids", v, 0.0, 500.0)?);
        }
        if let Some(v) = self.revenu_estime_mois {
            record.revenu_estime_mois = Some(check("revenu_estime_mois", v, 0.0, f64::MAX)?);
        }
        if let Some(v) = self.nb_enfants {
            record.nb_enfants = Some(check("nb_enfants", v, 0.0, 30.0)?);
        }
        if let Some(v) = self.montant_pret {
            record.montant_pret = Some(check("montant_pret", v, 0.0, f64::MAX)?);
        }
        // Source data legitimately contains negative rents (nulled later by
        // the manual stage), so the clamp stays there rather than here.
        if let Some(v) = self.loyer_mensuel {
            if !v.is_finite() {
                return Err(LoanflowError::DataError(format!("invalid loyer_mensuel: {v}")));
            }
            record.loyer_mensuel = Some(v);
        }
        if let Some(v) = self.historique_credits {
            record.historique_credits = Some(v);
        }
        if let Some(v) = self.risque_personnel {
            record.risque_personnel = Some(v);
        }
        if let Some(v) = self.score_credit {
            record.score_credit = Some(v);
        }
        if let Some(v) = self.quotient_caf {
            record.quotient_caf = Some(v);
        }
        if let Some(ref v) = self.sexe {
            record.sexe = Some(v.clone());
        }
        if let Some(v) = self.sport_licence {
            record.sport_licence = Some(v);
        }
        if let Some(ref v) = self.niveau_etude {
            record.niveau_etude = Some(v.clone());
        }
        if let Some(ref v) = self.region {
            record.region = Some(v.clone());
        }
        if let Some(v) = self.smoker {
            record.smoker = Some(v);
        }
        if let Some(ref v) = self.situation_familiale {
            record.situation_familiale = Some(v.clone());
        }
        if let Some(ref v) = self.date_creation_compte {
            record.date_creation_compte = Some(v.clone());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_dataframe_shape() {
        let records = vec![
            ClientRecord {
                age: Some(34.0),
                region: Some("Bretagne".to_string()),
                montant_pret: Some(12000.0),
                ..Default::default()
            },
            ClientRecord::default(),
        ];
        let df = ClientRecord::to_dataframe(&records).unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.column("montant_pret").is_ok());
    }

    #[test]
    fn test_update_merges_only_provided_fields() {
        let mut record = ClientRecord {
            age: Some(40.0),
            region: Some("Corse".to_string()),
            ..Default::default()
        };
        let update = ClientUpdate {
            age: Some(41.0),
            ..Default::default()
        };
        update.apply_to(&mut record).unwrap();
        assert_eq!(record.age, Some(41.0));
        assert_eq!(record.region.as_deref(), Some("Corse"));
    }

    #[test]
    fn test_update_rejects_invalid_values() {
        let mut record = ClientRecord::default();
        let update = ClientUpdate {
            age: Some(-3.0),
            ..Default::default()
        };
        assert!(update.apply_to(&mut record).is_err());
        assert_eq!(record.age, None);
    }

    #[test]
    fn test_update_rejects_unknown_keys() {
        let payload = r#"{"age": 30, "credit_limit": 9000}"#;
        assert!(serde_json::from_str::<ClientUpdate>(payload).is_err());
    }
}
