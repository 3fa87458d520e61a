//! Manual feature transformations
//!
//! Row-level, deterministic derivations executed before the statistical
//! pipeline: policy drops, age binning, region grouping, account-age
//! derivation, missing-value indicators, and rent clamping. No statistic is
//! computed here; a single unseen row goes through the same path as a full
//! training batch.

use crate::error::{LoanflowError, Result};
use crate::schema::{ColumnPlan, ColumnPolicy, INDICATOR_COLUMNS};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use tracing::debug;

/// Age bin edges; a value in `(edges[i], edges[i+1]]` falls in bucket `i`.
const AGE_BIN_EDGES: [f64; 5] = [17.0, 30.0, 45.0, 60.0, 100.0];
const AGE_BIN_LABELS: [&str; 4] = ["18-29", "30-44", "45-59", "60+"];

/// Date formats accepted for `date_creation_compte`, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Stateless (policy + reference date) manual transform stage.
#[derive(Debug, Clone)]
pub struct ManualTransforms {
    plan: ColumnPlan,
    reference_date: NaiveDate,
}

/// Apply the manual transform stage under the given policy, using today as
/// the reference date for account-age derivation.
pub fn apply_manual_transformations(df: &DataFrame, policy: ColumnPolicy) -> Result<DataFrame> {
    ManualTransforms::new(policy).apply(df)
}

impl ManualTransforms {
    pub fn new(policy: ColumnPolicy) -> Self {
        Self {
            plan: ColumnPlan::for_policy(policy),
            reference_date: Utc::now().date_naive(),
        }
    }

    /// Pin the reference date used for account-age derivation.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    pub fn policy(&self) -> ColumnPolicy {
        self.plan.policy
    }

    /// Run every transformation, in order, on a batch of raw rows.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = canonicalize_labels(df)?;
        result = self.drop_columns(result);
        if self.plan.bin_age {
            result = self.bin_age(result)?;
        }
        result = self.group_regions(result)?;
        result = self.derive_account_age(result)?;
        result = self.add_missing_indicators(result)?;
        result = self.clamp_rent(result)?;
        result = self.cast_booleans(result)?;
        Ok(result)
    }

    /// Drop excluded columns; absent ones are schema drift, not errors.
    fn drop_columns(&self, mut df: DataFrame) -> DataFrame {
        for col in &self.plan.drop {
            match df.drop(col) {
                Ok(dropped) => df = dropped,
                Err(_) => debug!(column = %col, "drop target absent, skipping"),
            }
        }
        df
    }

    /// Discretize age into fixed right-closed buckets; out-of-range ages get
    /// a null category that downstream imputation resolves.
    fn bin_age(&self, mut df: DataFrame) -> Result<DataFrame> {
        let Ok(column) = df.column("age") else {
            debug!("age column absent, skipping binning");
            return Ok(df);
        };

        let ages = column
            .cast(&DataType::Float64)
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        let ca = ages
            .f64()
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;

        let buckets: Vec<Option<&str>> = ca.into_iter().map(|v| v.and_then(age_bucket)).collect();

        df.with_column(Series::new("tranche_age".into(), buckets))
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        df.drop("age").map_err(|e| LoanflowError::DataError(e.to_string()))
    }

    /// Map regions through the economic-cluster lookup; unmapped values pass
    /// through verbatim.
    fn group_regions(&self, mut df: DataFrame) -> Result<DataFrame> {
        let Ok(column) = df.column("region") else {
            debug!("region column absent, skipping grouping");
            return Ok(df);
        };

        let series = column.as_materialized_series().clone();
        let Ok(ca) = series.str() else {
            debug!("region column is not a string column, skipping grouping");
            return Ok(df);
        };

        let grouped: Vec<Option<&str>> = ca.into_iter().map(|v| v.map(region_cluster)).collect();

        df.with_column(Series::new("region".into(), grouped))
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        Ok(df)
    }

    /// Replace the raw creation date with the account age in months.
    /// Unparseable dates become a null duration, imputed downstream.
    fn derive_account_age(&self, mut df: DataFrame) -> Result<DataFrame> {
        let Ok(column) = df.column("date_creation_compte") else {
            debug!("date_creation_compte absent, skipping account-age derivation");
            return Ok(df);
        };

        let as_string = column
            .cast(&DataType::String)
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        let ca = as_string
            .str()
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;

        let months: Vec<Option<f64>> = ca
            .into_iter()
            .map(|v| {
                v.and_then(parse_date).map(|date| {
                    let days = (self.reference_date - date).num_days() as f64;
                    (days / 30.0).floor()
                })
            })
            .collect();

        df.with_column(Series::new("anciennete_compte_mois".into(), months))
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        df.drop("date_creation_compte")
            .map_err(|e| LoanflowError::DataError(e.to_string()))
    }

    /// Record nullity before imputation erases it.
    fn add_missing_indicators(&self, mut df: DataFrame) -> Result<DataFrame> {
        for col in INDICATOR_COLUMNS {
            let Ok(column) = df.column(col) else {
                debug!(column = %col, "indicator target absent, skipping");
                continue;
            };

            let flags: Vec<f64> = column
                .as_materialized_series()
                .is_null()
                .into_iter()
                .map(|null| if null == Some(true) { 1.0 } else { 0.0 })
                .collect();

            df.with_column(Series::new(format!("{col}_manquant").into(), flags))
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        }
        Ok(df)
    }

    /// Negative rents are data-entry noise: treat them as missing.
    fn clamp_rent(&self, mut df: DataFrame) -> Result<DataFrame> {
        let Ok(column) = df.column("loyer_mensuel") else {
            return Ok(df);
        };

        let as_f64 = column
            .cast(&DataType::Float64)
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        let ca = as_f64
            .f64()
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;

        let clamped: Vec<Option<f64>> = ca
            .into_iter()
            .map(|v| v.filter(|x| *x >= 0.0))
            .collect();

        df.with_column(Series::new("loyer_mensuel".into(), clamped))
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        Ok(df)
    }

    /// Cast boolean columns to strings so the categorical path is uniform.
    fn cast_booleans(&self, mut df: DataFrame) -> Result<DataFrame> {
        let bool_columns: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|c| c.dtype() == &DataType::Boolean)
            .map(|c| c.name().to_string())
            .collect();

        for name in bool_columns {
            let series = df
                .column(&name)
                .map_err(|e| LoanflowError::DataError(e.to_string()))?
                .as_materialized_series()
                .clone();
            let ca = series
                .bool()
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
            let as_str: Vec<Option<&str>> = ca
                .into_iter()
                .map(|v| v.map(|b| if b { "oui" } else { "non" }))
                .collect();

            df.with_column(Series::new(name.as_str().into(), as_str))
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        }
        Ok(df)
    }
}

/// Right-closed bucket lookup; ages outside [18, 100] have no bucket.
fn age_bucket(age: f64) -> Option<&'static str> {
    AGE_BIN_EDGES
        .windows(2)
        .position(|w| age > w[0] && age <= w[1])
        .map(|i| AGE_BIN_LABELS[i])
}

/// Many-to-one region lookup into 4 economic clusters. Unknown regions pass
/// through unchanged.
fn region_cluster(region: &str) -> &str {
    match region {
        "Île-de-France" => "region_parisienne",
        "Hauts-de-France" | "Normandie" | "Grand Est" | "Bourgogne-Franche-Comté" => "region_nord",
        "Bretagne" | "Pays de la Loire" | "Centre-Val de Loire" | "Nouvelle-Aquitaine" => {
            "region_ouest"
        }
        "Auvergne-Rhône-Alpes" | "Occitanie" | "Provence-Alpes-Côte d'Azur" | "Corse" => {
            "region_sud"
        }
        other => other,
    }
}

/// Best-effort date parsing over the accepted formats.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Canonical column labels: trimmed, lowercased, accents stripped,
/// separators collapsed to underscores.
fn canonicalize_labels(df: &DataFrame) -> Result<DataFrame> {
    let mut result = df.clone();
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| canonical_label(n.as_str()))
        .collect();
    result
        .set_column_names(names)
        .map_err(|e| LoanflowError::DataError(e.to_string()))?;
    Ok(result)
}

fn canonical_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' | 'ä' => 'a',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            "age" => &[Some(25.0), Some(44.0), Some(17.0), Some(100.0)],
            "sexe" => &["H", "F", "H", "F"],
            "region" => &["Île-de-France", "Bretagne", "Wallonia", "Corse"],
            "loyer_mensuel" => &[Some(700.0), Some(-50.0), None, Some(900.0)],
            "historique_credits" => &[Some(2.0), None, Some(1.0), Some(3.0)],
            "date_creation_compte" => &[Some("2020-01-15"), Some("not a date"), None, Some("15/06/2018")],
            "montant_pret" => &[10000.0, 12000.0, 8000.0, 15000.0],
        )
        .unwrap()
    }

    #[test]
    fn test_age_bucket_edges() {
        assert_eq!(age_bucket(17.0), None);
        assert_eq!(age_bucket(18.0), Some("18-29"));
        assert_eq!(age_bucket(44.0), Some("30-44"));
        assert_eq!(age_bucket(100.0), Some("60+"));
        assert_eq!(age_bucket(101.0), None);
    }

    #[test]
    fn test_region_cluster() {
        assert_eq!(region_cluster("Île-de-France"), "region_parisienne");
        assert_eq!(region_cluster("Bretagne"), "region_ouest");
        // Unmapped regions pass through verbatim
        assert_eq!(region_cluster("Wallonia"), "Wallonia");
    }

    #[test]
    fn test_canonical_label() {
        assert_eq!(canonical_label("nationalité_francaise"), "nationalite_francaise");
        assert_eq!(canonical_label(" Niveau Etude "), "niveau_etude");
    }

    #[test]
    fn test_strict_apply_drops_and_derives() {
        let df = sample_df();
        let out = ManualTransforms::new(ColumnPolicy::Strict)
            .with_reference_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .apply(&df)
            .unwrap();

        assert!(out.column("sexe").is_err(), "sexe must be dropped");
        assert!(out.column("age").is_err(), "age must be replaced by tranche_age");
        assert!(out.column("tranche_age").is_ok());
        assert!(out.column("date_creation_compte").is_err());
        assert!(out.column("anciennete_compte_mois").is_ok());

        // 2020-01-15 .. 2024-01-15 is 1461 days -> floor(1461/30) = 48 months
        let months = out
            .column("anciennete_compte_mois")
            .unwrap()
            .f64()
            .unwrap();
        assert_eq!(months.get(0), Some(48.0));
        // Unparseable and absent dates yield null durations
        assert_eq!(months.get(1), None);
        assert_eq!(months.get(2), None);
    }

    #[test]
    fn test_out_of_range_age_yields_null_bucket() {
        let df = sample_df();
        let out = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();
        let buckets = out.column("tranche_age").unwrap().str().unwrap();
        assert_eq!(buckets.get(0), Some("18-29"));
        assert_eq!(buckets.get(1), Some("30-44"));
        assert_eq!(buckets.get(2), None, "age 17 has no bucket");
        assert_eq!(buckets.get(3), Some("60+"));
    }

    #[test]
    fn test_negative_rent_is_nulled_after_indicator() {
        let df = sample_df();
        let out = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();

        let rent = out.column("loyer_mensuel").unwrap().f64().unwrap();
        assert_eq!(rent.get(0), Some(700.0));
        assert_eq!(rent.get(1), None, "negative rent must be nulled");
        assert_eq!(rent.get(3), Some(900.0));

        // Indicator was computed before the clamp: row 1 was present (0),
        // row 2 was already null (1).
        let flag = out.column("loyer_mensuel_manquant").unwrap().f64().unwrap();
        assert_eq!(flag.get(0), Some(0.0));
        assert_eq!(flag.get(1), Some(0.0));
        assert_eq!(flag.get(2), Some(1.0));
    }

    #[test]
    fn test_missing_indicator_for_credit_history() {
        let df = sample_df();
        let out = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();
        let flag = out
            .column("historique_credits_manquant")
            .unwrap()
            .f64()
            .unwrap();
        assert_eq!(flag.get(0), Some(0.0));
        assert_eq!(flag.get(1), Some(1.0));
    }

    #[test]
    fn test_missing_columns_are_tolerated() {
        // A frame with almost nothing in it must not raise.
        let df = df!(
            "revenu_estime_mois" => &[2000.0, 2500.0],
            "montant_pret" => &[9000.0, 11000.0],
        )
        .unwrap();
        let out = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_single_row_batch() {
        let df = sample_df().slice(0, 1);
        let out = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();
        assert_eq!(out.height(), 1);
        assert!(out.column("tranche_age").is_ok());
    }

    #[test]
    fn test_accented_headers_are_canonicalized() {
        let df = df!(
            "nationalité_francaise" => &[true, false],
            "montant_pret" => &[9000.0, 11000.0],
        )
        .unwrap();
        let out = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();
        // Canonicalized, then dropped by the identity rule
        assert!(out.column("nationalite_francaise").is_err());
        assert!(out.column("nationalité_francaise").is_err());
    }
}
