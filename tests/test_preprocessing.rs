//! Integration tests: manual transforms + statistical pipeline

use loanflow::preprocessing::{apply_manual_transformations, LoanPreprocessor};
use loanflow::schema::ColumnPolicy;
use polars::prelude::*;

fn raw_clients() -> DataFrame {
    df!(
        "id" => &[1i64, 2, 3, 4, 5, 6],
        "nom" => &["Martin", "Bernard", "Dubois", "Thomas", "Robert", "Petit"],
        "age" => &[Some(23.0), Some(37.0), Some(52.0), Some(64.0), Some(17.0), Some(41.0)],
        "taille" => &[170.0, 165.0, 180.0, 175.0, 160.0, 168.0],
        "poids" => &[70.0, 60.0, 85.0, 78.0, 55.0, 65.0],
        "sexe" => &["H", "F", "H", "H", "F", "F"],
        "sport_licence" => &[true, false, false, true, false, true],
        "niveau_etude" => &[Some("bac"), Some("master"), None, Some("bac+2"), Some("aucun"), Some("doctorat")],
        "region" => &["Île-de-France", "Bretagne", "Corse", "Hauts-de-France", "Occitanie", "Normandie"],
        "smoker" => &[false, false, true, false, true, false],
        "nationalite_francaise" => &[true, true, false, true, true, false],
        "revenu_estime_mois" => &[Some(2100.0), Some(2600.0), None, Some(3100.0), Some(1800.0), Some(2400.0)],
        "situation_familiale" => &[Some("celibataire"), Some("marie"), Some("marie"), None, Some("celibataire"), Some("divorce")],
        "historique_credits" => &[Some(1.0), None, Some(2.0), Some(3.0), Some(0.0), Some(1.0)],
        "risque_personnel" => &[Some(0.2), Some(0.4), Some(0.1), Some(0.3), None, Some(0.25)],
        "score_credit" => &[Some(650.0), Some(700.0), Some(580.0), Some(720.0), Some(610.0), None],
        "loyer_mensuel" => &[Some(800.0), Some(-120.0), Some(650.0), None, Some(550.0), Some(700.0)],
        "quotient_caf" => &[Some(900.0), Some(1100.0), None, Some(1300.0), Some(800.0), Some(1000.0)],
        "nb_enfants" => &[0.0, 2.0, 1.0, 3.0, 0.0, 1.0],
        "date_creation_compte" => &[Some("2019-03-01"), Some("2021-07-15"), None, Some("2015-11-30"), Some("garbage"), Some("2022-01-02")],
        "montant_pret" => &[9000.0, 14000.0, 11000.0, 16000.0, 7000.0, 12000.0],
    )
    .unwrap()
}

#[test]
fn test_strict_policy_drops_exact_column_set() {
    let df = raw_clients();
    let out = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();

    for dropped in [
        "id",
        "nom",
        "sexe",
        "taille",
        "poids",
        "smoker",
        "nationalite_francaise",
        "age",
        "date_creation_compte",
    ] {
        assert!(out.column(dropped).is_err(), "{dropped} must not survive strict policy");
    }
    for kept in [
        "tranche_age",
        "region",
        "revenu_estime_mois",
        "anciennete_compte_mois",
        "montant_pret",
    ] {
        assert!(out.column(kept).is_ok(), "{kept} must survive strict policy");
    }
}

#[test]
fn test_loose_policy_keeps_sensitive_columns() {
    let df = raw_clients();
    let out = apply_manual_transformations(&df, ColumnPolicy::Loose).unwrap();

    assert!(out.column("sexe").is_ok());
    assert!(out.column("taille").is_ok());
    assert!(out.column("age").is_ok(), "loose keeps age continuous");
    assert!(out.column("tranche_age").is_err());
    // Identity columns go regardless of policy
    assert!(out.column("id").is_err());
    assert!(out.column("nationalite_francaise").is_err());
}

#[test]
fn test_manual_transforms_never_raise_on_partial_records() {
    // Only two non-essential columns present
    let df = df!(
        "revenu_estime_mois" => &[2000.0],
        "montant_pret" => &[10000.0],
    )
    .unwrap();

    for policy in [ColumnPolicy::Strict, ColumnPolicy::Loose] {
        let out = apply_manual_transformations(&df, policy).unwrap();
        assert_eq!(out.height(), 1);
    }
}

#[test]
fn test_round_trip_matrix_is_identical() {
    let df = raw_clients();
    let derived = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();

    let mut pipeline = LoanPreprocessor::new();
    pipeline.fit(&derived).unwrap();

    let first = pipeline.feature_matrix(&derived).unwrap();
    let second = pipeline.feature_matrix(&derived).unwrap();
    assert_eq!(first, second, "transform drifted between calls on the same batch");
}

#[test]
fn test_null_credit_history_flags_in_fit_and_transform_paths() {
    let df = raw_clients();
    let derived = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();

    let mut pipeline = LoanPreprocessor::new();
    let fitted = pipeline.fit_transform(&derived).unwrap();
    let replayed = pipeline.transform(&derived).unwrap();

    // Row 1 has a null historique_credits in the raw data
    for frame in [&fitted, &replayed] {
        let flag = frame
            .column("historique_credits_manquant")
            .unwrap()
            .f64()
            .unwrap();
        assert_eq!(flag.get(1), Some(1.0));
        assert_eq!(flag.get(0), Some(0.0));
    }
}

#[test]
fn test_unknown_region_encodes_to_zero_block_without_error() {
    let df = raw_clients();
    let derived = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();

    let mut pipeline = LoanPreprocessor::new();
    pipeline.fit(&derived).unwrap();

    let unseen = df!(
        "age" => &[30.0],
        "revenu_estime_mois" => &[2500.0],
        "region" => &["Wallonia"],
    )
    .unwrap();
    let unseen = apply_manual_transformations(&unseen, ColumnPolicy::Strict).unwrap();
    let out = pipeline.transform(&unseen).unwrap();

    let region_blocks: Vec<String> = pipeline
        .feature_names()
        .into_iter()
        .filter(|n| n.starts_with("region_"))
        .collect();
    assert!(!region_blocks.is_empty());
    for name in region_blocks {
        let ca = out.column(&name).unwrap().f64().unwrap();
        assert_eq!(ca.get(0), Some(0.0), "{name} must be zero for an unseen region");
    }
}

#[test]
fn test_transform_with_missing_fitted_column_imputes() {
    let df = raw_clients();
    let derived = apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();

    let mut pipeline = LoanPreprocessor::new();
    let fitted = pipeline.fit_transform(&derived).unwrap();

    // quotient_caf and most other columns missing entirely
    let sparse = df!(
        "age" => &[45.0],
        "region" => &["Bretagne"],
    )
    .unwrap();
    let sparse = apply_manual_transformations(&sparse, ColumnPolicy::Strict).unwrap();
    let out = pipeline.transform(&sparse).unwrap();

    assert_eq!(out.width(), fitted.width(), "column count is fixed at fit time");
    for name in pipeline.feature_names() {
        let ca = out.column(&name).unwrap().f64().unwrap();
        assert!(ca.get(0).unwrap().is_finite(), "{name} must be imputed, not null");
    }
}
