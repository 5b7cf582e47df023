//! Tests for warehouse schema setup

mod common;

use common::RecordingBackend;
use taxi_etl::database::setup::{
    TERMINATE_SESSIONS_SQL, create_database, create_layers, run_setup,
};
use taxi_etl::{EtlConfig, EtlError};
use tempfile::TempDir;

const PROCEDURE: &str = "CREATE OR REPLACE PROCEDURE bronze.incremental_load() LANGUAGE sql AS $$ SELECT 1 $$";

fn created_table(statement: &str) -> Option<String> {
    let rest = statement.strip_prefix("CREATE TABLE ")?;
    let rest = rest.strip_prefix("IF NOT EXISTS ").unwrap_or(rest);
    rest.split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .map(str::to_string)
}

#[tokio::test]
async fn test_create_database_terminates_drops_then_creates() {
    let admin = RecordingBackend::new();

    create_database(&admin, "nyc_taxi").await.unwrap();

    assert_eq!(
        admin.events(),
        vec![
            TERMINATE_SESSIONS_SQL,
            "DROP DATABASE IF EXISTS nyc_taxi WITH (FORCE)",
            "CREATE DATABASE nyc_taxi",
        ]
    );
}

#[tokio::test]
async fn test_layers_are_created_in_order_with_procedure_last() {
    let backend = RecordingBackend::new();

    create_layers(&backend, PROCEDURE, 2024).await.unwrap();
    let events = backend.events();

    let schema = |name: &str| {
        events
            .iter()
            .position(|e| e == &format!("CREATE SCHEMA IF NOT EXISTS {}", name))
            .unwrap()
    };
    assert!(schema("bronze") < schema("meta"));
    assert!(schema("meta") < schema("silver"));
    assert!(schema("silver") < schema("gold"));
    assert_eq!(events.last().map(String::as_str), Some(PROCEDURE));
}

#[tokio::test]
async fn test_every_table_is_dropped_before_it_is_created() {
    let backend = RecordingBackend::new();

    create_layers(&backend, PROCEDURE, 2024).await.unwrap();
    let events = backend.events();

    let mut tables = Vec::new();
    for (i, statement) in events.iter().enumerate() {
        if let Some(table) = created_table(statement) {
            let drop = format!("DROP TABLE IF EXISTS {}", table);
            assert!(
                events[..i].contains(&drop),
                "{} created without a preceding drop",
                table
            );
            tables.push(table);
        }
    }

    for table in [
        "bronze.yellow_taxi_raw",
        "meta.metadata_table",
        "meta.invalid_records",
        "silver.vendor",
        "silver.payment_type",
        "silver.ratecode",
        "silver.yellow_taxi",
    ] {
        assert!(tables.iter().any(|t| t == table), "{} not created", table);
    }
}

#[tokio::test]
async fn test_twelve_partitions_for_configured_year() {
    let backend = RecordingBackend::new();

    create_layers(&backend, PROCEDURE, 2023).await.unwrap();
    let partitions: Vec<String> = backend
        .events()
        .into_iter()
        .filter(|e| e.contains("PARTITION OF silver.yellow_taxi"))
        .collect();

    assert_eq!(partitions.len(), 12);
    assert!(partitions[0].contains("silver.yellow_taxi_p_2023_01"));
    assert!(partitions[11].contains("FROM ('2023-12-01') TO ('2024-01-01')"));
}

#[tokio::test]
async fn test_running_setup_twice_is_balanced() {
    let backend = RecordingBackend::new();

    create_layers(&backend, PROCEDURE, 2024).await.unwrap();
    create_layers(&backend, PROCEDURE, 2024).await.unwrap();
    let events = backend.events();

    // Both passes issue the same drops and creates
    let half = events.len() / 2;
    assert_eq!(events[..half], events[half..]);
}

#[tokio::test]
async fn test_first_failure_aborts_with_step() {
    let backend = RecordingBackend::failing_on("CREATE SCHEMA IF NOT EXISTS meta");

    let err = create_layers(&backend, PROCEDURE, 2024).await.unwrap_err();

    match err {
        EtlError::Setup { step, .. } => assert_eq!(step, "meta"),
        other => panic!("expected setup error, got {:?}", other),
    }
    let events = backend.events();
    assert!(!events.iter().any(|e| e.contains("silver")));
    assert!(!events.iter().any(|e| e == PROCEDURE));
}

#[tokio::test]
async fn test_missing_procedure_script_fails_before_connecting() {
    let dir = TempDir::new().unwrap();
    let mut config = EtlConfig::default();
    config.sql.directory = dir.path().join("missing");

    let err = run_setup(&config).await.unwrap_err();

    assert!(matches!(err, EtlError::Config(ref m) if m.contains("bronze_incremental_load.sql")));
}
