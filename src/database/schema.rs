//! Warehouse schema definitions
//!
//! DDL for the bronze, meta, silver and gold layers. Every table statement is
//! preceded by its own `DROP TABLE IF EXISTS`, so applying the schema twice
//! leaves one copy of each table.

use crate::error::EtlResult;
use crate::ingest::TripMonth;

/// Natural key of a trip, shared by the bronze merge and `meta.invalid_records`
pub const TRIP_KEY_COLUMNS: [&str; 7] = [
    "vendorid",
    "tpep_pickup_datetime",
    "tpep_dropoff_datetime",
    "trip_distance",
    "pulocationid",
    "dolocationid",
    "total_amount",
];

const BRONZE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bronze.yellow_taxi_raw (
    vendorid integer,
    tpep_pickup_datetime timestamp,
    tpep_dropoff_datetime timestamp,
    passenger_count text,
    trip_distance numeric,
    ratecodeid text,
    store_and_fwd_flag text,
    pulocationid integer,
    dolocationid integer,
    payment_type integer,
    fare_amount numeric,
    extra numeric,
    mta_tax numeric,
    tip_amount numeric,
    tolls_amount numeric,
    improvement_surcharge numeric,
    total_amount numeric,
    congestion_surcharge numeric,
    airport_fee numeric
)"#;

const BRONZE_KEY_INDEX_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS yellow_taxi_raw_trip_key_idx
    ON bronze.yellow_taxi_raw (
        vendorid, tpep_pickup_datetime, tpep_dropoff_datetime,
        trip_distance, pulocationid, dolocationid, total_amount
    )"#;

const METADATA_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS meta.metadata_table (
    last_load_date timestamp,
    status meta.status_enum,
    runtime interval,
    error_message text
)"#;

const INVALID_RECORDS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS meta.invalid_records (
    LIKE bronze.yellow_taxi_raw,
    PRIMARY KEY (
        vendorid, tpep_pickup_datetime, tpep_dropoff_datetime,
        trip_distance, pulocationid, dolocationid, total_amount
    )
)"#;

const VENDOR_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS silver.vendor (
    vendorid integer,
    vendor text,
    PRIMARY KEY (vendorid)
)"#;

const PAYMENT_TYPE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS silver.payment_type (
    payment_type_id integer,
    payment_type text,
    PRIMARY KEY (payment_type_id)
)"#;

const RATECODE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS silver.ratecode (
    ratecodeid integer,
    rate text,
    PRIMARY KEY (ratecodeid)
)"#;

const YELLOW_TAXI_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS silver.yellow_taxi (
    vendorid integer REFERENCES silver.vendor (vendorid),
    tpep_pickup_datetime timestamp,
    tpep_dropoff_datetime timestamp,
    minute_duration integer,
    passenger_count text,
    trip_distance numeric,
    ratecodeid integer REFERENCES silver.ratecode (ratecodeid),
    store_and_fwd_flag text,
    pulocationid integer,
    dolocationid integer,
    payment_type integer REFERENCES silver.payment_type (payment_type_id),
    fare_amount numeric,
    extra numeric,
    mta_tax numeric,
    tip_amount numeric,
    tolls_amount numeric,
    improvement_surcharge numeric,
    total_amount numeric,
    congestion_surcharge numeric,
    airport_fee numeric
)
PARTITION BY RANGE (tpep_pickup_datetime)"#;

/// An ordered group of DDL statements applied as one setup step
#[derive(Debug, Clone)]
pub struct SchemaStep {
    /// Step name, used in logs and errors
    pub name: &'static str,
    /// Statements, executed one at a time in order
    pub statements: Vec<String>,
}

/// Warehouse schema helper
pub struct DatabaseSchema;

impl DatabaseSchema {
    /// Statements run on the maintenance database to recreate `db_name`
    ///
    /// `db_name` must already be a validated plain identifier.
    pub fn recreate_database(db_name: &str) -> Vec<String> {
        vec![
            format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", db_name),
            format!("CREATE DATABASE {}", db_name),
        ]
    }

    /// Bronze schema and raw trip table
    pub fn bronze() -> SchemaStep {
        SchemaStep {
            name: "bronze",
            statements: vec![
                "CREATE SCHEMA IF NOT EXISTS bronze".to_string(),
                "DROP TABLE IF EXISTS bronze.yellow_taxi_raw".to_string(),
                BRONZE_TABLE_SQL.to_string(),
                BRONZE_KEY_INDEX_SQL.to_string(),
            ],
        }
    }

    /// Meta schema: load status enum, metadata log and rejected rows
    pub fn meta() -> SchemaStep {
        SchemaStep {
            name: "meta",
            statements: vec![
                "CREATE SCHEMA IF NOT EXISTS meta".to_string(),
                "DROP TYPE IF EXISTS meta.status_enum CASCADE".to_string(),
                "CREATE TYPE meta.status_enum AS ENUM ('success', 'failed')".to_string(),
                "DROP TABLE IF EXISTS meta.metadata_table".to_string(),
                METADATA_TABLE_SQL.to_string(),
                "DROP TABLE IF EXISTS meta.invalid_records".to_string(),
                INVALID_RECORDS_SQL.to_string(),
            ],
        }
    }

    /// Silver schema: dimensions, partitioned fact and its twelve partitions
    pub fn silver(year: i32) -> EtlResult<SchemaStep> {
        // The fact references the dimensions, so it goes first
        let mut statements = vec![
            "CREATE SCHEMA IF NOT EXISTS silver".to_string(),
            "DROP TABLE IF EXISTS silver.yellow_taxi".to_string(),
            "DROP TABLE IF EXISTS silver.vendor".to_string(),
            VENDOR_SQL.to_string(),
            "DROP TABLE IF EXISTS silver.payment_type".to_string(),
            PAYMENT_TYPE_SQL.to_string(),
            "DROP TABLE IF EXISTS silver.ratecode".to_string(),
            RATECODE_SQL.to_string(),
            YELLOW_TAXI_SQL.to_string(),
        ];
        statements.extend(Self::partitions(year)?);

        Ok(SchemaStep {
            name: "silver",
            statements,
        })
    }

    /// Gold schema; its tables are built by the gold script
    pub fn gold() -> SchemaStep {
        SchemaStep {
            name: "gold",
            statements: vec!["CREATE SCHEMA IF NOT EXISTS gold".to_string()],
        }
    }

    /// All layer steps in application order
    pub fn layers(year: i32) -> EtlResult<Vec<SchemaStep>> {
        Ok(vec![
            Self::bronze(),
            Self::meta(),
            Self::silver(year)?,
            Self::gold(),
        ])
    }

    /// Monthly range partitions of `silver.yellow_taxi` for `year`
    ///
    /// Each partition covers `[first of month, first of next month)`.
    pub fn partitions(year: i32) -> EtlResult<Vec<String>> {
        let mut statements = Vec::with_capacity(24);
        for month in 1..=12 {
            let month = TripMonth::new(year, month)?;
            let name = Self::partition_name(month);
            statements.push(format!("DROP TABLE IF EXISTS {}", name));
            statements.push(format!(
                "CREATE TABLE IF NOT EXISTS {} PARTITION OF silver.yellow_taxi \
                 FOR VALUES FROM ('{}') TO ('{}')",
                name,
                month.first_day().format("%Y-%m-%d"),
                month.next().first_day().format("%Y-%m-%d")
            ));
        }
        Ok(statements)
    }

    /// Qualified partition table name, e.g. `silver.yellow_taxi_p_2024_01`
    pub fn partition_name(month: TripMonth) -> String {
        format!(
            "silver.yellow_taxi_p_{:04}_{:02}",
            month.year(),
            month.month()
        )
    }
}
