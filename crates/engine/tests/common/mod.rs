#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, Value};

use engine::{Actor, Engine, MoneyCents, PaymentRunCmd};
use migration::MigratorTrait;

pub const PRODUCT: i64 = 1;
pub const PROCESS: i64 = 1;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn insert(db: &DatabaseConnection, sql: &str, values: Vec<Value>) -> i64 {
    let backend = db.get_database_backend();
    let result = db
        .execute(Statement::from_sql_and_values(backend, sql, values))
        .await
        .unwrap();
    i64::try_from(result.last_insert_id()).unwrap()
}

pub async fn execute(db: &DatabaseConnection, sql: &str, values: Vec<Value>) {
    insert(db, sql, values).await;
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn actor() -> Actor {
    Actor::at("clerk", Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap())
}

pub fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

pub fn run_cmd(round: u8) -> PaymentRunCmd {
    PaymentRunCmd::new(round, 2025, date(2025, 9, 1), date(2025, 8, 31), actor())
}

pub async fn grower(db: &DatabaseConnection, number: &str, on_hold: bool) -> i64 {
    insert(
        db,
        "INSERT INTO growers (number, name, currency, price_level, on_hold) VALUES (?, ?, 'CAD', 1, ?)",
        vec![number.into(), format!("Grower {number}").into(), on_hold.into()],
    )
    .await
}

/// Price table for the default product and process: premium 0.10 before
/// 10:00, marketing deduction 0.02, advance prices 1.00 / 1.50 / 1.40.
pub async fn standard_prices(db: &DatabaseConnection) -> i64 {
    let table = price_table(db, PRODUCT, PROCESS, "2025-01-01", "0.10", Some("10:00:00"), "0.02").await;
    for (round, price) in [(1, "1.00"), (2, "1.50"), (3, "1.40")] {
        price_entry(db, table, round, price).await;
    }
    table
}

pub async fn price_table(
    db: &DatabaseConnection,
    product_id: i64,
    process_id: i64,
    effective_from: &str,
    time_premium: &str,
    premium_cutoff: Option<&str>,
    marketing_rate: &str,
) -> i64 {
    insert(
        db,
        "INSERT INTO price_tables (product_id, process_id, effective_from, time_premium, premium_cutoff_time, marketing_deduction_rate) VALUES (?, ?, ?, ?, ?, ?)",
        vec![
            product_id.into(),
            process_id.into(),
            effective_from.into(),
            time_premium.into(),
            premium_cutoff.map(str::to_string).into(),
            marketing_rate.into(),
        ],
    )
    .await
}

pub async fn price_entry(db: &DatabaseConnection, table_id: i64, round: i32, price: &str) {
    execute(
        db,
        "INSERT INTO price_table_entries (price_table_id, round, currency, price_level, grade, price) VALUES (?, ?, 'CAD', 1, 1, ?)",
        vec![table_id.into(), round.into(), price.into()],
    )
    .await;
}

/// 100-unit receipt weighed at 08:00 for the default product and process.
pub async fn receipt(db: &DatabaseConnection, number: &str, grower_id: i64, day: &str) -> i64 {
    receipt_for(db, number, grower_id, PRODUCT, day, "100").await
}

pub async fn receipt_for(
    db: &DatabaseConnection,
    number: &str,
    grower_id: i64,
    product_id: i64,
    day: &str,
    net_weight: &str,
) -> i64 {
    insert(
        db,
        "INSERT INTO receipts (receipt_number, grower_id, product_id, process_id, receipt_date, receipt_time, net_weight, grade, is_voided) VALUES (?, ?, ?, ?, ?, '08:00:00', ?, 1, 0)",
        vec![
            number.into(),
            grower_id.into(),
            product_id.into(),
            PROCESS.into(),
            day.into(),
            net_weight.into(),
        ],
    )
    .await
}

pub async fn count(db: &DatabaseConnection, sql: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(backend, sql))
        .await
        .unwrap()
        .unwrap();
    row.try_get_by_index::<i64>(0).unwrap()
}
