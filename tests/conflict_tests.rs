// Handlers against a file store whose write lock is held by another connection

use dmv_ledger::{
    add_vehicle, find_vehicles_by_owner, query_registration_history, run_setup, verify_registration,
    HandlerStatus, LedgerConfig, LedgerDriver, Vehicle,
};
use rusqlite::Connection;

/// Sample ledger with a single retry, plus a second connection on the same file
fn setup(dir: &tempfile::TempDir) -> (LedgerDriver, Connection) {
    let config = LedgerConfig {
        database: dir.path().join("dmv.db"),
        max_retries: 1,
        ..LedgerConfig::default()
    };
    let store = config.open_store().unwrap();
    let driver = run_setup(&store, &config, true).unwrap();
    let other = Connection::open(&config.database).unwrap();
    (driver, other)
}

#[test]
fn test_reads_are_conflict_while_locked() {
    let dir = tempfile::tempdir().unwrap();
    let (driver, other) = setup(&dir);

    other.execute_batch("BEGIN IMMEDIATE").unwrap();

    let vehicles = find_vehicles_by_owner(&driver, "LEWISR261LL").unwrap();
    assert_eq!(vehicles.status, HandlerStatus::Conflict);
    assert!(vehicles.items.is_empty());

    let history = query_registration_history(&driver, "1N4AL11D75C109151").unwrap();
    assert_eq!(history.status, HandlerStatus::Conflict);

    let report = verify_registration(&driver, "1N4AL11D75C109151").unwrap();
    assert_eq!(report.status, HandlerStatus::Conflict);

    other.execute_batch("ROLLBACK").unwrap();

    let vehicles = find_vehicles_by_owner(&driver, "LEWISR261LL").unwrap();
    assert_eq!(vehicles.status, HandlerStatus::Ok);
    assert_eq!(vehicles.items.len(), 1);
}

#[test]
fn test_write_is_conflict_while_locked() {
    let dir = tempfile::tempdir().unwrap();
    let (driver, other) = setup(&dir);
    let vehicle = Vehicle {
        vin: "5YJ3E1EA7KF317000".to_string(),
        vehicle_type: "Sedan".to_string(),
        year: 2019,
        make: "Tesla".to_string(),
        model: "Model 3".to_string(),
        color: "Red".to_string(),
    };

    other.execute_batch("BEGIN IMMEDIATE").unwrap();
    assert_eq!(add_vehicle(&driver, &vehicle).unwrap(), HandlerStatus::Conflict);
    other.execute_batch("ROLLBACK").unwrap();

    assert_eq!(add_vehicle(&driver, &vehicle).unwrap(), HandlerStatus::Ok);
}
