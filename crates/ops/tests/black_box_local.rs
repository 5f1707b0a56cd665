//! Black-box scenarios through the operations facade over the local
//! single-file backend, driving the same artifact a deployment would.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;

use jjcims_auth::{SecretCipher, Totp};
use jjcims_core::{AccessLevel, ItemPatch, NewEmployee, NewItem, StockStatus, Warning};
use jjcims_ops::Ops;
use jjcims_store::{LocalStore, RetryPolicy, Store};

const TOTP_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

struct TestDb {
    _dir: tempfile::TempDir,
    path: PathBuf,
    ops: Ops,
}

fn open_ops() -> TestDb {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("JJCIMS.accdb");
    let store = LocalStore::open(path.clone(), RetryPolicy::new(1, Duration::from_millis(20)))
        .expect("failed to open store");
    store.initialize().expect("failed to initialize artifact");
    let ops = Ops::new(Arc::new(store), SecretCipher::new(&[7u8; 32]));
    TestDb {
        _dir: dir,
        path,
        ops,
    }
}

/// Raw schema surgery on the artifact, bypassing the connector.
fn exec_sql(path: &Path, sql: &str) {
    use sqlx::Connection;
    use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};

    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let mut conn =
            SqliteConnection::connect_with(&SqliteConnectOptions::new().filename(path))
                .await
                .unwrap();
        sqlx::query(sql).execute(&mut conn).await.unwrap();
    });
}

fn hex_bolt() -> NewItem {
    NewItem {
        name: "Hex Bolt M8".to_string(),
        brand: "X".to_string(),
        item_type: "Fastener".to_string(),
        location: "A1".to_string(),
        unit_of_measure: "pcs".to_string(),
        stock_in: 10,
        stock_out: 0,
        min_stock: 5,
        price_per_unit: Decimal::new(250, 2),
        last_po: None,
        supplier: "Acme".to_string(),
    }
}

fn level3(username: &str, password: &str) -> NewEmployee {
    NewEmployee {
        username: username.to_string(),
        first_name: "Jane".to_string(),
        middle_name: String::new(),
        last_name: "Doe".to_string(),
        access_level: AccessLevel::Level3,
        password: Some(password.to_string()),
        totp_secret: None,
    }
}

fn current_code() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    Totp::from_base32(TOTP_SECRET).unwrap().code_at(now)
}

/// A six-digit code outside every window the verifier tolerates.
fn wrong_code() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let totp = Totp::from_base32(TOTP_SECRET).unwrap();
    let nearby: Vec<String> = [now - 60, now - 30, now, now + 30, now + 60]
        .iter()
        .map(|t| totp.code_at(*t))
        .collect();
    (0..1_000_000)
        .map(|n| format!("{n:06}"))
        .find(|c| !nearby.contains(c))
        .unwrap()
}

#[test]
fn added_item_shows_up_on_the_dashboard() {
    let db = open_ops();
    let outcome = db.ops.add_item(hex_bolt(), "boss", None).unwrap();
    assert!(!outcome.has_warnings());

    let dashboard = db.ops.list_items_for_dashboard().unwrap();
    assert!(dashboard.iter().any(|r| r.name == "Hex Bolt M8"));

    let item = db
        .ops
        .store()
        .fetch_item_by_name("Hex Bolt M8")
        .unwrap()
        .unwrap();
    assert_eq!(item.status, StockStatus::InStock);
    assert_eq!(item.balance, 10);
    assert_eq!(item.supplier, "Acme");
    assert_eq!(item.price_per_unit, Decimal::new(250, 2));

    let adm = db.ops.fetch_admin_logs().unwrap();
    assert_eq!(adm[0].details, "Added 10x of Hex Bolt M8 from Acme");
}

#[test]
fn checkout_decrements_balance_and_writes_the_employee_log() {
    let db = open_ops();
    db.ops.add_item(hex_bolt(), "boss", None).unwrap();

    let outcome = db.ops.increment_out("Hex Bolt M8", 5, "jdoe").unwrap();
    assert_eq!(outcome.value.stock_out, 5);
    assert_eq!(outcome.value.balance, 5);
    assert_eq!(outcome.value.status, StockStatus::LowInStock);

    // The derived columns reached the artifact, not just the return value.
    let stored = db
        .ops
        .store()
        .fetch_item_by_name("Hex Bolt M8")
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, StockStatus::LowInStock);
    assert_eq!(stored.deficit, 0);

    let logs = db.ops.fetch_emp_logs().unwrap();
    assert_eq!(
        logs[0].details,
        "Took 5 pcs of X Hex Bolt M8 (Fastener) from A1"
    );
    assert_eq!(logs[0].actor, "jdoe");
}

#[test]
fn raising_min_stock_moves_the_item_into_the_restock_view() {
    let db = open_ops();
    let id = db.ops.add_item(hex_bolt(), "boss", None).unwrap().value.id;
    let before = db.ops.stats().unwrap();

    let patch = ItemPatch {
        min_stock: Some(12),
        ..Default::default()
    };
    db.ops.update_item_by_id(id, patch, "boss").unwrap();

    let restock = db.ops.restock_list().unwrap();
    assert_eq!(restock[0].name, "Hex Bolt M8");
    assert_eq!(restock[0].status, StockStatus::LowInStock);

    let after = db.ops.stats().unwrap();
    assert_eq!(before.total_cost, after.total_cost);
    assert_eq!(after.low_stock, 1);
    assert_eq!(after.restock.total, 1);
}

#[test]
fn login_needs_password_and_current_totp_code() {
    let db = open_ops();
    db.ops.add_employee(level3("jdoe", "hunter2"), "boss").unwrap();
    db.ops.set_user_2fa_secret("jdoe", TOTP_SECRET).unwrap();

    assert!(db.ops.verify_password("jdoe", "hunter2").unwrap());
    assert!(!db.ops.verify_password("jdoe", "wrong").unwrap());
    assert!(db.ops.verify_totp("jdoe", &current_code()).unwrap());
    assert!(!db.ops.verify_totp("jdoe", &wrong_code()).unwrap());

    assert!(db.ops.login("jdoe", "hunter2", Some(&current_code())).is_ok());
    assert!(db.ops.login("jdoe", "hunter2", Some(&wrong_code())).is_err());
    assert!(db.ops.login("jdoe", "hunter2", None).is_err());
}

#[test]
fn demotion_clears_stored_credentials_and_keeps_an_admin() {
    let db = open_ops();
    db.ops.add_employee(level3("boss2", "pw1"), "boss").unwrap();
    db.ops.add_employee(level3("jdoe", "pw2"), "boss").unwrap();
    db.ops.set_user_2fa_secret("jdoe", TOTP_SECRET).unwrap();

    db.ops
        .update_user_access_level("jdoe", AccessLevel::Level1, None, "boss")
        .unwrap();

    // At rest, both credential columns are null.
    let stored = db.ops.store().fetch_employee("jdoe").unwrap().unwrap();
    assert_eq!(stored.access_level, AccessLevel::Level1);
    assert!(stored.password.is_none());
    assert!(stored.totp_secret.is_none());

    let adm = db.ops.fetch_admin_logs().unwrap();
    assert!(
        adm.iter()
            .any(|l| l.details == "Changed jdoe access level from Level 3 to Level 1")
    );

    let admins = db
        .ops
        .list_employees()
        .unwrap()
        .iter()
        .filter(|e| e.access_level.is_admin())
        .count();
    assert_eq!(admins, 1);
}

#[test]
fn audit_appends_recover_from_a_missing_log_table() {
    let db = open_ops();
    exec_sql(&db.path, "DROP TABLE adm_logs");

    let outcome = db.ops.add_item(hex_bolt(), "boss", None).unwrap();
    assert!(!outcome.has_warnings());
    assert_eq!(db.ops.fetch_admin_logs().unwrap().len(), 1);

    // Further appends land in the recreated table.
    db.ops.delete_item_by_name("Hex Bolt M8", "boss").unwrap();
    assert_eq!(db.ops.fetch_admin_logs().unwrap().len(), 2);
}

#[test]
fn audit_failure_does_not_abort_the_mutation() {
    let db = open_ops();
    // A log table with the wrong shape defeats the append and its retry.
    exec_sql(&db.path, "DROP TABLE adm_logs");
    exec_sql(&db.path, "CREATE TABLE adm_logs (ID INTEGER PRIMARY KEY, NOTE TEXT)");

    let outcome = db.ops.add_item(hex_bolt(), "boss", None).unwrap();
    assert!(matches!(outcome.warnings.as_slice(), [Warning::Audit(_)]));
    assert!(
        db.ops
            .store()
            .fetch_item_by_name("Hex Bolt M8")
            .unwrap()
            .is_some()
    );
}
