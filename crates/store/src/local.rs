//! Local single-file backend.
//!
//! Opens a fresh SQLite handle against the resolved artifact for every call,
//! commits writes, and retries transient "database is locked" errors with a
//! fixed backoff. The handle never outlives the call.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};

use jjcims_core::{
    AccessLevel, DashboardRow, Draft, Employee, EmployeePatch, Item, ItemPatch, ItemSummary,
    LogEntry, NewDraft, StockStatus,
};

use crate::error::{StoreError, StoreResult};
use crate::retry::RetryPolicy;
use crate::store::Store;

/// How long one attempt waits on SQLite's own busy handler before the
/// connector's retry loop takes over.
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

const ITEM_COLUMNS: &str = r#"ID, NAME, BRAND, TYPE, LOCATION, "UNIT OF MEASURE", STATUS, "IN", "OUT", BALANCE, "MIN STOCK", DEFICIT, "PRICE PER UNIT", COST, "LAST PO", SUPPLIER"#;

/// Connector over the single-file database at the resolved path.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    retry: RetryPolicy,
    rt: tokio::runtime::Runtime,
}

impl LocalStore {
    /// Build a store over `path`. The file itself is opened per call; a
    /// missing artifact surfaces on the first operation.
    pub fn open(path: PathBuf, retry: RetryPolicy) -> StoreResult<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| StoreError::backend(format!("runtime: {e}")))?;
        Ok(Self { path, retry, rt })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the artifact and its full schema. Deployment tooling and
    /// tests call this; normal operation expects the artifact to exist.
    pub fn initialize(&self) -> StoreResult<()> {
        self.rt.block_on(async {
            let mut conn = connect(&self.path, true).await?;
            for stmt in SCHEMA {
                sqlx::query(stmt)
                    .execute(&mut conn)
                    .await
                    .map_err(map_sql)?;
            }
            Ok(())
        })
    }

    /// Run one connector call: fresh handle, bounded lock retry.
    fn call<T>(
        &self,
        op: impl AsyncFn(&mut SqliteConnection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.retry.run(StoreError::is_locked, || {
            self.rt.block_on(async {
                let mut conn = connect(&self.path, false).await?;
                op(&mut conn).await
            })
        })
    }
}

async fn connect(path: &Path, create: bool) -> StoreResult<SqliteConnection> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .busy_timeout(BUSY_TIMEOUT);
    SqliteConnection::connect_with(&options)
        .await
        .map_err(map_sql)
}

fn map_sql(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let msg = db.message().to_string();
            if msg.contains("locked") || msg.contains("busy") {
                StoreError::Locked(msg)
            } else {
                StoreError::Backend(msg)
            }
        }
        other => StoreError::backend(other.to_string()),
    }
}

fn is_missing_table(err: &StoreError) -> bool {
    matches!(err, StoreError::Backend(msg) if msg.contains("no such table"))
}

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS ITEMSDB (
        ID INTEGER PRIMARY KEY AUTOINCREMENT,
        NAME TEXT NOT NULL,
        BRAND TEXT NOT NULL,
        TYPE TEXT NOT NULL,
        LOCATION TEXT NOT NULL,
        "UNIT OF MEASURE" TEXT NOT NULL,
        STATUS TEXT NOT NULL,
        "IN" INTEGER NOT NULL,
        "OUT" INTEGER NOT NULL,
        BALANCE INTEGER NOT NULL,
        "MIN STOCK" INTEGER NOT NULL,
        DEFICIT INTEGER NOT NULL,
        "PRICE PER UNIT" TEXT NOT NULL,
        COST TEXT,
        "LAST PO" TEXT,
        SUPPLIER TEXT NOT NULL
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_itemsdb_name
        ON ITEMSDB (NAME COLLATE NOCASE)"#,
    r#"CREATE TABLE IF NOT EXISTS emp_list (
        ID INTEGER PRIMARY KEY AUTOINCREMENT,
        Username TEXT NOT NULL,
        "First Name" TEXT NOT NULL,
        "Middle Name" TEXT,
        "Last Name" TEXT NOT NULL,
        "Access Level" TEXT NOT NULL,
        Password TEXT,
        "2FA Secret" TEXT
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_emp_list_username
        ON emp_list (Username COLLATE NOCASE)"#,
    CREATE_EMP_LOGS,
    CREATE_EMP_LOGS_INDEX,
    CREATE_ADM_LOGS,
    CREATE_ADM_LOGS_INDEX,
    CREATE_DRAFTS,
];

const CREATE_EMP_LOGS: &str = r#"CREATE TABLE IF NOT EXISTS emp_logs (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    DATE TEXT NOT NULL,
    TIME TEXT NOT NULL,
    NAME TEXT NOT NULL,
    DETAILS TEXT NOT NULL
)"#;

const CREATE_EMP_LOGS_INDEX: &str =
    r#"CREATE INDEX IF NOT EXISTS idx_emp_logs_date_time ON emp_logs (DATE DESC, TIME DESC)"#;

const CREATE_ADM_LOGS: &str = r#"CREATE TABLE IF NOT EXISTS adm_logs (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    DATE TEXT NOT NULL,
    TIME TEXT NOT NULL,
    USER TEXT NOT NULL,
    DETAILS TEXT NOT NULL
)"#;

const CREATE_ADM_LOGS_INDEX: &str =
    r#"CREATE INDEX IF NOT EXISTS idx_adm_logs_date_time ON adm_logs (DATE DESC, TIME DESC)"#;

const CREATE_DRAFTS: &str = r#"CREATE TABLE IF NOT EXISTS ANI_DRAFTS (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    DATE TEXT NOT NULL,
    NAME TEXT NOT NULL,
    BRAND TEXT NOT NULL,
    TYPE TEXT NOT NULL,
    LOCATION TEXT NOT NULL,
    "UNIT OF MEASURE" TEXT NOT NULL,
    "IN" INTEGER NOT NULL,
    "MIN STOCK" INTEGER NOT NULL,
    "PRICE PER UNIT" TEXT NOT NULL,
    SUPPLIER TEXT NOT NULL
)"#;

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

fn get_text(row: &SqliteRow, col: &str) -> StoreResult<String> {
    row.try_get::<String, _>(col)
        .map_err(|e| StoreError::backend(format!("column {col}: {e}")))
}

fn get_opt_text(row: &SqliteRow, col: &str) -> StoreResult<Option<String>> {
    row.try_get::<Option<String>, _>(col)
        .map_err(|e| StoreError::backend(format!("column {col}: {e}")))
}

fn get_int(row: &SqliteRow, col: &str) -> StoreResult<i64> {
    row.try_get::<i64, _>(col)
        .map_err(|e| StoreError::backend(format!("column {col}: {e}")))
}

fn parse_status(text: &str) -> StoreResult<StockStatus> {
    StockStatus::parse(text)
        .ok_or_else(|| StoreError::backend(format!("unknown STATUS value '{text}'")))
}

fn parse_money(text: &str) -> StoreResult<Decimal> {
    Decimal::from_str(text)
        .map_err(|e| StoreError::backend(format!("bad currency value '{text}': {e}")))
}

fn parse_stored_date(text: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| StoreError::backend(format!("bad date value '{text}': {e}")))
}

fn item_from_row(row: &SqliteRow) -> StoreResult<Item> {
    Ok(Item {
        id: get_int(row, "ID")?,
        name: get_text(row, "NAME")?,
        brand: get_text(row, "BRAND")?,
        item_type: get_text(row, "TYPE")?,
        location: get_text(row, "LOCATION")?,
        unit_of_measure: get_text(row, "UNIT OF MEASURE")?,
        status: parse_status(&get_text(row, "STATUS")?)?,
        stock_in: get_int(row, "IN")?,
        stock_out: get_int(row, "OUT")?,
        balance: get_int(row, "BALANCE")?,
        min_stock: get_int(row, "MIN STOCK")?,
        deficit: get_int(row, "DEFICIT")?,
        price_per_unit: parse_money(&get_text(row, "PRICE PER UNIT")?)?,
        cost: get_opt_text(row, "COST")?
            .map(|t| parse_money(&t))
            .transpose()?,
        last_po: get_opt_text(row, "LAST PO")?
            .map(|t| parse_stored_date(&t))
            .transpose()?,
        supplier: get_text(row, "SUPPLIER")?,
    })
}

fn employee_from_row(row: &SqliteRow) -> StoreResult<Employee> {
    let level_text = get_text(row, "Access Level")?;
    Ok(Employee {
        id: get_int(row, "ID")?,
        username: get_text(row, "Username")?,
        first_name: get_text(row, "First Name")?,
        middle_name: get_opt_text(row, "Middle Name")?.unwrap_or_default(),
        last_name: get_text(row, "Last Name")?,
        access_level: AccessLevel::parse(&level_text)
            .ok_or_else(|| StoreError::backend(format!("unknown Access Level '{level_text}'")))?,
        password: get_opt_text(row, "Password")?,
        totp_secret: get_opt_text(row, "2FA Secret")?,
    })
}

fn log_from_row(row: &SqliteRow, actor_col: &str) -> StoreResult<LogEntry> {
    let date = parse_stored_date(&get_text(row, "DATE")?)?;
    let time_text = get_text(row, "TIME")?;
    let time = NaiveTime::parse_from_str(&time_text, "%H:%M:%S")
        .map_err(|e| StoreError::backend(format!("bad time value '{time_text}': {e}")))?;
    Ok(LogEntry {
        date,
        time,
        actor: get_text(row, actor_col)?,
        details: get_text(row, "DETAILS")?,
    })
}

fn draft_from_row(row: &SqliteRow) -> StoreResult<Draft> {
    Ok(Draft {
        id: get_int(row, "ID")?,
        date: parse_stored_date(&get_text(row, "DATE")?)?,
        name: get_text(row, "NAME")?,
        brand: get_text(row, "BRAND")?,
        item_type: get_text(row, "TYPE")?,
        location: get_text(row, "LOCATION")?,
        unit_of_measure: get_text(row, "UNIT OF MEASURE")?,
        stock_in: get_int(row, "IN")?,
        min_stock: get_int(row, "MIN STOCK")?,
        price_per_unit: parse_money(&get_text(row, "PRICE PER UNIT")?)?,
        supplier: get_text(row, "SUPPLIER")?,
    })
}

fn stored_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Store for LocalStore {
    fn backend_name(&self) -> &'static str {
        "local-file"
    }

    fn fetch_items(&self) -> StoreResult<Vec<Item>> {
        self.call(async |conn| {
            let sql = format!("SELECT {ITEM_COLUMNS} FROM ITEMSDB ORDER BY NAME COLLATE NOCASE");
            let rows = sqlx::query(&sql).fetch_all(conn).await.map_err(map_sql)?;
            rows.iter().map(item_from_row).collect()
        })
    }

    fn fetch_dashboard(&self) -> StoreResult<Vec<DashboardRow>> {
        self.call(async |conn| {
            let rows = sqlx::query(
                r#"SELECT ID, NAME, SUPPLIER, "LAST PO" FROM ITEMSDB ORDER BY NAME COLLATE NOCASE"#,
            )
            .fetch_all(conn)
            .await
            .map_err(map_sql)?;
            rows.iter()
                .map(|row| {
                    Ok(DashboardRow {
                        id: get_int(row, "ID")?,
                        name: get_text(row, "NAME")?,
                        supplier: get_text(row, "SUPPLIER")?,
                        last_po: get_opt_text(row, "LAST PO")?
                            .map(|t| parse_stored_date(&t))
                            .transpose()?,
                    })
                })
                .collect()
        })
    }

    fn fetch_items_by_type(&self, category: &str) -> StoreResult<Vec<ItemSummary>> {
        self.call(async |conn| {
            let rows = sqlx::query(
                r#"SELECT ID, NAME, BRAND, TYPE, LOCATION, "UNIT OF MEASURE", STATUS, BALANCE
                   FROM ITEMSDB
                   WHERE TYPE = ?1 AND STATUS <> 'Out of Stock'
                   ORDER BY NAME COLLATE NOCASE"#,
            )
            .bind(category)
            .fetch_all(conn)
            .await
            .map_err(map_sql)?;
            rows.iter()
                .map(|row| {
                    Ok(ItemSummary {
                        id: get_int(row, "ID")?,
                        name: get_text(row, "NAME")?,
                        brand: get_text(row, "BRAND")?,
                        item_type: get_text(row, "TYPE")?,
                        location: get_text(row, "LOCATION")?,
                        unit_of_measure: get_text(row, "UNIT OF MEASURE")?,
                        status: parse_status(&get_text(row, "STATUS")?)?,
                        balance: get_int(row, "BALANCE")?,
                    })
                })
                .collect()
        })
    }

    fn fetch_item_by_name(&self, name: &str) -> StoreResult<Option<Item>> {
        self.call(async |conn| {
            let sql =
                format!("SELECT {ITEM_COLUMNS} FROM ITEMSDB WHERE NAME = ?1 COLLATE NOCASE");
            let row = sqlx::query(&sql)
                .bind(name)
                .fetch_optional(conn)
                .await
                .map_err(map_sql)?;
            row.as_ref().map(item_from_row).transpose()
        })
    }

    fn fetch_item_by_id(&self, id: i64) -> StoreResult<Option<Item>> {
        self.call(async |conn| {
            let sql = format!("SELECT {ITEM_COLUMNS} FROM ITEMSDB WHERE ID = ?1");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .map_err(map_sql)?;
            row.as_ref().map(item_from_row).transpose()
        })
    }

    fn unit_of_measure(&self, name: &str) -> StoreResult<Option<String>> {
        self.call(async |conn| {
            let row = sqlx::query(
                r#"SELECT "UNIT OF MEASURE" FROM ITEMSDB WHERE NAME = ?1 COLLATE NOCASE"#,
            )
            .bind(name)
            .fetch_optional(conn)
            .await
            .map_err(map_sql)?;
            row.as_ref()
                .map(|r| get_text(r, "UNIT OF MEASURE"))
                .transpose()
        })
    }

    fn insert_item(&self, item: &Item) -> StoreResult<i64> {
        self.call(async |conn| {
            let result = sqlx::query(
                r#"INSERT INTO ITEMSDB
                   (NAME, BRAND, TYPE, LOCATION, "UNIT OF MEASURE", STATUS,
                    "IN", "OUT", BALANCE, "MIN STOCK", DEFICIT,
                    "PRICE PER UNIT", COST, "LAST PO", SUPPLIER)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
            )
            .bind(&item.name)
            .bind(&item.brand)
            .bind(&item.item_type)
            .bind(&item.location)
            .bind(&item.unit_of_measure)
            .bind(item.status.as_str())
            .bind(item.stock_in)
            .bind(item.stock_out)
            .bind(item.balance)
            .bind(item.min_stock)
            .bind(item.deficit)
            .bind(item.price_per_unit.to_string())
            .bind(item.cost.map(|c| c.to_string()))
            .bind(item.last_po.map(stored_date))
            .bind(&item.supplier)
            .execute(conn)
            .await
            .map_err(map_sql)?;
            Ok(result.last_insert_rowid())
        })
    }

    fn update_item(&self, id: i64, patch: &ItemPatch) -> StoreResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.call(async |conn| {
            let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new("UPDATE ITEMSDB SET ");
            {
                let mut sep = qb.separated(", ");
                if let Some(v) = &patch.name {
                    sep.push("NAME = ").push_bind_unseparated(v.clone());
                }
                if let Some(v) = &patch.brand {
                    sep.push("BRAND = ").push_bind_unseparated(v.clone());
                }
                if let Some(v) = &patch.item_type {
                    sep.push("TYPE = ").push_bind_unseparated(v.clone());
                }
                if let Some(v) = &patch.location {
                    sep.push("LOCATION = ").push_bind_unseparated(v.clone());
                }
                if let Some(v) = &patch.unit_of_measure {
                    sep.push(r#""UNIT OF MEASURE" = "#)
                        .push_bind_unseparated(v.clone());
                }
                if let Some(v) = patch.stock_in {
                    sep.push(r#""IN" = "#).push_bind_unseparated(v);
                }
                if let Some(v) = patch.stock_out {
                    sep.push(r#""OUT" = "#).push_bind_unseparated(v);
                }
                // SET expressions see pre-update values, so patched IN/OUT
                // must be bound into the balance recomputation explicitly.
                match (patch.stock_in, patch.stock_out) {
                    (Some(stock_in), Some(stock_out)) => {
                        sep.push("BALANCE = ").push_bind_unseparated(stock_in - stock_out);
                    }
                    (Some(stock_in), None) => {
                        sep.push("BALANCE = ")
                            .push_bind_unseparated(stock_in)
                            .push_unseparated(r#" - "OUT""#);
                    }
                    (None, Some(stock_out)) => {
                        sep.push(r#"BALANCE = "IN" - "#).push_bind_unseparated(stock_out);
                    }
                    (None, None) => {}
                }
                if let Some(v) = patch.min_stock {
                    sep.push(r#""MIN STOCK" = "#).push_bind_unseparated(v);
                }
                if let Some(v) = patch.price_per_unit {
                    sep.push(r#""PRICE PER UNIT" = "#)
                        .push_bind_unseparated(v.to_string());
                }
                if let Some(v) = patch.last_po {
                    sep.push(r#""LAST PO" = "#)
                        .push_bind_unseparated(stored_date(v));
                }
                if let Some(v) = &patch.supplier {
                    sep.push("SUPPLIER = ").push_bind_unseparated(v.clone());
                }
            }
            qb.push(" WHERE ID = ").push_bind(id);

            let result = qb.build().execute(conn).await.map_err(map_sql)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Missing);
            }
            Ok(())
        })
    }

    fn delete_item_by_name(&self, name: &str) -> StoreResult<()> {
        self.call(async |conn| {
            let result = sqlx::query("DELETE FROM ITEMSDB WHERE NAME = ?1 COLLATE NOCASE")
                .bind(name)
                .execute(conn)
                .await
                .map_err(map_sql)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Missing);
            }
            Ok(())
        })
    }

    fn delete_item_by_id(&self, id: i64) -> StoreResult<()> {
        self.call(async |conn| {
            let result = sqlx::query("DELETE FROM ITEMSDB WHERE ID = ?1")
                .bind(id)
                .execute(conn)
                .await
                .map_err(map_sql)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Missing);
            }
            Ok(())
        })
    }

    fn increment_out(&self, name: &str, qty: i64) -> StoreResult<()> {
        self.call(async |conn| {
            let result = sqlx::query(
                r#"UPDATE ITEMSDB
                   SET "OUT" = "OUT" + ?1, BALANCE = BALANCE - ?1
                   WHERE NAME = ?2 COLLATE NOCASE"#,
            )
            .bind(qty)
            .bind(name)
            .execute(conn)
            .await
            .map_err(map_sql)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Missing);
            }
            Ok(())
        })
    }

    fn write_derived(
        &self,
        name: &str,
        status: StockStatus,
        deficit: i64,
        cost: Decimal,
    ) -> StoreResult<()> {
        self.call(async |conn| {
            let result = sqlx::query(
                r#"UPDATE ITEMSDB SET STATUS = ?1, DEFICIT = ?2, COST = ?3
                   WHERE NAME = ?4 COLLATE NOCASE"#,
            )
            .bind(status.as_str())
            .bind(deficit)
            .bind(cost.to_string())
            .bind(name)
            .execute(conn)
            .await
            .map_err(map_sql)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Missing);
            }
            Ok(())
        })
    }

    // ── Logs ─────────────────────────────────────────────────────────────

    fn insert_emp_log(&self, entry: &LogEntry) -> StoreResult<()> {
        self.call(async |conn| {
            match insert_log(conn, "emp_logs", "NAME", entry).await {
                Err(e) if is_missing_table(&e) => {
                    ensure_table(conn, &[CREATE_EMP_LOGS, CREATE_EMP_LOGS_INDEX]).await?;
                    insert_log(conn, "emp_logs", "NAME", entry).await
                }
                other => other,
            }
        })
    }

    fn insert_adm_log(&self, entry: &LogEntry) -> StoreResult<()> {
        self.call(async |conn| {
            match insert_log(conn, "adm_logs", "USER", entry).await {
                Err(e) if is_missing_table(&e) => {
                    ensure_table(conn, &[CREATE_ADM_LOGS, CREATE_ADM_LOGS_INDEX]).await?;
                    insert_log(conn, "adm_logs", "USER", entry).await
                }
                other => other,
            }
        })
    }

    fn fetch_emp_logs(&self) -> StoreResult<Vec<LogEntry>> {
        self.call(async |conn| fetch_logs(conn, "emp_logs", "NAME").await)
    }

    fn fetch_adm_logs(&self) -> StoreResult<Vec<LogEntry>> {
        self.call(async |conn| fetch_logs(conn, "adm_logs", "USER").await)
    }

    fn clear_emp_logs(&self) -> StoreResult<()> {
        self.call(async |conn| clear_logs(conn, "emp_logs").await)
    }

    fn clear_adm_logs(&self) -> StoreResult<()> {
        self.call(async |conn| clear_logs(conn, "adm_logs").await)
    }

    // ── Employees ────────────────────────────────────────────────────────

    fn fetch_employees(&self) -> StoreResult<Vec<Employee>> {
        self.call(async |conn| {
            let rows = sqlx::query("SELECT * FROM emp_list ORDER BY Username COLLATE NOCASE")
                .fetch_all(conn)
                .await
                .map_err(map_sql)?;
            rows.iter().map(employee_from_row).collect()
        })
    }

    fn fetch_employee(&self, username: &str) -> StoreResult<Option<Employee>> {
        self.call(async |conn| {
            let row = sqlx::query("SELECT * FROM emp_list WHERE Username = ?1")
                .bind(username)
                .fetch_optional(conn)
                .await
                .map_err(map_sql)?;
            row.as_ref().map(employee_from_row).transpose()
        })
    }

    fn fetch_employee_ci(&self, username_lower: &str) -> StoreResult<Option<Employee>> {
        self.call(async |conn| {
            let row = sqlx::query("SELECT * FROM emp_list WHERE Username = ?1 COLLATE NOCASE")
                .bind(username_lower)
                .fetch_optional(conn)
                .await
                .map_err(map_sql)?;
            row.as_ref().map(employee_from_row).transpose()
        })
    }

    fn employee_2fa_and_access(
        &self,
        username_lower: &str,
    ) -> StoreResult<Option<(Option<String>, AccessLevel)>> {
        self.call(async |conn| {
            let row = sqlx::query(
                r#"SELECT "2FA Secret", "Access Level" FROM emp_list
                   WHERE Username = ?1 COLLATE NOCASE"#,
            )
            .bind(username_lower)
            .fetch_optional(conn)
            .await
            .map_err(map_sql)?;
            row.map(|row| {
                let level_text = get_text(&row, "Access Level")?;
                let level = AccessLevel::parse(&level_text).ok_or_else(|| {
                    StoreError::backend(format!("unknown Access Level '{level_text}'"))
                })?;
                Ok((get_opt_text(&row, "2FA Secret")?, level))
            })
            .transpose()
        })
    }

    fn insert_employee(&self, employee: &Employee) -> StoreResult<i64> {
        self.call(async |conn| {
            let result = sqlx::query(
                r#"INSERT INTO emp_list
                   (Username, "First Name", "Middle Name", "Last Name",
                    "Access Level", Password, "2FA Secret")
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            )
            .bind(&employee.username)
            .bind(&employee.first_name)
            .bind(&employee.middle_name)
            .bind(&employee.last_name)
            .bind(employee.access_level.as_str())
            .bind(&employee.password)
            .bind(&employee.totp_secret)
            .execute(conn)
            .await
            .map_err(map_sql)?;
            Ok(result.last_insert_rowid())
        })
    }

    fn update_employee(&self, username: &str, patch: &EmployeePatch) -> StoreResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.call(async |conn| {
            let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new("UPDATE emp_list SET ");
            {
                let mut sep = qb.separated(", ");
                if let Some(v) = &patch.username {
                    sep.push("Username = ").push_bind_unseparated(v.clone());
                }
                if let Some(v) = &patch.first_name {
                    sep.push(r#""First Name" = "#).push_bind_unseparated(v.clone());
                }
                if let Some(v) = &patch.middle_name {
                    sep.push(r#""Middle Name" = "#).push_bind_unseparated(v.clone());
                }
                if let Some(v) = &patch.last_name {
                    sep.push(r#""Last Name" = "#).push_bind_unseparated(v.clone());
                }
                if let Some(v) = patch.access_level {
                    sep.push(r#""Access Level" = "#)
                        .push_bind_unseparated(v.as_str());
                }
                if let Some(v) = &patch.password {
                    sep.push("Password = ").push_bind_unseparated(v.clone());
                }
                if let Some(v) = &patch.totp_secret {
                    sep.push(r#""2FA Secret" = "#).push_bind_unseparated(v.clone());
                }
            }
            qb.push(" WHERE Username = ").push_bind(username);
            qb.push(" COLLATE NOCASE");

            let result = qb.build().execute(conn).await.map_err(map_sql)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Missing);
            }
            Ok(())
        })
    }

    fn delete_employee(&self, username: &str) -> StoreResult<()> {
        self.call(async |conn| {
            let result = sqlx::query("DELETE FROM emp_list WHERE Username = ?1 COLLATE NOCASE")
                .bind(username)
                .execute(conn)
                .await
                .map_err(map_sql)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Missing);
            }
            Ok(())
        })
    }

    // ── Drafts ───────────────────────────────────────────────────────────

    fn insert_draft(&self, draft: &NewDraft) -> StoreResult<i64> {
        self.call(async |conn| {
            match insert_draft_row(conn, draft).await {
                Err(e) if is_missing_table(&e) => {
                    ensure_table(conn, &[CREATE_DRAFTS]).await?;
                    insert_draft_row(conn, draft).await
                }
                other => other,
            }
        })
    }

    fn fetch_drafts(&self) -> StoreResult<Vec<Draft>> {
        self.call(async |conn| {
            let rows = match sqlx::query("SELECT * FROM ANI_DRAFTS ORDER BY ID")
                .fetch_all(conn)
                .await
                .map_err(map_sql)
            {
                Err(e) if is_missing_table(&e) => return Ok(Vec::new()),
                other => other?,
            };
            rows.iter().map(draft_from_row).collect()
        })
    }

    fn delete_draft(&self, id: i64) -> StoreResult<()> {
        self.call(async |conn| {
            let result = sqlx::query("DELETE FROM ANI_DRAFTS WHERE ID = ?1")
                .bind(id)
                .execute(conn)
                .await
                .map_err(map_sql)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Missing);
            }
            Ok(())
        })
    }
}

async fn ensure_table(conn: &mut SqliteConnection, stmts: &[&str]) -> StoreResult<()> {
    for stmt in stmts {
        sqlx::query(stmt).execute(&mut *conn).await.map_err(map_sql)?;
    }
    Ok(())
}

async fn insert_log(
    conn: &mut SqliteConnection,
    table: &str,
    actor_col: &str,
    entry: &LogEntry,
) -> StoreResult<()> {
    let sql =
        format!("INSERT INTO {table} (DATE, TIME, {actor_col}, DETAILS) VALUES (?1, ?2, ?3, ?4)");
    sqlx::query(&sql)
        .bind(entry.date_str())
        .bind(entry.time_str())
        .bind(&entry.actor)
        .bind(&entry.details)
        .execute(conn)
        .await
        .map_err(map_sql)?;
    Ok(())
}

async fn fetch_logs(
    conn: &mut SqliteConnection,
    table: &str,
    actor_col: &str,
) -> StoreResult<Vec<LogEntry>> {
    let sql = format!("SELECT * FROM {table} ORDER BY DATE DESC, TIME DESC");
    let rows = match sqlx::query(&sql).fetch_all(conn).await.map_err(map_sql) {
        // A fresh artifact has no log tables yet; there is nothing to list.
        Err(e) if is_missing_table(&e) => return Ok(Vec::new()),
        other => other?,
    };
    rows.iter().map(|row| log_from_row(row, actor_col)).collect()
}

async fn clear_logs(conn: &mut SqliteConnection, table: &str) -> StoreResult<()> {
    let sql = format!("DELETE FROM {table}");
    match sqlx::query(&sql).execute(conn).await.map_err(map_sql) {
        Err(e) if is_missing_table(&e) => Ok(()),
        Err(e) => Err(e),
        Ok(_) => Ok(()),
    }
}

async fn insert_draft_row(conn: &mut SqliteConnection, draft: &NewDraft) -> StoreResult<i64> {
    let result = sqlx::query(
        r#"INSERT INTO ANI_DRAFTS
           (DATE, NAME, BRAND, TYPE, LOCATION, "UNIT OF MEASURE",
            "IN", "MIN STOCK", "PRICE PER UNIT", SUPPLIER)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
    )
    .bind(stored_date(draft.date))
    .bind(&draft.name)
    .bind(&draft.brand)
    .bind(&draft.item_type)
    .bind(&draft.location)
    .bind(&draft.unit_of_measure)
    .bind(draft.stock_in)
    .bind(draft.min_stock)
    .bind(draft.price_per_unit.to_string())
    .bind(&draft.supplier)
    .execute(conn)
    .await
    .map_err(map_sql)?;
    Ok(result.last_insert_rowid())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
