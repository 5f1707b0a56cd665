//! Remote HTTP API backend.
//!
//! Translates the recognized operations onto the fixed endpoint surface of
//! the JJCIMS API. Reads retry on transport failures and error statuses;
//! writes retry only on transport failures raised before a response, so a
//! confirmed write is never replayed. 404 maps to `None`/empty rather than
//! an error. Operations without an endpoint fail fast with `NotSupported`.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use jjcims_core::{
    AccessLevel, DashboardRow, Draft, Employee, EmployeePatch, Item, ItemPatch, ItemSummary,
    LogEntry, NewDraft, StockStatus,
};

use crate::error::{StoreError, StoreResult};
use crate::retry::RetryPolicy;
use crate::store::Store;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const BACKEND: &str = "remote-api";

/// Connector over the JJCIMS HTTP API.
#[derive(Debug)]
pub struct RemoteStore {
    base: reqwest::Url,
    client: Client,
    retry: RetryPolicy,
}

impl RemoteStore {
    pub fn new(api_url: &str, retry: RetryPolicy) -> StoreResult<Self> {
        let base = reqwest::Url::parse(api_url)
            .map_err(|e| StoreError::backend(format!("invalid api url '{api_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::backend(format!(
                "api url '{api_url}' cannot hold a path"
            )));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::backend(format!("http client: {e}")))?;
        Ok(Self {
            base,
            client,
            retry,
        })
    }

    /// Build `base/seg/seg/…`, percent-encoding each segment; a trailing
    /// slash marks collection endpoints.
    fn endpoint(&self, segments: &[&str], trailing_slash: bool) -> StoreResult<reqwest::Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::backend("api url cannot hold a path"))?;
            for segment in segments {
                path.push(segment);
            }
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: reqwest::Url,
        op: &'static str,
    ) -> StoreResult<Option<T>> {
        self.retry.run(StoreError::is_retryable_read, || {
            let resp = self
                .client
                .get(url.clone())
                .send()
                .map_err(|e| StoreError::Transport(format!("{op}: {e}")))?;
            let status = resp.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(StoreError::Http {
                    status: status.as_u16(),
                    body: resp.text().unwrap_or_default(),
                });
            }
            resp.json::<T>()
                .map(Some)
                .map_err(|e| StoreError::backend(format!("{op}: invalid response body: {e}")))
        })
    }

    fn send_write(
        &self,
        method: Method,
        url: reqwest::Url,
        body: Option<serde_json::Value>,
        op: &'static str,
    ) -> StoreResult<()> {
        // Only transport errors are retried here: once the server answered,
        // replaying a non-idempotent write risks duplicates.
        self.retry.run(StoreError::is_transport, || {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(body) = &body {
                request = request.json(body);
            }
            let resp = request
                .send()
                .map_err(|e| StoreError::Transport(format!("{op}: {e}")))?;
            let status = resp.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(StoreError::Missing);
            }
            if !status.is_success() {
                return Err(StoreError::Http {
                    status: status.as_u16(),
                    body: resp.text().unwrap_or_default(),
                });
            }
            Ok(())
        })
    }

    fn unsupported(&self, op: &'static str) -> StoreError {
        StoreError::NotSupported {
            backend: BACKEND,
            op,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UnitOfMeasureBody {
    unit_of_measure: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwoFaAndAccessBody {
    #[serde(rename = "2fa_secret")]
    totp_secret: Option<String>,
    access_level: AccessLevel,
}

#[derive(Debug, Deserialize)]
struct EmpLogRow {
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "TIME")]
    time: String,
    #[serde(rename = "NAME")]
    actor: String,
    #[serde(rename = "DETAILS")]
    details: String,
}

#[derive(Debug, Deserialize)]
struct AdmLogRow {
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "TIME")]
    time: String,
    #[serde(rename = "USER")]
    actor: String,
    #[serde(rename = "DETAILS")]
    details: String,
}

fn parse_log(date: &str, time: &str, actor: String, details: String) -> StoreResult<LogEntry> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| StoreError::backend(format!("bad DATE '{date}': {e}")))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .map_err(|e| StoreError::backend(format!("bad TIME '{time}': {e}")))?;
    Ok(LogEntry {
        date,
        time,
        actor,
        details,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Store for RemoteStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn fetch_items(&self) -> StoreResult<Vec<Item>> {
        let url = self.endpoint(&["items"], true)?;
        Ok(self
            .get_json::<Vec<Item>>(url, "fetch items")?
            .unwrap_or_default())
    }

    fn fetch_dashboard(&self) -> StoreResult<Vec<DashboardRow>> {
        let url = self.endpoint(&["items", "employee-dashboard"], false)?;
        Ok(self
            .get_json::<Vec<DashboardRow>>(url, "fetch dashboard")?
            .unwrap_or_default())
    }

    fn fetch_items_by_type(&self, category: &str) -> StoreResult<Vec<ItemSummary>> {
        let url = self.endpoint(&["items", "by-type", category], false)?;
        Ok(self
            .get_json::<Vec<ItemSummary>>(url, "fetch items by type")?
            .unwrap_or_default())
    }

    fn fetch_item_by_name(&self, name: &str) -> StoreResult<Option<Item>> {
        let mut url = self.endpoint(&["items"], true)?;
        url.query_pairs_mut().append_pair("name", name);
        let items = self
            .get_json::<Vec<Item>>(url, "fetch item by name")?
            .unwrap_or_default();
        Ok(items.into_iter().next())
    }

    fn fetch_item_by_id(&self, _id: i64) -> StoreResult<Option<Item>> {
        Err(self.unsupported("fetch item by id"))
    }

    fn unit_of_measure(&self, name: &str) -> StoreResult<Option<String>> {
        let url = self.endpoint(&["items", name, "unit-of-measure"], false)?;
        Ok(self
            .get_json::<UnitOfMeasureBody>(url, "fetch unit of measure")?
            .and_then(|body| body.unit_of_measure))
    }

    fn insert_item(&self, _item: &Item) -> StoreResult<i64> {
        Err(self.unsupported("insert item"))
    }

    fn update_item(&self, _id: i64, _patch: &ItemPatch) -> StoreResult<()> {
        Err(self.unsupported("update item"))
    }

    fn delete_item_by_name(&self, name: &str) -> StoreResult<()> {
        // The API deletes by id; resolve the name first.
        let item = self.fetch_item_by_name(name)?.ok_or(StoreError::Missing)?;
        self.delete_item_by_id(item.id)
    }

    fn delete_item_by_id(&self, id: i64) -> StoreResult<()> {
        let url = self.endpoint(&["items", &id.to_string()], false)?;
        self.send_write(Method::DELETE, url, None, "delete item")
    }

    fn increment_out(&self, name: &str, qty: i64) -> StoreResult<()> {
        let url = self.endpoint(&["items", name, "out", &qty.to_string()], false)?;
        self.send_write(Method::PUT, url, None, "increment out")
    }

    fn write_derived(
        &self,
        _name: &str,
        _status: StockStatus,
        _deficit: i64,
        _cost: Decimal,
    ) -> StoreResult<()> {
        // The API server owns status derivation for its database.
        Ok(())
    }

    // ── Logs ─────────────────────────────────────────────────────────────

    fn insert_emp_log(&self, entry: &LogEntry) -> StoreResult<()> {
        let url = self.endpoint(&["employee-logs"], true)?;
        let body = serde_json::json!({
            "DATE": entry.date_str(),
            "TIME": entry.time_str(),
            "NAME": entry.actor,
            "DETAILS": entry.details,
        });
        self.send_write(Method::POST, url, Some(body), "insert employee log")
    }

    fn insert_adm_log(&self, entry: &LogEntry) -> StoreResult<()> {
        let url = self.endpoint(&["admin-logs"], true)?;
        let body = serde_json::json!({
            "DATE": entry.date_str(),
            "TIME": entry.time_str(),
            "USER": entry.actor,
            "DETAILS": entry.details,
        });
        self.send_write(Method::POST, url, Some(body), "insert admin log")
    }

    fn fetch_emp_logs(&self) -> StoreResult<Vec<LogEntry>> {
        let url = self.endpoint(&["employee-logs"], true)?;
        let rows = self
            .get_json::<Vec<EmpLogRow>>(url, "fetch employee logs")?
            .unwrap_or_default();
        rows.into_iter()
            .map(|r| parse_log(&r.date, &r.time, r.actor, r.details))
            .collect()
    }

    fn fetch_adm_logs(&self) -> StoreResult<Vec<LogEntry>> {
        let url = self.endpoint(&["admin-logs"], true)?;
        let rows = self
            .get_json::<Vec<AdmLogRow>>(url, "fetch admin logs")?
            .unwrap_or_default();
        rows.into_iter()
            .map(|r| parse_log(&r.date, &r.time, r.actor, r.details))
            .collect()
    }

    fn clear_emp_logs(&self) -> StoreResult<()> {
        let url = self.endpoint(&["employee-logs"], true)?;
        self.send_write(Method::DELETE, url, None, "clear employee logs")
    }

    fn clear_adm_logs(&self) -> StoreResult<()> {
        let url = self.endpoint(&["admin-logs"], true)?;
        self.send_write(Method::DELETE, url, None, "clear admin logs")
    }

    // ── Employees ────────────────────────────────────────────────────────

    fn fetch_employees(&self) -> StoreResult<Vec<Employee>> {
        let url = self.endpoint(&["employees"], true)?;
        Ok(self
            .get_json::<Vec<Employee>>(url, "fetch employees")?
            .unwrap_or_default())
    }

    fn fetch_employee(&self, username: &str) -> StoreResult<Option<Employee>> {
        let url = self.endpoint(&["employees", username], false)?;
        self.get_json::<Employee>(url, "fetch employee")
    }

    fn fetch_employee_ci(&self, username_lower: &str) -> StoreResult<Option<Employee>> {
        // The API resolves the lowercased form itself.
        let url = self.endpoint(&["employees", username_lower], false)?;
        self.get_json::<Employee>(url, "fetch employee")
    }

    fn employee_2fa_and_access(
        &self,
        username_lower: &str,
    ) -> StoreResult<Option<(Option<String>, AccessLevel)>> {
        let url = self.endpoint(&["employees", username_lower, "2fa-and-access"], false)?;
        Ok(self
            .get_json::<TwoFaAndAccessBody>(url, "fetch 2fa and access")?
            .map(|body| (body.totp_secret, body.access_level)))
    }

    fn insert_employee(&self, _employee: &Employee) -> StoreResult<i64> {
        Err(self.unsupported("insert employee"))
    }

    fn update_employee(&self, _username: &str, _patch: &EmployeePatch) -> StoreResult<()> {
        Err(self.unsupported("update employee"))
    }

    fn delete_employee(&self, _username: &str) -> StoreResult<()> {
        Err(self.unsupported("delete employee"))
    }

    // ── Drafts ───────────────────────────────────────────────────────────

    fn insert_draft(&self, _draft: &NewDraft) -> StoreResult<i64> {
        Err(self.unsupported("insert draft"))
    }

    fn fetch_drafts(&self) -> StoreResult<Vec<Draft>> {
        Err(self.unsupported("fetch drafts"))
    }

    fn delete_draft(&self, _id: i64) -> StoreResult<()> {
        Err(self.unsupported("delete draft"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
