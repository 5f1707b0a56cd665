//! Employee model, access levels, and username rules.

use serde::{Deserialize, Serialize};

use crate::error::OpsError;

/// Usernames that can never be created or renamed to.
pub const RESERVED_USERNAMES: &[&str] = &["admin", "root", "system"];

// ─────────────────────────────────────────────────────────────────────────────
// Access Level
// ─────────────────────────────────────────────────────────────────────────────

/// Employee access tier. Level 3 is the administrator tier; at least one
/// Level 3 account must exist at all times.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    #[serde(rename = "Level 1")]
    Level1,
    #[serde(rename = "Level 2")]
    Level2,
    #[serde(rename = "Level 3")]
    Level3,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Level1 => "Level 1",
            AccessLevel::Level2 => "Level 2",
            AccessLevel::Level3 => "Level 3",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Level 1" => Some(AccessLevel::Level1),
            "Level 2" => Some(AccessLevel::Level2),
            "Level 3" => Some(AccessLevel::Level3),
            _ => None,
        }
    }

    /// Levels 2 and 3 hold credentials (password, optional 2FA).
    pub fn holds_credentials(&self) -> bool {
        !matches!(self, AccessLevel::Level1)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccessLevel::Level3)
    }
}

impl core::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Employee
// ─────────────────────────────────────────────────────────────────────────────

/// A row of `emp_list`. Password and 2FA secret are ciphertext; Level 1
/// accounts hold neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "First Name")]
    pub first_name: String,
    #[serde(rename = "Middle Name")]
    pub middle_name: String,
    #[serde(rename = "Last Name")]
    pub last_name: String,
    #[serde(rename = "Access Level")]
    pub access_level: AccessLevel,
    #[serde(rename = "Password")]
    pub password: Option<String>,
    #[serde(rename = "2FA Secret")]
    pub totp_secret: Option<String>,
}

/// Payload for creating an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub username: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub access_level: AccessLevel,
    /// Required for Level 2/3, forbidden for Level 1. Encrypted before it
    /// reaches storage.
    pub password: Option<String>,
    /// Base32 TOTP secret; encrypted before it reaches storage.
    pub totp_secret: Option<String>,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<(), OpsError> {
        validate_username(&self.username)?;
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(OpsError::input("first and last name are required"));
        }
        if self.access_level.holds_credentials() {
            if self.password.is_none() {
                return Err(OpsError::input(format!(
                    "{} accounts require a password",
                    self.access_level
                )));
            }
        } else if self.password.is_some() || self.totp_secret.is_some() {
            return Err(OpsError::input("Level 1 accounts cannot hold credentials"));
        }
        Ok(())
    }
}

/// Partial update of an employee row; only `Some` fields are written.
///
/// `password` and `totp_secret` use a double `Option` so callers can clear a
/// credential (`Some(None)`) as well as set one (`Some(Some(ct))`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeePatch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub access_level: Option<AccessLevel>,
    pub password: Option<Option<String>>,
    pub totp_secret: Option<Option<String>>,
}

impl EmployeePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Demotion patch: drop to Level 1 and clear both credentials in the
    /// same storage write.
    pub fn demotion() -> Self {
        Self {
            access_level: Some(AccessLevel::Level1),
            password: Some(None),
            totp_secret: Some(None),
            ..Default::default()
        }
    }

    /// Field names carried by this patch, for the admin log change list.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.username.is_some() {
            fields.push("Username");
        }
        if self.first_name.is_some() {
            fields.push("First Name");
        }
        if self.middle_name.is_some() {
            fields.push("Middle Name");
        }
        if self.last_name.is_some() {
            fields.push("Last Name");
        }
        if self.access_level.is_some() {
            fields.push("Access Level");
        }
        if self.password.is_some() {
            fields.push("Password");
        }
        if self.totp_secret.is_some() {
            fields.push("2FA Secret");
        }
        fields
    }

    pub fn validate(&self) -> Result<(), OpsError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        for (field, value) in [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
        ] {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(OpsError::input(format!("{field} cannot be blank")));
                }
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, employee: &mut Employee) {
        if let Some(v) = &self.username {
            employee.username = v.clone();
        }
        if let Some(v) = &self.first_name {
            employee.first_name = v.clone();
        }
        if let Some(v) = &self.middle_name {
            employee.middle_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            employee.last_name = v.clone();
        }
        if let Some(v) = self.access_level {
            employee.access_level = v;
        }
        if let Some(v) = &self.password {
            employee.password = v.clone();
        }
        if let Some(v) = &self.totp_secret {
            employee.totp_secret = v.clone();
        }
    }
}

/// Reject blank and reserved usernames. Lookups elsewhere are
/// case-insensitive, so the reserved check is too.
pub fn validate_username(username: &str) -> Result<(), OpsError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(OpsError::input("username is required"));
    }
    let lower = trimmed.to_lowercase();
    if RESERVED_USERNAMES.contains(&lower.as_str()) {
        return Err(OpsError::input(format!("username '{trimmed}' is reserved")));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
