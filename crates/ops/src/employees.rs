//! Employee management and authentication.
//!
//! Credential material is encrypted on the way in and decrypted only inside
//! a verification call. Demotion to Level 1 clears password and 2FA in the
//! same storage write, and no operation may remove the last Level 3 account.

use jjcims_core::{
    AccessLevel, Employee, EmployeePatch, NewEmployee, OpsError, OpsResult, validate_username,
};

use jjcims_auth::Totp;
use jjcims_store::Store;

use crate::outcome::{OpResult, Outcome};
use crate::{Ops, store_err};

impl Ops {
    // ── Lookups ──────────────────────────────────────────────────────────

    pub fn list_employees(&self) -> OpsResult<Vec<Employee>> {
        self.store
            .fetch_employees()
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    pub fn get_employee(&self, username: &str) -> OpsResult<Option<Employee>> {
        self.store
            .fetch_employee_ci(&username.to_lowercase())
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    /// The login fast path: 2FA secret ciphertext and access level.
    pub fn get_employee_2fa_and_access(
        &self,
        username: &str,
    ) -> OpsResult<Option<(Option<String>, AccessLevel)>> {
        self.store
            .employee_2fa_and_access(&username.to_lowercase())
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    // ── Verification ─────────────────────────────────────────────────────

    /// True when the stored password decrypts to `password`. Unknown users
    /// and Level 1 accounts (no password on file) verify false.
    pub fn verify_password(&self, username: &str, password: &str) -> OpsResult<bool> {
        let Some(employee) = self.get_employee(username)? else {
            return Ok(false);
        };
        let Some(ciphertext) = &employee.password else {
            return Ok(false);
        };
        match self.cipher.decrypt(ciphertext) {
            Ok(stored) => Ok(stored == password),
            Err(err) => {
                tracing::warn!(username, error = %err, "stored password failed to decrypt");
                Ok(false)
            }
        }
    }

    /// True when `code` matches the user's TOTP secret in the current
    /// window (with the fixed skew tolerance). An absent secret is false.
    pub fn verify_totp(&self, username: &str, code: &str) -> OpsResult<bool> {
        let Some((secret_ct, _level)) = self.get_employee_2fa_and_access(username)? else {
            return Ok(false);
        };
        let Some(secret_ct) = secret_ct else {
            return Ok(false);
        };
        let secret = match self.cipher.decrypt(&secret_ct) {
            Ok(secret) => secret,
            Err(err) => {
                tracing::warn!(username, error = %err, "stored 2FA secret failed to decrypt");
                return Ok(false);
            }
        };
        match Totp::from_base32(&secret) {
            Ok(totp) => Ok(totp.verify_now(code)),
            Err(err) => {
                tracing::warn!(username, error = %err, "stored 2FA secret is not base32");
                Ok(false)
            }
        }
    }

    /// Full login check. Password must verify; if the account is enrolled
    /// in 2FA, a valid code is also required. Failures collapse into one
    /// generic `Auth` error.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        totp_code: Option<&str>,
    ) -> OpsResult<Employee> {
        if !self.verify_password(username, password)? {
            return Err(OpsError::Auth);
        }
        let employee = self.get_employee(username)?.ok_or(OpsError::Auth)?;
        if employee.totp_secret.is_some() {
            let code = totp_code.ok_or(OpsError::Auth)?;
            if !self.verify_totp(username, code)? {
                return Err(OpsError::Auth);
            }
        }
        Ok(employee)
    }

    // ── Credential writes ────────────────────────────────────────────────

    pub fn set_user_password(&self, username: &str, password: &str) -> OpResult<()> {
        let employee = self.require_employee(username)?;
        if !employee.access_level.holds_credentials() {
            return Err(OpsError::input("Level 1 accounts cannot hold a password"));
        }
        let ciphertext = self.encrypt_credential(password)?;
        let patch = EmployeePatch {
            password: Some(Some(ciphertext)),
            ..Default::default()
        };
        self.store
            .update_employee(&employee.username, &patch)
            .map_err(|e| store_err(e, &format!("employee '{username}'")))?;
        Ok(Outcome::clean(()))
    }

    pub fn set_user_2fa_secret(&self, username: &str, secret_b32: &str) -> OpResult<()> {
        let employee = self.require_employee(username)?;
        if !employee.access_level.holds_credentials() {
            return Err(OpsError::input("Level 1 accounts cannot enroll in 2FA"));
        }
        // Reject secrets a verifier could never match.
        Totp::from_base32(secret_b32)
            .map_err(|e| OpsError::input(format!("2FA secret: {e}")))?;
        let ciphertext = self.encrypt_credential(secret_b32)?;
        let patch = EmployeePatch {
            totp_secret: Some(Some(ciphertext)),
            ..Default::default()
        };
        self.store
            .update_employee(&employee.username, &patch)
            .map_err(|e| store_err(e, &format!("employee '{username}'")))?;
        Ok(Outcome::clean(()))
    }

    /// Change an access level. Demotion to Level 1 clears password and 2FA
    /// in the same write; promotion out of Level 1 requires a new password;
    /// the last Level 3 account can never be demoted.
    pub fn update_user_access_level(
        &self,
        username: &str,
        new_level: AccessLevel,
        new_password: Option<&str>,
        actor: &str,
    ) -> OpResult<()> {
        let employee = self.require_employee(username)?;
        let old_level = employee.access_level;
        if old_level == new_level {
            return Ok(Outcome::clean(()));
        }

        if old_level.is_admin() && !new_level.is_admin() {
            self.ensure_not_last_level3()?;
        }

        let patch = if !new_level.holds_credentials() {
            EmployeePatch::demotion()
        } else if !old_level.holds_credentials() {
            let password = new_password
                .ok_or_else(|| OpsError::input("promotion out of Level 1 requires a password"))?;
            EmployeePatch {
                access_level: Some(new_level),
                password: Some(Some(self.encrypt_credential(password)?)),
                ..Default::default()
            }
        } else {
            EmployeePatch {
                access_level: Some(new_level),
                ..Default::default()
            }
        };

        self.store
            .update_employee(&employee.username, &patch)
            .map_err(|e| store_err(e, &format!("employee '{username}'")))?;

        let mut warnings = Vec::new();
        self.audit_admin(
            actor,
            format!(
                "Changed {} access level from {} to {}",
                employee.username, old_level, new_level
            ),
            &mut warnings,
        );
        Ok(Outcome::with_warnings((), warnings))
    }

    // ── Roster management ────────────────────────────────────────────────

    pub fn add_employee(&self, new: NewEmployee, actor: &str) -> OpResult<Employee> {
        new.validate()?;
        if self.get_employee(&new.username)?.is_some() {
            return Err(OpsError::uniqueness(format!(
                "username '{}' is taken",
                new.username
            )));
        }

        let password = new
            .password
            .as_deref()
            .map(|p| self.encrypt_credential(p))
            .transpose()?;
        let totp_secret = new
            .totp_secret
            .as_deref()
            .map(|s| self.encrypt_credential(s))
            .transpose()?;

        let mut employee = Employee {
            id: 0,
            username: new.username,
            first_name: new.first_name,
            middle_name: new.middle_name,
            last_name: new.last_name,
            access_level: new.access_level,
            password,
            totp_secret,
        };
        let id = self
            .store
            .insert_employee(&employee)
            .map_err(|e| OpsError::backend(e.to_string()))?;
        employee.id = id;

        let mut warnings = Vec::new();
        self.audit_admin(
            actor,
            format!(
                "Added employee {} ({})",
                employee.username, employee.access_level
            ),
            &mut warnings,
        );
        Ok(Outcome::with_warnings(employee, warnings))
    }

    pub fn remove_employee(&self, username: &str, actor: &str) -> OpResult<()> {
        let employee = self.require_employee(username)?;
        if employee.access_level.is_admin() {
            self.ensure_not_last_level3()?;
        }
        self.store
            .delete_employee(&employee.username)
            .map_err(|e| store_err(e, &format!("employee '{username}'")))?;

        let mut warnings = Vec::new();
        self.audit_admin(
            actor,
            format!("Removed employee {}", employee.username),
            &mut warnings,
        );
        Ok(Outcome::with_warnings((), warnings))
    }

    /// General roster edit. Plaintext credentials in the patch are encrypted
    /// here; a demotion to Level 1 always clears both credentials.
    pub fn edit_employee(
        &self,
        username: &str,
        patch: EmployeePatch,
        actor: &str,
    ) -> OpResult<Employee> {
        if patch.is_empty() {
            return Err(OpsError::input("no fields provided"));
        }
        patch.validate()?;

        let employee = self.require_employee(username)?;

        if let Some(new_username) = &patch.username {
            validate_username(new_username)?;
            let collision = self.get_employee(new_username)?;
            if collision.is_some_and(|other| other.id != employee.id) {
                return Err(OpsError::uniqueness(format!(
                    "username '{new_username}' is taken"
                )));
            }
        }

        let old_level = employee.access_level;
        let new_level = patch.access_level.unwrap_or(old_level);
        if old_level.is_admin() && !new_level.is_admin() {
            self.ensure_not_last_level3()?;
        }
        if !old_level.holds_credentials()
            && new_level.holds_credentials()
            && !matches!(patch.password, Some(Some(_)))
        {
            return Err(OpsError::input("promotion out of Level 1 requires a password"));
        }

        let mut stored_patch = patch.clone();
        if !new_level.holds_credentials() {
            // Demotion clears credentials regardless of what the patch says.
            stored_patch.password = Some(None);
            stored_patch.totp_secret = Some(None);
        } else {
            if let Some(Some(password)) = &patch.password {
                stored_patch.password = Some(Some(self.encrypt_credential(password)?));
            }
            if let Some(Some(secret)) = &patch.totp_secret {
                Totp::from_base32(secret)
                    .map_err(|e| OpsError::input(format!("2FA secret: {e}")))?;
                stored_patch.totp_secret = Some(Some(self.encrypt_credential(secret)?));
            }
        }

        self.store
            .update_employee(&employee.username, &stored_patch)
            .map_err(|e| store_err(e, &format!("employee '{username}'")))?;

        let mut updated = employee;
        stored_patch.apply_to(&mut updated);

        let mut warnings = Vec::new();
        self.audit_admin(
            actor,
            format!(
                "Edited employee {} ({})",
                updated.username,
                patch.changed_fields().join(", ")
            ),
            &mut warnings,
        );
        Ok(Outcome::with_warnings(updated, warnings))
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn require_employee(&self, username: &str) -> OpsResult<Employee> {
        self.get_employee(username)?
            .ok_or_else(|| OpsError::not_found(format!("employee '{username}'")))
    }

    fn encrypt_credential(&self, plaintext: &str) -> OpsResult<String> {
        self.cipher
            .encrypt(plaintext)
            .map_err(|e| OpsError::backend(format!("credential encryption: {e}")))
    }

    fn ensure_not_last_level3(&self) -> OpsResult<()> {
        let admins = self
            .list_employees()?
            .iter()
            .filter(|e| e.access_level.is_admin())
            .count();
        if admins <= 1 {
            return Err(OpsError::input(
                "at least one Level 3 account must remain",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ops;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn new_employee(username: &str, level: AccessLevel, password: Option<&str>) -> NewEmployee {
        NewEmployee {
            username: username.to_string(),
            first_name: "Jane".to_string(),
            middle_name: String::new(),
            last_name: "Doe".to_string(),
            access_level: level,
            password: password.map(str::to_string),
            totp_secret: None,
        }
    }

    fn current_code() -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        Totp::from_base32(SECRET).unwrap().code_at(now)
    }

    #[test]
    fn passwords_are_stored_encrypted_and_verify() {
        let (_store, ops) = ops();
        let added = ops
            .add_employee(new_employee("jdoe", AccessLevel::Level2, Some("hunter2")), "boss")
            .unwrap();
        assert_ne!(added.value.password.as_deref(), Some("hunter2"));

        assert!(ops.verify_password("jdoe", "hunter2").unwrap());
        assert!(ops.verify_password("JDOE", "hunter2").unwrap());
        assert!(!ops.verify_password("jdoe", "wrong").unwrap());
        assert!(!ops.verify_password("ghost", "hunter2").unwrap());
    }

    #[test]
    fn totp_verifies_with_enrolled_secret() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level2, Some("pw")), "boss")
            .unwrap();
        ops.set_user_2fa_secret("jdoe", SECRET).unwrap();

        assert!(ops.verify_totp("jdoe", &current_code()).unwrap());

        // A code outside every tolerated window must be rejected.
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let totp = Totp::from_base32(SECRET).unwrap();
        let nearby: Vec<String> = [now - 60, now - 30, now, now + 30, now + 60]
            .iter()
            .map(|t| totp.code_at(*t))
            .collect();
        let wrong = (0..1_000_000)
            .map(|n| format!("{n:06}"))
            .find(|c| !nearby.contains(c))
            .unwrap();
        assert!(!ops.verify_totp("jdoe", &wrong).unwrap());
    }

    #[test]
    fn totp_without_secret_is_false() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level2, Some("pw")), "boss")
            .unwrap();
        assert!(!ops.verify_totp("jdoe", "123456").unwrap());
        assert!(!ops.verify_totp("ghost", "123456").unwrap());
    }

    #[test]
    fn login_requires_both_factors_when_enrolled() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level2, Some("pw")), "boss")
            .unwrap();
        ops.set_user_2fa_secret("jdoe", SECRET).unwrap();

        assert!(matches!(ops.login("jdoe", "bad", None), Err(OpsError::Auth)));
        assert!(matches!(ops.login("jdoe", "pw", None), Err(OpsError::Auth)));
        let employee = ops.login("jdoe", "pw", Some(&current_code())).unwrap();
        assert_eq!(employee.username, "jdoe");
    }

    #[test]
    fn demotion_clears_credentials_and_logs() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("boss2", AccessLevel::Level3, Some("pw1")), "boss")
            .unwrap();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level3, Some("pw2")), "boss")
            .unwrap();
        ops.set_user_2fa_secret("jdoe", SECRET).unwrap();

        ops.update_user_access_level("jdoe", AccessLevel::Level1, None, "boss")
            .unwrap();

        let demoted = ops.get_employee("jdoe").unwrap().unwrap();
        assert_eq!(demoted.access_level, AccessLevel::Level1);
        assert!(demoted.password.is_none());
        assert!(demoted.totp_secret.is_none());

        let adm = ops.fetch_admin_logs().unwrap();
        assert!(
            adm.iter()
                .any(|l| l.details == "Changed jdoe access level from Level 3 to Level 1")
        );

        // The other Level 3 account still stands.
        let admins = ops
            .list_employees()
            .unwrap()
            .iter()
            .filter(|e| e.access_level.is_admin())
            .count();
        assert_eq!(admins, 1);
    }

    #[test]
    fn last_level3_cannot_be_demoted_or_removed() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("boss2", AccessLevel::Level3, Some("pw")), "boss")
            .unwrap();

        assert!(matches!(
            ops.update_user_access_level("boss2", AccessLevel::Level1, None, "boss"),
            Err(OpsError::Input(_))
        ));
        assert!(matches!(
            ops.remove_employee("boss2", "boss"),
            Err(OpsError::Input(_))
        ));
        assert!(ops.get_employee("boss2").unwrap().is_some());
    }

    #[test]
    fn reserved_and_duplicate_usernames_are_rejected() {
        let (_store, ops) = ops();
        assert!(matches!(
            ops.add_employee(new_employee("admin", AccessLevel::Level1, None), "boss"),
            Err(OpsError::Input(_))
        ));

        ops.add_employee(new_employee("jdoe", AccessLevel::Level1, None), "boss")
            .unwrap();
        assert!(matches!(
            ops.add_employee(new_employee("JDoe", AccessLevel::Level1, None), "boss"),
            Err(OpsError::Uniqueness(_))
        ));
    }

    #[test]
    fn promotion_out_of_level1_requires_password() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level1, None), "boss")
            .unwrap();
        assert!(matches!(
            ops.update_user_access_level("jdoe", AccessLevel::Level2, None, "boss"),
            Err(OpsError::Input(_))
        ));

        ops.update_user_access_level("jdoe", AccessLevel::Level2, Some("pw"), "boss")
            .unwrap();
        assert!(ops.verify_password("jdoe", "pw").unwrap());
    }

    #[test]
    fn edit_employee_encrypts_patched_credentials() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level2, Some("old")), "boss")
            .unwrap();

        let patch = EmployeePatch {
            password: Some(Some("new-password".to_string())),
            last_name: Some("Smith".to_string()),
            ..Default::default()
        };
        let outcome = ops.edit_employee("jdoe", patch, "boss").unwrap();
        assert_eq!(outcome.value.last_name, "Smith");
        assert!(ops.verify_password("jdoe", "new-password").unwrap());
        assert!(!ops.verify_password("jdoe", "old").unwrap());

        let adm = ops.fetch_admin_logs().unwrap();
        assert!(adm[0].details.contains("Last Name"));
        assert!(adm[0].details.contains("Password"));
    }

    #[test]
    fn edit_demotion_clears_credentials_even_if_patch_sets_them() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("boss2", AccessLevel::Level3, Some("pw")), "boss")
            .unwrap();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level3, Some("pw")), "boss")
            .unwrap();

        let patch = EmployeePatch {
            access_level: Some(AccessLevel::Level1),
            password: Some(Some("sneaky".to_string())),
            ..Default::default()
        };
        let outcome = ops.edit_employee("jdoe", patch, "boss").unwrap();
        assert!(outcome.value.password.is_none());
        assert!(outcome.value.totp_secret.is_none());
    }

    #[test]
    fn edit_promotion_out_of_level1_requires_password() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level1, None), "boss")
            .unwrap();

        let bare = EmployeePatch {
            access_level: Some(AccessLevel::Level2),
            ..Default::default()
        };
        assert!(matches!(
            ops.edit_employee("jdoe", bare, "boss"),
            Err(OpsError::Input(_))
        ));

        let with_password = EmployeePatch {
            access_level: Some(AccessLevel::Level2),
            password: Some(Some("pw".to_string())),
            ..Default::default()
        };
        ops.edit_employee("jdoe", with_password, "boss").unwrap();
        assert!(ops.verify_password("jdoe", "pw").unwrap());
    }

    #[test]
    fn level1_accounts_cannot_take_credentials() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level1, None), "boss")
            .unwrap();
        assert!(matches!(
            ops.set_user_password("jdoe", "pw"),
            Err(OpsError::Input(_))
        ));
        assert!(matches!(
            ops.set_user_2fa_secret("jdoe", SECRET),
            Err(OpsError::Input(_))
        ));
    }

    #[test]
    fn two_fa_and_access_surfaces_ciphertext_not_plaintext() {
        let (_store, ops) = ops();
        ops.add_employee(new_employee("jdoe", AccessLevel::Level2, Some("pw")), "boss")
            .unwrap();
        ops.set_user_2fa_secret("jdoe", SECRET).unwrap();
        let (secret_ct, level) = ops
            .get_employee_2fa_and_access("JDOE")
            .unwrap()
            .unwrap();
        assert_eq!(level, AccessLevel::Level2);
        let ct = secret_ct.unwrap();
        assert_ne!(ct, SECRET);
    }
}
