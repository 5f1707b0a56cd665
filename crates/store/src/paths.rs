//! Canonical database artifact resolution.

use std::path::{Path, PathBuf};

use crate::config::ENV_DB_PATH;

/// The artifact keeps its historical name across deployments.
pub const DB_FILE_NAME: &str = "JJCIMS.accdb";

/// Locate the database artifact. Priority, highest first: explicit argument,
/// `JJCIMS_DB` override, `database/` beside the app, `../database/`, and the
/// legacy `utils/database/` layout. When nothing exists the first candidate
/// is returned anyway so the caller surfaces the missing-file error on open.
pub fn resolve_database_path(explicit: Option<&Path>) -> PathBuf {
    let env_override = std::env::var(ENV_DB_PATH)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(explicit, env_override, &base)
}

fn resolve_from(explicit: Option<&Path>, env_override: Option<PathBuf>, base: &Path) -> PathBuf {
    let mut candidates: Vec<PathBuf> = Vec::with_capacity(5);
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    if let Some(path) = env_override {
        candidates.push(path);
    }
    candidates.push(base.join("database").join(DB_FILE_NAME));
    candidates.push(base.join("..").join("database").join(DB_FILE_NAME));
    candidates.push(base.join("utils").join("database").join(DB_FILE_NAME));

    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .unwrap_or_else(|| candidates[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_path_wins_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join(DB_FILE_NAME);
        fs::write(&explicit, b"x").unwrap();
        let resolved = resolve_from(Some(&explicit), None, dir.path());
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn env_override_beats_conventional_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("elsewhere.accdb");
        fs::write(&env_path, b"x").unwrap();
        fs::create_dir_all(dir.path().join("database")).unwrap();
        fs::write(dir.path().join("database").join(DB_FILE_NAME), b"x").unwrap();

        let resolved = resolve_from(None, Some(env_path.clone()), dir.path());
        assert_eq!(resolved, env_path);
    }

    #[test]
    fn app_dir_layout_beats_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["database", "utils/database"] {
            let d = dir.path().join(sub);
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join(DB_FILE_NAME), b"x").unwrap();
        }
        let resolved = resolve_from(None, None, dir.path());
        assert_eq!(resolved, dir.path().join("database").join(DB_FILE_NAME));
    }

    #[test]
    fn legacy_layout_found_when_others_missing() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("utils").join("database");
        fs::create_dir_all(&legacy).unwrap();
        fs::write(legacy.join(DB_FILE_NAME), b"x").unwrap();
        let resolved = resolve_from(None, None, dir.path());
        assert_eq!(resolved, legacy.join(DB_FILE_NAME));
    }

    #[test]
    fn missing_everywhere_returns_first_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("nope.accdb");
        let resolved = resolve_from(Some(&explicit), None, dir.path());
        assert_eq!(resolved, explicit);

        let resolved = resolve_from(None, None, dir.path());
        assert_eq!(resolved, dir.path().join("database").join(DB_FILE_NAME));
    }
}
