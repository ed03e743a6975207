//! Durable project storage.
//!
//! The editing session treats this boundary as fallible: a failed write is
//! reported to the caller and the in-memory state stays as it is. Every call
//! is attributed to a caller identity, and a project that exists but belongs
//! to someone else is consistently reported as `AccessDenied` on get, update,
//! and delete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use common::{Project, ProjectSummary};
use tracing::warn;

use crate::error::ApiError;

pub trait ProjectRepo: Send + Sync {
    /// Summaries of the caller's projects, most recently updated first.
    fn list(&self, owner_id: &str) -> Result<Vec<ProjectSummary>, ApiError>;

    /// Full record including the file tree.
    fn get(&self, caller: &str, id: &str) -> Result<Project, ApiError>;

    fn create(&self, project: &Project) -> Result<(), ApiError>;

    /// Full-document replace. Writes the record fresh when no stored copy
    /// exists, so a save can retry a create whose durable write failed.
    fn update(&self, caller: &str, project: &Project) -> Result<(), ApiError>;

    fn delete(&self, caller: &str, id: &str) -> Result<(), ApiError>;
}

/// One JSON document per project under a data directory.
pub struct JsonDirRepo {
    root: PathBuf,
}

impl JsonDirRepo {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn read(&self, id: &str) -> Result<Option<Project>, ApiError> {
        match fs::read_to_string(self.path_for(id)) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, project: &Project) -> Result<(), ApiError> {
        let text = serde_json::to_string_pretty(project)?;
        fs::write(self.path_for(&project.id), text)?;
        Ok(())
    }

    fn owned_by(&self, caller: &str, id: &str) -> Result<Project, ApiError> {
        let project = self.read(id)?.ok_or(ApiError::NotFound)?;
        if project.owner_id != caller {
            return Err(ApiError::AccessDenied);
        }
        Ok(project)
    }
}

impl ProjectRepo for JsonDirRepo {
    fn list(&self, owner_id: &str) -> Result<Vec<ProjectSummary>, ApiError> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = fs::read_to_string(&path)?;
            let project: Project = match serde_json::from_str(&text) {
                Ok(project) => project,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable project record");
                    continue;
                }
            };
            if project.owner_id == owner_id {
                summaries.push(ProjectSummary::from(&project));
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    fn get(&self, caller: &str, id: &str) -> Result<Project, ApiError> {
        self.owned_by(caller, id)
    }

    fn create(&self, project: &Project) -> Result<(), ApiError> {
        self.write(project)
    }

    fn update(&self, caller: &str, project: &Project) -> Result<(), ApiError> {
        match self.read(&project.id)? {
            Some(stored) if stored.owner_id != caller => Err(ApiError::AccessDenied),
            None if project.owner_id != caller => Err(ApiError::AccessDenied),
            _ => self.write(project),
        }
    }

    fn delete(&self, caller: &str, id: &str) -> Result<(), ApiError> {
        self.owned_by(caller, id)?;
        fs::remove_file(self.path_for(id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::FileNode;
    use tempfile::TempDir;

    fn repo() -> (JsonDirRepo, TempDir) {
        let dir = TempDir::new().unwrap();
        let repo = JsonDirRepo::new(dir.path()).unwrap();
        (repo, dir)
    }

    fn project(name: &str, owner: &str) -> Project {
        Project::new(name, owner, vec![FileNode::file("main.js", None)])
    }

    #[test]
    fn create_then_get_roundtrip() {
        let (repo, _dir) = repo();
        let p = project("demo", "ada");
        repo.create(&p).unwrap();

        let got = repo.get("ada", &p.id).unwrap();
        assert_eq!(got, p);
    }

    #[test]
    fn get_missing_is_not_found() {
        let (repo, _dir) = repo();
        assert!(matches!(
            repo.get("ada", "missing"),
            Err(ApiError::NotFound)
        ));
    }

    #[test]
    fn foreign_projects_are_access_denied() {
        let (repo, _dir) = repo();
        let p = project("demo", "ada");
        repo.create(&p).unwrap();

        assert!(matches!(
            repo.get("grace", &p.id),
            Err(ApiError::AccessDenied)
        ));
        assert!(matches!(
            repo.update("grace", &p),
            Err(ApiError::AccessDenied)
        ));
        assert!(matches!(
            repo.delete("grace", &p.id),
            Err(ApiError::AccessDenied)
        ));
        // Still readable by the owner.
        assert!(repo.get("ada", &p.id).is_ok());
    }

    #[test]
    fn list_filters_by_owner_and_sorts_by_recency() {
        let (repo, _dir) = repo();
        let mut older = project("older", "ada");
        let mut newer = project("newer", "ada");
        older.updated_at = older.updated_at - chrono::Duration::hours(1);
        newer.updated_at = newer.updated_at + chrono::Duration::hours(1);
        let other = project("other", "grace");
        repo.create(&older).unwrap();
        repo.create(&newer).unwrap();
        repo.create(&other).unwrap();

        let names: Vec<_> = repo
            .list("ada")
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["newer", "older"]);
    }

    #[test]
    fn list_skips_unreadable_records() {
        let (repo, dir) = repo();
        repo.create(&project("demo", "ada")).unwrap();
        fs::write(dir.path().join("junk.json"), "not a project").unwrap();

        let summaries = repo.list("ada").unwrap();
        assert_eq!(summaries.len(), 1);
    }

    #[test]
    fn update_replaces_whole_document() {
        let (repo, _dir) = repo();
        let mut p = project("demo", "ada");
        repo.create(&p).unwrap();

        p.name = "renamed".to_string();
        p.files.push(FileNode::file("extra.js", None));
        repo.update("ada", &p).unwrap();

        let got = repo.get("ada", &p.id).unwrap();
        assert_eq!(got.name, "renamed");
        assert_eq!(got.files.len(), 2);
    }

    #[test]
    fn update_writes_missing_record() {
        let (repo, _dir) = repo();
        let p = project("demo", "ada");

        // No create ever succeeded; update still lands the document.
        repo.update("ada", &p).unwrap();
        assert_eq!(repo.get("ada", &p.id).unwrap(), p);
    }

    #[test]
    fn update_of_missing_record_checks_claimed_owner() {
        let (repo, _dir) = repo();
        let p = project("demo", "ada");
        assert!(matches!(
            repo.update("grace", &p),
            Err(ApiError::AccessDenied)
        ));
        assert!(matches!(repo.get("ada", &p.id), Err(ApiError::NotFound)));
    }

    #[test]
    fn delete_removes_record() {
        let (repo, _dir) = repo();
        let p = project("demo", "ada");
        repo.create(&p).unwrap();
        repo.delete("ada", &p.id).unwrap();
        assert!(matches!(repo.get("ada", &p.id), Err(ApiError::NotFound)));
        assert!(matches!(
            repo.delete("ada", &p.id),
            Err(ApiError::NotFound)
        ));
    }
}
