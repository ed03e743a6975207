//! Per-user editing session.
//!
//! Holds the in-memory project list, the active project, and the open file.
//! The in-memory state is the source of truth for a running session; durable
//! writes are an explicit follow-up performed by the handlers. Selection is
//! stored as ids and re-resolved against the current tree on every read, so
//! no mutation path has to refresh a cached snapshot.
//!
//! Mutating file operations require an active project: with none open they
//! return a validation error rather than silently doing nothing, so library
//! callers get told about a missing `load_project` instead of losing edits.

use chrono::Utc;
use common::tree::{self, NamePolicy};
use common::{FileKind, FileNode, Project, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};

use crate::error::ApiError;

pub struct Workspace {
    owner_id: String,
    projects: Vec<Project>,
    active_project: Option<String>,
    active_file: Option<String>,
    policy: NamePolicy,
}

impl Workspace {
    pub fn new(owner_id: impl Into<String>, projects: Vec<Project>, policy: NamePolicy) -> Self {
        Self {
            owner_id: owner_id.into(),
            projects,
            active_project: None,
            active_file: None,
            policy,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn active_project(&self) -> Option<&Project> {
        self.project(self.active_project.as_deref()?)
    }

    /// Re-resolves the open-file id against the current tree.
    pub fn active_file(&self) -> Option<&FileNode> {
        let project = self.active_project()?;
        tree::find(&project.files, self.active_file.as_deref()?)
    }

    fn active_project_mut(&mut self) -> Option<&mut Project> {
        let id = self.active_project.clone()?;
        self.projects.iter_mut().find(|p| p.id == id)
    }

    /// Creates a project with the seeded starter tree, makes it active, and
    /// opens its first file. The caller is responsible for the durable write.
    pub fn create_project(&mut self, name: &str) -> Result<Project, ApiError> {
        let name = name.trim();
        validate_name(name)?;
        let project = Project::new(name, self.owner_id.clone(), starter_files());
        self.active_project = Some(project.id.clone());
        self.active_file = tree::first_file(&project.files).map(|f| f.id.clone());
        self.projects.push(project.clone());
        Ok(project)
    }

    /// Makes the project with this id active and opens its first file.
    /// Returns `None` (leaving the session untouched) when the id is unknown.
    pub fn load_project(&mut self, id: &str) -> Option<&Project> {
        let project = self.projects.iter().find(|p| p.id == id)?;
        let first = tree::first_file(&project.files).map(|f| f.id.clone());
        self.active_project = Some(id.to_string());
        self.active_file = first;
        self.project(id)
    }

    pub fn ensure_active(&mut self, id: &str) -> Result<(), ApiError> {
        if self.active_project.as_deref() != Some(id) {
            self.load_project(id).ok_or(ApiError::NotFound)?;
        }
        Ok(())
    }

    /// Stamps `updated_at` on the active project and hands back the whole
    /// list for a full overwrite of durable storage. `None` when no project
    /// is active.
    pub fn prepare_save(&mut self) -> Option<Vec<Project>> {
        let id = self.active_project.clone()?;
        if let Some(project) = self.projects.iter_mut().find(|p| p.id == id) {
            project.updated_at = Utc::now();
        }
        Some(self.projects.clone())
    }

    pub fn create_file(
        &mut self,
        name: &str,
        kind: FileKind,
        parent_id: Option<&str>,
    ) -> Result<FileNode, ApiError> {
        let name = name.trim();
        validate_name(name)?;
        let policy = self.policy;
        let project = self.active_project_mut().ok_or_else(no_active_project)?;
        let node = match kind {
            FileKind::File => FileNode::file(name, parent_id.map(str::to_string)),
            FileKind::Folder => FileNode::folder(name, parent_id.map(str::to_string)),
        };
        tree::insert(&mut project.files, parent_id, node.clone(), policy)?;
        project.updated_at = Utc::now();
        Ok(node)
    }

    /// Removes the node and its subtree. The open-file selection is cleared
    /// whenever it no longer resolves, which covers both deleting the open
    /// file itself and deleting a folder above it.
    pub fn delete_file(&mut self, id: &str) -> Result<(), ApiError> {
        let project = self.active_project_mut().ok_or_else(no_active_project)?;
        tree::remove(&mut project.files, id);
        project.updated_at = Utc::now();

        let still_resolves = self
            .active_project()
            .zip(self.active_file.as_deref())
            .is_some_and(|(project, file_id)| tree::find(&project.files, file_id).is_some());
        if !still_resolves {
            self.active_file = None;
        }
        Ok(())
    }

    pub fn rename_file(&mut self, id: &str, new_name: &str) -> Result<(), ApiError> {
        let new_name = new_name.trim();
        validate_name(new_name)?;
        let policy = self.policy;
        let project = self.active_project_mut().ok_or_else(no_active_project)?;
        tree::rename(&mut project.files, id, new_name, policy)?;
        project.updated_at = Utc::now();
        Ok(())
    }

    /// Content edits are non-blocking: an unknown id or a folder target is
    /// silently ignored, matching [`tree::update_content`].
    pub fn update_file_content(&mut self, id: &str, content: &str) -> Result<(), ApiError> {
        let project = self.active_project_mut().ok_or_else(no_active_project)?;
        tree::update_content(&mut project.files, id, content);
        project.updated_at = Utc::now();
        Ok(())
    }

    /// Pure selection change; never mutates the tree.
    pub fn set_active_file(&mut self, id: Option<&str>) -> Result<(), ApiError> {
        match id {
            None => {
                self.active_file = None;
                Ok(())
            }
            Some(id) => {
                let project = self.active_project().ok_or_else(no_active_project)?;
                if tree::find(&project.files, id).is_none() {
                    return Err(ApiError::NotFound);
                }
                self.active_file = Some(id.to_string());
                Ok(())
            }
        }
    }

    /// Replaces (or adds) a project record, e.g. after an external
    /// full-document update came back from durable storage.
    pub fn replace_project(&mut self, project: Project) {
        match self.projects.iter_mut().find(|p| p.id == project.id) {
            Some(slot) => *slot = project,
            None => self.projects.push(project),
        }
    }

    pub fn delete_project(&mut self, id: &str) {
        self.projects.retain(|p| p.id != id);
        if self.active_project.as_deref() == Some(id) {
            self.active_project = None;
            self.active_file = None;
        }
    }
}

fn no_active_project() -> ApiError {
    ApiError::Validation("no active project".to_string())
}

pub fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ApiError::Validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

const APP_JS: &str = r#"import React from 'react';

function App() {
  return (
    <div className="App">
      <h1>Hello from your new project!</h1>
      <p>Start editing to see your changes in the preview.</p>
    </div>
  );
}

export default App;
"#;

const INDEX_JS: &str = r#"import React from 'react';
import ReactDOM from 'react-dom/client';
import App from './App';

const root = ReactDOM.createRoot(document.getElementById('root'));
root.render(<App />);
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>React App</title>
</head>
<body>
    <div id="root"></div>
</body>
</html>
"#;

const PACKAGE_JSON: &str = r#"{
  "name": "my-react-app",
  "version": "0.1.0",
  "private": true,
  "dependencies": {
    "react": "^18.0.0",
    "react-dom": "^18.0.0"
  }
}
"#;

/// The tree every fresh project starts from: a `src` folder with two starter
/// files, a `public` folder with the index document, and the root manifest.
fn starter_files() -> Vec<FileNode> {
    let mut src = FileNode::folder("src", None);
    let src_children = src.children.as_mut().expect("folder has children");
    src_children.push(FileNode::file_with_content(
        "App.js",
        Some(src.id.clone()),
        APP_JS,
    ));
    src_children.push(FileNode::file_with_content(
        "index.js",
        Some(src.id.clone()),
        INDEX_JS,
    ));

    let mut public = FileNode::folder("public", None);
    public
        .children
        .as_mut()
        .expect("folder has children")
        .push(FileNode::file_with_content(
            "index.html",
            Some(public.id.clone()),
            INDEX_HTML,
        ));

    vec![
        src,
        public,
        FileNode::file_with_content("package.json", None, PACKAGE_JSON),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::new("ada", Vec::new(), NamePolicy::AllowDuplicates)
    }

    fn node_id(ws: &Workspace, name: &str) -> String {
        fn walk(nodes: &[FileNode], name: &str) -> Option<String> {
            for node in nodes {
                if node.name == name {
                    return Some(node.id.clone());
                }
                if let Some(children) = &node.children {
                    if let Some(found) = walk(children, name) {
                        return Some(found);
                    }
                }
            }
            None
        }
        walk(&ws.active_project().expect("active project").files, name).expect("node present")
    }

    #[test]
    fn create_project_seeds_starter_tree() {
        let mut ws = workspace();
        let project = ws.create_project("Demo").unwrap();

        let names: Vec<_> = project.files.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["src", "public", "package.json"]);
        assert!(project.files[0].is_folder());
        assert!(project.files[1].is_folder());

        let src = project.files[0].children.as_ref().unwrap();
        assert_eq!(src[0].name, "App.js");
        assert_eq!(src[1].name, "index.js");
        assert!(!src[0].content.as_ref().unwrap().is_empty());
        assert!(!src[1].content.as_ref().unwrap().is_empty());
    }

    #[test]
    fn create_project_activates_and_opens_first_file() {
        let mut ws = workspace();
        let project = ws.create_project("Demo").unwrap();

        assert_eq!(ws.active_project().unwrap().id, project.id);
        assert_eq!(ws.active_file().unwrap().name, "App.js");
    }

    #[test]
    fn create_project_rejects_blank_names() {
        let mut ws = workspace();
        assert!(matches!(
            ws.create_project("   "),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            ws.create_project(&"x".repeat(MAX_NAME_LEN + 1)),
            Err(ApiError::Validation(_))
        ));
        assert!(ws.projects().is_empty());
    }

    #[test]
    fn load_project_switches_selection() {
        let mut ws = workspace();
        let first = ws.create_project("First").unwrap();
        ws.create_project("Second").unwrap();

        ws.load_project(&first.id).unwrap();
        assert_eq!(ws.active_project().unwrap().id, first.id);
        assert_eq!(ws.active_file().unwrap().name, "App.js");

        // Unknown id leaves the session untouched.
        assert!(ws.load_project("missing").is_none());
        assert_eq!(ws.active_project().unwrap().id, first.id);
    }

    #[test]
    fn created_file_shows_up_in_flattened_tree() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let src = node_id(&ws, "src");
        ws.create_file("util.js", FileKind::File, Some(&src)).unwrap();

        let flat = tree::flatten(&ws.active_project().unwrap().files);
        assert_eq!(flat.get("src/util.js").map(String::as_str), Some(""));
    }

    #[test]
    fn create_file_under_file_parent_fails_and_leaves_tree_unchanged() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let app = node_id(&ws, "App.js");
        let before = ws.active_project().unwrap().files.clone();

        let err = ws
            .create_file("bad.js", FileKind::File, Some(&app))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(ws.active_project().unwrap().files, before);
    }

    #[test]
    fn rename_folder_moves_flattened_prefix() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let src = node_id(&ws, "src");
        ws.rename_file(&src, "source").unwrap();

        let flat = tree::flatten(&ws.active_project().unwrap().files);
        assert!(flat.keys().all(|p| !p.starts_with("src/")));
        assert!(flat.contains_key("source/App.js"));
        assert!(flat.contains_key("source/index.js"));
    }

    #[test]
    fn delete_folder_removes_all_descendant_paths() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let public = node_id(&ws, "public");
        ws.delete_file(&public).unwrap();

        let flat = tree::flatten(&ws.active_project().unwrap().files);
        assert!(flat.keys().all(|p| !p.starts_with("public/")));
        assert!(flat.contains_key("src/App.js"));
    }

    #[test]
    fn deleting_open_file_clears_selection() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let app = node_id(&ws, "App.js");
        assert_eq!(ws.active_file().unwrap().id, app);

        ws.delete_file(&app).unwrap();
        assert!(ws.active_file().is_none());
    }

    #[test]
    fn deleting_folder_above_open_file_clears_selection() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let src = node_id(&ws, "src");
        assert_eq!(ws.active_file().unwrap().name, "App.js");

        ws.delete_file(&src).unwrap();
        assert!(ws.active_file().is_none());
    }

    #[test]
    fn deleting_unrelated_file_keeps_selection() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let index_html = node_id(&ws, "index.html");

        ws.delete_file(&index_html).unwrap();
        assert_eq!(ws.active_file().unwrap().name, "App.js");
    }

    #[test]
    fn content_edit_is_visible_through_active_file_accessor() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let app = node_id(&ws, "App.js");

        ws.update_file_content(&app, "// rewritten").unwrap();
        assert_eq!(
            ws.active_file().unwrap().content.as_deref(),
            Some("// rewritten")
        );
    }

    #[test]
    fn content_edit_on_folder_is_ignored() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let src = node_id(&ws, "src");
        ws.update_file_content(&src, "nope").unwrap();
        assert!(ws.active_project().unwrap().files[0].content.is_none());
    }

    #[test]
    fn file_operations_require_an_active_project() {
        let mut ws = workspace();
        assert!(matches!(
            ws.create_file("a.js", FileKind::File, None),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            ws.delete_file("some-id"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            ws.rename_file("some-id", "b.js"),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn set_active_file_checks_membership() {
        let mut ws = workspace();
        ws.create_project("Demo").unwrap();
        let index_js = node_id(&ws, "index.js");

        ws.set_active_file(Some(&index_js)).unwrap();
        assert_eq!(ws.active_file().unwrap().name, "index.js");

        assert!(matches!(
            ws.set_active_file(Some("missing")),
            Err(ApiError::NotFound)
        ));
        ws.set_active_file(None).unwrap();
        assert!(ws.active_file().is_none());
    }

    #[test]
    fn prepare_save_stamps_active_project() {
        let mut ws = workspace();
        assert!(ws.prepare_save().is_none());

        let project = ws.create_project("Demo").unwrap();
        let before = project.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));

        let saved = ws.prepare_save().unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].updated_at > before);
    }

    #[test]
    fn delete_project_clears_selection_when_active() {
        let mut ws = workspace();
        let project = ws.create_project("Demo").unwrap();
        ws.delete_project(&project.id);
        assert!(ws.projects().is_empty());
        assert!(ws.active_project().is_none());
        assert!(ws.active_file().is_none());
    }

    #[test]
    fn duplicate_names_rejected_under_strict_policy() {
        let mut ws = Workspace::new("ada", Vec::new(), NamePolicy::RejectDuplicates);
        ws.create_project("Demo").unwrap();
        let src = node_id(&ws, "src");

        let err = ws
            .create_file("App.js", FileKind::File, Some(&src))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
