use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth;
pub mod tree;

/// Upper bound on project and file names, matching the stored schema.
pub const MAX_NAME_LEN: usize = 100;
/// Upper bound on the free-form project description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

/// One entry in a project's file tree. Files carry `content` and never
/// `children`; folders carry `children` (possibly empty) and never `content`.
/// Both invariants hold by construction: nodes are only created through
/// [`FileNode::file`] and [`FileNode::folder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: String,
    pub name: String,
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    pub fn file(name: impl Into<String>, parent_id: Option<String>) -> Self {
        Self::file_with_content(name, parent_id, "")
    }

    pub fn file_with_content(
        name: impl Into<String>,
        parent_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind: FileKind::File,
            content: Some(content.into()),
            parent_id,
            children: None,
        }
    }

    pub fn folder(name: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind: FileKind::Folder,
            content: None,
            parent_id,
            children: Some(Vec::new()),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: String,
    pub files: Vec<FileNode>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>, files: Vec<FileNode>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            owner_id: owner_id.into(),
            files,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// List-view projection of a [`Project`]: everything except the file tree,
/// which can be large and is not needed to render a project picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: String,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            description: project.description.clone(),
            owner_id: project.owner_id.clone(),
            is_public: project.is_public,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}
