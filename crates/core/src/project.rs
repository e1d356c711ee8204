//! Project: leaf resource, authorization fully derived from its owning space.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::normalize_attr;
use crate::error::{DomainError, DomainResult};
use crate::id::{ProjectId, SpaceId};

/// A project inside one space. Has no membership table of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub space_id: SpaceId,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    name: String,
    icon: Option<String>,
    color: Option<String>,
    image: Option<String>,
}

impl NewProject {
    pub fn new(
        name: impl Into<String>,
        icon: Option<String>,
        color: Option<String>,
        image: Option<String>,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("project name is required"));
        }
        Ok(Self {
            name,
            icon: normalize_attr(icon),
            color: normalize_attr(color),
            image: normalize_attr(image),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

/// Validated partial update for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPatch {
    name: Option<String>,
    icon: Option<String>,
    color: Option<String>,
    image: Option<String>,
}

impl ProjectPatch {
    pub fn new(
        name: Option<String>,
        icon: Option<String>,
        color: Option<String>,
        image: Option<String>,
    ) -> DomainResult<Self> {
        let name = match name {
            Some(n) => {
                let n = n.trim().to_string();
                if n.is_empty() {
                    return Err(DomainError::validation("project name cannot be empty"));
                }
                Some(n)
            }
            None => None,
        };
        Ok(Self {
            name,
            icon: normalize_attr(icon),
            color: normalize_attr(color),
            image: normalize_attr(image),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Apply this patch in place, bumping `updated_at`.
    pub fn apply(&self, project: &mut Project, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(icon) = &self.icon {
            project.icon = Some(icon.clone());
        }
        if let Some(color) = &self.color {
            project.color = Some(color.clone());
        }
        if let Some(image) = &self.image {
            project.image = Some(image.clone());
        }
        project.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_requires_a_name() {
        assert!(NewProject::new("  ", None, None, None).is_err());
        assert!(NewProject::new("Website", None, None, None).is_ok());
    }

    #[test]
    fn blank_image_normalizes_to_none() {
        let new_project =
            NewProject::new("Website", None, None, Some("  ".to_string())).unwrap();
        assert_eq!(new_project.image(), None);
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let now = Utc::now();
        let mut project = Project {
            id: ProjectId::new(),
            space_id: SpaceId::new(),
            name: "Website".to_string(),
            icon: None,
            color: None,
            image: None,
            created_at: now,
            updated_at: now,
        };

        let later = now + chrono::Duration::seconds(1);
        let patch =
            ProjectPatch::new(Some("Website v2".to_string()), None, None, None).unwrap();
        patch.apply(&mut project, later);

        assert_eq!(project.name, "Website v2");
        assert_eq!(project.updated_at, later);
    }
}
