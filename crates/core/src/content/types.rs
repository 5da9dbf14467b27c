use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Attributes, Entity, EntityId};

/// Publication state of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    /// Waiting for the scheduler to publish it.
    Scheduled,
    Published,
}

impl PostStatus {
    /// Returns the serialized name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
        }
    }
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub category_id: Option<EntityId>,
    #[serde(default)]
    pub tag_ids: Vec<EntityId>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Creates a new draft post.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            slug: String::new(),
            body: String::new(),
            category_id: None,
            tag_ids: Vec::new(),
            status: PostStatus::Draft,
            published_at: None,
        }
    }

    /// Sets a specific ID for this post (useful for testing).
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    /// Sets the slug for this post.
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    /// Sets the status for this post.
    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns true if this post is visible to readers.
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Attributes that publish this post at `now`.
    ///
    /// An already published post keeps its original publication date.
    pub fn publication_attributes(&self, now: DateTime<Utc>) -> Attributes {
        let published_at = self.published_at.unwrap_or(now);
        let mut attrs = Attributes::new();
        attrs.insert(
            "status".to_string(),
            Value::from(PostStatus::Published.as_str()),
        );
        attrs.insert(
            "published_at".to_string(),
            Value::from(published_at.to_rfc3339()),
        );
        attrs
    }

    /// Attributes for a draft copy of this post.
    pub fn duplicate_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(
            "title".to_string(),
            Value::from(format!("{} (copy)", self.title)),
        );
        let slug = if self.slug.is_empty() {
            String::new()
        } else {
            format!("{}-copy", self.slug)
        };
        attrs.insert("slug".to_string(), Value::from(slug));
        attrs.insert("body".to_string(), Value::from(self.body.clone()));
        attrs.insert(
            "category_id".to_string(),
            self.category_id.map(Value::from).unwrap_or(Value::Null),
        );
        attrs.insert("tag_ids".to_string(), Value::from(self.tag_ids.clone()));
        attrs
    }
}

impl Entity for Post {
    const NAME: &'static str = "Post";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// A post category. Categories nest through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
}

impl Category {
    /// Creates a new top-level category.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            slug: slug.into(),
            parent_id: None,
        }
    }

    /// Sets a specific ID for this category (useful for testing).
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    /// Nests this category under `parent_id`.
    pub fn with_parent(mut self, parent_id: EntityId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

impl Entity for Category {
    const NAME: &'static str = "Category";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// A free-form post label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
}

impl Tag {
    /// Creates a new tag.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            slug: slug.into(),
        }
    }

    /// Sets a specific ID for this tag (useful for testing).
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }
}

impl Entity for Tag {
    const NAME: &'static str = "Tag";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// A named set of permissions granted to back-office users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Role {
    /// Creates a new role without permissions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    /// Grants a permission to this role.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Returns true if this role grants `permission`.
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl Entity for Role {
    const NAME: &'static str = "Role";

    fn id(&self) -> EntityId {
        self.id
    }
}
