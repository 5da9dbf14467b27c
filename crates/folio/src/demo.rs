//! Demo content and a walkthrough of the invalidation cycle.

use serde::Serialize;
use serde_json::json;

use folio_core::cache::{KeyPart, Namespace};
use folio_core::content::{attributes, EntityId, Post};
use folio_core::storage::{Columns, Result};

use crate::state::Repositories;

/// Creates a small set of demo content.
pub async fn seed(repos: &Repositories) -> Result<()> {
    let news = repos
        .categories
        .create(attributes(json!({ "name": "News", "slug": "news" }))?)
        .await?;
    repos
        .categories
        .create(attributes(json!({
            "name": "Releases",
            "slug": "releases",
            "parent_id": news.id,
        }))?)
        .await?;

    for (name, slug) in [("Rust", "rust"), ("Caching", "caching")] {
        repos
            .tags
            .create(attributes(json!({ "name": name, "slug": slug }))?)
            .await?;
    }

    repos
        .roles
        .create(attributes(json!({
            "name": "editor",
            "permissions": ["posts.create", "posts.update", "posts.publish"],
        }))?)
        .await?;

    let welcome = repos
        .posts
        .create(attributes(json!({
            "title": "Welcome",
            "slug": "welcome",
            "body": "First post.",
            "category_id": news.id,
        }))?)
        .await?;
    repos.posts.publish(welcome.id).await?;
    repos
        .posts
        .create(attributes(json!({ "title": "Draft notes", "slug": "draft-notes" }))?)
        .await?;

    tracing::info!("Demo content seeded");
    Ok(())
}

/// One step of [`walkthrough`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub action: String,
    /// The read key for reads; the tag or version key touched for writes.
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation: Option<String>,
}

impl Step {
    fn read(action: &str, key: String, items: usize) -> Self {
        Self {
            action: action.to_string(),
            key,
            items: Some(items),
            created: None,
            invalidation: None,
        }
    }

    /// One line of plain-text output.
    pub fn describe(&self) -> String {
        let detail = match (self.items, self.created, &self.invalidation) {
            (Some(items), _, _) => format!("items={items}"),
            (None, Some(id), Some(invalidation)) => format!("id={id} {invalidation}"),
            (None, Some(id), None) => format!("id={id}"),
            (None, None, _) => String::new(),
        };
        format!("{:<22} {:<40} {}", self.action, self.key, detail)
    }
}

/// Renders `steps` as pretty JSON or one line per step.
pub fn render(steps: &[Step], json: bool) -> serde_json::Result<String> {
    if json {
        serde_json::to_string_pretty(steps)
    } else {
        Ok(steps.iter().map(Step::describe).collect::<Vec<_>>().join("\n"))
    }
}

/// Reads the first post page, reads it again, creates a post and reads once more.
///
/// Reads record the key they resolved to at that moment. The write records
/// the created id and the invalidation it caused: a tag flush, a version
/// bump, or none when caching is off.
pub async fn walkthrough(repos: &Repositories) -> anyhow::Result<Vec<Step>> {
    const PER_PAGE: u64 = 15;

    let columns = Columns::all();
    let versioned = repos.layer().for_namespace(Namespace::of::<Post>());
    let args = [
        KeyPart::from(PER_PAGE),
        KeyPart::from(&columns),
        KeyPart::from(1u64),
    ];
    let mut steps = Vec::new();

    for action in ["paginate", "paginate again"] {
        let key = versioned.key_for("paginate", &args).await?;
        let page = repos.posts.paginate(PER_PAGE, 1, &columns).await?;
        tracing::info!(%key, items = page.items.len(), action, "Read posts");
        steps.push(Step::read(action, key, page.items.len()));
    }

    let post = repos
        .posts
        .create(attributes(json!({ "title": "X" }))?)
        .await?;
    let (key, invalidation) = if !versioned.is_enabled() {
        (String::new(), None)
    } else if versioned.uses_tags() {
        (versioned.keys().tag(), Some("flushed".to_string()))
    } else {
        let version = versioned.current_version().await?;
        (versioned.keys().version_key(), Some(format!("v{version}")))
    };
    tracing::info!(id = post.id, ?invalidation, "Created post");
    steps.push(Step {
        action: "create".to_string(),
        key,
        items: None,
        created: Some(post.id),
        invalidation,
    });

    let action = "paginate after write";
    let key = versioned.key_for("paginate", &args).await?;
    let page = repos.posts.paginate(PER_PAGE, 1, &columns).await?;
    tracing::info!(%key, items = page.items.len(), action, "Read posts");
    steps.push(Step::read(action, key, page.items.len()));

    Ok(steps)
}
