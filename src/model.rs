//! Data models for the Ledgerly link service
//!
//! This module defines the persisted `Link` and `User` records, the request
//! payloads accepted by the API, and the viewer-annotated `LinkView` returned
//! by the listing endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed set of categories a link can be filed under.
///
/// Unknown or missing values fall back to [`Category::Other`] both when a
/// request is deserialized and when an older record is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Category {
    AiMl,
    Development,
    Design,
    Productivity,
    Marketing,
    Learning,
    Tools,
    Entertainment,
    News,
    Finance,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::AiMl,
        Category::Development,
        Category::Design,
        Category::Productivity,
        Category::Marketing,
        Category::Learning,
        Category::Tools,
        Category::Entertainment,
        Category::News,
        Category::Finance,
        Category::Other,
    ];

    /// Display label, which is also the wire representation.
    pub fn label(self) -> &'static str {
        match self {
            Category::AiMl => "AI & ML",
            Category::Development => "Development",
            Category::Design => "Design",
            Category::Productivity => "Productivity",
            Category::Marketing => "Marketing",
            Category::Learning => "Learning",
            Category::Tools => "Tools",
            Category::Entertainment => "Entertainment",
            Category::News => "News",
            Category::Finance => "Finance",
            Category::Other => "Other",
        }
    }

    /// Parses a label case-insensitively, defaulting to `Other`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(value))
            .unwrap_or_default()
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::parse(&value)
    }
}

impl From<Category> for &'static str {
    fn from(category: Category) -> Self {
        category.label()
    }
}

/// Informational pricing label. Not enforced anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Pricing {
    #[default]
    Free,
    Paid,
    Freemium,
}

impl Pricing {
    pub fn label(self) -> &'static str {
        match self {
            Pricing::Free => "Free",
            Pricing::Paid => "Paid",
            Pricing::Freemium => "Freemium",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "paid" => Pricing::Paid,
            "freemium" => Pricing::Freemium,
            _ => Pricing::Free,
        }
    }
}

impl From<String> for Pricing {
    fn from(value: String) -> Self {
        Pricing::parse(&value)
    }
}

impl From<Pricing> for &'static str {
    fn from(pricing: Pricing) -> Self {
        pricing.label()
    }
}

fn default_true() -> bool {
    true
}

/// Represents a saved link stored in the database
///
/// Field names are serialized in camelCase, which is both the storage format
/// and the shape returned by the create/update endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Opaque identifier (UUID v7), assigned at creation
    pub id: String,

    pub title: String,

    /// URL as submitted. Only its normalized form is used for de-duplication.
    pub url: String,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub description: String,

    /// Free-text collection label
    #[serde(default)]
    pub stack: String,

    #[serde(default)]
    pub category: Category,

    #[serde(default)]
    pub sub_category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub pricing: Pricing,

    /// Number of recorded visits. Only ever incremented.
    #[serde(default)]
    pub clicks: u64,

    #[serde(default = "default_true")]
    pub is_public: bool,

    /// Curated link inserted by the seeding process
    #[serde(default)]
    pub is_official: bool,

    /// Ids of every user who starred this link, without duplicates
    #[serde(default)]
    pub starred_by: Vec<String>,

    /// Legacy single-user star flag, kept for records that predate `starred_by`
    #[serde(default)]
    pub is_starred: bool,

    /// Id of the owning user
    pub user: String,

    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Builds a fresh, unstarred link with zero clicks owned by `owner`.
    pub fn new(owner: &str, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: title.into(),
            url: url.into(),
            image: String::new(),
            description: String::new(),
            stack: String::new(),
            category: Category::Other,
            sub_category: String::new(),
            tags: Vec::new(),
            pricing: Pricing::Free,
            clicks: 0,
            is_public: true,
            is_official: false,
            starred_by: Vec::new(),
            is_starred: false,
            user: owner.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }

    /// Whether `viewer` sees this link as starred.
    ///
    /// Membership in `starred_by` wins. The legacy flag only counts for the
    /// owner, and only while nobody is recorded in `starred_by`.
    pub fn is_starred_for(&self, viewer: &str) -> bool {
        if self.starred_by.iter().any(|id| id == viewer) {
            return true;
        }
        self.starred_by.is_empty() && self.user == viewer && self.is_starred
    }

    /// Flips `actor`'s membership in `starred_by` and returns the new state.
    ///
    /// When the actor owns the link the result is mirrored into the legacy flag.
    pub fn toggle_star(&mut self, actor: &str) -> bool {
        let starred = match self.starred_by.iter().position(|id| id == actor) {
            Some(index) => {
                self.starred_by.remove(index);
                false
            }
            None => {
                self.starred_by.push(actor.to_string());
                true
            }
        };
        if self.user == actor {
            self.is_starred = starred;
        }
        starred
    }

    /// Applies the fields present in a partial update. Absent fields are untouched.
    pub fn apply(&mut self, update: UpdateLinkRequest) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(url) = update.url {
            self.url = url;
        }
        if let Some(category) = update.category {
            self.category = Category::parse(&category);
        }
        if let Some(sub_category) = update.sub_category {
            self.sub_category = sub_category;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(pricing) = update.pricing {
            self.pricing = pricing;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(stack) = update.stack {
            self.stack = stack;
        }
        if let Some(is_public) = update.is_public {
            self.is_public = is_public;
        }
        if let Some(is_starred) = update.is_starred {
            self.is_starred = is_starred;
        }
    }

    pub fn existing(&self) -> ExistingLink {
        ExistingLink {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Canonical form of a URL used only for duplicate detection.
///
/// Trims, lowercases, drops one trailing slash and collapses `://www.` to `://`.
pub fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let stripped = lowered.strip_suffix('/').unwrap_or(lowered.as_str());
    stripped.replacen("://www.", "://", 1)
}

/// Identifies the already-saved link that a create request collided with
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExistingLink {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// A user as known to the link service. Identity itself is owned by the auth layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub email: String,
}

/// Request payload for creating a link
///
/// # Example
/// ```json
/// {
///   "title": "Rust Book",
///   "url": "https://doc.rust-lang.org/book/",
///   "category": "Learning",
///   "tags": ["rust"],
///   "isStarred": true
/// }
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub stack: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pricing: Option<Pricing>,
    pub is_public: Option<bool>,

    /// Star the link for its owner right away
    #[serde(default)]
    pub is_starred: bool,
}

impl CreateLinkRequest {
    /// Builds the link to persist for `owner`.
    pub fn into_link(self, owner: &str) -> Link {
        let mut link = Link::new(owner, self.title.trim(), self.url.trim());
        link.image = self.image.unwrap_or_default();
        link.description = self.description.unwrap_or_default();
        link.stack = self.stack.unwrap_or_default();
        link.category = self
            .category
            .as_deref()
            .map(Category::parse)
            .unwrap_or_default();
        link.sub_category = self.sub_category.unwrap_or_default();
        link.tags = self.tags.unwrap_or_default();
        link.pricing = self.pricing.unwrap_or_default();
        link.is_public = self.is_public.unwrap_or(true);
        if self.is_starred {
            link.starred_by.push(owner.to_string());
            link.is_starred = true;
        }
        link
    }
}

/// Partial update payload. Every field is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pricing: Option<Pricing>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub stack: Option<String>,
    pub is_public: Option<bool>,

    /// Legacy star flag
    pub is_starred: Option<bool>,
}

/// Owner reference in a listing: either the bare id or the populated profile
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Owner {
    Id(String),
    Profile(OwnerProfile),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OwnerProfile {
    pub id: String,
    pub username: String,
    pub avatar: String,
}

impl From<User> for OwnerProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            avatar: user.avatar,
        }
    }
}

/// A link as seen by one viewer
///
/// `is_starred` here is computed per request from the viewer's id and is
/// never written back to storage.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    pub id: String,
    pub title: String,
    pub url: String,
    pub image: String,
    pub description: String,
    pub stack: String,
    pub category: Category,
    pub sub_category: String,
    pub tags: Vec<String>,
    pub pricing: Pricing,
    pub clicks: u64,
    pub is_public: bool,
    pub is_official: bool,
    pub starred_by: Vec<String>,
    pub is_starred: bool,
    pub user: Owner,
    pub created_at: DateTime<Utc>,
}

impl LinkView {
    pub fn new(link: Link, viewer: &str, owner: Owner) -> Self {
        let is_starred = link.is_starred_for(viewer);
        Self {
            id: link.id,
            title: link.title,
            url: link.url,
            image: link.image,
            description: link.description,
            stack: link.stack,
            category: link.category,
            sub_category: link.sub_category,
            tags: link.tags,
            pricing: link.pricing,
            clicks: link.clicks,
            is_public: link.is_public,
            is_official: link.is_official,
            starred_by: link.starred_by,
            is_starred,
            user: owner,
            created_at: link.created_at,
        }
    }

    /// View without a populated owner profile.
    pub fn for_viewer(link: Link, viewer: &str) -> Self {
        let owner = Owner::Id(link.user.clone());
        Self::new(link, viewer, owner)
    }
}
