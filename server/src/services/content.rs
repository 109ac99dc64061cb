//! Content library: blog posts and learning resources from JSON/YAML files.
//!
//! DESIGN
//! ======
//! Files are read on every call, so editing `public/blogs.json` shows up on
//! the next request without a restart. Each index may be JSON or YAML; JSON
//! wins when both exist. Unknown fields are carried through untouched so the
//! front end can grow its schema without server changes.

use std::cmp::Ordering;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const BLOG_INDEX: &str = "blogs";
const BLOG_BODY_DIR: &str = "blogs";
const RESOURCE_INDEX: &str = "resources";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("no {0} index (json, yaml or yml)")]
    MissingIndex(PathBuf),
    #[error("content io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

// =============================================================================
// BLOG
// =============================================================================

/// One entry of the blog index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_file: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BlogPost {
    /// Listing view: the inline body is dropped.
    #[must_use]
    pub fn summary(mut self) -> Self {
        self.content = None;
        self
    }
}

// =============================================================================
// RESOURCES
// =============================================================================

/// Progress marker on a resource. Anything but 1 or 2 reads as not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ResourceStatus {
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Self::Completed,
            1 => Self::InProgress,
            _ => Self::NotStarted,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::InProgress => "In Progress",
            Self::NotStarted => "Not Started",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "status_code")]
    pub status: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    #[must_use]
    pub fn status(&self) -> ResourceStatus {
        ResourceStatus::from_code(self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub slug: String,
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

impl CategorySummary {
    fn from_resources(name: &str, resources: &[Resource]) -> Self {
        let count = |status| resources.iter().filter(|r| r.status() == status).count();
        Self {
            name: name.to_owned(),
            slug: category_slug(name),
            total: resources.len(),
            completed: count(ResourceStatus::Completed),
            in_progress: count(ResourceStatus::InProgress),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub summary: CategorySummary,
    pub resources: Vec<ResourceView>,
}

/// A resource with its status spelled out for the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceView {
    #[serde(flatten)]
    pub resource: Resource,
    pub status_label: &'static str,
}

/// Resource index: category name → entries, kept in file order.
#[derive(Debug, Default)]
struct ResourceIndex(Vec<(String, Vec<Resource>)>);

impl<'de> Deserialize<'de> for ResourceIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IndexVisitor;

        impl<'de> serde::de::Visitor<'de> for IndexVisitor {
            type Value = ResourceIndex;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of category name to resource list")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, resources)) = map.next_entry::<String, Vec<Resource>>()? {
                    entries.push((name, resources));
                }
                Ok(ResourceIndex(entries))
            }
        }

        deserializer.deserialize_map(IndexVisitor)
    }
}

// =============================================================================
// LIBRARY
// =============================================================================

#[derive(Debug, Clone)]
pub struct ContentLibrary {
    root: PathBuf,
}

impl ContentLibrary {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// All posts, newest first, without bodies.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::MissingIndex`] if the index is missing, or a
    /// parse error if it is malformed.
    pub async fn list_posts(&self) -> Result<Vec<BlogPost>, ContentError> {
        let mut posts: Vec<BlogPost> = self.read_index(BLOG_INDEX).await?;
        sort_posts(&mut posts);
        Ok(posts.into_iter().map(BlogPost::summary).collect())
    }

    /// A single post with `content` resolved from its body file when it has one.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] for an unknown slug or an unsafe body
    /// file name, and IO/parse errors for a broken index or body.
    pub async fn post(&self, slug: &str) -> Result<BlogPost, ContentError> {
        let posts: Vec<BlogPost> = self.read_index(BLOG_INDEX).await?;
        let mut post = posts
            .into_iter()
            .find(|p| p.slug == slug)
            .ok_or_else(|| ContentError::NotFound(format!("blog post {slug}")))?;

        if let Some(file) = post.content_file.as_deref() {
            if !is_plain_file_name(file) {
                return Err(ContentError::NotFound(format!("blog body {file}")));
            }
            let path = self.root.join(BLOG_BODY_DIR).join(file);
            let body = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| ContentError::Io { path, source })?;
            post.content = Some(body);
        } else if post.content.is_none() {
            post.content = Some(String::new());
        }
        Ok(post)
    }

    /// Every category with its progress counts, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is missing or malformed.
    pub async fn list_categories(&self) -> Result<Vec<CategorySummary>, ContentError> {
        let index = self.read_resources().await?;
        Ok(index
            .iter()
            .map(|(name, resources)| CategorySummary::from_resources(name, resources))
            .collect())
    }

    /// One category, looked up by URL slug.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] when no category matches.
    pub async fn category(&self, slug: &str) -> Result<CategoryDetail, ContentError> {
        let name = category_name(slug);
        let index = self.read_resources().await?;
        let (name, resources) = index
            .into_iter()
            .find(|(candidate, _)| *candidate == name)
            .ok_or_else(|| ContentError::NotFound(format!("category {name}")))?;

        let summary = CategorySummary::from_resources(&name, &resources);
        let resources = resources
            .into_iter()
            .map(|resource| {
                let status_label = resource.status().label();
                ResourceView { resource, status_label }
            })
            .collect();
        Ok(CategoryDetail { summary, resources })
    }

    async fn read_resources(&self) -> Result<Vec<(String, Vec<Resource>)>, ContentError> {
        let index: ResourceIndex = self.read_index(RESOURCE_INDEX).await?;
        Ok(index.0)
    }

    /// Read `<stem>.json`, falling back to `<stem>.yaml` / `<stem>.yml`.
    async fn read_index<T: DeserializeOwned>(&self, stem: &str) -> Result<T, ContentError> {
        let json_path = self.root.join(format!("{stem}.json"));
        match tokio::fs::read_to_string(&json_path).await {
            Ok(raw) => {
                return serde_json::from_str(&raw).map_err(|source| ContentError::Json { path: json_path, source });
            }
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(ContentError::Io { path: json_path, source: e });
            }
            Err(_) => {}
        }

        for ext in ["yaml", "yml"] {
            let path = self.root.join(format!("{stem}.{ext}"));
            match tokio::fs::read_to_string(&path).await {
                Ok(raw) => return serde_yaml::from_str(&raw).map_err(|source| ContentError::Yaml { path, source }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(ContentError::Io { path, source }),
            }
        }

        Err(ContentError::MissingIndex(self.root.join(stem)))
    }
}

/// Integer status codes pass through; any other value reads as 0.
fn status_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|value| value.as_i64())
        .unwrap_or(0))
}

/// Dated posts newest first, then undated posts in file order.
fn sort_posts(posts: &mut [BlogPost]) {
    posts.sort_by(|a, b| match (a.date.as_deref(), b.date.as_deref()) {
        (Some(da), Some(db)) => compare_dates(db, da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Orders by the leading `YYYY-MM-DD` when it parses; unparseable dates sort
/// before parseable ones and among themselves by raw text.
fn compare_dates(a: &str, b: &str) -> Ordering {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    let key = |s: &str| s.get(..10).and_then(|d| time::Date::parse(d, &format).ok());
    (key(a), a).cmp(&(key(b), b))
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\']) && !name.contains("..")
}

/// `"Data Structures & Algorithms"` → `"data-structures-and-algorithms"`.
#[must_use]
pub fn category_slug(name: &str) -> String {
    name.split_whitespace()
        .map(|word| if word == "&" { "and".to_owned() } else { word.to_lowercase() })
        .collect::<Vec<_>>()
        .join("-")
}

/// `"data-structures-and-algorithms"` → `"Data Structures & Algorithms"`.
#[must_use]
pub fn category_name(slug: &str) -> String {
    slug.split('-')
        .map(|word| {
            if word == "and" {
                return "&".to_owned();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "content_test.rs"]
mod tests;
