//! Bulk import and export of links
//!
//! Export renders an owner's links as JSON, CSV or a Netscape bookmark file.
//! Import accepts entries produced by a JSON export, `{url, title}` pairs
//! pulled from a browser bookmark file, or the raw bookmark HTML itself.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use csv::{QuoteStyle, WriterBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::model::{Category, Link, Pricing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Html,
}

impl ExportFormat {
    /// Parses the `format` query parameter. Missing means JSON.
    pub fn parse(value: Option<&str>) -> AppResult<Self> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("json") => Ok(ExportFormat::Json),
            Some("csv") => Ok(ExportFormat::Csv),
            Some("html") => Ok(ExportFormat::Html),
            Some(other) => Err(AppError::Validation(format!(
                "Unsupported export format: {other}"
            ))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }
}

/// One exported link. Internal ids and the owner id are left out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub title: String,
    pub url: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub pricing: Pricing,
    pub description: String,
    pub is_public: bool,
    pub is_starred: bool,
    pub clicks: u64,
    pub created_at: DateTime<Utc>,
}

impl ExportRecord {
    pub fn new(link: &Link, owner: &str) -> Self {
        Self {
            title: link.title.clone(),
            url: link.url.clone(),
            category: link.category,
            tags: link.tags.clone(),
            pricing: link.pricing,
            description: link.description.clone(),
            is_public: link.is_public,
            is_starred: link.is_starred_for(owner),
            clicks: link.clicks,
            created_at: link.created_at,
        }
    }
}

/// Renders `records` in the requested format.
pub fn render(format: ExportFormat, records: &[ExportRecord]) -> AppResult<Vec<u8>> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_vec_pretty(records)?),
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Html => Ok(to_bookmark_html(records).into_bytes()),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn to_csv(records: &[ExportRecord]) -> AppResult<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    wtr.write_record([
        "Title",
        "URL",
        "Category",
        "Tags",
        "Pricing",
        "Description",
        "Public",
        "Starred",
        "Clicks",
        "Created At",
    ])?;

    for record in records {
        wtr.write_record([
            record.title.as_str(),
            record.url.as_str(),
            record.category.label(),
            record.tags.join(";").as_str(),
            record.pricing.label(),
            record.description.as_str(),
            yes_no(record.is_public),
            yes_no(record.is_starred),
            record.clicks.to_string().as_str(),
            record.created_at.to_rfc3339().as_str(),
        ])?;
    }

    wtr.flush()?;
    wtr.into_inner()
        .map_err(|err| AppError::Internal(err.to_string()))
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape_html(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn to_bookmark_html(records: &[ExportRecord]) -> String {
    let mut html = String::from(
        "<!DOCTYPE NETSCAPE-Bookmark-file-1>\n\
         <META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n\
         <TITLE>Bookmarks</TITLE>\n\
         <H1>Bookmarks</H1>\n\
         <DL><p>\n",
    );
    for record in records {
        html.push_str(&format!(
            "    <DT><A HREF=\"{}\" ADD_DATE=\"{}\" TAGS=\"{}\">{}</A>\n",
            escape_html(&record.url),
            record.created_at.timestamp(),
            escape_html(&record.tags.join(",")),
            escape_html(&record.title),
        ));
    }
    html.push_str("</DL><p>\n");
    html
}

/// Request body for `POST /api/links/import`
#[derive(Deserialize, Debug, Default)]
pub struct ImportRequest {
    #[serde(default)]
    pub bookmarks: Vec<ImportEntry>,

    /// `json` for entries from a JSON export; anything else means bookmark pairs
    #[serde(default)]
    pub format: Option<String>,

    /// Raw bookmark file, parsed server-side when present
    #[serde(default)]
    pub html: Option<String>,
}

/// One entry of an import batch. Every field is optional.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    pub title: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pricing: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub stack: Option<String>,
    pub is_public: Option<bool>,
    pub is_starred: Option<bool>,
}

/// Result of an import
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*"([^"]*)"[^>]*>(.*?)</a>"#)
        .expect("anchor pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Extracts `{url, title}` pairs from the anchors of a bookmark file.
pub fn parse_bookmark_html(html: &str) -> Vec<ImportEntry> {
    ANCHOR
        .captures_iter(html)
        .map(|caps| {
            let title = unescape_html(TAG.replace_all(&caps[2], "").trim());
            ImportEntry {
                url: Some(unescape_html(caps[1].trim())),
                title: Some(title).filter(|t| !t.is_empty()),
                ..Default::default()
            }
        })
        .collect()
}

/// Google's favicon service URL for the host of `url`.
pub fn favicon_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(format!(
        "https://www.google.com/s2/favicons?domain={host}&sz=64"
    ))
}

fn is_importable(url: &str) -> bool {
    url.trim().starts_with("http")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Maps an entry from a JSON export to a link owned by `owner`.
pub fn link_from_json_entry(owner: &str, entry: ImportEntry) -> Option<Link> {
    let url = non_empty(entry.url)?;
    if !is_importable(&url) {
        return None;
    }

    let title = non_empty(entry.title).unwrap_or_else(|| "Untitled".to_string());
    let mut link = Link::new(owner, title.trim(), url.trim());
    link.category = entry
        .category
        .as_deref()
        .map(Category::parse)
        .unwrap_or_default();
    link.sub_category = entry.sub_category.unwrap_or_default();
    link.tags = entry.tags.unwrap_or_default();
    link.pricing = entry
        .pricing
        .as_deref()
        .map(Pricing::parse)
        .unwrap_or_default();
    link.description = entry.description.unwrap_or_default();
    link.image = entry.image.unwrap_or_default();
    link.stack = entry.stack.unwrap_or_default();
    link.is_public = entry.is_public.unwrap_or(true);
    if entry.is_starred == Some(true) {
        link.starred_by.push(owner.to_string());
        link.is_starred = true;
    }
    Some(link)
}

/// Maps a `{url, title}` bookmark pair to a link owned by `owner`.
pub fn link_from_bookmark(owner: &str, entry: ImportEntry) -> Option<Link> {
    let url = non_empty(entry.url)?;
    if !is_importable(&url) {
        return None;
    }

    let title = non_empty(entry.title).unwrap_or_else(|| url.clone());
    Some(Link::new(owner, title.trim(), url.trim()))
}

/// Converts an import request into candidate links.
///
/// Returns the candidates plus the number of entries dropped for a missing
/// or non-http URL. De-duplication happens later, at insert time.
pub fn prepare_import(owner: &str, request: ImportRequest) -> (Vec<Link>, usize) {
    let is_json = request
        .format
        .as_deref()
        .is_some_and(|format| format.eq_ignore_ascii_case("json"));

    let mut entries = request.bookmarks;
    if let Some(html) = request.html.as_deref() {
        entries.extend(parse_bookmark_html(html));
    }

    let total = entries.len();
    let links: Vec<Link> = entries
        .into_iter()
        .filter_map(|entry| {
            if is_json {
                link_from_json_entry(owner, entry)
            } else {
                link_from_bookmark(owner, entry)
            }
        })
        .map(|mut link| {
            if link.image.is_empty() {
                link.image = favicon_url(&link.url).unwrap_or_default();
            }
            link
        })
        .collect();

    let invalid = total - links.len();
    (links, invalid)
}
