//! HTML `<meta>` tag extraction.
//!
//! Two vocabularies are scraped: Open Graph (`<meta property="og:...">`) and
//! Dublin Core (`<meta name="DC....">`). Which tags become columns is an
//! allow-list table, [`MetaTag::defaults`], that callers may replace.

use std::collections::BTreeMap;

use scraper::{Html, Selector};
use tracing::warn;

/// Open Graph tags scraped by default
pub const OPEN_GRAPH_TAGS: &[&str] = &[
    "og:site_name",
    "og:title",
    "og:locale",
    "og:type",
    "og:image",
    "og:url",
    "og:image:url",
    "og:image:secure_url",
    "og:image:type",
    "og:image:width",
    "og:image:height",
    "og:image:alt",
    "og:description",
];

/// Dublin Core tags scraped by default
pub const DUBLIN_CORE_TAGS: &[&str] = &[
    "DC.title",
    "DC.creator",
    "DC.subject",
    "DC.description",
    "DC.publisher",
    "DC.contributor",
    "DC.date",
    "DC.type",
    "DC.format",
    "DC.identifier",
    "DC.source",
    "DC.language",
    "DC.relation",
    "DC.coverage",
    "DC.rights",
];

/// Which `<meta>` attribute carries the tag name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaAttribute {
    /// `<meta property="...">`, used by Open Graph
    Property,
    /// `<meta name="...">`, used by Dublin Core
    Name,
}

impl MetaAttribute {
    fn as_str(self) -> &'static str {
        match self {
            MetaAttribute::Property => "property",
            MetaAttribute::Name => "name",
        }
    }
}

/// One allow-listed `<meta>` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTag {
    /// Tag name as written in the HTML
    pub name: String,
    /// Attribute the name appears in
    pub attribute: MetaAttribute,
}

impl MetaTag {
    /// A tag matched on its `property` attribute
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: MetaAttribute::Property,
        }
    }

    /// A tag matched on its `name` attribute
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: MetaAttribute::Name,
        }
    }

    /// Output column for this tag: the tag name with `:` replaced by `_`
    pub fn column(&self) -> String {
        self.name.replace(':', "_")
    }

    /// The Open Graph allow-list
    pub fn open_graph() -> Vec<MetaTag> {
        OPEN_GRAPH_TAGS.iter().map(|t| MetaTag::property(*t)).collect()
    }

    /// The Dublin Core allow-list
    pub fn dublin_core() -> Vec<MetaTag> {
        DUBLIN_CORE_TAGS.iter().map(|t| MetaTag::name(*t)).collect()
    }

    /// Open Graph followed by Dublin Core
    pub fn defaults() -> Vec<MetaTag> {
        let mut tags = Self::open_graph();
        tags.extend(Self::dublin_core());
        tags
    }

    fn selector(&self) -> Option<Selector> {
        let css = format!(
            r#"meta[{}="{}"]"#,
            self.attribute.as_str(),
            self.name.replace('"', "\\\"")
        );
        match Selector::parse(&css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Failed to parse selector '{}': {:?}", css, e);
                None
            }
        }
    }
}

/// Extract allow-listed `<meta>` values from a page.
///
/// Only the first matching element of each tag is considered. A tag
/// contributes a column only when it is present and its trimmed `content`
/// is non-empty; otherwise the column is absent from the result.
///
/// # Arguments
///
/// * `html` - The page HTML
/// * `tags` - The allow-list of tags to look for
///
/// # Returns
///
/// Column name to trimmed content
pub fn extract_html_metadata(html: &str, tags: &[MetaTag]) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut metadata = BTreeMap::new();

    for tag in tags {
        let Some(selector) = tag.selector() else {
            continue;
        };
        let content = document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr("content"))
            .map(str::trim)
            .unwrap_or_default();
        if !content.is_empty() {
            metadata.insert(tag.column(), content.to_string());
        }
    }

    metadata
}
