//! Fulltext normalization and keyword fields.

use super::keywords::KeywordExtractor;

/// Fulltext-derived columns of one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FulltextFields {
    /// Normalized text, when requested
    pub fulltext: Option<String>,

    /// Comma-separated keywords, when requested
    pub fulltext_keywords: Option<String>,
}

/// Replace newline, carriage return and tab each with a single space
pub fn normalize_fulltext(text: &str) -> String {
    text.replace(['\n', '\r', '\t'], " ")
}

/// Derive the fulltext columns for a page.
///
/// Both fields stay `None` when the page has no text, or when neither field
/// was requested. `keywords` is only consulted when keywords were requested.
pub fn parse_fulltext_fields(
    text: Option<&str>,
    include_fulltext: bool,
    extract_keywords: bool,
    keywords: Option<&KeywordExtractor>,
) -> FulltextFields {
    let Some(text) = text else {
        return FulltextFields::default();
    };
    if !include_fulltext && !extract_keywords {
        return FulltextFields::default();
    }

    let normalized = normalize_fulltext(text);
    let fulltext_keywords = match (extract_keywords, keywords) {
        (true, Some(extractor)) => Some(extractor.keyword_list(&normalized)),
        _ => None,
    };

    FulltextFields {
        fulltext: include_fulltext.then_some(normalized),
        fulltext_keywords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::KeywordConfig;

    #[test]
    fn test_normalize_fulltext() {
        assert_eq!(normalize_fulltext("a\nb\r\nc\td"), "a b  c d");
        assert_eq!(normalize_fulltext("plain"), "plain");
        assert_eq!(
            normalize_fulltext("Hello world!\nThis is another line.\tAnd indented."),
            "Hello world! This is another line. And indented."
        );
    }

    #[test]
    fn test_fulltext_only() {
        let fields = parse_fulltext_fields(Some("Hello\nWorld"), true, false, None);
        assert_eq!(fields.fulltext.as_deref(), Some("Hello World"));
        assert_eq!(fields.fulltext_keywords, None);
    }

    #[test]
    fn test_missing_text_or_flags_give_nulls() {
        let extractor = KeywordExtractor::new(KeywordConfig::default(), &[]).unwrap();
        for (include, extract) in [(true, true), (true, false), (false, true), (false, false)] {
            let fields = parse_fulltext_fields(None, include, extract, Some(&extractor));
            assert_eq!(fields, FulltextFields::default());
        }
        let fields = parse_fulltext_fields(Some("Archive collections."), false, false, Some(&extractor));
        assert_eq!(fields, FulltextFields::default());
    }

    #[test]
    fn test_keywords_only() {
        let extractor = KeywordExtractor::new(KeywordConfig::default(), &[]).unwrap();
        let fields = parse_fulltext_fields(
            Some("Archive collections.\nArchive collections are catalogued."),
            false,
            true,
            Some(&extractor),
        );
        assert_eq!(fields.fulltext, None);
        let keywords = fields.fulltext_keywords.unwrap();
        assert!(keywords.split(',').any(|k| k == "Archive collections"));
    }
}
