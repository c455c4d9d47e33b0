//! Payloads exchanged with data sources.

use crate::FormatType;

/// Content read from or written to a data source.
///
/// A location that addresses one document yields [`Content::Document`]; a
/// directory or archive of many files yields [`Content::Records`] ordered by
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// A single text blob.
    Document(String),
    /// An ordered sequence of text records.
    Records(Vec<String>),
}

impl Content {
    /// Number of records held, counting a document as one.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Document(_) => 1,
            Self::Records(records) => records.len(),
        }
    }

    /// Whether no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Records(records) if records.is_empty())
    }

    /// Frame the content as a single payload according to `format`.
    ///
    /// Records are joined with newlines for [`FormatType::Text`] and
    /// [`FormatType::Jsonl`], and wrapped in a JSON array for
    /// [`FormatType::Json`].
    ///
    /// # Examples
    /// ```
    /// use wharf_core::{Content, FormatType};
    ///
    /// let records = Content::Records(vec![r#"{"a":1}"#.into(), r#"{"a":2}"#.into()]);
    /// assert_eq!(records.clone().into_payload(FormatType::Jsonl), "{\"a\":1}\n{\"a\":2}");
    /// assert_eq!(records.into_payload(FormatType::Json), "[{\"a\":1},{\"a\":2}]");
    /// ```
    #[must_use]
    pub fn into_payload(self, format: FormatType) -> String {
        match (self, format) {
            (Self::Document(text), _) => text,
            (Self::Records(records), FormatType::Json) => format!("[{}]", records.join(",")),
            (Self::Records(records), FormatType::Text | FormatType::Jsonl) => records.join("\n"),
        }
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Self::Document(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Self::Document(value.to_owned())
    }
}

impl From<Vec<String>> for Content {
    fn from(value: Vec<String>) -> Self {
        Self::Records(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn documents_pass_through_unchanged() {
        let content = Content::from("line one\nline two");
        assert_eq!(content.into_payload(FormatType::Json), "line one\nline two");
    }

    #[rstest]
    fn text_records_join_with_newlines() {
        let content = Content::from(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(content.len(), 2);
        assert_eq!(content.into_payload(FormatType::Text), "a\nb");
    }

    #[rstest]
    fn empty_records_report_empty() {
        assert!(Content::Records(Vec::new()).is_empty());
        assert!(!Content::Document(String::new()).is_empty());
    }
}
