//! Field kinds and stored field values.

/// Declared type of a template field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain text content.
    Text,
    /// Binary content; serialized as Base64.
    Blob,
}

/// A stored field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Text value.
    Text(String),
    /// Raw binary value.
    Blob(Vec<u8>),
}

impl FieldValue {
    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a blob value.
    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Blob(bytes.into())
    }

    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Blob(_) => None,
        }
    }

    /// Returns the raw bytes, if this is a blob value.
    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Blob(bytes) => Some(bytes),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Blob(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let text = FieldValue::text("hello");
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.as_blob().is_none());

        let blob = FieldValue::blob(vec![1, 2, 3]);
        assert_eq!(blob.as_blob(), Some(&[1u8, 2, 3][..]));
        assert!(blob.as_text().is_none());
    }
}
