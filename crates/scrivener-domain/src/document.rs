//! Documents and the fragments they are split into for retrieval

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Unique identifier for a loaded document, backed by a UUIDv7
///
/// UUIDv7 keeps identifiers sortable by creation time, which keeps
/// persisted snapshots readable when inspected by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(u128);

impl DocumentId {
    /// Generate a new UUIDv7-based DocumentId
    ///
    /// # Examples
    ///
    /// ```
    /// use scrivener_domain::DocumentId;
    ///
    /// let id = DocumentId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a DocumentId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a DocumentId from its hyphenated UUID form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid document id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Unique identifier for a fragment within an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentId(u128);

impl FragmentId {
    /// Generate a new UUIDv7-based FragmentId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a FragmentId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a FragmentId from its hyphenated UUID form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid fragment id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for FragmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// A source document read from disk
///
/// Records are immutable once the loader has produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Unique identifier
    pub id: DocumentId,

    /// Full text as it should be shown to the model
    pub raw_text: String,

    /// Path the document was read from
    pub source_path: PathBuf,

    /// Loader-provided metadata (file name, extension, format, size)
    pub metadata: BTreeMap<String, String>,
}

impl DocumentRecord {
    /// Create a record with a fresh identifier and no metadata
    pub fn new(raw_text: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            id: DocumentId::new(),
            raw_text: raw_text.into(),
            source_path: source_path.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Look up a metadata value
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// A retrievable sub-span of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Unique identifier
    pub id: FragmentId,

    /// Document this fragment was cut from
    pub document_id: DocumentId,

    /// Position of the fragment within its document, starting at 0
    pub ordinal: usize,

    /// Fragment text
    pub text: String,

    /// Path of the originating document
    pub source_path: PathBuf,
}
