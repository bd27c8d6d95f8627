//! Core data models used throughout the reconciler.
//!
//! A [`DocumentRecord`] is one row of the `publications` catalog. Descriptive
//! attributes are read-only from this crate's point of view; only the
//! columns named by [`Attribute`] are ever written back.

use std::fmt;

/// One catalog entry: a publication, its backing file, and its derived attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: i64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i64>,
    pub keyword: Option<String>,
    pub abstract_text: Option<String>,
    /// Backing file, relative to the storage root.
    pub path: String,
    pub doc_type: Option<String>,
    /// Optional zip bundle, relative to the storage root.
    pub archive_path: Option<String>,
    pub archive_hash: Option<String>,
    pub image_path: Option<String>,
    pub access_url: Option<String>,
    pub password: Option<String>,
    pub text: Option<String>,
    pub hash: Option<String>,
}

impl DocumentRecord {
    /// A record with only identity and file reference set, as created by ingestion.
    pub fn new(id: i64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Current stored value of a derived attribute.
    pub fn attribute(&self, attribute: Attribute) -> &Option<String> {
        match attribute {
            Attribute::Hash => &self.hash,
            Attribute::Text => &self.text,
            Attribute::ImagePath => &self.image_path,
            Attribute::ArchiveHash => &self.archive_hash,
        }
    }

    pub fn set_attribute(&mut self, attribute: Attribute, value: impl Into<String>) {
        let slot = match attribute {
            Attribute::Hash => &mut self.hash,
            Attribute::Text => &mut self.text,
            Attribute::ImagePath => &mut self.image_path,
            Attribute::ArchiveHash => &mut self.archive_hash,
        };
        *slot = Some(value.into());
    }
}

/// Derived attributes this service owns. The set of writable columns is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Hash,
    Text,
    ImagePath,
    ArchiveHash,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Hash,
        Attribute::Text,
        Attribute::ImagePath,
        Attribute::ArchiveHash,
    ];

    /// Column name in the `publications` table.
    pub fn column(self) -> &'static str {
        match self {
            Attribute::Hash => "hash",
            Attribute::Text => "text",
            Attribute::ImagePath => "path_img",
            Attribute::ArchiveHash => "hash_zip",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// An optional attribute counts as set only when it holds a non-empty value.
pub fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}
