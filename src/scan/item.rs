//! Schedulable scan items

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of media entity an [Item] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Movie,
    Series,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Movie => "movie",
            ItemKind::Series => "series",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one movie or series flowing through the scan pipeline.
///
/// Two items are the same work if their [key](Item::key) matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(kind: ItemKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn movie(id: impl Into<String>) -> Self {
        Self::new(ItemKind::Movie, id)
    }

    pub fn series(id: impl Into<String>) -> Self {
        Self::new(ItemKind::Series, id)
    }

    /// Composite `kind_id` key used for deduplication
    pub fn key(&self) -> String {
        format!("{}_{}", self.kind, self.id)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
