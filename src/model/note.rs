//! Secure notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, StoredEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteCategory {
    Personal,
    Work,
    Financial,
    Medical,
    Other,
}

impl NoteCategory {
    pub const ALL: [Self; 5] = [
        Self::Personal,
        Self::Work,
        Self::Financial,
        Self::Medical,
        Self::Other,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Work => "Work",
            Self::Financial => "Financial",
            Self::Medical => "Medical",
            Self::Other => "Other",
        }
    }

    /// Parse a case-insensitive category name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.display_name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureNote {
    pub id: u64,
    pub title: String,
    pub category: NoteCategory,

    /// The sealed note body.
    pub body: StoredEnvelope,

    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub has_attachments: bool,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Record for SecureNote {
    const TABLE: &'static str = "notes";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}
