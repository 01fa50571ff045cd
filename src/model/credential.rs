//! Website / service login records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, StoredEnvelope};

/// Non-secret details supplied when adding a credential.
#[derive(Debug, Clone, Default)]
pub struct NewCredential {
    pub title: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,

    /// The sealed password.
    pub password: StoredEnvelope,

    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Record for Credential {
    const TABLE: &'static str = "credentials";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}
