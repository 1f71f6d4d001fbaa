//! Display aliases for event authors.
//!
//! Seeded from the named entries of the follow list, then grown as kind 0
//! metadata from not-yet-aliased authors streams past. The first non-empty
//! alias an identity gets is kept for the rest of the session.

use std::collections::HashMap;

use nostr_sdk::{Event, Kind, PublicKey};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProfileError;
use crate::options::Follow;

/// The part of kind 0 metadata content we care about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub nip05: Option<String>,
}

impl Profile {
    pub fn parse(event: &Event) -> Result<Self, ProfileError> {
        serde_json::from_str(&event.content).map_err(|source| ProfileError {
            author: event.pubkey.to_hex(),
            source,
        })
    }

    /// Announced name: `name`, else `display_name`, ignoring blanks.
    pub fn alias(&self) -> Option<&str> {
        [&self.name, &self.display_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

/// What [`AliasDirectory::observe`] did with an event.
#[derive(Debug)]
pub enum Observation {
    NotMetadata,
    AlreadyAliased,
    Learned(String),
    /// Valid metadata without a usable name.
    NoName,
    /// Metadata content did not decode.
    Skipped(ProfileError),
}

#[derive(Debug, Default)]
pub struct AliasDirectory {
    names: HashMap<PublicKey, String>,
}

impl AliasDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_follows(follows: &[Follow]) -> Self {
        let mut directory = Self::new();
        for follow in follows {
            if let Some(name) = &follow.name {
                directory.insert(follow.key, name);
            }
        }
        directory
    }

    pub fn resolve(&self, key: &PublicKey) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    /// Record an alias unless the identity already has one. Returns whether
    /// it was recorded.
    pub fn insert(&mut self, key: PublicKey, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.names.contains_key(&key) {
            return false;
        }
        self.names.insert(key, name.to_string());
        true
    }

    /// Learn an alias from a metadata event if its author has none yet.
    pub fn observe(&mut self, event: &Event) -> Observation {
        if event.kind != Kind::Metadata {
            return Observation::NotMetadata;
        }
        if self.names.contains_key(&event.pubkey) {
            return Observation::AlreadyAliased;
        }

        let profile = match Profile::parse(event) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to parse metadata: {}", e);
                return Observation::Skipped(e);
            }
        };

        match profile.alias() {
            Some(name) => {
                let name = name.to_string();
                self.names.insert(event.pubkey, name.clone());
                debug!("Learned alias '{}' for {}", name, event.pubkey);
                Observation::Learned(name)
            }
            None => Observation::NoName,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
