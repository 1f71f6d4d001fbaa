//! Query options for a single feed invocation.
//!
//! Built once from parsed command-line arguments and the follow list, then
//! passed by reference to the filter builder and the post-filter. Nothing in
//! the pipeline reads ambient configuration.

use nostr_sdk::{EventId, Kind, PublicKey};

use crate::error::OptionsError;

/// Which feed is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Notes from followed authors (or matching tag restrictions).
    #[default]
    Home,
    /// Encrypted direct messages addressed to us.
    Inbox,
}

/// A followed identity with an optional configured alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Follow {
    pub key: PublicKey,
    pub name: Option<String>,
}

impl Follow {
    pub fn new(key: PublicKey) -> Self {
        Self { key, name: None }
    }

    pub fn named(key: PublicKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub mode: Mode,
    pub verbose: bool,
    pub json: bool,
    pub no_replies: bool,
    pub only_replies: bool,
    pub only_mentions: bool,
    pub kinds: Vec<Kind>,
    /// Lower bound in unix seconds. Zero or negative means unbounded.
    pub since: i64,
    /// Upper bound in unix seconds. Zero or negative means unbounded.
    pub until: i64,
    /// Zero means unspecified.
    pub limit: usize,
    pub references: Vec<EventId>,
    pub own_key: PublicKey,
    pub following: Vec<Follow>,
}

impl QueryOptions {
    /// Options with every flag off and no bounds, for the given identity.
    pub fn new(own_key: PublicKey) -> Self {
        Self {
            mode: Mode::Home,
            verbose: false,
            json: false,
            no_replies: false,
            only_replies: false,
            only_mentions: false,
            kinds: Vec::new(),
            since: 0,
            until: 0,
            limit: 0,
            references: Vec::new(),
            own_key,
            following: Vec::new(),
        }
    }

    pub fn is_inbox(&self) -> bool {
        self.mode == Mode::Inbox
    }

    /// Follow list identities, in configured order.
    pub fn follow_keys(&self) -> Vec<PublicKey> {
        self.following.iter().map(|f| f.key).collect()
    }
}

/// Split repeated, possibly comma-separated arguments into trimmed entries.
fn split_entries(values: &[String]) -> impl Iterator<Item = &str> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Parse textual kinds. Entries that are not a valid kind number are dropped.
pub fn parse_kinds(values: &[String]) -> Vec<Kind> {
    split_entries(values)
        .filter_map(|v| match v.parse::<u16>() {
            Ok(n) => Some(Kind::from(n)),
            Err(_) => {
                tracing::debug!("Ignoring non-numeric kind '{}'", v);
                None
            }
        })
        .collect()
}

/// Parse reference identifiers (hex, `note1` or `nevent1`).
///
/// Unlike kinds, any malformed reference fails the whole parse.
pub fn parse_references(values: &[String]) -> Result<Vec<EventId>, OptionsError> {
    split_entries(values)
        .map(|v| {
            EventId::parse(v).map_err(|e| OptionsError::InvalidReference {
                value: v.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}
