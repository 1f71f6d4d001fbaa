//! Query engine for reading Nostr feeds.
//!
//! This crate turns user-facing query options into a relay filter, opens a
//! subscription across one or more relays, removes duplicate deliveries,
//! applies the reply filters relays cannot express, and resolves display
//! aliases for authors as metadata streams past.

pub mod alias;
pub mod error;
pub mod filter;
pub mod options;
pub mod pipeline;
pub mod post_filter;
pub mod relay;
pub mod stream;
pub mod transport;

// Re-export commonly used types
pub use alias::{AliasDirectory, Observation, Profile};
pub use error::{FeedError, OptionsError, ProfileError, TransportError};
pub use filter::build_filter;
pub use options::{parse_kinds, parse_references, Follow, Mode, QueryOptions};
pub use pipeline::{Pipeline, Render, Summary};
pub use relay::RelayClient;
pub use stream::{EventDedup, SubscriptionStream};
pub use transport::{RelayEvent, RelayStream, Transport};

// Re-export nostr-sdk for convenience
pub use nostr_sdk;
