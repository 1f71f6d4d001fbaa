//! Translate query options into a relay filter.

use nostr_sdk::{Filter, Kind, Timestamp};

use crate::options::QueryOptions;

/// Build the subscription filter for `options`.
///
/// Tag restrictions (`#p` for mentions/inbox, `#e` for references) and the
/// author restriction are never combined: whenever a tag restriction is
/// present the follow list is not applied.
pub fn build_filter(options: &QueryOptions) -> Filter {
    let mut filter = Filter::new();

    let kinds = if options.is_inbox() {
        vec![Kind::EncryptedDirectMessage]
    } else {
        options.kinds.clone()
    };
    if !kinds.is_empty() {
        filter = filter.kinds(kinds);
    }

    let mut tagged = false;
    if options.is_inbox() || options.only_mentions {
        filter = filter.pubkey(options.own_key);
        tagged = true;
    }
    if !options.references.is_empty() {
        filter = filter.events(options.references.iter().copied());
        tagged = true;
    }

    if !tagged && !options.following.is_empty() {
        filter = filter.authors(options.follow_keys());
    }

    if options.since > 0 {
        filter = filter.since(Timestamp::from(options.since as u64));
    }
    if options.until > 0 {
        filter = filter.until(Timestamp::from(options.until as u64));
    }
    if options.limit > 0 {
        filter = filter.limit(options.limit);
    }

    filter
}
