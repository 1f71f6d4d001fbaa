//! Reply filtering that relay filters cannot express.

use nostr_sdk::Event;

use crate::options::QueryOptions;

/// True if any tag on the event is an `e` (event reference) tag.
pub fn has_reference(event: &Event) -> bool {
    event
        .tags
        .iter()
        .any(|tag| tag.as_slice().first().map(|s| s.as_str()) == Some("e"))
}

/// Decide whether an event survives the reply flags.
///
/// `only_replies` and `no_replies` are checked independently. With both set
/// every event is rejected.
pub fn accept(event: &Event, options: &QueryOptions) -> bool {
    if !options.only_replies && !options.no_replies {
        return true;
    }
    let replied = has_reference(event);
    if options.only_replies && !replied {
        return false;
    }
    if options.no_replies && replied {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_sdk::{EventBuilder, Keys, Tag, TagKind};

    fn opts(only_replies: bool, no_replies: bool) -> QueryOptions {
        let mut o = QueryOptions::new(Keys::generate().public_key());
        o.only_replies = only_replies;
        o.no_replies = no_replies;
        o
    }

    fn reply() -> Event {
        EventBuilder::text_note("re")
            .tag(Tag::custom(TagKind::e(), vec!["abc".to_string()]))
            .sign_with_keys(&Keys::generate())
            .unwrap()
    }

    fn plain() -> Event {
        EventBuilder::text_note("gm")
            .tag(Tag::custom(TagKind::p(), vec!["abc".to_string()]))
            .sign_with_keys(&Keys::generate())
            .unwrap()
    }

    #[test]
    fn detects_e_tag() {
        assert!(has_reference(&reply()));
        assert!(!has_reference(&plain()));
    }

    #[test]
    fn no_flags_accepts_everything() {
        assert!(accept(&reply(), &opts(false, false)));
        assert!(accept(&plain(), &opts(false, false)));
    }

    #[test]
    fn only_replies() {
        assert!(accept(&reply(), &opts(true, false)));
        assert!(!accept(&plain(), &opts(true, false)));
    }

    #[test]
    fn no_replies() {
        assert!(!accept(&reply(), &opts(false, true)));
        assert!(accept(&plain(), &opts(false, true)));
    }

    #[test]
    fn both_flags_reject_everything() {
        assert!(!accept(&reply(), &opts(true, true)));
        assert!(!accept(&plain(), &opts(true, true)));
    }
}
