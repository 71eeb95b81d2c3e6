//! Sliding-window purger: keeps prompt size bounded by stripping
//! heavy, tagged content from older messages while preserving role
//! alternation (the message itself is never removed).

use std::collections::HashSet;

use crate::message::{Message, MessageKind};

/// Parameters for one purge pass.
pub struct PurgeParams<'a> {
    pub tags: HashSet<&'a str>,
    pub message_types: HashSet<MessageKind>,
    pub keep_last: usize,
}

/// Tag-based purge: strips content items whose `tag` is in `params.tags`
/// from every matching message before the cutoff.
///
/// The cutoff is **not** simply "drop everything but the last N messages" —
/// it is the original index of the `keep_last`-th tagged message counting
/// from the end. Messages before that index that are themselves tagged
/// lose their tagged content; everything else (including untagged
/// messages interleaved among them) passes through untouched.
pub fn purge_by_tag(messages: &mut [Message], params: &PurgeParams) {
    let tagged_indices: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| params.message_types.contains(&m.kind()) && m.content().iter().any(|c| c.tag().is_some_and(|t| params.tags.contains(t))))
        .map(|(i, _)| i)
        .collect();

    let cutoff = if tagged_indices.len() > params.keep_last {
        tagged_indices[tagged_indices.len() - params.keep_last]
    } else {
        0
    };

    let tagged_set: HashSet<usize> = tagged_indices.into_iter().collect();

    for (i, message) in messages.iter_mut().enumerate() {
        if i >= cutoff || !tagged_set.contains(&i) {
            continue;
        }
        message.retain_content(|c| !c.tag().is_some_and(|t| params.tags.contains(t)));
    }
}

/// Lifespan purge: independent of tags. Each content item with
/// `lifespan=Some(k)` is stripped once it has appeared in `k` successive
/// appended messages (of any of `message_types`) counting its own message —
/// i.e. it survives this message and `k-1` further ones. `messages` is
/// assumed to already be in append order; `current_count` is the number of
/// user-visible messages appended so far (including the one each item was
/// attached to), tracked by the caller across steps.
pub fn purge_by_lifespan(messages: &mut [Message], message_types: &HashSet<MessageKind>) {
    // Count, for each message index, how many later messages of a tracked
    // kind have been appended since — that is the item's "age" in messages.
    let trackable: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| message_types.contains(&m.kind()))
        .map(|(i, _)| i)
        .collect();

    for (rank, &idx) in trackable.iter().enumerate() {
        let age = (trackable.len() - 1 - rank) as u32; // 0 for the most recent trackable message
        messages[idx].retain_content(|c| !c.lifespan().is_some_and(|lifespan| age >= lifespan));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Content;

    fn observation_message(text: &str) -> Message {
        Message::user(vec![Content::text(text).with_tag("observation").with_lifespan(2)])
    }

    #[test]
    fn purger_window_keeps_only_last_n_tagged() {
        let mut messages: Vec<Message> = (0..5).map(|i| observation_message(&format!("obs{i}"))).collect();

        let mut tags = HashSet::new();
        tags.insert("observation");
        let mut types = HashSet::new();
        types.insert(MessageKind::User);

        purge_by_tag(&mut messages, &PurgeParams { tags, message_types: types, keep_last: 2 });

        let still_tagged: Vec<bool> = messages.iter().map(|m| m.content().iter().any(|c| c.tag() == Some("observation"))).collect();

        assert_eq!(still_tagged, vec![false, false, false, true, true]);
        for m in &messages[0..3] {
            assert!(m.content().is_empty(), "stripped message should have no content items at all, not emptied ones");
        }
    }

    #[test]
    fn purge_bound_never_exceeds_keep_last() {
        let mut messages: Vec<Message> = (0..7).map(|i| observation_message(&format!("obs{i}"))).collect();
        let mut tags = HashSet::new();
        tags.insert("observation");
        let mut types = HashSet::new();
        types.insert(MessageKind::User);

        purge_by_tag(&mut messages, &PurgeParams { tags, message_types: types, keep_last: 3 });

        let remaining_tagged = messages.iter().filter(|m| m.content().iter().any(|c| c.tag() == Some("observation"))).count();
        assert!(remaining_tagged <= 3);
    }

    #[test]
    fn role_is_preserved_for_stripped_messages() {
        let mut messages = vec![observation_message("a"), observation_message("b"), observation_message("c")];
        let mut tags = HashSet::new();
        tags.insert("observation");
        let mut types = HashSet::new();
        types.insert(MessageKind::User);

        purge_by_tag(&mut messages, &PurgeParams { tags, message_types: types, keep_last: 1 });

        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], Message::User { .. }));
    }
}
