//! Queue handler integration tests
//!
//! Segment bookkeeping across longer operation sequences: user queue
//! consumption, context splicing, addressing and context naming.

use cadence_playback::{
    PlayContext, PlayQueueHandler, Playable, PlaybackError, PlayerIndex, QueueSegment,
    MIXED_CONTEXT_NAME,
};
use std::time::Duration;

// ===== Test Helpers =====

fn create_track(id: &str) -> Playable {
    Playable::song(id, format!("Track {id}"), Duration::from_secs(200))
}

fn create_tracks(ids: &[&str]) -> Vec<Playable> {
    ids.iter().map(|id| create_track(id)).collect()
}

fn album(count: usize) -> Vec<Playable> {
    (1..=count).map(|i| create_track(&format!("a{i}"))).collect()
}

fn ids(items: &[Playable]) -> Vec<String> {
    items.iter().map(|p| p.id.clone()).collect()
}

fn current_id(queue: &PlayQueueHandler) -> Option<String> {
    queue.current().map(|p| p.id.clone())
}

// ===== Building =====

#[test]
fn test_context_then_user_insertions() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(4)));

    // "Play next" twice: the second insertion goes first
    queue.insert_user_queue(create_tracks(&["u1"]));
    queue.insert_user_queue(create_tracks(&["u2"]));
    // "Play later"
    queue.append_user_queue(create_tracks(&["u3"]));

    assert_eq!(ids(queue.user_queue()), ["u2", "u1", "u3"]);
    assert_eq!(queue.context_name(), "Album");

    let mut played = vec![current_id(&queue).unwrap()];
    while queue.advance() {
        played.push(current_id(&queue).unwrap());
    }
    assert_eq!(played, ["a1", "u2", "u1", "u3", "a2", "a3", "a4"]);
    assert_eq!(ids(queue.previous()), ["a1", "a2", "a3"]);
}

#[test]
fn test_context_splicing_marks_mixed() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(3)).starting_at(1));

    queue.insert_context_queue(create_tracks(&["x1", "x2"]));
    queue.append_context_queue(create_tracks(&["y1"]));

    assert_eq!(ids(queue.next_queue()), ["x1", "x2", "a3", "y1"]);
    assert_eq!(current_id(&queue).as_deref(), Some("a2"));
    assert_eq!(queue.context_name(), MIXED_CONTEXT_NAME);
}

#[test]
fn test_user_insertions_keep_context_name() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(3)));
    queue.append_user_queue(create_tracks(&["u1"]));
    assert_eq!(queue.context_name(), "Album");
}

#[test]
fn test_new_context_keeps_user_queue() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(3)));
    queue.append_user_queue(create_tracks(&["u1"]));

    queue.apply_context(PlayContext::new("Other", create_tracks(&["o1", "o2"])));
    assert_eq!(ids(queue.user_queue()), ["u1"]);
    assert_eq!(current_id(&queue).as_deref(), Some("o1"));
    assert_eq!(queue.context_name(), "Other");
}

#[test]
fn test_context_name_empty_when_only_user_item_plays() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(2)));
    queue.append_user_queue(create_tracks(&["u1"]));
    queue.advance();

    assert!(!queue.clear_context_queue());
    assert_eq!(queue.context_name(), "");
    assert_eq!(current_id(&queue).as_deref(), Some("u1"));
}

// ===== Addressing =====

#[test]
fn test_get_playable_per_segment() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(5)).starting_at(2));
    queue.append_user_queue(create_tracks(&["u1"]));

    assert_eq!(queue.get_playable(PlayerIndex::previous(1)).unwrap().id, "a2");
    assert_eq!(queue.get_playable(PlayerIndex::user(0)).unwrap().id, "u1");
    assert_eq!(queue.get_playable(PlayerIndex::next(1)).unwrap().id, "a5");
}

#[test]
fn test_get_playable_out_of_range() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(3)));

    match queue.get_playable(PlayerIndex::user(0)) {
        Err(PlaybackError::IndexOutOfRange {
            segment: QueueSegment::User,
            offset: 0,
            len: 0,
        }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_remove_playable_leaves_current() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(5)).starting_at(2));

    let removed = queue.remove_playable(PlayerIndex::next(0)).unwrap();
    assert_eq!(removed.id, "a4");
    assert_eq!(current_id(&queue).as_deref(), Some("a3"));
    assert_eq!(ids(queue.next_queue()), ["a5"]);

    assert!(queue.remove_playable(PlayerIndex::previous(5)).is_err());
}

#[test]
fn test_move_user_item_into_context() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(3)));
    queue.append_user_queue(create_tracks(&["u1", "u2"]));

    queue
        .move_playable(PlayerIndex::user(1), PlayerIndex::previous(0))
        .unwrap();

    assert_eq!(ids(queue.previous()), ["u2"]);
    assert_eq!(ids(queue.user_queue()), ["u1"]);
    assert_eq!(queue.context_name(), MIXED_CONTEXT_NAME);
}

#[test]
fn test_move_within_user_queue() {
    let mut queue = PlayQueueHandler::new();
    queue.append_user_queue(create_tracks(&["u1", "u2", "u3"]));

    queue
        .move_playable(PlayerIndex::user(2), PlayerIndex::user(0))
        .unwrap();
    assert_eq!(ids(queue.user_queue()), ["u3", "u1", "u2"]);
}

// ===== Order View =====

#[test]
fn test_context_order_reconstructs_context() {
    let items = album(6);
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", items.clone()).starting_at(3));
    queue.append_user_queue(create_tracks(&["u1"]));

    for _ in 0..2 {
        queue.advance();
    }
    queue.retreat();

    let order: Vec<Playable> = queue.context_order().into_iter().cloned().collect();
    assert_eq!(order, items);
}

#[test]
fn test_remove_current_with_user_queue_playing_is_by_order() {
    let mut queue = PlayQueueHandler::new();
    queue.apply_context(PlayContext::new("Album", album(3)));
    queue.append_user_queue(create_tracks(&["u1"]));
    queue.advance();

    // Order 1 is now the head of `next`, the user item is not in the order
    let removal = queue.remove_at_order(1).unwrap();
    assert!(!removal.displaced_current);
    assert_eq!(removal.removed.id, "a2");
    assert_eq!(current_id(&queue).as_deref(), Some("u1"));
}

// ===== Restoration =====

#[test]
fn test_from_parts_with_previous_pointer() {
    let (queue, restored) = PlayQueueHandler::from_parts(
        "Album".to_string(),
        album(3),
        Vec::new(),
        Vec::new(),
        Some(PlayerIndex::previous(1)),
    );

    assert!(restored);
    assert_eq!(current_id(&queue).as_deref(), Some("a2"));
    assert_eq!(ids(queue.previous()), ["a1"]);
    assert_eq!(ids(queue.next_queue()), ["a3"]);
}

#[test]
fn test_from_parts_without_pointer() {
    let (queue, restored) =
        PlayQueueHandler::from_parts(String::new(), Vec::new(), album(2), Vec::new(), None);
    assert!(!restored);
    assert!(queue.current().is_none());
    assert_eq!(queue.user_queue().len(), 2);
}
