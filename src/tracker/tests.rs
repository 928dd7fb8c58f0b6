use std::time::{Duration, Instant};

use super::Token;
use crate::{PendingTracker, Phase};

fn apply_all(t: &PendingTracker<i32>, s: i32) -> i32 {
    t.list().fold(s, |s, m| m.apply(&s))
}

#[test]
fn begin_returns_distinct_tokens() {
    let mut t = PendingTracker::<i32>::new();
    let a = t.begin(|x: &i32| x + 1);
    let b = t.begin(|x: &i32| x + 1);
    assert_ne!(a, b);
    assert!(a < b);
    assert_eq!(t.len(), 2);
}

#[test]
fn list_in_issuance_order() {
    let mut t = PendingTracker::<i32>::new();
    t.begin(|x: &i32| x + 1);
    t.begin(|x: &i32| x * 10);
    t.begin(|x: &i32| x - 3);
    assert_eq!(apply_all(&t, 2), 27);
}

#[test]
fn end_removes_once() {
    let mut t = PendingTracker::<i32>::new();
    let a = t.begin(|x: &i32| x + 1);
    let b = t.begin(|x: &i32| x + 2);

    assert_eq!(t.end(a).map(|m| m.token()), Some(a));
    assert_eq!(t.tokens(), vec![b]);
    assert!(t.end(a).is_none());
    assert_eq!(t.tokens(), vec![b]);
}

#[test]
fn end_unknown_is_noop() {
    let mut t = PendingTracker::<i32>::new();
    let a = t.begin(|x: &i32| x + 1);
    let mut other = PendingTracker::<i32>::new();
    other.begin(|x: &i32| *x);
    let unknown = other.begin(|x: &i32| *x);

    assert!(t.end(unknown).is_none());
    assert_eq!(t.tokens(), vec![a]);
}

#[test]
fn tokens_not_reused_after_end() {
    let mut t = PendingTracker::<i32>::new();
    let a = t.begin(|x: &i32| *x);
    t.end(a);
    let b = t.begin(|x: &i32| *x);
    assert_ne!(a, b);
    assert!(!t.contains(a));
    assert!(t.contains(b));
}

#[test]
fn phase() {
    let mut t = PendingTracker::<i32>::new();
    let a = t.begin(|x: &i32| *x);
    let b = t.begin(|x: &i32| *x);
    let unissued = Token(2);
    assert_eq!(t.phase(a), Some(Phase::Issued));
    assert_eq!(t.phase(unissued), None);

    t.end(a);
    t.retire(b, Phase::Confirmed);
    assert_eq!(t.phase(a), Some(Phase::Reverted));
    assert_eq!(t.phase(b), Some(Phase::Confirmed));
    assert!(t.is_empty());

    assert!(t.confirm_retired(a));
    assert!(!t.confirm_retired(a));
    assert!(!t.confirm_retired(unissued));
    assert_eq!(t.phase(a), Some(Phase::Confirmed));
}

#[test]
fn end_after_confirm_keeps_phase() {
    let mut t = PendingTracker::<i32>::new();
    let a = t.begin(|x: &i32| *x);
    t.retire(a, Phase::Confirmed);
    assert!(t.end(a).is_none());
    assert_eq!(t.phase(a), Some(Phase::Confirmed));
}

#[test]
fn end_middle_keeps_order() {
    let mut t = PendingTracker::<i32>::new();
    t.begin(|x: &i32| x + 1);
    let b = t.begin(|x: &i32| x * 10);
    t.begin(|x: &i32| x - 3);
    t.end(b);
    assert_eq!(apply_all(&t, 2), 0);
}

#[test]
fn list_does_not_mutate() {
    let mut t = PendingTracker::<i32>::new();
    t.begin(|x: &i32| x + 1);
    let _ = t.list().count();
    let _ = t.deltas().count();
    assert_eq!(t.len(), 1);
}

#[test]
fn expired() {
    let mut t = PendingTracker::<i32>::new();
    let now = Instant::now();
    let a = t.begin_at(|x: &i32| *x, now);
    let b = t.begin_at(|x: &i32| *x, now + Duration::from_secs(5));

    assert_eq!(t.expired(now + Duration::from_secs(1)), vec![a]);
    assert_eq!(t.expired(now + Duration::from_secs(5)), vec![a, b]);
    assert_eq!(t.len(), 2);
}

#[test]
fn token_display() {
    let mut t = PendingTracker::<i32>::new();
    let a: Token = t.begin(|x: &i32| *x);
    let b: Token = t.begin(|x: &i32| *x);
    assert_eq!(a.to_string(), "#0");
    assert_eq!(b.to_string(), "#1");
    assert_eq!(format!("{t:?}"), "[Token(0), Token(1)]");
}
