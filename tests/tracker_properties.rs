//! Property-based tests for signal trackers.
//!
//! Random observation sequences (with gaps and missing frames) are replayed
//! through trackers and checked against a straightforward reference count.
//!
//! Run with: cargo test --test tracker_properties

use presence_engine::core::{Signal, SignalTracker, Timestamp};
use proptest::prelude::*;
use std::time::Duration;

// =============================================================================
// Strategies
// =============================================================================

/// One frame: milliseconds since the previous frame and the observation.
fn arb_step() -> impl Strategy<Value = (u64, Option<bool>)> {
    (
        0u64..500,
        prop_oneof![
            2 => Just(None),
            3 => Just(Some(true)),
            3 => Just(Some(false)),
        ],
    )
}

fn arb_sequence() -> impl Strategy<Value = Vec<(u64, Option<bool>)>> {
    prop::collection::vec(arb_step(), 0..200)
}

/// Absolute timestamps for a sequence of steps.
fn timeline(steps: &[(u64, Option<bool>)]) -> Vec<(Timestamp, Option<bool>)> {
    let mut at = 0u64;
    steps
        .iter()
        .map(|(gap, observation)| {
            at += gap;
            (Timestamp::from_millis(at), *observation)
        })
        .collect()
}

/// Reference model: rising edges and closed interval lengths.
fn reference(frames: &[(Timestamp, Option<bool>)]) -> (u64, Duration, Option<Timestamp>) {
    let mut rising = 0;
    let mut total = Duration::ZERO;
    let mut open: Option<Timestamp> = None;

    for (at, observation) in frames {
        match (observation, open) {
            (Some(true), None) => {
                rising += 1;
                open = Some(*at);
            }
            (Some(false), Some(since)) => {
                total += at.saturating_duration_since(since);
                open = None;
            }
            _ => {}
        }
    }
    (rising, total, open)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn transition_count_matches_rising_edges(steps in arb_sequence()) {
        let frames = timeline(&steps);
        let mut tracker = SignalTracker::new(Signal::Hand);
        for (at, observation) in &frames {
            tracker.update(*observation, *at);
        }

        let (rising, _, _) = reference(&frames);
        prop_assert_eq!(tracker.metrics().transition_count, rising);
    }

    #[test]
    fn cumulative_is_sum_of_closed_intervals(steps in arb_sequence()) {
        let frames = timeline(&steps);
        let mut tracker = SignalTracker::new(Signal::BadPosture);
        for (at, observation) in &frames {
            tracker.update(*observation, *at);
        }

        let (rising, total, open) = reference(&frames);
        let metrics = tracker.metrics();
        prop_assert_eq!(metrics.cumulative_active, total);
        prop_assert_eq!(metrics.active_since, open);

        let closed = rising - u64::from(open.is_some());
        let summary = tracker.intervals();
        prop_assert_eq!(summary.count(), closed);
        prop_assert_eq!(summary.total(), metrics.cumulative_active);
        prop_assert!(summary.longest() <= summary.total());
    }

    #[test]
    fn absent_observations_never_change_presence(steps in arb_sequence()) {
        let frames = timeline(&steps);
        let mut tracker = SignalTracker::new(Signal::NotFacing);

        for (at, observation) in &frames {
            let before = tracker.is_active();
            let update = tracker.update(*observation, *at);
            if observation.is_none() {
                prop_assert!(!update.transitioned);
                prop_assert_eq!(update.presence, before);
            }
            prop_assert_eq!(update.presence, tracker.is_active());
        }
    }

    #[test]
    fn counters_never_decrease(steps in arb_sequence()) {
        let frames = timeline(&steps);
        let mut tracker = SignalTracker::new(Signal::Hand);
        let mut last = tracker.metrics();

        for (at, observation) in &frames {
            tracker.update(*observation, *at);
            let current = tracker.metrics();
            prop_assert!(current.transition_count >= last.transition_count);
            prop_assert!(current.cumulative_active >= last.cumulative_active);
            last = current;
        }
    }

    #[test]
    fn independent_trackers_agree(steps in arb_sequence()) {
        let frames = timeline(&steps);
        let mut first = SignalTracker::new(Signal::Hand);
        let mut second = SignalTracker::new(Signal::Hand);

        for (at, observation) in &frames {
            let a = first.update(*observation, *at);
            let b = second.update(*observation, *at);
            prop_assert_eq!(a, b);
        }
        prop_assert_eq!(first.metrics(), second.metrics());
    }

    #[test]
    fn finalize_closes_the_open_interval(steps in arb_sequence(), tail in 0u64..1_000) {
        let frames = timeline(&steps);
        let mut tracker = SignalTracker::new(Signal::Hand);
        for (at, observation) in &frames {
            tracker.update(*observation, *at);
        }

        let end = frames
            .last()
            .map(|(at, _)| *at)
            .unwrap_or(Timestamp::ZERO)
            .saturating_add(Duration::from_millis(tail));
        let (_, total, open) = reference(&frames);

        let closed = tracker.finalize(end);
        let expected = open.map(|since| end.saturating_duration_since(since));
        prop_assert_eq!(closed, expected);
        prop_assert_eq!(
            tracker.metrics().cumulative_active,
            total + expected.unwrap_or_default()
        );
        prop_assert!(!tracker.is_active());
        prop_assert_eq!(tracker.finalize(end), None);
    }
}
