//! Replays a short synthetic session and prints the metrics after each frame.
//!
//! Run with: cargo run --example replay_demo

use presence_engine::core::{GeometricClassifier, ManualClock, Signal, Timestamp};
use presence_engine::source::{Detection, Landmark, PerceptionFrame};
use presence_engine::{Config, FrameLoop};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let mut frame_loop = FrameLoop::new(ManualClock::new(), GeometricClassifier::new(), &config)?;

    // Hand visible on frames 3-5 and 8, 100ms apart.
    let pattern = [false, false, true, true, true, false, false, true];
    let mut last = Timestamp::ZERO;

    for (i, visible) in pattern.iter().enumerate() {
        let landmarks = if *visible {
            vec![vec![Landmark::at(0.5, 0.5); 21]]
        } else {
            Vec::new()
        };
        let frame = PerceptionFrame::empty().with_hand(Detection::Detected { landmarks });

        last = Timestamp::from_millis(i as u64 * 100);
        let snapshot = frame_loop.tick_at(Some(&frame), last);
        let hand = snapshot.metrics(Signal::Hand);
        println!(
            "frame {}: hand={} count={} total={}ms",
            i + 1,
            snapshot.presence(Signal::Hand),
            hand.transition_count,
            hand.cumulative_active.as_millis()
        );
    }

    let end = last.saturating_add(std::time::Duration::from_millis(100));
    let snapshot = frame_loop.finish_at(end);
    println!();
    println!("{}", serde_json::to_string_pretty(&snapshot.analytics())?);

    Ok(())
}
