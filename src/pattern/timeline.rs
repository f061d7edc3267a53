//! Timestamped pattern lookup.
//!
//! Long pieces partition their steps across a sequence of patterns, one per
//! timestamp window. The active bucket for a given playback position is the
//! first pattern whose window contains it.

use std::sync::Arc;

use super::Pattern;

/// Width of the timestamp window one pattern covers, in x-offset units
/// (64 units per step, 16 steps per cycle).
pub const DEFAULT_DURATION: u64 = 64 * 16;

/// Find the pattern whose window `[T, T + DEFAULT_DURATION)` contains
/// `timestamp`. Linear scan in list order; the first hit wins.
pub fn find_near_timestamp(patterns: &[Arc<Pattern>], timestamp: u64) -> Option<&Arc<Pattern>> {
    patterns.iter().find(|p| {
        let start = p.timestamp();
        timestamp >= start && timestamp < start + DEFAULT_DURATION
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::store::PatternDim;

    fn pattern_at(timestamp: u64) -> Arc<Pattern> {
        Pattern::new(
            PatternDim {
                bank0: 1,
                bank1: 1,
                steps: 16,
            },
            timestamp,
        )
    }

    #[test]
    fn test_finds_containing_window() {
        let list = vec![pattern_at(0), pattern_at(DEFAULT_DURATION), pattern_at(DEFAULT_DURATION * 2)];

        let hit = find_near_timestamp(&list, DEFAULT_DURATION + 5).unwrap();
        assert_eq!(hit.timestamp(), DEFAULT_DURATION);
    }

    #[test]
    fn test_window_is_half_open() {
        let list = vec![pattern_at(0), pattern_at(DEFAULT_DURATION)];

        // The right edge belongs to the next bucket.
        let hit = find_near_timestamp(&list, DEFAULT_DURATION).unwrap();
        assert_eq!(hit.timestamp(), DEFAULT_DURATION);

        let hit = find_near_timestamp(&list, DEFAULT_DURATION - 1).unwrap();
        assert_eq!(hit.timestamp(), 0);
    }

    #[test]
    fn test_miss_returns_none() {
        let list = vec![pattern_at(0)];
        assert!(find_near_timestamp(&list, DEFAULT_DURATION * 3).is_none());
    }

    #[test]
    fn test_first_hit_wins_on_overlap() {
        let list = vec![pattern_at(0), pattern_at(10)];
        let hit = find_near_timestamp(&list, 12).unwrap();
        assert_eq!(hit.timestamp(), 0);
    }
}
