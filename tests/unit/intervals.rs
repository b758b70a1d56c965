//! Interval generator partition properties

use trade_history_ingestor::ingest::intervals::SECONDS_PER_DAY;
use trade_history_ingestor::ingest::{generate_intervals, DayInterval};

/// Union of the intervals equals the requested range, with no gaps or
/// overlaps and every width within one day, across a spread of ranges.
#[test]
fn test_partition_properties_over_many_ranges() {
    let cases = [
        (0, 1),
        (0, SECONDS_PER_DAY),
        (0, SECONDS_PER_DAY + 1),
        (0, SECONDS_PER_DAY - 1),
        (1_577_836_800, 1_577_836_800 + 365 * SECONDS_PER_DAY),
        (1_700_000_000, 1_700_000_000 + 17 * SECONDS_PER_DAY + 12_345),
        (-SECONDS_PER_DAY, SECONDS_PER_DAY),
    ];

    for (start, end) in cases {
        let intervals = generate_intervals(start, end);
        assert!(!intervals.is_empty(), "({start}, {end})");

        assert_eq!(intervals.first().unwrap().start, start);
        assert_eq!(intervals.last().unwrap().end, end);

        let mut covered = 0;
        for interval in &intervals {
            assert!(interval.width() > 0);
            assert!(interval.width() <= SECONDS_PER_DAY);
            covered += interval.width();
        }
        assert_eq!(covered, end - start);

        for pair in intervals.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "gap or overlap in ({start}, {end})");
        }

        // Only the final interval may be partial
        for interval in &intervals[..intervals.len() - 1] {
            assert_eq!(interval.width(), SECONDS_PER_DAY);
        }
    }
}

#[test]
fn test_degenerate_ranges_yield_empty() {
    assert!(generate_intervals(0, 0).is_empty());
    assert!(generate_intervals(100, 100).is_empty());
    assert!(generate_intervals(100, 99).is_empty());
    assert!(generate_intervals(i64::MAX, i64::MIN).is_empty());
}

#[test]
fn test_every_second_belongs_to_exactly_one_interval() {
    let start = 1_700_000_000;
    let end = start + 3 * SECONDS_PER_DAY + 777;
    let intervals = generate_intervals(start, end);

    for ts in [start, start + 1, start + SECONDS_PER_DAY, end - 1] {
        let owners: Vec<&DayInterval> =
            intervals.iter().filter(|i| i.contains(ts)).collect();
        assert_eq!(owners.len(), 1, "timestamp {ts} owned by {} intervals", owners.len());
    }

    // The exclusive end belongs to none
    assert!(!intervals.iter().any(|i| i.contains(end)));
}

#[test]
fn test_display_is_human_readable() {
    let interval = DayInterval {
        start: 1_577_836_800,
        end: 1_577_923_200,
    };
    let text = interval.to_string();
    assert!(text.contains("2020-01-01"));
    assert!(text.contains("2020-01-02"));
}
