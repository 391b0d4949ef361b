//! Slot computation.
//!
//! Expands a weekly availability template over a date range and removes every
//! window that is touched by an occupied interval. Free windows are emitted
//! whole: a four-hour window yields one four-hour slot, it is never carved
//! into smaller increments or remainders.

use tracing::trace;

use crate::model::{AvailabilitySlot, BookedInterval, WeeklyAvailabilityWindow};
use crate::time::{DateRange, TimeInterval};

/// Computes the bookable slots for `range`.
///
/// For each date in the range, every window matching the date's day of week
/// with `is_available = true` is tested against `busy`. A window is dropped
/// if any busy interval overlaps it under the half-open test
/// `s1 < e2 && s2 < e1`. Windows are compared as full datetimes on that
/// date, so intervals crossing midnight block the windows they reach.
///
/// The result is ordered by date, then start time, then end time.
pub fn compute_slots(
    windows: &[WeeklyAvailabilityWindow],
    busy: &[BookedInterval],
    range: DateRange,
) -> Vec<AvailabilitySlot> {
    let mut slots = Vec::new();

    for date in range.days() {
        let day = TimeInterval::for_date(date);
        let busy_today: Vec<&BookedInterval> = busy.iter().filter(|b| b.overlaps(&day)).collect();

        for window in windows.iter().filter(|w| w.is_open_on(date)) {
            let Some(interval) = window.interval_on(date) else {
                trace!(window_id = %window.id, %date, "skipping empty window");
                continue;
            };

            if busy_today.iter().any(|b| b.overlaps(&interval)) {
                trace!(window_id = %window.id, %date, "window overlaps busy time");
                continue;
            }

            slots.push(AvailabilitySlot::from_window(date, window));
        }
    }

    slots.sort_by(|a, b| {
        (a.date, a.start_time, a.end_time).cmp(&(b.date, b.start_time, b.end_time))
    });
    slots
}

/// Returns true if `slot` overlaps any busy interval.
pub fn slot_is_blocked(slot: &AvailabilitySlot, busy: &[BookedInterval]) -> bool {
    let interval = slot.interval();
    busy.iter().any(|b| b.overlaps(&interval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(d: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        d.and_time(time(h, m))
    }

    fn window(id: &str, day: u8, start: (u32, u32), end: (u32, u32)) -> WeeklyAvailabilityWindow {
        WeeklyAvailabilityWindow {
            id: id.to_string(),
            provider_id: "p1".to_string(),
            day_of_week: day,
            start_time: time(start.0, start.1),
            end_time: time(end.0, end.1),
            is_available: true,
        }
    }

    // 2025-03-03 is a Monday.
    fn monday() -> NaiveDate {
        date(2025, 3, 3)
    }

    #[test]
    fn free_window_is_emitted_whole() {
        let windows = vec![window("w1", 1, (9, 0), (13, 0))];
        let slots = compute_slots(&windows, &[], DateRange::single(monday()));

        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].date, monday());
        assert_eq!(slots[0].start_time, time(9, 0));
        assert_eq!(slots[0].end_time, time(13, 0));
        assert!(slots[0].is_available);
    }

    #[test]
    fn any_overlap_excludes_whole_window() {
        let windows = vec![window("w1", 1, (9, 0), (12, 0))];
        let busy = vec![BookedInterval::new(
            at(monday(), 10, 0),
            at(monday(), 10, 30),
        )];

        let slots = compute_slots(&windows, &busy, DateRange::single(monday()));
        assert!(slots.is_empty());
    }

    #[test]
    fn touching_interval_does_not_block() {
        let windows = vec![
            window("w1", 1, (9, 0), (10, 0)),
            window("w2", 1, (11, 0), (12, 0)),
        ];
        let busy = vec![BookedInterval::new(at(monday(), 10, 0), at(monday(), 11, 0))];

        let slots = compute_slots(&windows, &busy, DateRange::single(monday()));
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn unavailable_and_other_days_are_ignored() {
        let mut closed = window("w1", 1, (9, 0), (10, 0));
        closed.is_available = false;
        let tuesday = window("w2", 2, (9, 0), (10, 0));

        let slots = compute_slots(&[closed, tuesday], &[], DateRange::single(monday()));
        assert!(slots.is_empty());
    }

    #[test]
    fn busy_on_other_date_does_not_block() {
        let windows = vec![window("w1", 1, (9, 0), (12, 0))];
        let next_monday = date(2025, 3, 10);
        let busy = vec![BookedInterval::new(
            at(next_monday, 10, 0),
            at(next_monday, 11, 0),
        )];

        let slots = compute_slots(&windows, &busy, DateRange::single(monday()));
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn overnight_busy_blocks_next_morning() {
        let windows = vec![window("w1", 2, (0, 0), (1, 0))];
        let busy = vec![BookedInterval::new(
            at(monday(), 23, 30),
            at(date(2025, 3, 4), 0, 30),
        )];

        let range = DateRange::new(monday(), date(2025, 3, 4));
        assert!(compute_slots(&windows, &busy, range).is_empty());
    }

    #[test]
    fn output_is_ordered_by_date_then_time() {
        // Deliberately unsorted input.
        let windows = vec![
            window("late-mon", 1, (14, 0), (15, 0)),
            window("tue", 2, (8, 0), (9, 0)),
            window("early-mon", 1, (9, 0), (10, 0)),
            window("sun", 0, (10, 0), (11, 0)),
        ];
        let range = DateRange::new(date(2025, 3, 2), date(2025, 3, 4));
        let slots = compute_slots(&windows, &[], range);

        let order: Vec<_> = slots.iter().map(|s| (s.date, s.start_time)).collect();
        assert_eq!(
            order,
            vec![
                (date(2025, 3, 2), time(10, 0)),
                (monday(), time(9, 0)),
                (monday(), time(14, 0)),
                (date(2025, 3, 4), time(8, 0)),
            ]
        );
    }

    #[test]
    fn weekly_template_repeats_across_weeks() {
        let windows = vec![window("w1", 1, (9, 0), (10, 0))];
        let range = DateRange::new(monday(), date(2025, 3, 17));
        let slots = compute_slots(&windows, &[], range);
        let dates: Vec<_> = slots.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![monday(), date(2025, 3, 10), date(2025, 3, 17)]);
    }

    #[test]
    fn empty_range_yields_nothing() {
        let windows = vec![window("w1", 1, (9, 0), (10, 0))];
        let range = DateRange::new(date(2025, 3, 10), monday());
        assert!(compute_slots(&windows, &[], range).is_empty());
    }

    #[test]
    fn no_emitted_slot_overlaps_busy_time() {
        let windows: Vec<_> = (0..7u8)
            .flat_map(|day| {
                (8..18u32).step_by(2).map(move |hour| {
                    window(&format!("{day}-{hour}"), day, (hour, 0), (hour + 1, 30))
                })
            })
            .collect();
        let busy: Vec<_> = (0..14i64)
            .map(|i| {
                let start = at(monday(), 7, 45) + chrono::Duration::minutes(i * 517);
                BookedInterval::from_minutes(start, 50)
            })
            .collect();

        let range = DateRange::new(monday(), date(2025, 3, 9));
        let slots = compute_slots(&windows, &busy, range);

        assert!(!slots.is_empty());
        for slot in &slots {
            assert!(!slot_is_blocked(slot, &busy), "slot {slot:?} overlaps busy time");
        }
    }
}
