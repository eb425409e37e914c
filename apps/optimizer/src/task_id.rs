//! Task ID generation.
//!
//! An ID is the local wall-clock time to the second (`YYYYMMDDHHMMSS`) followed by
//! an 8-digit zero-padded counter. The counter restarts at zero whenever the hour
//! changes and wraps to zero once it reaches `COUNTER_LIMIT`, even mid-hour.
//!
//! Known limitation: a wrap inside a single second can reissue an ID. At fewer than
//! 10^8 requests per hour this cannot happen.

use std::sync::{Mutex, PoisonError};

use chrono::{Local, NaiveDateTime};

const COUNTER_LIMIT: u32 = 99_999_999;
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const HOUR_FORMAT: &str = "%Y%m%d%H";

/// Length of a generated ID: 14 timestamp digits + 8 counter digits.
pub const TASK_ID_LEN: usize = 22;

#[derive(Debug)]
struct CounterState {
    counter: u32,
    current_hour: String,
}

/// Issues task IDs. Safe to share across request handlers; the counter and the
/// hour marker are only touched under one lock.
#[derive(Debug)]
pub struct TaskIdGenerator {
    state: Mutex<CounterState>,
}

impl Default for TaskIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(Local::now().naive_local())
    }

    fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            state: Mutex::new(CounterState {
                counter: 0,
                current_hour: now.format(HOUR_FORMAT).to_string(),
            }),
        }
    }

    pub fn generate_task_id(&self) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // Clock is read under the lock so prefixes never go backwards between callers.
        next_id(&mut state, Local::now().naive_local())
    }

    #[cfg(test)]
    fn generate_at(&self, now: NaiveDateTime) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        next_id(&mut state, now)
    }
}

fn next_id(state: &mut CounterState, now: NaiveDateTime) -> String {
    let hour = now.format(HOUR_FORMAT).to_string();
    if hour != state.current_hour || state.counter >= COUNTER_LIMIT {
        state.counter = 0;
        state.current_hour = hour;
    }

    let number = state.counter;
    state.counter += 1;

    format!("{}{:08}", now.format(TIMESTAMP_FORMAT), number)
}

/// True if `candidate` has the shape of an ID this generator could have issued.
pub fn is_well_formed(candidate: &str) -> bool {
    candidate.len() == TASK_ID_LEN && candidate.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn suffix(id: &str) -> u32 {
        id[14..].parse().unwrap()
    }

    #[test]
    fn test_id_is_timestamp_plus_padded_counter() {
        let gen = TaskIdGenerator::starting_at(at(12, 0, 0));
        let id = gen.generate_at(at(12, 0, 0));
        assert_eq!(id, "2025010112000000000000");
        assert_eq!(id.len(), TASK_ID_LEN);
        assert!(is_well_formed(&id));
    }

    #[test]
    fn test_back_to_back_suffixes_differ_by_one() {
        let gen = TaskIdGenerator::starting_at(at(9, 15, 0));
        let first = gen.generate_at(at(9, 15, 3));
        let second = gen.generate_at(at(9, 15, 3));
        assert_ne!(first, second);
        assert_eq!(suffix(&second), suffix(&first) + 1);
    }

    #[test]
    fn test_counter_resets_when_hour_advances() {
        let gen = TaskIdGenerator::starting_at(at(10, 0, 0));
        gen.generate_at(at(10, 59, 58));
        gen.generate_at(at(10, 59, 59));
        let next_hour = gen.generate_at(at(11, 0, 0));
        assert_eq!(&next_hour[..14], "20250101110000");
        assert_eq!(suffix(&next_hour), 0);
    }

    #[test]
    fn test_prefixes_never_decrease_across_hour_change() {
        let gen = TaskIdGenerator::starting_at(at(10, 59, 0));
        let ids: Vec<String> = [
            at(10, 59, 58),
            at(10, 59, 58),
            at(10, 59, 59),
            at(11, 0, 0),
            at(11, 0, 0),
            at(11, 0, 1),
        ]
        .into_iter()
            .map(|now| gen.generate_at(now))
            .collect();

        for pair in ids.windows(2) {
            assert!(pair[0][..14] <= pair[1][..14], "{} then {}", pair[0], pair[1]);
        }
        assert_eq!(suffix(&ids[3]), 0);
        assert_eq!(suffix(&ids[4]), 1);
    }

    #[test]
    fn test_live_prefixes_never_decrease() {
        let gen = TaskIdGenerator::new();
        let ids: Vec<String> = (0..500).map(|_| gen.generate_task_id()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0][..14] <= pair[1][..14], "{} then {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_counter_does_not_reset_within_the_hour() {
        let gen = TaskIdGenerator::starting_at(at(10, 0, 0));
        gen.generate_at(at(10, 0, 1));
        let later = gen.generate_at(at(10, 45, 0));
        assert_eq!(suffix(&later), 1);
    }

    #[test]
    fn test_counter_wraps_at_limit_mid_hour() {
        let gen = TaskIdGenerator::starting_at(at(8, 0, 0));
        gen.state.lock().unwrap().counter = COUNTER_LIMIT - 1;

        let last = gen.generate_at(at(8, 30, 0));
        assert_eq!(suffix(&last), COUNTER_LIMIT - 1);

        let wrapped = gen.generate_at(at(8, 30, 0));
        assert_eq!(suffix(&wrapped), 0);
    }

    #[test]
    fn test_concurrent_callers_never_collide() {
        let gen = TaskIdGenerator::new();
        let ids: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..250)
                            .map(|_| gen.generate_task_id())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), 2000);
        assert_eq!(unique.len(), 2000, "task ids must be unique");
    }

    #[test]
    fn test_is_well_formed_rejects_bad_shapes() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("20250101120000"));
        assert!(!is_well_formed("2025010112000000000a00"));
        assert!(!is_well_formed("20250101120000000000001"));
    }
}
