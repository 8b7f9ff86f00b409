//! The fixed 9-week program.
//!
//! Every day opens with a 5-minute warmup walk and closes with a 5-minute
//! cooldown walk. Weeks 1-4 and 7-9 repeat the same day three times;
//! weeks 5 and 6 build up across the week.

use std::sync::OnceLock;

use super::workout::{Interval, IntervalType, Workout, WorkoutId};

pub const WEEKS: u32 = 9;
pub const DAYS_PER_WEEK: u32 = 3;

const WARMUP_SECS: u64 = 300;
const COOLDOWN_SECS: u64 = 300;

use IntervalType::{Run, Walk};

/// All workouts in program order (W1D1, W1D2, ... W9D3).
pub fn workouts() -> &'static [Workout] {
    static PROGRAM: OnceLock<Vec<Workout>> = OnceLock::new();
    PROGRAM.get_or_init(build_program)
}

pub fn workout_id(week: u32, day: u32) -> String {
    WorkoutId::new(week, day).to_string()
}

/// Look up a workout by its `W{week}D{day}` id.
///
/// Returns `None` for malformed ids and for ids outside the program.
pub fn get_workout_by_id(id: &str) -> Option<&'static Workout> {
    let id: WorkoutId = id.parse().ok()?;
    get_workout(id)
}

pub fn get_workout(id: WorkoutId) -> Option<&'static Workout> {
    workouts().iter().find(|w| w.id() == id)
}

pub fn get_total_duration(workout: &Workout) -> u64 {
    workout.total_duration_secs()
}

pub fn workouts_for_week(week: u32) -> impl Iterator<Item = &'static Workout> {
    workouts().iter().filter(move |w| w.week == week)
}

fn build_program() -> Vec<Workout> {
    let mut program = Vec::with_capacity((WEEKS * DAYS_PER_WEEK) as usize);
    for week in 1..=WEEKS {
        for day in 1..=DAYS_PER_WEEK {
            program.push(Workout {
                week,
                day,
                intervals: wrap(main_set(week, day)),
            });
        }
    }
    program
}

/// The run/walk body of a day, without warmup and cooldown.
fn main_set(week: u32, day: u32) -> Vec<(IntervalType, u64)> {
    match (week, day) {
        // 60s run / 90s walk x 8
        (1, _) => repeat(60, 90, 8),
        // 90s run / 2min walk x 6
        (2, _) => repeat(90, 120, 6),
        (3, _) => vec![
            (Run, 90),
            (Walk, 90),
            (Run, 180),
            (Walk, 180),
            (Run, 90),
            (Walk, 90),
            (Run, 180),
        ],
        (4, _) => vec![
            (Run, 180),
            (Walk, 90),
            (Run, 300),
            (Walk, 150),
            (Run, 180),
            (Walk, 90),
            (Run, 300),
        ],
        (5, 1) => vec![(Run, 300), (Walk, 180), (Run, 300), (Walk, 180), (Run, 300)],
        (5, 2) => vec![(Run, 480), (Walk, 300), (Run, 480)],
        (5, _) => vec![(Run, 1200)],
        (6, 1) => vec![(Run, 300), (Walk, 180), (Run, 480), (Walk, 180), (Run, 300)],
        (6, 2) => vec![(Run, 600), (Walk, 180), (Run, 600)],
        (6, _) => vec![(Run, 1500)],
        (7, _) => vec![(Run, 1500)],
        (8, _) => vec![(Run, 1680)],
        _ => vec![(Run, 1800)],
    }
}

/// `reps` runs separated by walks; the set ends on a run.
fn repeat(run: u64, walk: u64, reps: usize) -> Vec<(IntervalType, u64)> {
    let mut set = Vec::with_capacity(reps * 2);
    for i in 0..reps {
        if i > 0 {
            set.push((Walk, walk));
        }
        set.push((Run, run));
    }
    set
}

fn wrap(set: Vec<(IntervalType, u64)>) -> Vec<Interval> {
    std::iter::once(Interval::new(IntervalType::Warmup, WARMUP_SECS))
        .chain(set.into_iter().map(|(t, d)| Interval::new(t, d)))
        .chain(std::iter::once(Interval::new(IntervalType::Cooldown, COOLDOWN_SECS)))
        .collect()
}
