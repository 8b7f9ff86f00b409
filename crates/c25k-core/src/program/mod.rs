//! Program catalog: the static table of workouts and its lookups.

mod catalog;
mod workout;

pub use catalog::{
    get_total_duration, get_workout, get_workout_by_id, workout_id, workouts, workouts_for_week,
    DAYS_PER_WEEK, WEEKS,
};
pub use workout::{Interval, IntervalType, Workout, WorkoutId};
