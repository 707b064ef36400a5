//! Derived views for the presentation layer: the goal/actual/projected
//! weight series, per-day deficit breakdowns and the current-day gauge.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::calculations::*;
use crate::models::*;

const MS_PER_DAY: f64 = 86_400_000.0;

/// One day of the trajectory chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub date: NaiveDate,
    /// Straight-line goal weight
    pub goal: f64,
    /// Logged weight, if a log exists for this date
    pub actual: Option<f64>,
    /// Projected weight from the average deficit so far
    pub projected: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
    /// kcal per day since the plan started
    pub average_daily_deficit: f64,
    /// Date the projection is anchored on
    pub projection_start: NaiveDate,
    pub projection_start_weight: f64,
}

/// Deficit figures for one logged day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBreakdown {
    pub date: NaiveDate,
    pub calories: i64,
    pub tdee: i64,
    pub deficit: i64,
    pub band: DeficitBand,
}

/// Running totals for the day being logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGauge {
    pub total_points: i64,
    pub calories: i64,
    pub tdee: i64,
    pub deficit: i64,
    /// `None` when colour coding is turned off
    pub band: Option<DeficitBand>,
}

fn profile_tdee(profile: &Profile, weight: f64) -> i64 {
    calculate_tdee(
        weight,
        f64::from(profile.height),
        f64::from(profile.age),
        profile.gender,
    )
}

fn plan_logs<'a>(profile: &'a Profile, logs: &'a [DailyLog]) -> impl Iterator<Item = &'a DailyLog> {
    logs.iter().filter(move |l| l.date >= profile.start_date)
}

/// Average kcal deficit per wall-clock day between the plan start (midnight
/// UTC) and `now`. Each log counts TDEE at the current weight minus its
/// intake. Zero when `now` is not after the start.
pub fn average_daily_deficit(profile: &Profile, logs: &[DailyLog], now: DateTime<Utc>) -> f64 {
    let tdee = profile_tdee(profile, profile.current_weight);
    let total: f64 = plan_logs(profile, logs)
        .map(|l| calculate_daily_deficit(tdee, l.calories()) as f64)
        .sum();

    let start = Utc.from_utc_datetime(&profile.start_date.and_time(NaiveTime::MIN));
    let days_elapsed = (now - start).num_milliseconds() as f64 / MS_PER_DAY;

    if days_elapsed > 0.0 {
        total / days_elapsed
    } else {
        0.0
    }
}

/// Build the day-by-day series from the plan's start date to its target
/// date inclusive.
///
/// Days without a log have no actual weight; gaps are not interpolated.
/// The projection starts at the most recent log on or after the start date
/// (or at the start date with the base weight when there is none) and has
/// no value before that day.
pub fn build_trajectory(profile: &Profile, logs: &[DailyLog], now: DateTime<Utc>) -> Trajectory {
    let average = average_daily_deficit(profile, logs, now);

    let (anchor_date, anchor_weight) = match plan_logs(profile, logs).max_by_key(|l| l.date) {
        Some(last) => (last.date, last.weight.unwrap_or(profile.current_weight)),
        None => (profile.start_date, profile.base_weight),
    };

    let points = profile
        .start_date
        .iter_days()
        .take_while(|d| *d <= profile.target_date)
        .map(|date| {
            let goal = get_linear_goal_weight(
                profile.start_date,
                profile.base_weight,
                profile.target_date,
                profile.target_weight,
                date,
            );
            let actual = logs.iter().find(|l| l.date == date).and_then(|l| l.weight);
            let offset = (date - anchor_date).num_days();
            let projected = (offset >= 0)
                .then(|| calculate_projected_weight(anchor_weight, average, offset));

            TrajectoryPoint {
                date,
                goal,
                actual,
                projected,
            }
        })
        .collect();

    Trajectory {
        points,
        average_daily_deficit: average,
        projection_start: anchor_date,
        projection_start_weight: anchor_weight,
    }
}

/// Intake, TDEE and deficit for a logged day. TDEE uses the log's own
/// weight, or the current weight when the log has none.
pub fn day_breakdown(log: &DailyLog, profile: &Profile, settings: &Settings) -> DayBreakdown {
    let weight = log.weight.unwrap_or(profile.current_weight);
    let tdee = profile_tdee(profile, weight);
    let calories = log.calories();
    let deficit = calculate_daily_deficit(tdee, calories);

    DayBreakdown {
        date: log.date,
        calories,
        tdee,
        deficit,
        band: settings.classify(deficit),
    }
}

pub fn current_day_gauge(state: &AppState) -> DayGauge {
    let total_points = state.current_day.total_points();
    let calories = points_to_calories(total_points);
    let tdee = profile_tdee(&state.profile, state.profile.current_weight);
    let deficit = calculate_daily_deficit(tdee, calories);

    DayGauge {
        total_points,
        calories,
        tdee,
        deficit,
        band: state
            .settings
            .use_color_coding
            .then(|| state.settings.classify(deficit)),
    }
}

/// Logs for the history view, newest first.
pub fn history_newest_first(logs: &[DailyLog]) -> Vec<&DailyLog> {
    let mut sorted: Vec<&DailyLog> = logs.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}
