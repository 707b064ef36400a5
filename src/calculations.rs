//! Energy-balance formulas. Everything here is pure.

use chrono::NaiveDate;

use crate::models::Gender;

/// Sedentary activity multiplier applied to BMR. Fixed.
pub const SEDENTARY_FACTOR: f64 = 1.2;

/// Energy density of body mass (kcal per kg).
pub const KCAL_PER_KG: f64 = 7700.0;

/// kcal per logged point.
pub const KCAL_PER_POINT: i64 = 100;

/// Mifflin-St Jeor basal metabolic rate.
/// Weight in kg, height in cm, age in years.
pub fn calculate_bmr(weight: f64, height: f64, age: f64, gender: Gender) -> f64 {
    let s = match gender {
        Gender::Female => -161.0,
        Gender::Male => 5.0,
    };
    10.0 * weight + 6.25 * height - 5.0 * age + s
}

/// Sedentary TDEE, rounded to whole kcal.
pub fn calculate_tdee(weight: f64, height: f64, age: f64, gender: Gender) -> i64 {
    (calculate_bmr(weight, height, age, gender) * SEDENTARY_FACTOR).round() as i64
}

/// Positive is a deficit, negative a surplus.
pub fn calculate_daily_deficit(tdee: i64, consumed_calories: i64) -> i64 {
    tdee.saturating_sub(consumed_calories)
}

pub fn calculate_projected_weight(current_weight: f64, daily_deficit: f64, days: i64) -> f64 {
    let total_deficit = daily_deficit * days as f64;
    current_weight - total_deficit / KCAL_PER_KG
}

/// Weight on the straight line from (`start`, `start_weight`) to
/// (`target`, `target_weight`) at `query`, clamped to the endpoints.
pub fn get_linear_goal_weight(
    start: NaiveDate,
    start_weight: f64,
    target: NaiveDate,
    target_weight: f64,
    query: NaiveDate,
) -> f64 {
    if query <= start {
        return start_weight;
    }
    if query >= target {
        return target_weight;
    }

    let total = (target - start).num_milliseconds() as f64;
    let elapsed = (query - start).num_milliseconds() as f64;
    let progress = elapsed / total;

    start_weight - (start_weight - target_weight) * progress
}

pub fn points_to_calories(points: i64) -> i64 {
    points.saturating_mul(KCAL_PER_POINT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn bmr_reference_profile() {
        let bmr = calculate_bmr(88.0, 175.0, 30.0, Gender::Male);
        assert!((bmr - 1879.75).abs() < 1e-9);
        assert_eq!(calculate_tdee(88.0, 175.0, 30.0, Gender::Male), 2256);
    }

    #[test]
    fn female_constant_shifts_by_166() {
        let m = calculate_bmr(70.0, 165.0, 40.0, Gender::Male);
        let f = calculate_bmr(70.0, 165.0, 40.0, Gender::Female);
        assert!((m - f - 166.0).abs() < 1e-9);
    }

    #[test]
    fn bmr_is_linear() {
        let base = calculate_bmr(80.0, 170.0, 30.0, Gender::Male);
        assert!((calculate_bmr(81.0, 170.0, 30.0, Gender::Male) - base - 10.0).abs() < 1e-9);
        assert!((calculate_bmr(80.0, 171.0, 30.0, Gender::Male) - base - 6.25).abs() < 1e-9);
        assert!((calculate_bmr(80.0, 170.0, 31.0, Gender::Male) - base + 5.0).abs() < 1e-9);
    }

    #[test]
    fn tdee_matches_rounded_bmr() {
        for (w, h, a) in [(60.5, 160.0, 25.0), (95.2, 188.0, 51.0), (72.0, 171.0, 19.0)] {
            for g in [Gender::Male, Gender::Female] {
                let expected = (calculate_bmr(w, h, a, g) * 1.2).round() as i64;
                assert_eq!(calculate_tdee(w, h, a, g), expected);
            }
        }
    }

    #[test]
    fn deficit_and_projection() {
        assert_eq!(calculate_daily_deficit(2256, 1800), 456);
        let projected = calculate_projected_weight(88.0, 456.0, 30);
        assert!((projected - 86.2234).abs() < 1e-3);
        assert_eq!(calculate_projected_weight(88.0, 456.0, 0), 88.0);
    }

    #[test]
    fn huge_points_saturate() {
        assert_eq!(points_to_calories(i64::MAX / 2), i64::MAX);
        assert_eq!(points_to_calories(i64::MIN / 2), i64::MIN);
        assert_eq!(calculate_daily_deficit(2256, i64::MIN), i64::MAX);
    }

    #[test]
    fn goal_line_clamps_and_interpolates() {
        let start = date(2026, 1, 1);
        let target = date(2026, 1, 11);
        assert_eq!(get_linear_goal_weight(start, 90.0, target, 80.0, start), 90.0);
        assert_eq!(get_linear_goal_weight(start, 90.0, target, 80.0, target), 80.0);
        assert_eq!(get_linear_goal_weight(start, 90.0, target, 80.0, date(2025, 12, 1)), 90.0);
        assert_eq!(get_linear_goal_weight(start, 90.0, target, 80.0, date(2026, 2, 1)), 80.0);
        let mid = get_linear_goal_weight(start, 90.0, target, 80.0, date(2026, 1, 6));
        assert!((mid - 85.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_range_clamps_to_start() {
        let start = date(2026, 3, 1);
        let target = date(2026, 2, 1);
        assert_eq!(get_linear_goal_weight(start, 90.0, target, 80.0, date(2026, 2, 15)), 90.0);
    }
}
