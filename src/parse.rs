use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;

/// Largest accepted points value either way (1,000,000 kcal).
pub const MAX_POINTS: i64 = 10_000;

/// Parse a points value. Decimal input is truncated toward zero.
pub fn parse_points(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("Points are required");
    }
    let points = match trimmed.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            let value: f64 = trimmed
                .parse()
                .map_err(|_| anyhow!("Invalid points value: {:?}", input))?;
            if !value.is_finite() {
                bail!("Invalid points value: {:?}", input);
            }
            value.trunc() as i64
        }
    };
    if !(-MAX_POINTS..=MAX_POINTS).contains(&points) {
        bail!(
            "Points must be between {} and {}, got {}",
            -MAX_POINTS,
            MAX_POINTS,
            trimmed
        );
    }
    Ok(points)
}

/// Parse a body weight in kg.
pub fn parse_weight(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("Weight is required");
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| anyhow!("Invalid weight: {:?}", input))?;
    if !value.is_finite() || value <= 0.0 {
        bail!("Invalid weight: {:?}", input);
    }
    Ok(value)
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date {:?}, expected YYYY-MM-DD", input))
}
