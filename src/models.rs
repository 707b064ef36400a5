use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Biological sex used for the metabolic constant.
///
/// Only `"female"` selects the female constant; every other value falls back
/// to the male/default one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        if tag == "female" {
            Gender::Female
        } else {
            Gender::Male
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Gender::from_tag(&tag))
    }
}

/// The user's body metrics and plan. Fields missing from a stored
/// snapshot take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    /// Age in years
    pub age: u32,
    /// Height in cm
    pub height: u32,
    /// Weight in kg at plan start
    pub base_weight: f64,
    /// Most recently known weight in kg
    pub current_weight: f64,
    /// Goal weight in kg
    pub target_weight: f64,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub gender: Gender,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            age: 30,
            height: 175,
            base_weight: 88.0,
            current_weight: 88.0,
            target_weight: 80.0,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap_or_default(),
            target_date: NaiveDate::from_ymd_opt(2026, 5, 31).unwrap_or_default(),
            gender: Gender::Male,
        }
    }
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub age: Option<u32>,
    pub height: Option<u32>,
    pub base_weight: Option<f64>,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }

    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(height) = self.height {
            profile.height = height;
        }
        if let Some(w) = self.base_weight {
            profile.base_weight = w;
        }
        if let Some(w) = self.current_weight {
            profile.current_weight = w;
        }
        if let Some(w) = self.target_weight {
            profile.target_weight = w;
        }
        if let Some(d) = self.start_date {
            profile.start_date = d;
        }
        if let Some(d) = self.target_date {
            profile.target_date = d;
        }
        if let Some(g) = self.gender {
            profile.gender = g;
        }
    }
}

/// A single food or activity entry. Positive points are intake, negative
/// points are burned by activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogItem {
    pub name: String,
    /// 1 point = 100 kcal
    pub points: i64,
}

/// A finalized day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    /// Millisecond timestamp of creation, bumped to stay unique
    pub id: i64,
    pub date: NaiveDate,
    /// Weight in kg
    pub weight: Option<f64>,
    #[serde(default)]
    pub items: Vec<LogItem>,
    /// Sum of `items[].points` at finalization
    pub total_points: i64,
}

impl DailyLog {
    pub fn calories(&self) -> i64 {
        crate::calculations::points_to_calories(self.total_points)
    }
}

/// The staging area for today's entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentDay {
    pub items: Vec<LogItem>,
    pub weight: Option<f64>,
}

impl CurrentDay {
    pub fn total_points(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |sum, i| sum.saturating_add(i.points))
    }
}

/// Deficit colour band, from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeficitBand {
    Green,
    Yellow,
    Orange,
    Red,
}

impl DeficitBand {
    pub fn label(&self) -> &'static str {
        match self {
            DeficitBand::Green => "Excellent",
            DeficitBand::Yellow => "Good",
            DeficitBand::Orange => "Fair",
            DeficitBand::Red => "Surplus",
        }
    }
}

/// Display settings. Missing keys in a stored snapshot take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub use_color_coding: bool,
    /// kcal
    pub deficit_green: i64,
    /// kcal
    pub deficit_yellow: i64,
    /// kcal
    pub deficit_orange: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_color_coding: true,
            deficit_green: 500,
            deficit_yellow: 300,
            deficit_orange: 0,
        }
    }
}

impl Settings {
    pub fn classify(&self, deficit: i64) -> DeficitBand {
        if deficit >= self.deficit_green {
            DeficitBand::Green
        } else if deficit >= self.deficit_yellow {
            DeficitBand::Yellow
        } else if deficit >= self.deficit_orange {
            DeficitBand::Orange
        } else {
            DeficitBand::Red
        }
    }
}

/// Partial settings update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub use_color_coding: Option<bool>,
    pub deficit_green: Option<i64>,
    pub deficit_yellow: Option<i64>,
    pub deficit_orange: Option<i64>,
}

impl SettingsUpdate {
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(v) = self.use_color_coding {
            settings.use_color_coding = v;
        }
        if let Some(v) = self.deficit_green {
            settings.deficit_green = v;
        }
        if let Some(v) = self.deficit_yellow {
            settings.deficit_yellow = v;
        }
        if let Some(v) = self.deficit_orange {
            settings.deficit_orange = v;
        }
    }
}

/// Everything the store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub profile: Profile,
    pub logs: Vec<DailyLog>,
    pub settings: Settings,
    pub current_day: CurrentDay,
}

impl AppState {
    pub fn log_for(&self, date: NaiveDate) -> Option<&DailyLog> {
        self.logs.iter().find(|l| l.date == date)
    }

    /// Next log id for a log created at `now_ms`.
    pub fn next_log_id(&self, now_ms: i64) -> i64 {
        match self.logs.iter().map(|l| l.id).max() {
            Some(max) if max >= now_ms => max.saturating_add(1),
            _ => now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_gender_is_male() {
        let g: Gender = serde_json::from_str("\"other\"").unwrap();
        assert_eq!(g, Gender::Male);
        let g: Gender = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(g, Gender::Female);
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
    }

    #[test]
    fn settings_classify_bands() {
        let s = Settings::default();
        assert_eq!(s.classify(500), DeficitBand::Green);
        assert_eq!(s.classify(456), DeficitBand::Yellow);
        assert_eq!(s.classify(300), DeficitBand::Yellow);
        assert_eq!(s.classify(0), DeficitBand::Orange);
        assert_eq!(s.classify(-1), DeficitBand::Red);
    }

    #[test]
    fn snapshot_uses_camel_case() {
        let json = serde_json::to_value(AppState::default()).unwrap();
        assert_eq!(json["profile"]["baseWeight"], 88.0);
        assert_eq!(json["profile"]["startDate"], "2026-01-15");
        assert_eq!(json["settings"]["deficitGreen"], 500);
        assert!(json["currentDay"]["weight"].is_null());
    }

    #[test]
    fn profile_update_only_touches_given_fields() {
        let mut profile = Profile::default();
        let update = ProfileUpdate {
            age: Some(31),
            target_weight: Some(78.5),
            ..Default::default()
        };
        update.apply_to(&mut profile);
        assert_eq!(profile.age, 31);
        assert_eq!(profile.target_weight, 78.5);
        assert_eq!(profile.height, 175);
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn next_log_id_stays_unique() {
        let mut state = AppState::default();
        assert_eq!(state.next_log_id(1000), 1000);
        state.logs.push(DailyLog {
            id: 1000,
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            weight: None,
            items: vec![],
            total_points: 0,
        });
        assert_eq!(state.next_log_id(1000), 1001);
        assert_eq!(state.next_log_id(2000), 2000);
    }
}
