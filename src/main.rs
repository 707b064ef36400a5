use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fithouse::calculations::points_to_calories;
use fithouse::config::resolve_data_dir;
use fithouse::parse::{parse_date, parse_points, parse_weight};
use fithouse::projection::{
    build_trajectory, current_day_gauge, day_breakdown, history_newest_first,
};
use fithouse::store::export_file_name;
use fithouse::{DeficitBand, FileStorage, Gender, ProfileUpdate, SettingsUpdate, Store};

#[derive(Parser)]
#[command(name = "fithouse")]
#[command(about = "Track daily calorie points and weight against a goal line")]
#[command(version)]
struct Cli {
    /// Directory holding the saved state (defaults to $FITHOUSE_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's items and the deficit gauge
    Status,

    /// Add an item to today (positive points = food, negative = activity; 1 point = 100 kcal)
    Add {
        #[arg(value_parser = parse_points, allow_hyphen_values = true)]
        points: i64,
        /// Item name (defaults to "Item N")
        name: Vec<String>,
    },

    /// Remove today's item number N (as shown by `status`)
    Remove { number: usize },

    /// Set today's weigh-in in kg
    Weight {
        #[arg(value_parser = parse_weight)]
        kg: f64,
    },

    /// Wrap up today and save it to the log
    LogDay,

    /// Add or replace the log for a past date
    AddLog {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        #[arg(value_parser = parse_weight)]
        weight: f64,
        #[arg(value_parser = parse_points, allow_hyphen_values = true)]
        points: i64,
    },

    /// List logged days, newest first
    History,

    /// Delete a logged day by its id (see `history`)
    DeleteLog { id: i64 },

    /// Update profile fields
    Profile {
        #[arg(long)]
        age: Option<u32>,
        /// Height in cm
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, value_parser = parse_weight)]
        base_weight: Option<f64>,
        #[arg(long, value_parser = parse_weight)]
        current_weight: Option<f64>,
        #[arg(long, value_parser = parse_weight)]
        target_weight: Option<f64>,
        #[arg(long, value_parser = parse_date)]
        start_date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        target_date: Option<NaiveDate>,
        #[arg(long, value_parser = ["male", "female"])]
        gender: Option<String>,
    },

    /// Update display settings
    Settings {
        /// Colour-code deficits
        #[arg(long)]
        color: Option<bool>,
        #[arg(long, allow_hyphen_values = true)]
        green: Option<i64>,
        #[arg(long, allow_hyphen_values = true)]
        yellow: Option<i64>,
        #[arg(long, allow_hyphen_values = true)]
        orange: Option<i64>,
    },

    /// Print goal, actual and projected weight for every day of the plan
    Trajectory {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a backup of all data
    Export {
        /// Output path (defaults to fithouse_backup_<date>.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with a backup file
    Import { file: PathBuf },

    /// Wipe all data
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir);
    let mut store = Store::open(FileStorage::new(&data_dir));

    match cli.command {
        Commands::Status => print_status(&store),
        Commands::Add { points, name } => {
            store.add_item(&name.join(" "), points)?;
            print_status(&store);
        }
        Commands::Remove { number } => {
            if number == 0 || number > store.state().current_day.items.len() {
                bail!("No item number {}", number);
            }
            store.remove_item(number - 1)?;
            print_status(&store);
        }
        Commands::Weight { kg } => {
            store.set_daily_weight(kg)?;
            println!("Today's weight set to {:.1} kg", kg);
        }
        Commands::LogDay => {
            let log = store.log_day(Local::now())?;
            let b = day_breakdown(&log, &store.state().profile, &store.state().settings);
            println!(
                "Day logged: {} ({} pts, {} kcal, deficit {})",
                log.date,
                log.total_points,
                b.calories,
                paint(store.state().settings.use_color_coding, b.band, b.deficit)
            );
        }
        Commands::AddLog {
            date,
            weight,
            points,
        } => {
            store.add_historical_log(date, Some(weight), points, Local::now())?;
            println!("Entry added/updated for {}", date);
        }
        Commands::History => print_history(&store),
        Commands::DeleteLog { id } => {
            if store.delete_log(id)? {
                println!("Deleted log {}", id);
            } else {
                bail!("No log with id {}", id);
            }
        }
        Commands::Profile {
            age,
            height,
            base_weight,
            current_weight,
            target_weight,
            start_date,
            target_date,
            gender,
        } => {
            let update = ProfileUpdate {
                age,
                height,
                base_weight,
                current_weight,
                target_weight,
                start_date,
                target_date,
                gender: gender.as_deref().map(Gender::from_tag),
            };
            if !update.is_empty() {
                store.update_profile(&update)?;
            }
            print_profile(&store);
        }
        Commands::Settings {
            color,
            green,
            yellow,
            orange,
        } => {
            store.update_settings(&SettingsUpdate {
                use_color_coding: color,
                deficit_green: green,
                deficit_yellow: yellow,
                deficit_orange: orange,
            })?;
            let s = &store.state().settings;
            println!(
                "Colour coding: {}  thresholds: green >= {}, yellow >= {}, orange >= {}",
                if s.use_color_coding { "on" } else { "off" },
                s.deficit_green,
                s.deficit_yellow,
                s.deficit_orange
            );
        }
        Commands::Trajectory { json } => {
            let state = store.state();
            let trajectory = build_trajectory(&state.profile, &state.logs, Utc::now());
            if json {
                println!("{}", serde_json::to_string_pretty(&trajectory)?);
            } else {
                println!(
                    "Average deficit: {:.0} kcal/day, projecting from {} at {:.1} kg",
                    trajectory.average_daily_deficit,
                    trajectory.projection_start,
                    trajectory.projection_start_weight
                );
                println!("{:<12} {:>8} {:>8} {:>10}", "date", "goal", "actual", "projected");
                for p in &trajectory.points {
                    println!(
                        "{:<12} {:>8.1} {:>8} {:>10}",
                        p.date.to_string(),
                        p.goal,
                        fmt_kg(p.actual),
                        fmt_kg(p.projected)
                    );
                }
            }
        }
        Commands::Export { output } => {
            let path =
                output.unwrap_or_else(|| PathBuf::from(export_file_name(Local::now().date_naive())));
            let data = store.export_data()?;
            std::fs::write(&path, data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved backup to {}", path.display());
        }
        Commands::Import { file } => {
            let data = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            store
                .import_data(&data)
                .context("Failed to load data")?;
            println!("Data loaded successfully!");
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("This wipes all data. Re-run with --yes to confirm.");
            }
            store.reset_data()?;
            println!("Database reset.");
        }
    }

    Ok(())
}

fn print_status(store: &Store<FileStorage>) {
    let state = store.state();
    let day = &state.current_day;

    if day.items.is_empty() {
        println!("No items logged today.");
    }
    for (i, item) in day.items.iter().enumerate() {
        println!(
            "{:>3}. {:<24} {:>+4} pts  {:>6} kcal",
            i + 1,
            item.name,
            item.points,
            points_to_calories(item.points)
        );
    }
    if let Some(w) = day.weight {
        println!("Weight: {:.1} kg", w);
    }

    let gauge = current_day_gauge(state);
    println!();
    println!(
        "Total: {} kcal   TDEE: {}   Deficit: {}",
        gauge.calories,
        gauge.tdee,
        paint(gauge.band.is_some(), gauge.band.unwrap_or(DeficitBand::Red), gauge.deficit)
    );
}

fn print_history(store: &Store<FileStorage>) {
    let state = store.state();
    let logs = history_newest_first(&state.logs);
    if logs.is_empty() {
        println!("No logged days yet.");
        return;
    }
    for log in logs {
        let b = day_breakdown(log, &state.profile, &state.settings);
        println!(
            "{:<16} {}  {:>8}  {:>4} pts  deficit {}",
            log.id,
            log.date,
            fmt_kg(log.weight),
            log.total_points,
            paint(state.settings.use_color_coding, b.band, b.deficit)
        );
    }
}

fn print_profile(store: &Store<FileStorage>) {
    let p = &store.state().profile;
    println!("Age:            {}", p.age);
    println!("Height:         {} cm", p.height);
    println!("Gender:         {}", p.gender);
    println!("Base weight:    {:.1} kg", p.base_weight);
    println!("Current weight: {:.1} kg", p.current_weight);
    println!("Target weight:  {:.1} kg", p.target_weight);
    println!("Plan:           {} -> {}", p.start_date, p.target_date);
}

fn fmt_kg(weight: Option<f64>) -> String {
    weight.map(|w| format!("{:.1}", w)).unwrap_or_else(|| "-".to_string())
}

fn paint(color: bool, band: DeficitBand, deficit: i64) -> String {
    if !color {
        return deficit.to_string();
    }
    let code = match band {
        DeficitBand::Green => "32",
        DeficitBand::Yellow => "33",
        DeficitBand::Orange => "38;5;208",
        DeficitBand::Red => "31",
    };
    format!("\x1b[{}m{} ({})\x1b[0m", code, deficit, band.label())
}
