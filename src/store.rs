use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, error, info, warn};

use crate::models::*;
pub use crate::snapshot::decode_snapshot;
use crate::storage::SnapshotStorage;

/// Upper bound on commands queued by observers and applied in one drain.
pub const MAX_DEFERRED_COMMANDS: usize = 64;

/// Name given to the single item of a manually entered log.
pub const MANUAL_ENTRY_NAME: &str = "Manual Entry";

/// Called after every persisted mutation.
pub type Observer = Rc<dyn Fn(&AppState)>;

/// A store mutation, as queued through a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddItem { name: String, points: i64 },
    RemoveItem(usize),
    SetDailyWeight(f64),
    LogDay(DateTime<Local>),
    AddHistoricalLog {
        date: NaiveDate,
        weight: Option<f64>,
        total_points: i64,
        now: DateTime<Local>,
    },
    DeleteLog(i64),
    DeleteLogAt(usize),
    UpdateProfile(ProfileUpdate),
    UpdateSettings(SettingsUpdate),
    Import(String),
    Reset,
}

/// Handle for queueing commands from inside an observer. Queued commands
/// run after the current notification pass completes.
///
/// Commands dispatched outside a notification pass wait in the queue until
/// the store next runs it: on the next [`Store::apply`] (ahead of the applied
/// command), after the next mutation, or on [`Store::run_queued`].
#[derive(Clone, Default)]
pub struct Dispatcher {
    queue: Rc<RefCell<VecDeque<Command>>>,
}

impl Dispatcher {
    pub fn dispatch(&self, command: Command) {
        self.queue.borrow_mut().push_back(command);
    }

    fn pop(&self) -> Option<Command> {
        self.queue.borrow_mut().pop_front()
    }

    fn clear(&self) -> usize {
        let mut queue = self.queue.borrow_mut();
        let dropped = queue.len();
        queue.clear();
        dropped
    }
}

/// Owns the application state and persists it after every command.
pub struct Store<S: SnapshotStorage> {
    state: AppState,
    storage: S,
    observers: Vec<Observer>,
    deferred: Dispatcher,
    draining: bool,
    /// Set when the stored snapshot could not be read or moved aside
    save_blocked: bool,
}

/// File name used for exported backups.
pub fn export_file_name(today: NaiveDate) -> String {
    format!("fithouse_backup_{}.json", today.format("%Y-%m-%d"))
}

impl<S: SnapshotStorage> Store<S> {
    /// Restore state from `storage`, falling back to defaults when the
    /// snapshot is missing or unreadable.
    ///
    /// An unparseable snapshot is moved aside before anything is saved over
    /// it. If it cannot be read or moved, saving stays blocked until the
    /// state is replaced by [`Store::import_data`] or [`Store::reset_data`].
    pub fn open(mut storage: S) -> Self {
        let mut save_blocked = false;
        let state = match storage.load() {
            Ok(Some(saved)) => match decode_snapshot(&saved) {
                Ok(state) => {
                    info!(logs = state.logs.len(), "Loaded saved state");
                    state
                }
                Err(e) => {
                    warn!("Ignoring saved state: {:#}", e);
                    if let Err(e) = storage.set_aside() {
                        error!("Not saving over unreadable state: {:#}", e);
                        save_blocked = true;
                    }
                    AppState::default()
                }
            },
            Ok(None) => AppState::default(),
            Err(e) => {
                error!("Failed to load saved state, not saving over it: {:#}", e);
                save_blocked = true;
                AppState::default()
            }
        };

        Self {
            state,
            storage,
            observers: Vec::new(),
            deferred: Dispatcher::default(),
            draining: false,
            save_blocked,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Whether saves are refused to protect a snapshot that failed to load.
    pub fn save_blocked(&self) -> bool {
        self.save_blocked
    }

    /// Handle for observers that need to issue commands.
    pub fn dispatcher(&self) -> Dispatcher {
        self.deferred.clone()
    }

    /// Register an observer. Returns `false` if the same observer is
    /// already registered.
    pub fn subscribe(&mut self, observer: Observer) -> bool {
        if self.observers.iter().any(|o| same_observer(o, &observer)) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    pub fn unsubscribe(&mut self, observer: &Observer) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !same_observer(o, observer));
        self.observers.len() != before
    }

    /// Append an item to the current day. A blank name becomes `Item <n>`.
    pub fn add_item(&mut self, name: &str, points: i64) -> Result<()> {
        let name = if name.trim().is_empty() {
            format!("Item {}", self.state.current_day.items.len() + 1)
        } else {
            name.to_string()
        };
        debug!(%name, points, "add item");
        self.state.current_day.items.push(LogItem { name, points });
        self.commit()
    }

    /// Remove the current-day item at `index`. Out of range is a no-op.
    pub fn remove_item(&mut self, index: usize) -> Result<()> {
        if index < self.state.current_day.items.len() {
            let item = self.state.current_day.items.remove(index);
            debug!(name = %item.name, index, "remove item");
        } else {
            debug!(index, "remove item: index out of range");
        }
        self.commit()
    }

    pub fn set_daily_weight(&mut self, weight: f64) -> Result<()> {
        debug!(weight, "set daily weight");
        self.state.current_day.weight = Some(weight);
        self.commit()
    }

    /// Finalize the current day into a log dated `now`'s local date.
    ///
    /// An existing log for that date is replaced in place. The current day
    /// is reset afterwards.
    pub fn log_day(&mut self, now: DateTime<Local>) -> Result<DailyLog> {
        let date = now.date_naive();
        let day = std::mem::take(&mut self.state.current_day);
        let total_points = day.total_points();

        let log = DailyLog {
            id: self.state.next_log_id(now.timestamp_millis()),
            date,
            weight: day.weight.or(Some(self.state.profile.current_weight)),
            items: day.items,
            total_points,
        };

        if let Some(weight) = day.weight {
            self.state.profile.current_weight = weight;
        }

        debug!(%date, total_points, "log day");
        self.upsert_log(log.clone());
        self.commit()?;
        Ok(log)
    }

    /// Record a day after the fact as a single "Manual Entry" item.
    /// Logs are kept sorted by date afterwards.
    pub fn add_historical_log(
        &mut self,
        date: NaiveDate,
        weight: Option<f64>,
        total_points: i64,
        now: DateTime<Local>,
    ) -> Result<()> {
        let log = DailyLog {
            id: self.state.next_log_id(now.timestamp_millis()),
            date,
            weight,
            items: vec![LogItem {
                name: MANUAL_ENTRY_NAME.to_string(),
                points: total_points,
            }],
            total_points,
        };

        debug!(%date, total_points, "add historical log");
        self.upsert_log(log);
        self.state.logs.sort_by_key(|l| l.date);
        self.commit()
    }

    /// Delete the log with `id`. Returns whether a log was removed.
    pub fn delete_log(&mut self, id: i64) -> Result<bool> {
        let before = self.state.logs.len();
        self.state.logs.retain(|l| l.id != id);
        let removed = self.state.logs.len() != before;
        debug!(id, removed, "delete log");
        self.commit()?;
        Ok(removed)
    }

    /// Delete by position in storage order. Out of range is a no-op.
    pub fn delete_log_at(&mut self, index: usize) -> Result<()> {
        if index < self.state.logs.len() {
            let log = self.state.logs.remove(index);
            debug!(date = %log.date, index, "delete log");
        } else {
            debug!(index, "delete log: index out of range");
        }
        self.commit()
    }

    pub fn update_profile(&mut self, update: &ProfileUpdate) -> Result<()> {
        debug!(?update, "update profile");
        update.apply_to(&mut self.state.profile);
        self.commit()
    }

    pub fn update_settings(&mut self, update: &SettingsUpdate) -> Result<()> {
        debug!(?update, "update settings");
        update.apply_to(&mut self.state.settings);
        self.commit()
    }

    /// Pretty-printed snapshot of the whole state.
    pub fn export_data(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.state).context("Failed to serialize state")
    }

    /// Replace the whole state with `json`. Missing fields take defaults,
    /// exactly as on startup. On a parse error the state is left unchanged.
    pub fn import_data(&mut self, json: &str) -> Result<()> {
        let state = match decode_snapshot(json) {
            Ok(state) => state,
            Err(e) => {
                error!("Import failed: {:#}", e);
                return Err(e);
            }
        };
        info!(logs = state.logs.len(), "Imported state");
        self.state = state;
        self.save_blocked = false;
        self.commit()
    }

    pub fn reset_data(&mut self) -> Result<()> {
        info!("Resetting all data");
        self.state = AppState::default();
        self.save_blocked = false;
        self.commit()
    }

    /// Apply a command. Commands already waiting in the dispatcher queue
    /// run first.
    pub fn apply(&mut self, command: Command) -> Result<()> {
        self.run_queued();
        self.run(command)
    }

    /// Run every command waiting in the dispatcher queue. Returns how many
    /// ran. Does nothing while a drain is already in progress.
    pub fn run_queued(&mut self) -> usize {
        if self.draining {
            return 0;
        }
        self.draining = true;

        let mut applied = 0;
        while let Some(command) = self.deferred.pop() {
            if applied == MAX_DEFERRED_COMMANDS {
                let dropped = self.deferred.clear() + 1;
                warn!(dropped, "Too many commands queued by observers, dropping the rest");
                break;
            }
            applied += 1;
            if let Err(e) = self.run(command) {
                warn!("Queued command failed: {:#}", e);
            }
        }

        self.draining = false;
        applied
    }

    fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::AddItem { name, points } => self.add_item(&name, points),
            Command::RemoveItem(index) => self.remove_item(index),
            Command::SetDailyWeight(weight) => self.set_daily_weight(weight),
            Command::LogDay(now) => self.log_day(now).map(|_| ()),
            Command::AddHistoricalLog {
                date,
                weight,
                total_points,
                now,
            } => self.add_historical_log(date, weight, total_points, now),
            Command::DeleteLog(id) => self.delete_log(id).map(|_| ()),
            Command::DeleteLogAt(index) => self.delete_log_at(index),
            Command::UpdateProfile(update) => self.update_profile(&update),
            Command::UpdateSettings(update) => self.update_settings(&update),
            Command::Import(json) => self.import_data(&json),
            Command::Reset => self.reset_data(),
        }
    }

    fn upsert_log(&mut self, log: DailyLog) {
        match self.state.logs.iter_mut().find(|l| l.date == log.date) {
            Some(existing) => *existing = log,
            None => self.state.logs.push(log),
        }
    }

    /// Persist, notify, then run anything observers queued.
    fn commit(&mut self) -> Result<()> {
        let saved = self.persist();
        if let Err(ref e) = saved {
            error!("Failed to save state: {:#}", e);
        }
        self.notify();
        self.run_queued();
        saved
    }

    fn persist(&mut self) -> Result<()> {
        if self.save_blocked {
            bail!("Saved state could not be loaded; import or reset to start saving again");
        }
        let snapshot = serde_json::to_string(&self.state).context("Failed to serialize state")?;
        self.storage.save(&snapshot)
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer(&self.state);
        }
    }
}

fn same_observer(a: &Observer, b: &Observer) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
