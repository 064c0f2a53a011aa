//! The day-state machine
//!
//! A [`Session`] owns the ledger bound to the current date and decides when a
//! day boundary has been crossed. It is driven by three kinds of trigger:
//!
//! - startup, which catches up a day-end that was missed while nothing ran
//!   and then loads (or rolls over into) today's ledger,
//! - the periodic [`Session::tick`], which performs the automatic day-end at
//!   the configured minute after midnight,
//! - the user, through [`Session::manual_day_end`] and the ledger edits.
//!
//! All clocks are passed in; the session never reads the system time.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::import::ImportRow;
use crate::models::{listing, rollover_all, DayLedger, InventoryStats, LedgerRow, MedicineRecord};
use crate::store::{KeyValueStore, LedgerStore};
use crate::types::{
    format_date_display, ImportMode, MedicineId, Notification, Timestamp, HISTORY_WINDOW_DAYS,
};
use crate::validation::{validate_medicine_name, validate_quantity};

/// Destination for day-end and on-demand exports
pub trait LedgerExporter {
    /// Write `records` as the export for `date`, returning the file name
    fn export(&mut self, date: NaiveDate, records: &[MedicineRecord]) -> Result<String, LedgerError>;
}

/// What started a day-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayEndTrigger {
    /// Catch-up for a day whose end was missed while the app was closed
    Startup,
    /// The timer firing shortly after midnight
    Automatic,
    /// The user pressing "End Day & Rollover"
    Manual,
}

impl DayEndTrigger {
    fn exports(self) -> bool {
        matches!(self, DayEndTrigger::Automatic | DayEndTrigger::Manual)
    }
}

/// Wall-clock minute at which the automatic day-end fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEndSchedule {
    pub hour: u32,
    pub minute: u32,
}

impl Default for DayEndSchedule {
    fn default() -> Self {
        Self { hour: 0, minute: 1 }
    }
}

impl DayEndSchedule {
    pub fn matches(&self, now: NaiveDateTime) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }
}

/// Result of one day-end transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayEndOutcome {
    pub trigger: DayEndTrigger,
    pub closed_date: NaiveDate,
    /// Date a rolled-over ledger was written for, if any
    pub target_date: Option<NaiveDate>,
    pub exported_file: Option<String>,
    pub rolled_over: usize,
    /// In-memory state should be reloaded from storage shortly
    pub reload_requested: bool,
}

impl DayEndOutcome {
    fn new(trigger: DayEndTrigger, closed_date: NaiveDate) -> Self {
        Self {
            trigger,
            closed_date,
            target_date: None,
            exported_file: None,
            rolled_over: 0,
            reload_requested: false,
        }
    }
}

/// Partial edit of a single record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineUpdate {
    pub name: Option<String>,
    pub total_quantity: Option<Decimal>,
    pub added_quantity: Option<Decimal>,
    pub used_quantity: Option<Decimal>,
}

impl MedicineUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.total_quantity.is_none()
            && self.added_quantity.is_none()
            && self.used_quantity.is_none()
    }

    fn validate(&self) -> Result<(), LedgerError> {
        if let Some(name) = &self.name {
            validate_medicine_name(name)
                .map_err(|message| LedgerError::Validation { field: "name", message })?;
        }
        let quantities = [
            ("totalQuantity", self.total_quantity),
            ("addedQuantity", self.added_quantity),
            ("usedQuantity", self.used_quantity),
        ];
        for (field, value) in quantities {
            if let Some(value) = value {
                validate_quantity(value).map_err(|message| LedgerError::Validation { field, message })?;
            }
        }
        Ok(())
    }
}

/// The ledger currently bound to the user, plus its store
pub struct Session<S> {
    store: LedgerStore<S>,
    current_date: NaiveDate,
    records: Vec<MedicineRecord>,
    schedule: DayEndSchedule,
    last_issued_id: MedicineId,
    notifications: Vec<Notification>,
}

impl<S: KeyValueStore> Session<S> {
    /// Bind to `today` without running the startup catch-up
    pub fn open(store: S, today: NaiveDate) -> Self {
        let mut session = Self::unloaded(store, today);
        session.load(today);
        session
    }

    /// Full process start: catch up a missed day-end, then load today
    pub fn start<E: LedgerExporter>(store: S, today: NaiveDate, exporter: &mut E) -> Self {
        let mut session = Self::unloaded(store, today);
        session.check_for_day_change(today, exporter);
        session.load(today);
        session
    }

    fn unloaded(store: S, today: NaiveDate) -> Self {
        Self {
            store: LedgerStore::new(store),
            current_date: today,
            records: Vec::new(),
            schedule: DayEndSchedule::default(),
            last_issued_id: 0,
            notifications: Vec::new(),
        }
    }

    pub fn with_schedule(mut self, schedule: DayEndSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn records(&self) -> &[MedicineRecord] {
        &self.records
    }

    pub fn ledger(&self) -> DayLedger {
        DayLedger::new(self.current_date, self.records.clone())
    }

    pub fn schedule(&self) -> DayEndSchedule {
        self.schedule
    }

    pub fn store(&self) -> &LedgerStore<S> {
        &self.store
    }

    /// Drain the notifications queued since the last call
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ------------------------------------------------------------------
    // Day boundary transitions
    // ------------------------------------------------------------------

    /// Re-read today's ledger from storage, as a fresh start would
    pub fn reload(&mut self, today: NaiveDate) {
        self.load(today);
    }

    fn load(&mut self, today: NaiveDate) {
        self.current_date = today;
        if let Some(records) = self.store.get(today) {
            self.records = records;
            self.notify(Notification::success("Loaded today's inventory"));
            return;
        }

        let yesterday = today.pred_opt().unwrap_or(today);
        match self.store.get(yesterday) {
            Some(previous) => {
                self.records = rollover_all(&previous);
                tracing::info!(
                    "Rolled {} medicine(s) over from {} into {}",
                    self.records.len(),
                    yesterday,
                    today
                );
                if let Err(err) = self.store.put(today, &self.records) {
                    tracing::warn!("Could not persist rolled-over ledger for {}: {}", today, err);
                    self.notify(Notification::error(format!("Could not save rolled-over data: {}", err)));
                }
                self.notify(Notification::info("Rolled over from yesterday's data"));
            }
            None => self.records = Vec::new(),
        }
    }

    /// Startup catch-up for a day-end missed while nothing was running
    ///
    /// Only one step is taken, from the last checked date to its successor,
    /// however many days have actually passed.
    fn check_for_day_change<E: LedgerExporter>(&mut self, today: NaiveDate, exporter: &mut E) {
        if let Some(last_checked) = self.store.last_checked() {
            if last_checked != today {
                tracing::info!("Day changed since {}; running catch-up day-end", last_checked);
                self.perform_day_end(last_checked, today, DayEndTrigger::Startup, exporter);
            }
        }
        if let Err(err) = self.store.set_last_checked(today) {
            tracing::warn!("Could not record last check date: {}", err);
        }
    }

    /// Timer entry point; fires at most once per calendar day
    pub fn tick<E: LedgerExporter>(&mut self, now: NaiveDateTime, exporter: &mut E) -> Option<DayEndOutcome> {
        if !self.schedule.matches(now) {
            return None;
        }
        let today = now.date();
        if self.store.last_auto_export() == Some(today) {
            return None;
        }
        let yesterday = today.pred_opt()?;
        tracing::info!("Automatic day-end for {}", yesterday);
        let outcome = self.perform_day_end(yesterday, today, DayEndTrigger::Automatic, exporter);
        if let Err(err) = self.store.set_last_auto_export(today) {
            tracing::warn!("Could not record automatic day-end date: {}", err);
        }
        Some(outcome)
    }

    /// Close `date_to_close`: export it, then roll its stock into the next day
    ///
    /// The ledger rolled is the in-memory one when it is bound to
    /// `date_to_close`, otherwise the stored ledger of that date. An automatic
    /// day-end for a date the session has already moved past is a no-op apart
    /// from the export, and the startup catch-up never overwrites a successor
    /// ledger that already exists.
    pub fn perform_day_end<E: LedgerExporter>(
        &mut self,
        date_to_close: NaiveDate,
        today: NaiveDate,
        trigger: DayEndTrigger,
        exporter: &mut E,
    ) -> DayEndOutcome {
        let mut outcome = DayEndOutcome::new(trigger, date_to_close);

        let stored = self.store.get(date_to_close);
        if trigger.exports() {
            if let Some(stored) = &stored {
                outcome.exported_file = self.export_with(exporter, date_to_close, stored);
            }
        }

        if trigger == DayEndTrigger::Automatic && self.current_date > date_to_close {
            tracing::debug!("{} already closed; nothing to roll over", date_to_close);
            return outcome;
        }

        let source = if self.current_date == date_to_close {
            self.records.clone()
        } else if let Some(stored) = stored {
            stored
        } else if self.current_date < date_to_close {
            self.records.clone()
        } else {
            Vec::new()
        };
        if source.is_empty() {
            return outcome;
        }

        let Some(target) = date_to_close.succ_opt() else {
            return outcome;
        };
        if trigger == DayEndTrigger::Startup && self.store.contains(target) {
            tracing::info!("Ledger for {} already exists; catch-up leaves it untouched", target);
            return outcome;
        }

        let rolled = rollover_all(&source);
        if let Err(err) = self.store.put(target, &rolled) {
            tracing::warn!("Could not persist rolled-over ledger for {}: {}", target, err);
            self.notify(Notification::error(format!("Could not save rolled-over data: {}", err)));
        }
        outcome.target_date = Some(target);
        outcome.rolled_over = rolled.len();
        tracing::info!(
            "Rolled {} medicine(s) from {} into {} ({:?})",
            rolled.len(),
            date_to_close,
            target,
            trigger
        );

        if trigger == DayEndTrigger::Automatic && target == today {
            self.notify(Notification::success(format!(
                "Day-end complete! Data rolled over to {}",
                format_date_display(target)
            )));
            outcome.reload_requested = true;
        }
        outcome
    }

    /// User-triggered day-end: export, roll over and move the view forward
    ///
    /// Unsaved edits are persisted first so the export and the history match
    /// what the user sees.
    pub fn manual_day_end<E: LedgerExporter>(&mut self, today: NaiveDate, exporter: &mut E) -> DayEndOutcome {
        let closing = self.current_date;
        if let Err(err) = self.store.put(closing, &self.records) {
            tracing::warn!("Could not save {} before day-end: {}", closing, err);
            self.notify(Notification::error(format!("Failed to save data: {}", err)));
        }

        let mut outcome = self.perform_day_end(closing, today, DayEndTrigger::Manual, exporter);
        let next = closing.succ_opt().unwrap_or(closing);
        if outcome.target_date.is_none() {
            if let Err(err) = self.store.put(next, &[]) {
                tracing::warn!("Could not persist empty ledger for {}: {}", next, err);
            }
            outcome.target_date = Some(next);
        }

        self.records = rollover_all(&self.records);
        self.current_date = next;
        self.notify(Notification::success(format!(
            "Day-end complete! Data rolled over to {}. Now showing that day's data.",
            format_date_display(next)
        )));
        outcome
    }

    // ------------------------------------------------------------------
    // Ledger edits
    // ------------------------------------------------------------------

    /// Append a blank record; it is persisted on the next save
    pub fn add_medicine(&mut self, now_ms: Timestamp) -> MedicineRecord {
        let record = MedicineRecord::blank(self.reserve_ids(now_ms, 1));
        self.records.push(record.clone());
        record
    }

    pub fn update_medicine(
        &mut self,
        id: MedicineId,
        update: MedicineUpdate,
        now_ms: Timestamp,
    ) -> Result<MedicineRecord, LedgerError> {
        update.validate()?;
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(LedgerError::NotFound(id))?;

        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(total) = update.total_quantity {
            record.total_quantity = total;
        }
        if let Some(added) = update.added_quantity {
            record.added_quantity = added;
        }
        if let Some(used) = update.used_quantity {
            record.used_quantity = used;
        }
        record.last_updated = Some(now_ms);
        Ok(record.clone())
    }

    /// Remove a record and persist the ledger right away
    pub fn delete_medicine(&mut self, id: MedicineId) -> Result<MedicineRecord, LedgerError> {
        let position = self
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or(LedgerError::NotFound(id))?;
        let removed = self.records.remove(position);
        self.save();
        Ok(removed)
    }

    /// Persist the current ledger under the current date
    ///
    /// A storage failure is reported as a notification; the in-memory ledger
    /// is kept either way.
    pub fn save(&mut self) -> bool {
        match self.store.put(self.current_date, &self.records) {
            Ok(()) => {
                self.notify(Notification::success("Data saved successfully!"));
                true
            }
            Err(err) => {
                tracing::warn!("Failed to save ledger for {}: {}", self.current_date, err);
                self.notify(Notification::error(format!("Failed to save data: {}", err)));
                false
            }
        }
    }

    /// Replace or extend the ledger with imported rows, then save
    pub fn import(&mut self, rows: Vec<ImportRow>, mode: ImportMode, now_ms: Timestamp) -> Result<usize, LedgerError> {
        if rows.is_empty() {
            self.notify(Notification::error("No valid data found in Excel file!"));
            return Err(LedgerError::EmptyImport);
        }

        let count = rows.len();
        let first_id = self.reserve_ids(now_ms, count);
        let imported = rows.into_iter().enumerate().map(|(idx, row)| {
            let offset = idx as i64;
            MedicineRecord {
                id: first_id + offset,
                name: row.name,
                total_quantity: row.total_quantity,
                added_quantity: row.added_quantity,
                used_quantity: row.used_quantity,
                last_updated: Some(now_ms + offset),
            }
        });

        match mode {
            ImportMode::Replace => self.records = imported.collect(),
            ImportMode::Merge => self.records.extend(imported),
        }
        tracing::info!("Imported {} medicine(s) ({:?})", count, mode);
        self.save();
        self.notify(Notification::success(format!("Successfully imported {} medicines!", count)));
        Ok(count)
    }

    /// Export the ledger as it currently stands
    pub fn export_current<E: LedgerExporter>(&mut self, exporter: &mut E) -> Result<String, LedgerError> {
        if self.records.is_empty() {
            self.notify(Notification::error("No data to export!"));
            return Err(LedgerError::NothingToExport);
        }
        let records = self.records.clone();
        let date = self.current_date;
        match exporter.export(date, &records) {
            Ok(file) => {
                self.notify(Notification::success(format!("Excel exported: {}", file)));
                Ok(file)
            }
            Err(err) => {
                self.notify(Notification::error(format!("Export failed: {}", err)));
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    pub fn listing(&self, search: &str) -> Vec<LedgerRow> {
        listing(&self.records, search)
    }

    pub fn stats(&self) -> InventoryStats {
        InventoryStats::from_records(&self.records)
    }

    /// Dates of the last thirty days that have a stored ledger
    pub fn history(&self, today: NaiveDate) -> Vec<NaiveDate> {
        self.store.history(today, HISTORY_WINDOW_DAYS)
    }

    /// A stored ledger, addressed by date
    pub fn archived(&self, date: NaiveDate) -> Option<DayLedger> {
        self.store.get(date).map(|records| DayLedger::new(date, records))
    }

    // ------------------------------------------------------------------

    fn export_with<E: LedgerExporter>(
        &mut self,
        exporter: &mut E,
        date: NaiveDate,
        records: &[MedicineRecord],
    ) -> Option<String> {
        match exporter.export(date, records) {
            Ok(file) => {
                self.notify(Notification::success(format!("Excel exported: {}", file)));
                Some(file)
            }
            Err(err) => {
                tracing::warn!("Export of {} failed: {}", date, err);
                self.notify(Notification::error(format!("Export failed: {}", err)));
                None
            }
        }
    }

    /// Hand out `count` consecutive ids starting at or after `now_ms`
    fn reserve_ids(&mut self, now_ms: Timestamp, count: usize) -> MedicineId {
        let highest = self
            .records
            .iter()
            .map(|record| record.id)
            .max()
            .unwrap_or(0)
            .max(self.last_issued_id);
        let first = now_ms.max(highest + 1);
        self.last_issued_id = first + count.saturating_sub(1) as i64;
        first
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}
