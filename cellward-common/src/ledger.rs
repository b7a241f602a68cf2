//! Occupancy Ledger - cell capacity accounting engine
//!
//! Maintains a reconcilable, invariant-checked view of cell occupancy
//! derived from inmate lifecycle events, and answers availability and
//! capacity queries without a round trip to the records store.
//!
//! Each cell slot carries two numbers: the authoritative `current_count`
//! mirror (whatever the backend last reported) and the live
//! `display_count`, the ledger's own running tally. Mutation operations
//! move only the display count; `refresh_cells` overwrites only the
//! authoritative mirror and static attributes. The two may drift between
//! reconciliations - that is deliberate. `recompute_counts` is the one
//! explicit operation that forcibly realigns the display counts by
//! scanning the tracked Active inmates.
//!
//! The ledger is synchronous and single-owner: every method runs to
//! completion on the calling thread, so a host that shares one instance
//! across tasks wraps it in a mutex and each operation stays atomic.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::events::{CountChangeReason, LedgerEvent};
use crate::models::{Cell, CellStatus, Gender, Inmate};

/// Why an assignment request is not valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AssignmentViolation {
    #[error("Cell not found")]
    CellNotFound,
    #[error("Inmate gender does not match cell type")]
    GenderMismatch,
    #[error("Cell is at capacity")]
    CellAtCapacity,
}

/// A tracked cell: static attributes plus the live display count
#[derive(Debug, Clone, Serialize)]
pub struct CellSlot {
    #[serde(flatten)]
    cell: Cell,
    /// The ledger's running occupancy tally for this cell
    display_count: u32,
}

impl CellSlot {
    fn seeded(cell: Cell) -> Self {
        let display_count = cell.current_count;
        Self {
            cell,
            display_count,
        }
    }

    /// Static attributes and the authoritative count mirror
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    /// The ledger's running occupancy tally
    pub fn display_count(&self) -> u32 {
        self.display_count
    }

    /// Whether another occupant fits under the capacity limit
    pub fn has_space(&self) -> bool {
        self.display_count < self.cell.capacity
    }
}

/// Aggregate occupancy figures across all tracked cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OccupancyStatistics {
    pub total_cells: usize,
    pub total_capacity: u32,
    pub total_occupied: u32,
    /// Sum of per-cell free space, floored at zero per cell
    pub total_available: u32,
    pub cells_at_capacity: usize,
    pub cells_with_space: usize,
}

/// Handle for removing a previously registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type ListenerFn = Box<dyn Fn(&LedgerEvent) + Send>;

/// The occupancy ledger
///
/// Owned by the hosting application and passed explicitly - never a
/// module-level global.
pub struct OccupancyLedger {
    cells: BTreeMap<i64, CellSlot>,
    inmates: BTreeMap<i64, Inmate>,
    listeners: Vec<(SubscriptionId, ListenerFn)>,
    next_subscription: u64,
}

impl Default for OccupancyLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl OccupancyLedger {
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
            inmates: BTreeMap::new(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Reset and reseed the ledger from authoritative records
    ///
    /// Display counts are seeded from each cell's `current_count`.
    /// Idempotent; listeners are kept so observers registered before the
    /// first load keep working. Emits nothing.
    pub fn initialize(&mut self, cells: Vec<Cell>, inmates: Vec<Inmate>) {
        self.cells.clear();
        self.inmates.clear();

        for cell in cells {
            if cell.current_count > cell.capacity {
                warn!(
                    "Cell {} seeded over capacity ({}/{})",
                    cell.id, cell.current_count, cell.capacity
                );
            }
            self.cells.insert(cell.id, CellSlot::seeded(cell));
        }
        for inmate in inmates {
            self.inmates.insert(inmate.id, inmate);
        }
    }

    /// Ingest a newly admitted inmate
    ///
    /// The inmate is tracked unconditionally - an assignment the ledger
    /// cannot count (unknown cell, cell at capacity) still records the
    /// intent, surfaced through the emitted events rather than an error.
    pub fn add_inmate(&mut self, inmate: Inmate) {
        let mut events = Vec::new();

        if inmate.status.is_active() {
            if let Some(cell_id) = inmate.cell_id {
                if let Some(event) = self.try_increment(cell_id, inmate.id, CountChangeReason::InmateAdded)
                {
                    events.push(event);
                }
            }
        }

        events.push(LedgerEvent::InmateAdded {
            inmate: inmate.clone(),
            timestamp: chrono::Utc::now(),
        });
        self.inmates.insert(inmate.id, inmate);

        for event in &events {
            self.publish(event);
        }
    }

    /// Apply an update to a tracked inmate
    ///
    /// The previous snapshot is taken from the argument when supplied,
    /// otherwise from internal storage; with neither available the call
    /// degrades to [`add_inmate`](Self::add_inmate) semantics.
    ///
    /// Occupancy deltas follow the counted-slot transition: the cell in
    /// which the inmate was previously counted (previous cell while
    /// previously Active) versus the cell in which it must now be counted
    /// (new cell while now Active). When the two differ the old slot is
    /// decremented, floored at zero, and the new slot incremented if
    /// capacity allows. A transfer combined with a deactivation therefore
    /// decrements only the old cell and never touches the new one, and a
    /// no-op update produces no count events at all.
    pub fn update_inmate(&mut self, inmate: Inmate, previous: Option<Inmate>) {
        let previous = previous.or_else(|| self.inmates.get(&inmate.id).cloned());
        let Some(previous) = previous else {
            // First sight of this inmate: plain ingest.
            self.add_inmate(inmate);
            return;
        };

        let was = counted_cell(&previous);
        let now = counted_cell(&inmate);

        let mut events = Vec::new();
        if was != now {
            let reason = if previous.cell_id != inmate.cell_id {
                CountChangeReason::InmateMoved
            } else {
                CountChangeReason::StatusChange
            };

            if let Some(old_id) = was {
                if let Some(event) = self.decrement(old_id, reason) {
                    events.push(event);
                }
            }
            if let Some(new_id) = now {
                if let Some(event) = self.try_increment(new_id, inmate.id, reason) {
                    events.push(event);
                }
            }
        }

        events.push(LedgerEvent::InmateUpdated {
            inmate: inmate.clone(),
            previous: Some(previous),
            timestamp: chrono::Utc::now(),
        });
        self.inmates.insert(inmate.id, inmate);

        for event in &events {
            self.publish(event);
        }
    }

    /// Drop an inmate from tracking
    ///
    /// Removing an untracked id is a silent no-op.
    pub fn remove_inmate(&mut self, id: i64) {
        let Some(inmate) = self.inmates.remove(&id) else {
            return;
        };

        let mut events = Vec::new();
        if inmate.status.is_active() {
            if let Some(cell_id) = inmate.cell_id {
                if let Some(event) = self.decrement(cell_id, CountChangeReason::InmateRemoved) {
                    events.push(event);
                }
            }
        }
        events.push(LedgerEvent::InmateRemoved {
            inmate_id: id,
            timestamp: chrono::Utc::now(),
        });

        for event in &events {
            self.publish(event);
        }
    }

    /// Reconcile static cell attributes from the authoritative source
    ///
    /// Overwrites name, capacity, type, status, location and the
    /// authoritative `current_count` mirror for every incoming record.
    /// The live `display_count` is never touched; it only moves through
    /// the mutation operations, `initialize`, or `recompute_counts`.
    /// Unknown cell ids are inserted as new slots seeded from the
    /// authoritative count.
    pub fn refresh_cells(&mut self, fresh: Vec<Cell>) {
        for cell in &fresh {
            match self.cells.get_mut(&cell.id) {
                Some(slot) => {
                    slot.cell = cell.clone();
                }
                None => {
                    self.cells.insert(cell.id, CellSlot::seeded(cell.clone()));
                }
            }
        }

        let event = LedgerEvent::CellsRefreshed {
            cells: fresh,
            timestamp: chrono::Utc::now(),
        };
        self.publish(&event);
    }

    /// Re-derive every display count from the tracked Active inmates
    ///
    /// The explicit realignment pass: scans the full inmate set and
    /// replaces each cell's display count with the derived figure.
    /// Returns the number of cells whose count moved.
    pub fn recompute_counts(&mut self) -> usize {
        let mut derived: BTreeMap<i64, u32> = self.cells.keys().map(|id| (*id, 0)).collect();
        for inmate in self.inmates.values() {
            if inmate.status.is_active() {
                if let Some(cell_id) = inmate.cell_id {
                    if let Some(count) = derived.get_mut(&cell_id) {
                        *count += 1;
                    }
                }
            }
        }

        let mut changed = 0;
        for (id, count) in derived {
            // Every derived key came from self.cells above.
            if let Some(slot) = self.cells.get_mut(&id) {
                if slot.display_count != count {
                    slot.display_count = count;
                    changed += 1;
                }
            }
        }

        let event = LedgerEvent::CountsRecomputed {
            cells_changed: changed,
            timestamp: chrono::Utc::now(),
        };
        self.publish(&event);
        changed
    }

    /// Look up one tracked cell
    pub fn cell(&self, id: i64) -> Option<&CellSlot> {
        self.cells.get(&id)
    }

    /// All tracked cells, in id order
    pub fn cells(&self) -> impl Iterator<Item = &CellSlot> {
        self.cells.values()
    }

    /// Last-known snapshot of a tracked inmate
    pub fn inmate(&self, id: i64) -> Option<&Inmate> {
        self.inmates.get(&id)
    }

    /// Cells that can take another inmate of the given gender
    ///
    /// Matches cell type, requires the cell to be administratively
    /// Active, and requires free space under the display count.
    pub fn available_cells_for(&self, gender: Gender) -> Vec<&CellSlot> {
        self.cells
            .values()
            .filter(|slot| {
                slot.cell.cell_type == gender
                    && slot.cell.status == CellStatus::Active
                    && slot.has_space()
            })
            .collect()
    }

    /// Aggregate occupancy figures across all tracked cells
    pub fn statistics(&self) -> OccupancyStatistics {
        let mut stats = OccupancyStatistics {
            total_cells: self.cells.len(),
            total_capacity: 0,
            total_occupied: 0,
            total_available: 0,
            cells_at_capacity: 0,
            cells_with_space: 0,
        };

        for slot in self.cells.values() {
            stats.total_capacity += slot.cell.capacity;
            stats.total_occupied += slot.display_count;
            stats.total_available += slot.cell.capacity.saturating_sub(slot.display_count);
            if slot.has_space() {
                stats.cells_with_space += 1;
            } else {
                stats.cells_at_capacity += 1;
            }
        }
        stats
    }

    /// Check whether an inmate could be assigned to a cell
    ///
    /// Gender mismatch blocks regardless of free space. Capacity only
    /// blocks Active inmates - an inmate that is not currently counted
    /// does not consume a slot.
    pub fn validate_assignment(
        &self,
        inmate: &Inmate,
        cell_id: i64,
    ) -> std::result::Result<(), AssignmentViolation> {
        let Some(slot) = self.cells.get(&cell_id) else {
            return Err(AssignmentViolation::CellNotFound);
        };
        if slot.cell.cell_type != inmate.gender {
            return Err(AssignmentViolation::GenderMismatch);
        }
        if inmate.status.is_active() && !slot.has_space() {
            return Err(AssignmentViolation::CellAtCapacity);
        }
        Ok(())
    }

    /// Register an observer invoked synchronously after each state change
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&LedgerEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a previously registered observer
    ///
    /// Returns false when the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    /// Guarded increment; emits at-capacity instead of exceeding the limit
    fn try_increment(
        &mut self,
        cell_id: i64,
        inmate_id: i64,
        reason: CountChangeReason,
    ) -> Option<LedgerEvent> {
        let slot = self.cells.get_mut(&cell_id)?;
        if slot.has_space() {
            slot.display_count += 1;
            Some(LedgerEvent::CellCountIncreased {
                cell_id,
                count: slot.display_count,
                reason,
                timestamp: chrono::Utc::now(),
            })
        } else {
            warn!(
                "Cell {} at capacity ({}), not counting inmate {}",
                cell_id, slot.cell.capacity, inmate_id
            );
            Some(LedgerEvent::CellAtCapacity {
                cell_id,
                capacity: slot.cell.capacity,
                inmate_id,
                reason,
                timestamp: chrono::Utc::now(),
            })
        }
    }

    /// Decrement floored at zero
    fn decrement(&mut self, cell_id: i64, reason: CountChangeReason) -> Option<LedgerEvent> {
        let slot = self.cells.get_mut(&cell_id)?;
        slot.display_count = slot.display_count.saturating_sub(1);
        Some(LedgerEvent::CellCountDecreased {
            cell_id,
            count: slot.display_count,
            reason,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Invoke every listener; a panicking listener is contained and
    /// logged, and never prevents the remaining listeners from running.
    fn publish(&self, event: &LedgerEvent) {
        for (id, listener) in &self.listeners {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
            if outcome.is_err() {
                error!(
                    "Occupancy listener {:?} panicked handling {}",
                    id,
                    event.event_type()
                );
            }
        }
    }
}

/// The cell this inmate currently counts toward, if any
fn counted_cell(inmate: &Inmate) -> Option<i64> {
    if inmate.status.is_active() {
        inmate.cell_id
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InmateStatus;
    use std::sync::{Arc, Mutex};

    fn cell(id: i64, capacity: u32, current_count: u32, cell_type: Gender) -> Cell {
        Cell {
            id,
            name: format!("C-{}", id),
            capacity,
            current_count,
            cell_type,
            status: CellStatus::Active,
            location: None,
        }
    }

    fn inmate(id: i64, gender: Gender, status: InmateStatus, cell_id: Option<i64>) -> Inmate {
        Inmate {
            id,
            first_name: "Test".to_string(),
            last_name: format!("Inmate{}", id),
            gender,
            status,
            cell_id,
        }
    }

    /// Ledger plus a recorder capturing every published event
    fn recording_ledger(cells: Vec<Cell>) -> (OccupancyLedger, Arc<Mutex<Vec<LedgerEvent>>>) {
        let mut ledger = OccupancyLedger::new();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        ledger.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        ledger.initialize(cells, vec![]);
        (ledger, recorded)
    }

    fn count_events(events: &[LedgerEvent]) -> Vec<&'static str> {
        events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    LedgerEvent::CellCountIncreased { .. }
                        | LedgerEvent::CellCountDecreased { .. }
                        | LedgerEvent::CellAtCapacity { .. }
                )
            })
            .map(|e| e.event_type())
            .collect()
    }

    #[test]
    fn test_add_active_inmate_increments() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);

        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));

        assert_eq!(ledger.cell(1).unwrap().display_count(), 1);
        let events = recorded.lock().unwrap();
        match &events[0] {
            LedgerEvent::CellCountIncreased {
                cell_id,
                count,
                reason,
                ..
            } => {
                assert_eq!(*cell_id, 1);
                assert_eq!(*count, 1);
                assert_eq!(*reason, CountChangeReason::InmateAdded);
            }
            other => panic!("expected CellCountIncreased, got {}", other.event_type()),
        }
        assert!(matches!(events[1], LedgerEvent::InmateAdded { .. }));
    }

    /// Full scenario: two admissions fill the cell, the third is blocked
    /// but still tracked with its requested assignment.
    #[test]
    fn test_add_over_capacity_blocks_but_tracks() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);

        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        ledger.add_inmate(inmate(11, Gender::Male, InmateStatus::Active, Some(1)));
        assert_eq!(ledger.cell(1).unwrap().display_count(), 2);

        ledger.add_inmate(inmate(12, Gender::Male, InmateStatus::Active, Some(1)));

        // Count unchanged, warning emitted, intent recorded.
        assert_eq!(ledger.cell(1).unwrap().display_count(), 2);
        assert_eq!(ledger.inmate(12).unwrap().cell_id, Some(1));

        let events = recorded.lock().unwrap();
        let at_capacity: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, LedgerEvent::CellAtCapacity { .. }))
            .collect();
        assert_eq!(at_capacity.len(), 1);
        match at_capacity[0] {
            LedgerEvent::CellAtCapacity {
                cell_id,
                capacity,
                inmate_id,
                ..
            } => {
                assert_eq!(*cell_id, 1);
                assert_eq!(*capacity, 2);
                assert_eq!(*inmate_id, 12);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_add_with_unknown_cell_tracked_without_effect() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);

        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(99)));

        assert_eq!(ledger.cell(1).unwrap().display_count(), 0);
        assert!(ledger.inmate(10).is_some());
        let events = recorded.lock().unwrap();
        assert!(count_events(&events).is_empty());
        assert!(matches!(events[0], LedgerEvent::InmateAdded { .. }));
    }

    #[test]
    fn test_add_inactive_inmate_not_counted() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);

        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Medical, Some(1)));

        assert_eq!(ledger.cell(1).unwrap().display_count(), 0);
        assert!(count_events(&recorded.lock().unwrap()).is_empty());
    }

    #[test]
    fn test_noop_update_emits_no_count_events() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 4, 0, Gender::Male)]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        recorded.lock().unwrap().clear();

        // Same cell, same status.
        ledger.update_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)), None);

        assert_eq!(ledger.cell(1).unwrap().display_count(), 1);
        let events = recorded.lock().unwrap();
        assert!(count_events(&events).is_empty());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LedgerEvent::InmateUpdated { .. }));
    }

    #[test]
    fn test_transfer_moves_count_between_cells() {
        let (mut ledger, recorded) = recording_ledger(vec![
            cell(1, 2, 0, Gender::Male),
            cell(2, 2, 0, Gender::Male),
        ]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        recorded.lock().unwrap().clear();

        ledger.update_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(2)), None);

        assert_eq!(ledger.cell(1).unwrap().display_count(), 0);
        assert_eq!(ledger.cell(2).unwrap().display_count(), 1);

        let events = recorded.lock().unwrap();
        assert_eq!(
            count_events(&events),
            vec!["CellCountDecreased", "CellCountIncreased"]
        );
        for event in events.iter() {
            match event {
                LedgerEvent::CellCountDecreased { reason, .. }
                | LedgerEvent::CellCountIncreased { reason, .. } => {
                    assert_eq!(*reason, CountChangeReason::InmateMoved);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_transfer_into_full_cell_blocked() {
        let (mut ledger, recorded) = recording_ledger(vec![
            cell(1, 2, 0, Gender::Male),
            cell(2, 1, 1, Gender::Male),
        ]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        recorded.lock().unwrap().clear();

        ledger.update_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(2)), None);

        // Old cell released its slot; the full cell was left untouched.
        assert_eq!(ledger.cell(1).unwrap().display_count(), 0);
        assert_eq!(ledger.cell(2).unwrap().display_count(), 1);
        assert_eq!(
            count_events(&recorded.lock().unwrap()),
            vec!["CellCountDecreased", "CellAtCapacity"]
        );
    }

    #[test]
    fn test_status_change_releases_slot() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        recorded.lock().unwrap().clear();

        ledger.update_inmate(inmate(10, Gender::Male, InmateStatus::Released, Some(1)), None);

        assert_eq!(ledger.cell(1).unwrap().display_count(), 0);
        let events = recorded.lock().unwrap();
        match &events[0] {
            LedgerEvent::CellCountDecreased { reason, .. } => {
                assert_eq!(*reason, CountChangeReason::StatusChange);
            }
            other => panic!("expected CellCountDecreased, got {}", other.event_type()),
        }
    }

    #[test]
    fn test_status_change_to_active_counts_with_capacity_guard() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 1, 0, Gender::Male)]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Medical, Some(1)));
        ledger.add_inmate(inmate(11, Gender::Male, InmateStatus::Active, Some(1)));
        recorded.lock().unwrap().clear();

        // Returning from medical, but the only slot is now taken.
        ledger.update_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)), None);

        assert_eq!(ledger.cell(1).unwrap().display_count(), 1);
        let events = recorded.lock().unwrap();
        match &events[0] {
            LedgerEvent::CellAtCapacity { reason, .. } => {
                assert_eq!(*reason, CountChangeReason::StatusChange);
            }
            other => panic!("expected CellAtCapacity, got {}", other.event_type()),
        }
    }

    /// Transfer and deactivation in one call: only the old cell moves.
    #[test]
    fn test_combined_transfer_and_release_decrements_only_old_cell() {
        let (mut ledger, recorded) = recording_ledger(vec![
            cell(1, 2, 0, Gender::Male),
            cell(2, 2, 1, Gender::Male),
        ]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        recorded.lock().unwrap().clear();

        ledger.update_inmate(
            inmate(10, Gender::Male, InmateStatus::Released, Some(2)),
            None,
        );

        assert_eq!(ledger.cell(1).unwrap().display_count(), 0);
        assert_eq!(ledger.cell(2).unwrap().display_count(), 1);

        let events = recorded.lock().unwrap();
        assert_eq!(count_events(&events), vec!["CellCountDecreased"]);
        match &events[0] {
            LedgerEvent::CellCountDecreased {
                cell_id, reason, ..
            } => {
                assert_eq!(*cell_id, 1);
                assert_eq!(*reason, CountChangeReason::InmateMoved);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_combined_transfer_and_activation_increments_only_new_cell() {
        let (mut ledger, recorded) = recording_ledger(vec![
            cell(1, 2, 1, Gender::Male),
            cell(2, 2, 0, Gender::Male),
        ]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Medical, Some(1)));
        recorded.lock().unwrap().clear();

        ledger.update_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(2)), None);

        // Cell 1 never counted this inmate, so it must not be decremented.
        assert_eq!(ledger.cell(1).unwrap().display_count(), 1);
        assert_eq!(ledger.cell(2).unwrap().display_count(), 1);
        assert_eq!(
            count_events(&recorded.lock().unwrap()),
            vec!["CellCountIncreased"]
        );
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);

        // Previous snapshot supplied by the caller claims the inmate was
        // Active in cell 1, which the ledger never counted.
        ledger.update_inmate(
            inmate(10, Gender::Male, InmateStatus::Released, Some(1)),
            Some(inmate(10, Gender::Male, InmateStatus::Active, Some(1))),
        );

        assert_eq!(ledger.cell(1).unwrap().display_count(), 0);
        let events = recorded.lock().unwrap();
        match &events[0] {
            LedgerEvent::CellCountDecreased { count, .. } => assert_eq!(*count, 0),
            other => panic!("expected CellCountDecreased, got {}", other.event_type()),
        }
    }

    #[test]
    fn test_remove_inmate_decrements_and_untracks() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        recorded.lock().unwrap().clear();

        ledger.remove_inmate(10);

        assert_eq!(ledger.cell(1).unwrap().display_count(), 0);
        assert!(ledger.inmate(10).is_none());
        let events = recorded.lock().unwrap();
        assert_eq!(count_events(&events), vec!["CellCountDecreased"]);
        assert!(matches!(
            events.last().unwrap(),
            LedgerEvent::InmateRemoved { inmate_id: 10, .. }
        ));
    }

    #[test]
    fn test_remove_untracked_is_silent() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);

        ledger.remove_inmate(404);

        assert!(recorded.lock().unwrap().is_empty());
    }

    #[test]
    fn test_update_without_previous_behaves_like_add() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);

        ledger.update_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)), None);

        assert_eq!(ledger.cell(1).unwrap().display_count(), 1);
        let events = recorded.lock().unwrap();
        assert_eq!(count_events(&events), vec!["CellCountIncreased"]);
        assert!(matches!(events[1], LedgerEvent::InmateAdded { .. }));
    }

    #[test]
    fn test_validate_gender_mismatch_beats_free_space() {
        let (ledger, _) = recording_ledger(vec![cell(1, 10, 0, Gender::Female)]);

        let candidate = inmate(10, Gender::Male, InmateStatus::Active, None);
        assert_eq!(
            ledger.validate_assignment(&candidate, 1),
            Err(AssignmentViolation::GenderMismatch)
        );
    }

    #[test]
    fn test_validate_inactive_inmate_ignores_capacity() {
        let (ledger, _) = recording_ledger(vec![cell(1, 1, 1, Gender::Male)]);

        let candidate = inmate(10, Gender::Male, InmateStatus::Medical, None);
        assert!(ledger.validate_assignment(&candidate, 1).is_ok());
    }

    #[test]
    fn test_validate_active_inmate_blocked_by_capacity() {
        let (ledger, _) = recording_ledger(vec![cell(1, 1, 1, Gender::Male)]);

        let candidate = inmate(10, Gender::Male, InmateStatus::Active, None);
        assert_eq!(
            ledger.validate_assignment(&candidate, 1),
            Err(AssignmentViolation::CellAtCapacity)
        );
    }

    #[test]
    fn test_validate_unknown_cell() {
        let (ledger, _) = recording_ledger(vec![]);

        let candidate = inmate(10, Gender::Male, InmateStatus::Active, None);
        assert_eq!(
            ledger.validate_assignment(&candidate, 42),
            Err(AssignmentViolation::CellNotFound)
        );
    }

    /// Reconciliation must never clobber the live display count.
    #[test]
    fn test_refresh_preserves_display_count() {
        let (mut ledger, recorded) = recording_ledger(vec![cell(1, 20, 15, Gender::Male)]);
        for id in 0..3 {
            ledger.add_inmate(inmate(100 + id, Gender::Male, InmateStatus::Active, Some(1)));
        }
        assert_eq!(ledger.cell(1).unwrap().display_count(), 18);
        recorded.lock().unwrap().clear();

        let mut fresh = cell(1, 24, 15, Gender::Male);
        fresh.name = "A-Wing".to_string();
        ledger.refresh_cells(vec![fresh]);

        let slot = ledger.cell(1).unwrap();
        assert_eq!(slot.display_count(), 18);
        assert_eq!(slot.cell().capacity, 24);
        assert_eq!(slot.cell().name, "A-Wing");
        assert_eq!(slot.cell().current_count, 15);

        let events = recorded.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LedgerEvent::CellsRefreshed { .. }));
    }

    #[test]
    fn test_refresh_inserts_unknown_cells() {
        let (mut ledger, _) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);

        ledger.refresh_cells(vec![cell(2, 6, 4, Gender::Female)]);

        let slot = ledger.cell(2).unwrap();
        assert_eq!(slot.display_count(), 4);
        assert_eq!(slot.cell().capacity, 6);
    }

    #[test]
    fn test_recompute_realigns_drifted_counts() {
        let (mut ledger, recorded) = recording_ledger(vec![
            cell(1, 4, 3, Gender::Male), // seeded high, only one tracked occupant
            cell(2, 4, 0, Gender::Male),
        ]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        assert_eq!(ledger.cell(1).unwrap().display_count(), 4);
        recorded.lock().unwrap().clear();

        let changed = ledger.recompute_counts();

        assert_eq!(changed, 1);
        assert_eq!(ledger.cell(1).unwrap().display_count(), 1);
        assert_eq!(ledger.cell(2).unwrap().display_count(), 0);
        assert!(matches!(
            recorded.lock().unwrap()[0],
            LedgerEvent::CountsRecomputed { cells_changed: 1, .. }
        ));
    }

    #[test]
    fn test_initialize_resets_state() {
        let (mut ledger, _) = recording_ledger(vec![cell(1, 2, 0, Gender::Male)]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));

        ledger.initialize(vec![cell(2, 3, 1, Gender::Female)], vec![]);

        assert!(ledger.cell(1).is_none());
        assert!(ledger.inmate(10).is_none());
        assert_eq!(ledger.cell(2).unwrap().display_count(), 1);

        // Safe to call again.
        ledger.initialize(vec![cell(2, 3, 1, Gender::Female)], vec![]);
        assert_eq!(ledger.cells().count(), 1);
    }

    #[test]
    fn test_available_cells_filter() {
        let mut maintenance = cell(3, 4, 0, Gender::Female);
        maintenance.status = CellStatus::Maintenance;

        let (mut ledger, _) = recording_ledger(vec![
            cell(1, 1, 1, Gender::Female), // full
            cell(2, 4, 0, Gender::Female),
            maintenance,                  // not Active
            cell(4, 4, 0, Gender::Male),  // wrong type
        ]);
        ledger.add_inmate(inmate(10, Gender::Female, InmateStatus::Active, Some(2)));

        let available = ledger.available_cells_for(Gender::Female);
        let ids: Vec<i64> = available.iter().map(|s| s.cell().id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_statistics_aggregation() {
        let (mut ledger, _) = recording_ledger(vec![
            cell(1, 2, 2, Gender::Male),   // at capacity
            cell(2, 4, 1, Gender::Male),   // space
            cell(3, 1, 3, Gender::Female), // seeded over capacity
        ]);

        let stats = ledger.statistics();
        assert_eq!(stats.total_cells, 3);
        assert_eq!(stats.total_capacity, 7);
        assert_eq!(stats.total_occupied, 6);
        // Over-capacity cell contributes zero availability, not negative.
        assert_eq!(stats.total_available, 3);
        assert_eq!(stats.cells_at_capacity, 2);
        assert_eq!(stats.cells_with_space, 1);
    }

    /// Mutation operations can never push a count past capacity; only
    /// seeding (initialize / refresh) may produce an over-capacity slot.
    #[test]
    fn test_capacity_invariant_over_mutation_sequence() {
        let (mut ledger, _) = recording_ledger(vec![
            cell(1, 2, 0, Gender::Male),
            cell(2, 1, 0, Gender::Male),
        ]);

        for id in 0..6 {
            ledger.add_inmate(inmate(id, Gender::Male, InmateStatus::Active, Some(1)));
        }
        for id in 0..6 {
            ledger.update_inmate(inmate(id, Gender::Male, InmateStatus::Active, Some(2)), None);
        }
        for id in 0..3 {
            ledger.remove_inmate(id);
        }
        for id in 3..6 {
            ledger.update_inmate(inmate(id, Gender::Male, InmateStatus::Active, Some(1)), None);
        }

        for slot in ledger.cells() {
            assert!(
                slot.display_count() <= slot.cell().capacity,
                "cell {} over capacity: {}/{}",
                slot.cell().id,
                slot.display_count(),
                slot.cell().capacity
            );
        }
    }

    #[test]
    fn test_listener_panic_does_not_stop_delivery() {
        let mut ledger = OccupancyLedger::new();
        ledger.subscribe(|_event| panic!("listener failure"));

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        ledger.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        ledger.initialize(vec![cell(1, 2, 0, Gender::Male)], vec![]);
        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));

        // State change applied and the second listener still notified.
        assert_eq!(ledger.cell(1).unwrap().display_count(), 1);
        assert_eq!(recorded.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut ledger = OccupancyLedger::new();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        let id = ledger.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        ledger.initialize(vec![cell(1, 2, 0, Gender::Male)], vec![]);

        assert!(ledger.unsubscribe(id));
        assert!(!ledger.unsubscribe(id));

        ledger.add_inmate(inmate(10, Gender::Male, InmateStatus::Active, Some(1)));
        assert!(recorded.lock().unwrap().is_empty());
    }
}
