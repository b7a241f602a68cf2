//! Event types for the CellWard event system
//!
//! Provides the shared `LedgerEvent` definitions emitted by the Occupancy
//! Ledger, and the `EventBus` used by services to fan those events out to
//! SSE clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{Cell, Inmate};

/// Why a cell's display count changed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CountChangeReason {
    /// A newly admitted inmate was counted into the cell
    InmateAdded,
    /// The inmate's cell assignment changed
    InmateMoved,
    /// The inmate's custody status changed
    StatusChange,
    /// The inmate was removed from tracking
    InmateRemoved,
}

impl std::fmt::Display for CountChangeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountChangeReason::InmateAdded => write!(f, "inmate_added"),
            CountChangeReason::InmateMoved => write!(f, "inmate_moved"),
            CountChangeReason::StatusChange => write!(f, "status_change"),
            CountChangeReason::InmateRemoved => write!(f, "inmate_removed"),
        }
    }
}

/// CellWard occupancy events
///
/// Emitted synchronously by the Occupancy Ledger after each state change,
/// and broadcast via EventBus for SSE transmission. Mutation events are
/// published only after the ledger state change has been applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// A cell's display count went up by one
    CellCountIncreased {
        cell_id: i64,
        /// Display count after the increment
        count: u32,
        reason: CountChangeReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A cell's display count went down by one (floored at zero)
    CellCountDecreased {
        cell_id: i64,
        /// Display count after the decrement
        count: u32,
        reason: CountChangeReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An increment was blocked because the cell is at capacity
    ///
    /// The triggering inmate is still tracked; the count is untouched.
    CellAtCapacity {
        cell_id: i64,
        capacity: u32,
        /// Inmate whose assignment could not be counted
        inmate_id: i64,
        reason: CountChangeReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An inmate entered ledger tracking
    InmateAdded {
        inmate: Inmate,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A tracked inmate's snapshot was replaced
    InmateUpdated {
        inmate: Inmate,
        /// Snapshot before the update
        previous: Option<Inmate>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An inmate left ledger tracking
    InmateRemoved {
        inmate_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Authoritative cell attributes were reconciled from the backend
    CellsRefreshed {
        cells: Vec<Cell>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Display counts were re-derived from the tracked inmate set
    CountsRecomputed {
        /// Number of cells whose display count moved
        cells_changed: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl LedgerEvent {
    /// Get event type as string for SSE naming and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::CellCountIncreased { .. } => "CellCountIncreased",
            LedgerEvent::CellCountDecreased { .. } => "CellCountDecreased",
            LedgerEvent::CellAtCapacity { .. } => "CellAtCapacity",
            LedgerEvent::InmateAdded { .. } => "InmateAdded",
            LedgerEvent::InmateUpdated { .. } => "InmateUpdated",
            LedgerEvent::InmateRemoved { .. } => "InmateRemoved",
            LedgerEvent::CellsRefreshed { .. } => "CellsRefreshed",
            LedgerEvent::CountsRecomputed { .. } => "CountsRecomputed",
        }
    }
}

/// Broadcast bus carrying `LedgerEvent`s to SSE subscribers
///
/// Thin wrapper over `tokio::sync::broadcast`. Subscribers that lag past
/// the channel capacity lose the oldest events, which is acceptable for
/// UI observers (they can re-query the ledger at any time).
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the subscriber count, or an error when no subscriber is
    /// listening (the event is dropped).
    pub fn emit(
        &self,
        event: LedgerEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<LedgerEvent>> {
        self.tx.send(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, InmateStatus};

    #[test]
    fn test_event_type_names() {
        let ev = LedgerEvent::CellCountIncreased {
            cell_id: 1,
            count: 3,
            reason: CountChangeReason::InmateAdded,
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(ev.event_type(), "CellCountIncreased");

        let ev = LedgerEvent::CountsRecomputed {
            cells_changed: 0,
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(ev.event_type(), "CountsRecomputed");
    }

    #[test]
    fn test_event_serialization_tagged() {
        let ev = LedgerEvent::CellAtCapacity {
            cell_id: 7,
            capacity: 2,
            inmate_id: 12,
            reason: CountChangeReason::StatusChange,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"CellAtCapacity\""));
        assert!(json.contains("\"reason\":\"status_change\""));

        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        match back {
            LedgerEvent::CellAtCapacity {
                cell_id,
                capacity,
                inmate_id,
                ..
            } => {
                assert_eq!(cell_id, 7);
                assert_eq!(capacity, 2);
                assert_eq!(inmate_id, 12);
            }
            _ => panic!("Wrong event type deserialized"),
        }
    }

    #[tokio::test]
    async fn test_event_bus_round_trip() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let inmate = Inmate {
            id: 1,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            gender: Gender::Male,
            status: InmateStatus::Active,
            cell_id: None,
        };

        bus.emit(LedgerEvent::InmateAdded {
            inmate,
            timestamp: chrono::Utc::now(),
        })
        .expect("one subscriber");

        match rx.recv().await.unwrap() {
            LedgerEvent::InmateAdded { inmate, .. } => assert_eq!(inmate.id, 1),
            other => panic!("unexpected event: {}", other.event_type()),
        }
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(4);
        let result = bus.emit(LedgerEvent::CountsRecomputed {
            cells_changed: 1,
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
    }
}
