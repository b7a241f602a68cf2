//! Bridge from the synchronous ledger observer registry to the EventBus
//!
//! The ledger notifies its listeners inline on the mutating call; the SSE
//! endpoint wants an async broadcast stream. This bridge subscribes a
//! forwarding listener so every `LedgerEvent` lands on the bus.

use cellward_common::ledger::SubscriptionId;
use cellward_common::{EventBus, OccupancyLedger};
use tracing::debug;

/// Register a listener forwarding all ledger events into the bus
///
/// Emit failures (no SSE client connected) are expected and logged at
/// debug; the ledger state change has already been applied.
pub fn register_event_bridge(ledger: &mut OccupancyLedger, bus: EventBus) -> SubscriptionId {
    ledger.subscribe(move |event| {
        if bus.emit(event.clone()).is_err() {
            debug!("No subscribers for {} event, dropped", event.event_type());
        }
    })
}
