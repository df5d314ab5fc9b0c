//! Business logic services.

pub mod customers;
pub mod fulfillment;
pub mod notifications;
pub mod order_status;
pub mod orders;
pub mod reassignment;
pub mod reconciliation;
pub mod transfer;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-order outcome of a batch operation. A failure on one order never
/// aborts the rest; callers get both lists back.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}
