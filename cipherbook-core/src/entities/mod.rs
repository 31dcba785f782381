pub mod lifecycle;
pub mod order;

pub use lifecycle::{IgnoreReason, LifecycleEvent, Stage, Transition};
pub use order::{NewOrder, Order, OrderId};

use alloy_primitives::U256;
use cipherbook_sdk::objects::LifecycleStage;

/// Opaque ciphertext handle; the cross-transaction correlation key.
pub type Handle = U256;

impl From<Stage> for LifecycleStage {
    fn from(value: Stage) -> Self {
        match value {
            Stage::Created => LifecycleStage::Created,
            Stage::AwaitingConfirmation => LifecycleStage::AwaitingConfirmation,
            Stage::Confirmed => LifecycleStage::Confirmed,
            Stage::AwaitingDecryption => LifecycleStage::AwaitingDecryption,
            Stage::Decrypted => LifecycleStage::Decrypted,
            Stage::Queued => LifecycleStage::Queued,
            Stage::Settled => LifecycleStage::Settled,
            Stage::Failed => LifecycleStage::Failed,
        }
    }
}

impl From<LifecycleStage> for Stage {
    fn from(value: LifecycleStage) -> Self {
        match value {
            LifecycleStage::Created => Stage::Created,
            LifecycleStage::AwaitingConfirmation => Stage::AwaitingConfirmation,
            LifecycleStage::Confirmed => Stage::Confirmed,
            LifecycleStage::AwaitingDecryption => Stage::AwaitingDecryption,
            LifecycleStage::Decrypted => Stage::Decrypted,
            LifecycleStage::Queued => Stage::Queued,
            LifecycleStage::Settled => Stage::Settled,
            LifecycleStage::Failed => Stage::Failed,
        }
    }
}
