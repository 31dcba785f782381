pub mod callback_slot;

pub use callback_slot::CallbackSlot;
