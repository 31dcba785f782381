pub mod order;
pub mod requests;
pub mod ws;

pub use order::{
    LifecycleStage, OrderProgress, OrderResponse, OrderStatus, StepState, TerminalStatus,
};
pub use requests::{
    AdoptOrderRequest, EncryptedInput, PlaceMarketOrderRequest, StatusUpdateResponse,
    SwapRequest, TrackOrderRequest, TrackTransactionRequest, TransactionSubmitted,
    UpdateStatusRequest,
};
