pub mod order_request;
pub mod payments;
pub mod status_transition;

pub use payments::PaymentService;
pub use status_transition::{PaymentStatusTransitioner, StateTransitionApplier};
