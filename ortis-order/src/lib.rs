pub mod models;
pub mod workflow;

pub use models::{
    NewOrder, Order, OrderFilter, OrderStatus, OrderType, OrderUpdate, OrderValidationError,
    PaymentType, Urgency, WorkshopKind,
};
pub use workflow::{transition, TransitionPolicy, WorkflowError, WorkflowEvent};
