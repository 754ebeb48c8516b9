use crate::models::OrderStatus;
use serde::{Deserialize, Serialize};

/// How strictly status transitions are validated.
///
/// Operators historically sequenced orders by hand, so `Permissive` applies
/// any event to any non-terminal order and is the default. `Guarded`
/// validates events against the legal edge set and refuses everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionPolicy {
    Permissive,
    Guarded,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        TransitionPolicy::Permissive
    }
}

/// Workflow events an order can receive. Transfer and issue are raised by
/// invoice/issuance creation; the rest come from the explicit status
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowEvent {
    StartWork,
    ScheduleFitting,
    SendToRework,
    MarkReady,
    TransferToWarehouse,
    Issue,
    Cancel,
}

impl WorkflowEvent {
    /// Status the order ends up in when the event is accepted
    pub fn target(&self) -> OrderStatus {
        match self {
            WorkflowEvent::StartWork => OrderStatus::InWork,
            WorkflowEvent::ScheduleFitting => OrderStatus::WaitingFitting,
            WorkflowEvent::SendToRework => OrderStatus::OnRework,
            WorkflowEvent::MarkReady => OrderStatus::ReadyForTransfer,
            WorkflowEvent::TransferToWarehouse => OrderStatus::TransferredToWarehouse,
            WorkflowEvent::Issue => OrderStatus::Issued,
            WorkflowEvent::Cancel => OrderStatus::Canceled,
        }
    }

    /// Source states the event is legal from under the guarded policy
    fn legal_sources(&self) -> &'static [OrderStatus] {
        match self {
            WorkflowEvent::StartWork => &[OrderStatus::Draft],
            // Fitting rounds may repeat after rework, up to the three
            // rounds recorded on the order.
            WorkflowEvent::ScheduleFitting => &[OrderStatus::InWork, OrderStatus::OnRework],
            WorkflowEvent::SendToRework => &[OrderStatus::WaitingFitting],
            WorkflowEvent::MarkReady => &[OrderStatus::WaitingFitting, OrderStatus::OnRework],
            WorkflowEvent::TransferToWarehouse => &[OrderStatus::ReadyForTransfer],
            WorkflowEvent::Issue => &[OrderStatus::TransferredToWarehouse],
            WorkflowEvent::Cancel => &[
                OrderStatus::Draft,
                OrderStatus::InWork,
                OrderStatus::WaitingFitting,
                OrderStatus::OnRework,
                OrderStatus::ReadyForTransfer,
                OrderStatus::TransferredToWarehouse,
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: &'static str, event: String },
}

/// Apply a workflow event to a status under the given policy.
///
/// Permissive mode mirrors the historical behavior: every event lands on
/// its target status no matter where the order currently is, except that
/// cancellation of a terminal order is refused. Guarded mode accepts an
/// event only from its legal source states.
pub fn transition(
    current: OrderStatus,
    event: WorkflowEvent,
    policy: TransitionPolicy,
) -> Result<OrderStatus, WorkflowError> {
    match policy {
        TransitionPolicy::Permissive => {
            if event == WorkflowEvent::Cancel && current.is_terminal() {
                return Err(WorkflowError::InvalidTransition {
                    from: current.as_str(),
                    event: format!("{:?}", event),
                });
            }
            Ok(event.target())
        }
        TransitionPolicy::Guarded => {
            if event.legal_sources().contains(&current) {
                Ok(event.target())
            } else {
                Err(WorkflowError::InvalidTransition {
                    from: current.as_str(),
                    event: format!("{:?}", event),
                })
            }
        }
    }
}
