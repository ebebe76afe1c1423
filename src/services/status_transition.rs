//! Payment status transitions.
//!
//! Gateway transaction statuses map onto a fixed set of transition actions
//! which are applied to the host order-transaction state machine. Duplicate
//! notifications are absorbed by an idempotence check, and an illegal
//! transition is recovered once by forcing the transaction back to the open
//! baseline and retrying.

use std::str::FromStr;
use std::sync::Arc;

use metrics::counter;
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entities::order_transaction::Model as TransactionModel;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::{OrderRepository, PaymentMethodRepository, TransactionRepository};

/// Internal transition actions, keyed off external gateway statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransitionAction {
    Paid,
    Cancel,
    Refund,
    RefundPartially,
    Reopen,
}

/// Order-transaction states this service moves between. The host may define
/// more; those are never targeted from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionState {
    Open,
    Paid,
    Cancelled,
    Refunded,
    RefundedPartially,
}

/// Maps an external gateway status to a transition action. Total and pure:
/// unknown statuses map to `None` and are ignored by the caller.
pub fn map_status(status: &str) -> Option<TransitionAction> {
    match status {
        "completed" => Some(TransitionAction::Paid),
        "declined" | "cancelled" | "void" | "expired" => Some(TransitionAction::Cancel),
        "refunded" => Some(TransitionAction::Refund),
        "partial_refunded" => Some(TransitionAction::RefundPartially),
        "initialized" => Some(TransitionAction::Reopen),
        _ => None,
    }
}

impl TransitionAction {
    pub fn target_state(self) -> TransactionState {
        match self {
            TransitionAction::Paid => TransactionState::Paid,
            TransitionAction::Cancel => TransactionState::Cancelled,
            TransitionAction::Refund => TransactionState::Refunded,
            TransitionAction::RefundPartially => TransactionState::RefundedPartially,
            TransitionAction::Reopen => TransactionState::Open,
        }
    }
}

/// Which actions are reachable from which states. Reopen is reachable from
/// everywhere; it is the recovery baseline.
fn transition_allowed(from: TransactionState, action: TransitionAction) -> bool {
    use TransactionState::*;
    use TransitionAction::*;

    match (from, action) {
        (_, Reopen) => true,
        (Open, TransitionAction::Paid) | (Open, Cancel) => true,
        (TransactionState::Paid, Refund) | (TransactionState::Paid, RefundPartially) => true,
        (RefundedPartially, Refund) | (RefundedPartially, RefundPartially) => true,
        _ => false,
    }
}

/// Applies transition actions to persisted transactions, enforcing the
/// transition graph.
#[derive(Clone)]
pub struct StateTransitionApplier {
    transactions: TransactionRepository,
}

impl StateTransitionApplier {
    pub fn new(transactions: TransactionRepository) -> Self {
        Self { transactions }
    }

    pub async fn apply(
        &self,
        transaction: TransactionModel,
        action: TransitionAction,
    ) -> Result<TransactionModel, ServiceError> {
        let current = TransactionState::from_str(&transaction.state).map_err(|_| {
            ServiceError::IllegalTransition {
                from: transaction.state.clone(),
                action: action.to_string(),
            }
        })?;

        if !transition_allowed(current, action) {
            return Err(ServiceError::IllegalTransition {
                from: transaction.state.clone(),
                action: action.to_string(),
            });
        }

        let target = action.target_state();
        self.transactions
            .update_state(transaction, target.as_ref())
            .await
    }

    /// Unconditionally moves the transaction back to the open baseline,
    /// bypassing the graph. Only the illegal-transition recovery uses this.
    pub async fn force_reopen(
        &self,
        transaction: TransactionModel,
    ) -> Result<TransactionModel, ServiceError> {
        self.transactions
            .update_state(transaction, TransactionState::Open.as_ref())
            .await
    }
}

/// Maps gateway statuses to state transitions and applies them, with
/// reopen-then-retry recovery and payment-method reconciliation.
#[derive(Clone)]
pub struct PaymentStatusTransitioner {
    applier: StateTransitionApplier,
    transactions: TransactionRepository,
    orders: OrderRepository,
    payment_methods: PaymentMethodRepository,
    event_sender: Arc<EventSender>,
}

impl PaymentStatusTransitioner {
    pub fn new(
        transactions: TransactionRepository,
        orders: OrderRepository,
        payment_methods: PaymentMethodRepository,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            applier: StateTransitionApplier::new(transactions.clone()),
            transactions,
            orders,
            payment_methods,
            event_sender,
        }
    }

    /// Applies the transition for an external gateway status.
    ///
    /// Unmapped statuses are a logged no-op. A transition into the state the
    /// transaction is already in is a no-op as well, so duplicate
    /// notifications cause no duplicate side effects.
    #[instrument(skip(self), fields(transaction_id = %transaction_id, status = %status))]
    pub async fn transition(
        &self,
        status: &str,
        transaction_id: Uuid,
    ) -> Result<(), ServiceError> {
        let Some(action) = map_status(status) else {
            debug!("unmapped gateway status, ignoring");
            return Ok(());
        };

        let transaction = self
            .transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        let target = action.target_state();
        let already_there = match TransactionState::from_str(&transaction.state) {
            Ok(current) => current == target,
            // compatibility fallback for host-defined states this service
            // does not model
            Err(_) => transaction.state == target.as_ref(),
        };
        if already_there {
            debug!(state = %transaction.state, "transaction already in target state");
            return Ok(());
        }

        let old_state = transaction.state.clone();
        let updated = match self.apply_action(transaction.clone(), action).await {
            Ok(updated) => updated,
            Err(ServiceError::IllegalTransition { from, action: act }) => {
                let order_number = self
                    .orders
                    .find_by_id(transaction.order_id)
                    .await?
                    .map(|o| o.order_number)
                    .unwrap_or_default();
                warn!(
                    current_state = %from,
                    requested_action = %act,
                    order_number = %order_number,
                    requested_status = %status,
                    "illegal payment state transition, reopening and retrying once"
                );
                counter!("msp_transitions_recovered_total", 1);

                let reopened = self.applier.force_reopen(transaction).await?;
                // single-shot retry; a second failure propagates
                self.apply_action(reopened, action).await?
            }
            Err(e) => return Err(e),
        };

        counter!("msp_transitions_applied_total", 1, "action" => action.to_string());
        info!(
            old_state = %old_state,
            new_state = %updated.state,
            "payment state transition applied"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentStateChanged {
                transaction_id,
                old_state,
                new_state: updated.state.clone(),
            })
            .await
        {
            warn!("failed to publish payment state event: {}", e);
        }

        Ok(())
    }

    /// Explicit dispatch over the action enum; each named method applies one
    /// transition through the graph-enforcing applier.
    async fn apply_action(
        &self,
        transaction: TransactionModel,
        action: TransitionAction,
    ) -> Result<TransactionModel, ServiceError> {
        match action {
            TransitionAction::Paid => self.mark_paid(transaction).await,
            TransitionAction::Cancel => self.cancel(transaction).await,
            TransitionAction::Refund => self.refund(transaction).await,
            TransitionAction::RefundPartially => self.refund_partially(transaction).await,
            TransitionAction::Reopen => self.reopen(transaction).await,
        }
    }

    async fn mark_paid(
        &self,
        transaction: TransactionModel,
    ) -> Result<TransactionModel, ServiceError> {
        self.applier.apply(transaction, TransitionAction::Paid).await
    }

    async fn cancel(
        &self,
        transaction: TransactionModel,
    ) -> Result<TransactionModel, ServiceError> {
        self.applier
            .apply(transaction, TransitionAction::Cancel)
            .await
    }

    async fn refund(
        &self,
        transaction: TransactionModel,
    ) -> Result<TransactionModel, ServiceError> {
        self.applier
            .apply(transaction, TransitionAction::Refund)
            .await
    }

    async fn refund_partially(
        &self,
        transaction: TransactionModel,
    ) -> Result<TransactionModel, ServiceError> {
        self.applier
            .apply(transaction, TransitionAction::RefundPartially)
            .await
    }

    async fn reopen(
        &self,
        transaction: TransactionModel,
    ) -> Result<TransactionModel, ServiceError> {
        self.applier
            .apply(transaction, TransitionAction::Reopen)
            .await
    }

    /// Re-points the transaction's payment method to the one matching the
    /// gateway-reported payment type, when they diverged (e.g. the card
    /// brand is only known after payment). No-op when the types already
    /// match or no method with that gateway code is configured.
    #[instrument(skip(self), fields(transaction_id = %transaction_id, payment_type = %gateway_payment_type))]
    pub async fn reconcile_payment_method(
        &self,
        transaction_id: Uuid,
        gateway_payment_type: &str,
    ) -> Result<(), ServiceError> {
        let transaction = self
            .transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        if let Some(current) = self
            .payment_methods
            .find_by_id(transaction.payment_method_id)
            .await?
        {
            if current
                .gateway_code
                .eq_ignore_ascii_case(gateway_payment_type)
            {
                return Ok(());
            }
        }

        let Some(matching) = self
            .payment_methods
            .find_by_gateway_code(gateway_payment_type)
            .await?
        else {
            debug!("no payment method configured for reported type, leaving as-is");
            return Ok(());
        };

        info!(
            new_method = %matching.id,
            "re-pointing transaction payment method to gateway-reported type"
        );
        self.transactions
            .update_payment_method(transaction, matching.id)
            .await?;

        Ok(())
    }
}
