//! Payment orchestration: initiating gateway payments, processing inbound
//! notifications, and requesting refunds.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::order::Model as OrderModel;
use crate::entities::order_transaction::Model as TransactionModel;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::{self, GatewayClient, Issuer, OrderData, RefundRequest};
use crate::models::{order_request::to_minor_units, NotificationPayload, OrderType};
use crate::repositories::{OrderRepository, PaymentMethodRepository, TransactionRepository};
use crate::services::order_request::{
    ChannelContext, OrderRequestAssembler, PaymentFormData, PaymentOrder, TransactionContext,
};
use crate::services::status_transition::PaymentStatusTransitioner;

#[derive(Debug, Clone)]
pub struct InitiatePayment {
    pub order_id: Uuid,
    pub gateway_code: String,
    pub order_type: OrderType,
    pub form: PaymentFormData,
}

#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub order_id: String,
    pub transaction_id: Uuid,
    /// Present for redirect payments; direct payments finish inline
    pub payment_url: Option<String>,
}

#[derive(Clone)]
pub struct PaymentService {
    config: AppConfig,
    orders: OrderRepository,
    transactions: TransactionRepository,
    transitioner: PaymentStatusTransitioner,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let orders = OrderRepository::new(db.clone());
        let transactions = TransactionRepository::new(db.clone());
        let payment_methods = PaymentMethodRepository::new(db);
        let transitioner = PaymentStatusTransitioner::new(
            transactions.clone(),
            orders.clone(),
            payment_methods,
            event_sender.clone(),
        );

        Self {
            config,
            orders,
            transactions,
            transitioner,
            event_sender,
        }
    }

    pub fn transitioner(&self) -> &PaymentStatusTransitioner {
        &self.transitioner
    }

    fn channel_context(&self, order: &OrderModel) -> ChannelContext {
        ChannelContext {
            channel_id: order.sales_channel_id.clone(),
            currency: order.currency.clone(),
            base_url: self.config.public_base_url.clone(),
            shop_version: self.config.shop_version.clone(),
            settings: self.config.gateway_settings(&order.sales_channel_id),
        }
    }

    /// Assembles the order request for the order's latest transaction and
    /// creates the order at the gateway.
    #[instrument(skip(self, request), fields(order_id = %request.order_id, gateway = %request.gateway_code))]
    pub async fn initiate_payment(
        &self,
        request: InitiatePayment,
    ) -> Result<InitiatedPayment, ServiceError> {
        let order = self
            .orders
            .find_by_id(request.order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", request.order_id))
            })?;
        let items = self.orders.get_order_items(order.id).await?;
        let transaction = self
            .transactions
            .find_latest_by_order(order.id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} has no open transaction", order.id))
            })?;

        let channel = self.channel_context(&order);
        let payment_order = PaymentOrder { order, items };
        let txn_ctx = TransactionContext {
            transaction_id: transaction.id,
        };

        let mut gateway_info = Map::new();
        if let Some(issuer_id) = request.form.issuer_id.as_deref().filter(|i| !i.is_empty()) {
            gateway_info.insert("issuer_id".to_string(), Value::String(issuer_id.to_string()));
        }

        let assembler = OrderRequestAssembler::for_channel(&channel);
        let order_request = assembler.build(
            &txn_ctx,
            &payment_order,
            &request.form,
            &channel,
            &request.gateway_code,
            request.order_type,
            gateway_info,
        )?;

        let client = GatewayClient::from_settings(&channel.settings)?;
        let created = client.create_order(&order_request).await?;

        if let Some(gateway_txn_id) = created.transaction_id.as_deref() {
            self.transactions
                .set_gateway_transaction_id(transaction.clone(), gateway_txn_id)
                .await?;
        }

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentInitiated {
                order_id: payment_order.order.id,
                transaction_id: transaction.id,
                gateway: request.gateway_code.clone(),
            })
            .await
        {
            warn!("failed to publish payment initiated event: {}", e);
        }

        Ok(InitiatedPayment {
            order_id: created.order_id,
            transaction_id: transaction.id,
            payment_url: created.payment_url,
        })
    }

    /// Processes a verified gateway notification: applies the status
    /// transition and reconciles the payment method when the gateway
    /// reports a more specific type than the shopper selected.
    ///
    /// The raw body is parsed before verification only to locate the order
    /// (and through it the channel whose api key signs the notification);
    /// nothing is acted on until the signature checks out.
    #[instrument(skip_all)]
    pub async fn process_notification(
        &self,
        body: &[u8],
        auth_header: &str,
    ) -> Result<(), ServiceError> {
        let payload: NotificationPayload = serde_json::from_slice(body)
            .map_err(|e| ServiceError::BadRequest(format!("invalid notification body: {e}")))?;

        let order = self
            .orders
            .find_by_order_number(&payload.order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", payload.order_id))
            })?;

        let settings = self.config.gateway_settings(&order.sales_channel_id);
        if !gateway::verify_notification(body, auth_header, &settings.api_key) {
            return Err(ServiceError::Unauthorized(
                "notification signature verification failed".to_string(),
            ));
        }

        let Some(status) = payload.status.as_deref() else {
            debug!(order_number = %payload.order_id, "notification without status, nothing to do");
            return Ok(());
        };

        let transaction = self
            .transactions
            .find_latest_by_order(order.id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} has no transaction", order.id))
            })?;

        self.transitioner.transition(status, transaction.id).await?;

        if let Some(payment_type) = payload
            .payment_details
            .as_ref()
            .and_then(|d| d.payment_type.as_deref())
        {
            self.transitioner
                .reconcile_payment_method(transaction.id, payment_type)
                .await?;
        }

        Ok(())
    }

    async fn transaction_with_order(
        &self,
        transaction_id: Uuid,
    ) -> Result<(TransactionModel, OrderModel), ServiceError> {
        let transaction = self
            .transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;
        let order = self
            .orders
            .find_by_id(transaction.order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", transaction.order_id))
            })?;
        Ok((transaction, order))
    }

    /// Fetches the gateway-side view of the payment behind a transaction.
    /// The gateway is the system of record for payment progress between
    /// notifications.
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn payment_status(&self, transaction_id: Uuid) -> Result<OrderData, ServiceError> {
        let (_, order) = self.transaction_with_order(transaction_id).await?;
        let settings = self.config.gateway_settings(&order.sales_channel_id);
        let client = GatewayClient::from_settings(&settings)?;
        client.get_order(&order.order_number).await
    }

    /// Reports the order as shipped at the gateway. Pay-after-delivery
    /// methods start their capture window off this status, so the host
    /// calls in as soon as the parcel leaves the warehouse.
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn notify_shipped(
        &self,
        transaction_id: Uuid,
        tracking_code: Option<String>,
    ) -> Result<(), ServiceError> {
        let (_, order) = self.transaction_with_order(transaction_id).await?;

        let mut body = serde_json::json!({ "status": "shipped" });
        if let Some(code) = tracking_code.as_deref().filter(|c| !c.is_empty()) {
            body["tracktrace_code"] = Value::String(code.to_string());
        }

        let settings = self.config.gateway_settings(&order.sales_channel_id);
        let client = GatewayClient::from_settings(&settings)?;
        client.update_order(&order.order_number, &body).await?;
        Ok(())
    }

    /// Requests a refund at the gateway. The resulting state transition
    /// arrives through the regular notification flow once the gateway has
    /// processed it.
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn refund(
        &self,
        transaction_id: Uuid,
        amount: Option<Decimal>,
        description: Option<String>,
    ) -> Result<(), ServiceError> {
        let (transaction, order) = self.transaction_with_order(transaction_id).await?;

        let amount_minor = to_minor_units(amount.unwrap_or(transaction.amount))?;
        if amount_minor <= 0 {
            return Err(ServiceError::ValidationError(
                "refund amount must be positive".to_string(),
            ));
        }

        let settings = self.config.gateway_settings(&order.sales_channel_id);
        let client = GatewayClient::from_settings(&settings)?;
        client
            .refund_order(
                &order.order_number,
                &RefundRequest {
                    currency: transaction.currency.clone(),
                    amount: amount_minor,
                    description,
                },
            )
            .await?;

        if let Err(e) = self
            .event_sender
            .send(Event::RefundRequested {
                transaction_id,
                amount_minor,
                currency: transaction.currency.clone(),
            })
            .await
        {
            warn!("failed to publish refund event: {}", e);
        }

        Ok(())
    }

    /// Issuer list passthrough for issuer-based methods such as iDEAL.
    pub async fn list_issuers(
        &self,
        channel_id: &str,
        gateway_code: &str,
    ) -> Result<Vec<Issuer>, ServiceError> {
        let settings = self.config.gateway_settings(channel_id);
        let client = GatewayClient::from_settings(&settings)?;
        client.list_issuers(gateway_code).await
    }
}
