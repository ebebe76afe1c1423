//! Scalar/sub-structure builders. Each one populates a single named field
//! of the request from order, channel, or settings data.

use crate::errors::ServiceError;
use crate::models::{CustomerDetails, DeliveryDetails, PaymentOptions, PluginDetails, SecondChance};

use super::{
    ChannelContext, OrderRequestBuilder, PaymentFormData, PaymentOrder, TransactionContext,
};
use crate::models::OrderRequest;

const SECONDS_PER_DAY: i64 = 86_400;

pub struct DescriptionBuilder;

impl OrderRequestBuilder for DescriptionBuilder {
    fn build(
        &self,
        order: &PaymentOrder,
        request: &mut OrderRequest,
        _txn: &TransactionContext,
        _form: &PaymentFormData,
        _channel: &ChannelContext,
    ) -> Result<(), ServiceError> {
        request.description = Some(format!(
            "Payment for order #{}",
            order.order.order_number
        ));
        Ok(())
    }
}

pub struct CustomerBuilder;

impl OrderRequestBuilder for CustomerBuilder {
    fn build(
        &self,
        order: &PaymentOrder,
        request: &mut OrderRequest,
        _txn: &TransactionContext,
        _form: &PaymentFormData,
        _channel: &ChannelContext,
    ) -> Result<(), ServiceError> {
        let o = &order.order;
        request.customer = Some(CustomerDetails {
            first_name: o.billing_first_name.clone(),
            last_name: o.billing_last_name.clone(),
            address1: o.billing_street.clone(),
            zip_code: o.billing_zip_code.clone(),
            city: o.billing_city.clone(),
            country: o.billing_country.clone(),
            email: o.customer_email.clone(),
            phone: o.customer_phone.clone(),
            locale: o.customer_locale.clone(),
            ip_address: o.customer_ip.clone(),
        });
        Ok(())
    }
}

pub struct DeliveryBuilder;

impl OrderRequestBuilder for DeliveryBuilder {
    fn build(
        &self,
        order: &PaymentOrder,
        request: &mut OrderRequest,
        _txn: &TransactionContext,
        _form: &PaymentFormData,
        _channel: &ChannelContext,
    ) -> Result<(), ServiceError> {
        let o = &order.order;
        request.delivery = Some(DeliveryDetails {
            first_name: o.shipping_first_name.clone(),
            last_name: o.shipping_last_name.clone(),
            address1: o.shipping_street.clone(),
            zip_code: o.shipping_zip_code.clone(),
            city: o.shipping_city.clone(),
            country: o.shipping_country.clone(),
        });
        Ok(())
    }
}

pub struct PaymentOptionsBuilder;

impl OrderRequestBuilder for PaymentOptionsBuilder {
    fn build(
        &self,
        _order: &PaymentOrder,
        request: &mut OrderRequest,
        txn: &TransactionContext,
        _form: &PaymentFormData,
        channel: &ChannelContext,
    ) -> Result<(), ServiceError> {
        let base = channel.base_url.trim_end_matches('/');
        request.payment_options = Some(PaymentOptions {
            notification_url: format!(
                "{}/api/v1/payments/notification?channel={}",
                base, channel.channel_id
            ),
            redirect_url: format!("{}/checkout/finish?transaction={}", base, txn.transaction_id),
            cancel_url: format!("{}/checkout/cancel?transaction={}", base, txn.transaction_id),
            close_window: false,
        });
        Ok(())
    }
}

pub struct SecondsActiveBuilder;

impl OrderRequestBuilder for SecondsActiveBuilder {
    fn build(
        &self,
        _order: &PaymentOrder,
        request: &mut OrderRequest,
        _txn: &TransactionContext,
        _form: &PaymentFormData,
        channel: &ChannelContext,
    ) -> Result<(), ServiceError> {
        request.seconds_active =
            Some(i64::from(channel.settings.time_active_days) * SECONDS_PER_DAY);
        Ok(())
    }
}

pub struct SecondChanceBuilder;

impl OrderRequestBuilder for SecondChanceBuilder {
    fn build(
        &self,
        _order: &PaymentOrder,
        request: &mut OrderRequest,
        _txn: &TransactionContext,
        _form: &PaymentFormData,
        channel: &ChannelContext,
    ) -> Result<(), ServiceError> {
        request.second_chance = Some(SecondChance {
            send_email: channel.settings.second_chance,
        });
        Ok(())
    }
}

pub struct PluginDataBuilder;

impl OrderRequestBuilder for PluginDataBuilder {
    fn build(
        &self,
        _order: &PaymentOrder,
        request: &mut OrderRequest,
        _txn: &TransactionContext,
        _form: &PaymentFormData,
        channel: &ChannelContext,
    ) -> Result<(), ServiceError> {
        request.plugin = Some(PluginDetails {
            shop: "storefront-platform".to_string(),
            shop_version: channel.shop_version.clone(),
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
        });
        Ok(())
    }
}
