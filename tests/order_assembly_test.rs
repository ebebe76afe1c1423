mod common;

use common::{sample_item, sample_order, test_config, TEST_CHANNEL};
use multisafepay_bridge::config::AppConfig;
use multisafepay_bridge::errors::ServiceError;
use multisafepay_bridge::models::{OrderType, RECURRING_MODEL_CARD_ON_FILE};
use multisafepay_bridge::services::order_request::{
    ChannelContext, OrderRequestAssembler, PaymentFormData, PaymentOrder, TransactionContext,
};
use rust_decimal_macros::dec;
use serde_json::Map;
use uuid::Uuid;

fn channel_context(config: &AppConfig) -> ChannelContext {
    ChannelContext {
        channel_id: TEST_CHANNEL.to_string(),
        currency: "EUR".to_string(),
        base_url: config.public_base_url.clone(),
        shop_version: config.shop_version.clone(),
        settings: config.gateway_settings(TEST_CHANNEL),
    }
}

fn payment_order() -> PaymentOrder {
    let order = sample_order();
    let items = vec![sample_item(order.id, 1), sample_item(order.id, 2)];
    PaymentOrder { order, items }
}

fn assemble(
    order: &PaymentOrder,
    form: &PaymentFormData,
    channel: &ChannelContext,
    order_type: OrderType,
) -> Result<multisafepay_bridge::models::OrderRequest, ServiceError> {
    let txn = TransactionContext {
        transaction_id: Uuid::new_v4(),
    };
    OrderRequestAssembler::for_channel(channel).build(
        &txn,
        order,
        form,
        channel,
        "IDEAL",
        order_type,
        Map::new(),
    )
}

#[test]
fn assembles_complete_redirect_request() {
    let config = test_config();
    let channel = channel_context(&config);
    let order = payment_order();
    let txn = TransactionContext {
        transaction_id: Uuid::new_v4(),
    };

    let request = OrderRequestAssembler::for_channel(&channel)
        .build(
            &txn,
            &order,
            &PaymentFormData::default(),
            &channel,
            "IDEAL",
            OrderType::Redirect,
            Map::new(),
        )
        .expect("assembly failed");

    assert_eq!(request.order_type, OrderType::Redirect);
    assert_eq!(request.order_id, "10042");
    assert_eq!(request.gateway, "IDEAL");
    // 100.00 EUR in minor units
    assert_eq!(request.money.amount, 10_000);
    assert_eq!(request.money.currency, "EUR");
    assert_eq!(
        request.description.as_deref(),
        Some("Payment for order #10042")
    );

    let customer = request.customer.expect("customer missing");
    assert_eq!(customer.email, "shopper@example.com");
    assert_eq!(customer.country, "NL");

    let delivery = request.delivery.expect("delivery missing");
    assert_eq!(delivery.city, "Amsterdam");

    // two product lines plus the shipping line
    let cart = request.shopping_cart.expect("shopping cart missing");
    assert_eq!(cart.items.len(), 3);
    assert!(cart.items.iter().all(|i| i.currency == "EUR"));
    assert_eq!(cart.items[2].merchant_item_id, "msp-shipping");

    let options = request.payment_options.expect("payment options missing");
    assert_eq!(
        options.notification_url,
        format!(
            "https://shop.example.com/api/v1/payments/notification?channel={}",
            TEST_CHANNEL
        )
    );
    assert_eq!(
        options.redirect_url,
        format!(
            "https://shop.example.com/checkout/finish?transaction={}",
            txn.transaction_id
        )
    );
    assert!(!options.close_window);

    // 30 days in seconds
    assert_eq!(request.seconds_active, Some(2_592_000));
    assert!(request.second_chance.expect("second chance missing").send_email);

    let plugin = request.plugin.expect("plugin details missing");
    assert_eq!(plugin.shop_version.as_deref(), Some("6.5.0"));
    assert!(request.recurring_model.is_none());
}

#[test]
fn active_token_forces_direct_payment() {
    let config = test_config();
    let channel = channel_context(&config);
    let order = payment_order();

    let form = PaymentFormData {
        active_token: Some("token-abc".to_string()),
        ..PaymentFormData::default()
    };
    let request = assemble(&order, &form, &channel, OrderType::Redirect).unwrap();

    assert_eq!(request.order_type, OrderType::Direct);
    // a token alone does not opt the shopper into card-on-file
    assert!(request.recurring_model.is_none());
}

#[test]
fn empty_active_token_is_ignored() {
    let config = test_config();
    let channel = channel_context(&config);
    let order = payment_order();

    let form = PaymentFormData {
        active_token: Some(String::new()),
        ..PaymentFormData::default()
    };
    let request = assemble(&order, &form, &channel, OrderType::Redirect).unwrap();
    assert_eq!(request.order_type, OrderType::Redirect);
}

#[test]
fn direct_payload_carries_payment_data_and_card_on_file() {
    let config = test_config();
    let channel = channel_context(&config);
    let order = payment_order();

    let form = PaymentFormData {
        payload: Some("encrypted-card-payload".to_string()),
        ..PaymentFormData::default()
    };
    let request = assemble(&order, &form, &channel, OrderType::Redirect).unwrap();

    assert_eq!(request.order_type, OrderType::Direct);
    assert_eq!(
        request.recurring_model.as_deref(),
        Some(RECURRING_MODEL_CARD_ON_FILE)
    );
    assert_eq!(
        request.extra["payment_data"]["payload"],
        "encrypted-card-payload"
    );
}

#[test]
fn tokenize_requests_card_on_file_without_going_direct() {
    let config = test_config();
    let channel = channel_context(&config);
    let order = payment_order();

    let form = PaymentFormData {
        tokenize: true,
        ..PaymentFormData::default()
    };
    let request = assemble(&order, &form, &channel, OrderType::Redirect).unwrap();

    assert_eq!(request.order_type, OrderType::Redirect);
    assert_eq!(
        request.recurring_model.as_deref(),
        Some(RECURRING_MODEL_CARD_ON_FILE)
    );
}

#[test]
fn cart_exclusion_omits_shopping_cart_entirely() {
    let mut config = test_config();
    config.gateway.exclude_shopping_cart = true;
    let channel = channel_context(&config);

    // no line items at all; without a cart builder that is not an error
    let order = PaymentOrder {
        order: sample_order(),
        items: vec![],
    };
    let request = assemble(
        &order,
        &PaymentFormData::default(),
        &channel,
        OrderType::Redirect,
    )
    .unwrap();

    assert!(request.shopping_cart.is_none());
    // the scalar concerns are still built
    assert!(request.customer.is_some());
    assert!(request.payment_options.is_some());
}

#[test]
fn order_without_items_fails_cart_assembly() {
    let config = test_config();
    let channel = channel_context(&config);
    let order = PaymentOrder {
        order: sample_order(),
        items: vec![],
    };

    let err = assemble(
        &order,
        &PaymentFormData::default(),
        &channel,
        OrderType::Redirect,
    )
    .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[test]
fn non_positive_total_is_rejected() {
    let config = test_config();
    let channel = channel_context(&config);

    let mut order = payment_order();
    order.order.amount_total = dec!(0);

    let err = assemble(
        &order,
        &PaymentFormData::default(),
        &channel,
        OrderType::Redirect,
    )
    .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}
