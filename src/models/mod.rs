pub mod notification;
pub mod order_request;

pub use notification::{NotificationPayload, PaymentDetails};
pub use order_request::{
    CustomerDetails, DeliveryDetails, LineItem, Money, OrderRequest, OrderType, PaymentOptions,
    PluginDetails, SecondChance, ShoppingCart, RECURRING_MODEL_CARD_ON_FILE,
};
