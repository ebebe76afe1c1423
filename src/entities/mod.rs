pub mod order;
pub mod order_item;
pub mod order_transaction;
pub mod payment_method;
