pub mod address;
pub mod campaign;
pub mod campaign_analytics;
pub mod customer;
pub mod gateway;
pub mod offer;
pub mod order;
pub mod order_item;
pub mod payment_method;
pub mod product;
pub mod transaction;

pub use address::Entity as Address;
pub use campaign::Entity as Campaign;
pub use campaign_analytics::Entity as CampaignAnalytics;
pub use customer::Entity as Customer;
pub use gateway::Entity as Gateway;
pub use offer::Entity as Offer;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use payment_method::Entity as PaymentMethod;
pub use product::Entity as Product;
pub use transaction::Entity as Transaction;
