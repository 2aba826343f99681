//! Business services. Each one is written once against [`crate::store::Store`].

// Catalog
pub mod catalog;
pub mod stock;

// Orders and the money they represent
pub mod debts;
pub mod orders;

// Members and announcements
pub mod news;
pub mod users;

pub use catalog::CatalogService;
pub use debts::DebtService;
pub use news::NewsService;
pub use orders::{OrderService, PaymentIntent, TransitionPolicy};
pub use stock::{StockChange, StockConsumption, StockPolicy};
pub use users::UserService;
