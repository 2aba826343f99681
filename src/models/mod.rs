//! Domain types shared by the services, the store adapters and the HTTP layer.

pub mod category;
pub mod money;
pub mod news;
pub mod order;
pub mod product;
pub mod profile;

pub use category::{Category, CategoryPatch, Direction, NewCategory};
pub use news::{NewNewsPost, NewsPatch, NewsPost};
pub use order::{
    CartLine, CreateOrderRequest, Order, OrderItem, OrderItemView, OrderRecord, OrderStatus,
    OrderView, UNKNOWN_PRODUCT, UNKNOWN_USER,
};
pub use product::{NewProduct, Product, ProductPatch, ProductView, Stock, StockMode, StockVariant};
pub use profile::{NewProfile, Profile, ProfilePatch, Role};

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent patch field from an explicit `null`.
///
/// Used as `#[serde(default, deserialize_with = "deserialize_some")]` on
/// `Option<Option<T>>` fields so that `{"category_id": null}` clears the
/// value while an omitted key leaves it untouched.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
