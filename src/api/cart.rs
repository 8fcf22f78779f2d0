//! Shopping cart API

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::r#trait::{ApiContext, MiniappApi};
use crate::client::RequestOptions;
use crate::error::MiniappError;

pub const CART_PATH: &str = "/miniapp/api/cart";

/// One line of the cart. Prices are in cents.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartItem {
    pub id: i64,
    pub product_id: i64,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_image: String,
    #[serde(default)]
    pub price: i64,
    pub quantity: u32,
    #[serde(default)]
    pub stock: u32,
}

#[derive(Debug, Serialize)]
struct AddToCartRequest {
    product_id: i64,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct UpdateQuantityRequest {
    quantity: u32,
}

pub struct CartApi {
    context: Arc<ApiContext>,
}

impl CartApi {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    pub async fn list(&self) -> Result<Vec<CartItem>, MiniappError> {
        self.context.fetch(RequestOptions::get(CART_PATH)).await
    }

    pub async fn add(&self, product_id: i64, quantity: u32) -> Result<(), MiniappError> {
        let body = AddToCartRequest {
            product_id,
            quantity,
        };
        self.context
            .perform(RequestOptions::post(CART_PATH).json(&body)?)
            .await
    }

    pub async fn update_quantity(&self, cart_item_id: i64, quantity: u32) -> Result<(), MiniappError> {
        let url = format!("{CART_PATH}/{cart_item_id}");
        self.context
            .perform(RequestOptions::put(url).json(&UpdateQuantityRequest { quantity })?)
            .await
    }

    pub async fn remove(&self, cart_item_id: i64) -> Result<(), MiniappError> {
        let url = format!("{CART_PATH}/{cart_item_id}");
        self.context.perform(RequestOptions::delete(url)).await
    }

    /// Empty the cart.
    pub async fn clear(&self) -> Result<(), MiniappError> {
        self.context
            .perform(RequestOptions::delete(format!("{CART_PATH}/clear")))
            .await
    }
}

impl MiniappApi for CartApi {
    fn context(&self) -> &ApiContext {
        &self.context
    }

    fn api_name(&self) -> &'static str {
        "cart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_item_parse() {
        let json = r#"{
            "id": 11,
            "product_id": 7,
            "product_name": "Green tea",
            "product_image": "/img/tea.png",
            "price": 1999,
            "quantity": 2,
            "stock": 40
        }"#;
        let item: CartItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 11);
        assert_eq!(item.price, 1999);
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_cart_item_optional_fields() {
        let item: CartItem =
            serde_json::from_str(r#"{"id": 1, "product_id": 2, "quantity": 1}"#).unwrap();
        assert!(item.product_name.is_empty());
        assert_eq!(item.stock, 0);
    }
}
