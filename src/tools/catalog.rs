// ABOUTME: Spreadsheet catalog tools: inventory lookup, order lookup and order placement
// ABOUTME: Each tool is bound to one business through the CatalogService it is built with
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::registry::ToolRegistry;
use super::traits::BusinessTool;
use super::validation::as_integer;
use crate::errors::{AppResult, ToolError};
use crate::models::{NewOrder, OrderRecord};
use crate::providers::SheetTable;

/// Catalog data of one business
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Formatted `Products` sheet
    async fn list_products(&self) -> AppResult<SheetTable>;

    /// Formatted `Orders` sheet
    async fn list_orders(&self) -> AppResult<SheetTable>;

    /// Append one row to the `Orders` sheet
    async fn append_order(&self, order: &OrderRecord) -> AppResult<()>;
}

/// `checkInventory`
pub struct CheckInventoryTool {
    catalog: Arc<dyn CatalogService>,
}

impl CheckInventoryTool {
    /// Tool name
    pub const NAME: &'static str = "checkInventory";

    /// Bind to `catalog`
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl BusinessTool for CheckInventoryTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "List every product of the shop with its price, stock quantity and description"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: &Map<String, Value>) -> Result<Value, ToolError> {
        let table = self
            .catalog
            .list_products()
            .await
            .map_err(|e| ToolError::execution_failed(Self::NAME, e.user_message()))?;
        Ok(json!({"products": table.rows}))
    }
}

/// `checkOrders`
pub struct CheckOrdersTool {
    catalog: Arc<dyn CatalogService>,
}

impl CheckOrdersTool {
    /// Tool name
    pub const NAME: &'static str = "checkOrders";

    /// Bind to `catalog`
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl BusinessTool for CheckOrdersTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "List the orders placed so far with customer, product, total and status"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: &Map<String, Value>) -> Result<Value, ToolError> {
        let table = self
            .catalog
            .list_orders()
            .await
            .map_err(|e| ToolError::execution_failed(Self::NAME, e.user_message()))?;
        Ok(json!({"orders": table.rows}))
    }
}

/// `placeOrder`
pub struct PlaceOrderTool {
    catalog: Arc<dyn CatalogService>,
}

impl PlaceOrderTool {
    /// Tool name
    pub const NAME: &'static str = "placeOrder";

    /// Bind to `catalog`
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }

    fn parse_order(args: &Map<String, Value>) -> Result<NewOrder, ToolError> {
        let text = |key: &str| {
            args.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_owned()
        };

        let quantity = args
            .get("quantity")
            .and_then(as_integer)
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| {
                ToolError::invalid_parameter(Self::NAME, "quantity", "must be a positive integer")
            })?;

        Ok(NewOrder {
            product_name: text("productName"),
            quantity,
            fullname: text("fullname"),
            phone: text("phone"),
            address: text("address"),
            note: text("note"),
        })
    }
}

#[async_trait]
impl BusinessTool for PlaceOrderTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Place an order once the customer confirmed the product, quantity, name, phone and address"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "productName": {"type": "string", "description": "Exact product name from the inventory"},
                "quantity": {"type": "integer", "minimum": 1, "description": "Number of units"},
                "fullname": {"type": "string", "description": "Customer full name"},
                "phone": {"type": "string", "description": "Customer phone number"},
                "address": {"type": "string", "description": "Delivery address"},
                "note": {"type": "string", "description": "Optional note from the customer"}
            },
            "required": ["productName", "quantity", "fullname", "phone", "address"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let order = Self::parse_order(args)?;

        let products = self
            .catalog
            .list_products()
            .await
            .map_err(|e| ToolError::execution_failed(Self::NAME, e.user_message()))?;

        let product = products.find_row("name", &order.product_name).ok_or_else(|| {
            ToolError::execution_failed(
                Self::NAME,
                format!("Product '{}' not found", order.product_name),
            )
        })?;

        let cell = |key: &str| product.get(key).and_then(Value::as_str).unwrap_or_default();

        let unit_price = parse_amount(cell("price")).ok_or_else(|| {
            ToolError::execution_failed(
                Self::NAME,
                format!("Product '{}' has no valid price", order.product_name),
            )
        })?;

        if let Some(stock) = parse_amount(cell("quantity")) {
            if f64::from(order.quantity) > stock {
                return Err(ToolError::execution_failed(
                    Self::NAME,
                    format!(
                        "Only {stock} unit(s) of '{}' are in stock",
                        order.product_name
                    ),
                ));
            }
        }

        let record = order.priced(cell("name").to_owned(), unit_price);
        self.catalog
            .append_order(&record)
            .await
            .map_err(|e| ToolError::execution_failed(Self::NAME, e.user_message()))?;

        debug!(product = %record.product, quantity = record.quantity, "order placed");
        serde_json::to_value(&record)
            .map_err(|e| ToolError::execution_failed(Self::NAME, e.to_string()))
    }
}

/// `"$1,250.50"` becomes `1250.5`
fn parse_amount(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Registry with the three catalog tools bound to `catalog`
#[must_use]
pub fn catalog_registry(catalog: Arc<dyn CatalogService>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CheckInventoryTool::new(catalog.clone())));
    registry.register(Arc::new(CheckOrdersTool::new(catalog.clone())));
    registry.register(Arc::new(PlaceOrderTool::new(catalog)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::providers::format_sheet_rows;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FakeCatalog {
        appended: Mutex<Vec<OrderRecord>>,
    }

    #[async_trait]
    impl CatalogService for FakeCatalog {
        async fn list_products(&self) -> AppResult<SheetTable> {
            let raw = vec![
                vec!["Name".to_owned(), "Price".to_owned(), "Quantity".to_owned()],
                vec!["Blue Mug".to_owned(), "$12.50".to_owned(), "5".to_owned()],
                vec!["Red Mug".to_owned(), "n/a".to_owned(), "1".to_owned()],
            ];
            Ok(format_sheet_rows(&raw))
        }

        async fn list_orders(&self) -> AppResult<SheetTable> {
            Err(AppError::invalid_input("Business does not have a Google sheet"))
        }

        async fn append_order(&self, order: &OrderRecord) -> AppResult<()> {
            self.appended.lock().await.push(order.clone());
            Ok(())
        }
    }

    fn order_args(product: &str, quantity: i64) -> Map<String, Value> {
        json!({
            "productName": product,
            "quantity": quantity,
            "fullname": "Ada Lovelace",
            "phone": "+33 6 00 00 00 00",
            "address": "1 rue de la Paix"
        })
        .as_object()
        .cloned()
        .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_place_order_prices_and_appends() {
        let catalog = Arc::new(FakeCatalog::default());
        let registry = catalog_registry(catalog.clone());

        let value = registry
            .invoke(PlaceOrderTool::NAME, &order_args("blue mug", 2))
            .await
            .unwrap();

        assert_eq!(value["product"], "Blue Mug");
        assert_eq!(value["total"], 25.0);
        assert_eq!(value["status"], "Pending");
        let appended = catalog.appended.lock().await;
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].phone, "+33 6 00 00 00 00");
    }

    #[tokio::test]
    async fn test_place_order_rejects_unknown_and_overstock() {
        let catalog = Arc::new(FakeCatalog::default());
        let registry = catalog_registry(catalog.clone());

        let unknown = registry
            .invoke(PlaceOrderTool::NAME, &order_args("Green Mug", 1))
            .await;
        assert!(matches!(
            unknown,
            Err(ToolError::ExecutionFailed { details, .. }) if details.contains("not found")
        ));

        let overstock = registry
            .invoke(PlaceOrderTool::NAME, &order_args("Blue Mug", 9))
            .await;
        assert!(overstock.is_err());

        let unpriced = registry
            .invoke(PlaceOrderTool::NAME, &order_args("Red Mug", 1))
            .await;
        assert!(unpriced.is_err());

        assert!(catalog.appended.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_service_errors_become_tool_errors() {
        let registry = catalog_registry(Arc::new(FakeCatalog::default()));
        let result = registry.invoke(CheckOrdersTool::NAME, &Map::new()).await;
        assert!(matches!(
            result,
            Err(ToolError::ExecutionFailed { ref details, .. })
                if details == "Business does not have a Google sheet"
        ));
    }

    #[tokio::test]
    async fn test_check_inventory_rows() {
        let registry = catalog_registry(Arc::new(FakeCatalog::default()));
        let value = registry
            .invoke(CheckInventoryTool::NAME, &Map::new())
            .await
            .unwrap();
        assert_eq!(value["products"][0]["name"], "Blue Mug");
        assert_eq!(value["products"][0]["row"], "A2");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,250.50"), Some(1250.5));
        assert_eq!(parse_amount("12"), Some(12.0));
        assert_eq!(parse_amount("n/a"), None);
    }
}
