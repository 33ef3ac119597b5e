//! Wire types for the POS cloud API.
//!
//! Only the fields the storefront reads are modelled; unknown fields are
//! ignored. Collections default to empty so a sparse response is not a
//! parse error.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// =============================================================================
// Access token
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessTokenRequest<'a> {
    pub api_login: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub token: String,
}

// =============================================================================
// Nomenclature
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrganizationRequest<'a> {
    pub organization_id: Option<&'a str>,
}

/// Full product listing of an organization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nomenclature {
    #[serde(default, deserialize_with = "nullable")]
    pub groups: Vec<NomenclatureGroup>,
    #[serde(default, deserialize_with = "nullable")]
    pub product_categories: Vec<ProductCategory>,
    #[serde(default, deserialize_with = "nullable")]
    pub products: Vec<NomenclatureProduct>,
}

/// A menu group (folder) in the nomenclature tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomenclatureGroup {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub parent_group: Option<String>,
}

/// A product category (id → display name).
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCategory {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

/// A product as the POS system knows it, priced or not.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomenclatureProduct {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub parent_group: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_deleted: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub size_prices: Vec<SizePrice>,
}

impl NomenclatureProduct {
    /// First strictly positive current price among the size variants.
    #[must_use]
    pub fn first_positive_size_price(&self) -> Option<f64> {
        self.size_prices
            .iter()
            .filter_map(|sp| sp.price.as_ref().and_then(|p| p.current_price))
            .find(|price| *price > 0.0)
    }
}

/// Price of one size variant.
#[derive(Debug, Clone, Deserialize)]
pub struct SizePrice {
    #[serde(default)]
    pub price: Option<SizePriceValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizePriceValue {
    #[serde(default)]
    pub current_price: Option<f64>,
}

// =============================================================================
// Price lists
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PriceListsResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub pricelists: Vec<PriceListSummary>,
}

/// A price list available to the organization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriceListSummary {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PriceListItemsResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<PriceListItem>,
}

/// One price entry. Entries missing either field are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceListItem {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

// =============================================================================
// Deliveries
// =============================================================================

/// Delivery creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCreateRequest {
    pub organization_id: Option<String>,
    pub order: DeliveryOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryOrder {
    pub phone: String,
    pub customer: DeliveryCustomer,
    pub items: Vec<DeliveryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryCustomer {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItem {
    pub product_id: String,
    pub amount: u32,
}

/// Delivery creation response. The id is informational only.
#[derive(Debug, Default, Deserialize)]
pub struct DeliveryCreateResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "orderInfo")]
    pub order_info: Option<DeliveryOrderInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryOrderInfo {
    #[serde(default)]
    pub id: Option<String>,
}

impl DeliveryCreateResponse {
    /// The POS-side order id, wherever the API put it.
    #[must_use]
    pub fn pos_order_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.order_info.as_ref().and_then(|i| i.id.as_deref()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_nomenclature_parses() {
        let nom: Nomenclature = serde_json::from_str(
            r#"{"products":[{"id":"a","name":"Tea"}],"correlationId":"x"}"#,
        )
        .unwrap();
        assert!(nom.groups.is_empty());
        let product = nom.products.first().unwrap();
        assert!(!product.is_deleted);
        assert_eq!(product.first_positive_size_price(), None);
    }

    #[test]
    fn test_first_positive_size_price() {
        let product: NomenclatureProduct = serde_json::from_value(serde_json::json!({
            "id": "a",
            "name": "Soup",
            "sizePrices": [
                {"price": null},
                {"price": {"currentPrice": 0}},
                {"price": {"currentPrice": 245.5}},
                {"price": {"currentPrice": 300}}
            ]
        }))
        .unwrap();
        assert_eq!(product.first_positive_size_price(), Some(245.5));
    }

    #[test]
    fn test_delivery_request_wire_shape() {
        let request = DeliveryCreateRequest {
            organization_id: Some("org".to_string()),
            order: DeliveryOrder {
                phone: String::new(),
                customer: DeliveryCustomer {
                    name: "Guest".to_string(),
                    id: None,
                },
                items: vec![DeliveryItem {
                    product_id: "p1".to_string(),
                    amount: 2,
                }],
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["organizationId"], "org");
        assert_eq!(json["order"]["items"][0]["productId"], "p1");
        assert_eq!(json["order"]["items"][0]["amount"], 2);
        assert_eq!(json["order"]["customer"]["name"], "Guest");
    }

    #[test]
    fn test_pos_order_id_locations() {
        let top: DeliveryCreateResponse = serde_json::from_str(r#"{"id":"d1"}"#).unwrap();
        assert_eq!(top.pos_order_id(), Some("d1"));

        let nested: DeliveryCreateResponse =
            serde_json::from_str(r#"{"orderInfo":{"id":"d2"}}"#).unwrap();
        assert_eq!(nested.pos_order_id(), Some("d2"));
    }
}
