//! Catalog served to the mini-app: categories and priced products.

use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId};
use super::price::Price;

/// Category id used for products without a resolvable parent group.
pub const DEFAULT_CATEGORY_ID: &str = "default";

/// Display name of [`DEFAULT_CATEGORY_ID`] ("Goods").
pub const DEFAULT_CATEGORY_NAME: &str = "Товары";

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A sellable product with its resolved price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category_id: CategoryId,
    pub category_name: String,
}

/// The full catalog. Replaced wholesale on every successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Catalog {
    /// Static catalog served when the POS system cannot be reached.
    #[must_use]
    pub fn fallback() -> Self {
        let burgers = Category {
            id: CategoryId::new("c1"),
            name: "Бургеры".to_string(),
        };
        let snacks = Category {
            id: CategoryId::new("c2"),
            name: "Закуски".to_string(),
        };

        let product = |id: &str, name: &str, price: i64, category: &Category| Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Price::from_units(price),
            category_id: category.id.clone(),
            category_name: category.name.clone(),
        };

        let products = vec![
            product("p1", "Классик Бургер", 350, &burgers),
            product("p2", "Двойной Бургер", 450, &burgers),
            product("p3", "Картофель фри", 150, &snacks),
        ];

        Self {
            categories: vec![burgers, snacks],
            products,
        }
    }

    /// Whether the catalog has at least one product.
    #[must_use]
    pub fn has_products(&self) -> bool {
        !self.products.is_empty()
    }

    /// The catalog to price against: `self` if it has products, the fallback otherwise.
    #[must_use]
    pub fn or_fallback(self) -> Self {
        if self.has_products() {
            self
        } else {
            Self::fallback()
        }
    }

    /// Look up a product by id.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id.as_str() == id)
    }
}
