//! Checkout: from a signed cart to a persisted, priced order.

use std::collections::HashMap;

use rand::seq::IndexedRandom;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use miniapp_core::{Delivery, OrderLine, OrderRecord, Price, Product, SessionClaims};

use super::auth::{self, AuthError};
use super::relay::{PosRelay, RelayJob};
use crate::db::{Store, StoreError};

/// Length of the human-facing order number.
pub const ORDER_NUMBER_LEN: usize = 6;

const ORDER_NUMBER_ALPHABET: &[u8] =
    b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Why a checkout was refused.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The launch payload did not verify.
    #[error("initData invalid: {0}")]
    AuthInvalid(#[from] AuthError),

    /// The payload verified but its `user` document is malformed.
    #[error("Некорректные данные пользователя")]
    ParseError,

    /// No items in the cart.
    #[error("Пустая корзина")]
    EmptyCart,

    /// A cart line references a product that is not on the menu.
    #[error("Товар не найден: {0}")]
    ProductNotFound(String),

    /// The order could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Checkout request body.
///
/// Every field is loose so a malformed cart is a checkout error rather than
/// a request rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default, deserialize_with = "auth::deserialize_init_data")]
    pub init_data: Option<String>,
    /// Cart lines, each `{id, qty}`.
    #[serde(default)]
    pub items: Value,
    /// Delivery options, read with [`Delivery::from_value`].
    #[serde(default)]
    pub delivery: Value,
}

/// A successfully placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order: OrderRecord,
}

/// Coerce a cart line quantity to a positive integer.
///
/// Integers are taken as is, fractions truncated, strings read up to the
/// first non-digit (`"3x"` → 3). Anything else, and anything below one,
/// becomes 1.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn coerce_qty(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => leading_integer(s),
        _ => None,
    };

    parsed
        .filter(|qty| *qty >= 1)
        .map_or(1, |qty| u32::try_from(qty).unwrap_or(u32::MAX))
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits.get(..end)?.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Draw an order number that `taken` does not already know.
pub fn generate_order_number(taken: impl Fn(&str) -> bool) -> String {
    let mut rng = rand::rng();
    loop {
        let candidate: String = (0..ORDER_NUMBER_LEN)
            .filter_map(|_| ORDER_NUMBER_ALPHABET.choose(&mut rng).copied())
            .map(char::from)
            .collect();
        if !taken(&candidate) {
            return candidate;
        }
    }
}

/// Resolve cart lines against the menu, snapshotting prices.
///
/// # Errors
///
/// `EmptyCart` unless `items` is a non-empty array; `ProductNotFound` for
/// the first line whose id is not on the menu.
pub fn resolve_lines(items: &Value, menu: &[Product]) -> Result<Vec<OrderLine>, OrderError> {
    let lines = match items {
        Value::Array(lines) if !lines.is_empty() => lines,
        _ => return Err(OrderError::EmptyCart),
    };

    let by_id: HashMap<&str, &Product> = menu.iter().map(|p| (p.id.as_str(), p)).collect();

    lines
        .iter()
        .map(|line| {
            let id = line.get("id");
            let product = id
                .and_then(Value::as_str)
                .and_then(|id| by_id.get(id))
                .ok_or_else(|| OrderError::ProductNotFound(describe_id(id)))?;

            Ok(OrderLine {
                id: product.id.clone(),
                name: product.name.clone(),
                price: product.price,
                qty: coerce_qty(line.get("qty")),
            })
        })
        .collect()
}

fn describe_id(id: Option<&Value>) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "undefined".to_string(),
    }
}

/// Validates, prices, persists, and relays checkouts.
#[derive(Clone)]
pub struct OrderPipeline {
    bot_token: SecretString,
    store: Store,
    relay: PosRelay,
}

impl OrderPipeline {
    /// Create a pipeline.
    #[must_use]
    pub const fn new(bot_token: SecretString, store: Store, relay: PosRelay) -> Self {
        Self {
            bot_token,
            store,
            relay,
        }
    }

    /// Place an order.
    ///
    /// The order is persisted before this returns; the POS hand-off happens
    /// later in the background and never affects the result.
    ///
    /// # Errors
    ///
    /// Returns `OrderError` if the payload does not verify, the cart is
    /// empty or references unknown products, or the store cannot be written.
    /// Nothing is stored on error.
    #[instrument(skip_all)]
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<PlacedOrder, OrderError> {
        let raw = request.init_data.as_deref().unwrap_or_default();
        let payload = auth::validate(raw, &self.bot_token)?;
        let claims: Option<SessionClaims> =
            payload.user_claims().map_err(|_| OrderError::ParseError)?;

        let menu = self.store.catalog().await.or_fallback();
        let lines = resolve_lines(&request.items, &menu.products)?;
        let delivery = Delivery::from_value(&request.delivery);
        let user_id = claims.as_ref().map(|c| c.id);

        let order = self
            .store
            .with_orders(|orders| {
                let number = generate_order_number(|n| orders.iter().any(|o| o.number == n));
                let order = OrderRecord::new(number, user_id, lines, delivery);
                orders.push(order.clone());
                order
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            number = %order.number,
            user_id = ?order.user_id,
            lines = order.items.len(),
            total = %order.total,
            "Order placed"
        );

        self.relay.submit(RelayJob {
            order: order.clone(),
            claims,
        });

        Ok(PlacedOrder { order })
    }
}

impl PlacedOrder {
    /// Human-facing order number.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.order.number
    }

    /// Amount due.
    #[must_use]
    pub const fn total(&self) -> Price {
        self.order.total
    }
}
