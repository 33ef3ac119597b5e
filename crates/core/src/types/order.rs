//! Persisted orders and the delivery options they carry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{OrderId, ProductId, UserId};
use super::price::Price;
use super::status::OrderStatus;

/// Delivery method that incurs a zone fee.
pub const COURIER_METHOD: &str = "courier";

/// Delivery options as sent by the client.
///
/// Only `method` and `zone` are interpreted; every other key (address,
/// comment, requested time) is carried through to the order verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Delivery {
    /// Read delivery options from whatever the client sent.
    ///
    /// `method` and `zone` are taken only when they are strings. A value that
    /// is not an object carries no options at all.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        let mut extra = map.clone();
        let method = extra.remove("method").and_then(into_string);
        let zone = extra.remove("zone").and_then(into_string);
        Self {
            method,
            zone,
            extra,
        }
    }

    /// Flat delivery fee.
    ///
    /// Only courier delivery is charged: `zone2` costs 200, `zone1` 100,
    /// any other zone is free.
    #[must_use]
    pub fn fee(&self) -> Price {
        if self.method.as_deref() != Some(COURIER_METHOD) {
            return Price::ZERO;
        }
        match self.zone.as_deref() {
            Some("zone2") => Price::from_units(200),
            Some("zone1") => Price::from_units(100),
            _ => Price::ZERO,
        }
    }
}

fn into_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// Delivery block stored on an order: the client's options plus the fee charged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDelivery {
    #[serde(flatten)]
    pub options: Delivery,
    pub fee: Price,
}

impl From<Delivery> for OrderDelivery {
    fn from(mut options: Delivery) -> Self {
        let fee = options.fee();
        // The computed fee always wins over anything the client sent.
        options.extra.remove("fee");
        Self { options, fee }
    }
}

/// One order line with the price captured at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub qty: u32,
}

impl OrderLine {
    /// `price * qty`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.qty
    }
}

/// A persisted order.
///
/// Nothing but `status` and `pos_sent` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    /// Short human-facing order number.
    pub number: String,
    pub user_id: Option<UserId>,
    pub items: Vec<OrderLine>,
    pub delivery: OrderDelivery,
    pub subtotal: Price,
    pub total: Price,
    pub status: OrderStatus,
    #[serde(default)]
    pub pos_sent: bool,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
}

impl OrderRecord {
    /// Build a new order from snapshot lines, computing subtotal and total.
    #[must_use]
    pub fn new(
        number: String,
        user_id: Option<UserId>,
        items: Vec<OrderLine>,
        delivery: Delivery,
    ) -> Self {
        let subtotal = items.iter().map(OrderLine::line_total).sum::<Price>();
        let delivery = OrderDelivery::from(delivery);
        let total = (subtotal + delivery.fee).round2();

        Self {
            id: OrderId::generate(),
            number,
            user_id,
            items,
            delivery,
            subtotal,
            total,
            status: OrderStatus::Created,
            pos_sent: false,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Record a successful hand-off to the POS system.
    pub fn mark_sent(&mut self) {
        self.status = OrderStatus::Sent;
        self.pos_sent = true;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_from_loose_value() {
        let delivery = Delivery::from_value(&serde_json::json!({
            "method": "courier",
            "zone": "zone2",
            "address": "Lenina 1"
        }));
        assert_eq!(delivery.fee(), Price::from_units(200));
        assert_eq!(delivery.extra["address"], "Lenina 1");

        let numeric = Delivery::from_value(&serde_json::json!({"method": 1, "zone": "zone2"}));
        assert_eq!(numeric.method, None);
        assert_eq!(numeric.fee(), Price::ZERO);
        assert!(!numeric.extra.contains_key("method"));

        for value in [serde_json::json!("courier"), Value::Null, serde_json::json!([1])] {
            assert_eq!(Delivery::from_value(&value), Delivery::default());
        }
    }

    fn courier(zone: &str) -> Delivery {
        Delivery {
            method: Some(COURIER_METHOD.to_string()),
            zone: Some(zone.to_string()),
            extra: Map::new(),
        }
    }

    fn line(id: &str, price: i64, qty: u32) -> OrderLine {
        OrderLine {
            id: ProductId::new(id),
            name: id.to_uppercase(),
            price: Price::from_units(price),
            qty,
        }
    }

    #[test]
    fn test_fee_table() {
        assert_eq!(courier("zone1").fee(), Price::from_units(100));
        assert_eq!(courier("zone2").fee(), Price::from_units(200));
        assert_eq!(courier("zone3").fee(), Price::ZERO);

        let pickup = Delivery {
            method: Some("pickup".to_string()),
            zone: Some("zone2".to_string()),
            extra: Map::new(),
        };
        assert_eq!(pickup.fee(), Price::ZERO);
        assert_eq!(Delivery::default().fee(), Price::ZERO);
    }

    #[test]
    fn test_order_totals() {
        let order = OrderRecord::new(
            "abc123".to_string(),
            Some(UserId::new(42)),
            vec![line("p1", 350, 2)],
            courier("zone1"),
        );
        assert_eq!(order.subtotal, Price::from_units(700));
        assert_eq!(order.delivery.fee, Price::from_units(100));
        assert_eq!(order.total, Price::from_units(800));
        assert_eq!(order.status, OrderStatus::Created);
        assert!(!order.pos_sent);
    }

    #[test]
    fn test_delivery_extras_survive_and_fee_is_ours() {
        let delivery: Delivery = serde_json::from_value(serde_json::json!({
            "method": "courier",
            "zone": "zone2",
            "address": "Lenina 1",
            "fee": 0
        }))
        .unwrap();

        let order = OrderRecord::new("n".to_string(), None, vec![line("p3", 150, 1)], delivery);
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["delivery"]["address"], "Lenina 1");
        assert_eq!(json["delivery"]["fee"].as_f64(), Some(200.0));
        assert_eq!(json["userId"], Value::Null);
        assert_eq!(json["posSent"], false);
        assert_eq!(json["status"], "created");
    }

    #[test]
    fn test_mark_sent() {
        let mut order = OrderRecord::new("n".to_string(), None, vec![], Delivery::default());
        order.mark_sent();
        assert_eq!(order.status, OrderStatus::Sent);
        assert!(order.pos_sent);
    }
}
