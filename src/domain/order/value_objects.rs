use serde::{Deserialize, Serialize};

// ============================================================================
// Order Value Objects
// ============================================================================
//
// An order travels and is stored as a single unit. Delivery, Payment and the
// item list have no identity outside their parent order.
//
// Decoding is lenient: missing fields take their defaults and validation
// decides whether the order is acceptable.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: String,
    pub oof_shard: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

/// The two fields every publish request must carry. Parsed without
/// touching the rest of the payload.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct OrderEnvelope {
    pub order_uid: String,
    pub track_number: String,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A complete, valid order used across the crate's tests.
    pub(crate) fn sample_order(uid: &str) -> Order {
        Order {
            order_uid: uid.to_string(),
            track_number: "WBILMTESTTRACK".to_string(),
            entry: "WBIL".to_string(),
            delivery: Delivery {
                name: "Test Testov".to_string(),
                phone: "+9720000000".to_string(),
                zip: "2639809".to_string(),
                city: "Kiryat Mozkin".to_string(),
                address: "Ploshad Mira 15".to_string(),
                region: "Kraiot".to_string(),
                email: "test@gmail.com".to_string(),
            },
            payment: Payment {
                transaction: uid.to_string(),
                currency: "USD".to_string(),
                provider: "wbpay".to_string(),
                amount: 1817,
                payment_dt: 1637907727,
                bank: "alpha".to_string(),
                delivery_cost: 1500,
                goods_total: 317,
                ..Default::default()
            },
            items: vec![Item {
                chrt_id: 9934930,
                track_number: "WBILMTESTTRACK".to_string(),
                price: 453,
                rid: "ab4219087a764ae0btest".to_string(),
                name: "Mascaras".to_string(),
                sale: 30,
                size: "0".to_string(),
                total_price: 317,
                nm_id: 2389212,
                brand: "Vivienne Sabo".to_string(),
                status: 202,
            }],
            locale: "en".to_string(),
            customer_id: "test".to_string(),
            delivery_service: "meest".to_string(),
            shardkey: "9".to_string(),
            sm_id: 99,
            date_created: "2021-11-26T06:22:19Z".to_string(),
            oof_shard: "1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_order_decodes_wire_format() {
        let raw = r#"{
            "order_uid": "b563feb7b2b84b6test",
            "track_number": "WBILMTESTTRACK",
            "delivery": {"name": "Test Testov", "email": "test@gmail.com"},
            "payment": {"currency": "USD", "amount": 1817},
            "items": [{"chrt_id": 9934930, "name": "Mascaras", "price": 453}],
            "sm_id": 99
        }"#;

        let order: Order = serde_json::from_str(raw).unwrap();

        assert_eq!(order.order_uid, "b563feb7b2b84b6test");
        assert_eq!(order.delivery.email, "test@gmail.com");
        assert_eq!(order.payment.amount, 1817);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, 453);
        assert_eq!(order.sm_id, 99);
        assert!(order.locale.is_empty());
    }

    #[test]
    fn test_envelope_ignores_other_fields() {
        let raw = r#"{"order_uid":"abc123","track_number":"TRK1","items":"not-a-list"}"#;
        let envelope: OrderEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(envelope.order_uid, "abc123");
        assert_eq!(envelope.track_number, "TRK1");
    }

    #[test]
    fn test_order_rejects_wrong_types() {
        let raw = r#"{"order_uid": 42}"#;
        assert!(serde_json::from_str::<Order>(raw).is_err());
    }
}
