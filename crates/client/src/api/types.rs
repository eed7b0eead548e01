//! Wire models for the Tableside backend.
//!
//! Prices are parsed leniently at this boundary (see
//! [`tableside_core::lenient_amount`]); everything downstream works with
//! `Option<Decimal>` or [`Money`] and never re-inspects the raw JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tableside_core::{
    ContactMessageId, CouponId, CouponUsage, DeliveryType, DiscountTypeId, DishId, Money, OrderId,
    OrderStatus, PaymentMethod, PaymentStatus, ScratchState, UserId, VariantId, lenient_amount,
};

use crate::http::FormPart;

fn money_or_zero<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_amount::deserialize(deserializer)?.map_or(Money::ZERO, Money::new))
}

// =============================================================================
// Catalog
// =============================================================================

/// A menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub id: DishId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `None` when the backend sent no price or something non-numeric.
    #[serde(default, with = "lenient_amount")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Dish {
    /// Unit price, if the dish has a usable one.
    #[must_use]
    pub fn unit_price(&self) -> Option<Money> {
        self.price.map(Money::new)
    }

    /// Whether the dish can be put in a cart (price present and positive).
    #[must_use]
    pub fn is_orderable(&self) -> bool {
        self.unit_price().is_some_and(|p| p.is_chargeable())
    }
}

/// A priced variation of a dish (size, portion, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishVariant {
    pub id: VariantId,
    pub dish_id: DishId,
    #[serde(default)]
    pub detail: String,
    #[serde(default, with = "lenient_amount")]
    pub price: Option<Decimal>,
}

impl DishVariant {
    /// Unit price, if the variant has a usable one.
    #[must_use]
    pub fn unit_price(&self) -> Option<Money> {
        self.price.map(Money::new)
    }
}

// =============================================================================
// Users
// =============================================================================

/// Profile of the signed-in user, or one entry of the admin user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

impl User {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() => format!("{first} {last}"),
            _ if !self.name.is_empty() => self.name.clone(),
            _ => self.email.clone(),
        }
    }
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: tableside_core::Email,
    pub password: secrecy::SecretString,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// `YYYY-MM-DD`.
    pub birth_date: chrono::NaiveDate,
}

// =============================================================================
// Orders
// =============================================================================

/// One line of an order.
///
/// Sent with only `dish`, `dish_variant` and `quantity` (plus an optional
/// special request); the backend fills in the descriptive fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub dish: DishId,
    #[serde(default)]
    pub dish_variant: Option<VariantId>,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_request: Option<String>,
    #[serde(default, skip_serializing)]
    pub dish_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub variant_detail: Option<String>,
    #[serde(default, skip_serializing, deserialize_with = "lenient_amount::deserialize")]
    pub unit_price: Option<Decimal>,
    #[serde(default, skip_serializing, deserialize_with = "lenient_amount::deserialize")]
    pub total_price: Option<Decimal>,
}

impl OrderItem {
    /// A line as submitted at checkout.
    #[must_use]
    pub const fn new(dish: DishId, dish_variant: Option<VariantId>, quantity: u32) -> Self {
        Self {
            dish,
            dish_variant,
            quantity,
            special_request: None,
            dish_name: None,
            variant_detail: None,
            unit_price: None,
            total_price: None,
        }
    }
}

/// Delivery and payment details collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub delivery_type: DeliveryType,
    pub delivery_name: String,
    pub delivery_phone: String,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_zip: String,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub comment: Option<String>,
}

/// Body of `POST /api/orders/create/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderCreateRequest {
    pub delivery_type: DeliveryType,
    pub delivery_name: String,
    pub delivery_phone: String,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_zip: String,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub items: Vec<OrderItem>,
}

impl OrderCreateRequest {
    /// Combine checkout details with the cart's order lines.
    #[must_use]
    pub fn new(details: CheckoutDetails, items: Vec<OrderItem>) -> Self {
        let blank_to_none = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Self {
            delivery_type: details.delivery_type,
            delivery_name: details.delivery_name,
            delivery_phone: details.delivery_phone,
            delivery_address: details.delivery_address,
            delivery_city: details.delivery_city,
            delivery_zip: details.delivery_zip,
            payment_method: details.payment_method,
            coupon_code: blank_to_none(details.coupon_code),
            comment: blank_to_none(details.comment),
            items,
        }
    }
}

/// An order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "money_or_zero")]
    pub original_price: Money,
    #[serde(default, deserialize_with = "money_or_zero")]
    pub discount_amount: Money,
    #[serde(default, deserialize_with = "money_or_zero")]
    pub delivery_fee: Money,
    #[serde(default, deserialize_with = "money_or_zero")]
    pub total_price: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub delivery_type: String,
    #[serde(default)]
    pub delivery_name: String,
    #[serde(default)]
    pub delivery_phone: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub delivery_city: String,
    #[serde(default)]
    pub delivery_zip: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub admin_note: Option<String>,
    #[serde(default)]
    pub coupon: Option<serde_json::Value>,
    #[serde(default)]
    pub is_viewed_by_admin: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// `address, city zip`.
    #[must_use]
    pub fn full_address(&self) -> String {
        format!(
            "{}, {} {}",
            self.delivery_address, self.delivery_city, self.delivery_zip
        )
    }

    /// Human-readable status.
    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        self.status.label()
    }
}

/// Body of `POST /api/admin/orders/{id}/status/`.
#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdate<'a> {
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<&'a str>,
}

/// Back-office badge: how many orders await a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PendingOrders {
    #[serde(rename = "pending_count", default)]
    pub count: u64,
    #[serde(rename = "has_new_orders", default)]
    pub has_new: bool,
}

// =============================================================================
// Coupons
// =============================================================================

/// A coupon template ("coupon type").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DiscountTypeId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub discount_category: String,
    #[serde(default, with = "lenient_amount")]
    pub value: Option<Decimal>,
}

/// Image attached to a coupon type form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Fields for creating or updating a coupon type.
#[derive(Debug, Clone)]
pub struct DiscountTypeForm {
    pub name: String,
    pub description: Option<String>,
    pub discount_category: String,
    pub value: Decimal,
    pub image: Option<ImageUpload>,
}

impl DiscountTypeForm {
    /// Encode as `multipart/form-data` fields.
    #[must_use]
    pub fn into_parts(self) -> Vec<FormPart> {
        let mut parts = vec![
            FormPart::text("name", self.name),
            FormPart::text("discount_category", self.discount_category),
            FormPart::text("value", self.value.to_string()),
        ];
        if let Some(description) = self.description {
            parts.push(FormPart::text("description", description));
        }
        if let Some(image) = self.image {
            parts.push(FormPart::file("image", image.file_name, image.mime, image.bytes));
        }
        parts
    }
}

/// What a coupon discounts: the backend sends either the coupon type's id
/// or the embedded coupon type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponDiscount {
    Reference(DiscountTypeId),
    Detailed(DiscountType),
}

impl CouponDiscount {
    /// The coupon type's id, when known.
    #[must_use]
    pub fn id(&self) -> Option<DiscountTypeId> {
        match self {
            Self::Reference(id) => Some(*id),
            Self::Detailed(detail) => detail.id,
        }
    }

    /// The embedded coupon type, when the backend sent one.
    #[must_use]
    pub const fn details(&self) -> Option<&DiscountType> {
        match self {
            Self::Reference(_) => None,
            Self::Detailed(detail) => Some(detail),
        }
    }
}

/// A coupon issued to a user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "CouponWire")]
pub struct Coupon {
    pub id: Option<CouponId>,
    pub user: Option<UserId>,
    pub user_name: Option<String>,
    pub discount: CouponDiscount,
    pub code: String,
    pub expiration_date: String,
    pub status_used: CouponUsage,
    pub status_scratched: ScratchState,
    pub used_date: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DiscountTypeWire {
    Id(DiscountTypeId),
    Detailed(DiscountType),
}

#[derive(Deserialize)]
struct CouponWire {
    #[serde(default)]
    id: Option<CouponId>,
    #[serde(default)]
    user: Option<UserId>,
    #[serde(default)]
    user_name: Option<String>,
    discount_type: DiscountTypeWire,
    #[serde(default)]
    discount_type_details: Option<DiscountType>,
    #[serde(default)]
    code: String,
    #[serde(default)]
    expiration_date: String,
    #[serde(default)]
    status_used: CouponUsage,
    #[serde(default)]
    status_scratched: ScratchState,
    #[serde(default)]
    used_date: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<CouponWire> for Coupon {
    fn from(wire: CouponWire) -> Self {
        let discount = match (wire.discount_type, wire.discount_type_details) {
            (DiscountTypeWire::Detailed(detail), _) => CouponDiscount::Detailed(detail),
            (DiscountTypeWire::Id(id), Some(mut detail)) => {
                if detail.id.is_none() {
                    detail.id = Some(id);
                }
                CouponDiscount::Detailed(detail)
            }
            (DiscountTypeWire::Id(id), None) => CouponDiscount::Reference(id),
        };

        Self {
            id: wire.id,
            user: wire.user,
            user_name: wire.user_name,
            discount,
            code: wire.code,
            expiration_date: wire.expiration_date,
            status_used: wire.status_used,
            status_scratched: wire.status_scratched,
            used_date: wire.used_date,
            created_at: wire.created_at,
        }
    }
}

// =============================================================================
// Contact & statistics
// =============================================================================

/// A message sent through the contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ContactMessageId>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Figures for one reporting period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PeriodStatistics {
    pub count: u64,
    #[serde(deserialize_with = "money_or_zero")]
    pub total_revenue: Money,
    pub pending: Option<u64>,
    #[serde(deserialize_with = "lenient_amount::deserialize")]
    pub avg_order_value: Option<Decimal>,
    pub completed: Option<u64>,
}

/// Back-office dashboard figures. Absent figures read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub users: u64,
    pub orders: u64,
    #[serde(rename = "dailyOrders")]
    pub daily_orders: u64,
    pub today: PeriodStatistics,
    pub week: PeriodStatistics,
    pub month: PeriodStatistics,
    pub pending_count: u64,
    pub status_breakdown: BTreeMap<String, u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatisticsEnvelope {
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dish_lenient_price() {
        let dish: Dish = serde_json::from_value(json!({
            "id": 1, "name": "Gulyás", "description": "", "price": "2490",
            "category": "soup", "allergies": ["celery"]
        }))
        .unwrap();
        assert_eq!(dish.price, Some(Decimal::from(2490)));
        assert!(dish.is_orderable());

        let broken: Dish =
            serde_json::from_value(json!({"id": 2, "name": "Special", "price": "n/a"})).unwrap();
        assert_eq!(broken.price, None);
        assert!(!broken.is_orderable());

        let free: Dish = serde_json::from_value(json!({"id": 3, "name": "Water", "price": 0})).unwrap();
        assert!(!free.is_orderable());
    }

    #[test]
    fn test_coupon_with_embedded_discount_type() {
        let coupon: Coupon = serde_json::from_value(json!({
            "id": 9, "user": 4, "code": "SCRATCH-1", "expiration_date": "2025-12-31",
            "status_used": "not_used", "status_scratched": "scratched",
            "discount_type": {"id": 3, "name": "10% off", "discount_category": "percent", "value": 10}
        }))
        .unwrap();
        assert_eq!(coupon.discount.id(), Some(DiscountTypeId::new(3)));
        assert_eq!(coupon.discount.details().unwrap().name, "10% off");
        assert_eq!(coupon.status_scratched, ScratchState::Scratched);
    }

    #[test]
    fn test_coupon_with_discount_type_reference() {
        let coupon: Coupon = serde_json::from_value(json!({
            "user": 4, "code": "X", "expiration_date": "2025-12-31",
            "status_used": "used", "status_scratched": "not_scratched",
            "discount_type": 3
        }))
        .unwrap();
        assert_eq!(coupon.discount, CouponDiscount::Reference(DiscountTypeId::new(3)));
        assert_eq!(coupon.status_used, CouponUsage::Used);
    }

    #[test]
    fn test_coupon_reference_with_details_field() {
        let coupon: Coupon = serde_json::from_value(json!({
            "code": "X", "discount_type": 5,
            "discount_type_details": {"name": "Free dessert", "discount_category": "item", "value": "0"}
        }))
        .unwrap();
        let details = coupon.discount.details().unwrap();
        assert_eq!(details.id, Some(DiscountTypeId::new(5)));
        assert_eq!(details.name, "Free dessert");
    }

    #[test]
    fn test_order_defaults_and_address() {
        let order: Order = serde_json::from_value(json!({
            "id": 12, "order_number": "ORD-12", "total_price": "4980.00",
            "status": "in_delivery", "delivery_address": "Fő utca 1",
            "delivery_city": "Budapest", "delivery_zip": "1011",
            "created_at": "2025-03-01T18:30:00+01:00"
        }))
        .unwrap();
        assert_eq!(order.full_address(), "Fő utca 1, Budapest 1011");
        assert_eq!(order.status, OrderStatus::InDelivery);
        assert_eq!(order.total_price, Money::new(Decimal::new(498_000, 2)));
        assert_eq!(order.delivery_fee, Money::ZERO);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_order_create_request_wire_shape() {
        let details = CheckoutDetails {
            delivery_name: "Anna".to_string(),
            coupon_code: Some("  ".to_string()),
            ..CheckoutDetails::default()
        };
        let request = OrderCreateRequest::new(
            details,
            vec![OrderItem::new(DishId::new(1), Some(VariantId::new(2)), 3)],
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["delivery_type"], "delivery");
        assert_eq!(value["payment_method"], "cash_on_delivery");
        assert!(value.get("coupon_code").is_none());
        assert_eq!(
            value["items"],
            json!([{"dish": 1, "dish_variant": 2, "quantity": 3}])
        );
    }

    #[test]
    fn test_statistics_defaults() {
        let envelope: StatisticsEnvelope = serde_json::from_value(json!({
            "statistics": {"users": 40, "dailyOrders": 3, "today": {"count": 3, "total_revenue": 9000}}
        }))
        .unwrap();
        let stats = envelope.statistics.unwrap();
        assert_eq!(stats.users, 40);
        assert_eq!(stats.daily_orders, 3);
        assert_eq!(stats.orders, 0);
        assert_eq!(stats.today.total_revenue, Money::new(Decimal::from(9000)));
        assert_eq!(stats.week, PeriodStatistics::default());
        assert!(stats.status_breakdown.is_empty());
    }

    #[test]
    fn test_discount_type_form_parts() {
        let form = DiscountTypeForm {
            name: "Happy hour".to_string(),
            description: None,
            discount_category: "percent".to_string(),
            value: Decimal::from(15),
            image: Some(ImageUpload {
                file_name: "hh.png".to_string(),
                mime: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            }),
        };
        let names: Vec<_> = form.into_parts().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["name", "discount_category", "value", "image"]);
    }
}
