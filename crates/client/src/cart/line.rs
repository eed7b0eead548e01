//! Persisted cart lines.

use serde::{Deserialize, Serialize};
use tableside_core::{DishId, VariantId};

/// One cart entry, as persisted under `shopping_cart`.
///
/// Carries identifiers only; names and prices come from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub dish_id: DishId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    /// Always at least 1 while the line is in a cart.
    pub quantity: u32,
}

impl CartLine {
    /// Whether this line is for `dish_id` / `variant_id`.
    #[must_use]
    pub fn is_for(&self, dish_id: DishId, variant_id: Option<VariantId>) -> bool {
        self.dish_id == dish_id && self.variant_id == variant_id
    }
}

/// Parse persisted lines. Anything unreadable yields an empty cart.
pub(super) fn decode(raw: Option<&str>) -> Vec<CartLine> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<CartLine>>(raw) {
        Ok(lines) => normalize(lines),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable cart");
            Vec::new()
        }
    }
}

/// Drop empty lines and merge lines for the same dish and variant,
/// keeping first-seen order.
pub(super) fn normalize(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines.into_iter().filter(|l| l.quantity > 0) {
        match merged
            .iter_mut()
            .find(|m| m.is_for(line.dish_id, line.variant_id))
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line),
        }
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let line = CartLine {
            dish_id: DishId::new(1),
            variant_id: None,
            quantity: 2,
        };
        assert_eq!(serde_json::to_string(&line).unwrap(), r#"{"dishId":1,"quantity":2}"#);

        let with_variant: CartLine =
            serde_json::from_str(r#"{"dishId":1,"variantId":4,"quantity":1}"#).unwrap();
        assert_eq!(with_variant.variant_id, Some(VariantId::new(4)));
    }

    #[test]
    fn test_decode_absent_or_malformed_is_empty() {
        assert!(decode(None).is_empty());
        assert!(decode(Some("")).is_empty());
        assert!(decode(Some("{not json")).is_empty());
        assert!(decode(Some(r#"{"dishId":1}"#)).is_empty());
        assert!(decode(Some(r#"[{"dishId":"x","quantity":1}]"#)).is_empty());
    }

    #[test]
    fn test_decode_normalizes() {
        let lines = decode(Some(
            r#"[{"dishId":1,"quantity":2},{"dishId":2,"quantity":0},{"dishId":1,"quantity":3},{"dishId":1,"variantId":7,"quantity":1}]"#,
        ));
        assert_eq!(
            lines,
            vec![
                CartLine { dish_id: DishId::new(1), variant_id: None, quantity: 5 },
                CartLine { dish_id: DishId::new(1), variant_id: Some(VariantId::new(7)), quantity: 1 },
            ]
        );
    }
}
