//! Newtype IDs for type-safe entity references.
//!
//! The backend hands out integer primary keys for every resource. Use the
//! `define_id!` macro to wrap them so a dish id can never be passed where an
//! order id is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `get()`
/// - `From<i64>`, `Into<i64>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use tableside_core::define_id;
/// define_id!(TableId);
/// define_id!(WaiterId);
///
/// let table = TableId::new(4);
/// let waiter: WaiterId = "12".parse().unwrap();
///
/// assert_eq!(table.get(), 4);
/// assert_eq!(waiter.to_string(), "12");
/// // These are different types, so this won't compile:
/// // let _: TableId = waiter;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from a raw backend key.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying key.
            #[must_use]
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(DishId);
define_id!(VariantId);
define_id!(OrderId);
define_id!(CouponId);
define_id!(DiscountTypeId);
define_id!(ContactMessageId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&DishId::new(7)).unwrap();
        assert_eq!(json, "7");

        let id: OrderId = serde_json::from_str("42").unwrap();
        assert_eq!(id, OrderId::new(42));
    }

    #[test]
    fn test_parse_from_cli_argument() {
        assert_eq!(" 15 ".parse::<VariantId>().unwrap(), VariantId::new(15));
        assert!("abc".parse::<VariantId>().is_err());
    }

    #[test]
    fn test_ordering_follows_raw_key() {
        let mut ids = vec![DishId::new(3), DishId::new(1), DishId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![DishId::new(1), DishId::new(2), DishId::new(3)]);
    }
}
