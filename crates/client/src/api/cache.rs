//! Cache types for catalog responses.

use std::sync::Arc;

use tableside_core::DishId;

use super::types::{Dish, DishVariant};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Dishes,
    Variants,
    VariantsForDish(DishId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Dishes(Arc<Vec<Dish>>),
    Variants(Arc<Vec<DishVariant>>),
}
