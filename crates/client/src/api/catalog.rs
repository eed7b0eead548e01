//! Menu reads: dishes and their variants.

use std::sync::Arc;

use tableside_core::DishId;
use tracing::{debug, instrument};

use super::ApiClient;
use super::cache::{CacheKey, CacheValue};
use super::types::{Dish, DishVariant};
use crate::auth::TokenRefresher;
use crate::cart::CatalogSource;
use crate::error::ApiError;
use crate::http::Transport;

impl<T: Transport, R: TokenRefresher> ApiClient<T, R> {
    /// All dishes on the menu.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn dishes(&self) -> Result<Arc<Vec<Dish>>, ApiError> {
        if let Some(CacheValue::Dishes(dishes)) = self.inner.cache.get(&CacheKey::Dishes).await {
            debug!("Cache hit for dishes");
            return Ok(dishes);
        }

        let dishes: Arc<Vec<Dish>> = Arc::new(self.get_json("/dishes").await?);

        self.inner
            .cache
            .insert(CacheKey::Dishes, CacheValue::Dishes(Arc::clone(&dishes)))
            .await;

        Ok(dishes)
    }

    /// Look up one dish in the (cached) menu.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the menu has no such dish.
    #[instrument(skip(self))]
    pub async fn dish(&self, id: DishId) -> Result<Dish, ApiError> {
        self.dishes()
            .await?
            .iter()
            .find(|dish| dish.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Dish not found: {id}")))
    }

    /// All dish variants.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn variants(&self) -> Result<Arc<Vec<DishVariant>>, ApiError> {
        self.cached_variants(CacheKey::Variants, "/dish-variants".to_string())
            .await
    }

    /// Variants of one dish.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn variants_for_dish(
        &self,
        dish_id: DishId,
    ) -> Result<Arc<Vec<DishVariant>>, ApiError> {
        self.cached_variants(
            CacheKey::VariantsForDish(dish_id),
            format!("/dish-variants/dish/{dish_id}"),
        )
        .await
    }

    async fn cached_variants(
        &self,
        key: CacheKey,
        path: String,
    ) -> Result<Arc<Vec<DishVariant>>, ApiError> {
        if let Some(CacheValue::Variants(variants)) = self.inner.cache.get(&key).await {
            debug!(?key, "Cache hit for variants");
            return Ok(variants);
        }

        let variants: Arc<Vec<DishVariant>> = Arc::new(self.get_json(&path).await?);

        self.inner
            .cache
            .insert(key, CacheValue::Variants(Arc::clone(&variants)))
            .await;

        Ok(variants)
    }

    /// Drop cached catalog data so the next read hits the backend.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl<T: Transport, R: TokenRefresher> CatalogSource for ApiClient<T, R> {
    async fn fetch_dishes(&self) -> Result<Arc<Vec<Dish>>, ApiError> {
        self.dishes().await
    }

    async fn fetch_variants(&self, dish_id: DishId) -> Result<Arc<Vec<DishVariant>>, ApiError> {
        self.variants_for_dish(dish_id).await
    }
}
