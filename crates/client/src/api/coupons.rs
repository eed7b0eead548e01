//! Coupon types (templates) and issued coupons.

use tableside_core::DiscountTypeId;
use tracing::{info, instrument};

use super::ApiClient;
use super::types::{Coupon, DiscountType, DiscountTypeForm};
use crate::auth::TokenRefresher;
use crate::error::ApiError;
use crate::http::{ApiRequest, Transport};

impl<T: Transport, R: TokenRefresher> ApiClient<T, R> {
    /// All coupon types.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn coupon_types(&self) -> Result<Vec<DiscountType>, ApiError> {
        self.get_json("/api/coupon_types/").await
    }

    /// Coupon types whose `discount_category` equals `category`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn coupon_types_in_category(
        &self,
        category: &str,
    ) -> Result<Vec<DiscountType>, ApiError> {
        let mut types = self.coupon_types().await?;
        types.retain(|t| t.discount_category == category);
        Ok(types)
    }

    /// One coupon type.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it does not exist.
    #[instrument(skip(self))]
    pub async fn coupon_type(&self, id: DiscountTypeId) -> Result<DiscountType, ApiError> {
        self.get_json(&format!("/api/coupon_type/{id}/")).await
    }

    /// Create a coupon type (multipart, with optional image).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if a field is rejected.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_coupon_type(
        &self,
        form: DiscountTypeForm,
    ) -> Result<DiscountType, ApiError> {
        let request = ApiRequest::post("/api/create_coupon_type/").multipart(form.into_parts());
        let created: DiscountType = self.send(request).await?.json()?;
        info!(id = ?created.id, "coupon type created");
        Ok(created)
    }

    /// Replace a coupon type (multipart, with optional image).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if a field is rejected.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn update_coupon_type(
        &self,
        id: DiscountTypeId,
        form: DiscountTypeForm,
    ) -> Result<DiscountType, ApiError> {
        let request =
            ApiRequest::put(format!("/api/coupon_type/{id}/")).multipart(form.into_parts());
        Ok(self.send(request).await?.json()?)
    }

    /// Delete a coupon type.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_coupon_type(&self, id: DiscountTypeId) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(format!("/api/coupon_type/{id}/")))
            .await?;
        info!("coupon type deleted");
        Ok(())
    }

    /// Coupons visible to the signed-in user (all coupons for staff).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn coupons(&self) -> Result<Vec<Coupon>, ApiError> {
        self.get_json("/api/coupons/").await
    }
}
