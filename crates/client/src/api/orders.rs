//! Order placement and the back-office order queue.

use serde::Serialize;
use tableside_core::{OrderId, OrderStatus};
use tracing::{info, instrument};

use super::ApiClient;
use super::types::{Order, OrderCreateRequest, PendingOrders, StatusUpdate};
use crate::auth::TokenRefresher;
use crate::error::ApiError;
use crate::http::{ApiRequest, Transport};

/// Cancellation reason recorded when staff give none.
pub const DEFAULT_CANCEL_REASON: &str = "Canceled by admin";

#[derive(Serialize)]
struct CancelBody<'a> {
    reason: &'a str,
}

impl<T: Transport, R: TokenRefresher> ApiClient<T, R> {
    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for an order without items, and
    /// `ApiError::Validation` with the backend's message (minimum order,
    /// invalid coupon, missing address field, ...) if it is rejected.
    #[instrument(skip(self, order), fields(items = order.items.len()))]
    pub async fn create_order(&self, order: &OrderCreateRequest) -> Result<Order, ApiError> {
        if order.items.is_empty() {
            return Err(ApiError::InvalidInput("The cart is empty.".to_string()));
        }

        let created: Order = self.post_json("/api/orders/create/", order).await?;
        info!(order_id = %created.id, order_number = %created.order_number, "order placed");
        Ok(created)
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.get_json(&format!("/api/orders/{id}/")).await
    }

    /// Orders placed by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get_json("/api/orders/my-orders/").await
    }

    // =========================================================================
    // Back office
    // =========================================================================

    /// Every order (back office).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get_json("/api/admin/orders/").await
    }

    /// Move an order to `status`, optionally leaving a note.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend refuses the transition.
    #[instrument(skip(self, admin_note))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        admin_note: Option<&str>,
    ) -> Result<Order, ApiError> {
        let body = StatusUpdate { status, admin_note };
        let order: Order = self
            .post_json(&format!("/api/admin/orders/{id}/status/"), &body)
            .await?;
        info!(status = %order.status, "order status updated");
        Ok(order)
    }

    /// Accept a pending order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn accept_order(&self, id: OrderId) -> Result<Order, ApiError> {
        let response = self
            .send(ApiRequest::post(format!("/api/admin/orders/{id}/accept/")))
            .await?;
        Ok(response.json()?)
    }

    /// Cancel an order. `reason` defaults to [`DEFAULT_CANCEL_REASON`].
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId, reason: Option<&str>) -> Result<(), ApiError> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CANCEL_REASON);
        let request = ApiRequest::post(format!("/api/admin/orders/{id}/cancel/"))
            .json(&CancelBody { reason })?;
        self.send(request).await?;
        info!(reason, "order canceled");
        Ok(())
    }

    /// Mark an order as seen by staff.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn mark_order_viewed(&self, id: OrderId) -> Result<(), ApiError> {
        self.send(ApiRequest::post(format!("/api/admin/orders/{id}/view/")))
            .await?;
        Ok(())
    }

    /// How many orders are waiting, and whether any arrived since last seen.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn pending_orders(&self) -> Result<PendingOrders, ApiError> {
        self.get_json("/api/admin/orders/pending-count/").await
    }
}
