//! Back-office dashboard figures.

use tracing::instrument;

use super::ApiClient;
use super::types::{Statistics, StatisticsEnvelope};
use crate::auth::TokenRefresher;
use crate::error::ApiError;
use crate::http::Transport;

impl<T: Transport, R: TokenRefresher> ApiClient<T, R> {
    /// Fetch dashboard statistics. Missing figures read as zero.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-staff users.
    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<Statistics, ApiError> {
        let envelope: StatisticsEnvelope = self.get_json("/api/statistics/").await?;
        Ok(envelope.statistics.unwrap_or_default())
    }
}
