//! Contact form.

use tableside_core::Email;
use tracing::instrument;

use super::ApiClient;
use super::types::ContactMessage;
use crate::auth::TokenRefresher;
use crate::error::ApiError;
use crate::http::Transport;

impl<T: Transport, R: TokenRefresher> ApiClient<T, R> {
    /// Send a message through the contact form.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if a field is rejected.
    #[instrument(skip(self, message), fields(email = %email))]
    pub async fn send_contact_message(
        &self,
        name: &str,
        email: &Email,
        subject: &str,
        message: &str,
    ) -> Result<ContactMessage, ApiError> {
        let body = ContactMessage {
            id: None,
            name: name.to_string(),
            email: email.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
            created_at: None,
        };
        self.post_json("/add_contact_message", &body).await
    }

    /// All contact messages (back office).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn contact_messages(&self) -> Result<Vec<ContactMessage>, ApiError> {
        self.get_json("/contacts").await
    }
}
