//! Sign-in, registration, profile, and session lifecycle.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tableside_core::Email;
use tracing::{info, instrument, warn};

use super::ApiClient;
use super::types::{RegisterRequest, User};
use crate::auth::{CredentialPair, TokenRefresher};
use crate::error::ApiError;
use crate::http::{ApiRequest, Transport};

/// Shown when `/sign_in` rejects the email/password pair.
pub const INVALID_CREDENTIALS: &str = "Incorrect email or password.";

#[derive(Serialize)]
struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    password: &'a str,
    firstname: &'a str,
    lastname: &'a str,
    phone: &'a str,
    birthdate: String,
}

#[derive(Serialize)]
struct ForgotPasswordBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetPasswordBody<'a> {
    token: &'a str,
    password: &'a str,
}

impl<T: Transport, R: TokenRefresher> ApiClient<T, R> {
    // =========================================================================
    // Session
    // =========================================================================

    /// Sign in and load the user's profile.
    ///
    /// On success both tokens are stored and become the default credentials.
    /// A failure to load the profile afterwards is logged and leaves
    /// [`current_user`](Self::current_user) empty; the sign-in itself stands.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` carrying [`INVALID_CREDENTIALS`] when
    /// the backend rejects the email/password pair, and other `ApiError`s
    /// when it fails or answers without an access token.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<(), ApiError> {
        let request = ApiRequest::post("/sign_in")
            .anonymous()
            .json(&SignInBody {
                email: email.as_str(),
                password: password.expose_secret(),
            })?;
        let response = self.send(request).await.map_err(|e| match e {
            ApiError::Unauthorized(_) => ApiError::Validation {
                status: 401,
                message: INVALID_CREDENTIALS.to_string(),
            },
            other => other,
        })?;
        let tokens: TokenResponse = response.json()?;

        if tokens.access.is_empty() {
            return Err(ApiError::InvalidInput(
                "sign-in response carried no access token".to_string(),
            ));
        }

        self.gateway().sign_in(CredentialPair {
            access: SecretString::from(tokens.access),
            refresh: tokens
                .refresh
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
        });
        info!("signed in");

        if let Err(e) = self.load_user_details().await {
            warn!(error = %e, "failed to load profile after sign-in");
        }
        Ok(())
    }

    /// Forget credentials and the loaded profile.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.gateway().sign_out();
        self.set_user(None);
        info!("signed out");
    }

    /// Resume a stored session at startup.
    ///
    /// When an access token is held the profile is fetched (the gateway
    /// refreshes an expired token on the way). If that fails the session is
    /// logged out. Returns the profile when the session is usable.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Option<User> {
        if !self.gateway().credentials().has_access_token() {
            return None;
        }

        match self.load_user_details().await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "stored session is no longer valid");
                self.logout();
                None
            }
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` with the backend's message if a field
    /// is rejected.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let body = RegisterBody {
            email: request.email.as_str(),
            password: request.password.expose_secret(),
            firstname: &request.first_name,
            lastname: &request.last_name,
            phone: &request.phone,
            birthdate: request.birth_date.format("%Y-%m-%d").to_string(),
        };
        self.send(ApiRequest::post("/register").anonymous().json(&body)?)
            .await?;
        info!("account registered");
        Ok(())
    }

    /// Fetch the signed-in user's profile and remember it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails; the remembered profile is
    /// cleared in that case.
    #[instrument(skip(self))]
    pub async fn load_user_details(&self) -> Result<User, ApiError> {
        match self.get_json::<User>("/user_details").await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                self.set_user(None);
                Err(e)
            }
        }
    }

    /// List all users (back office).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get_json("/users/").await
    }

    /// Ask for a password reset link.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &Email) -> Result<(), ApiError> {
        let body = ForgotPasswordBody {
            email: email.as_str(),
        };
        self.send(ApiRequest::post("/forgot_password").anonymous().json(&body)?)
            .await?;
        Ok(())
    }

    /// Set a new password using the token from a reset link.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the token is invalid or expired.
    #[instrument(skip(self, token, password))]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let body = ResetPasswordBody {
            token,
            password: password.expose_secret(),
        };
        self.send(ApiRequest::post("/reset_password").anonymous().json(&body)?)
            .await?;
        Ok(())
    }
}
