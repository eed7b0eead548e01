//! Account commands: sign-in, sign-out, registration, password reset and
//! the contact form.

use chrono::NaiveDate;
use tableside_client::api::types::RegisterRequest;

use super::{CliError, Context, parse_email, password_or_stdin};

/// Fields collected by `ts-cli register`.
pub struct RegisterInput {
    pub email: String,
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub birth_date: NaiveDate,
}

/// Sign in and store the credential pair.
pub async fn login(ctx: &Context, email: &str, password: Option<String>) -> Result<(), CliError> {
    let email = parse_email(email)?;
    let password = password_or_stdin(password)?;

    ctx.client.sign_in(&email, &password).await?;

    let name = ctx
        .client
        .current_user()
        .map_or_else(|| email.to_string(), |user| user.display_name());
    #[allow(clippy::print_stdout)]
    {
        println!("Signed in as {name}");
    }
    Ok(())
}

/// Forget the credentials and empty the cart.
pub fn logout(ctx: &Context) {
    ctx.client.logout();
    ctx.cart_offline().clear();
    #[allow(clippy::print_stdout)]
    {
        println!("Signed out");
    }
}

/// Show the signed-in user's profile.
pub async fn whoami(ctx: &Context) -> Result<(), CliError> {
    let had_session = ctx.client.session_status().is_signed_in();
    let user = ctx.client.restore_session().await;

    #[allow(clippy::print_stdout)]
    {
        match user {
            Some(user) => {
                println!("{} <{}>", user.display_name(), user.email);
                if let Some(phone) = &user.phone {
                    println!("  Phone:  {phone}");
                }
                if let Some(points) = user.points {
                    println!("  Points: {points}");
                }
            }
            None if had_session => {
                println!("Session expired. Sign in again with `ts-cli login`.");
            }
            None => println!("Not signed in"),
        }
    }
    Ok(())
}

/// Create an account.
pub async fn register(ctx: &Context, input: RegisterInput) -> Result<(), CliError> {
    let request = RegisterRequest {
        email: parse_email(&input.email)?,
        password: password_or_stdin(input.password)?,
        first_name: input.first_name,
        last_name: input.last_name,
        phone: input.phone,
        birth_date: input.birth_date,
    };

    ctx.client.register(&request).await?;
    tracing::info!(email = %request.email, "account registered");
    #[allow(clippy::print_stdout)]
    {
        println!("Account created for {}. Sign in with `ts-cli login`.", request.email);
    }
    Ok(())
}

/// Request a password reset link.
pub async fn forgot_password(ctx: &Context, email: &str) -> Result<(), CliError> {
    let email = parse_email(email)?;
    ctx.client.forgot_password(&email).await?;
    #[allow(clippy::print_stdout)]
    {
        println!("If {email} has an account, a reset link is on its way.");
    }
    Ok(())
}

/// Set a new password with a reset token.
pub async fn reset_password(
    ctx: &Context,
    token: &str,
    password: Option<String>,
) -> Result<(), CliError> {
    if token.trim().is_empty() {
        return Err(CliError::InvalidArgument("Reset token must not be empty".to_string()));
    }
    let password = password_or_stdin(password)?;
    ctx.client.reset_password(token.trim(), &password).await?;
    #[allow(clippy::print_stdout)]
    {
        println!("Password changed. Sign in with `ts-cli login`.");
    }
    Ok(())
}

/// Send a message through the contact form.
pub async fn contact(
    ctx: &Context,
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> Result<(), CliError> {
    let email = parse_email(email)?;
    ctx.client
        .send_contact_message(name, &email, subject, message)
        .await?;
    #[allow(clippy::print_stdout)]
    {
        println!("Message sent. Thank you!");
    }
    Ok(())
}
