//! Account session commands.
//!
//! The session persists between invocations under the configured data
//! directory, so `login` once and subsequent commands carry the bearer
//! token.

use zafaran_client::cart::CartStore;
use zafaran_client::session::{
    LoginCredentials, RegisterDetails, SessionError, SessionStore,
};

/// Log in and persist the session.
#[allow(clippy::print_stdout)]
pub async fn login(
    session: &SessionStore,
    email: &str,
    password: &str,
) -> Result<(), SessionError> {
    let result = session
        .login(&LoginCredentials {
            email: email.to_owned(),
            password: password.to_owned(),
        })
        .await?;

    if let Some(user) = &result.user {
        println!("Logged in as {} <{}>", user.full_name, user.email);
        if !user.verified {
            println!("Your email is not verified yet; run `zafaran auth verify`.");
        }
    }
    Ok(())
}

/// Register a new account and persist the resulting session.
#[allow(clippy::print_stdout)]
pub async fn register(
    session: &SessionStore,
    name: &str,
    email: &str,
    phone: &str,
    password: &str,
) -> Result<(), SessionError> {
    session
        .register(&RegisterDetails {
            full_name: name.to_owned(),
            email: email.to_owned(),
            phone_number: phone.to_owned(),
            password: password.to_owned(),
            confirm_password: password.to_owned(),
        })
        .await?;

    println!("Account created. Check {email} for a verification code, then run:");
    println!("  zafaran auth verify --code <code>");
    Ok(())
}

/// Log out, clearing the persisted session and the local cart mirror.
#[allow(clippy::print_stdout)]
pub fn logout(session: &SessionStore, cart: &CartStore) -> Result<(), SessionError> {
    session.logout()?;
    cart.clear_local();
    println!("Logged out.");
    Ok(())
}

/// Show the current session.
#[allow(clippy::print_stdout)]
pub fn whoami(session: &SessionStore) {
    match session.current_user() {
        Some(user) => {
            println!("{} <{}>", user.full_name, user.email);
            if !user.phone_number.is_empty() {
                println!("Phone: {}", user.phone_number);
            }
            println!(
                "Email {}",
                if user.verified { "verified" } else { "not verified" }
            );
        }
        None => println!("Not logged in."),
    }
}

/// Verify the account email with the emailed code.
#[allow(clippy::print_stdout)]
pub async fn verify(session: &SessionStore, code: &str) -> Result<(), SessionError> {
    let user = session
        .current_user()
        .ok_or(SessionError::NotLoggedIn)?;

    session.verify_email(&user.email, code).await?;
    println!("Email verified.");
    Ok(())
}

/// Resend the verification email for the logged-in account.
#[allow(clippy::print_stdout)]
pub async fn resend_verification(session: &SessionStore) -> Result<(), SessionError> {
    let user = session
        .current_user()
        .ok_or(SessionError::NotLoggedIn)?;

    session.send_verification(&user.email).await?;
    println!("Verification email sent to {}.", user.email);
    Ok(())
}

/// Change the account password; the old password is checked server-side.
#[allow(clippy::print_stdout)]
pub async fn change_password(
    session: &SessionStore,
    old_password: &str,
    new_password: &str,
    confirm_password: &str,
) -> Result<(), SessionError> {
    if session.current_user().is_none() {
        return Err(SessionError::NotLoggedIn);
    }

    session
        .change_password(old_password, new_password, confirm_password)
        .await?;
    println!("Password changed.");
    Ok(())
}

/// Update the profile name and phone number, on the backend and locally.
#[allow(clippy::print_stdout)]
pub async fn update_profile(
    session: &SessionStore,
    name: &str,
    phone: &str,
) -> Result<(), SessionError> {
    if session.current_user().is_none() {
        return Err(SessionError::NotLoggedIn);
    }

    session.update_profile(name, phone).await?;

    if let Some(user) = session.current_user() {
        println!("Profile updated: {} <{}>", user.full_name, user.email);
    }
    Ok(())
}
