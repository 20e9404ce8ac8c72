//! Cart commands.
//!
//! All cart commands require a logged-in, email-verified session; the
//! backend enforces this too, but checking locally gives a clearer message
//! than a 401.

use thiserror::Error;

use zafaran_client::ClientConfig;
use zafaran_client::cart::{CartOutcome, CartStore, ProductRef};
use zafaran_client::session::SessionStore;
use zafaran_core::ProductId;

/// Errors specific to cart commands.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// No authenticated session.
    #[error("You must be logged in; run `zafaran auth login`")]
    NotLoggedIn,

    /// Session exists but the email is unverified.
    #[error("Your email is not verified; run `zafaran auth verify`")]
    NotVerified,

    /// The cart operation itself failed.
    #[error("{0}")]
    Failed(String),
}

/// Require a logged-in, verified session.
///
/// # Errors
///
/// Returns an error when no user is logged in or the email is unverified.
pub fn require_verified(session: &SessionStore) -> Result<(), CartCommandError> {
    let current = session.session();
    if !current.is_logged_in {
        return Err(CartCommandError::NotLoggedIn);
    }
    if !current.is_verified() {
        return Err(CartCommandError::NotVerified);
    }
    Ok(())
}

fn check(outcome: CartOutcome) -> Result<Option<String>, CartCommandError> {
    if outcome.success {
        Ok(outcome.message)
    } else {
        Err(CartCommandError::Failed(
            outcome
                .message
                .unwrap_or_else(|| "Cart operation failed".to_owned()),
        ))
    }
}

/// Load and print the cart.
#[allow(clippy::print_stdout)]
pub async fn show(cart: &CartStore, config: &ClientConfig) -> Result<(), CartCommandError> {
    check(cart.load().await)?;

    let Some(current) = cart.cart() else {
        println!("Your cart is empty.");
        return Ok(());
    };

    if current.products.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }

    for line in &current.products {
        // Lines whose product was deleted server-side carry no id; skip
        // them in the view rather than rendering a hole.
        let Some(product) = &line.product else {
            continue;
        };

        let name = match product {
            ProductRef::Summary(summary) => {
                summary.name.clone().unwrap_or_else(|| summary.id.to_string())
            }
            ProductRef::Id(id) => id.to_string(),
        };

        println!("{:>3} x {}  @ ${}  = ${}", line.quantity, name, line.price, line.subtotal());

        if let Some(image) = &line.image {
            println!("      {}{image}", config.image_url);
        }
    }
    println!("Total: ${}", current.total);
    println!("Items: {}", cart.item_count());

    Ok(())
}

/// Add a product to the cart.
#[allow(clippy::print_stdout)]
pub async fn add(
    cart: &CartStore,
    product_id: &str,
    quantity: u32,
) -> Result<(), CartCommandError> {
    let message = check(cart.add(&ProductId::new(product_id), quantity).await)?;
    println!("{}", message.unwrap_or_else(|| "Added.".to_owned()));
    Ok(())
}

/// Change a cart line's quantity.
#[allow(clippy::print_stdout)]
pub async fn update(
    cart: &CartStore,
    product_id: &str,
    quantity: u32,
) -> Result<(), CartCommandError> {
    check(cart.update_quantity(&ProductId::new(product_id), quantity).await)?;
    println!("Quantity updated; cart total is now ${}.", cart.cart_total());
    Ok(())
}

/// Remove a product from the cart.
#[allow(clippy::print_stdout)]
pub async fn remove(cart: &CartStore, product_id: &str) -> Result<(), CartCommandError> {
    check(cart.remove(&ProductId::new(product_id)).await)?;
    println!("Removed; cart total is now ${}.", cart.cart_total());
    Ok(())
}

/// Empty the cart.
#[allow(clippy::print_stdout)]
pub async fn clear(cart: &CartStore) -> Result<(), CartCommandError> {
    check(cart.clear().await)?;
    println!("Cart cleared.");
    Ok(())
}
