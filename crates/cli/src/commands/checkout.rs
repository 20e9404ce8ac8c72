//! Checkout command.

use zafaran_client::api::ApiClient;
use zafaran_client::cart::CartStore;
use zafaran_client::orders::{self, CheckoutRequest, DeliveryInfo};
use zafaran_core::OrderNumber;

/// Place a cash-on-delivery order for the current cart, then clear the
/// local cart mirror (the backend has consumed the server-side cart).
#[allow(clippy::print_stdout)]
pub async fn place_order(
    api: &ApiClient,
    cart: &CartStore,
    delivery: DeliveryInfo,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = cart.load().await;
    if !outcome.success {
        return Err(outcome
            .message
            .unwrap_or_else(|| "Could not load the cart".to_owned())
            .into());
    }
    if cart.item_count() == 0 {
        return Err("Your cart is empty; nothing to check out".into());
    }

    let request = CheckoutRequest::cash_on_delivery(delivery);
    let order = orders::checkout(api, &request).await?;

    cart.clear_local();

    println!("Order placed. Your order number is {}.", order.order_number);
    println!(
        "A confirmation email is on its way; resend it anytime with \
         `zafaran resend-confirmation {}`.",
        order.order_number
    );
    Ok(())
}

/// Resend the confirmation email for a previously placed order.
#[allow(clippy::print_stdout)]
pub async fn resend(
    api: &ApiClient,
    order_number: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let number = OrderNumber::new(order_number);
    orders::resend_confirmation(api, &number).await?;

    println!("Confirmation email resent for order {number}.");
    Ok(())
}
