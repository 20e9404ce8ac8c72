//! Checkout against the mock backend: delivery validation short-circuits,
//! order placement, and confirmation resends.

#![allow(clippy::unwrap_used)]

use zafaran_client::orders::{self, CheckoutRequest, DeliveryInfo, OrderError};
use zafaran_core::{OrderNumber, ProductId};
use zafaran_integration_tests::TestContext;

const EMAIL: &str = "rana@example.com";
const PASSWORD: &str = "password123";

fn delivery() -> DeliveryInfo {
    DeliveryInfo {
        contact_name: "Rana Haddad".to_owned(),
        phone_number: "+961 3 123456".to_owned(),
        street: "12 Cedar Road".to_owned(),
        city: "Zahle".to_owned(),
        country: "Lebanon".to_owned(),
        ..DeliveryInfo::default()
    }
}

async fn context_with_cart() -> TestContext {
    let ctx = TestContext::start().await;
    ctx.seed_product("p1", "Super Negin", 10);
    ctx.register_verified(EMAIL, PASSWORD).await;
    let outcome = ctx.cart.add(&ProductId::new("p1"), 2).await;
    assert!(outcome.success);
    ctx
}

#[tokio::test]
async fn test_checkout_places_order_and_empties_backend_cart() {
    let ctx = context_with_cart().await;

    let request = CheckoutRequest::cash_on_delivery(delivery());
    let order = orders::checkout(&ctx.api, &request).await.unwrap();

    assert!(!order.order_number.as_str().is_empty());
    assert_eq!(ctx.backend.orders_placed(), 1);

    // The backend consumed the cart; the client clears its mirror.
    ctx.cart.clear_local();
    let outcome = ctx.cart.load().await;
    assert!(outcome.success);
    assert_eq!(ctx.cart.item_count(), 0);
}

#[tokio::test]
async fn test_missing_required_field_short_circuits() {
    let ctx = context_with_cart().await;

    let mut incomplete = delivery();
    incomplete.city = String::new();
    let request = CheckoutRequest::cash_on_delivery(incomplete);

    match orders::checkout(&ctx.api, &request).await {
        Err(OrderError::MissingField("City")) => {}
        other => panic!("expected MissingField(City), got {other:?}"),
    }

    // The order never reached the backend.
    assert_eq!(ctx.backend.orders_placed(), 0);
}

#[tokio::test]
async fn test_checkout_with_empty_cart_is_rejected() {
    let ctx = TestContext::start().await;
    ctx.register_verified(EMAIL, PASSWORD).await;

    let request = CheckoutRequest::cash_on_delivery(delivery());
    match orders::checkout(&ctx.api, &request).await {
        Err(OrderError::Api(e)) => assert_eq!(e.display_message(), "Cart is empty"),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(ctx.backend.orders_placed(), 0);
}

#[tokio::test]
async fn test_resend_confirmation() {
    let ctx = context_with_cart().await;

    let request = CheckoutRequest::cash_on_delivery(delivery());
    let order = orders::checkout(&ctx.api, &request).await.unwrap();

    orders::resend_confirmation(&ctx.api, &order.order_number)
        .await
        .unwrap();

    // An unknown order number still succeeds; the backend does not leak
    // which orders exist through this endpoint.
    orders::resend_confirmation(&ctx.api, &OrderNumber::new("ZAF-99999"))
        .await
        .unwrap();
}
