//! Cart behavior against the mock backend: optimistic updates, rollback on
//! injected failures, and the total invariant.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use zafaran_core::ProductId;
use zafaran_integration_tests::TestContext;

const EMAIL: &str = "rana@example.com";
const PASSWORD: &str = "password123";

async fn logged_in_context() -> TestContext {
    let ctx = TestContext::start().await;
    ctx.seed_product("p1", "Super Negin", 10);
    ctx.seed_product("p2", "Saffron threads", 4);
    ctx.register_verified(EMAIL, PASSWORD).await;
    ctx
}

async fn add_ok(ctx: &TestContext, id: &str, quantity: u32) {
    let outcome = ctx.cart.add(&ProductId::new(id), quantity).await;
    assert!(outcome.success, "{:?}", outcome.message);
}

async fn reload(ctx: &TestContext) {
    let outcome = ctx.cart.load().await;
    assert!(outcome.success, "{:?}", outcome.message);
}

fn assert_total_invariant(ctx: &TestContext) {
    let cart = ctx.cart.cart().expect("cart loaded");
    assert_eq!(cart.total, cart.computed_total());
}

// ============================================================================
// Authoritative operations
// ============================================================================

#[tokio::test]
async fn test_add_on_empty_cart_reloads_with_new_line() {
    let ctx = logged_in_context().await;

    add_ok(&ctx, "p2", 1).await;

    let cart = ctx.cart.cart().unwrap();
    assert_eq!(cart.products.len(), 1);
    assert!(ctx.cart.is_in_cart(&ProductId::new("p2")));
    assert_eq!(cart.total, Decimal::from(4));
    assert_total_invariant(&ctx);
}

#[tokio::test]
async fn test_add_accumulates_quantity() {
    let ctx = logged_in_context().await;

    add_ok(&ctx, "p1", 2).await;
    add_ok(&ctx, "p1", 1).await;

    assert_eq!(ctx.cart.quantity_of(&ProductId::new("p1")), 3);
    assert_eq!(ctx.cart.cart_total(), Decimal::from(30));
}

#[tokio::test]
async fn test_clear_empties_cart_on_backend_and_locally() {
    let ctx = logged_in_context().await;
    add_ok(&ctx, "p1", 2).await;

    let outcome = ctx.cart.clear().await;
    assert!(outcome.success);
    assert_eq!(ctx.cart.item_count(), 0);

    // A reload confirms the backend cart is gone too.
    reload(&ctx).await;
    assert_eq!(ctx.cart.item_count(), 0);
}

// ============================================================================
// Optimistic operations
// ============================================================================

#[tokio::test]
async fn test_update_quantity_success_recomputes_total() {
    let ctx = logged_in_context().await;
    add_ok(&ctx, "p1", 2).await;
    assert_eq!(ctx.cart.cart_total(), Decimal::from(20));

    let outcome = ctx.cart.update_quantity(&ProductId::new("p1"), 3).await;
    assert!(outcome.success);

    assert_eq!(ctx.cart.quantity_of(&ProductId::new("p1")), 3);
    assert_eq!(ctx.cart.cart_total(), Decimal::from(30));
    assert_total_invariant(&ctx);

    // The backend agrees after a reload.
    reload(&ctx).await;
    assert_eq!(ctx.cart.cart_total(), Decimal::from(30));
}

#[tokio::test]
async fn test_update_quantity_failure_rolls_back_to_exact_snapshot() {
    let ctx = logged_in_context().await;
    add_ok(&ctx, "p1", 2).await;
    let before = ctx.cart.cart().unwrap();

    ctx.backend.fail_next_cart_mutation();
    let outcome = ctx.cart.update_quantity(&ProductId::new("p1"), 3).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("Injected failure"));
    assert_eq!(ctx.cart.cart().unwrap(), before);
    assert_total_invariant(&ctx);
}

#[tokio::test]
async fn test_remove_success() {
    let ctx = logged_in_context().await;
    add_ok(&ctx, "p1", 2).await;
    add_ok(&ctx, "p2", 1).await;

    let outcome = ctx.cart.remove(&ProductId::new("p2")).await;
    assert!(outcome.success);

    assert!(!ctx.cart.is_in_cart(&ProductId::new("p2")));
    assert_eq!(ctx.cart.cart_total(), Decimal::from(20));
    assert_total_invariant(&ctx);

    reload(&ctx).await;
    assert!(!ctx.cart.is_in_cart(&ProductId::new("p2")));
}

#[tokio::test]
async fn test_remove_failure_rolls_back() {
    let ctx = logged_in_context().await;
    add_ok(&ctx, "p1", 2).await;
    add_ok(&ctx, "p2", 1).await;
    let before = ctx.cart.cart().unwrap();

    ctx.backend.fail_next_cart_mutation();
    let outcome = ctx.cart.remove(&ProductId::new("p2")).await;

    assert!(!outcome.success);
    assert_eq!(ctx.cart.cart().unwrap(), before);
    assert!(ctx.cart.is_in_cart(&ProductId::new("p2")));
}

#[tokio::test]
async fn test_zero_quantity_is_rejected_without_network_call() {
    let ctx = logged_in_context().await;
    add_ok(&ctx, "p1", 2).await;
    let before = ctx.cart.cart().unwrap();
    let calls_before = ctx.backend.cart_calls();

    let outcome = ctx.cart.update_quantity(&ProductId::new("p1"), 0).await;

    assert!(!outcome.success);
    assert_eq!(ctx.cart.cart().unwrap(), before);
    assert_eq!(ctx.backend.cart_calls(), calls_before);
}

// ============================================================================
// Session interaction
// ============================================================================

#[tokio::test]
async fn test_unauthenticated_cart_load_fails() {
    let ctx = TestContext::start().await;
    let outcome = ctx.cart.load().await;
    assert!(!outcome.success);
    assert!(ctx.cart.cart().is_none());
}

#[tokio::test]
async fn test_sync_with_session_loads_for_verified_user() {
    let ctx = logged_in_context().await;
    add_ok(&ctx, "p1", 1).await;
    ctx.cart.clear_local();

    let outcome = ctx.cart.sync_with_session(&ctx.session.session()).await;
    assert!(outcome.success);
    assert!(ctx.cart.is_in_cart(&ProductId::new("p1")));
}

#[tokio::test]
async fn test_logout_then_sync_drops_local_cart() {
    let ctx = logged_in_context().await;
    add_ok(&ctx, "p1", 1).await;

    ctx.session.logout().unwrap();
    let outcome = ctx.cart.sync_with_session(&ctx.session.session()).await;

    assert!(outcome.success);
    assert!(ctx.cart.cart().is_none());
}
