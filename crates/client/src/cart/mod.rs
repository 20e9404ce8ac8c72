//! Cart state manager.
//!
//! Mirrors the server-owned cart and exposes mutations that keep the local
//! mirror consistent:
//!
//! - `update_quantity` and `remove` are **optimistic**: snapshot, apply
//!   locally (recomputing the total), reconcile with the backend, and roll
//!   back to the exact pre-mutation snapshot on failure. Quantity steppers
//!   must feel instantaneous; rollback preserves consistency without
//!   blocking.
//! - `add` and `clear` are **authoritative**: the backend mutates, then the
//!   cart is reloaded wholesale. The rule: an operation is optimistic
//!   exactly when the client already holds every term of the arithmetic;
//!   an added line's price is server-owned (promotions), so `add` reloads.
//!
//! Every mutation returns a [`CartOutcome`] result object and never panics
//! or propagates errors past the store boundary.
//!
//! # Mirror, not sanitizer
//!
//! The store mirrors the server's cart shape verbatim. A line whose product
//! was deleted server-side arrives with a null `productId`; the store keeps
//! it, and consuming views filter such lines defensively before rendering.
//!
//! # Stale responses
//!
//! Every load/mutation takes a monotonically increasing sequence number
//! before its network call; a response older than the latest applied one is
//! discarded rather than allowed to clobber newer state. An optimistic
//! apply counts as applied state immediately, so a load that began earlier
//! but resolves mid-flight cannot overwrite it.

use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use zafaran_core::ProductId;

use crate::api::{ApiClient, ApiError, Envelope};
use crate::session::Session;

/// A product referenced by a cart line: either a bare id or an embedded
/// summary, depending on how much the backend populated the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    /// Bare product id.
    Id(ProductId),
    /// Populated product summary.
    Summary(ProductSummary),
}

impl ProductRef {
    /// Resolve to the canonical product id, regardless of shape.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Summary(summary) => &summary.id,
        }
    }
}

/// Product summary embedded in a populated cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: ProductId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// URL slug.
    #[serde(default)]
    pub slug: Option<String>,
    /// Image path, relative to the image base URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// One product-quantity-price entry within the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Referenced product; `None` when the product was deleted server-side.
    #[serde(rename = "productId", default)]
    pub product: Option<ProductRef>,
    /// Unit price as the server last confirmed it.
    pub price: Decimal,
    /// Quantity, at least 1.
    pub quantity: u32,
    /// Line image path.
    #[serde(default)]
    pub image: Option<String>,
}

impl CartLine {
    /// Canonical product id of this line, if the product still exists.
    #[must_use]
    pub fn product_id(&self) -> Option<&ProductId> {
        self.product.as_ref().map(ProductRef::product_id)
    }

    /// Line subtotal.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The shopping cart as mirrored from the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cart {
    /// Cart lines.
    #[serde(default)]
    pub products: Vec<CartLine>,
    /// Server-confirmed total.
    #[serde(default)]
    pub total: Decimal,
}

impl Cart {
    /// Total recomputed from the lines: `Σ price × quantity`.
    #[must_use]
    pub fn computed_total(&self) -> Decimal {
        self.products.iter().map(CartLine::subtotal).sum()
    }
}

/// Result object returned by every cart mutation.
///
/// Mutations never panic and never let errors escape the store boundary;
/// callers inspect the outcome and decide whether to notify or retry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CartOutcome {
    /// Whether the mutation took effect.
    pub success: bool,
    /// Human-readable message, suitable for direct display.
    pub message: Option<String>,
}

impl CartOutcome {
    /// Successful outcome without a message.
    pub const fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Successful outcome with a message.
    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// Failed outcome with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    fn from_api_error(error: &ApiError) -> Self {
        Self::failed(error.display_message())
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Owned cart store: one mirrored cart per running app.
///
/// Cheaply cloneable via `Arc`. State mutation (snapshot capture, optimistic
/// apply, rollback) is synchronous under an internal lock that is never held
/// across an await point, so no task observes a torn cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: ApiClient,
    state: Mutex<CartState>,
    tx: watch::Sender<Option<Cart>>,
}

struct CartState {
    cart: Option<Cart>,
    next_seq: u64,
    applied_seq: u64,
}

impl CartState {
    fn begin_op(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

impl CartStore {
    /// Create a cart store over the given API client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                state: Mutex::new(CartState {
                    cart: None,
                    next_seq: 0,
                    applied_seq: 0,
                }),
                tx,
            }),
        }
    }

    /// Fetch the authoritative cart and replace local state wholesale.
    #[instrument(skip(self))]
    pub async fn load(&self) -> CartOutcome {
        let seq = self.lock_state().begin_op();

        match self.fetch_cart().await {
            Ok(cart) => {
                self.apply_if_fresh(seq, Some(cart));
                CartOutcome::ok()
            }
            Err(e) => {
                warn!(error = %e, "cart load failed");
                CartOutcome::from_api_error(&e)
            }
        }
    }

    /// Align the local cart with the session: loaded for logged-in,
    /// verified users; absent otherwise. Unverified or logged-out users
    /// never see a populated cart.
    pub async fn sync_with_session(&self, session: &Session) -> CartOutcome {
        if session.is_verified() {
            self.load().await
        } else {
            self.clear_local();
            CartOutcome::ok()
        }
    }

    /// Add a product to the cart.
    ///
    /// Authoritative: the backend add is followed by a full reload, so the
    /// local mirror picks up server-computed pricing.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn add(&self, product_id: &ProductId, quantity: u32) -> CartOutcome {
        if quantity < 1 {
            return CartOutcome::failed("Quantity must be at least 1");
        }

        let body = serde_json::json!({
            "itemId": product_id,
            "quantity": quantity,
        });

        match self.post_envelope("/cart/add", &body).await {
            Ok(()) => {
                let reload = self.load().await;
                if reload.success {
                    CartOutcome::ok_with("Product added to cart successfully")
                } else {
                    reload
                }
            }
            Err(e) => {
                warn!(error = %e, "cart add failed");
                CartOutcome::from_api_error(&e)
            }
        }
    }

    /// Change the quantity of an existing line.
    ///
    /// Optimistic: the local line and total change before the backend call
    /// resolves; on failure the cart rolls back to the exact pre-mutation
    /// snapshot. Quantities below 1 are rejected without any call.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> CartOutcome {
        if quantity < 1 {
            return CartOutcome::failed("Quantity must be at least 1");
        }

        // Snapshot and optimistic apply, synchronously under the lock.
        let (seq, snapshot) = {
            let mut state = self.lock_state();
            let Some(cart) = state.cart.as_mut() else {
                return CartOutcome::failed("Cart not loaded");
            };
            let snapshot = cart.clone();

            let mut touched = false;
            for line in &mut cart.products {
                if line.product_id() == Some(product_id) {
                    line.quantity = quantity;
                    touched = true;
                }
            }
            if !touched {
                return CartOutcome::failed("Product is not in the cart");
            }
            cart.total = cart.computed_total();

            // The optimistic state is applied state from this point on, so
            // an older in-flight load cannot clobber it.
            let seq = state.begin_op();
            state.applied_seq = seq;
            (seq, snapshot)
        };
        self.notify();
        debug!(seq, "optimistic quantity update applied");

        let body = serde_json::json!({
            "itemId": product_id,
            "quantity": quantity,
        });

        match self.post_envelope("/cart/update-quantity", &body).await {
            Ok(()) => CartOutcome::ok(),
            Err(e) => {
                warn!(error = %e, "quantity update failed, rolling back");
                self.rollback(seq, snapshot);
                CartOutcome::from_api_error(&e)
            }
        }
    }

    /// Remove a line from the cart.
    ///
    /// Same optimistic/rollback discipline as [`Self::update_quantity`].
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> CartOutcome {
        let (seq, snapshot) = {
            let mut state = self.lock_state();
            let Some(cart) = state.cart.as_mut() else {
                return CartOutcome::failed("Cart not loaded");
            };
            let snapshot = cart.clone();

            // Lines with a deleted product (no id) are kept; the store
            // mirrors the server shape and views filter them.
            cart.products
                .retain(|line| line.product_id() != Some(product_id));
            if cart.products.len() == snapshot.products.len() {
                return CartOutcome::failed("Product is not in the cart");
            }
            cart.total = cart.computed_total();

            let seq = state.begin_op();
            state.applied_seq = seq;
            (seq, snapshot)
        };
        self.notify();
        debug!(seq, "optimistic removal applied");

        let body = serde_json::json!({ "itemId": product_id });

        match self.post_envelope("/cart/remove", &body).await {
            Ok(()) => CartOutcome::ok(),
            Err(e) => {
                warn!(error = %e, "removal failed, rolling back");
                self.rollback(seq, snapshot);
                CartOutcome::from_api_error(&e)
            }
        }
    }

    /// Empty the cart.
    ///
    /// Authoritative: a rare, user-confirmed action, so the backend deletes
    /// and the cart is reloaded rather than mutated locally.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> CartOutcome {
        let result: Result<Envelope<serde_json::Value>, ApiError> =
            self.inner.api.delete("/cart/clear").await;

        match result.and_then(Envelope::into_optional) {
            Ok(_) => self.load().await,
            Err(e) => {
                warn!(error = %e, "cart clear failed");
                CartOutcome::from_api_error(&e)
            }
        }
    }

    /// Drop the mirrored cart without touching the backend.
    ///
    /// Used on logout and after order completion: the cart is cleared
    /// locally, not just emptied. In-flight older loads cannot resurrect it.
    pub fn clear_local(&self) {
        {
            let mut state = self.lock_state();
            let seq = state.begin_op();
            state.applied_seq = seq;
            state.cart = None;
        }
        self.notify();
    }

    // =========================================================================
    // Derived reads (pure functions of current state)
    // =========================================================================

    /// Quantity of the given product in the cart, 0 when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lock_state()
            .cart
            .as_ref()
            .and_then(|cart| {
                cart.products
                    .iter()
                    .find(|line| line.product_id() == Some(product_id))
                    .map(|line| line.quantity)
            })
            .unwrap_or(0)
    }

    /// Whether the product has at least one unit in the cart.
    #[must_use]
    pub fn is_in_cart(&self, product_id: &ProductId) -> bool {
        self.quantity_of(product_id) > 0
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lock_state()
            .cart
            .as_ref()
            .map(|cart| cart.products.iter().map(|line| line.quantity).sum())
            .unwrap_or(0)
    }

    /// Server-confirmed cart total, 0 when no cart is loaded.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.lock_state()
            .cart
            .as_ref()
            .map_or(Decimal::ZERO, |cart| cart.total)
    }

    /// Snapshot of the mirrored cart.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.lock_state().cart.clone()
    }

    /// Subscribe to cart snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Cart>> {
        self.inner.tx.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn fetch_cart(&self) -> Result<Cart, ApiError> {
        let envelope: Envelope<Cart> = self.inner.api.get("/cart").await?;
        Ok(envelope.into_optional()?.unwrap_or_default())
    }

    async fn post_envelope(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), ApiError> {
        let envelope: Envelope<serde_json::Value> = self.inner.api.post(path, body).await?;
        let _ = envelope.into_optional()?;
        Ok(())
    }

    /// Replace the cart with a server response unless something newer has
    /// already been applied.
    fn apply_if_fresh(&self, seq: u64, cart: Option<Cart>) {
        {
            let mut state = self.lock_state();
            if seq <= state.applied_seq {
                debug!(seq, applied = state.applied_seq, "discarding stale cart response");
                return;
            }
            state.applied_seq = seq;
            state.cart = cart;
        }
        self.notify();
    }

    /// Restore the pre-mutation snapshot, unless a newer operation already
    /// replaced the cart. The mutation's own optimistic apply holds
    /// `applied_seq == seq` and still rolls back.
    fn rollback(&self, seq: u64, snapshot: Cart) {
        {
            let mut state = self.lock_state();
            if state.applied_seq > seq {
                return;
            }
            state.cart = Some(snapshot);
        }
        self.notify();
    }

    fn notify(&self) {
        let cart = self.lock_state().cart.clone();
        self.inner.tx.send_replace(cart);
    }

    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[cfg(test)]
    fn seed(&self, cart: Option<Cart>) {
        self.lock_state().cart = cart;
        self.notify();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn test_store() -> CartStore {
        // Unroutable port: any accidental network call fails fast.
        let config = ClientConfig::new(
            url::Url::parse("http://localhost:59998/api").unwrap(),
            std::path::PathBuf::from("/tmp/zafaran-cart-test"),
        );
        CartStore::new(ApiClient::new(&config))
    }

    fn line(id: &str, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product: Some(ProductRef::Id(ProductId::new(id))),
            price: Decimal::from(price),
            quantity,
            image: None,
        }
    }

    fn sample_cart() -> Cart {
        let lines = vec![line("p1", 10, 2), line("p2", 4, 1)];
        let total = lines.iter().map(CartLine::subtotal).sum();
        Cart {
            products: lines,
            total,
        }
    }

    #[test]
    fn test_computed_total_matches_lines() {
        let cart = sample_cart();
        assert_eq!(cart.total, Decimal::from(24));
        assert_eq!(cart.computed_total(), cart.total);
    }

    #[test]
    fn test_deserialize_line_with_bare_id() {
        let raw = r#"{"productId": "p1", "price": 10, "quantity": 2}"#;
        let line: CartLine = serde_json::from_str(raw).unwrap();
        assert_eq!(line.product_id(), Some(&ProductId::new("p1")));
        assert_eq!(line.subtotal(), Decimal::from(20));
    }

    #[test]
    fn test_deserialize_line_with_populated_product() {
        let raw = r#"{
            "productId": {"_id": "p1", "name": "Negin saffron", "slug": "negin"},
            "price": 10,
            "quantity": 2,
            "image": "saffron.jpg"
        }"#;
        let line: CartLine = serde_json::from_str(raw).unwrap();
        assert_eq!(line.product_id(), Some(&ProductId::new("p1")));
    }

    #[test]
    fn test_deserialize_line_with_deleted_product() {
        // productId null: the product was deleted server-side. The store
        // mirrors it; views filter it.
        let raw = r#"{"productId": null, "price": 10, "quantity": 2}"#;
        let line: CartLine = serde_json::from_str(raw).unwrap();
        assert!(line.product_id().is_none());
    }

    #[test]
    fn test_derived_reads_on_empty_store() {
        let store = test_store();
        assert_eq!(store.quantity_of(&ProductId::new("p1")), 0);
        assert_eq!(store.item_count(), 0);
        assert_eq!(store.cart_total(), Decimal::ZERO);
        assert!(!store.is_in_cart(&ProductId::new("p1")));
        assert!(store.cart().is_none());
    }

    #[test]
    fn test_derived_reads_on_loaded_cart() {
        let store = test_store();
        store.seed(Some(sample_cart()));

        assert_eq!(store.quantity_of(&ProductId::new("p1")), 2);
        assert_eq!(store.quantity_of(&ProductId::new("p2")), 1);
        assert!(store.is_in_cart(&ProductId::new("p2")));
        assert_eq!(store.item_count(), 3);
        assert_eq!(store.cart_total(), Decimal::from(24));
    }

    #[tokio::test]
    async fn test_update_quantity_zero_is_rejected_without_state_change() {
        let store = test_store();
        store.seed(Some(sample_cart()));

        let outcome = store
            .update_quantity(&ProductId::new("p1"), 0)
            .await;
        assert!(!outcome.success);
        // State untouched, and no network call was attempted (the backend
        // here is unroutable; a call would have produced a network message).
        assert_eq!(store.cart().unwrap(), sample_cart());
        assert_eq!(
            outcome.message.as_deref(),
            Some("Quantity must be at least 1")
        );
    }

    #[tokio::test]
    async fn test_update_quantity_without_cart_fails_fast() {
        let store = test_store();
        let outcome = store.update_quantity(&ProductId::new("p1"), 2).await;
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("Cart not loaded"));
    }

    #[tokio::test]
    async fn test_update_quantity_unknown_product_fails_fast() {
        let store = test_store();
        store.seed(Some(sample_cart()));

        let outcome = store.update_quantity(&ProductId::new("ghost"), 2).await;
        assert!(!outcome.success);
        assert_eq!(store.cart().unwrap(), sample_cart());
    }

    #[tokio::test]
    async fn test_update_quantity_rolls_back_on_network_failure() {
        // The backend is unroutable, so the optimistic apply must be
        // reverted and the cart deep-equal the pre-mutation state.
        let store = test_store();
        store.seed(Some(sample_cart()));

        let outcome = store.update_quantity(&ProductId::new("p1"), 3).await;
        assert!(!outcome.success);
        assert_eq!(store.cart().unwrap(), sample_cart());
    }

    #[tokio::test]
    async fn test_remove_rolls_back_on_network_failure() {
        let store = test_store();
        store.seed(Some(sample_cart()));

        let outcome = store.remove(&ProductId::new("p2")).await;
        assert!(!outcome.success);
        assert_eq!(store.cart().unwrap(), sample_cart());
    }

    #[tokio::test]
    async fn test_add_rejects_zero_quantity_without_network() {
        let store = test_store();
        let outcome = store.add(&ProductId::new("p1"), 0).await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Quantity must be at least 1")
        );
    }

    #[test]
    fn test_clear_local_drops_cart_and_blocks_stale_loads() {
        let store = test_store();
        store.seed(Some(sample_cart()));

        // A load that started before the clear.
        let stale_seq = store.lock_state().begin_op();

        store.clear_local();
        assert!(store.cart().is_none());

        // Its response arrives late and must be discarded.
        store.apply_if_fresh(stale_seq, Some(sample_cart()));
        assert!(store.cart().is_none());
    }

    #[test]
    fn test_stale_load_does_not_clobber_newer_load() {
        let store = test_store();

        let older = store.lock_state().begin_op();
        let newer = store.lock_state().begin_op();

        let fresh = sample_cart();
        store.apply_if_fresh(newer, Some(fresh.clone()));

        let mut stale = sample_cart();
        stale.products.clear();
        stale.total = Decimal::ZERO;
        store.apply_if_fresh(older, Some(stale));

        assert_eq!(store.cart().unwrap(), fresh);
    }

    #[test]
    fn test_rollback_skipped_after_newer_apply() {
        let store = test_store();
        store.seed(Some(sample_cart()));

        let seq = store.lock_state().begin_op();
        let snapshot = store.cart().unwrap();

        // A newer load lands before the failing mutation resolves.
        let newer = store.lock_state().begin_op();
        let mut reloaded = sample_cart();
        reloaded.products.push(line("p3", 7, 1));
        reloaded.total = reloaded.computed_total();
        store.apply_if_fresh(newer, Some(reloaded.clone()));

        store.rollback(seq, snapshot);
        assert_eq!(store.cart().unwrap(), reloaded);
    }

    #[test]
    fn test_inflight_load_cannot_clobber_optimistic_apply() {
        let store = test_store();
        store.seed(Some(sample_cart()));

        // A load begins, then an optimistic update applies before the
        // load's response comes back.
        let load_seq = store.lock_state().begin_op();
        let op_seq = {
            let mut state = store.lock_state();
            let cart = state.cart.as_mut().unwrap();
            for line in &mut cart.products {
                if line.product_id() == Some(&ProductId::new("p1")) {
                    line.quantity = 5;
                }
            }
            cart.total = cart.computed_total();
            let seq = state.begin_op();
            state.applied_seq = seq;
            seq
        };
        let optimistic = store.cart().unwrap();
        assert_eq!(optimistic.total, Decimal::from(54));

        // The older load resolves late; it must be discarded, not ratified.
        store.apply_if_fresh(load_seq, Some(sample_cart()));
        assert_eq!(store.cart().unwrap(), optimistic);

        // The mutation's own rollback still fires if the backend rejects it.
        store.rollback(op_seq, sample_cart());
        assert_eq!(store.cart().unwrap(), sample_cart());
    }

    #[test]
    fn test_subscribe_sees_clear() {
        let store = test_store();
        store.seed(Some(sample_cart()));

        let rx = store.subscribe();
        store.clear_local();
        assert!(rx.borrow().is_none());
    }
}
