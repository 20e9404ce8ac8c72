//! Integration test harness for the Zafaran storefront client.
//!
//! Spins up an in-process axum mock of the REST backend on an ephemeral
//! port and wires real client stores against it. The mock keeps users,
//! carts, and products in memory, speaks the backend's response envelopes,
//! and supports failure injection so tests can drive the optimistic-update
//! rollback paths.
//!
//! # Usage
//!
//! ```rust,ignore
//! let ctx = TestContext::start().await;
//! ctx.seed_product("p1", "Super Negin", 10);
//! ctx.register_verified("rana@example.com", "password123").await;
//!
//! ctx.cart.add(&ProductId::new("p1"), 2).await;
//! ctx.backend.fail_next_cart_mutation();
//! // next update_quantity/remove fails and must roll back
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use zafaran_client::ClientConfig;
use zafaran_client::api::ApiClient;
use zafaran_client::cart::CartStore;
use zafaran_client::session::{MemoryStorage, SessionStore};

/// The verification code the mock accepts.
pub const VERIFICATION_CODE: &str = "123456";

// =============================================================================
// Mock backend state
// =============================================================================

#[derive(Clone)]
struct MockUser {
    id: String,
    full_name: String,
    email: String,
    phone_number: String,
    password: String,
    verified: bool,
    token: String,
}

impl MockUser {
    fn profile_json(&self) -> Value {
        json!({
            "_id": self.id,
            "fullName": self.full_name,
            "email": self.email,
            "phoneNumber": self.phone_number,
            "verified": self.verified,
        })
    }
}

#[derive(Clone)]
struct MockProduct {
    id: String,
    name: String,
    price: Decimal,
    category: Option<String>,
    promoted: bool,
}

#[derive(Clone)]
struct MockLine {
    product_id: String,
    price: Decimal,
    quantity: u32,
}

/// Handle to the mock backend's state, shared with the axum router.
///
/// Tests use this to seed data, inject failures, and assert on what the
/// backend recorded.
#[derive(Default)]
pub struct MockBackend {
    users: Mutex<HashMap<String, MockUser>>,
    carts: Mutex<HashMap<String, Vec<MockLine>>>,
    products: Mutex<Vec<MockProduct>>,
    fail_next_mutation: AtomicBool,
    orders_placed: AtomicU64,
    cart_calls: AtomicU64,
}

impl MockBackend {
    fn lock_users(&self) -> MutexGuard<'_, HashMap<String, MockUser>> {
        self.users.lock().expect("users lock")
    }

    fn lock_carts(&self) -> MutexGuard<'_, HashMap<String, Vec<MockLine>>> {
        self.carts.lock().expect("carts lock")
    }

    fn lock_products(&self) -> MutexGuard<'_, Vec<MockProduct>> {
        self.products.lock().expect("products lock")
    }

    /// Make the next cart mutation (add/update/remove/clear) fail with a
    /// 500, consuming the flag.
    pub fn fail_next_cart_mutation(&self) {
        self.fail_next_mutation.store(true, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.fail_next_mutation.swap(false, Ordering::SeqCst)
    }

    /// Number of orders the backend accepted.
    pub fn orders_placed(&self) -> u64 {
        self.orders_placed.load(Ordering::SeqCst)
    }

    /// Number of calls that reached any `/cart` endpoint.
    pub fn cart_calls(&self) -> u64 {
        self.cart_calls.load(Ordering::SeqCst)
    }

    /// The stored password for an account, for assertions.
    pub fn password_of(&self, email: &str) -> Option<String> {
        self.lock_users().get(email).map(|user| user.password.clone())
    }

    /// The stored display name for an account, for assertions.
    pub fn full_name_of(&self, email: &str) -> Option<String> {
        self.lock_users().get(email).map(|user| user.full_name.clone())
    }

    fn user_for_token(&self, headers: &HeaderMap) -> Option<MockUser> {
        let auth = headers.get("authorization")?.to_str().ok()?;
        let token = auth.strip_prefix("Bearer ")?;
        self.lock_users()
            .values()
            .find(|user| user.token == token)
            .cloned()
    }

    fn cart_json(&self, email: &str) -> Value {
        let carts = self.lock_carts();
        let lines = carts.get(email).cloned().unwrap_or_default();
        let total: Decimal = lines
            .iter()
            .map(|line| line.price * Decimal::from(line.quantity))
            .sum();
        let products: Vec<Value> = lines
            .iter()
            .map(|line| {
                json!({
                    "productId": line.product_id,
                    "price": line.price,
                    "quantity": line.quantity,
                })
            })
            .collect();
        json!({ "products": products, "total": total })
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn ok_data(data: Value) -> Response {
    (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response()
}

fn rejected(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn require_user(backend: &MockBackend, headers: &HeaderMap) -> Result<MockUser, Response> {
    backend
        .user_for_token(headers)
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Not authenticated"))
}

fn str_field<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or("")
}

async fn register(State(backend): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Response {
    let email = str_field(&body, "email").to_owned();
    let mut users = backend.lock_users();

    if users.contains_key(&email) {
        return error(StatusCode::BAD_REQUEST, "Email already registered");
    }

    let user = MockUser {
        id: format!("u{}", users.len() + 1),
        full_name: str_field(&body, "fullName").to_owned(),
        email: email.clone(),
        phone_number: str_field(&body, "phoneNumber").to_owned(),
        password: str_field(&body, "password").to_owned(),
        verified: false,
        token: format!("token-{email}"),
    };
    let payload = json!({ "user": user.profile_json(), "token": user.token });
    users.insert(email, user);

    ok_data(payload)
}

async fn login(State(backend): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Response {
    let users = backend.lock_users();
    let Some(user) = users.get(str_field(&body, "email")) else {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };
    if user.password != str_field(&body, "password") {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    ok_data(json!({ "user": user.profile_json(), "token": user.token }))
}

async fn verify_email(
    State(backend): State<Arc<MockBackend>>,
    Json(body): Json<Value>,
) -> Response {
    if str_field(&body, "code") != VERIFICATION_CODE {
        return error(StatusCode::BAD_REQUEST, "Invalid verification code");
    }
    let mut users = backend.lock_users();
    match users.get_mut(str_field(&body, "email")) {
        Some(user) => {
            user.verified = true;
            ok_data(json!({}))
        }
        None => error(StatusCode::NOT_FOUND, "Unknown email"),
    }
}

async fn send_verification(Json(body): Json<Value>) -> Response {
    if str_field(&body, "email").is_empty() {
        return error(StatusCode::BAD_REQUEST, "Email is required");
    }
    ok_data(json!({}))
}

async fn change_password(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = match require_user(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let new_password = str_field(&body, "newPassword");
    if new_password.is_empty() {
        return error(StatusCode::BAD_REQUEST, "New password is required");
    }

    let mut users = backend.lock_users();
    let Some(stored) = users.get_mut(&user.email) else {
        return error(StatusCode::NOT_FOUND, "Unknown user");
    };
    if stored.password != str_field(&body, "oldPassword") {
        return error(StatusCode::UNAUTHORIZED, "Old password is incorrect");
    }
    stored.password = new_password.to_owned();
    ok_data(json!({}))
}

async fn update_profile(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = match require_user(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let full_name = str_field(&body, "fullName").trim();
    if full_name.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Full name is required");
    }
    let phone_number = str_field(&body, "phoneNumber").to_owned();

    let mut users = backend.lock_users();
    let Some(stored) = users.get_mut(&user.email) else {
        return error(StatusCode::NOT_FOUND, "Unknown user");
    };
    stored.full_name = full_name.to_owned();
    if !phone_number.is_empty() {
        stored.phone_number = phone_number;
    }
    ok_data(json!({
        "user": {
            "fullName": stored.full_name,
            "phoneNumber": stored.phone_number,
        }
    }))
}

async fn products(State(backend): State<Arc<MockBackend>>) -> Response {
    let products = backend.lock_products();
    let product_list: Vec<Value> = products
        .iter()
        .map(|p| {
            json!({
                "_id": p.id,
                "name": p.name,
                "price": p.price,
                "category": p.category,
                "promoted": p.promoted,
            })
        })
        .collect();
    let categories: Vec<Value> = products
        .iter()
        .filter_map(|p| p.category.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(i, slug)| json!({ "_id": format!("c{i}"), "name": slug, "slug": slug }))
        .collect();

    ok_data(json!({ "products": product_list, "categories": categories }))
}

async fn get_cart(State(backend): State<Arc<MockBackend>>, headers: HeaderMap) -> Response {
    backend.cart_calls.fetch_add(1, Ordering::SeqCst);
    let user = match require_user(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let cart = backend.cart_json(&user.email);
    ok_data(cart)
}

async fn cart_add(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.cart_calls.fetch_add(1, Ordering::SeqCst);
    let user = match require_user(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if backend.take_failure() {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure");
    }

    let item_id = str_field(&body, "itemId").to_owned();
    let quantity = body.get("quantity").and_then(Value::as_u64).unwrap_or(0);
    if quantity == 0 {
        return rejected("Quantity must be at least 1");
    }

    let price = {
        let products = backend.lock_products();
        match products.iter().find(|p| p.id == item_id) {
            Some(product) => product.price,
            None => return error(StatusCode::NOT_FOUND, "Unknown product"),
        }
    };

    let mut carts = backend.lock_carts();
    let lines = carts.entry(user.email).or_default();
    #[allow(clippy::cast_possible_truncation)]
    let quantity = quantity as u32;
    if let Some(idx) = lines.iter().position(|line| line.product_id == item_id) {
        if let Some(line) = lines.get_mut(idx) {
            line.quantity += quantity;
        }
    } else {
        lines.push(MockLine {
            product_id: item_id,
            price,
            quantity,
        });
    }
    ok_data(json!({}))
}

async fn cart_update_quantity(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.cart_calls.fetch_add(1, Ordering::SeqCst);
    let user = match require_user(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if backend.take_failure() {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure");
    }

    let item_id = str_field(&body, "itemId");
    let quantity = body.get("quantity").and_then(Value::as_u64).unwrap_or(0);
    if quantity == 0 {
        return rejected("Quantity must be at least 1");
    }

    let mut carts = backend.lock_carts();
    let Some(line) = carts
        .get_mut(&user.email)
        .and_then(|lines| lines.iter_mut().find(|line| line.product_id == item_id))
    else {
        return error(StatusCode::NOT_FOUND, "Product is not in the cart");
    };
    #[allow(clippy::cast_possible_truncation)]
    {
        line.quantity = quantity as u32;
    }
    ok_data(json!({}))
}

async fn cart_remove(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.cart_calls.fetch_add(1, Ordering::SeqCst);
    let user = match require_user(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if backend.take_failure() {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure");
    }

    let item_id = str_field(&body, "itemId");
    let mut carts = backend.lock_carts();
    if let Some(lines) = carts.get_mut(&user.email) {
        lines.retain(|line| line.product_id != item_id);
    }
    ok_data(json!({}))
}

async fn cart_clear(State(backend): State<Arc<MockBackend>>, headers: HeaderMap) -> Response {
    backend.cart_calls.fetch_add(1, Ordering::SeqCst);
    let user = match require_user(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if backend.take_failure() {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure");
    }
    backend.lock_carts().remove(&user.email);
    ok_data(json!({}))
}

async fn checkout(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = match require_user(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let delivery = body.get("deliveryInfo").cloned().unwrap_or(Value::Null);
    for field in ["contactName", "phoneNumber", "street", "city", "country"] {
        if str_field(&delivery, field).trim().is_empty() {
            return error(StatusCode::BAD_REQUEST, "Missing delivery information");
        }
    }

    let empty = backend
        .lock_carts()
        .get(&user.email)
        .is_none_or(Vec::is_empty);
    if empty {
        return rejected("Cart is empty");
    }

    backend.lock_carts().remove(&user.email);
    let number = backend.orders_placed.fetch_add(1, Ordering::SeqCst) + 1;
    ok_data(json!({ "orderNumber": format!("ZAF-{number:05}") }))
}

async fn resend_confirmation(Path(order_number): Path<String>) -> Response {
    if order_number.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Order number is required");
    }
    ok_data(json!({}))
}

async fn home() -> Response {
    ok_data(json!({
        "about_us": { "title": "The Saffron Project", "description": "From the land of cedars." },
        "features": [{ "title": "A Table!", "text": "<p>Finest quality stigmas.</p>" }],
        "why_us": [{ "title": "The Social Project", "text": "<p>Rural development.</p>" }],
    }))
}

async fn inspiration() -> Response {
    ok_data(json!({
        "page_title": "Inspiration",
        "page_description": "Cooking with saffron",
        "gallery": [
            { "image": "risotto.jpg", "text": "Saffron risotto" },
            { "image": "tea.jpg", "text": "Saffron tea" },
        ],
    }))
}

async fn career() -> Response {
    ok_data(json!({
        "title": "Harvest coordinator",
        "description": "Join the harvest team in the Bekaa Valley.",
        "image": "harvest.jpg",
    }))
}

async fn career_apply(Json(body): Json<Value>) -> Response {
    for field in ["firstName", "lastName", "email", "message"] {
        if str_field(&body, field).trim().is_empty() {
            return (
                StatusCode::OK,
                Json(json!({ "status": "error", "message": "Missing field" })),
            )
                .into_response();
        }
    }
    (StatusCode::OK, Json(json!({ "status": "success" }))).into_response()
}

fn router(backend: Arc<MockBackend>) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify-email", post(verify_email))
        .route("/api/auth/send-verification", post(send_verification))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/auth/update-profile", post(update_profile))
        .route("/api/products", get(products))
        .route("/api/cart", get(get_cart))
        .route("/api/cart/add", post(cart_add))
        .route("/api/cart/update-quantity", post(cart_update_quantity))
        .route("/api/cart/remove", post(cart_remove))
        .route("/api/cart/clear", delete(cart_clear))
        .route("/api/orders/checkout", post(checkout))
        .route(
            "/api/orders/resend-confirmation/{order_number}",
            post(resend_confirmation),
        )
        .route("/api/home", get(home))
        .route("/api/inspiration", get(inspiration))
        .route("/api/career", get(career))
        .route("/api/career/apply", post(career_apply))
        .with_state(backend)
}

// =============================================================================
// TestContext
// =============================================================================

/// A running mock backend plus real client stores wired against it.
pub struct TestContext {
    /// API client pointed at the mock backend.
    pub api: ApiClient,
    /// Real session store over in-memory storage.
    pub session: SessionStore,
    /// Real cart store.
    pub cart: CartStore,
    /// Handle to the mock backend's state.
    pub backend: Arc<MockBackend>,
    /// The session's storage, for asserting on persisted keys.
    pub storage: Arc<MemoryStorage>,
}

impl TestContext {
    /// Start a mock backend on an ephemeral port and wire client stores
    /// against it.
    pub async fn start() -> Self {
        let backend = Arc::new(MockBackend::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");

        let app = router(Arc::clone(&backend));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend");
        });

        let api_url =
            url::Url::parse(&format!("http://{addr}/api")).expect("mock backend url");
        let config = ClientConfig::new(api_url, std::env::temp_dir());

        let api = ApiClient::new(&config);
        let storage = Arc::new(MemoryStorage::new());
        let session = SessionStore::new(
            api.clone(),
            Arc::clone(&storage) as Arc<dyn zafaran_client::session::SessionStorage>,
        );
        let cart = CartStore::new(api.clone());

        Self {
            api,
            session,
            cart,
            backend,
            storage,
        }
    }

    /// Seed a catalog product with an integer price.
    pub fn seed_product(&self, id: &str, name: &str, price: i64) {
        self.backend.lock_products().push(MockProduct {
            id: id.to_owned(),
            name: name.to_owned(),
            price: Decimal::from(price),
            category: Some("spices".to_owned()),
            promoted: false,
        });
    }

    /// Seed the promoted offer.
    pub fn seed_promoted_product(&self, id: &str, name: &str, price: i64) {
        self.backend.lock_products().push(MockProduct {
            id: id.to_owned(),
            name: name.to_owned(),
            price: Decimal::from(price),
            category: None,
            promoted: true,
        });
    }

    /// Register an account through the real session store, then verify it
    /// with the mock's verification code.
    pub async fn register_verified(&self, email: &str, password: &str) {
        self.session
            .register(&zafaran_client::session::RegisterDetails {
                full_name: "Test Customer".to_owned(),
                phone_number: "+961 3 123456".to_owned(),
                email: email.to_owned(),
                password: password.to_owned(),
                confirm_password: password.to_owned(),
            })
            .await
            .expect("register");

        self.session
            .verify_email(email, VERIFICATION_CODE)
            .await
            .expect("verify email");
    }
}
