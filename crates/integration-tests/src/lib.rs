//! Integration tests for the Flow Hydration client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p flow-hydration-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_client` - OTP, profile and session handling against the API
//! - `cart_sync` - Local-first cart and server reconciliation
//! - `login_flow` - The full login state machine
//!
//! Each test starts its own [`MockBackend`], an in-process axum server that
//! speaks the customer API and records what it was asked.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use flow_hydration_client::{ClientConfig, CustomerAuth, KeyValueStore, MemoryStore};
use flow_hydration_core::{NewCartItem, Price, ProductId};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Code the mock accepts.
pub const VALID_OTP: &str = "123456";

/// Token the mock issues and accepts.
pub const TOKEN: &str = "mock-session-token";

/// What the mock knows and how it should misbehave.
#[derive(Debug)]
pub struct BackendState {
    /// Name on the account; `None` makes verification ask for one.
    pub customer_name: Option<String>,
    /// Reported by send-otp.
    pub new_customer: bool,
    /// Return the code in the send-otp response.
    pub reveal_otp: bool,
    /// Answer every authorised endpoint with 401.
    pub reject_tokens: bool,
    /// Answer cart endpoints with 500.
    pub fail_cart: bool,
    /// Answer update-name with `{success: true}` and no customer.
    pub bare_update_name: bool,
    /// Delay applied to send-otp before answering.
    pub otp_delay: Option<Duration>,
    /// Delay applied to PUT /cart before answering.
    pub put_delay: Option<Duration>,
    /// Server cart lines as sent by the client.
    pub cart: Vec<Value>,
    /// Mobile of the last send-otp request.
    pub last_mobile: Option<String>,
    /// Channel of the last send-otp request.
    pub last_channel: Option<String>,
    hits: HashMap<String, usize>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            customer_name: Some("Asha Rao".to_string()),
            new_customer: false,
            reveal_otp: false,
            reject_tokens: false,
            fail_cart: false,
            bare_update_name: false,
            otp_delay: None,
            put_delay: None,
            cart: Vec::new(),
            last_mobile: None,
            last_channel: None,
            hits: HashMap::new(),
        }
    }
}

impl BackendState {
    fn hit(&mut self, route: &str) {
        *self.hits.entry(route.to_string()).or_default() += 1;
    }

    fn customer(&self) -> Value {
        // Mongoose with virtuals sends both keys.
        let mut customer = json!({
            "_id": "cust-1",
            "id": "cust-1",
            "mobile": self.last_mobile.as_deref().unwrap_or("9876543210"),
        });
        if let Some(name) = &self.customer_name {
            customer["name"] = json!(name);
        }
        customer
    }
}

type Shared = Arc<Mutex<BackendState>>;

/// In-process customer API.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    _server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = Shared::default();
        let app = Router::new()
            .route("/api/customer/send-otp", post(send_otp))
            .route("/api/customer/verify-otp", post(verify_otp))
            .route("/api/customer/check-auth", get(check_auth))
            .route("/api/customer/profile", get(profile))
            .route("/api/customer/update-name", post(update_name))
            .route(
                "/api/customer/cart",
                get(get_cart).put(put_cart).delete(delete_cart),
            )
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            _server: server,
        }
    }

    /// Base URL of the customer API.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/customer", self.addr)).expect("mock base URL")
    }

    /// Client configuration pointing at this backend.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url());
        config.request_timeout = Duration::from_secs(5);
        config
    }

    /// Lock the backend state to inspect or reconfigure it.
    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of requests `route` (e.g. `"PUT /cart"`) has served.
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        self.state().hits.get(route).copied().unwrap_or(0)
    }

    /// Total requests served.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.state().hits.values().sum()
    }

    /// A fresh client stack over an in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn customer_auth(&self) -> (CustomerAuth, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn KeyValueStore> = store.clone();
        let auth = CustomerAuth::new(self.config(), shared).expect("client");
        (auth, store)
    }
}

/// A cart line to add, priced in whole rupees.
#[must_use]
pub fn item(slug: &str, rupees: u32, quantity: u32) -> NewCartItem {
    NewCartItem {
        product_id: ProductId::new(format!("prod-{slug}")),
        product_slug: slug.to_string(),
        name: slug.replace('-', " "),
        flavour: None,
        quantity: Some(quantity),
        price: Price::from_rupees(rupees),
        image: None,
    }
}

/// Server cart line in the API's wire shape.
#[must_use]
pub fn wire_line(slug: &str, rupees: u32, quantity: u32) -> Value {
    json!({
        "productId": format!("prod-{slug}"),
        "productSlug": slug,
        "name": slug.replace('-', " "),
        "quantity": quantity,
        "price": rupees,
    })
}

// =============================================================================
// Handlers
// =============================================================================

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn authorised(state: &BackendState, headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {TOKEN}");
    !state.reject_tokens
        && headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
}

async fn send_otp(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let delay = state.lock().unwrap_or_else(PoisonError::into_inner).otp_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.hit("POST /send-otp");
    state.last_mobile = body["mobile"].as_str().map(str::to_string);
    state.last_channel = body["channel"].as_str().map(str::to_string);

    let mut response = json!({ "success": true, "isNewCustomer": state.new_customer });
    if state.reveal_otp {
        response["otp"] = json!(VALID_OTP);
    }
    Json(response).into_response()
}

async fn verify_otp(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.hit("POST /verify-otp");

    if body["otp"].as_str() != Some(VALID_OTP) {
        return error(StatusCode::BAD_REQUEST, "Invalid OTP");
    }
    if let Some(name) = body["name"].as_str() {
        state.customer_name = Some(name.to_string());
    }

    Json(json!({
        "success": true,
        "token": TOKEN,
        "customer": state.customer(),
        "needsName": state.customer_name.is_none(),
    }))
    .into_response()
}

async fn check_auth(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.hit("GET /check-auth");
    if !authorised(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(json!({ "success": true, "customer": state.customer() })).into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.hit("GET /profile");
    if !authorised(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(json!({ "success": true, "customer": state.customer() })).into_response()
}

async fn update_name(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.hit("POST /update-name");
    if !authorised(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let Some(name) = body["name"].as_str().filter(|n| !n.trim().is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "Name is required");
    };
    state.customer_name = Some(name.to_string());

    if state.bare_update_name {
        return Json(json!({ "success": true })).into_response();
    }
    Json(json!({ "success": true, "customer": state.customer() })).into_response()
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.hit("GET /cart");
    if !authorised(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if state.fail_cart {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Cart unavailable");
    }
    Json(json!({ "success": true, "cart": state.cart })).into_response()
}

async fn put_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let delay = {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.hit("PUT /cart");
        if !authorised(&state, &headers) {
            return error(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
        if state.fail_cart {
            return error(StatusCode::INTERNAL_SERVER_ERROR, "Cart unavailable");
        }
        state.put_delay
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let lines = body["cart"].as_array().cloned().unwrap_or_default();
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.cart = lines;
    Json(json!({ "success": true, "cart": state.cart })).into_response()
}

async fn delete_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.hit("DELETE /cart");
    if !authorised(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    state.cart.clear();
    Json(json!({ "success": true })).into_response()
}
