//! Integration tests for the local-first cart and its server sync.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use flow_hydration_core::Price;
use flow_hydration_integration_tests::{MockBackend, TOKEN, item, wire_line};
use secrecy::SecretString;

fn log_in(auth: &flow_hydration_client::CustomerAuth) {
    auth.client().session().set_token(&SecretString::from(TOKEN));
}

// =============================================================================
// Anonymous
// =============================================================================

#[tokio::test]
async fn test_anonymous_cart_stays_local() {
    let backend = MockBackend::start().await;
    let (auth, _) = backend.customer_auth();
    let carts = auth.cart();

    carts.add_to_cart(item("lemon-mint", 10, 2));
    let cart = carts.add_to_cart(item("orange", 5, 1));
    carts.flush().await;

    assert_eq!(cart.total(), Price::from_rupees(25));
    assert_eq!(cart.count(), 3);
    assert_eq!(carts.local_cart(), cart);
    assert_eq!(carts.init_cart().await, cart);
    assert_eq!(backend.total_hits(), 0);
}

#[tokio::test]
async fn test_adding_same_product_merges_lines() {
    let backend = MockBackend::start().await;
    let (auth, _) = backend.customer_auth();

    auth.cart().add_to_cart(item("lemon-mint", 10, 2));
    let cart = auth.cart().add_to_cart(item("lemon-mint", 10, 3));

    assert_eq!(cart.len(), 1);
    assert_eq!(cart.count(), 5);
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let backend = MockBackend::start().await;
    let (auth, _) = backend.customer_auth();
    let carts = auth.cart();
    carts.add_to_cart(item("lemon-mint", 10, 2));
    carts.add_to_cart(item("orange", 5, 1));

    let cart = carts.update_cart_item(0, 4);
    assert_eq!(cart.count(), 5);

    let unchanged = carts.update_cart_item(7, 1);
    assert_eq!(unchanged, cart);

    let cart = carts.update_cart_item(1, 0);
    assert_eq!(cart.len(), 1);

    let cart = carts.remove_from_cart(0);
    assert!(cart.is_empty());
    assert!(carts.local_cart().is_empty());
}

#[tokio::test]
async fn test_subscribers_see_every_save() {
    let backend = MockBackend::start().await;
    let (auth, _) = backend.customer_auth();
    let mut updates = auth.cart().subscribe();

    auth.cart().add_to_cart(item("lemon-mint", 10, 1));
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().count(), 1);
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_local_cart_is_pushed_when_server_cart_is_empty() {
    let backend = MockBackend::start().await;
    let (auth, _) = backend.customer_auth();
    auth.cart().add_to_cart(item("lemon-mint", 10, 2));
    log_in(&auth);

    let cart = auth.cart().fetch_cart().await;

    assert_eq!(cart.count(), 2);
    assert_eq!(backend.hits("PUT /cart"), 1);
    assert_eq!(backend.state().cart.len(), 1);
}

#[tokio::test]
async fn test_server_cart_is_adopted_when_local_is_empty() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![wire_line("orange", 5, 3)];
    let (auth, _) = backend.customer_auth();
    log_in(&auth);

    let cart = auth.cart().fetch_cart().await;

    assert_eq!(cart.count(), 3);
    assert_eq!(cart.total(), Price::from_rupees(15));
    assert_eq!(auth.cart().local_cart(), cart);
    assert_eq!(backend.hits("PUT /cart"), 0);
}

#[tokio::test]
async fn test_server_cart_wins_when_both_have_lines() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![wire_line("orange", 5, 1)];
    let (auth, _) = backend.customer_auth();
    auth.cart().add_to_cart(item("lemon-mint", 10, 2));
    log_in(&auth);

    let cart = auth.cart().fetch_cart().await;

    assert_eq!(cart.len(), 1);
    assert_eq!(cart.items()[0].product_slug, "orange");
    assert_eq!(auth.cart().local_cart(), cart);
}

#[tokio::test]
async fn test_fetch_failure_keeps_local_cart() {
    let backend = MockBackend::start().await;
    backend.state().fail_cart = true;
    let (auth, _) = backend.customer_auth();
    auth.cart().add_to_cart(item("lemon-mint", 10, 2));
    log_in(&auth);

    let cart = auth.cart().fetch_cart().await;

    assert_eq!(cart.count(), 2);
    assert!(auth.is_logged_in());
}

#[tokio::test]
async fn test_fetch_with_expired_token_logs_out_and_keeps_local_cart() {
    let backend = MockBackend::start().await;
    backend.state().reject_tokens = true;
    backend.state().cart = vec![wire_line("orange", 5, 1)];
    let (auth, _) = backend.customer_auth();
    let local = auth.cart().add_to_cart(item("lemon-mint", 10, 2));
    log_in(&auth);

    let cart = auth.cart().fetch_cart().await;

    assert_eq!(cart, local);
    assert_eq!(auth.cart().local_cart(), local);
    assert!(!auth.is_logged_in());
    assert_eq!(backend.hits("GET /cart"), 1);
    assert_eq!(backend.hits("PUT /cart"), 0);
}

#[tokio::test]
async fn test_init_reconciles_when_session_is_valid() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![wire_line("orange", 5, 2)];
    let (auth, _) = backend.customer_auth();
    log_in(&auth);

    assert!(auth.init().await);
    assert_eq!(auth.cart().local_cart().count(), 2);
}

// =============================================================================
// Background sync
// =============================================================================

#[tokio::test]
async fn test_changes_are_pushed_in_background_when_logged_in() {
    let backend = MockBackend::start().await;
    let (auth, _) = backend.customer_auth();
    log_in(&auth);

    auth.cart().add_to_cart(item("lemon-mint", 10, 2));
    auth.cart().flush().await;

    assert_eq!(backend.hits("PUT /cart"), 1);
    let state = backend.state();
    assert_eq!(state.cart.len(), 1);
    assert_eq!(state.cart[0]["productSlug"], "lemon-mint");
    assert_eq!(state.cart[0]["quantity"], 2);
}

#[tokio::test]
async fn test_failed_sync_keeps_local_cart() {
    let backend = MockBackend::start().await;
    backend.state().fail_cart = true;
    let (auth, _) = backend.customer_auth();
    log_in(&auth);

    let cart = auth.cart().add_to_cart(item("lemon-mint", 10, 2));
    auth.cart().flush().await;

    assert_eq!(auth.cart().local_cart(), cart);
    assert!(auth.is_logged_in());
}

#[tokio::test]
async fn test_sync_with_expired_token_logs_out_but_keeps_cart() {
    let backend = MockBackend::start().await;
    backend.state().reject_tokens = true;
    let (auth, _) = backend.customer_auth();
    log_in(&auth);

    auth.cart().add_to_cart(item("lemon-mint", 10, 2));
    auth.cart().flush().await;

    assert!(!auth.is_logged_in());
    assert_eq!(auth.cart().local_cart().count(), 2);
}

#[tokio::test]
async fn test_rapid_changes_end_with_latest_cart() {
    let backend = MockBackend::start().await;
    backend.state().put_delay = Some(Duration::from_millis(50));
    let (auth, _) = backend.customer_auth();
    log_in(&auth);

    let carts = auth.cart();
    carts.add_to_cart(item("lemon-mint", 10, 1));
    carts.add_to_cart(item("orange", 5, 1));
    let latest = carts.update_cart_item(0, 3);
    carts.flush().await;

    assert_eq!(carts.local_cart(), latest);
    let state = backend.state();
    assert_eq!(state.cart.len(), 2);
    assert_eq!(state.cart[0]["quantity"], 3);
}

#[tokio::test]
async fn test_explicit_sync_pushes_local_cart() {
    let backend = MockBackend::start().await;
    let (auth, _) = backend.customer_auth();
    auth.cart().add_to_cart(item("orange", 5, 4));
    log_in(&auth);

    let cart = auth.cart().sync_cart_to_server(None).await;

    assert_eq!(cart.count(), 4);
    let state = backend.state();
    assert_eq!(state.cart.len(), 1);
    assert_eq!(state.cart[0]["productSlug"], "orange");
    assert_eq!(state.cart[0]["quantity"], 4);
}

#[tokio::test]
async fn test_clear_cart_deletes_server_cart() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![wire_line("orange", 5, 1)];
    let (auth, _) = backend.customer_auth();
    log_in(&auth);
    auth.cart().fetch_cart().await;

    let cart = auth.cart().clear_cart().await;

    assert!(cart.is_empty());
    assert!(auth.cart().local_cart().is_empty());
    assert_eq!(backend.hits("DELETE /cart"), 1);
    assert!(backend.state().cart.is_empty());
}

#[tokio::test]
async fn test_clear_with_expired_token_logs_out_and_empties_local_cart() {
    let backend = MockBackend::start().await;
    backend.state().cart = vec![wire_line("orange", 5, 1)];
    let (auth, _) = backend.customer_auth();
    log_in(&auth);
    auth.cart().fetch_cart().await;
    backend.state().reject_tokens = true;

    let cart = auth.cart().clear_cart().await;

    assert!(cart.is_empty());
    assert!(auth.cart().local_cart().is_empty());
    assert!(!auth.is_logged_in());
    assert_eq!(backend.hits("DELETE /cart"), 1);
    assert_eq!(backend.state().cart.len(), 1);
}

#[tokio::test]
async fn test_logout_keeps_cart_and_stops_syncing() {
    let backend = MockBackend::start().await;
    let (auth, _) = backend.customer_auth();
    log_in(&auth);
    auth.cart().add_to_cart(item("lemon-mint", 10, 1));
    auth.cart().flush().await;

    auth.logout();
    auth.cart().add_to_cart(item("orange", 5, 1));
    auth.cart().flush().await;

    assert_eq!(auth.cart().local_cart().len(), 2);
    assert_eq!(backend.hits("PUT /cart"), 1);
}
