//! Local-first cart synchronisation.
//!
//! The local cart is always what the customer sees. While a session is
//! authenticated, changes are pushed to the server in the background and the
//! server cart is pulled in on login or startup:
//!
//! | local     | remote    | outcome                          |
//! |-----------|-----------|----------------------------------|
//! | non-empty | empty     | keep local, push it to server    |
//! | empty     | any       | adopt remote                     |
//! | non-empty | non-empty | adopt remote (local is replaced) |
//!
//! Every network failure degrades to the local cart; nothing here surfaces a
//! transport error to the caller.

use std::sync::{Arc, Mutex, PoisonError};

use flow_hydration_core::{Cart, NewCartItem};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::api::AuthClient;
use crate::cart_store::CartStore;
use crate::session::SessionStore;

/// Decision taken when the server cart arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Local has lines and the server has none: push local up.
    PushLocal(Cart),
    /// Use the server cart locally.
    AdoptRemote(Cart),
}

impl Reconciliation {
    /// The cart the customer ends up with.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        match self {
            Self::PushLocal(cart) | Self::AdoptRemote(cart) => cart,
        }
    }
}

/// Decide how to merge the server cart into the local one.
#[must_use]
pub fn reconcile(local: Cart, remote: Cart) -> Reconciliation {
    if !local.is_empty() && remote.is_empty() {
        Reconciliation::PushLocal(local)
    } else {
        if !local.is_empty() && local != remote {
            tracing::info!(
                local_lines = local.len(),
                remote_lines = remote.len(),
                "Server cart replaces local cart"
            );
        }
        Reconciliation::AdoptRemote(remote)
    }
}

/// Cart operations with opportunistic server sync.
#[derive(Clone)]
pub struct CartSync {
    api: AuthClient,
    carts: CartStore,
    pending: Arc<Mutex<Vec<JoinHandle<Cart>>>>,
    // One PUT at a time so responses cannot land out of order.
    sync_lock: Arc<tokio::sync::Mutex<()>>,
}

impl CartSync {
    /// Create a sync engine from an API client and local cart store.
    #[must_use]
    pub fn new(api: AuthClient, carts: CartStore) -> Self {
        Self {
            api,
            carts,
            pending: Arc::new(Mutex::new(Vec::new())),
            sync_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// The locally stored cart.
    #[must_use]
    pub fn local_cart(&self) -> Cart {
        self.carts.load()
    }

    /// Receive the cart after every local save.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.carts.subscribe()
    }

    /// Cart to show on startup: the reconciled server cart when logged in,
    /// otherwise the local one.
    pub async fn init_cart(&self) -> Cart {
        if self.session().is_authenticated() {
            return self.fetch_cart().await;
        }
        self.carts.load()
    }

    /// Pull the server cart and reconcile it into the local one.
    ///
    /// Anonymous sessions and failed requests return the local cart untouched.
    #[instrument(skip_all)]
    pub async fn fetch_cart(&self) -> Cart {
        let local = self.carts.load();
        if !self.session().is_authenticated() {
            return local;
        }

        let remote = match self.api.fetch_cart().await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch server cart, using local cart");
                return local;
            }
        };

        match reconcile(local, remote) {
            Reconciliation::PushLocal(local) => {
                tracing::info!(lines = local.len(), "Server cart empty, uploading local cart");
                self.sync_cart_to_server(Some(local.clone())).await;
                local
            }
            Reconciliation::AdoptRemote(remote) => {
                self.carts.save(&remote);
                remote
            }
        }
    }

    /// Push `cart` (or the local cart) to the server.
    ///
    /// Anonymous sessions only persist `cart` locally. On success the server's
    /// copy becomes the local cart, unless the local cart changed while the
    /// request was in flight (the newer local cart is kept and its own sync
    /// follows). On failure the local cart is left as it was and the cart that
    /// was sent is returned.
    #[instrument(skip_all)]
    pub async fn sync_cart_to_server(&self, cart: Option<Cart>) -> Cart {
        if !self.session().is_authenticated() {
            return match cart {
                Some(cart) => {
                    self.carts.save(&cart);
                    cart
                }
                None => self.carts.load(),
            };
        }

        let _guard = self.sync_lock.lock().await;
        let cart = cart.unwrap_or_else(|| self.carts.load());
        match self.api.put_cart(&cart).await {
            Ok(server_cart) => {
                if self.carts.load() == cart {
                    self.carts.save(&server_cart);
                } else {
                    tracing::debug!("Local cart changed during sync, keeping local copy");
                }
                server_cart
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cart sync failed, keeping local cart");
                cart
            }
        }
    }

    /// Add an item, merging with an existing line of the same product and flavour.
    pub fn add_to_cart(&self, item: NewCartItem) -> Cart {
        let mut cart = self.carts.load();
        cart.add(item);
        self.commit(cart)
    }

    /// Set a line's quantity; zero or below removes the line.
    ///
    /// An index past the end leaves the cart unchanged.
    pub fn update_cart_item(&self, index: usize, quantity: i64) -> Cart {
        let mut cart = self.carts.load();
        if let Err(e) = cart.set_quantity(index, quantity) {
            tracing::debug!(error = %e, "Ignoring cart update");
            return cart;
        }
        self.commit(cart)
    }

    /// Remove the line at `index`.
    pub fn remove_from_cart(&self, index: usize) -> Cart {
        self.update_cart_item(index, 0)
    }

    /// Empty the cart locally and, best-effort, on the server.
    #[instrument(skip_all)]
    pub async fn clear_cart(&self) -> Cart {
        let cart = Cart::new();
        self.carts.save(&cart);

        if self.session().is_authenticated()
            && let Err(e) = self.api.delete_cart().await
        {
            tracing::warn!(error = %e, "Failed to clear server cart");
        }

        cart
    }

    /// Wait for every background sync started so far to finish.
    pub async fn flush(&self) {
        let handles = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Background cart sync task failed");
            }
        }
    }

    /// Persist locally, then push to the server in the background if logged in.
    ///
    /// Outside a tokio runtime the push is skipped; the next `fetch_cart` or
    /// explicit sync carries the change up.
    fn commit(&self, cart: Cart) -> Cart {
        self.carts.save(&cart);

        if self.session().is_authenticated() {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                tracing::warn!("No async runtime, cart saved locally without server sync");
                return cart;
            };

            // Syncs may start in any order; each sends the local cart as it is
            // when its turn comes, so the last one to run pushes the newest.
            let engine = self.clone();
            let handle = runtime.spawn(async move { engine.sync_cart_to_server(None).await });

            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }

        cart
    }
}

impl std::fmt::Debug for CartSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSync")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}
