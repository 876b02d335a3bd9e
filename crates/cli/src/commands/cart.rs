//! Cart commands.
//!
//! Lines are numbered from 1 in everything the user sees or types.

use flow_hydration_client::CustomerAuth;
use flow_hydration_core::{Cart, NewCartItem, Price, ProductId};

use super::CliError;

/// Arguments of `cart add`.
pub struct NewLine {
    pub slug: String,
    pub name: String,
    pub price: Price,
    pub product_id: Option<String>,
    pub flavour: Option<String>,
    pub quantity: Option<u32>,
    pub image: Option<String>,
}

/// Print the cart, pulling the server cart first when logged in.
pub async fn list(auth: &CustomerAuth) {
    let cart = auth.cart().init_cart().await;
    print_cart(&cart);
}

/// Add a product, merging with an existing line of the same flavour.
pub fn add(auth: &CustomerAuth, line: NewLine) {
    let product_id = line.product_id.unwrap_or_else(|| line.slug.clone());
    let cart = auth.cart().add_to_cart(NewCartItem {
        product_id: ProductId::new(product_id),
        product_slug: line.slug,
        name: line.name,
        flavour: line.flavour,
        quantity: line.quantity,
        price: line.price,
        image: line.image,
    });
    print_cart(&cart);
}

/// Set the quantity of a line; zero or below removes it.
///
/// # Errors
///
/// Returns error if `line` is not in the cart.
pub fn update(auth: &CustomerAuth, line: usize, quantity: i64) -> Result<(), CliError> {
    let index = line_index(auth, line)?;
    let cart = auth.cart().update_cart_item(index, quantity);
    print_cart(&cart);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns error if `line` is not in the cart.
pub fn remove(auth: &CustomerAuth, line: usize) -> Result<(), CliError> {
    let index = line_index(auth, line)?;
    let cart = auth.cart().remove_from_cart(index);
    print_cart(&cart);
    Ok(())
}

/// Empty the cart here and on the server.
pub async fn clear(auth: &CustomerAuth) {
    let cart = auth.cart().clear_cart().await;
    print_cart(&cart);
}

/// Push the local cart to the server.
#[allow(clippy::print_stdout)]
pub async fn sync(auth: &CustomerAuth) {
    if !auth.is_logged_in() {
        println!("Not logged in; the cart is stored on this device only.");
        return;
    }
    let cart = auth.cart().sync_cart_to_server(None).await;
    print_cart(&cart);
}

fn line_index(auth: &CustomerAuth, line: usize) -> Result<usize, CliError> {
    let len = auth.cart().local_cart().len();
    match line.checked_sub(1) {
        Some(index) if index < len => Ok(index),
        _ => Err(CliError::NoSuchLine { line, len }),
    }
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for (n, item) in cart.items().iter().enumerate() {
        let flavour = item
            .flavour
            .as_deref()
            .map(|f| format!(" ({f})"))
            .unwrap_or_default();
        println!(
            "{:>3}. {}{flavour} x{} @ {} = {}",
            n + 1,
            item.name,
            item.quantity,
            item.price,
            item.line_total()
        );
    }
    println!("Total: {} for {} item(s)", cart.total(), cart.count());
}
