//! Session commands.

use flow_hydration_client::CustomerAuth;

use super::CliError;

/// Forget the stored token and profile.
#[allow(clippy::print_stdout)]
pub fn logout(auth: &CustomerAuth) {
    auth.logout();
    println!("Logged out. Your cart has been kept on this device.");
}

/// Validate the stored session and print the profile.
///
/// # Errors
///
/// Returns error if the profile cannot be loaded after the session checks out.
#[allow(clippy::print_stdout)]
pub async fn whoami(auth: &CustomerAuth) -> Result<(), CliError> {
    if !auth.init().await {
        println!("Not logged in. Run `flow-cli login` to log in.");
        return Ok(());
    }

    let customer = auth.client().get_profile().await?;
    println!("{}", customer.display_name().unwrap_or("(no name yet)"));
    if let Some(mobile) = &customer.mobile {
        println!("Mobile: {}", mobile.masked());
    }
    println!("Customer ID: {}", customer.id);
    Ok(())
}
