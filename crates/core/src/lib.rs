//! Flow Hydration Core - Shared domain types.
//!
//! This crate provides the types used across all Flow Hydration client components:
//! - `client` - Session, cart sync and OTP login flow against the customer API
//! - `cli` - Terminal front end for logging in and managing the cart
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Validated newtypes for mobiles, OTP codes, names, IDs and prices,
//!   plus the customer and cart models

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
