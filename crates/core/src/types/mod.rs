//! Core types for Flow Hydration.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod customer;
pub mod id;
pub mod mobile;
pub mod otp;
pub mod price;

pub use cart::{Cart, CartError, CartItem, NewCartItem};
pub use customer::{Customer, CustomerName, NameError};
pub use id::*;
pub use mobile::{Mobile, MobileError};
pub use otp::{OtpChannel, OtpCode, OtpError};
pub use price::{Price, PriceError};
