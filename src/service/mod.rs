//! Workflows that compose the data layer with the entitlement engine.

pub mod purchase;

pub use purchase::{PurchaseError, buy_sticker_set};
