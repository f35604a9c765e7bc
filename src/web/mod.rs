//! Web API module for the parlor service.

pub mod accounts;
pub mod applications;
pub mod error;
pub mod extract;
pub mod invitations;
pub mod messages;
pub mod middleware;
pub mod rooms;
pub mod routes;
pub mod status;
pub mod stickers;
pub mod wallet;

pub use routes::*;
