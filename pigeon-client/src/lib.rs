pub mod app;
pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
pub mod invite;
pub mod notify;
pub mod platform;

pub use app::{AppContext, OutboundCall, Platform};
pub use error::{ChatError, Error, InviteError};
