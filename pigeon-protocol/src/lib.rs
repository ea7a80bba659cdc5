mod call;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "invite")]
pub mod invite;

pub use call::{CallKind, ParseCallKindError};
