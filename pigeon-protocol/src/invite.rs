//! Query parameters of a shareable call invite link.
//!
//! A link carrying all three parameters on load is treated as an incoming call.

pub const ROOM_PARAM: &str = "room";
pub const TYPE_PARAM: &str = "type";
pub const CALLER_PARAM: &str = "caller";
/// Optional parameter selecting the local user identity.
pub const USER_PARAM: &str = "user";

pub const INVITE_PARAMS: [&str; 3] = [ROOM_PARAM, TYPE_PARAM, CALLER_PARAM];
