use pigeon_call::CallError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InviteError {
    #[error("Invite link is missing the {0} parameter")]
    MissingParam(&'static str),
    #[error("Invalid call type: {0}")]
    InvalidCallType(String),
    #[error("No pending invite")]
    NoPendingInvite,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("No chat selected")]
    NoChatSelected,
    #[error("Unknown chat {0}")]
    UnknownChat(u64),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Other(#[from] Box<anyhow::Error>),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(Box::new(err))
    }
}
