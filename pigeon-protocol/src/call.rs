use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Kind of call a room is joined for.
///
/// Video calls capture and publish both audio and video, voice calls only ever capture audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Video,
    Voice,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Video => "video",
            CallKind::Voice => "voice",
        }
    }

    pub fn has_video(&self) -> bool {
        matches!(self, CallKind::Video)
    }
}

impl Display for CallKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCallKindError(pub String);

impl Display for ParseCallKindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid call kind '{}', must be \"video\" or \"voice\"", self.0)
    }
}

impl std::error::Error for ParseCallKindError {}

impl FromStr for CallKind {
    type Err = ParseCallKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(CallKind::Video),
            "voice" => Ok(CallKind::Voice),
            other => Err(ParseCallKindError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse() {
        assert_eq!("video".parse::<CallKind>(), Ok(CallKind::Video));
        assert_eq!("voice".parse::<CallKind>(), Ok(CallKind::Voice));
        assert_eq!(
            "Video".parse::<CallKind>(),
            Err(ParseCallKindError("Video".to_string()))
        );
    }

    #[test]
    fn serialize_lowercase() {
        assert_eq!(serde_json::to_string(&CallKind::Voice).unwrap(), "\"voice\"");
        assert_eq!(
            serde_json::from_str::<CallKind>("\"video\"").unwrap(),
            CallKind::Video
        );
    }
}
