use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Scheduled,
    Live,
    Ended,
    Cancelled,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Status::Scheduled => "scheduled",
                Status::Live => "live",
                Status::Ended => "ended",
                Status::Cancelled => "cancelled",
            }
        )
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scheduled" => Ok(Status::Scheduled),
            "live" => Ok(Status::Live),
            "ended" => Ok(Status::Ended),
            "cancelled" => Ok(Status::Cancelled),
            _ => Err(format!("unknown podcast status: {}", s)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Webm,
    Mp3,
    Ogg,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Webm => "webm",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Ogg => "audio/ogg",
        }
    }

    /// Maps a `Content-Type` header value, parameters are ignored
    pub fn from_content_type(value: &str) -> Option<Self> {
        let mime = value.split(';').next().unwrap_or_default().trim();
        match mime.to_ascii_lowercase().as_str() {
            "audio/webm" | "video/webm" => Some(AudioFormat::Webm),
            "audio/mpeg" | "audio/mp3" => Some(AudioFormat::Mp3),
            "audio/ogg" | "application/ogg" => Some(AudioFormat::Ogg),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webm" => Ok(AudioFormat::Webm),
            "mp3" => Ok(AudioFormat::Mp3),
            "ogg" => Ok(AudioFormat::Ogg),
            _ => Err(format!("unsupported audio format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        for status in [
            Status::Scheduled,
            Status::Live,
            Status::Ended,
            Status::Cancelled,
        ] {
            assert_eq!(status, status.to_string().parse().unwrap());
        }
        assert!("paused".parse::<Status>().is_err());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(
            AudioFormat::from_content_type("audio/mpeg"),
            Some(AudioFormat::Mp3)
        );
        assert_eq!(
            AudioFormat::from_content_type("audio/webm;codecs=opus"),
            Some(AudioFormat::Webm)
        );
        assert_eq!(AudioFormat::from_content_type("text/plain"), None);
        assert_eq!(AudioFormat::Ogg.content_type(), "audio/ogg");
    }
}
