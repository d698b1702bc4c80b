use serde::{Deserialize, Serialize};

use crate::podcast::{AudioFormat, Status};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreatePodcast {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Scheduled air time, unix milliseconds
    #[serde(default)]
    pub date: Option<i64>,
    #[serde(default)]
    pub is_recording: Option<bool>,
    #[serde(default)]
    pub audio_format: Option<AudioFormat>,
}

impl CreatePodcast {
    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)?;
        validate_description(self.description.as_deref())
    }
}

/// Only supplied fields are replaced
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePodcast {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub date: Option<i64>,
}

impl UpdatePodcast {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_description(self.description.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.transcription.is_none()
            && self.cover_image.is_none()
            && self.date.is_none()
    }
}

fn validate_title(title: &str) -> Result<(), String> {
    let chars = title.trim().chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&chars) {
        return Err(format!(
            "title must be between {} and {} characters",
            TITLE_MIN_CHARS, TITLE_MAX_CHARS
        ));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), String> {
    match description {
        Some(d) if d.chars().count() > DESCRIPTION_MAX_CHARS => Err(format!(
            "description cannot exceed {} characters",
            DESCRIPTION_MAX_CHARS
        )),
        _ => Ok(()),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// `0` returns every match on one page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Field name, `-` prefix for descending, e.g. `-createdAt`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_validate() {
        let mut req = CreatePodcast {
            title: "Rust Weekly".to_string(),
            ..Default::default()
        };
        assert!(req.validate().is_ok());

        req.title = "ab".to_string();
        assert!(req.validate().is_err());

        req.title = "x".repeat(TITLE_MAX_CHARS + 1);
        assert!(req.validate().is_err());

        req.title = "Rust Weekly".to_string();
        req.description = Some("d".repeat(DESCRIPTION_MAX_CHARS + 1));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_partial() {
        let req: UpdatePodcast = serde_json::from_str(r#"{"coverImage":"a.png"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(!req.is_empty());
        assert_eq!(req.title, None);
        assert!(UpdatePodcast::default().is_empty());
    }
}
