//! Thin client for the Tribe content platform that hosts training videos.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct TribeClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// Content item as returned by the platform.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContent {
    id: serde_json::Value,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "transcodingDataLP")]
    transcoding: Option<Transcoding>,
    #[serde(default)]
    cover_image: Option<String>,
}
#[derive(Debug, Deserialize)]
struct Transcoding {
    #[serde(default)]
    hls: Option<String>,
    #[serde(default)]
    mp4: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewEvent<'a> {
    user_id: &'a str,
}

/// Joins `path` onto `base` unless it is already absolute.
fn absolute(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl RawContent {
    fn into_item(self, base_url: &str) -> ContentItem {
        let id = match self.id {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        };
        // HLS is preferred for playback; mp4 is the fallback rendition.
        let video_url = self
            .transcoding
            .and_then(|transcoding| transcoding.hls.or(transcoding.mp4))
            .map(|path| absolute(base_url, &path));
        ContentItem {
            id,
            title: self.title,
            description: self.description,
            published_at: self.published_date,
            video_url,
            image_url: self.cover_image.map(|path| absolute(base_url, &path)),
        }
    }
}

impl TribeClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        TribeClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// `base_url` with each of `segments` appended as one escaped path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || AppError::Internal(format!("INVALID_CONTENT_URL: {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn fetch_contents(&self) -> Result<Vec<ContentItem>> {
        let raw: Vec<RawContent> = self
            .http
            .get(self.endpoint(&["contents"])?)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(raw
            .into_iter()
            .map(|content| content.into_item(&self.base_url))
            .collect())
    }

    pub async fn record_view(&self, content_id: &str, user_id: &str) -> Result<()> {
        if content_id.trim().is_empty() {
            return Err(AppError::validation("INVALID_CONTENT_ID"));
        }
        self.http
            .post(self.endpoint(&["contents", content_id, "views"])?)
            .bearer_auth(&self.token)
            .json(&ViewEvent { user_id })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://tribe.example.com/api";

    #[test]
    fn maps_platform_items() {
        let raw: Vec<RawContent> = serde_json::from_str(
            r#"[
                {
                    "id": 4521,
                    "title": "Leading with Curiosity",
                    "description": "Module 3",
                    "publishedDate": "2024-03-01T10:00:00Z",
                    "transcodingDataLP": {
                        "hls": "/videos/4521/master.m3u8",
                        "mp4": "/videos/4521.mp4"
                    },
                    "coverImage": "https://cdn.example.com/4521.jpg"
                },
                { "id": "a-17", "title": "Draft" }
            ]"#,
        )
        .unwrap();
        let items: Vec<ContentItem> = raw.into_iter().map(|raw| raw.into_item(BASE)).collect();

        assert_eq!(items[0].id, "4521");
        assert_eq!(
            items[0].video_url.as_deref(),
            Some("https://tribe.example.com/api/videos/4521/master.m3u8")
        );
        assert_eq!(items[0].image_url.as_deref(), Some("https://cdn.example.com/4521.jpg"));
        assert!(items[0].published_at.is_some());

        assert_eq!(items[1].id, "a-17");
        assert!(items[1].video_url.is_none());
        assert!(items[1].image_url.is_none());
    }

    #[test]
    fn content_ids_stay_inside_their_path_segment() {
        let client = TribeClient::new(BASE, "token");
        assert_eq!(
            client.endpoint(&["contents"]).unwrap().as_str(),
            "https://tribe.example.com/api/contents"
        );
        assert_eq!(
            client
                .endpoint(&["contents", "intro clip/2", "views"])
                .unwrap()
                .as_str(),
            "https://tribe.example.com/api/contents/intro%20clip%2F2/views"
        );
    }

    #[test]
    fn falls_back_to_mp4() {
        let raw: RawContent = serde_json::from_str(
            r#"{ "id": 9, "title": "Clip", "transcodingDataLP": { "mp4": "clip.mp4" } }"#,
        )
        .unwrap();
        assert_eq!(
            raw.into_item(BASE).video_url.as_deref(),
            Some("https://tribe.example.com/api/clip.mp4")
        );
    }
}
