use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    #[serde(rename = "authorId", default)]
    pub author_id: Option<i64>,
    #[serde(rename = "authorNickname", default)]
    pub author_nickname: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "pinId", default)]
    pub pin_id: Option<i64>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Post {
    pub fn author_display(&self) -> &str {
        self.author_nickname.as_deref().unwrap_or("unknown")
    }

    /// Posts without a pin are still placed on the map when they carry coordinates.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}
