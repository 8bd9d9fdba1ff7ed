use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default search radius for nearby queries, in kilometres.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: i64,
    #[serde(rename = "ownerId", default)]
    pub owner_id: Option<i64>,
    #[serde(rename = "ownerNickname", default)]
    pub owner_nickname: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Pin {
    pub fn display_description(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("(no description)")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PinCreateRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Centre point and paging for the `/nearby` endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
    pub page: u32,
    pub size: u32,
}

impl NearbyQuery {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            radius_km: DEFAULT_RADIUS_KM,
            page: 0,
            size: super::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn page(mut self, page: u32, size: u32) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("lat".to_string(), self.lat.to_string()),
            ("lng".to_string(), self.lng.to_string()),
            ("radiusKm".to_string(), self.radius_km.to_string()),
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.to_string()),
        ]
    }
}
