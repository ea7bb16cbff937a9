use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::discoverymodel::{Decision, MatchRecord, SwipeDirection};

//Response wrappers
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub status: String,
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            status: "error".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: u32, limit: u32) -> Self {
        let total_pages = ((total as f64) / (limit as f64)).ceil() as u32;
        Self {
            status: "success".to_string(),
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

//Discovery feed DTOs
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct FeedQueryDto {
    pub genres: Option<Vec<String>>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,

    #[validate(range(min = 1.0, max = 20000.0, message = "Radius must be between 1 and 20000 km"))]
    pub radius_km: Option<f64>,

    #[validate(range(min = 0.0, message = "Budget must be positive"))]
    pub budget_min: Option<f64>,

    #[validate(range(min = 0.0, message = "Budget must be positive"))]
    pub budget_max: Option<f64>,

    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,

    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl FeedQueryDto {
    /// True when any filter was supplied explicitly; such requests bypass the
    /// per-actor feed cache.
    pub fn has_overrides(&self) -> bool {
        self.genres.is_some()
            || self.latitude.is_some()
            || self.longitude.is_some()
            || self.radius_km.is_some()
            || self.budget_min.is_some()
            || self.budget_max.is_some()
            || self.date_from.is_some()
            || self.date_to.is_some()
    }
}

/// Query-string shape of the feed filters; genres arrive comma-separated
/// (`?genres=jazz,funk`) since repeated keys do not survive urlencoded
/// deserialization.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FeedQueryParams {
    pub genres: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl FeedQueryParams {
    pub fn into_filters(self) -> FeedQueryDto {
        let genres = self.genres.map(|raw| {
            raw.split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect::<Vec<_>>()
        });

        FeedQueryDto {
            genres,
            latitude: self.latitude,
            longitude: self.longitude,
            radius_km: self.radius_km,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            date_from: self.date_from,
            date_to: self.date_to,
            page: self.page,
            limit: self.limit,
        }
    }
}

//Swipe DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SwipeDto {
    pub target_id: Uuid,
    pub direction: SwipeDirection,
    pub gig_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SwipeResultDto {
    pub decision: Decision,
    // Present only when this swipe completed a mutual match
    pub matched: Option<MatchRecord>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ListQueryDto {
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}
