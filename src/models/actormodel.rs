use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "actor_role", rename_all = "snake_case")]
pub enum ActorRole {
    Performer,
    Venue,
}

impl ActorRole {
    /// The role an actor of this role swipes on.
    pub fn counterpart(&self) -> ActorRole {
        match self {
            ActorRole::Performer => ActorRole::Venue,
            ActorRole::Venue => ActorRole::Performer,
        }
    }
}

/// Profile attributes served by the identity provider. This engine only ever
/// reads these rows; profile CRUD lives elsewhere.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ActorProfile {
    pub id: Uuid,
    pub role: ActorRole,
    pub display_name: String,
    pub visible: bool,
    pub setup_complete: bool,
    pub accepting_bookings: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub travel_radius_km: Option<f64>,
    pub genres: Vec<String>,
    pub min_rate: Option<BigDecimal>,
    pub max_rate: Option<BigDecimal>,
    pub rating: Option<f32>, // 0.0 - 5.0, NULL until first review
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActorProfile {
    /// Eligible to show up in someone's feed or receive a decision.
    pub fn is_discoverable(&self) -> bool {
        self.visible && self.setup_complete && self.accepting_bookings
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}
