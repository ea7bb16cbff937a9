// db/actordb.rs
//
// Read-only access to actor profiles. This is the identity/role provider
// contract: the engine consumes visibility, setup and profile attributes but
// never writes them.
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::actormodel::ActorProfile;

#[async_trait]
pub trait ActorExt {
    async fn get_actor_profile(&self, actor_id: Uuid) -> Result<Option<ActorProfile>, Error>;

    async fn get_actor_profiles(&self, actor_ids: &[Uuid]) -> Result<Vec<ActorProfile>, Error>;
}

#[async_trait]
impl ActorExt for DBClient {
    async fn get_actor_profile(&self, actor_id: Uuid) -> Result<Option<ActorProfile>, Error> {
        sqlx::query_as::<_, ActorProfile>(
            r#"
            SELECT id, role, display_name, visible, setup_complete, accepting_bookings,
                   latitude, longitude, travel_radius_km, genres, min_rate, max_rate,
                   rating, created_at, updated_at
            FROM actor_profiles
            WHERE id = $1
            "#,
        )
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_actor_profiles(&self, actor_ids: &[Uuid]) -> Result<Vec<ActorProfile>, Error> {
        sqlx::query_as::<_, ActorProfile>(
            r#"
            SELECT id, role, display_name, visible, setup_complete, accepting_bookings,
                   latitude, longitude, travel_radius_km, genres, min_rate, max_rate,
                   rating, created_at, updated_at
            FROM actor_profiles
            WHERE id = ANY($1)
            "#,
        )
        .bind(actor_ids)
        .fetch_all(&self.pool)
        .await
    }
}
