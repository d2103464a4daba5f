use sqlx::PgPool;
use uuid::Uuid;

use crate::models::UserPreference;

pub async fn get_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserPreference>, sqlx::Error> {
    sqlx::query_as::<_, UserPreference>(
        "SELECT id AS user_id, currency, is_premium
         FROM users
         WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
