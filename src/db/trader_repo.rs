use sqlx::PgPool;

use crate::errors::EngineError;
use crate::models::TraderProfile;

/// Insert or update a trader profile keyed by wallet.
pub async fn upsert_profile(pool: &PgPool, profile: &TraderProfile) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO trader_profiles (wallet, score, calls_observed, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (wallet) DO UPDATE
            SET score = $2, calls_observed = $3, updated_at = $4
        "#,
    )
    .bind(&profile.wallet)
    .bind(profile.score)
    .bind(profile.calls_observed)
    .bind(profile.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all persisted trader profiles.
pub async fn load_profiles(pool: &PgPool) -> Result<Vec<TraderProfile>, EngineError> {
    let profiles = sqlx::query_as::<_, TraderProfile>(
        "SELECT wallet, score, calls_observed, updated_at FROM trader_profiles",
    )
    .fetch_all(pool)
    .await?;

    Ok(profiles)
}
