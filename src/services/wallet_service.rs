use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::db::trader_repo;
use crate::errors::EngineError;
use crate::models::TraderProfile;

/// Single owner of trader profile state. The quality scorer reads and writes
/// through this capability; profiles are never deleted, only decayed.
pub struct WalletService {
    profiles: RwLock<HashMap<String, TraderProfile>>,
    prior: Decimal,
    pool: Option<PgPool>,
}

impl WalletService {
    pub fn new(prior: Decimal, pool: Option<PgPool>) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            prior,
            pool,
        }
    }

    /// Fetch the profile for a wallet, creating it at the neutral prior on
    /// first sight.
    pub fn get_or_create_profile(&self, wallet: &str) -> TraderProfile {
        let mut profiles = self.profiles.write().expect("wallet lock poisoned");
        profiles
            .entry(wallet.to_string())
            .or_insert_with(|| TraderProfile::new(wallet.to_string(), self.prior, Utc::now()))
            .clone()
    }

    /// Current profile, if the wallet has ever been observed.
    pub fn get(&self, wallet: &str) -> Option<TraderProfile> {
        let profiles = self.profiles.read().expect("wallet lock poisoned");
        profiles.get(wallet).cloned()
    }

    /// Apply a mutation to a wallet's profile, creating it if needed.
    /// Returns the updated profile.
    pub fn update<F>(&self, wallet: &str, f: F) -> TraderProfile
    where
        F: FnOnce(&mut TraderProfile),
    {
        let mut profiles = self.profiles.write().expect("wallet lock poisoned");
        let profile = profiles
            .entry(wallet.to_string())
            .or_insert_with(|| TraderProfile::new(wallet.to_string(), self.prior, Utc::now()));
        f(profile);
        profile.updated_at = Utc::now();
        profile.clone()
    }

    /// Merge wallets from an external list (seeded watchlists etc.) at the
    /// neutral prior. Returns how many were newly added.
    pub fn merge_external_list<I>(&self, source: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut profiles = self.profiles.write().expect("wallet lock poisoned");
        let mut added = 0;
        for wallet in source {
            profiles.entry(wallet.clone()).or_insert_with(|| {
                added += 1;
                TraderProfile::new(wallet, self.prior, Utc::now())
            });
        }
        added
    }

    pub fn count(&self) -> usize {
        self.profiles.read().expect("wallet lock poisoned").len()
    }

    /// Write one profile through to storage. A missing pool is a no-op.
    pub async fn persist(&self, wallet: &str) -> Result<(), EngineError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        let Some(profile) = self.get(wallet) else {
            return Ok(());
        };
        trader_repo::upsert_profile(pool, &profile).await
    }

    /// Write every known profile through to storage.
    pub async fn persist_all(&self) -> Result<usize, EngineError> {
        let Some(pool) = &self.pool else {
            return Ok(0);
        };
        let snapshot: Vec<TraderProfile> = {
            let profiles = self.profiles.read().expect("wallet lock poisoned");
            profiles.values().cloned().collect()
        };
        let count = snapshot.len();
        for profile in &snapshot {
            trader_repo::upsert_profile(pool, profile).await?;
        }
        Ok(count)
    }

    /// Load all persisted profiles, replacing in-memory entries.
    pub async fn restore(&self) -> Result<usize, EngineError> {
        let Some(pool) = &self.pool else {
            return Ok(0);
        };
        let rows = trader_repo::load_profiles(pool).await?;
        let count = rows.len();
        let mut profiles = self.profiles.write().expect("wallet lock poisoned");
        for profile in rows {
            profiles.insert(profile.wallet.clone(), profile);
        }
        Ok(count)
    }
}
