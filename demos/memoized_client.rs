//! Example wrapping two client methods with one shared store.
//!
//! Each method gets its own identity, so the two wrapped functions can share a
//! store (and even a registry) without ever seeing each other's entries.
//!
//! Run with `RUST_LOG=swr_dedupe=debug cargo run --example memoized_client`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use swr_dedupe::{Identity, MokaStore, MokaStoreConfig, SwrCache, SwrConfig};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Clone)]
struct UserClient;

impl UserClient {
    async fn fetch_user(&self, id: u64) -> Result<User, std::io::Error> {
        println!("  -> origin fetch for user {}", id);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(User {
            id,
            name: format!("user-{}", id),
        })
    }

    async fn fetch_team(&self, id: u64) -> Result<User, std::io::Error> {
        println!("  -> origin fetch for team {}", id);
        Ok(User {
            id,
            name: format!("team-{}", id),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = Arc::new(MokaStore::new(MokaStoreConfig::default()));
    let cache: SwrCache<User> = SwrCache::builder(store)
        .config(SwrConfig::from_secs_f64(0.2, 5.0)?)
        .build();

    let client = UserClient;

    let fetch_user = {
        let client = client.clone();
        cache.wrap(Identity::of::<UserClient>("fetch_user"), move |id: u64| {
            let client = client.clone();
            async move { client.fetch_user(id).await }
        })
    };
    let fetch_team = cache.wrap(Identity::of::<UserClient>("fetch_team"), move |id: u64| {
        let client = client.clone();
        async move { client.fetch_team(id).await }
    });

    // Three concurrent misses for the same key: one origin fetch.
    println!("concurrent misses:");
    let (a, b, c) = tokio::join!(fetch_user.call(1), fetch_user.call(1), fetch_user.call(1));
    println!("  {:?}\n  {:?}\n  {:?}", a?, b?, c?);

    // Same argument, different method: separate entry.
    println!("other identity:");
    println!("  {:?}", fetch_team.call(1).await?);

    println!("fresh hit:");
    println!("  {:?}", fetch_user.call_with_status(1).await?);

    tokio::time::sleep(Duration::from_millis(250)).await;
    println!("stale hit (served instantly, refreshed in background):");
    println!("  {:?}", fetch_user.call_with_status(1).await?);

    cache.settled().await;
    println!("after background refresh:");
    println!("  {:?}", fetch_user.call_with_status(1).await?);

    Ok(())
}
