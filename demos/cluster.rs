//! Example: Redis Cluster operations with automatic redirect handling.
//!
//! Requirements:
//! - Redis Cluster running on localhost (ports 7000-7005)
//!
//! Quick setup with Docker:
//! ```bash
//! docker run -d --name redis-cluster -p 7000-7005:7000-7005 \
//!   grokzen/redis-cluster:latest
//! ```
//!
//! Run with routing logs:
//! ```bash
//! RUST_LOG=shardlink=debug cargo run --example cluster
//! ```

use std::time::Duration;

use shardlink::{key_slot, ClusterBuilder, Cmd, Frame};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> shardlink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("=== Shardlink Redis Cluster Example ===\n");

    println!("1. Connecting to Redis Cluster...");
    let client = ClusterBuilder::new()
        .node("127.0.0.1:7000,127.0.0.1:7001,127.0.0.1:7002")
        .reconnect_interval(Duration::from_millis(500))
        .span(tracing::info_span!("cluster", name = "demo"))
        .build()
        .await?;
    if !client.slots_initialized() {
        println!("   No startup node answered CLUSTER SLOTS, giving up.");
        return Err(shardlink::Error::TopologyUnavailable);
    }

    println!("\n2. Checking cluster topology...");
    println!("   Cluster nodes: {}", client.node_count().await);
    println!("   All slots covered: {}", client.is_fully_covered().await);

    println!("\n3. Basic operations (automatic routing)...");
    let key = "user:1000:name";
    let slot = key_slot(key);
    if let Some(node) = client.node_for_slot(slot).await {
        println!("   '{}' hashes to slot {} served by {}", key, slot, node);
    }
    client.set(key, "Alice").await?;
    if let Some(value) = client.get(key).await? {
        println!("   Value: {}", String::from_utf8_lossy(&value));
    }
    println!("   Exists: {}", client.exists(key).await?);
    println!("   Visits: {}", client.incr("user:1000:visits").await?);
    println!("   Expire set: {}", client.expire("user:1000:visits", 60).await?);

    println!("\n4. Hash tags keep related keys on one slot...");
    for key in ["{user:1000}:profile", "{user:1000}:posts"] {
        println!("   {} -> slot {}", key, key_slot(key));
    }

    println!("\n5. Server errors come back as values...");
    let reply = client
        .send_command(Cmd::new("INCR").arg(key))
        .await?;
    if let Frame::Error(text) = reply {
        println!("   INCR on a string: {}", String::from_utf8_lossy(&text));
    }

    println!("\n6. Redirects after flushing the slot table...");
    client.flush_slots_cache().await;
    println!("   Value after flush: {:?}", client.get(key).await?);
    println!("   Refresh pending: {}", client.refresh_pending());

    client.del(key).await?;
    client.del("user:1000:visits").await?;
    println!("\nDone.");
    Ok(())
}
