//! Standalone registry node
//!
//! Run with: cargo run --example standalone_node <REGISTRY_URL> [ENDPOINT]
//!
//! Examples:
//!   # provider side, announces one endpoint
//!   cargo run --example standalone_node "standalone://127.0.0.1:4234?role=server" \
//!       "rpc://10.0.0.1:20880/com.acme.Foo?dynamic=true"
//!
//!   # consumer side, watches everything the provider knows about
//!   cargo run --example standalone_node "standalone://127.0.0.1:4234?timeout=500"
//!
//! With no ENDPOINT the node subscribes to `*` and prints every
//! notification. Expired providers are cleaned every 30 seconds.

use std::sync::Arc;
use std::time::Duration;

use standalone_registry::{Endpoint, Listener, MemoryDirectory, RegistryConfig, StandaloneRegistry};

const CLEAN_INTERVAL: Duration = Duration::from_secs(30);

fn print_usage() {
    println!("Usage: standalone_node <REGISTRY_URL> [ENDPOINT]");
    println!();
    println!("REGISTRY_URL parameters:");
    println!("  role=server     listen for the peer instead of connecting to it");
    println!("  timeout=<ms>    how long subscribe waits for the first reply");
    println!("  backlog=<n>     listen backlog (server role only)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("standalone_registry=debug".parse()?)
                .add_directive("standalone_node=debug".parse()?),
        )
        .init();

    let config = RegistryConfig::from_url(&args[1])?;
    let announce: Option<Endpoint> = args.get(2).map(|s| s.parse()).transpose()?;

    let registry = StandaloneRegistry::new(config, Arc::new(MemoryDirectory::new())).await?;
    println!("Registry up as {} on {}", registry.role(), registry.local_addr());

    match &announce {
        Some(endpoint) => {
            registry.register(endpoint).await;
            println!("Registered {}", endpoint);
        }
        None => {
            let key: Endpoint = "admin://0.0.0.0/*?interface=*&group=*&version=*&category=*".parse()?;
            let listener: Listener = Arc::new(|endpoints: &[Endpoint]| {
                println!("Notified with {} endpoint(s)", endpoints.len());
                for endpoint in endpoints {
                    println!("  {}", endpoint);
                }
            });
            registry.subscribe(&key, listener).await;
        }
    }

    let mut clean = tokio::time::interval(CLEAN_INTERVAL);
    clean.tick().await;

    loop {
        tokio::select! {
            _ = clean.tick() => {
                let evicted = registry.clean().await;
                if evicted > 0 {
                    println!("Cleaned {} expired endpoint(s)", evicted);
                }
                if !registry.is_available() {
                    println!("Link is down, exiting");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    if let Some(endpoint) = &announce {
        registry.unregister(endpoint).await;
    }
    registry.destroy().await;

    let stats = registry.stats();
    println!(
        "Lines received: {}, sent: {}, dropped: {}",
        stats.lines_received, stats.lines_sent, stats.writes_dropped
    );

    Ok(())
}
