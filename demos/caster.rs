//! NTRIP caster example
//!
//! Run with: cargo run --example caster [CONFIG] [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example caster                            # reads ./config.json
//!   cargo run --example caster caster.json                # reads caster.json
//!   cargo run --example caster caster.json 127.0.0.1:2102 # overrides bind address
//!
//! ## Push corrections (source)
//!
//! With str2str (RTKLIB):
//!   str2str -in serial://ttyUSB0:115200 -out ntrips://:secret@localhost:2101/TEST1
//!
//! ## Pull corrections (client)
//!
//! With str2str:
//!   str2str -in ntrip://localhost:2101/TEST1 -out file://out.rtcm3
//!
//! ## Sourcetable
//!
//!   curl -A "NTRIP curl" http://localhost:2101/

use std::net::SocketAddr;

use ntrip_caster::{CasterConfig, CasterServer};

fn print_usage() {
    eprintln!("Usage: caster [CONFIG] [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  CONFIG       JSON configuration file (default: config.json)");
    eprintln!("  BIND_ADDR    Overrides ServerAddress/ServerPort, e.g. 127.0.0.1:2101");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ntrip_caster=info".parse()?)
                .add_directive("caster=info".parse()?),
        )
        .init();

    let path = args.get(1).map(String::as_str).unwrap_or("config.json");
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", path, e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let (mut server_config, catalog) = CasterConfig::from_json(&json)?.into_parts()?;
    if let Some(addr) = args.get(2) {
        let addr: SocketAddr = addr.parse()?;
        server_config = server_config.bind(addr);
    }

    let server = CasterServer::new(server_config, catalog);

    println!("Starting NTRIP caster on {}", server.bind_addr());
    println!(
        "  client queue: {:?}, sources: {:?}",
        server.config().queue_policy,
        server.config().source_policy
    );
    for source in server.catalog().sources() {
        println!(
            "  mountpoint /{} ({}, {})",
            source.mountpoint,
            source.identifier,
            if source.auth_required { "auth" } else { "open" }
        );
    }

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
