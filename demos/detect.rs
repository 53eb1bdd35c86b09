use std::env;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use swshell::config::PoolConfig;
use swshell::device::SignatureCatalog;
use swshell::diagnostics::UnknownDeviceLog;
use swshell::session::{ConnectionSecurityOptions, DeviceTarget, SessionPool};

fn print_usage() {
    eprintln!(
        "Usage: cargo run --example detect -- <catalog.json> <user> <password> <host> [port] [--legacy] [--config pool.json] [command...]"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        print_usage();
        process::exit(2);
    }

    let catalog_path = &args[1];
    let user = &args[2];
    let password = &args[3];
    let host = &args[4];

    let mut port = 22u16;
    let mut security = ConnectionSecurityOptions::secure_default();
    let mut config = PoolConfig::default();
    let mut commands = Vec::new();

    let mut rest = args.iter().skip(5).peekable();
    if let Some(candidate) = rest.peek()
        && let Ok(parsed) = candidate.parse::<u16>()
    {
        port = parsed;
        rest.next();
    }
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--legacy" => security = ConnectionSecurityOptions::legacy_compatible(),
            "--config" => {
                let path = rest.next().context("--config needs a path")?;
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading pool config {path}"))?;
                config = PoolConfig::from_json_str(&raw)?;
            }
            other => commands.push(other.to_string()),
        }
    }

    let catalog = SignatureCatalog::from_path(catalog_path)
        .with_context(|| format!("loading signature catalog {catalog_path}"))?;
    println!("loaded {} signatures", catalog.len());

    let pool = SessionPool::with_ssh(
        Arc::new(catalog),
        Arc::new(UnknownDeviceLog::default()),
        config,
        security,
    )?;
    let target = DeviceTarget::new(user.as_str(), password.as_str(), host.as_str(), port);

    let brand = pool.brand(&target).await?;
    if brand.is_empty() {
        println!("brand=<unknown> (probe output appended to the unknown-device log)");
    } else {
        println!("brand={brand}");
    }

    if !commands.is_empty() {
        let output = pool.run_commands(&target, Some(brand.as_str()), &commands).await?;
        println!("{output}");
    }

    pool.shutdown().await;
    Ok(())
}
