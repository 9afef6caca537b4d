// ABOUTME: CouponHub API server binary
// ABOUTME: Loads configuration, opens the database, optionally bootstraps a SuperAdmin and serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! # CouponHub API Server Binary
//!
//! Configuration comes from the environment; the flags below override it.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use couponhub::{
    config::{DatabaseUrl, ServerConfig},
    database::Database,
    logging,
    resources::ServerResources,
    server,
    services::users::bootstrap_super_admin,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "couponhub-server")]
#[command(about = "CouponHub API - coupons, redemptions and invoices for service centers")]
struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database url (`sqlite:./data/couponhub.db` or `sqlite::memory:`)
    #[arg(long)]
    database_url: Option<String>,

    /// Create this SuperAdmin when the users table is empty
    #[arg(long, requires = "bootstrap_admin_password")]
    bootstrap_admin_email: Option<String>,

    /// Password for the bootstrapped SuperAdmin
    #[arg(long, env = "BOOTSTRAP_ADMIN_PASSWORD", hide_env_values = true)]
    bootstrap_admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(url) = &args.database_url {
        config.database_url = DatabaseUrl::parse_url(url);
    }
    config.validate()?;

    logging::init_from_env()?;
    info!("Starting CouponHub API");
    info!("{}", config.summary());

    if let DatabaseUrl::SQLite { path } = &config.database_url {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let database = Database::new(&config.database_url).await?;

    if let (Some(email), Some(password)) =
        (&args.bootstrap_admin_email, &args.bootstrap_admin_password)
    {
        match bootstrap_super_admin(&database, email, password).await? {
            Some(user) => info!(user_id = user.id, "SuperAdmin {} created", user.email),
            None => warn!("Users already exist, skipping SuperAdmin bootstrap"),
        }
    }

    let resources = Arc::new(ServerResources::new(database, config));
    if !resources.email.is_configured() {
        warn!("SMTP credentials missing, invitation and reset emails will not be sent");
    }

    server::run(resources).await
}
