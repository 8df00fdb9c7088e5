use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use garagesale::auth::Authenticator;
use garagesale::config::Config;
use garagesale::store::{self, MemoryStore, PgStore, Store};
use garagesale::{Server, Shutdown, ShutdownReason, handlers, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    telemetry::init_tracing(&config.log)?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting");
    info!(?config, "config");

    let result = run(config).await;
    info!("completed");
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let private_pem = std::fs::read(&config.auth.private_key_file)
        .with_context(|| format!("reading auth private key {}", config.auth.private_key_file.display()))?;
    let public_pem = std::fs::read(&config.auth.public_key_file)
        .with_context(|| format!("reading auth public key {}", config.auth.public_key_file.display()))?;
    let authenticator = Authenticator::from_pem(&private_pem, &public_pem, &config.auth.key_id, &config.auth.algorithm)
        .context("constructing authenticator")?;

    let (store, pg): (Arc<dyn Store>, Option<PgStore>) = match config.db.postgres() {
        Some(db) => {
            let pg = PgStore::open(&db).context("opening database")?;
            (Arc::new(pg.clone()), Some(pg))
        }
        None => {
            warn!("no database configured, using the in-memory store with demo data");
            let memory = MemoryStore::new();
            store::seed(&memory, Utc::now(), bcrypt::DEFAULT_COST).await.context("seeding demo data")?;
            (Arc::new(memory), None)
        }
    };

    if let Some(addr) = config.web.debug {
        telemetry::init_metrics(addr)?;
        info!(%addr, "metrics listening");
    }

    let shutdown = Shutdown::new();
    let app = handlers::api(shutdown, store, Arc::new(authenticator));
    let server = Server::bind(&config.web.address)
        .await
        .with_context(|| format!("binding {}", config.web.address))?
        .grace_period(config.web.shutdown_timeout());

    let reason = server.serve(app).await.context("serving")?;

    if let Some(pg) = pg {
        pg.close().await;
    }

    match reason {
        ShutdownReason::Signal => Ok(()),
        ShutdownReason::Integrity(detail) => {
            bail!("integrity error detected, asked for self shutdown: {detail}")
        }
    }
}
