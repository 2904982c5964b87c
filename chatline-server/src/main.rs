//! Chatline chat server

mod args;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use args::Args;
use chatline_server::constants::*;
use chatline_server::credentials::{CredentialStore, MemoryStore};
use chatline_server::db::{self, Database};
use chatline_server::{Server, ServerHandle};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    info!("{}{}", MSG_BANNER, env!("CARGO_PKG_VERSION"));

    let store = if args.memory_store {
        info!("{}", MSG_MEMORY_STORE);
        Arc::new(MemoryStore::new()) as Arc<dyn CredentialStore>
    } else {
        setup_db(args.database.clone()).await
    };

    let config = args.server_config();
    if let Some(path) = &config.chat_log {
        info!(path = %path.display(), "{}", MSG_CHAT_LOG);
    }

    let server = match Server::bind(config, store).await {
        Ok(server) => server,
        Err(e) => {
            error!(addr = %args.bind, port = args.port, err = %e, "{}", ERR_BIND);
            std::process::exit(1);
        }
    };

    tokio::spawn(shutdown_on_signal(server.handle()));

    if let Err(e) = server.run().await {
        error!(err = %e, "server stopped with error");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `--debug` selects debug level
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_target(false)
        .init();
}

/// Open the account database, exiting on failure
async fn setup_db(database_path: Option<PathBuf>) -> Arc<dyn CredentialStore> {
    let db_path = database_path.unwrap_or_else(|| match db::default_database_path() {
        Ok(path) => path,
        Err(e) => {
            error!(err = %e, "{}", ERR_DATABASE_INIT);
            std::process::exit(1);
        }
    });

    let pool = match db::init_db(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(path = %db_path.display(), err = %e, "{}", ERR_DATABASE_INIT);
            std::process::exit(1);
        }
    };

    #[cfg(unix)]
    if let Err(e) = set_secure_permissions(&db_path) {
        error!(path = %db_path.display(), err = %e, "{}", ERR_SET_PERMISSIONS);
        std::process::exit(1);
    }

    let database = Database::new(pool);
    match database.users.count().await {
        Ok(count) => info!(path = %db_path.display(), accounts = count, "{}", MSG_DATABASE),
        Err(e) => warn!(err = %e, "could not count accounts"),
    }

    Arc::new(database.users)
}

#[cfg(unix)]
fn set_secure_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(0o600);
    std::fs::set_permissions(path, permissions)
}

async fn shutdown_on_signal(handle: ServerHandle) {
    if let Err(e) = wait_for_signal().await {
        error!(err = %e, "{}", ERR_SIGNAL);
        return;
    }
    handle.shutdown();
}

async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
