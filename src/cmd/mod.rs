//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`init`], [`validate`], [`resolve`] or
//! [`health`]. Each handler lives in its own submodule.

pub mod health;
pub mod init;
pub mod resolve;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands, StoreArgs};
use crate::config::model::{Config, ProxyConfig, StoreConfig};
use crate::config::{self, validation};
use crate::error::SqlRouterError;

pub async fn dispatch(cli: Cli) -> Result<(), SqlRouterError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Resolve(args)) => resolve::execute(args).await,
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

/// Load the config file (explicit or auto-detected) and apply CLI overrides.
/// Without a file, `--db-path` and `--query` together form the whole config.
pub async fn resolve_config(args: &StoreArgs) -> Result<Config, SqlRouterError> {
    let mut config = match config::locate(args.config.as_deref()).await {
        Some(path) => config::load_file(&path).await?,
        None => match (&args.db_path, &args.query) {
            (Some(path), Some(query)) => Config {
                store: StoreConfig::new(path.clone(), query.clone()),
                proxy: ProxyConfig::default(),
            },
            _ => {
                return Err(SqlRouterError::NoConfigSource {
                    hint: "Provide --config <file>, or both --db-path and --query.\n  \
                           Run 'sqlrouter init' to create a config file."
                        .into(),
                })
            }
        },
    };

    if let Some(ref path) = args.db_path {
        config.store.path.clone_from(path);
    }
    if let Some(ref query) = args.query {
        config.store.query.clone_from(query);
    }

    validation::validate(&config).map_err(|errors| SqlRouterError::ConfigValidation { errors })?;
    Ok(config)
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  sqlrouter v{version} \u{2014} host-based reverse proxy backed by SQLite\n\n  \
         No command provided. To get started:\n\n    \
         sqlrouter init                    Generate a starter config\n    \
         sqlrouter run                     Start the proxy (auto-detects ./sqlrouter.yaml)\n    \
         sqlrouter resolve <host>          Show where a host is routed\n    \
         sqlrouter --help                  See all commands and options\n"
    );
}
