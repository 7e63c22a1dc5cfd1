//! `sqlrouter resolve`: run one lookup the way the proxy would.
//!
//! Provisions the store from the usual config sources, extracts the
//! routing key from the given host, prints the upstream (or why there is
//! none), and tears the store down again.

use crate::cli::ResolveArgs;
use crate::error::{ResolveError, SqlRouterError};
use crate::key::extract_key;
use crate::router::Rejection;
use crate::store::Resolver;

pub async fn execute(args: ResolveArgs) -> Result<(), SqlRouterError> {
    let Some(key) = extract_key(&args.host) else {
        let rejection = Rejection::InvalidHost;
        println!(
            "\u{2717} {}: {} ({})",
            args.host,
            rejection.body(),
            rejection.status()
        );
        return Ok(());
    };

    let config = super::resolve_config(&args.store).await?;
    let resolver = Resolver::provision(&config.store.to_settings()).await?;

    let outcome = resolver.resolve(&key).await;
    if let Err(e) = resolver.teardown().await {
        eprintln!("warning: {e}");
    }

    match outcome {
        Ok(target) => {
            println!("\u{2713} {} (key '{key}') -> {target}", args.host);
            Ok(())
        }
        Err(ResolveError::NotFound) => {
            let rejection = Rejection::NotFound;
            println!(
                "\u{2717} {} (key '{key}'): {} ({})",
                args.host,
                rejection.body(),
                rejection.status()
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
