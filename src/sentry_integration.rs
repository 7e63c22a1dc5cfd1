//! Optional Sentry error tracking.
//!
//! Store failures and teardown errors are logged at `error`, which the
//! `sentry-tracing` layer installed by [`logging::init`](crate::logging::init)
//! forwards as Sentry events. Hold the returned guard for the lifetime of
//! the process so buffered events are flushed on exit.

pub fn init(dsn: &str, environment: Option<&str>) -> sentry::ClientInitGuard {
    let dsn = dsn
        .parse()
        .map_err(|e| tracing::warn!(error = %e, "invalid Sentry DSN, error tracking disabled"))
        .ok();

    sentry::init(sentry::ClientOptions {
        dsn,
        environment: environment.map(|e| e.to_owned().into()),
        release: Some(concat!("sqlrouter@", env!("CARGO_PKG_VERSION")).into()),
        ..Default::default()
    })
}
