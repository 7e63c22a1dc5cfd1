//! Integration tests for lookup store provisioning, resolution, and teardown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use sqlrouter::error::{ProvisionError, ResolveError, StoreError};
use sqlrouter::key::{extract_key, RouteKey};
use sqlrouter::store::{KeyCollation, Resolver, RouteTarget, StoreSettings};

use common::{create_store, execute, insert_route, writer, QUERY};

fn key(host: &str) -> RouteKey {
    extract_key(host).unwrap()
}

async fn provision(rows: &[(&str, &str, i64)]) -> (tempfile::TempDir, Resolver) {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), rows).await;
    let resolver = Resolver::provision(&StoreSettings::new(path, QUERY))
        .await
        .unwrap();
    (dir, resolver)
}

#[tokio::test]
async fn resolves_inserted_row() {
    let (_dir, resolver) =
        provision(&[("app1", "localhost", 8001), ("app2", "localhost", 8002)]).await;

    let target = resolver.resolve(&key("app1.localhost")).await.unwrap();
    assert_eq!(
        target,
        RouteTarget {
            host: "localhost".into(),
            port: 8001
        }
    );

    let target = resolver.resolve(&key("APP2.localhost:443")).await.unwrap();
    assert_eq!(target.to_string(), "localhost:8002");
}

#[tokio::test]
async fn absent_key_is_not_found() {
    let (_dir, resolver) = provision(&[("app1", "localhost", 8001)]).await;

    let err = resolver.resolve(&key("app3.localhost")).await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound));
}

#[tokio::test]
async fn repeated_resolution_is_idempotent() {
    let (_dir, resolver) = provision(&[("app1", "localhost", 8001)]).await;

    let first = resolver.resolve(&key("app1.localhost")).await.unwrap();
    let second = resolver.resolve(&key("app1.localhost")).await.unwrap();
    assert_eq!(first, second);

    for _ in 0..2 {
        assert!(matches!(
            resolver.resolve(&key("missing.localhost")).await,
            Err(ResolveError::NotFound)
        ));
    }
}

#[tokio::test]
async fn closed_store_is_store_error() {
    let (_dir, resolver) = provision(&[("app1", "localhost", 8001)]).await;

    resolver.close_store().await;
    assert!(resolver.is_closed());

    let err = resolver.resolve(&key("app1.localhost")).await.unwrap_err();
    assert!(matches!(err, ResolveError::Store(StoreError::Query(_))));
}

#[tokio::test]
async fn rows_written_after_provisioning_are_visible() {
    let (dir, resolver) = provision(&[("app1", "localhost", 8001)]).await;

    let mut conn = writer(&dir.path().join("routes.db")).await;
    insert_route(&mut conn, "app9", "10.0.0.9", 9000).await;
    drop(conn);

    let target = resolver.resolve(&key("app9.localhost")).await.unwrap();
    assert_eq!(target.to_string(), "10.0.0.9:9000");
}

#[tokio::test]
async fn missing_database_fails_provisioning() {
    let settings = StoreSettings::new("/nonexistent/path/database.db", QUERY);
    let err = Resolver::provision(&settings).await.unwrap_err();
    assert!(matches!(err, ProvisionError::Open { .. }));
}

#[tokio::test]
async fn provisioning_does_not_create_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.db");

    assert!(Resolver::provision(&StoreSettings::new(&path, QUERY))
        .await
        .is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn malformed_query_fails_provisioning() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[]).await;

    for query in [
        "SELEC host, port FROM route WHERE domain = ?",
        "SELECT host, port FROM no_such_table WHERE domain = ?",
        "SELECT host, port FROM route WHERE no_such_column = ?",
    ] {
        let err = Resolver::provision(&StoreSettings::new(&path, query))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Compile(_)), "query {query:?}");
    }
}

#[tokio::test]
async fn wrong_parameter_count_fails_provisioning() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[]).await;

    let none = Resolver::provision(&StoreSettings::new(&path, "SELECT host, port FROM route"))
        .await
        .unwrap_err();
    assert!(matches!(none, ProvisionError::ParameterCount(0)));

    let two = Resolver::provision(&StoreSettings::new(
        &path,
        "SELECT host, port FROM route WHERE domain = ? AND host = ?",
    ))
    .await
    .unwrap_err();
    assert!(matches!(two, ProvisionError::ParameterCount(2)));
}

#[tokio::test]
async fn named_parameter_fails_provisioning() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[("app1", "localhost", 8001)]).await;

    for (query, name) in [
        ("SELECT host, port FROM route WHERE domain = :domain", ":domain"),
        ("SELECT host, port FROM route WHERE domain = @domain", "@domain"),
        ("SELECT host, port FROM route WHERE domain = $domain", "$domain"),
    ] {
        let err = Resolver::provision(&StoreSettings::new(&path, query))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, ProvisionError::NamedParameter(n) if n == name),
            "query {query:?}: {err}"
        );
    }
}

#[tokio::test]
async fn numbered_parameter_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[("app1", "localhost", 8001)]).await;

    for query in [
        "SELECT host, port FROM route WHERE domain = ?1",
        "SELECT host, port FROM route WHERE domain = $1",
    ] {
        let resolver = Resolver::provision(&StoreSettings::new(&path, query))
            .await
            .unwrap();
        let target = resolver.resolve(&key("app1.localhost")).await.unwrap();
        assert_eq!(target.port, 8001, "query {query:?}");
        resolver.teardown().await.unwrap();
    }
}

#[tokio::test]
async fn single_column_projection_fails_provisioning() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[]).await;

    let err = Resolver::provision(&StoreSettings::new(
        &path,
        "SELECT host FROM route WHERE domain = ?",
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, ProvisionError::ColumnCount(1)));
}

#[tokio::test]
async fn wrong_column_types_are_store_errors() {
    let (dir, resolver) = provision(&[]).await;
    let path = dir.path().join("routes.db");

    execute(
        &path,
        "INSERT INTO route (domain, host, port) VALUES ('textport', 'localhost', 'not-a-port')",
    )
    .await;
    execute(
        &path,
        "INSERT INTO route (domain, host, port) VALUES ('nullhost', NULL, 8001)",
    )
    .await;
    execute(
        &path,
        "INSERT INTO route (domain, host, port) VALUES ('bigport', 'localhost', 70000)",
    )
    .await;

    let err = resolver.resolve(&key("textport.localhost")).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Store(StoreError::Decode { column: "port", .. })
    ));

    let err = resolver.resolve(&key("nullhost.localhost")).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Store(StoreError::Decode { column: "host", .. })
    ));

    let err = resolver.resolve(&key("bigport.localhost")).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Store(StoreError::PortOutOfRange(70000))
    ));
}

#[tokio::test]
async fn locked_store_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[("app1", "localhost", 8001)]).await;

    let mut settings = StoreSettings::new(&path, QUERY);
    settings.busy_timeout = Duration::from_millis(50);
    settings.lookup_timeout = Duration::from_secs(5);
    let resolver = Resolver::provision(&settings).await.unwrap();

    let mut lock_holder = writer(&path).await;
    sqlx::query("BEGIN EXCLUSIVE")
        .execute(&mut lock_holder)
        .await
        .unwrap();

    let err = resolver.resolve(&key("app1.localhost")).await.unwrap_err();
    assert!(matches!(err, ResolveError::Store(_)));

    sqlx::query("ROLLBACK")
        .execute(&mut lock_holder)
        .await
        .unwrap();

    assert!(resolver.resolve(&key("app1.localhost")).await.is_ok());
}

#[tokio::test]
async fn lookup_deadline_is_store_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[("app1", "localhost", 8001)]).await;

    let mut settings = StoreSettings::new(&path, QUERY);
    settings.busy_timeout = Duration::from_secs(5);
    settings.lookup_timeout = Duration::from_millis(100);
    let resolver = Resolver::provision(&settings).await.unwrap();

    let mut lock_holder = writer(&path).await;
    sqlx::query("BEGIN EXCLUSIVE")
        .execute(&mut lock_holder)
        .await
        .unwrap();

    let err = resolver.resolve(&key("app1.localhost")).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Store(StoreError::Timeout(t)) if t == Duration::from_millis(100)
    ));

    sqlx::query("ROLLBACK")
        .execute(&mut lock_holder)
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_lookup_returns_its_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[("app1", "localhost", 8001)]).await;

    let mut settings = StoreSettings::new(&path, QUERY);
    settings.max_connections = 1;
    settings.busy_timeout = Duration::from_secs(5);
    settings.lookup_timeout = Duration::from_secs(10);
    settings.acquire_timeout = Duration::from_secs(3);
    let resolver = Resolver::provision(&settings).await.unwrap();

    let mut lock_holder = writer(&path).await;
    sqlx::query("BEGIN EXCLUSIVE")
        .execute(&mut lock_holder)
        .await
        .unwrap();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(200),
        resolver.resolve(&key("app1.localhost")),
    )
    .await;
    assert!(cancelled.is_err());

    sqlx::query("ROLLBACK")
        .execute(&mut lock_holder)
        .await
        .unwrap();

    let target = tokio::time::timeout(
        settings.acquire_timeout,
        resolver.resolve(&key("app1.localhost")),
    )
    .await
    .expect("connection was not returned to the pool")
    .unwrap();
    assert_eq!(target.to_string(), "localhost:8001");
    assert_eq!(resolver.pool_size(), 1);
}

#[tokio::test]
async fn binary_collation_is_case_sensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[("App1", "localhost", 8001)]).await;

    let settings = StoreSettings::new(
        &path,
        "SELECT host, port FROM route WHERE domain = ? COLLATE route_key",
    );
    let resolver = Resolver::provision(&settings).await.unwrap();

    assert!(matches!(
        resolver.resolve(&key("app1.localhost")).await,
        Err(ResolveError::NotFound)
    ));
}

#[tokio::test]
async fn nocase_collation_matches_mixed_case_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(dir.path(), &[("App1", "localhost", 8001)]).await;

    let mut settings = StoreSettings::new(
        &path,
        "SELECT host, port FROM route WHERE domain = ? COLLATE route_key",
    );
    settings.key_collation = KeyCollation::Nocase;
    let resolver = Resolver::provision(&settings).await.unwrap();

    let target = resolver.resolve(&key("app1.localhost")).await.unwrap();
    assert_eq!(target.port, 8001);
}

#[tokio::test]
async fn concurrent_resolution_shares_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_store(
        dir.path(),
        &[("app1", "localhost", 8001), ("app2", "localhost", 8002)],
    )
    .await;

    let mut settings = StoreSettings::new(&path, QUERY);
    settings.max_connections = 2;
    let resolver = Arc::new(Resolver::provision(&settings).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..64 {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(async move {
            let host = if i % 3 == 0 {
                "app3.localhost"
            } else if i % 2 == 0 {
                "app2.localhost"
            } else {
                "app1.localhost"
            };
            (i, resolver.resolve(&key(host)).await)
        }));
    }

    for handle in handles {
        let (i, outcome) = handle.await.unwrap();
        match outcome {
            Ok(target) if i % 3 != 0 => {
                let expected = if i % 2 == 0 { 8002 } else { 8001 };
                assert_eq!(target.port, expected);
            }
            Err(ResolveError::NotFound) if i % 3 == 0 => {}
            other => panic!("task {i}: unexpected outcome {other:?}"),
        }
    }

    assert!(resolver.pool_size() <= 2);
}

#[tokio::test]
async fn teardown_closes_the_store() {
    let (_dir, resolver) = provision(&[("app1", "localhost", 8001)]).await;
    assert!(!resolver.is_closed());
    resolver.teardown().await.unwrap();
}

#[tokio::test]
async fn teardown_after_closing_in_place() {
    let (_dir, resolver) = provision(&[]).await;
    resolver.close_store().await;
    resolver.teardown().await.unwrap();
}
