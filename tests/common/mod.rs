//! Scratch lookup stores for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

pub const QUERY: &str = "SELECT host, port FROM route WHERE domain = ?";

/// Open a writable connection, creating the database if needed.
pub async fn writer(path: &Path) -> SqliteConnection {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap()
}

/// Create `routes.db` in `dir` with a `route(domain, host, port)` table.
pub async fn create_store(dir: &Path, rows: &[(&str, &str, i64)]) -> PathBuf {
    let path = dir.join("routes.db");
    let mut conn = writer(&path).await;

    sqlx::query("CREATE TABLE route (domain TEXT PRIMARY KEY, host TEXT, port INTEGER)")
        .execute(&mut conn)
        .await
        .unwrap();

    for (domain, host, port) in rows {
        insert_route(&mut conn, domain, host, *port).await;
    }

    conn.close().await.unwrap();
    path
}

pub async fn insert_route(conn: &mut SqliteConnection, domain: &str, host: &str, port: i64) {
    sqlx::query("INSERT INTO route (domain, host, port) VALUES (?, ?, ?)")
        .bind(domain)
        .bind(host)
        .bind(port)
        .execute(conn)
        .await
        .unwrap();
}

/// Run arbitrary SQL against the store with a short-lived writer.
pub async fn execute(path: &Path, sql: &str) {
    let mut conn = writer(path).await;
    sqlx::query(sql).execute(&mut conn).await.unwrap();
    conn.close().await.unwrap();
}
