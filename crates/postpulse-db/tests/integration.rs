//! Offline unit tests for postpulse-db pool configuration and row types.
//! These tests do not require a live database connection.

use postpulse_core::{AppConfig, ContentRecord, Environment};
use postpulse_db::{ContentRow, PoolConfig, SnapshotRow};
use rust_decimal::Decimal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        api_key_hash_salt: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        snapshot_window_days: 90,
        snapshot_batch_size: 400,
        snapshot_refresh_cron: None,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn content_row_converts_to_record() {
    let row = ContentRow {
        id: "c1".to_string(),
        user_id: "u1".to_string(),
        text: "hello".to_string(),
        hashtags: vec!["launch".to_string()],
        content_type: Some("reel".to_string()),
        created_at: None,
    };

    let record = ContentRecord::from(row);
    assert_eq!(record.id, "c1");
    assert_eq!(record.hashtags, vec!["launch".to_string()]);
    assert_eq!(record.content_type.as_deref(), Some("reel"));
}

#[test]
fn snapshot_row_with_foreign_document_fails_to_decode() {
    let row = SnapshotRow {
        user_id: "u1".to_string(),
        snapshot_id: "s1".to_string(),
        content_id: None,
        status: "gold".to_string(),
        score: Decimal::new(1250, 3),
        document: serde_json::json!({ "unexpected": true }),
        generated_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };

    assert!(row.into_stored().is_err());
}
