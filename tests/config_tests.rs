//! Tests for the configuration builder and the environment loader

use std::path::Path;
use std::time::Duration;

use kodegen_tools_searchd::search::SearchError;
use kodegen_tools_searchd::{DatabaseConfig, SearchConfig};
use tantivy::tokenizer::Language;
use tempfile::TempDir;

#[test]
fn test_defaults_match_the_service_defaults() {
    let config = SearchConfig::default();

    assert_eq!(config.max_queued(), 5);
    assert_eq!(config.min_sync_age(), Duration::from_millis(100));
    assert_eq!(config.refresh_interval(), Duration::from_secs(120));
    assert_eq!(config.batch_size(), 4096);
    assert_eq!(config.max_results(), 100);
    assert_eq!(config.index_path(), Path::new("search.tantivy"));
    assert_eq!(config.schema_file(), Path::new("search-schema.json"));
    assert_eq!(config.language(), Language::German);

    let db = config.database();
    assert_eq!(db.name(), "openslides");
    assert_eq!(db.host(), "localhost");
    assert_eq!(db.port(), 5432);
}

#[test]
fn test_builder_overrides_fields() {
    let config = SearchConfig::builder()
        .max_queued(16)
        .batch_size(128)
        .refresh_interval(Duration::from_secs(30))
        .db_host("db.internal")
        .db_port(6432)
        .build()
        .unwrap();

    assert_eq!(config.max_queued(), 16);
    assert_eq!(config.batch_size(), 128);
    assert_eq!(config.refresh_interval(), Duration::from_secs(30));
    assert_eq!(config.database().host(), "db.internal");
    assert_eq!(config.database().port(), 6432);
    assert_eq!(config.database().user(), "openslides");
}

#[test]
fn test_builder_rejects_invalid_values() {
    let invalid = [
        SearchConfig::builder().max_queued(0).build(),
        SearchConfig::builder().batch_size(0).build(),
        SearchConfig::builder().max_results(0).build(),
        SearchConfig::builder().refresh_interval(Duration::ZERO).build(),
        SearchConfig::builder().writer_memory(1024).build(),
        SearchConfig::builder().index_path("").build(),
    ];

    for result in invalid {
        assert!(matches!(result, Err(SearchError::Config(_))), "{result:?}");
    }
}

#[test]
fn test_database_config_can_be_replaced_whole() {
    let database = SearchConfig::builder()
        .db_name("meetings")
        .db_password("hunter2")
        .build()
        .unwrap()
        .database()
        .clone();

    let config = SearchConfig::builder().database(database).build().unwrap();
    assert_eq!(config.database().name(), "meetings");
    assert_eq!(config.database().password(), "hunter2");
    assert_eq!(DatabaseConfig::default().name(), "openslides");
}

#[test]
fn test_environment_overrides_defaults() {
    let config = SearchConfig::from_lookup(|key| {
        match key {
            "SEARCHD_MAX_QUEUED" => Some("10"),
            "SEARCHD_INDEX_UPDATE_INTERVAL" => Some("30"),
            "SEARCHD_INDEX_AGE" => Some("250ms"),
            "SEARCHD_LANGUAGE" => Some("en"),
            "SEARCHD_DB_HOST" => Some("postgres"),
            _ => None,
        }
        .map(str::to_string)
    })
    .unwrap();

    assert_eq!(config.max_queued(), 10);
    assert_eq!(config.refresh_interval(), Duration::from_secs(30));
    assert_eq!(config.min_sync_age(), Duration::from_millis(250));
    assert_eq!(config.language(), Language::English);
    assert_eq!(config.database().host(), "postgres");
}

#[test]
fn test_environment_error_names_variable() {
    let err = SearchConfig::from_lookup(|key| {
        (key == "SEARCHD_INDEX_BATCH").then(|| "many".to_string())
    })
    .unwrap_err();

    assert!(matches!(err, SearchError::Config(_)));
    assert!(err.to_string().contains("SEARCHD_INDEX_BATCH"), "{err}");
}

#[test]
fn test_password_is_read_from_secret_file() {
    let secrets = TempDir::new().unwrap();
    std::fs::write(secrets.path().join("postgres_password"), "s3cret\n").unwrap();
    let secrets_dir = secrets.path().to_string_lossy().into_owned();

    let config = SearchConfig::from_lookup(|key| match key {
        "SEARCHD_SECRETS_DIR" => Some(secrets_dir.clone()),
        "SEARCHD_DB_PASSWORD" => Some("secret:postgres_password".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.database().password(), "s3cret");
}
