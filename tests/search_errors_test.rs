use kodegen_tools_searchd::search::errors::*;
use std::time::Duration;

#[test]
fn test_error_transient_detection() {
    let transient = SearchError::WriterAcquisition("lock busy".to_string());
    assert!(transient.is_transient());
    assert!(transient.retry_delay().is_some());

    for permanent in [
        SearchError::Connection("refused".to_string()),
        SearchError::IndexBuild("read-only filesystem".to_string()),
        SearchError::QueueFull,
        SearchError::IndexClosed,
    ] {
        assert!(!permanent.is_transient(), "{permanent:?}");
        assert!(permanent.retry_delay().is_none());
    }
}

#[test]
fn test_store_error_classification() {
    assert!(SearchError::Connection("refused".to_string()).is_store_error());
    assert!(SearchError::Query("syntax".to_string()).is_store_error());
    assert!(!SearchError::IndexWrite("disk full".to_string()).is_store_error());
    assert!(!SearchError::MalformedReference("topic".to_string()).is_store_error());
}

#[test]
fn test_queue_full_message() {
    assert_eq!(SearchError::QueueFull.to_string(), "query queue full");
}

#[test]
fn test_retry_config_delays() {
    let config = RetryConfig::default();

    // Test exponential backoff
    assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
    assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
    assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));

    // Test max delay cap
    assert_eq!(config.delay_for_attempt(10), config.max_delay);
}
