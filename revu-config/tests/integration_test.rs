//! Integration tests for revu-config

use revu_config::*;
use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;

#[test]
fn test_default_config_validation() {
    let config = RevuConfig::default();
    assert!(config.validate_all().is_ok());
    assert_eq!(config.coordination.key_prefix, "revu");
    assert_eq!(config.coordination.backend, CoordinationBackend::Memory);
    assert_eq!(config.scrape.retention, Duration::from_secs(86400));
    assert_eq!(config.scrape.cancel_ttl, Duration::from_secs(3600));
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("REVU_REDIS_URL", Some("redis://cache:6379/1")),
        ("REVU_KEY_PREFIX", Some("staging")),
        ("REVU_SCRAPE_LOCK_TTL", Some("1800")),
        ("REVU_DAILY_SCRAPE_LIMIT", Some("10")),
        ("REVU_SCRAPER_MAX_REVIEWS", Some("120")),
        ("REVU_LOG_LEVEL", Some("debug")),
        ("REVU_SERVER_PORT", Some("9090")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();

        assert_eq!(config.coordination.backend, CoordinationBackend::Redis);
        assert_eq!(config.coordination.redis_url, "redis://cache:6379/1");
        assert_eq!(config.coordination.key_prefix, "staging");
        assert_eq!(config.scrape.lock_ttl, Duration::from_secs(1800));
        assert_eq!(config.scrape.daily_limit, 10);
        assert_eq!(config.scrape.max_reviews, 120);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.server.port, 9090);
    });
}

#[test]
fn test_negative_daily_limit_accepted_from_env() {
    with_vars(vec![("REVU_DAILY_SCRAPE_LIMIT", Some("-1"))], || {
        let config = ConfigLoader::new().from_env().unwrap();
        assert!(!config.scrape.rate_limit_enabled());
    });
}

#[test]
fn test_invalid_env_value() {
    with_vars(vec![("REVU_SCRAPE_LOCK_TTL", Some("an hour"))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    });
}

#[test]
fn test_empty_prefix_from_env_rejected() {
    with_vars(vec![("REVU_KEY_PREFIX", Some(""))], || {
        let result = ConfigLoader::new().from_env();
        assert!(matches!(result, Err(ConfigError::DomainError { ref domain, .. }) if domain == "coordination"));
    });
}

#[test]
fn test_yaml_config_round_trip() {
    let yaml = RevuConfig::generate_sample();
    let parsed: RevuConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
    assert_eq!(parsed.scrape.lock_ttl, Duration::from_secs(3600));
}

#[test]
fn test_config_from_file() {
    let yaml = r#"
coordination:
  backend: redis
  redis_url: "redis://localhost:6379/2"
  key_prefix: "revu-test"

scrape:
  lock_ttl: 900
  daily_limit: 5
  retention: 3600
  max_pages: 10

logging:
  level: warn
  format: json

server:
  bind_address: "0.0.0.0"
  port: 8080
"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars(vec![("REVU_LOG_LEVEL", None::<&str>), ("REVU_REDIS_URL", None::<&str>)], || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        assert_eq!(config.coordination.backend, CoordinationBackend::Redis);
        assert_eq!(config.coordination.key_prefix, "revu-test");
        assert_eq!(config.scrape.lock_ttl, Duration::from_secs(900));
        assert_eq!(config.scrape.daily_limit, 5);
        assert_eq!(config.scrape.max_pages, 10);
        assert_eq!(config.scrape.max_reviews, 300);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.socket_address(), "0.0.0.0:8080");
    });
}

#[test]
fn test_file_with_retention_below_lock_ttl_rejected() {
    let yaml = "scrape:\n  lock_ttl: 7200\n  retention: 60\n";
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars(vec![("REVU_SCRAPE_LOCK_TTL", None::<&str>)], || {
        let result = ConfigLoader::new().from_file(file.path());
        assert!(matches!(result, Err(ConfigError::DomainError { ref domain, .. }) if domain == "scrape"));
    });
}
