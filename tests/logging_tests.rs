use nomos_prices::config::LoggingConfig;
use nomos_prices::logging::{get_logger, init_logging, parse_log_level, resolve_level};
use tracing::Level;

#[test]
fn per_sink_level_falls_back_to_base() {
    assert_eq!(resolve_level(Some("debug"), Level::INFO), Level::DEBUG);
    assert_eq!(resolve_level(Some("nonsense"), Level::INFO), Level::INFO);
    assert_eq!(resolve_level(None, Level::ERROR), Level::ERROR);
}

#[test]
fn invalid_level_is_configuration_error() {
    let err = parse_log_level("LOUD").unwrap_err();
    assert!(err.to_string().contains("Invalid log level: LOUD"));
}

#[test]
fn file_logging_initializes_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        file: dir.path().join("nomos.log").to_string_lossy().to_string(),
        console_output: false,
        ..LoggingConfig::default()
    };

    init_logging(&config).unwrap();
    // Later calls report the first outcome instead of reinstalling
    init_logging(&LoggingConfig::default()).unwrap();

    get_logger("aggregator").info("Snapshot built");
}
