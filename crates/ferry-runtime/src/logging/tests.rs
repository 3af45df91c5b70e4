//! Tests for log settings.

use rstest::rstest;

use super::*;

#[rstest]
#[case("json", LogFormat::Json)]
#[case("Compact", LogFormat::Compact)]
#[case("COMPACT", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] raw: &str, #[case] expected: LogFormat) {
    assert_eq!(raw.parse::<LogFormat>().expect("parse"), expected);
}

#[test]
fn log_format_rejects_unknown_names() {
    let err: Result<LogFormat, LogFormatParseError> = "yaml".parse();
    assert!(err.is_err());
}

#[test]
fn log_format_displays_in_snake_case() {
    assert_eq!(LogFormat::Json.to_string(), "json");
    assert_eq!(LogFormat::Compact.to_string(), "compact");
}

#[test]
fn default_settings_are_info_and_compact() {
    let settings = LogSettings::default();
    assert_eq!(settings.filter(), "info");
    assert_eq!(settings.format(), LogFormat::Compact);
}
