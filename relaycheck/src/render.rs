//! Terminal output for probe and dispatch results.

use std::fmt::Write;

use clap::ValueEnum;
use relaycheck_common::Configuration;
use relaycheck_diagnostics::{DiagnosticReport, DispatchResult};

/// Output format for command results.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// The report as a status line followed by one indented block per step.
pub fn report_text(report: &DiagnosticReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", status(report.success), report.message);

    for (step, transcript) in report.transcripts() {
        let _ = writeln!(out, "\n[{step}]");
        for line in transcript.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }

    out
}

/// Renders a probe report.
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn report(report: &DiagnosticReport, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Text => report_text(report),
        Format::Json => serde_json::to_string_pretty(report)?,
    })
}

/// Renders a dispatch result.
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn dispatch(result: &DispatchResult, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Text => format!("{}: {}", status(result.success), result.message),
        Format::Json => serde_json::to_string_pretty(result)?,
    })
}

/// Renders a configuration with its password masked.
///
/// # Errors
///
/// Fails if the configuration cannot be serialized.
pub fn configuration(config: &Configuration, format: Format) -> anyhow::Result<String> {
    let redacted = config.redacted();
    Ok(match format {
        Format::Text => ron::ser::to_string_pretty(&redacted, ron::ser::PrettyConfig::default())?,
        Format::Json => serde_json::to_string_pretty(&redacted)?,
    })
}

const fn status(success: bool) -> &'static str {
    if success { "OK" } else { "FAILED" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_text_is_redacted() {
        let config = Configuration {
            password: Some("hunter2".to_string()),
            username: Some("relay".to_string()),
            from_email: "noreply@example.com".to_string(),
            ..Configuration::default()
        };

        for format in [Format::Text, Format::Json] {
            let rendered = configuration(&config, format).unwrap();
            assert!(!rendered.contains("hunter2"));
            assert!(rendered.contains("********"));
        }
    }

    #[test]
    fn test_dispatch_text() {
        let result = DispatchResult {
            success: false,
            message: "RCPT TO command failed".to_string(),
        };
        assert_eq!(
            dispatch(&result, Format::Text).unwrap(),
            "FAILED: RCPT TO command failed"
        );
    }
}
