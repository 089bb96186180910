use serde::Serialize;

use crate::cli::OutputFormat;

/// Render a serializable report to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable report in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tally_core::reports::RecoveryReport;

    #[test]
    fn raw_is_single_line() {
        let rendered = render(&RecoveryReport::default(), OutputFormat::Raw).unwrap();
        assert_eq!(
            rendered,
            r#"{"files_found":0,"files_restored":0,"files_skipped":0,"files_failed":0,"events_restored":0}"#
        );
    }

    #[test]
    fn json_is_pretty() {
        let rendered = render(&RecoveryReport::default(), OutputFormat::Json).unwrap();
        assert!(rendered.starts_with("{\n  \"files_found\": 0"));
    }
}
