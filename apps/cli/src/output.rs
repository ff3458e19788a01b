use std::io::{self, Write};

use nasnet_validation::PipelineResult;

use crate::args::OutputFormat;

pub fn render(
    result: &PipelineResult,
    format: OutputFormat,
    out: &mut impl Write,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => render_text(result, out),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)
        }
    }
}

fn render_text(result: &PipelineResult, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{:<16} {:<8} {:>6} {:>8} {:>6}", "STAGE", "STATUS", "ERRORS", "WARNINGS", "MS")?;
    for stage in &result.stages {
        let ms = stage
            .duration_ms
            .map_or_else(|| "-".to_owned(), |ms| ms.to_string());
        writeln!(
            out,
            "{:<16} {:<8} {:>6} {:>8} {:>6}",
            stage.stage.as_str(),
            stage.status.to_string(),
            stage.errors.len(),
            stage.warnings.len(),
            ms,
        )?;
    }

    if !result.errors.is_empty() || !result.warnings.is_empty() {
        writeln!(out)?;
    }
    for issue in &result.errors {
        writeln!(out, "error   {issue}")?;
        for suggestion in &issue.suggestions {
            writeln!(out, "        hint: {suggestion}")?;
        }
    }
    for issue in &result.warnings {
        writeln!(out, "warning {issue}")?;
    }

    writeln!(out)?;
    writeln!(out, "{}", result.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasnet_validation::{StageName, StageResult, ValidationError};
    use std::time::Duration;

    fn sample() -> PipelineResult {
        let stages = StageName::ALL
            .into_iter()
            .map(|stage| match stage {
                StageName::Schema => StageResult::from_issues(
                    stage,
                    vec![
                        ValidationError::new(stage, "REQUIRED", "name is required")
                            .with_field("name")
                            .with_suggestion("Give the bridge a name"),
                    ],
                )
                .with_duration(Duration::from_millis(3)),
                _ => StageResult::skipped(stage),
            })
            .collect();
        PipelineResult::from_stages(stages, Duration::from_millis(3))
    }

    #[test]
    fn text_lists_stages_issues_and_summary() {
        let mut buf = Vec::new();
        render(&sample(), OutputFormat::Text, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("STAGE"));
        let schema_row: Vec<_> = text
            .lines()
            .find(|line| line.starts_with("schema"))
            .unwrap()
            .split_whitespace()
            .collect();
        assert_eq!(schema_row, vec!["schema", "failed", "1", "0", "3"]);
        assert!(text.contains("error   [schema] name: name is required (REQUIRED)"));
        assert!(text.contains("hint: Give the bridge a name"));
        assert!(text.trim_end().ends_with("validation failed: 1 error, 0 warnings in schema"));
    }

    #[test]
    fn json_is_the_pipeline_result() {
        let mut buf = Vec::new();
        render(&sample(), OutputFormat::Json, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["isValid"], serde_json::json!(false));
        assert_eq!(value["stages"].as_array().unwrap().len(), 7);
        assert_eq!(value["fieldErrors"]["name"][0]["code"], serde_json::json!("REQUIRED"));
    }
}
