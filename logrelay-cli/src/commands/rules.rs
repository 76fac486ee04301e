//! `logrelay rules` command handler
//!
//! Validates pattern files, uploads them to the rule repository, and
//! inspects the assembled per-sourcetype rule sets. Pattern files carry
//! one regex per line; the 0-based line number becomes the rule class,
//! so repository order matches file order.

use std::io::Write;
use std::path::Path;

use regex::Regex;
use serde::Serialize;
use tracing::info;

use logrelay_core::types::RegexRule;
use logrelay_event_pipeline::HttpRuleSource;

use crate::cli::{RulesAction, RulesArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
pub async fn execute(args: RulesArgs, writer: &OutputWriter) -> Result<(), CliError> {
    match args.action {
        RulesAction::Validate { file } => execute_validate(&file, writer),
        RulesAction::Upload {
            file,
            sourcetype,
            repository_url,
        } => execute_upload(&file, &sourcetype, &repository_url, writer).await,
        RulesAction::List {
            sourcetype,
            repository_url,
        } => execute_list(&sourcetype, &repository_url, writer).await,
    }
}

/// Read a pattern file into (line_number, pattern) pairs, skipping blank lines.
fn read_patterns(path: &Path) -> Result<Vec<(usize, String)>, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx, line.to_owned()))
        .collect())
}

/// Compile-check every pattern, collecting per-line errors.
fn check_patterns(patterns: &[(usize, String)]) -> Vec<PatternError> {
    patterns
        .iter()
        .filter_map(|(line, pattern)| match Regex::new(pattern) {
            Ok(_) => None,
            Err(e) => Some(PatternError {
                line: *line,
                pattern: pattern.clone(),
                error: e.to_string(),
            }),
        })
        .collect()
}

fn execute_validate(path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %path.display(), "validating pattern file");

    let patterns = read_patterns(path)?;
    let errors = check_patterns(&patterns);

    let report = ValidationReport {
        file: path.display().to_string(),
        total: patterns.len(),
        valid: patterns.len() - errors.len(),
        invalid: errors.len(),
        errors,
    };
    writer.render(&report)?;

    if report.invalid > 0 {
        return Err(CliError::Rule(format!(
            "{} invalid patterns in {}",
            report.invalid,
            path.display()
        )));
    }
    Ok(())
}

async fn execute_upload(
    path: &Path,
    sourcetype: &str,
    repository_url: &str,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %path.display(), sourcetype, "uploading pattern file");

    let patterns = read_patterns(path)?;
    let errors = check_patterns(&patterns);
    if let Some(first) = errors.first() {
        // 업로드는 검증을 전부 통과해야 시작합니다.
        return Err(CliError::Rule(format!(
            "pattern at line {} does not compile: {}",
            first.line, first.error
        )));
    }

    let repository = HttpRuleSource::new(repository_url)?;
    let mut uploaded = 0usize;
    for (idx, (_, pattern)) in patterns.iter().enumerate() {
        let rule = RegexRule::new(sourcetype, idx.to_string(), pattern.clone());
        repository.put_rule(&rule).await?;
        uploaded += 1;
    }

    let report = UploadReport {
        file: path.display().to_string(),
        sourcetype: sourcetype.to_owned(),
        repository_url: repository_url.to_owned(),
        uploaded,
    };
    writer.render(&report)?;
    Ok(())
}

async fn execute_list(
    sourcetype: &str,
    repository_url: &str,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(sourcetype, "fetching rule set from repository");

    let repository = HttpRuleSource::new(repository_url)?;
    let rules = repository.list_rules(sourcetype).await?;

    let report = RuleListReport {
        sourcetype: sourcetype.to_owned(),
        total: rules.len(),
        rules: rules
            .into_iter()
            .map(|r| RuleEntry {
                class: r.class,
                pattern: r.pattern,
            })
            .collect(),
    };
    writer.render(&report)?;
    Ok(())
}

#[derive(Serialize)]
pub struct ValidationReport {
    pub file: String,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: Vec<PatternError>,
}

#[derive(Serialize)]
pub struct PatternError {
    pub line: usize,
    pub pattern: String,
    pub error: String,
}

impl Render for ValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Pattern Validation: {}", self.file.bold())?;
        writeln!(
            w,
            "  Patterns: {} total, {} valid, {} invalid",
            self.total,
            self.valid.to_string().green(),
            if self.invalid > 0 {
                self.invalid.to_string().red()
            } else {
                self.invalid.to_string().normal()
            }
        )?;

        if !self.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Errors:")?;
            for e in &self.errors {
                writeln!(w, "  line {}: {}", e.line.to_string().red(), e.error)?;
            }
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct UploadReport {
    pub file: String,
    pub sourcetype: String,
    pub repository_url: String,
    pub uploaded: usize,
}

impl Render for UploadReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Uploaded {} patterns from {} to {} (sourcetype: {})",
            self.uploaded.to_string().green(),
            self.file,
            self.repository_url,
            self.sourcetype.bold(),
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub sourcetype: String,
    pub total: usize,
    pub rules: Vec<RuleEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub class: String,
    pub pattern: String,
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Extraction Rules for {} ({} total)",
            self.sourcetype.bold(),
            self.total
        )?;
        writeln!(w)?;
        writeln!(w, "{:<10} Pattern", "Class")?;
        writeln!(w, "{}", "-".repeat(70))?;
        for r in &self.rules {
            writeln!(w, "{:<10} {}", r.class, r.pattern)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn pattern_file(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("patterns.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (temp, path)
    }

    #[test]
    fn read_patterns_skips_blank_lines() {
        let (_temp, path) = pattern_file("(?P<a>\\d+)\n\n(?P<b>\\w+)\n");
        let patterns = read_patterns(&path).unwrap();
        assert_eq!(patterns.len(), 2);
        // 라인 번호는 원본 파일 기준
        assert_eq!(patterns[0].0, 0);
        assert_eq!(patterns[1].0, 2);
    }

    #[test]
    fn check_patterns_reports_broken_lines() {
        let patterns = vec![
            (0, r"(?P<ok>\d+)".to_owned()),
            (1, "[broken".to_owned()),
            (2, r"(?P<also_ok>\w+)".to_owned()),
        ];
        let errors = check_patterns(&patterns);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
    }

    #[test]
    fn validate_fails_on_invalid_file() {
        let (_temp, path) = pattern_file("(?P<good>\\d+)\n[broken\n");
        let writer = OutputWriter::new(crate::cli::OutputFormat::Json);
        let result = execute_validate(&path, &writer);
        assert!(matches!(result, Err(CliError::Rule(_))));
    }

    #[test]
    fn validate_passes_clean_file() {
        let (_temp, path) = pattern_file("(?P<good>\\d+)\n(?P<name>\\w+)=(?P<value>\\S+)\n");
        let writer = OutputWriter::new(crate::cli::OutputFormat::Json);
        execute_validate(&path, &writer).unwrap();
    }

    #[tokio::test]
    async fn upload_rejects_invalid_patterns_before_network() {
        // 저장소 URL이 유효하지 않아도 검증 실패가 먼저 보고되어야 함
        let (_temp, path) = pattern_file("[broken\n");
        let writer = OutputWriter::new(crate::cli::OutputFormat::Json);
        let result = execute_upload(&path, "cisco:asa", "http://127.0.0.1:1", &writer).await;
        match result {
            Err(CliError::Rule(msg)) => assert!(msg.contains("line 0")),
            other => panic!("expected Rule error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_surfaces_repository_failure() {
        let (_temp, path) = pattern_file("(?P<good>\\d+)\n");
        let writer = OutputWriter::new(crate::cli::OutputFormat::Json);
        let result = execute_upload(&path, "cisco:asa", "http://127.0.0.1:1", &writer).await;
        assert!(matches!(result, Err(CliError::Rule(_))));
    }
}
