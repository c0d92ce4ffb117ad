use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the generate-and-judge loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        pipeline: String,
        max_retries: usize,
    },
    GenerationStarted {
        attempt: usize,
        max_retries: usize,
        feedback_entries: usize,
    },
    GenerationCompleted {
        attempt: usize,
        code_lines: usize,
        duration_secs: f64,
    },
    GenerationFailed {
        attempt: usize,
        error: String,
    },
    EvaluationStarted {
        attempt: usize,
    },
    EvaluationCompleted {
        attempt: usize,
        score: u8,
        passed: bool,
        issues: Vec<String>,
    },
    FeedbackAdded {
        attempt: usize,
        feedback_entries: usize,
    },
    RunPassed {
        attempt: usize,
        score: u8,
        duration_secs: f64,
    },
    RetriesExhausted {
        attempts: usize,
        last_score: u8,
    },
    RunErrored {
        attempt: usize,
        error: String,
    },
    RunInterrupted {
        attempts: usize,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for dagsmith events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// Logger that writes nothing to the console
    pub fn quiet() -> Self {
        Self {
            format: LogFormat::Json,
            console: false,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", event.with_timestamp());
            }
        }

        if !self.console {
            return;
        }
        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RunStarted {
                pipeline,
                max_retries,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "dagsmith".bold().bright_white(),
                    " ".repeat(59) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Pipeline:".dimmed(),
                    Self::truncate_with_padding(pipeline, 58, 66).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Retries:".dimmed(),
                    Self::truncate_with_padding(&max_retries.to_string(), 59, 67).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::GenerationStarted {
                attempt,
                max_retries,
                feedback_entries,
            } => {
                let header = format!("─ Attempt {}/{} ", attempt, max_retries);
                let padding = "─".repeat(67usize.saturating_sub(header.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    header.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "GENERATE".bright_cyan().bold()
                );
                if *feedback_entries > 0 {
                    let _ = writeln!(
                        stderr,
                        "    {} {} feedback {}",
                        "↺".dimmed(),
                        feedback_entries,
                        if *feedback_entries == 1 { "entry" } else { "entries" }
                    );
                }
            }
            LogEvent::GenerationCompleted {
                code_lines,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} lines ({:.1}s)",
                    "✓".bright_green(),
                    code_lines,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::GenerationFailed { error, .. } => {
                let _ = writeln!(stderr, "    {} {}", "✗".bright_red(), error.bright_red());
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::EvaluationStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "JUDGE".bright_magenta().bold()
                );
            }
            LogEvent::EvaluationCompleted {
                score,
                passed,
                issues,
                ..
            } => {
                let verdict = if *passed {
                    format!("✓ Score {}/100, passed", score)
                        .bright_green()
                        .to_string()
                } else {
                    format!("→ Score {}/100, failed", score)
                        .bright_yellow()
                        .to_string()
                };
                let _ = writeln!(stderr, "    {}", verdict);
                for issue in issues {
                    let _ = writeln!(stderr, "    {} {}", "│".dimmed(), issue.dimmed());
                }
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::FeedbackAdded { .. } => {
                // Shown in the next attempt's header
            }
            LogEvent::RunPassed { .. } => {
                // Final outcome is printed by the binary
            }
            LogEvent::RetriesExhausted {
                attempts,
                last_score,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} Retry budget spent after {} attempts (last score {}/100)",
                    "⚠".bright_yellow(),
                    attempts,
                    last_score
                );
            }
            LogEvent::RunErrored { attempt, error } => {
                let _ = writeln!(
                    stderr,
                    "{} Generation failed on attempt {}: {}",
                    "✗".bright_red(),
                    attempt,
                    error.bright_red()
                );
            }
            LogEvent::RunInterrupted { attempts } => {
                let _ = writeln!(
                    stderr,
                    "{} Interrupted after {} attempts",
                    "⚠".bright_yellow(),
                    attempts
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::RunStarted { max_retries, .. } => {
                format!("[{}] run:start max={}", timestamp, max_retries)
            }
            LogEvent::GenerationStarted {
                attempt,
                feedback_entries,
                ..
            } => format!(
                "[{}] gen:start:{} feedback={}",
                timestamp, attempt, feedback_entries
            ),
            LogEvent::GenerationCompleted {
                attempt,
                code_lines,
                duration_secs,
            } => format!(
                "[{}] gen:done:{} {}L {:.1}s",
                timestamp, attempt, code_lines, duration_secs
            ),
            LogEvent::GenerationFailed { attempt, error } => {
                format!("[{}] gen:fail:{} {}", timestamp, attempt, error)
            }
            LogEvent::EvaluationStarted { attempt } => {
                format!("[{}] judge:start:{}", timestamp, attempt)
            }
            LogEvent::EvaluationCompleted {
                attempt,
                score,
                passed,
                ..
            } => format!(
                "[{}] judge:done:{} score={} {}",
                timestamp,
                attempt,
                score,
                if *passed { "pass" } else { "fail" }
            ),
            LogEvent::FeedbackAdded {
                attempt,
                feedback_entries,
            } => format!(
                "[{}] feedback:{} total={}",
                timestamp, attempt, feedback_entries
            ),
            LogEvent::RunPassed {
                attempt,
                score,
                duration_secs,
            } => format!(
                "[{}] run:pass:{} score={} {:.1}s",
                timestamp, attempt, score, duration_secs
            ),
            LogEvent::RetriesExhausted {
                attempts,
                last_score,
            } => format!(
                "[{}] run:exhausted:{} score={}",
                timestamp, attempts, last_score
            ),
            LogEvent::RunErrored { attempt, error } => {
                format!("[{}] run:error:{} {}", timestamp, attempt, error)
            }
            LogEvent::RunInterrupted { attempts } => {
                format!("[{}] run:interrupted:{}", timestamp, attempts)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1); // +1 for trailing │
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_event_tagging() {
        let event = LogEvent::EvaluationCompleted {
            attempt: 2,
            score: 40,
            passed: false,
            issues: vec!["no retries".into()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "evaluation_completed");
        assert_eq!(json["score"], 40);
        assert_eq!(json["issues"][0], "no retries");
    }

    #[test]
    fn test_file_output_is_timestamped_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("run.log");
        let mut logger = Logger::with_file(LogFormat::Compact, &path).unwrap();
        logger.console = false;

        logger.log(&LogEvent::RunStarted {
            pipeline: "file -> file".into(),
            max_retries: 3,
        });
        logger.log(&LogEvent::RunInterrupted { attempts: 1 });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "run_started");
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["attempts"], 1);
    }

    #[test]
    fn test_truncate_with_padding() {
        let padded = Logger::truncate_with_padding("abc", 10, 8);
        assert_eq!(padded, "abc    │");

        let truncated = Logger::truncate_with_padding("abcdefghijkl", 6, 8);
        assert_eq!(truncated, "abc... │");
    }
}
