// ABOUTME: Output formatting for operator feedback during deployments.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::cluster::ServiceEvent;
use crate::deploy::Phase;
use crate::types::ServiceName;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result and errors)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
///
/// Cheap to clone; every worker and tailer gets its own copy.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a phase transition for one service.
    pub fn phase(&self, service: &ServiceName, phase: Phase) {
        match self.mode {
            OutputMode::Normal => println!("[{}] {phase}", service.name()),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit(JsonEvent {
                event: "phase",
                message: &phase.to_string(),
                service: Some(service.as_str()),
                container: None,
                at: None,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print one service lifecycle event reported by the cluster.
    pub fn event(&self, service: &ServiceName, event: &ServiceEvent) {
        match self.mode {
            OutputMode::Normal => println!(
                "[{}] {} {}",
                service.name(),
                event.created_at.format("%H:%M:%S"),
                event.message
            ),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit(JsonEvent {
                event: "service_event",
                message: &event.message,
                service: Some(service.as_str()),
                container: None,
                at: Some(event.created_at.to_rfc3339()),
                duration_secs: None,
            }),
        }
    }

    /// Print one line a task container wrote to its log.
    ///
    /// Shown in every mode; quiet mode prints the bare line.
    pub fn task_log(&self, container: &str, line: &str) {
        match self.mode {
            OutputMode::Normal => println!("[{container}] {line}"),
            OutputMode::Quiet => println!("{line}"),
            OutputMode::Json => self.emit(JsonEvent {
                event: "task_log",
                message: line,
                service: None,
                container: Some(container),
                at: None,
                duration_secs: None,
            }),
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => self.emit(JsonEvent {
                event: "success",
                message,
                service: None,
                container: None,
                at: None,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print a warning message.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.emit_err(JsonEvent {
                event: "warning",
                message,
                service: None,
                container: None,
                at: None,
                duration_secs: None,
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.emit_err(JsonEvent {
                event: "error",
                message,
                service: None,
                container: None,
                at: None,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print an error scoped to one service.
    pub fn service_error(&self, service: &ServiceName, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("[{}] Error: {message}", service.name())
            }
            OutputMode::Json => self.emit_err(JsonEvent {
                event: "error",
                message,
                service: Some(service.as_str()),
                container: None,
                at: None,
                duration_secs: None,
            }),
        }
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    fn emit(&self, event: JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(&event) {
            println!("{json}");
        }
    }

    fn emit_err(&self, event: JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(&event) {
            eprintln!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_zero_without_timer() {
        let output = Output::new(OutputMode::Quiet);
        assert_eq!(output.elapsed_secs(), 0.0);
    }

    #[test]
    fn json_event_omits_empty_fields() {
        let event = JsonEvent {
            event: "phase",
            message: "describing",
            service: Some("web"),
            container: None,
            at: None,
            duration_secs: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event":"phase","message":"describing","service":"web"}"#
        );
    }
}
