// ABOUTME: Diagnostics accumulator for non-fatal warnings during deployments and task runs.
// ABOUTME: Collects failures that must not change a service's exit code but should be shown.

/// Collects non-fatal warnings during one service's deployment.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a rollback warning.
    pub fn rollback(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Rollback,
            message: message.into(),
        }
    }

    /// Create a deregistration warning.
    pub fn deregister(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Deregister,
            message: message.into(),
        }
    }

    /// Create a task log warning.
    pub fn logs(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Logs,
            message: message.into(),
        }
    }

    /// Create an event tailing warning.
    pub fn tailer(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Tailer,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Re-pointing a service at its original revision failed or did not stabilize.
    Rollback,
    /// A task definition revision could not be deregistered (revision leaked).
    Deregister,
    /// Service events could not be fetched or the tailer stopped abnormally.
    Tailer,
    /// A one-off task's log stream could not be removed.
    Logs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::rollback("update-service failed"));
        diag.warn(Warning::deregister("access denied"));

        assert!(diag.has_warnings());
        assert_eq!(diag.into_warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(Warning::rollback("x").kind, WarningKind::Rollback);
        assert_eq!(Warning::deregister("x").kind, WarningKind::Deregister);
        assert_eq!(Warning::tailer("x").kind, WarningKind::Tailer);
        assert_eq!(Warning::logs("x").kind, WarningKind::Logs);
    }
}
