//! User-facing diagnostic messages.
//!
//! Every fatal error should carry its root cause and a suggested next step;
//! non-fatal findings (version conflicts, ignored cycles) surface through the
//! same machinery as warnings.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a package selector does not match.
    pub const PACKAGE_NOT_FOUND: &str =
        "help: run `armada tree` to see the workspace packages";

    /// Suggestion when selection hits a dependency cycle.
    pub const CYCLE: &str =
        "help: break the cycle, or pass --dangerously-ignore-circular-dependencies \
         to build in a degraded deterministic order";

    /// Suggestion when a build step fails.
    pub const BUILD_FAILED: &str = "help: run `armada build --verbose` for more details";

    /// Suggestion when a shim executable is missing.
    pub const SHIM_NOT_FOUND: &str =
        "help: install the tool or point [commands] in armada.toml at it";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
        }
    }
}

/// A diagnostic message with optional context and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
                Severity::Help => "\x1b[1;32mhelp\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
                Severity::Help => "help",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  - {}\n", ctx));
        }

        for suggestion in &self.suggestions {
            output.push_str(&format!("{}\n", suggestion));
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// A dependency name whose declared ranges cannot all be satisfied by the
/// single installed version. Non-fatal: classification proceeds with the
/// installed version and this record is surfaced as a warning.
#[derive(Debug, Clone, Error, MietteDiagnostic)]
#[error("no single installed version of `{package}` satisfies every consumer")]
#[diagnostic(
    code(armada::classify::version_conflict),
    help("align the declared ranges, or update the installed dependency tree")
)]
pub struct VersionConflict {
    /// The conflicted external dependency
    pub package: String,

    /// The version the installed tree actually provides, when known
    pub resolved: Option<String>,

    /// (consumer, declared specifier) pairs that could not be reconciled
    pub requirements: Vec<(String, String)>,
}

impl VersionConflict {
    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::warning(self.to_string());

        if let Some(ref resolved) = self.resolved {
            diag = diag.with_context(format!("installed version: {}", resolved));
        }
        for (consumer, spec) in &self.requirements {
            diag = diag.with_context(format!("`{}` requires `{} {}`", consumer, self.package, spec));
        }

        diag.with_suggestion(
            "help: align the declared ranges, or update the installed dependency tree",
        )
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("circular dependency among 3 packages")
            .with_context("cycle: a -> b -> c -> a")
            .with_suggestion(suggestions::CYCLE);

        let output = diag.format(false);
        assert!(output.contains("error: circular dependency"));
        assert!(output.contains("a -> b -> c -> a"));
        assert!(output.contains("--dangerously-ignore-circular-dependencies"));
    }

    #[test]
    fn test_version_conflict_diagnostic() {
        let conflict = VersionConflict {
            package: "react".to_string(),
            resolved: Some("18.2.0".to_string()),
            requirements: vec![
                ("app".to_string(), "^17.0.0".to_string()),
                ("widget".to_string(), "^18.0.0".to_string()),
            ],
        };

        let output = conflict.to_diagnostic().format(false);
        assert!(output.contains("warning"));
        assert!(output.contains("react"));
        assert!(output.contains("installed version: 18.2.0"));
        assert!(output.contains("`app` requires `react ^17.0.0`"));
    }
}
