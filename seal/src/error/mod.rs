//! Error types and reporting

use crate::ast::Span;
use crate::resolver::SourceMap;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Compile error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Lexer error at {span}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span}: {message}")]
    Parser { message: String, span: Span },

    #[error("Type error at {span}: {message}")]
    Type { message: String, span: Span },

    /// A variant declared outside the module of its sealed supertype
    #[error(
        "Scope violation at {span}: class `{class}` in module `{module}` cannot extend sealed class `{sealed}`"
    )]
    ScopeViolation {
        class: String,
        sealed: String,
        sealed_module: String,
        module: String,
        span: Span,
    },

    /// A `when` without `else` that misses part of the scrutinee's type
    #[error("Inexhaustive match at {span}: {}", describe_missing(.missing))]
    InexhaustiveMatch {
        /// Uncovered patterns, e.g. `is Cat`
        missing: Vec<String>,
        /// Classes on the uncovered path that are not sealed
        unsealed: Vec<String>,
        span: Span,
    },

    /// A warning promoted by a `deny` lint level
    #[error("Lint error at {span}: {message}")]
    Lint { message: String, span: Span },

    #[error("IO error: {message}")]
    Io { message: String },

    /// Module resolution error
    #[error("Resolution error: {message}")]
    Resolve { message: String },

    /// Manifest error
    #[error("Config error: {message}")]
    Config { message: String },

    /// Several independent errors from one check
    #[error("{} errors", .0.len())]
    Multiple(Vec<CompileError>),
}

/// `` `is Cat` not covered `` with the list shortened past three entries
fn describe_missing(missing: &[String]) -> String {
    let quoted: Vec<String> = missing.iter().map(|p| format!("`{p}`")).collect();
    match quoted.len() {
        0 => "non-exhaustive `when`".to_string(),
        1 => format!("non-exhaustive `when`: {} not covered", quoted[0]),
        2 | 3 => format!("non-exhaustive `when`: {} not covered", quoted.join(", ")),
        n => format!(
            "non-exhaustive `when`: {} and {} more not covered",
            quoted[..3].join(", "),
            n - 3
        ),
    }
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::Type {
            message: message.into(),
            span,
        }
    }

    pub fn scope_violation(
        class: impl Into<String>,
        module: impl Into<String>,
        sealed: impl Into<String>,
        sealed_module: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::ScopeViolation {
            class: class.into(),
            sealed: sealed.into(),
            sealed_module: sealed_module.into(),
            module: module.into(),
            span,
        }
    }

    pub fn inexhaustive_match(missing: Vec<String>, unsealed: Vec<String>, span: Span) -> Self {
        Self::InexhaustiveMatch {
            missing,
            unsealed,
            span,
        }
    }

    pub fn lint(message: impl Into<String>, span: Span) -> Self {
        Self::Lint {
            message: message.into(),
            span,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn resolve_error(message: impl Into<String>) -> Self {
        Self::Resolve {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Collapse a list of errors: one error stays itself, several become `Multiple`
    pub fn from_many(mut errors: Vec<CompileError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Every leaf error, with `Multiple` flattened
    pub fn flatten(&self) -> Vec<&CompileError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.flatten()).collect(),
            other => vec![other],
        }
    }

    /// Move the error's span into another source file
    pub fn in_file(self, file: crate::ast::FileId) -> Self {
        match self {
            Self::Lexer { message, span } => Self::Lexer { message, span: span.with_file(file) },
            Self::Parser { message, span } => Self::Parser { message, span: span.with_file(file) },
            Self::Type { message, span } => Self::Type { message, span: span.with_file(file) },
            Self::Lint { message, span } => Self::Lint { message, span: span.with_file(file) },
            Self::ScopeViolation { class, sealed, sealed_module, module, span } => Self::ScopeViolation {
                class,
                sealed,
                sealed_module,
                module,
                span: span.with_file(file),
            },
            Self::InexhaustiveMatch { missing, unsealed, span } => Self::InexhaustiveMatch {
                missing,
                unsealed,
                span: span.with_file(file),
            },
            Self::Multiple(errors) => Self::Multiple(errors.into_iter().map(|e| e.in_file(file)).collect()),
            other @ (Self::Io { .. } | Self::Resolve { .. } | Self::Config { .. }) => other,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. }
            | Self::Parser { span, .. }
            | Self::Type { span, .. }
            | Self::ScopeViolation { span, .. }
            | Self::InexhaustiveMatch { span, .. }
            | Self::Lint { span, .. } => Some(*span),
            Self::Io { .. } | Self::Resolve { .. } | Self::Config { .. } | Self::Multiple(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Lexer { message, .. }
            | Self::Parser { message, .. }
            | Self::Type { message, .. }
            | Self::Lint { message, .. }
            | Self::Io { message }
            | Self::Resolve { message }
            | Self::Config { message } => message.clone(),
            Self::ScopeViolation {
                class,
                sealed,
                sealed_module,
                module,
                ..
            } => format!(
                "class `{class}` is declared in module `{module}`, but the variants of sealed class `{sealed}` must be declared in module `{sealed_module}`"
            ),
            Self::InexhaustiveMatch { missing, .. } => describe_missing(missing),
            Self::Multiple(errors) => format!("{} errors", errors.len()),
        }
    }

    /// Short label used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parser { .. } => "Parser",
            Self::Type { .. } => "Type",
            Self::ScopeViolation { .. } => "Scope violation",
            Self::InexhaustiveMatch { .. } => "Inexhaustive match",
            Self::Lint { .. } => "Lint",
            Self::Io { .. } => "IO",
            Self::Resolve { .. } => "Resolve",
            Self::Config { .. } => "Config",
            Self::Multiple(_) => "Multiple",
        }
    }

    fn help(&self) -> Option<String> {
        match self {
            Self::ScopeViolation { sealed, sealed_module, .. } => Some(format!(
                "move this class into module `{sealed_module}`, or declare `{sealed}` as `open` or `abstract`"
            )),
            Self::InexhaustiveMatch { unsealed, .. } if !unsealed.is_empty() => Some(format!(
                "{} not sealed, so subclasses declared in other modules cannot be ruled out; add an `else` arm",
                unsealed.iter().map(|c| format!("`{c}`")).collect::<Vec<_>>().join(", ")
                    + if unsealed.len() == 1 { " is" } else { " are" }
            )),
            Self::InexhaustiveMatch { .. } => {
                Some("add the missing arms, or an `else` arm to handle remaining cases".to_string())
            }
            _ => None,
        }
    }
}

/// Non-fatal diagnostic
#[derive(Debug, Clone, PartialEq)]
pub enum CompileWarning {
    /// Every pattern of the arm is covered by earlier arms
    UnreachableArm { arm_index: usize, span: Span },
    /// `else` after arms that already cover every case
    RedundantElse { span: Span },
    /// Sealed class with an empty variant set
    EmptySealed { class: String, span: Span },
}

impl CompileWarning {
    pub fn unreachable_arm(arm_index: usize, span: Span) -> Self {
        Self::UnreachableArm { arm_index, span }
    }

    pub fn redundant_else(span: Span) -> Self {
        Self::RedundantElse { span }
    }

    pub fn empty_sealed(class: impl Into<String>, span: Span) -> Self {
        Self::EmptySealed {
            class: class.into(),
            span,
        }
    }

    /// Lint name, as written in `Seal.toml`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnreachableArm { .. } => "unreachable-arm",
            Self::RedundantElse { .. } => "redundant-else",
            Self::EmptySealed { .. } => "empty-sealed",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnreachableArm { span, .. } | Self::RedundantElse { span } | Self::EmptySealed { span, .. } => {
                *span
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::UnreachableArm { arm_index, .. } => format!(
                "arm {} is unreachable: earlier arms already cover its patterns",
                arm_index + 1
            ),
            Self::RedundantElse { .. } => {
                "`else` arm is redundant: the `when` is already exhaustive".to_string()
            }
            Self::EmptySealed { class, .. } => {
                format!("sealed class `{class}` has no variants in its module")
            }
        }
    }

    /// Promote to an error (lint level `deny`)
    pub fn into_error(self) -> CompileError {
        CompileError::lint(format!("{} [{}]", self.message(), self.kind()), self.span())
    }
}

impl std::fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "warning[{}] at {}: {}", self.kind(), self.span(), self.message())
    }
}

/// Report error with ariadne
pub fn report_error(sources: &SourceMap, error: &CompileError) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    if let CompileError::Multiple(errors) = error {
        for e in errors {
            report_error(sources, e)?;
        }
        return Ok(());
    }

    let kind = error.kind();
    let Some((filename, source, span)) = error
        .span()
        .and_then(|span| sources.get(span.file).map(|f| (f.name.as_str(), f.source.as_str(), span)))
    else {
        // Errors without span (IO, Resolve, Config)
        eprintln!("error: {kind} error: {}", error.message());
        return Ok(());
    };

    let mut report = Report::build(ReportKind::Error, (filename, span.start..span.end))
        .with_message(format!("{kind} error"))
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_message(error.message())
                .with_color(Color::Red),
        );
    if let Some(help) = error.help() {
        report = report.with_help(help);
    }
    report.finish().eprint((filename, Source::from(source)))
}

/// Report warning with ariadne
pub fn report_warning(sources: &SourceMap, warning: &CompileWarning) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = warning.span();
    let Some(file) = sources.get(span.file) else {
        eprintln!("{warning}");
        return Ok(());
    };
    let filename = file.name.as_str();

    Report::build(ReportKind::Warning, (filename, span.start..span.end))
        .with_message(format!("{} [{}]", warning.message(), warning.kind()))
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_message(warning.message())
                .with_color(Color::Yellow),
        )
        .finish()
        .eprint((filename, Source::from(file.source.as_str())))
}
