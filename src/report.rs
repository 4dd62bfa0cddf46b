//! Plain-text reports for failed assertions.
//!
//! [`error`] rebuilds the failing assertion from the scope's last
//! evaluation: the reinterpreted value sequence, the recovered source
//! statement and the windowed listing. A [`Report`] renders through
//! `Display`, so `assert!(cond, "{}", avow::error(&scope))` only pays
//! for the reconstruction on the failure path. Reconstruction never
//! panics; whatever cannot be recovered is left out of the output.

use std::fmt;

use crate::error::Error;
use crate::eval::{self, CapturedValue};
use crate::locate::{self, FailurePoint, SourceContext, TextPos};
use crate::scope::Scope;

/// Builds the failure report for the scope's last evaluated expression.
///
/// ```should_panic
/// use avow::Scope;
///
/// let mut scope = Scope::new();
/// scope.bind("answer", 41);
/// assert!(scope.truthy("answer == 42").unwrap(), "{}", avow::error(&scope));
/// ```
#[track_caller]
pub fn error(scope: &Scope) -> Report {
    Report::build(scope, None, FailurePoint::here())
}

/// Like [`error`], with a description section in the report.
#[track_caller]
pub fn error_desc(scope: &Scope, description: impl Into<String>) -> Report {
    Report::build(scope, Some(description.into()), FailurePoint::here())
}

/// Which report sections to render.
///
/// All sections are on by default:
///
/// ```
/// use avow::Sections;
///
/// let sections = Sections::new().values(false).location(false);
/// assert!(sections.expression);
/// assert!(!sections.values);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Sections {
    /// The assert statement as written.
    pub expression: bool,
    /// The user-supplied description, when one was given.
    pub description: bool,
    /// Per-value caret annotations.
    pub values: bool,
    /// File, line, scope name and the windowed listing.
    pub location: bool,
}

impl Default for Sections {
    fn default() -> Self {
        Self {
            expression: true,
            description: true,
            values: true,
            location: true,
        }
    }
}

impl Sections {
    /// All sections enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the assertion-statement section.
    pub fn expression(mut self, on: bool) -> Self {
        self.expression = on;
        self
    }

    /// Toggle the description section.
    pub fn description(mut self, on: bool) -> Self {
        self.description = on;
        self
    }

    /// Toggle the assertion-values section.
    pub fn values(mut self, on: bool) -> Self {
        self.values = on;
        self
    }

    /// Toggle the `Where` section.
    pub fn location(mut self, on: bool) -> Self {
        self.location = on;
        self
    }
}

/// A rendered-on-demand failure report.
pub struct Report {
    description: Option<String>,
    sections: Sections,
    expression: Option<String>,
    values: Vec<CapturedValue>,
    context: Option<SourceContext>,
}

impl Report {
    fn build(scope: &Scope, description: Option<String>, point: FailurePoint) -> Self {
        let (expression, values, context) = match scope.last_eval() {
            Some(last) => {
                let values = eval::reinterpret(scope, &last.expr, &last.result);
                let context = locate::resolve(&point, &last.text).ok();
                (Some(last.text), values, context)
            }
            None => (None, Vec::new(), None),
        };
        Self {
            description,
            sections: Sections::new(),
            expression,
            values,
            context,
        }
    }

    /// Replaces the section toggles.
    pub fn sections(mut self, sections: Sections) -> Self {
        self.sections = sections;
        self
    }

    /// The reinterpreted values, in evaluation-encounter order.
    pub fn values(&self) -> &[CapturedValue] {
        &self.values
    }

    /// Statement lines as recovered from the source, or the expression
    /// text itself when the source is unavailable.
    fn statement_lines(&self) -> Option<Vec<&str>> {
        match &self.context {
            Some(ctx) => Some(ctx.statement.iter().map(String::as_str).collect()),
            None => self.expression.as_deref().map(|text| text.lines().collect()),
        }
    }

    /// Lines and per-value positions for the values section. Falls back
    /// to the expression's own lines when the literal could not be
    /// matched back to the source.
    fn value_lines(&self) -> Option<(Vec<&str>, bool)> {
        match &self.context {
            Some(ctx) if ctx.has_mapping() => {
                Some((ctx.statement.iter().map(String::as_str).collect(), true))
            }
            _ => self
                .expression
                .as_deref()
                .map(|text| (text.lines().collect(), false)),
        }
    }

    fn position_for(&self, value: &CapturedValue, mapped: bool) -> Option<TextPos> {
        if mapped {
            self.context.as_ref()?.position_of(value.span.start)
        } else {
            Some(TextPos {
                line_index: value.span.line.saturating_sub(1),
                column: value.span.column.saturating_sub(1),
            })
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oops! Assertion failed")?;

        if self.sections.expression {
            if let Some(lines) = self.statement_lines() {
                write!(f, "\n\nThe following assertion was not satisfied")?;
                for line in lines {
                    write!(f, "\n  {line}")?;
                }
            }
        }

        if self.sections.description {
            if let Some(description) = &self.description {
                write!(f, "\n\nDescription\n  {}", capitalize(description))?;
            }
        }

        if self.sections.values && !self.values.is_empty() {
            if let Some((lines, mapped)) = self.value_lines() {
                write!(f, "\n\nAssertion values")?;
                for value in &self.values {
                    let pos = self.position_for(value, mapped);
                    for (i, line) in lines.iter().enumerate() {
                        write!(f, "\n  {line}")?;
                        if let Some(pos) = pos {
                            if pos.line_index == i {
                                write!(f, "\n  {}^ is {}", " ".repeat(pos.column), value.rendered)?;
                            }
                        }
                    }
                }
            }
        }

        if self.sections.location {
            if let Some(ctx) = &self.context {
                write!(f, "\n\nWhere")?;
                write!(
                    f,
                    "\n  File '{}', line {} in '{}'",
                    ctx.file.display(),
                    ctx.line,
                    ctx.scope_name
                )?;
                write!(f, "\n\n{}", ctx.window)?;
            }
        }

        Ok(())
    }
}

impl From<Report> for Error {
    fn from(report: Report) -> Self {
        Error::Assertion(report.to_string())
    }
}

/// Uppercases the first character, leaving the rest untouched.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
