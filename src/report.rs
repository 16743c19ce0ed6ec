use std::fmt;

use serde::Serialize;

/// Where an operator was built: a source position in test code, or an
/// offset inside an expected-value expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Name of the operator built there.
    pub operator: String,
}

impl Location {
    /// Location of the caller, following `#[track_caller]` frames.
    #[track_caller]
    pub fn caller(operator: &str) -> Self {
        let at = std::panic::Location::caller();
        Self {
            file: at.file().to_string(),
            line: at.line(),
            column: at.column(),
            operator: operator.to_string(),
        }
    }

    pub fn in_expression(offset: usize, operator: &str) -> Self {
        Self {
            file: "<expression>".to_string(),
            line: 1,
            column: u32::try_from(offset + 1).unwrap_or(u32::MAX),
            operator: operator.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}:{}", self.operator, self.file, self.line, self.column)
    }
}

/// Diagnostic describing the first mismatch of a comparison.
///
/// Only ever built in diagnostic mode; see [`Mismatch`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Error {
    pub message: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub got: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Box<Error>>,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: String::new(),
            got: None,
            expected: None,
            summary: None,
            location: None,
            origin: None,
        }
    }

    pub fn with_got(mut self, got: impl Into<String>) -> Self {
        self.got = Some(got.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_origin(mut self, origin: Error) -> Self {
        self.origin = Some(Box::new(origin));
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn path_string(&self) -> &str {
        &self.path
    }

    pub fn got_string(&self) -> &str {
        self.got.as_deref().unwrap_or("")
    }

    pub fn expected_string(&self) -> &str {
        self.expected.as_deref().unwrap_or("")
    }

    pub fn summary_string(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    /// Errors of the origin chain, this one first.
    pub fn chain(&self) -> impl Iterator<Item = &Error> {
        std::iter::successors(Some(self), |e| e.origin.as_deref())
    }
}

fn write_indented(f: &mut fmt::Formatter<'_>, label: &str, text: &str) -> fmt::Result {
    let pad = " ".repeat(label.len() + 3);
    writeln!(f, "\t{label}: {}", text.replace('\n', &format!("\n\t{pad}")))
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, err) in self.chain().enumerate() {
            if depth > 0 {
                writeln!(f, "Originates from following error:")?;
            }
            writeln!(f, "{}: {}", err.path, err.message)?;
            if let Some(got) = &err.got {
                write_indented(f, "     got", got)?;
            }
            if let Some(expected) = &err.expected {
                write_indented(f, "expected", expected)?;
            }
            if let Some(summary) = &err.summary {
                writeln!(f, "\t{}", summary.replace('\n', "\n\t"))?;
            }
            if let Some(loc) = &err.location {
                writeln!(f, "[under operator {loc}]")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.origin
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Failure of one comparison step.
#[derive(Clone, Debug, PartialEq)]
pub enum Mismatch {
    /// Boolean mode: no payload at all.
    Boolean,
    Report(Box<Error>),
}

impl Mismatch {
    pub fn report(&self) -> Option<&Error> {
        match self {
            Mismatch::Boolean => None,
            Mismatch::Report(err) => Some(err),
        }
    }
}

/// Result of every comparison step and every operator.
pub type CmpResult = std::result::Result<(), Mismatch>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_renders_the_origin_chain() {
        let inner = Error {
            path: "DATA[1]".into(),
            ..Error::new("values differ").with_got("3").with_expected("4")
        };
        let outer = Error {
            path: "DATA".into(),
            ..Error::new("compared (part 1 of 2)")
                .with_got("[1, 3]")
                .with_expected("[1, 4]")
                .with_location(Location::in_expression(0, "All"))
                .with_origin(inner)
        };
        assert_eq!(
            outer.to_string(),
            "DATA: compared (part 1 of 2)\n\
             \t     got: [1, 3]\n\
             \texpected: [1, 4]\n\
             [under operator All at <expression>:1:1]\n\
             Originates from following error:\n\
             DATA[1]: values differ\n\
             \t     got: 3\n\
             \texpected: 4\n"
        );
        assert_eq!(outer.chain().count(), 2);
        assert!(std::error::Error::source(&outer).is_some());
    }

    #[test]
    fn caller_location_points_here() {
        let loc = Location::caller("Any");
        assert!(loc.file.ends_with("report.rs"));
        assert_eq!(loc.operator, "Any");
    }
}
