pub mod bookshelf;

use std::fmt::{Display, Formatter};

/// Error generated when a Bookshelf file is structurally malformed.
///
/// Per-record problems (an unparseable node line, a duplicate name) are
/// warnings at the parse site, not errors; only failures that leave the
/// design unusable surface through this type.
#[derive(Debug, PartialEq)]
pub enum ParseError {
    /// The `.aux` file never named a file of the given kind.
    MissingAuxEntry(&'static str),
    /// A `SubrowOrigin` line in the `.scl` file could not be decoded.
    MalformedSubrowOrigin(String),
    /// A row attribute line (`Coordinate`, `Height`, ...) had a missing or
    /// non-numeric value.
    MalformedField { field: &'static str, line: String },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Self::MissingAuxEntry(kind) => {
                write!(f, "aux file does not reference a .{} file", kind)
            }
            Self::MalformedSubrowOrigin(line) => {
                write!(f, "malformed SubrowOrigin line: {:?}", line)
            }
            Self::MalformedField { field, line } => {
                write!(f, "malformed {} value in line {:?}", field, line)
            }
        }
    }
}

impl std::error::Error for ParseError {}
