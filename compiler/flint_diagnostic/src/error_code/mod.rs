//! Codes for every diagnostic the compiler emits.
//!
//! The prefix letter is the severity class and the first digit the phase:
//! - E1xxx: type resolution and layout
//! - E2xxx: checking and lowering of expressions and declarations
//! - W1xxx: opt-in conversion and cast warnings
//! - I0xxx: informational notes

use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ErrorCode {
    // Type resolution errors (E1xxx)
    /// Type name that is neither built in nor declared
    E1001,
    /// Alias that refers back to itself (infinite type)
    E1002,
    /// Struct layout error (zero-size, untyped or recursive field)
    E1003,
    /// Type name declared twice
    E1004,

    // Semantic errors (E2xxx)
    /// Incompatible types in assignment, argument, return or cast
    E2001,
    /// Variable declared twice in the same scope
    E2002,
    /// Invalid dereference, member access or address-of
    E2003,
    /// Memory access at an offset not aligned to its element
    E2004,
    /// Stack-allocated variable used from another frame
    E2005,
    /// Operator applied to an operand it cannot take
    E2006,
    /// Aggregate passed or returned by value
    E2008,

    // Warnings (W1xxx)
    /// Constant conversion changes the value or sign
    W1001,
    /// Implicit narrowing conversion
    W1002,
    /// Pointer conversion to a larger alignment class
    W1003,

    // Notes (I0xxx)
    /// Frame layout summary
    I0001,
    /// Undeclared identifier treated as dynamic
    I0002,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 16] = [
        ErrorCode::E1001,
        ErrorCode::E1002,
        ErrorCode::E1003,
        ErrorCode::E1004,
        ErrorCode::E2001,
        ErrorCode::E2002,
        ErrorCode::E2003,
        ErrorCode::E2004,
        ErrorCode::E2005,
        ErrorCode::E2006,
        ErrorCode::E2008,
        ErrorCode::W1001,
        ErrorCode::W1002,
        ErrorCode::W1003,
        ErrorCode::I0001,
        ErrorCode::I0002,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2008 => "E2008",
            ErrorCode::W1001 => "W1001",
            ErrorCode::W1002 => "W1002",
            ErrorCode::W1003 => "W1003",
            ErrorCode::I0001 => "I0001",
            ErrorCode::I0002 => "I0002",
        }
    }

    /// One-line description, used by `--explain`-style tooling.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "unresolved type name",
            ErrorCode::E1002 => "infinite type",
            ErrorCode::E1003 => "invalid struct layout",
            ErrorCode::E1004 => "duplicate type declaration",
            ErrorCode::E2001 => "incompatible types",
            ErrorCode::E2002 => "redeclared variable",
            ErrorCode::E2003 => "invalid memory access",
            ErrorCode::E2004 => "unaligned memory access",
            ErrorCode::E2005 => "stack variable captured by another frame",
            ErrorCode::E2006 => "invalid operand",
            ErrorCode::E2008 => "aggregate passed by value",
            ErrorCode::W1001 => "constant conversion changes value",
            ErrorCode::W1002 => "implicit narrowing conversion",
            ErrorCode::W1003 => "pointer conversion narrows alignment",
            ErrorCode::I0001 => "frame layout",
            ErrorCode::I0002 => "undeclared identifier",
        }
    }

    pub fn is_type_resolution_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::E1001 | ErrorCode::E1002 | ErrorCode::E1003 | ErrorCode::E1004
        )
    }

    pub fn is_semantic_error(&self) -> bool {
        self.as_str().starts_with("E2")
    }

    pub fn is_warning(&self) -> bool {
        self.as_str().starts_with('W')
    }

    pub fn is_info(&self) -> bool {
        self.as_str().starts_with('I')
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests;
