//! Values crossing the transput boundary.
//!
//! The host's type system hands the engine a tagged [`Value`] to write and
//! names the [`Mode`] it wants back from a read. Long (multi-precision)
//! values stay opaque handles interpreted by the host's
//! [`LongArithmetic`](crate::host::LongArithmetic).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to a host-owned multi-precision number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LongHandle(pub u64);

/// A value to write, or the result of a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    LongInt(LongHandle),
    Real(f64),
    LongReal(LongHandle),
    Complex(f64, f64),
    Bits(u64),
    Bool(bool),
    Char(char),
    Str(String),
}

/// The mode (type) of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Int,
    LongInt,
    Real,
    LongReal,
    Complex,
    Bits,
    Bool,
    Char,
    Str,
}

impl Value {
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Int(_) => Mode::Int,
            Self::LongInt(_) => Mode::LongInt,
            Self::Real(_) => Mode::Real,
            Self::LongReal(_) => Mode::LongReal,
            Self::Complex(..) => Mode::Complex,
            Self::Bits(_) => Mode::Bits,
            Self::Bool(_) => Mode::Bool,
            Self::Char(_) => Mode::Char,
            Self::Str(_) => Mode::Str,
        }
    }

    /// Short rendering used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::LongInt(h) | Self::LongReal(h) => format!("long#{}", h.0),
            Self::Real(x) => format!("{x:?}"),
            Self::Complex(re, im) => format!("{re:?}I{im:?}"),
            Self::Bits(b) => format!("{b:#x}"),
            Self::Bool(b) => b.to_string(),
            Self::Char(c) => format!("{c:?}"),
            Self::Str(s) => format!("{s:?}"),
        }
    }
}

impl Mode {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::LongInt => "long int",
            Self::Real => "real",
            Self::LongReal => "long real",
            Self::Complex => "complex",
            Self::Bits => "bits",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Str => "string",
        }
    }

    /// Integral modes (plain and long).
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Int | Self::LongInt)
    }

    /// Modes a real pattern accepts.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::LongInt | Self::Real | Self::LongReal)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
