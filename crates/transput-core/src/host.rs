//! Collaborator seams: the expression evaluator and long arithmetic.
//!
//! Both evaluator calls receive the channel performing the transput, so a
//! host may itself perform (nested) formatted transput while computing a
//! count or choosing a sub-format.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{Result, TransputError};
use crate::format::{EnvHandle, FormatText};
use crate::picture::ExprHandle;
use crate::stringify;
use crate::transput::Transput;
use crate::value::LongHandle;

/// The host language's expression evaluator.
pub trait Host {
    /// Evaluate an integer expression (replicator count, radix, width).
    fn eval_int(&mut self, expr: ExprHandle, env: EnvHandle, chan: &mut Transput<'_>) -> Result<i64>;

    /// Evaluate a format-valued expression.
    fn eval_format(
        &mut self,
        expr: ExprHandle,
        env: EnvHandle,
        chan: &mut Transput<'_>,
    ) -> Result<FormatText>;

    /// Multi-precision arithmetic, if the host has long modes.
    fn long_arithmetic(&self) -> Option<&dyn LongArithmetic> {
        None
    }
}

/// Conversions on host-owned multi-precision numbers.
pub trait LongArithmetic {
    fn is_negative(&self, value: LongHandle) -> bool;

    /// Magnitude of an integral value as digits in `base`, most significant first.
    fn digits_of(&self, value: LongHandle, base: u32) -> Result<String>;

    /// Parse a denotation (optionally signed, may carry a point and exponent
    /// when `base` is 10) into a new value.
    fn value_of(&self, digits: &str, base: u32) -> Result<LongHandle>;

    /// Scale the magnitude into `[10^(int_width-1), 10^int_width)` and render
    /// it with `frac_width` fraction digits; returns the text and the base-10
    /// exponent.
    fn standardise(&self, value: LongHandle, int_width: usize, frac_width: usize)
    -> Result<(String, i32)>;

    /// Magnitude rendered in fixed point with `frac_width` fraction digits.
    fn fixed_digits(&self, value: LongHandle, frac_width: usize) -> Result<String>;
}

/// A host with no dynamic expressions; every evaluation is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticHost;

impl Host for StaticHost {
    fn eval_int(&mut self, expr: ExprHandle, _env: EnvHandle, _chan: &mut Transput<'_>) -> Result<i64> {
        Err(TransputError::Host(format!(
            "no evaluator for expression {}",
            expr.0
        )))
    }

    fn eval_format(
        &mut self,
        expr: ExprHandle,
        _env: EnvHandle,
        _chan: &mut Transput<'_>,
    ) -> Result<FormatText> {
        Err(TransputError::Host(format!(
            "no evaluator for format expression {}",
            expr.0
        )))
    }
}

/// A host whose expressions are looked up in fixed tables.
///
/// Every environment sees the same values. Used by fixtures and tests.
#[derive(Debug, Default)]
pub struct TableHost {
    ints: HashMap<ExprHandle, i64>,
    formats: HashMap<ExprHandle, FormatText>,
    arithmetic: Option<WideArithmetic>,
}

impl TableHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_int(mut self, expr: ExprHandle, value: i64) -> Self {
        self.ints.insert(expr, value);
        self
    }

    #[must_use]
    pub fn with_format(mut self, expr: ExprHandle, format: FormatText) -> Self {
        self.formats.insert(expr, format);
        self
    }

    #[must_use]
    pub fn with_arithmetic(mut self, arithmetic: WideArithmetic) -> Self {
        self.arithmetic = Some(arithmetic);
        self
    }

    pub fn arithmetic(&self) -> Option<&WideArithmetic> {
        self.arithmetic.as_ref()
    }
}

impl Host for TableHost {
    fn eval_int(&mut self, expr: ExprHandle, _env: EnvHandle, _chan: &mut Transput<'_>) -> Result<i64> {
        self.ints
            .get(&expr)
            .copied()
            .ok_or_else(|| TransputError::Host(format!("unknown integer expression {}", expr.0)))
    }

    fn eval_format(
        &mut self,
        expr: ExprHandle,
        _env: EnvHandle,
        _chan: &mut Transput<'_>,
    ) -> Result<FormatText> {
        self.formats
            .get(&expr)
            .cloned()
            .ok_or_else(|| TransputError::Host(format!("unknown format expression {}", expr.0)))
    }

    fn long_arithmetic(&self) -> Option<&dyn LongArithmetic> {
        self.arithmetic.as_ref().map(|a| a as &dyn LongArithmetic)
    }
}

/// A value held by [`WideArithmetic`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WideValue {
    Int(i128),
    Real(f64),
}

/// Long arithmetic over `i128` integers and `f64` reals.
///
/// Values live in an append-only table; a [`LongHandle`] is an index into it.
#[derive(Debug, Default)]
pub struct WideArithmetic {
    values: Mutex<Vec<WideValue>>,
}

impl WideArithmetic {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, value: WideValue) -> LongHandle {
        let mut values = self.values.lock();
        values.push(value);
        LongHandle(values.len() as u64 - 1)
    }

    pub fn insert_int(&self, value: i128) -> LongHandle {
        self.insert(WideValue::Int(value))
    }

    pub fn insert_real(&self, value: f64) -> LongHandle {
        self.insert(WideValue::Real(value))
    }

    #[must_use]
    pub fn get(&self, handle: LongHandle) -> Option<WideValue> {
        let index = usize::try_from(handle.0).ok()?;
        self.values.lock().get(index).copied()
    }

    fn lookup(&self, handle: LongHandle) -> Result<WideValue> {
        self.get(handle)
            .ok_or_else(|| TransputError::Host(format!("dangling long handle {}", handle.0)))
    }
}

fn radix_digits(mut magnitude: u128, base: u32) -> String {
    let base_wide = u128::from(base.clamp(2, 36));
    if magnitude == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while magnitude > 0 {
        let d = (magnitude % base_wide) as u32;
        digits.push(char::from_digit(d, 36).unwrap_or('?'));
        magnitude /= base_wide;
    }
    digits.iter().rev().collect()
}

/// Exact decimal standardisation of an integer magnitude.
fn standardise_integer(magnitude: u128, int_width: usize, frac_width: usize) -> (String, i32) {
    if magnitude == 0 {
        return stringify::standardise(0.0, int_width, frac_width);
    }
    let digits = magnitude.to_string();
    let e10 = i32::try_from(digits.len()).unwrap_or(i32::MAX) - 1;
    stringify::standardise_digits(&digits, e10, int_width, frac_width)
}

impl LongArithmetic for WideArithmetic {
    fn is_negative(&self, value: LongHandle) -> bool {
        match self.get(value) {
            Some(WideValue::Int(v)) => v < 0,
            Some(WideValue::Real(x)) => x < 0.0,
            None => false,
        }
    }

    fn digits_of(&self, value: LongHandle, base: u32) -> Result<String> {
        match self.lookup(value)? {
            WideValue::Int(v) => Ok(radix_digits(v.unsigned_abs(), base)),
            WideValue::Real(x) => Ok(stringify::fixed_decimal(x, 0)),
        }
    }

    fn value_of(&self, digits: &str, base: u32) -> Result<LongHandle> {
        let text = digits.trim();
        let is_real = base == 10 && text.contains(['.', 'e', 'E']);
        let value = if is_real {
            text.parse::<f64>().map(WideValue::Real).ok()
        } else {
            i128::from_str_radix(text, base).map(WideValue::Int).ok()
        };
        value
            .map(|v| self.insert(v))
            .ok_or_else(|| TransputError::Host(format!("malformed long denotation {text:?}")))
    }

    fn standardise(
        &self,
        value: LongHandle,
        int_width: usize,
        frac_width: usize,
    ) -> Result<(String, i32)> {
        match self.lookup(value)? {
            WideValue::Int(v) => Ok(standardise_integer(v.unsigned_abs(), int_width, frac_width)),
            WideValue::Real(x) => Ok(stringify::standardise(x.abs(), int_width, frac_width)),
        }
    }

    fn fixed_digits(&self, value: LongHandle, frac_width: usize) -> Result<String> {
        match self.lookup(value)? {
            WideValue::Int(v) => {
                let int = v.unsigned_abs().to_string();
                if frac_width == 0 {
                    Ok(int)
                } else {
                    Ok(format!("{int}.{}", "0".repeat(frac_width)))
                }
            }
            WideValue::Real(x) => Ok(stringify::fixed_decimal(x, frac_width)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;

    #[test]
    fn static_host_rejects_everything() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        let err = StaticHost
            .eval_int(ExprHandle(4), EnvHandle(0), &mut chan)
            .unwrap_err();
        assert_eq!(err.tag(), "host");
    }

    #[test]
    fn table_host_looks_up_values() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        let mut host = TableHost::new().with_int(ExprHandle(1), 3);
        assert_eq!(host.eval_int(ExprHandle(1), EnvHandle(9), &mut chan).unwrap(), 3);
        assert!(host.eval_format(ExprHandle(1), EnvHandle(0), &mut chan).is_err());
        assert!(host.long_arithmetic().is_none());
    }

    #[test]
    fn wide_arithmetic_digits_and_parsing() {
        let arith = WideArithmetic::new();
        let h = arith.insert_int(-255);
        assert!(arith.is_negative(h));
        assert_eq!(arith.digits_of(h, 16).unwrap(), "ff");
        let parsed = arith.value_of("-000042", 10).unwrap();
        assert_eq!(arith.get(parsed), Some(WideValue::Int(-42)));
        let real = arith.value_of("1.5e2", 10).unwrap();
        assert_eq!(arith.get(real), Some(WideValue::Real(150.0)));
        assert!(arith.value_of("12x", 10).is_err());
    }

    #[test]
    fn wide_standardise_is_exact_for_integers() {
        let arith = WideArithmetic::new();
        let h = arith.insert_int(123_456_789_012_345_678_901_234_567_i128);
        assert_eq!(
            arith.standardise(h, 1, 3).unwrap(),
            ("1.235".to_string(), 26)
        );
        let nines = arith.insert_int(9_999);
        assert_eq!(arith.standardise(nines, 2, 1).unwrap(), ("10.0".to_string(), 3));
        assert_eq!(arith.fixed_digits(nines, 2).unwrap(), "9999.00");
    }

    #[test]
    fn wide_reals_round_half_up() {
        let arith = WideArithmetic::new();
        let h = arith.insert_real(-2.5);
        assert_eq!(arith.digits_of(h, 10).unwrap(), "3");
        let h = arith.insert_real(0.125);
        assert_eq!(arith.fixed_digits(h, 2).unwrap(), "0.13");
        let tiny = arith.insert_real(5e-324);
        assert_eq!(arith.standardise(tiny, 1, 1).unwrap(), ("5.0".to_string(), -324));
    }
}
