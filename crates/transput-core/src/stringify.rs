//! Number-to-text primitives shared by the numeric, general and C-style
//! patterns: `whole`, `fixed`, `float` and `standardise`.
//!
//! Width conventions follow the standard transput routines: a width of zero
//! asks for the minimal rendering, a positive width right-justifies with a
//! sign only for negative values, and a negative width right-justifies in
//! `|width|` positions with the sign always shown.

use crate::error::TransputError;
use crate::host::LongArithmetic;
use crate::value::{LongHandle, Value};

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// A numeric value with access to the arithmetic needed to print it.
#[derive(Clone, Copy)]
pub enum Number<'a> {
    Int(i64),
    Real(f64),
    LongInt(LongHandle, &'a dyn LongArithmetic),
    LongReal(LongHandle, &'a dyn LongArithmetic),
}

/// Why a rendering failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The text does not fit; `width` is the field to fill with error characters.
    Unfit { width: usize, reason: &'static str },
    /// A collaborator failed.
    Failed(TransputError),
}

impl From<TransputError> for Refusal {
    fn from(err: TransputError) -> Self {
        Self::Failed(err)
    }
}

pub type Rendering<T> = Result<T, Refusal>;

/// Text produced by `fixed` or `float`, noting a fraction-width reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fitted {
    pub text: String,
    pub reduced: bool,
}

fn unfit(width: usize, reason: &'static str) -> Refusal {
    Refusal::Unfit { width, reason }
}

fn long_missing() -> Refusal {
    Refusal::Failed(TransputError::Host(
        "long value without long arithmetic".to_string(),
    ))
}

impl<'a> Number<'a> {
    /// Numeric view of `value`; `None` for non-numeric modes or long values
    /// when the host has no arithmetic.
    pub fn from_value(value: &Value, arith: Option<&'a dyn LongArithmetic>) -> Option<Self> {
        match *value {
            Value::Int(v) => Some(Self::Int(v)),
            Value::Real(x) => Some(Self::Real(x)),
            Value::LongInt(h) => arith.map(|a| Self::LongInt(h, a)),
            Value::LongReal(h) => arith.map(|a| Self::LongReal(h, a)),
            _ => None,
        }
    }

    /// Like [`Number::from_value`], but a long value without arithmetic is an error.
    pub fn require(value: &Value, arith: Option<&'a dyn LongArithmetic>) -> Rendering<Self> {
        Self::from_value(value, arith).ok_or_else(long_missing)
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        match *self {
            Self::Int(v) => v < 0,
            Self::Real(x) => x < 0.0,
            Self::LongInt(h, a) | Self::LongReal(h, a) => a.is_negative(h),
        }
    }

    fn check_finite(&self, width: usize) -> Rendering<()> {
        match *self {
            Self::Real(x) if !x.is_finite() => Err(unfit(width, "not a finite number")),
            _ => Ok(()),
        }
    }

    /// Magnitude as integer digits in `base`; reals are rounded to integer.
    pub fn integer_digits(&self, base: u32) -> Rendering<String> {
        match *self {
            Self::Int(v) => Ok(to_radix(v.unsigned_abs(), base)),
            Self::Real(x) => {
                self.check_finite(1)?;
                Ok(fixed_decimal(x, 0))
            }
            Self::LongInt(h, a) => Ok(a.digits_of(h, base)?),
            Self::LongReal(h, a) => Ok(a.fixed_digits(h, 0)?),
        }
    }

    /// Magnitude in fixed point with `after` fraction digits (no point when 0).
    pub fn fixed_digits(&self, after: usize) -> Rendering<String> {
        match *self {
            Self::Int(v) => {
                let int = v.unsigned_abs().to_string();
                if after == 0 {
                    Ok(int)
                } else {
                    Ok(format!("{int}.{}", "0".repeat(after)))
                }
            }
            Self::Real(x) => {
                self.check_finite(1)?;
                Ok(fixed_decimal(x, after))
            }
            Self::LongInt(h, a) | Self::LongReal(h, a) => Ok(a.fixed_digits(h, after)?),
        }
    }

    /// Magnitude scaled into `[10^(before-1), 10^before)` with `after`
    /// fraction digits, and the base-10 exponent applied.
    pub fn standardise(&self, before: usize, after: usize) -> Rendering<(String, i32)> {
        match *self {
            Self::Int(v) => Ok(standardise(v.unsigned_abs() as f64, before, after)),
            Self::Real(x) => {
                self.check_finite(1)?;
                Ok(standardise(x.abs(), before, after))
            }
            Self::LongInt(h, a) | Self::LongReal(h, a) => Ok(a.standardise(h, before, after)?),
        }
    }
}

/// Digits of `value` in `base`, lowercase, most significant first.
#[must_use]
pub fn to_radix(mut value: u64, base: u32) -> String {
    let base = u64::from(base.clamp(2, 36));
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let d = (value % base) as u32;
        digits.push(char::from_digit(d, 36).unwrap_or('?'));
        value /= base;
    }
    digits.iter().rev().collect()
}

/// Round the non-negative decimal `int.frac` half-up to `after` fraction
/// digits. The integer part may gain a digit from the carry.
fn round_half_up(int: &str, frac: &str, after: usize) -> (String, String) {
    let mut digits: Vec<u8> = int
        .bytes()
        .chain(frac.bytes().chain(std::iter::repeat(b'0')).take(after))
        .collect();
    if frac.as_bytes().get(after).is_some_and(|&d| d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }
    let split = digits.len() - after;
    let text = String::from_utf8_lossy(&digits).into_owned();
    let (int, frac) = text.split_at(split);
    let int = if int.is_empty() { "0" } else { int };
    (int.to_string(), frac.to_string())
}

fn join_point(int: &str, frac: &str) -> String {
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    }
}

/// Non-negative finite `x` in fixed point with `after` fraction digits,
/// rounding half-up on its shortest decimal representation.
#[must_use]
pub fn fixed_decimal(x: f64, after: usize) -> String {
    let text = x.abs().to_string();
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let (int, frac) = round_half_up(int, frac, after);
    join_point(&int, &frac)
}

/// Standardise the significant decimal `digits` (first digit nonzero) of a
/// value `d.ddd × 10^e10` into `before` integer and `after` fraction digits.
///
/// Returns the text and the exponent to apply to it.
#[must_use]
pub fn standardise_digits(digits: &str, e10: i32, before: usize, after: usize) -> (String, i32) {
    let before_i = i32::try_from(before).unwrap_or(i32::MAX);
    let (mut digits, mut e10) = (digits.to_string(), e10);
    loop {
        let (int, frac) = if before == 0 {
            (String::from("0"), digits.clone())
        } else {
            let padded: String = digits
                .chars()
                .chain(std::iter::repeat('0'))
                .take(before.max(digits.len()))
                .collect();
            let (int, frac) = padded.split_at(before);
            (int.to_string(), frac.to_string())
        };
        let (int, frac) = round_half_up(&int, &frac, after);
        let carried = if before == 0 { int != "0" } else { int.len() > before };
        if !carried {
            return (join_point(&int, &frac), e10.saturating_sub(before_i - 1));
        }
        // Rounding reached the next power of ten.
        digits = String::from("1");
        e10 = e10.saturating_add(1);
    }
}

/// Scale a non-negative finite `y` into `[10^(before-1), 10^before)`.
///
/// Works on the shortest decimal form of `y`, so subnormals and values near
/// `f64::MAX` scale without intermediate overflow. Rounding to `after`
/// fraction digits can carry out of the window (9.96 with one digit becomes
/// 10.0); the exponent is bumped then.
#[must_use]
pub fn standardise(y: f64, before: usize, after: usize) -> (String, i32) {
    if y == 0.0 || !y.is_finite() {
        let (int, frac) = round_half_up("0", "", after);
        return (join_point(&int, &frac), 0);
    }
    let sci = format!("{:e}", y.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');
    standardise_digits(digits, exp.parse().unwrap_or(0), before, after)
}

// ---------------------------------------------------------------------------
// whole / fixed / float
// ---------------------------------------------------------------------------

fn sign_prefix(negative: bool, width: i64) -> &'static str {
    if negative {
        "-"
    } else if width < 0 {
        "+"
    } else {
        ""
    }
}

/// Right-justify `text` in `|width|`; minimal when `width` is 0.
fn justify(text: String, width: i64) -> Option<String> {
    let len = width.unsigned_abs() as usize;
    let have = text.chars().count();
    if width == 0 {
        Some(text)
    } else if have > len {
        None
    } else {
        Some(format!("{}{text}", " ".repeat(len - have)))
    }
}

/// `whole(v, width)`: integer rendering.
pub fn whole(n: &Number<'_>, width: i64) -> Rendering<String> {
    let len = width.unsigned_abs() as usize;
    n.check_finite(len)?;
    let digits = n.integer_digits(10)?;
    let text = format!("{}{digits}", sign_prefix(n.is_negative(), width));
    justify(text, width).ok_or_else(|| unfit(len, "too many digits for width"))
}

/// `fixed(x, width, after)`: fixed-point rendering.
///
/// When the text is too wide, a leading `0` before the point is dropped and
/// then `after` is reduced one digit at a time.
pub fn fixed(n: &Number<'_>, width: i64, after: usize) -> Rendering<Fitted> {
    let len = width.unsigned_abs() as usize;
    n.check_finite(len)?;
    let sign = sign_prefix(n.is_negative(), width);
    let mut after = after;
    let mut reduced = false;
    loop {
        let mut body = n.fixed_digits(after)?;
        if width != 0 && sign.len() + body.chars().count() > len && body.starts_with("0.") {
            body.remove(0);
        }
        if let Some(text) = justify(format!("{sign}{body}"), width) {
            return Ok(Fitted { text, reduced });
        }
        if after == 0 {
            return Err(unfit(len, "too many digits for width"));
        }
        after -= 1;
        reduced = true;
    }
}

/// `float(x, width, after, exp_width)`: one digit before the point and a
/// signed exponent.
pub fn float(n: &Number<'_>, width: i64, after: usize, exp_width: i64) -> Rendering<Fitted> {
    let len = width.unsigned_abs() as usize;
    n.check_finite(len)?;
    let sign = sign_prefix(n.is_negative(), width);
    let mut after = after;
    let mut reduced = false;
    loop {
        let (mantissa, exp) = n.standardise(1, after)?;
        let exp_field = if exp_width == 0 {
            0
        } else {
            -(exp_width.abs())
        };
        let exponent = whole(&Number::Int(i64::from(exp)), exp_field)
            .map_err(|_| unfit(len, "exponent too wide"))?;
        if let Some(text) = justify(format!("{sign}{mantissa}e{exponent}"), width) {
            return Ok(Fitted { text, reduced });
        }
        if after == 0 {
            return Err(unfit(len, "too many digits for width"));
        }
        after -= 1;
        reduced = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(v: i64, width: i64) -> String {
        whole(&Number::Int(v), width).unwrap()
    }

    fn fx(x: f64, width: i64, after: usize) -> String {
        fixed(&Number::Real(x), width, after).unwrap().text
    }

    fn fl(x: f64, width: i64, after: usize, e: i64) -> String {
        float(&Number::Real(x), width, after, e).unwrap().text
    }

    #[test]
    fn test_whole_widths() {
        assert_eq!(w(42, 0), "42");
        assert_eq!(w(-42, 0), "-42");
        assert_eq!(w(42, 5), "   42");
        assert_eq!(w(42, -5), "  +42");
        assert_eq!(w(-42, 5), "  -42");
        assert_eq!(w(i64::MIN, 0), "-9223372036854775808");
    }

    #[test]
    fn test_whole_overflow() {
        let err = whole(&Number::Int(12345), 3).unwrap_err();
        assert!(matches!(err, Refusal::Unfit { width: 3, .. }));
        let err = whole(&Number::Int(123), -3).unwrap_err();
        assert!(matches!(err, Refusal::Unfit { width: 3, .. }));
    }

    #[test]
    fn test_whole_rounds_reals() {
        assert_eq!(whole(&Number::Real(2.6), 0).unwrap(), "3");
        assert_eq!(whole(&Number::Real(-2.4), 4).unwrap(), "  -2");
    }

    #[test]
    fn test_fixed_basic() {
        assert_eq!(fx(3.14159, 0, 2), "3.14");
        assert_eq!(fx(3.14159, 8, 3), "   3.142");
        assert_eq!(fx(-3.14159, -8, 3), "  -3.142");
        assert_eq!(fx(3.14159, -8, 3), "  +3.142");
        assert_eq!(fx(2.0, 0, 0), "2");
    }

    #[test]
    fn test_fixed_drops_leading_zero() {
        assert_eq!(fx(0.5, 3, 2), ".50");
        assert_eq!(fx(0.5, 4, 2), "0.50");
    }

    #[test]
    fn test_fixed_reduces_fraction_width() {
        let got = fixed(&Number::Real(99.996), 5, 3).unwrap();
        assert_eq!(got.text, "100.0");
        assert!(got.reduced);
        let got = fixed(&Number::Real(99.996), 6, 3).unwrap();
        assert_eq!(got.text, "99.996");
        assert!(!got.reduced);
    }

    #[test]
    fn test_fixed_gives_up() {
        let err = fixed(&Number::Real(12345.0), 3, 2).unwrap_err();
        assert!(matches!(err, Refusal::Unfit { width: 3, .. }));
    }

    #[test]
    fn test_fixed_of_int() {
        assert_eq!(fixed(&Number::Int(-7), 0, 2).unwrap().text, "-7.00");
    }

    #[test]
    fn test_float_standard_shape() {
        assert_eq!(fl(1.5, -22, 14, 4), "+1.50000000000000e  +0");
        assert_eq!(fl(-1234.0, 0, 3, 0), "-1.234e3");
        assert_eq!(fl(0.00123, 0, 2, -3), "1.23e -3");
    }

    #[test]
    fn test_float_rounding_carries() {
        assert_eq!(fl(9.96, 0, 1, 0), "1.0e1");
    }

    #[test]
    fn test_non_finite_is_unfit() {
        let err = fixed(&Number::Real(f64::NAN), 6, 2).unwrap_err();
        assert!(matches!(err, Refusal::Unfit { width: 6, .. }));
        let err = float(&Number::Real(f64::INFINITY), 0, 2, 2).unwrap_err();
        assert!(matches!(err, Refusal::Unfit { .. }));
    }

    #[test]
    fn test_standardise_window() {
        assert_eq!(standardise(1234.5, 2, 1), ("12.3".to_string(), 2));
        assert_eq!(standardise(0.0456, 1, 2), ("4.56".to_string(), -2));
        assert_eq!(standardise(0.5, 0, 3), ("0.500".to_string(), 0));
        assert_eq!(standardise(0.0, 2, 1), ("0.0".to_string(), 0));
        assert_eq!(standardise(99.99, 2, 1), ("10.0".to_string(), 1));
    }

    #[test]
    fn test_standardise_extremes() {
        assert_eq!(standardise(5e-324, 1, 2), ("5.00".to_string(), -324));
        assert_eq!(standardise(f64::MAX, 0, 2), ("0.18".to_string(), 309));
        assert_eq!(fl(5e-324, -22, 14, 4), "+5.00000000000000e-324");
        assert_eq!(fl(f64::MAX, 0, 2, 0), "1.80e308");
    }

    #[test]
    fn test_rounding_is_half_up() {
        assert_eq!(fixed_decimal(0.125, 2), "0.13");
        assert_eq!(fixed_decimal(2.5, 0), "3");
        assert_eq!(w(0, 0), "0");
        assert_eq!(whole(&Number::Real(0.5), 0).unwrap(), "1");
        assert_eq!(fx(1.005, 0, 2), "1.01");
        assert_eq!(standardise_digits("125", 0, 1, 1), ("1.3".to_string(), 0));
    }

    #[test]
    fn test_to_radix() {
        assert_eq!(to_radix(255, 16), "ff");
        assert_eq!(to_radix(5, 2), "101");
        assert_eq!(to_radix(0, 8), "0");
    }
}
