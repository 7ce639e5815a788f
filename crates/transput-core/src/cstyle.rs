//! C-style patterns.
//!
//! A picture written `%[-][+][width][.precision]letter` converts through the
//! same stringify primitives as the mould-based patterns, then pads or
//! rejects the text against `width`. Letters: `c` char, `s` string, `d`/`i`
//! integral, `f` fixed, `e` float, `g` general, `b`/`o`/`x` bits in radix
//! 2, 8 and 16.

use crate::config::TransputConfig;
use crate::error::{Result, TransputError};
use crate::format::EnvHandle;
use crate::host::{Host, LongArithmetic};
use crate::insertion::InsertOp;
use crate::numeric::long_arithmetic;
use crate::picture::{Align, CStyleKind, CStylePattern, Count, PatternKind};
use crate::stringify::{Fitted, Number, Refusal, Rendering, fixed, float, to_radix, whole};
use crate::transput::Transput;
use crate::value::{Mode, Value};

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Conversion kind named by a pattern letter.
#[must_use]
pub fn kind_of(letter: char) -> Option<CStyleKind> {
    match letter {
        'c' => Some(CStyleKind::Char),
        's' => Some(CStyleKind::String),
        'd' | 'i' => Some(CStyleKind::Integral),
        'f' => Some(CStyleKind::Fixed),
        'e' => Some(CStyleKind::Float),
        'g' => Some(CStyleKind::General),
        'b' | 'o' | 'x' => Some(CStyleKind::Bits),
        _ => None,
    }
}

fn parse_decimal(digits: &[u8]) -> Option<u32> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

impl CStylePattern {
    /// Parse `%[-][+][width][.precision]letter`. The `%` is optional; any
    /// trailing text makes the pattern malformed.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let len = bytes.len();
        let mut pos = usize::from(bytes.first() == Some(&b'%'));

        // --- flags ---
        let mut align = Align::Right;
        let mut forced_sign = false;
        while pos < len {
            match bytes[pos] {
                b'-' => align = Align::Left,
                b'+' => forced_sign = true,
                _ => break,
            }
            pos += 1;
        }

        // --- width ---
        let start = pos;
        while pos < len && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let width = if pos > start {
            Some(Count::Static(parse_decimal(&bytes[start..pos])?))
        } else {
            None
        };

        // --- precision ---
        let precision = if pos < len && bytes[pos] == b'.' {
            pos += 1;
            let start = pos;
            while pos < len && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            Some(Count::Static(if pos > start {
                parse_decimal(&bytes[start..pos])?
            } else {
                0
            }))
        } else {
            None
        };

        // --- conversion letter ---
        if pos + 1 != len {
            return None;
        }
        let letter = char::from(bytes[pos]);
        Some(Self {
            kind: kind_of(letter)?,
            align,
            forced_sign,
            width,
            precision,
            letter,
        })
    }
}

/// Whether a value of `mode` can go through a C-style picture of `kind`.
#[must_use]
pub fn accepts(kind: CStyleKind, mode: Mode) -> bool {
    match kind {
        CStyleKind::Char => mode == Mode::Char,
        CStyleKind::String => matches!(mode, Mode::Str | Mode::Char),
        CStyleKind::Integral => mode.is_integral(),
        CStyleKind::Fixed | CStyleKind::Float | CStyleKind::General => mode.is_numeric(),
        CStyleKind::Bits => mode == Mode::Bits,
    }
}

fn radix_of(letter: char) -> u32 {
    match letter {
        'b' => 2,
        'o' => 8,
        _ => 16,
    }
}

/// Default field width for bits: enough digits for 64 bits.
fn bits_width(radix: u32) -> usize {
    let per_digit = radix.trailing_zeros() as usize;
    64_usize.div_ceil(per_digit.max(1))
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// A C-style pattern with width and precision evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CStyleSpec {
    pub kind: CStyleKind,
    pub align: Align,
    pub forced_sign: bool,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub letter: char,
}

impl CStyleSpec {
    /// Width argument for the stringify primitives: negative forces the sign.
    fn signed_width(&self, width: usize) -> i64 {
        let w = i64::try_from(width).unwrap_or(i64::MAX);
        if self.forced_sign { -w } else { w }
    }

    fn unfit(&self, reason: &'static str) -> Refusal {
        Refusal::Unfit {
            width: self.width.unwrap_or(1),
            reason,
        }
    }
}

fn plain(text: String) -> Fitted {
    Fitted {
        text,
        reduced: false,
    }
}

/// Pad `text` to `width`: right alignment prepends `fill`, left alignment
/// drops leading blanks and appends blanks. `None` if it does not fit.
fn pad(text: &str, width: Option<usize>, align: Align, fill: char) -> Option<String> {
    let Some(width) = width else {
        return Some(text.to_string());
    };
    let text = match align {
        Align::Left => text.trim_start(),
        Align::Right => text,
    };
    let have = text.chars().count();
    if have > width {
        return None;
    }
    let short = width - have;
    Some(match align {
        Align::Left => format!("{text}{}", " ".repeat(short)),
        Align::Right => format!("{}{text}", std::iter::repeat_n(fill, short).collect::<String>()),
    })
}

/// Minimal renderings carry a forced `+` only through this helper; fixed
/// widths get it from the negative width convention.
fn with_forced_sign(spec: &CStyleSpec, width: usize, n: &Number<'_>, text: String) -> String {
    if spec.forced_sign && width == 0 && !n.is_negative() {
        format!("+{text}")
    } else {
        text
    }
}

fn render_number(
    spec: &CStyleSpec,
    value: &Value,
    config: &TransputConfig,
    arith: Option<&dyn LongArithmetic>,
) -> Rendering<Fitted> {
    let n = Number::require(value, arith)?;
    let integral = matches!(n, Number::Int(_) | Number::LongInt(..));
    let fitted = match spec.kind {
        CStyleKind::Integral => {
            let width = spec.width.unwrap_or(0);
            let text = whole(&n, spec.signed_width(width))?;
            plain(with_forced_sign(spec, width, &n, text))
        }
        CStyleKind::General if integral => {
            let width = spec.width.unwrap_or(0);
            let text = whole(&n, spec.signed_width(width))?;
            plain(with_forced_sign(spec, width, &n, text))
        }
        CStyleKind::Fixed => {
            let width = spec.width.unwrap_or(0);
            let after = spec.precision.unwrap_or(config.real_width.saturating_sub(1));
            let fitted = fixed(&n, spec.signed_width(width), after)?;
            Fitted {
                text: with_forced_sign(spec, width, &n, fitted.text),
                reduced: fitted.reduced,
            }
        }
        _ => {
            let width = spec.width.unwrap_or(config.standard_real_width());
            let after = spec.precision.unwrap_or(config.real_width.saturating_sub(1));
            let exp = i64::try_from(config.exp_width + 1).unwrap_or(4);
            let fitted = float(&n, spec.signed_width(width), after, exp)?;
            Fitted {
                text: with_forced_sign(spec, width, &n, fitted.text),
                reduced: fitted.reduced,
            }
        }
    };
    let text = pad(&fitted.text, spec.width, spec.align, ' ')
        .ok_or_else(|| spec.unfit("text wider than field"))?;
    Ok(Fitted {
        text,
        reduced: fitted.reduced,
    })
}

/// Render `value` through a resolved C-style pattern.
pub fn render_cstyle(
    spec: &CStyleSpec,
    value: &Value,
    config: &TransputConfig,
    arith: Option<&dyn LongArithmetic>,
) -> Rendering<Fitted> {
    match spec.kind {
        CStyleKind::Char | CStyleKind::String => {
            let text = match value {
                Value::Char(c) => c.to_string(),
                Value::Str(s) => s.clone(),
                other => other.describe(),
            };
            let text: String = match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            };
            pad(&text, spec.width, spec.align, ' ')
                .map(plain)
                .ok_or_else(|| spec.unfit("text wider than field"))
        }
        CStyleKind::Bits => {
            let Value::Bits(bits) = *value else {
                return Err(spec.unfit("bits value expected"));
            };
            let radix = radix_of(spec.letter);
            let width = spec.width.unwrap_or_else(|| bits_width(radix));
            pad(&to_radix(bits, radix), Some(width), spec.align, '0')
                .map(plain)
                .ok_or_else(|| spec.unfit("too many digits for field"))
        }
        _ => render_number(spec, value, config, arith),
    }
}

impl Transput<'_> {
    fn resolve_cstyle(
        &mut self,
        host: &mut dyn Host,
        p: &CStylePattern,
        env: EnvHandle,
    ) -> Result<CStyleSpec> {
        let width = match p.width {
            Some(count) => Some(self.eval_count(host, count, env)? as usize),
            None => None,
        };
        let precision = match p.precision {
            Some(count) => Some(self.eval_count(host, count, env)? as usize),
            None => None,
        };
        Ok(CStyleSpec {
            kind: p.kind,
            align: p.align,
            forced_sign: p.forced_sign,
            width,
            precision,
            letter: p.letter,
        })
    }

    pub(crate) fn write_cstyle(
        &mut self,
        host: &mut dyn Host,
        p: &CStylePattern,
        env: EnvHandle,
        value: &Value,
    ) -> Result<()> {
        let spec = self.resolve_cstyle(host, p, env)?;
        let rendering = render_cstyle(&spec, value, &self.config, host.long_arithmetic()).map(
            |fitted| {
                self.note_recovery(fitted.reduced);
                vec![InsertOp::Text(fitted.text)]
            },
        );
        self.emit_rendering(rendering, PatternKind::CStyle, value)
    }

    /// Exactly `width` characters, stopping short at end of line.
    fn read_field(&mut self, width: usize) -> Result<String> {
        let mut field = String::new();
        while field.chars().count() < width {
            match self.file.next_char() {
                Some('\n') => {
                    self.file.push_back('\n');
                    break;
                }
                Some(ch) => field.push(ch),
                None => break,
            }
        }
        if field.is_empty() && width > 0 && self.file.at_eof() {
            return Err(TransputError::EndOfFile {
                pattern: PatternKind::CStyle,
            });
        }
        Ok(field)
    }

    pub(crate) fn read_cstyle(
        &mut self,
        host: &mut dyn Host,
        p: &CStylePattern,
        env: EnvHandle,
        mode: Mode,
    ) -> Result<Value> {
        let pattern = PatternKind::CStyle;
        let spec = self.resolve_cstyle(host, p, env)?;
        let radix = radix_of(spec.letter);
        let text = match (spec.width, spec.kind) {
            (Some(width), CStyleKind::Char | CStyleKind::String) => self.read_field(width)?,
            (Some(width), _) => self.read_field(width)?.trim().to_string(),
            (None, CStyleKind::Char) => self.read_char(pattern)?.to_string(),
            (None, CStyleKind::String) => self.read_token(|ch, _| ch != '\n'),
            (None, CStyleKind::Bits) => {
                self.skip_blanks();
                self.read_token(|ch, _| ch.is_digit(radix))
            }
            (None, _) => self.read_number_token(pattern)?,
        };

        match (spec.kind, mode) {
            (CStyleKind::Char, _) | (CStyleKind::String, Mode::Char) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    (first, _) => {
                        self.value_error(pattern, text.clone(), "one character expected")?;
                        Ok(Value::Char(first.unwrap_or(' ')))
                    }
                }
            }
            (CStyleKind::String, _) => Ok(Value::Str(text)),
            (CStyleKind::Bits, _) => match u64::from_str_radix(&text, radix) {
                Ok(bits) => Ok(Value::Bits(bits)),
                Err(_) => {
                    self.value_error(pattern, text, "malformed bits denotation")?;
                    Ok(Value::Bits(0))
                }
            },
            (_, Mode::LongInt) => {
                let arith = long_arithmetic(host)?;
                Ok(Value::LongInt(arith.value_of(&text, 10)?))
            }
            (_, Mode::Int) => match text.parse::<i64>() {
                Ok(v) => Ok(Value::Int(v)),
                Err(_) => {
                    self.value_error(pattern, text, "malformed integer")?;
                    Ok(Value::Int(0))
                }
            },
            _ => self.real_value(host, mode, &text, pattern),
        }
    }
}
