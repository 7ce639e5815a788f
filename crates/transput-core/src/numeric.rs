//! Integral, real, complex and bits patterns.
//!
//! Writing converts the value to a digit string with the stringify
//! primitives and plays it through the flattened moulds. Reading walks the
//! same moulds, rebuilds a denotation and converts it back.

use crate::error::{Result, TransputError};
use crate::format::EnvHandle;
use crate::host::{Host, LongArithmetic};
use crate::insertion::InsertOp;
use crate::mould::{Step, display_width, pad_digits, positions, render};
use crate::picture::{
    BitsPattern, ComplexPattern, DigitFrame, ExponentPart, IntegralPattern, Marker, Mould,
    PatternKind, RealPattern, SignFrame, SignMould,
};
use crate::sign::sign_char;
use crate::stringify::{Number, Refusal, Rendering, to_radix};
use crate::transput::Transput;
use crate::value::{Mode, Value};

fn unfit(width: usize, reason: &'static str) -> Refusal {
    Refusal::Unfit { width, reason }
}

/// Sign frame and the digit steps in front of and after it, flattened.
#[derive(Debug, Clone, Default)]
struct SignedSteps {
    sign: Option<SignFrame>,
    steps: Vec<Step<DigitFrame>>,
    /// Positions contributed by the sign mould's lead frames.
    lead: usize,
}

impl SignedSteps {
    fn width(&self) -> usize {
        display_width(&self.steps) + usize::from(self.sign.is_some())
    }

    fn digit_positions(&self) -> usize {
        positions(&self.steps) - self.lead
    }

    /// Render `digits` (the magnitude, unpadded) with sign floating.
    fn render(&self, digits: &str, negative: bool, width: usize) -> Rendering<Vec<InsertOp>> {
        if negative && self.sign.is_none() {
            return Err(unfit(width, "negative value without a sign frame"));
        }
        let padded = pad_digits(digits.trim_start_matches('0'), self.digit_positions())
            .ok_or_else(|| unfit(width, "too many digits for mould"))?;
        let mut chars = vec!['0'; self.lead];
        chars.extend(padded);
        let sign = self.sign.map(|frame| sign_char(frame, negative));
        Ok(render(&self.steps, &chars, sign, true))
    }
}

#[derive(Debug, Clone)]
struct ExponentLayout {
    frame: Marker,
    digits: SignedSteps,
}

/// A real pattern with every mould flattened for one environment.
#[derive(Debug, Clone)]
struct RealLayout {
    integer: SignedSteps,
    point: Option<Marker>,
    fraction: Vec<Step<DigitFrame>>,
    exponent: Option<ExponentLayout>,
}

fn marker_width(marker: Option<Marker>) -> usize {
    usize::from(marker.is_some_and(|m| !m.suppressed))
}

impl RealLayout {
    fn width(&self) -> usize {
        self.integer.width()
            + marker_width(self.point)
            + display_width(&self.fraction)
            + self
                .exponent
                .as_ref()
                .map_or(0, |e| marker_width(Some(e.frame)) + e.digits.width())
    }

    fn render(&self, n: &Number<'_>) -> Rendering<Vec<InsertOp>> {
        let width = self.width();
        let before = self.integer.digit_positions();
        let after = positions(&self.fraction);
        let (text, exp) = match self.exponent {
            Some(_) => n.standardise(before, after)?,
            None => (n.fixed_digits(after)?, 0),
        };
        let (int_text, frac_text) = text.split_once('.').unwrap_or((text.as_str(), ""));
        let mut ops = self.integer.render(int_text, n.is_negative(), width)?;
        if self.point.is_some_and(|m| !m.suppressed) {
            ops.push(InsertOp::Text(".".to_string()));
        }
        let mut frac: Vec<char> = frac_text.chars().collect();
        frac.resize(after, '0');
        ops.extend(render(&self.fraction, &frac, None, false));
        if let Some(e) = &self.exponent {
            if !e.frame.suppressed {
                ops.push(InsertOp::Text("e".to_string()));
            }
            ops.extend(e.digits.render(&exp.unsigned_abs().to_string(), exp < 0, width)?);
        }
        Ok(ops)
    }
}

fn complex_parts<'a>(
    value: &Value,
    arith: Option<&'a dyn LongArithmetic>,
) -> Rendering<(Number<'a>, Number<'a>)> {
    match *value {
        Value::Complex(re, im) => Ok((Number::Real(re), Number::Real(im))),
        _ => Ok((Number::require(value, arith)?, Number::Real(0.0))),
    }
}

fn valid_radix(radix: u64) -> Option<u32> {
    match radix {
        2 | 4 | 8 | 16 => u32::try_from(radix).ok(),
        _ => None,
    }
}

fn or_zero(digits: &str) -> &str {
    if digits.is_empty() { "0" } else { digits }
}

impl Transput<'_> {
    fn signed_steps(
        &mut self,
        host: &mut dyn Host,
        sign: Option<&SignMould>,
        digits: Option<&Mould>,
        env: EnvHandle,
    ) -> Result<SignedSteps> {
        let mut out = SignedSteps {
            sign: sign.map(|s| s.frame),
            ..SignedSteps::default()
        };
        if let Some(mould) = sign {
            let mut lead = Vec::new();
            self.flatten_mould(host, &mould.lead, env, &mut lead)?;
            // Suppressible frames carry no meaning in front of a sign.
            lead.retain(|step| !matches!(step, Step::Frame(DigitFrame::Suppressible)));
            out.lead = positions(&lead);
            out.steps = lead;
        }
        if let Some(mould) = digits {
            self.flatten_mould(host, mould, env, &mut out.steps)?;
        }
        Ok(out)
    }

    fn real_layout(&mut self, host: &mut dyn Host, p: &RealPattern, env: EnvHandle) -> Result<RealLayout> {
        let integer = self.signed_steps(host, p.sign.as_ref(), p.integer.as_ref(), env)?;
        let mut fraction = Vec::new();
        if let Some(mould) = &p.fraction {
            self.flatten_mould(host, mould, env, &mut fraction)?;
        }
        let exponent = match &p.exponent {
            Some(ExponentPart {
                frame,
                sign,
                digits,
            }) => Some(ExponentLayout {
                frame: *frame,
                digits: self.signed_steps(host, sign.as_ref(), Some(digits), env)?,
            }),
            None => None,
        };
        Ok(RealLayout {
            integer,
            point: p.point,
            fraction,
            exponent,
        })
    }

    // -----------------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------------

    pub(crate) fn write_integral(
        &mut self,
        host: &mut dyn Host,
        p: &IntegralPattern,
        env: EnvHandle,
        value: &Value,
    ) -> Result<()> {
        let layout = self.signed_steps(host, p.sign.as_ref(), Some(&p.digits), env)?;
        let rendering = Number::require(value, host.long_arithmetic()).and_then(|n| {
            let digits = n.integer_digits(10)?;
            layout.render(&digits, n.is_negative(), layout.width())
        });
        self.emit_rendering(rendering, PatternKind::Integral, value)
    }

    pub(crate) fn write_real(
        &mut self,
        host: &mut dyn Host,
        p: &RealPattern,
        env: EnvHandle,
        value: &Value,
    ) -> Result<()> {
        let layout = self.real_layout(host, p, env)?;
        let rendering = Number::require(value, host.long_arithmetic())
            .and_then(|n| {
                if matches!(n, Number::Real(x) if !x.is_finite()) {
                    return Err(unfit(layout.width(), "not a finite number"));
                }
                layout.render(&n)
            });
        self.emit_rendering(rendering, PatternKind::Real, value)
    }

    pub(crate) fn write_complex(
        &mut self,
        host: &mut dyn Host,
        p: &ComplexPattern,
        env: EnvHandle,
        value: &Value,
    ) -> Result<()> {
        let re = self.real_layout(host, &p.real, env)?;
        let im = self.real_layout(host, &p.imag, env)?;
        let width = re.width() + marker_width(Some(p.connective)) + im.width();
        let rendering = complex_parts(value, host.long_arithmetic())
            .and_then(|(x, y)| {
                let mut ops = re.render(&x)?;
                if !p.connective.suppressed {
                    ops.push(InsertOp::Text("I".to_string()));
                }
                ops.extend(im.render(&y)?);
                Ok(ops)
            })
            .map_err(|refusal| match refusal {
                Refusal::Unfit { reason, .. } => Refusal::Unfit { width, reason },
                failed => failed,
            });
        self.emit_rendering(rendering, PatternKind::Complex, value)
    }

    pub(crate) fn write_bits(
        &mut self,
        host: &mut dyn Host,
        p: &BitsPattern,
        env: EnvHandle,
        value: &Value,
    ) -> Result<()> {
        let radix = self.eval_count(host, p.radix, env)?;
        let mut steps = Vec::new();
        self.flatten_mould(host, &p.digits, env, &mut steps)?;
        let width = display_width(&steps);
        let rendering = match (valid_radix(radix), value) {
            (None, _) => Err(unfit(width, "radix must be 2, 4, 8 or 16")),
            (Some(base), Value::Bits(bits)) => pad_digits(&to_radix(*bits, base), positions(&steps))
                .map(|digits| render(&steps, &digits, None, true))
                .ok_or_else(|| unfit(width, "too many digits for mould")),
            (Some(_), other) => Err(Refusal::Failed(TransputError::PatternMismatch {
                mode: other.mode(),
                pattern: PatternKind::Bits,
            })),
        };
        self.emit_rendering(rendering, PatternKind::Bits, value)
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    pub(crate) fn read_integral(
        &mut self,
        host: &mut dyn Host,
        p: &IntegralPattern,
        env: EnvHandle,
        mode: Mode,
    ) -> Result<Value> {
        let layout = self.signed_steps(host, p.sign.as_ref(), Some(&p.digits), env)?;
        let read = self.read_digits(&layout.steps, layout.sign, 10, true, PatternKind::Integral)?;
        let text = format!(
            "{}{}",
            if read.negative { "-" } else { "" },
            or_zero(&read.digits)
        );
        match mode {
            Mode::LongInt => {
                let arith = long_arithmetic(host)?;
                Ok(Value::LongInt(arith.value_of(&text, 10)?))
            }
            _ => match text.parse::<i64>() {
                Ok(v) => Ok(Value::Int(v)),
                Err(_) => {
                    self.value_error(PatternKind::Integral, text, "integer out of range")?;
                    Ok(Value::Int(0))
                }
            },
        }
    }

    /// Read a real field back into a denotation `[-]int.fract[e[-]exp]`.
    fn read_real_text(&mut self, layout: &RealLayout, pattern: PatternKind) -> Result<String> {
        let int = self.read_digits(&layout.integer.steps, layout.integer.sign, 10, true, pattern)?;
        if layout.point.is_some_and(|m| !m.suppressed) {
            let ch = self.read_char(pattern)?;
            if ch != '.' {
                self.value_error(pattern, ch.to_string(), "point expected")?;
            }
        }
        let frac = self.read_digits(&layout.fraction, None, 10, false, pattern)?;
        let mut text = format!(
            "{}{}.{}",
            if int.negative { "-" } else { "" },
            or_zero(&int.digits),
            or_zero(&frac.digits)
        );
        if let Some(e) = &layout.exponent {
            if !e.frame.suppressed {
                let ch = self.read_char(pattern)?;
                if !matches!(ch, 'e' | 'E' | '\\') {
                    self.value_error(pattern, ch.to_string(), "exponent expected")?;
                }
            }
            let exp = self.read_digits(&e.digits.steps, e.digits.sign, 10, true, pattern)?;
            text.push('e');
            if exp.negative {
                text.push('-');
            }
            text.push_str(or_zero(&exp.digits));
        }
        Ok(text)
    }

    pub(crate) fn real_value(
        &mut self,
        host: &mut dyn Host,
        mode: Mode,
        text: &str,
        pattern: PatternKind,
    ) -> Result<Value> {
        if mode == Mode::LongReal {
            let arith = long_arithmetic(host)?;
            return Ok(Value::LongReal(arith.value_of(text, 10)?));
        }
        match text.parse::<f64>() {
            Ok(x) => Ok(Value::Real(x)),
            Err(_) => {
                self.value_error(pattern, text, "malformed real denotation")?;
                Ok(Value::Real(0.0))
            }
        }
    }

    pub(crate) fn read_real(
        &mut self,
        host: &mut dyn Host,
        p: &RealPattern,
        env: EnvHandle,
        mode: Mode,
    ) -> Result<Value> {
        let layout = self.real_layout(host, p, env)?;
        let text = self.read_real_text(&layout, PatternKind::Real)?;
        self.real_value(host, mode, &text, PatternKind::Real)
    }

    pub(crate) fn read_complex(
        &mut self,
        host: &mut dyn Host,
        p: &ComplexPattern,
        env: EnvHandle,
    ) -> Result<Value> {
        let re_layout = self.real_layout(host, &p.real, env)?;
        let im_layout = self.real_layout(host, &p.imag, env)?;
        let re_text = self.read_real_text(&re_layout, PatternKind::Complex)?;
        if !p.connective.suppressed {
            let ch = self.read_char(PatternKind::Complex)?;
            if !matches!(ch, 'I' | 'i') {
                self.value_error(PatternKind::Complex, ch.to_string(), "connective I expected")?;
            }
        }
        let im_text = self.read_real_text(&im_layout, PatternKind::Complex)?;
        let re = self.real_value(host, Mode::Real, &re_text, PatternKind::Complex)?;
        let im = self.real_value(host, Mode::Real, &im_text, PatternKind::Complex)?;
        match (re, im) {
            (Value::Real(x), Value::Real(y)) => Ok(Value::Complex(x, y)),
            _ => Ok(Value::Complex(0.0, 0.0)),
        }
    }

    pub(crate) fn read_bits(&mut self, host: &mut dyn Host, p: &BitsPattern, env: EnvHandle) -> Result<Value> {
        let radix = self.eval_count(host, p.radix, env)?;
        let Some(base) = valid_radix(radix) else {
            self.value_error(PatternKind::Bits, radix.to_string(), "radix must be 2, 4, 8 or 16")?;
            return Ok(Value::Bits(0));
        };
        let mut steps = Vec::new();
        self.flatten_mould(host, &p.digits, env, &mut steps)?;
        let read = self.read_digits(&steps, None, base, true, PatternKind::Bits)?;
        match u64::from_str_radix(or_zero(&read.digits), base) {
            Ok(bits) => Ok(Value::Bits(bits)),
            Err(_) => {
                self.value_error(PatternKind::Bits, read.digits, "bits value out of range")?;
                Ok(Value::Bits(0))
            }
        }
    }
}

pub(crate) fn long_arithmetic(host: &dyn Host) -> Result<&dyn LongArithmetic> {
    host.long_arithmetic()
        .ok_or_else(|| TransputError::Host("long value without long arithmetic".to_string()))
}
