//! General pattern: `g`, `g(w)`, `g(w, a)`, `g(w, a, e)`.

use crate::config::TransputConfig;
use crate::error::{Result, TransputError};
use crate::format::EnvHandle;
use crate::host::{Host, LongArithmetic};
use crate::insertion::InsertOp;
use crate::numeric::long_arithmetic;
use crate::picture::{Count, GeneralPattern, PatternKind};
use crate::stringify::{Fitted, Number, Rendering, fixed, float, whole};
use crate::transput::Transput;
use crate::value::{Mode, Value};

/// Text of a `g`-rendered value and whether a fraction width was reduced.
struct General {
    text: String,
    reduced: bool,
}

impl From<Fitted> for General {
    fn from(fitted: Fitted) -> Self {
        Self {
            text: fitted.text,
            reduced: fitted.reduced,
        }
    }
}

impl From<String> for General {
    fn from(text: String) -> Self {
        Self {
            text,
            reduced: false,
        }
    }
}

fn width_arg(arg: i64) -> usize {
    usize::try_from(arg).unwrap_or(0)
}

/// The standard representation used when `g` has no arguments.
fn standard(n: &Number<'_>, config: &TransputConfig) -> Rendering<General> {
    match n {
        Number::Int(_) | Number::LongInt(..) => whole(n, 0).map(General::from),
        Number::Real(_) | Number::LongReal(..) => {
            let width = -(config.standard_real_width() as i64);
            let after = config.real_width.saturating_sub(1);
            let exp = config.exp_width as i64 + 1;
            float(n, width, after, exp).map(General::from)
        }
    }
}

fn render_number(n: &Number<'_>, args: &[i64], config: &TransputConfig) -> Rendering<General> {
    match *args {
        [] => standard(n, config),
        [w] => whole(n, w).map(General::from),
        [w, a] => fixed(n, w, width_arg(a)).map(General::from),
        [w, a, e, ..] => float(n, w, width_arg(a), e).map(General::from),
    }
}

fn render_general(
    value: &Value,
    args: &[i64],
    config: &TransputConfig,
    arith: Option<&dyn LongArithmetic>,
) -> Rendering<General> {
    match value {
        Value::Bool(b) => Ok(General::from(
            if *b { config.flip } else { config.flop }.to_string(),
        )),
        Value::Char(c) => Ok(General::from(c.to_string())),
        Value::Str(s) => Ok(General::from(s.clone())),
        Value::Bits(bits) => Ok(General::from(
            (0..64)
                .rev()
                .map(|i| {
                    if (*bits >> i) & 1 == 1 {
                        config.flip
                    } else {
                        config.flop
                    }
                })
                .collect::<String>(),
        )),
        Value::Complex(re, im) => {
            let re = render_number(&Number::Real(*re), args, config)?;
            let im = render_number(&Number::Real(*im), args, config)?;
            Ok(General {
                text: format!("{}I{}", re.text, im.text),
                reduced: re.reduced || im.reduced,
            })
        }
        numeric => render_number(&Number::require(numeric, arith)?, args, config),
    }
}

fn is_number_char(ch: char, so_far: &str) -> bool {
    ch.is_ascii_digit()
        || matches!(ch, '.' | 'e' | 'E')
        || (matches!(ch, '+' | '-') && (so_far.is_empty() || so_far.ends_with(['e', 'E'])))
}

impl Transput<'_> {
    /// Evaluate a signed argument (widths may be negative).
    fn eval_arg(&mut self, host: &mut dyn Host, count: Count, env: EnvHandle) -> Result<i64> {
        match count {
            Count::Static(n) => Ok(i64::from(n)),
            Count::Dynamic(expr) => host.eval_int(expr, env, self),
        }
    }

    pub(crate) fn write_general(
        &mut self,
        host: &mut dyn Host,
        p: &GeneralPattern,
        env: EnvHandle,
        value: &Value,
    ) -> Result<()> {
        let mut args = Vec::with_capacity(p.args.len());
        for count in &p.args {
            args.push(self.eval_arg(host, *count, env)?);
        }
        let rendering = render_general(value, &args, &self.config, host.long_arithmetic())
            .map(|general| {
                self.note_recovery(general.reduced);
                vec![InsertOp::Text(general.text)]
            });
        self.emit_rendering(rendering, PatternKind::General, value)
    }

    pub(crate) fn skip_blanks(&mut self) {
        while let Some(ch) = self.file.next_char() {
            if ch != ' ' {
                self.file.push_back(ch);
                break;
            }
        }
    }

    /// Read characters while `accept(ch, text_so_far)` holds.
    pub(crate) fn read_token(&mut self, accept: impl Fn(char, &str) -> bool) -> String {
        let mut token = String::new();
        while let Some(ch) = self.file.next_char() {
            if !accept(ch, &token) {
                self.file.push_back(ch);
                break;
            }
            token.push(ch);
        }
        token
    }

    pub(crate) fn read_number_token(&mut self, pattern: PatternKind) -> Result<String> {
        self.skip_blanks();
        let token = self.read_token(is_number_char);
        if token.is_empty() && self.file.at_eof() {
            return Err(TransputError::EndOfFile { pattern });
        }
        Ok(token)
    }

    pub(crate) fn read_general(
        &mut self,
        host: &mut dyn Host,
        _p: &GeneralPattern,
        _env: EnvHandle,
        mode: Mode,
    ) -> Result<Value> {
        let pattern = PatternKind::General;
        match mode {
            Mode::Char => {
                self.skip_blanks();
                Ok(Value::Char(self.read_char(pattern)?))
            }
            Mode::Str => Ok(Value::Str(self.read_token(|ch, _| ch != '\n'))),
            Mode::Bool => {
                self.skip_blanks();
                let ch = self.read_char(pattern)?;
                if ch == self.config.flip {
                    Ok(Value::Bool(true))
                } else if ch == self.config.flop {
                    Ok(Value::Bool(false))
                } else {
                    self.value_error(pattern, ch.to_string(), "flip or flop expected")?;
                    Ok(Value::Bool(false))
                }
            }
            Mode::Bits => {
                self.skip_blanks();
                let (flip, flop) = (self.config.flip, self.config.flop);
                let token = self.read_token(|ch, so_far| {
                    (ch == flip || ch == flop) && so_far.chars().count() < 64
                });
                if token.is_empty() {
                    self.value_error(pattern, token.clone(), "flip or flop expected")?;
                }
                let bits = token
                    .chars()
                    .fold(0u64, |acc, ch| (acc << 1) | u64::from(ch == flip));
                Ok(Value::Bits(bits))
            }
            Mode::Int => {
                let token = self.read_number_token(pattern)?;
                match token.parse::<i64>() {
                    Ok(v) => Ok(Value::Int(v)),
                    Err(_) => {
                        self.value_error(pattern, token, "malformed integer")?;
                        Ok(Value::Int(0))
                    }
                }
            }
            Mode::LongInt => {
                let token = self.read_number_token(pattern)?;
                let arith = long_arithmetic(host)?;
                Ok(Value::LongInt(arith.value_of(&token, 10)?))
            }
            Mode::Real | Mode::LongReal => {
                let token = self.read_number_token(pattern)?;
                self.real_value(host, mode, &token, pattern)
            }
            Mode::Complex => {
                let re = self.read_number_token(pattern)?;
                self.skip_blanks();
                let ch = self.read_char(pattern)?;
                if !matches!(ch, 'I' | 'i') {
                    self.value_error(pattern, ch.to_string(), "connective I expected")?;
                }
                let im = self.read_number_token(pattern)?;
                let re = self.real_value(host, Mode::Real, &re, pattern)?;
                let im = self.real_value(host, Mode::Real, &im, pattern)?;
                match (re, im) {
                    (Value::Real(x), Value::Real(y)) => Ok(Value::Complex(x, y)),
                    _ => Ok(Value::Complex(0.0, 0.0)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;
    use crate::host::StaticHost;

    fn g(args: &[u32]) -> GeneralPattern {
        GeneralPattern {
            args: args.iter().map(|&a| Count::Static(a)).collect(),
        }
    }

    fn write(p: &GeneralPattern, value: Value) -> String {
        let mut file = MemoryFile::new();
        {
            let mut chan = Transput::new(&mut file);
            chan.write_general(&mut StaticHost, p, EnvHandle(0), &value)
                .unwrap();
        }
        file.output()
    }

    fn read(input: &str, mode: Mode) -> (Value, String) {
        let mut file = MemoryFile::with_input(input);
        let value = {
            let mut chan = Transput::new(&mut file);
            chan.read_general(&mut StaticHost, &g(&[]), EnvHandle(0), mode)
                .unwrap()
        };
        (value, file.remaining_input())
    }

    #[test]
    fn standard_representations() {
        assert_eq!(write(&g(&[]), Value::Int(-42)), "-42");
        assert_eq!(
            write(&g(&[]), Value::Real(1.5)),
            "+1.50000000000000e  +0"
        );
        assert_eq!(write(&g(&[]), Value::Bool(true)), "T");
        assert_eq!(write(&g(&[]), Value::Str("hi".into())), "hi");
        let bits = write(&g(&[]), Value::Bits(5));
        assert_eq!(bits.len(), 64);
        assert!(bits.ends_with("TFT"));
    }

    #[test]
    fn standard_representation_of_extreme_reals() {
        assert_eq!(write(&g(&[]), Value::Real(5e-324)), "+5.00000000000000e-324");
        assert_eq!(write(&g(&[]), Value::Real(f64::MAX)), "+1.79769313486232e+308");
    }

    #[test]
    fn argument_forms() {
        assert_eq!(write(&g(&[5]), Value::Int(42)), "   42");
        assert_eq!(write(&g(&[8, 3]), Value::Real(3.14159)), "   3.142");
        assert_eq!(write(&g(&[0, 2, 0]), Value::Real(-1234.0)), "-1.23e3");
        assert_eq!(write(&g(&[6, 1]), Value::Complex(1.0, 2.0)), "   1.0I   2.0");
    }

    #[test]
    fn fraction_reduction_is_counted() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        chan.write_general(&mut StaticHost, &g(&[5, 3]), EnvHandle(0), &Value::Real(99.996))
            .unwrap();
        assert_eq!(chan.metrics().snapshot().fraction_recoveries, 1);
    }

    #[test]
    fn reads_skip_blanks_and_stop_at_delimiters() {
        let (v, rest) = read("   -17,x", Mode::Int);
        assert_eq!(v, Value::Int(-17));
        assert_eq!(rest, ",x");
        let (v, rest) = read(" 2.5e-1 ", Mode::Real);
        assert_eq!(v, Value::Real(0.25));
        assert_eq!(rest, " ");
        let (v, _) = read("1.0I-2", Mode::Complex);
        assert_eq!(v, Value::Complex(1.0, -2.0));
        let (v, rest) = read("rest of line\nnext", Mode::Str);
        assert_eq!(v, Value::Str("rest of line".into()));
        assert_eq!(rest, "\nnext");
        let (v, _) = read("TFT", Mode::Bits);
        assert_eq!(v, Value::Bits(5));
    }

    #[test]
    fn malformed_integer_is_value_error() {
        let mut file = MemoryFile::with_input("--3");
        let mut chan = Transput::new(&mut file);
        let err = chan
            .read_general(&mut StaticHost, &g(&[]), EnvHandle(0), Mode::Int)
            .unwrap_err();
        assert_eq!(err.tag(), "value_error");
    }
}
