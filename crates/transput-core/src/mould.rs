//! Mould engine.
//!
//! A mould is flattened into [`Step`]s (frames and resolved insertions)
//! before use. Writing walks the steps against a digit string that already
//! has one digit per frame; reading walks them against the input and
//! rebuilds that digit string.

use crate::error::{Result, TransputError};
use crate::format::EnvHandle;
use crate::host::Host;
use crate::insertion::{InsertOp, resolve_insertion};
use crate::picture::{Count, DigitFrame, Mould, MouldItem, PatternKind, SignFrame};
use crate::sign;
use crate::transput::Transput;

/// One position of a flattened mould.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<F> {
    Frame(F),
    Insert(Vec<InsertOp>),
}

/// Expand `mould` into `out`, evaluating replicator counts through `eval`.
pub(crate) fn flatten<F: Copy>(
    mould: &Mould<F>,
    eval: &mut dyn FnMut(Count) -> Result<u64>,
    out: &mut Vec<Step<F>>,
) -> Result<()> {
    flatten_items(&mould.items, eval, out)
}

fn flatten_items<F: Copy>(
    items: &[MouldItem<F>],
    eval: &mut dyn FnMut(Count) -> Result<u64>,
    out: &mut Vec<Step<F>>,
) -> Result<()> {
    for item in items {
        match item {
            MouldItem::Frame(frame) => out.push(Step::Frame(*frame)),
            MouldItem::Insertion(insertion) => {
                let mut ops = Vec::new();
                resolve_insertion(insertion, eval, &mut ops)?;
                out.push(Step::Insert(ops));
            }
            MouldItem::Replicator { count, items } => {
                for _ in 0..eval(*count)? {
                    flatten_items(items, eval, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Number of frames (digit positions, shown or not).
#[must_use]
pub fn positions<F>(steps: &[Step<F>]) -> usize {
    steps.iter().filter(|s| matches!(s, Step::Frame(_))).count()
}

/// Characters a rendering of `steps` occupies, sign excluded.
#[must_use]
pub fn display_width(steps: &[Step<DigitFrame>]) -> usize {
    steps
        .iter()
        .map(|step| match step {
            Step::Frame(DigitFrame::Suppressible) => 0,
            Step::Frame(_) => 1,
            Step::Insert(ops) => ops.iter().map(InsertOp::width).sum(),
        })
        .sum()
}

/// Render `digits` (one per frame) through `steps`.
///
/// With `suppress`, `z` frames blank leading zeros and literal insertions
/// met while blanking are blanked too. `sign` is placed by
/// [`sign::float_position`].
#[must_use]
pub fn render(
    steps: &[Step<DigitFrame>],
    digits: &[char],
    sign: Option<char>,
    suppress: bool,
) -> Vec<InsertOp> {
    let sign_at = sign.map(|ch| (ch, sign::float_position(steps, digits, suppress)));
    let mut out = Vec::new();
    let mut text = String::new();
    let mut blanking = suppress;
    let mut index = 0;
    for step in steps {
        match step {
            Step::Frame(frame) => {
                if let Some((ch, at)) = sign_at
                    && at == index
                {
                    text.push(ch);
                    blanking = false;
                }
                let digit = digits.get(index).copied().unwrap_or('0');
                match frame {
                    DigitFrame::ZeroSuppressing if blanking && digit == '0' => text.push(' '),
                    DigitFrame::ZeroSuppressing | DigitFrame::Mandatory => {
                        blanking = false;
                        text.push(digit);
                    }
                    DigitFrame::Suppressible => {
                        if digit != '0' {
                            blanking = false;
                        }
                    }
                }
                index += 1;
            }
            Step::Insert(ops) => {
                if !text.is_empty() {
                    out.push(InsertOp::Text(std::mem::take(&mut text)));
                }
                if blanking {
                    out.extend(ops.iter().map(InsertOp::blanked));
                } else {
                    out.extend(ops.iter().cloned());
                }
            }
        }
    }
    if let Some((ch, at)) = sign_at
        && at >= index
    {
        text.push(ch);
    }
    if !text.is_empty() {
        out.push(InsertOp::Text(text));
    }
    out
}

/// Left-pad `digits` with zeros to `width`; `None` if it is already wider.
#[must_use]
pub fn pad_digits(digits: &str, width: usize) -> Option<Vec<char>> {
    let len = digits.chars().count();
    if len > width {
        return None;
    }
    let mut out = vec!['0'; width - len];
    out.extend(digits.chars());
    Some(out)
}

/// Digits read back by [`Transput::read_digits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDigits {
    pub negative: bool,
    pub digits: String,
}

impl Transput<'_> {
    /// Flatten a digit or string mould for the picture's environment.
    pub(crate) fn flatten_mould<F: Copy>(
        &mut self,
        host: &mut dyn Host,
        mould: &Mould<F>,
        env: EnvHandle,
        out: &mut Vec<Step<F>>,
    ) -> Result<()> {
        let mut eval = |count: Count| self.eval_count(host, count, env);
        flatten(mould, &mut eval, out)
    }

    /// Read one character per frame, validating digits in `radix`.
    ///
    /// A pending sign (`sign` is `Some`) is accepted in front of the first
    /// visible digit. Under a `-` sign frame a blank in a suppressed position
    /// is ambiguous; one character of look-ahead decides: a digit after it
    /// means the blank was the sign.
    pub(crate) fn read_digits(
        &mut self,
        steps: &[Step<DigitFrame>],
        sign: Option<SignFrame>,
        radix: u32,
        suppress: bool,
        pattern: PatternKind,
    ) -> Result<ReadDigits> {
        let mut negative = false;
        let mut sign_pending = sign;
        let mut blanking = suppress;
        let mut digits = String::new();
        for step in steps {
            let frame = match step {
                Step::Insert(ops) => {
                    self.get_ops(ops)?;
                    continue;
                }
                Step::Frame(DigitFrame::Suppressible) => {
                    digits.push('0');
                    continue;
                }
                Step::Frame(frame) => *frame,
            };
            let mut ch = self.read_char(pattern)?;
            if let Some(sign_frame) = sign_pending {
                if ch == ' ' && blanking && frame == DigitFrame::ZeroSuppressing {
                    let sign_blank = sign_frame == SignFrame::Minus
                        && self.peek_char().is_some_and(|next| next.is_digit(radix));
                    if !sign_blank {
                        digits.push('0');
                        continue;
                    }
                }
                match sign::parse_sign(sign_frame, ch) {
                    Some(neg) => {
                        negative = neg;
                        ch = self.read_char(pattern)?;
                    }
                    None => {
                        self.value_error(pattern, ch.to_string(), "sign expected")?;
                    }
                }
                sign_pending = None;
            }
            if ch == ' ' && blanking && frame == DigitFrame::ZeroSuppressing {
                digits.push('0');
            } else if ch.is_digit(radix) {
                blanking = false;
                digits.push(ch.to_ascii_lowercase());
            } else {
                self.value_error(pattern, ch.to_string(), "digit expected")?;
                blanking = false;
                digits.push('0');
            }
        }
        if let Some(sign_frame) = sign_pending {
            // Every position was suppressed; the sign trails the blanks.
            let ch = self.read_char(pattern)?;
            match sign::parse_sign(sign_frame, ch) {
                Some(neg) => negative = neg,
                None => self.value_error(pattern, ch.to_string(), "sign expected")?,
            }
        }
        Ok(ReadDigits { negative, digits })
    }

    pub(crate) fn read_char(&mut self, pattern: PatternKind) -> Result<char> {
        self.file
            .next_char()
            .ok_or(TransputError::EndOfFile { pattern })
    }

    fn peek_char(&mut self) -> Option<char> {
        let ch = self.file.next_char()?;
        self.file.push_back(ch);
        Some(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;
    use crate::picture::Insertion;

    fn steps(letters: &str) -> Vec<Step<DigitFrame>> {
        let mould: Mould = Mould::from_letters(letters).unwrap();
        let mut out = Vec::new();
        flatten(
            &mould,
            &mut |c| match c {
                Count::Static(n) => Ok(u64::from(n)),
                Count::Dynamic(_) => Ok(0),
            },
            &mut out,
        )
        .unwrap();
        out
    }

    fn text(ops: &[InsertOp]) -> String {
        crate::insertion::ops_text(ops)
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn zero_suppression_keeps_last_digit() {
        let s = steps("zzzzd");
        assert_eq!(text(&render(&s, &chars("00007"), None, true)), "    7");
        assert_eq!(text(&render(&s, &chars("00000"), None, true)), "    0");
        assert_eq!(text(&render(&s, &chars("12345"), None, true)), "12345");
    }

    #[test]
    fn sign_floats_to_first_digit() {
        let s = steps("zzd");
        assert_eq!(text(&render(&s, &chars("003"), Some('-'), true)), "  -3");
        assert_eq!(text(&render(&s, &chars("123"), Some('+'), true)), "+123");
        let all_z = steps("zzz");
        assert_eq!(text(&render(&all_z, &chars("000"), Some('-'), true)), "   -");
    }

    #[test]
    fn separators_blank_while_suppressing() {
        let s = steps("z,zzd");
        assert_eq!(text(&render(&s, &chars("0012"), None, true)), "   12");
        assert_eq!(text(&render(&s, &chars("1234"), None, true)), "1,234");
    }

    #[test]
    fn suppressible_frames_consume_silently() {
        let s = steps("dsd");
        assert_eq!(text(&render(&s, &chars("123"), None, true)), "13");
        assert_eq!(display_width(&s), 2);
        assert_eq!(positions(&s), 3);
    }

    #[test]
    fn fraction_mood_shows_zeros() {
        let s = steps("zz");
        assert_eq!(text(&render(&s, &chars("05"), None, false)), "05");
    }

    #[test]
    fn replicated_frames_flatten() {
        let s = steps("3zd");
        assert_eq!(positions(&s), 4);
    }

    #[test]
    fn pad_digits_rejects_overflow() {
        assert_eq!(pad_digits("7", 3), Some(chars("007")));
        assert_eq!(pad_digits("1234", 3), None);
    }

    #[test]
    fn insertion_steps_keep_order() {
        let mould = Mould::new(vec![
            MouldItem::Frame(DigitFrame::Mandatory),
            MouldItem::Insertion(Insertion::Literal("-".into())),
            MouldItem::Frame(DigitFrame::Mandatory),
        ]);
        let mut out = Vec::new();
        flatten(&mould, &mut |_| Ok(1), &mut out).unwrap();
        assert_eq!(text(&render(&out, &chars("42"), None, true)), "4-2");
    }

    fn read(input: &str, letters: &str, sign: Option<SignFrame>) -> (ReadDigits, String) {
        let mut file = MemoryFile::with_input(input);
        let got = {
            let mut chan = Transput::new(&mut file);
            chan.read_digits(&steps(letters), sign, 10, true, PatternKind::Integral)
                .unwrap()
        };
        (got, file.remaining_input())
    }

    #[test]
    fn read_suppressed_blanks_as_zeros() {
        let (got, rest) = read("    7,", "zzzzd", None);
        assert_eq!(got.digits, "00007");
        assert!(!got.negative);
        assert_eq!(rest, ",");
    }

    #[test]
    fn read_floating_sign() {
        let (got, _) = read("  -3", "zzd", Some(SignFrame::Plus));
        assert_eq!(got.digits, "003");
        assert!(got.negative);
        let (got, _) = read("+123", "zzd", Some(SignFrame::Plus));
        assert_eq!(got.digits, "123");
        assert!(!got.negative);
    }

    #[test]
    fn read_minus_frame_blank_sign_uses_lookahead() {
        let (got, rest) = read(" 123;", "zzd", Some(SignFrame::Minus));
        assert_eq!(got.digits, "123");
        assert!(!got.negative);
        assert_eq!(rest, ";");
        let (got, rest) = read("   5;", "zzd", Some(SignFrame::Minus));
        assert_eq!(got.digits, "005");
        assert_eq!(rest, ";");
    }

    #[test]
    fn read_bad_digit_is_value_error() {
        let mut file = MemoryFile::with_input("1x3");
        let mut chan = Transput::new(&mut file);
        let err = chan
            .read_digits(&steps("ddd"), None, 10, true, PatternKind::Integral)
            .unwrap_err();
        assert_eq!(err.tag(), "value_error");
    }

    #[test]
    fn read_bad_digit_recovered_substitutes_zero() {
        let mut file = MemoryFile::with_input("1x3").on_value_error_with(|| true);
        let mut chan = Transput::new(&mut file);
        let got = chan
            .read_digits(&steps("ddd"), None, 10, true, PatternKind::Integral)
            .unwrap();
        assert_eq!(got.digits, "103");
    }

    #[test]
    fn read_radix_digits() {
        let mut file = MemoryFile::with_input("fF0");
        let mut chan = Transput::new(&mut file);
        let got = chan
            .read_digits(&steps("ddd"), None, 16, true, PatternKind::Bits)
            .unwrap();
        assert_eq!(got.digits, "ff0");
    }

    #[test]
    fn read_at_eof_fails() {
        let mut file = MemoryFile::with_input("1");
        let mut chan = Transput::new(&mut file);
        let err = chan
            .read_digits(&steps("dd"), None, 10, true, PatternKind::Integral)
            .unwrap_err();
        assert_eq!(err, TransputError::EndOfFile { pattern: PatternKind::Integral });
    }
}
