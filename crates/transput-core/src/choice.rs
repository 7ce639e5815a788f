//! Choice patterns: `b("yes", "no")` for booleans, `c("a", "b", ...)` for
//! integral selectors.
//!
//! Reading uses longest-match scanning over the alternatives' literal text.

use crate::error::Result;
use crate::format::EnvHandle;
use crate::host::Host;
use crate::insertion::{InsertOp, ops_text, resolve_insertion};
use crate::picture::{ChoiceKind, ChoicePattern, Count, PatternKind};
use crate::stringify::Refusal;
use crate::transput::Transput;
use crate::value::Value;

/// Outcome of matching consumed input against the alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceMatch {
    /// 0-based alternative and the number of characters it spans.
    Full { index: usize, len: usize },
    /// Only one alternative is consistent with the consumed prefix.
    UniquePrefix { index: usize },
    None,
}

/// Longest-match scanner state, fed one character at a time.
#[derive(Debug, Clone)]
pub struct ChoiceScanner<'a> {
    alternatives: &'a [Vec<char>],
    consumed: Vec<char>,
    best: Option<(usize, usize)>,
}

impl<'a> ChoiceScanner<'a> {
    #[must_use]
    pub fn new(alternatives: &'a [Vec<char>]) -> Self {
        Self {
            alternatives,
            consumed: Vec::new(),
            best: None,
        }
    }

    /// True while some alternative is longer than what has been consumed
    /// and agrees with it.
    #[must_use]
    pub fn wants_more(&self) -> bool {
        self.alternatives
            .iter()
            .any(|alt| alt.len() > self.consumed.len() && alt.starts_with(&self.consumed))
    }

    /// Offer the next character; `false` (and nothing consumed) if no
    /// alternative continues with it.
    pub fn feed(&mut self, ch: char) -> bool {
        self.consumed.push(ch);
        if !self.alternatives.iter().any(|alt| alt.starts_with(&self.consumed)) {
            self.consumed.pop();
            return false;
        }
        if let Some(index) = self.alternatives.iter().position(|alt| *alt == self.consumed) {
            self.best = Some((index, self.consumed.len()));
        }
        true
    }

    #[must_use]
    pub fn consumed(&self) -> &[char] {
        &self.consumed
    }

    #[must_use]
    pub fn outcome(&self) -> ChoiceMatch {
        if let Some((index, len)) = self.best {
            return ChoiceMatch::Full { index, len };
        }
        if self.consumed.is_empty() {
            return ChoiceMatch::None;
        }
        let mut consistent = self
            .alternatives
            .iter()
            .enumerate()
            .filter(|(_, alt)| alt.starts_with(&self.consumed));
        match (consistent.next(), consistent.next()) {
            (Some((index, _)), None) => ChoiceMatch::UniquePrefix { index },
            _ => ChoiceMatch::None,
        }
    }
}

impl Transput<'_> {
    fn resolve_alternatives(
        &mut self,
        host: &mut dyn Host,
        p: &ChoicePattern,
        env: EnvHandle,
    ) -> Result<Vec<Vec<InsertOp>>> {
        let mut resolved = Vec::with_capacity(p.alternatives.len());
        for alternative in &p.alternatives {
            let mut ops = Vec::new();
            let mut eval = |count: Count| self.eval_count(host, count, env);
            resolve_insertion(alternative, &mut eval, &mut ops)?;
            resolved.push(ops);
        }
        Ok(resolved)
    }

    pub(crate) fn write_choice(
        &mut self,
        host: &mut dyn Host,
        p: &ChoicePattern,
        env: EnvHandle,
        value: &Value,
    ) -> Result<()> {
        let selector = match (p.kind, value) {
            (ChoiceKind::Boolean, Value::Bool(b)) if p.alternatives.is_empty() => {
                let flag = if *b { self.config.flip } else { self.config.flop };
                let rendering = Ok(vec![InsertOp::Text(flag.to_string())]);
                return self.emit_rendering(rendering, PatternKind::Choice, value);
            }
            (_, Value::Bool(b)) => Some(if *b { 1 } else { 2 }),
            (_, Value::Int(v)) => Some(*v),
            _ => None,
        };
        let resolved = self.resolve_alternatives(host, p, env)?;
        let width = resolved
            .iter()
            .map(|ops| ops.iter().map(InsertOp::width).sum::<usize>())
            .max()
            .unwrap_or(1);
        let rendering = selector
            .and_then(|s| usize::try_from(s).ok())
            .and_then(|s| s.checked_sub(1))
            .and_then(|index| resolved.get(index).cloned())
            .ok_or(Refusal::Unfit {
                width,
                reason: "selector out of range",
            });
        self.emit_rendering(rendering, PatternKind::Choice, value)
    }

    pub(crate) fn read_choice(
        &mut self,
        host: &mut dyn Host,
        p: &ChoicePattern,
        env: EnvHandle,
    ) -> Result<Value> {
        if p.kind == ChoiceKind::Boolean && p.alternatives.is_empty() {
            let ch = self.read_char(PatternKind::Choice)?;
            let (flip, flop) = (self.config.flip, self.config.flop);
            return if ch.eq_ignore_ascii_case(&flip) {
                Ok(Value::Bool(true))
            } else if ch.eq_ignore_ascii_case(&flop) {
                Ok(Value::Bool(false))
            } else {
                self.value_error(PatternKind::Choice, ch.to_string(), "flip or flop expected")?;
                Ok(Value::Bool(false))
            };
        }

        let texts: Vec<Vec<char>> = self
            .resolve_alternatives(host, p, env)?
            .iter()
            .map(|ops| ops_text(ops).chars().collect())
            .collect();
        let mut scanner = ChoiceScanner::new(&texts);
        while scanner.wants_more() {
            let Some(ch) = self.file.next_char() else {
                break;
            };
            if !scanner.feed(ch) {
                self.file.push_back(ch);
                break;
            }
        }

        let index = match scanner.outcome() {
            ChoiceMatch::Full { index, len } => {
                for &ch in scanner.consumed()[len..].iter().rev() {
                    self.file.push_back(ch);
                }
                index
            }
            ChoiceMatch::UniquePrefix { index } => index,
            ChoiceMatch::None => {
                let seen: String = scanner.consumed().iter().collect();
                self.value_error(PatternKind::Choice, seen, "no alternative matches")?;
                0
            }
        };
        Ok(match p.kind {
            ChoiceKind::Boolean => Value::Bool(index == 0),
            ChoiceKind::Integral => Value::Int(index as i64 + 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;
    use crate::host::StaticHost;
    use crate::picture::Insertion;

    fn choice(kind: ChoiceKind, alts: &[&str]) -> ChoicePattern {
        ChoicePattern {
            kind,
            alternatives: alts
                .iter()
                .map(|a| Insertion::Literal((*a).to_string()))
                .collect(),
        }
    }

    fn read(input: &str, p: &ChoicePattern) -> (Result<Value>, String) {
        let mut file = MemoryFile::with_input(input);
        let got = {
            let mut chan = Transput::new(&mut file);
            chan.read_choice(&mut StaticHost, p, EnvHandle(0))
        };
        (got, file.remaining_input())
    }

    #[test]
    fn longest_match_leaves_rest() {
        let p = choice(ChoiceKind::Integral, &["no", "yes"]);
        let (v, rest) = read("yes,", &p);
        assert_eq!(v.unwrap(), Value::Int(2));
        assert_eq!(rest, ",");
        let (v, rest) = read("n,", &p);
        assert_eq!(v.unwrap(), Value::Int(1));
        assert_eq!(rest, ",");
    }

    #[test]
    fn longer_alternative_wins_over_its_prefix() {
        let p = choice(ChoiceKind::Integral, &["ab", "abcd", "x"]);
        let (v, rest) = read("abcd!", &p);
        assert_eq!(v.unwrap(), Value::Int(2));
        assert_eq!(rest, "!");
        let (v, rest) = read("abc!", &p);
        assert_eq!(v.unwrap(), Value::Int(1));
        assert_eq!(rest, "c!");
    }

    #[test]
    fn duplicate_alternatives_pick_first_declared() {
        let p = choice(ChoiceKind::Integral, &["on", "on", "off"]);
        let (v, _) = read("on", &p);
        assert_eq!(v.unwrap(), Value::Int(1));
    }

    #[test]
    fn ambiguous_prefix_is_value_error() {
        let p = choice(ChoiceKind::Integral, &["on", "off"]);
        let (v, _) = read("o;", &p);
        assert_eq!(v.unwrap_err().tag(), "value_error");
        let (v, rest) = read("?", &p);
        assert!(v.is_err());
        assert_eq!(rest, "?");
    }

    #[test]
    fn boolean_choice_round_trip() {
        let p = choice(ChoiceKind::Boolean, &["yes", "no"]);
        let mut file = MemoryFile::new();
        {
            let mut chan = Transput::new(&mut file);
            chan.write_choice(&mut StaticHost, &p, EnvHandle(0), &Value::Bool(false))
                .unwrap();
            chan.write_choice(&mut StaticHost, &p, EnvHandle(0), &Value::Bool(true))
                .unwrap();
        }
        assert_eq!(file.output(), "noyes");
        let (v, rest) = read("noyes", &p);
        assert_eq!(v.unwrap(), Value::Bool(false));
        assert_eq!(rest, "yes");
    }

    #[test]
    fn flip_flop_without_alternatives() {
        let p = choice(ChoiceKind::Boolean, &[]);
        let mut file = MemoryFile::new();
        {
            let mut chan = Transput::new(&mut file);
            chan.write_choice(&mut StaticHost, &p, EnvHandle(0), &Value::Bool(true))
                .unwrap();
        }
        assert_eq!(file.output(), "T");
        let (v, _) = read("f", &p);
        assert_eq!(v.unwrap(), Value::Bool(false));
    }

    #[test]
    fn selector_out_of_range() {
        let p = choice(ChoiceKind::Integral, &["a", "bcd"]);
        let mut file = MemoryFile::new();
        let result = {
            let mut chan = Transput::new(&mut file);
            chan.write_choice(&mut StaticHost, &p, EnvHandle(0), &Value::Int(3))
        };
        assert_eq!(result.unwrap_err().tag(), "value_error");
        assert_eq!(file.output(), "***");
    }
}
