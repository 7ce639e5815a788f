//! String patterns: one `a` frame per character, `s` frames skip one.

use crate::error::Result;
use crate::format::EnvHandle;
use crate::host::Host;
use crate::insertion::InsertOp;
use crate::mould::{Step, positions};
use crate::picture::{PatternKind, StringFrame, StringPattern};
use crate::stringify::{Refusal, Rendering};
use crate::transput::Transput;
use crate::value::{Mode, Value};

fn shown_width(steps: &[Step<StringFrame>]) -> usize {
    steps
        .iter()
        .map(|step| match step {
            Step::Frame(StringFrame::Char) => 1,
            Step::Frame(StringFrame::Suppressed) => 0,
            Step::Insert(ops) => ops.iter().map(InsertOp::width).sum(),
        })
        .sum()
}

fn render_string(steps: &[Step<StringFrame>], text: &str) -> Rendering<Vec<InsertOp>> {
    let frames = positions(steps);
    if text.chars().count() != frames {
        return Err(Refusal::Unfit {
            width: shown_width(steps),
            reason: "string length differs from frame count",
        });
    }
    let mut chars = text.chars();
    let mut out = Vec::new();
    let mut run = String::new();
    for step in steps {
        match step {
            Step::Frame(frame) => {
                let ch = chars.next().unwrap_or(' ');
                if *frame == StringFrame::Char {
                    run.push(ch);
                }
            }
            Step::Insert(ops) => {
                if !run.is_empty() {
                    out.push(InsertOp::Text(std::mem::take(&mut run)));
                }
                out.extend(ops.iter().cloned());
            }
        }
    }
    if !run.is_empty() {
        out.push(InsertOp::Text(run));
    }
    Ok(out)
}

impl Transput<'_> {
    pub(crate) fn write_string(
        &mut self,
        host: &mut dyn Host,
        p: &StringPattern,
        env: EnvHandle,
        value: &Value,
    ) -> Result<()> {
        let mut steps = Vec::new();
        self.flatten_mould(host, &p.frames, env, &mut steps)?;
        let rendering = match value {
            Value::Str(s) => render_string(&steps, s),
            Value::Char(c) => render_string(&steps, &c.to_string()),
            other => render_string(&steps, &other.describe()),
        };
        self.emit_rendering(rendering, PatternKind::Str, value)
    }

    pub(crate) fn read_string(
        &mut self,
        host: &mut dyn Host,
        p: &StringPattern,
        env: EnvHandle,
        mode: Mode,
    ) -> Result<Value> {
        let mut steps = Vec::new();
        self.flatten_mould(host, &p.frames, env, &mut steps)?;
        let mut text = String::new();
        for step in &steps {
            match step {
                Step::Frame(StringFrame::Char) => text.push(self.read_char(PatternKind::Str)?),
                Step::Frame(StringFrame::Suppressed) => text.push(' '),
                Step::Insert(ops) => self.get_ops(ops)?,
            }
        }
        if mode != Mode::Char {
            return Ok(Value::Str(text));
        }
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::Char(c)),
            (first, _) => {
                self.value_error(PatternKind::Str, text.clone(), "one character expected")?;
                Ok(Value::Char(first.unwrap_or(' ')))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;
    use crate::host::StaticHost;
    use crate::picture::Mould;

    fn pattern(letters: &str) -> StringPattern {
        StringPattern {
            frames: Mould::from_letters(letters).unwrap(),
        }
    }

    fn write(p: &StringPattern, value: Value) -> (Result<()>, String) {
        let mut file = MemoryFile::new();
        let result = {
            let mut chan = Transput::new(&mut file);
            chan.write_string(&mut StaticHost, p, EnvHandle(0), &value)
        };
        (result, file.output())
    }

    #[test]
    fn frames_take_one_character_each() {
        let (_, out) = write(&pattern("3a\"-\"2a"), Value::Str("abcde".into()));
        assert_eq!(out, "abc-de");
    }

    #[test]
    fn suppressed_frames_skip_source_characters() {
        let (_, out) = write(&pattern("asa"), Value::Str("xyz".into()));
        assert_eq!(out, "xz");
    }

    #[test]
    fn length_mismatch_is_value_error() {
        let (result, out) = write(&pattern("4a"), Value::Str("ab".into()));
        assert_eq!(result.unwrap_err().tag(), "value_error");
        assert_eq!(out, "****");
    }

    #[test]
    fn char_value_is_one_character_string() {
        let (_, out) = write(&pattern("a"), Value::Char('q'));
        assert_eq!(out, "q");
    }

    #[test]
    fn read_with_suppressed_blank() {
        let mut file = MemoryFile::with_input("abcd");
        let got = {
            let mut chan = Transput::new(&mut file);
            chan.read_string(&mut StaticHost, &pattern("asa"), EnvHandle(0), Mode::Str)
                .unwrap()
        };
        assert_eq!(got, Value::Str("a b".into()));
        assert_eq!(file.remaining_input(), "cd");
    }
}
