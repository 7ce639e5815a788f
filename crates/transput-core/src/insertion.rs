//! Insertion executor.
//!
//! Insertions are first resolved into primitive [`InsertOp`]s (replications
//! expanded, dynamic counts evaluated), then either played onto the file
//! (write) or consumed from it (read).

use crate::error::{Result, TransputError};
use crate::picture::{Count, Insertion};
use crate::transput::{Direction, Transput};

/// A resolved layout directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOp {
    Text(String),
    Space,
    Line,
    Page,
    BackSkip(u64),
    /// 1-based target column.
    Column(u64),
}

impl InsertOp {
    /// Characters this op occupies on the current line.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Space => 1,
            Self::Line | Self::Page | Self::BackSkip(_) | Self::Column(_) => 0,
        }
    }

    /// The op with its visible text replaced by blanks of the same width.
    #[must_use]
    pub fn blanked(&self) -> Self {
        match self {
            Self::Text(s) => Self::Text(" ".repeat(s.chars().count())),
            other => other.clone(),
        }
    }
}

/// Expand `insertion` into `out`, evaluating counts through `eval`.
pub(crate) fn resolve_insertion(
    insertion: &Insertion,
    eval: &mut dyn FnMut(Count) -> Result<u64>,
    out: &mut Vec<InsertOp>,
) -> Result<()> {
    match insertion {
        Insertion::Literal(text) => out.push(InsertOp::Text(text.clone())),
        Insertion::Space => out.push(InsertOp::Space),
        Insertion::LineBreak => out.push(InsertOp::Line),
        Insertion::PageBreak => out.push(InsertOp::Page),
        Insertion::BackSkip(count) => out.push(InsertOp::BackSkip(eval(*count)?)),
        Insertion::Column(count) => out.push(InsertOp::Column(eval(*count)?)),
        Insertion::Replicated { count, items } => {
            let n = eval(*count)?;
            for _ in 0..n {
                for item in items {
                    resolve_insertion(item, eval, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Literal text of resolved ops, as matched by choice patterns.
#[must_use]
pub(crate) fn ops_text(ops: &[InsertOp]) -> String {
    let mut text = String::new();
    for op in ops {
        match op {
            InsertOp::Text(s) => text.push_str(s),
            InsertOp::Space => text.push(' '),
            InsertOp::Line => text.push('\n'),
            InsertOp::Page => text.push('\x0c'),
            InsertOp::BackSkip(_) | InsertOp::Column(_) => {}
        }
    }
    text
}

impl Transput<'_> {
    /// Perform resolved ops in the channel's current direction.
    pub(crate) fn execute_ops(&mut self, ops: &[InsertOp]) -> Result<()> {
        match self.direction {
            Direction::Write => self.put_ops(ops),
            Direction::Read => self.get_ops(ops),
        }
    }

    pub(crate) fn put_ops(&mut self, ops: &[InsertOp]) -> Result<()> {
        for op in ops {
            match op {
                InsertOp::Text(text) => self.file.put_str(text),
                InsertOp::Space => self.file.put_str(" "),
                InsertOp::Line => {
                    if !self.file.on_line_end() {
                        self.file.new_line();
                    }
                }
                InsertOp::Page => {
                    if !self.file.on_page_end() {
                        self.file.new_page();
                    }
                }
                InsertOp::BackSkip(n) => self.move_pointer(-(*n as i64))?,
                InsertOp::Column(k) => {
                    let target = k.saturating_sub(1) as usize;
                    let here = self.file.column();
                    if here < target {
                        self.file.put_str(&" ".repeat(target - here));
                    } else if here > target {
                        self.move_pointer(target as i64 - here as i64)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn get_ops(&mut self, ops: &[InsertOp]) -> Result<()> {
        for op in ops {
            match op {
                // Literal text is skipped, not validated.
                InsertOp::Text(text) => {
                    for _ in text.chars() {
                        if self.file.next_char().is_none() {
                            break;
                        }
                    }
                }
                InsertOp::Space => {
                    self.file.next_char();
                }
                InsertOp::Line => {
                    if !self.file.on_line_end() {
                        self.skip_past('\n');
                    }
                }
                InsertOp::Page => {
                    if !self.file.on_page_end() {
                        self.skip_past('\x0c');
                    }
                }
                InsertOp::BackSkip(n) => self.move_pointer(-(*n as i64))?,
                InsertOp::Column(k) => {
                    let target = k.saturating_sub(1) as usize;
                    let mut here = self.file.column();
                    while here < target {
                        match self.file.next_char() {
                            Some('\n') => {
                                self.file.push_back('\n');
                                break;
                            }
                            Some(_) => here += 1,
                            None => break,
                        }
                    }
                    if here > target {
                        self.move_pointer(target as i64 - here as i64)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn skip_past(&mut self, terminator: char) {
        while let Some(ch) = self.file.next_char() {
            if ch == terminator {
                break;
            }
        }
    }

    fn move_pointer(&mut self, offset: i64) -> Result<()> {
        if offset == 0 || self.file.reposition(offset) {
            Ok(())
        } else {
            Err(TransputError::PositionOutOfLine { offset })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;
    use crate::transput::Transput;

    fn fixed(count: Count) -> Result<u64> {
        match count {
            Count::Static(n) => Ok(u64::from(n)),
            Count::Dynamic(_) => Ok(2),
        }
    }

    #[test]
    fn replicated_insertions_expand() {
        let ins = Insertion::Replicated {
            count: Count::Static(3),
            items: vec![Insertion::Literal("ab".into()), Insertion::Space],
        };
        let mut ops = Vec::new();
        resolve_insertion(&ins, &mut fixed, &mut ops).unwrap();
        assert_eq!(ops.len(), 6);
        assert_eq!(ops_text(&ops), "ab ab ab ");
    }

    #[test]
    fn blanked_keeps_width() {
        assert_eq!(
            InsertOp::Text("1,0".into()).blanked(),
            InsertOp::Text("   ".into())
        );
        assert_eq!(InsertOp::Line.blanked(), InsertOp::Line);
        assert_eq!(InsertOp::Text("é".into()).width(), 1);
    }

    #[test]
    fn write_ops_with_breaks_and_columns() {
        let mut file = MemoryFile::new();
        {
            let mut chan = Transput::new(&mut file);
            chan.put_ops(&[
                InsertOp::Text("ab".into()),
                InsertOp::Column(5),
                InsertOp::Text("x".into()),
                InsertOp::BackSkip(3),
                InsertOp::Text("Y".into()),
                InsertOp::Line,
                InsertOp::Space,
            ])
            .unwrap();
        }
        assert_eq!(file.output(), "abY x\n ");
    }

    #[test]
    fn handled_line_end_suppresses_default_advance() {
        let mut file = MemoryFile::new().on_line_end_with(|| true);
        {
            let mut chan = Transput::new(&mut file);
            chan.put_ops(&[InsertOp::Text("a".into()), InsertOp::Line, InsertOp::Text("b".into())])
                .unwrap();
        }
        assert_eq!(file.output(), "ab");
        assert_eq!(file.lines(), 0);
    }

    #[test]
    fn back_skip_out_of_line_is_an_error() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        let err = chan.put_ops(&[InsertOp::Text("a".into()), InsertOp::BackSkip(4)]).unwrap_err();
        assert_eq!(err, TransputError::PositionOutOfLine { offset: -4 });
    }

    #[test]
    fn read_ops_skip_without_validation() {
        let mut file = MemoryFile::with_input("xy rest\nnext");
        {
            let mut chan = Transput::new(&mut file);
            chan.get_ops(&[InsertOp::Text("ab".into()), InsertOp::Space, InsertOp::Line])
                .unwrap();
        }
        assert_eq!(file.remaining_input(), "next");
    }

    #[test]
    fn read_column_skips_forward() {
        let mut file = MemoryFile::with_input("abcdef");
        {
            let mut chan = Transput::new(&mut file);
            chan.get_ops(&[InsertOp::Column(4)]).unwrap();
        }
        assert_eq!(file.remaining_input(), "def");
    }
}
