//! Character-level file seam and an in-memory implementation.
//!
//! The engine touches a file only through [`TransputFile`]: character input
//! with multi-level push-back, text output with a movable record pointer,
//! and the event hooks. A hook returns `true` when it handled the event and
//! transput should continue; the default for every hook is `false`.

/// Character stream as seen by the transput engine.
pub trait TransputFile {
    /// Next input character, or `None` at end of file.
    fn next_char(&mut self) -> Option<char>;
    /// Return a character to the input; pushed characters are read back LIFO.
    fn push_back(&mut self, ch: char);
    fn at_eof(&self) -> bool;

    fn put_str(&mut self, text: &str);
    fn new_line(&mut self);
    fn new_page(&mut self);
    /// 0-based position of the record pointer within the current line.
    fn column(&self) -> usize;
    /// Move the record pointer by `offset` positions within the current
    /// line. Returns false if the target lies outside it.
    fn reposition(&mut self, offset: i64) -> bool;

    fn on_line_end(&mut self) -> bool {
        false
    }
    fn on_page_end(&mut self) -> bool {
        false
    }
    fn on_format_end(&mut self) -> bool {
        false
    }
    fn on_format_error(&mut self) -> bool {
        false
    }
    fn on_value_error(&mut self) -> bool {
        false
    }
}

/// Event handler closure installed on a [`MemoryFile`].
pub type Hook = Box<dyn FnMut() -> bool>;

#[derive(Default)]
struct Hooks {
    line_end: Option<Hook>,
    page_end: Option<Hook>,
    format_end: Option<Hook>,
    format_error: Option<Hook>,
    value_error: Option<Hook>,
}

fn fire(hook: &mut Option<Hook>) -> bool {
    hook.as_mut().is_some_and(|h| h())
}

/// Which side of a [`MemoryFile`] the record pointer describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

/// In-memory file: a fixed input text and a growable output document.
///
/// Output is kept as characters with a cursor so back-skips overwrite what
/// was written. `\n` ends a line and `\x0c` ends a page.
pub struct MemoryFile {
    input: Vec<char>,
    pos: usize,
    pushed: Vec<char>,
    read_column: usize,
    output: Vec<char>,
    line_start: usize,
    cursor: usize,
    lines: usize,
    pages: usize,
    direction: Direction,
    hooks: Hooks,
}

impl MemoryFile {
    /// An empty file opened for writing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: Vec::new(),
            pos: 0,
            pushed: Vec::new(),
            read_column: 0,
            output: Vec::new(),
            line_start: 0,
            cursor: 0,
            lines: 0,
            pages: 0,
            direction: Direction::Write,
            hooks: Hooks::default(),
        }
    }

    /// A file opened for reading `text`.
    #[must_use]
    pub fn with_input(text: &str) -> Self {
        Self {
            input: text.chars().collect(),
            direction: Direction::Read,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn on_line_end_with(mut self, hook: impl FnMut() -> bool + 'static) -> Self {
        self.hooks.line_end = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_page_end_with(mut self, hook: impl FnMut() -> bool + 'static) -> Self {
        self.hooks.page_end = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_format_end_with(mut self, hook: impl FnMut() -> bool + 'static) -> Self {
        self.hooks.format_end = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_format_error_with(mut self, hook: impl FnMut() -> bool + 'static) -> Self {
        self.hooks.format_error = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_value_error_with(mut self, hook: impl FnMut() -> bool + 'static) -> Self {
        self.hooks.value_error = Some(Box::new(hook));
        self
    }

    /// Everything written so far.
    #[must_use]
    pub fn output(&self) -> String {
        self.output.iter().collect()
    }

    /// Input not yet consumed, pushed-back characters first.
    #[must_use]
    pub fn remaining_input(&self) -> String {
        self.pushed
            .iter()
            .rev()
            .chain(self.input[self.pos..].iter())
            .collect()
    }

    /// Line breaks written.
    #[must_use]
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Page breaks written.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages
    }

    fn put_char(&mut self, ch: char) {
        if self.cursor < self.output.len() {
            self.output[self.cursor] = ch;
        } else {
            self.output.push(ch);
        }
        self.cursor += 1;
    }

    fn end_record(&mut self, terminator: char) {
        self.cursor = self.output.len();
        self.put_char(terminator);
        self.line_start = self.output.len();
    }

    fn logical_read_pos(&self) -> usize {
        self.pos.saturating_sub(self.pushed.len())
    }
}

impl Default for MemoryFile {
    fn default() -> Self {
        Self::new()
    }
}

impl TransputFile for MemoryFile {
    fn next_char(&mut self) -> Option<char> {
        let ch = match self.pushed.pop() {
            Some(ch) => ch,
            None => {
                let ch = *self.input.get(self.pos)?;
                self.pos += 1;
                ch
            }
        };
        if ch == '\n' || ch == '\x0c' {
            self.read_column = 0;
        } else {
            self.read_column += 1;
        }
        Some(ch)
    }

    fn push_back(&mut self, ch: char) {
        self.pushed.push(ch);
        self.read_column = if ch == '\n' || ch == '\x0c' {
            // Back on the previous line: count to its start.
            self.input[..self.logical_read_pos()]
                .iter()
                .rev()
                .take_while(|&&c| c != '\n' && c != '\x0c')
                .count()
        } else {
            self.read_column.saturating_sub(1)
        };
    }

    fn at_eof(&self) -> bool {
        self.pushed.is_empty() && self.pos >= self.input.len()
    }

    fn put_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.put_char(ch);
        }
    }

    fn new_line(&mut self) {
        self.end_record('\n');
        self.lines += 1;
    }

    fn new_page(&mut self) {
        self.end_record('\x0c');
        self.pages += 1;
    }

    fn column(&self) -> usize {
        match self.direction {
            Direction::Write => self.cursor - self.line_start,
            Direction::Read => self.read_column,
        }
    }

    fn reposition(&mut self, offset: i64) -> bool {
        match self.direction {
            Direction::Write => {
                let target = self.cursor as i64 + offset;
                if target < self.line_start as i64 || target > self.output.len() as i64 {
                    return false;
                }
                self.cursor = target as usize;
                true
            }
            Direction::Read => {
                let line_start = self.logical_read_pos() - self.read_column.min(self.logical_read_pos());
                let target = self.logical_read_pos() as i64 + offset;
                if target < line_start as i64 || target > self.input.len() as i64 {
                    return false;
                }
                self.pushed.clear();
                self.pos = target as usize;
                self.read_column = self.pos - line_start;
                true
            }
        }
    }

    fn on_line_end(&mut self) -> bool {
        fire(&mut self.hooks.line_end)
    }

    fn on_page_end(&mut self) -> bool {
        fire(&mut self.hooks.page_end)
    }

    fn on_format_end(&mut self) -> bool {
        fire(&mut self.hooks.format_end)
    }

    fn on_format_error(&mut self) -> bool {
        fire(&mut self.hooks.format_error)
    }

    fn on_value_error(&mut self) -> bool {
        fire(&mut self.hooks.value_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_read_with_push_back() {
        let mut f = MemoryFile::with_input("ab");
        assert_eq!(f.next_char(), Some('a'));
        assert_eq!(f.next_char(), Some('b'));
        assert!(f.at_eof());
        f.push_back('b');
        f.push_back('a');
        assert!(!f.at_eof());
        assert_eq!(f.remaining_input(), "ab");
        assert_eq!(f.next_char(), Some('a'));
        assert_eq!(f.next_char(), Some('b'));
        assert_eq!(f.next_char(), None);
    }

    #[test]
    fn test_push_back_of_line_end_restores_column() {
        let mut f = MemoryFile::with_input("abc\nd");
        for _ in 0..4 {
            f.next_char();
        }
        assert_eq!(f.column(), 0);
        f.push_back('\n');
        assert_eq!(f.column(), 3);
        assert!(f.reposition(-1));
        assert_eq!(f.next_char(), Some('c'));
        assert_eq!(f.column(), 3);
        assert_eq!(f.next_char(), Some('\n'));
        assert_eq!(f.column(), 0);
    }

    #[test]
    fn test_write_lines_and_columns() {
        let mut f = MemoryFile::new();
        f.put_str("abc");
        assert_eq!(f.column(), 3);
        f.new_line();
        assert_eq!(f.column(), 0);
        f.put_str("d");
        f.new_page();
        assert_eq!(f.output(), "abc\nd\x0c");
        assert_eq!(f.lines(), 1);
        assert_eq!(f.pages(), 1);
    }

    #[test]
    fn test_back_skip_overwrites() {
        let mut f = MemoryFile::new();
        f.put_str("12345");
        assert!(f.reposition(-2));
        f.put_str("x");
        assert_eq!(f.output(), "123x5");
        assert!(!f.reposition(-10));
        f.new_line();
        assert!(!f.reposition(-1));
    }

    #[test]
    fn test_read_reposition_stays_in_line() {
        let mut f = MemoryFile::with_input("ab\ncd");
        for _ in 0..4 {
            f.next_char();
        }
        assert_eq!(f.column(), 1);
        assert!(!f.reposition(-2));
        assert!(f.reposition(-1));
        assert_eq!(f.next_char(), Some('c'));
    }

    #[test]
    fn test_hooks_default_and_installed() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let mut f = MemoryFile::new().on_value_error_with(move || {
            seen.set(seen.get() + 1);
            true
        });
        assert!(f.on_value_error());
        assert!(f.on_value_error());
        assert_eq!(calls.get(), 2);
        assert!(!f.on_format_end());
        assert!(!f.on_line_end());
    }
}
