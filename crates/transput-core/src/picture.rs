//! Picture tree data model.
//!
//! A compiled format is a tree of [`PictureNode`]s. Leaves are either
//! insertions (literal text and layout directives) or pictures wrapping one
//! [`Pattern`]. Replicators repeat a subtree; collections sequence children.
//!
//! All types deserialize from JSON so fixtures can describe formats
//! directly. Moulds additionally accept a letter shorthand (`"zzzd"`,
//! `"3z,zzd"`, `"aaa"`).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Host references
// ---------------------------------------------------------------------------

/// Opaque reference to a host expression (dynamic count, radix or sub-format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprHandle(pub u32);

/// A replication count, radix or width: fixed at compile time or evaluated
/// by the host when reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Count {
    Static(u32),
    Dynamic(ExprHandle),
}

// ---------------------------------------------------------------------------
// Insertions
// ---------------------------------------------------------------------------

/// Literal text and layout directives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insertion {
    Literal(String),
    Space,
    LineBreak,
    PageBreak,
    /// Move the record pointer back by `count` positions.
    BackSkip(Count),
    /// Move to 1-based column `count` of the current line.
    Column(Count),
    Replicated { count: Count, items: Vec<Insertion> },
}

// ---------------------------------------------------------------------------
// Moulds
// ---------------------------------------------------------------------------

/// Digit positions of a numeric mould.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitFrame {
    /// `z`: blank while leading zeros are suppressed.
    ZeroSuppressing,
    /// `d`: always the digit.
    Mandatory,
    /// `s`: the digit is consumed but not shown.
    Suppressible,
}

/// Character positions of a string mould.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringFrame {
    /// `a`: one character.
    Char,
    /// `s`: a skipped character.
    Suppressed,
}

/// Frame types that have a one-letter shorthand.
pub trait FrameLetter: Sized + Copy {
    fn from_letter(letter: char) -> Option<Self>;
}

impl FrameLetter for DigitFrame {
    fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'z' => Some(Self::ZeroSuppressing),
            'd' => Some(Self::Mandatory),
            's' => Some(Self::Suppressible),
            _ => None,
        }
    }
}

impl FrameLetter for StringFrame {
    fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'a' => Some(Self::Char),
            's' => Some(Self::Suppressed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouldItem<F> {
    Frame(F),
    Insertion(Insertion),
    Replicator { count: Count, items: Vec<MouldItem<F>> },
}

/// Fixed-shape sequence of frames with interleaved insertions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    try_from = "MouldRepr<F>",
    bound(deserialize = "F: FrameLetter + Deserialize<'de>")
)]
pub struct Mould<F = DigitFrame> {
    pub items: Vec<MouldItem<F>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MouldRepr<F> {
    Letters(String),
    Items(Vec<MouldItem<F>>),
}

impl<F: FrameLetter> TryFrom<MouldRepr<F>> for Mould<F> {
    type Error = MouldSyntaxError;

    fn try_from(repr: MouldRepr<F>) -> Result<Self, Self::Error> {
        match repr {
            MouldRepr::Letters(text) => Self::from_letters(&text),
            MouldRepr::Items(items) => Ok(Self { items }),
        }
    }
}

/// A letter shorthand that names no frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid mould shorthand at {position}: {found:?}")]
pub struct MouldSyntaxError {
    pub position: usize,
    pub found: char,
}

impl<F> Default for Mould<F> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<F: FrameLetter> Mould<F> {
    /// Build a mould from its letter shorthand.
    ///
    /// Frame letters map through [`FrameLetter`]. A decimal prefix replicates
    /// the following frame (`"3z"`), a double-quoted run is a literal
    /// insertion, a blank is a space insertion, and any other
    /// non-alphabetic character is a one-character literal.
    pub fn from_letters(text: &str) -> Result<Self, MouldSyntaxError> {
        let mut items = Vec::new();
        let mut chars = text.char_indices().peekable();
        while let Some((pos, ch)) = chars.next() {
            if ch.is_ascii_digit() {
                let mut count = ch.to_digit(10).unwrap_or(0);
                while let Some(&(_, next)) = chars.peek() {
                    let Some(d) = next.to_digit(10) else { break };
                    count = count.saturating_mul(10).saturating_add(d);
                    chars.next();
                }
                let Some((fpos, letter)) = chars.next() else {
                    return Err(MouldSyntaxError { position: pos, found: ch });
                };
                let frame = F::from_letter(letter).ok_or(MouldSyntaxError {
                    position: fpos,
                    found: letter,
                })?;
                items.push(MouldItem::Replicator {
                    count: Count::Static(count),
                    items: vec![MouldItem::Frame(frame)],
                });
            } else if ch == '"' {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, c)) => literal.push(c),
                        None => return Err(MouldSyntaxError { position: pos, found: ch }),
                    }
                }
                items.push(MouldItem::Insertion(Insertion::Literal(literal)));
            } else if ch == ' ' {
                items.push(MouldItem::Insertion(Insertion::Space));
            } else if ch.is_alphabetic() {
                let frame = F::from_letter(ch).ok_or(MouldSyntaxError {
                    position: pos,
                    found: ch,
                })?;
                items.push(MouldItem::Frame(frame));
            } else {
                items.push(MouldItem::Insertion(Insertion::Literal(ch.to_string())));
            }
        }
        Ok(Self { items })
    }
}

impl<F> Mould<F> {
    #[must_use]
    pub fn new(items: Vec<MouldItem<F>>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignFrame {
    /// `+`: `+` or `-`.
    Plus,
    /// `-`: blank or `-`.
    Minus,
}

/// Leading frames followed by the sign frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignMould {
    #[serde(default)]
    pub lead: Mould,
    pub frame: SignFrame,
}

impl SignMould {
    #[must_use]
    pub fn new(frame: SignFrame) -> Self {
        Self {
            lead: Mould::default(),
            frame,
        }
    }

    #[must_use]
    pub fn with_lead(lead: Mould, frame: SignFrame) -> Self {
        Self { lead, frame }
    }
}

/// Point, exponent or complex connective frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Marker {
    #[serde(default)]
    pub suppressed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntegralPattern {
    #[serde(default)]
    pub sign: Option<SignMould>,
    pub digits: Mould,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExponentPart {
    #[serde(default)]
    pub frame: Marker,
    #[serde(default)]
    pub sign: Option<SignMould>,
    pub digits: Mould,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RealPattern {
    #[serde(default)]
    pub sign: Option<SignMould>,
    #[serde(default)]
    pub integer: Option<Mould>,
    #[serde(default)]
    pub point: Option<Marker>,
    #[serde(default)]
    pub fraction: Option<Mould>,
    #[serde(default)]
    pub exponent: Option<ExponentPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComplexPattern {
    pub real: RealPattern,
    #[serde(default)]
    pub connective: Marker,
    pub imag: RealPattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BitsPattern {
    pub radix: Count,
    pub digits: Mould,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    Boolean,
    Integral,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChoicePattern {
    pub kind: ChoiceKind,
    #[serde(default)]
    pub alternatives: Vec<Insertion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StringPattern {
    pub frames: Mould<StringFrame>,
}

/// `g`, `g(w)`, `g(w, a)` or `g(w, a, e)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeneralPattern {
    #[serde(default)]
    pub args: Vec<Count>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CStyleKind {
    Char,
    String,
    Integral,
    Fixed,
    Float,
    General,
    Bits,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    #[default]
    Right,
}

/// printf/scanf-style picture: `%[-][+][width][.precision]letter`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CStyleRepr")]
pub struct CStylePattern {
    pub kind: CStyleKind,
    pub align: Align,
    pub forced_sign: bool,
    pub width: Option<Count>,
    pub precision: Option<Count>,
    pub letter: char,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CStyleRepr {
    Spec(String),
    Fields {
        kind: CStyleKind,
        #[serde(default)]
        align: Align,
        #[serde(default)]
        forced_sign: bool,
        #[serde(default)]
        width: Option<Count>,
        #[serde(default)]
        precision: Option<Count>,
        letter: char,
    },
}

impl TryFrom<CStyleRepr> for CStylePattern {
    type Error = String;

    fn try_from(repr: CStyleRepr) -> Result<Self, Self::Error> {
        match repr {
            CStyleRepr::Spec(text) => {
                Self::parse(&text).ok_or_else(|| format!("malformed C-style pattern {text:?}"))
            }
            CStyleRepr::Fields {
                kind,
                align,
                forced_sign,
                width,
                precision,
                letter,
            } => Ok(Self {
                kind,
                align,
                forced_sign,
                width,
                precision,
                letter,
            }),
        }
    }
}

/// One picture's conversion rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Integral(IntegralPattern),
    Real(RealPattern),
    Complex(ComplexPattern),
    Bits(BitsPattern),
    Choice(ChoicePattern),
    Str(StringPattern),
    General(GeneralPattern),
    CStyle(CStylePattern),
    /// A sub-format chosen by evaluating a host expression.
    Format(ExprHandle),
}

/// Pattern variant tag, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Integral,
    Real,
    Complex,
    Bits,
    Choice,
    Str,
    General,
    CStyle,
    Format,
}

impl Pattern {
    #[must_use]
    pub const fn kind(&self) -> PatternKind {
        match self {
            Self::Integral(_) => PatternKind::Integral,
            Self::Real(_) => PatternKind::Real,
            Self::Complex(_) => PatternKind::Complex,
            Self::Bits(_) => PatternKind::Bits,
            Self::Choice(_) => PatternKind::Choice,
            Self::Str(_) => PatternKind::Str,
            Self::General(_) => PatternKind::General,
            Self::CStyle(_) => PatternKind::CStyle,
            Self::Format(_) => PatternKind::Format,
        }
    }
}

impl PatternKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integral => "integral",
            Self::Real => "real",
            Self::Complex => "complex",
            Self::Bits => "bits",
            Self::Choice => "choice",
            Self::Str => "string",
            Self::General => "general",
            Self::CStyle => "C-style",
            Self::Format => "format",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A node of a compiled format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureNode {
    Insertion(Insertion),
    Picture(Pattern),
    Replicator { count: Count, child: Box<PictureNode> },
    Collection(Vec<PictureNode>),
}

impl PictureNode {
    #[must_use]
    pub fn replicate(count: Count, child: PictureNode) -> Self {
        Self::Replicator {
            count,
            child: Box::new(child),
        }
    }

    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::Insertion(Insertion::Literal(text.to_string()))
    }

    /// Integral picture over a shorthand digit mould with an optional sign frame.
    pub fn integral(sign: Option<SignFrame>, digits: &str) -> Result<Self, MouldSyntaxError> {
        Ok(Self::Picture(Pattern::Integral(IntegralPattern {
            sign: sign.map(SignMould::new),
            digits: Mould::from_letters(digits)?,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_build_frames_and_literals() {
        let mould: Mould = Mould::from_letters("zz,zzd").unwrap();
        assert_eq!(mould.items.len(), 6);
        assert_eq!(mould.items[0], MouldItem::Frame(DigitFrame::ZeroSuppressing));
        assert_eq!(
            mould.items[2],
            MouldItem::Insertion(Insertion::Literal(",".into()))
        );
        assert_eq!(mould.items[5], MouldItem::Frame(DigitFrame::Mandatory));
    }

    #[test]
    fn letters_replicate_and_quote() {
        let mould: Mould = Mould::from_letters("3z\"ab\"d").unwrap();
        assert_eq!(
            mould.items[0],
            MouldItem::Replicator {
                count: Count::Static(3),
                items: vec![MouldItem::Frame(DigitFrame::ZeroSuppressing)],
            }
        );
        assert_eq!(
            mould.items[1],
            MouldItem::Insertion(Insertion::Literal("ab".into()))
        );
    }

    #[test]
    fn letters_reject_unknown_frame() {
        let err = Mould::<DigitFrame>::from_letters("zqd").unwrap_err();
        assert_eq!(err, MouldSyntaxError { position: 1, found: 'q' });
        let err = Mould::<StringFrame>::from_letters("aaz").unwrap_err();
        assert_eq!(err.found, 'z');
        assert!(Mould::<DigitFrame>::from_letters("3").is_err());
    }

    #[test]
    fn picture_tree_from_json() {
        let json = r#"{"collection": [
            {"insertion": {"literal": "x="}},
            {"replicator": {"count": {"static": 2}, "child":
                {"picture": {"integral": {"sign": {"frame": "plus"}, "digits": "zzd"}}}}},
            {"picture": {"c_style": "%-6.2f"}},
            {"picture": {"format": 4}},
            {"insertion": "line_break"}
        ]}"#;
        let node: PictureNode = serde_json::from_str(json).unwrap();
        let PictureNode::Collection(children) = node else {
            panic!("expected collection");
        };
        assert_eq!(children.len(), 5);
        let PictureNode::Replicator { count, child } = &children[1] else {
            panic!("expected replicator");
        };
        assert_eq!(*count, Count::Static(2));
        assert_eq!(
            **child,
            PictureNode::integral(Some(SignFrame::Plus), "zzd").unwrap()
        );
        let PictureNode::Picture(Pattern::CStyle(c)) = &children[2] else {
            panic!("expected C-style picture");
        };
        assert_eq!(c.align, Align::Left);
        assert_eq!(c.width, Some(Count::Static(6)));
        assert_eq!(children[3], PictureNode::Picture(Pattern::Format(ExprHandle(4))));
        assert_eq!(children[4], PictureNode::Insertion(Insertion::LineBreak));
    }

    #[test]
    fn pattern_kind_names() {
        let p = Pattern::General(GeneralPattern::default());
        assert_eq!(p.kind(), PatternKind::General);
        assert_eq!(PatternKind::CStyle.to_string(), "C-style");
    }
}
