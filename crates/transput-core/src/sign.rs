//! Sign handling for numeric moulds.
//!
//! The sign character is rendered up front and then floats rightward over
//! zero-suppressed leading positions so it always sits against the first
//! visible digit: a width-4 field shows `"  -3"`, never `"-  3"`.

use crate::mould::Step;
use crate::picture::{DigitFrame, SignFrame};

/// Character shown by a sign frame.
#[must_use]
pub fn sign_char(frame: SignFrame, negative: bool) -> char {
    match (frame, negative) {
        (_, true) => '-',
        (SignFrame::Plus, false) => '+',
        (SignFrame::Minus, false) => ' ',
    }
}

/// Sign read back from `ch`, if `ch` is a sign under `frame`.
#[must_use]
pub fn parse_sign(frame: SignFrame, ch: char) -> Option<bool> {
    match (frame, ch) {
        (_, '-') => Some(true),
        (_, '+') => Some(false),
        (SignFrame::Minus, ' ') => Some(false),
        _ => None,
    }
}

/// Index of the digit frame the sign is written in front of.
///
/// Without zero suppression the sign stays at the front. Otherwise it moves
/// past every `z` frame holding a leading zero and every `s` frame; if no
/// frame stops it, it lands after the last position.
#[must_use]
pub fn float_position(steps: &[Step<DigitFrame>], digits: &[char], suppress: bool) -> usize {
    if !suppress {
        return 0;
    }
    let frames = steps.iter().filter_map(|step| match step {
        Step::Frame(frame) => Some(*frame),
        Step::Insert(_) => None,
    });
    for (index, frame) in frames.enumerate() {
        let digit = digits.get(index).copied().unwrap_or('0');
        match frame {
            DigitFrame::ZeroSuppressing if digit == '0' => continue,
            DigitFrame::Suppressible => {
                if digit != '0' {
                    return index;
                }
            }
            _ => return index,
        }
    }
    digits.len()
}
