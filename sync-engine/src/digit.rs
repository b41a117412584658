//! Resolution of the raw score-field buffer into a single digit.
//!
//! The field displays one digit, but a text-change event may carry two
//! characters when a keystroke lands before the previous digit was cleared.
//! Which of the two the user meant depends on where the caret was: typing in
//! front of the old digit shifts it right, typing after it appends.

use crate::prediction::MAX_SCORE;

/// Returns the digit the user intended, or `None` when the field was cleared.
pub fn reconcile(raw: &str, current: Option<u8>) -> Option<u8> {
    let digits: Vec<u8> = raw
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .collect();

    let picked = match (digits.as_slice(), current) {
        ([], _) => return None,
        ([d], _) => *d,
        ([a, b], Some(cur)) => {
            if *b == cur {
                *a
            } else if *a == cur {
                *b
            } else {
                // Neither side is the old value; first keystroke wins.
                *a
            }
        }
        (many, _) => many[many.len() - 1],
    };

    if picked > MAX_SCORE {
        return current;
    }
    Some(picked)
}
