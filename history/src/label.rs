//! Hierarchical display labels for history positions.
//!
//! Users see versions as "1.1", "1.2", ... rather than raw positions. The
//! scheme is a fixed bijection between positions and labels that has already
//! been communicated to users, so it must not change:
//!
//! | Positions | Labels |
//! |-----------|--------|
//! | 0..=8 | "1.1" ..= "1.9" |
//! | 9..=18 | "2.0" ..= "2.9" |
//! | 19..=28 | "3.0" ..= "3.9" |
//!
//! and so on, ten positions per major number from 2 upwards.

/// Positions covered by the first major number ("1.1" to "1.9").
const FIRST_MAJOR_SLOTS: usize = 9;

/// Positions covered by every later major number ("n.0" to "n.9").
const MINOR_SLOTS: usize = 10;

/// Returns the display label for a zero-based history position.
///
/// # Example
///
/// ```
/// use campus_history::display_label;
///
/// assert_eq!(display_label(0), "1.1");
/// assert_eq!(display_label(9), "2.0");
/// assert_eq!(display_label(19), "3.0");
/// ```
#[must_use]
pub fn display_label(position: usize) -> String {
    if position < FIRST_MAJOR_SLOTS {
        return format!("1.{}", position + 1);
    }

    let offset = position - FIRST_MAJOR_SLOTS;
    format!("{}.{}", offset / MINOR_SLOTS + 2, offset % MINOR_SLOTS)
}

/// Returns the position a display label stands for.
///
/// This is the exact inverse of [`display_label`]: only labels that function
/// can produce are accepted, so "1.0", "2.10" and "02.1" are rejected.
#[must_use]
pub fn parse_label(label: &str) -> Option<usize> {
    let label = label.trim();
    let (major, minor) = label.split_once('.')?;
    let major: usize = major.parse().ok()?;
    let minor: usize = minor.parse().ok()?;

    let position = match major {
        0 => return None,
        1 => minor.checked_sub(1)?,
        _ => (major - 2)
            .checked_mul(MINOR_SLOTS)?
            .checked_add(FIRST_MAJOR_SLOTS)?
            .checked_add(minor)?,
    };

    (display_label(position) == label).then_some(position)
}
