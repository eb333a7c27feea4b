//! Duplicate filtering against recent history

use crate::history::RecentHistory;
use crate::quotes::normalize;

/// Whether `candidate` was already posted within `history`.
///
/// Exact, case-sensitive comparison of the normalized text. No fuzzy or
/// semantic matching.
pub fn is_duplicate(candidate: &str, history: &RecentHistory) -> bool {
    history.contains(&normalize(candidate))
}
