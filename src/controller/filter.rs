use std::collections::BTreeSet;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitVerdict {
    Keep,
    Hide,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterOutcome {
    pub kept: usize,
    pub hidden: usize,
}

/// Keyword rules for one feed unit.
///
/// A unit stays only when it mentions a close contact and carries no
/// suggested/sponsored marker; anything else is hidden.
pub fn classify_unit(
    text: &str,
    closeness: &BTreeSet<String>,
    suggested: &BTreeSet<String>,
) -> UnitVerdict {
    let text = text.to_lowercase();
    let mentions = |words: &BTreeSet<String>| {
        words
            .iter()
            .any(|w| !w.is_empty() && text.contains(&w.to_lowercase()))
    };

    if mentions(closeness) && !mentions(suggested) {
        UnitVerdict::Keep
    } else {
        UnitVerdict::Hide
    }
}
