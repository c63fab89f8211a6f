use crate::types::{CategorySection, Digest};
use chrono::{DateTime, Utc};

/// Composition stage: pure assembly of category sections into one digest.
///
/// Sections are ordered by `category_order`; categories in the order but
/// missing from `sections` become empty sections, and sections for
/// categories outside the order are appended after it in stable input
/// order. No I/O, no AI, deterministic.
pub fn compose(
    sections: Vec<CategorySection>,
    category_order: &[String],
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> Digest {
    let mut remaining = sections;
    let mut ordered = Vec::with_capacity(category_order.len() + remaining.len());

    for category in category_order {
        match remaining.iter().position(|s| &s.category == category) {
            Some(idx) => ordered.push(remaining.remove(idx)),
            None => ordered.push(CategorySection::empty(category)),
        }
    }
    ordered.extend(remaining);

    Digest {
        period_start,
        period_end,
        sections: ordered,
    }
}
