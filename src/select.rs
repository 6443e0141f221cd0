//! Page selection rules.
//!
//! Out-of-range input never fails here: ranges are clamped to the document
//! and exclusions past the end are ignored.

use crate::model::{Document, Page};
use std::ops::RangeInclusive;

/// A set of 0-based page indices stored as inclusive ranges, so a huge
/// range costs the same as a single index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet {
    ranges: Vec<RangeInclusive<usize>>,
}

impl PageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize) {
        self.insert_range(index..=index);
    }

    /// Empty ranges are ignored.
    pub fn insert_range(&mut self, range: RangeInclusive<usize>) {
        if !range.is_empty() {
            self.ranges.push(range);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(&index))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromIterator<usize> for PageSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = PageSet::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRule {
    /// Half-open `[start, end)`; missing bounds default to the whole document.
    Range {
        start: Option<usize>,
        end: Option<usize>,
    },
    /// Every page except these indices.
    Exclude(PageSet),
}

impl SelectionRule {
    pub fn all() -> Self {
        SelectionRule::Range {
            start: None,
            end: None,
        }
    }

    pub fn range(start: Option<usize>, end: Option<usize>) -> Self {
        SelectionRule::Range { start, end }
    }

    pub fn exclude<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        SelectionRule::Exclude(indices.into_iter().collect())
    }

    pub fn exclude_set(pages: PageSet) -> Self {
        SelectionRule::Exclude(pages)
    }
}

/// Selected pages paired with their original 0-based index, in document order.
pub fn select_indexed<'a>(document: &'a Document, rule: &SelectionRule) -> Vec<(usize, &'a Page)> {
    let count = document.page_count();
    match rule {
        SelectionRule::Range { start, end } => {
            let start = start.unwrap_or(0).min(count);
            let end = end.unwrap_or(count).min(count);
            if start >= end {
                return Vec::new();
            }
            document.pages()[start..end]
                .iter()
                .enumerate()
                .map(|(offset, page)| (start + offset, page))
                .collect()
        }
        SelectionRule::Exclude(excluded) => document
            .pages()
            .iter()
            .enumerate()
            .filter(|(index, _)| !excluded.contains(*index))
            .collect(),
    }
}

pub fn select<'a>(document: &'a Document, rule: &SelectionRule) -> Vec<&'a Page> {
    select_indexed(document, rule)
        .into_iter()
        .map(|(_, page)| page)
        .collect()
}
