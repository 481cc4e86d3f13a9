// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Keyset pagination over a collection whose total size is never known.
//!
//! The anchor is the `(id, sort value)` of the boundary row in the direction
//! of travel. End of collection is inferred only from a short page, so the
//! availability rules below lean on the most recent applied fetch.

use tracing::debug;

use crate::{Anchor, PageDirection, UserRecord, ViewState, is_valid_page_size};

/// Shape of the fetch that produced the current row buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub direction: PageDirection,
    pub requested: usize,
    pub returned: usize,
}

impl FetchSummary {
    pub const fn is_short(self) -> bool {
        self.returned < self.requested
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Navigation {
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

impl Navigation {
    pub fn compute(view: &ViewState, last_fetch: Option<FetchSummary>, window_len: usize) -> Self {
        if window_len == 0 {
            return Self::default();
        }

        // A first-page load reads forward from the start, so its short page
        // also marks the end of the collection.
        let short_backward = last_fetch
            .is_some_and(|fetch| fetch.direction == PageDirection::Backward && fetch.is_short());
        let short_forward = last_fetch
            .is_some_and(|fetch| fetch.direction != PageDirection::Backward && fetch.is_short());

        Self {
            can_go_previous: view.anchor.is_some()
                && view.window.page_index > 0
                && !short_backward,
            can_go_next: !short_forward,
        }
    }
}

/// One-based, inclusive row numbers for "Showing X - Y" labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
}

impl PageRange {
    pub fn for_window(view: &ViewState, window_len: usize) -> Option<Self> {
        if window_len == 0 {
            return None;
        }
        let offset = view.window.page_index.saturating_mul(view.window.page_size);
        Some(Self {
            first: offset + 1,
            last: offset + window_len,
        })
    }

    pub fn label(self) -> String {
        format!("Showing {} - {}", self.first, self.last)
    }
}

impl ViewState {
    /// Moves forward past the last displayed row. Returns `false` (and leaves
    /// the state untouched) when there is nothing displayed to anchor on.
    pub fn request_next(&mut self, window: &[UserRecord]) -> bool {
        let Some(last) = window.last() else {
            debug!("next page requested with an empty window; ignoring");
            return false;
        };
        self.anchor = Some(Anchor::from_record(last, self.sort.column));
        self.direction = PageDirection::Forward;
        self.window.page_index = self.window.page_index.saturating_add(1);
        true
    }

    /// Moves backward before the first displayed row.
    pub fn request_previous(&mut self, window: &[UserRecord]) -> bool {
        let Some(first) = window.first() else {
            debug!("previous page requested with an empty window; ignoring");
            return false;
        };
        self.anchor = Some(Anchor::from_record(first, self.sort.column));
        self.direction = PageDirection::Backward;
        self.window.page_index = self.window.page_index.saturating_sub(1);
        true
    }

    pub fn reset(&mut self) {
        self.anchor = None;
        self.direction = PageDirection::None;
        self.window.page_index = 0;
    }

    /// Changes the window size and restarts from the first page. Sizes outside
    /// the accepted range and repeats of the current size are ignored.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if !is_valid_page_size(page_size) || page_size == self.window.page_size {
            return false;
        }
        self.window.page_size = page_size;
        self.reset();
        true
    }
}
