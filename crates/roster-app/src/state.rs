// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Anchor, FilterState, PageDirection, PageWindow, SortState};

/// Everything the query builder needs to fetch the visible window.
///
/// Mutated only through the paging, sort, filter, and page-size operations;
/// the row buffer lives beside it in the fetch orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub sort: SortState,
    pub anchor: Option<Anchor>,
    pub direction: PageDirection,
    pub window: PageWindow,
    pub filter: FilterState,
}

impl ViewState {
    pub fn with_page_size(page_size: usize) -> Self {
        let mut state = Self::default();
        state.set_page_size(page_size);
        state
    }

    pub const fn page_index(&self) -> usize {
        self.window.page_index
    }

    pub const fn page_size(&self) -> usize {
        self.window.page_size
    }

    pub const fn is_first_page_request(&self) -> bool {
        self.anchor.is_none()
    }
}
