// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, info};

use crate::{
    FetchError, FetchOrchestrator, FetchOutcome, FetchTicket, FilterState, LoadState, Navigation,
    PageDirection, PageRange, SortColumn, SortState, UserRecord, ViewState, build,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Load,
    Refresh,
    NextPage,
    PreviousPage,
    FirstPage,
    SetSort {
        column: SortColumn,
        descending: bool,
    },
    ToggleSort(SortColumn),
    SetFilter(FilterState),
    SetPageSize(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    SortChanged(SortState),
    FilterChanged(FilterState),
    PageSizeChanged(usize),
    PaginationReset,
    PageRequested {
        direction: PageDirection,
        page_index: usize,
    },
    FetchIssued(FetchTicket),
    PageApplied {
        seq: u64,
        rows: usize,
    },
    EndReached {
        seq: u64,
        direction: PageDirection,
    },
    FetchFailed {
        seq: u64,
        error: FetchError,
    },
    StaleResponseDiscarded {
        seq: u64,
    },
}

/// One mounted admin view: the view state, its fetch orchestrator, and the
/// row buffer the renderer paints.
///
/// Commands are synchronous state transitions. Each one that changes what
/// should be on screen ends with a `FetchIssued` event; the host runs the
/// ticket and hands the result back through [`ViewSession::apply_response`].
#[derive(Debug)]
pub struct ViewSession {
    state: ViewState,
    fetch: FetchOrchestrator,
    // State before the in-flight navigation; restored if it does not land.
    retreat: Option<ViewState>,
    // False from a reset until the first page under the new state is applied.
    window_current: bool,
}

impl Default for ViewSession {
    fn default() -> Self {
        Self::new(ViewState::default())
    }
}

impl ViewSession {
    pub fn new(state: ViewState) -> Self {
        Self {
            state,
            fetch: FetchOrchestrator::new(),
            retreat: None,
            window_current: true,
        }
    }

    pub fn dispatch(&mut self, command: ViewCommand) -> Vec<ViewEvent> {
        match command {
            ViewCommand::Load | ViewCommand::Refresh => vec![self.issue_fetch()],
            ViewCommand::NextPage => self.navigate(PageDirection::Forward),
            ViewCommand::PreviousPage => self.navigate(PageDirection::Backward),
            ViewCommand::FirstPage => {
                self.state.reset();
                self.window_current = false;
                vec![ViewEvent::PaginationReset, self.issue_fetch()]
            }
            ViewCommand::SetSort { column, descending } => {
                if !self.state.set_sort(column, descending) {
                    return Vec::new();
                }
                self.after_reset(ViewEvent::SortChanged(self.state.sort))
            }
            ViewCommand::ToggleSort(column) => {
                if !self.state.toggle_sort(column) {
                    return Vec::new();
                }
                self.after_reset(ViewEvent::SortChanged(self.state.sort))
            }
            ViewCommand::SetFilter(filter) => {
                if !self.state.set_filter(filter) {
                    return Vec::new();
                }
                self.after_reset(ViewEvent::FilterChanged(self.state.filter))
            }
            ViewCommand::SetPageSize(size) => {
                if !self.state.set_page_size(size) {
                    debug!(size, "page size unchanged or out of range");
                    return Vec::new();
                }
                self.after_reset(ViewEvent::PageSizeChanged(size))
            }
        }
    }

    /// Feeds a completed request back in. Responses for superseded tickets
    /// are dropped without touching the row buffer or load state.
    pub fn apply_response(
        &mut self,
        seq: u64,
        result: Result<Vec<UserRecord>, FetchError>,
    ) -> Vec<ViewEvent> {
        match self.fetch.complete(seq, result) {
            FetchOutcome::Applied { rows } => {
                self.retreat = None;
                self.window_current = true;
                debug!(seq, rows, page_index = self.state.page_index(), "page applied");
                vec![ViewEvent::PageApplied { seq, rows }]
            }
            FetchOutcome::Exhausted { direction } => {
                self.step_back();
                vec![ViewEvent::EndReached { seq, direction }]
            }
            FetchOutcome::Failed(error) => {
                self.step_back();
                vec![ViewEvent::FetchFailed { seq, error }]
            }
            FetchOutcome::Stale => vec![ViewEvent::StaleResponseDiscarded { seq }],
        }
    }

    /// Abandons any in-flight request; used when the view unmounts.
    pub fn cancel_pending(&mut self) {
        self.step_back();
        self.fetch.cancel();
    }

    pub fn on_next(&mut self) -> Vec<ViewEvent> {
        self.dispatch(ViewCommand::NextPage)
    }

    pub fn on_previous(&mut self) -> Vec<ViewEvent> {
        self.dispatch(ViewCommand::PreviousPage)
    }

    pub fn on_sort_change(&mut self, column: SortColumn) -> Vec<ViewEvent> {
        self.dispatch(ViewCommand::ToggleSort(column))
    }

    pub fn on_filter_change(&mut self, filter: FilterState) -> Vec<ViewEvent> {
        self.dispatch(ViewCommand::SetFilter(filter))
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn into_state(self) -> ViewState {
        self.state
    }

    pub fn current_window(&self) -> &[UserRecord] {
        self.fetch.rows()
    }

    pub fn load_state(&self) -> LoadState {
        self.fetch.state()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.fetch.last_error()
    }

    pub fn pending(&self) -> Option<&FetchTicket> {
        self.fetch.in_flight()
    }

    /// Both directions stay disabled while the rows on screen came from a
    /// sort, filter, or page size that has since been replaced.
    pub fn navigation(&self) -> Navigation {
        if !self.window_current {
            return Navigation::default();
        }
        Navigation::compute(
            &self.state,
            self.fetch.last_fetch(),
            self.current_window().len(),
        )
    }

    pub fn can_go_next(&self) -> bool {
        self.navigation().can_go_next
    }

    pub fn can_go_previous(&self) -> bool {
        self.navigation().can_go_previous
    }

    pub fn page_range(&self) -> Option<PageRange> {
        if !self.window_current {
            return None;
        }
        PageRange::for_window(&self.state, self.current_window().len())
    }

    fn navigate(&mut self, direction: PageDirection) -> Vec<ViewEvent> {
        if self.retreat.is_some() {
            debug!(?direction, "navigation already in flight; ignoring");
            return Vec::new();
        }
        let navigation = self.navigation();
        let before = self.state.clone();
        let moved = match direction {
            PageDirection::Forward if navigation.can_go_next => {
                self.state.request_next(self.fetch.rows())
            }
            PageDirection::Backward if navigation.can_go_previous => {
                self.state.request_previous(self.fetch.rows())
            }
            _ => false,
        };
        if !moved {
            debug!(?direction, "navigation unavailable; ignoring");
            return Vec::new();
        }

        let requested = ViewEvent::PageRequested {
            direction,
            page_index: self.state.page_index(),
        };
        let issued = self.issue_fetch();
        self.retreat = Some(before);
        vec![requested, issued]
    }

    /// Returns to the page that is still on screen after a navigation that
    /// did not replace it.
    fn step_back(&mut self) {
        if let Some(previous) = self.retreat.take() {
            debug!(page_index = previous.page_index(), "staying on displayed page");
            self.state = previous;
        }
    }

    fn after_reset(&mut self, change: ViewEvent) -> Vec<ViewEvent> {
        self.window_current = false;
        vec![change, ViewEvent::PaginationReset, self.issue_fetch()]
    }

    fn issue_fetch(&mut self) -> ViewEvent {
        self.retreat = None;
        let ticket = self.fetch.begin(build(&self.state));
        info!(
            seq = ticket.seq,
            sort = ticket.options.sort_column.as_str(),
            descending = ticket.options.sort_direction.is_descending(),
            direction = ?ticket.options.direction,
            page_index = self.state.page_index(),
            "requesting page"
        );
        ViewEvent::FetchIssued(ticket)
    }
}
