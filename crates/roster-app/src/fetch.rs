// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{FetchSummary, PageDirection, QueryOptions, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

impl LoadState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        }
    }
}

/// Why a page could not be applied. Both variants surface as `LoadState::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("record store request failed: {0}")]
    NetworkOrServer(String),

    #[error("record store returned a malformed page: {0}")]
    MalformedResponse(String),
}

/// The record store capability the controller consumes.
pub trait PageSource {
    fn fetch_page(&mut self, options: &QueryOptions) -> Result<Vec<UserRecord>, FetchError>;
}

impl<S: PageSource + ?Sized> PageSource for Box<S> {
    fn fetch_page(&mut self, options: &QueryOptions) -> Result<Vec<UserRecord>, FetchError> {
        (**self).fetch_page(options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub options: QueryOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { rows: usize },
    /// A continuation page came back empty; the previous rows stay on screen.
    Exhausted { direction: PageDirection },
    Failed(FetchError),
    Stale,
}

#[derive(Debug, Default)]
pub struct FetchOrchestrator {
    last_issued: u64,
    in_flight: Option<FetchTicket>,
    state: LoadState,
    rows: Vec<UserRecord>,
    last_fetch: Option<FetchSummary>,
    last_error: Option<FetchError>,
}

impl FetchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new request; any earlier in-flight ticket becomes stale.
    pub fn begin(&mut self, options: QueryOptions) -> FetchTicket {
        self.last_issued = self.last_issued.saturating_add(1);
        let ticket = FetchTicket {
            seq: self.last_issued,
            options,
        };
        if let Some(previous) = self.in_flight.replace(ticket.clone()) {
            debug!(
                superseded = previous.seq,
                seq = ticket.seq,
                "superseding in-flight fetch"
            );
        }
        self.state = LoadState::Loading;
        ticket
    }

    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<Vec<UserRecord>, FetchError>,
    ) -> FetchOutcome {
        let Some(ticket) = self.in_flight.take_if(|ticket| ticket.seq == seq) else {
            debug!(seq, latest = self.last_issued, "discarding stale fetch response");
            return FetchOutcome::Stale;
        };

        match result.and_then(|rows| check_page(&ticket.options, rows)) {
            Ok(rows) => {
                let count = rows.len();
                let direction = ticket.options.direction.unwrap_or(PageDirection::None);
                self.last_fetch = Some(FetchSummary {
                    direction,
                    requested: ticket.options.page_size,
                    returned: count,
                });
                self.last_error = None;
                self.state = LoadState::Loaded;

                if count == 0 && direction != PageDirection::None && !self.rows.is_empty() {
                    debug!(seq, ?direction, "no rows past the anchor; keeping current page");
                    return FetchOutcome::Exhausted { direction };
                }

                self.rows = rows;
                FetchOutcome::Applied { rows: count }
            }
            Err(error) => {
                warn!(seq, %error, "fetch failed; keeping previous rows");
                self.last_error = Some(error.clone());
                self.state = LoadState::Failed;
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Drops the in-flight ticket so its response is treated as stale.
    pub fn cancel(&mut self) {
        if let Some(ticket) = self.in_flight.take() {
            debug!(seq = ticket.seq, "cancelled in-flight fetch");
            if self.state == LoadState::Loading {
                self.state = if self.last_fetch.is_some() {
                    LoadState::Loaded
                } else {
                    LoadState::Idle
                };
            }
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn rows(&self) -> &[UserRecord] {
        &self.rows
    }

    pub fn last_fetch(&self) -> Option<FetchSummary> {
        self.last_fetch
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn in_flight(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref()
    }

    pub fn latest_seq(&self) -> u64 {
        self.last_issued
    }
}

/// Rejects pages that break the store's ordering contract, so a bad page is
/// never partially applied.
fn check_page(
    options: &QueryOptions,
    rows: Vec<UserRecord>,
) -> Result<Vec<UserRecord>, FetchError> {
    if rows.len() > options.page_size {
        return Err(FetchError::MalformedResponse(format!(
            "{} rows returned for page size {}",
            rows.len(),
            options.page_size
        )));
    }

    let mut seen = BTreeSet::new();
    if let Some(duplicate) = rows.iter().find(|row| !seen.insert(row.id)) {
        return Err(FetchError::MalformedResponse(format!(
            "record {} appears more than once",
            duplicate.id
        )));
    }

    let column = options.sort_column;
    let descending = options.sort_direction.is_descending();
    for pair in rows.windows(2) {
        let ordering = pair[0]
            .column_value(column)
            .cmp(&pair[1].column_value(column))
            .then(pair[0].id.cmp(&pair[1].id));
        let in_order = if descending {
            ordering == Ordering::Greater
        } else {
            ordering == Ordering::Less
        };
        if !in_order {
            return Err(FetchError::MalformedResponse(format!(
                "records {} and {} are out of {} order",
                pair[0].id,
                pair[1].id,
                column.as_str()
            )));
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{FetchError, FetchOrchestrator, FetchOutcome, LoadState};
    use crate::{Navigation, PageDirection, RecordId, UserRecord, ViewState, build};

    fn row(id: i64, username: &str) -> UserRecord {
        UserRecord {
            id: RecordId::new(id),
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            display_name: String::new(),
            roles: "system_user".to_owned(),
            create_at: id,
            delete_at: None,
            last_login_at: None,
            last_status_at: None,
            last_post_date: None,
            days_active: None,
            total_posts: None,
        }
    }

    #[test]
    fn success_replaces_rows_and_records_summary() {
        let mut fetch = FetchOrchestrator::new();
        assert_eq!(fetch.state(), LoadState::Idle);

        let ticket = fetch.begin(build(&ViewState::default()));
        assert_eq!(fetch.state(), LoadState::Loading);

        let outcome = fetch.complete(ticket.seq, Ok(vec![row(1, "ana"), row(2, "bo")]));
        assert_eq!(outcome, FetchOutcome::Applied { rows: 2 });
        assert_eq!(fetch.state(), LoadState::Loaded);
        assert_eq!(fetch.rows().len(), 2);

        let summary = fetch.last_fetch().expect("summary after success");
        assert_eq!(summary.direction, PageDirection::None);
        assert!(summary.is_short());
    }

    #[test]
    fn failure_keeps_previous_rows() {
        let mut fetch = FetchOrchestrator::new();
        let first = fetch.begin(build(&ViewState::default()));
        fetch.complete(first.seq, Ok(vec![row(1, "ana")]));

        let second = fetch.begin(build(&ViewState::default()));
        let outcome = fetch.complete(
            second.seq,
            Err(FetchError::NetworkOrServer("connection reset".to_owned())),
        );

        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert_eq!(fetch.state(), LoadState::Failed);
        assert_eq!(fetch.rows(), &[row(1, "ana")]);
        assert!(fetch.last_error().is_some());
    }

    #[test]
    fn superseded_response_is_stale() {
        let mut fetch = FetchOrchestrator::new();
        let slow = fetch.begin(build(&ViewState::default()));
        let fast = fetch.begin(build(&ViewState::default()));
        assert!(fast.seq > slow.seq);

        assert_eq!(
            fetch.complete(slow.seq, Ok(vec![row(9, "zed")])),
            FetchOutcome::Stale
        );
        assert_eq!(fetch.state(), LoadState::Loading);
        assert!(fetch.rows().is_empty());

        assert_eq!(
            fetch.complete(fast.seq, Ok(vec![row(1, "ana")])),
            FetchOutcome::Applied { rows: 1 }
        );
        assert_eq!(
            fetch.complete(fast.seq, Ok(vec![row(2, "bo")])),
            FetchOutcome::Stale
        );
    }

    #[test]
    fn cancel_makes_in_flight_stale() {
        let mut fetch = FetchOrchestrator::new();
        let ticket = fetch.begin(build(&ViewState::default()));
        fetch.cancel();

        assert_eq!(fetch.state(), LoadState::Idle);
        assert_eq!(fetch.complete(ticket.seq, Ok(vec![])), FetchOutcome::Stale);
    }

    #[test]
    fn oversized_page_is_malformed() {
        let mut fetch = FetchOrchestrator::new();
        let state = ViewState::with_page_size(1);
        let ticket = fetch.begin(build(&state));

        let outcome = fetch.complete(ticket.seq, Ok(vec![row(1, "ana"), row(2, "bo")]));
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::MalformedResponse(_))
        ));
        assert!(fetch.rows().is_empty());
    }

    #[test]
    fn duplicate_and_unordered_rows_are_malformed() {
        let mut fetch = FetchOrchestrator::new();

        let ticket = fetch.begin(build(&ViewState::default()));
        let outcome = fetch.complete(ticket.seq, Ok(vec![row(1, "ana"), row(1, "ana")]));
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::MalformedResponse(_))
        ));

        let ticket = fetch.begin(build(&ViewState::default()));
        let outcome = fetch.complete(ticket.seq, Ok(vec![row(2, "bo"), row(1, "ana")]));
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::MalformedResponse(_))
        ));
        assert_eq!(fetch.state(), LoadState::Failed);
    }

    #[test]
    fn equal_sort_values_are_ordered_by_id() {
        let mut fetch = FetchOrchestrator::new();
        let ticket = fetch.begin(build(&ViewState::default()));
        let outcome = fetch.complete(ticket.seq, Ok(vec![row(3, "sam"), row(7, "sam")]));
        assert_eq!(outcome, FetchOutcome::Applied { rows: 2 });

        let ticket = fetch.begin(build(&ViewState::default()));
        let outcome = fetch.complete(ticket.seq, Ok(vec![row(7, "sam"), row(3, "sam")]));
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
    }

    #[test]
    fn empty_continuation_page_keeps_rows() {
        let mut fetch = FetchOrchestrator::new();
        let mut state = ViewState::default();
        let ticket = fetch.begin(build(&state));
        fetch.complete(ticket.seq, Ok(vec![row(1, "ana"), row(2, "bo")]));

        state.request_next(fetch.rows());
        let ticket = fetch.begin(build(&state));
        let outcome = fetch.complete(ticket.seq, Ok(Vec::new()));

        assert_eq!(
            outcome,
            FetchOutcome::Exhausted {
                direction: PageDirection::Forward
            }
        );
        assert_eq!(fetch.state(), LoadState::Loaded);
        assert_eq!(fetch.rows(), &[row(1, "ana"), row(2, "bo")]);
        assert!(!Navigation::compute(&state, fetch.last_fetch(), fetch.rows().len()).can_go_next);
    }

    #[test]
    fn empty_first_page_is_applied() {
        let mut fetch = FetchOrchestrator::new();
        let ticket = fetch.begin(build(&ViewState::default()));
        assert_eq!(
            fetch.complete(ticket.seq, Ok(Vec::new())),
            FetchOutcome::Applied { rows: 0 }
        );
        assert!(fetch.rows().is_empty());
    }
}
