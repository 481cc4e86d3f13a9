// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;
use time::OffsetDateTime;

use crate::{
    ActivityFilter, ColumnValue, DateBounds, DateRange, PageDirection, RecordId, RoleFilter,
    SortColumn, SortDirection, TeamFilter, ViewState, is_valid_page_size, MAX_PAGE_SIZE,
};

/// Server-agnostic description of one page request.
///
/// The three anchor fields are either all present (a continuation request)
/// or all absent (a first-page request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub page_size: usize,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
    pub from_id: Option<RecordId>,
    pub from_column_value: Option<ColumnValue>,
    pub direction: Option<PageDirection>,
    pub date_range: DateRange,
    pub role: Option<RoleFilter>,
    pub team: TeamFilter,
    pub activity: ActivityFilter,
}

/// Why a [`QueryOptions`] cannot be sent to a record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("page size {0} is outside 1..={max}", max = MAX_PAGE_SIZE)]
    InvalidPageSize(usize),
    #[error("from_id, from_column_value, and direction must be given together")]
    PartialAnchor,
    #[error("from_column_value does not match the type of sort column {}", .0.as_str())]
    AnchorValueMismatch(SortColumn),
}

pub fn build(state: &ViewState) -> QueryOptions {
    let (from_id, from_column_value, direction) = match &state.anchor {
        Some(anchor) if state.direction != PageDirection::None => (
            Some(anchor.id),
            Some(anchor.column_value.clone()),
            Some(state.direction),
        ),
        _ => (None, None, None),
    };

    QueryOptions {
        page_size: state.window.page_size,
        sort_column: state.sort.column,
        sort_direction: state.sort.direction(),
        from_id,
        from_column_value,
        direction,
        date_range: state.filter.date_range,
        role: state.filter.role,
        team: state.filter.team,
        activity: state.filter.activity,
    }
}

impl QueryOptions {
    pub fn is_first_page(&self) -> bool {
        self.from_id.is_none()
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if !is_valid_page_size(self.page_size) {
            return Err(QueryError::InvalidPageSize(self.page_size));
        }

        match (&self.from_id, &self.from_column_value, self.direction) {
            (None, None, None) => Ok(()),
            (Some(_), Some(value), Some(direction)) if direction != PageDirection::None => {
                if value.matches_column(self.sort_column) {
                    Ok(())
                } else {
                    Err(QueryError::AnchorValueMismatch(self.sort_column))
                }
            }
            _ => Err(QueryError::PartialAnchor),
        }
    }

    /// Whether the store must scan its `(column, id)` index in descending order.
    pub fn scans_descending(&self) -> bool {
        let backward = self.direction == Some(PageDirection::Backward);
        self.sort_direction.is_descending() != backward
    }

    pub fn date_bounds(&self, now: OffsetDateTime) -> Option<DateBounds> {
        self.date_range.bounds(now)
    }

    /// Query-string pairs in the reporting endpoint's wire format.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page_size", self.page_size.to_string()),
            ("sort_column", self.sort_column.as_str().to_owned()),
            ("sort_direction", self.sort_direction.as_str().to_owned()),
        ];

        if let (Some(id), Some(value), Some(direction)) =
            (self.from_id, &self.from_column_value, self.direction)
            && let Some(wire) = direction.as_wire()
        {
            pairs.push(("from_id", id.to_string()));
            pairs.push(("from_column_value", value.to_wire()));
            pairs.push(("direction", wire.to_owned()));
        }

        if self.date_range != DateRange::AllTime {
            pairs.push(("date_range", self.date_range.as_str().to_owned()));
        }
        if let Some(role) = self.role {
            pairs.push(("role_filter", role.as_str().to_owned()));
        }
        match self.team {
            TeamFilter::Any => {}
            TeamFilter::Member(team_id) => pairs.push(("team_filter", team_id.to_string())),
            TeamFilter::NoTeam => pairs.push(("has_no_team", "true".to_owned())),
        }
        match self.activity {
            ActivityFilter::Any => {}
            ActivityFilter::ActiveOnly => pairs.push(("hide_inactive", "true".to_owned())),
            ActivityFilter::InactiveOnly => pairs.push(("hide_active", "true".to_owned())),
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryError, build};
    use crate::{
        ActivityFilter, Anchor, ColumnValue, DateRange, PageDirection, RecordId, RoleFilter,
        SortColumn, SortDirection, SortState, TeamFilter, TeamId, ViewState,
    };

    fn anchored(direction: PageDirection) -> ViewState {
        ViewState {
            anchor: Some(Anchor {
                id: RecordId::new(10),
                column_value: ColumnValue::Text("jo".to_owned()),
            }),
            direction,
            ..ViewState::default()
        }
    }

    #[test]
    fn default_state_builds_first_page_request() {
        let options = build(&ViewState::default());
        assert!(options.is_first_page());
        assert_eq!(options.sort_column, SortColumn::Username);
        assert_eq!(options.sort_direction, SortDirection::Asc);
        assert_eq!(options.from_column_value, None);
        assert_eq!(options.direction, None);
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn anchor_fields_travel_together() {
        let options = build(&anchored(PageDirection::Forward));
        assert_eq!(options.from_id, Some(RecordId::new(10)));
        assert_eq!(
            options.from_column_value,
            Some(ColumnValue::Text("jo".to_owned()))
        );
        assert_eq!(options.direction, Some(PageDirection::Forward));
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn anchor_without_direction_is_a_first_page_request() {
        let options = build(&anchored(PageDirection::None));
        assert!(options.is_first_page());
        assert_eq!(options.direction, None);
    }

    #[test]
    fn build_is_deterministic() {
        let mut state = anchored(PageDirection::Backward);
        state.sort = SortState {
            column: SortColumn::Username,
            descending: true,
        };
        state.filter.date_range = DateRange::PreviousMonth;

        assert_eq!(build(&state), build(&state));
        assert_eq!(build(&state.clone()), build(&state));
    }

    #[test]
    fn descending_scan_follows_sort_and_travel_direction() {
        let mut state = anchored(PageDirection::Forward);
        assert!(!build(&state).scans_descending());

        state.direction = PageDirection::Backward;
        assert!(build(&state).scans_descending());

        state.sort.descending = true;
        assert!(!build(&state).scans_descending());

        state.direction = PageDirection::Forward;
        assert!(build(&state).scans_descending());
    }

    #[test]
    fn validation_rejects_bad_requests() {
        let mut options = build(&ViewState::default());
        options.page_size = 0;
        assert_eq!(options.validate(), Err(QueryError::InvalidPageSize(0)));

        let mut options = build(&anchored(PageDirection::Forward));
        options.direction = None;
        assert_eq!(options.validate(), Err(QueryError::PartialAnchor));

        let mut options = build(&anchored(PageDirection::Forward));
        options.sort_column = SortColumn::CreateAt;
        assert_eq!(
            options.validate(),
            Err(QueryError::AnchorValueMismatch(SortColumn::CreateAt))
        );
    }

    #[test]
    fn validation_errors_name_the_offending_field() {
        assert_eq!(
            QueryError::InvalidPageSize(101).to_string(),
            "page size 101 is outside 1..=100"
        );
        assert!(QueryError::PartialAnchor.to_string().contains("must be given together"));
        assert_eq!(
            QueryError::AnchorValueMismatch(SortColumn::CreateAt).to_string(),
            "from_column_value does not match the type of sort column create_at"
        );
        let boxed: Box<dyn std::error::Error> = Box::new(QueryError::PartialAnchor);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn query_pairs_use_wire_names() {
        let mut state = anchored(PageDirection::Backward);
        state.filter.date_range = DateRange::Last30Days;
        state.filter.role = Some(RoleFilter::SystemGuest);
        state.filter.team = TeamFilter::Member(TeamId::new(3));
        state.filter.activity = ActivityFilter::InactiveOnly;

        let pairs = build(&state).to_query_pairs();
        let expected = vec![
            ("page_size", "10".to_owned()),
            ("sort_column", "username".to_owned()),
            ("sort_direction", "asc".to_owned()),
            ("from_id", "10".to_owned()),
            ("from_column_value", "jo".to_owned()),
            ("direction", "up".to_owned()),
            ("date_range", "last_30_days".to_owned()),
            ("role_filter", "system_guest".to_owned()),
            ("team_filter", "3".to_owned()),
            ("hide_active", "true".to_owned()),
        ];
        assert_eq!(pairs, expected);
    }

    #[test]
    fn no_team_filter_maps_to_has_no_team() {
        let mut state = ViewState::default();
        state.filter.team = TeamFilter::NoTeam;
        state.filter.activity = ActivityFilter::ActiveOnly;
        let pairs = build(&state).to_query_pairs();
        assert!(pairs.contains(&("has_no_team", "true".to_owned())));
        assert!(pairs.contains(&("hide_inactive", "true".to_owned())));
        assert!(!pairs.iter().any(|(key, _)| *key == "date_range"));
    }
}
