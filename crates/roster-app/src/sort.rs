// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{SortColumn, SortState, ViewState};

impl ViewState {
    /// Switching to a different column always starts ascending; the requested
    /// direction is honoured only for the column that is already active. Any
    /// actual change restarts pagination.
    pub fn set_sort(&mut self, column: SortColumn, descending: bool) -> bool {
        let next = if column == self.sort.column {
            SortState { column, descending }
        } else {
            SortState {
                column,
                descending: false,
            }
        };

        if next == self.sort {
            return false;
        }

        debug!(
            column = next.column.as_str(),
            descending = next.descending,
            "sort changed"
        );
        self.sort = next;
        self.reset();
        true
    }

    /// Header-click semantics: flip the active column, or start a new one ascending.
    pub fn toggle_sort(&mut self, column: SortColumn) -> bool {
        let descending = column == self.sort.column && !self.sort.descending;
        self.set_sort(column, descending)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        DateRange, FilterState, PageDirection, RecordId, SortColumn, UserRecord, ViewState,
    };

    fn row(id: i64) -> UserRecord {
        UserRecord {
            id: RecordId::new(id),
            username: format!("user{id:03}"),
            email: format!("user{id:03}@example.com"),
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

    fn on_page_three() -> ViewState {
        let mut state = ViewState::default();
        for id in [10, 20, 30] {
            state.request_next(&[row(id)]);
        }
        assert_eq!(state.page_index(), 3);
        state
    }

    #[test]
    fn new_column_resets_pagination() {
        let mut state = on_page_three();

        assert!(state.set_sort(SortColumn::Email, false));
        assert_eq!(state.sort.column, SortColumn::Email);
        assert_eq!(state.page_index(), 0);
        assert_eq!(state.anchor, None);
        assert_eq!(state.direction, PageDirection::None);
    }

    #[test]
    fn new_column_ignores_requested_descending() {
        let mut state = ViewState::default();

        assert!(state.set_sort(SortColumn::CreateAt, true));
        assert_eq!(state.sort.column, SortColumn::CreateAt);
        assert!(!state.sort.descending);
    }

    #[test]
    fn same_column_direction_flip_is_honoured_and_resets() {
        let mut state = on_page_three();

        assert!(state.set_sort(SortColumn::Username, true));
        assert_eq!(state.sort.column, SortColumn::Username);
        assert!(state.sort.descending);
        assert_eq!(state.page_index(), 0);
        assert_eq!(state.anchor, None);
    }

    #[test]
    fn identical_sort_is_a_no_op() {
        let mut state = on_page_three();

        assert!(!state.set_sort(SortColumn::Username, false));
        assert_eq!(state.page_index(), 3);
        assert!(state.anchor.is_some());
    }

    #[test]
    fn toggle_flips_active_column_and_starts_new_columns_ascending() {
        let mut state = ViewState::default();

        assert!(state.toggle_sort(SortColumn::Username));
        assert!(state.sort.descending);
        assert!(state.toggle_sort(SortColumn::Username));
        assert!(!state.sort.descending);

        state.toggle_sort(SortColumn::Username);
        assert!(state.toggle_sort(SortColumn::Email));
        assert_eq!(state.sort.column, SortColumn::Email);
        assert!(!state.sort.descending);
    }

    #[test]
    fn sort_change_leaves_filter_alone() {
        let mut state = ViewState::default();
        state.set_date_range(DateRange::Last30Days);

        state.set_sort(SortColumn::CreateAt, false);
        assert_eq!(
            state.filter,
            FilterState {
                date_range: DateRange::Last30Days,
                ..FilterState::default()
            }
        );
    }
}
