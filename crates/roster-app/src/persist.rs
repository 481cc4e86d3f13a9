// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::form_urlencoded;

use crate::{
    ActivityFilter, Anchor, ColumnValue, DateRange, FilterState, PageDirection, PageWindow,
    RecordId, RoleFilter, SortColumn, SortState, TeamFilter, TeamId, ViewState,
    is_valid_page_size,
};

const NO_TEAM: &str = "none";

/// Flat, primitive-only form of a [`ViewState`] that a host can keep in any
/// key-value store or URL query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_column: Option<String>,
    #[serde(default)]
    pub sort_is_descending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub page_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_filter: Option<String>,
}

impl From<&ViewState> for PersistedView {
    fn from(state: &ViewState) -> Self {
        let anchor = state
            .anchor
            .as_ref()
            .filter(|_| state.direction != PageDirection::None);

        Self {
            sort_column: Some(state.sort.column.as_str().to_owned()),
            sort_is_descending: state.sort.descending,
            page_size: Some(state.window.page_size),
            page_index: state.window.page_index,
            direction: state.direction.as_wire().map(str::to_owned),
            column_value: anchor.map(|anchor| anchor.column_value.to_wire()),
            record_id: anchor.map(|anchor| anchor.id.get()),
            filter_value: match state.filter.date_range {
                DateRange::AllTime => None,
                range => Some(range.as_str().to_owned()),
            },
            role_filter: state.filter.role.map(|role| role.as_str().to_owned()),
            team_filter: match state.filter.team {
                TeamFilter::Any => None,
                TeamFilter::Member(team_id) => Some(team_id.to_string()),
                TeamFilter::NoTeam => Some(NO_TEAM.to_owned()),
            },
            activity_filter: match state.filter.activity {
                ActivityFilter::Any => None,
                activity => Some(activity.as_str().to_owned()),
            },
        }
    }
}

impl PersistedView {
    /// Rebuilds a view state. Unknown values fall back to defaults, and an
    /// anchor that cannot be reconstructed restarts from the first page.
    pub fn restore(&self) -> ViewState {
        let column = SortColumn::parse_or_default(self.sort_column.as_deref());
        let page_size = self
            .page_size
            .filter(|size| is_valid_page_size(*size))
            .unwrap_or(PageWindow::default().page_size);

        let mut state = ViewState {
            sort: SortState {
                column,
                descending: self.sort_is_descending,
            },
            anchor: None,
            direction: PageDirection::None,
            window: PageWindow {
                page_index: 0,
                page_size,
            },
            filter: self.filter(),
        };

        match self.anchor(column) {
            Ok(Some((anchor, direction))) => {
                state.anchor = Some(anchor);
                state.direction = direction;
                state.window.page_index = self.page_index;
            }
            Ok(None) => {}
            Err(reason) => warn!(reason, "dropping persisted anchor; restarting at first page"),
        }

        state
    }

    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(column) = &self.sort_column {
            serializer.append_pair("sortColumn", column);
        }
        if self.sort_is_descending {
            serializer.append_pair("sortIsDescending", "true");
        }
        if let Some(size) = self.page_size {
            serializer.append_pair("pageSize", &size.to_string());
        }
        if self.page_index > 0 {
            serializer.append_pair("pageIndex", &self.page_index.to_string());
        }
        let optional = [
            ("direction", &self.direction),
            ("columnValue", &self.column_value),
            ("filterValue", &self.filter_value),
            ("roleFilter", &self.role_filter),
            ("teamFilter", &self.team_filter),
            ("activityFilter", &self.activity_filter),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                serializer.append_pair(key, value);
            }
        }
        if let Some(id) = self.record_id {
            serializer.append_pair("recordId", &id.to_string());
        }
        serializer.finish()
    }

    /// Lenient parse: unknown keys and unparseable numbers are ignored.
    pub fn from_query_string(query: &str) -> Self {
        let mut view = Self::default();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "sortColumn" => view.sort_column = Some(value),
                "sortIsDescending" => view.sort_is_descending = value == "true",
                "pageSize" => view.page_size = value.parse().ok(),
                "pageIndex" => view.page_index = value.parse().unwrap_or(0),
                "direction" => view.direction = Some(value),
                "columnValue" => view.column_value = Some(value),
                "recordId" => view.record_id = value.parse().ok(),
                "filterValue" => view.filter_value = Some(value),
                "roleFilter" => view.role_filter = Some(value),
                "teamFilter" => view.team_filter = Some(value),
                "activityFilter" => view.activity_filter = Some(value),
                _ => {}
            }
        }
        view
    }

    fn filter(&self) -> FilterState {
        FilterState {
            date_range: self
                .filter_value
                .as_deref()
                .and_then(DateRange::parse)
                .unwrap_or_default(),
            role: self.role_filter.as_deref().and_then(RoleFilter::parse),
            team: match self.team_filter.as_deref() {
                None => TeamFilter::Any,
                Some(NO_TEAM) => TeamFilter::NoTeam,
                Some(raw) => raw
                    .parse()
                    .map(|id| TeamFilter::Member(TeamId::new(id)))
                    .unwrap_or_default(),
            },
            activity: self
                .activity_filter
                .as_deref()
                .and_then(ActivityFilter::parse)
                .unwrap_or_default(),
        }
    }

    fn anchor(&self, column: SortColumn) -> Result<Option<(Anchor, PageDirection)>, &'static str> {
        let direction = match self.direction.as_deref() {
            None => None,
            Some(raw) => Some(PageDirection::parse_wire(raw).ok_or("unknown direction")?),
        };

        match (direction, self.record_id, self.column_value.as_deref()) {
            (None, None, None) => Ok(None),
            (Some(direction), Some(id), Some(raw)) => {
                let column_value = ColumnValue::parse_for(column, raw)
                    .ok_or("column value does not fit the sort column")?;
                Ok(Some((
                    Anchor {
                        id: RecordId::new(id),
                        column_value,
                    },
                    direction,
                )))
            }
            _ => Err("incomplete anchor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PersistedView;
    use crate::{
        ActivityFilter, Anchor, ColumnValue, DateRange, PageDirection, RecordId, RoleFilter,
        SortColumn, SortState, TeamFilter, TeamId, ViewState,
    };

    fn paged_state() -> ViewState {
        let mut state = ViewState {
            sort: SortState {
                column: SortColumn::CreateAt,
                descending: true,
            },
            anchor: Some(Anchor {
                id: RecordId::new(42),
                column_value: ColumnValue::Integer(1_700_000_000_000),
            }),
            direction: PageDirection::Backward,
            ..ViewState::default()
        };
        state.window.page_index = 4;
        state.window.page_size = 20;
        state.filter.date_range = DateRange::Last6Months;
        state.filter.role = Some(RoleFilter::SystemAdmin);
        state.filter.team = TeamFilter::NoTeam;
        state.filter.activity = ActivityFilter::ActiveOnly;
        state
    }

    #[test]
    fn flat_shape_uses_host_field_names() -> serde_json::Result<()> {
        let persisted = PersistedView::from(&paged_state());
        let json = serde_json::to_value(&persisted)?;

        assert_eq!(json["sortColumn"], "create_at");
        assert_eq!(json["sortIsDescending"], true);
        assert_eq!(json["pageSize"], 20);
        assert_eq!(json["pageIndex"], 4);
        assert_eq!(json["direction"], "up");
        assert_eq!(json["columnValue"], "1700000000000");
        assert_eq!(json["recordId"], 42);
        assert_eq!(json["filterValue"], "last_6_months");
        Ok(())
    }

    #[test]
    fn restore_rebuilds_the_same_state() -> serde_json::Result<()> {
        let state = paged_state();
        let json = serde_json::to_string(&PersistedView::from(&state))?;
        let persisted: PersistedView = serde_json::from_str(&json)?;
        assert_eq!(persisted.restore(), state);
        Ok(())
    }

    #[test]
    fn query_string_carries_the_view() {
        let state = paged_state();
        let query = PersistedView::from(&state).to_query_string();
        assert!(query.contains("sortColumn=create_at"));
        assert!(query.contains("direction=up"));

        let parsed = PersistedView::from_query_string(&format!("?{query}"));
        assert_eq!(parsed.restore(), state);
    }

    #[test]
    fn query_string_escapes_text_anchor_values() {
        let state = ViewState {
            anchor: Some(Anchor {
                id: RecordId::new(7),
                column_value: ColumnValue::Text("o'neil & co".to_owned()),
            }),
            direction: PageDirection::Forward,
            ..ViewState::default()
        };
        let query = PersistedView::from(&state).to_query_string();
        assert!(!query.contains(" & "));
        assert_eq!(PersistedView::from_query_string(&query).restore(), state);
    }

    #[test]
    fn empty_shape_restores_defaults() {
        assert_eq!(PersistedView::default().restore(), ViewState::default());
    }

    #[test]
    fn bad_anchor_restarts_at_first_page() {
        let persisted = PersistedView {
            sort_column: Some("create_at".to_owned()),
            page_index: 3,
            direction: Some("down".to_owned()),
            column_value: Some("not-a-number".to_owned()),
            record_id: Some(9),
            ..PersistedView::default()
        };
        let state = persisted.restore();
        assert_eq!(state.sort.column, SortColumn::CreateAt);
        assert_eq!(state.anchor, None);
        assert_eq!(state.page_index(), 0);

        let partial = PersistedView {
            page_index: 2,
            record_id: Some(9),
            ..PersistedView::default()
        };
        assert_eq!(partial.restore().page_index(), 0);
    }

    #[test]
    fn unknown_values_fall_back_to_defaults() {
        let persisted = PersistedView {
            sort_column: Some("lastLoginColumn".to_owned()),
            page_size: Some(1_000),
            filter_value: Some("forever".to_owned()),
            team_filter: Some("12".to_owned()),
            ..PersistedView::default()
        };
        let state = persisted.restore();
        assert_eq!(state.sort.column, SortColumn::Username);
        assert_eq!(state.page_size(), 10);
        assert_eq!(state.filter.date_range, DateRange::AllTime);
        assert_eq!(state.filter.team, TeamFilter::Member(TeamId::new(12)));
    }
}
