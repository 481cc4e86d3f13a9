// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

pub const PAGE_SIZES: [usize; 4] = [10, 20, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = PAGE_SIZES[0];
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortColumn {
    #[default]
    Username,
    Email,
    CreateAt,
}

impl SortColumn {
    pub const ALL: [Self; 3] = [Self::Username, Self::Email, Self::CreateAt];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
            Self::CreateAt => "create_at",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Username => "User details",
            Self::Email => "Email",
            Self::CreateAt => "Member since",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "username" => Some(Self::Username),
            "email" => Some(Self::Email),
            "create_at" => Some(Self::CreateAt),
            _ => None,
        }
    }

    /// Unknown or missing column names fall back to the primary column.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::CreateAt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn from_descending(descending: bool) -> Self {
        if descending { Self::Desc } else { Self::Asc }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn is_descending(self) -> bool {
        matches!(self, Self::Desc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortState {
    pub column: SortColumn,
    pub descending: bool,
}

impl SortState {
    pub const fn direction(self) -> SortDirection {
        SortDirection::from_descending(self.descending)
    }
}

/// A sortable cell value. Values are only ever compared within one column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColumnValue {
    Integer(i64),
    Text(String),
}

impl ColumnValue {
    pub fn to_wire(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    pub fn parse_for(column: SortColumn, raw: &str) -> Option<Self> {
        if column.is_numeric() {
            raw.trim().parse().ok().map(Self::Integer)
        } else {
            Some(Self::Text(raw.to_owned()))
        }
    }

    pub const fn matches_column(&self, column: SortColumn) -> bool {
        match self {
            Self::Integer(_) => column.is_numeric(),
            Self::Text(_) => !column.is_numeric(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub id: RecordId,
    pub column_value: ColumnValue,
}

impl Anchor {
    pub fn from_record(record: &UserRecord, column: SortColumn) -> Self {
        Self {
            id: record.id,
            column_value: record.column_value(column),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageDirection {
    #[default]
    None,
    Forward,
    Backward,
}

impl PageDirection {
    /// Wire name understood by the reporting endpoint; `None` is never sent.
    pub const fn as_wire(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Forward => Some("down"),
            Self::Backward => Some("up"),
        }
    }

    pub fn parse_wire(value: &str) -> Option<Self> {
        match value {
            "down" => Some(Self::Forward),
            "up" => Some(Self::Backward),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageWindow {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub const fn is_valid_page_size(size: usize) -> bool {
    size > 0 && size <= MAX_PAGE_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DateRange {
    #[default]
    AllTime,
    Last30Days,
    PreviousMonth,
    Last6Months,
}

impl DateRange {
    pub const ALL: [Self; 4] = [
        Self::AllTime,
        Self::Last30Days,
        Self::PreviousMonth,
        Self::Last6Months,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllTime => "all_time",
            Self::Last30Days => "last_30_days",
            Self::PreviousMonth => "previous_month",
            Self::Last6Months => "last_6_months",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AllTime => "All time",
            Self::Last30Days => "Last 30 days",
            Self::PreviousMonth => "Previous month",
            Self::Last6Months => "Last 6 months",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" | "all_time" => Some(Self::AllTime),
            "last_30_days" => Some(Self::Last30Days),
            "previous_month" => Some(Self::PreviousMonth),
            "last_6_months" => Some(Self::Last6Months),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleFilter {
    SystemAdmin,
    SystemUser,
    SystemGuest,
}

impl RoleFilter {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemAdmin => "system_admin",
            Self::SystemUser => "system_user",
            Self::SystemGuest => "system_guest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system_admin" => Some(Self::SystemAdmin),
            "system_user" => Some(Self::SystemUser),
            "system_guest" => Some(Self::SystemGuest),
            _ => None,
        }
    }

    /// Roles are stored as a space-separated list, e.g. `system_user system_admin`.
    pub fn matches(self, roles: &str) -> bool {
        roles.split_whitespace().any(|role| role == self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TeamFilter {
    #[default]
    Any,
    Member(TeamId),
    NoTeam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivityFilter {
    #[default]
    Any,
    ActiveOnly,
    InactiveOnly,
}

impl ActivityFilter {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::ActiveOnly => "active",
            Self::InactiveOnly => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" | "any" => Some(Self::Any),
            "active" => Some(Self::ActiveOnly),
            "inactive" => Some(Self::InactiveOnly),
            _ => None,
        }
    }

    pub const fn admits(self, deleted: bool) -> bool {
        match self {
            Self::Any => true,
            Self::ActiveOnly => !deleted,
            Self::InactiveOnly => deleted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub date_range: DateRange,
    pub role: Option<RoleFilter>,
    pub team: TeamFilter,
    pub activity: ActivityFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub roles: String,
    /// Unix milliseconds.
    pub create_at: i64,
    pub delete_at: Option<i64>,
    pub last_login_at: Option<i64>,
    pub last_status_at: Option<i64>,
    pub last_post_date: Option<i64>,
    pub days_active: Option<i64>,
    pub total_posts: Option<i64>,
}

impl UserRecord {
    pub fn column_value(&self, column: SortColumn) -> ColumnValue {
        match column {
            SortColumn::Username => ColumnValue::Text(self.username.clone()),
            SortColumn::Email => ColumnValue::Text(self.email.clone()),
            SortColumn::CreateAt => ColumnValue::Integer(self.create_at),
        }
    }

    pub const fn is_deleted(&self) -> bool {
        self.delete_at.is_some()
    }
}
