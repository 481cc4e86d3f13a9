// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod validation;

use anyhow::{Context, Result, anyhow, bail};
use roster_app::{
    ActivityFilter, ColumnValue, FetchError, PageSource, QueryOptions, RecordId, SortColumn,
    TeamFilter, TeamId, UserRecord,
};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{debug, warn};

pub const APP_NAME: &str = "roster";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "users",
        &[
            "id",
            "username",
            "email",
            "display_name",
            "roles",
            "create_at",
            "update_at",
            "delete_at",
            "last_login_at",
            "last_status_at",
        ],
    ),
    ("teams", &["id", "name", "create_at", "delete_at"]),
    (
        "team_members",
        &["team_id", "user_id", "create_at", "delete_at"],
    ),
    ("posts", &["id", "user_id", "create_at"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    // What the list query loses without it; shown when the index is missing.
    serves: &'static str,
    create_sql: &'static str,
}

// Keyset pages seek on (column, id); each sortable column needs its own pair.
const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_users_username_id",
        serves: "paging by username",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_users_username_id ON users (username, id);",
    },
    RequiredIndex {
        name: "idx_users_email_id",
        serves: "paging by email",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_users_email_id ON users (email, id);",
    },
    RequiredIndex {
        name: "idx_users_create_at_id",
        serves: "paging by member-since",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_users_create_at_id ON users (create_at, id);",
    },
    RequiredIndex {
        name: "idx_team_members_user_id",
        serves: "team filters",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_team_members_user_id ON team_members (user_id);",
    },
    RequiredIndex {
        name: "idx_posts_user_id_create_at",
        serves: "post statistics",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_posts_user_id_create_at ON posts (user_id, create_at);",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub roles: String,
    /// Unix milliseconds.
    pub create_at: i64,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the schema in an empty database, or checks that an existing
    /// one has every table and column the list query reads.
    pub fn bootstrap(&self) -> Result<()> {
        let tables = schema_objects(&self.conn, SchemaObject::Table)?;
        if !tables.is_empty() {
            validate_schema(&self.conn, &tables)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)
    }

    pub fn create_user(&self, user: &NewUser) -> Result<RecordId> {
        let username = validation::parse_username(&user.username)
            .with_context(|| format!("username {:?}", user.username))?;
        let email = validation::parse_email(&user.email)
            .with_context(|| format!("email {:?}", user.email))?;
        let roles = validation::parse_roles(&user.roles)
            .with_context(|| format!("roles {:?}", user.roles))?;

        self.conn
            .execute(
                "
                INSERT INTO users (username, email, display_name, roles, create_at, update_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
                params![
                    username,
                    email,
                    user.display_name.trim(),
                    roles,
                    user.create_at,
                    user.create_at
                ],
            )
            .with_context(|| format!("insert user {username}; usernames and emails must be unique"))?;
        Ok(RecordId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_user(&self, user_id: RecordId) -> Result<Option<UserRecord>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT} WHERE u.id = ?"),
                params![None::<i64>, None::<i64>, user_id.get()],
                user_from_row,
            )
            .optional()
            .with_context(|| format!("load user {user_id}"))
    }

    pub fn count_users(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .context("count users")?;
        usize::try_from(count).context("user count out of range")
    }

    /// Marks the account inactive. Inactive users stay listable.
    pub fn deactivate_user(&self, user_id: RecordId, at_millis: i64) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET delete_at = ?, update_at = ? WHERE id = ? AND delete_at IS NULL",
                params![at_millis, at_millis, user_id.get()],
            )
            .with_context(|| format!("deactivate user {user_id}"))?;
        if changed == 0 {
            bail!("user {user_id} does not exist or is already inactive");
        }
        Ok(())
    }

    pub fn reactivate_user(&self, user_id: RecordId, at_millis: i64) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET delete_at = NULL, update_at = ? WHERE id = ? AND delete_at IS NOT NULL",
                params![at_millis, user_id.get()],
            )
            .with_context(|| format!("reactivate user {user_id}"))?;
        if changed == 0 {
            bail!("user {user_id} does not exist or is already active");
        }
        Ok(())
    }

    /// Permanently removes the user with their memberships and posts.
    pub fn remove_user(&self, user_id: RecordId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?", params![user_id.get()])
            .with_context(|| format!("remove user {user_id}"))?;
        if changed == 0 {
            bail!("user {user_id} no longer exists");
        }
        Ok(())
    }

    pub fn record_login(&self, user_id: RecordId, at_millis: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE users SET last_login_at = ?, last_status_at = ? WHERE id = ?",
                params![at_millis, at_millis, user_id.get()],
            )
            .with_context(|| format!("record login for user {user_id}"))?;
        Ok(())
    }

    pub fn create_team(&self, name: &str, at_millis: i64) -> Result<TeamId> {
        let name = name.trim();
        if name.is_empty() {
            bail!("team name must not be empty");
        }
        self.conn
            .execute(
                "INSERT INTO teams (name, create_at) VALUES (?, ?)",
                params![name, at_millis],
            )
            .with_context(|| format!("insert team {name}"))?;
        Ok(TeamId::new(self.conn.last_insert_rowid()))
    }

    pub fn add_team_member(&self, team_id: TeamId, user_id: RecordId, at_millis: i64) -> Result<()> {
        self.conn
            .execute(
                "
                INSERT INTO team_members (team_id, user_id, create_at)
                VALUES (?, ?, ?)
                ON CONFLICT (team_id, user_id) DO UPDATE SET delete_at = NULL
                ",
                params![team_id.get(), user_id.get(), at_millis],
            )
            .with_context(|| format!("add user {user_id} to team {team_id}"))?;
        Ok(())
    }

    pub fn leave_team(&self, team_id: TeamId, user_id: RecordId, at_millis: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE team_members SET delete_at = ? WHERE team_id = ? AND user_id = ?",
                params![at_millis, team_id.get(), user_id.get()],
            )
            .with_context(|| format!("remove user {user_id} from team {team_id}"))?;
        Ok(())
    }

    pub fn record_post(&self, user_id: RecordId, at_millis: i64) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO posts (user_id, create_at) VALUES (?, ?)",
                params![user_id.get(), at_millis],
            )
            .with_context(|| format!("record post for user {user_id}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn fetch_page(&self, options: &QueryOptions) -> Result<Vec<UserRecord>> {
        self.fetch_page_at(options, OffsetDateTime::now_utc())
    }

    /// Reads one keyset page. Post statistics are restricted to the date
    /// range resolved against `now`; the range never hides users.
    pub fn fetch_page_at(
        &self,
        options: &QueryOptions,
        now: OffsetDateTime,
    ) -> Result<Vec<UserRecord>> {
        options
            .validate()
            .map_err(|error| anyhow!("invalid page request: {error}"))?;

        let column = sort_column_sql(options.sort_column);
        let scan = if options.scans_descending() { "DESC" } else { "ASC" };
        let bounds = options.date_bounds(now);

        let mut values = vec![
            bounds.map_or(Value::Null, |bounds| Value::Integer(bounds.start_ms)),
            bounds.map_or(Value::Null, |bounds| Value::Integer(bounds.end_ms)),
        ];
        let mut clauses = Vec::new();

        if let (Some(from_id), Some(from_value)) = (options.from_id, &options.from_column_value) {
            let seek = if options.scans_descending() { "<" } else { ">" };
            clauses.push(format!("(u.{column}, u.id) {seek} (?, ?)"));
            values.push(match from_value {
                ColumnValue::Integer(value) => Value::Integer(*value),
                ColumnValue::Text(value) => Value::Text(value.clone()),
            });
            values.push(Value::Integer(from_id.get()));
        }

        if let Some(role) = options.role {
            clauses.push("(' ' || u.roles || ' ') LIKE ('% ' || ? || ' %')".to_owned());
            values.push(Value::Text(role.as_str().to_owned()));
        }

        match options.team {
            TeamFilter::Any => {}
            TeamFilter::Member(team_id) => {
                clauses.push(
                    "
                    EXISTS (
                      SELECT 1 FROM team_members tm
                      JOIN teams t ON t.id = tm.team_id
                      WHERE tm.user_id = u.id AND tm.team_id = ?
                        AND tm.delete_at IS NULL AND t.delete_at IS NULL
                    )
                    "
                    .to_owned(),
                );
                values.push(Value::Integer(team_id.get()));
            }
            TeamFilter::NoTeam => clauses.push(
                "
                NOT EXISTS (
                  SELECT 1 FROM team_members tm
                  JOIN teams t ON t.id = tm.team_id
                  WHERE tm.user_id = u.id
                    AND tm.delete_at IS NULL AND t.delete_at IS NULL
                )
                "
                .to_owned(),
            ),
        }

        match options.activity {
            ActivityFilter::Any => {}
            ActivityFilter::ActiveOnly => clauses.push("u.delete_at IS NULL".to_owned()),
            ActivityFilter::InactiveOnly => clauses.push("u.delete_at IS NOT NULL".to_owned()),
        }

        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let limit = i64::try_from(options.page_size).context("page size out of range")?;
        values.push(Value::Integer(limit));

        let query = format!(
            "{USER_SELECT} {filter} ORDER BY u.{column} {scan}, u.id {scan} LIMIT ?"
        );
        let mut stmt = self
            .conn
            .prepare(&query)
            .context("prepare user page query")?;
        let rows = stmt
            .query_map(params_from_iter(values), user_from_row)
            .context("query user page")?;
        let mut users = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect user page")?;

        // Backward pages are read nearest-first; hand them back in display order.
        if options.direction == Some(roster_app::PageDirection::Backward) {
            users.reverse();
        }

        debug!(
            sort = options.sort_column.as_str(),
            direction = ?options.direction,
            requested = options.page_size,
            returned = users.len(),
            "fetched user page"
        );
        Ok(users)
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        Ok(schema_objects(&self.conn, SchemaObject::Table)?
            .into_iter()
            .collect())
    }
}

impl PageSource for Store {
    fn fetch_page(&mut self, options: &QueryOptions) -> Result<Vec<UserRecord>, FetchError> {
        Store::fetch_page(self, options).map_err(|error| {
            let message = format!("{error:#}");
            warn!(%message, "user page query failed");
            FetchError::NetworkOrServer(message)
        })
    }
}

// ?1 and ?2 are the post-statistics bounds; NULL leaves that side open.
const USER_SELECT: &str = "
    SELECT
      u.id, u.username, u.email, u.display_name, u.roles,
      u.create_at, u.delete_at, u.last_login_at, u.last_status_at,
      stats.last_post_date, stats.days_active, stats.total_posts
    FROM users u
    LEFT JOIN (
      SELECT
        p.user_id,
        MAX(p.create_at) AS last_post_date,
        COUNT(DISTINCT p.create_at / 86400000) AS days_active,
        COUNT(*) AS total_posts
      FROM posts p
      WHERE (?1 IS NULL OR p.create_at >= ?1)
        AND (?2 IS NULL OR p.create_at < ?2)
      GROUP BY p.user_id
    ) stats ON stats.user_id = u.id
";

fn sort_column_sql(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Username => "username",
        SortColumn::Email => "email",
        SortColumn::CreateAt => "create_at",
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: RecordId::new(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        roles: row.get(4)?,
        create_at: row.get(5)?,
        delete_at: row.get(6)?,
        last_login_at: row.get(7)?,
        last_status_at: row.get(8)?,
        last_post_date: row.get(9)?,
        days_active: row.get(10)?,
        total_posts: row.get(11)?,
    })
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("ROSTER_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set ROSTER_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("roster.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaObject {
    Table,
    Index,
}

impl SchemaObject {
    const fn kind(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Index => "index",
        }
    }
}

/// Names of non-internal tables or indexes, sorted.
fn schema_objects(conn: &Connection, object: SchemaObject) -> Result<BTreeSet<String>> {
    let kind = object.kind();
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = ?
              AND name NOT LIKE 'sqlite_%'
            ",
        )
        .with_context(|| format!("prepare {kind} listing"))?;
    let rows = stmt
        .query_map(params![kind], |row| row.get::<_, String>(0))
        .with_context(|| format!("list {kind} names"))?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect {kind} names"))
}

fn validate_schema(conn: &Connection, tables: &BTreeSet<String>) -> Result<()> {
    let absent: Vec<&str> = REQUIRED_SCHEMA
        .iter()
        .map(|(table, _)| *table)
        .filter(|table| !tables.contains(*table))
        .collect();
    if !absent.is_empty() {
        bail!(
            "not a roster database: missing required tables {}; set [storage].db_path or ROSTER_DB_PATH to a roster database",
            absent.join(", ")
        );
    }

    let mut gaps = Vec::new();
    for (table, required_columns) in REQUIRED_SCHEMA {
        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            gaps.push(format!("{table} ({})", missing.join(", ")));
        }
    }
    if !gaps.is_empty() {
        bail!(
            "database is missing required columns: {}; the user list cannot be queried until they exist",
            gaps.join("; ")
        );
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("create index `{}` for {}", index.name, index.serves))?;
    }

    let existing = schema_objects(conn, SchemaObject::Index)?;
    let missing: Vec<String> = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing.contains(index.name))
        .map(|index| format!("{} ({})", index.name, index.serves))
        .collect();
    if !missing.is_empty() {
        bail!("database is missing required indexes: {}", missing.join(", "));
    }

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns of {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("read columns of {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns of {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}
