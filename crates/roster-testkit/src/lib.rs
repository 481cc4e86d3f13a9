// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use roster_app::{
    FetchError, PageSource, QueryOptions, RecordId, RoleFilter, TeamFilter, TeamId,
    UserRecord, ViewEvent, ViewSession, unix_millis,
};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];
const EMAIL_DOMAINS: [&str; 5] = [
    "example.com",
    "example.org",
    "corp.example",
    "mail.example",
    "dev.example",
];
const TEAM_NAMES: [&str; 6] = ["platform", "support", "design", "sales", "research", "ops"];

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// A generated account, shaped for `roster_db::NewUser` or the memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub roles: String,
    pub create_at: i64,
    pub deactivated: bool,
}

#[derive(Debug, Clone)]
pub struct UserFaker {
    rng: DeterministicRng,
    serial: usize,
}

impl UserFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            serial: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// Usernames and emails carry a serial, so they are unique per faker.
    pub fn user(&mut self) -> FakeUser {
        self.serial += 1;
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let handle = format!("{}.{}{}", first, last, self.serial).to_ascii_lowercase();
        let domain = self.pick(&EMAIL_DOMAINS);

        let roles = match self.rng.int_n(10) {
            0 => "system_user system_admin",
            1 => "system_guest",
            _ => "system_user",
        };

        FakeUser {
            email: format!("{handle}@{domain}"),
            username: handle,
            display_name: format!("{first} {last}"),
            roles: roles.to_owned(),
            create_at: self.millis_in_reference_year(),
            deactivated: self.rng.int_n(8) == 0,
        }
    }

    pub fn team_name(&mut self) -> &'static str {
        self.pick(&TEAM_NAMES)
    }

    /// Post timestamps spread over the `days` before `now`.
    pub fn post_times(&mut self, now: OffsetDateTime, days: i64, count: usize) -> Vec<i64> {
        let now_ms = unix_millis(now);
        let span = u64::try_from(days.max(1) * DAY_MS).unwrap_or(u64::MAX);
        (0..count)
            .map(|_| now_ms - 1 - (self.rng.next_u64() % span) as i64)
            .collect()
    }

    fn millis_in_reference_year(&mut self) -> i64 {
        let start = unix_millis(reference_year_start());
        let span = 365 * DAY_MS as u64;
        start + (self.rng.next_u64() % span) as i64
    }

    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        items[self.rng.int_n(items.len())]
    }
}

/// A bare record with predictable text columns: `user007`, `user007@example.com`.
pub fn record(id: i64, create_at: i64) -> UserRecord {
    named_record(id, &format!("user{id:03}"), create_at)
}

pub fn named_record(id: i64, username: &str, create_at: i64) -> UserRecord {
    UserRecord {
        id: RecordId::new(id),
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        display_name: String::new(),
        roles: RoleFilter::SystemUser.as_str().to_owned(),
        create_at,
        delete_at: None,
        last_login_at: None,
        last_status_at: None,
        last_post_date: None,
        days_active: None,
        total_posts: None,
    }
}

/// `count` records with ids `1..=count`, in username order by construction.
pub fn numbered_records(count: i64) -> Vec<UserRecord> {
    (1..=count).map(|id| record(id, id * 1_000)).collect()
}

/// In-process record store with the same keyset contract as the SQLite one.
///
/// Responses can be scripted ahead of time to simulate server failures or
/// pages that break the ordering contract. Every request is logged.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: BTreeMap<RecordId, UserRecord>,
    memberships: BTreeMap<RecordId, BTreeSet<TeamId>>,
    posts: Vec<(RecordId, i64)>,
    now: Option<OffsetDateTime>,
    scripted: VecDeque<Result<Vec<UserRecord>, FetchError>>,
    requests: Vec<QueryOptions>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let mut store = Self::new();
        for user in records {
            store.insert(user);
        }
        store
    }

    /// Pins the clock used to resolve date ranges.
    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.now = Some(now);
        self
    }

    pub fn insert(&mut self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    pub fn remove(&mut self, user_id: RecordId) -> Option<UserRecord> {
        self.memberships.remove(&user_id);
        self.posts.retain(|(author, _)| *author != user_id);
        self.users.remove(&user_id)
    }

    pub fn deactivate(&mut self, user_id: RecordId, at_millis: i64) {
        if let Some(user) = self.users.get_mut(&user_id) {
            user.delete_at = Some(at_millis);
        }
    }

    pub fn join_team(&mut self, user_id: RecordId, team_id: TeamId) {
        self.memberships.entry(user_id).or_default().insert(team_id);
    }

    pub fn add_post(&mut self, user_id: RecordId, at_millis: i64) {
        self.posts.push((user_id, at_millis));
    }

    /// Queues a canned response for the next request, ahead of the real data.
    pub fn script(&mut self, response: Result<Vec<UserRecord>, FetchError>) {
        self.scripted.push_back(response);
    }

    pub fn fail_next(&mut self, message: &str) {
        self.script(Err(FetchError::NetworkOrServer(message.to_owned())));
    }

    pub fn requests(&self) -> &[QueryOptions] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn admits(&self, user: &UserRecord, options: &QueryOptions) -> bool {
        let teams = self.memberships.get(&user.id);
        let team_ok = match options.team {
            TeamFilter::Any => true,
            TeamFilter::Member(team_id) => teams.is_some_and(|teams| teams.contains(&team_id)),
            TeamFilter::NoTeam => teams.is_none_or(BTreeSet::is_empty),
        };
        team_ok
            && options.role.is_none_or(|role| role.matches(&user.roles))
            && options.activity.admits(user.is_deleted())
    }

    fn with_post_stats(&self, mut user: UserRecord, options: &QueryOptions) -> UserRecord {
        let bounds = options.date_bounds(self.now.unwrap_or_else(OffsetDateTime::now_utc));
        let times = self
            .posts
            .iter()
            .filter(|(author, at)| {
                *author == user.id && bounds.is_none_or(|bounds| bounds.contains(*at))
            })
            .map(|(_, at)| *at)
            .collect::<Vec<_>>();
        if !times.is_empty() {
            let days = times
                .iter()
                .map(|at| at.div_euclid(DAY_MS))
                .collect::<BTreeSet<_>>();
            user.last_post_date = times.iter().copied().max();
            user.days_active = i64::try_from(days.len()).ok();
            user.total_posts = i64::try_from(times.len()).ok();
        }
        user
    }
}

impl PageSource for MemoryStore {
    fn fetch_page(&mut self, options: &QueryOptions) -> Result<Vec<UserRecord>, FetchError> {
        self.requests.push(options.clone());
        if let Some(response) = self.scripted.pop_front() {
            return response;
        }
        options
            .validate()
            .map_err(|error| FetchError::NetworkOrServer(format!("bad request: {error}")))?;

        let column = options.sort_column;
        let descending = options.scans_descending();
        let anchor = options
            .from_column_value
            .clone()
            .zip(options.from_id);

        let mut keyed = self
            .users
            .values()
            .filter(|user| self.admits(user, options))
            .map(|user| ((user.column_value(column), user.id), user))
            .filter(|(key, _)| match &anchor {
                None => true,
                Some(anchor) if descending => key < anchor,
                Some(anchor) => key > anchor,
            })
            .collect::<Vec<_>>();

        if descending {
            keyed.sort_by_key(|(key, _)| Reverse(key.clone()));
        } else {
            keyed.sort_by(|(left, _), (right, _)| left.cmp(right));
        }

        let mut page = keyed
            .into_iter()
            .take(options.page_size)
            .map(|(_, user)| self.with_post_stats(user.clone(), options))
            .collect::<Vec<_>>();
        if options.direction == Some(roster_app::PageDirection::Backward) {
            page.reverse();
        }
        Ok(page)
    }
}

/// Runs the session's pending request against `source` and applies it.
pub fn settle<S: PageSource>(session: &mut ViewSession, source: &mut S) -> Vec<ViewEvent> {
    let Some(ticket) = session.pending().cloned() else {
        return Vec::new();
    };
    let result = source.fetch_page(&ticket.options);
    session.apply_response(ticket.seq, result)
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("roster.db");
    Ok((dir, db_path))
}

pub fn fixture_now() -> OffsetDateTime {
    datetime!(2026-02-19 12:34:56 UTC)
}

pub fn reference_year_start() -> OffsetDateTime {
    datetime!(2025-01-01 0:00 UTC)
}

pub fn days_before(now: OffsetDateTime, days: i64) -> i64 {
    unix_millis(now - Duration::days(days))
}
