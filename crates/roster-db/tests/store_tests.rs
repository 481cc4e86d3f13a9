// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use roster_app::{
    ActivityFilter, DateRange, FetchError, LoadState, PageDirection, PageSource, RecordId,
    RoleFilter, SortColumn, TeamFilter, UserRecord, ViewCommand, ViewSession, ViewState, build,
};
use roster_db::{NewUser, Store, validate_db_path};
use roster_testkit::{days_before, fixture_now, settle, temp_db_path};

fn new_user(username: &str, create_at: i64) -> NewUser {
    NewUser {
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        display_name: String::new(),
        roles: String::new(),
        create_at,
    }
}

/// `user001`..`userNNN`, created one second apart in id order.
fn numbered_store(count: i64) -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    for id in 1..=count {
        store.create_user(&new_user(&format!("user{id:03}"), id * 1000))?;
    }
    Ok(store)
}

fn ids(rows: &[UserRecord]) -> Vec<i64> {
    rows.iter().map(|row| row.id.get()).collect()
}

fn load(session: &mut ViewSession, store: &mut Store) {
    session.dispatch(ViewCommand::Load);
    settle(session, store);
}

fn next(session: &mut ViewSession, store: &mut Store) {
    session.on_next();
    settle(session, store);
}

fn previous(session: &mut ViewSession, store: &mut Store) {
    session.on_previous();
    settle(session, store);
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path(":memory:").is_ok());
    assert!(validate_db_path("/tmp/roster.db").is_ok());
}

#[test]
fn bootstrap_creates_schema_and_is_idempotent() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.create_user(&new_user("ana", 1))?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert_eq!(
        store.table_names()?,
        vec!["posts", "team_members", "teams", "users"]
    );
    assert_eq!(store.count_users()?, 1);
    Ok(())
}

#[test]
fn bootstrap_rejects_a_foreign_database() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT);")?;

    let error = store.bootstrap().expect_err("unrelated users table should fail");
    let message = error.to_string();
    assert!(message.contains("not a roster database"), "{message}");
    assert!(message.contains("teams, team_members, posts"), "{message}");
    assert!(message.contains("ROSTER_DB_PATH"), "{message}");
    Ok(())
}

#[test]
fn bootstrap_lists_every_missing_column_by_table() -> Result<()> {
    let store = Store::open_memory()?;
    store.raw_connection().execute_batch(
        "
        CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT, email TEXT);
        CREATE TABLE teams (id INTEGER PRIMARY KEY, name TEXT, create_at INTEGER, delete_at INTEGER);
        CREATE TABLE team_members (team_id INTEGER, user_id INTEGER, create_at INTEGER, delete_at INTEGER);
        CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER);
        ",
    )?;

    let message = store.bootstrap().expect_err("old schema should fail").to_string();
    assert!(
        message.contains(
            "users (display_name, roles, create_at, update_at, delete_at, last_login_at, last_status_at)"
        ),
        "{message}"
    );
    assert!(message.contains("posts (create_at)"), "{message}");
    assert!(!message.contains("teams ("), "{message}");
    Ok(())
}

#[test]
fn create_user_validates_and_normalizes() -> Result<()> {
    let store = numbered_store(0)?;
    let id = store.create_user(&NewUser {
        username: " Ana.Lee ".to_owned(),
        email: "Ana@Example.com".to_owned(),
        display_name: " Ana Lee ".to_owned(),
        roles: "system_user system_admin".to_owned(),
        create_at: 5,
    })?;

    let user = store.get_user(id)?.expect("user exists");
    assert_eq!(user.username, "ana.lee");
    assert_eq!(user.email, "ana@example.com");
    assert_eq!(user.display_name, "Ana Lee");
    assert_eq!(user.roles, "system_user system_admin");
    assert_eq!(user.total_posts, None);

    let error = store
        .create_user(&new_user("9lives", 1))
        .expect_err("bad username");
    assert!(format!("{error:#}").contains("invalid username"));

    let error = store
        .create_user(&NewUser {
            email: "ana@example.com".to_owned(),
            ..new_user("other", 1)
        })
        .expect_err("duplicate email");
    assert!(format!("{error:#}").contains("must be unique"));
    Ok(())
}

#[test]
fn twenty_five_users_page_forward_and_back() -> Result<()> {
    let mut store = numbered_store(25)?;
    let mut session = ViewSession::default();

    load(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (1..=10).collect::<Vec<_>>());
    assert!(session.can_go_next());
    assert!(!session.can_go_previous());

    next(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (11..=20).collect::<Vec<_>>());

    next(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (21..=25).collect::<Vec<_>>());
    assert!(!session.can_go_next());
    assert!(session.can_go_previous());

    previous(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (11..=20).collect::<Vec<_>>());
    assert_eq!(session.state().direction, PageDirection::Backward);

    previous(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (1..=10).collect::<Vec<_>>());
    assert!(!session.can_go_previous());
    Ok(())
}

#[test]
fn descending_sort_pages_from_the_newest() -> Result<()> {
    let mut store = numbered_store(25)?;
    let mut state = ViewState::default();
    state.set_sort(SortColumn::CreateAt, false);
    state.set_sort(SortColumn::CreateAt, true);
    let mut session = ViewSession::new(state);

    load(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (16..=25).rev().collect::<Vec<_>>());
    next(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (6..=15).rev().collect::<Vec<_>>());
    next(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (1..=5).rev().collect::<Vec<_>>());
    previous(&mut session, &mut store);
    assert_eq!(ids(session.current_window()), (6..=15).rev().collect::<Vec<_>>());
    Ok(())
}

#[test]
fn duplicate_sort_values_break_ties_on_id() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    for id in 1..=23 {
        store.create_user(&new_user(&format!("user{id:03}"), 1000 * (id % 3)))?;
    }

    let mut state = ViewState::with_page_size(5);
    state.set_sort(SortColumn::CreateAt, false);
    let mut session = ViewSession::new(state);
    load(&mut session, &mut store);

    let mut seen = ids(session.current_window());
    while session.can_go_next() {
        next(&mut session, &mut store);
        seen.extend(ids(session.current_window()));
    }

    let mut expected: Vec<i64> = (1..=23).collect();
    expected.sort_by_key(|id| (id % 3, *id));
    assert_eq!(seen, expected);
    Ok(())
}

#[test]
fn rows_removed_or_added_between_pages_are_not_repeated() -> Result<()> {
    let mut store = numbered_store(30)?;
    let mut session = ViewSession::default();
    load(&mut session, &mut store);

    store.remove_user(RecordId::new(3))?;
    store.create_user(&new_user("user000", 0))?;
    next(&mut session, &mut store);

    assert_eq!(ids(session.current_window()), (11..=20).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn role_team_and_activity_filters_narrow_the_page() -> Result<()> {
    let mut store = numbered_store(12)?;
    store.create_user(&NewUser {
        roles: "system_user system_admin".to_owned(),
        ..new_user("admin", 13_000)
    })?;
    store.create_user(&NewUser {
        roles: "system_guest".to_owned(),
        ..new_user("guest", 14_000)
    })?;
    let team = store.create_team("platform", 0)?;
    let other = store.create_team("support", 0)?;
    for id in [2, 4, 6] {
        store.add_team_member(team, RecordId::new(id), 0)?;
    }
    store.add_team_member(other, RecordId::new(8), 0)?;
    store.leave_team(other, RecordId::new(8), 1)?;
    store.deactivate_user(RecordId::new(5), 99)?;

    let page = |store: &mut Store, change: &dyn Fn(&mut ViewState)| -> Vec<String> {
        let mut state = ViewState::with_page_size(100);
        change(&mut state);
        let mut session = ViewSession::new(state);
        load(&mut session, store);
        session
            .current_window()
            .iter()
            .map(|row| row.username.clone())
            .collect()
    };

    assert_eq!(
        page(&mut store, &|state| state.filter.role = Some(RoleFilter::SystemAdmin)),
        vec!["admin"]
    );
    assert_eq!(
        page(&mut store, &|state| state.filter.role = Some(RoleFilter::SystemGuest)),
        vec!["guest"]
    );
    assert_eq!(
        page(&mut store, &|state| state.filter.team = TeamFilter::Member(team)),
        vec!["user002", "user004", "user006"]
    );
    let loners = page(&mut store, &|state| state.filter.team = TeamFilter::NoTeam);
    assert_eq!(loners.len(), 11);
    assert!(loners.contains(&"user008".to_owned()));
    assert_eq!(
        page(&mut store, &|state| state.filter.activity = ActivityFilter::InactiveOnly),
        vec!["user005"]
    );
    assert_eq!(
        page(&mut store, &|state| state.filter.activity = ActivityFilter::ActiveOnly).len(),
        13
    );
    Ok(())
}

#[test]
fn date_range_changes_post_stats_not_membership() -> Result<()> {
    let store = numbered_store(3)?;
    let now = fixture_now();
    let first = RecordId::new(1);
    store.record_post(first, days_before(now, 2))?;
    store.record_post(first, days_before(now, 2) + 60_000)?;
    store.record_post(first, days_before(now, 90))?;
    store.record_post(RecordId::new(2), days_before(now, 120))?;

    let mut state = ViewState::default();
    let all_time = store.fetch_page_at(&build(&state), now)?;
    assert_eq!(ids(&all_time), vec![1, 2, 3]);
    assert_eq!(all_time[0].total_posts, Some(3));
    assert_eq!(all_time[0].days_active, Some(2));
    assert_eq!(all_time[0].last_post_date, Some(days_before(now, 2) + 60_000));
    assert_eq!(all_time[1].total_posts, Some(1));
    assert_eq!(all_time[2].total_posts, None);

    state.filter.date_range = DateRange::Last30Days;
    let recent = store.fetch_page_at(&build(&state), now)?;
    assert_eq!(ids(&recent), vec![1, 2, 3]);
    assert_eq!(recent[0].total_posts, Some(2));
    assert_eq!(recent[0].days_active, Some(1));
    assert_eq!(recent[1].total_posts, None);
    assert_eq!(recent[1].last_post_date, None);
    Ok(())
}

#[test]
fn invalid_requests_fail_as_server_errors() -> Result<()> {
    let mut store = numbered_store(3)?;
    let mut options = build(&ViewState::default());
    options.from_id = Some(RecordId::new(1));

    let error = PageSource::fetch_page(&mut store, &options).expect_err("partial anchor");
    assert!(matches!(error, FetchError::NetworkOrServer(message) if message.contains("invalid page request")));

    store.raw_connection().execute_batch("DROP TABLE posts;")?;
    let mut session = ViewSession::default();
    load(&mut session, &mut store);
    assert_eq!(session.load_state(), LoadState::Failed);
    assert!(session.current_window().is_empty());
    Ok(())
}
