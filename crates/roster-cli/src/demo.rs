// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use roster_app::{TeamId, unix_millis};
use roster_db::{NewUser, Store};
use roster_testkit::UserFaker;
use time::OffsetDateTime;
use tracing::info;

const DEMO_SEED: u64 = 42;
const DEMO_USERS: usize = 137;
const DEMO_TEAMS: usize = 4;
const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSummary {
    pub users: usize,
    pub teams: usize,
    pub posts: usize,
}

/// Fills an empty store with a deterministic roster: users, a few teams,
/// some deactivations, and recent posts so the activity columns have data.
pub fn seed(store: &Store, now: OffsetDateTime) -> Result<DemoSummary> {
    let mut faker = UserFaker::new(DEMO_SEED);
    let now_ms = unix_millis(now);

    let mut teams: Vec<TeamId> = Vec::new();
    let mut names: Vec<&str> = Vec::new();
    while names.len() < DEMO_TEAMS {
        let name = faker.team_name();
        if !names.contains(&name) {
            names.push(name);
            teams.push(store.create_team(name, now_ms - 400 * DAY_MS)?);
        }
    }

    let mut posts = 0;
    for _ in 0..DEMO_USERS {
        let user = faker.user();
        let id = store.create_user(&NewUser {
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            roles: user.roles,
            create_at: user.create_at,
        })?;

        if faker.int_n(3) != 0 {
            let team = teams[faker.int_n(teams.len())];
            store.add_team_member(team, id, user.create_at)?;
        }

        let count = faker.int_n(12);
        for at in faker.post_times(now, 200, count) {
            store.record_post(id, at)?;
            posts += 1;
        }
        if count > 0 {
            store.record_login(id, now_ms - DAY_MS * faker.int_n(30) as i64)?;
        }
        if user.deactivated {
            store.deactivate_user(id, now_ms - DAY_MS * faker.int_n(60) as i64)?;
        }
    }

    let summary = DemoSummary {
        users: DEMO_USERS,
        teams: teams.len(),
        posts,
    };
    info!(?summary, "seeded demo data");
    Ok(summary)
}
