// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::io::{BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use roster_app::{
    ActivityFilter, DateRange, FilterState, LoadState, PageSource, PersistedView, RoleFilter,
    SortColumn, TeamFilter, TeamId, UserRecord, ViewCommand, ViewEvent, ViewSession, ViewState,
};
use roster_db::validation::{format_optional_timestamp, format_timestamp, parse_page_size};

use crate::runtime::FetchRuntime;

const HELP: &str = "\
commands:
  n, next                 next page
  p, prev                 previous page
  first                   back to the first page
  r, refresh              reload the current page
  s, sort <col> [asc|desc]  sort by username, email, or create_at (toggles without a direction)
  range <name>            all_time, last_30_days, previous_month, last_6_months
  role <name|any>         system_admin, system_user, system_guest
  team <id|none|any>      team membership
  status <any|active|inactive>
  size <n>                rows per page (1-100)
  link                    print the current view as a query string
  h, help                 this text
  q, quit                 leave
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(ViewCommand),
    ShowLink,
    Help,
    Quit,
}

/// Parses one input line against the current view. Blank lines yield `None`.
pub fn parse_input(line: &str, state: &ViewState) -> Result<Option<ConsoleInput>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let extra = words.next();

    let input = match (head, arg) {
        ("n" | "next", None) => ConsoleInput::Command(ViewCommand::NextPage),
        ("p" | "prev" | "previous", None) => ConsoleInput::Command(ViewCommand::PreviousPage),
        ("first", None) => ConsoleInput::Command(ViewCommand::FirstPage),
        ("r" | "refresh", None) => ConsoleInput::Command(ViewCommand::Refresh),
        ("s" | "sort", Some(raw)) => {
            let column = SortColumn::parse(raw).ok_or_else(|| {
                anyhow!("unknown sort column {raw:?}; use username, email, or create_at")
            })?;
            match extra {
                None => ConsoleInput::Command(ViewCommand::ToggleSort(column)),
                Some("asc") => ConsoleInput::Command(ViewCommand::SetSort {
                    column,
                    descending: false,
                }),
                Some("desc") => ConsoleInput::Command(ViewCommand::SetSort {
                    column,
                    descending: true,
                }),
                Some(other) => bail!("unknown sort direction {other:?}; use asc or desc"),
            }
        }
        ("range", Some(raw)) => {
            let date_range = DateRange::parse(raw).ok_or_else(|| {
                anyhow!(
                    "unknown date range {raw:?}; use all_time, last_30_days, previous_month, or last_6_months"
                )
            })?;
            filter_command(state, |filter| filter.date_range = date_range)
        }
        ("role", Some(raw)) => {
            let role = match raw {
                "any" => None,
                other => Some(RoleFilter::parse(other).ok_or_else(|| {
                    anyhow!("unknown role {other:?}; use system_admin, system_user, system_guest, or any")
                })?),
            };
            filter_command(state, |filter| filter.role = role)
        }
        ("team", Some(raw)) => {
            let team = match raw {
                "any" => TeamFilter::Any,
                "none" => TeamFilter::NoTeam,
                other => {
                    let id = other
                        .parse::<i64>()
                        .with_context(|| format!("team {other:?} is not a team id, none, or any"))?;
                    TeamFilter::Member(TeamId::new(id))
                }
            };
            filter_command(state, |filter| filter.team = team)
        }
        ("status", Some(raw)) => {
            let activity = ActivityFilter::parse(raw).ok_or_else(|| {
                anyhow!("unknown status {raw:?}; use any, active, or inactive")
            })?;
            filter_command(state, |filter| filter.activity = activity)
        }
        ("size", Some(raw)) => {
            let size = parse_page_size(raw).with_context(|| format!("page size {raw:?}"))?;
            ConsoleInput::Command(ViewCommand::SetPageSize(size))
        }
        ("link", None) => ConsoleInput::ShowLink,
        ("h" | "help" | "?", None) => ConsoleInput::Help,
        ("q" | "quit" | "exit", None) => ConsoleInput::Quit,
        _ => bail!("unrecognized command {:?}; type help for the list", line.trim()),
    };

    if extra.is_some() && !matches!(head, "s" | "sort") {
        bail!("too many arguments for {head}");
    }
    Ok(Some(input))
}

fn filter_command(state: &ViewState, change: impl FnOnce(&mut FilterState)) -> ConsoleInput {
    let mut filter = state.filter;
    change(&mut filter);
    ConsoleInput::Command(ViewCommand::SetFilter(filter))
}

fn unchanged_message(command: &ViewCommand, session: &ViewSession) -> &'static str {
    match command {
        ViewCommand::NextPage | ViewCommand::PreviousPage
            if session.load_state() == LoadState::Failed =>
        {
            "the last request failed; r to retry"
        }
        ViewCommand::NextPage => "already on the last page",
        ViewCommand::PreviousPage => "already on the first page",
        ViewCommand::SetPageSize(_) => "page size unchanged",
        ViewCommand::SetFilter(_) => "filter unchanged",
        ViewCommand::SetSort { .. } | ViewCommand::ToggleSort(_) => "sort unchanged",
        _ => "nothing to do",
    }
}

const HEADERS: [&str; 9] = [
    "ID", "USERNAME", "EMAIL", "ROLES", "CREATED", "LAST POST", "DAYS", "POSTS", "STATUS",
];

fn row_cells(row: &UserRecord) -> [String; 9] {
    let optional = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();
    [
        row.id.to_string(),
        row.username.clone(),
        row.email.clone(),
        row.roles.clone(),
        format_timestamp(row.create_at),
        format_optional_timestamp(row.last_post_date),
        optional(row.days_active),
        optional(row.total_posts),
        if row.is_deleted() { "inactive" } else { "active" }.to_owned(),
    ]
}

fn describe_view(state: &ViewState) -> String {
    let filter = state.filter;
    let role = filter.role.map_or("any", RoleFilter::as_str);
    let team = match filter.team {
        TeamFilter::Any => "any".to_owned(),
        TeamFilter::NoTeam => "none".to_owned(),
        TeamFilter::Member(id) => id.to_string(),
    };
    format!(
        "sort: {} {}  range: {}  role: {}  team: {}  status: {}  size: {}",
        state.sort.column.as_str(),
        state.sort.direction().as_str(),
        filter.date_range.label(),
        role,
        team,
        filter.activity.as_str(),
        state.page_size(),
    )
}

/// Renders the header line, the row table, and the pager line.
pub fn render(session: &ViewSession) -> String {
    let mut out = String::new();
    out.push_str(&describe_view(session.state()));
    out.push('\n');

    let rows = session.current_window();
    if rows.is_empty() {
        out.push_str("(no users)\n");
    } else {
        let cells: Vec<[String; 9]> = rows.iter().map(row_cells).collect();
        let mut widths = HEADERS.map(str::len);
        for line in &cells {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }
        push_table_line(&mut out, &HEADERS.map(str::to_owned), &widths);
        for line in &cells {
            push_table_line(&mut out, line, &widths);
        }
    }

    let navigation = session.navigation();
    let range = session
        .page_range()
        .map(|range| range.label())
        .unwrap_or_else(|| {
            if session.current_window().is_empty() {
                "Showing 0 - 0".to_owned()
            } else {
                "Showing earlier results".to_owned()
            }
        });
    let pager = |enabled: bool, label: &str| {
        if enabled {
            format!("[{label}]")
        } else {
            format!(" {label} ")
        }
    };
    out.push_str(&format!(
        "{range}  {}  {}\n",
        pager(navigation.can_go_previous, "p prev"),
        pager(navigation.can_go_next, "n next"),
    ));

    match session.load_state() {
        LoadState::Failed => {
            if let Some(error) = session.last_error() {
                out.push_str(&format!("error: {error}\n"));
            }
        }
        LoadState::Loading => out.push_str("loading...\n"),
        LoadState::Idle | LoadState::Loaded => {}
    }
    out
}

fn push_table_line(out: &mut String, cells: &[String; 9], widths: &[usize; 9]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn notices(events: &[ViewEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ViewEvent::EndReached { .. } => Some("no more users that way".to_owned()),
            _ => None,
        })
        .collect()
}

/// Loads the first page, then reads commands from `input` until EOF or quit.
pub fn run<R, W, S>(
    mut input: R,
    output: &mut W,
    session: &mut ViewSession,
    runtime: &FetchRuntime<S>,
) -> Result<()>
where
    R: BufRead,
    W: Write,
    S: PageSource + Send + 'static,
{
    let events = session.dispatch(ViewCommand::Load);
    let events = runtime.run(session, events);
    write_frame(output, session, &events)?;

    let mut line = String::new();
    loop {
        write!(output, "roster> ")?;
        output.flush().context("flush console output")?;
        line.clear();
        if input.read_line(&mut line).context("read console input")? == 0 {
            writeln!(output)?;
            break;
        }

        match parse_input(&line, session.state()) {
            Ok(None) => {}
            Ok(Some(ConsoleInput::Quit)) => break,
            Ok(Some(ConsoleInput::Help)) => write!(output, "{HELP}")?,
            Ok(Some(ConsoleInput::ShowLink)) => {
                let view = PersistedView::from(session.state());
                writeln!(output, "?{}", view.to_query_string())?;
            }
            Ok(Some(ConsoleInput::Command(command))) => {
                let message = unchanged_message(&command, session);
                let events = session.dispatch(command);
                if events.is_empty() {
                    writeln!(output, "{message}")?;
                    continue;
                }
                let events = runtime.run(session, events);
                write_frame(output, session, &events)?;
            }
            Err(error) => writeln!(output, "error: {error:#}")?,
        }
    }
    Ok(())
}

fn write_frame<W: Write>(output: &mut W, session: &ViewSession, events: &[ViewEvent]) -> Result<()> {
    for notice in notices(events) {
        writeln!(output, "{notice}")?;
    }
    write!(output, "{}", render(session)).context("write page")?;
    Ok(())
}
