// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod console;
mod demo;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use roster_app::{PersistPolicy, ViewStateStore};
use roster_db::Store;
use runtime::FetchRuntime;
use std::env;
use std::io;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

const VIEW_KEY: &str = "users";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    match options.action {
        CliAction::Help => {
            print_help();
            return Ok(());
        }
        CliAction::PrintConfigPath => {
            println!("{}", options.config_path.display());
            return Ok(());
        }
        CliAction::PrintExampleConfig => {
            print!("{}", Config::example_config(&options.config_path));
            return Ok(());
        }
        CliAction::PrintDbPath | CliAction::Check | CliAction::Browse => {}
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `roster --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    init_tracing(config.log_filter())?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.action == CliAction::PrintDbPath {
        println!("{}", db_path.display());
        return Ok(());
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or ROSTER_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        demo::seed(&store, OffsetDateTime::now_utc())?;
    }

    let timeout = config.fetch_timeout()?;
    let state_path = config.state_path()?;
    let mut views = if config.persist_view() {
        ViewStateStore::load(&state_path)?
    } else {
        ViewStateStore::new()
    };
    if options.action == CliAction::Check {
        return Ok(());
    }

    let mut session = views.mount(VIEW_KEY, config.default_view());
    let runtime = FetchRuntime::new(store, timeout);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    console::run(stdin.lock(), &mut stdout, &mut session, &runtime)?;

    if config.persist_view() && !options.demo {
        views.unmount(VIEW_KEY, session, PersistPolicy::Keep);
        views.save(&state_path)?;
        info!(path = %state_path.display(), "saved view state");
    } else {
        views.unmount(VIEW_KEY, session, PersistPolicy::Discard);
    }
    Ok(())
}

/// `RUST_LOG` wins over `[log].filter`. Logs go to stderr so they do not
/// interleave with the table on stdout.
fn init_tracing(configured: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(configured)
            .with_context(|| format!("invalid log filter {configured:?}"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("initialize logging: {error}"))
}

/// What one invocation does. When several are requested, the one that
/// touches the least state wins, so `--check --help` only prints help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CliAction {
    Help,
    PrintConfigPath,
    PrintExampleConfig,
    PrintDbPath,
    Check,
    Browse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    demo: bool,
    action: CliAction,
}

// View and storage settings that live in the config file rather than on the
// command line.
const CONFIG_ONLY_FLAGS: &[(&str, &str)] = &[
    ("--db", "[storage].db_path"),
    ("--db-path", "[storage].db_path"),
    ("--page-size", "[ui].page_size"),
    ("--sort", "[ui].default_sort"),
    ("--timeout", "[ui].fetch_timeout"),
    ("--log", "[log].filter"),
];

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        demo: false,
        action: CliAction::Browse,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let requested = match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
                continue;
            }
            "--demo" => {
                options.demo = true;
                continue;
            }
            "--help" | "-h" => CliAction::Help,
            "--print-config-path" => CliAction::PrintConfigPath,
            "--print-example-config" => CliAction::PrintExampleConfig,
            "--print-path" => CliAction::PrintDbPath,
            "--check" => CliAction::Check,
            unknown => {
                let flag = unknown.split_once('=').map_or(unknown, |(flag, _)| flag);
                if let Some((_, key)) = CONFIG_ONLY_FLAGS.iter().find(|(name, _)| *name == flag) {
                    bail!(
                        "{flag} is not a command-line option; set {key} in the config file (see --print-example-config)"
                    );
                }
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        };
        options.action = options.action.min(requested);
    }

    Ok(options)
}

fn print_help() {
    println!("roster: page through user accounts");
    println!();
    println!("usage: roster [--config <path>] [--demo] [action]");
    println!();
    println!("actions (default: open the user list console):");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --print-path             Print resolved database path (:memory: with --demo)");
    println!("  --check                  Validate config, database schema, and saved view state");
    println!("  --help, -h               Show this help");
    println!();
    println!("options:");
    println!("  --config <path>          Use a specific config path");
    println!("  --demo                   Use an in-memory database seeded with demo users");
    println!();
    println!("page size, sort, and database path are set in the config file.");
}
