mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod services;
mod session;
mod store;

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chrono::Local;
use cli::*;
use commands::*;
use config::Config;
use domain::models::*;
use error::{error_code, AppError};
use serde::Serialize;
use services::candidates::{
    import_csv, load_candidates, suggest as candidate_suggestions, to_item,
};
use services::controls::{
    close as close_control, download as download_control, list as list_controls,
    list_pending as list_pending_control, resume as resume_control,
};
use services::identity::{sign_in, sign_out, sign_up, whoami, LocalIdentity, SignUpForm};
use services::intake::{submit, Submission};
use services::judging::{judge, list_pending as list_unjudged};
use services::output::{cell, print_err, print_one, print_out};
use services::stats::{StatView, StatsBook};
use services::storage::audit;
use services::users::{list as list_users, set_role};
use session::Session;
use store::JsonFileStore;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let data_dir = config.data_dir()?;
    let store = JsonFileStore::open(&data_dir)
        .with_context(|| format!("opening data directory {}", data_dir.display()))?;
    tracing::debug!(path = %store.path().display(), "document store opened");
    let session = Session::load().context("reading session file")?;

    let mut ctx = AppContext {
        config,
        session,
        store: Box::new(store),
    };

    let handlers: [fn(&Cli, &mut AppContext) -> anyhow::Result<bool>; 7] = [
        handle_auth_commands,
        handle_candidate_commands,
        handle_fo_commands,
        handle_judge_commands,
        handle_control_commands,
        handle_stats_commands,
        handle_user_commands,
    ];
    for handler in handlers {
        if handler(cli, &mut ctx)? {
            return Ok(());
        }
    }
    anyhow::bail!("unhandled command")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = error_code(&err);
            if code == "INTERNAL" {
                tracing::error!(error = ?err, "command failed");
            }
            print_err(cli.json, code, &format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
