use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fotrack",
    version,
    about = "Disciplinary observation (FO) tracking CLI"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        help = "Config file (default: ~/.config/fotrack/config.toml)"
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign up, sign in and manage the local session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Candidate roster
    Candidates {
        #[command(subcommand)]
        command: CandidateCommands,
    },
    /// Observation intake
    Fo {
        #[command(subcommand)]
        command: FoCommands,
    },
    /// Review unjudged negative observations ("Hora do Pato")
    Judge {
        #[command(subcommand)]
        command: JudgeCommands,
    },
    /// Disciplinary controls
    Control {
        #[command(subcommand)]
        command: ControlCommands,
    },
    /// Aggregated statistics over all observations
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
    /// User profiles and roles
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        nome_guerra: String,
        #[arg(long, help = "Capitão, 1º Tenente or 2º Tenente")]
        posto: String,
    },
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignOut,
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum CandidateCommands {
    /// Bulk import from a CSV with Nome,Tipo,Ativo columns
    Import { csv: PathBuf },
    List,
    Suggest { query: String },
}

#[derive(Subcommand, Debug)]
pub enum FoCommands {
    Submit {
        #[arg(long, value_enum, default_value_t = SubmitKind::Positivo)]
        kind: SubmitKind,
        #[arg(long, help = "Candidate id or exact candidate name")]
        candidate: String,
        #[arg(long)]
        description: String,
    },
    Suggest {
        query: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum JudgeCommands {
    List {
        #[arg(long)]
        filter: Option<String>,
    },
    Record {
        fo_id: String,
        #[arg(long)]
        punishment: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ControlCommands {
    /// Judged observations waiting for a control
    Pending,
    Close {
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Finish an interrupted close
    Resume {
        control_id: String,
    },
    List,
    Download {
        control_id: String,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StatsCommands {
    Counter {
        name: String,
    },
    MostSanctioned {
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        index: i64,
    },
    TopIssuer {
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        index: i64,
    },
    /// Candidate names seen in observations
    Suggest {
        query: String,
    },
    Summary,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    List,
    SetRole {
        email: String,
        #[arg(value_enum)]
        role: Role,
    },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubmitKind {
    Positivo,
    Negativo,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}
