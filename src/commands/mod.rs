//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `admin.rs` — candidates/control/user command trees (admin-facing).
//! - `runtime.rs` — auth/fo/judge/stats command trees (every officer).
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.

pub mod admin;
pub mod runtime;

pub use admin::{handle_candidate_commands, handle_control_commands, handle_user_commands};
pub use runtime::{
    handle_auth_commands, handle_fo_commands, handle_judge_commands, handle_stats_commands,
};

use crate::config::Config;
use crate::session::Session;
use crate::store::DocumentStore;

/// Everything a handler needs, built once per invocation.
pub struct AppContext {
    pub config: Config,
    pub session: Session,
    pub store: Box<dyn DocumentStore>,
}
