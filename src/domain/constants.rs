pub const USERS: &str = "users";
pub const CREDENTIALS: &str = "credentials";
pub const CANDIDATES: &str = "candidates";
pub const FOS: &str = "fos";
pub const CONTROLS: &str = "controles_disciplinares";

/// Upper bound on operations in one atomic write batch.
pub const MAX_BATCH_WRITES: usize = 500;
/// Observations flipped per batch when closing a control. Leaves room for the
/// job-progress update that rides in the same batch.
pub const CLOSE_CHUNK: usize = 450;
pub const IMPORT_CHUNK: usize = 500;

pub const MIN_DESCRIPTION_CHARS: usize = 5;
pub const MIN_PUNISHMENT_CHARS: usize = 2;
pub const MIN_WAR_NAME_CHARS: usize = 2;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_SUGGESTIONS: usize = 8;

pub const RANK_OPTIONS: [&str; 3] = ["Capitão", "1º Tenente", "2º Tenente"];

pub const DEFAULT_CANDIDATE_KIND: &str = "cfg";
/// Rendered for missing snapshot values.
pub const PLACEHOLDER: &str = "—";
