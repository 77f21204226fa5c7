/// Failures with a stable machine code, surfaced as `error.code` in `--json` output.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("profile incomplete (rank and war name not found); sign out and register again")]
    ProfileIncomplete,
    #[error("{context}: {source}")]
    Load {
        context: String,
        source: crate::store::StoreError,
    },
    #[error("{context}: {source}")]
    Save {
        context: String,
        source: crate::store::StoreError,
    },
    #[error("control {0} has an unfinished close; run `control resume {0}` first")]
    ControlIncomplete(String),
    #[error("control {control_id} partially closed: {marked} of {total} observations marked; run `control resume {control_id}` ({source})")]
    PartialClose {
        control_id: String,
        marked: usize,
        total: usize,
        source: crate::store::StoreError,
    },
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION",
            AppError::Auth(_) => "AUTH",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ProfileIncomplete => "PROFILE_INCOMPLETE",
            AppError::Load { .. } => "LOAD_ERROR",
            AppError::Save { .. } => "SAVE_ERROR",
            AppError::ControlIncomplete(_) => "CONTROL_INCOMPLETE",
            AppError::PartialClose { .. } => "PARTIAL_CLOSE",
        }
    }

    pub fn load(context: impl Into<String>) -> impl FnOnce(crate::store::StoreError) -> AppError {
        let context = context.into();
        move |source| AppError::Load { context, source }
    }

    pub fn save(context: impl Into<String>) -> impl FnOnce(crate::store::StoreError) -> AppError {
        let context = context.into();
        move |source| AppError::Save { context, source }
    }
}

/// Machine code for any error reaching `main`.
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|e| e.downcast_ref::<AppError>())
        .map(AppError::code)
        .unwrap_or("INTERNAL")
}
