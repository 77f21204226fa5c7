//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep stored document shapes and report structs in one place.
//! - Avoid cyclic imports and duplicated type definitions.
//! - Make stored schema and JSON output changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — stored documents (users, candidates, fos, controls) and reports.
//! - `constants.rs` — collection names, batch limits, validation minimums.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/store side effects.
//!
//! ## Compatibility note
//! Stored field names follow the existing document schema (`candidateNome`,
//! `statusControle`, ...). Renaming a serde key breaks existing data files and
//! the contracts under `docs/contracts/*`.

pub mod constants;
pub mod models;
