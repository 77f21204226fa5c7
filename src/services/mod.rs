//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `identity.rs` — local credentials, sign-up/sign-in/sign-out.
//! - `candidates.rs` — CSV roster import, listing and suggestions.
//! - `intake.rs` — observation submission and candidate resolution.
//! - `judging.rs` — "Hora do Pato" pending list and punishment recording.
//! - `controls.rs` — control closing, resume, listing and PDF download.
//! - `pdf.rs` — control table rendering.
//! - `stats.rs` — per-candidate and per-issuer aggregation.
//! - `collate.rs` — accent-insensitive name ordering.
//! - `users.rs` — profile listing and role changes.
//! - `storage.rs` — config/session paths, session file and audit log.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Validate everything before the first write.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod candidates;
pub mod collate;
pub mod controls;
pub mod identity;
pub mod intake;
pub mod judging;
pub mod output;
pub mod pdf;
pub mod stats;
pub mod storage;
pub mod users;
