use crate::cli::SubmitKind;
use crate::domain::constants::{FOS, MIN_DESCRIPTION_CHARS, USERS};
use crate::domain::models::{
    Candidate, ControlStatus, FoKind, Observation, SessionFile, Stored, UserProfile,
};
use crate::error::AppError;
use crate::services::candidates::{load_candidates, suggest};
use crate::services::storage::now_ms;
use crate::session::Session;
use crate::store::{encode, fetch, DocumentStore};

impl From<SubmitKind> for FoKind {
    fn from(k: SubmitKind) -> Self {
        match k {
            SubmitKind::Positivo => FoKind::Positivo,
            SubmitKind::Negativo => FoKind::Negativo,
        }
    }
}

/// Picks the candidate the selector names exactly: a document id, or a name
/// that matches one candidate ignoring case. Anything else is free text.
pub fn resolve_candidate<'a>(
    candidates: &'a [Stored<Candidate>],
    selector: &str,
) -> Result<&'a Stored<Candidate>, AppError> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(AppError::Validation(
            "select a candidate from the list".to_string(),
        ));
    }
    if let Some(c) = candidates.iter().find(|c| c.id == selector) {
        return Ok(c);
    }
    let wanted = selector.to_lowercase();
    let exact: Vec<&Stored<Candidate>> = candidates
        .iter()
        .filter(|c| c.doc.name_lower.trim() == wanted)
        .collect();
    match exact.as_slice() {
        [one] => Ok(*one),
        [] => {
            let hints: Vec<String> = suggest(candidates, selector)
                .into_iter()
                .map(|c| format!("{} ({})", c.doc.name, c.id))
                .collect();
            if hints.is_empty() {
                Err(AppError::Validation(format!(
                    "no candidate found for '{}'; select an existing candidate",
                    selector
                )))
            } else {
                Err(AppError::Validation(format!(
                    "select a candidate from the list: {}",
                    hints.join(", ")
                )))
            }
        }
        many => Err(AppError::Validation(format!(
            "'{}' matches {} candidates; select one by id: {}",
            selector,
            many.len(),
            many.iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Officer label from the session snapshot, falling back to the stored
/// profile when the snapshot lacks rank or war name.
pub fn resolve_issuer(
    store: &dyn DocumentStore,
    user: &SessionFile,
) -> Result<Option<String>, AppError> {
    if let Some(label) = user.profile.as_ref().and_then(|p| p.officer_label()) {
        return Ok(Some(label));
    }
    let stored = fetch::<UserProfile>(store, USERS, &user.uid)
        .map_err(AppError::load("reading user profile"))?;
    Ok(stored.and_then(|p| p.doc.officer_label()))
}

pub struct Submission<'a> {
    pub kind: FoKind,
    pub candidate: &'a str,
    pub description: &'a str,
}

pub fn submit(
    store: &mut dyn DocumentStore,
    session: &Session,
    form: Submission,
) -> anyhow::Result<Stored<Observation>> {
    let user = session.require_user()?;
    if form.kind == FoKind::Neutro {
        return Err(AppError::Validation(
            "observations are either positivo or negativo".to_string(),
        )
        .into());
    }
    let candidates = load_candidates(store)?;
    let candidate = resolve_candidate(&candidates, form.candidate)?;
    let description = form.description.trim();
    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "describe the observed fact (at least {} characters)",
            MIN_DESCRIPTION_CHARS
        ))
        .into());
    }
    let issued_by = resolve_issuer(store, user)?.ok_or(AppError::ProfileIncomplete)?;

    let fo = Observation {
        kind: form.kind,
        description: description.to_string(),
        candidate_id: candidate.id.clone(),
        candidate_name: candidate.doc.name.clone(),
        candidate_name_lower: candidate.doc.name_lower.clone(),
        candidate_kind: candidate.doc.kind.clone(),
        issued_by,
        issued_by_uid: user.uid.clone(),
        punishment: String::new(),
        judged: false,
        judged_by: String::new(),
        judged_at: None,
        created_at: now_ms(),
        control_status: Some(ControlStatus::NaoJulgado),
        in_control: false,
        control_id: None,
        control_closed_at: None,
        control_closed_by: None,
    };
    let id = store
        .add(FOS, encode(&fo).map_err(AppError::save("encoding observation"))?)
        .map_err(AppError::save("saving observation"))?;
    tracing::info!(fo = %id, kind = fo.kind.as_str(), candidate = %fo.candidate_name, "observation recorded");
    Ok(Stored { id, doc: fo })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Role;
    use crate::domain::constants::CANDIDATES;
    use crate::store::{MemoryStore, WriteBatch};

    fn seed_candidates(store: &mut MemoryStore, names: &[(&str, &str)]) {
        let mut batch = WriteBatch::new();
        for (id, name) in names {
            batch
                .set(
                    CANDIDATES,
                    id,
                    &Candidate {
                        name: name.to_string(),
                        kind: "cfg".to_string(),
                        active: true,
                        name_lower: name.to_lowercase(),
                        created_at: 1,
                    },
                )
                .expect("encode");
        }
        store.commit(batch).expect("commit");
    }

    fn officer_session(profile: Option<UserProfile>) -> Session {
        Session::signed_in(SessionFile {
            uid: "u1".to_string(),
            email: "ten@unidade.mil.br".to_string(),
            profile,
        })
    }

    fn full_profile() -> UserProfile {
        UserProfile {
            email: "ten@unidade.mil.br".to_string(),
            rank: "1º Tenente".to_string(),
            war_name: "Araújo".to_string(),
            role: Role::User,
            created_at: 1,
        }
    }

    fn fixture() -> MemoryStore {
        let mut store = MemoryStore::new();
        seed_candidates(
            &mut store,
            &[("c1", "Carlos Lima"), ("c2", "Carla Lima"), ("c3", "Bruno Dias")],
        );
        store
    }

    #[test]
    fn submit_writes_unjudged_observation() {
        let mut store = fixture();
        let session = officer_session(Some(full_profile()));
        let fo = submit(
            &mut store,
            &session,
            Submission {
                kind: FoKind::Negativo,
                candidate: "carlos lima",
                description: "  Atraso na formatura  ",
            },
        )
        .expect("submit");
        assert_eq!(fo.doc.candidate_id, "c1");
        assert_eq!(fo.doc.description, "Atraso na formatura");
        assert_eq!(fo.doc.issued_by, "1º Tenente Araújo");
        assert!(!fo.doc.judged);
        assert_eq!(fo.doc.punishment, "");
        assert_eq!(fo.doc.effective_status(), ControlStatus::NaoJulgado);
        assert_eq!(store.list(FOS).expect("list").len(), 1);
    }

    #[test]
    fn free_text_candidate_leaves_store_unchanged() {
        let mut store = fixture();
        let session = officer_session(Some(full_profile()));
        let err = submit(
            &mut store,
            &session,
            Submission {
                kind: FoKind::Positivo,
                candidate: "Lima",
                description: "Ajudou colega",
            },
        )
        .expect_err("free text");
        assert_eq!(crate::error::error_code(&err), "VALIDATION");
        assert!(err.to_string().contains("Carlos Lima (c1)"));
        assert!(store.list(FOS).expect("list").is_empty());
    }

    #[test]
    fn short_description_leaves_store_unchanged() {
        let mut store = fixture();
        let session = officer_session(Some(full_profile()));
        let err = submit(
            &mut store,
            &session,
            Submission {
                kind: FoKind::Positivo,
                candidate: "c3",
                description: " ab c ",
            },
        )
        .expect_err("too short");
        assert_eq!(crate::error::error_code(&err), "VALIDATION");
        assert!(store.list(FOS).expect("list").is_empty());
    }

    #[test]
    fn issuer_falls_back_to_stored_profile() {
        let mut store = fixture();
        let mut batch = WriteBatch::new();
        batch.set(USERS, "u1", &full_profile()).expect("encode");
        store.commit(batch).expect("commit");

        let session = officer_session(None);
        let fo = submit(
            &mut store,
            &session,
            Submission {
                kind: FoKind::Positivo,
                candidate: "c2",
                description: "Liderança no exercício",
            },
        )
        .expect("submit");
        assert_eq!(fo.doc.issued_by, "1º Tenente Araújo");
    }

    #[test]
    fn missing_profile_is_reported_as_incomplete() {
        let mut store = fixture();
        let session = officer_session(Some(UserProfile {
            rank: "Capitão".to_string(),
            ..UserProfile::default()
        }));
        let err = submit(
            &mut store,
            &session,
            Submission {
                kind: FoKind::Negativo,
                candidate: "c2",
                description: "Uniforme incompleto",
            },
        )
        .expect_err("no war name anywhere");
        assert_eq!(crate::error::error_code(&err), "PROFILE_INCOMPLETE");
        assert!(store.list(FOS).expect("list").is_empty());
    }

    #[test]
    fn anonymous_submit_is_rejected() {
        let mut store = fixture();
        let err = submit(
            &mut store,
            &Session::anonymous(),
            Submission {
                kind: FoKind::Negativo,
                candidate: "c2",
                description: "Uniforme incompleto",
            },
        )
        .expect_err("no session");
        assert_eq!(crate::error::error_code(&err), "AUTH");
    }
}
