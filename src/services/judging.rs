use crate::domain::constants::{FOS, MIN_PUNISHMENT_CHARS};
use crate::domain::models::{FoKind, Observation, Stored};
use crate::error::AppError;
use crate::fields;
use crate::services::storage::{audit, now_ms};
use crate::session::Session;
use crate::store::{fetch, fetch_all, DocumentStore, Query};

/// Unjudged negative observations, newest first, optionally narrowed to
/// candidates whose name contains `filter`.
pub fn list_pending(
    store: &dyn DocumentStore,
    filter: Option<&str>,
) -> anyhow::Result<Vec<Stored<Observation>>> {
    let needle = filter
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty());
    let mut pending = fetch_all::<Observation>(store, FOS, &Query::new())
        .map_err(AppError::load("loading observations"))?
        .into_iter()
        .filter(|fo| fo.doc.kind == FoKind::Negativo && !fo.doc.judged)
        .filter(|fo| match &needle {
            Some(n) => candidate_key(&fo.doc).contains(n.as_str()),
            None => true,
        })
        .collect::<Vec<_>>();
    pending.sort_by(|a, b| b.doc.created_at.cmp(&a.doc.created_at));
    Ok(pending)
}

fn candidate_key(fo: &Observation) -> String {
    if fo.candidate_name_lower.is_empty() {
        fo.candidate_name.to_lowercase()
    } else {
        fo.candidate_name_lower.clone()
    }
}

/// Records the punishment. The control status is left alone; a judged
/// observation reads as pending control through `effective_status`.
pub fn judge(
    store: &mut dyn DocumentStore,
    session: &Session,
    fo_id: &str,
    punishment: &str,
) -> anyhow::Result<Stored<Observation>> {
    session.require_user()?;
    let judge_label = session
        .profile()
        .and_then(|p| p.rank_and_name())
        .ok_or_else(|| {
            AppError::Auth("profile not loaded; sign in again before judging".to_string())
        })?;
    let punishment = punishment.trim();
    if punishment.chars().count() < MIN_PUNISHMENT_CHARS {
        return Err(AppError::Validation(format!(
            "punishment must have at least {} characters",
            MIN_PUNISHMENT_CHARS
        ))
        .into());
    }

    let Some(mut fo) = fetch::<Observation>(store, FOS, fo_id)
        .map_err(AppError::load("reading observation"))?
    else {
        return Err(AppError::NotFound(format!("observation {} not found", fo_id)).into());
    };
    if fo.doc.kind != FoKind::Negativo {
        return Err(AppError::Validation(format!(
            "observation {} is {}; only negative observations are judged",
            fo_id,
            fo.doc.kind.as_str()
        ))
        .into());
    }
    if fo.doc.judged {
        return Err(AppError::Validation(format!(
            "observation {} was already judged by {}",
            fo_id, fo.doc.judged_by
        ))
        .into());
    }

    let judged_at = now_ms();
    store
        .update(
            FOS,
            fo_id,
            fields! {
                "punicao" => punishment,
                "jaJulgado" => true,
                "julgadoPor" => judge_label,
                "julgadoAt" => judged_at,
            },
        )
        .map_err(AppError::save("saving judgment"))?;

    fo.doc.punishment = punishment.to_string();
    fo.doc.judged = true;
    fo.doc.judged_by = judge_label;
    fo.doc.judged_at = Some(judged_at);
    tracing::info!(fo = %fo_id, judge = %fo.doc.judged_by, "observation judged");
    audit(
        "judge",
        serde_json::json!({"fo": fo_id, "punicao": fo.doc.punishment, "julgadoPor": fo.doc.judged_by}),
    );
    Ok(fo)
}
