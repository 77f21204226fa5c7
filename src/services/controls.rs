//! Closing judged observations into disciplinary controls.
//!
//! A close writes the control document (header, line snapshot and job record)
//! first, then flips the absorbed observations in batches of [`CLOSE_CHUNK`].
//! Each batch also advances `fechamento.marcados` on the control, so the job
//! record always agrees with the observations. A run that stops part-way is
//! finished with [`resume`].

use crate::domain::constants::{CLOSE_CHUNK, CONTROLS, FOS, PLACEHOLDER};
use crate::domain::models::{
    ClosingJob, CloseReport, ControlLine, ControlStatus, ControlSummary, DisciplinaryControl,
    JobStatus, Observation, PdfReport, ResumeReport, Stored,
};
use crate::error::AppError;
use crate::fields;
use crate::services::pdf::render_control;
use crate::services::storage::{audit, now_ms};
use crate::session::Session;
use crate::store::{fetch, fetch_all, Direction, DocumentStore, Query, StoreError, WriteBatch};
use anyhow::Context;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub fn control_id(now: &DateTime<Local>) -> String {
    now.format("CD-%Y%m%d-%H%M%S").to_string()
}

pub fn control_title(now: &DateTime<Local>) -> String {
    now.format("Controle disciplinar - Dia %d/%m/%Y").to_string()
}

fn stamp(now: &DateTime<Local>) -> String {
    now.format("%d/%m/%Y %H:%M").to_string()
}

fn or_placeholder(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        value.to_string()
    }
}

pub fn snapshot_line(fo: &Observation) -> ControlLine {
    ControlLine {
        candidate_name: or_placeholder(&fo.candidate_name),
        description: or_placeholder(&fo.description),
        issued_by: or_placeholder(&fo.issued_by),
        punishment: or_placeholder(&fo.punishment),
        judged_by: or_placeholder(&fo.judged_by),
    }
}

/// Judged observations not yet absorbed by a control, newest first.
/// Documents without `createdAt` sort as time zero.
pub fn list_pending(store: &dyn DocumentStore) -> anyhow::Result<Vec<Stored<Observation>>> {
    let mut pending: Vec<Stored<Observation>> = fetch_all::<Observation>(store, FOS, &Query::new())
        .map_err(AppError::load("loading observations"))?
        .into_iter()
        .filter(|fo| fo.doc.effective_status() == ControlStatus::JulgadoPendenteControle)
        .collect();
    pending.sort_by(|a, b| b.doc.created_at.cmp(&a.doc.created_at));
    Ok(pending)
}

fn load_controls(store: &dyn DocumentStore) -> anyhow::Result<Vec<Stored<DisciplinaryControl>>> {
    let query = Query::new().order_by("createdAt", Direction::Desc);
    Ok(fetch_all::<DisciplinaryControl>(store, CONTROLS, &query)
        .map_err(AppError::load("loading controls"))?)
}

fn load_control(
    store: &dyn DocumentStore,
    control_id: &str,
) -> anyhow::Result<DisciplinaryControl> {
    fetch::<DisciplinaryControl>(store, CONTROLS, control_id)
        .map_err(AppError::load("reading control"))?
        .map(|c| c.doc)
        .ok_or_else(|| AppError::NotFound(format!("control {} not found", control_id)).into())
}

fn write_pdf(out_dir: &Path, file_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let path = out_dir.join(file_name);
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

struct Stamp<'a> {
    control_id: &'a str,
    closed_at: i64,
    closed_by: &'a str,
}

struct Progress {
    marked: usize,
    batches: usize,
}

/// Flips `ids` to `EM_CONTROLE` chunk by chunk, starting from `already`
/// observations marked. On failure returns the error with the progress made
/// before it.
fn mark_in_chunks(
    store: &mut dyn DocumentStore,
    stamp: &Stamp,
    ids: &[String],
    already: usize,
) -> Result<Progress, (StoreError, Progress)> {
    let mut progress = Progress {
        marked: 0,
        batches: 0,
    };
    for chunk in ids.chunks(CLOSE_CHUNK) {
        let mut batch = WriteBatch::new();
        for id in chunk {
            batch.update(
                FOS,
                id,
                fields! {
                    "statusControle" => ControlStatus::EmControle.as_str(),
                    "entrouEmControle" => true,
                    "controleId" => stamp.control_id,
                    "controleFechadoAt" => stamp.closed_at,
                    "controleFechadoPor" => stamp.closed_by,
                },
            );
        }
        let marked_after = already + progress.marked + chunk.len();
        batch.update(
            CONTROLS,
            stamp.control_id,
            fields! {"fechamento.marcados" => marked_after},
        );
        if let Err(e) = store.commit(batch) {
            return Err((e, progress));
        }
        progress.marked += chunk.len();
        progress.batches += 1;
        tracing::debug!(control = stamp.control_id, marked = marked_after, "chunk committed");
    }
    Ok(progress)
}

fn finish_job(store: &mut dyn DocumentStore, control_id: &str) -> Result<(), StoreError> {
    store.update(
        CONTROLS,
        control_id,
        fields! {"fechamento.status" => "CONCLUIDO"},
    )
}

fn refuse_if_unfinished(store: &dyn DocumentStore) -> anyhow::Result<()> {
    if let Some(open) = load_controls(store)?
        .into_iter()
        .find(|c| c.doc.job.status == JobStatus::EmAndamento)
    {
        return Err(AppError::ControlIncomplete(open.id).into());
    }
    Ok(())
}

fn closer_label(session: &Session) -> String {
    match (session.profile(), session.user()) {
        (Some(p), _) => p.display_label(),
        (None, Some(u)) if !u.email.trim().is_empty() => u.email.trim().to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Files every judged-pending observation into a new control.
pub fn close(
    store: &mut dyn DocumentStore,
    session: &Session,
    now: DateTime<Local>,
    out_dir: &Path,
) -> anyhow::Result<CloseReport> {
    session.require_admin(store)?;
    refuse_if_unfinished(store)?;

    let pending = list_pending(store)?;
    if pending.is_empty() {
        return Err(
            AppError::Validation("no judged observations pending control".to_string()).into(),
        );
    }

    let id = control_id(&now);
    if fetch::<DisciplinaryControl>(store, CONTROLS, &id)
        .map_err(AppError::load("reading control"))?
        .is_some()
    {
        return Err(AppError::Validation(format!(
            "control {} already exists; try again in a second",
            id
        ))
        .into());
    }

    let title = control_title(&now);
    let created_by = closer_label(session);
    let lines: Vec<ControlLine> = pending.iter().map(|fo| snapshot_line(&fo.doc)).collect();
    let fo_ids: Vec<String> = pending.iter().map(|fo| fo.id.clone()).collect();
    let control = DisciplinaryControl {
        control_id: id.clone(),
        title: title.clone(),
        file_name: format!("{}.pdf", id),
        created_by: created_by.clone(),
        total_fos: lines.len(),
        created_at: now.timestamp_millis(),
        lines,
        fo_ids,
        job: ClosingJob {
            status: JobStatus::EmAndamento,
            marked: 0,
        },
    };

    let bytes = render_control(&control.title, &stamp(&now), &control.lines)
        .context("rendering control pdf")?;
    let pdf_path = write_pdf(out_dir, &control.file_name, &bytes)?;

    let mut batch = WriteBatch::new();
    batch
        .set(CONTROLS, &id, &control)
        .map_err(AppError::save("encoding control"))?;
    store
        .commit(batch)
        .map_err(AppError::save("saving control"))?;

    let stamp = Stamp {
        control_id: &id,
        closed_at: now.timestamp_millis(),
        closed_by: &created_by,
    };
    let progress = match mark_in_chunks(store, &stamp, &control.fo_ids, 0) {
        Ok(p) => p,
        Err((source, progress)) => {
            tracing::warn!(
                control = %id,
                marked = progress.marked,
                total = control.total_fos,
                "control partially closed"
            );
            audit(
                "control_close_partial",
                serde_json::json!({"controleId": id, "marcados": progress.marked, "totalFos": control.total_fos}),
            );
            return Err(AppError::PartialClose {
                control_id: id,
                marked: progress.marked,
                total: control.total_fos,
                source,
            }
            .into());
        }
    };
    finish_job(store, &id).map_err(|source| AppError::PartialClose {
        control_id: id.clone(),
        marked: progress.marked,
        total: control.total_fos,
        source,
    })?;

    tracing::info!(control = %id, total = control.total_fos, batches = progress.batches, "control closed");
    audit(
        "control_close",
        serde_json::json!({"controleId": id, "totalFos": control.total_fos, "createdBy": created_by}),
    );
    Ok(CloseReport {
        control_id: id,
        title,
        file_name: control.file_name,
        pdf_path: pdf_path.to_string_lossy().to_string(),
        total_fos: control.total_fos,
        batches: progress.batches,
        marked: progress.marked,
    })
}

/// Marks whatever a failed close left behind and completes the job.
pub fn resume(
    store: &mut dyn DocumentStore,
    session: &Session,
    control_id: &str,
) -> anyhow::Result<ResumeReport> {
    session.require_admin(store)?;
    let control = load_control(store, control_id)?;

    let mut remaining = Vec::new();
    for fo_id in &control.fo_ids {
        match fetch::<Observation>(store, FOS, fo_id).map_err(AppError::load("reading observation"))? {
            Some(fo) if fo.doc.effective_status().can_advance_to(ControlStatus::EmControle) => {
                remaining.push(fo_id.clone())
            }
            Some(_) => {}
            None => tracing::warn!(control = control_id, fo = %fo_id, "absorbed observation is missing"),
        }
    }
    let already = control.fo_ids.len() - remaining.len();

    let stamp = Stamp {
        control_id,
        closed_at: now_ms(),
        closed_by: &control.created_by,
    };
    let progress = mark_in_chunks(store, &stamp, &remaining, already).map_err(
        |(source, progress)| AppError::PartialClose {
            control_id: control_id.to_string(),
            marked: already + progress.marked,
            total: control.total_fos,
            source,
        },
    )?;
    if control.job.status != JobStatus::Concluido {
        finish_job(store, control_id).map_err(AppError::save("completing control job"))?;
    }

    tracing::info!(control = control_id, marked = progress.marked, "control resumed");
    audit(
        "control_resume",
        serde_json::json!({"controleId": control_id, "marcados": progress.marked}),
    );
    Ok(ResumeReport {
        control_id: control_id.to_string(),
        marked_now: progress.marked,
        marked_total: already + progress.marked,
        batches: progress.batches,
    })
}

pub fn list(store: &dyn DocumentStore) -> anyhow::Result<Vec<ControlSummary>> {
    Ok(load_controls(store)?
        .into_iter()
        .map(|c| ControlSummary {
            control_id: c.doc.control_id,
            title: c.doc.title,
            file_name: c.doc.file_name,
            created_by: c.doc.created_by,
            total_fos: c.doc.total_fos,
            created_at: c.doc.created_at,
            job_status: c.doc.job.status,
            marked: c.doc.job.marked,
        })
        .collect())
}

/// Re-renders a control's PDF from its stored snapshot.
pub fn download(
    store: &dyn DocumentStore,
    session: &Session,
    control_id: &str,
    now: DateTime<Local>,
    out_dir: &Path,
) -> anyhow::Result<PdfReport> {
    session.require_admin(store)?;
    let control = load_control(store, control_id)?;
    if control.lines.is_empty() {
        return Err(AppError::Validation(format!(
            "control {} has no line items to render",
            control_id
        ))
        .into());
    }
    let bytes = render_control(&control.title, &stamp(&now), &control.lines)
        .context("rendering control pdf")?;
    let path = write_pdf(out_dir, &control.file_name, &bytes)?;
    tracing::info!(control = control_id, path = %path.display(), "control pdf written");
    Ok(PdfReport {
        control_id: control.control_id,
        file_name: control.file_name,
        pdf_path: path.to_string_lossy().to_string(),
        lines: control.lines.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Role;
    use crate::domain::constants::USERS;
    use crate::domain::models::{FoKind, SessionFile, UserProfile};
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn profile(role: Role) -> UserProfile {
        UserProfile {
            email: "adm@unidade.mil.br".to_string(),
            rank: "Capitão".to_string(),
            war_name: "Moura".to_string(),
            role,
            created_at: 1,
        }
    }

    fn session() -> Session {
        Session::signed_in(SessionFile {
            uid: "adm".to_string(),
            email: "adm@unidade.mil.br".to_string(),
            profile: Some(profile(Role::Admin)),
        })
    }

    fn judged(i: usize) -> Observation {
        Observation {
            kind: FoKind::Negativo,
            description: format!("Falta {}", i),
            candidate_id: format!("c{}", i % 7),
            candidate_name: format!("Candidato {}", i % 7),
            candidate_name_lower: format!("candidato {}", i % 7),
            candidate_kind: "cfg".to_string(),
            issued_by: "1º Tenente Araújo".to_string(),
            issued_by_uid: "u1".to_string(),
            punishment: "Hora do pato".to_string(),
            judged: true,
            judged_by: "Capitão Moura".to_string(),
            judged_at: Some(5),
            created_at: i as i64,
            control_status: Some(ControlStatus::NaoJulgado),
            in_control: false,
            control_id: None,
            control_closed_at: None,
            control_closed_by: None,
        }
    }

    fn seeded(judged_count: usize, role: Role) -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set(USERS, "adm", &profile(role)).expect("encode");
        store.commit(batch).expect("commit");
        let ids: Vec<usize> = (0..judged_count).collect();
        for chunk in ids.chunks(400) {
            let mut batch = WriteBatch::new();
            for i in chunk {
                batch.set(FOS, &format!("fo{:04}", i), &judged(*i)).expect("encode");
            }
            store.commit(batch).expect("commit");
        }
        let mut unjudged = judged(9999);
        unjudged.judged = false;
        unjudged.punishment.clear();
        store.add(FOS, crate::store::encode(&unjudged).expect("encode")).expect("add");
        store
    }

    fn when() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 3, 7, 18, 4, 5)
            .single()
            .expect("valid local time")
    }

    fn statuses(store: &MemoryStore) -> (usize, usize) {
        let all = fetch_all::<Observation>(store, FOS, &Query::new()).expect("fos");
        let in_control = all
            .iter()
            .filter(|f| f.doc.effective_status() == ControlStatus::EmControle)
            .count();
        let pending = all
            .iter()
            .filter(|f| f.doc.effective_status() == ControlStatus::JulgadoPendenteControle)
            .count();
        (in_control, pending)
    }

    #[test]
    fn ids_and_titles_follow_local_time() {
        assert_eq!(control_id(&when()), "CD-20260307-180405");
        assert_eq!(control_title(&when()), "Controle disciplinar - Dia 07/03/2026");
    }

    #[test]
    fn closing_absorbs_every_pending_observation() {
        let mut store = seeded(12, Role::Admin);
        let out = TempDir::new().expect("tmp");
        let report = close(&mut store, &session(), when(), out.path()).expect("close");
        assert_eq!(report.total_fos, 12);
        assert_eq!(report.batches, 1);
        assert!(out.path().join("CD-20260307-180405.pdf").exists());

        let control = load_control(&store, &report.control_id).expect("control");
        assert_eq!(control.lines.len(), 12);
        assert_eq!(control.job.status, JobStatus::Concluido);
        assert_eq!(control.job.marked, 12);
        assert_eq!(control.created_by, "Capitão Moura");

        let absorbed = fetch_all::<Observation>(&store, FOS, &Query::new().where_eq("controleId", report.control_id.as_str()))
            .expect("fos");
        assert_eq!(absorbed.len(), 12);
        assert!(absorbed.iter().all(|f| f.doc.in_control
            && f.doc.effective_status() == ControlStatus::EmControle
            && f.doc.control_closed_by.as_deref() == Some("Capitão Moura")));
        assert!(list_pending(&store).expect("pending").is_empty());
    }

    #[test]
    fn observations_without_timestamp_are_still_filed() {
        let mut store = seeded(2, Role::Admin);
        let mut legacy = crate::store::encode(&judged(7)).expect("encode");
        if let Some(doc) = legacy.as_object_mut() {
            doc.remove("createdAt");
        }
        let mut batch = WriteBatch::new();
        batch.set(FOS, "legacy", &legacy).expect("encode");
        store.commit(batch).expect("commit");

        let pending = list_pending(&store).expect("pending");
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[2].id, "legacy");

        let out = TempDir::new().expect("tmp");
        let report = close(&mut store, &session(), when(), out.path()).expect("close");
        assert_eq!(report.total_fos, 3);
        assert_eq!(statuses(&store), (3, 0));
    }

    #[test]
    fn snapshot_is_not_touched_by_later_edits() {
        let mut store = seeded(2, Role::Admin);
        let out = TempDir::new().expect("tmp");
        let report = close(&mut store, &session(), when(), out.path()).expect("close");
        store
            .update(FOS, "fo0000", fields! {"punicao" => "Outra"})
            .expect("edit");
        let control = load_control(&store, &report.control_id).expect("control");
        assert!(control.lines.iter().all(|l| l.punishment == "Hora do pato"));
    }

    #[test]
    fn thousand_observations_close_in_three_chunks_and_resume_after_failure() {
        let mut store = seeded(1000, Role::Admin);
        let before = store.committed_sizes.len();
        // control doc, then chunks of 450, 450 and 100; the last one fails
        store.fail_on_attempt = Some(store.attempts() + 4);
        let out = TempDir::new().expect("tmp");

        let err = close(&mut store, &session(), when(), out.path()).expect_err("third chunk fails");
        assert_eq!(crate::error::error_code(&err), "PARTIAL_CLOSE");
        assert_eq!(&store.committed_sizes[before..], &[1, 451, 451]);
        assert_eq!(statuses(&store), (900, 100));

        let control = load_control(&store, "CD-20260307-180405").expect("control");
        assert_eq!(control.job.status, JobStatus::EmAndamento);
        assert_eq!(control.job.marked, 900);

        let again = close(&mut store, &session(), when(), out.path()).expect_err("blocked");
        assert_eq!(crate::error::error_code(&again), "CONTROL_INCOMPLETE");

        store.fail_on_attempt = None;
        let resumed = resume(&mut store, &session(), "CD-20260307-180405").expect("resume");
        assert_eq!(resumed.marked_now, 100);
        assert_eq!(resumed.marked_total, 1000);
        assert_eq!(resumed.batches, 1);
        assert_eq!(statuses(&store), (1000, 0));

        let control = load_control(&store, "CD-20260307-180405").expect("control");
        assert_eq!(control.job.status, JobStatus::Concluido);
        assert_eq!(control.job.marked, 1000);
    }

    #[test]
    fn closing_requires_admin_and_pending_work() {
        let mut store = seeded(3, Role::User);
        let out = TempDir::new().expect("tmp");
        let err = close(&mut store, &session(), when(), out.path()).expect_err("not admin");
        assert_eq!(crate::error::error_code(&err), "FORBIDDEN");

        let mut store = seeded(0, Role::Admin);
        let err = close(&mut store, &session(), when(), out.path()).expect_err("nothing pending");
        assert_eq!(crate::error::error_code(&err), "VALIDATION");
        assert!(store.list(CONTROLS).expect("controls").is_empty());
    }

    #[test]
    fn download_rerenders_stored_snapshot() {
        let mut store = seeded(4, Role::Admin);
        let out = TempDir::new().expect("tmp");
        let report = close(&mut store, &session(), when(), out.path()).expect("close");
        let again = TempDir::new().expect("tmp");
        let pdf = download(&store, &session(), &report.control_id, when(), again.path())
            .expect("download");
        assert_eq!(pdf.lines, 4);
        assert!(again.path().join(&report.file_name).exists());

        let summaries = list(&store).expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].job_status, JobStatus::Concluido);

        let err = download(&store, &session(), "CD-00000000-000000", when(), again.path())
            .expect_err("missing");
        assert_eq!(crate::error::error_code(&err), "NOT_FOUND");

        store
            .update(USERS, "adm", fields! {"role" => "user"})
            .expect("demote");
        let err = download(&store, &session(), &report.control_id, when(), again.path())
            .expect_err("not admin");
        assert_eq!(crate::error::error_code(&err), "FORBIDDEN");
    }
}
