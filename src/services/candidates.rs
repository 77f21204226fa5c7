use crate::domain::constants::{
    CANDIDATES, DEFAULT_CANDIDATE_KIND, IMPORT_CHUNK, MAX_SUGGESTIONS,
};
use crate::domain::models::{Candidate, CandidateItem, ImportReport, Stored};
use crate::error::AppError;
use crate::services::collate::alpha;
use crate::services::storage::now_ms;
use crate::store::{fetch_all, new_id, DocumentStore, Query, WriteBatch};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Nome", default)]
    name: Option<String>,
    #[serde(rename = "Tipo", default)]
    kind: Option<String>,
    #[serde(rename = "Ativo", default)]
    active: Option<String>,
}

/// Trims and collapses inner whitespace.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Anything other than an explicit `false` counts as active.
pub fn parse_active(raw: Option<&str>) -> bool {
    raw.map(|v| v.trim().to_lowercase() != "false")
        .unwrap_or(true)
}

fn normalize_rows(rows: Vec<CsvRow>) -> Vec<Candidate> {
    let created_at = now_ms();
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Candidate> = HashMap::new();
    for row in rows {
        let name = normalize_name(row.name.as_deref().unwrap_or(""));
        if name.is_empty() {
            continue;
        }
        let kind = normalize_name(row.kind.as_deref().unwrap_or(""));
        let kind = if kind.is_empty() {
            DEFAULT_CANDIDATE_KIND.to_string()
        } else {
            kind
        };
        let key = name.to_lowercase();
        if !by_key.contains_key(&key) {
            order.push(key.clone());
        }
        by_key.insert(
            key.clone(),
            Candidate {
                name,
                kind,
                active: parse_active(row.active.as_deref()),
                name_lower: key,
                created_at,
            },
        );
    }
    order
        .into_iter()
        .filter_map(|k| by_key.remove(&k))
        .collect()
}

pub fn import_csv(store: &mut dyn DocumentStore, csv_path: &Path) -> anyhow::Result<ImportReport> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("opening {}", csv_path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        rows.push(row.with_context(|| format!("reading {}", csv_path.display()))?);
    }
    let total_rows = rows.len();
    let candidates = normalize_rows(rows);
    let (inserted, batches) = commit_candidates(store, &candidates)?;
    tracing::info!(rows = total_rows, inserted, batches, "candidates imported");
    Ok(ImportReport {
        rows: total_rows,
        unique: candidates.len(),
        inserted,
        batches,
    })
}

fn commit_candidates(
    store: &mut dyn DocumentStore,
    candidates: &[Candidate],
) -> anyhow::Result<(usize, usize)> {
    let mut inserted = 0usize;
    let mut batches = 0usize;
    for chunk in candidates.chunks(IMPORT_CHUNK) {
        let mut batch = WriteBatch::new();
        for c in chunk {
            batch
                .set(CANDIDATES, &new_id(), c)
                .map_err(AppError::save("encoding candidate"))?;
        }
        store.commit(batch).map_err(AppError::save(format!(
            "importing candidates ({} committed before failure)",
            inserted
        )))?;
        inserted += chunk.len();
        batches += 1;
        tracing::debug!(committed = inserted, "candidate batch committed");
    }
    Ok((inserted, batches))
}

/// Candidates with a usable name, in alphabetical order.
pub fn load_candidates(store: &dyn DocumentStore) -> anyhow::Result<Vec<Stored<Candidate>>> {
    let mut list: Vec<Stored<Candidate>> = fetch_all::<Candidate>(store, CANDIDATES, &Query::new())
        .map_err(AppError::load("loading candidates"))?
        .into_iter()
        .filter(|c| !c.doc.name.trim().is_empty())
        .map(|mut c| {
            c.doc.name_lower = c.doc.name.to_lowercase();
            c
        })
        .collect();
    list.sort_by(|a, b| alpha(&a.doc.name, &b.doc.name));
    Ok(list)
}

pub fn suggest<'a>(candidates: &'a [Stored<Candidate>], query: &str) -> Vec<&'a Stored<Candidate>> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return vec![];
    }
    candidates
        .iter()
        .filter(|c| c.doc.name_lower.contains(&q))
        .take(MAX_SUGGESTIONS)
        .collect()
}

pub fn to_item(c: &Stored<Candidate>) -> CandidateItem {
    CandidateItem {
        id: c.id.clone(),
        name: c.doc.name.clone(),
        kind: c.doc.kind.clone(),
        active: c.doc.active,
    }
}
