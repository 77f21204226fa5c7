use crate::domain::constants::{CANDIDATES, FOS, MAX_SUGGESTIONS};
use crate::domain::models::{
    CandidateTally, FoKind, IssuerTally, Observation, StatsSummary, TieView,
};
use crate::error::AppError;
use crate::services::collate::alpha;
use crate::store::{fetch_all, DocumentStore, Query};
use serde::Serialize;
use std::collections::HashMap;

/// Observations loaded once and aggregated in memory.
pub struct StatsBook {
    fos: Vec<Observation>,
}

impl StatsBook {
    pub fn load(store: &dyn DocumentStore) -> anyhow::Result<Self> {
        let fos = fetch_all::<Observation>(store, FOS, &Query::new())
            .map_err(AppError::load("loading observations"))?
            .into_iter()
            .map(|s| s.doc)
            .collect();
        Ok(Self::from_observations(fos))
    }

    pub fn from_observations(mut fos: Vec<Observation>) -> Self {
        fos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { fos }
    }

    pub fn observation_count(&self) -> usize {
        self.fos.len()
    }

    /// Tallies keyed by lower-cased name, shown with the newest spelling.
    pub fn by_candidate(&self) -> Vec<CandidateTally> {
        let mut order: Vec<String> = Vec::new();
        let mut map: HashMap<String, CandidateTally> = HashMap::new();
        for fo in &self.fos {
            let name = fo.candidate_name.trim();
            if name.is_empty() {
                continue;
            }
            let key = name.to_lowercase();
            let row = map.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                CandidateTally {
                    name: name.to_string(),
                    positive: 0,
                    negative: 0,
                    neutral: 0,
                }
            });
            match fo.kind {
                FoKind::Positivo => row.positive += 1,
                FoKind::Negativo => row.negative += 1,
                FoKind::Neutro => row.neutral += 1,
            }
        }
        let mut rows: Vec<CandidateTally> =
            order.into_iter().filter_map(|k| map.remove(&k)).collect();
        rows.sort_by(|a, b| alpha(&a.name, &b.name));
        rows
    }

    /// Counts for one candidate; zeros when nobody has observed them.
    pub fn candidate(&self, name: &str) -> CandidateTally {
        let key = name.trim().to_lowercase();
        self.by_candidate()
            .into_iter()
            .find(|row| row.name.to_lowercase() == key)
            .unwrap_or_else(|| CandidateTally {
                name: name.trim().to_string(),
                positive: 0,
                negative: 0,
                neutral: 0,
            })
    }

    pub fn candidate_names(&self) -> Vec<String> {
        self.by_candidate().into_iter().map(|row| row.name).collect()
    }

    pub fn suggest(&self, query: &str) -> Vec<String> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return vec![];
        }
        self.candidate_names()
            .into_iter()
            .filter(|n| n.to_lowercase().contains(&q))
            .take(MAX_SUGGESTIONS)
            .collect()
    }

    pub fn most_sanctioned(&self) -> TieSet<CandidateTally> {
        let rows = self.by_candidate();
        let max = rows.iter().map(|r| r.negative).max().unwrap_or(0);
        if max == 0 {
            return TieSet::new(vec![]);
        }
        TieSet::new(rows.into_iter().filter(|r| r.negative == max).collect())
    }

    pub fn top_issuers(&self) -> TieSet<IssuerTally> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for fo in self.fos.iter().filter(|fo| fo.kind == FoKind::Negativo) {
            let issuer = fo.issued_by.trim();
            if issuer.is_empty() {
                continue;
            }
            *counts.entry(issuer.to_string()).or_default() += 1;
        }
        let max = counts.values().copied().max().unwrap_or(0);
        if max == 0 {
            return TieSet::new(vec![]);
        }
        let mut items: Vec<IssuerTally> = counts
            .into_iter()
            .filter(|(_, n)| *n == max)
            .map(|(issued_by, negative)| IssuerTally {
                issued_by,
                negative,
            })
            .collect();
        items.sort_by(|a, b| alpha(&a.issued_by, &b.issued_by));
        TieSet::new(items)
    }

    pub fn summary(&self, store: &dyn DocumentStore) -> anyhow::Result<StatsSummary> {
        let candidates = store
            .list(CANDIDATES)
            .map_err(AppError::load("loading candidates"))?
            .len();
        Ok(StatsSummary {
            observations: self.observation_count(),
            candidates,
            most_sanctioned: self.most_sanctioned().into_items(),
            top_issuers: self.top_issuers().into_items(),
        })
    }
}

/// Entries sharing the top count. Indexes wrap around in both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct TieSet<T> {
    items: Vec<T>,
}

impl<T: Clone + Serialize> TieSet<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_tie(&self) -> bool {
        self.items.len() > 1
    }

    fn wrap(&self, index: i64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        Some(index.rem_euclid(self.items.len() as i64) as usize)
    }

    pub fn at(&self, index: i64) -> Option<&T> {
        self.wrap(index).and_then(|i| self.items.get(i))
    }

    pub fn next(&self, index: usize) -> usize {
        self.wrap(index as i64 + 1).unwrap_or(0)
    }

    pub fn prev(&self, index: usize) -> usize {
        self.wrap(index as i64 - 1).unwrap_or(0)
    }

    pub fn view(&self, index: i64) -> TieView<T> {
        let wrapped = self.wrap(index).unwrap_or(0);
        TieView {
            total: self.items.len(),
            index: wrapped,
            next_index: self.next(wrapped),
            prev_index: self.prev(wrapped),
            current: self.at(index).cloned(),
            tied: self.is_tie(),
            items: self.items.clone(),
        }
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// The three statistics panels, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatView {
    Counter,
    MostSanctioned,
    TopIssuer,
}

impl StatView {
    const ALL: [StatView; 3] = [StatView::Counter, StatView::MostSanctioned, StatView::TopIssuer];

    fn position(self) -> usize {
        match self {
            StatView::Counter => 0,
            StatView::MostSanctioned => 1,
            StatView::TopIssuer => 2,
        }
    }

    pub fn next(self) -> StatView {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> StatView {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatView::Counter => "counter",
            StatView::MostSanctioned => "most-sanctioned",
            StatView::TopIssuer => "top-issuer",
        }
    }
}
