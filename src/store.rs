//! Document store: named collections of JSON documents keyed by id.
//!
//! Reads return raw `serde_json::Value`s; the typed helpers at the bottom decode
//! them into domain structs. Every write goes through a [`WriteBatch`], which
//! commits all-or-nothing and holds at most [`MAX_BATCH_WRITES`] operations.

use crate::domain::constants::MAX_BATCH_WRITES;
use crate::domain::models::Stored;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub type Fields = Map<String, Value>;
type Collections = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file {path} is malformed: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },
    #[error("cannot encode document: {0}")]
    Encode(serde_json::Error),
    #[error("cannot decode {collection}/{id}: {source}")]
    Decode {
        collection: String,
        id: String,
        source: serde_json::Error,
    },
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("document {collection}/{id} is not an object")]
    NotAnObject { collection: String, id: String },
    #[error("batch holds {writes} writes; the limit is {limit}")]
    BatchTooLarge { writes: usize, limit: usize },
    #[cfg(test)]
    #[error("injected commit failure")]
    Injected,
}

#[derive(Debug, Clone)]
pub enum Write {
    Set {
        collection: String,
        id: String,
        doc: Value,
    },
    /// Merges fields into an existing document. Dotted keys address nested
    /// objects (`fechamento.marcados`).
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
}

#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(
        &mut self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), StoreError> {
        self.writes.push(Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            doc: encode(doc)?,
        });
        Ok(())
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Fields) {
        self.writes.push(Write::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Equality filters plus an optional order-by. Documents missing the order-by
/// field are left out of the result.
#[derive(Debug, Default, Clone)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn apply(&self, docs: Vec<(String, Value)>) -> Vec<(String, Value)> {
        let mut out: Vec<(String, Value)> = docs
            .into_iter()
            .filter(|(_, doc)| {
                self.filters
                    .iter()
                    .all(|(field, want)| doc.get(field) == Some(want))
            })
            .collect();
        if let Some((field, direction)) = &self.order_by {
            out.retain(|(_, doc)| doc.get(field).is_some());
            out.sort_by(|(_, a), (_, b)| {
                let ord = compare_values(&a[field.as_str()], &b[field.as_str()]);
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        out
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

pub trait DocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Every document of a collection, in id order.
    fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;

    /// Applies every write or none of them.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError>;

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(query.apply(self.list(collection)?))
    }

    /// Stores `doc` under a fresh id and returns it.
    fn add(&mut self, collection: &str, doc: Value) -> Result<String, StoreError> {
        let id = new_id();
        let mut batch = WriteBatch::new();
        batch.writes.push(Write::Set {
            collection: collection.to_string(),
            id: id.clone(),
            doc,
        });
        self.commit(batch)?;
        Ok(id)
    }

    fn update(&mut self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch)
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn apply_batch(data: &Collections, batch: &WriteBatch) -> Result<Collections, StoreError> {
    if batch.len() > MAX_BATCH_WRITES {
        return Err(StoreError::BatchTooLarge {
            writes: batch.len(),
            limit: MAX_BATCH_WRITES,
        });
    }
    let mut next = data.clone();
    for write in batch.writes() {
        match write {
            Write::Set {
                collection,
                id,
                doc,
            } => {
                next.entry(collection.clone())
                    .or_default()
                    .insert(id.clone(), doc.clone());
            }
            Write::Update {
                collection,
                id,
                fields,
            } => {
                let doc = next
                    .get_mut(collection)
                    .and_then(|c| c.get_mut(id))
                    .ok_or_else(|| StoreError::NotFound {
                        collection: collection.clone(),
                        id: id.clone(),
                    })?;
                merge_fields(doc, fields).ok_or_else(|| StoreError::NotAnObject {
                    collection: collection.clone(),
                    id: id.clone(),
                })?;
            }
        }
    }
    Ok(next)
}

fn merge_fields(doc: &mut Value, fields: &Fields) -> Option<()> {
    let target = doc.as_object_mut()?;
    for (key, value) in fields {
        let parts: Vec<&str> = key.split('.').collect();
        set_path(target, &parts, value.clone());
    }
    Some(())
}

fn set_path(obj: &mut Fields, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [last] => {
            obj.insert(last.to_string(), value);
        }
        [head, rest @ ..] => {
            let child = obj
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Some(next) = child.as_object_mut() {
                set_path(next, rest, value);
            }
        }
    }
}

/// All collections in one JSON file, rewritten atomically on every commit.
///
/// Commits hold an exclusive `flock` on `documents.lock` from the read to the
/// rename, so concurrent invocations serialize instead of overwriting each
/// other. Reads take no lock: the rename makes every version whole.
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join("documents.json"),
            lock_path: data_dir.join("documents.lock"),
        })
    }

    /// Blocks until this process is the only committer. Dropping the file
    /// releases the lock.
    fn lock(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        FileExt::lock_exclusive(&file)?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Collections, StoreError> {
        if !self.path.exists() {
            return Ok(Collections::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Collections::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.to_string_lossy().to_string(),
            source,
        })
    }

    fn persist(&self, data: &Collections) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(data).map_err(StoreError::Encode)?;
        write_file_atomic(&self.path, &payload)
    }
}

impl DocumentStore for JsonFileStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .load()?
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(self
            .load()?
            .remove(collection)
            .map(|c| c.into_iter().collect())
            .unwrap_or_default())
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let _guard = self.lock()?;
        let data = self.load()?;
        let next = apply_batch(&data, &batch)?;
        self.persist(&next)?;
        tracing::debug!(writes = batch.len(), path = %self.path.display(), "batch committed");
        Ok(())
    }
}

#[cfg(unix)]
fn sync_directory(path: &Path) -> Result<(), StoreError> {
    File::open(path)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    sync_directory(parent)?;
    Ok(())
}

pub fn encode<T: Serialize>(doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(StoreError::Encode)
}

pub fn decode<T: DeserializeOwned>(
    collection: &str,
    id: &str,
    value: Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Decode {
        collection: collection.to_string(),
        id: id.to_string(),
        source,
    })
}

pub fn fetch<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<Stored<T>>, StoreError> {
    match store.get(collection, id)? {
        Some(value) => Ok(Some(Stored {
            id: id.to_string(),
            doc: decode(collection, id, value)?,
        })),
        None => Ok(None),
    }
}

pub fn fetch_all<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    query: &Query,
) -> Result<Vec<Stored<T>>, StoreError> {
    store
        .query(collection, query)?
        .into_iter()
        .map(|(id, value)| {
            let doc = decode(collection, &id, value)?;
            Ok(Stored { id, doc })
        })
        .collect()
}

/// Builds an update field map from `key => value` pairs.
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::store::Fields::new();
        $(map.insert($key.to_string(), serde_json::json!($value));)*
        map
    }};
}

#[cfg(test)]
pub use memory::MemoryStore;


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn update_on_missing_document_rejects_whole_batch() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch
            .set("fos", "a", &json!({"tipo": "negativo"}))
            .expect("encode");
        batch.update("fos", "missing", crate::fields! {"jaJulgado" => true});

        let err = store.commit(batch).expect_err("missing doc must fail");
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.get("fos", "a").expect("get").is_none());
    }

    #[test]
    fn oversized_batch_is_refused() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for i in 0..=MAX_BATCH_WRITES {
            batch
                .set("fos", &i.to_string(), &json!({"n": i}))
                .expect("encode");
        }
        let err = store.commit(batch).expect_err("too large");
        assert!(matches!(err, StoreError::BatchTooLarge { writes: 501, .. }));
        assert!(store.list("fos").expect("list").is_empty());
    }

    #[test]
    fn dotted_update_merges_nested_fields() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch
            .set(
                "controles_disciplinares",
                "CD-1",
                &json!({"fechamento": {"status": "EM_ANDAMENTO", "marcados": 0}}),
            )
            .expect("encode");
        store.commit(batch).expect("commit");

        store
            .update(
                "controles_disciplinares",
                "CD-1",
                crate::fields! {"fechamento.marcados" => 450},
            )
            .expect("update");
        let doc = store
            .get("controles_disciplinares", "CD-1")
            .expect("get")
            .expect("present");
        assert_eq!(doc["fechamento"]["marcados"], 450);
        assert_eq!(doc["fechamento"]["status"], "EM_ANDAMENTO");
    }

    #[test]
    fn query_filters_and_orders_descending() {
        let mut store = MemoryStore::new();
        for (id, created, judged) in [("a", 1, false), ("b", 3, false), ("c", 2, true)] {
            let mut batch = WriteBatch::new();
            batch
                .set("fos", id, &json!({"createdAt": created, "jaJulgado": judged}))
                .expect("encode");
            store.commit(batch).expect("commit");
        }
        let q = Query::new()
            .where_eq("jaJulgado", false)
            .order_by("createdAt", Direction::Desc);
        let ids: Vec<String> = store
            .query("fos", &q)
            .expect("query")
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn json_file_store_persists_across_instances() {
        let tmp = TempDir::new().expect("temp dir");
        let mut store = JsonFileStore::open(tmp.path()).expect("open");
        let id = store
            .add("candidates", json!({"Nome": "Silva", "Tipo": "cfg", "Ativo": true}))
            .expect("add");

        let reopened = JsonFileStore::open(tmp.path()).expect("reopen");
        let doc = reopened
            .get("candidates", &id)
            .expect("get")
            .expect("present");
        assert_eq!(doc["Nome"], "Silva");
        let mut names: Vec<String> = std::fs::read_dir(tmp.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["documents.json", "documents.lock"]);
    }

    #[test]
    fn concurrent_writers_keep_every_commit() {
        let tmp = TempDir::new().expect("temp dir");
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let dir = tmp.path().to_path_buf();
                std::thread::spawn(move || {
                    let mut store = JsonFileStore::open(&dir).expect("open");
                    for i in 0..50 {
                        store
                            .add("fos", json!({"writer": w, "n": i}))
                            .expect("add");
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread");
        }

        let store = JsonFileStore::open(tmp.path()).expect("reopen");
        assert_eq!(store.list("fos").expect("intact file").len(), 200);
    }

    #[test]
    fn json_file_store_reports_corrupt_file() {
        let tmp = TempDir::new().expect("temp dir");
        std::fs::write(tmp.path().join("documents.json"), "{not json").expect("write");
        let store = JsonFileStore::open(tmp.path()).expect("open");
        let err = store.list("fos").expect_err("corrupt");
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
