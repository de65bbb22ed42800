//! In-memory stand-in for the policy manager (no I/O)

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::nsx::{ApiError, PolicyApi};

/// A call seen by the mock, in order
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub overwrite: bool,
}

/// Documents keyed by path. Later list pages live under `path?cursor=X`.
///
/// PUT replaces the stored document and PATCH merges top-level keys. Both
/// check `_revision` the way the manager does and bump it on success.
#[derive(Default)]
pub struct MockPolicyApi {
    documents: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashSet<String>>,
    mutation_failures: Mutex<HashMap<String, u16>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockPolicyApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, path: &str, document: Value) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(path.to_string(), document);
        self
    }

    /// Make every call to `path` fail with a 500
    pub fn with_failure(self, path: &str) -> Self {
        self.failures.lock().unwrap().insert(path.to_string());
        self
    }

    /// Make PUT/PATCH on `path` fail with `status` while reads still succeed
    pub fn with_mutation_failure(self, path: &str, status: u16) -> Self {
        self.mutation_failures
            .lock()
            .unwrap()
            .insert(path.to_string(), status);
        self
    }

    pub fn document(&self, path: &str) -> Option<Value> {
        self.documents.lock().unwrap().get(path).cloned()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method != Method::GET)
            .collect()
    }

    fn record(&self, method: Method, path: &str, body: Option<&Value>, overwrite: bool) {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
            overwrite,
        });
    }

    fn error(method: &Method, path: &str, status: u16, body: &str) -> ApiError {
        ApiError::Status {
            status,
            method: method.to_string(),
            url: path.to_string(),
            body: body.to_string(),
        }
    }
}

fn revision(doc: &Value) -> Option<i64> {
    doc.get("_revision").and_then(Value::as_i64)
}

#[async_trait]
impl PolicyApi for MockPolicyApi {
    async fn get_page(&self, path: &str, cursor: Option<&str>) -> Result<Value, ApiError> {
        let key = match cursor {
            Some(cursor) => format!("{}?cursor={}", path, cursor),
            None => path.to_string(),
        };
        self.record(Method::GET, &key, None, false);

        if self.failures.lock().unwrap().contains(path) {
            return Err(Self::error(&Method::GET, &key, 500, "injected failure"));
        }
        self.documents
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::error(&Method::GET, &key, 404, "not found"))
    }

    async fn mutate(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        overwrite: bool,
    ) -> Result<Value, ApiError> {
        self.record(method.clone(), path, Some(body), overwrite);

        if self.failures.lock().unwrap().contains(path) {
            return Err(Self::error(&method, path, 500, "injected failure"));
        }
        if let Some(status) = self.mutation_failures.lock().unwrap().get(path) {
            return Err(Self::error(&method, path, *status, "injected failure"));
        }

        let mut documents = self.documents.lock().unwrap();
        let current = documents.get(path).cloned();

        if let (Some(current), Some(sent)) = (current.as_ref().and_then(revision), revision(body))
        {
            if current != sent {
                return Err(Self::error(&method, path, 412, "revision mismatch"));
            }
        }

        let mut updated = if method == Method::PATCH {
            let mut merged = current.clone().unwrap_or(Value::Object(Default::default()));
            if let (Value::Object(target), Value::Object(patch)) = (&mut merged, body) {
                for (k, v) in patch {
                    target.insert(k.clone(), v.clone());
                }
            }
            merged
        } else {
            body.clone()
        };

        let next = current.as_ref().and_then(revision).unwrap_or(0) + 1;
        if let Value::Object(map) = &mut updated {
            map.insert("_revision".to_string(), Value::from(next));
        }
        documents.insert(path.to_string(), updated.clone());
        Ok(updated)
    }
}
