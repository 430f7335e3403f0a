//! In-memory collaborators for tests and demos.
//!
//! - [`MockBackend`] - Entry-list backend with per-operation call counters
//! - [`MockTransport`] - Scripted upload transport recording every request

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::core::backend::{Backend, TransferPlan};
use crate::core::error::{BackendError, UploadError};
use crate::core::upload::{HttpResponse, ProgressFn, TransferRequest, UploadTransport};
use crate::models::Entry;
use crate::utils::path::{is_within, join_path, leaf_name, parent_path, rebase};

// =============================================================================
// Backend
// =============================================================================

/// Backend keeping entries in memory.
#[derive(Debug, Default)]
pub struct MockBackend {
    entries: RefCell<Vec<Entry>>,
    transfers: Cell<usize>,
    creates: Cell<usize>,
    renames: Cell<usize>,
    deletes: Cell<usize>,
    fail_next: RefCell<Option<BackendError>>,
}

impl MockBackend {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries: RefCell::new(entries),
            ..Default::default()
        }
    }

    /// Make the next operation fail with `error`.
    pub fn fail_next(&self, error: BackendError) {
        *self.fail_next.borrow_mut() = Some(error);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.borrow().clone()
    }

    pub fn transfer_calls(&self) -> usize {
        self.transfers.get()
    }

    pub fn create_calls(&self) -> usize {
        self.creates.get()
    }

    pub fn rename_calls(&self) -> usize {
        self.renames.get()
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.get()
    }

    fn check_failure(&self) -> Result<(), BackendError> {
        match self.fail_next.borrow_mut().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.entries.borrow().iter().any(|e| e.path == path)
    }

    /// Copies of the subtree at `from`, rebased under `to`.
    fn rebased_subtree(&self, from: &str, to: &str) -> Vec<Entry> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|entry| {
                let path = rebase(&entry.path, from, to)?;
                let mut moved = entry.clone();
                if entry.path == from {
                    moved.name = leaf_name(to).to_string();
                }
                moved.path = path;
                moved.is_editing = false;
                Some(moved)
            })
            .collect()
    }

    fn remove_subtree(&self, path: &str) -> Vec<Entry> {
        let mut entries = self.entries.borrow_mut();
        let (removed, kept): (Vec<Entry>, Vec<Entry>) =
            entries.drain(..).partition(|e| is_within(&e.path, path));
        *entries = kept;
        removed
    }
}

impl Backend for MockBackend {
    async fn list(&self) -> Result<Vec<Entry>, BackendError> {
        self.check_failure()?;
        Ok(self.entries())
    }

    async fn create_folder(&self, name: &str, parent_path: &str) -> Result<Entry, BackendError> {
        self.creates.set(self.creates.get() + 1);
        self.check_failure()?;
        let folder = Entry::folder(parent_path, name);
        if self.exists(&folder.path) {
            return Err(BackendError::Conflict(name.to_string()));
        }
        self.entries.borrow_mut().push(folder.clone());
        Ok(folder)
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<Vec<Entry>, BackendError> {
        self.renames.set(self.renames.get() + 1);
        self.check_failure()?;
        if !self.exists(path) {
            return Err(BackendError::NotFound(path.to_string()));
        }
        let target = join_path(parent_path(path), new_name);
        if self.exists(&target) {
            return Err(BackendError::Conflict(new_name.to_string()));
        }

        let renamed = self.rebased_subtree(path, &target);
        self.remove_subtree(path);
        self.entries.borrow_mut().extend(renamed.iter().cloned());
        Ok(renamed)
    }

    async fn delete(&self, paths: &[String]) -> Result<Vec<Entry>, BackendError> {
        self.deletes.set(self.deletes.get() + 1);
        self.check_failure()?;
        Ok(paths
            .iter()
            .flat_map(|path| self.remove_subtree(path))
            .collect())
    }

    async fn transfer(&self, plan: &TransferPlan) -> Result<Vec<Entry>, BackendError> {
        self.transfers.set(self.transfers.get() + 1);
        self.check_failure()?;

        let mut created = Vec::new();
        for item in &plan.items {
            if !self.exists(&item.source_path) {
                return Err(BackendError::NotFound(item.source_path.clone()));
            }
            let target = join_path(&plan.destination_path, &item.target_name);
            let copies = self.rebased_subtree(&item.source_path, &target);
            if plan.is_moving {
                self.remove_subtree(&item.source_path);
            }
            self.entries.borrow_mut().extend(copies.iter().cloned());
            created.extend(copies);
        }
        Ok(created)
    }
}

// =============================================================================
// Transport
// =============================================================================

#[derive(Clone, Debug)]
enum Reply {
    Respond(HttpResponse),
    /// Never resolves; only an abort ends the request
    Pending,
    Fail(UploadError),
}

#[derive(Debug, Default)]
struct TransportLog {
    json_replies: VecDeque<Reply>,
    send_replies: VecDeque<Reply>,
    progress: Vec<(u64, u64)>,
    json_requests: Vec<(String, Value)>,
    sent: Vec<TransferRequest>,
}

/// Upload transport answering from scripted replies.
///
/// Clones share the same script and request log. Unscripted requests
/// succeed with an empty 200 response.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    log: Rc<RefCell<TransportLog>>,
}

fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        status_text: (if (200..300).contains(&status) { "OK" } else { "Error" }).to_string(),
        body: body.to_string(),
    }
}

async fn resolve(reply: Option<Reply>) -> Result<HttpResponse, UploadError> {
    match reply {
        None => Ok(response(200, "")),
        Some(Reply::Respond(response)) => Ok(response),
        Some(Reply::Fail(error)) => Err(error),
        Some(Reply::Pending) => futures_util::future::pending().await,
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next file transfer's response.
    pub fn respond(self, status: u16, body: &str) -> Self {
        self.push_send(Reply::Respond(response(status, body)))
    }

    /// Script the next file transfer to hang until aborted.
    pub fn pending(self) -> Self {
        self.push_send(Reply::Pending)
    }

    /// Script the next file transfer to fail without a response.
    pub fn fail(self, error: UploadError) -> Self {
        self.push_send(Reply::Fail(error))
    }

    /// Script the next JSON request's response.
    pub fn respond_json(self, status: u16, body: &str) -> Self {
        self.log
            .borrow_mut()
            .json_replies
            .push_back(Reply::Respond(response(status, body)));
        self
    }

    /// Progress reported by every transfer before it resolves.
    pub fn with_progress(self, steps: Vec<(u64, u64)>) -> Self {
        self.log.borrow_mut().progress = steps;
        self
    }

    fn push_send(self, reply: Reply) -> Self {
        self.log.borrow_mut().send_replies.push_back(reply);
        self
    }

    pub fn sent(&self) -> Vec<TransferRequest> {
        self.log.borrow().sent.clone()
    }

    pub fn json_requests(&self) -> Vec<(String, Value)> {
        self.log.borrow().json_requests.clone()
    }
}

impl UploadTransport for MockTransport {
    async fn request_json(&self, url: &str, body: &Value) -> Result<HttpResponse, UploadError> {
        let reply = {
            let mut log = self.log.borrow_mut();
            log.json_requests.push((url.to_string(), body.clone()));
            log.json_replies.pop_front()
        };
        resolve(reply).await
    }

    async fn send(
        &self,
        request: TransferRequest,
        progress: ProgressFn,
    ) -> Result<HttpResponse, UploadError> {
        let (reply, steps) = {
            let mut log = self.log.borrow_mut();
            log.sent.push(request);
            (log.send_replies.pop_front(), log.progress.clone())
        };
        for (loaded, total) in steps {
            progress(loaded, total);
        }
        resolve(reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::TransferItem;

    fn backend() -> MockBackend {
        MockBackend::new(vec![
            Entry::folder("", "a"),
            Entry::file("/a", "x.txt"),
            Entry::folder("", "b"),
        ])
    }

    #[tokio::test]
    async fn test_mock_rename_moves_subtree() {
        let backend = backend();
        let renamed = backend.rename("/a", "c").await.unwrap();
        let paths: Vec<_> = renamed.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/c", "/c/x.txt"]);
        assert_eq!(renamed[0].name, "c");
        assert!(matches!(
            backend.rename("/c", "b").await,
            Err(BackendError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_transfer_copy() {
        let backend = backend();
        let plan = TransferPlan {
            items: vec![TransferItem {
                source_path: "/a".to_string(),
                target_name: "a".to_string(),
            }],
            destination_path: "/b".to_string(),
            is_moving: false,
        };
        let created = backend.transfer(&plan).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(backend.entries().len(), 5);
        assert_eq!(backend.transfer_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_fail_next() {
        let backend = backend();
        backend.fail_next(BackendError::Network("offline".to_string()));
        assert!(backend.list().await.is_err());
        assert_eq!(backend.list().await.unwrap().len(), 3);
    }
}
