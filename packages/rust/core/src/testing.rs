//! Test doubles for the collaborator traits.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use changedoc_shared::{Advisor, ChangeDocError, PageStore, Result};

/// Advisor that replays queued responses and records every prompt.
pub(crate) struct ScriptedAdvisor {
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAdvisor {
    pub(crate) fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for all-success scripts.
    pub(crate) fn replying<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(responses.into_iter().map(|s| Ok(s.into())))
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Advisor for ScriptedAdvisor {
    async fn advise(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChangeDocError::Network("script exhausted".into())))
    }
}

/// In-memory page store with per-page fault injection and call counters.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pages: Mutex<BTreeMap<String, String>>,
    failing_get: HashSet<String>,
    failing_put: HashSet<String>,
    reads: AtomicUsize,
    puts: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub(crate) fn with_pages<I, K, V>(pages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pages: Mutex::new(
                pages
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub(crate) fn failing_get(mut self, page_id: &str) -> Self {
        self.failing_get.insert(page_id.to_string());
        self
    }

    pub(crate) fn failing_put(mut self, page_id: &str) -> Self {
        self.failing_put.insert(page_id.to_string());
        self
    }

    pub(crate) fn page(&self, page_id: &str) -> Option<String> {
        self.pages.lock().unwrap().get(page_id).cloned()
    }

    /// Ids passed to `put`, in call order, including failed writes.
    pub(crate) fn put_attempts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.puts.lock().unwrap().len()
    }
}

impl PageStore for MemoryStore {
    fn list(&self) -> Result<Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.lock().unwrap().keys().cloned().collect())
    }

    fn get(&self, page_id: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_get.contains(page_id) {
            return Err(ChangeDocError::Store(format!("cannot read {page_id}")));
        }
        Ok(self.pages.lock().unwrap().get(page_id).cloned())
    }

    fn put(&self, page_id: &str, content: &str) -> Result<()> {
        self.puts.lock().unwrap().push(page_id.to_string());
        if self.failing_put.contains(page_id) {
            return Err(ChangeDocError::Store(format!("cannot write {page_id}")));
        }
        self.pages
            .lock()
            .unwrap()
            .insert(page_id.to_string(), content.to_string());
        Ok(())
    }
}
