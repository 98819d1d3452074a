//! Tree state stores
//!
//! Where the state document lives between sessions. The console backend keeps it behind
//! three settings endpoints; tests use the in-memory store.

use super::StateMap;
use crate::error::TreeError;
use crate::service::http::{endpoint, response_error};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Replace the stored document.
    async fn save(&self, state: &StateMap) -> Result<(), TreeError>;

    /// Read the canonical stored document.
    async fn fetch(&self) -> Result<StateMap, TreeError>;

    /// Delete every stored state.
    async fn reset(&self) -> Result<(), TreeError>;
}

pub const SAVE_TREE_STATE_PATH: &str = "/settings/save_tree_state/";
pub const GET_TREE_STATE_PATH: &str = "/settings/get_tree_state/";
pub const RESET_TREE_STATE_PATH: &str = "/settings/reset_tree_state/";

/// Store backed by the console's settings endpoints.
pub struct HttpStateStore {
    client: Client,
    base_url: String,
}

impl HttpStateStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpStateStore {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StateStore for HttpStateStore {
    async fn save(&self, state: &StateMap) -> Result<(), TreeError> {
        let url = endpoint(&self.base_url, SAVE_TREE_STATE_PATH);
        debug!(url = %url, servers = state.len(), "Saving tree state");
        let response = self.client.post(&url).json(state).send().await?;
        if !response.status().is_success() {
            return Err(response_error(response).await);
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<StateMap, TreeError> {
        let url = endpoint(&self.base_url, GET_TREE_STATE_PATH);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(response_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn reset(&self) -> Result<(), TreeError> {
        let url = endpoint(&self.base_url, RESET_TREE_STATE_PATH);
        let response = self.client.delete(&url).send().await?;
        if !response.status().is_success() {
            return Err(response_error(response).await);
        }
        Ok(())
    }
}

/// Store that keeps the document in memory and records every save.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<StateMap>,
    saved: Mutex<Vec<StateMap>>,
    failures: AtomicUsize,
    resets: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StateMap) -> Self {
        MemoryStateStore {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Fail the next `count` saves.
    pub fn fail_next_saves(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Every document successfully saved, oldest first.
    pub fn saves(&self) -> Vec<StateMap> {
        self.saved.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> StateMap {
        self.state.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save(&self, state: &StateMap) -> Result<(), TreeError> {
        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            return Err(TreeError::Server {
                status: 500,
                message: "Tree state could not be saved".to_string(),
            });
        }
        *self.state.lock() = state.clone();
        self.saved.lock().push(state.clone());
        Ok(())
    }

    async fn fetch(&self) -> Result<StateMap, TreeError> {
        Ok(self.state.lock().clone())
    }

    async fn reset(&self) -> Result<(), TreeError> {
        self.state.lock().clear();
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
