// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session registry owned by the hosting process.
//!
//! One handle per live session, keyed by session id. Sessions are
//! independent and share no mutable state with each other; the ledger is
//! the only resource they have in common.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::OrchestratorError;

use super::runner::SessionHandle;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: Arc<SessionHandle>) {
        self.sessions.write().await.insert(handle.id(), handle);
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<SessionHandle>, OrchestratorError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(OrchestratorError::SessionNotFound(id))
    }

    pub async fn ids(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }
}
