//! Revision history for one refinement conversation.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::Rejected;
use crate::models::{Directive, Suite};

use super::refine_suite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Stable,
    Applying,
    /// The last directive was refused; the current revision is unchanged.
    Rejected,
}

#[derive(Debug)]
struct History {
    state: SessionState,
    revisions: Vec<Arc<Suite>>,
    last_rejection: Option<Rejected>,
}

impl History {
    fn current(&self) -> &Arc<Suite> {
        // `new` seeds one revision and nothing removes them.
        &self.revisions[self.revisions.len() - 1]
    }
}

/// Every revision of a suite, oldest first. Directives are applied one at a
/// time; each accepted one appends a new immutable revision.
#[derive(Debug)]
pub struct RefinementSession {
    history: Mutex<History>,
}

impl RefinementSession {
    pub fn new(suite: Suite) -> Self {
        Self {
            history: Mutex::new(History {
                state: SessionState::Stable,
                revisions: vec![Arc::new(suite)],
                last_rejection: None,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.history.lock().state
    }

    pub fn current(&self) -> Arc<Suite> {
        Arc::clone(self.history.lock().current())
    }

    pub fn last_rejection(&self) -> Option<Rejected> {
        self.history.lock().last_rejection.clone()
    }

    /// Revision numbers held, oldest first.
    pub fn revisions(&self) -> Vec<u32> {
        self.history
            .lock()
            .revisions
            .iter()
            .map(|suite| suite.revision)
            .collect()
    }

    pub fn revision(&self, revision: u32) -> Option<Arc<Suite>> {
        self.history
            .lock()
            .revisions
            .iter()
            .find(|suite| suite.revision == revision)
            .cloned()
    }

    pub fn apply(&self, directive: &Directive) -> Result<Arc<Suite>, Rejected> {
        let mut history = self.history.lock();
        history.state = SessionState::Applying;
        let current = Arc::clone(history.current());
        match refine_suite(&current, directive) {
            Ok(suite) => {
                let suite = Arc::new(suite);
                history.revisions.push(Arc::clone(&suite));
                history.state = SessionState::Stable;
                history.last_rejection = None;
                info!(revision = suite.revision, "session advanced");
                Ok(suite)
            }
            Err(rejected) => {
                warn!(
                    revision = current.revision,
                    reason = %rejected.reason,
                    "directive rejected"
                );
                history.state = SessionState::Rejected;
                history.last_rejection = Some(rejected.clone());
                Err(rejected)
            }
        }
    }

    /// Make an earlier revision current again. The history is kept: the
    /// restored content is appended as a new revision.
    pub fn rollback(&self, revision: u32) -> Result<Arc<Suite>, Rejected> {
        let mut history = self.history.lock();
        let Some(target) = history
            .revisions
            .iter()
            .find(|suite| suite.revision == revision)
            .cloned()
        else {
            return Err(Rejected::new(format!("unknown revision {revision}")));
        };
        let restored = Arc::new(Suite {
            revision: history.current().revision + 1,
            ..(*target).clone()
        });
        history.revisions.push(Arc::clone(&restored));
        history.state = SessionState::Stable;
        history.last_rejection = None;
        info!(from = revision, revision = restored.revision, "session rolled back");
        Ok(restored)
    }
}
