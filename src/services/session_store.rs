use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::services::evaluation::Evaluation;
use crate::services::pipeline::EvaluationPipeline;
use crate::services::session::{
    EvaluationTicket, GameSession, PromptBank, SessionError, SessionRules,
};
use crate::services::view::SessionView;

pub type SessionHandle = Arc<Mutex<GameSession>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("evaluation task failed: {0}")]
    EvaluationAborted(String),
}

/// Independent sessions keyed by id. Each session has its own lock.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    prompts: Arc<PromptBank>,
    rules: SessionRules,
}

impl SessionStore {
    pub fn new(prompts: Arc<PromptBank>, rules: SessionRules) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            prompts,
            rules,
        }
    }

    pub fn create(&self, lang: &str) -> SessionView {
        let session = GameSession::new(lang, Arc::clone(&self.prompts), self.rules.clone());
        let view = SessionView::project(&session);
        self.sessions
            .write()
            .insert(session.id(), Arc::new(Mutex::new(session)));
        debug!(session_id = %view.session_id, lang, "session created");
        view
    }

    pub fn get(&self, id: Uuid) -> Result<SessionHandle, StoreError> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    pub fn view(&self, id: Uuid) -> Result<SessionView, StoreError> {
        let handle = self.get(id)?;
        let session = handle.lock();
        Ok(SessionView::project(&session))
    }

    pub fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        self.sessions
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Submits an answer and applies the pipeline's evaluation.
    ///
    /// The session lock is released while the pipeline runs; the session sits in
    /// `Evaluating` and refuses other submissions until the ticket settles. The
    /// evaluation runs on its own task so it still lands if the caller goes away.
    pub async fn submit_answer(
        &self,
        id: Uuid,
        answer: &str,
        pipeline: Arc<EvaluationPipeline>,
    ) -> Result<SessionView, StoreError> {
        let handle = self.get(id)?;
        let ticket = handle.lock().submit_answer(answer)?;

        let task_handle = Arc::clone(&handle);
        let task_ticket = ticket.clone();
        let task = tokio::spawn(async move {
            let evaluation = pipeline
                .evaluate(&task_ticket.answer, &task_ticket.prompt, &task_ticket.lang)
                .await;
            apply(&task_handle, task_ticket, evaluation)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(session_id = %id, error = %err, "evaluation task failed, releasing session");
                let _ = handle.lock().abandon_evaluation(&ticket);
                Err(StoreError::EvaluationAborted(err.to_string()))
            }
        }
    }

    pub fn advance(&self, id: Uuid) -> Result<SessionView, StoreError> {
        let handle = self.get(id)?;
        let mut session = handle.lock();
        session.advance()?;
        Ok(SessionView::project(&session))
    }

    pub fn reset(&self, id: Uuid) -> Result<SessionView, StoreError> {
        let handle = self.get(id)?;
        let mut session = handle.lock();
        session.reset();
        Ok(SessionView::project(&session))
    }

    /// Drops sessions that have been idle for `ttl` or longer.
    pub fn purge_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, handle| handle.lock().idle_for(now) < ttl);
        before - sessions.len()
    }
}

fn apply(
    handle: &SessionHandle,
    ticket: EvaluationTicket,
    evaluation: Evaluation,
) -> Result<SessionView, StoreError> {
    let mut session = handle.lock();
    let generation = ticket.generation();
    match session.complete_evaluation(ticket, evaluation) {
        Ok(()) => Ok(SessionView::project(&session)),
        Err(SessionError::StaleTicket) => {
            debug!(
                session_id = %session.id(),
                ticket_generation = generation,
                current_generation = session.generation(),
                "discarding evaluation for a reset session"
            );
            Err(StoreError::Session(SessionError::StaleTicket))
        }
        Err(err) => Err(err.into()),
    }
}
