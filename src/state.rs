//! Application state: in-memory stores for surveys, sessions and submissions.
//!
//! This module owns:
//!   - the survey store (built from the TOML bank, or the built-in seed survey)
//!   - sessions and their join codes
//!   - submissions per session
//!
//! A submission is inserted whole under one write lock, so readers never observe a
//! submission with only some of its responses.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::codes::CodeAllocator;
use crate::config::{load_app_config_from_env, AppConfig};
use crate::domain::{
    QuestionId, Session, SessionId, Submission, SubmissionId, Survey, SurveyId,
};
use crate::error::{AppError, ErrorKind, ValidationErrors};
use crate::schema::{check_group_by, SurveyDraft};
use crate::seeds::seed_surveys;

#[derive(Clone)]
pub struct AppState {
    pub surveys: Arc<RwLock<HashMap<SurveyId, Survey>>>,
    pub sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    pub submissions: Arc<RwLock<HashMap<SessionId, Vec<Submission>>>>,
    pub codes: CodeAllocator,
}

impl AppState {
    /// Build state from env: load config, fall back to seeds.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_else(|| AppConfig {
            surveys: seed_surveys(),
            ..AppConfig::default()
        });
        Self::from_config(cfg)
    }

    /// Build state from an explicit config. Invalid bank surveys are skipped.
    pub fn from_config(cfg: AppConfig) -> Self {
        let mut surveys = HashMap::<SurveyId, Survey>::new();
        for (idx, draft) in cfg.surveys.into_iter().enumerate() {
            let title = draft.title.clone();
            match draft.build() {
                Ok(survey) if surveys.contains_key(&survey.id) => {
                    error!(target: "survey_core", idx, id = %survey.id, %title, "Skipping survey with a repeated id");
                }
                Ok(survey) => {
                    info!(target: "survey_core", id = %survey.id, %title, questions = survey.questions.len(), "Loaded survey");
                    surveys.insert(survey.id, survey);
                }
                Err(e) => {
                    error!(target: "survey_core", idx, %title, error = %e, "Skipping invalid survey in bank");
                }
            }
        }

        Self {
            surveys: Arc::new(RwLock::new(surveys)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            submissions: Arc::new(RwLock::new(HashMap::new())),
            codes: CodeAllocator::from_config(&cfg.codes),
        }
    }

    #[instrument(level = "debug", skip(self, draft), fields(title = %draft.title))]
    pub async fn insert_survey(&self, draft: SurveyDraft) -> Result<Survey, AppError> {
        let survey = draft.build()?;
        match self.surveys.write().await.entry(survey.id) {
            Entry::Occupied(_) => {
                let mut errors = ValidationErrors::new();
                errors.push(
                    ErrorKind::Uniqueness,
                    "id",
                    None,
                    format!("Survey {} already exists.", survey.id),
                );
                Err(errors.into())
            }
            Entry::Vacant(slot) => {
                slot.insert(survey.clone());
                Ok(survey)
            }
        }
    }

    pub async fn get_survey(&self, id: SurveyId) -> Option<Survey> {
        self.surveys.read().await.get(&id).cloned()
    }

    /// All surveys, oldest first.
    pub async fn list_surveys(&self) -> Vec<Survey> {
        let mut all: Vec<Survey> = self.surveys.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Designate (or clear, with `None`) the question summaries are grouped by.
    #[instrument(level = "info", skip(self))]
    pub async fn set_group_by_question(
        &self,
        survey_id: SurveyId,
        question: Option<QuestionId>,
    ) -> Result<(), AppError> {
        let mut surveys = self.surveys.write().await;
        let survey = surveys
            .get_mut(&survey_id)
            .ok_or_else(|| AppError::NotFound(format!("survey {survey_id}")))?;
        if let Some(q) = question {
            check_group_by(survey, q)?;
        }
        survey.group_by_question = question;
        Ok(())
    }

    /// Open a collection session with a fresh join code.
    #[instrument(level = "info", skip(self))]
    pub async fn open_session(&self, survey_id: SurveyId) -> Result<Session, AppError> {
        if !self.surveys.read().await.contains_key(&survey_id) {
            return Err(AppError::NotFound(format!("survey {survey_id}")));
        }

        let mut sessions = self.sessions.write().await;
        let code = {
            let mut rng = rand::thread_rng();
            self.codes
                .allocate(&mut rng, |c| sessions.values().any(|s| s.code == c))?
        };
        let session = Session {
            id: Uuid::new_v4(),
            survey_id,
            code,
            created_at: Utc::now(),
        };
        sessions.insert(session.id, session.clone());
        self.submissions.write().await.entry(session.id).or_default();
        info!(target: "session", id = %session.id, %survey_id, code, "Session opened");
        Ok(session)
    }

    pub async fn get_session(&self, id: SessionId) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn session_by_code(&self, code: u32) -> Option<Session> {
        self.sessions
            .read()
            .await
            .values()
            .find(|s| s.code == code)
            .cloned()
    }

    /// Store a complete submission in one step.
    #[instrument(level = "debug", skip(self, submission), fields(id = %submission.id, session = %submission.session_id))]
    pub async fn insert_submission(&self, submission: Submission) -> Result<(), AppError> {
        let mut all = self.submissions.write().await;
        let list = all.get_mut(&submission.session_id).ok_or_else(|| {
            AppError::NotFound(format!("session {}", submission.session_id))
        })?;
        list.push(submission);
        Ok(())
    }

    /// Snapshot of a session's submissions in creation order.
    pub async fn submissions(&self, session_id: SessionId) -> Vec<Submission> {
        self.submissions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn get_submission(
        &self,
        session_id: SessionId,
        id: SubmissionId,
    ) -> Option<Submission> {
        self.submissions
            .read()
            .await
            .get(&session_id)
            .and_then(|list| list.iter().find(|s| s.id == id).cloned())
    }

    /// Remove a submission together with its responses.
    #[instrument(level = "info", skip(self))]
    pub async fn delete_submission(
        &self,
        session_id: SessionId,
        id: SubmissionId,
    ) -> Result<Submission, AppError> {
        let mut all = self.submissions.write().await;
        let list = all
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;
        match list.iter().position(|s| s.id == id) {
            Some(pos) => Ok(list.remove(pos)),
            None => {
                warn!(target: "submission", %session_id, %id, "Delete of unknown submission");
                Err(AppError::NotFound(format!("submission {id}")))
            }
        }
    }
}
