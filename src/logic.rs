//! Core behaviors callers reach for:
//!   - creating a submission (validate, then persist all-or-nothing)
//!   - summarizing a session's submissions

use chrono::Utc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::domain::{ResponseDraft, SessionId, Submission};
use crate::error::AppError;
use crate::state::AppState;
use crate::summary::{summarize, Summary};
use crate::util::trunc_for_log;
use crate::validator::validate_and_build;

#[instrument(level = "info", skip(state, drafts), fields(%session_id, responses = drafts.len()))]
pub async fn create_submission(
  state: &AppState,
  session_id: SessionId,
  drafts: &[ResponseDraft],
) -> Result<Submission, AppError> {
  let session = state
    .get_session(session_id)
    .await
    .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;
  let survey = state
    .get_survey(session.survey_id)
    .await
    .ok_or_else(|| AppError::NotFound(format!("survey {}", session.survey_id)))?;

  let responses = match validate_and_build(&survey, drafts) {
    Ok(responses) => responses,
    Err(errors) => {
      info!(target: "submission", %session_id, errors = errors.len(), detail = %trunc_for_log(&errors.to_string(), 300), "Submission rejected");
      return Err(errors.into());
    }
  };

  let submission = Submission {
    id: Uuid::new_v4(),
    session_id,
    submitted_at: Utc::now(),
    responses,
  };
  state.insert_submission(submission.clone()).await?;
  info!(target: "submission", %session_id, id = %submission.id, responses = submission.responses.len(), "Submission stored");
  Ok(submission)
}

/// Look a session up by join code, then submit to it.
pub async fn submit_by_code(
  state: &AppState,
  code: u32,
  drafts: &[ResponseDraft],
) -> Result<Submission, AppError> {
  let session = state
    .session_by_code(code)
    .await
    .ok_or_else(|| AppError::NotFound(format!("session code {code}")))?;
  create_submission(state, session.id, drafts).await
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn summarize_session(state: &AppState, session_id: SessionId) -> Result<Summary, AppError> {
  let session = state
    .get_session(session_id)
    .await
    .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;
  let survey = state
    .get_survey(session.survey_id)
    .await
    .ok_or_else(|| AppError::NotFound(format!("survey {}", session.survey_id)))?;
  let submissions = state.submissions(session_id).await;

  match summarize(&survey, &submissions) {
    Ok(summary) => {
      info!(target: "summary", %session_id, submissions = summary.submission_count, questions = summary.question_summary.len(), "Summary computed");
      Ok(summary)
    }
    Err(violation) => {
      error!(target: "summary", %session_id, error = %violation, "Stored responses contradict the survey schema");
      Err(violation.into())
    }
  }
}
