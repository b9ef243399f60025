//! Survey Core CLI
//!
//! Opens one session per known survey, optionally ingests a JSON file of
//! submissions, and prints every session's stored submissions and summary as JSON
//! on stdout.
//!
//!   survey-core [submissions.json]
//!
//! The file holds `[{ "survey": "<id>", "responses": [ { "question": "<id>", ... } ] }]`.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use survey_core::logic::{create_submission, summarize_session};
use survey_core::protocol::{session_out, submission_out, SessionOut, SubmissionIn, SubmissionOut};
use survey_core::state::AppState;
use survey_core::summary::Summary;
use survey_core::telemetry;

#[derive(Serialize)]
struct SessionReport {
  session: SessionOut,
  submissions: Vec<SubmissionOut>,
  summary: Summary,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = AppState::new();

  let mut sessions = HashMap::new();
  for survey in state.list_surveys().await {
    let session = state.open_session(survey.id).await?;
    info!(target: "survey_core", survey = %survey.id, title = %survey.title, code = session.code, "Session ready");
    sessions.insert(survey.id, session);
  }

  if let Some(path) = std::env::args().nth(1) {
    let raw = tokio::fs::read_to_string(&path).await?;
    let batch: Vec<SubmissionIn> = serde_json::from_str(&raw)?;
    info!(target: "survey_core", %path, submissions = batch.len(), "Ingesting submissions");

    let (mut accepted, mut rejected) = (0usize, 0usize);
    for (idx, item) in batch.iter().enumerate() {
      let Some(session) = sessions.get(&item.survey) else {
        warn!(target: "submission", idx, survey = %item.survey, "No such survey; skipping");
        rejected += 1;
        continue;
      };
      match create_submission(&state, session.id, &item.responses).await {
        Ok(_) => accepted += 1,
        Err(e) => {
          rejected += 1;
          if let Some(errors) = e.validation() {
            for fe in errors {
              warn!(target: "submission", idx, kind = %fe.kind, field = %fe.field, "{}", fe.message);
            }
          } else {
            warn!(target: "submission", idx, error = %e, "Submission failed");
          }
        }
      }
    }
    info!(target: "survey_core", accepted, rejected, "Ingest finished");
  }

  let mut out = Vec::with_capacity(sessions.len());
  for session in sessions.values() {
    let summary = summarize_session(&state, session.id).await?;
    let submissions = state.submissions(session.id).await.iter().map(submission_out).collect();
    out.push(SessionReport { session: session_out(session), submissions, summary });
  }
  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}
