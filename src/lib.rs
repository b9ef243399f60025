//! Survey Core · submission validation and response summarization
//!
//! - `validator`: checks a submission's response drafts against a survey's question
//!   schema and reports every violated rule
//! - `summary`: per-question statistics over a session's submissions, optionally
//!   split by a grouping question
//! - `state` / `logic`: in-memory persistence with all-or-nothing submission create
//!
//! Important env variables:
//!   SURVEY_CONFIG_PATH : path to TOML config (code settings + survey bank)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

pub mod codes;
pub mod config;
pub mod domain;
pub mod error;
pub mod logic;
pub mod protocol;
pub mod schema;
pub mod seeds;
pub mod state;
pub mod summary;
pub mod telemetry;
pub mod util;
pub mod validator;

pub use domain::{Answer, Choice, Question, Response, ResponseDraft, Session, Submission, Survey};
pub use error::{AppError, ErrorKind, FieldError, InvariantViolation, ValidationErrors};
pub use logic::{create_submission, summarize_session};
pub use schema::{QuestionDraft, QuestionType, SurveyDraft};
pub use summary::{summarize, Summary, SummaryDetail};
pub use validator::validate_and_build;
