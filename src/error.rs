//! Error taxonomy.
//!
//! User-input errors are collected into `ValidationErrors` (never first-wins) so a
//! caller can render every problem at once. `InvariantViolation` is the separate
//! class for data that should never have been persisted; it signals a bug, not a
//! bad request.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{ChoiceId, QuestionId, SurveyId};
use crate::schema::QuestionType;

/// Which rule family a validation error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// A conditional field present for a type that forbids it, or missing for a type that needs it.
  Schema,
  /// A choice not owned by its question, or a question not owned by the survey.
  CrossReference,
  /// Too few / too many responses, or a required question left unanswered.
  Cardinality,
  /// The same choice selected more than once in one submission.
  Uniqueness,
  /// A numeric value (or range definition) outside its declared bounds.
  Range,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ErrorKind::Schema => "schema",
      ErrorKind::CrossReference => "cross_reference",
      ErrorKind::Cardinality => "cardinality",
      ErrorKind::Uniqueness => "uniqueness",
      ErrorKind::Range => "range",
    };
    f.write_str(s)
  }
}

/// One field-addressable problem.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
  pub kind: ErrorKind,
  /// Path of the offending field, e.g. `responses[2].choice` or `range_min`.
  pub field: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub question: Option<QuestionId>,
  pub message: String,
}

/// Every rule violated by a submission or a question/survey draft.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Error)]
#[serde(transparent)]
#[error("{}", render(.errors))]
pub struct ValidationErrors {
  errors: Vec<FieldError>,
}

fn render(errors: &[FieldError]) -> String {
  errors
    .iter()
    .map(|e| format!("{}: {}", e.field, e.message))
    .collect::<Vec<_>>()
    .join("; ")
}

impl ValidationErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(
    &mut self,
    kind: ErrorKind,
    field: impl Into<String>,
    question: Option<QuestionId>,
    message: impl Into<String>,
  ) {
    self.errors.push(FieldError {
      kind,
      field: field.into(),
      question,
      message: message.into(),
    });
  }

  /// Append another set, prefixing each field path (`questions[3].` etc).
  pub fn absorb(&mut self, prefix: &str, other: ValidationErrors) {
    for mut e in other.errors {
      e.field = format!("{prefix}{}", e.field);
      self.errors.push(e);
    }
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn len(&self) -> usize {
    self.errors.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
    self.errors.iter()
  }

  pub fn has_kind(&self, kind: ErrorKind) -> bool {
    self.errors.iter().any(|e| e.kind == kind)
  }

  /// True if any message contains `needle`.
  pub fn mentions(&self, needle: &str) -> bool {
    self.errors.iter().any(|e| e.message.contains(needle))
  }

  /// `Ok(value)` when nothing was collected.
  pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
    if self.errors.is_empty() {
      Ok(value)
    } else {
      Err(self)
    }
  }
}

impl<'a> IntoIterator for &'a ValidationErrors {
  type Item = &'a FieldError;
  type IntoIter = std::slice::Iter<'a, FieldError>;

  fn into_iter(self) -> Self::IntoIter {
    self.errors.iter()
  }
}

/// Persisted data that contradicts the survey schema. Never caused by request input
/// (the validator rejects that first), so it is reported as an internal failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
  #[error("response to question {question} references choice {choice} which the question does not own")]
  UnknownChoice { question: QuestionId, choice: ChoiceId },

  #[error("response to question {question} does not carry the answer shape required by type {kind}")]
  AnswerShape { question: QuestionId, kind: QuestionType },

  #[error("survey {survey} groups by question {question} which it does not contain")]
  MissingGroupingQuestion { survey: SurveyId, question: QuestionId },
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation failed: {0}")]
  Invalid(#[from] ValidationErrors),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Internal invariant violated: {0}")]
  Internal(#[from] InvariantViolation),

  #[error("Session code space exhausted after {attempts} attempts")]
  CodeSpaceExhausted { attempts: u32 },
}

impl AppError {
  /// Errors caused by the caller's input, as opposed to bugs or resource exhaustion.
  pub fn is_bad_request(&self) -> bool {
    matches!(self, AppError::Invalid(_) | AppError::NotFound(_))
  }

  pub fn validation(&self) -> Option<&ValidationErrors> {
    match self {
      AppError::Invalid(errors) => Some(errors),
      _ => None,
    }
  }
}
