//! Domain models: surveys and their questions/choices, sessions, and the immutable
//! submissions (with typed responses) collected under a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::QuestionType;

pub type SurveyId = Uuid;
pub type QuestionId = Uuid;
pub type ChoiceId = Uuid;
pub type SessionId = Uuid;
pub type SubmissionId = Uuid;

/// One selectable option. `description` doubles as a numeric value for
/// multiple-choice statistics when every description of the question parses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Choice {
  pub id: ChoiceId,
  pub value: String,
  pub description: String,
}

/// Numeric bounds for scale and ranking questions.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Range {
  pub min: f64,
  pub max: f64,
  pub default: f64,
  pub step: f64,
}

impl Range {
  pub fn contains(&self, value: f64) -> bool {
    self.min <= value && value <= self.max
  }
}

/// A validated question. `choices` is empty and `range` is `None` for types that
/// don't take them (see `QuestionType::fields`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Question {
  pub id: QuestionId,
  pub survey_id: SurveyId,
  pub number: i64,
  pub title: String,
  pub required: bool,
  pub kind: QuestionType,
  #[serde(default)]
  pub choices: Vec<Choice>,
  #[serde(default)]
  pub range: Option<Range>,
}

impl Question {
  pub fn choice(&self, id: ChoiceId) -> Option<&Choice> {
    self.choices.iter().find(|c| c.id == id)
  }

  pub fn owns_choice(&self, id: ChoiceId) -> bool {
    self.choice(id).is_some()
  }

  pub fn min_responses(&self) -> usize {
    self.kind.min_responses(self.choices.len())
  }

  pub fn max_responses(&self) -> usize {
    self.kind.max_responses(self.choices.len())
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Survey {
  pub id: SurveyId,
  pub title: String,
  pub description: String,
  pub created_at: DateTime<Utc>,
  /// Ordered by `number`.
  pub questions: Vec<Question>,
  pub group_by_question: Option<QuestionId>,
}

impl Survey {
  pub fn question(&self, id: QuestionId) -> Option<&Question> {
    self.questions.iter().find(|q| q.id == id)
  }

  pub fn group_by(&self) -> Option<&Question> {
    self.group_by_question.and_then(|id| self.question(id))
  }
}

/// One run of data collection for a survey, joined with a numeric code.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
  pub id: SessionId,
  pub survey_id: SurveyId,
  pub code: u32,
  pub created_at: DateTime<Utc>,
}

/// A validated answer, shaped by the question type it answers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Answer {
  /// Multiple choice, checkboxes, dropdown.
  Choice { choice: ChoiceId },
  /// Short answer, paragraph.
  Text { text: String },
  /// Scale.
  Numeric { value: f64 },
  /// Ranking: the rank given to one choice.
  Ranked { choice: ChoiceId, value: f64 },
}

impl Answer {
  pub fn choice(&self) -> Option<ChoiceId> {
    match self {
      Answer::Choice { choice } | Answer::Ranked { choice, .. } => Some(*choice),
      Answer::Text { .. } | Answer::Numeric { .. } => None,
    }
  }

  pub fn text(&self) -> Option<&str> {
    match self {
      Answer::Text { text } => Some(text),
      _ => None,
    }
  }

  pub fn numeric_value(&self) -> Option<f64> {
    match self {
      Answer::Numeric { value } | Answer::Ranked { value, .. } => Some(*value),
      Answer::Choice { .. } | Answer::Text { .. } => None,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
  pub question: QuestionId,
  pub answer: Answer,
}

impl Response {
  /// The draft that would reproduce this response.
  pub fn to_draft(&self) -> ResponseDraft {
    ResponseDraft {
      question: self.question,
      choice: self.answer.choice(),
      text: self.answer.text().map(str::to_string),
      numeric_value: self.answer.numeric_value(),
    }
  }
}

/// A response as sent by a respondent. A `null` field and an absent field are the same thing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseDraft {
  pub question: QuestionId,
  #[serde(default)]
  pub choice: Option<ChoiceId>,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub numeric_value: Option<f64>,
}

impl ResponseDraft {
  pub fn choice(question: QuestionId, choice: ChoiceId) -> Self {
    Self { question, choice: Some(choice), ..Default::default() }
  }

  pub fn text(question: QuestionId, text: impl Into<String>) -> Self {
    Self { question, text: Some(text.into()), ..Default::default() }
  }

  pub fn numeric(question: QuestionId, value: f64) -> Self {
    Self { question, numeric_value: Some(value), ..Default::default() }
  }

  pub fn ranked(question: QuestionId, choice: ChoiceId, value: f64) -> Self {
    Self { question, choice: Some(choice), numeric_value: Some(value), ..Default::default() }
  }
}

/// One respondent's complete set of responses. Never edited after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
  pub id: SubmissionId,
  pub session_id: SessionId,
  pub submitted_at: DateTime<Utc>,
  pub responses: Vec<Response>,
}
