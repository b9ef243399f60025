//! Question schema: the closed set of question types, the conditional-field table
//! shared by question drafts and responses, and the derived cardinality rules.
//!
//! Every rule here is a function of `QuestionType` with an exhaustive `match`, so a
//! new type cannot be added without deciding its fields and response bounds.

use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Choice, ChoiceId, Question, QuestionId, Range, Survey, SurveyId};
use crate::error::{ErrorKind, ValidationErrors};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
  #[serde(rename = "MC")]
  MultiChoice,
  #[serde(rename = "CB")]
  Checkboxes,
  #[serde(rename = "DP")]
  Dropdown,
  #[serde(rename = "SC")]
  Scale,
  #[serde(rename = "SA")]
  ShortAnswer,
  #[serde(rename = "PA")]
  Paragraph,
  #[serde(rename = "RK")]
  Ranking,
}

/// A field whose presence depends on the question type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
  // On questions
  Choices,
  RangeMin,
  RangeMax,
  RangeDefault,
  RangeStep,
  // On responses
  Choice,
  Text,
  NumericValue,
}

impl Field {
  pub const QUESTION: [Field; 5] = [
    Field::Choices,
    Field::RangeMin,
    Field::RangeMax,
    Field::RangeDefault,
    Field::RangeStep,
  ];
  pub const RESPONSE: [Field; 3] = [Field::Choice, Field::Text, Field::NumericValue];

  pub fn name(self) -> &'static str {
    match self {
      Field::Choices => "choices",
      Field::RangeMin => "range_min",
      Field::RangeMax => "range_max",
      Field::RangeDefault => "range_default",
      Field::RangeStep => "range_step",
      Field::Choice => "choice",
      Field::Text => "text",
      Field::NumericValue => "numeric_value",
    }
  }
}

impl QuestionType {
  pub const ALL: [QuestionType; 7] = [
    QuestionType::MultiChoice,
    QuestionType::Checkboxes,
    QuestionType::Dropdown,
    QuestionType::Scale,
    QuestionType::ShortAnswer,
    QuestionType::Paragraph,
    QuestionType::Ranking,
  ];

  pub fn code(self) -> &'static str {
    match self {
      QuestionType::MultiChoice => "MC",
      QuestionType::Checkboxes => "CB",
      QuestionType::Dropdown => "DP",
      QuestionType::Scale => "SC",
      QuestionType::ShortAnswer => "SA",
      QuestionType::Paragraph => "PA",
      QuestionType::Ranking => "RK",
    }
  }

  /// The conditional fields this type requires; every other conditional field is forbidden.
  pub fn fields(self) -> &'static [Field] {
    use Field::*;
    match self {
      QuestionType::MultiChoice | QuestionType::Checkboxes | QuestionType::Dropdown => {
        &[Choices, Choice]
      }
      QuestionType::Scale => &[RangeMin, RangeMax, RangeDefault, RangeStep, NumericValue],
      QuestionType::ShortAnswer | QuestionType::Paragraph => &[Text],
      QuestionType::Ranking => &[
        Choices,
        RangeMin,
        RangeMax,
        RangeDefault,
        RangeStep,
        Choice,
        NumericValue,
      ],
    }
  }

  pub fn requires(self, field: Field) -> bool {
    self.fields().contains(&field)
  }

  /// Types where one question may receive several responses in a submission.
  pub fn is_multi_response(self) -> bool {
    match self {
      QuestionType::Checkboxes | QuestionType::Ranking => true,
      QuestionType::MultiChoice
      | QuestionType::Dropdown
      | QuestionType::Scale
      | QuestionType::ShortAnswer
      | QuestionType::Paragraph => false,
    }
  }

  /// Fewest responses accepted once a question is answered at all.
  /// Ranking needs every item ranked.
  pub fn min_responses(self, choice_count: usize) -> usize {
    match self {
      QuestionType::Ranking => choice_count,
      _ => 1,
    }
  }

  pub fn max_responses(self, choice_count: usize) -> usize {
    if self.is_multi_response() {
      choice_count
    } else {
      1
    }
  }

  /// Only single-selection types can partition submissions.
  pub fn can_group_by(self) -> bool {
    matches!(self, QuestionType::MultiChoice | QuestionType::Dropdown)
  }
}

impl fmt::Display for QuestionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

/// Report every conditional field whose presence disagrees with `kind`.
///
/// `forbidden` is the word used for a field the type does not take ("invalid" on
/// responses, "redundant" on questions). Returns true when the shape is clean.
pub fn check_fields(
  kind: QuestionType,
  fields: &[Field],
  present: impl Fn(Field) -> bool,
  forbidden: &str,
  path: &str,
  question: Option<QuestionId>,
  errors: &mut ValidationErrors,
) -> bool {
  let mut clean = true;
  for &field in fields {
    let name = field.name();
    match (kind.requires(field), present(field)) {
      (true, false) => {
        clean = false;
        errors.push(
          ErrorKind::Schema,
          format!("{path}{name}"),
          question,
          format!("'{name}' is required for question type '{kind}'"),
        );
      }
      (false, true) => {
        clean = false;
        errors.push(
          ErrorKind::Schema,
          format!("{path}{name}"),
          question,
          format!("'{name}' is {forbidden} for question type '{kind}'"),
        );
      }
      _ => {}
    }
  }
  clean
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChoiceDraft {
  #[serde(default)]
  pub id: Option<ChoiceId>,
  pub value: String,
  #[serde(default)]
  pub description: String,
}

/// Question as submitted by the survey owner, before the conditional fields are checked.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionDraft {
  #[serde(default)]
  pub id: Option<QuestionId>,
  pub number: i64,
  pub title: String,
  #[serde(default)]
  pub required: bool,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  #[serde(default)]
  pub choices: Option<Vec<ChoiceDraft>>,
  #[serde(default)]
  pub range_min: Option<f64>,
  #[serde(default)]
  pub range_max: Option<f64>,
  #[serde(default)]
  pub range_default: Option<f64>,
  #[serde(default)]
  pub range_step: Option<f64>,
}

impl QuestionDraft {
  pub fn new(number: i64, title: impl Into<String>, kind: QuestionType) -> Self {
    Self {
      id: None,
      number,
      title: title.into(),
      required: false,
      kind,
      choices: None,
      range_min: None,
      range_max: None,
      range_default: None,
      range_step: None,
    }
  }

  pub fn required(mut self) -> Self {
    self.required = true;
    self
  }

  pub fn with_choices<V, D>(mut self, choices: impl IntoIterator<Item = (V, D)>) -> Self
  where
    V: Into<String>,
    D: Into<String>,
  {
    self.choices = Some(
      choices
        .into_iter()
        .map(|(value, description)| ChoiceDraft {
          id: None,
          value: value.into(),
          description: description.into(),
        })
        .collect(),
    );
    self
  }

  pub fn with_range(mut self, min: f64, max: f64, default: f64, step: f64) -> Self {
    self.range_min = Some(min);
    self.range_max = Some(max);
    self.range_default = Some(default);
    self.range_step = Some(step);
    self
  }

  fn has(&self, field: Field) -> bool {
    match field {
      Field::Choices => self.choices.is_some(),
      Field::RangeMin => self.range_min.is_some(),
      Field::RangeMax => self.range_max.is_some(),
      Field::RangeDefault => self.range_default.is_some(),
      Field::RangeStep => self.range_step.is_some(),
      Field::Choice | Field::Text | Field::NumericValue => false,
    }
  }

  /// Check the draft against the field table and range ordering, then mint ids.
  pub fn build(self, survey_id: SurveyId) -> Result<Question, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let kind = self.kind;
    check_fields(kind, &Field::QUESTION, |f| self.has(f), "redundant", "", self.id, &mut errors);

    if let Some(choices) = &self.choices {
      if choices.is_empty() && kind.requires(Field::Choices) {
        errors.push(
          ErrorKind::Schema,
          "choices",
          self.id,
          format!("'choices' must not be empty for question type '{kind}'"),
        );
      }
    }

    let range = match (self.range_min, self.range_max, self.range_default, self.range_step) {
      (Some(min), Some(max), Some(default), Some(step)) => {
        if !(min <= max) {
          errors.push(ErrorKind::Range, "range_min", self.id, "range_min must be less than or equal to range_max.");
          errors.push(ErrorKind::Range, "range_max", self.id, "range_max must be greater than or equal to range_min.");
        }
        if !(min <= default) {
          errors.push(ErrorKind::Range, "range_default", self.id, "range_default must be greater than or equal to range_min.");
        }
        if !(max >= default) {
          errors.push(ErrorKind::Range, "range_default", self.id, "range_default must be less than or equal to range_max.");
        }
        Some(Range { min, max, default, step })
      }
      _ => None,
    };

    let id = self.id.unwrap_or_else(Uuid::new_v4);
    let choices = self
      .choices
      .unwrap_or_default()
      .into_iter()
      .map(|c| Choice {
        id: c.id.unwrap_or_else(Uuid::new_v4),
        value: c.value,
        description: c.description,
      })
      .collect();

    errors.into_result(Question {
      id,
      survey_id,
      number: self.number,
      title: self.title,
      required: self.required,
      kind,
      choices,
      range,
    })
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SurveyDraft {
  #[serde(default)]
  pub id: Option<SurveyId>,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub questions: Vec<QuestionDraft>,
  /// `number` of the question to group summaries by.
  #[serde(default)]
  pub group_by: Option<i64>,
}

impl SurveyDraft {
  pub fn build(self) -> Result<Survey, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let id = self.id.unwrap_or_else(Uuid::new_v4);
    check_unique_ids(&self.questions, &mut errors);

    let mut questions = Vec::with_capacity(self.questions.len());
    for (idx, draft) in self.questions.into_iter().enumerate() {
      match draft.build(id) {
        Ok(q) => questions.push(q),
        Err(e) => errors.absorb(&format!("questions[{idx}]."), e),
      }
    }
    questions.sort_by_key(|q| q.number);

    let mut survey = Survey {
      id,
      title: self.title,
      description: self.description,
      created_at: Utc::now(),
      questions,
      group_by_question: None,
    };

    if let Some(number) = self.group_by {
      let target = survey.questions.iter().find(|q| q.number == number).map(|q| q.id);
      match target {
        Some(question) => {
          match check_group_by(&survey, question) {
            Ok(()) => survey.group_by_question = Some(question),
            Err(e) => errors.absorb("", e),
          }
        }
        None => errors.push(
          ErrorKind::CrossReference,
          "group_by",
          None,
          format!("No question numbered {number} in survey {id}."),
        ),
      }
    }

    errors.into_result(survey)
  }
}

/// Explicit question ids must be unique within a survey, and explicit choice ids
/// unique across all of its questions. Minted ids never collide.
fn check_unique_ids(drafts: &[QuestionDraft], errors: &mut ValidationErrors) {
  let mut questions: HashSet<QuestionId> = HashSet::new();
  let mut choices: HashSet<ChoiceId> = HashSet::new();
  for (idx, draft) in drafts.iter().enumerate() {
    if let Some(qid) = draft.id {
      if !questions.insert(qid) {
        errors.push(
          ErrorKind::Schema,
          format!("questions[{idx}].id"),
          Some(qid),
          format!("Question id {qid} is used more than once."),
        );
      }
    }
    for (cidx, choice) in draft.choices.iter().flatten().enumerate() {
      if let Some(cid) = choice.id {
        if !choices.insert(cid) {
          errors.push(
            ErrorKind::Schema,
            format!("questions[{idx}].choices[{cidx}].id"),
            draft.id,
            format!("Choice id {cid} is used more than once."),
          );
        }
      }
    }
  }
}

/// A grouping question must belong to the survey and be single-selection.
pub fn check_group_by(survey: &Survey, question: QuestionId) -> Result<(), ValidationErrors> {
  let mut errors = ValidationErrors::new();
  match survey.question(question) {
    None => errors.push(
      ErrorKind::CrossReference,
      "group_by_question",
      Some(question),
      format!("Question {question} does not belong to survey {}.", survey.id),
    ),
    Some(q) if !q.kind.can_group_by() => errors.push(
      ErrorKind::Schema,
      "group_by_question",
      Some(question),
      format!(
        "Question type '{}' can't group responses; expected '{}' or '{}'.",
        q.kind,
        QuestionType::MultiChoice,
        QuestionType::Dropdown
      ),
    ),
    Some(_) => {}
  }
  errors.into_result(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn min_never_exceeds_max() {
    for kind in QuestionType::ALL {
      for n in 1..6 {
        assert!(kind.min_responses(n) <= kind.max_responses(n), "{kind} with {n} choices");
      }
    }
  }

  #[test]
  fn cardinality_rules_follow_type() {
    assert_eq!(QuestionType::MultiChoice.max_responses(4), 1);
    assert_eq!(QuestionType::Checkboxes.min_responses(4), 1);
    assert_eq!(QuestionType::Checkboxes.max_responses(4), 4);
    assert_eq!(QuestionType::Ranking.min_responses(3), 3);
    assert_eq!(QuestionType::Ranking.max_responses(3), 3);
  }

  #[test]
  fn field_table_matches_type_codes() {
    assert!(QuestionType::Ranking.requires(Field::Choices));
    assert!(QuestionType::Ranking.requires(Field::RangeStep));
    assert!(QuestionType::Ranking.requires(Field::NumericValue));
    assert!(!QuestionType::Scale.requires(Field::Choice));
    assert!(QuestionType::Paragraph.requires(Field::Text));
    assert!(!QuestionType::Dropdown.requires(Field::RangeMin));
  }

  #[test]
  fn type_codes_round_trip_through_serde() {
    let json = serde_json::to_string(&QuestionType::Ranking).expect("serialize");
    assert_eq!(json, "\"RK\"");
    let back: QuestionType = serde_json::from_str("\"SA\"").expect("deserialize");
    assert_eq!(back, QuestionType::ShortAnswer);
  }

  #[test]
  fn question_draft_rejects_missing_and_redundant_fields() {
    let draft = QuestionDraft::new(1, "Pick one", QuestionType::MultiChoice).with_range(1.0, 5.0, 3.0, 1.0);
    let errors = draft.build(Uuid::new_v4()).expect_err("should fail");
    assert!(errors.mentions("'choices' is required for question type 'MC'"));
    assert!(errors.mentions("'range_min' is redundant for question type 'MC'"));
    assert!(errors.iter().all(|e| e.kind == ErrorKind::Schema));
  }

  #[test]
  fn question_draft_checks_range_ordering() {
    let draft = QuestionDraft::new(1, "Rate", QuestionType::Scale).with_range(5.0, 1.0, 7.0, 1.0);
    let errors = draft.build(Uuid::new_v4()).expect_err("should fail");
    assert!(errors.mentions("range_min must be less than or equal to range_max."));
    assert!(errors.mentions("range_default must be less than or equal to range_max."));
    assert!(errors.has_kind(ErrorKind::Range));
  }

  #[test]
  fn question_draft_builds_ranking() {
    let q = QuestionDraft::new(2, "Rank", QuestionType::Ranking)
      .required()
      .with_choices([("a", "A"), ("b", "B"), ("c", "C")])
      .with_range(1.0, 5.0, 1.0, 1.0)
      .build(Uuid::new_v4())
      .expect("valid ranking question");
    assert_eq!(q.choices.len(), 3);
    assert_eq!(q.min_responses(), 3);
    assert_eq!(q.range.map(|r| r.max), Some(5.0));
  }

  #[test]
  fn empty_choice_list_is_rejected() {
    let errors = QuestionDraft::new(1, "Pick", QuestionType::Dropdown)
      .with_choices(Vec::<(String, String)>::new())
      .build(Uuid::new_v4())
      .expect_err("empty choices");
    assert!(errors.mentions("must not be empty"));
  }

  #[test]
  fn survey_group_by_must_be_single_selection() {
    let draft = SurveyDraft {
      id: None,
      title: "s".into(),
      description: String::new(),
      questions: vec![QuestionDraft::new(1, "Topics", QuestionType::Checkboxes).with_choices([("a", "A")])],
      group_by: Some(1),
    };
    let errors = draft.build().expect_err("checkboxes can't group");
    assert!(errors.mentions("can't group responses"));

    let draft = SurveyDraft {
      id: None,
      title: "s".into(),
      description: String::new(),
      questions: vec![QuestionDraft::new(1, "Section", QuestionType::Dropdown).with_choices([("g1", "G1")])],
      group_by: Some(1),
    };
    let survey = draft.build().expect("dropdown groups");
    assert_eq!(survey.group_by_question, Some(survey.questions[0].id));
  }

  #[test]
  fn survey_build_reports_nested_question_paths() {
    let draft = SurveyDraft {
      id: None,
      title: "s".into(),
      description: String::new(),
      questions: vec![
        QuestionDraft::new(1, "ok", QuestionType::ShortAnswer),
        QuestionDraft::new(2, "bad", QuestionType::Scale),
      ],
      group_by: Some(9),
    };
    let errors = draft.build().expect_err("invalid");
    assert!(errors.iter().any(|e| e.field == "questions[1].range_min"));
    assert!(errors.iter().any(|e| e.field == "group_by"));
  }

  #[test]
  fn repeated_question_and_choice_ids_are_rejected() {
    let shared_choice = Uuid::new_v4();
    let shared_question = Uuid::new_v4();
    let mut first = QuestionDraft::new(1, "One", QuestionType::MultiChoice).with_choices([("a", "A")]);
    let mut second = QuestionDraft::new(2, "Two", QuestionType::MultiChoice).with_choices([("b", "B")]);
    for q in [&mut first, &mut second] {
      if let Some(choices) = q.choices.as_mut() {
        choices[0].id = Some(shared_choice);
      }
    }
    let mut name = QuestionDraft::new(3, "Name", QuestionType::ShortAnswer);
    let mut nick = QuestionDraft::new(4, "Nick", QuestionType::ShortAnswer).required();
    name.id = Some(shared_question);
    nick.id = Some(shared_question);

    let draft = SurveyDraft {
      id: None,
      title: "s".into(),
      description: String::new(),
      questions: vec![first, second, name, nick],
      group_by: None,
    };
    let errors = draft.build().expect_err("ids collide");
    assert!(errors.iter().all(|e| e.kind == ErrorKind::Schema));
    assert!(errors.iter().any(|e| e.field == "questions[1].choices[0].id"));
    assert!(errors.iter().any(|e| e.field == "questions[3].id"));
    assert!(errors.mentions(&format!("Choice id {shared_choice} is used more than once.")));
  }
}
