//! Submission validation.
//!
//! `validate_and_build` checks a list of response drafts against a survey and
//! returns either typed `Response`s or every violated rule:
//!   1. field shape per response (conditional-field table)
//!   2. choice ownership
//!   3. numeric range
//!   4. per-question cardinality over the whole submission, plus foreign questions
//!   5. choice uniqueness across the submission

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::{Answer, ChoiceId, Question, QuestionId, Response, ResponseDraft, Survey};
use crate::error::{ErrorKind, ValidationErrors};
use crate::schema::{check_fields, Field, QuestionType};

fn draft_has(draft: &ResponseDraft, field: Field) -> bool {
  match field {
    Field::Choice => draft.choice.is_some(),
    Field::Text => draft.text.is_some(),
    Field::NumericValue => draft.numeric_value.is_some(),
    Field::Choices | Field::RangeMin | Field::RangeMax | Field::RangeDefault | Field::RangeStep => false,
  }
}

/// Only called once the draft's shape matched its type.
fn build_answer(kind: QuestionType, draft: &ResponseDraft) -> Option<Answer> {
  match kind {
    QuestionType::MultiChoice | QuestionType::Checkboxes | QuestionType::Dropdown => {
      draft.choice.map(|choice| Answer::Choice { choice })
    }
    QuestionType::Scale => draft.numeric_value.map(|value| Answer::Numeric { value }),
    QuestionType::ShortAnswer | QuestionType::Paragraph => {
      draft.text.clone().map(|text| Answer::Text { text })
    }
    QuestionType::Ranking => match (draft.choice, draft.numeric_value) {
      (Some(choice), Some(value)) => Some(Answer::Ranked { choice, value }),
      _ => None,
    },
  }
}

fn check_cardinality(question: &Question, count: usize, errors: &mut ValidationErrors) {
  let qid = question.id;
  if count == 0 {
    if question.required {
      errors.push(ErrorKind::Cardinality, "responses", Some(qid), format!("Question {qid} is required."));
    }
    return;
  }
  if count < question.min_responses() {
    errors.push(
      ErrorKind::Cardinality,
      "responses",
      Some(qid),
      format!(
        "Not enough responses for question {qid} (got {count}, expected at least {}).",
        question.min_responses()
      ),
    );
  } else if count > question.max_responses() {
    errors.push(
      ErrorKind::Cardinality,
      "responses",
      Some(qid),
      format!(
        "Too many responses for question {qid} (got {count}, expected at most {}).",
        question.max_responses()
      ),
    );
  }
}

/// Validate a whole submission. No partial result: either every draft becomes a
/// `Response`, or the collected errors come back.
pub fn validate_and_build(
  survey: &Survey,
  drafts: &[ResponseDraft],
) -> Result<Vec<Response>, ValidationErrors> {
  let mut errors = ValidationErrors::new();
  let mut built = Vec::with_capacity(drafts.len());
  let mut counts: HashMap<QuestionId, usize> = HashMap::new();
  let mut foreign: Vec<QuestionId> = Vec::new();
  let mut seen_choices: HashSet<ChoiceId> = HashSet::new();
  let mut duplicate_choices: Vec<ChoiceId> = Vec::new();

  for (idx, draft) in drafts.iter().enumerate() {
    let path = format!("responses[{idx}].");

    if let Some(choice) = draft.choice {
      if !seen_choices.insert(choice) && !duplicate_choices.contains(&choice) {
        duplicate_choices.push(choice);
      }
    }

    let Some(question) = survey.question(draft.question) else {
      if !foreign.contains(&draft.question) {
        foreign.push(draft.question);
      }
      continue;
    };
    *counts.entry(question.id).or_default() += 1;

    let kind = question.kind;
    let shape_ok = check_fields(
      kind,
      &Field::RESPONSE,
      |f| draft_has(draft, f),
      "invalid",
      &path,
      Some(question.id),
      &mut errors,
    );

    let mut ok = shape_ok;

    if let Some(choice) = draft.choice {
      if kind.requires(Field::Choice) && !question.owns_choice(choice) {
        ok = false;
        errors.push(
          ErrorKind::CrossReference,
          format!("{path}choice"),
          Some(question.id),
          format!("Invalid choice {choice} for question {}.", question.id),
        );
      }
    }

    if let (Some(value), Some(range)) = (draft.numeric_value, question.range) {
      if !range.contains(value) {
        ok = false;
        errors.push(
          ErrorKind::Range,
          format!("{path}numeric_value"),
          Some(question.id),
          format!("Value must be between {} and {}.", range.min, range.max),
        );
      }
    }

    if ok {
      if let Some(answer) = build_answer(kind, draft) {
        built.push(Response { question: question.id, answer });
      }
    }
  }

  for question in &survey.questions {
    let count = counts.get(&question.id).copied().unwrap_or(0);
    check_cardinality(question, count, &mut errors);
  }

  if !foreign.is_empty() {
    let ids = foreign.iter().map(|q| q.to_string()).collect::<Vec<_>>().join(",");
    errors.push(
      ErrorKind::CrossReference,
      "responses",
      None,
      format!("Questions {ids} are invalid for survey {}.", survey.id),
    );
  }

  for choice in duplicate_choices {
    errors.push(
      ErrorKind::Uniqueness,
      "responses",
      None,
      format!("Selected choices must be unique (choice {choice} selected more than once)."),
    );
  }

  if !errors.is_empty() {
    debug!(target: "submission", survey = %survey.id, errors = errors.len(), "Submission failed validation");
  }
  errors.into_result(built)
}
