//! Seed data: a built-in survey so the service is useful without external config.

use uuid::Uuid;

use crate::schema::{ChoiceDraft, QuestionDraft, QuestionType, SurveyDraft};

/// Fixed id of the seed survey, so submission files can target it.
pub const SEED_SURVEY_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001);

fn seed_id(n: u128) -> Option<Uuid> {
  Some(Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0000 | n))
}

fn choices(base: u128, items: &[(&str, &str)]) -> Option<Vec<ChoiceDraft>> {
  Some(
    items
      .iter()
      .zip(0u128..)
      .map(|(&(value, description), i)| ChoiceDraft {
        id: seed_id(base + i),
        value: value.into(),
        description: description.into(),
      })
      .collect(),
  )
}

/// Course feedback survey covering every question type, grouped by section.
pub fn seed_surveys() -> Vec<SurveyDraft> {
  let mut section = QuestionDraft::new(1, "Which section are you in?", QuestionType::Dropdown).required();
  section.id = seed_id(0x100);
  section.choices = choices(0x110, &[("A", "Morning section"), ("B", "Evening section")]);

  let mut hours = QuestionDraft::new(2, "Hours spent per week", QuestionType::MultiChoice).required();
  hours.id = seed_id(0x200);
  hours.choices = choices(0x210, &[("low", "1"), ("mid", "2"), ("high", "3")]);

  let mut topics = QuestionDraft::new(3, "Which topics did you enjoy?", QuestionType::Checkboxes);
  topics.id = seed_id(0x300);
  topics.choices = choices(0x310, &[("parsing", "Parsing"), ("types", "Type systems"), ("codegen", "Code generation")]);

  let mut rating = QuestionDraft::new(4, "Rate the course", QuestionType::Scale)
    .required()
    .with_range(1.0, 10.0, 5.0, 1.0);
  rating.id = seed_id(0x400);

  let mut word = QuestionDraft::new(5, "Describe the course in one word", QuestionType::ShortAnswer);
  word.id = seed_id(0x500);

  let mut comments = QuestionDraft::new(6, "Any other comments?", QuestionType::Paragraph);
  comments.id = seed_id(0x600);

  let mut ranking = QuestionDraft::new(7, "Rank the assignments", QuestionType::Ranking).with_range(1.0, 3.0, 1.0, 1.0);
  ranking.id = seed_id(0x700);
  ranking.choices = choices(0x710, &[("hw1", "Lexer"), ("hw2", "Parser"), ("hw3", "Interpreter")]);

  vec![SurveyDraft {
    id: Some(SEED_SURVEY_ID),
    title: "Course feedback".into(),
    description: "End-of-term feedback for the compilers course.".into(),
    questions: vec![section, hours, topics, rating, word, comments, ranking],
    group_by: Some(1),
  }]
}
