//! Response summarization.
//!
//! `summarize` turns one session's persisted submissions into per-question
//! aggregates. The aggregation is chosen by question type; when the survey names a
//! grouping question, every other question is summarized again per bucket of
//! submissions that picked each of its choices.
//!
//! Numeric stats are population statistics and are `None` (JSON `null`) when there
//! is nothing to aggregate, so output never contains NaN.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::domain::{ChoiceId, Question, QuestionId, Response, Submission, SubmissionId, Survey};
use crate::error::InvariantViolation;
use crate::protocol::{question_out, survey_out, QuestionOut, SurveyOut};
use crate::schema::QuestionType;
use crate::util::parse_numeric_description;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct NumericStats {
  pub min: Option<f64>,
  pub max: Option<f64>,
  pub mean: Option<f64>,
  pub median: Option<f64>,
}

impl NumericStats {
  pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
    let mut v: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
      return Self::default();
    }
    v.sort_by(f64::total_cmp);
    let n = v.len();
    let mean = v.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
      v[n / 2]
    } else {
      (v[n / 2 - 1] + v[n / 2]) / 2.0
    };
    Self {
      min: Some(v[0]),
      max: Some(v[n - 1]),
      mean: Some(mean),
      median: Some(median),
    }
  }
}

/// Per-choice tally. `numeric` only for multiple choice questions whose every
/// choice description is a number; its fields sit beside `count` when present.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChoiceCounts {
  pub count: BTreeMap<ChoiceId, u64>,
  #[serde(flatten)]
  pub numeric: Option<NumericStats>,
}

/// Aggregate for one question over some set of responses.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryDetail {
  /// Multiple choice, checkboxes, dropdown.
  Choices(ChoiceCounts),
  Numeric(NumericStats),
  Text {
    answers: Vec<String>,
  },
  Ranking {
    ranking: BTreeMap<ChoiceId, NumericStats>,
  },
}

impl SummaryDetail {
  pub fn count(&self) -> Option<&BTreeMap<ChoiceId, u64>> {
    match self {
      SummaryDetail::Choices(c) => Some(&c.count),
      _ => None,
    }
  }

  pub fn stats(&self) -> Option<&NumericStats> {
    match self {
      SummaryDetail::Choices(c) => c.numeric.as_ref(),
      SummaryDetail::Numeric(stats) => Some(stats),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct QuestionSummary {
  pub question: QuestionOut,
  pub all: SummaryDetail,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub by_group: Option<BTreeMap<ChoiceId, SummaryDetail>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Summary {
  pub submission_count: usize,
  pub survey: SurveyOut,
  pub group_by_question: Option<QuestionOut>,
  pub question_summary: Vec<QuestionSummary>,
}

impl Summary {
  pub fn for_question(&self, id: QuestionId) -> Option<&QuestionSummary> {
    self.question_summary.iter().find(|s| s.question.id == id)
  }
}

type Indexed<'a> = Vec<(SubmissionId, &'a Response)>;

/// Responses per question, in submission order.
fn index_responses(submissions: &[Submission]) -> HashMap<QuestionId, Indexed<'_>> {
  let mut index: HashMap<QuestionId, Indexed<'_>> = HashMap::new();
  for s in submissions {
    for r in &s.responses {
      index.entry(r.question).or_default().push((s.id, r));
    }
  }
  index
}

/// Submission ids per choice of the grouping question.
fn partition(
  group: &Question,
  responses: &[(SubmissionId, &Response)],
) -> Result<BTreeMap<ChoiceId, HashSet<SubmissionId>>, InvariantViolation> {
  let mut buckets: BTreeMap<ChoiceId, HashSet<SubmissionId>> =
    group.choices.iter().map(|c| (c.id, HashSet::new())).collect();
  for (submission, r) in responses {
    let choice = expect_choice(group, r)?;
    buckets
      .get_mut(&choice)
      .ok_or(InvariantViolation::UnknownChoice { question: group.id, choice })?
      .insert(*submission);
  }
  Ok(buckets)
}

fn expect_choice(q: &Question, r: &Response) -> Result<ChoiceId, InvariantViolation> {
  r.answer
    .choice()
    .ok_or(InvariantViolation::AnswerShape { question: q.id, kind: q.kind })
}

fn expect_numeric(q: &Question, r: &Response) -> Result<f64, InvariantViolation> {
  r.answer
    .numeric_value()
    .ok_or(InvariantViolation::AnswerShape { question: q.id, kind: q.kind })
}

fn tally(q: &Question, responses: &[&Response]) -> Result<BTreeMap<ChoiceId, u64>, InvariantViolation> {
  let mut count: BTreeMap<ChoiceId, u64> = q.choices.iter().map(|c| (c.id, 0)).collect();
  for r in responses {
    let choice = expect_choice(q, r)?;
    *count
      .get_mut(&choice)
      .ok_or(InvariantViolation::UnknownChoice { question: q.id, choice })? += 1;
  }
  Ok(count)
}

/// Choice descriptions as numbers, only if every one of them parses.
pub fn numeric_choice_values(q: &Question) -> Option<HashMap<ChoiceId, f64>> {
  q.choices
    .iter()
    .map(|c| parse_numeric_description(&c.description).map(|v| (c.id, v)))
    .collect()
}

/// Aggregate one question's responses according to its type.
pub fn summarize_question(q: &Question, responses: &[&Response]) -> Result<SummaryDetail, InvariantViolation> {
  let detail = match q.kind {
    QuestionType::MultiChoice => {
      let count = tally(q, responses)?;
      let numeric = match numeric_choice_values(q) {
        Some(values) => {
          let mut selected = Vec::with_capacity(responses.len());
          for r in responses {
            let choice = expect_choice(q, r)?;
            if let Some(v) = values.get(&choice) {
              selected.push(*v);
            }
          }
          Some(NumericStats::from_values(selected))
        }
        None => None,
      };
      SummaryDetail::Choices(ChoiceCounts { count, numeric })
    }
    QuestionType::Checkboxes | QuestionType::Dropdown => SummaryDetail::Choices(ChoiceCounts {
      count: tally(q, responses)?,
      numeric: None,
    }),
    QuestionType::Scale => {
      let values = responses
        .iter()
        .map(|r| expect_numeric(q, r))
        .collect::<Result<Vec<_>, _>>()?;
      SummaryDetail::Numeric(NumericStats::from_values(values))
    }
    QuestionType::ShortAnswer | QuestionType::Paragraph => {
      let answers = responses
        .iter()
        .map(|r| {
          r.answer
            .text()
            .map(str::to_string)
            .ok_or(InvariantViolation::AnswerShape { question: q.id, kind: q.kind })
        })
        .collect::<Result<Vec<_>, _>>()?;
      SummaryDetail::Text { answers }
    }
    QuestionType::Ranking => {
      let mut per_choice: BTreeMap<ChoiceId, Vec<f64>> = q.choices.iter().map(|c| (c.id, Vec::new())).collect();
      for r in responses {
        let choice = expect_choice(q, r)?;
        let value = expect_numeric(q, r)?;
        per_choice
          .get_mut(&choice)
          .ok_or(InvariantViolation::UnknownChoice { question: q.id, choice })?
          .push(value);
      }
      SummaryDetail::Ranking {
        ranking: per_choice
          .into_iter()
          .map(|(choice, values)| (choice, NumericStats::from_values(values)))
          .collect(),
      }
    }
  };
  Ok(detail)
}

/// Summarize one session. `submissions` must all belong to that session; they are
/// read once and not re-fetched.
pub fn summarize(survey: &Survey, submissions: &[Submission]) -> Result<Summary, InvariantViolation> {
  let index = index_responses(submissions);
  let empty: Indexed<'_> = Vec::new();

  let group = match survey.group_by_question {
    Some(id) => {
      let q = survey.group_by().ok_or(InvariantViolation::MissingGroupingQuestion {
        survey: survey.id,
        question: id,
      })?;
      let buckets = partition(q, index.get(&q.id).unwrap_or(&empty))?;
      let grouped: HashSet<SubmissionId> = buckets.values().flatten().copied().collect();
      let ungrouped = submissions.iter().filter(|s| !grouped.contains(&s.id)).count();
      if ungrouped > 0 {
        debug!(target: "summary", survey = %survey.id, ungrouped, "Submissions without a group answer are left out of by_group");
      }
      Some((q, buckets))
    }
    None => None,
  };

  let mut question_summary = Vec::with_capacity(survey.questions.len());
  for question in &survey.questions {
    if group.as_ref().is_some_and(|(g, _)| g.id == question.id) {
      continue;
    }
    let indexed = index.get(&question.id).unwrap_or(&empty);
    let responses: Vec<&Response> = indexed.iter().map(|(_, r)| *r).collect();
    let all = summarize_question(question, &responses)?;

    let by_group = match &group {
      Some((_, buckets)) => {
        let mut per_group = BTreeMap::new();
        for (choice, members) in buckets {
          let scoped: Vec<&Response> = indexed
            .iter()
            .filter(|(s, _)| members.contains(s))
            .map(|(_, r)| *r)
            .collect();
          per_group.insert(*choice, summarize_question(question, &scoped)?);
        }
        Some(per_group)
      }
      None => None,
    };

    question_summary.push(QuestionSummary {
      question: question_out(question),
      all,
      by_group,
    });
  }

  Ok(Summary {
    submission_count: submissions.len(),
    survey: survey_out(survey),
    group_by_question: group.as_ref().map(|(g, _)| question_out(g)),
    question_summary,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Answer;
  use crate::schema::{QuestionDraft, SurveyDraft};
  use crate::validator::validate_and_build;
  use chrono::Utc;
  use uuid::Uuid;

  fn survey_with(questions: Vec<QuestionDraft>, group_by: Option<i64>) -> Survey {
    SurveyDraft { id: None, title: "summary".into(), description: String::new(), questions, group_by }
      .build()
      .expect("valid survey")
  }

  fn submit(survey: &Survey, drafts: Vec<crate::domain::ResponseDraft>) -> Submission {
    Submission {
      id: Uuid::new_v4(),
      session_id: Uuid::nil(),
      submitted_at: Utc::now(),
      responses: validate_and_build(survey, &drafts).expect("valid submission"),
    }
  }

  #[test]
  fn stats_are_population_and_null_when_empty() {
    assert_eq!(NumericStats::from_values(Vec::new()), NumericStats::default());
    let s = NumericStats::from_values([4.0, 1.0, 3.0, 2.0]);
    assert_eq!(s.min, Some(1.0));
    assert_eq!(s.max, Some(4.0));
    assert_eq!(s.mean, Some(2.5));
    assert_eq!(s.median, Some(2.5));
    let json = serde_json::to_value(NumericStats::default()).expect("serialize");
    assert!(json["mean"].is_null());
  }

  #[test]
  fn multichoice_with_numeric_descriptions() {
    let survey = survey_with(
      vec![QuestionDraft::new(1, "Hours", QuestionType::MultiChoice)
        .required()
        .with_choices([("one", "1"), ("two", "2"), ("three", "3")])],
      None,
    );
    let q = &survey.questions[0];
    let (c1, c2, c3) = (q.choices[0].id, q.choices[1].id, q.choices[2].id);
    let subs: Vec<_> = [c1, c2, c2]
      .into_iter()
      .map(|c| submit(&survey, vec![crate::domain::ResponseDraft::choice(q.id, c)]))
      .collect();

    let summary = summarize(&survey, &subs).expect("summary");
    assert_eq!(summary.submission_count, 3);
    let all = &summary.question_summary[0].all;
    let count = all.count().expect("count");
    assert_eq!((count[&c1], count[&c2], count[&c3]), (1, 2, 0));
    let stats = all.stats().expect("numeric stats");
    assert_eq!(stats.min, Some(1.0));
    assert_eq!(stats.max, Some(2.0));
    assert!((stats.mean.unwrap_or_default() - 1.6667).abs() < 1e-3);
    assert_eq!(stats.median, Some(2.0));
  }

  #[test]
  fn multichoice_with_text_descriptions_has_no_stats() {
    let survey = survey_with(
      vec![QuestionDraft::new(1, "Colour", QuestionType::MultiChoice).with_choices([("r", "Red"), ("n", "3")])],
      None,
    );
    let q = &survey.questions[0];
    let subs = vec![submit(&survey, vec![crate::domain::ResponseDraft::choice(q.id, q.choices[1].id)])];
    let summary = summarize(&survey, &subs).expect("summary");
    let all = &summary.question_summary[0].all;
    assert!(all.stats().is_none());
    let json = serde_json::to_value(all).expect("serialize");
    assert!(json.get("mean").is_none());
    assert!(json.get("count").is_some());
  }

  #[test]
  fn empty_session_yields_zero_counts_and_nulls() {
    let survey = survey_with(
      vec![
        QuestionDraft::new(1, "Topics", QuestionType::Checkboxes).with_choices([("a", "A"), ("b", "B")]),
        QuestionDraft::new(2, "Rate", QuestionType::Scale).with_range(1.0, 10.0, 5.0, 1.0),
        QuestionDraft::new(3, "Notes", QuestionType::Paragraph),
        QuestionDraft::new(4, "Rank", QuestionType::Ranking)
          .with_choices([("x", "X"), ("y", "Y")])
          .with_range(1.0, 2.0, 1.0, 1.0),
      ],
      None,
    );
    let summary = summarize(&survey, &[]).expect("summary");
    assert_eq!(summary.submission_count, 0);
    let details: Vec<_> = summary.question_summary.iter().map(|s| &s.all).collect();
    assert!(details[0].count().expect("count").values().all(|&n| n == 0));
    assert_eq!(details[1].stats(), Some(&NumericStats::default()));
    assert_eq!(details[2], &SummaryDetail::Text { answers: vec![] });
    match details[3] {
      SummaryDetail::Ranking { ranking } => {
        assert_eq!(ranking.len(), 2);
        assert!(ranking.values().all(|s| *s == NumericStats::default()));
      }
      other => panic!("unexpected detail {other:?}"),
    }
    let text = serde_json::to_string(&summary).expect("serialize");
    assert!(!text.contains("NaN"));
  }

  #[test]
  fn text_answers_keep_submission_order_and_ranking_splits_by_choice() {
    let survey = survey_with(
      vec![
        QuestionDraft::new(1, "Word", QuestionType::ShortAnswer),
        QuestionDraft::new(2, "Rank", QuestionType::Ranking)
          .with_choices([("x", "X"), ("y", "Y")])
          .with_range(1.0, 2.0, 1.0, 1.0),
      ],
      None,
    );
    let (word, rank) = (&survey.questions[0], &survey.questions[1]);
    let (x, y) = (rank.choices[0].id, rank.choices[1].id);
    use crate::domain::ResponseDraft as D;
    let subs = vec![
      submit(&survey, vec![D::text(word.id, "great"), D::ranked(rank.id, x, 1.0), D::ranked(rank.id, y, 2.0)]),
      submit(&survey, vec![D::text(word.id, "fine"), D::ranked(rank.id, x, 2.0), D::ranked(rank.id, y, 1.0)]),
      submit(&survey, vec![D::ranked(rank.id, x, 1.0), D::ranked(rank.id, y, 2.0)]),
    ];
    let summary = summarize(&survey, &subs).expect("summary");
    assert_eq!(
      summary.question_summary[0].all,
      SummaryDetail::Text { answers: vec!["great".into(), "fine".into()] }
    );
    match &summary.question_summary[1].all {
      SummaryDetail::Ranking { ranking } => {
        assert_eq!(ranking[&x].median, Some(1.0));
        assert_eq!(ranking[&y].max, Some(2.0));
        assert!((ranking[&y].mean.unwrap_or_default() - 5.0 / 3.0).abs() < 1e-9);
      }
      other => panic!("unexpected detail {other:?}"),
    }
  }

  #[test]
  fn grouped_summary_partitions_submissions() {
    let survey = survey_with(
      vec![
        QuestionDraft::new(1, "Section", QuestionType::Dropdown)
          .required()
          .with_choices([("g1", "G1"), ("g2", "G2")]),
        QuestionDraft::new(2, "Topics", QuestionType::Checkboxes).with_choices([("a", "A"), ("b", "B")]),
        QuestionDraft::new(3, "Pick", QuestionType::MultiChoice)
          .required()
          .with_choices([("y", "Yes"), ("n", "No")]),
      ],
      Some(1),
    );
    let (section, topics, pick) = (&survey.questions[0], &survey.questions[1], &survey.questions[2]);
    let (g1, g2) = (section.choices[0].id, section.choices[1].id);
    use crate::domain::ResponseDraft as D;
    let subs = vec![
      submit(&survey, vec![D::choice(section.id, g1), D::choice(pick.id, pick.choices[0].id)]),
      submit(&survey, vec![D::choice(section.id, g1), D::choice(pick.id, pick.choices[1].id)]),
      submit(&survey, vec![D::choice(section.id, g2), D::choice(pick.id, pick.choices[0].id)]),
    ];

    let summary = summarize(&survey, &subs).expect("summary");
    assert_eq!(summary.group_by_question.as_ref().map(|q| q.id), Some(section.id));
    assert_eq!(summary.question_summary.len(), 2);
    assert!(summary.for_question(section.id).is_none());

    let pick_summary = summary.for_question(pick.id).expect("pick summary");
    let by_group = pick_summary.by_group.as_ref().expect("grouped");
    let total = |d: &SummaryDetail| d.count().map(|c| c.values().sum::<u64>()).unwrap_or(0);
    assert_eq!(total(&by_group[&g1]), 2);
    assert_eq!(total(&by_group[&g2]), 1);
    assert_eq!(total(&by_group[&g1]) + total(&by_group[&g2]), total(&pick_summary.all));

    let topics_summary = summary.for_question(topics.id).expect("topics summary");
    assert_eq!(topics_summary.by_group.as_ref().map(|g| g.len()), Some(2));
  }

  #[test]
  fn skipped_optional_group_question_is_left_out_of_buckets() {
    let survey = survey_with(
      vec![
        QuestionDraft::new(1, "Section", QuestionType::MultiChoice).with_choices([("g1", "G1"), ("g2", "G2")]),
        QuestionDraft::new(2, "Name", QuestionType::ShortAnswer).required(),
      ],
      Some(1),
    );
    let (section, name) = (&survey.questions[0], &survey.questions[1]);
    use crate::domain::ResponseDraft as D;
    let subs = vec![
      submit(&survey, vec![D::choice(section.id, section.choices[0].id), D::text(name.id, "ada")]),
      submit(&survey, vec![D::text(name.id, "bob")]),
    ];
    let summary = summarize(&survey, &subs).expect("summary");
    let s = summary.for_question(name.id).expect("name summary");
    assert_eq!(s.all, SummaryDetail::Text { answers: vec!["ada".into(), "bob".into()] });
    let groups = s.by_group.as_ref().expect("grouped");
    assert_eq!(groups[&section.choices[0].id], SummaryDetail::Text { answers: vec!["ada".into()] });
    assert_eq!(groups[&section.choices[1].id], SummaryDetail::Text { answers: vec![] });
  }

  #[test]
  fn corrupt_choice_is_an_invariant_violation() {
    let survey = survey_with(
      vec![QuestionDraft::new(1, "Topics", QuestionType::Checkboxes).with_choices([("a", "A")])],
      None,
    );
    let q = &survey.questions[0];
    let stray = Uuid::new_v4();
    let sub = Submission {
      id: Uuid::new_v4(),
      session_id: Uuid::nil(),
      submitted_at: Utc::now(),
      responses: vec![Response { question: q.id, answer: Answer::Choice { choice: stray } }],
    };
    let err = summarize(&survey, &[sub]).expect_err("corrupt");
    assert_eq!(err, InvariantViolation::UnknownChoice { question: q.id, choice: stray });
  }

  #[test]
  fn grouped_json_shape() {
    let survey = survey_with(
      vec![
        QuestionDraft::new(1, "Section", QuestionType::Dropdown).required().with_choices([("g1", "G1")]),
        QuestionDraft::new(2, "Rate", QuestionType::Scale).with_range(1.0, 5.0, 3.0, 1.0),
      ],
      Some(1),
    );
    let (section, rate) = (&survey.questions[0], &survey.questions[1]);
    use crate::domain::ResponseDraft as D;
    let subs = vec![submit(&survey, vec![D::choice(section.id, section.choices[0].id), D::numeric(rate.id, 4.0)])];
    let json = serde_json::to_value(summarize(&survey, &subs).expect("summary")).expect("serialize");
    assert_eq!(json["submission_count"], 1);
    assert_eq!(json["group_by_question"]["type"], "DP");
    let entry = &json["question_summary"][0];
    assert_eq!(entry["all"]["mean"], 4.0);
    assert_eq!(entry["by_group"][section.choices[0].id.to_string()]["median"], 4.0);
  }
}
