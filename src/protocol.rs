//! Serializable projections of the domain (serde ready).
//! Conditional fields are omitted when the question type doesn't take them, so
//! callers see the same shape a question or response was submitted with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Choice, ChoiceId, Question, QuestionId, Response, ResponseDraft, Session, SessionId,
    Submission, SubmissionId, Survey, SurveyId,
};
use crate::schema::{Field, QuestionType};

#[derive(Clone, Debug, Serialize)]
pub struct SurveyOut {
    pub id: SurveyId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub group_by_question: Option<QuestionId>,
}

#[derive(Clone, Debug, Serialize)]
pub struct QuestionOut {
    pub id: QuestionId,
    pub survey: SurveyId,
    pub number: i64,
    pub title: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_default: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResponseOut {
    pub question: QuestionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<ChoiceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubmissionOut {
    pub id: SubmissionId,
    pub session: SessionId,
    pub submission_time: DateTime<Utc>,
    pub responses: Vec<ResponseOut>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionOut {
    pub id: SessionId,
    pub survey: SurveyId,
    pub code: u32,
    pub created_at: DateTime<Utc>,
}

/// One entry of a submissions file fed to the CLI.
#[derive(Clone, Debug, Deserialize)]
pub struct SubmissionIn {
    pub survey: SurveyId,
    pub responses: Vec<ResponseDraft>,
}

pub fn survey_out(s: &Survey) -> SurveyOut {
    SurveyOut {
        id: s.id,
        title: s.title.clone(),
        description: s.description.clone(),
        created_at: s.created_at,
        group_by_question: s.group_by_question,
    }
}

pub fn question_out(q: &Question) -> QuestionOut {
    let ranged = q.kind.requires(Field::RangeMin);
    let range = q.range.filter(|_| ranged);
    QuestionOut {
        id: q.id,
        survey: q.survey_id,
        number: q.number,
        title: q.title.clone(),
        required: q.required,
        kind: q.kind,
        range_min: range.map(|r| r.min),
        range_max: range.map(|r| r.max),
        range_default: range.map(|r| r.default),
        range_step: range.map(|r| r.step),
        choices: q.kind.requires(Field::Choices).then(|| q.choices.clone()),
    }
}

pub fn response_out(r: &Response) -> ResponseOut {
    ResponseOut {
        question: r.question,
        choice: r.answer.choice(),
        text: r.answer.text().map(str::to_string),
        numeric_value: r.answer.numeric_value(),
    }
}

pub fn submission_out(s: &Submission) -> SubmissionOut {
    SubmissionOut {
        id: s.id,
        session: s.session_id,
        submission_time: s.submitted_at,
        responses: s.responses.iter().map(response_out).collect(),
    }
}

pub fn session_out(s: &Session) -> SessionOut {
    SessionOut {
        id: s.id,
        survey: s.survey_id,
        code: s.code,
        created_at: s.created_at,
    }
}
