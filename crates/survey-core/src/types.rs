//! Core records of the survey domain
//!
//! Defines:
//! - Integer surrogate identifiers for every entity
//! - Wire-named enums (visibility, lifecycle state, publicity)
//! - Persistent records and the payloads used to create them
//! - Read-side trees (questionnaire -> questions -> alternatives)
//!
//! Children of a research (questionnaire, question, alternative) are only
//! built through their `child_of` factory, which copies `owner_id` from the
//! parent record. Callers never supply an owner for a descendant.

use crate::eligibility::{EligibilityCriteria, SubjectProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw integer value
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Researcher account identifier
    UserId
);
surrogate_id!(
    /// Respondent account identifier
    SubjectId
);
surrogate_id!(
    /// Research identifier (root of the ownership chain)
    ResearchId
);
surrogate_id!(
    /// Questionnaire identifier
    QuestionnaireId
);
surrogate_id!(
    /// Question identifier
    QuestionId
);
surrogate_id!(
    /// Alternative identifier
    AlternativeId
);
surrogate_id!(
    /// Submitted answer identifier
    AnswerId
);
surrogate_id!(
    /// Usage-time sample identifier
    UsageTimeId
);

/// Who a research is listed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Discoverable by eligible subjects
    #[serde(rename = "publico")]
    Public,
    /// Reachable only through the access code
    #[serde(rename = "privado")]
    Private,
}

impl Visibility {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "publico",
            Visibility::Private => "privado",
        }
    }
}

/// Research lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResearchState {
    /// Being authored; content is editable
    #[serde(rename = "inativa")]
    Inactive,
    /// Collecting answers
    #[serde(rename = "ativa")]
    Active,
    /// Terminal
    #[serde(rename = "encerrada")]
    Closed,
}

impl ResearchState {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResearchState::Inactive => "inativa",
            ResearchState::Active => "ativa",
            ResearchState::Closed => "encerrada",
        }
    }
}

/// Publicity tag of a questionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Publicity {
    /// Visible to its owner only
    #[serde(rename = "privado")]
    Private,
    /// Listed in the template catalogue and cloneable
    #[serde(rename = "publico")]
    Public,
    /// Produced by cloning; publicity is locked
    #[serde(rename = "template")]
    Template,
}

impl Publicity {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Publicity::Private => "privado",
            Publicity::Public => "publico",
            Publicity::Template => "template",
        }
    }
}

/// Acting identity of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Principal {
    /// Research owner
    Researcher(UserId),
    /// Respondent
    Subject(SubjectId),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Researcher(id) => write!(f, "user:{id}"),
            Principal::Subject(id) => write!(f, "subject:{id}"),
        }
    }
}

/// Researcher account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub password_hash: String,
}

/// Respondent account with its demographic profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub username: String,
    pub chosen_name: Option<String>,
    pub password_hash: String,
    pub profile: SubjectProfile,
}

/// Root of the ownership hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Research {
    pub id: ResearchId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub visibility: Visibility,
    pub state: ResearchState,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub criteria: EligibilityCriteria,
    pub code: Option<String>,
}

impl Research {
    /// New research in the `inactive` state with no timestamps
    #[must_use]
    pub fn new(id: ResearchId, owner_id: UserId, draft: NewResearch, code: Option<String>) -> Self {
        Self {
            id,
            owner_id,
            title: draft.title,
            description: draft.description,
            visibility: draft.visibility,
            state: ResearchState::Inactive,
            start_time: None,
            end_time: None,
            criteria: draft.criteria,
            code,
        }
    }
}

/// Questionnaire attached to a research
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: QuestionnaireId,
    pub research_id: ResearchId,
    pub owner_id: UserId,
    pub title: String,
    #[serde(rename = "public")]
    pub publicity: Publicity,
}

impl Questionnaire {
    /// Build a questionnaire under `research`, inheriting its owner
    #[must_use]
    pub fn child_of(id: QuestionnaireId, research: &Research, draft: NewQuestionnaire) -> Self {
        Self {
            id,
            research_id: research.id,
            owner_id: research.owner_id,
            title: draft.title,
            publicity: draft.publicity,
        }
    }
}

/// Question of a questionnaire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub questionnaire_id: QuestionnaireId,
    pub owner_id: UserId,
    pub query: String,
    pub order: i32,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Question {
    /// Build a question under `questionnaire`, inheriting its owner
    #[must_use]
    pub fn child_of(id: QuestionId, questionnaire: &Questionnaire, draft: NewQuestion) -> Self {
        Self {
            id,
            questionnaire_id: questionnaire.id,
            owner_id: questionnaire.owner_id,
            query: draft.query,
            order: draft.order,
            kind: draft.kind,
        }
    }
}

/// Type tag of alternatives that only pad a question and never reach reports
pub const PLACEHOLDER_KIND: &str = "placeholder";

/// Answer option of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub id: AlternativeId,
    pub question_id: QuestionId,
    pub owner_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub value: i64,
}

impl Alternative {
    /// Build an alternative under `question`, inheriting its owner
    #[must_use]
    pub fn child_of(id: AlternativeId, question: &Question, draft: NewAlternative) -> Self {
        Self {
            id,
            question_id: question.id,
            owner_id: question.owner_id,
            kind: draft.kind,
            text: draft.text,
            value: draft.value,
        }
    }

    /// Whether this alternative is excluded from reporting views
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.kind.eq_ignore_ascii_case(PLACEHOLDER_KIND)
    }
}

/// One submitted response row; never mutated after insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeAnswer {
    pub id: AnswerId,
    pub alternative_id: AlternativeId,
    pub research_id: ResearchId,
    pub subject_id: SubjectId,
    /// Chosen alternative label
    pub alternative: String,
    /// Free-text complement
    pub text: Option<String>,
}

impl AlternativeAnswer {
    /// Tag a submitted triple with its subject and research
    #[must_use]
    pub fn record(
        id: AnswerId,
        subject_id: SubjectId,
        research_id: ResearchId,
        input: AnswerInput,
    ) -> Self {
        Self {
            id,
            alternative_id: input.alternative_id,
            research_id,
            subject_id,
            alternative: input.alternative,
            text: input.text,
        }
    }
}

/// Time a subject spent answering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTime {
    pub id: UsageTimeId,
    pub subject_id: SubjectId,
    pub collected_at: DateTime<Utc>,
    pub duration_secs: u64,
}

/// Research <-> subject membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Enrollment {
    pub subject_id: SubjectId,
    pub research_id: ResearchId,
}

/// Researcher registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
}

/// Respondent registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
    pub username: String,
    pub password: String,
    pub chosen_name: Option<String>,
    #[serde(default)]
    pub profile: SubjectProfile,
}

/// Research creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResearch {
    pub title: String,
    pub description: String,
    pub visibility: Visibility,
    #[serde(flatten, default)]
    pub criteria: EligibilityCriteria,
}

impl NewResearch {
    /// Unconstrained research draft
    #[must_use]
    pub fn new(title: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            visibility,
            criteria: EligibilityCriteria::default(),
        }
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With eligibility criteria
    #[must_use]
    pub fn with_criteria(mut self, criteria: EligibilityCriteria) -> Self {
        self.criteria = criteria;
        self
    }
}

/// Questionnaire creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestionnaire {
    pub title: String,
    #[serde(rename = "public")]
    pub publicity: Publicity,
}

impl NewQuestionnaire {
    #[must_use]
    pub fn new(title: impl Into<String>, publicity: Publicity) -> Self {
        Self {
            title: title.into(),
            publicity,
        }
    }
}

/// Question creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub query: String,
    pub order: i32,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl NewQuestion {
    #[must_use]
    pub fn new(query: impl Into<String>, order: i32) -> Self {
        Self {
            query: query.into(),
            order,
            kind: String::new(),
        }
    }

    /// With question type
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

/// Alternative creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlternative {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub value: i64,
}

impl NewAlternative {
    #[must_use]
    pub fn new(kind: impl Into<String>, text: impl Into<String>, value: i64) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            value,
        }
    }
}

/// One `(alternative, label, free text)` triple of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerInput {
    pub alternative_id: AlternativeId,
    pub alternative: String,
    pub text: Option<String>,
}

impl AnswerInput {
    #[must_use]
    pub fn new(alternative_id: AlternativeId, alternative: impl Into<String>) -> Self {
        Self {
            alternative_id,
            alternative: alternative.into(),
            text: None,
        }
    }

    /// With free-text complement
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Usage-time payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTimeInput {
    pub duration_secs: u64,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

/// Question with its alternatives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTree {
    #[serde(flatten)]
    pub question: Question,
    pub alternatives: Vec<Alternative>,
}

/// Questionnaire with its questions, ordered by position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionnaireTree {
    #[serde(flatten)]
    pub questionnaire: Questionnaire,
    pub questions: Vec<QuestionTree>,
}

impl QuestionnaireTree {
    /// Total alternatives across all questions
    #[must_use]
    pub fn alternative_count(&self) -> usize {
        self.questions.iter().map(|q| q.alternatives.len()).sum()
    }
}

/// Answer joined with its research title and alternative, as exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRow {
    #[serde(rename = "Pesquisa Nome")]
    pub research_title: String,
    #[serde(rename = "Alternativa Texto")]
    pub alternative_text: String,
    #[serde(rename = "Alternativa Valor")]
    pub alternative_value: i64,
    #[serde(rename = "Resposta Alternativa")]
    pub answer_alternative: String,
    #[serde(rename = "Resposta Texto")]
    pub answer_text: Option<String>,
}
