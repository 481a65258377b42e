//! Typed partial updates
//!
//! Each patch lists only the fields a client may change. Internal fields
//! (`state`, `owner_id`, foreign keys, timestamps, access code) have no
//! patch counterpart and can only move through dedicated operations.

use crate::eligibility::EligibilityCriteria;
use crate::error::{SurveyError, SurveyResult, TransitionError};
use crate::lifecycle;
use crate::types::{Alternative, Publicity, Question, Questionnaire, Research, Visibility};
use serde::{Deserialize, Serialize};

fn require_text(field: &str, value: &str) -> SurveyResult<()> {
    if value.trim().is_empty() {
        Err(SurveyError::payload(format!("{field} must not be blank")))
    } else {
        Ok(())
    }
}

/// Validate a title supplied at creation time.
pub fn validate_title(title: &str) -> SurveyResult<()> {
    require_text("title", title)
}

/// Updatable research content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    /// Replaces every eligibility bound at once
    pub criteria: Option<EligibilityCriteria>,
}

impl ResearchPatch {
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Merge into `research`. Only legal while the research is inactive.
    ///
    /// `issue_code` is called when the research becomes private without a code.
    pub fn apply(self, research: &mut Research, issue_code: impl FnOnce() -> String) -> SurveyResult<()> {
        lifecycle::ensure_editable(research.state)?;

        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(criteria) = &self.criteria {
            criteria.validate()?;
        }

        if let Some(title) = self.title {
            research.title = title;
        }
        if let Some(description) = self.description {
            research.description = description;
        }
        if let Some(criteria) = self.criteria {
            research.criteria = criteria;
        }
        if let Some(visibility) = self.visibility {
            research.visibility = visibility;
            match visibility {
                Visibility::Private if research.code.is_none() => research.code = Some(issue_code()),
                Visibility::Public => research.code = None,
                Visibility::Private => {}
            }
        }
        Ok(())
    }
}

/// Updatable questionnaire fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnairePatch {
    pub title: Option<String>,
    #[serde(rename = "public")]
    pub publicity: Option<Publicity>,
}

impl QuestionnairePatch {
    /// Merge into `questionnaire`. A template keeps its publicity.
    pub fn apply(self, questionnaire: &mut Questionnaire) -> SurveyResult<()> {
        if let Some(publicity) = self.publicity {
            if questionnaire.publicity == Publicity::Template && publicity != Publicity::Template {
                return Err(TransitionError::TemplatePublicityLocked.into());
            }
        }
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }

        if let Some(title) = self.title {
            questionnaire.title = title;
        }
        if let Some(publicity) = self.publicity {
            questionnaire.publicity = publicity;
        }
        Ok(())
    }
}

/// Updatable question fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionPatch {
    pub query: Option<String>,
    pub order: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl QuestionPatch {
    pub fn apply(self, question: &mut Question) -> SurveyResult<()> {
        if let Some(query) = &self.query {
            require_text("query", query)?;
        }
        if let Some(query) = self.query {
            question.query = query;
        }
        if let Some(order) = self.order {
            question.order = order;
        }
        if let Some(kind) = self.kind {
            question.kind = kind;
        }
        Ok(())
    }
}

/// Updatable alternative fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternativePatch {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
    pub value: Option<i64>,
}

impl AlternativePatch {
    pub fn apply(self, alternative: &mut Alternative) {
        if let Some(kind) = self.kind {
            alternative.kind = kind;
        }
        if let Some(text) = self.text {
            alternative.text = text;
        }
        if let Some(value) = self.value {
            alternative.value = value;
        }
    }
}
