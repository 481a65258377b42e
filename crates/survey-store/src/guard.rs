//! Scoped lookups
//!
//! A scope names the full ownership path of an entity: owner, research and
//! every intermediate parent. A lookup succeeds only if all links hold at
//! once; any failing link, or an absent row, yields `NotFoundOrForbidden`
//! so callers cannot tell "exists but not yours" from "does not exist".

use crate::tables::Tables;
use std::fmt;
use survey_core::{
    Alternative, AlternativeId, Question, QuestionId, Questionnaire, QuestionnaireId, Research,
    ResearchId, SubjectId, SurveyError, SurveyResult, UserId,
};

/// `(owner, research)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResearchScope {
    pub owner: UserId,
    pub research: ResearchId,
}

/// `(owner, research, questionnaire)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestionnaireScope {
    pub owner: UserId,
    pub research: ResearchId,
    pub questionnaire: QuestionnaireId,
}

/// `(owner, research, questionnaire, question)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestionScope {
    pub owner: UserId,
    pub research: ResearchId,
    pub questionnaire: QuestionnaireId,
    pub question: QuestionId,
}

/// `(owner, research, questionnaire, question, alternative)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlternativeScope {
    pub owner: UserId,
    pub research: ResearchId,
    pub questionnaire: QuestionnaireId,
    pub question: QuestionId,
    pub alternative: AlternativeId,
}

impl ResearchScope {
    #[inline]
    #[must_use]
    pub fn new(owner: UserId, research: ResearchId) -> Self {
        Self { owner, research }
    }

    #[inline]
    #[must_use]
    pub fn questionnaire(self, questionnaire: QuestionnaireId) -> QuestionnaireScope {
        QuestionnaireScope {
            owner: self.owner,
            research: self.research,
            questionnaire,
        }
    }
}

impl QuestionnaireScope {
    #[inline]
    #[must_use]
    pub fn parent(self) -> ResearchScope {
        ResearchScope::new(self.owner, self.research)
    }

    #[inline]
    #[must_use]
    pub fn question(self, question: QuestionId) -> QuestionScope {
        QuestionScope {
            owner: self.owner,
            research: self.research,
            questionnaire: self.questionnaire,
            question,
        }
    }
}

impl QuestionScope {
    #[inline]
    #[must_use]
    pub fn parent(self) -> QuestionnaireScope {
        QuestionnaireScope {
            owner: self.owner,
            research: self.research,
            questionnaire: self.questionnaire,
        }
    }

    #[inline]
    #[must_use]
    pub fn alternative(self, alternative: AlternativeId) -> AlternativeScope {
        AlternativeScope {
            owner: self.owner,
            research: self.research,
            questionnaire: self.questionnaire,
            question: self.question,
            alternative,
        }
    }
}

impl AlternativeScope {
    #[inline]
    #[must_use]
    pub fn parent(self) -> QuestionScope {
        QuestionScope {
            owner: self.owner,
            research: self.research,
            questionnaire: self.questionnaire,
            question: self.question,
        }
    }
}

impl fmt::Display for ResearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}/research:{}", self.owner, self.research)
    }
}

impl fmt::Display for QuestionnaireScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/questionnaire:{}", self.parent(), self.questionnaire)
    }
}

impl fmt::Display for QuestionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/question:{}", self.parent(), self.question)
    }
}

impl fmt::Display for AlternativeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/alternative:{}", self.parent(), self.alternative)
    }
}

const DENIED: SurveyError = SurveyError::NotFoundOrForbidden;

impl Tables {
    /// Research matching `id` and `owner`
    pub fn research_in(&self, scope: ResearchScope) -> SurveyResult<&Research> {
        self.researches
            .get(&scope.research)
            .filter(|r| r.owner_id == scope.owner)
            .ok_or(DENIED)
    }

    /// Questionnaire matching `id`, `research` and `owner`, under an owned research
    pub fn questionnaire_in(&self, scope: QuestionnaireScope) -> SurveyResult<&Questionnaire> {
        self.research_in(scope.parent())?;
        self.questionnaires
            .get(&scope.questionnaire)
            .filter(|q| q.research_id == scope.research && q.owner_id == scope.owner)
            .ok_or(DENIED)
    }

    /// Question matching the whole chain
    pub fn question_in(&self, scope: QuestionScope) -> SurveyResult<&Question> {
        self.questionnaire_in(scope.parent())?;
        self.questions
            .get(&scope.question)
            .filter(|q| q.questionnaire_id == scope.questionnaire && q.owner_id == scope.owner)
            .ok_or(DENIED)
    }

    /// Alternative matching the whole chain
    pub fn alternative_in(&self, scope: AlternativeScope) -> SurveyResult<&Alternative> {
        self.question_in(scope.parent())?;
        self.alternatives
            .get(&scope.alternative)
            .filter(|a| a.question_id == scope.question && a.owner_id == scope.owner)
            .ok_or(DENIED)
    }

    pub(crate) fn research_in_mut(&mut self, scope: ResearchScope) -> SurveyResult<&mut Research> {
        self.researches
            .get_mut(&scope.research)
            .filter(|r| r.owner_id == scope.owner)
            .ok_or(DENIED)
    }

    pub(crate) fn questionnaire_in_mut(
        &mut self,
        scope: QuestionnaireScope,
    ) -> SurveyResult<&mut Questionnaire> {
        self.research_in(scope.parent())?;
        self.questionnaires
            .get_mut(&scope.questionnaire)
            .filter(|q| q.research_id == scope.research && q.owner_id == scope.owner)
            .ok_or(DENIED)
    }

    pub(crate) fn question_in_mut(&mut self, scope: QuestionScope) -> SurveyResult<&mut Question> {
        self.questionnaire_in(scope.parent())?;
        self.questions
            .get_mut(&scope.question)
            .filter(|q| q.questionnaire_id == scope.questionnaire && q.owner_id == scope.owner)
            .ok_or(DENIED)
    }

    pub(crate) fn alternative_in_mut(
        &mut self,
        scope: AlternativeScope,
    ) -> SurveyResult<&mut Alternative> {
        self.question_in(scope.parent())?;
        self.alternatives
            .get_mut(&scope.alternative)
            .filter(|a| a.question_id == scope.question && a.owner_id == scope.owner)
            .ok_or(DENIED)
    }

    /// Research the subject is enrolled in
    pub fn enrolled_research(&self, subject: SubjectId, research: ResearchId) -> SurveyResult<&Research> {
        self.researches
            .get(&research)
            .filter(|_| self.is_enrolled(subject, research))
            .ok_or(DENIED)
    }

    /// Public questionnaire by id, regardless of owner
    pub fn public_questionnaire(&self, id: QuestionnaireId) -> SurveyResult<&Questionnaire> {
        self.questionnaires
            .get(&id)
            .filter(|q| q.publicity == survey_core::Publicity::Public)
            .ok_or(DENIED)
    }
}
