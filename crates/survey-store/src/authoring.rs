//! Researcher-side writes and listings under a scope
//!
//! Every write here first resolves its scope through the guard, then applies
//! the lifecycle rule for its level: research content changes only while
//! inactive, and no child may be added to a closed research.

use crate::guard::{AlternativeScope, QuestionScope, QuestionnaireScope, ResearchScope};
use crate::tables::Tables;
use chrono::{DateTime, Utc};
use survey_core::lifecycle::{self, StatusChange};
use survey_core::patch::validate_title;
use survey_core::{
    Alternative, AlternativePatch, NewAlternative, NewQuestion, NewQuestionnaire, Question,
    QuestionPatch, Questionnaire, QuestionnairePatch, QuestionnaireTree, Research, ResearchPatch,
    SurveyError, SurveyResult,
};

impl Tables {
    /// Apply a content patch to an inactive research.
    pub fn update_research(
        &mut self,
        scope: ResearchScope,
        patch: ResearchPatch,
        issue_code: impl FnOnce() -> String,
    ) -> SurveyResult<Research> {
        let research = self.research_in_mut(scope)?;
        patch.apply(research, issue_code)?;
        Ok(research.clone())
    }

    /// Advance the research one lifecycle step.
    pub fn toggle_research(
        &mut self,
        scope: ResearchScope,
        now: DateTime<Utc>,
    ) -> SurveyResult<StatusChange> {
        let research = self.research_in_mut(scope)?;
        Ok(lifecycle::toggle(research, now)?)
    }

    // ---- questionnaires ----

    pub fn questionnaires_in(&self, scope: ResearchScope) -> SurveyResult<Vec<Questionnaire>> {
        self.research_in(scope)?;
        Ok(self
            .questionnaires
            .values()
            .filter(|q| q.research_id == scope.research && q.owner_id == scope.owner)
            .cloned()
            .collect())
    }

    /// Questionnaire trees of an owned research
    pub fn questionnaire_trees_in(&self, scope: ResearchScope) -> SurveyResult<Vec<QuestionnaireTree>> {
        self.research_in(scope)?;
        Ok(self.trees_of_research(scope.research))
    }

    pub fn insert_questionnaire(
        &mut self,
        scope: ResearchScope,
        draft: NewQuestionnaire,
    ) -> SurveyResult<Questionnaire> {
        let research = self.research_in(scope)?.clone();
        lifecycle::ensure_open(research.state)?;
        validate_title(&draft.title)?;
        Ok(self.push_questionnaire(&research, draft))
    }

    pub fn update_questionnaire(
        &mut self,
        scope: QuestionnaireScope,
        patch: QuestionnairePatch,
    ) -> SurveyResult<Questionnaire> {
        let questionnaire = self.questionnaire_in_mut(scope)?;
        patch.apply(questionnaire)?;
        Ok(questionnaire.clone())
    }

    // ---- questions ----

    /// Questions of an owned questionnaire, by position
    pub fn questions_in(&self, scope: QuestionnaireScope) -> SurveyResult<Vec<Question>> {
        self.questionnaire_in(scope)?;
        Ok(self.questions_sorted(scope.questionnaire))
    }

    pub fn insert_question(
        &mut self,
        scope: QuestionnaireScope,
        draft: NewQuestion,
    ) -> SurveyResult<Question> {
        lifecycle::ensure_open(self.research_in(scope.parent())?.state)?;
        let parent = self.questionnaire_in(scope)?.clone();
        if draft.query.trim().is_empty() {
            return Err(SurveyError::payload("query must not be blank"));
        }
        Ok(self.push_question(&parent, draft))
    }

    pub fn update_question(
        &mut self,
        scope: QuestionScope,
        patch: QuestionPatch,
    ) -> SurveyResult<Question> {
        let question = self.question_in_mut(scope)?;
        patch.apply(question)?;
        Ok(question.clone())
    }

    // ---- alternatives ----

    pub fn alternatives_in(&self, scope: QuestionScope) -> SurveyResult<Vec<Alternative>> {
        self.question_in(scope)?;
        Ok(self.alternatives_of(scope.question))
    }

    pub fn insert_alternative(
        &mut self,
        scope: QuestionScope,
        draft: NewAlternative,
    ) -> SurveyResult<Alternative> {
        lifecycle::ensure_open(self.research_in(scope.parent().parent())?.state)?;
        let parent = self.question_in(scope)?.clone();
        Ok(self.push_alternative(&parent, draft))
    }

    pub fn update_alternative(
        &mut self,
        scope: AlternativeScope,
        patch: AlternativePatch,
    ) -> SurveyResult<Alternative> {
        let alternative = self.alternative_in_mut(scope)?;
        patch.apply(alternative);
        Ok(alternative.clone())
    }
}
