//! Operation traits implemented by [`crate::SurveyHandle`]
//!
//! Researcher operations take the owner id resolved from a researcher token
//! (or a scope built from it); subject operations take the subject id
//! resolved from a subject token. Scoped arguments are authorization checks:
//! anything outside the caller's ownership chain is `NotFoundOrForbidden`.

use crate::credentials::IssuedToken;
use std::io;
use survey_core::{
    Alternative, AlternativeAnswer, AlternativePatch, AnswerInput, AnswerRow, NewAlternative,
    NewQuestion, NewQuestionnaire, NewResearch, NewSubject, NewUser, Question, QuestionPatch,
    Questionnaire, QuestionnaireId, QuestionnairePatch, QuestionnaireTree, Research, ResearchId,
    ResearchPatch, Subject, SubjectId, SurveyResult, UsageTime, UsageTimeInput, User, UserId,
};
use survey_store::{
    AlternativeScope, CascadeReport, EnrollOutcome, QuestionScope, QuestionnaireScope,
    ResearchScope,
};

pub trait AccountManager {
    fn register_researcher(&self, new_user: NewUser) -> SurveyResult<IssuedToken>;
    fn register_subject(&self, new_subject: NewSubject) -> SurveyResult<IssuedToken>;
    fn login_researcher(&self, username: &str, password: &str) -> SurveyResult<IssuedToken>;
    fn login_subject(&self, username: &str, password: &str) -> SurveyResult<IssuedToken>;

    /// Researcher id named by a valid researcher token
    fn authenticate_researcher(&self, token: &str) -> SurveyResult<UserId>;
    /// Subject id named by a valid subject token
    fn authenticate_subject(&self, token: &str) -> SurveyResult<SubjectId>;

    fn current_researcher(&self, token: &str) -> SurveyResult<User>;
    fn current_subject(&self, token: &str) -> SurveyResult<Subject>;
}

pub trait ResearchOperations {
    fn list_researches(&self, owner: UserId) -> SurveyResult<Vec<Research>>;
    fn get_research(&self, owner: UserId, research: ResearchId) -> SurveyResult<Research>;
    fn create_research(&self, owner: UserId, draft: NewResearch) -> SurveyResult<Research>;
    fn update_research(
        &self,
        owner: UserId,
        research: ResearchId,
        patch: ResearchPatch,
    ) -> SurveyResult<Research>;
    /// `inactive -> active -> closed`
    fn toggle_status(&self, owner: UserId, research: ResearchId) -> SurveyResult<Research>;
    fn delete_research(&self, owner: UserId, research: ResearchId) -> SurveyResult<CascadeReport>;
}

pub trait QuestionnaireOperations {
    fn list_questionnaires(&self, scope: ResearchScope) -> SurveyResult<Vec<Questionnaire>>;
    /// Trees of every questionnaire of an owned research
    fn questionnaire_trees(&self, scope: ResearchScope) -> SurveyResult<Vec<QuestionnaireTree>>;
    fn get_questionnaire(&self, scope: QuestionnaireScope) -> SurveyResult<Questionnaire>;
    fn create_questionnaire(
        &self,
        scope: ResearchScope,
        draft: NewQuestionnaire,
    ) -> SurveyResult<Questionnaire>;
    fn update_questionnaire(
        &self,
        scope: QuestionnaireScope,
        patch: QuestionnairePatch,
    ) -> SurveyResult<Questionnaire>;
    fn delete_questionnaire(&self, scope: QuestionnaireScope) -> SurveyResult<CascadeReport>;

    /// Catalogue of public questionnaires, any owner
    fn public_questionnaires(&self) -> SurveyResult<Vec<QuestionnaireTree>>;
    /// Deep-copy catalogue entries into an owned research, all or nothing
    fn clone_templates(
        &self,
        target: ResearchScope,
        sources: &[QuestionnaireId],
    ) -> SurveyResult<Vec<Questionnaire>>;
}

pub trait QuestionOperations {
    fn list_questions(&self, scope: QuestionnaireScope) -> SurveyResult<Vec<Question>>;
    fn get_question(&self, scope: QuestionScope) -> SurveyResult<Question>;
    fn create_question(&self, scope: QuestionnaireScope, draft: NewQuestion) -> SurveyResult<Question>;
    fn update_question(&self, scope: QuestionScope, patch: QuestionPatch) -> SurveyResult<Question>;
    fn delete_question(&self, scope: QuestionScope) -> SurveyResult<CascadeReport>;
}

pub trait AlternativeOperations {
    fn list_alternatives(&self, scope: QuestionScope) -> SurveyResult<Vec<Alternative>>;
    fn get_alternative(&self, scope: AlternativeScope) -> SurveyResult<Alternative>;
    fn create_alternative(
        &self,
        scope: QuestionScope,
        draft: NewAlternative,
    ) -> SurveyResult<Alternative>;
    fn update_alternative(
        &self,
        scope: AlternativeScope,
        patch: AlternativePatch,
    ) -> SurveyResult<Alternative>;
    fn delete_alternative(&self, scope: AlternativeScope) -> SurveyResult<CascadeReport>;
}

pub trait SubjectOperations {
    /// Public, non-closed researches whose criteria admit the subject today
    fn discoverable_researches(&self, subject: SubjectId) -> SurveyResult<Vec<Research>>;
    fn enroll(
        &self,
        subject: SubjectId,
        research: ResearchId,
        access_code: Option<&str>,
    ) -> SurveyResult<EnrollOutcome>;
    fn enrolled_researches(&self, subject: SubjectId) -> SurveyResult<Vec<Research>>;
    fn subject_questionnaires(
        &self,
        subject: SubjectId,
        research: ResearchId,
    ) -> SurveyResult<Vec<QuestionnaireTree>>;
    fn submit_answers(
        &self,
        subject: SubjectId,
        research: ResearchId,
        answers: Vec<AnswerInput>,
    ) -> SurveyResult<Vec<AlternativeAnswer>>;
    fn record_usage_time(&self, subject: SubjectId, input: UsageTimeInput) -> SurveyResult<UsageTime>;
}

pub trait ReportingOperations {
    /// Answers joined with their alternative, placeholders excluded
    fn answers_of_research(&self, scope: ResearchScope) -> SurveyResult<Vec<AnswerRow>>;
    /// Write the same rows as CSV; returns the number of data rows
    fn export_answers<W: io::Write>(&self, scope: ResearchScope, sink: W) -> SurveyResult<usize>;
}
