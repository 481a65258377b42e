//! Explicit cascading deletes
//!
//! Descendants are removed bottom-up: answers of an alternative, then
//! alternatives, questions, questionnaires and finally the research with its
//! remaining answers and enrollments. Callers run these inside a store
//! transaction so a failure leaves nothing half-deleted.

use crate::guard::{AlternativeScope, QuestionScope, QuestionnaireScope, ResearchScope};
use crate::tables::Tables;
use serde::Serialize;
use survey_core::{AlternativeId, AnswerId, QuestionId, QuestionnaireId, SurveyResult};

/// Rows removed by one delete, per entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub researches: usize,
    pub questionnaires: usize,
    pub questions: usize,
    pub alternatives: usize,
    pub answers: usize,
    pub enrollments: usize,
}

impl CascadeReport {
    /// Total rows removed
    #[must_use]
    pub fn total(&self) -> usize {
        self.researches
            + self.questionnaires
            + self.questions
            + self.alternatives
            + self.answers
            + self.enrollments
    }
}

impl Tables {
    pub fn delete_research(&mut self, scope: ResearchScope) -> SurveyResult<CascadeReport> {
        self.research_in(scope)?;
        let mut report = CascadeReport::default();

        let questionnaires = self.questionnaire_ids_of(scope.research);
        self.purge_questionnaires(&questionnaires, &mut report);

        let orphaned: Vec<AnswerId> = self
            .answers
            .values()
            .filter(|a| a.research_id == scope.research)
            .map(|a| a.id)
            .collect();
        for id in orphaned {
            self.answers.remove(&id);
            report.answers += 1;
        }

        let members: Vec<_> = self
            .enrollments
            .iter()
            .filter(|e| e.research_id == scope.research)
            .copied()
            .collect();
        for enrollment in members {
            self.enrollments.remove(&enrollment);
            report.enrollments += 1;
        }

        if self.researches.remove(&scope.research).is_some() {
            report.researches += 1;
        }
        Ok(report)
    }

    pub fn delete_questionnaire(&mut self, scope: QuestionnaireScope) -> SurveyResult<CascadeReport> {
        self.questionnaire_in(scope)?;
        let mut report = CascadeReport::default();
        self.purge_questionnaires(&[scope.questionnaire], &mut report);
        Ok(report)
    }

    pub fn delete_question(&mut self, scope: QuestionScope) -> SurveyResult<CascadeReport> {
        self.question_in(scope)?;
        let mut report = CascadeReport::default();
        self.purge_questions(&[scope.question], &mut report);
        Ok(report)
    }

    pub fn delete_alternative(&mut self, scope: AlternativeScope) -> SurveyResult<CascadeReport> {
        self.alternative_in(scope)?;
        let mut report = CascadeReport::default();
        self.purge_alternatives(&[scope.alternative], &mut report);
        Ok(report)
    }

    fn purge_questionnaires(&mut self, ids: &[QuestionnaireId], report: &mut CascadeReport) {
        for id in ids {
            let questions = self.question_ids_of(*id);
            self.purge_questions(&questions, report);
            if self.questionnaires.remove(id).is_some() {
                report.questionnaires += 1;
            }
        }
    }

    fn purge_questions(&mut self, ids: &[QuestionId], report: &mut CascadeReport) {
        for id in ids {
            let alternatives = self.alternative_ids_of(*id);
            self.purge_alternatives(&alternatives, report);
            if self.questions.remove(id).is_some() {
                report.questions += 1;
            }
        }
    }

    fn purge_alternatives(&mut self, ids: &[AlternativeId], report: &mut CascadeReport) {
        for id in ids {
            let answers: Vec<AnswerId> = self
                .answers
                .values()
                .filter(|a| a.alternative_id == *id)
                .map(|a| a.id)
                .collect();
            for answer in answers {
                self.answers.remove(&answer);
                report.answers += 1;
            }
            if self.alternatives.remove(id).is_some() {
                report.alternatives += 1;
            }
        }
    }
}
