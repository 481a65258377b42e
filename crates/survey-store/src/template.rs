//! Template cloning
//!
//! Public questionnaires of any researcher form a catalogue. Cloning copies a
//! catalogue entry, with all its questions and alternatives, into a target
//! research owned by the caller. Every copy is re-parented and re-owned, and
//! the copied questionnaire is tagged `template`.

use crate::guard::ResearchScope;
use crate::tables::Tables;
use survey_core::lifecycle;
use survey_core::{
    NewAlternative, NewQuestion, NewQuestionnaire, Publicity, Questionnaire, QuestionnaireId,
    SurveyResult,
};

impl Tables {
    /// Deep-copy each public questionnaire in `sources` under the target research.
    ///
    /// Any missing or non-public source fails the whole call with
    /// `NotFoundOrForbidden`; run inside a transaction so earlier copies of
    /// the same call are discarded.
    pub fn clone_templates(
        &mut self,
        target: ResearchScope,
        sources: &[QuestionnaireId],
    ) -> SurveyResult<Vec<Questionnaire>> {
        let research = self.research_in(target)?.clone();
        lifecycle::ensure_open(research.state)?;

        let mut created = Vec::with_capacity(sources.len());
        for source_id in sources {
            let source = self.public_questionnaire(*source_id)?.clone();
            let questions = self.questions_sorted(source.id);

            let copy = self.push_questionnaire(
                &research,
                NewQuestionnaire::new(source.title, Publicity::Template),
            );
            for question in questions {
                let alternatives = self.alternatives_of(question.id);
                let question_copy = self.push_question(
                    &copy,
                    NewQuestion::new(question.query, question.order).with_kind(question.kind),
                );
                for alternative in alternatives {
                    self.push_alternative(
                        &question_copy,
                        NewAlternative::new(alternative.kind, alternative.text, alternative.value),
                    );
                }
            }
            tracing::debug!(source = %source_id, copy = %copy.id, "questionnaire cloned");
            created.push(copy);
        }
        Ok(created)
    }
}
