//! Answer collection, usage time and the reporting join

use crate::guard::ResearchScope;
use crate::tables::Tables;
use chrono::{DateTime, Utc};
use survey_core::lifecycle;
use survey_core::{
    AlternativeAnswer, AnswerInput, AnswerRow, ResearchId, SubjectId, SurveyError, SurveyResult,
    UsageTime, UsageTimeInput,
};

impl Tables {
    /// Store a batch of answers for an enrolled subject.
    ///
    /// The whole batch is checked before any row is written: the research must
    /// be active and every alternative must sit under it. Resubmitting appends
    /// new rows.
    pub fn submit_answers(
        &mut self,
        subject: SubjectId,
        research: ResearchId,
        inputs: Vec<AnswerInput>,
    ) -> SurveyResult<Vec<AlternativeAnswer>> {
        let target = self.enrolled_research(subject, research)?;
        lifecycle::ensure_collecting(target.state)?;
        if inputs.is_empty() {
            return Err(SurveyError::payload("answer batch is empty"));
        }
        if inputs
            .iter()
            .any(|input| self.research_of_alternative(input.alternative_id) != Some(research))
        {
            return Err(SurveyError::NotFoundOrForbidden);
        }

        let mut stored = Vec::with_capacity(inputs.len());
        for input in inputs {
            let answer = AlternativeAnswer::record(self.next_answer_id(), subject, research, input);
            self.answers.insert(answer.id, answer.clone());
            stored.push(answer);
        }
        Ok(stored)
    }

    pub fn record_usage_time(
        &mut self,
        subject: SubjectId,
        input: UsageTimeInput,
        now: DateTime<Utc>,
    ) -> SurveyResult<UsageTime> {
        if self.subject(subject).is_none() {
            return Err(SurveyError::NotFoundOrForbidden);
        }
        let sample = UsageTime {
            id: self.next_usage_time_id(),
            subject_id: subject,
            collected_at: input.collected_at.unwrap_or(now),
            duration_secs: input.duration_secs,
        };
        self.usage_times.insert(sample.id, sample.clone());
        Ok(sample)
    }

    /// Usage samples of a subject, oldest first
    #[must_use]
    pub fn usage_times_of(&self, subject: SubjectId) -> Vec<UsageTime> {
        let mut samples: Vec<UsageTime> = self
            .usage_times
            .values()
            .filter(|u| u.subject_id == subject)
            .cloned()
            .collect();
        samples.sort_by_key(|u| (u.collected_at, u.id));
        samples
    }

    /// Answers of an owned research joined with their alternative, placeholders excluded
    pub fn answer_rows(&self, scope: ResearchScope) -> SurveyResult<Vec<AnswerRow>> {
        self.research_in(scope)?;
        Ok(self.answer_rows_unscoped(scope.research))
    }

    /// Same join without an owner check; empty for an unknown research
    #[must_use]
    pub fn answer_rows_unscoped(&self, research: ResearchId) -> Vec<AnswerRow> {
        let Some(target) = self.researches.get(&research) else {
            return Vec::new();
        };
        self.answers
            .values()
            .filter(|a| a.research_id == research)
            .filter_map(|answer| {
                let alternative = self.alternatives.get(&answer.alternative_id)?;
                (!alternative.is_placeholder()).then(|| AnswerRow {
                    research_title: target.title.clone(),
                    alternative_text: alternative.text.clone(),
                    alternative_value: alternative.value,
                    answer_alternative: answer.alternative.clone(),
                    answer_text: answer.text.clone(),
                })
            })
            .collect()
    }
}
