//! Persistent-map tables holding every record
//!
//! `Tables` is cheap to clone: each table is an `im::OrdMap`, so a clone
//! shares structure with the original until one side writes. The store
//! relies on that to run a transaction against a private copy.

use im::{OrdMap, OrdSet};
use serde::{Deserialize, Serialize};
use survey_core::patch::validate_title;
use survey_core::{
    Alternative, AlternativeAnswer, AlternativeId, AnswerId, Enrollment, NewAlternative,
    NewQuestion, NewQuestionnaire, NewResearch, Publicity, Question, QuestionId, QuestionTree,
    Questionnaire, QuestionnaireId, QuestionnaireTree, Research, ResearchId, Subject, SubjectId,
    SubjectProfile, SurveyError, SurveyResult, UsageTime, UsageTimeId, User, UserId,
};

/// Last identifier handed out per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Sequences {
    user: u64,
    subject: u64,
    research: u64,
    questionnaire: u64,
    question: u64,
    alternative: u64,
    answer: u64,
    usage_time: u64,
}

fn bump(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

/// Every table of the survey database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tables {
    pub(crate) users: OrdMap<UserId, User>,
    pub(crate) subjects: OrdMap<SubjectId, Subject>,
    pub(crate) researches: OrdMap<ResearchId, Research>,
    pub(crate) questionnaires: OrdMap<QuestionnaireId, Questionnaire>,
    pub(crate) questions: OrdMap<QuestionId, Question>,
    pub(crate) alternatives: OrdMap<AlternativeId, Alternative>,
    pub(crate) answers: OrdMap<AnswerId, AlternativeAnswer>,
    pub(crate) usage_times: OrdMap<UsageTimeId, UsageTime>,
    pub(crate) enrollments: OrdSet<Enrollment>,
    pub(crate) sequences: Sequences,
}

/// Row counts, used by the CLI and logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub users: usize,
    pub subjects: usize,
    pub researches: usize,
    pub questionnaires: usize,
    pub questions: usize,
    pub alternatives: usize,
    pub answers: usize,
    pub usage_times: usize,
    pub enrollments: usize,
}

impl Tables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn counts(&self) -> TableCounts {
        TableCounts {
            users: self.users.len(),
            subjects: self.subjects.len(),
            researches: self.researches.len(),
            questionnaires: self.questionnaires.len(),
            questions: self.questions.len(),
            alternatives: self.alternatives.len(),
            answers: self.answers.len(),
            usage_times: self.usage_times.len(),
            enrollments: self.enrollments.len(),
        }
    }

    // ---- accounts ----

    /// Insert a researcher; usernames are unique.
    pub fn insert_user(
        &mut self,
        username: String,
        full_name: Option<String>,
        password_hash: String,
    ) -> SurveyResult<User> {
        if self.user_by_username(&username).is_some() {
            return Err(SurveyError::DuplicateIdentity(username));
        }
        let user = User {
            id: UserId(bump(&mut self.sequences.user)),
            username,
            full_name,
            password_hash,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Insert a subject; usernames are unique.
    pub fn insert_subject(
        &mut self,
        username: String,
        chosen_name: Option<String>,
        password_hash: String,
        profile: SubjectProfile,
    ) -> SurveyResult<Subject> {
        if self.subject_by_username(&username).is_some() {
            return Err(SurveyError::DuplicateIdentity(username));
        }
        let subject = Subject {
            id: SubjectId(bump(&mut self.sequences.subject)),
            username,
            chosen_name,
            password_hash,
            profile,
        };
        self.subjects.insert(subject.id, subject.clone());
        Ok(subject)
    }

    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    #[must_use]
    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.get(&id)
    }

    #[must_use]
    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username == username)
    }

    #[must_use]
    pub fn subject_by_username(&self, username: &str) -> Option<&Subject> {
        self.subjects.values().find(|s| s.username == username)
    }

    // ---- researches ----

    /// Create an inactive research owned by `owner`.
    pub fn insert_research(
        &mut self,
        owner: UserId,
        draft: NewResearch,
        code: Option<String>,
    ) -> SurveyResult<Research> {
        if !self.users.contains_key(&owner) {
            return Err(SurveyError::NotFoundOrForbidden);
        }
        validate_title(&draft.title)?;
        draft.criteria.validate()?;
        let id = ResearchId(bump(&mut self.sequences.research));
        let research = Research::new(id, owner, draft, code);
        self.researches.insert(id, research.clone());
        Ok(research)
    }

    /// Every research of `owner`, in id order
    #[must_use]
    pub fn researches_of(&self, owner: UserId) -> Vec<Research> {
        self.researches
            .values()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect()
    }

    /// Every research, in id order
    pub fn all_researches(&self) -> impl Iterator<Item = &Research> {
        self.researches.values()
    }

    /// Lookup without an ownership filter, for reporting over snapshots
    #[must_use]
    pub fn research_unscoped(&self, id: ResearchId) -> Option<&Research> {
        self.researches.get(&id)
    }

    // ---- raw child inserts; callers have already authorized the parent ----

    pub(crate) fn push_questionnaire(
        &mut self,
        parent: &Research,
        draft: NewQuestionnaire,
    ) -> Questionnaire {
        let id = QuestionnaireId(bump(&mut self.sequences.questionnaire));
        let questionnaire = Questionnaire::child_of(id, parent, draft);
        self.questionnaires.insert(id, questionnaire.clone());
        questionnaire
    }

    pub(crate) fn push_question(&mut self, parent: &Questionnaire, draft: NewQuestion) -> Question {
        let id = QuestionId(bump(&mut self.sequences.question));
        let question = Question::child_of(id, parent, draft);
        self.questions.insert(id, question.clone());
        question
    }

    pub(crate) fn push_alternative(
        &mut self,
        parent: &Question,
        draft: NewAlternative,
    ) -> Alternative {
        let id = AlternativeId(bump(&mut self.sequences.alternative));
        let alternative = Alternative::child_of(id, parent, draft);
        self.alternatives.insert(id, alternative.clone());
        alternative
    }

    pub(crate) fn next_answer_id(&mut self) -> AnswerId {
        AnswerId(bump(&mut self.sequences.answer))
    }

    pub(crate) fn next_usage_time_id(&mut self) -> UsageTimeId {
        UsageTimeId(bump(&mut self.sequences.usage_time))
    }

    // ---- child listings by foreign key ----

    pub(crate) fn questionnaire_ids_of(&self, research: ResearchId) -> Vec<QuestionnaireId> {
        self.questionnaires
            .values()
            .filter(|q| q.research_id == research)
            .map(|q| q.id)
            .collect()
    }

    pub(crate) fn question_ids_of(&self, questionnaire: QuestionnaireId) -> Vec<QuestionId> {
        self.questions
            .values()
            .filter(|q| q.questionnaire_id == questionnaire)
            .map(|q| q.id)
            .collect()
    }

    pub(crate) fn alternative_ids_of(&self, question: QuestionId) -> Vec<AlternativeId> {
        self.alternatives
            .values()
            .filter(|a| a.question_id == question)
            .map(|a| a.id)
            .collect()
    }

    /// Questions of a questionnaire by `order`, ties broken by id
    pub(crate) fn questions_sorted(&self, questionnaire: QuestionnaireId) -> Vec<Question> {
        let mut questions: Vec<Question> = self
            .questions
            .values()
            .filter(|q| q.questionnaire_id == questionnaire)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.order, q.id));
        questions
    }

    pub(crate) fn alternatives_of(&self, question: QuestionId) -> Vec<Alternative> {
        self.alternatives
            .values()
            .filter(|a| a.question_id == question)
            .cloned()
            .collect()
    }

    /// Research an alternative ultimately belongs to
    pub(crate) fn research_of_alternative(&self, id: AlternativeId) -> Option<ResearchId> {
        let alternative = self.alternatives.get(&id)?;
        let question = self.questions.get(&alternative.question_id)?;
        let questionnaire = self.questionnaires.get(&question.questionnaire_id)?;
        Some(questionnaire.research_id)
    }

    // ---- trees ----

    pub(crate) fn tree_of(&self, questionnaire: &Questionnaire) -> QuestionnaireTree {
        let questions = self
            .questions_sorted(questionnaire.id)
            .into_iter()
            .map(|question| QuestionTree {
                alternatives: self.alternatives_of(question.id),
                question,
            })
            .collect();
        QuestionnaireTree {
            questionnaire: questionnaire.clone(),
            questions,
        }
    }

    /// Trees of every questionnaire under `research`
    pub(crate) fn trees_of_research(&self, research: ResearchId) -> Vec<QuestionnaireTree> {
        self.questionnaires
            .values()
            .filter(|q| q.research_id == research)
            .map(|q| self.tree_of(q))
            .collect()
    }

    /// Catalogue of public questionnaires across all owners
    #[must_use]
    pub fn public_catalogue(&self) -> Vec<QuestionnaireTree> {
        self.questionnaires
            .values()
            .filter(|q| q.publicity == Publicity::Public)
            .map(|q| self.tree_of(q))
            .collect()
    }
}
