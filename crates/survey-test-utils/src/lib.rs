//! Testing utilities for the survey workspace
//!
//! Shared fixtures: a handle on a pinned clock, registered accounts and a
//! populated research tree.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use survey_core::{
    Alternative, AnswerInput, NewAlternative, NewQuestion, NewQuestionnaire, NewResearch,
    NewSubject, NewUser, Publicity, QuestionId, QuestionnaireId, SubjectId, SubjectProfile, UserId,
};
use survey_service::config::AuthConfig;
use survey_service::prelude::*;
use survey_service::ManualClock;
use survey_store::ResearchScope;

pub const PASSWORD: &str = "correct horse battery staple";

/// Config with cheap hashing and a fixed signing key
pub fn fast_config() -> ServiceConfig {
    ServiceConfig {
        auth: AuthConfig {
            password_hash_rounds: 4,
            signing_seed: Some("2a".repeat(32)),
            ..AuthConfig::default()
        },
        ..ServiceConfig::default()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn setup_test_handle() -> (SurveyHandle, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let handle = SurveyHandle::with_clock(fast_config(), clock.clone()).unwrap();
    (handle, clock)
}

/// Register `{name}@example.org` as a researcher
pub fn researcher(handle: &SurveyHandle, name: &str) -> UserId {
    let token = handle
        .register_researcher(NewUser {
            username: format!("{name}@example.org"),
            full_name: Some(name.to_string()),
            password: PASSWORD.to_string(),
        })
        .unwrap();
    handle.authenticate_researcher(&token.access_token).unwrap()
}

/// Register `{name}@example.org` as a subject with `profile`
pub fn subject(handle: &SurveyHandle, name: &str, profile: SubjectProfile) -> SubjectId {
    let token = handle
        .register_subject(NewSubject {
            username: format!("{name}@example.org"),
            password: PASSWORD.to_string(),
            chosen_name: Some(name.to_string()),
            profile,
        })
        .unwrap();
    handle.authenticate_subject(&token.access_token).unwrap()
}

/// Ids of a research built by [`build_research`]
#[derive(Debug, Clone)]
pub struct ResearchTree {
    pub scope: ResearchScope,
    pub questionnaire: QuestionnaireId,
    pub questions: Vec<QuestionId>,
    pub alternatives: Vec<Vec<Alternative>>,
}

impl ResearchTree {
    /// First alternative of every question
    pub fn first_choices(&self) -> Vec<AnswerInput> {
        self.alternatives
            .iter()
            .filter_map(|alts| alts.first())
            .map(|a| AnswerInput::new(a.id, a.text.clone()))
            .collect()
    }

    pub fn all_alternatives(&self) -> impl Iterator<Item = &Alternative> {
        self.alternatives.iter().flatten()
    }
}

/// Research with one questionnaire and three questions of three alternatives each
pub fn build_research(
    handle: &SurveyHandle,
    owner: UserId,
    draft: NewResearch,
    publicity: Publicity,
) -> ResearchTree {
    let research = handle.create_research(owner, draft).unwrap();
    let scope = ResearchScope::new(owner, research.id);
    let questionnaire = handle
        .create_questionnaire(scope, NewQuestionnaire::new("Wellbeing", publicity))
        .unwrap();
    let qs = scope.questionnaire(questionnaire.id);

    let mut questions = Vec::new();
    let mut alternatives = Vec::new();
    for order in 1..=3 {
        let question = handle
            .create_question(
                qs,
                NewQuestion::new(format!("Question {order}"), order).with_kind("radio"),
            )
            .unwrap();
        let alts = (1..=3_i64)
            .map(|v| {
                handle
                    .create_alternative(
                        qs.question(question.id),
                        NewAlternative::new("radio", format!("Option {v}"), v),
                    )
                    .unwrap()
            })
            .collect();
        questions.push(question.id);
        alternatives.push(alts);
    }

    ResearchTree {
        scope,
        questionnaire: questionnaire.id,
        questions,
        alternatives,
    }
}

pub fn public_research(handle: &SurveyHandle, owner: UserId) -> ResearchTree {
    build_research(
        handle,
        owner,
        NewResearch::new("Sleep habits", Visibility::Public),
        Publicity::Private,
    )
}
