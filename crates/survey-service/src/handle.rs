//! Service handle
//!
//! `SurveyHandle` owns the store, credentials and clock and implements every
//! operation trait in [`crate::api`]. Mutations run in a store transaction and
//! are recorded in the audit chain whether they apply or are rejected.

use crate::api::*;
use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::credentials::{CredentialService, IssuedToken};
use crate::export;
use rand::Rng;
use std::fmt;
use std::io;
use std::sync::Arc;
use survey_core::identity::{parse_researcher_username, parse_subject_username, Identity};
use survey_core::*;
use survey_store::{
    AlternativeScope, AuditLog, CascadeReport, EnrollOutcome, EntityStore, Outcome, QuestionScope,
    QuestionnaireScope, ResearchScope,
};
use tracing::{debug, info, warn};

const ACCESS_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Main service handle that implements all operation traits
pub struct SurveyHandle {
    config: ServiceConfig,
    credentials: CredentialService,
    store: EntityStore,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SurveyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveyHandle")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("counts", &self.store.read(|t| t.counts()))
            .finish_non_exhaustive()
    }
}

impl SurveyHandle {
    /// Empty store on the system clock
    pub fn new(config: ServiceConfig) -> SurveyResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> SurveyResult<Self> {
        Self::with_store(config, EntityStore::new(), clock)
    }

    pub fn with_store(
        config: ServiceConfig,
        store: EntityStore,
        clock: Arc<dyn Clock>,
    ) -> SurveyResult<Self> {
        config.validate()?;
        let credentials = CredentialService::from_config(&config.auth)?;
        Ok(Self {
            config,
            credentials,
            store,
            clock,
        })
    }

    /// Load the configured snapshot when it exists, start empty otherwise.
    pub fn open(config: ServiceConfig) -> SurveyResult<Self> {
        let store = match &config.storage.snapshot_path {
            Some(path) if path.exists() => EntityStore::load_snapshot(path)?,
            _ => EntityStore::new(),
        };
        Self::with_store(config, store, Arc::new(SystemClock))
    }

    /// Write the configured snapshot; `false` when no path is configured.
    pub fn persist(&self) -> SurveyResult<bool> {
        match &self.config.storage.snapshot_path {
            Some(path) => {
                self.store.save_snapshot(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn audit(&self) -> &AuditLog {
        self.store.audit()
    }

    fn issue_access_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.config.research.access_code_len)
            .map(|_| char::from(ACCESS_CODE_CHARSET[rng.gen_range(0..ACCESS_CODE_CHARSET.len())]))
            .collect()
    }

    /// Run a mutation and record its outcome in the audit chain and the log,
    /// both under the store journal.
    fn audited<R>(
        &self,
        actor: impl fmt::Display,
        action: &'static str,
        target: impl fmt::Display,
        op: impl FnOnce() -> SurveyResult<R>,
    ) -> SurveyResult<R> {
        self.store.journaled(|| {
            let result = op();
            self.record(&actor, action, &target, &result);
            result
        })
    }

    fn record<R>(
        &self,
        actor: &impl fmt::Display,
        action: &'static str,
        target: &impl fmt::Display,
        result: &SurveyResult<R>,
    ) {
        let now = self.clock.now();
        match result {
            Ok(_) => {
                self.audit().record(now, actor, action, target, Outcome::Ok);
                info!(actor = %actor, action, target = %target, "operation applied");
            }
            Err(e) => {
                self.audit().record(now, actor, action, target, Outcome::Rejected);
                warn!(actor = %actor, action, target = %target, error = %e, "operation rejected");
            }
        }
    }

    fn principal_of(&self, token: &str) -> SurveyResult<Principal> {
        self.credentials
            .validate_token(token, self.clock.now())
            .map_err(|e| {
                debug!(reason = %e, "token rejected");
                SurveyError::from(e)
            })
    }

    fn token_for(&self, principal: Principal) -> SurveyResult<IssuedToken> {
        self.credentials.issue_token(principal, self.clock.now())
    }

    /// Verify `password` against the account hash, or against the decoy hash
    /// when there is no account, so both paths do the same hashing work.
    fn check_password(&self, password: &str, stored: Option<&str>) -> bool {
        let matched = self
            .credentials
            .verify_password(password, stored.unwrap_or(self.credentials.decoy_hash()));
        stored.is_some() && matched
    }
}

impl AccountManager for SurveyHandle {
    fn register_researcher(&self, new_user: NewUser) -> SurveyResult<IssuedToken> {
        let user = self.audited("anonymous", "user.register", "user", || {
            let identity = parse_researcher_username(&new_user.username)?;
            let password_hash = self.credentials.hash_password(&new_user.password);
            self.store.transaction(|t| {
                t.insert_user(identity.into_username(), new_user.full_name, password_hash)
            })
        })?;
        self.token_for(Principal::Researcher(user.id))
    }

    fn register_subject(&self, new_subject: NewSubject) -> SurveyResult<IssuedToken> {
        let subject = self.audited("anonymous", "subject.register", "subject", || {
            let identity = parse_subject_username(&new_subject.username)?;
            let password_hash = self.credentials.hash_password(&new_subject.password);
            self.store.transaction(|t| {
                t.insert_subject(
                    identity.into_username(),
                    new_subject.chosen_name,
                    password_hash,
                    new_subject.profile,
                )
            })
        })?;
        self.token_for(Principal::Subject(subject.id))
    }

    fn login_researcher(&self, username: &str, password: &str) -> SurveyResult<IssuedToken> {
        let username = username.trim().to_lowercase();
        let user = self.store.read(|t| t.user_by_username(&username).cloned());
        let matched = self.check_password(password, user.as_ref().map(|u| u.password_hash.as_str()));
        let Some(user) = user.filter(|_| matched) else {
            warn!("researcher login failed");
            return Err(SurveyError::AuthenticationFailed);
        };
        debug!(user = %user.id, "researcher logged in");
        self.token_for(Principal::Researcher(user.id))
    }

    fn login_subject(&self, username: &str, password: &str) -> SurveyResult<IssuedToken> {
        let username = parse_subject_username(username)
            .map(Identity::into_username)
            .unwrap_or_else(|_| username.trim().to_lowercase());
        let subject = self.store.read(|t| t.subject_by_username(&username).cloned());
        let matched = self.check_password(password, subject.as_ref().map(|s| s.password_hash.as_str()));
        let Some(subject) = subject.filter(|_| matched) else {
            warn!("subject login failed");
            return Err(SurveyError::AuthenticationFailed);
        };
        debug!(subject = %subject.id, "subject logged in");
        self.token_for(Principal::Subject(subject.id))
    }

    fn authenticate_researcher(&self, token: &str) -> SurveyResult<UserId> {
        match self.principal_of(token)? {
            Principal::Researcher(id) => Ok(id),
            Principal::Subject(_) => Err(TokenError::WrongPrincipal.into()),
        }
    }

    fn authenticate_subject(&self, token: &str) -> SurveyResult<SubjectId> {
        match self.principal_of(token)? {
            Principal::Subject(id) => Ok(id),
            Principal::Researcher(_) => Err(TokenError::WrongPrincipal.into()),
        }
    }

    fn current_researcher(&self, token: &str) -> SurveyResult<User> {
        let id = self.authenticate_researcher(token)?;
        self.store
            .read(|t| t.user(id).cloned())
            .ok_or_else(|| TokenError::UnknownPrincipal.into())
    }

    fn current_subject(&self, token: &str) -> SurveyResult<Subject> {
        let id = self.authenticate_subject(token)?;
        self.store
            .read(|t| t.subject(id).cloned())
            .ok_or_else(|| TokenError::UnknownPrincipal.into())
    }
}

impl ResearchOperations for SurveyHandle {
    fn list_researches(&self, owner: UserId) -> SurveyResult<Vec<Research>> {
        debug!(%owner, "list researches");
        Ok(self.store.read(|t| t.researches_of(owner)))
    }

    fn get_research(&self, owner: UserId, research: ResearchId) -> SurveyResult<Research> {
        self.store
            .read(|t| t.research_in(ResearchScope::new(owner, research)).cloned())
    }

    fn create_research(&self, owner: UserId, draft: NewResearch) -> SurveyResult<Research> {
        let code = (draft.visibility == Visibility::Private).then(|| self.issue_access_code());
        self.store.journaled(|| {
            let result = self.store.transaction(|t| t.insert_research(owner, draft, code));
            let target = result
                .as_ref()
                .map_or_else(|_| "research".to_string(), |r| format!("research:{}", r.id));
            self.record(&Principal::Researcher(owner), "research.create", &target, &result);
            result
        })
    }

    fn update_research(
        &self,
        owner: UserId,
        research: ResearchId,
        patch: ResearchPatch,
    ) -> SurveyResult<Research> {
        let scope = ResearchScope::new(owner, research);
        self.audited(
            Principal::Researcher(owner),
            "research.update",
            format!("research:{research}"),
            || {
                self.store
                    .transaction(|t| t.update_research(scope, patch, || self.issue_access_code()))
            },
        )
    }

    fn toggle_status(&self, owner: UserId, research: ResearchId) -> SurveyResult<Research> {
        let scope = ResearchScope::new(owner, research);
        let now = self.clock.now();
        self.audited(
            Principal::Researcher(owner),
            "research.toggle_status",
            format!("research:{research}"),
            || {
                self.store.transaction(|t| {
                    let change = t.toggle_research(scope, now)?;
                    debug!(from = change.from.as_str(), to = change.to.as_str(), "status changed");
                    t.research_in(scope).cloned()
                })
            },
        )
    }

    fn delete_research(&self, owner: UserId, research: ResearchId) -> SurveyResult<CascadeReport> {
        let scope = ResearchScope::new(owner, research);
        let result = self.audited(
            Principal::Researcher(owner),
            "research.delete",
            format!("research:{research}"),
            || self.store.transaction(|t| t.delete_research(scope)),
        );
        if let Ok(report) = &result {
            info!(%research, removed = report.total(), "research deleted");
        }
        result
    }
}

impl QuestionnaireOperations for SurveyHandle {
    fn list_questionnaires(&self, scope: ResearchScope) -> SurveyResult<Vec<Questionnaire>> {
        self.store.read(|t| t.questionnaires_in(scope))
    }

    fn questionnaire_trees(&self, scope: ResearchScope) -> SurveyResult<Vec<QuestionnaireTree>> {
        self.store.read(|t| t.questionnaire_trees_in(scope))
    }

    fn get_questionnaire(&self, scope: QuestionnaireScope) -> SurveyResult<Questionnaire> {
        self.store.read(|t| t.questionnaire_in(scope).cloned())
    }

    fn create_questionnaire(
        &self,
        scope: ResearchScope,
        draft: NewQuestionnaire,
    ) -> SurveyResult<Questionnaire> {
        self.audited(Principal::Researcher(scope.owner), "questionnaire.create", scope, || {
            self.store.transaction(|t| t.insert_questionnaire(scope, draft))
        })
    }

    fn update_questionnaire(
        &self,
        scope: QuestionnaireScope,
        patch: QuestionnairePatch,
    ) -> SurveyResult<Questionnaire> {
        self.audited(Principal::Researcher(scope.owner), "questionnaire.update", scope, || {
            self.store.transaction(|t| t.update_questionnaire(scope, patch))
        })
    }

    fn delete_questionnaire(&self, scope: QuestionnaireScope) -> SurveyResult<CascadeReport> {
        self.audited(Principal::Researcher(scope.owner), "questionnaire.delete", scope, || {
            self.store.transaction(|t| t.delete_questionnaire(scope))
        })
    }

    fn public_questionnaires(&self) -> SurveyResult<Vec<QuestionnaireTree>> {
        Ok(self.store.read(|t| t.public_catalogue()))
    }

    fn clone_templates(
        &self,
        target: ResearchScope,
        sources: &[QuestionnaireId],
    ) -> SurveyResult<Vec<Questionnaire>> {
        let result = self.audited(
            Principal::Researcher(target.owner),
            "questionnaire.clone_templates",
            target,
            || self.store.transaction(|t| t.clone_templates(target, sources)),
        );
        if let Ok(created) = &result {
            info!(research = %target.research, copies = created.len(), "templates cloned");
        }
        result
    }
}

impl QuestionOperations for SurveyHandle {
    fn list_questions(&self, scope: QuestionnaireScope) -> SurveyResult<Vec<Question>> {
        self.store.read(|t| t.questions_in(scope))
    }

    fn get_question(&self, scope: QuestionScope) -> SurveyResult<Question> {
        self.store.read(|t| t.question_in(scope).cloned())
    }

    fn create_question(&self, scope: QuestionnaireScope, draft: NewQuestion) -> SurveyResult<Question> {
        self.audited(Principal::Researcher(scope.owner), "question.create", scope, || {
            self.store.transaction(|t| t.insert_question(scope, draft))
        })
    }

    fn update_question(&self, scope: QuestionScope, patch: QuestionPatch) -> SurveyResult<Question> {
        self.audited(Principal::Researcher(scope.owner), "question.update", scope, || {
            self.store.transaction(|t| t.update_question(scope, patch))
        })
    }

    fn delete_question(&self, scope: QuestionScope) -> SurveyResult<CascadeReport> {
        self.audited(Principal::Researcher(scope.owner), "question.delete", scope, || {
            self.store.transaction(|t| t.delete_question(scope))
        })
    }
}

impl AlternativeOperations for SurveyHandle {
    fn list_alternatives(&self, scope: QuestionScope) -> SurveyResult<Vec<Alternative>> {
        self.store.read(|t| t.alternatives_in(scope))
    }

    fn get_alternative(&self, scope: AlternativeScope) -> SurveyResult<Alternative> {
        self.store.read(|t| t.alternative_in(scope).cloned())
    }

    fn create_alternative(
        &self,
        scope: QuestionScope,
        draft: NewAlternative,
    ) -> SurveyResult<Alternative> {
        self.audited(Principal::Researcher(scope.owner), "alternative.create", scope, || {
            self.store.transaction(|t| t.insert_alternative(scope, draft))
        })
    }

    fn update_alternative(
        &self,
        scope: AlternativeScope,
        patch: AlternativePatch,
    ) -> SurveyResult<Alternative> {
        self.audited(Principal::Researcher(scope.owner), "alternative.update", scope, || {
            self.store.transaction(|t| t.update_alternative(scope, patch))
        })
    }

    fn delete_alternative(&self, scope: AlternativeScope) -> SurveyResult<CascadeReport> {
        self.audited(Principal::Researcher(scope.owner), "alternative.delete", scope, || {
            self.store.transaction(|t| t.delete_alternative(scope))
        })
    }
}

impl SubjectOperations for SurveyHandle {
    fn discoverable_researches(&self, subject: SubjectId) -> SurveyResult<Vec<Research>> {
        let today = self.clock.today();
        self.store.read(|t| t.discoverable_for(subject, today))
    }

    fn enroll(
        &self,
        subject: SubjectId,
        research: ResearchId,
        access_code: Option<&str>,
    ) -> SurveyResult<EnrollOutcome> {
        let today = self.clock.today();
        self.audited(
            Principal::Subject(subject),
            "research.enroll",
            format!("research:{research}"),
            || {
                self.store
                    .transaction(|t| t.enroll(subject, research, access_code, today))
            },
        )
    }

    fn enrolled_researches(&self, subject: SubjectId) -> SurveyResult<Vec<Research>> {
        Ok(self.store.read(|t| t.enrolled_researches(subject)))
    }

    fn subject_questionnaires(
        &self,
        subject: SubjectId,
        research: ResearchId,
    ) -> SurveyResult<Vec<QuestionnaireTree>> {
        self.store
            .read(|t| t.questionnaires_for_subject(subject, research))
    }

    fn submit_answers(
        &self,
        subject: SubjectId,
        research: ResearchId,
        answers: Vec<AnswerInput>,
    ) -> SurveyResult<Vec<AlternativeAnswer>> {
        let result = self.audited(
            Principal::Subject(subject),
            "answers.submit",
            format!("research:{research}"),
            || {
                self.store
                    .transaction(|t| t.submit_answers(subject, research, answers))
            },
        );
        if let Ok(stored) = &result {
            info!(%subject, %research, rows = stored.len(), "answers stored");
        }
        result
    }

    fn record_usage_time(&self, subject: SubjectId, input: UsageTimeInput) -> SurveyResult<UsageTime> {
        let now = self.clock.now();
        self.audited(Principal::Subject(subject), "usage_time.record", "usage_time", || {
            self.store
                .transaction(|t| t.record_usage_time(subject, input, now))
        })
    }
}

impl ReportingOperations for SurveyHandle {
    fn answers_of_research(&self, scope: ResearchScope) -> SurveyResult<Vec<AnswerRow>> {
        self.store.read(|t| t.answer_rows(scope))
    }

    fn export_answers<W: io::Write>(&self, scope: ResearchScope, sink: W) -> SurveyResult<usize> {
        let rows = self.answers_of_research(scope)?;
        let written = export::write_answer_rows(&rows, sink)?;
        info!(research = %scope.research, rows = written, "answers exported");
        Ok(written)
    }
}
