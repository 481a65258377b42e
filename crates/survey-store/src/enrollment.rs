//! Subject membership and discovery

use crate::tables::Tables;
use chrono::NaiveDate;
use survey_core::eligibility;
use survey_core::lifecycle;
use survey_core::{
    Enrollment, QuestionnaireTree, Research, ResearchId, SubjectId, SurveyError, SurveyResult,
    Visibility,
};

/// How an enrollment call resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Joined,
    AlreadyMember,
}

impl Tables {
    #[must_use]
    pub fn is_enrolled(&self, subject: SubjectId, research: ResearchId) -> bool {
        self.enrollments.contains(&Enrollment {
            subject_id: subject,
            research_id: research,
        })
    }

    /// Researches listed to `subject` on `today`
    pub fn discoverable_for(&self, subject: SubjectId, today: NaiveDate) -> SurveyResult<Vec<Research>> {
        let subject = self.subject(subject).ok_or(SurveyError::NotFoundOrForbidden)?;
        Ok(eligibility::filter_eligible(self.researches.values(), &subject.profile, today)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Join a research. Public researches admit eligible subjects, private
    /// ones admit holders of the access code. Re-joining is a no-op.
    pub fn enroll(
        &mut self,
        subject: SubjectId,
        research: ResearchId,
        access_code: Option<&str>,
        today: NaiveDate,
    ) -> SurveyResult<EnrollOutcome> {
        let profile = self
            .subject(subject)
            .ok_or(SurveyError::NotFoundOrForbidden)?
            .profile
            .clone();
        let target = self.researches.get(&research).ok_or(SurveyError::NotFoundOrForbidden)?;

        if self.is_enrolled(subject, research) {
            return Ok(EnrollOutcome::AlreadyMember);
        }
        lifecycle::ensure_open(target.state)?;

        let admitted = match target.visibility {
            Visibility::Public => eligibility::is_eligible(target, &profile, today),
            Visibility::Private => match (&target.code, access_code) {
                (Some(expected), Some(given)) => expected == given,
                _ => false,
            },
        };
        if !admitted {
            return Err(SurveyError::NotFoundOrForbidden);
        }

        self.enrollments.insert(Enrollment {
            subject_id: subject,
            research_id: research,
        });
        Ok(EnrollOutcome::Joined)
    }

    /// Researches `subject` is a member of, in id order
    #[must_use]
    pub fn enrolled_researches(&self, subject: SubjectId) -> Vec<Research> {
        self.enrollments
            .iter()
            .filter(|e| e.subject_id == subject)
            .filter_map(|e| self.researches.get(&e.research_id))
            .cloned()
            .collect()
    }

    /// Questionnaire trees of a research the subject belongs to
    pub fn questionnaires_for_subject(
        &self,
        subject: SubjectId,
        research: ResearchId,
    ) -> SurveyResult<Vec<QuestionnaireTree>> {
        self.enrolled_research(subject, research)?;
        Ok(self.trees_of_research(research))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::ResearchScope;
    use chrono::{TimeZone, Utc};
    use survey_core::{EligibilityCriteria, NewResearch, SubjectProfile, TransitionError};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn setup(visibility: Visibility, criteria: EligibilityCriteria) -> (Tables, SubjectId, ResearchScope) {
        let mut t = Tables::new();
        let owner = t.insert_user("o@x.org".into(), None, "h".into()).unwrap().id;
        let profile = SubjectProfile {
            gender: Some("F".into()),
            ..SubjectProfile::default()
        };
        let subject = t
            .insert_subject("s@x.org".into(), None, "h".into(), profile)
            .unwrap()
            .id;
        let code = (visibility == Visibility::Private).then(|| "CODE123456".to_string());
        let r = t
            .insert_research(owner, NewResearch::new("r", visibility).with_criteria(criteria), code)
            .unwrap();
        (t, subject, ResearchScope::new(owner, r.id))
    }

    #[test]
    fn public_enrollment_is_idempotent() {
        let (mut t, s, scope) = setup(Visibility::Public, EligibilityCriteria::unconstrained());
        assert_eq!(t.enroll(s, scope.research, None, today()), Ok(EnrollOutcome::Joined));
        assert_eq!(
            t.enroll(s, scope.research, None, today()),
            Ok(EnrollOutcome::AlreadyMember)
        );
        assert_eq!(t.counts().enrollments, 1);
        assert_eq!(t.enrolled_researches(s).len(), 1);
    }

    #[test]
    fn ineligible_subject_is_denied() {
        let criteria = EligibilityCriteria::unconstrained().with_gender("M");
        let (mut t, s, scope) = setup(Visibility::Public, criteria);
        assert_eq!(
            t.enroll(s, scope.research, None, today()),
            Err(SurveyError::NotFoundOrForbidden)
        );
        assert!(t.discoverable_for(s, today()).unwrap().is_empty());
    }

    #[test]
    fn private_needs_matching_code() {
        let (mut t, s, scope) = setup(Visibility::Private, EligibilityCriteria::unconstrained());
        assert!(t.discoverable_for(s, today()).unwrap().is_empty());
        assert!(t.enroll(s, scope.research, None, today()).is_err());
        assert!(t.enroll(s, scope.research, Some("WRONG"), today()).is_err());
        assert_eq!(
            t.enroll(s, scope.research, Some("CODE123456"), today()),
            Ok(EnrollOutcome::Joined)
        );
    }

    #[test]
    fn closed_research_rejects_new_members() {
        let (mut t, s, scope) = setup(Visibility::Public, EligibilityCriteria::unconstrained());
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        t.toggle_research(scope, now).unwrap();
        t.toggle_research(scope, now).unwrap();
        assert_eq!(
            t.enroll(s, scope.research, None, today()),
            Err(SurveyError::InvalidStateTransition(TransitionError::ResearchClosed))
        );
    }

    #[test]
    fn non_member_cannot_read_questionnaires() {
        let (t, s, scope) = setup(Visibility::Public, EligibilityCriteria::unconstrained());
        assert_eq!(
            t.questionnaires_for_subject(s, scope.research),
            Err(SurveyError::NotFoundOrForbidden)
        );
    }
}
