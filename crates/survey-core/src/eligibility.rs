//! Eligibility filter
//!
//! Matches a subject's demographic profile against a research's inclusion
//! criteria. An unset criterion never excludes anyone: relaxing any single
//! bound can only grow the eligible set.

use crate::error::{SurveyError, SurveyResult};
use crate::types::{Research, ResearchState, Visibility};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Demographic bounds a research places on its subjects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EligibilityCriteria {
    pub initial_age: Option<u32>,
    pub final_age: Option<u32>,
    pub initial_income: Option<i64>,
    pub final_income: Option<i64>,
    pub race: Option<String>,
    pub gender: Option<String>,
    pub sexual_orientation: Option<String>,
}

impl EligibilityCriteria {
    /// No constraint on any axis
    #[inline]
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_age_range(mut self, initial: Option<u32>, final_age: Option<u32>) -> Self {
        self.initial_age = initial;
        self.final_age = final_age;
        self
    }

    #[must_use]
    pub fn with_income_range(mut self, initial: Option<i64>, final_income: Option<i64>) -> Self {
        self.initial_income = initial;
        self.final_income = final_income;
        self
    }

    #[must_use]
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    #[must_use]
    pub fn with_race(mut self, race: impl Into<String>) -> Self {
        self.race = Some(race.into());
        self
    }

    #[must_use]
    pub fn with_sexual_orientation(mut self, orientation: impl Into<String>) -> Self {
        self.sexual_orientation = Some(orientation.into());
        self
    }

    /// Reject inverted ranges.
    pub fn validate(&self) -> SurveyResult<()> {
        if let (Some(lo), Some(hi)) = (self.initial_age, self.final_age) {
            if lo > hi {
                return Err(SurveyError::payload(format!(
                    "initialAge {lo} is greater than finalAge {hi}"
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (self.initial_income, self.final_income) {
            if lo > hi {
                return Err(SurveyError::payload(format!(
                    "initialIncome {lo} is greater than finalIncome {hi}"
                )));
            }
        }
        Ok(())
    }

    /// Whether `profile`, evaluated on `today`, satisfies every set bound.
    #[must_use]
    pub fn admits(&self, profile: &SubjectProfile, today: NaiveDate) -> bool {
        matches_required(self.gender.as_deref(), profile.gender.as_deref())
            && matches_required(self.race.as_deref(), profile.race.as_deref())
            && matches_required(
                self.sexual_orientation.as_deref(),
                profile.sexual_orientation.as_deref(),
            )
            && within(
                self.initial_age,
                self.final_age,
                profile.birth_date.and_then(|b| age_on(b, today)),
            )
            && within(self.initial_income, self.final_income, profile.income)
    }
}

/// Demographic profile of a subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubjectProfile {
    pub birth_date: Option<NaiveDate>,
    pub income: Option<i64>,
    pub race: Option<String>,
    pub gender: Option<String>,
    pub sexual_orientation: Option<String>,
}

/// Completed years between `birth` and `today`; `None` for future births.
#[must_use]
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// A research is discoverable by `profile` when it is neither closed nor
/// private and its criteria admit the profile.
#[must_use]
pub fn is_eligible(research: &Research, profile: &SubjectProfile, today: NaiveDate) -> bool {
    research.state != ResearchState::Closed
        && research.visibility != Visibility::Private
        && research.criteria.admits(profile, today)
}

pub fn filter_eligible<'a, I>(researches: I, profile: &SubjectProfile, today: NaiveDate) -> Vec<&'a Research>
where
    I: IntoIterator<Item = &'a Research>,
{
    researches
        .into_iter()
        .filter(|r| is_eligible(r, profile, today))
        .collect()
}

fn matches_required(required: Option<&str>, actual: Option<&str>) -> bool {
    match required {
        None => true,
        Some(req) => actual == Some(req),
    }
}

fn within<T: PartialOrd>(low: Option<T>, high: Option<T>, value: Option<T>) -> bool {
    if low.is_none() && high.is_none() {
        return true;
    }
    let Some(v) = value else {
        return false;
    };
    low.map_or(true, |lo| v >= lo) && high.map_or(true, |hi| v <= hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewResearch, ResearchId, UserId};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn born_years_ago(years: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024 - years, 1, 10).unwrap()
    }

    fn research(criteria: EligibilityCriteria) -> Research {
        Research::new(
            ResearchId(1),
            UserId(1),
            NewResearch::new("r", Visibility::Public).with_criteria(criteria),
            None,
        )
    }

    #[test]
    fn age_counts_completed_years() {
        let birth = NaiveDate::from_ymd_opt(2000, 6, 16).unwrap();
        assert_eq!(age_on(birth, today()), Some(23));
        let birth = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(birth, today()), Some(24));
        let future = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_eq!(age_on(future, today()), None);
    }

    #[test]
    fn gender_and_age_range() {
        let r = research(
            EligibilityCriteria::unconstrained()
                .with_gender("F")
                .with_age_range(Some(18), Some(30)),
        );
        let f25 = SubjectProfile {
            gender: Some("F".into()),
            birth_date: Some(born_years_ago(25)),
            ..SubjectProfile::default()
        };
        let m25 = SubjectProfile {
            gender: Some("M".into()),
            ..f25.clone()
        };
        let f35 = SubjectProfile {
            birth_date: Some(born_years_ago(35)),
            ..f25.clone()
        };

        assert!(is_eligible(&r, &f25, today()));
        assert!(!is_eligible(&r, &m25, today()));
        assert!(!is_eligible(&r, &f35, today()));
    }

    #[test]
    fn unset_criteria_admit_everyone() {
        let r = research(EligibilityCriteria::unconstrained());
        assert!(is_eligible(&r, &SubjectProfile::default(), today()));
    }

    #[test]
    fn missing_profile_field_fails_a_set_bound() {
        let r = research(EligibilityCriteria::unconstrained().with_income_range(Some(1000), None));
        assert!(!is_eligible(&r, &SubjectProfile::default(), today()));
        let rich = SubjectProfile {
            income: Some(5000),
            ..SubjectProfile::default()
        };
        assert!(is_eligible(&r, &rich, today()));
    }

    #[test]
    fn closed_and_private_are_never_discoverable() {
        let mut r = research(EligibilityCriteria::unconstrained());
        r.visibility = Visibility::Private;
        assert!(!is_eligible(&r, &SubjectProfile::default(), today()));
        r.visibility = Visibility::Public;
        r.state = ResearchState::Closed;
        assert!(!is_eligible(&r, &SubjectProfile::default(), today()));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let c = EligibilityCriteria::unconstrained().with_age_range(Some(40), Some(20));
        assert!(matches!(c.validate(), Err(SurveyError::InvalidPayload(_))));
        let c = EligibilityCriteria::unconstrained().with_income_range(Some(10), Some(10));
        assert!(c.validate().is_ok());
    }
}
