//! Eligibility filter properties.
//!
//! Relaxing any single criterion to "unset" must never shrink the set of
//! admitted profiles.

use chrono::NaiveDate;
use proptest::option;
use proptest::prelude::*;
use survey_core::eligibility::{filter_eligible, is_eligible};
use survey_core::{
    EligibilityCriteria, NewResearch, Research, ResearchId, SubjectProfile, UserId, Visibility,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn label() -> impl Strategy<Value = String> {
    prop_oneof![Just("A".to_string()), Just("B".to_string()), Just("C".to_string())]
}

fn criteria() -> impl Strategy<Value = EligibilityCriteria> {
    (
        option::of(0u32..80),
        option::of(0u32..80),
        option::of(0i64..10_000),
        option::of(0i64..10_000),
        option::of(label()),
        option::of(label()),
        option::of(label()),
    )
        .prop_map(|(ia, fa, ii, fi, race, gender, so)| EligibilityCriteria {
            initial_age: ia,
            final_age: fa,
            initial_income: ii,
            final_income: fi,
            race,
            gender,
            sexual_orientation: so,
        })
}

fn profile() -> impl Strategy<Value = SubjectProfile> {
    (
        option::of(1940i32..2010),
        option::of(0i64..10_000),
        option::of(label()),
        option::of(label()),
        option::of(label()),
    )
        .prop_map(|(year, income, race, gender, so)| SubjectProfile {
            birth_date: year.and_then(|y| NaiveDate::from_ymd_opt(y, 3, 1)),
            income,
            race,
            gender,
            sexual_orientation: so,
        })
}

fn research(criteria: EligibilityCriteria) -> Research {
    Research::new(
        ResearchId(1),
        UserId(1),
        NewResearch::new("r", Visibility::Public).with_criteria(criteria),
        None,
    )
}

fn relaxations(c: &EligibilityCriteria) -> Vec<EligibilityCriteria> {
    vec![
        EligibilityCriteria { initial_age: None, ..c.clone() },
        EligibilityCriteria { final_age: None, ..c.clone() },
        EligibilityCriteria { initial_income: None, ..c.clone() },
        EligibilityCriteria { final_income: None, ..c.clone() },
        EligibilityCriteria { race: None, ..c.clone() },
        EligibilityCriteria { gender: None, ..c.clone() },
        EligibilityCriteria { sexual_orientation: None, ..c.clone() },
    ]
}

proptest! {
    #[test]
    fn prop_relaxing_a_criterion_never_excludes(c in criteria(), p in profile()) {
        if is_eligible(&research(c.clone()), &p, today()) {
            for relaxed in relaxations(&c) {
                prop_assert!(is_eligible(&research(relaxed), &p, today()));
            }
        }
    }

    #[test]
    fn prop_unconstrained_admits_all(p in profile()) {
        prop_assert!(is_eligible(&research(EligibilityCriteria::unconstrained()), &p, today()));
    }
}

#[test]
fn filter_keeps_input_order() {
    let open = research(EligibilityCriteria::unconstrained());
    let mut only_f = research(EligibilityCriteria::unconstrained().with_gender("F"));
    only_f.id = ResearchId(2);
    let mut also_open = research(EligibilityCriteria::unconstrained());
    also_open.id = ResearchId(3);

    let all = [open, only_f, also_open];
    let male = SubjectProfile {
        gender: Some("M".into()),
        ..SubjectProfile::default()
    };
    let ids: Vec<_> = filter_eligible(all.iter(), &male, today())
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![ResearchId(1), ResearchId(3)]);
}
