use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use survey_core::{ResearchPatch, SubjectProfile, SurveyError, TransitionError};
use survey_service::prelude::*;
use survey_test_utils::{
    build_research, public_research, researcher, setup_test_handle, start_time, subject,
};

fn profile(gender: &str, birth: (i32, u32, u32)) -> SubjectProfile {
    SubjectProfile {
        gender: Some(gender.into()),
        birth_date: NaiveDate::from_ymd_opt(birth.0, birth.1, birth.2),
        ..SubjectProfile::default()
    }
}

#[test]
fn discovery_honours_gender_and_age() {
    let (handle, _) = setup_test_handle();
    let owner = researcher(&handle, "owner");
    let draft = NewResearch::new("Women 18-30", Visibility::Public).with_criteria(
        EligibilityCriteria::unconstrained()
            .with_gender("F")
            .with_age_range(Some(18), Some(30)),
    );
    let target = build_research(&handle, owner, draft, Publicity::Private).scope.research;

    let young_woman = subject(&handle, "f25", profile("F", (1999, 1, 1)));
    let young_man = subject(&handle, "m25", profile("M", (1999, 1, 1)));
    let older_woman = subject(&handle, "f35", profile("F", (1989, 1, 1)));

    let ids = |s: SubjectId| -> Vec<ResearchId> {
        handle
            .discoverable_researches(s)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect()
    };
    assert_eq!(ids(young_woman), vec![target]);
    assert!(ids(young_man).is_empty());
    assert!(ids(older_woman).is_empty());

    assert_eq!(handle.enroll(young_woman, target, None), Ok(EnrollOutcome::Joined));
    assert_eq!(
        handle.enroll(young_man, target, None),
        Err(SurveyError::NotFoundOrForbidden)
    );
}

#[test]
fn closed_and_private_researches_are_hidden() {
    let (handle, _) = setup_test_handle();
    let owner = researcher(&handle, "owner");
    let closed = public_research(&handle, owner).scope.research;
    handle.toggle_status(owner, closed).unwrap();
    handle.toggle_status(owner, closed).unwrap();
    let private = build_research(
        &handle,
        owner,
        NewResearch::new("Invite only", Visibility::Private),
        Publicity::Private,
    )
    .scope
    .research;
    let open = public_research(&handle, owner).scope.research;

    let reader = subject(&handle, "reader", SubjectProfile::default());
    let listed: Vec<_> = handle
        .discoverable_researches(reader)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, vec![open]);
    assert!(!listed.contains(&private));

    assert_eq!(
        handle.enroll(reader, closed, None),
        Err(SurveyError::InvalidStateTransition(TransitionError::ResearchClosed))
    );
}

#[test]
fn private_research_needs_its_code() {
    let (handle, _) = setup_test_handle();
    let owner = researcher(&handle, "owner");
    let tree = build_research(
        &handle,
        owner,
        NewResearch::new("Invite only", Visibility::Private),
        Publicity::Private,
    );
    let id = tree.scope.research;
    let code = handle.get_research(owner, id).unwrap().code.unwrap();
    let member = subject(&handle, "member", SubjectProfile::default());

    assert_eq!(handle.enroll(member, id, None), Err(SurveyError::NotFoundOrForbidden));
    assert_eq!(
        handle.enroll(member, id, Some("WRONGCODE0")),
        Err(SurveyError::NotFoundOrForbidden)
    );
    assert_eq!(handle.enroll(member, id, Some(&code)), Ok(EnrollOutcome::Joined));
    assert_eq!(handle.enroll(member, id, None), Ok(EnrollOutcome::AlreadyMember));

    let joined = handle.enrolled_researches(member).unwrap();
    assert_eq!(joined.len(), 1);
    let questionnaires = handle.subject_questionnaires(member, id).unwrap();
    assert_eq!(questionnaires.len(), 1);
    assert_eq!(questionnaires[0].alternative_count(), 9);
}

#[test]
fn answers_join_for_the_owner() {
    let (handle, _) = setup_test_handle();
    let owner = researcher(&handle, "owner");
    let tree = public_research(&handle, owner);
    let id = tree.scope.research;
    let member = subject(&handle, "member", SubjectProfile::default());
    handle.enroll(member, id, None).unwrap();

    // not yet collecting
    assert_eq!(
        handle.submit_answers(member, id, tree.first_choices()),
        Err(SurveyError::InvalidStateTransition(TransitionError::NotCollecting(
            ResearchState::Inactive
        )))
    );

    handle.toggle_status(owner, id).unwrap();
    let mut batch = tree.first_choices();
    let extra = &tree.alternatives[2][2];
    batch.push(AnswerInput::new(extra.id, extra.text.clone()).with_text("sometimes"));
    let stored = handle.submit_answers(member, id, batch).unwrap();
    assert_eq!(stored.len(), 4);
    assert!(stored
        .iter()
        .all(|a| a.subject_id == member && a.research_id == id));

    let rows = handle.answers_of_research(tree.scope).unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.research_title == "Sleep habits"));
    assert!(rows
        .iter()
        .any(|r| r.answer_text.as_deref() == Some("sometimes") && r.alternative_value == 3));
}

#[test]
fn resubmitting_appends_rows() {
    let (handle, _) = setup_test_handle();
    let owner = researcher(&handle, "owner");
    let tree = public_research(&handle, owner);
    let id = tree.scope.research;
    let member = subject(&handle, "member", SubjectProfile::default());
    handle.enroll(member, id, None).unwrap();
    handle.toggle_status(owner, id).unwrap();

    let batch = tree.first_choices();
    let first = handle.submit_answers(member, id, batch.clone()).unwrap();
    let second = handle.submit_answers(member, id, batch.clone()).unwrap();
    assert!(first.iter().zip(&second).all(|(a, b)| a.id != b.id));

    let rows = handle.answers_of_research(tree.scope).unwrap();
    assert_eq!(rows.len(), 2 * batch.len());
}

#[test]
fn outsiders_cannot_answer() {
    let (handle, _) = setup_test_handle();
    let owner = researcher(&handle, "owner");
    let tree = public_research(&handle, owner);
    let other = public_research(&handle, owner);
    handle.toggle_status(owner, tree.scope.research).unwrap();

    let stranger = subject(&handle, "stranger", SubjectProfile::default());
    assert_eq!(
        handle.submit_answers(stranger, tree.scope.research, tree.first_choices()),
        Err(SurveyError::NotFoundOrForbidden)
    );

    // enrolled, but one alternative belongs to a different research
    let member = subject(&handle, "member", SubjectProfile::default());
    handle.enroll(member, tree.scope.research, None).unwrap();
    let mut batch = tree.first_choices();
    batch.extend(other.first_choices());
    assert_eq!(
        handle.submit_answers(member, tree.scope.research, batch),
        Err(SurveyError::NotFoundOrForbidden)
    );
    assert_eq!(
        handle.submit_answers(member, tree.scope.research, Vec::new()),
        Err(SurveyError::payload("answer batch is empty"))
    );

    assert!(handle.answers_of_research(tree.scope).unwrap().is_empty());
}

#[test]
fn deleting_research_removes_answers_and_memberships() {
    let (handle, _) = setup_test_handle();
    let owner = researcher(&handle, "owner");
    let tree = public_research(&handle, owner);
    let id = tree.scope.research;
    let member = subject(&handle, "member", SubjectProfile::default());
    handle.enroll(member, id, None).unwrap();
    handle.toggle_status(owner, id).unwrap();
    handle.submit_answers(member, id, tree.first_choices()).unwrap();

    let report = handle.delete_research(owner, id).unwrap();
    assert_eq!(report.answers, 3);
    assert_eq!(report.enrollments, 1);
    assert!(handle.enrolled_researches(member).unwrap().is_empty());
    assert!(handle.store().read(|t| t.check_invariants()).is_empty());
}

#[test]
fn usage_time_defaults_to_now() {
    let (handle, clock) = setup_test_handle();
    let member = subject(&handle, "member", SubjectProfile::default());

    let first = handle
        .record_usage_time(
            member,
            UsageTimeInput {
                duration_secs: 90,
                collected_at: None,
            },
        )
        .unwrap();
    assert_eq!(first.collected_at, start_time());

    clock.advance(Duration::hours(1));
    let earlier = start_time() - Duration::days(1);
    let second = handle
        .record_usage_time(
            member,
            UsageTimeInput {
                duration_secs: 30,
                collected_at: Some(earlier),
            },
        )
        .unwrap();
    assert_eq!(second.collected_at, earlier);

    let samples = handle.store().read(|t| t.usage_times_of(member));
    assert_eq!(
        samples.iter().map(|s| s.duration_secs).collect::<Vec<_>>(),
        vec![30, 90]
    );
}

#[test]
fn criteria_update_changes_discovery() {
    let (handle, _) = setup_test_handle();
    let owner = researcher(&handle, "owner");
    let id = public_research(&handle, owner).scope.research;
    let man = subject(&handle, "man", profile("M", (1990, 5, 5)));
    assert_eq!(handle.discoverable_researches(man).unwrap().len(), 1);

    handle
        .update_research(
            owner,
            id,
            ResearchPatch {
                criteria: Some(EligibilityCriteria::unconstrained().with_gender("F")),
                ..ResearchPatch::default()
            },
        )
        .unwrap();
    assert!(handle.discoverable_researches(man).unwrap().is_empty());
}
