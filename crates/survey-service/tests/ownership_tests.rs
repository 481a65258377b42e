//! A researcher can never see or touch another researcher's entities.

use survey_core::{
    AlternativePatch, NewAlternative, NewQuestion, NewQuestionnaire, QuestionPatch,
    QuestionnairePatch, ResearchPatch, SurveyError,
};
use survey_service::prelude::*;
use survey_test_utils::{public_research, researcher, setup_test_handle};

fn denied<T: std::fmt::Debug>(result: SurveyResult<T>) {
    assert_eq!(result.unwrap_err(), SurveyError::NotFoundOrForbidden);
}

#[test]
fn stranger_gets_not_found_at_every_level() {
    let (handle, _) = setup_test_handle();
    let alice = researcher(&handle, "alice");
    let bob = researcher(&handle, "bob");
    let tree = public_research(&handle, alice);

    let research = tree.scope.research;
    let as_bob = ResearchScope::new(bob, research);
    let qn = as_bob.questionnaire(tree.questionnaire);
    let q = qn.question(tree.questions[0]);
    let alt = q.alternative(tree.alternatives[0][0].id);

    // reads
    denied(handle.get_research(bob, research));
    denied(handle.list_questionnaires(as_bob));
    denied(handle.get_questionnaire(qn));
    denied(handle.list_questions(qn));
    denied(handle.get_question(q));
    denied(handle.list_alternatives(q));
    denied(handle.get_alternative(alt));
    denied(handle.answers_of_research(as_bob));

    // writes
    denied(handle.update_research(bob, research, ResearchPatch::title("mine")));
    denied(handle.toggle_status(bob, research));
    denied(handle.create_questionnaire(as_bob, NewQuestionnaire::new("x", Publicity::Private)));
    denied(handle.update_questionnaire(
        qn,
        QuestionnairePatch {
            title: Some("x".into()),
            ..QuestionnairePatch::default()
        },
    ));
    denied(handle.create_question(qn, NewQuestion::new("x", 9)));
    denied(handle.update_question(
        q,
        QuestionPatch {
            order: Some(9),
            ..QuestionPatch::default()
        },
    ));
    denied(handle.create_alternative(q, NewAlternative::new("radio", "x", 0)));
    denied(handle.update_alternative(
        alt,
        AlternativePatch {
            value: Some(0),
            ..AlternativePatch::default()
        },
    ));

    // deletes
    denied(handle.delete_alternative(alt));
    denied(handle.delete_question(q));
    denied(handle.delete_questionnaire(qn));
    denied(handle.delete_research(bob, research));

    // nothing changed for the owner
    let owned = handle.questionnaire_trees(tree.scope).unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].alternative_count(), 9);
    assert_eq!(handle.get_research(alice, research).unwrap().title, "Sleep habits");
    assert!(handle.list_researches(bob).unwrap().is_empty());
}

#[test]
fn foreign_and_missing_ids_look_the_same() {
    let (handle, _) = setup_test_handle();
    let alice = researcher(&handle, "alice");
    let bob = researcher(&handle, "bob");
    let tree = public_research(&handle, alice);

    let foreign = handle.get_research(bob, tree.scope.research).unwrap_err();
    let missing = handle
        .get_research(bob, survey_core::ResearchId(9_999))
        .unwrap_err();
    assert_eq!(foreign, missing);
    assert_eq!(foreign.to_string(), missing.to_string());
}

#[test]
fn children_cannot_be_reached_through_another_parent() {
    let (handle, _) = setup_test_handle();
    let alice = researcher(&handle, "alice");
    let first = public_research(&handle, alice);
    let second = public_research(&handle, alice);

    // right owner, wrong research for this questionnaire
    let crossed = second.scope.questionnaire(first.questionnaire);
    denied(handle.get_questionnaire(crossed));
    denied(handle.delete_questionnaire(crossed));

    // right questionnaire, question from the other tree
    let crossed = first
        .scope
        .questionnaire(first.questionnaire)
        .question(second.questions[0]);
    denied(handle.get_question(crossed));
}

#[test]
fn cascade_delete_reports_every_row() {
    let (handle, _) = setup_test_handle();
    let alice = researcher(&handle, "alice");
    let tree = public_research(&handle, alice);

    let report = handle
        .delete_questionnaire(tree.scope.questionnaire(tree.questionnaire))
        .unwrap();
    assert_eq!(report.questionnaires, 1);
    assert_eq!(report.questions, 3);
    assert_eq!(report.alternatives, 9);

    let report = handle.delete_research(alice, tree.scope.research).unwrap();
    assert_eq!(report.researches, 1);
    assert_eq!(report.questionnaires, 0);
    denied(handle.get_research(alice, tree.scope.research));
    assert!(handle.store().read(|t| t.check_invariants()).is_empty());
}
