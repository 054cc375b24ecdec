//! End-to-end wizard flows against a scripted backend

mod common;

use common::{conflict, form, server_error, text_question, ScriptedApi};
use std::sync::Arc;
use std::time::Duration;
use survey_client::error::ClientError;
use survey_client::services::catalog::CatalogMode;
use survey_client::services::wizard::{draft_key, SubmissionState, WizardEvent, WizardStep};
use survey_client::services::{FormWizard, SubmitOutcome};
use survey_client::storage::{KeyValueStore, MemoryStore};
use survey_shared::{AnswerError, AnswerValue, FormId};

fn three_question_form(id: &str) -> survey_shared::Form {
    form(
        id,
        vec![
            text_question("q1", true, 0),
            text_question("q2", true, 1),
            text_question("q3", true, 2),
        ],
    )
}

fn wizard(api: Arc<ScriptedApi>) -> (FormWizard, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (FormWizard::new(api, store.clone()), store)
}

async fn answer_all_and_review(wizard: &mut FormWizard) {
    for id in ["q1", "q2", "q3"] {
        wizard.set_answer(id.into(), AnswerValue::text(format!("answer {id}"))).unwrap();
        wizard.next().await.unwrap();
    }
    assert_eq!(wizard.session().unwrap().step(), WizardStep::Review);
}

#[tokio::test]
async fn test_submit_only_form_ends_all_done() {
    let api = Arc::new(ScriptedApi::with_forms(vec![three_question_form("f1")]));
    let (mut wizard, store) = wizard(api.clone());

    assert_eq!(wizard.load().await, CatalogMode::SingleAutoSelected);
    assert!(wizard.session().is_some());

    answer_all_and_review(&mut wizard).await;
    assert!(store.get(&draft_key(&FormId::new("f1"))).unwrap().is_some());

    let event = wizard.next().await.unwrap();
    match event {
        WizardEvent::Submitted(SubmitOutcome::Succeeded { form_id, remaining, mode, .. }) => {
            assert_eq!(form_id.as_str(), "f1");
            assert_eq!(remaining, 0);
            assert_eq!(mode, CatalogMode::NoneAvailable);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert!(wizard.session().is_none());
    assert!(wizard.catalog().is_empty());
    assert!(store.get(&draft_key(&FormId::new("f1"))).unwrap().is_none());

    let requests = api.form_requests();
    assert_eq!(requests.len(), 1);
    let ids: Vec<&str> = requests[0].answers.iter().map(|a| a.question_id.as_str()).collect();
    assert_eq!(ids, vec!["q1", "q2", "q3"]);
}

#[tokio::test]
async fn test_submit_with_other_forms_remaining() {
    let api = Arc::new(ScriptedApi::with_forms(vec![
        three_question_form("f1"),
        three_question_form("f2"),
        three_question_form("f3"),
    ]));
    let (mut wizard, _store) = wizard(api);

    assert_eq!(wizard.load().await, CatalogMode::MultipleNeedSelection);
    assert!(wizard.session().is_none());
    wizard.select_form(1).unwrap();
    answer_all_and_review(&mut wizard).await;

    match wizard.submit().await.unwrap() {
        SubmitOutcome::Succeeded { form_id, remaining, mode, .. } => {
            assert_eq!(form_id.as_str(), "f2");
            assert_eq!(remaining, 2);
            assert_eq!(mode, CatalogMode::MultipleNeedSelection);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_required_answer_keeps_step() {
    let api = Arc::new(ScriptedApi::with_forms(vec![three_question_form("f1")]));
    let (mut wizard, _store) = wizard(api);
    wizard.load().await;

    wizard.set_answer("q1".into(), AnswerValue::text("first")).unwrap();
    assert_eq!(
        wizard.next().await.unwrap(),
        WizardEvent::Moved(WizardStep::Question(1))
    );

    let err = wizard.next().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(AnswerError::Required { ref question_id }) if question_id.as_str() == "q2"
    ));
    let session = wizard.session().unwrap();
    assert_eq!(session.step(), WizardStep::Question(1));
    assert!(session.validation_error().is_some());
}

#[tokio::test]
async fn test_conflict_drops_form_and_resets_silently() {
    let api = Arc::new(ScriptedApi::with_forms(vec![
        three_question_form("f1"),
        three_question_form("f2"),
    ]));
    api.push_form_result(Err(conflict()));
    let (mut wizard, store) = wizard(api);

    wizard.load().await;
    wizard.select_form(0).unwrap();
    answer_all_and_review(&mut wizard).await;

    match wizard.submit().await.unwrap() {
        SubmitOutcome::AlreadyResponded { form_id, mode } => {
            assert_eq!(form_id.as_str(), "f1");
            assert_eq!(mode, CatalogMode::SingleAutoSelected);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(wizard.catalog().len(), 1);
    assert!(wizard.catalog().last_error().is_none());
    assert!(store.get(&draft_key(&FormId::new("f1"))).unwrap().is_none());

    // The remaining form opens fresh
    let session = wizard.session().unwrap();
    assert_eq!(session.form().id.as_str(), "f2");
    assert_eq!(session.step_index(), 0);
    assert!(session.answers().is_empty());
}

#[tokio::test]
async fn test_failed_submit_keeps_answers_for_retry() {
    let api = Arc::new(ScriptedApi::with_forms(vec![three_question_form("f1")]));
    api.push_form_result(Err(server_error()));
    let (mut wizard, _store) = wizard(api.clone());

    wizard.load().await;
    answer_all_and_review(&mut wizard).await;

    let outcome = wizard.submit().await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
    let session = wizard.session().unwrap();
    assert_eq!(session.step(), WizardStep::Review);
    assert_eq!(session.answers().len(), 3);
    assert!(matches!(session.state(), SubmissionState::Failed(_)));
    assert_eq!(wizard.catalog().len(), 1);

    // Retry goes through
    assert!(matches!(
        wizard.submit().await.unwrap(),
        SubmitOutcome::Succeeded { .. }
    ));
    assert_eq!(api.form_requests().len(), 2);
}

#[tokio::test]
async fn test_late_response_after_leaving_is_discarded() {
    let api = Arc::new(ScriptedApi::with_forms(vec![
        three_question_form("f1"),
        three_question_form("f2"),
    ]));
    let (mut wizard, _store) = wizard(api);
    wizard.load().await;
    wizard.select_form(0).unwrap();
    answer_all_and_review(&mut wizard).await;

    let ticket = wizard.begin_submit().unwrap();
    assert!(wizard.session().unwrap().is_submitting());
    assert!(matches!(wizard.begin_submit(), Err(ClientError::InvalidState(_))));

    wizard.leave();
    wizard.select_form(1).unwrap();

    let outcome = wizard.finish_submit(ticket, Ok(common::submitted("late")));
    assert_eq!(outcome, SubmitOutcome::Discarded);
    assert_eq!(wizard.catalog().len(), 2);
    assert_eq!(wizard.session().unwrap().form().id.as_str(), "f2");
}

#[tokio::test]
async fn test_submit_jumps_to_first_invalid_question() {
    let api = Arc::new(ScriptedApi::with_forms(vec![three_question_form("f1")]));
    let (mut wizard, _store) = wizard(api.clone());
    wizard.load().await;
    answer_all_and_review(&mut wizard).await;

    // Clearing an answer after review is allowed
    wizard.set_answer("q2".into(), AnswerValue::text("")).unwrap();
    assert!(wizard.submit().await.is_err());
    assert_eq!(wizard.session().unwrap().step(), WizardStep::Question(1));
    assert!(api.form_requests().is_empty());
}

#[tokio::test]
async fn test_draft_restored_on_reopen() {
    let api = Arc::new(ScriptedApi::with_forms(vec![
        three_question_form("f1"),
        three_question_form("f2"),
    ]));
    let (mut wizard, store) = wizard(api.clone());
    wizard.load().await;
    wizard.select_form(0).unwrap();
    wizard.set_answer("q1".into(), AnswerValue::text("saved")).unwrap();
    wizard.leave();

    let mut reopened = FormWizard::new(api, store);
    reopened.load().await;
    let session = reopened.select_form(0).unwrap();
    assert_eq!(session.answer(&"q1".into()), Some(&AnswerValue::text("saved")));
    assert_eq!(session.step_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_submit_can_be_retried() {
    let api = Arc::new(ScriptedApi::with_forms(vec![three_question_form("f1")]));
    api.set_latency(Duration::from_secs(5));
    let (mut wizard, _store) = wizard(api.clone());
    wizard.load().await;
    answer_all_and_review(&mut wizard).await;

    // The caller gives up on the request before the backend replies
    let timed_out = tokio::time::timeout(Duration::from_secs(1), wizard.submit()).await;
    assert!(timed_out.is_err());
    assert!(!wizard.is_submitting());

    match wizard.submit().await.unwrap() {
        SubmitOutcome::Succeeded { form_id, .. } => assert_eq!(form_id.as_str(), "f1"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(api.form_requests().len(), 2);
}

#[tokio::test]
async fn test_dropped_ticket_releases_submission() {
    let api = Arc::new(ScriptedApi::with_forms(vec![three_question_form("f1")]));
    let (mut wizard, _store) = wizard(api);
    wizard.load().await;
    answer_all_and_review(&mut wizard).await;

    let ticket = wizard.begin_submit().unwrap();
    let copy = ticket.clone();
    drop(ticket);
    assert!(wizard.is_submitting());
    assert!(wizard.begin_submit().is_err());

    drop(copy);
    assert!(!wizard.is_submitting());
    let retry = wizard.begin_submit().unwrap();
    assert!(wizard.session().unwrap().is_submitting());
    assert!(matches!(
        wizard.finish_submit(retry, Ok(common::submitted("r1"))),
        SubmitOutcome::Succeeded { .. }
    ));
}
