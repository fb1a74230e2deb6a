//! Integration tests for responses that arrive after the operator started over.

mod common;

use std::sync::Mutex;
use std::time::Duration;

use common::{FakeTransport, NORMAL_REPLY, client_for};
use hemoscan_app::complete_analysis;
use hemoscan_capture::synthetic_capture;
use hemoscan_session::{Completion, ScreeningMachine, WorkflowState};

fn analyzing_machine() -> (Mutex<ScreeningMachine>, hemoscan_session::AnalysisTicket) {
    let mut machine = ScreeningMachine::new();
    machine.acknowledge().expect("acknowledge");
    machine.start_screening().expect("scan");
    machine
        .attach_capture(synthetic_capture(8, 8, [200, 130, 130]).expect("fixture"))
        .expect("attach");
    let ticket = machine.confirm().expect("confirm");
    (Mutex::new(machine), ticket)
}

#[tokio::test]
async fn stale_response_tests_late_result_after_new_scan_is_dropped() {
    let (machine, ticket) = analyzing_machine();
    let client = client_for(FakeTransport::slow(NORMAL_REPLY, Duration::from_millis(200)));

    let analysis = complete_analysis(&machine, &client, &ticket, Duration::from_secs(5));
    let operator = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        machine.lock().expect("machine lock").new_scan().expect("new scan");
    };
    let (completion, ()) = tokio::join!(analysis, operator);

    assert_eq!(completion.expect("lock is healthy"), Completion::Discarded);
    let machine = machine.lock().expect("machine lock");
    assert_eq!(machine.state(), WorkflowState::Home);
    assert!(machine.session().last_result().is_none());
    assert!(machine.session().captured_image().is_none());
}

#[tokio::test]
async fn stale_response_tests_current_result_is_applied() {
    let (machine, ticket) = analyzing_machine();
    let client = client_for(FakeTransport::replying(NORMAL_REPLY));

    let completion = complete_analysis(&machine, &client, &ticket, Duration::from_secs(5))
        .await
        .expect("lock is healthy");

    assert_eq!(completion, Completion::Applied);
    let machine = machine.lock().expect("machine lock");
    assert_eq!(machine.state(), WorkflowState::Results);
    assert_eq!(
        machine.session().last_result().expect("result").confidence,
        87
    );
}
