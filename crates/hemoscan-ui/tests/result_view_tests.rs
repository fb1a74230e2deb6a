//! Integration tests for display projections.

use hemoscan_core::{AnalysisResult, PallorLevel, Prediction, ScanTarget};
use hemoscan_session::{ScreeningMachine, WorkflowState};
use hemoscan_ui::{
    EDUCATION_TIPS, NavigationView, ResultTone, ResultView, capture_guidance, target_options,
};

fn anemic_result() -> AnalysisResult {
    AnalysisResult {
        prediction: Prediction::Anemic,
        confidence: 72,
        pallor_level: PallorLevel::Moderate,
        reasoning: "Pale conjunctival rim".to_string(),
        recommendations: vec!["Get a hemoglobin test".to_string()],
    }
}

#[test]
fn result_view_tests_anemic_result_shows_likelihood_and_gauge() {
    let view = ResultView::from_result(&anemic_result());
    assert_eq!(view.headline, "Anemic");
    assert_eq!(view.subline, "Likelihood: 72%");
    assert_eq!(view.gauge_percent, Some(65));
    assert_eq!(view.pallor_label, "Moderate");
    assert_eq!(view.tone, ResultTone::Alert);
}

#[test]
fn result_view_tests_normal_result_is_reassuring() {
    let mut result = anemic_result();
    result.prediction = Prediction::Normal;
    result.pallor_level = PallorLevel::None;
    let view = ResultView::from_result(&result);
    assert_eq!(view.headline, "Normal");
    assert_eq!(view.gauge_percent, Some(15));
    assert_eq!(view.tone, ResultTone::Reassuring);
}

#[test]
fn result_view_tests_every_target_has_guidance_and_label() {
    for option in target_options() {
        let tips = capture_guidance(option.target);
        assert!(tips.iter().all(|tip| !tip.is_empty()));
        assert!(!option.label.is_empty());
    }
    assert_eq!(target_options()[0].target, ScanTarget::NailBed);
    assert_eq!(
        capture_guidance(ScanTarget::Conjunctiva)[0],
        "Gently pull down the lower eyelid"
    );
    assert_eq!(EDUCATION_TIPS.len(), 3);
}

#[test]
fn result_view_tests_navigation_follows_machine_state() {
    let mut machine = ScreeningMachine::new();
    let view = NavigationView::for_session(machine.session());
    assert!(!view.back_available);

    machine.acknowledge().expect("acknowledge");
    let view = NavigationView::for_session(machine.session());
    assert!(view.back_available);
    assert!(!view.busy);

    let analyzing = NavigationView::for_state(WorkflowState::Analyzing);
    assert!(!analyzing.back_available);
    assert!(analyzing.busy);
    assert_eq!(
        NavigationView::for_state(machine.state()).back_available,
        machine.can_go_back()
    );
}
