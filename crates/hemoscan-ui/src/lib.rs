#![warn(missing_docs)]
//! # hemoscan-ui
//!
//! ## Purpose
//! Display-safe projections of screening state for whatever presentation
//! layer drives the workflow.
//!
//! ## Responsibilities
//! - Project an [`AnalysisResult`] into headline, subline, gauge, and tone.
//! - Supply per-target capture guidance and target picker labels.
//! - Expose the static disclaimer and nutrition education copy.
//! - Report which navigation affordances the current state offers.
//!
//! ## Data flow
//! [`hemoscan_session::Session`] snapshot -> projection structs here ->
//! rendered text in the shell (CLI or otherwise).
//!
//! ## Ownership and lifetimes
//! Static copy is `&'static str`; result projections own their strings so a
//! renderer can hold them after the session moves on.
//!
//! ## Error model
//! Projections are total over their inputs; there is nothing to fail.
//!
//! ## Security and privacy notes
//! Views never carry image payloads or provider credentials.

use hemoscan_core::{AnalysisResult, PallorLevel, Prediction, ScanTarget};
use hemoscan_session::{Session, WorkflowState};

/// Disclaimer headline shown before the workflow unlocks.
pub const DISCLAIMER_TITLE: &str = "Research & Academic Use Only";

/// Disclaimer body text.
pub const DISCLAIMER_TEXT: &str = "This AI system has the potential to assist in early-stage anemia \
screening and can be developed into a diagnostic tool in the future. However, the current version \
is for academic and research use only. Clinical confirmation through a hemoglobin test is still required.";

/// Label of the control that acknowledges the disclaimer.
pub const ACKNOWLEDGE_LABEL: &str = "I Understand, Continue";

/// Label of the control that starts over from a result.
pub const NEW_SCAN_LABEL: &str = "Scan New Patient";

/// One static nutrition tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EducationTip {
    /// Short heading.
    pub title: &'static str,
    /// One-sentence advice.
    pub body: &'static str,
}

/// Nutrition tips shown in the education view.
pub const EDUCATION_TIPS: [EducationTip; 3] = [
    EducationTip {
        title: "Iron-Rich Diet",
        body: "Include spinach, lentils, red meat, and fortified cereals in your daily meals.",
    },
    EducationTip {
        title: "Vitamin C Boost",
        body: "Eat citrus fruits (oranges, lemons) with iron foods to increase absorption by 3x.",
    },
    EducationTip {
        title: "Avoid Tea/Coffee",
        body: "Avoid drinking tea or coffee with meals as they can block iron absorption.",
    },
];

/// Operator instructions for photographing `target`.
pub fn capture_guidance(target: ScanTarget) -> [&'static str; 3] {
    match target {
        ScanTarget::NailBed => [
            "Place fingers flat on a white surface",
            "Avoid shadows and glare",
            "Remove nail polish if possible",
        ],
        ScanTarget::Conjunctiva => [
            "Gently pull down the lower eyelid",
            "Look up while capturing the photo",
            "Use soft, natural lighting",
        ],
        ScanTarget::Palm => [
            "Open the hand flat with fingers slightly spread",
            "Keep the palm parallel to the camera",
            "Use even daylight without colored light sources",
        ],
    }
}

/// Picker label and hint for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetOption {
    /// Target this option selects.
    pub target: ScanTarget,
    /// Button label.
    pub label: &'static str,
    /// Secondary hint line.
    pub hint: &'static str,
}

/// Picker options in display order.
pub fn target_options() -> [TargetOption; 3] {
    ScanTarget::ALL.map(|target| {
        let (label, hint) = match target {
            ScanTarget::NailBed => ("Fingernails", "Check for pallor in nail beds"),
            ScanTarget::Conjunctiva => ("Eye (Conjunctiva)", "Check lower eyelid pallor"),
            ScanTarget::Palm => ("Palm", "Check palmar crease pallor"),
        };
        TargetOption {
            target,
            label,
            hint,
        }
    })
}

/// Color family for the result header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTone {
    /// Anemic finding.
    Alert,
    /// Normal finding.
    Reassuring,
    /// Indeterminate; operator should retake the photo.
    Neutral,
}

/// Display projection of one analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    /// Large status line.
    pub headline: String,
    /// Secondary status line.
    pub subline: String,
    /// Pallor marker offset in percent along the gauge; hidden when `None`.
    pub gauge_percent: Option<u8>,
    /// Detected pallor label shown under the gauge.
    pub pallor_label: &'static str,
    /// Header color family.
    pub tone: ResultTone,
    /// Model reasoning.
    pub reasoning: String,
    /// Recommendation bullets; empty hides the section.
    pub recommendations: Vec<String>,
}

impl ResultView {
    /// Projects `result` for display.
    pub fn from_result(result: &AnalysisResult) -> Self {
        let uncertain = result.prediction == Prediction::Uncertain;
        let (headline, subline) = if uncertain {
            ("Try Again".to_string(), "Could not analyze image".to_string())
        } else {
            (
                result.prediction.as_str().to_string(),
                format!("Likelihood: {}%", result.confidence),
            )
        };

        Self {
            headline,
            subline,
            gauge_percent: (!uncertain).then(|| gauge_percent(result.pallor_level)),
            pallor_label: result.pallor_level.as_str(),
            tone: match result.prediction {
                Prediction::Anemic => ResultTone::Alert,
                Prediction::Normal => ResultTone::Reassuring,
                Prediction::Uncertain => ResultTone::Neutral,
            },
            reasoning: result.reasoning.clone(),
            recommendations: result.recommendations.clone(),
        }
    }
}

/// Gauge marker offset for a pallor level.
pub fn gauge_percent(level: PallorLevel) -> u8 {
    match level {
        PallorLevel::None => 15,
        PallorLevel::Mild => 40,
        PallorLevel::Moderate => 65,
        PallorLevel::Severe => 90,
    }
}

/// Navigation affordances for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationView {
    /// Whether the back control is offered.
    pub back_available: bool,
    /// Whether the workflow is waiting on inference.
    pub busy: bool,
}

impl NavigationView {
    /// Projects navigation for `state`.
    pub fn for_state(state: WorkflowState) -> Self {
        Self {
            back_available: !matches!(state, WorkflowState::Disclaimer | WorkflowState::Analyzing),
            busy: state == WorkflowState::Analyzing,
        }
    }

    /// Projects navigation for the session's current state.
    pub fn for_session(session: &Session) -> Self {
        Self::for_state(session.state())
    }
}
