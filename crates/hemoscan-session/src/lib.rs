#![warn(missing_docs)]
//! # hemoscan-session
//!
//! ## Purpose
//! Owns the single screening [`Session`] and the workflow state machine that
//! mutates it.
//!
//! ## Responsibilities
//! - Gate the workflow behind an explicit disclaimer acknowledgment.
//! - Track target selection, captured image, and last result.
//! - Hand out generation-tagged [`AnalysisTicket`]s on confirm and apply
//!   completions only when their ticket is still current.
//! - Reject transitions that are undefined for the current state.
//!
//! ## Data flow
//! Presentation events -> [`ScreeningMachine`] transition methods ->
//! [`Session`] snapshot read back by the presentation layer. Confirm emits a
//! ticket; the caller runs inference off the machine and feeds the outcome
//! back through [`ScreeningMachine::complete`].
//!
//! ## Ownership and lifetimes
//! The machine exclusively owns the session. Tickets own a copy of the
//! request, so the in-flight analysis never borrows the machine and the
//! operator can keep navigating while it runs.
//!
//! ## Error model
//! Undefined transitions return [`TransitionError`] and leave the session
//! untouched. Stale completions are not errors; they report
//! [`Completion::Discarded`].
//!
//! ## Example
//! ```rust
//! use hemoscan_capture::synthetic_capture;
//! use hemoscan_core::{AnalysisResult, ScanTarget};
//! use hemoscan_session::{Completion, ScreeningMachine, WorkflowState};
//!
//! let mut machine = ScreeningMachine::new();
//! machine.acknowledge().unwrap();
//! machine.select_target(ScanTarget::Conjunctiva).unwrap();
//! machine.start_screening().unwrap();
//! machine.attach_capture(synthetic_capture(4, 4, [200, 120, 120]).unwrap()).unwrap();
//!
//! let ticket = machine.confirm().unwrap();
//! assert_eq!(machine.state(), WorkflowState::Analyzing);
//!
//! let outcome = machine.complete(&ticket, AnalysisResult::fallback());
//! assert_eq!(outcome, Completion::Applied);
//! assert_eq!(machine.state(), WorkflowState::Results);
//! ```

use std::fmt;

use hemoscan_capture::{CaptureConfig, CaptureError, CaptureInput, capture_image_with};
use hemoscan_core::{AnalysisRequest, AnalysisResult, CapturedImage, ScanTarget};
use hemoscan_prompt::build_prompt;
use thiserror::Error;
use tracing::{debug, info};

/// Workflow position of the screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    /// Initial research-use disclaimer; never re-entered once acknowledged.
    Disclaimer,
    /// Landing view with target selection.
    Home,
    /// Capture and preview.
    Scan,
    /// Inference request outstanding.
    Analyzing,
    /// Result on display.
    Results,
    /// Static education detour.
    Education,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Operator or pipeline action, used in transition errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Accept the disclaimer.
    Acknowledge,
    /// Choose a scan target.
    SelectTarget,
    /// Move from home to capture.
    StartScreening,
    /// Open the education view.
    OpenEducation,
    /// Navigate back to home.
    Back,
    /// Provide a photo.
    Capture,
    /// Drop the current preview.
    DiscardCapture,
    /// Submit the captured photo for analysis.
    Confirm,
    /// Start over after a result or abandon an in-flight analysis.
    NewScan,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Per-screening state read by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    state: WorkflowState,
    scan_target: ScanTarget,
    captured_image: Option<CapturedImage>,
    last_result: Option<AnalysisResult>,
}

impl Session {
    fn new() -> Self {
        Self {
            state: WorkflowState::Disclaimer,
            scan_target: ScanTarget::default(),
            captured_image: None,
            last_result: None,
        }
    }

    /// Current workflow state.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Selected scan target.
    pub fn scan_target(&self) -> ScanTarget {
        self.scan_target
    }

    /// Image awaiting confirmation or under analysis.
    pub fn captured_image(&self) -> Option<&CapturedImage> {
        self.captured_image.as_ref()
    }

    /// Most recent applied result.
    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.last_result.as_ref()
    }

    fn clear_screening(&mut self) {
        self.captured_image = None;
        self.last_result = None;
    }
}

/// Proof of one confirm, carrying the request to send.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    generation: u64,
    request: AnalysisRequest,
}

impl AnalysisTicket {
    /// Generation this ticket was issued for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Request to hand to the inference client.
    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }
}

/// Outcome of feeding a result back into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Result stored; machine moved to `Results`.
    Applied,
    /// Ticket was superseded; session left untouched.
    Discarded,
}

/// Screening workflow state machine with explicit legal transitions.
#[derive(Debug, Clone)]
pub struct ScreeningMachine {
    session: Session,
    generation: u64,
}

impl ScreeningMachine {
    /// Creates a machine in `Disclaimer` with the default target.
    pub fn new() -> Self {
        Self {
            session: Session::new(),
            generation: 0,
        }
    }

    /// Returns the session snapshot.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the current workflow state.
    pub fn state(&self) -> WorkflowState {
        self.session.state
    }

    /// Returns `true` when back navigation is available.
    pub fn can_go_back(&self) -> bool {
        !matches!(
            self.session.state,
            WorkflowState::Disclaimer | WorkflowState::Analyzing
        )
    }

    /// `Disclaimer -> Home`.
    pub fn acknowledge(&mut self) -> Result<(), TransitionError> {
        self.require(Action::Acknowledge, &[WorkflowState::Disclaimer])?;
        self.enter(WorkflowState::Home);
        Ok(())
    }

    /// Updates the target while in `Home` or `Scan`.
    pub fn select_target(&mut self, target: ScanTarget) -> Result<(), TransitionError> {
        self.require(
            Action::SelectTarget,
            &[WorkflowState::Home, WorkflowState::Scan],
        )?;
        if self.session.scan_target != target {
            debug!(from = %self.session.scan_target, to = %target, "scan target selected");
        }
        self.session.scan_target = target;
        Ok(())
    }

    /// `Home -> Scan`.
    pub fn start_screening(&mut self) -> Result<(), TransitionError> {
        self.require(Action::StartScreening, &[WorkflowState::Home])?;
        self.enter(WorkflowState::Scan);
        Ok(())
    }

    /// `Home -> Education`.
    pub fn open_education(&mut self) -> Result<(), TransitionError> {
        self.require(Action::OpenEducation, &[WorkflowState::Home])?;
        self.enter(WorkflowState::Education);
        Ok(())
    }

    /// Returns to `Home` from any state except `Disclaimer` and `Analyzing`.
    ///
    /// Leaving `Scan` drops the unconfirmed preview; leaving `Results` ends
    /// the screening.
    pub fn back(&mut self) -> Result<(), TransitionError> {
        self.require(
            Action::Back,
            &[
                WorkflowState::Home,
                WorkflowState::Scan,
                WorkflowState::Education,
                WorkflowState::Results,
            ],
        )?;
        if matches!(self.session.state, WorkflowState::Scan | WorkflowState::Results) {
            self.session.clear_screening();
        }
        self.enter(WorkflowState::Home);
        Ok(())
    }

    /// Captures a photo in `Scan` with default encoding parameters.
    ///
    /// # Errors
    /// See [`ScreeningMachine::capture_with`].
    pub fn capture(
        &mut self,
        selection: Option<CaptureInput>,
    ) -> Result<&CapturedImage, TransitionError> {
        self.capture_with(selection, CaptureConfig::default())
    }

    /// Captures a photo in `Scan`, replacing any previous preview.
    ///
    /// # Errors
    /// Returns [`TransitionError::Rejected`] outside `Scan` and
    /// [`TransitionError::Capture`] when the adapter fails. On error the
    /// state and any earlier preview are kept.
    pub fn capture_with(
        &mut self,
        selection: Option<CaptureInput>,
        config: CaptureConfig,
    ) -> Result<&CapturedImage, TransitionError> {
        self.require(Action::Capture, &[WorkflowState::Scan])?;
        let image = capture_image_with(selection, config)?;
        Ok(self.store_capture(image))
    }

    /// Stores an image captured by the presentation layer itself.
    ///
    /// # Errors
    /// Returns [`TransitionError::Rejected`] outside `Scan`.
    pub fn attach_capture(&mut self, image: CapturedImage) -> Result<&CapturedImage, TransitionError> {
        self.require(Action::Capture, &[WorkflowState::Scan])?;
        Ok(self.store_capture(image))
    }

    /// Drops the unconfirmed preview while staying in `Scan`.
    pub fn discard_capture(&mut self) -> Result<(), TransitionError> {
        self.require(Action::DiscardCapture, &[WorkflowState::Scan])?;
        self.session.captured_image = None;
        Ok(())
    }

    /// `Scan -> Analyzing`; builds the request and issues a fresh ticket.
    ///
    /// # Errors
    /// Returns [`TransitionError::Rejected`] outside `Scan` and
    /// [`TransitionError::MissingCapture`] when nothing was captured.
    pub fn confirm(&mut self) -> Result<AnalysisTicket, TransitionError> {
        self.require(Action::Confirm, &[WorkflowState::Scan])?;
        let image = self
            .session
            .captured_image
            .as_ref()
            .ok_or(TransitionError::MissingCapture)?;

        let target = self.session.scan_target;
        let request = AnalysisRequest::new(target, image, build_prompt(target));

        self.generation += 1;
        self.enter(WorkflowState::Analyzing);
        info!(
            generation = self.generation,
            scan_target = %target,
            image_digest = %request.image_digest,
            "analysis requested"
        );

        Ok(AnalysisTicket {
            generation: self.generation,
            request,
        })
    }

    /// Applies an analysis outcome if `ticket` is still the outstanding one.
    pub fn complete(&mut self, ticket: &AnalysisTicket, result: AnalysisResult) -> Completion {
        if self.session.state != WorkflowState::Analyzing || ticket.generation != self.generation {
            debug!(
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                state = %self.session.state,
                "stale analysis completion discarded"
            );
            return Completion::Discarded;
        }

        info!(
            generation = ticket.generation,
            prediction = result.prediction.as_str(),
            confidence = result.confidence,
            "analysis completed"
        );
        self.session.last_result = Some(result);
        self.enter(WorkflowState::Results);
        Completion::Applied
    }

    /// Resets the screening and returns `Home` from `Results` or `Analyzing`.
    ///
    /// An in-flight request abandoned this way is discarded when it arrives.
    pub fn new_scan(&mut self) -> Result<(), TransitionError> {
        self.require(
            Action::NewScan,
            &[WorkflowState::Results, WorkflowState::Analyzing],
        )?;
        if self.session.state == WorkflowState::Analyzing {
            info!(generation = self.generation, "in-flight analysis abandoned");
        }
        self.session.clear_screening();
        self.enter(WorkflowState::Home);
        Ok(())
    }

    fn store_capture(&mut self, image: CapturedImage) -> &CapturedImage {
        debug!(image_digest = image.digest(), "capture stored for review");
        self.session.captured_image.insert(image)
    }

    fn require(&self, action: Action, allowed: &[WorkflowState]) -> Result<(), TransitionError> {
        if allowed.contains(&self.session.state) {
            Ok(())
        } else {
            debug!(%action, state = %self.session.state, "transition rejected");
            Err(TransitionError::Rejected {
                action,
                state: self.session.state,
            })
        }
    }

    fn enter(&mut self, next: WorkflowState) {
        debug!(from = %self.session.state, to = %next, "workflow transition");
        self.session.state = next;
    }
}

impl Default for ScreeningMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors produced by workflow transitions.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// Action is not defined for the current state.
    #[error("{action} is not allowed while in {state}")]
    Rejected {
        /// Attempted action.
        action: Action,
        /// State at the time of the attempt.
        state: WorkflowState,
    },
    /// Confirm was attempted without a captured image.
    #[error("no captured image to analyze")]
    MissingCapture,
    /// Capture adapter failed; operator should try again.
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
}
