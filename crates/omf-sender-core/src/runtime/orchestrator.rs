// crates/omf-sender-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Delivery Orchestrator
// Description: Ordered type, container, and data delivery across destinations.
// Purpose: Sequence OMF sends, isolate failures per destination, and tear down.
// Dependencies: crate::{core, interfaces}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`DeliveryOrchestrator::run`] drives every selected destination through
//! `Idle -> TypesSent -> ContainersSent -> DataStreaming -> Cleanup -> Done`.
//! `Failed` is reachable from any phase and never blocks sibling destinations.
//! Invariants:
//! - Dispatch is sequential and deterministic: destinations in declaration
//!   order, messages in catalog order.
//! - A creation failure stops further creation and data sends for that
//!   destination only.
//! - A data failure ends that destination's current cycle. Continuous runs
//!   resume it on the next cycle; test mode marks it `Failed`.
//! - Reports keep a failure count plus only the most recent
//!   [`MAX_RETAINED_FAILURES`] failures, so unbounded runs stay bounded.
//! - Teardown is best effort and never changes the overall result.
//! - In test mode any recorded failure is returned as
//!   [`RunError::DestinationsFailed`] after teardown has run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::Action;
use crate::core::ContainerId;
use crate::core::DeliveryError;
use crate::core::DeliveryOutcome;
use crate::core::Destination;
use crate::core::DestinationName;
use crate::core::MessageCatalog;
use crate::core::MessageKind;
use crate::interfaces::DataGenerator;
use crate::interfaces::MessageSender;
use crate::interfaces::RunObserver;
use crate::runtime::events::RunEvent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Most recent failures kept per destination report.
pub const MAX_RETAINED_FAILURES: usize = 32;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Number of data cycles to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleLimit {
    /// Run exactly this many cycles.
    Fixed(u64),
    /// Run until the cancellation flag is raised.
    UntilStopped,
}

impl CycleLimit {
    /// Returns true once `completed` cycles satisfy the limit.
    const fn reached(self, completed: u64) -> bool {
        match self {
            Self::Fixed(limit) => completed >= limit,
            Self::UntilStopped => false,
        }
    }
}

/// Run configuration for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Data cycle limit.
    pub cycles: CycleLimit,
    /// Delay between data cycles.
    pub cycle_interval: Duration,
    /// Return an error after teardown when any destination failed.
    pub test_mode: bool,
    /// Delete containers then types on every contacted destination at the end.
    pub cleanup: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            cycles: CycleLimit::Fixed(1),
            cycle_interval: Duration::from_secs(1),
            test_mode: false,
            cleanup: true,
        }
    }
}

/// Shared cancellation signal checked between cycles and destinations.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Per-destination lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationPhase {
    /// Not contacted yet.
    Idle,
    /// Every type was accepted or already existed.
    TypesSent,
    /// Every container was accepted or already existed.
    ContainersSent,
    /// Receiving data cycles.
    DataStreaming,
    /// Teardown in progress.
    Cleanup,
    /// Finished without recorded failures.
    Done,
    /// An unrecoverable failure stopped delivery.
    Failed,
}

/// Failure recorded for one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    /// Message kind that failed.
    pub message_type: MessageKind,
    /// Requested action.
    pub action: Action,
    /// Failure detail.
    pub error: DeliveryError,
}

/// Final state of one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationReport {
    /// Destination name.
    pub name: DestinationName,
    /// Final phase.
    pub phase: DestinationPhase,
    /// Creation and data sends accepted.
    pub accepted: u64,
    /// Creation and data sends that already existed.
    pub duplicates: u64,
    /// Failures that count against the run.
    pub failure_count: u64,
    /// Most recent failures, oldest first, at most [`MAX_RETAINED_FAILURES`].
    pub failures: VecDeque<RecordedFailure>,
    /// Teardown sends that failed (not counted against the run).
    pub cleanup_failures: u64,
}

impl DestinationReport {
    /// Creates an idle report.
    fn new(name: DestinationName) -> Self {
        Self {
            name,
            phase: DestinationPhase::Idle,
            accepted: 0,
            duplicates: 0,
            failure_count: 0,
            failures: VecDeque::new(),
            cleanup_failures: 0,
        }
    }

    /// Returns true when no failure was recorded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failure_count == 0
    }

    /// Counts a failure and retains it, evicting the oldest past the cap.
    fn record_failure(&mut self, failure: RecordedFailure) {
        self.failure_count += 1;
        if self.failures.len() == MAX_RETAINED_FAILURES {
            self.failures.pop_front();
        }
        self.failures.push_back(failure);
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Reports for selected destinations, in declaration order.
    pub destinations: Vec<DestinationReport>,
    /// Completed data cycles.
    pub cycles_completed: u64,
    /// Whether the run stopped on cancellation.
    pub cancelled: bool,
}

impl RunReport {
    /// Returns true when no destination recorded a failure.
    #[must_use]
    pub fn success(&self) -> bool {
        self.destinations.iter().all(DestinationReport::succeeded)
    }

    /// Returns the number of destinations with recorded failures.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.destinations.iter().filter(|report| !report.succeeded()).count()
    }

    /// Looks up a destination report by name.
    #[must_use]
    pub fn destination(&self, name: &str) -> Option<&DestinationReport> {
        self.destinations.iter().find(|report| report.name.as_str() == name)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by [`DeliveryOrchestrator::run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// No destination is selected.
    #[error("no destinations selected")]
    NoDestinationsSelected,
    /// Test mode observed failures; teardown has already run.
    #[error("{failed} destination(s) failed delivery")]
    DestinationsFailed {
        /// Number of failed destinations.
        failed: usize,
        /// Full run report.
        report: Box<RunReport>,
    },
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Destination paired with its evolving report.
struct DestinationTrack<'a> {
    /// Resolved destination.
    destination: &'a Destination,
    /// Report updated as sends complete.
    report: DestinationReport,
}

/// Sequences OMF delivery across destinations.
pub struct DeliveryOrchestrator<S, G, O> {
    /// Transport used for every send.
    sender: S,
    /// Data record regeneration.
    generator: G,
    /// Event sink.
    observer: O,
    /// Run configuration.
    options: RunOptions,
    /// Cooperative cancellation signal.
    cancellation: CancellationFlag,
}

impl<S, G, O> DeliveryOrchestrator<S, G, O>
where
    S: MessageSender,
    G: DataGenerator,
    O: RunObserver,
{
    /// Creates an orchestrator.
    pub fn new(sender: S, generator: G, observer: O, options: RunOptions) -> Self {
        Self {
            sender,
            generator,
            observer,
            options,
            cancellation: CancellationFlag::new(),
        }
    }

    /// Replaces the cancellation flag.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns the sender.
    pub const fn sender(&self) -> &S {
        &self.sender
    }

    /// Consumes the orchestrator and returns the sender.
    pub fn into_sender(self) -> S {
        self.sender
    }

    /// Runs creation, data cycles, and teardown for every selected destination.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::NoDestinationsSelected`] when nothing is selected and
    /// [`RunError::DestinationsFailed`] in test mode when any destination failed.
    pub fn run(
        &mut self,
        destinations: &[Destination],
        catalog: &MessageCatalog,
    ) -> Result<RunReport, RunError> {
        let mut tracks: Vec<DestinationTrack<'_>> = destinations
            .iter()
            .filter(|destination| destination.is_selected())
            .map(|destination| DestinationTrack {
                destination,
                report: DestinationReport::new(destination.name().clone()),
            })
            .collect();
        if tracks.is_empty() {
            return Err(RunError::NoDestinationsSelected);
        }
        for track in &tracks {
            if !track.destination.verify_tls() {
                self.observer.record(&RunEvent::TlsVerificationDisabled {
                    destination: track.destination.name().to_string(),
                });
            }
        }

        let mut cancelled = false;
        for track in &mut tracks {
            if self.cancellation.is_cancelled() {
                cancelled = true;
                break;
            }
            self.create_entities(track, catalog);
        }

        let cycles_completed = if cancelled {
            0
        } else {
            let (completed, stopped) = self.stream_data(&mut tracks, catalog);
            cancelled = stopped;
            completed
        };

        for track in &mut tracks {
            if self.options.cleanup && track.report.phase != DestinationPhase::Idle {
                self.tear_down(track, catalog);
            }
            if track.report.phase != DestinationPhase::Failed {
                self.enter(track, DestinationPhase::Done);
            }
        }

        let report = RunReport {
            destinations: tracks.into_iter().map(|track| track.report).collect(),
            cycles_completed,
            cancelled,
        };
        self.observer.record(&RunEvent::RunFinished {
            success: report.success(),
            cancelled,
            cycles: cycles_completed,
        });
        if self.options.test_mode && !report.success() {
            return Err(RunError::DestinationsFailed {
                failed: report.failed_count(),
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    /// Sends every type then every container; stops at the first failure.
    fn create_entities(&mut self, track: &mut DestinationTrack<'_>, catalog: &MessageCatalog) {
        for body in catalog.types() {
            if self.deliver(track, MessageKind::Type, body, Action::Create).is_err() {
                self.enter(track, DestinationPhase::Failed);
                return;
            }
        }
        self.enter(track, DestinationPhase::TypesSent);
        for body in catalog.containers() {
            if self.deliver(track, MessageKind::Container, body, Action::Create).is_err() {
                self.enter(track, DestinationPhase::Failed);
                return;
            }
        }
        self.enter(track, DestinationPhase::ContainersSent);
    }

    /// Runs data cycles; returns completed cycles and whether cancellation stopped them.
    fn stream_data(
        &mut self,
        tracks: &mut [DestinationTrack<'_>],
        catalog: &MessageCatalog,
    ) -> (u64, bool) {
        for track in tracks.iter_mut() {
            if track.report.phase == DestinationPhase::ContainersSent {
                self.enter(track, DestinationPhase::DataStreaming);
            }
        }
        let mut states: BTreeMap<ContainerId, G::State> = BTreeMap::new();
        let mut completed = 0_u64;
        while !self.options.cycles.reached(completed) {
            if self.cancellation.is_cancelled() {
                return (completed, true);
            }
            let records = self.regenerate(catalog, &mut states);
            for track in tracks.iter_mut() {
                if self.cancellation.is_cancelled() {
                    return (completed, true);
                }
                if track.report.phase != DestinationPhase::DataStreaming {
                    continue;
                }
                for record in &records {
                    if self.deliver(track, MessageKind::Data, record, Action::Create).is_err() {
                        if self.options.test_mode {
                            self.enter(track, DestinationPhase::Failed);
                        }
                        break;
                    }
                }
            }
            completed += 1;
            self.observer.record(&RunEvent::CycleCompleted {
                cycle: completed,
            });
            if !self.options.cycles.reached(completed) && !self.options.cycle_interval.is_zero() {
                thread::sleep(self.options.cycle_interval);
            }
        }
        (completed, false)
    }

    /// Regenerates one record per data template, threading per-container state.
    fn regenerate(
        &self,
        catalog: &MessageCatalog,
        states: &mut BTreeMap<ContainerId, G::State>,
    ) -> Vec<Value> {
        catalog
            .data()
            .iter()
            .map(|template| {
                let state = states.entry(template.container_id().clone()).or_default();
                let (record, next) = self.generator.generate(template, state);
                *state = next;
                record
            })
            .collect()
    }

    /// Deletes containers then types; failures are reported, never escalated.
    fn tear_down(&mut self, track: &mut DestinationTrack<'_>, catalog: &MessageCatalog) {
        let failed = track.report.phase == DestinationPhase::Failed;
        self.enter(track, DestinationPhase::Cleanup);
        let deletes = catalog
            .containers()
            .iter()
            .map(|body| (MessageKind::Container, body))
            .chain(catalog.types().iter().map(|body| (MessageKind::Type, body)));
        for (kind, body) in deletes {
            let destination = track.destination;
            match self.sender.send(destination, kind, body, Action::Delete) {
                Ok(outcome) => self.observer.record(&RunEvent::MessageDelivered {
                    destination: destination.name().to_string(),
                    message_type: kind,
                    action: Action::Delete,
                    outcome,
                }),
                Err(err) => {
                    track.report.cleanup_failures += 1;
                    self.observer.record(&RunEvent::CleanupFailed {
                        destination: destination.name().to_string(),
                        message_type: kind,
                        error: err.to_string(),
                    });
                }
            }
        }
        if failed {
            self.enter(track, DestinationPhase::Failed);
        }
    }

    /// Sends one message and records its outcome on the track.
    fn deliver(
        &mut self,
        track: &mut DestinationTrack<'_>,
        kind: MessageKind,
        body: &Value,
        action: Action,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let destination = track.destination;
        match self.sender.send(destination, kind, body, action) {
            Ok(outcome) => {
                match outcome {
                    DeliveryOutcome::Accepted => track.report.accepted += 1,
                    DeliveryOutcome::Duplicate => track.report.duplicates += 1,
                }
                self.observer.record(&RunEvent::MessageDelivered {
                    destination: destination.name().to_string(),
                    message_type: kind,
                    action,
                    outcome,
                });
                Ok(outcome)
            }
            Err(err) => {
                self.observer.record(&RunEvent::delivery_failed(
                    destination.name().as_str(),
                    kind,
                    action,
                    &err,
                ));
                track.report.record_failure(RecordedFailure {
                    message_type: kind,
                    action,
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    /// Moves a destination to `phase` and reports the transition.
    fn enter(&self, track: &mut DestinationTrack<'_>, phase: DestinationPhase) {
        if track.report.phase == phase {
            return;
        }
        track.report.phase = phase;
        self.observer.record(&RunEvent::PhaseEntered {
            destination: track.destination.name().to_string(),
            phase,
        });
    }
}
