//! Motion sequencer
//!
//! Runs a robot path or G-code program on a dedicated worker thread:
//! - Single active run, enforced by the [`SequencerState`] machine
//! - Cooperative stop via a cancellation token polled per point
//! - Emergency stop written out of band through the shared transport
//! - Progress, frames, and state changes delivered over an event channel
//!
//! Every run ends with the pen lifted when the transport is still usable.

mod gcode_stream;
mod motion;

use crate::communication::SharedTransport;
use crate::device::{DeviceCommand, DeviceSession};
use crate::params::MotionParams;
use armdraw_core::{
    drain_events, event_channel, thread_safe, ArmGeometry, CancelToken, EventReceiver,
    EventSender, GcodeProgram, RobotPath, RunMode, RunReport, SequencerError, SequencerEvent,
    SequencerState, ThreadSafe, TransportError, WeakEventSender,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where a [`StateCell`] publishes its events
///
/// Only the worker holds a strong sender, so the channel closes when it exits.
#[derive(Clone)]
enum EventLink {
    Worker(EventSender),
    Observer(WeakEventSender),
}

/// Lifecycle state shared by the sequencer and its worker, publishing every change
#[derive(Clone)]
pub(crate) struct StateCell {
    state: ThreadSafe<SequencerState>,
    events: EventLink,
    run_id: Uuid,
}

impl StateCell {
    fn new(state: ThreadSafe<SequencerState>, events: EventSender, run_id: Uuid) -> Self {
        Self {
            state,
            events: EventLink::Worker(events),
            run_id,
        }
    }

    /// Same state, publishing only while the worker is alive
    fn observer(&self) -> Self {
        let events = match &self.events {
            EventLink::Worker(tx) => EventLink::Observer(tx.downgrade()),
            EventLink::Observer(weak) => EventLink::Observer(weak.clone()),
        };
        Self {
            state: self.state.clone(),
            events,
            run_id: self.run_id,
        }
    }

    pub(crate) fn get(&self) -> SequencerState {
        *self.state.lock()
    }

    /// Move to `target` when the machine allows it
    pub(crate) fn transition(&self, target: SequencerState) -> bool {
        let mut state = self.state.lock();
        if *state == target {
            return true;
        }
        if !state.can_transition_to(target) {
            let current = *state;
            debug!(
                run_id = %self.run_id,
                from = %current,
                to = %target,
                "ignored state transition"
            );
            return false;
        }
        *state = target;
        drop(state);

        info!(run_id = %self.run_id, state = %target, "sequencer state changed");
        self.publish(SequencerEvent::StateChanged(target));
        true
    }

    /// Force `Stopping` if a run is still active
    fn interrupt(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_active() || state.is_terminal() || *state == SequencerState::Stopping {
            return false;
        }
        *state = SequencerState::Stopping;
        drop(state);

        self.publish(SequencerEvent::StateChanged(SequencerState::Stopping));
        true
    }

    pub(crate) fn publish(&self, event: SequencerEvent) {
        let sent = match &self.events {
            EventLink::Worker(tx) => tx.send(event).is_ok(),
            EventLink::Observer(weak) => weak.upgrade().is_some_and(|tx| tx.send(event).is_ok()),
        };
        if !sent {
            debug!(run_id = %self.run_id, "event channel closed");
        }
    }
}

/// Stop controls for one run, shared between its handle and the sequencer
#[derive(Clone)]
pub struct StopControl {
    cancel: CancelToken,
    emergency: Arc<AtomicBool>,
    transport: Option<SharedTransport>,
    cell: StateCell,
}

impl StopControl {
    /// Request a cooperative stop; the worker lifts the pen and winds down
    pub fn stop(&self) {
        info!(run_id = %self.cell.run_id, "stop requested");
        self.cancel.cancel();
    }

    /// Cancel the run and write `STOP` to the device immediately
    ///
    /// The worker still lifts the pen before the run ends. Returns the write
    /// error if the `STOP` line could not be sent.
    pub fn emergency_stop(&self) -> Result<(), TransportError> {
        warn!(run_id = %self.cell.run_id, "emergency stop");
        self.emergency.store(true, Ordering::SeqCst);

        // STOP goes out before the worker can observe the cancel and lift the pen
        let written = match &self.transport {
            Some(transport) => transport.lock().write_line(&DeviceCommand::Stop.to_string()),
            None => Ok(()),
        };
        self.cancel.cancel();
        self.cell.interrupt();
        written
    }

    /// True once a stop of either kind was requested
    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn is_emergency(&self) -> bool {
        self.emergency.load(Ordering::SeqCst)
    }
}

/// Context handed to a run's worker thread
pub(crate) struct RunContext {
    pub(crate) run_id: Uuid,
    pub(crate) mode: RunMode,
    pub(crate) params: MotionParams,
    pub(crate) control: StopControl,
    cell: StateCell,
}

impl RunContext {
    pub(crate) fn cell(&self) -> &StateCell {
        &self.cell
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.control.cancel.is_cancelled()
    }

    pub(crate) fn publish(&self, event: SequencerEvent) {
        self.cell.publish(event);
    }
}

/// Handle to a running drawing or G-code stream
pub struct RunHandle {
    run_id: Uuid,
    control: StopControl,
    events: EventReceiver,
    worker: Option<JoinHandle<RunReport>>,
}

impl RunHandle {
    /// Identifier tagging this run's log lines
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stop controls, cloneable for other threads
    pub fn control(&self) -> StopControl {
        self.control.clone()
    }

    /// Request a cooperative stop
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Emergency stop; see [`StopControl::emergency_stop`]
    pub fn emergency_stop(&self) -> Result<(), TransportError> {
        self.control.emergency_stop()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SequencerState {
        self.control.cell.get()
    }

    /// Events queued so far, without blocking
    pub fn try_events(&mut self) -> Vec<SequencerEvent> {
        drain_events(&mut self.events)
    }

    /// Block until the next event; `None` once the worker has exited and the queue is empty
    ///
    /// The worker owns the only strong sender, so a worker that dies without
    /// publishing [`SequencerEvent::Finished`] still ends the stream. Must not be
    /// called from inside an async runtime.
    pub fn next_event(&mut self) -> Option<SequencerEvent> {
        self.events.blocking_recv()
    }

    /// True once the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Wait for the worker and return its report
    pub fn join(mut self) -> Result<RunReport, SequencerError> {
        let worker = self.worker.take().ok_or_else(|| SequencerError::Worker {
            reason: "run already joined".to_string(),
        })?;
        worker.join().map_err(|_| SequencerError::Worker {
            reason: "worker thread panicked".to_string(),
        })
    }
}

/// Owns the device session and starts runs
pub struct MotionSequencer {
    arm: ArmGeometry,
    params: MotionParams,
    state: ThreadSafe<SequencerState>,
    session: Option<ThreadSafe<DeviceSession>>,
    active: Option<StopControl>,
}

impl MotionSequencer {
    /// Create a sequencer with no device attached
    pub fn new(arm: ArmGeometry, params: MotionParams) -> Self {
        Self {
            arm,
            params,
            state: thread_safe(SequencerState::Idle),
            session: None,
            active: None,
        }
    }

    /// Arm geometry used for inverse kinematics
    pub fn arm(&self) -> &ArmGeometry {
        &self.arm
    }

    /// Timing parameters
    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Current lifecycle state
    pub fn state(&self) -> SequencerState {
        *self.state.lock()
    }

    /// Attach an open device session
    pub fn attach_session(&mut self, session: DeviceSession) -> Result<(), SequencerError> {
        if self.state().is_active() {
            return Err(SequencerError::AlreadyRunning);
        }
        info!(port = session.port_name(), "device session attached");
        self.session = Some(thread_safe(session));
        Ok(())
    }

    /// Close and drop the device session
    pub fn disconnect(&mut self) -> Result<(), SequencerError> {
        if self.state().is_active() {
            return Err(SequencerError::AlreadyRunning);
        }
        if let Some(session) = self.session.take() {
            if let Err(e) = session.lock().close() {
                warn!("error closing device session: {}", e);
            }
        }
        Ok(())
    }

    /// True when a session is attached and has not faulted
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.try_lock().map_or(true, |s| s.is_connected()))
    }

    /// Run an operation on the idle device session
    pub fn with_session<R>(
        &self,
        f: impl FnOnce(&mut DeviceSession) -> R,
    ) -> Result<R, SequencerError> {
        if self.state().is_active() {
            return Err(SequencerError::AlreadyRunning);
        }
        let session = self.session.as_ref().ok_or(SequencerError::NotConnected)?;
        let mut guard = session.lock();
        if !guard.is_connected() {
            return Err(SequencerError::NotConnected);
        }
        Ok(f(&mut guard))
    }

    /// Start drawing `path` on the device or in simulation
    pub fn start(&mut self, path: RobotPath, mode: RunMode) -> Result<RunHandle, SequencerError> {
        self.check_idle()?;
        if path.is_empty() {
            return Err(SequencerError::EmptyPath);
        }
        let session = match mode {
            RunMode::Device => Some(self.connected_session()?),
            RunMode::Simulation => None,
        };

        let arm = self.arm;
        self.launch(mode, session, "draw", move |ctx, session| {
            motion::run_drawing(ctx, arm, session, &path)
        })
    }

    /// Stream a G-code program line by line to the device
    pub fn start_gcode(&mut self, program: GcodeProgram) -> Result<RunHandle, SequencerError> {
        self.check_idle()?;
        if program.executable_lines().next().is_none() {
            return Err(SequencerError::EmptyProgram);
        }
        let session = self.connected_session()?;

        self.launch(RunMode::Device, Some(session), "stream", move |ctx, session| {
            gcode_stream::run_stream(ctx, session, &program)
        })
    }

    /// Request a cooperative stop of the active run
    pub fn stop(&self) {
        if let Some(control) = self.active_control() {
            control.stop();
        }
    }

    /// Emergency stop the active run, or halt and lift the pen when idle
    pub fn emergency_stop(&self) -> Result<(), TransportError> {
        if let Some(control) = self.active_control() {
            return control.emergency_stop();
        }

        warn!("emergency stop while idle");
        let session = self.session.as_ref().ok_or(TransportError::NotConnected)?;
        let transport = session.lock().transport_handle();
        let mut transport = transport.lock();
        transport.write_line(&DeviceCommand::Stop.to_string())?;
        transport.write_line(&DeviceCommand::PenUp.to_string())
    }

    fn active_control(&self) -> Option<&StopControl> {
        self.active.as_ref().filter(|_| self.state().is_active())
    }

    fn check_idle(&self) -> Result<(), SequencerError> {
        let state = self.state();
        if state.is_active() {
            return Err(SequencerError::AlreadyRunning);
        }
        Ok(())
    }

    fn connected_session(&self) -> Result<ThreadSafe<DeviceSession>, SequencerError> {
        match &self.session {
            Some(session) if self.is_connected() => Ok(session.clone()),
            _ => Err(SequencerError::NotConnected),
        }
    }

    fn launch<F>(
        &mut self,
        mode: RunMode,
        session: Option<ThreadSafe<DeviceSession>>,
        kind: &str,
        body: F,
    ) -> Result<RunHandle, SequencerError>
    where
        F: FnOnce(&RunContext, Option<ThreadSafe<DeviceSession>>) -> RunReport + Send + 'static,
    {
        let run_id = Uuid::new_v4();
        let (tx, rx) = event_channel();
        let cell = StateCell::new(self.state.clone(), tx, run_id);
        let transport = session.as_ref().map(|s| s.lock().transport_handle());
        let control = StopControl {
            cancel: CancelToken::new(),
            emergency: Arc::new(AtomicBool::new(false)),
            transport,
            cell: cell.observer(),
        };

        if !cell.transition(SequencerState::Homing) {
            return Err(SequencerError::InvalidStateTransition {
                current: cell.get().to_string(),
                requested: SequencerState::Homing.to_string(),
            });
        }

        let ctx = RunContext {
            run_id,
            mode,
            params: self.params.clone(),
            control: control.clone(),
            cell,
        };
        let worker = std::thread::Builder::new()
            .name(format!("armdraw-{}", kind))
            .spawn(move || body(&ctx, session))
            .map_err(|e| {
                *self.state.lock() = SequencerState::Idle;
                SequencerError::Worker {
                    reason: e.to_string(),
                }
            })?;

        info!(run_id = %run_id, %mode, kind, "run started");
        self.active = Some(control.clone());
        Ok(RunHandle {
            run_id,
            control,
            events: rx,
            worker: Some(worker),
        })
    }
}
