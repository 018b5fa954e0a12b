use std::sync::Arc;

use super::Shared;
use crate::error::SessionError;
use crate::runtime::{FrameSnapshot, ThreadId};

/// Reason a thread was stopped, readable by the front end while the stop
/// callout is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// The thread is not stopped.
    #[default]
    None,

    /// A requested step completed.
    Step,

    /// A breakpoint was hit.
    Breakpoint,

    /// A raised exception matched a catchpoint.
    Catchpoint,
}

/// Per-thread stepping flags.
///
/// One named boolean per concern; flags are set and consumed by the gate,
/// the dispatcher and the stepping operations.
#[derive(Debug, Default)]
pub(crate) struct ContextFlags {
    /// The thread is debugger-internal and never participates in stepping.
    pub ignore: bool,

    /// An external halt was requested; honored at the next gate admission.
    pub suspend: bool,

    /// The suspend took effect while the thread was mid-execution.
    pub was_running: bool,

    /// A step request already satisfied the current event cycle.
    pub stepped: bool,

    /// Suppress the "line changed" requirement when counting steps.
    pub force_move: bool,

    /// One-shot pause request, consumed at the next line event.
    pub pause: bool,

    /// The thread is inside a section excluded from debugging.
    pub skip_section: bool,
}

/// Per-thread execution state record.
///
/// Created lazily on the first event observed from a thread, pruned when the
/// thread dies, destroyed at session teardown.
#[derive(Debug)]
pub(crate) struct ExecutionContext {
    pub ordinal: u32,

    /// Line events remaining before an unconditional stop (-1 = inactive).
    pub step_next: i32,

    /// "Moved to a different line" events remaining before a stop
    /// (-1 = inactive).
    pub step_line: i32,

    /// Stack depth at which a pending step-out fires (-1 = unset).
    pub stop_frame: i32,

    /// Target stack depth of a step-over (-1 = unset).
    pub dest_frame: i32,

    /// Incrementally maintained stack depth; never negative.
    pub calced_stack_size: u32,

    /// Depth reconciled against the runtime's ground truth when available.
    pub stack_size: u32,

    pub last_file: Option<String>,
    pub last_line: Option<u32>,

    pub flags: ContextFlags,
    pub stop_reason: StopReason,

    /// Stack snapshot captured on the last stop decision; cleared when the
    /// gate is released.
    pub frames: Vec<FrameSnapshot>,
}

impl ExecutionContext {
    pub fn new(ordinal: u32) -> Self {
        Self {
            ordinal,
            step_next: -1,
            step_line: -1,
            stop_frame: -1,
            dest_frame: -1,
            calced_stack_size: 0,
            stack_size: 0,
            last_file: None,
            last_line: None,
            flags: ContextFlags::default(),
            stop_reason: StopReason::None,
            frames: Vec::new(),
        }
    }

    /// Returns all stepping counters to their inactive sentinel.
    pub fn reset_stepping(&mut self) {
        self.step_next = -1;
        self.step_line = -1;
        self.stop_frame = -1;
        self.dest_frame = -1;
    }
}

/// Handle over a thread's execution context.
///
/// Handles are cheap to clone and remain valid for the lifetime of the debug
/// session; operations on a handle whose thread has died (or whose session
/// was stopped) return a [`SessionError`].
#[derive(Clone)]
pub struct Context {
    shared: Arc<Shared>,
    thread: ThreadId,
    ordinal: u32,
}

impl Context {
    pub(crate) fn new(shared: Arc<Shared>, thread: ThreadId, ordinal: u32) -> Self {
        Self {
            shared,
            thread,
            ordinal,
        }
    }

    /// Identity of the thread this context tracks.
    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    /// Small per-session context number, for diagnostics.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    fn with<T>(&self, f: impl FnOnce(&mut ExecutionContext) -> T) -> Result<T, SessionError> {
        let mut st = self.shared.lock();
        let state = st.as_mut().ok_or(SessionError::NotStarted)?;
        let ctx = state
            .contexts
            .get_mut(&self.thread)
            .ok_or(SessionError::UnknownThread(self.thread))?;
        Ok(f(ctx))
    }

    /// Arms a step-into: execution stops after `steps` qualifying line
    /// events.
    ///
    /// By default every line event qualifies; with `force` set, only events
    /// that moved to a different source line are counted.
    pub fn step_into(&self, steps: u32, force: bool) -> Result<(), SessionError> {
        self.with(|ctx| {
            ctx.step_next = i32::try_from(steps).unwrap_or(i32::MAX);
            ctx.flags.force_move = force;
        })
    }

    /// Arms a step-over: execution stops after `lines` line changes observed
    /// at the current stack depth, ignoring lines executed by deeper calls.
    pub fn step_over(&self, lines: u32, force: bool) -> Result<(), SessionError> {
        self.with(|ctx| {
            ctx.step_line = i32::try_from(lines).unwrap_or(i32::MAX);
            ctx.dest_frame = depth_as_frame(ctx.calced_stack_size);
            ctx.flags.stepped = true;
            ctx.flags.force_move = force;
        })
    }

    /// Arms a step-out: execution stops at the first line event after the
    /// current frame returns.
    pub fn step_out(&self) -> Result<(), SessionError> {
        self.with(|ctx| {
            ctx.stop_frame = depth_as_frame(ctx.calced_stack_size) - 1;
        })
    }

    /// Requests a cooperative halt of this thread.
    ///
    /// The request takes effect at the thread's next gate admission, not
    /// immediately.
    pub fn suspend(&self) -> Result<(), SessionError> {
        self.with(|ctx| ctx.flags.suspend = true)
    }

    /// Clears a pending suspend request and wakes the thread if it already
    /// parked on it.
    pub fn resume(&self) -> Result<(), SessionError> {
        let mut st = self.shared.lock();
        let state = st.as_mut().ok_or(SessionError::NotStarted)?;
        let ctx = state
            .contexts
            .get_mut(&self.thread)
            .ok_or(SessionError::UnknownThread(self.thread))?;

        ctx.flags.suspend = false;
        ctx.flags.was_running = false;

        // the waiter re-checks its predicate under the same mutex, so
        // notifying here cannot be lost
        self.shared.gate.notify_all();

        Ok(())
    }

    /// Flags this context as debugger-internal; ignored contexts are never
    /// admitted by the gate and never stop.
    pub fn set_ignored(&self, ignored: bool) -> Result<(), SessionError> {
        self.with(|ctx| ctx.flags.ignore = ignored)
    }

    /// Returns whether this context is flagged debugger-internal.
    pub fn is_ignored(&self) -> Result<bool, SessionError> {
        self.with(|ctx| ctx.flags.ignore)
    }

    /// Marks the next instrumented section of this thread as excluded from
    /// debugging; the gate admits and immediately releases such a thread.
    pub fn set_skip_section(&self, skip: bool) -> Result<(), SessionError> {
        self.with(|ctx| ctx.flags.skip_section = skip)
    }

    /// Returns whether a suspend request is pending for this thread.
    pub fn is_suspended(&self) -> Result<bool, SessionError> {
        self.with(|ctx| ctx.flags.suspend)
    }

    /// Returns whether a suspend request caught this thread mid-execution.
    pub fn was_running(&self) -> Result<bool, SessionError> {
        self.with(|ctx| ctx.flags.was_running)
    }

    /// Reason of the stop currently notified to the front end.
    pub fn stop_reason(&self) -> Result<StopReason, SessionError> {
        self.with(|ctx| ctx.stop_reason)
    }

    /// Stack snapshot captured for the stop currently notified to the front
    /// end.
    pub fn frames(&self) -> Result<Vec<FrameSnapshot>, SessionError> {
        self.with(|ctx| ctx.frames.clone())
    }

    /// Current (incrementally maintained) stack depth of this thread.
    pub fn frame_depth(&self) -> Result<u32, SessionError> {
        self.with(|ctx| ctx.calced_stack_size)
    }

    /// Stack depth of this thread as last reconciled against the runtime's
    /// ground truth.
    pub fn reconciled_depth(&self) -> Result<u32, SessionError> {
        self.with(|ctx| ctx.stack_size)
    }

    /// Last source location this thread stopped at (or was observed at).
    pub fn last_location(&self) -> Result<Option<(String, u32)>, SessionError> {
        self.with(|ctx| ctx.last_file.clone().zip(ctx.last_line))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("thread", &self.thread)
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}

fn depth_as_frame(depth: u32) -> i32 {
    i32::try_from(depth).unwrap_or(i32::MAX)
}
