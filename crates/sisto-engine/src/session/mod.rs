mod breakpoint;
mod builder;
mod context;
mod dispatch;
mod gate;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

pub use self::breakpoint::{Breakpoint, Catchpoint};
use self::breakpoint::{BreakpointTable, CatchpointTable};
pub use self::builder::Builder;
use self::builder::NeedsRuntime;
use self::context::ExecutionContext;
pub use self::context::{Context, StopReason};
use crate::error::{RuntimeError, SessionError};
use crate::listener::EventListener;
use crate::program::Program;
use crate::runtime::{Runtime, ThreadId};

/// Debug session over an embedding runtime.
///
/// The session serializes execution of all instrumented threads (at most one
/// runs debugged code at a time), tracks a per-thread stepping state machine,
/// and decides per event whether to stop the running thread and notify the
/// front-end [listener](EventListener).
///
/// Events are pushed into the session by the embedder's tracepoint glue via
/// [`line_event`](Self::line_event), [`call_event`](Self::call_event),
/// [`return_event`](Self::return_event) and
/// [`raise_event`](Self::raise_event), synchronously, on the thread that
/// triggered them.
pub struct Session<R, L> {
    /// Embedding runtime instrumentation surface.
    runtime: R,

    /// Front-end stop listener.
    listener: L,

    /// State shared with [Context] handles.
    shared: Arc<Shared>,
}

impl Session<(), ()> {
    /// Creates a session builder.
    pub const fn builder() -> Builder<NeedsRuntime> {
        Builder::new()
    }
}

impl<R, L> Session<R, L>
where
    R: Runtime,
    L: EventListener<Exception = R::Exception>,
{
    pub(super) fn from_parts(runtime: R, listener: L) -> Self {
        Self {
            runtime,
            listener,
            shared: Arc::new(Shared {
                state: Mutex::new(None),
                gate: Condvar::new(),
            }),
        }
    }

    /// Starts the debug session: session state is created, the runtime's
    /// event subscriptions are installed, and an execution context is
    /// created for the calling thread.
    ///
    /// Starting an already-started session is a no-op.
    pub fn start(&self) -> crate::Result<(), R::Error, L::Error> {
        {
            let mut st = self.shared.lock();
            if st.is_some() {
                return Ok(());
            }
            *st = Some(SessionState::new());
        }

        if let Err(e) = self.runtime.install_tracepoints() {
            *self.shared.lock() = None;
            return Err(RuntimeError(e).into());
        }

        let thread = self.runtime.current_thread();
        if let Some(state) = self.shared.lock().as_mut() {
            state.ensure_context(thread);
        }

        tracing::info!("debug session started");

        Ok(())
    }

    /// Stops the debug session: the runtime's event subscriptions are
    /// removed and all session state is torn down atomically.
    ///
    /// Threads parked at the gate are woken and exit without processing.
    /// Stopping a session that was never started is a no-op.
    pub fn stop(&self) {
        let stopped = {
            let mut st = self.shared.lock();
            let stopped = st.take().is_some();
            if stopped {
                self.shared.gate.notify_all();
            }
            stopped
        };

        if stopped {
            self.runtime.remove_tracepoints();
            tracing::info!("debug session stopped");
        }
    }

    /// Returns whether the session is currently started.
    pub fn started(&self) -> bool {
        self.shared.lock().is_some()
    }

    /// Starts the session (if needed) and loads the given debuggee program
    /// on the calling thread.
    ///
    /// A load or execution failure of the debuggee is captured as
    /// [`Error::Load`](crate::Error::Load); the session survives it and
    /// stays started.
    pub fn load(&self, program: Program) -> crate::Result<(), R::Error, L::Error> {
        self.start()?;

        let thread = self.runtime.current_thread();
        if let Some(state) = self.shared.lock().as_mut() {
            state.ensure_context(thread);

            if program.stop_at_entry {
                if let Some(ctx) = state.contexts.get_mut(&thread) {
                    ctx.step_next = 1;
                }
            }
        }

        tracing::info!(path = %program.path.display(), "loading debuggee program");

        self.runtime.load(&program.path).map_err(crate::Error::Load)
    }

    /// Returns the execution context of the calling thread, creating it if
    /// this thread was never seen before.
    pub fn current_context(&self) -> Result<Context, SessionError> {
        let thread = self.runtime.current_thread();

        let mut st = self.shared.lock();
        let state = st.as_mut().ok_or(SessionError::NotStarted)?;
        let ordinal = state.ensure_context(thread);

        Ok(Context::new(Arc::clone(&self.shared), thread, ordinal))
    }

    /// Returns the execution contexts of all live threads, in creation
    /// order.
    ///
    /// Contexts of dead threads are pruned first.
    pub fn contexts(&self) -> Result<Vec<Context>, SessionError> {
        let mut st = self.shared.lock();
        let state = st.as_mut().ok_or(SessionError::NotStarted)?;

        state.contexts.retain(|thread, ctx| {
            let alive = self.runtime.thread_alive(*thread);
            if !alive {
                tracing::info!(tid = thread, ctx = ctx.ordinal, "pruned dead thread context");
            }
            alive
        });

        // a dead thread cannot consume a wake, so drop it from the gate
        // bookkeeping as well
        state.parked.retain(|thread| self.runtime.thread_alive(*thread));
        if state
            .granted
            .is_some_and(|thread| !self.runtime.thread_alive(thread))
        {
            state.granted = state.parked.pop_front();
        }

        let mut contexts = state
            .contexts
            .iter()
            .map(|(thread, ctx)| Context::new(Arc::clone(&self.shared), *thread, ctx.ordinal))
            .collect::<Vec<_>>();

        contexts.sort_by_key(Context::ordinal);

        Ok(contexts)
    }

    /// Sets a one-shot pause request on every execution context.
    ///
    /// Each thread stops unconditionally at its next line event; the request
    /// is consumed (on all contexts) by the first stop it produces.
    pub fn pause(&self) -> Result<(), SessionError> {
        self.with_state(|state| {
            for ctx in state.contexts.values_mut() {
                ctx.flags.pause = true;
            }
        })
    }

    /// Registers a breakpoint at the given source location and returns it.
    pub fn add_breakpoint(&self, file: &str, line: u32) -> Result<Breakpoint, SessionError> {
        self.with_state(|state| {
            let bk = state.breakpoints.add(file, line);
            tracing::info!(id = bk.id(), file = bk.file(), line = bk.line(), "breakpoint added");
            bk
        })
    }

    /// Removes the breakpoint with the given ID and returns it.
    pub fn remove_breakpoint(&self, id: u32) -> Result<Breakpoint, SessionError> {
        self.with_state(|state| state.breakpoints.remove(id))?
            .ok_or(SessionError::UnknownBreakpoint(id))
    }

    /// Enables or disables the breakpoint with the given ID; disabled
    /// breakpoints are skipped by matching.
    pub fn set_breakpoint_enabled(&self, id: u32, enabled: bool) -> Result<(), SessionError> {
        self.with_state(|state| state.breakpoints.set_enabled(id, enabled))?
            .ok_or(SessionError::UnknownBreakpoint(id))
    }

    /// Returns all registered breakpoints, in registration order.
    pub fn breakpoints(&self) -> Result<Vec<Breakpoint>, SessionError> {
        self.with_state(|state| state.breakpoints.all())
    }

    /// Registers a catchpoint for the given exception class name (and its
    /// subclasses).
    pub fn add_catchpoint(&self, class: impl Into<String>) -> Result<(), SessionError> {
        self.with_state(|state| state.catchpoints.add(class.into()))
    }

    /// Returns all registered catchpoints with their hit counts, in
    /// registration order.
    pub fn catchpoints(&self) -> Result<Vec<Catchpoint>, SessionError> {
        self.with_state(|state| state.catchpoints.all())
    }

    /// Returns the hit count of the catchpoint registered for the given
    /// class name, if any.
    pub fn catchpoint_hits(&self, class: &str) -> Result<Option<u64>, SessionError> {
        self.with_state(|state| state.catchpoints.hits_of(class))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> Result<T, SessionError> {
        let mut st = self.shared.lock();
        let state = st.as_mut().ok_or(SessionError::NotStarted)?;
        Ok(f(state))
    }
}

impl<R, L> Drop for Session<R, L> {
    fn drop(&mut self) {
        // a dropped session must not leave parked threads blocked forever
        if self.shared.lock().take().is_some() {
            self.shared.gate.notify_all();
        }
    }
}

/// State shared between the session and its [Context] handles.
pub(crate) struct Shared {
    /// Session state; `None` until the session starts (and after it stops).
    state: Mutex<Option<SessionState>>,

    /// Condvar the gate blocks on; paired with [`state`](Self::state).
    pub(crate) gate: Condvar,
}

pub(crate) type StateGuard<'a> = MutexGuard<'a, Option<SessionState>>;

impl Shared {
    pub(crate) fn lock(&self) -> StateGuard<'_> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wait<'a>(&self, guard: StateGuard<'a>) -> StateGuard<'a> {
        self.gate.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mutable session state, torn down atomically when the session stops.
pub(crate) struct SessionState {
    /// Thread currently holding the execution lock.
    pub(crate) locker: Option<ThreadId>,

    /// Threads parked at the gate, in arrival order.
    pub(crate) parked: VecDeque<ThreadId>,

    /// Parked thread granted the next admission by the last release.
    pub(crate) granted: Option<ThreadId>,

    /// Execution contexts of all observed threads.
    pub(crate) contexts: HashMap<ThreadId, ExecutionContext>,

    pub(crate) breakpoints: BreakpointTable,
    pub(crate) catchpoints: CatchpointTable,

    next_ordinal: u32,
}

impl SessionState {
    fn new() -> Self {
        Self {
            locker: None,
            parked: VecDeque::new(),
            granted: None,
            contexts: HashMap::new(),
            breakpoints: BreakpointTable::default(),
            catchpoints: CatchpointTable::default(),
            next_ordinal: 1,
        }
    }

    /// Returns the ordinal of the given thread's context, creating the
    /// context if the thread was never seen before.
    pub(crate) fn ensure_context(&mut self, thread: ThreadId) -> u32 {
        match self.contexts.entry(thread) {
            Entry::Occupied(e) => e.get().ordinal,
            Entry::Vacant(v) => {
                let ordinal = self.next_ordinal;
                self.next_ordinal += 1;

                tracing::info!(tid = thread, ctx = ordinal, "execution context created");

                v.insert(ExecutionContext::new(ordinal));

                ordinal
            }
        }
    }

    /// Records a line stop on the given thread: every one-shot pause request
    /// is consumed, the per-cycle stepping flags are cleared, and the stop
    /// location becomes the thread's last observed location.
    pub(crate) fn note_line_stop(&mut self, thread: ThreadId, file: &str, line: u32) {
        for ctx in self.contexts.values_mut() {
            ctx.flags.pause = false;
        }

        if let Some(ctx) = self.contexts.get_mut(&thread) {
            ctx.flags.stepped = false;
            ctx.flags.force_move = false;
            ctx.last_file = Some(file.to_owned());
            ctx.last_line = Some(line);
        }
    }
}
