use std::path::Path;

/// Identity of a debuggee thread, as reported by the embedding runtime.
pub type ThreadId = u64;

/// Trait implementing the instrumentation surface of an embedding managed
/// runtime.
///
/// The engine never polls the runtime: execution events are pushed into the
/// [`Session`](crate::session::Session) by the embedder's tracepoint glue,
/// synchronously, on the thread that triggered them. This trait covers the
/// remaining surface the engine consumes: tracepoint subscription management,
/// thread identity/liveness, stack introspection and program loading.
pub trait Runtime {
    /// Type of a raised exception value within the debuggee.
    type Exception: RaisedException;

    /// Error returned by this trait.
    type Error: std::error::Error;

    /// Returns the identity of the calling thread.
    fn current_thread(&self) -> ThreadId;

    /// Returns whether the given thread is still alive.
    fn thread_alive(&self, thread: ThreadId) -> bool;

    /// Installs the event subscriptions (line, call, return, raise) that
    /// feed the session's event intake.
    fn install_tracepoints(&self) -> Result<(), Self::Error>;

    /// Removes the event subscriptions installed by
    /// [`install_tracepoints`](Self::install_tracepoints).
    fn remove_tracepoints(&self);

    /// Returns the ground-truth stack depth of the calling thread, if the
    /// runtime can compute one.
    ///
    /// When unavailable, the engine falls back to its incrementally
    /// maintained depth counter.
    fn stack_depth(&self) -> Option<u32>;

    /// Captures a snapshot of the calling thread's call stack.
    ///
    /// # Note
    ///
    /// This is only ever invoked on the thread being stopped; cross-thread
    /// stack inspection is never requested. A failed capture is recovered by
    /// the engine (the stop proceeds with an empty backtrace).
    fn capture_frames(&self) -> Result<Vec<FrameSnapshot>, Self::Error>;

    /// Loads and runs the given debuggee program on the calling thread.
    ///
    /// An error return is captured by the engine as
    /// [`Error::Load`](crate::Error::Load); it never tears the session down.
    fn load(&self, path: &Path) -> Result<(), Self::Error>;
}

impl<R: Runtime + ?Sized> Runtime for std::sync::Arc<R> {
    type Exception = R::Exception;
    type Error = R::Error;

    fn current_thread(&self) -> ThreadId {
        (**self).current_thread()
    }

    fn thread_alive(&self, thread: ThreadId) -> bool {
        (**self).thread_alive(thread)
    }

    fn install_tracepoints(&self) -> Result<(), Self::Error> {
        (**self).install_tracepoints()
    }

    fn remove_tracepoints(&self) {
        (**self).remove_tracepoints()
    }

    fn stack_depth(&self) -> Option<u32> {
        (**self).stack_depth()
    }

    fn capture_frames(&self) -> Result<Vec<FrameSnapshot>, Self::Error> {
        (**self).capture_frames()
    }

    fn load(&self, path: &Path) -> Result<(), Self::Error> {
        (**self).load(path)
    }
}

/// Trait implementing the identity of a raised exception value.
pub trait RaisedException {
    /// Returns the name of the exception's dynamic class.
    fn class_name(&self) -> &str;

    /// Returns the exception's class name followed by its ancestor class
    /// names, most-derived first.
    ///
    /// Catchpoint matching walks this chain, so a catchpoint registered on a
    /// superclass matches instances of any subclass.
    fn class_chain(&self) -> impl Iterator<Item = &str> {
        core::iter::once(self.class_name())
    }
}

/// One captured stack frame of a stopped thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    /// Source file of the frame's current location.
    pub file: String,

    /// Source line of the frame's current location.
    pub line: u32,
}
