use crate::runtime::ThreadId;

/// Embedding runtime error.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct RuntimeError<E>(pub E);

/// Front-end listener error.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct ListenerError<E>(pub E);

/// Protocol-misuse error of a debug session.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// The debug session was queried before being started (or after being
    /// stopped).
    #[error("Debug session not started yet")]
    NotStarted,

    /// No execution context is tracked for the given thread.
    #[error("No execution context for thread {0}")]
    UnknownThread(ThreadId),

    /// No breakpoint is registered with the given ID.
    #[error("No breakpoint with ID {0}")]
    UnknownBreakpoint(u32),
}

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error<E1, E2> {
    /// An embedding runtime error occurred.
    #[error(transparent)]
    Runtime(#[from] RuntimeError<E1>),

    /// A front-end listener error occurred.
    #[error(transparent)]
    Listener(#[from] ListenerError<E2>),

    /// The debug session was misused.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The debuggee program failed to load or crashed while running.
    ///
    /// The debug session itself survives this error.
    #[error("Debuggee program failed")]
    Load(#[source] E1),
}

/// Result type of this crate.
pub type Result<T, E1, E2> = core::result::Result<T, Error<E1, E2>>;
