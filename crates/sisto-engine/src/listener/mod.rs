use crate::session::{Breakpoint, Context};

/// Trait for implementing a front-end stop listener.
///
/// Callouts are invoked on the stopped thread itself, while that thread holds
/// the session's execution lock; returning from a callout resumes execution.
/// All methods default to no-ops.
///
/// A listener may inspect and re-arm the stopped [`Context`] (e.g.
/// [`step_over`](Context::step_over)) and may invoke session control
/// operations from other threads. An interactive front end that runs its own
/// event loop must do so on a thread whose context is flagged
/// [`ignored`](Context::set_ignored), so that debugger-internal execution
/// never re-enters the stepping logic.
pub trait EventListener {
    /// Type of a raised exception value, tied to the embedding runtime's
    /// exception type.
    type Exception;

    /// Error returned by this listener.
    type Error: std::error::Error;

    /// Function called when a thread stopped on a line (step completed,
    /// breakpoint hit or catchpoint hit).
    ///
    /// The stop reason is readable through
    /// [`Context::stop_reason`](Context::stop_reason) for the duration of
    /// the callout.
    fn at_line(&self, _context: &Context, _file: &str, _line: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Function called when a thread stopped by hitting a breakpoint.
    ///
    /// It is always followed by an [`at_line`](Self::at_line) callout for
    /// the same location.
    fn at_breakpoint(
        &self,
        _context: &Context,
        _breakpoint: &Breakpoint,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Function called when a raised exception matched a registered
    /// catchpoint.
    ///
    /// `hits` is the catchpoint's hit count, already accounting for this
    /// raise. It is always followed by an [`at_line`](Self::at_line) callout
    /// for the raise site.
    fn at_catchpoint(
        &self,
        _context: &Context,
        _exception: &Self::Exception,
        _hits: u64,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<L: EventListener + ?Sized> EventListener for std::sync::Arc<L> {
    type Exception = L::Exception;
    type Error = L::Error;

    fn at_line(&self, context: &Context, file: &str, line: u32) -> Result<(), Self::Error> {
        (**self).at_line(context, file, line)
    }

    fn at_breakpoint(
        &self,
        context: &Context,
        breakpoint: &Breakpoint,
    ) -> Result<(), Self::Error> {
        (**self).at_breakpoint(context, breakpoint)
    }

    fn at_catchpoint(
        &self,
        context: &Context,
        exception: &Self::Exception,
        hits: u64,
    ) -> Result<(), Self::Error> {
        (**self).at_catchpoint(context, exception, hits)
    }
}
