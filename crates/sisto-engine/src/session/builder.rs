use super::Session;
use crate::listener::EventListener;
use crate::runtime::Runtime;

/// Builder for [Session].
///
/// It is usually created by calling [Session::builder], and allows to
/// specify which embedding runtime and front-end listener the debug session
/// is wired to.
pub struct Builder<S> {
    state: S,
}

impl Builder<NeedsRuntime> {
    pub(super) const fn new() -> Self {
        Self {
            state: NeedsRuntime,
        }
    }
}

impl Builder<NeedsRuntime> {
    /// Specifies the embedding runtime delivering execution events to the
    /// session.
    pub const fn with_runtime<R: Runtime>(self, runtime: R) -> Builder<NeedsListener<R>> {
        Builder {
            state: NeedsListener { runtime },
        }
    }
}

impl<R: Runtime> Builder<NeedsListener<R>> {
    /// Specifies the front-end listener receiving stop callouts.
    pub fn with_listener<L>(self, listener: L) -> Builder<Ready<R, L>>
    where
        L: EventListener<Exception = R::Exception>,
    {
        Builder {
            state: Ready {
                runtime: self.state.runtime,
                listener,
            },
        }
    }
}

impl<R, L> Builder<Ready<R, L>>
where
    R: Runtime,
    L: EventListener<Exception = R::Exception>,
{
    /// Builds the debug session.
    ///
    /// The session is inert until [start](Session::start) (or
    /// [load](Session::load)) is called.
    pub fn build(self) -> Session<R, L> {
        Session::from_parts(self.state.runtime, self.state.listener)
    }
}

pub struct NeedsRuntime;

pub struct NeedsListener<R> {
    runtime: R,
}

pub struct Ready<R, L> {
    runtime: R,
    listener: L,
}
