use std::sync::Arc;

use super::context::{Context, StopReason};
use super::{Session, StateGuard};
use crate::error::{ListenerError, SessionError};
use crate::listener::EventListener;
use crate::runtime::{RaisedException, Runtime, ThreadId};

// Event intake of the four runtime event kinds.
//
// Each handler resolves the firing thread's execution context, runs the gate
// admission protocol, updates stepping state, and decides whether the thread
// stops. The gate is released on every exit path.
impl<R, L> Session<R, L>
where
    R: Runtime,
    L: EventListener<Exception = R::Exception>,
{
    /// Handles a line event: execution reached a new position on a source
    /// line of the calling thread.
    ///
    /// This is the only event kind that can stop the thread on a step or a
    /// breakpoint. Stop callouts are invoked on the calling thread before
    /// this function returns.
    pub fn line_event(&self, file: &str, line: u32) -> crate::Result<(), R::Error, L::Error> {
        let thread = self.runtime.current_thread();

        let mut st = self.shared.lock();
        let Some(state) = st.as_mut() else {
            return Err(SessionError::NotStarted.into());
        };
        let ordinal = state.ensure_context(thread);

        let (mut st, admitted) = self.shared.admit(st, thread);
        if !admitted {
            return Ok(());
        }

        let mut stop_on_step = false;
        let mut breakpoint = None;

        if let Some(state) = st.as_mut() {
            let true_depth = self.runtime.stack_depth();

            if let Some(ctx) = state.contexts.get_mut(&thread) {
                ctx.stack_size = true_depth.unwrap_or(ctx.calced_stack_size);

                tracing::trace!(
                    ctx = ordinal,
                    file,
                    line,
                    calced = ctx.calced_stack_size,
                    stack = ctx.stack_size,
                    "line event"
                );

                let moved = if ctx.flags.pause {
                    ctx.step_next = 1;
                    ctx.dest_frame = -1;
                    true
                } else {
                    ctx.last_line != Some(line) || ctx.last_file.as_deref() != Some(file)
                };

                let depth = i32::try_from(ctx.calced_stack_size).unwrap_or(i32::MAX);

                if ctx.dest_frame == -1 || depth == ctx.dest_frame {
                    if moved || !ctx.flags.force_move {
                        ctx.step_next = (ctx.step_next - 1).max(-1);
                    }
                    if moved || (ctx.flags.stepped && !ctx.flags.force_move) {
                        ctx.step_line = (ctx.step_line - 1).max(-1);
                        ctx.flags.stepped = false;
                    }
                } else if depth < ctx.dest_frame {
                    // the frame a step-over targeted has already returned
                    ctx.step_next = 0;
                }

                stop_on_step = ctx.step_next == 0 || ctx.step_line == 0;
            }

            breakpoint = state.breakpoints.register_hit(file, line);
        }

        let mut callout: Result<(), ListenerError<L::Error>> = Ok(());

        if stop_on_step || breakpoint.is_some() {
            let handle = Context::new(Arc::clone(&self.shared), thread, ordinal);

            st = self.capture_stop_frames(st, thread);

            if let Some(ctx) = st.as_mut().and_then(|state| state.contexts.get_mut(&thread)) {
                ctx.stop_reason = if breakpoint.is_some() {
                    StopReason::Breakpoint
                } else {
                    StopReason::Step
                };
            }

            if let Some(bk) = &breakpoint {
                drop(st);
                callout = self.listener.at_breakpoint(&handle, bk).map_err(ListenerError);
                st = self.shared.lock();
            }

            if let Some(state) = st.as_mut() {
                if let Some(ctx) = state.contexts.get_mut(&thread) {
                    ctx.reset_stepping();
                }
                state.note_line_stop(thread, file, line);
            }

            drop(st);
            let at_line = self.listener.at_line(&handle, file, line).map_err(ListenerError);
            st = self.shared.lock();

            if callout.is_ok() {
                callout = at_line;
            }
        }

        if let Some(state) = st.as_mut() {
            self.shared.release_event(state, thread);
        }
        drop(st);

        callout.map_err(Into::into)
    }

    /// Handles a call event: the calling thread entered a function, block or
    /// class body. Calls never stop by themselves.
    pub fn call_event(&self, file: &str, line: u32) -> crate::Result<(), R::Error, L::Error> {
        let thread = self.runtime.current_thread();

        let mut st = self.shared.lock();
        let Some(state) = st.as_mut() else {
            return Err(SessionError::NotStarted.into());
        };
        let ordinal = state.ensure_context(thread);

        let (mut st, admitted) = self.shared.admit(st, thread);
        if !admitted {
            return Ok(());
        }

        if let Some(state) = st.as_mut() {
            let true_depth = self.runtime.stack_depth();

            if let Some(ctx) = state.contexts.get_mut(&thread) {
                ctx.calced_stack_size = ctx.calced_stack_size.saturating_add(1);
                ctx.stack_size = true_depth.unwrap_or(ctx.calced_stack_size);

                tracing::trace!(
                    ctx = ordinal,
                    file,
                    line,
                    calced = ctx.calced_stack_size,
                    "call event"
                );
            }

            self.shared.release_event(state, thread);
        }

        Ok(())
    }

    /// Handles a return event: the calling thread left a function, block,
    /// native call or scope.
    ///
    /// A pending step-out whose target depth is reached arms an
    /// unconditional stop for the next line event.
    pub fn return_event(&self, file: &str, line: u32) -> crate::Result<(), R::Error, L::Error> {
        let thread = self.runtime.current_thread();

        let mut st = self.shared.lock();
        let Some(state) = st.as_mut() else {
            return Err(SessionError::NotStarted.into());
        };
        let ordinal = state.ensure_context(thread);

        let (mut st, admitted) = self.shared.admit(st, thread);
        if !admitted {
            return Ok(());
        }

        if let Some(state) = st.as_mut() {
            let true_depth = self.runtime.stack_depth();

            if let Some(ctx) = state.contexts.get_mut(&thread) {
                ctx.calced_stack_size = ctx.calced_stack_size.saturating_sub(1);
                ctx.stack_size = true_depth.unwrap_or(ctx.calced_stack_size);

                // the stop-frame comparison must see the caller's depth, so
                // it runs only after the decrement
                if i32::try_from(ctx.calced_stack_size).unwrap_or(i32::MAX) == ctx.stop_frame {
                    ctx.step_next = 1;
                    ctx.stop_frame = -1;
                }

                tracing::trace!(
                    ctx = ordinal,
                    file,
                    line,
                    calced = ctx.calced_stack_size,
                    "return event"
                );
            }

            self.shared.release_event(state, thread);
        }

        Ok(())
    }

    /// Handles a raise event: an exception was thrown on the calling thread.
    ///
    /// A raise matching a registered catchpoint increments the catchpoint's
    /// hit counter unconditionally, then stops the thread: the
    /// [`at_catchpoint`](EventListener::at_catchpoint) callout fires first,
    /// followed by [`at_line`](EventListener::at_line) for the raise site.
    pub fn raise_event(
        &self,
        file: &str,
        line: u32,
        exception: &R::Exception,
    ) -> crate::Result<(), R::Error, L::Error> {
        let thread = self.runtime.current_thread();

        let mut st = self.shared.lock();
        let Some(state) = st.as_mut() else {
            return Err(SessionError::NotStarted.into());
        };
        let ordinal = state.ensure_context(thread);

        let (mut st, admitted) = self.shared.admit(st, thread);
        if !admitted {
            return Ok(());
        }

        let mut matched = None;

        if let Some(state) = st.as_mut() {
            let true_depth = self.runtime.stack_depth();

            if let Some(ctx) = state.contexts.get_mut(&thread) {
                ctx.stack_size = true_depth.unwrap_or(ctx.calced_stack_size);
            }

            matched = state.catchpoints.match_chain(exception.class_chain());

            tracing::trace!(
                ctx = ordinal,
                file,
                line,
                class = exception.class_name(),
                matched = matched.is_some(),
                "raise event"
            );
        }

        let mut callout: Result<(), ListenerError<L::Error>> = Ok(());

        if let Some(class) = matched {
            let handle = Context::new(Arc::clone(&self.shared), thread, ordinal);

            st = self.capture_stop_frames(st, thread);

            let mut hits = 0;
            if let Some(state) = st.as_mut() {
                hits = state.catchpoints.record_hit(&class);

                if let Some(ctx) = state.contexts.get_mut(&thread) {
                    ctx.stop_reason = StopReason::Catchpoint;
                }
            }

            drop(st);
            callout = self
                .listener
                .at_catchpoint(&handle, exception, hits)
                .map_err(ListenerError);
            st = self.shared.lock();

            if let Some(state) = st.as_mut() {
                state.note_line_stop(thread, file, line);
            }

            drop(st);
            let at_line = self.listener.at_line(&handle, file, line).map_err(ListenerError);
            st = self.shared.lock();

            if callout.is_ok() {
                callout = at_line;
            }
        }

        if let Some(state) = st.as_mut() {
            self.shared.release_event(state, thread);
        }
        drop(st);

        callout.map_err(Into::into)
    }

    /// Captures the calling thread's backtrace into its execution context,
    /// with the session mutex released around the inspection call.
    ///
    /// A failed capture is recovered by stopping with an empty backtrace.
    fn capture_stop_frames<'a>(&'a self, st: StateGuard<'a>, thread: ThreadId) -> StateGuard<'a> {
        drop(st);

        let frames = match self.runtime.capture_frames() {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "stack snapshot unavailable, stopping without frames");
                Vec::new()
            }
        };

        let mut st = self.shared.lock();

        if let Some(ctx) = st.as_mut().and_then(|state| state.contexts.get_mut(&thread)) {
            ctx.frames = frames;
        }

        st
    }
}
