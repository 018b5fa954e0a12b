use super::context::StopReason;
use super::{SessionState, Shared, StateGuard};
use crate::runtime::ThreadId;

// Thread gate: admits at most one thread at a time into instrumented code.
//
// Threads block cooperatively on the session condvar; a release grants the
// next parked thread (FIFO) the right to complete admission, so exactly one
// parked thread resumes per release and no waiter is starved.
impl Shared {
    /// Runs the admission protocol for `thread`, which must already have an
    /// execution context.
    ///
    /// Returns `false` when the caller must skip all further processing for
    /// this event: the context is debugger-internal, the session was torn
    /// down while the thread was parked, the event is a nested one fired by
    /// the current lock holder, or the thread is inside a skipped section.
    pub(crate) fn admit<'a>(
        &self,
        mut st: StateGuard<'a>,
        thread: ThreadId,
    ) -> (StateGuard<'a>, bool) {
        {
            let Some(state) = st.as_ref() else {
                return (st, false);
            };
            let Some(ctx) = state.contexts.get(&thread) else {
                return (st, false);
            };
            if ctx.flags.ignore {
                return (st, false);
            }
        }

        loop {
            // park while another thread holds the lock, or while the wake
            // granted by a release is owed to another parked thread
            loop {
                let Some(state) = st.as_mut() else {
                    return (st, false);
                };

                let blocked = match state.locker {
                    Some(locker) => locker != thread,
                    None => state.granted.is_some_and(|granted| granted != thread),
                };

                if !blocked {
                    if state.granted == Some(thread) {
                        state.granted = None;
                    }
                    break;
                }

                if !state.parked.contains(&thread) {
                    state.parked.push_back(thread);
                }

                st = self.wait(st);
            }

            let Some(state) = st.as_mut() else {
                return (st, false);
            };
            let locker = state.locker;
            let Some(ctx) = state.contexts.get_mut(&thread) else {
                return (st, false);
            };

            // honor a pending suspend unless this thread already holds the
            // lock; the suspend may be re-applied, so re-check after waking
            if ctx.flags.suspend && locker != Some(thread) {
                ctx.flags.was_running = true;
                st = self.wait(st);
                continue;
            }

            break;
        }

        let Some(state) = st.as_mut() else {
            return (st, false);
        };

        // a nested event fired by the current lock holder lands here
        if state.locker.is_some() {
            return (st, false);
        }

        state.locker = Some(thread);

        if state
            .contexts
            .get(&thread)
            .is_some_and(|ctx| ctx.flags.skip_section)
        {
            self.release_event(state, thread);
            return (st, false);
        }

        (st, true)
    }

    /// Releases the execution lock at the end of an event cycle.
    ///
    /// Per-event stop bookkeeping is cleared, and exactly one parked thread
    /// (if any) is granted the next admission.
    pub(crate) fn release_event(&self, state: &mut SessionState, thread: ThreadId) {
        if let Some(ctx) = state.contexts.get_mut(&thread) {
            ctx.stop_reason = StopReason::None;
            ctx.frames.clear();
        }

        state.locker = None;
        state.granted = state.parked.pop_front();

        if state.granted.is_some() {
            self.gate.notify_all();
        }
    }
}
