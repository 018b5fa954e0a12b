use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;

use sisto_engine::listener::EventListener;
use sisto_engine::session::{Breakpoint, Context, StopReason};

use super::runtime::{ScriptError, TestException};

/// One recorded stop callout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line {
        ctx: u32,
        file: String,
        line: u32,
        reason: StopReason,
        frames: usize,
    },
    Breakpoint {
        ctx: u32,
        id: u32,
        line: u32,
        hits: u64,
    },
    Catchpoint {
        ctx: u32,
        class: String,
        hits: u64,
    },
}

type LineHook = Box<dyn Fn() + Send + Sync>;

/// Listener recording every callout, with hooks for concurrency tests.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    hold: Mutex<Option<Receiver<()>>>,
    line_hook: Mutex<Option<LineHook>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Number of `at_line` callouts observed so far.
    pub fn stops(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|ev| matches!(ev, Event::Line { .. }))
            .count()
    }

    /// Highest number of concurrently active `at_line` callouts observed.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Makes every `at_line` callout block until a token is received (or the
    /// sender is dropped).
    pub fn hold_stops(&self, tokens: Receiver<()>) {
        *self.hold.lock().unwrap() = Some(tokens);
    }

    /// Runs `hook` inside every `at_line` callout, before recording.
    pub fn set_line_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.line_hook.lock().unwrap() = Some(Box::new(hook));
    }
}

impl EventListener for RecordingListener {
    type Exception = TestException;
    type Error = ScriptError;

    fn at_line(&self, context: &Context, file: &str, line: u32) -> Result<(), Self::Error> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(hook) = self.line_hook.lock().unwrap().as_ref() {
            hook();
        }

        let reason = context.stop_reason().unwrap_or(StopReason::None);
        let frames = context.frames().map(|frames| frames.len()).unwrap_or(0);

        self.events.lock().unwrap().push(Event::Line {
            ctx: context.ordinal(),
            file: file.to_owned(),
            line,
            reason,
            frames,
        });

        if let Some(tokens) = self.hold.lock().unwrap().as_ref() {
            tokens.recv().ok();
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        Ok(())
    }

    fn at_breakpoint(&self, context: &Context, breakpoint: &Breakpoint) -> Result<(), Self::Error> {
        self.events.lock().unwrap().push(Event::Breakpoint {
            ctx: context.ordinal(),
            id: breakpoint.id(),
            line: breakpoint.line(),
            hits: breakpoint.hits(),
        });

        Ok(())
    }

    fn at_catchpoint(
        &self,
        context: &Context,
        exception: &Self::Exception,
        hits: u64,
    ) -> Result<(), Self::Error> {
        use sisto_engine::runtime::RaisedException;

        self.events.lock().unwrap().push(Event::Catchpoint {
            ctx: context.ordinal(),
            class: exception.class_name().to_owned(),
            hits,
        });

        Ok(())
    }
}
