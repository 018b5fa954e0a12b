use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use test_log::test;

use crate::common::{self, Event};

#[test]
fn contending_threads_stop_one_at_a_time() {
    let (_runtime, listener, session) = common::started_session();

    session.add_breakpoint("a.rb", 1).expect("add");
    session.add_breakpoint("b.rb", 1).expect("add");

    // widen the race window inside the callout
    listener.set_line_hook(|| std::thread::sleep(Duration::from_millis(1)));

    std::thread::scope(|scope| {
        let session = &session;

        for file in ["a.rb", "b.rb"] {
            scope.spawn(move || {
                for _ in 0..25 {
                    session.line_event(file, 1).expect("line");
                }
            });
        }
    });

    assert_eq!(listener.stops(), 50);
    assert_eq!(listener.max_active(), 1);
}

#[test]
fn parked_thread_runs_only_after_release() {
    let (_runtime, listener, session) = common::started_session();

    session.add_breakpoint("a.rb", 1).expect("add");
    session.add_breakpoint("b.rb", 1).expect("add");

    let (tokens, held) = mpsc::channel();
    listener.hold_stops(held);

    let parked_done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let session = &session;
        let listener = &listener;
        let parked_done = &parked_done;

        let holder = scope.spawn(move || session.line_event("a.rb", 1));

        // the holder is stopped inside its callout, still owning the lock
        assert!(common::wait_until(|| listener.stops() == 1));

        let parked = scope.spawn(move || {
            let result = session.line_event("b.rb", 1);
            parked_done.store(true, Ordering::SeqCst);
            result
        });

        std::thread::sleep(Duration::from_millis(50));
        assert!(!parked_done.load(Ordering::SeqCst));
        assert_eq!(listener.stops(), 1);

        // release the holder; the parked thread is granted the lock
        tokens.send(()).expect("send");
        tokens.send(()).expect("send");

        holder.join().expect("join").expect("holder event");
        parked.join().expect("join").expect("parked event");
    });

    assert_eq!(listener.stops(), 2);
    assert_eq!(listener.max_active(), 1);
}

#[test]
fn parked_threads_drain_one_per_release() {
    const WAITERS: usize = 4;

    let (_runtime, listener, session) = common::started_session();

    session.add_breakpoint("x.rb", 1).expect("add");

    let (tokens, held) = mpsc::channel();
    listener.hold_stops(held);

    std::thread::scope(|scope| {
        let session = &session;
        let listener = &listener;

        for _ in 0..WAITERS {
            scope.spawn(move || session.line_event("x.rb", 1).expect("line"));
        }

        // one thread is stopped inside its callout, the others park
        assert!(common::wait_until(|| listener.stops() == 1));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(listener.stops(), 1);

        // each release admits exactly one parked thread
        for drained in 1..WAITERS {
            tokens.send(()).expect("send");
            assert!(common::wait_until(|| listener.stops() == drained + 1));

            std::thread::sleep(Duration::from_millis(20));
            assert_eq!(listener.stops(), drained + 1);
        }

        tokens.send(()).expect("send");
    });

    assert_eq!(listener.stops(), WAITERS);
    assert_eq!(listener.max_active(), 1);
}

#[test]
fn suspended_thread_parks_until_resumed() {
    let (_runtime, listener, session) = common::started_session();

    let (ctx_tx, ctx_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();

    let event_done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let session = &session;
        let event_done = &event_done;

        scope.spawn(move || {
            let ctx = session.current_context().expect("context");
            ctx_tx.send(ctx).expect("send");

            go_rx.recv().expect("recv");
            session.line_event("a.rb", 1).expect("line");
            event_done.store(true, Ordering::SeqCst);
        });

        let ctx = ctx_rx.recv().expect("context handle");
        ctx.suspend().expect("suspend");
        go_tx.send(()).expect("send");

        // the suspend takes effect at the next admission check
        assert!(common::wait_until(|| ctx.was_running().unwrap_or(false)));
        assert!(!event_done.load(Ordering::SeqCst));

        ctx.resume().expect("resume");
        assert!(common::wait_until(|| event_done.load(Ordering::SeqCst)));
    });

    assert!(!session
        .contexts()
        .expect("contexts")
        .iter()
        .any(|ctx| ctx.is_suspended().unwrap_or(true)));
    assert_eq!(listener.stops(), 0);
}

#[test]
fn ignored_context_never_stops() {
    let (_runtime, listener, session) = common::started_session();

    session.add_breakpoint("a.rb", 1).expect("add");

    std::thread::scope(|scope| {
        let session = &session;

        scope.spawn(move || {
            let ctx = session.current_context().expect("context");
            ctx.set_ignored(true).expect("ignore");

            session.line_event("a.rb", 1).expect("line");
        });
    });

    assert_eq!(listener.stops(), 0);

    // the same breakpoint still stops a participating thread
    session.line_event("a.rb", 1).expect("line");
    assert_eq!(listener.stops(), 1);
}

#[test]
fn teardown_wakes_parked_threads() {
    let (_runtime, listener, session) = common::started_session();

    session.add_breakpoint("a.rb", 1).expect("add");
    session.add_breakpoint("b.rb", 1).expect("add");

    let (tokens, held) = mpsc::channel();
    listener.hold_stops(held);

    std::thread::scope(|scope| {
        let session = &session;
        let listener = &listener;

        let holder = scope.spawn(move || session.line_event("a.rb", 1));

        assert!(common::wait_until(|| listener.stops() == 1));

        let parked = scope.spawn(move || session.line_event("b.rb", 1));
        std::thread::sleep(Duration::from_millis(50));

        // tearing the session down must not leave the parked thread blocked
        session.stop();
        parked.join().expect("join").expect("parked event");

        tokens.send(()).expect("send");
        holder.join().expect("join").expect("holder event");
    });

    assert!(!session.started());
    assert_eq!(listener.stops(), 1);
}

#[test]
fn nested_event_from_stopped_thread_is_skipped() {
    let (_runtime, listener, session) = common::started_session();

    session.add_breakpoint("a.rb", 1).expect("add");

    let session = Arc::new(session);

    listener.set_line_hook({
        let session = Arc::clone(&session);
        move || {
            // fired from inside the callout, on the thread holding the lock
            session.line_event("a.rb", 1).expect("nested line");
        }
    });

    session.line_event("a.rb", 1).expect("line");

    assert_eq!(listener.stops(), 1);
    assert_eq!(
        listener
            .events()
            .iter()
            .filter(|ev| matches!(ev, Event::Breakpoint { .. }))
            .count(),
        1
    );
}
