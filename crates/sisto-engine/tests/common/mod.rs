pub mod listener;

use std::sync::Arc;
use std::time::{Duration, Instant};

pub use self::listener::{Event, RecordingListener};
pub use self::runtime::{ScriptRuntime, TestException};

use sisto_engine::session::Session;

pub type TestSession = Session<Arc<ScriptRuntime>, Arc<RecordingListener>>;

pub fn build_session() -> (Arc<ScriptRuntime>, Arc<RecordingListener>, TestSession) {
    let runtime = Arc::new(ScriptRuntime::new());
    let listener = Arc::new(RecordingListener::new());

    let session = Session::builder()
        .with_runtime(Arc::clone(&runtime))
        .with_listener(Arc::clone(&listener))
        .build();

    (runtime, listener, session)
}

pub fn started_session() -> (Arc<ScriptRuntime>, Arc<RecordingListener>, TestSession) {
    let (runtime, listener, session) = build_session();
    session.start().expect("start");
    (runtime, listener, session)
}

/// Polls `cond` until it holds or a generous deadline expires.
pub fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);

    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    false
}
