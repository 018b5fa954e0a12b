//! This crate implements the execution-control core of a source-level
//! stepping debugger for a managed language runtime.
//!
//! Two main components are provided:
//! - A trait to implement the seam to the embedding runtime (tracepoint
//!   subscriptions, thread identity, stack introspection, program loading).
//! - A trait to implement a front-end stop listener, receiving a callout
//!   whenever a thread halts on a completed step, a breakpoint or a caught
//!   exception.
//!
//! The [Session](self::session::Session) in between serializes execution so
//! that at most one thread runs instrumented code at a time, maintains a
//! per-thread stepping state machine, and decides per execution event
//! whether the firing thread stops.
//!
//! # Driving a session
//!
//! The embedding runtime's glue pushes execution events into the session,
//! synchronously, on the thread that triggered them. The front end reacts to
//! stops and re-arms stepping:
//!
//! ```no_run
//! use sisto_engine::Program;
//! use sisto_engine::listener::EventListener;
//! use sisto_engine::runtime::{FrameSnapshot, RaisedException, Runtime, ThreadId};
//! use sisto_engine::session::{Context, Session};
//!
//! // seam to the embedding runtime's instrumentation facility
//! struct MyRuntime;
//!
//! struct MyException(String);
//!
//! impl RaisedException for MyException {
//!     fn class_name(&self) -> &str {
//!         &self.0
//!     }
//! }
//!
//! impl Runtime for MyRuntime {
//!     type Exception = MyException;
//!     type Error = std::io::Error;
//!
//!     fn current_thread(&self) -> ThreadId {
//!         0
//!     }
//!
//!     fn thread_alive(&self, _thread: ThreadId) -> bool {
//!         true
//!     }
//!
//!     fn install_tracepoints(&self) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//!
//!     fn remove_tracepoints(&self) {}
//!
//!     fn stack_depth(&self) -> Option<u32> {
//!         None
//!     }
//!
//!     fn capture_frames(&self) -> Result<Vec<FrameSnapshot>, Self::Error> {
//!         Ok(Vec::new())
//!     }
//!
//!     fn load(&self, _path: &std::path::Path) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//! }
//!
//! struct MyFrontEnd;
//!
//! impl EventListener for MyFrontEnd {
//!     type Exception = MyException;
//!     type Error = std::io::Error;
//!
//!     fn at_line(&self, context: &Context, _file: &str, _line: u32) -> Result<(), Self::Error> {
//!         // inspect the stop, then re-arm stepping before resuming
//!         context.step_over(1, false).ok();
//!
//!         Ok(())
//!     }
//! }
//!
//! let session = Session::builder()
//!     .with_runtime(MyRuntime)
//!     .with_listener(MyFrontEnd)
//!     .build();
//!
//! session
//!     .load(Program::new("app/main.rb").stop_at_entry(true))
//!     .unwrap();
//! ```
//!
//! # Threading contract
//!
//! Event intake may happen concurrently from any number of runtime threads;
//! the session's gate parks all but one. A front end that runs its own event
//! loop on a dedicated thread must flag that thread's context as
//! [ignored](self::session::Context::set_ignored), so debugger-internal
//! execution never re-enters the stepping logic (and can never deadlock on
//! its own stop).

mod error;
mod program;

/// Module containing traits for handling stop callouts.
pub mod listener;

/// Module containing traits for implementing the embedding-runtime seam.
pub mod runtime;

/// Module implementing the debug session.
pub mod session;

pub use self::error::{Error, ListenerError, Result, RuntimeError, SessionError};
pub use self::program::Program;
