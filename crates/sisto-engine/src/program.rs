use std::path::PathBuf;

/// A debuggee program descriptor, providing control over how the embedding
/// runtime loads the program under debug.
#[derive(Debug)]
pub struct Program {
    /// Program to load.
    pub path: PathBuf,

    /// Whether execution stops on the first line of the program.
    pub stop_at_entry: bool,
}

impl Program {
    /// Constructs a new `Program` for loading the script at path `path`,
    /// with the following default configuration:
    ///
    /// * Execution does not stop at the program's entry
    ///
    /// Builder methods are provided to change these defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stop_at_entry: false,
        }
    }

    /// Specifies whether execution stops on the first line of the program.
    ///
    /// When enabled, a single step is armed on the loading thread's execution
    /// context before the program runs, so the front end is notified as soon
    /// as the first line event fires.
    #[must_use]
    pub const fn stop_at_entry(mut self, stop: bool) -> Self {
        self.stop_at_entry = stop;
        self
    }
}
