use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;

/// A registered (source file, line) location that halts execution when
/// reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    id: u32,
    file: String,
    line: u32,
    enabled: bool,
    hits: u64,
}

impl Breakpoint {
    /// Identifier assigned at registration.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Normalized source path this breakpoint matches.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Source line this breakpoint matches.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Whether this breakpoint participates in matching.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Number of stops this breakpoint has triggered.
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

/// A registered interest in a named exception class, tracked by hit count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catchpoint {
    class: String,
    hits: u64,
}

impl Catchpoint {
    /// Exception class name this catchpoint matches (subclasses included).
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Number of matching raises observed, independent of stop decisions.
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

#[derive(Debug, Default)]
pub(crate) struct BreakpointTable {
    bks: Vec<Breakpoint>,
    next_id: u32,
}

impl BreakpointTable {
    pub fn add(&mut self, file: &str, line: u32) -> Breakpoint {
        let id = self.next_id;
        self.next_id += 1;

        let bk = Breakpoint {
            id,
            file: normalize_path(file),
            line,
            enabled: true,
            hits: 0,
        };

        self.bks.push(bk.clone());
        bk
    }

    pub fn remove(&mut self, id: u32) -> Option<Breakpoint> {
        let idx = self.bks.iter().position(|bk| bk.id == id)?;
        Some(self.bks.remove(idx))
    }

    pub fn set_enabled(&mut self, id: u32, enabled: bool) -> Option<()> {
        let bk = self.bks.iter_mut().find(|bk| bk.id == id)?;
        bk.enabled = enabled;
        Some(())
    }

    /// Finds the first enabled breakpoint at the given location and records
    /// the hit. Ordering across breakpoints at the same location is
    /// registration order.
    pub fn register_hit(&mut self, file: &str, line: u32) -> Option<Breakpoint> {
        let file = normalize_path(file);

        let bk = self
            .bks
            .iter_mut()
            .find(|bk| bk.enabled && bk.line == line && bk.file == file)?;

        bk.hits = bk.hits.saturating_add(1);

        Some(bk.clone())
    }

    pub fn all(&self) -> Vec<Breakpoint> {
        self.bks.clone()
    }
}

/// Insertion-ordered table of exception-class catchpoints.
#[derive(Debug, Default)]
pub(crate) struct CatchpointTable {
    points: IndexMap<String, u64>,
}

impl CatchpointTable {
    pub fn add(&mut self, class: String) {
        self.points.entry(class).or_insert(0);
    }

    /// Walks a raised exception's class chain (most-derived first) and
    /// returns the first registered class name, if any.
    pub fn match_chain<'e>(&self, chain: impl Iterator<Item = &'e str>) -> Option<String> {
        for class in chain {
            if self.points.contains_key(class) {
                return Some(class.to_owned());
            }
        }

        None
    }

    /// Increments the hit counter of a registered class and returns the new
    /// count.
    pub fn record_hit(&mut self, class: &str) -> u64 {
        let hits = self.points.entry(class.to_owned()).or_insert(0);
        *hits = hits.saturating_add(1);
        *hits
    }

    pub fn hits_of(&self, class: &str) -> Option<u64> {
        self.points.get(class).copied()
    }

    pub fn all(&self) -> Vec<Catchpoint> {
        self.points
            .iter()
            .map(|(class, hits)| Catchpoint {
                class: class.clone(),
                hits: *hits,
            })
            .collect()
    }
}

/// Normalizes a source path for exact-match breakpoint lookup: redundant
/// `.` components are dropped and `..` components are resolved lexically.
fn normalize_path(file: &str) -> String {
    let mut out = PathBuf::new();

    for component in Path::new(file).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }

    out.to_string_lossy().into_owned()
}
