use crate::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::Mutex;

/// The location of a field within a resource's configuration, as a list of key and index
/// steps. Displayed in the `spec.ports[0].port` form used by diagnostics.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl FieldPath {
    /// A path rooted at a named top-level field.
    pub fn field<S: Into<String>>(name: S) -> Self {
        Self {
            segments: vec![PathSegment::Key(name.into())],
        }
    }

    /// The path one key deeper.
    pub fn key<S: Into<String>>(&self, name: S) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(name.into()));
        Self { segments }
    }

    /// The path one sequence element deeper.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(name) if position == 0 => write!(f, "{}", name)?,
                PathSegment::Key(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// A decode failure tied to the field it occurred on.
#[derive(Debug)]
pub struct Diagnostic {
    pub path: FieldPath,
    pub error: Error,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

/// Collects field-scoped decode failures across a planning cycle. Many resources may be
/// processed concurrently, so appends take `&self` and are serialized internally; entry order
/// across resources is meaningless, each entry carries its own path.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: FieldPath, error: Error) {
        self.lock().push(Diagnostic { path, error });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Consumes the collector, returning everything recorded during the cycle.
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
