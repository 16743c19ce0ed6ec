use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::render::Renderer;
use crate::report::{Error, Mismatch};
use crate::value::Key;

/// One step of the path from the root to the value being compared.
#[derive(Clone, Debug, PartialEq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(Key),
    Deref,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Diagnostic,
    BooleanOnly,
}

// Persistent singly-linked list: extending a context shares its parent's
// nodes, so siblings never see each other's additions.
struct PathLink {
    segment: PathSegment,
    parent: Option<Arc<PathLink>>,
}

impl Drop for PathLink {
    // Unlinks iteratively; deep paths would otherwise nest one drop per link.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(link) = next {
            next = match Arc::try_unwrap(link) {
                Ok(mut link) => link.parent.take(),
                Err(_) => None,
            };
        }
    }
}

/// Pointer pairs whose comparison is in progress on the current branch.
type Visited = Arc<Mutex<HashSet<(usize, usize)>>>;

/// Keeps a pointer pair marked as visited until dropped.
///
/// Comparisons run depth-first, so the pairs alive at any point are
/// exactly those of the branch being compared.
#[must_use]
pub struct VisitGuard {
    visited: Visited,
    pair: (usize, usize),
}

impl Drop for VisitGuard {
    fn drop(&mut self) {
        self.visited.lock().remove(&self.pair);
    }
}

/// Path, mode and cycle-tracking state threaded through a comparison.
///
/// Never mutated in place: every `add_*` returns a new context.
#[derive(Clone)]
pub struct Context {
    root: Arc<str>,
    path: Option<Arc<PathLink>>,
    visited: Visited,
    mode: Mode,
    depth: usize,
    renderer: Renderer,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Context {
    pub fn new(config: &Config) -> Self {
        Self {
            root: Arc::from(config.root_name.as_str()),
            path: None,
            visited: Visited::default(),
            mode: Mode::Diagnostic,
            depth: 0,
            renderer: config.renderer,
        }
    }

    pub fn boolean(config: &Config) -> Self {
        Self::new(config).to_boolean()
    }

    /// Same position, boolean mode. Used by operators that only need a
    /// yes/no answer from a nested comparison.
    pub fn to_boolean(&self) -> Self {
        Self { mode: Mode::BooleanOnly, ..self.clone() }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_boolean(&self) -> bool {
        self.mode == Mode::BooleanOnly
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    fn push(&self, segment: PathSegment) -> Self {
        Self {
            path: Some(Arc::new(PathLink { segment, parent: self.path.clone() })),
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    pub fn add_field(&self, name: &str) -> Self {
        self.push(PathSegment::Field(name.to_string()))
    }

    pub fn add_index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    pub fn add_key(&self, key: &Key) -> Self {
        self.push(PathSegment::Key(key.clone()))
    }

    pub fn add_deref(&self) -> Self {
        self.push(PathSegment::Deref)
    }

    /// Marks the pointer pair `(got, expected)` as being compared until the
    /// returned guard is dropped. Returns `None` when the pair is already
    /// being compared higher up the current branch.
    pub fn enter(&self, got: usize, expected: usize) -> Option<VisitGuard> {
        let pair = (got, expected);
        if !self.visited.lock().insert(pair) {
            return None;
        }
        Some(VisitGuard { visited: self.visited.clone(), pair })
    }

    /// Segments from the root down.
    pub fn segments(&self) -> Vec<PathSegment> {
        let mut out = Vec::with_capacity(self.depth);
        let mut cur = self.path.as_deref();
        while let Some(link) = cur {
            out.push(link.segment.clone());
            cur = link.parent.as_deref();
        }
        out.reverse();
        out
    }

    /// Renders the path, e.g. `DATA.Items[2]["key"]`.
    ///
    /// Dereferences show as a `*` prefix; a field access right after a
    /// dereference drops it, an index or key access parenthesizes it.
    pub fn path_string(&self) -> String {
        let mut out = self.root.to_string();
        let mut stars = 0;
        for segment in self.segments() {
            match segment {
                PathSegment::Deref => stars += 1,
                PathSegment::Field(name) => {
                    stars = 0;
                    out.push('.');
                    out.push_str(&name);
                }
                PathSegment::Index(i) => {
                    out = parenthesize(out, &mut stars);
                    out.push_str(&format!("[{i}]"));
                }
                PathSegment::Key(k) => {
                    out = parenthesize(out, &mut stars);
                    out.push_str(&format!("[{k}]"));
                }
            }
        }
        if stars > 0 {
            out = format!("{}{out}", "*".repeat(stars));
        }
        out
    }

    /// Turns a failure into the right [`Mismatch`] for the current mode.
    ///
    /// `build` only runs in diagnostic mode; the context path is filled in
    /// afterwards.
    pub fn collect_error<F>(&self, build: F) -> Mismatch
    where
        F: FnOnce(&Renderer) -> Error,
    {
        if self.is_boolean() {
            return Mismatch::Boolean;
        }
        let mut err = build(&self.renderer);
        err.path = self.path_string();
        Mismatch::Report(Box::new(err))
    }
}

fn parenthesize(out: String, stars: &mut usize) -> String {
    if *stars == 0 {
        return out;
    }
    let wrapped = format!("({}{out})", "*".repeat(*stars));
    *stars = 0;
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_rendering() {
        let ctx = Context::default();
        assert_eq!(ctx.path_string(), "DATA");
        assert_eq!(ctx.add_field("A").add_index(3).path_string(), "DATA.A[3]");
        assert_eq!(ctx.add_deref().path_string(), "*DATA");
        assert_eq!(ctx.add_deref().add_deref().path_string(), "**DATA");
        assert_eq!(ctx.add_deref().add_field("A").path_string(), "DATA.A");
        assert_eq!(ctx.add_deref().add_index(1).path_string(), "(*DATA)[1]");
        assert_eq!(
            ctx.add_key(&Key::from("k")).add_deref().path_string(),
            "*DATA[\"k\"]"
        );
    }

    #[test]
    fn extension_does_not_leak_to_siblings() {
        let parent = Context::default().add_field("Parent");
        let a = parent.add_index(0);
        let b = parent.add_index(1);
        assert_eq!(a.path_string(), "DATA.Parent[0]");
        assert_eq!(b.path_string(), "DATA.Parent[1]");
        assert_eq!(parent.path_string(), "DATA.Parent");
        assert_eq!(b.depth(), 2);
    }

    #[test]
    fn visited_pairs_are_branch_local() {
        let root = Context::default();
        let guard = root.enter(1, 2).unwrap();
        assert!(root.add_deref().enter(1, 2).is_none());
        assert!(root.enter(2, 1).is_some());
        drop(guard);
        assert!(root.add_index(0).enter(1, 2).is_some());

        // separate comparisons never share visits
        let _held = root.enter(3, 4).unwrap();
        assert!(Context::default().enter(3, 4).is_some());
    }

    #[test]
    fn many_pairs_stay_cheap_to_check() {
        let ctx = Context::default();
        let guards: Vec<_> = (0..100_000).filter_map(|i| ctx.enter(i, i + 1)).collect();
        assert_eq!(guards.len(), 100_000);
        assert!(ctx.enter(99_999, 100_000).is_none());
        drop(guards);
        assert!(ctx.enter(99_999, 100_000).is_some());
    }

    #[test]
    fn deep_paths_drop_without_recursing() {
        let mut ctx = Context::default();
        for i in 0..200_000 {
            ctx = ctx.add_index(i);
        }
        assert_eq!(ctx.depth(), 200_000);
        drop(ctx);
    }

    #[test]
    fn boolean_mode_never_builds_the_error() {
        let ctx = Context::default().to_boolean();
        let out = ctx.collect_error(|_| unreachable!("built in boolean mode"));
        assert_eq!(out, Mismatch::Boolean);

        let out = Context::default().add_index(2).collect_error(|_| Error::new("boom"));
        assert_eq!(out.report().map(|e| e.path.as_str()), Some("DATA[2]"));
    }

    #[test]
    fn root_name_comes_from_config() {
        let cfg = Config::default().with_root_name("got");
        assert_eq!(Context::new(&cfg).add_field("x").path_string(), "got.x");
    }
}
