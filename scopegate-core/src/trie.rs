//! Route trie mapping (method, URI pattern) to scopes
//!
//! Each node holds one path segment. A node without a segment is a wildcard and
//! stands for `*`, `:param` and empty segments alike. Terminal nodes carry the
//! scope they were registered for and a bitmask of the registered methods.
//!
//! Matching is breadth-first over the request's segments. A wildcard child that
//! is terminal for the requested method matches the rest of the path no matter
//! how deep it is, so `GET /foo/*` matches `GET /foo/a/b/c`.
//!
//! Children are scanned linearly. This is slow when many patterns share the
//! same base path (`/foo/*/baz`, `/foo/bar/*` and `/foo/*` all match
//! `/foo/bar/baz`), which is fine for the route counts a service registers.

use crate::types::{Method, MethodMask, ScopeIndex};

/// Split a URI into path segments: trim slashes, drop the query string, split on `/`.
///
/// The result always has at least one segment; `/` yields a single empty one.
pub fn segments(uri: &str) -> Vec<&str> {
    let path = uri.trim_matches('/').split('?').next().unwrap_or_default();
    path.split('/').collect()
}

/// Whether a pattern segment matches any single request segment
pub fn is_wildcard(segment: &str) -> bool {
    segment.is_empty() || segment == "*" || segment.starts_with(':')
}

#[derive(Debug, Clone, Default)]
struct Node {
    /// `None` matches any single segment
    segment: Option<Box<str>>,
    children: Vec<Node>,
    methods: MethodMask,
    scope: Option<ScopeIndex>,
}

impl Node {
    fn for_segment(segment: &str) -> Self {
        Node {
            segment: (!is_wildcard(segment)).then(|| segment.into()),
            ..Node::default()
        }
    }

    fn is_wildcard(&self) -> bool {
        self.segment.is_none()
    }

    fn has_method(&self, method: Method) -> bool {
        self.methods.contains(method)
    }

    /// Whether an inserted `segment` may descend into this node
    fn accepts(&self, segment: &str, wildcard: bool) -> bool {
        match &self.segment {
            None => wildcard,
            Some(literal) => literal.as_ref() == segment,
        }
    }

    /// Only untagged nodes are shared, except the terminal of a re-registration
    /// of the same scope (which merges its method into the existing node).
    fn reusable_for(&self, scope: ScopeIndex, is_final: bool) -> bool {
        match self.scope {
            None => true,
            Some(existing) => existing == scope && is_final,
        }
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// Segment-indexed tree matching URLs against scope URIs
#[derive(Debug, Clone, Default)]
pub struct RouteTrie {
    root: Node,
    routes: usize,
}

impl RouteTrie {
    /// Create an empty trie
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `method uri` for `scope`.
    pub fn add_route(&mut self, method: Method, uri: &str, scope: ScopeIndex) {
        let parts = segments(uri);
        let last = parts.len() - 1;
        let mut node = &mut self.root;

        for (idx, raw) in parts.into_iter().enumerate() {
            let segment = raw.trim();
            let wildcard = is_wildcard(segment);
            let is_final = idx == last;

            let existing = node.children.iter().position(|child| {
                child.accepts(segment, wildcard) && child.reusable_for(scope, is_final)
            });

            let pos = match existing {
                Some(pos) => pos,
                None => {
                    node.children.push(Node::for_segment(segment));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[pos];
        }

        node.scope = Some(scope);
        node.methods.insert(method);
        self.routes += 1;
    }

    /// All scopes whose pattern matches `method url`, in discovery order, without duplicates.
    pub fn matching_scopes(&self, method: Method, url: &str) -> Vec<ScopeIndex> {
        let mut scopes = Vec::new();
        let mut push = |scope: ScopeIndex| {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        };

        let mut candidates: Vec<&Node> = vec![&self.root];

        for segment in segments(url) {
            let mut next = Vec::new();
            for candidate in &candidates {
                for child in &candidate.children {
                    if child.is_wildcard() && child.has_method(method) {
                        // greedy: a terminal wildcard swallows the remaining path
                        if let Some(scope) = child.scope {
                            push(scope);
                        }
                    } else if child.accepts(segment, false) || child.is_wildcard() {
                        next.push(child);
                    }
                }
            }
            candidates = next;
        }

        for candidate in candidates {
            if candidate.has_method(method) {
                if let Some(scope) = candidate.scope {
                    push(scope);
                }
            }
        }

        scopes
    }

    /// Number of `add_route` calls
    pub fn route_count(&self) -> usize {
        self.routes
    }

    /// Number of nodes, excluding the root
    pub fn node_count(&self) -> usize {
        self.root.count() - 1
    }

    /// Whether no route was added
    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }
}
