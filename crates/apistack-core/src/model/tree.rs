//! The gateway's path tree.
//!
//! A rooted tree of path segments (`/` → `api` → ...). Each node may host
//! methods; a `(path, verb)` pair is unique across the tree. Nodes are kept
//! in insertion order so the resources emitted from the tree are stable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{SynthError, SynthResult};

/// HTTP verbs a method may be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Any,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Any => "ANY",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "ANY" => Ok(Self::Any),
            _ => Err(SynthError::invalid_argument(format!("unsupported http verb: {s}"))),
        }
    }
}

/// Index of a node inside an [`ApiResourceTree`].
pub type TreeIndex = usize;

#[derive(Debug, Clone)]
struct TreeNode {
    segment: String,
    parent: Option<TreeIndex>,
    path: String,
    depth: usize,
    children: Vec<TreeIndex>,
    methods: Vec<HttpVerb>,
}

/// Rooted tree of path segments.
#[derive(Debug, Clone)]
pub struct ApiResourceTree {
    nodes: Vec<TreeNode>,
}

impl Default for ApiResourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiResourceTree {
    /// Index of the root (`/`).
    pub const ROOT: TreeIndex = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode {
                segment: String::new(),
                parent: None,
                path: "/".to_string(),
                depth: 0,
                children: Vec::new(),
                methods: Vec::new(),
            }],
        }
    }

    /// Add (or find) the child `segment` under `parent`.
    pub fn add_resource(&mut self, parent: TreeIndex, segment: &str) -> SynthResult<TreeIndex> {
        validate_segment(segment)?;
        let parent_node = self
            .nodes
            .get(parent)
            .ok_or_else(|| SynthError::invalid_argument(format!("unknown tree index: {parent}")))?;

        if let Some(existing) = parent_node
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[*c].segment == segment)
        {
            return Ok(existing);
        }

        let path = if parent_node.path == "/" {
            format!("/{segment}")
        } else {
            format!("{}/{segment}", parent_node.path)
        };
        let depth = parent_node.depth + 1;

        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            segment: segment.to_string(),
            parent: Some(parent),
            path,
            depth,
            children: Vec::new(),
            methods: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        Ok(idx)
    }

    /// Create every missing segment of `path` and return the leaf index.
    pub fn ensure_path(&mut self, path: &str) -> SynthResult<TreeIndex> {
        if !path.starts_with('/') {
            return Err(SynthError::invalid_argument(format!(
                "resource path must start with '/': {path}"
            )));
        }
        let mut at = Self::ROOT;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            at = self.add_resource(at, segment)?;
        }
        Ok(at)
    }

    /// Declare a method at `at`. Fails if the verb already exists on that path.
    pub fn add_method(&mut self, at: TreeIndex, verb: HttpVerb) -> SynthResult<()> {
        let node = self
            .nodes
            .get_mut(at)
            .ok_or_else(|| SynthError::invalid_argument(format!("unknown tree index: {at}")))?;
        if node.methods.contains(&verb) {
            return Err(SynthError::DuplicateRoute {
                path: node.path.clone(),
                verb: verb.to_string(),
            });
        }
        node.methods.push(verb);
        Ok(())
    }

    pub fn full_path(&self, at: TreeIndex) -> Option<&str> {
        self.nodes.get(at).map(|n| n.path.as_str())
    }

    pub fn parent(&self, at: TreeIndex) -> Option<TreeIndex> {
        self.nodes.get(at).and_then(|n| n.parent)
    }

    pub fn depth(&self, at: TreeIndex) -> Option<usize> {
        self.nodes.get(at).map(|n| n.depth)
    }

    pub fn segment(&self, at: TreeIndex) -> Option<&str> {
        self.nodes.get(at).map(|n| n.segment.as_str())
    }

    /// Non-root nodes in insertion order (parents always precede children).
    pub fn resources(&self) -> impl Iterator<Item = TreeIndex> {
        1..self.nodes.len()
    }

    /// All `(path, verb)` pairs in declaration order.
    pub fn methods(&self) -> Vec<(String, HttpVerb)> {
        let mut out = Vec::new();
        for n in &self.nodes {
            for v in &n.methods {
                out.push((n.path.clone(), *v));
            }
        }
        out
    }

    pub fn method_count(&self) -> usize {
        self.nodes.iter().map(|n| n.methods.len()).sum()
    }
}

fn validate_segment(segment: &str) -> SynthResult<()> {
    if segment.is_empty() {
        return Err(SynthError::invalid_argument("path segment must not be empty"));
    }
    if segment.contains('/') || segment.chars().any(char::is_whitespace) {
        return Err(SynthError::invalid_argument(format!(
            "invalid path segment: {segment:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn paths_concatenate_ancestors() {
        let mut t = ApiResourceTree::new();
        let api = t.add_resource(ApiResourceTree::ROOT, "api").unwrap();
        let v1 = t.add_resource(api, "v1").unwrap();
        assert_eq!(t.full_path(api), Some("/api"));
        assert_eq!(t.full_path(v1), Some("/api/v1"));
        assert_eq!(t.parent(v1), Some(api));
        assert_eq!(t.depth(v1), Some(2));
    }

    #[test]
    fn ensure_path_reuses_existing_segments() {
        let mut t = ApiResourceTree::new();
        let a = t.ensure_path("/api/items").unwrap();
        let b = t.ensure_path("/api/items").unwrap();
        assert_eq!(a, b);
        assert_eq!(t.resources().count(), 2);
    }

    #[test]
    fn duplicate_route_rejected() {
        let mut t = ApiResourceTree::new();
        let api = t.ensure_path("/api").unwrap();
        t.add_method(api, HttpVerb::Get).unwrap();
        t.add_method(api, HttpVerb::Post).unwrap();
        let err = t.add_method(api, HttpVerb::Get).unwrap_err();
        assert_matches!(err, SynthError::DuplicateRoute { ref path, ref verb } if path == "/api" && verb == "GET");
        assert_eq!(t.method_count(), 2);
    }

    #[test]
    fn bad_segments_rejected() {
        let mut t = ApiResourceTree::new();
        assert!(t.add_resource(ApiResourceTree::ROOT, "").is_err());
        assert!(t.add_resource(ApiResourceTree::ROOT, "a b").is_err());
        assert!(t.ensure_path("api").is_err());
    }

    #[test]
    fn verbs_parse_case_insensitively() {
        assert_eq!("post".parse::<HttpVerb>().unwrap(), HttpVerb::Post);
        assert!("TRACE".parse::<HttpVerb>().is_err());
    }
}
