//! ---
//! dslo_section: "02-service-naming"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Hierarchical service name value type."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Hierarchical identifier of a runtime service unit.
///
/// A name is an ordered list of segments. Ordering is lexicographic over the
/// segments, which keeps parents sorted directly before their descendants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName {
    segments: Vec<String>,
}

impl ServiceName {
    /// Build a name from its segments.
    pub fn of<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Return a new name with `segment` appended.
    pub fn append(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Segments in order, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, if any.
    pub fn simple_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Name of the immediate parent, `None` for single-segment names.
    pub fn parent(&self) -> Option<ServiceName> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when `other` lies strictly below this name.
    pub fn is_ancestor_of(&self, other: &ServiceName) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Dotted canonical form, quoting segments that would otherwise be ambiguous.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

fn needs_quotes(segment: &str) -> bool {
    segment.is_empty()
        || segment
            .chars()
            .any(|ch| ch == '.' || ch == '"' || ch == '\\' || ch.is_whitespace())
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            if needs_quotes(segment) {
                f.write_str("\"")?;
                for ch in segment.chars() {
                    if ch == '"' || ch == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{ch}")?;
                }
                f.write_str("\"")?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_extends_without_mutating_base() {
        let base = ServiceName::of(["dslo", "data-source-config"]);
        let child = base.append("ds1");
        assert_eq!(base.segments().len(), 2);
        assert_eq!(child.segments(), ["dslo", "data-source-config", "ds1"]);
        assert_eq!(child.parent(), Some(base));
    }

    #[test]
    fn ancestor_check_is_strict() {
        let root = ServiceName::of(["a", "b"]);
        assert!(root.is_ancestor_of(&root.append("c")));
        assert!(root.is_ancestor_of(&root.append("c").append("d")));
        assert!(!root.is_ancestor_of(&root));
        assert!(!root.is_ancestor_of(&ServiceName::of(["a", "bc"])));
        assert!(!root.append("c").is_ancestor_of(&root));
    }

    #[test]
    fn canonical_form_quotes_ambiguous_segments() {
        let name = ServiceName::of(["naming", "context", "java"]).append("my.ds");
        assert_eq!(name.canonical(), "naming.context.java.\"my.ds\"");
        let plain = ServiceName::of(["dslo", "data-source", "ds1"]);
        assert_eq!(plain.to_string(), "dslo.data-source.ds1");
        let escaped = ServiceName::of(["a\"b"]);
        assert_eq!(escaped.to_string(), "\"a\\\"b\"");
    }

    #[test]
    fn ordering_keeps_children_after_parent() {
        let parent = ServiceName::of(["x", "config", "ds1"]);
        let child = parent.append("connection-properties").append("url");
        let sibling = ServiceName::of(["x", "config", "ds2"]);
        let mut names = vec![sibling.clone(), child.clone(), parent.clone()];
        names.sort();
        assert_eq!(names, vec![parent, child, sibling]);
    }

    #[test]
    fn serializes_as_segment_list() {
        let name = ServiceName::of(["dslo", "data-source", "ds1"]);
        let json = serde_json::to_value(&name).unwrap();
        assert_eq!(json, serde_json::json!(["dslo", "data-source", "ds1"]));
        let back: ServiceName = serde_json::from_value(json).unwrap();
        assert_eq!(back, name);
    }
}
