//! Node roster parsing.
//!
//! A roster is a text file with one comma-separated record per node:
//!
//! ```text
//! # name,id,host,p2p_port,api_port,scale_id
//! node_1,1,10.0.0.1,6000,7000,0
//! node_2,2,10.0.0.2,6000,7000,1
//! ```
//!
//! The class marker `0` places a node in the side class; any other value
//! places it in the scale class. The two class counts are the divisors used
//! by class-weighted averaging, see [`crate::data::Divisors`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::RosterError;

/// Default path of the snapshot endpoint on every node.
pub const DEFAULT_SNAPSHOT_PATH: &str = "/telematics/snapshot";

/// The two disjoint node classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeClass {
    Scale,
    Side,
}

impl NodeClass {
    /// Interpret a roster class marker.
    pub fn from_marker(marker: &str) -> Self {
        if marker == "0" {
            NodeClass::Side
        } else {
            NodeClass::Scale
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeClass::Scale => "scale",
            NodeClass::Side => "side",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A polled node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEndpoint {
    pub name: String,
    pub class: NodeClass,
    pub url: String,
}

/// Column positions of a roster record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RosterLayout {
    /// Number of fields every record must have.
    pub arity: usize,
    pub name: usize,
    pub host: usize,
    pub port: usize,
    pub class: usize,
    /// Path appended to `http://host:port`.
    pub snapshot_path: String,
}

impl Default for RosterLayout {
    fn default() -> Self {
        Self {
            arity: 6,
            name: 0,
            host: 2,
            port: 4,
            class: 5,
            snapshot_path: DEFAULT_SNAPSHOT_PATH.to_string(),
        }
    }
}

/// The immutable set of nodes to poll.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    nodes: BTreeMap<String, NodeEndpoint>,
    count_scale: usize,
    count_side: usize,
}

impl Roster {
    /// Load a roster file.
    pub fn load(path: &Path, layout: &RosterLayout) -> Result<Self, RosterError> {
        let content = fs::read_to_string(path).map_err(|source| RosterError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, layout)
    }

    /// Parse roster text.
    pub fn parse(content: &str, layout: &RosterLayout) -> Result<Self, RosterError> {
        let mut roster = Roster::default();

        for (index, raw) in content.lines().enumerate() {
            let line = index + 1;
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }

            let endpoint = parse_record(raw, line, layout)?;
            if roster.nodes.contains_key(&endpoint.name) {
                return Err(RosterError::Duplicate {
                    line,
                    name: endpoint.name,
                });
            }

            match endpoint.class {
                NodeClass::Scale => roster.count_scale += 1,
                NodeClass::Side => roster.count_side += 1,
            }
            roster.nodes.insert(endpoint.name.clone(), endpoint);
        }

        Ok(roster)
    }

    /// Build a roster from endpoints directly.
    pub fn from_endpoints(
        endpoints: impl IntoIterator<Item = NodeEndpoint>,
    ) -> Result<Self, RosterError> {
        let mut roster = Roster::default();
        for (index, endpoint) in endpoints.into_iter().enumerate() {
            if roster.nodes.contains_key(&endpoint.name) {
                return Err(RosterError::Duplicate {
                    line: index + 1,
                    name: endpoint.name,
                });
            }
            match endpoint.class {
                NodeClass::Scale => roster.count_scale += 1,
                NodeClass::Side => roster.count_side += 1,
            }
            roster.nodes.insert(endpoint.name.clone(), endpoint);
        }
        Ok(roster)
    }

    pub fn count_scale(&self) -> usize {
        self.count_scale
    }

    pub fn count_side(&self) -> usize {
        self.count_side
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&NodeEndpoint> {
        self.nodes.get(name)
    }

    pub fn class_of(&self, name: &str) -> Option<NodeClass> {
        self.nodes.get(name).map(|n| n.class)
    }

    /// Node names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Endpoints in node-name order.
    pub fn endpoints(&self) -> impl Iterator<Item = &NodeEndpoint> {
        self.nodes.values()
    }
}

fn parse_record(raw: &str, line: usize, layout: &RosterLayout) -> Result<NodeEndpoint, RosterError> {
    let tokens: Vec<&str> = raw.split(',').map(str::trim).collect();
    if tokens.len() != layout.arity {
        return Err(RosterError::Arity {
            line,
            expected: layout.arity,
            found: tokens.len(),
        });
    }

    let column = |index: usize, what: &str| {
        tokens.get(index).copied().ok_or_else(|| RosterError::Parse {
            line,
            reason: format!("{} column {} is out of range", what, index),
        })
    };

    let name = column(layout.name, "name")?;
    if name.is_empty() {
        return Err(RosterError::Parse {
            line,
            reason: "empty node name".to_string(),
        });
    }

    let host = column(layout.host, "host")?;
    if host.is_empty() {
        return Err(RosterError::Parse {
            line,
            reason: format!("empty host for node '{}'", name),
        });
    }

    let port_str = column(layout.port, "port")?;
    let port: u16 = port_str.parse().map_err(|_| RosterError::Parse {
        line,
        reason: format!("invalid port '{}'", port_str),
    })?;

    let class = NodeClass::from_marker(column(layout.class, "class")?);

    Ok(NodeEndpoint {
        name: name.to_string(),
        class,
        url: format!("http://{}:{}{}", host, port, layout.snapshot_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_roster() -> &'static str {
        "# name,id,host,p2p_port,api_port,scale_id\n\
         node_1,1,127.0.0.1,6001,7001,0\n\
         node_2,2,127.0.0.1,6002,7002,0\n\
         node_3,3,127.0.0.1,6003,7003,1\n\
         # node_9,9,127.0.0.1,6009,7009,1\n\
         node_4,4,127.0.0.1,6004,7004,2\n"
    }

    #[test]
    fn test_parse_counts_classes() {
        let roster = Roster::parse(sample_roster(), &RosterLayout::default()).unwrap();
        assert_eq!(roster.len(), 4);
        assert_eq!(roster.count_side(), 2);
        assert_eq!(roster.count_scale(), 2);
        assert_eq!(roster.count_side() + roster.count_scale(), roster.len());
    }

    #[test]
    fn test_parse_builds_urls() {
        let roster = Roster::parse(sample_roster(), &RosterLayout::default()).unwrap();
        let node = roster.get("node_3").unwrap();
        assert_eq!(node.url, "http://127.0.0.1:7003/telematics/snapshot");
        assert_eq!(node.class, NodeClass::Scale);
        assert_eq!(roster.class_of("node_1"), Some(NodeClass::Side));
    }

    #[test]
    fn test_names_sorted() {
        let text = "b,1,h,1,2,0\na,2,h,1,3,1\nc,3,h,1,4,0\n";
        let roster = Roster::parse(text, &RosterLayout::default()).unwrap();
        let names: Vec<&str> = roster.names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let text = "\n# comment\n\nn1,1,h,1,2,0\n   \n";
        let roster = Roster::parse(text, &RosterLayout::default()).unwrap();
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_wrong_arity_is_error() {
        let err = Roster::parse("n1,1,h,1,2\n", &RosterLayout::default()).unwrap_err();
        assert!(matches!(
            err,
            RosterError::Arity {
                line: 1,
                expected: 6,
                found: 5
            }
        ));
    }

    #[test]
    fn test_bad_port_is_error() {
        let err = Roster::parse("n1,1,h,1,http,0\n", &RosterLayout::default()).unwrap_err();
        assert!(matches!(err, RosterError::Parse { line: 1, .. }));
        assert!(err.to_string().contains("invalid port"));
    }

    #[test]
    fn test_duplicate_is_error() {
        let text = "n1,1,h,1,2,0\nn1,2,h,1,3,1\n";
        let err = Roster::parse(text, &RosterLayout::default()).unwrap_err();
        assert!(matches!(err, RosterError::Duplicate { line: 2, .. }));
    }

    #[test]
    fn test_custom_layout() {
        let layout = RosterLayout {
            arity: 4,
            name: 0,
            host: 1,
            port: 2,
            class: 3,
            snapshot_path: "/snap".to_string(),
        };
        let roster = Roster::parse("alpha,10.1.1.1,8080,0\n", &layout).unwrap();
        assert_eq!(roster.get("alpha").unwrap().url, "http://10.1.1.1:8080/snap");
        assert_eq!(roster.count_side(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", sample_roster()).unwrap();

        let roster = Roster::load(file.path(), &RosterLayout::default()).unwrap();
        assert_eq!(roster.len(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let err =
            Roster::load(Path::new("/nonexistent/nodes.txt"), &RosterLayout::default()).unwrap_err();
        assert!(matches!(err, RosterError::Open { .. }));
    }
}
