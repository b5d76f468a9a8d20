use serde::{self, Deserialize, Serialize};

use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Identifies one algorithm in a pipeline graph.
pub struct NodeHandle {
    pub ns: Option<u16>,
    pub id: String,
}

impl NodeHandle {
    pub fn new(ns: Option<u16>, id: String) -> Self {
        Self { ns, id }
    }

    /// A handle in the root namespace.
    pub fn root(id: impl Into<String>) -> Self {
        Self {
            ns: None,
            id: id.into(),
        }
    }
}

impl Display for NodeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let ns_str = match self.ns {
            Some(ns) => ns.to_string(),
            None => "r".to_string(),
        };
        f.write_str(&format!("{}_{}", ns_str, self.id))
    }
}

#[test]
fn test_handle_display() {
    assert_eq!(NodeHandle::new(Some(10), 100.to_string()).to_string(), "10_100");
    assert_eq!(NodeHandle::root("reader").to_string(), "r_reader");
}
