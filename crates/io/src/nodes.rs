// Node inventory of a workflow directory

use std::path::{Path, PathBuf};

use wfgrade_recon::NodeCounts;

pub const NODE_SETTINGS: &str = "settings.xml";

/// A node directory inside a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDir {
    pub node_type: String,
    pub path: PathBuf,
}

/// Node type from a node directory name: everything before the first
/// parenthesis, trimmed. `"CSV Reader (#1)"` -> `"CSV Reader"`.
pub fn node_type_of(dir_name: &str) -> &str {
    dir_name.split(['(', ')']).next().unwrap_or("").trim()
}

/// Every immediate sub-directory holding a `settings.xml`, sorted by directory name.
pub fn node_dirs(workflow_dir: &Path) -> Result<Vec<NodeDir>, String> {
    let entries = std::fs::read_dir(workflow_dir)
        .map_err(|e| format!("cannot read {}: {e}", workflow_dir.display()))?;

    let mut nodes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        if !path.is_dir() || !path.join(NODE_SETTINGS).is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        nodes.push(NodeDir {
            node_type: node_type_of(&name).to_string(),
            path,
        });
    }
    nodes.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(nodes)
}

pub fn count_nodes(workflow_dir: &Path) -> Result<NodeCounts, String> {
    Ok(node_dirs(workflow_dir)?
        .into_iter()
        .map(|n| (n.node_type, 1))
        .collect())
}
