// Workflow-set and submission discovery

use std::path::{Path, PathBuf};

use tracing::info;
use wfgrade_recon::config::DiscoveryConfig;
use wfgrade_recon::Submission;

fn sorted_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, String> {
    let entries = std::fs::read_dir(dir).map_err(|e| format!("cannot read {}: {e}", dir.display()))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Sub-directories of `workspace` that carry the workflow-set marker and no
/// rendered diagram. Anything else is silently not a workflow-set.
pub fn detect_workflow_sets(workspace: &Path, config: &DiscoveryConfig) -> Result<Vec<String>, String> {
    let mut sets = Vec::new();
    for (name, path) in sorted_subdirs(workspace)? {
        if config.exclude.iter().any(|x| x == &name) {
            continue;
        }
        let has_marker = path.join(&config.workflow_set_marker).exists();
        let has_diagram = path.join(&config.diagram_marker).exists();
        if has_marker && !has_diagram {
            info!(workflow_set = %name, "detected workflow-set");
            sets.push(name);
        }
    }
    Ok(sets)
}

/// Submissions of one workflow-set in listing order; id = directory name.
pub fn list_submissions(
    set_dir: &Path,
    reference_name: &str,
    config: &DiscoveryConfig,
) -> Result<Vec<Submission>, String> {
    Ok(sorted_subdirs(set_dir)?
        .into_iter()
        .filter(|(name, _)| name != reference_name)
        .filter(|(name, _)| !config.submission_prefix_digits || name.starts_with(|c: char| c.is_ascii_digit()))
        .map(|(id, path)| Submission { id, path })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn detects_marked_sets_only() {
        let ws = tempdir().unwrap();
        let cfg = DiscoveryConfig::default();
        touch(&ws.path().join("week2/workflowset.meta"));
        touch(&ws.path().join("week1/workflowset.meta"));
        // A single workflow that also has a set marker
        touch(&ws.path().join("solo/workflowset.meta"));
        touch(&ws.path().join("solo/workflow.svg"));
        touch(&ws.path().join("Example Workflows/workflowset.meta"));
        fs::create_dir_all(ws.path().join("scratch")).unwrap();
        touch(&ws.path().join("notes.txt"));

        let sets = detect_workflow_sets(ws.path(), &cfg).unwrap();
        assert_eq!(sets, vec!["week1", "week2"]);
    }

    #[test]
    fn lists_digit_prefixed_submissions() {
        let set = tempdir().unwrap();
        for name in ["20230002", "20230001", "reference", "solution", "3_late"] {
            fs::create_dir_all(set.path().join(name)).unwrap();
        }
        touch(&set.path().join("20239999.zip"));

        let subs = list_submissions(set.path(), "reference", &DiscoveryConfig::default()).unwrap();
        let ids: Vec<&str> = subs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["20230001", "20230002", "3_late"]);

        let cfg = DiscoveryConfig {
            submission_prefix_digits: false,
            ..DiscoveryConfig::default()
        };
        let subs = list_submissions(set.path(), "reference", &cfg).unwrap();
        assert_eq!(subs.len(), 4);
    }
}
