// Input data path recovery from reader node settings

use std::path::Path;

use tracing::debug;

use crate::nodes::{node_dirs, NODE_SETTINGS};

/// Settings keys that hold a reader node's input location.
const PATH_KEYS: &[&[u8]] = &[b"url", b"path", b"file"];

/// First input file path configured on a reader node of the workflow, or an
/// empty string when no reader declares one.
pub fn find_data_path(workflow_dir: &Path) -> String {
    let Ok(nodes) = node_dirs(workflow_dir) else {
        return String::new();
    };

    nodes
        .iter()
        .filter(|n| n.node_type.contains("Reader"))
        .find_map(|n| {
            let xml = std::fs::read_to_string(n.path.join(NODE_SETTINGS)).ok()?;
            let found = data_path_in_settings(&xml);
            if let Some(ref p) = found {
                debug!(node = %n.node_type, path = %p, "reader input path");
            }
            found
        })
        .unwrap_or_default()
}

/// First `<entry key="url|path|file" value="..."/>` with a non-empty value.
pub fn data_path_in_settings(xml: &str) -> Option<String> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"entry" => {
                let mut key = None;
                let mut value = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"key" => key = Some(attr.value.into_owned()),
                        b"value" => value = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }
                if let (Some(key), Some(value)) = (key, value) {
                    if PATH_KEYS.contains(&key.as_slice()) && !value.trim().is_empty() {
                        return Some(value);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    None
}
