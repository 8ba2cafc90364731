//! Helpers for creating [`Artifact`] objects and applying artifact deltas.

use crate::types::{Artifact, Part, TaskArtifactUpdateEvent};
use crate::utils::parts::get_text_parts;
use serde_json::Value;
use uuid::Uuid;

/// Creates a new artifact with a generated `artifact_id`.
pub fn new_artifact(
    parts: Vec<Part>,
    name: impl Into<String>,
    description: Option<impl Into<String>>,
) -> Artifact {
    Artifact {
        artifact_id: Uuid::new_v4().to_string(),
        name: Some(name.into()),
        description: description.map(|d| d.into()),
        parts,
        metadata: None,
        extensions: None,
    }
}

/// Creates a new artifact containing a single text part.
///
/// # Example
///
/// ```
/// use a2a_runtime::utils::new_text_artifact;
///
/// let artifact = new_text_artifact("greeting", "Hello, world!", Some("A greeting"));
/// assert_eq!(artifact.name, Some("greeting".to_string()));
/// ```
pub fn new_text_artifact(
    name: impl Into<String>,
    text: impl Into<String>,
    description: Option<impl Into<String>>,
) -> Artifact {
    new_artifact(vec![Part::text(text)], name, description)
}

/// Creates a new artifact containing a single data part.
pub fn new_data_artifact(
    name: impl Into<String>,
    data: Value,
    description: Option<impl Into<String>>,
) -> Artifact {
    new_artifact(vec![Part::data(data)], name, description)
}

/// Extracts and joins all text content from an artifact's parts.
pub fn get_artifact_text(artifact: &Artifact, delimiter: &str) -> String {
    get_text_parts(&artifact.parts).join(delimiter)
}

/// Applies an artifact update event to a task's artifact list.
///
/// This is the single merge rule shared by every store implementation, so
/// that delta semantics stay identical regardless of backend:
///
/// - `append == false`: upsert — replace the artifact with the same id, or
///   add it.
/// - `append == true` with an existing artifact: concatenate parts in
///   arrival order, merge metadata (incoming keys win), union extensions,
///   and overwrite `name`/`description` only when the incoming value is
///   non-empty.
/// - `append == true` with no existing artifact: add a copy of the chunk.
pub fn apply_artifact_update(artifacts: &mut Vec<Artifact>, event: &TaskArtifactUpdateEvent) {
    let incoming = &event.artifact;
    let existing_idx = artifacts
        .iter()
        .position(|a| a.artifact_id == incoming.artifact_id);

    if !event.append {
        match existing_idx {
            Some(idx) => artifacts[idx] = incoming.clone(),
            None => artifacts.push(incoming.clone()),
        }
        return;
    }

    let Some(idx) = existing_idx else {
        artifacts.push(incoming.clone());
        return;
    };

    let target = &mut artifacts[idx];
    target.parts.extend(incoming.parts.iter().cloned());

    if let Some(ref incoming_meta) = incoming.metadata {
        let merged = match (target.metadata.take(), incoming_meta.as_object()) {
            (Some(Value::Object(mut existing)), Some(incoming_obj)) => {
                for (k, v) in incoming_obj {
                    existing.insert(k.clone(), v.clone());
                }
                Value::Object(existing)
            }
            _ => incoming_meta.clone(),
        };
        target.metadata = Some(merged);
    }

    if let Some(ref incoming_ext) = incoming.extensions {
        let merged = target.extensions.get_or_insert_with(Vec::new);
        for ext in incoming_ext {
            if !merged.contains(ext) {
                merged.push(ext.clone());
            }
        }
    }

    if let Some(ref name) = incoming.name {
        if !name.is_empty() {
            target.name = Some(name.clone());
        }
    }
    if let Some(ref description) = incoming.description {
        if !description.is_empty() {
            target.description = Some(description.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(id: &str, text: &str) -> Artifact {
        Artifact {
            artifact_id: id.to_string(),
            name: None,
            description: None,
            parts: vec![Part::text(text)],
            metadata: None,
            extensions: None,
        }
    }

    fn update(artifact: Artifact, append: bool) -> TaskArtifactUpdateEvent {
        TaskArtifactUpdateEvent {
            task_id: "t1".to_string(),
            context_id: "c1".to_string(),
            kind: "artifact-update".to_string(),
            artifact,
            append,
            last_chunk: false,
            metadata: None,
        }
    }

    #[test]
    fn new_artifact_generates_uuid() {
        let artifact = new_artifact(vec![Part::text("x")], "out", None::<String>);
        assert!(Uuid::parse_str(&artifact.artifact_id).is_ok());
    }

    #[test]
    fn upsert_adds_new_artifact() {
        let mut artifacts = Vec::new();
        apply_artifact_update(&mut artifacts, &update(artifact("a1", "hello"), false));
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].artifact_id, "a1");
    }

    #[test]
    fn upsert_replaces_existing_artifact() {
        let mut artifacts = vec![artifact("a1", "old")];
        apply_artifact_update(&mut artifacts, &update(artifact("a1", "new"), false));
        assert_eq!(artifacts.len(), 1);
        assert_eq!(get_artifact_text(&artifacts[0], ""), "new");
    }

    #[test]
    fn append_concatenates_parts_in_order() {
        let mut artifacts = vec![artifact("a1", "part1")];
        apply_artifact_update(&mut artifacts, &update(artifact("a1", "part2"), true));
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].parts.len(), 2);
        assert_eq!(get_artifact_text(&artifacts[0], " "), "part1 part2");
    }

    #[test]
    fn append_without_match_adds_copy() {
        let mut artifacts = vec![artifact("a1", "x")];
        apply_artifact_update(&mut artifacts, &update(artifact("a2", "orphan"), true));
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[1].artifact_id, "a2");
    }

    #[test]
    fn append_merges_metadata_incoming_wins() {
        let mut existing = artifact("a1", "x");
        existing.metadata = Some(json!({"a": 1, "b": 1}));
        let mut artifacts = vec![existing];

        let mut incoming = artifact("a1", "y");
        incoming.metadata = Some(json!({"b": 2, "c": 3}));
        apply_artifact_update(&mut artifacts, &update(incoming, true));

        assert_eq!(artifacts[0].metadata, Some(json!({"a": 1, "b": 2, "c": 3})));
    }

    #[test]
    fn append_unions_extensions() {
        let mut existing = artifact("a1", "x");
        existing.extensions = Some(vec!["ext-a".to_string()]);
        let mut artifacts = vec![existing];

        let mut incoming = artifact("a1", "y");
        incoming.extensions = Some(vec!["ext-a".to_string(), "ext-b".to_string()]);
        apply_artifact_update(&mut artifacts, &update(incoming, true));

        assert_eq!(
            artifacts[0].extensions,
            Some(vec!["ext-a".to_string(), "ext-b".to_string()])
        );
    }

    #[test]
    fn append_keeps_name_when_incoming_empty() {
        let mut existing = artifact("a1", "x");
        existing.name = Some("report".to_string());
        let mut artifacts = vec![existing];

        let mut incoming = artifact("a1", "y");
        incoming.name = Some(String::new());
        apply_artifact_update(&mut artifacts, &update(incoming, true));
        assert_eq!(artifacts[0].name, Some("report".to_string()));

        let mut renamed = artifact("a1", "z");
        renamed.name = Some("final-report".to_string());
        apply_artifact_update(&mut artifacts, &update(renamed, true));
        assert_eq!(artifacts[0].name, Some("final-report".to_string()));
    }
}
