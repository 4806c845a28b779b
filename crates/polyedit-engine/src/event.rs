use serde::Serialize;

use polyedit_core::{Point, Polygon};
use polyedit_workers::TaskId;

/// A finished background request, delivered by
/// [`EditorEngine::poll_results`](crate::EditorEngine::poll_results).
///
/// The engine never applies results itself; the editor state owner commits
/// them (and records undo history) as it sees fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    Sliced {
        task: TaskId,
        source_id: String,
        parts: (Polygon, Polygon),
    },
    #[serde(rename_all = "camelCase")]
    Simplified {
        task: TaskId,
        source_id: String,
        points: Vec<Point>,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        task: TaskId,
        source_id: String,
        error: String,
    },
}

impl EngineEvent {
    pub fn task(&self) -> TaskId {
        match self {
            EngineEvent::Sliced { task, .. }
            | EngineEvent::Simplified { task, .. }
            | EngineEvent::Failed { task, .. } => *task,
        }
    }
}
