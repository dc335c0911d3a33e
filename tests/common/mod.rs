//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::cell::RefCell;
use std::rc::Rc;
use vizpipe::pipeline::{NodeEvent, NodeId, PipelineBridge, PipelineMessage, RecordingScene};

/// Shared recording scene plus the trait-object handle the pipeline takes.
pub fn test_scene() -> (Rc<RefCell<RecordingScene>>, vizpipe::pipeline::SceneRef) {
    let scene = RecordingScene::shared();
    let shared: vizpipe::pipeline::SceneRef = scene.clone();
    (scene, shared)
}

/// All node events in a drained message list, in publish order.
pub fn node_events(messages: &[PipelineMessage]) -> Vec<(NodeId, NodeEvent)> {
    messages
        .iter()
        .filter_map(|m| match m {
            PipelineMessage::Node { node, event } => Some((*node, *event)),
            _ => None,
        })
        .collect()
}

/// Events of one node, in publish order.
pub fn events_for(messages: &[PipelineMessage], id: NodeId) -> Vec<NodeEvent> {
    node_events(messages)
        .into_iter()
        .filter(|(node, _)| *node == id)
        .map(|(_, event)| event)
        .collect()
}

/// Drain a bridge and return its error messages.
pub fn errors(bridge: &PipelineBridge) -> Vec<(NodeId, String)> {
    bridge
        .drain()
        .into_iter()
        .filter_map(|m| match m {
            PipelineMessage::Error { node, message } => Some((node, message)),
            _ => None,
        })
        .collect()
}
