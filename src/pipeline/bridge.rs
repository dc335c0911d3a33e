//! Observer boundary between the pipeline and its consumers (UI, logging,
//! tests).
//!
//! Each `PipelineBridge` owns the receiving end of a bounded crossbeam
//! channel. The pipeline keeps the senders and publishes every
//! `PipelineMessage` to all live bridges; dropping a bridge unsubscribes it.

use crate::pipeline::event::{NodeEvent, PipelineMessage};
use crate::pipeline::id::NodeId;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Default channel capacity for messages (pipeline → observer).
pub const MSG_CHANNEL_CAPACITY: usize = 1024;

/// Observer-side handle for pipeline messages.
pub struct PipelineBridge {
    pub msg_rx: Receiver<PipelineMessage>,
}

impl PipelineBridge {
    /// Create a new bridge pair: `(bridge_for_observer, msg_tx)`.
    pub fn new(capacity: usize) -> (Self, Sender<PipelineMessage>) {
        let (msg_tx, msg_rx) = bounded(capacity.max(1));
        (Self { msg_rx }, msg_tx)
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<PipelineMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.msg_rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<PipelineMessage> {
        self.msg_rx.try_recv().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.msg_rx.is_empty()
    }

    /// Drain pending messages and keep only the events of `node`.
    pub fn drain_events(&self, node: NodeId) -> Vec<NodeEvent> {
        self.drain()
            .into_iter()
            .filter_map(|msg| match msg {
                PipelineMessage::Node { node: n, event } if n == node => Some(event),
                _ => None,
            })
            .collect()
    }
}

/// Sender side kept by the pipeline.
#[derive(Default)]
pub(crate) struct Subscribers {
    senders: Vec<Sender<PipelineMessage>>,
}

impl Subscribers {
    pub fn add(&mut self, tx: Sender<PipelineMessage>) {
        self.senders.push(tx);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Publish to every live subscriber. A full channel drops the message for
    /// that subscriber; a disconnected one is removed.
    pub fn publish(&mut self, msg: &PipelineMessage) {
        self.senders.retain(|tx| match tx.try_send(msg.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Pipeline observer channel full, dropping {:?}", msg);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}
