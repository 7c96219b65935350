use std::collections::VecDeque;

use anyhow::bail;
use tokio::sync::oneshot;
use tracing::debug;

use crate::vsockets::{ResponseKind, VnicControlMessage};

struct PendingRequest {
    kind: ResponseKind,
    reply: oneshot::Sender<VnicControlMessage>,
}

/// Matches responses to requests on a control channel. There are no request ids in the protocol,
///  so responses are expected in the order the requests were sent, and anything else is a
///  protocol violation.
///
/// Callers must register a request here and send it without interleaving other requests, so
///  the queue's order equals the order on the wire.
#[derive(Default)]
pub struct ResponseCorrelator {
    pending: VecDeque<PendingRequest>,
    is_closed: bool,
}

impl ResponseCorrelator {
    pub fn new() -> ResponseCorrelator {
        Default::default()
    }

    pub fn expect(&mut self, kind: ResponseKind) -> anyhow::Result<oneshot::Receiver<VnicControlMessage>> {
        if self.is_closed {
            bail!("control channel is closed");
        }

        let (reply, receiver) = oneshot::channel();
        self.pending.push_back(PendingRequest {
            kind,
            reply,
        });
        Ok(receiver)
    }

    pub fn on_response(&mut self, response: VnicControlMessage) -> anyhow::Result<()> {
        let kind = match response.response_kind() {
            Some(kind) => kind,
            None => bail!("received a message that is not a response: {:?}", response),
        };

        let pending = match self.pending.pop_front() {
            Some(pending) => pending,
            None => bail!("received a response without a pending request: {:?}", response),
        };
        if pending.kind != kind {
            bail!("expected a response of kind {:?}, received {:?}", pending.kind, response);
        }

        if pending.reply.send(response).is_err() {
            debug!("requester is gone - discarding response");
        }
        Ok(())
    }

    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// Fails all pending requests and rejects new ones.
    pub fn close(&mut self) {
        self.is_closed = true;
        self.pending.clear();
    }
}
