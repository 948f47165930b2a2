//! Call server
//!
//! Plays the bridge side of the transport: calls arrive on a bounded channel,
//! each is served on its own task so a slow provider never holds up the
//! others, and the reply goes back on a per-call oneshot channel.

use crate::bridge::TreeBridge;
use crate::config::ServerConfig;
use crate::error::ServerError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};
use treebridge_types::{
    BridgeCall, BridgeReply, BridgeRequest, BridgeValue, CallId, InternalNode, ProviderId,
};

struct Envelope {
    call: BridgeCall,
    reply: oneshot::Sender<BridgeReply>,
}

pub struct BridgeServer;

impl BridgeServer {
    /// Start serving `bridge`. The server runs until it is shut down through
    /// the returned handle or every client has been dropped.
    pub fn spawn(bridge: TreeBridge, config: &ServerConfig) -> (BridgeClient, ServerHandle) {
        let (calls_tx, mut calls_rx) = mpsc::channel::<Envelope>(config.channel_capacity);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();

            loop {
                tokio::select! {
                    envelope = calls_rx.recv() => match envelope {
                        Some(envelope) => serve(&mut in_flight, &bridge, envelope),
                        None => {
                            debug!("all bridge clients dropped");
                            break;
                        }
                    },
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(err) = joined {
                            warn!(error = %err, "bridge call task failed");
                        }
                    }
                    Some(()) = stop_rx.recv() => {
                        debug!("bridge server stopping");
                        // Refuse new calls but answer the ones already queued.
                        calls_rx.close();
                        while let Some(envelope) = calls_rx.recv().await {
                            serve(&mut in_flight, &bridge, envelope);
                        }
                        break;
                    }
                }
            }

            while let Some(joined) = in_flight.join_next().await {
                if let Err(err) = joined {
                    warn!(error = %err, "bridge call task failed");
                }
            }
            debug!("bridge server stopped");
        });

        let client = BridgeClient {
            calls: calls_tx,
            next_call: Arc::new(AtomicU64::new(1)),
        };
        let handle = ServerHandle {
            task,
            stop: stop_tx,
        };
        (client, handle)
    }
}

fn serve(in_flight: &mut JoinSet<()>, bridge: &TreeBridge, envelope: Envelope) {
    let bridge = bridge.clone();
    in_flight.spawn(async move {
        let Envelope { call, reply } = envelope;
        let call_id = call.call_id;
        debug!(%call_id, method = call.request.method(), provider_id = %call.provider_id, "serving call");

        let answer = bridge.handle(call).await;
        if reply.send(answer).is_err() {
            debug!(%call_id, "caller went away before the reply");
        }
    });
}

/// Stops a running server
pub struct ServerHandle {
    task: JoinHandle<()>,
    stop: mpsc::Sender<()>,
}

impl ServerHandle {
    /// Stop accepting calls and wait for in-flight calls to settle.
    pub async fn shutdown(self) {
        // The server may already be gone if every client was dropped.
        let _ = self.stop.send(()).await;
        if let Err(err) = self.task.await {
            warn!(error = %err, "bridge server task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Consumer-side handle for issuing calls; cheap to clone
#[derive(Clone)]
pub struct BridgeClient {
    calls: mpsc::Sender<Envelope>,
    next_call: Arc<AtomicU64>,
}

impl BridgeClient {
    /// Issue a raw call and wait for its reply
    pub async fn call(
        &self,
        provider_id: ProviderId,
        request: BridgeRequest,
    ) -> Result<BridgeReply, ServerError> {
        let call_id = CallId::new(self.next_call.fetch_add(1, Ordering::Relaxed));
        let (reply_tx, reply_rx) = oneshot::channel();

        self.calls
            .send(Envelope {
                call: BridgeCall {
                    call_id,
                    provider_id,
                    request,
                },
                reply: reply_tx,
            })
            .await
            .map_err(|_| ServerError::Closed)?;

        reply_rx.await.map_err(|_| ServerError::ReplyDropped(call_id))
    }

    pub async fn provide_root_node(
        &self,
        provider_id: impl Into<ProviderId>,
    ) -> Result<InternalNode, ServerError> {
        let reply = self
            .call(provider_id.into(), BridgeRequest::ProvideRootNode)
            .await?;
        let call_id = reply.call_id;
        match reply.into_result()? {
            BridgeValue::Node(node) => Ok(node),
            _ => Err(ServerError::UnexpectedReply {
                call_id,
                expected: "node",
            }),
        }
    }

    pub async fn resolve_children(
        &self,
        provider_id: impl Into<ProviderId>,
        node: &InternalNode,
    ) -> Result<Vec<InternalNode>, ServerError> {
        let request = BridgeRequest::ResolveChildren { node: node.clone() };
        let reply = self.call(provider_id.into(), request).await?;
        let call_id = reply.call_id;
        match reply.into_result()? {
            BridgeValue::Children(children) => Ok(children),
            _ => Err(ServerError::UnexpectedReply {
                call_id,
                expected: "children",
            }),
        }
    }

    pub async fn execute_node_command(
        &self,
        provider_id: impl Into<ProviderId>,
        node: &InternalNode,
    ) -> Result<(), ServerError> {
        let request = BridgeRequest::ExecuteCommand { node: node.clone() };
        let reply = self.call(provider_id.into(), request).await?;
        let call_id = reply.call_id;
        match reply.into_result()? {
            BridgeValue::Unit => Ok(()),
            _ => Err(ServerError::UnexpectedReply {
                call_id,
                expected: "unit",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::InMemoryCommandRegistry;
    use crate::config::BridgeConfig;
    use crate::consumer::NoopConsumerProxy;
    use crate::provider::JsonTreeProvider;
    use serde_json::json;
    use treebridge_types::FaultKind;

    fn bridge() -> TreeBridge {
        TreeBridge::new(
            &BridgeConfig::default(),
            Arc::new(InMemoryCommandRegistry::new()),
            Arc::new(NoopConsumerProxy),
        )
    }

    #[tokio::test]
    async fn client_calls_are_numbered_and_answered() {
        let bridge = bridge();
        let _files = bridge
            .register_provider(
                "files",
                Arc::new(JsonTreeProvider::new(json!({ "label": "root" }))),
            )
            .unwrap();
        let (client, handle) = BridgeServer::spawn(bridge, &ServerConfig::default());

        let first = client
            .call("files".into(), BridgeRequest::ProvideRootNode)
            .await
            .unwrap();
        let second = client
            .call("files".into(), BridgeRequest::ProvideRootNode)
            .await
            .unwrap();
        assert_eq!(first.call_id, CallId::new(1));
        assert_eq!(second.call_id, CallId::new(2));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn rejection_surfaces_as_typed_fault() {
        let (client, handle) = BridgeServer::spawn(bridge(), &ServerConfig::default());

        let err = client.provide_root_node("ghost").await.unwrap_err();
        match err {
            ServerError::Rejected(fault) => assert_eq!(fault.kind, FaultKind::ProviderNotFound),
            other => panic!("unexpected error {other:?}"),
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn calls_after_shutdown_are_refused() {
        let (client, handle) = BridgeServer::spawn(bridge(), &ServerConfig::default());
        handle.shutdown().await;

        let err = client.provide_root_node("files").await.unwrap_err();
        assert!(matches!(err, ServerError::Closed));
    }

    #[tokio::test]
    async fn server_stops_when_clients_are_dropped() {
        let (client, handle) = BridgeServer::spawn(bridge(), &ServerConfig::default());
        drop(client);
        handle.shutdown().await;
    }
}
