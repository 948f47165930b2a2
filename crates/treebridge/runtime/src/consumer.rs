//! Outbound half of the transport: telling the consumer which providers exist

use tokio::sync::mpsc;
use treebridge_types::{ProviderId, ProviderNotice};

/// Receives provider lifecycle announcements on behalf of the consumer
pub trait ConsumerProxy: Send + Sync {
    fn provider_registered(&self, provider_id: &ProviderId);

    fn provider_unregistered(&self, provider_id: &ProviderId);
}

/// Proxy for bridges without a consumer attached
#[derive(Debug, Default)]
pub struct NoopConsumerProxy;

impl ConsumerProxy for NoopConsumerProxy {
    fn provider_registered(&self, _provider_id: &ProviderId) {}

    fn provider_unregistered(&self, _provider_id: &ProviderId) {}
}

/// Forwards announcements into a channel drained by the consumer side
#[derive(Debug, Clone)]
pub struct ChannelConsumerProxy {
    notices: mpsc::UnboundedSender<ProviderNotice>,
}

impl ChannelConsumerProxy {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProviderNotice>) {
        let (notices, rx) = mpsc::unbounded_channel();
        (Self { notices }, rx)
    }

    fn send(&self, notice: ProviderNotice) {
        if self.notices.send(notice).is_err() {
            tracing::debug!("consumer stopped listening for provider notices");
        }
    }
}

impl ConsumerProxy for ChannelConsumerProxy {
    fn provider_registered(&self, provider_id: &ProviderId) {
        self.send(ProviderNotice::Registered(provider_id.clone()));
    }

    fn provider_unregistered(&self, provider_id: &ProviderId) {
        self.send(ProviderNotice::Unregistered(provider_id.clone()));
    }
}
