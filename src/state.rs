use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::verifier::IdentityVerifier;
use crate::gateway::PaymentGateway;
use crate::models::tracking::TrackingEvent;
use crate::observability::metrics::Metrics;
use crate::store::Stores;

pub struct AppState {
    pub stores: Stores,
    pub identity: Arc<dyn IdentityVerifier>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub currency: String,
    pub tracking_events_tx: broadcast::Sender<TrackingEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        stores: Stores,
        identity: Arc<dyn IdentityVerifier>,
        gateway: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
        event_buffer_size: usize,
    ) -> Self {
        let (tracking_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            stores,
            identity,
            gateway,
            currency: currency.into(),
            tracking_events_tx,
            metrics: Metrics::new(),
        }
    }
}
