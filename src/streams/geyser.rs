// src/streams/geyser.rs
//! Yellowstone (Geyser gRPC) transaction feed.

use crate::error::SyncError;
use crate::streams::transaction::TransactionView;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use log::{debug, info};
use std::collections::HashMap;
use yellowstone_grpc_client::{ClientTlsConfig, GeyserGrpcClient};
use yellowstone_grpc_proto::prelude::{
    subscribe_update::UpdateOneof, CommitmentLevel, SubscribeRequest,
    SubscribeRequestFilterTransactions, SubscribeUpdate,
};

/// One item pushed by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Transaction(TransactionView),
    /// Pings, slots and other updates the monitor does not act on.
    Other,
}

pub type UpdateStream = BoxStream<'static, Result<StreamEvent, SyncError>>;

/// A source of streamed updates. Each call opens a fresh subscription.
#[async_trait]
pub trait UpdateFeed: Send + Sync {
    fn name(&self) -> &str;

    async fn subscribe(&self) -> Result<UpdateStream, SyncError>;
}

#[derive(Debug, Clone)]
pub struct GeyserFeed {
    endpoint: String,
    x_token: Option<String>,
    required_accounts: Vec<String>,
}

impl GeyserFeed {
    pub fn new(endpoint: String, x_token: Option<String>, required_accounts: Vec<String>) -> Self {
        Self {
            endpoint,
            x_token,
            required_accounts,
        }
    }

    pub fn subscribe_request(&self) -> SubscribeRequest {
        SubscribeRequest {
            transactions: HashMap::from([(
                "pool_creations".to_string(),
                SubscribeRequestFilterTransactions {
                    vote: Some(false),
                    failed: Some(false),
                    signature: None,
                    account_include: vec![],
                    account_exclude: vec![],
                    account_required: self.required_accounts.clone(),
                },
            )]),
            commitment: Some(CommitmentLevel::Confirmed as i32),
            ..Default::default()
        }
    }
}

/// Maps one raw update to a stream event.
pub fn decode_update(update: SubscribeUpdate) -> Result<StreamEvent, SyncError> {
    match update.update_oneof {
        Some(UpdateOneof::Transaction(tx)) => Ok(TransactionView::from_update(tx)?
            .map(StreamEvent::Transaction)
            .unwrap_or(StreamEvent::Other)),
        _ => Ok(StreamEvent::Other),
    }
}

#[async_trait]
impl UpdateFeed for GeyserFeed {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn subscribe(&self) -> Result<UpdateStream, SyncError> {
        info!("Connecting to Geyser endpoint {}", self.endpoint);
        let mut client = GeyserGrpcClient::build_from_shared(self.endpoint.clone())
            .map_err(|e| SyncError::Config(format!("invalid endpoint: {}", e)))?
            .x_token(self.x_token.clone())
            .map_err(|e| SyncError::Config(format!("invalid x-token: {}", e)))?
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| SyncError::Config(format!("tls config: {}", e)))?
            .connect()
            .await
            .map_err(|e| SyncError::Stream(format!("connect failed: {}", e)))?;

        let request = self.subscribe_request();
        debug!("Subscription request: {:?}", request);
        let (subscribe_tx, stream) = client
            .subscribe_with_request(Some(request))
            .await
            .map_err(|e| SyncError::Stream(format!("subscribe failed: {}", e)))?;
        info!(
            "Subscribed to transactions requiring {:?}",
            self.required_accounts
        );

        // Dropping the request sink closes the subscription; it lives as long
        // as the stream does.
        let stream = stream.map(move |message| {
            let _ = &subscribe_tx;
            match message {
                Ok(update) => decode_update(update),
                Err(status) => Err(SyncError::Stream(format!("receive failed: {}", status))),
            }
        });
        Ok(stream.boxed())
    }
}
