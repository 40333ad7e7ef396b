//! Request and response bodies for the REST surface.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Address, Epoch, StreamId, TailResync, TxResolutionInfo};

/// `POST /api/v1/token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextTokenRequest {
    #[serde(default)]
    pub stream_ids: Vec<StreamId>,
    /// 0 requests a pure tail query, no reservation.
    pub num_tokens: u32,
    pub epoch: Epoch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<TxResolutionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextTokenResponse {
    pub global_address: Address,
    pub stream_tails: HashMap<StreamId, Address>,
    pub epoch: Epoch,
}

/// `POST /api/v1/tails`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailsRequest {
    /// Absent means "all streams currently known".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_ids: Option<Vec<StreamId>>,
    pub epoch: Epoch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailsResponse {
    pub log_tail: Address,
    pub stream_tails: HashMap<StreamId, Address>,
}

/// `POST /api/v1/trim`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimMarkRequest {
    pub mark: Address,
    pub epoch: Epoch,
}

/// `POST /api/v1/reset`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRequest {
    pub new_epoch: Epoch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resync: Option<TailResync>,
}

/// Acknowledgement body for trim and reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub epoch: Epoch,
}
