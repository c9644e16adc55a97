//! JSON facade: the request/response contract clients speak.
//!
//! Request:  `{ "blockId", "values": { name: number | string }, "scope" | "spCode" }`
//! Response: `{ "ok": true, "result": { "result", "steps" } }`
//!        or `{ "ok": false, "error": code, "messages": [..] }`
use crate::computation::{ComputeError, ComputeRequest, ComputeResult, ComputeService};
use crate::display::trace::round_result;
use serde::{Deserialize, Serialize};

pub const INVALID_JSON: &str = "invalid_json";
pub const BLOCK_ID_REQUIRED: &str = "block_id_required";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ComputeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl ComputeResponse {
    pub fn success(result: ComputeResult) -> Self {
        Self { ok: true, result: Some(result), error: None, messages: Vec::new() }
    }

    pub fn failure(code: &str, messages: Vec<String>) -> Self {
        Self { ok: false, result: None, error: Some(code.to_string()), messages }
    }

    /// Rounds a successful result for presentation; errors map to their wire code.
    pub fn from_outcome(outcome: Result<ComputeResult, ComputeError>, digits: u32) -> Self {
        match outcome {
            Ok(result) => Self::success(round_result(&result, digits)),
            Err(e) => Self::failure(e.code(), e.messages()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn parse_request(body: &str) -> Result<ComputeRequest, ComputeResponse> {
    let request: ComputeRequest =
        serde_json::from_str(body).map_err(|e| ComputeResponse::failure(INVALID_JSON, vec![e.to_string()]))?;
    if request.block_id.trim().is_empty() {
        return Err(ComputeResponse::failure(BLOCK_ID_REQUIRED, Vec::new()));
    }
    Ok(request)
}

/// Handles one JSON request body end to end.
pub async fn handle_compute_json(service: &ComputeService, body: &str, digits: u32) -> ComputeResponse {
    let request = match parse_request(body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    ComputeResponse::from_outcome(service.compute(&request).await, digits)
}

/// Handles a JSON array of requests. A malformed array fails as a whole;
/// a request with an empty block id fails on its own.
pub async fn handle_batch_json(service: &ComputeService, body: &str, digits: u32) -> Vec<ComputeResponse> {
    let requests: Vec<ComputeRequest> = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return vec![ComputeResponse::failure(INVALID_JSON, vec![e.to_string()])],
    };

    let runnable: Vec<ComputeRequest> =
        requests.iter().filter(|r| !r.block_id.trim().is_empty()).cloned().collect();
    let mut outcomes = service.compute_batch(&runnable).await.into_iter();

    requests
        .iter()
        .map(|r| {
            if r.block_id.trim().is_empty() {
                return ComputeResponse::failure(BLOCK_ID_REQUIRED, Vec::new());
            }
            match outcomes.next() {
                Some(outcome) => ComputeResponse::from_outcome(outcome, digits),
                None => ComputeResponse::failure(BLOCK_ID_REQUIRED, Vec::new()),
            }
        })
        .collect()
}
