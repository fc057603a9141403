use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ai::ChatProvider;
use crate::models::TipsResult;

pub const NO_TIPS: &str = "No tips available";
pub const FAILED_TIPS: &str = "Failed to load tips";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 200;

/// The part of a record the gateway needs. Also the proxy request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipsRequest {
    pub role: String,
    pub company: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("tips request failed: {0}")]
    Failed(String),

    #[error("tips response had no content")]
    NoTips,
}

impl GatewayError {
    /// The only thing a caller should show for a failure.
    pub fn fallback_text(&self) -> &'static str {
        match self {
            GatewayError::Failed(_) => FAILED_TIPS,
            GatewayError::NoTips => NO_TIPS,
        }
    }
}

pub fn tips_prompt(role: &str, company: &str) -> String {
    format!(
        "Give 3 brief tips for applying to {} position at {}. \
         Keep each tip under 10 words. Format as bullet points.",
        role, company
    )
}

pub async fn request_tips(
    provider: &dyn ChatProvider,
    request: &TipsRequest,
) -> Result<String, GatewayError> {
    let prompt = tips_prompt(&request.role, &request.company);
    debug!(model = provider.model_name(), role = %request.role, company = %request.company, "requesting tips");

    match provider.complete(&prompt, TEMPERATURE, MAX_TOKENS).await {
        Ok(Some(text)) if !text.trim().is_empty() => Ok(text),
        Ok(_) => Err(GatewayError::NoTips),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "tips provider call failed");
            Err(GatewayError::Failed(e.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    tips: Option<String>,
}

/// Client side of the proxy endpoint, used by the terminal front-ends.
/// Runs on a plain thread; never call it from inside the tokio runtime.
pub fn fetch_from_proxy(
    proxy_url: &str,
    request: &TipsRequest,
    timeout: std::time::Duration,
) -> Result<String, GatewayError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Failed(e.to_string()))?;

    let response = client
        .post(proxy_url)
        .json(request)
        .send()
        .map_err(|e| GatewayError::Failed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(GatewayError::Failed(format!(
            "proxy returned status {}",
            response.status()
        )));
    }

    let body: ProxyResponse = response
        .json()
        .map_err(|e| GatewayError::Failed(e.to_string()))?;

    match body.tips {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(GatewayError::NoTips),
    }
}

/// Text to display for a gateway outcome.
pub fn display_text(result: Result<String, GatewayError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => e.fallback_text().to_string(),
    }
}

// --- Current-selection slot ---

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TipsState {
    #[default]
    Idle,
    Loading(String),
    Ready(String, String),
    Failed(String, String),
}

/// Holds the tips for the most recently requested record. Every `begin`
/// hands out a new ticket; a result is applied only if it carries the
/// latest one, so asking for the same record twice still drops the first.
#[derive(Debug, Default)]
pub struct TipsSlot {
    state: TipsState,
    seq: u64,
}

impl TipsSlot {
    #[cfg(test)]
    pub fn state(&self) -> &TipsState {
        &self.state
    }

    pub fn begin(&mut self, record_id: &str) -> u64 {
        self.seq += 1;
        self.state = TipsState::Loading(record_id.to_string());
        self.seq
    }

    /// Applies a finished request. Returns false if it was superseded.
    pub fn complete(&mut self, ticket: u64, result: Result<String, GatewayError>) -> bool {
        let TipsState::Loading(record_id) = &self.state else {
            debug!(ticket, "dropping tips result with nothing loading");
            return false;
        };
        if ticket != self.seq {
            debug!(ticket, latest = self.seq, "dropping stale tips result");
            return false;
        }

        let record_id = record_id.clone();
        self.state = match result {
            Ok(text) => TipsState::Ready(record_id, text),
            Err(e) => TipsState::Failed(record_id, e.fallback_text().to_string()),
        };
        true
    }

    pub fn result(&self) -> Option<TipsResult> {
        let (id, text, loading) = match &self.state {
            TipsState::Idle => return None,
            TipsState::Loading(id) => (id, "", true),
            TipsState::Ready(id, text) | TipsState::Failed(id, text) => (id, text.as_str(), false),
        };
        Some(TipsResult {
            for_record_id: id.clone(),
            text: text.to_string(),
            loading,
        })
    }
}
