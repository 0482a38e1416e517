//! Wait-and-act pipeline: jittered pre-delay, bounded polling, one action.
//!
//! The functions at this level are the cooperative (async) entry points.
//! [`blocking`] has the same set for callers that own a thread. Both funnel
//! into [`perform`] and differ only in the [`Pause`] they hand it.

pub mod action;
pub mod blocking;
pub mod jitter;
pub mod wait;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::engine::{Document, EmulationLevel, EngineError, Locator};

pub use action::{ActionRequest, ActionResult};
pub use jitter::Jitter;
pub use wait::{BlockingPause, Pause, Resolution, TokioPause, Waited};

/// Timing knobs for one call. Negative values are treated as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct WaitConfig {
    /// Lower bound of the random pre-action delay, in milliseconds
    pub pre_delay_min_ms: i64,
    /// Upper bound (exclusive) of the random pre-action delay, in milliseconds
    pub pre_delay_max_ms: i64,
    /// Whole seconds to keep polling for the element; 0 checks once
    pub poll_timeout_secs: i64,
}

impl WaitConfig {
    pub fn new(pre_delay_min_ms: i64, pre_delay_max_ms: i64, poll_timeout_secs: i64) -> Self {
        Self {
            pre_delay_min_ms,
            pre_delay_max_ms,
            poll_timeout_secs,
        }
    }

    /// No delay, a single lookup.
    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn clamped(self) -> Self {
        Self {
            pre_delay_min_ms: self.pre_delay_min_ms.max(0),
            pre_delay_max_ms: self.pre_delay_max_ms.max(0),
            poll_timeout_secs: self.poll_timeout_secs.max(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("invalid delay range: min {min}ms is greater than max {max}ms")]
    InvalidRange { min: u64, max: u64 },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// The single pipeline behind every entry point.
///
/// Delay, then poll, then act. A locator that never resolves, or a pause that
/// reports cancellation, ends the call with [`ActionResult::not_found`] and the
/// action is never attempted.
pub async fn perform<D, P>(
    document: &D,
    locator: &Locator,
    action: &ActionRequest,
    wait: WaitConfig,
    jitter: &Jitter,
    pause: &P,
) -> Result<ActionResult, ActionError>
where
    D: Document,
    P: Pause,
{
    let wait = wait.clamped();

    if jitter
        .delay(pause, wait.pre_delay_min_ms, wait.pre_delay_max_ms)
        .await?
        == Waited::Cancelled
    {
        tracing::info!("Cancelled during pre-action delay for {}", locator);
        return Ok(ActionResult::not_found());
    }

    let element = match wait::wait_for_element(document, locator, wait.poll_timeout_secs, pause).await? {
        Resolution::Found(element) => element,
        Resolution::Exhausted => {
            tracing::info!(
                "Element not found: {} (waited {}s)",
                locator,
                wait.poll_timeout_secs
            );
            return Ok(ActionResult::not_found());
        }
        Resolution::Cancelled => {
            tracing::info!("Cancelled while waiting for {}", locator);
            return Ok(ActionResult::not_found());
        }
    };

    let result = action::execute(&element, action).await?;
    tracing::debug!("Action on {} done: {:?}", locator, result);
    Ok(result)
}

pub async fn execute_action<D: Document>(
    document: &D,
    locator: &Locator,
    action: &ActionRequest,
    wait: WaitConfig,
) -> Result<ActionResult, ActionError> {
    perform(document, locator, action, wait, Jitter::global(), &TokioPause::new()).await
}

/// Like [`execute_action`], but gives up at the next wait once `cancel` fires.
pub async fn execute_action_with_cancel<D: Document>(
    document: &D,
    locator: &Locator,
    action: &ActionRequest,
    wait: WaitConfig,
    cancel: CancellationToken,
) -> Result<ActionResult, ActionError> {
    let pause = TokioPause::with_cancel(cancel);
    perform(document, locator, action, wait, Jitter::global(), &pause).await
}

/// Raise `event` on the element. `Ok(false)` means it never showed up.
pub async fn execute_event<D: Document>(
    document: &D,
    locator: &Locator,
    event: &str,
    emulation: EmulationLevel,
    wait: WaitConfig,
) -> Result<bool, ActionError> {
    let action = ActionRequest::dispatch(event, emulation);
    Ok(execute_action(document, locator, &action, wait).await?.found)
}

/// `Ok(None)` covers both a missing element and a missing attribute.
pub async fn read_attribute<D: Document>(
    document: &D,
    locator: &Locator,
    name: &str,
    wait: WaitConfig,
) -> Result<Option<String>, ActionError> {
    let action = ActionRequest::read(name);
    Ok(execute_action(document, locator, &action, wait).await?.value)
}

pub async fn write_attribute<D: Document>(
    document: &D,
    locator: &Locator,
    name: &str,
    value: &str,
    wait: WaitConfig,
) -> Result<bool, ActionError> {
    let action = ActionRequest::write(name, value);
    Ok(execute_action(document, locator, &action, wait).await?.found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryDocument;

    #[test]
    fn test_clamped_zeroes_negatives() {
        let wait = WaitConfig::new(-1, -20, -3).clamped();
        assert_eq!(wait, WaitConfig::immediate());
        assert_eq!(WaitConfig::new(5, 10, 2).clamped(), WaitConfig::new(5, 10, 2));
    }

    #[test]
    fn test_wait_config_fields_default_when_missing() {
        let wait: WaitConfig = serde_json::from_str(r#"{"poll_timeout_secs": 4}"#).unwrap();
        assert_eq!(wait, WaitConfig::new(0, 0, 4));
    }

    #[tokio::test]
    async fn test_invalid_range_fails_before_any_lookup() {
        let doc = MemoryDocument::new();
        doc.insert("//a");
        let err = execute_event(&doc, &Locator::new("//a"), "click", EmulationLevel::None, WaitConfig::new(50, 10, 0))
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::InvalidRange { min: 50, max: 10 });
        assert_eq!(doc.query_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_element_skips_action() {
        let doc = MemoryDocument::new();
        let id = doc.insert("//b");
        let found = execute_event(&doc, &Locator::new("//a"), "click", EmulationLevel::None, WaitConfig::immediate())
            .await
            .unwrap();
        assert!(!found);
        assert!(doc.events(id).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_pre_delay_returns_not_found() {
        let doc = MemoryDocument::new();
        let id = doc.insert("//a");
        let token = CancellationToken::new();
        token.cancel();
        let result = execute_action_with_cancel(
            &doc,
            &Locator::new("//a"),
            &ActionRequest::dispatch("click", EmulationLevel::Full),
            WaitConfig::immediate(),
            token,
        )
        .await
        .unwrap();
        assert_eq!(result, ActionResult::not_found());
        assert_eq!(doc.query_count(), 0);
        assert!(doc.events(id).is_empty());
    }
}
