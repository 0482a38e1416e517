use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::{Document, Element, EngineError, Locator};

/// Gap between two lookups of the same locator.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// How a suspension point ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waited {
    Elapsed,
    Cancelled,
}

/// The suspension capability the pipeline is generic over.
///
/// Every wait in the pipeline (the jitter pre-delay and each poll gap) goes
/// through here, so swapping the implementation is all it takes to switch
/// between blocking and cooperative execution.
pub trait Pause: Sync {
    fn pause(&self, duration: Duration) -> impl Future<Output = Waited> + Send;
}

/// Parks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingPause;

impl Pause for BlockingPause {
    async fn pause(&self, duration: Duration) -> Waited {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
        Waited::Elapsed
    }
}

/// Suspends the task on the tokio timer, optionally racing a cancellation token.
#[derive(Debug, Clone, Default)]
pub struct TokioPause {
    cancel: Option<CancellationToken>,
}

impl TokioPause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }
}

impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) -> Waited {
        match &self.cancel {
            None => {
                tokio::time::sleep(duration).await;
                Waited::Elapsed
            }
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Waited::Cancelled,
                _ = tokio::time::sleep(duration) => Waited::Elapsed,
            },
        }
    }
}

/// Outcome of polling for a locator.
#[derive(Debug)]
pub enum Resolution<E> {
    Found(E),
    /// Every attempt came back absent.
    Exhausted,
    /// A poll gap was interrupted before the element showed up.
    Cancelled,
}

impl<E> Resolution<E> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Poll `locator` until it resolves or the budget of whole seconds runs out.
///
/// Makes `timeout_secs + 1` lookups: one immediately, then one after each
/// [`POLL_INTERVAL`]. A budget of zero (or less) therefore checks exactly once
/// and never pauses. No pause follows the last lookup.
pub async fn wait_for_element<D, P>(
    document: &D,
    locator: &Locator,
    timeout_secs: i64,
    pause: &P,
) -> Result<Resolution<D::Element>, EngineError>
where
    D: Document,
    P: Pause,
{
    let attempts = timeout_secs.max(0) as u64 + 1;

    for attempt in 1..=attempts {
        let element = document.find_element(locator).await?;
        if !element.is_absent() {
            tracing::debug!("Resolved {} on attempt {}/{}", locator, attempt, attempts);
            return Ok(Resolution::Found(element));
        }
        if attempt == attempts {
            break;
        }
        tracing::debug!("{} absent on attempt {}/{}, retrying", locator, attempt, attempts);
        if pause.pause(POLL_INTERVAL).await == Waited::Cancelled {
            return Ok(Resolution::Cancelled);
        }
    }

    Ok(Resolution::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryDocument;
    use futures::executor::block_on;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Duration>>);

    impl Pause for Recorder {
        async fn pause(&self, duration: Duration) -> Waited {
            self.0.lock().unwrap().push(duration);
            Waited::Elapsed
        }
    }

    #[test]
    fn test_zero_budget_checks_once_without_pausing() {
        let doc = MemoryDocument::new();
        let rec = Recorder::default();
        let res = block_on(wait_for_element(&doc, &Locator::new("//a"), 0, &rec)).unwrap();
        assert!(matches!(res, Resolution::Exhausted));
        assert_eq!(doc.query_count(), 1);
        assert!(rec.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_negative_budget_behaves_like_zero() {
        let doc = MemoryDocument::new();
        let rec = Recorder::default();
        let res = block_on(wait_for_element(&doc, &Locator::new("//a"), -5, &rec)).unwrap();
        assert!(!res.is_found());
        assert_eq!(doc.query_count(), 1);
        assert!(rec.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_found_immediately_returns_without_pause() {
        let doc = MemoryDocument::new();
        doc.insert("//a");
        let rec = Recorder::default();
        let res = block_on(wait_for_element(&doc, &Locator::new("//a"), 10, &rec)).unwrap();
        assert!(res.is_found());
        assert_eq!(doc.query_count(), 1);
        assert!(rec.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_late_element_uses_one_second_gaps() {
        let doc = MemoryDocument::new();
        doc.insert_after("//a", 2);
        let rec = Recorder::default();
        let res = block_on(wait_for_element(&doc, &Locator::new("//a"), 5, &rec)).unwrap();
        assert!(res.is_found());
        assert_eq!(doc.query_count(), 3);
        assert_eq!(*rec.0.lock().unwrap(), vec![POLL_INTERVAL; 2]);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_polling() {
        let doc = MemoryDocument::new();
        let token = CancellationToken::new();
        token.cancel();
        let pause = TokioPause::with_cancel(token);
        let res = wait_for_element(&doc, &Locator::new("//a"), 30, &pause)
            .await
            .unwrap();
        assert!(matches!(res, Resolution::Cancelled));
        assert_eq!(doc.query_count(), 1);
    }
}
