//! Thread-blocking twins of the cooperative entry points.
//!
//! Waits park the calling thread. Do not call these from inside an async
//! runtime worker; wrap them in `tokio::task::spawn_blocking` instead, since a
//! CDP-backed document needs the runtime free to deliver responses.

use futures::executor::block_on;

use super::{perform, ActionError, ActionRequest, ActionResult, BlockingPause, Jitter, WaitConfig};
use crate::engine::{Document, EmulationLevel, Locator};

pub fn execute_action<D: Document>(
    document: &D,
    locator: &Locator,
    action: &ActionRequest,
    wait: WaitConfig,
) -> Result<ActionResult, ActionError> {
    block_on(perform(document, locator, action, wait, Jitter::global(), &BlockingPause))
}

pub fn execute_event<D: Document>(
    document: &D,
    locator: &Locator,
    event: &str,
    emulation: EmulationLevel,
    wait: WaitConfig,
) -> Result<bool, ActionError> {
    let action = ActionRequest::dispatch(event, emulation);
    Ok(execute_action(document, locator, &action, wait)?.found)
}

pub fn read_attribute<D: Document>(
    document: &D,
    locator: &Locator,
    name: &str,
    wait: WaitConfig,
) -> Result<Option<String>, ActionError> {
    let action = ActionRequest::read(name);
    Ok(execute_action(document, locator, &action, wait)?.value)
}

pub fn write_attribute<D: Document>(
    document: &D,
    locator: &Locator,
    name: &str,
    value: &str,
    wait: WaitConfig,
) -> Result<bool, ActionError> {
    let action = ActionRequest::write(name, value);
    Ok(execute_action(document, locator, &action, wait)?.found)
}
