//! Wait-and-act helpers for elements on a page that renders late.
//!
//! A call optionally sleeps a random pre-delay, polls for its element once per
//! second within a budget, then dispatches an event or reads/writes an
//! attribute. The same pipeline is offered cooperatively
//! ([`interaction::execute_action`]) and blocking
//! ([`interaction::blocking::execute_action`]).

pub mod browser;
pub mod engine;
pub mod helpers;
pub mod interaction;
pub mod server;
pub mod tools;

pub use engine::{Document, Element, EmulationLevel, EngineError, Locator};
pub use interaction::{ActionError, ActionRequest, ActionResult, WaitConfig};
