pub mod cdp;
pub mod memory;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

/// A locator expression plus the ordinal of the match to pick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub expression: String,
    pub position: usize,
}

impl Locator {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            position: 0,
        }
    }

    /// Select the `position`-th match (zero-based) instead of the first.
    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.expression, self.position)
    }
}

/// How faithfully a dispatched event imitates real user input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub enum EmulationLevel {
    /// Bare `Event` on the element.
    None,
    /// Typed event (mouse/keyboard/focus) carrying element-centre coordinates.
    Middle,
    /// Scroll into view, then the full mouse sequence around the event.
    Full,
    /// `Full` plus pointer events and focus handling.
    #[default]
    SuperEmulation,
}

impl EmulationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Middle => "Middle",
            Self::Full => "Full",
            Self::SuperEmulation => "SuperEmulation",
        }
    }
}

impl fmt::Display for EmulationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmulationLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "middle" => Ok(Self::Middle),
            "full" => Ok(Self::Full),
            "super" | "superemulation" => Ok(Self::SuperEmulation),
            _ => Err(EngineError::UnknownEmulation(s.to_string())),
        }
    }
}

/// Failures raised by the document engine itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("unknown emulation level '{0}', expected None, Middle, Full or SuperEmulation")]
    UnknownEmulation(String),
    #[error("CDP call failed: {0}")]
    Cdp(String),
    #[error("script failed: {0}")]
    Script(String),
    #[error("element is absent")]
    Absent,
}

impl EngineError {
    pub(crate) fn cdp(err: impl fmt::Display) -> Self {
        Self::Cdp(err.to_string())
    }

    pub(crate) fn script(err: impl fmt::Display) -> Self {
        Self::Script(err.to_string())
    }
}

/// A transient handle into the live tree. May be the "absent" sentinel.
pub trait Element: Send + Sync {
    fn is_absent(&self) -> bool;

    fn dispatch_event(
        &self,
        event: &str,
        emulation: EmulationLevel,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// `Ok(None)` when the attribute is not set.
    fn get_attribute(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, EngineError>> + Send;

    fn set_attribute(
        &self,
        name: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// The narrow query capability the wait-and-act core needs from a page.
///
/// `find_element` never fails because nothing matched; it hands back an
/// absent element instead. Errors are reserved for the engine breaking.
pub trait Document: Send + Sync {
    type Element: Element;

    fn find_element(
        &self,
        locator: &Locator,
    ) -> impl Future<Output = Result<Self::Element, EngineError>> + Send;
}
