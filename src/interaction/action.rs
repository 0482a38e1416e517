use serde::{Deserialize, Serialize};

use crate::engine::{Element, EmulationLevel, EngineError};

/// What to do with an element once it has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    DispatchEvent {
        event: String,
        #[serde(default)]
        emulation: EmulationLevel,
    },
    ReadAttribute {
        name: String,
    },
    WriteAttribute {
        name: String,
        value: String,
    },
}

impl ActionRequest {
    pub fn dispatch(event: impl Into<String>, emulation: EmulationLevel) -> Self {
        Self::DispatchEvent {
            event: event.into(),
            emulation,
        }
    }

    pub fn read(name: impl Into<String>) -> Self {
        Self::ReadAttribute { name: name.into() }
    }

    pub fn write(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::WriteAttribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub found: bool,
    /// Only set by [`ActionRequest::ReadAttribute`].
    pub value: Option<String>,
}

impl ActionResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn done() -> Self {
        Self {
            found: true,
            value: None,
        }
    }

    pub fn with_value(value: Option<String>) -> Self {
        Self { found: true, value }
    }
}

/// Run `action` against an already resolved element. Engine errors pass through untouched.
pub async fn execute<E: Element>(element: &E, action: &ActionRequest) -> Result<ActionResult, EngineError> {
    match action {
        ActionRequest::DispatchEvent { event, emulation } => {
            element.dispatch_event(event, *emulation).await?;
            Ok(ActionResult::done())
        }
        ActionRequest::ReadAttribute { name } => {
            let value = element.get_attribute(name).await?;
            Ok(ActionResult::with_value(value))
        }
        ActionRequest::WriteAttribute { name, value } => {
            element.set_attribute(name, value).await?;
            Ok(ActionResult::done())
        }
    }
}
