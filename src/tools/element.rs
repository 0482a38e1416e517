use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::engine::{Document, EmulationLevel, Locator};
use crate::interaction::{self, ActionRequest, WaitConfig};

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteEventParams {
    #[schemars(description = "XPath of the element to act on")]
    pub xpath: String,
    #[schemars(description = "Which match to use when the XPath finds several (0-based, default: 0)")]
    pub position: Option<usize>,
    #[schemars(description = "Event to raise: click, mousedown, focus, keydown, change, ...")]
    pub event: String,
    #[schemars(description = "Emulation level: None, Middle, Full or SuperEmulation (default)")]
    pub emulation_level: Option<String>,
    #[schemars(description = "Minimum random delay before acting, in milliseconds")]
    pub delay_min_ms: Option<i64>,
    #[schemars(description = "Maximum random delay before acting, in milliseconds")]
    pub delay_max_ms: Option<i64>,
    #[schemars(description = "Seconds to keep looking for the element (0 = check once)")]
    pub wait_seconds: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ReadAttributeParams {
    #[schemars(description = "XPath of the element to read from")]
    pub xpath: String,
    #[schemars(description = "Which match to use when the XPath finds several (0-based, default: 0)")]
    pub position: Option<usize>,
    #[schemars(description = "Attribute or property name, e.g. href, value, innerText")]
    pub attribute: String,
    #[schemars(description = "Minimum random delay before acting, in milliseconds")]
    pub delay_min_ms: Option<i64>,
    #[schemars(description = "Maximum random delay before acting, in milliseconds")]
    pub delay_max_ms: Option<i64>,
    #[schemars(description = "Seconds to keep looking for the element (0 = check once)")]
    pub wait_seconds: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WriteAttributeParams {
    #[schemars(description = "XPath of the element to write to")]
    pub xpath: String,
    #[schemars(description = "Which match to use when the XPath finds several (0-based, default: 0)")]
    pub position: Option<usize>,
    #[schemars(description = "Attribute or property name, e.g. value, checked, data-id")]
    pub attribute: String,
    #[schemars(description = "Value to set")]
    pub value: String,
    #[schemars(description = "Minimum random delay before acting, in milliseconds")]
    pub delay_min_ms: Option<i64>,
    #[schemars(description = "Maximum random delay before acting, in milliseconds")]
    pub delay_max_ms: Option<i64>,
    #[schemars(description = "Seconds to keep looking for the element (0 = check once)")]
    pub wait_seconds: Option<i64>,
}

/// Per-call overrides on top of the server-wide defaults.
fn wait_config(defaults: WaitConfig, min: Option<i64>, max: Option<i64>, secs: Option<i64>) -> WaitConfig {
    WaitConfig {
        pre_delay_min_ms: min.unwrap_or(defaults.pre_delay_min_ms),
        pre_delay_max_ms: max.unwrap_or(defaults.pre_delay_max_ms),
        poll_timeout_secs: secs.unwrap_or(defaults.poll_timeout_secs),
    }
}

fn locator(xpath: &str, position: Option<usize>) -> Locator {
    Locator::new(xpath).at(position.unwrap_or(0))
}

pub async fn execute_event<D: Document>(
    document: &D,
    defaults: WaitConfig,
    cancel: CancellationToken,
    params: &ExecuteEventParams,
) -> Result<bool> {
    let emulation = match params.emulation_level.as_deref() {
        Some(level) => level.parse::<EmulationLevel>()?,
        None => EmulationLevel::default(),
    };
    let wait = wait_config(defaults, params.delay_min_ms, params.delay_max_ms, params.wait_seconds);
    let action = ActionRequest::dispatch(params.event.as_str(), emulation);

    let result = interaction::execute_action_with_cancel(
        document,
        &locator(&params.xpath, params.position),
        &action,
        wait,
        cancel,
    )
    .await
    .with_context(|| format!("Failed to raise '{}' on {}", params.event, params.xpath))?;
    Ok(result.found)
}

pub async fn read_attribute<D: Document>(
    document: &D,
    defaults: WaitConfig,
    cancel: CancellationToken,
    params: &ReadAttributeParams,
) -> Result<Option<String>> {
    let wait = wait_config(defaults, params.delay_min_ms, params.delay_max_ms, params.wait_seconds);
    let action = ActionRequest::read(params.attribute.as_str());

    let result = interaction::execute_action_with_cancel(
        document,
        &locator(&params.xpath, params.position),
        &action,
        wait,
        cancel,
    )
    .await
    .with_context(|| format!("Failed to read '{}' from {}", params.attribute, params.xpath))?;
    Ok(result.value)
}

pub async fn write_attribute<D: Document>(
    document: &D,
    defaults: WaitConfig,
    cancel: CancellationToken,
    params: &WriteAttributeParams,
) -> Result<bool> {
    let wait = wait_config(defaults, params.delay_min_ms, params.delay_max_ms, params.wait_seconds);
    let action = ActionRequest::write(params.attribute.as_str(), params.value.as_str());

    let result = interaction::execute_action_with_cancel(
        document,
        &locator(&params.xpath, params.position),
        &action,
        wait,
        cancel,
    )
    .await
    .with_context(|| format!("Failed to write '{}' on {}", params.attribute, params.xpath))?;
    Ok(result.found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryDocument;

    #[test]
    fn test_wait_config_overrides_defaults_per_field() {
        let defaults = WaitConfig::new(100, 200, 5);
        assert_eq!(wait_config(defaults, None, None, None), defaults);
        assert_eq!(wait_config(defaults, Some(0), None, Some(1)), WaitConfig::new(0, 200, 1));
    }

    #[tokio::test]
    async fn test_execute_event_rejects_bad_emulation_level() {
        let doc = MemoryDocument::new();
        doc.insert("//button");
        let params = ExecuteEventParams {
            xpath: "//button".into(),
            position: None,
            event: "click".into(),
            emulation_level: Some("extreme".into()),
            delay_min_ms: None,
            delay_max_ms: None,
            wait_seconds: None,
        };
        let err = execute_event(&doc, WaitConfig::immediate(), CancellationToken::new(), &params)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown emulation level"));
        assert_eq!(doc.query_count(), 0);
    }

    #[tokio::test]
    async fn test_write_then_read_through_params() {
        let doc = MemoryDocument::new();
        doc.insert("//input");
        doc.insert("//input");

        let write = WriteAttributeParams {
            xpath: "//input".into(),
            position: Some(1),
            attribute: "value".into(),
            value: "second".into(),
            delay_min_ms: None,
            delay_max_ms: None,
            wait_seconds: None,
        };
        assert!(write_attribute(&doc, WaitConfig::immediate(), CancellationToken::new(), &write)
            .await
            .unwrap());

        let read = ReadAttributeParams {
            xpath: "//input".into(),
            position: Some(1),
            attribute: "value".into(),
            delay_min_ms: None,
            delay_max_ms: None,
            wait_seconds: None,
        };
        let value = read_attribute(&doc, WaitConfig::immediate(), CancellationToken::new(), &read)
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("second"));

        let first = ReadAttributeParams { position: None, ..read };
        let value = read_attribute(&doc, WaitConfig::immediate(), CancellationToken::new(), &first)
            .await
            .unwrap();
        assert_eq!(value, None);
    }
}
