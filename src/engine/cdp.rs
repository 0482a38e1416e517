use chromiumoxide::cdp::js_protocol::runtime::{
    CallFunctionOnParams, EvaluateParams, ExceptionDetails, RemoteObjectId,
};
use chromiumoxide::page::Page;
use serde::de::DeserializeOwned;

use super::{Document, Element, EmulationLevel, EngineError, Locator};

/// Properties read and written on the node object rather than as attributes.
const LIVE_PROPERTIES: &[&str] = &[
    "value",
    "checked",
    "selected",
    "innerText",
    "innerHTML",
    "textContent",
];

/// [`Document`] over a Chrome page. Locators are XPath expressions.
#[derive(Clone)]
pub struct CdpDocument {
    page: Page,
}

/// A node resolved on a Chrome page, held by its remote object id.
///
/// Actions run against the exact node found during resolution. If it was
/// removed from the document since then the script throws and the error
/// surfaces as [`EngineError::Script`].
#[derive(Clone)]
pub struct CdpElement {
    page: Page,
    node: Option<ResolvedNode>,
}

#[derive(Clone)]
struct ResolvedNode {
    object_id: RemoteObjectId,
    locator: Locator,
}

impl CdpDocument {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }
}

/// JS expression evaluating to the `position`-th node matched by `xpath`, or null.
pub fn locator_to_js(locator: &Locator) -> Result<String, EngineError> {
    let xpath = serde_json::to_string(&locator.expression).map_err(EngineError::script)?;
    Ok(format!(
        r#"document.evaluate({xpath}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotItem({position})"#,
        xpath = xpath,
        position = locator.position
    ))
}

fn exception_message(details: ExceptionDetails) -> EngineError {
    let message = details
        .exception
        .and_then(|e| e.description)
        .unwrap_or(details.text);
    EngineError::Script(message)
}

impl Document for CdpDocument {
    type Element = CdpElement;

    async fn find_element(&self, locator: &Locator) -> Result<CdpElement, EngineError> {
        let mut params = EvaluateParams::new(locator_to_js(locator)?);
        params.return_by_value = Some(false);

        let returns = self.page.execute(params).await.map_err(EngineError::cdp)?.result;
        if let Some(details) = returns.exception_details {
            return Err(exception_message(details));
        }

        // null comes back without an object id
        let node = returns.result.object_id.map(|object_id| ResolvedNode {
            object_id,
            locator: locator.clone(),
        });
        Ok(CdpElement {
            page: self.page.clone(),
            node,
        })
    }
}

impl CdpElement {
    /// Run `body` as a function with `el` bound to the resolved node.
    async fn call<T: DeserializeOwned>(&self, body: String) -> Result<T, EngineError> {
        let node = self.node.as_ref().ok_or(EngineError::Absent)?;
        let detached = serde_json::to_string(&format!("Element detached: {}", node.locator))
            .map_err(EngineError::script)?;
        let function = format!(
            "function() {{ const el = this; if (!el.isConnected) throw new Error({detached}); {body} }}",
            detached = detached,
            body = body
        );

        let params = CallFunctionOnParams::builder()
            .object_id(node.object_id.clone())
            .function_declaration(function)
            .return_by_value(true)
            .await_promise(false)
            .build()
            .map_err(EngineError::cdp)?;

        let returns = self.page.execute(params).await.map_err(EngineError::cdp)?.result;
        if let Some(details) = returns.exception_details {
            return Err(exception_message(details));
        }
        serde_json::from_value(returns.result.value.unwrap_or_default()).map_err(EngineError::script)
    }
}

impl Element for CdpElement {
    fn is_absent(&self) -> bool {
        self.node.is_none()
    }

    async fn dispatch_event(&self, event: &str, emulation: EmulationLevel) -> Result<(), EngineError> {
        let body = dispatch_js(event, emulation)?;
        tracing::debug!(
            "Dispatching '{}' ({}) on {:?}",
            event,
            emulation,
            self.node.as_ref().map(|n| n.locator.to_string())
        );
        let _: bool = self.call(body).await?;
        Ok(())
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>, EngineError> {
        let body = format!(
            r#"const name = {name};
            const v = {live}.includes(name) ? el[name] : el.getAttribute(name);
            return v === null || v === undefined ? null : String(v);"#,
            name = serde_json::to_string(name).map_err(EngineError::script)?,
            live = serde_json::to_string(LIVE_PROPERTIES).map_err(EngineError::script)?,
        );
        self.call(body).await
    }

    async fn set_attribute(&self, name: &str, value: &str) -> Result<(), EngineError> {
        let body = format!(
            r#"const name = {name};
            const value = {value};
            if ({live}.includes(name)) {{
                el[name] = (name === 'checked' || name === 'selected') ? value === 'true' : value;
            }} else {{
                el.setAttribute(name, value);
            }}
            return true;"#,
            name = serde_json::to_string(name).map_err(EngineError::script)?,
            value = serde_json::to_string(value).map_err(EngineError::script)?,
            live = serde_json::to_string(LIVE_PROPERTIES).map_err(EngineError::script)?,
        );
        let _: bool = self.call(body).await?;
        Ok(())
    }
}

/// Build the script that raises `event` on the node at the given fidelity.
///
/// `None` fires a plain `Event`. `Middle` picks the right event class and
/// fills in coordinates. `Full` scrolls the node into view and wraps clicks in
/// the hover/press/release sequence a real mouse produces. `SuperEmulation`
/// adds pointer events and moves focus like a user would.
fn dispatch_js(event: &str, emulation: EmulationLevel) -> Result<String, EngineError> {
    Ok(format!(
        r#"const name = {event};
            const level = {level};

            if (level === 'None') {{
                el.dispatchEvent(new Event(name, {{ bubbles: true, cancelable: true }}));
                return true;
            }}

            if (level === 'Full' || level === 'SuperEmulation') {{
                el.scrollIntoView({{ block: 'center', inline: 'center', behavior: 'instant' }});
            }}

            const rect = el.getBoundingClientRect();
            const x = rect.left + rect.width / 2;
            const y = rect.top + rect.height / 2;
            const mouse = {{ bubbles: true, cancelable: true, view: window, clientX: x, clientY: y, button: 0 }};
            const isMouse = /^(click|dblclick|contextmenu|mouse\w+)$/.test(name);
            const isKey = /^key\w+$/.test(name);
            const isFocus = /^(focus|blur|focusin|focusout)$/.test(name);

            const fire = (type) => {{
                if (/^(click|dblclick|contextmenu|mouse\w+)$/.test(type)) {{
                    return el.dispatchEvent(new MouseEvent(type, mouse));
                }}
                if (/^pointer\w+$/.test(type)) {{
                    return el.dispatchEvent(new PointerEvent(type, {{ ...mouse, pointerType: 'mouse', isPrimary: true }}));
                }}
                if (/^key\w+$/.test(type)) {{
                    return el.dispatchEvent(new KeyboardEvent(type, {{ bubbles: true, cancelable: true }}));
                }}
                if (/^(focus|blur|focusin|focusout)$/.test(type)) {{
                    return el.dispatchEvent(new FocusEvent(type, {{ bubbles: type.endsWith('in') || type.endsWith('out') }}));
                }}
                return el.dispatchEvent(new Event(type, {{ bubbles: true, cancelable: true }}));
            }};

            if (level === 'Middle' || !(isMouse || isKey || isFocus)) {{
                fire(name);
                return true;
            }}

            const superLevel = level === 'SuperEmulation';
            if (isMouse && (name === 'click' || name === 'dblclick' || name === 'contextmenu')) {{
                if (superLevel) fire('pointerover');
                fire('mouseover');
                fire('mousemove');
                if (superLevel) fire('pointerdown');
                fire('mousedown');
                if (superLevel && typeof el.focus === 'function') el.focus();
                if (superLevel) fire('pointerup');
                fire('mouseup');
                fire(name === 'dblclick' ? 'click' : name);
                if (name === 'dblclick') fire('dblclick');
                return true;
            }}
            if (isKey && superLevel && typeof el.focus === 'function') el.focus();
            if (isFocus && superLevel && typeof el[name] === 'function' && (name === 'focus' || name === 'blur')) {{
                el[name]();
                return true;
            }}
            fire(name);
            return true;"#,
        event = serde_json::to_string(event).map_err(EngineError::script)?,
        level = serde_json::to_string(emulation.as_str()).map_err(EngineError::script)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_to_js_escapes_quotes() {
        let js = locator_to_js(&Locator::new(r#"//*[@id="text"]"#).at(3)).unwrap();
        assert!(js.contains(r#""//*[@id=\"text\"]""#));
        assert!(js.ends_with(".snapshotItem(3)"));
    }

    #[test]
    fn test_dispatch_js_carries_level_and_event() {
        let js = dispatch_js("click", EmulationLevel::Middle).unwrap();
        assert!(js.contains(r#"const name = "click";"#));
        assert!(js.contains(r#"const level = "Middle";"#));
    }

    #[test]
    fn test_dispatch_js_escapes_event_name() {
        let js = dispatch_js("it's", EmulationLevel::None).unwrap();
        assert!(js.contains(r#"const name = "it's";"#));
    }
}
