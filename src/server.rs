use rmcp::model::*;
use rmcp::tool;
use rmcp::{Error as McpError, ServerHandler};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::browser::BrowserSession;
use crate::engine::cdp::CdpDocument;
use crate::interaction::WaitConfig;
use crate::tools::{element, navigation};

/// The MCP server that routes tool calls to the wait-and-act pipeline.
#[derive(Clone)]
pub struct TabActionsServer {
    session: Arc<Mutex<Option<BrowserSession>>>,
    defaults: WaitConfig,
    cancel: CancellationToken,
    headless: bool,
}

impl TabActionsServer {
    pub fn new(headless: bool, defaults: WaitConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(None)),
            defaults,
            cancel: CancellationToken::new(),
            headless,
        }
    }

    /// Launch Chrome on first use and hand back the active page as a document.
    async fn document(&self) -> Result<CdpDocument, McpError> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            tracing::info!("Launching browser (headless: {})", self.headless);
            let s = BrowserSession::launch(self.headless).await.map_err(|e| {
                McpError::internal_error(format!("Failed to launch browser: {}", e), None)
            })?;
            *session = Some(s);
        }
        session
            .as_ref()
            .map(BrowserSession::document)
            .ok_or_else(|| McpError::internal_error("Browser session unavailable", None))
    }

    async fn with_document<F, Fut, T>(&self, f: F) -> Result<T, McpError>
    where
        F: FnOnce(CdpDocument) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        // Session lock is released here so long waits don't block other tools
        let document = self.document().await?;
        f(document)
            .await
            .map_err(|e| McpError::internal_error(format!("{:#}", e), None))
    }

    /// Abort in-flight waits and close Chrome.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(session) = self.session.lock().await.take() {
            if let Err(e) = session.close().await {
                tracing::warn!("Error while closing browser: {:#}", e);
            }
        }
    }

    fn text_result(msg: impl Into<String>) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(msg)]))
    }
}

#[tool(tool_box)]
impl ServerHandler for TabActionsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "tab-actions: wait for page elements and act on them. \
                 Open a URL with `navigate`, then raise events or read/write attributes by XPath. \
                 Each element tool waits up to `wait_seconds` for its element."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tool(tool_box)]
impl TabActionsServer {
    #[tool(description = "Navigate to a URL. Returns the page URL and title.")]
    async fn navigate(
        &self,
        #[tool(aggr)] params: navigation::NavigateParams,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .with_document(|doc| async move { navigation::navigate(doc.page(), &params).await })
            .await?;
        Self::text_result(format!("Navigated to {} ({})", result.title, result.url))
    }

    #[tool(description = "Wait for an element by XPath, then raise an event (click, focus, keydown, ...) on it.")]
    async fn execute_event(
        &self,
        #[tool(aggr)] params: element::ExecuteEventParams,
    ) -> Result<CallToolResult, McpError> {
        let (defaults, cancel) = (self.defaults, self.cancel.child_token());
        let event = params.event.clone();
        let found = self
            .with_document(|doc| async move {
                element::execute_event(&doc, defaults, cancel, &params).await
            })
            .await?;
        if found {
            Self::text_result(format!("Raised '{}'", event))
        } else {
            Self::text_result("Element not found (timeout)")
        }
    }

    #[tool(description = "Wait for an element by XPath, then read an attribute or property (value, href, innerText, ...).")]
    async fn read_attribute(
        &self,
        #[tool(aggr)] params: element::ReadAttributeParams,
    ) -> Result<CallToolResult, McpError> {
        let (defaults, cancel) = (self.defaults, self.cancel.child_token());
        let value = self
            .with_document(|doc| async move {
                element::read_attribute(&doc, defaults, cancel, &params).await
            })
            .await?;
        match value {
            Some(value) => Self::text_result(value),
            None => Self::text_result("No value (element or attribute not found)"),
        }
    }

    #[tool(description = "Wait for an element by XPath, then set an attribute or property.")]
    async fn write_attribute(
        &self,
        #[tool(aggr)] params: element::WriteAttributeParams,
    ) -> Result<CallToolResult, McpError> {
        let (defaults, cancel) = (self.defaults, self.cancel.child_token());
        let attribute = params.attribute.clone();
        let written = self
            .with_document(|doc| async move {
                element::write_attribute(&doc, defaults, cancel, &params).await
            })
            .await?;
        if written {
            Self::text_result(format!("Set '{}'", attribute))
        } else {
            Self::text_result("Element not found (timeout)")
        }
    }
}
