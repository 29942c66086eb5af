//! In-process dispatch of site lifecycle events.
//!
//! Listeners register with a priority; lower priorities run first and equal
//! priorities keep registration order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::site::SiteId;

pub const DEFAULT_PRIORITY: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiteCreated {
    pub site_id: SiteId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListenerResult {
    pub listener: String,
    pub detail: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ListenerError {
    pub listener: String,
    pub message: String,
}

impl ListenerError {
    pub fn new(listener: &str, message: impl Into<String>) -> Self {
        Self {
            listener: listener.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.listener, self.message)
    }
}

impl std::error::Error for ListenerError {}

#[async_trait]
pub trait SiteListener: Send + Sync {
    fn name(&self) -> &str;
    async fn on_site_created(
        &self,
        event: &SiteCreated,
    ) -> Result<Option<serde_json::Value>, ListenerError>;
}

struct Registered {
    priority: i32,
    listener: Arc<dyn SiteListener>,
}

#[derive(Default)]
pub struct SiteEvents {
    listeners: Vec<Registered>,
}

impl SiteEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, priority: i32, listener: Arc<dyn SiteListener>) {
        let at = self
            .listeners
            .iter()
            .position(|r| r.priority > priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(at, Registered { priority, listener });
    }

    /// Listener names in dispatch order.
    pub fn listeners(&self) -> Vec<&str> {
        self.listeners.iter().map(|r| r.listener.name()).collect()
    }

    /// Runs every listener in turn. The first failure stops the dispatch.
    pub async fn dispatch_site_created(
        &self,
        event: &SiteCreated,
    ) -> Result<Vec<ListenerResult>, ListenerError> {
        let mut results = Vec::with_capacity(self.listeners.len());

        for registered in &self.listeners {
            let name = registered.listener.name();
            tracing::debug!(
                "Dispatching site {} created to {name} (priority {})",
                event.site_id,
                registered.priority
            );

            let detail = registered.listener.on_site_created(event).await?;
            results.push(ListenerResult {
                listener: name.to_string(),
                detail,
            });
        }

        Ok(results)
    }
}
