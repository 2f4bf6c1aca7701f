//! In-process event bus
//!
//! Two call shapes are supported:
//!
//! - **Returnable**: one handler per event name answers each call. The caller
//!   suspends until the handler responds or the bus reports a failure.
//! - **Broadcast**: fire-and-forget notifications delivered to every listener.
//!
//! Payloads cross the bus as JSON so handlers never share memory with their
//! callers. Each returnable call runs on its own task and answers through a
//! oneshot channel, which is the same shape a networked transport would have.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{BusError, Result};

/// Handler answering a returnable event
#[async_trait]
pub trait ReturnableHandler: Send + Sync {
    async fn handle(&self, args: Value) -> Result<Value>;
}

#[async_trait]
impl<F, Fut> ReturnableHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn handle(&self, args: Value) -> Result<Value> {
        (self)(args).await
    }
}

/// Listener for a broadcast event
#[async_trait]
pub trait BroadcastHandler: Send + Sync {
    async fn notify(&self, args: Value);
}

#[async_trait]
impl<F, Fut> BroadcastHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn notify(&self, args: Value) {
        (self)(args).await
    }
}

#[derive(Default)]
struct BusInner {
    returnable: RwLock<HashMap<String, Arc<dyn ReturnableHandler>>>,
    broadcast: RwLock<HashMap<String, Vec<Arc<dyn BroadcastHandler>>>>,
}

/// Cheaply cloneable handle to a shared bus
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single handler for a returnable event
    ///
    /// A second registration for the same name is rejected and the existing
    /// handler stays in place.
    pub fn on_returnable_event<H>(&self, event: impl Into<String>, handler: H) -> Result<()>
    where
        H: ReturnableHandler + 'static,
    {
        let event = event.into();
        let mut handlers = self
            .inner
            .returnable
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if handlers.contains_key(&event) {
            warn!("Returnable event [{}] already has a handler", event);
            return Err(BusError::HandlerExists { event }.into());
        }
        debug!("Registered returnable event [{}]", event);
        handlers.insert(event, Arc::new(handler));
        Ok(())
    }

    /// Whether a returnable event currently has a handler
    pub fn has_returnable_handler(&self, event: &str) -> bool {
        self.inner
            .returnable
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(event)
    }

    /// Issue a returnable call and wait for its single response
    pub async fn emit_returnable_event(&self, event: &str, args: Value) -> Result<Value> {
        let handler = self
            .inner
            .returnable
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(event)
            .cloned()
            .ok_or_else(|| BusError::NoResponder {
                event: event.to_string(),
            })?;

        debug!("Emitting returnable event [{}]", event);
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let response = handler.handle(args).await;
            // The caller may have gone away; nothing left to deliver to.
            let _ = tx.send(response);
        });

        rx.await.map_err(|_| BusError::Dropped {
            event: event.to_string(),
        })?
    }

    /// Typed returnable call: serializes the request and decodes the response
    pub async fn call<Req, Resp>(&self, event: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let args = serde_json::to_value(request)?;
        let response = self.emit_returnable_event(event, args).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Add a listener for a broadcast event
    pub fn on_broadcast<H>(&self, event: impl Into<String>, handler: H)
    where
        H: BroadcastHandler + 'static,
    {
        let event = event.into();
        debug!("Registered broadcast listener for [{}]", event);
        self.inner
            .broadcast
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Notify every listener of a broadcast event without waiting
    ///
    /// Returns the number of listeners the notification was handed to.
    pub fn emit_broadcast(&self, event: &str, args: Value) -> usize {
        let listeners = self
            .inner
            .broadcast
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(event)
            .cloned()
            .unwrap_or_default();

        debug!("Broadcasting [{}] to {} listener(s)", event, listeners.len());
        for listener in &listeners {
            let listener = Arc::clone(listener);
            let args = args.clone();
            tokio::spawn(async move { listener.notify(args).await });
        }
        listeners.len()
    }
}
