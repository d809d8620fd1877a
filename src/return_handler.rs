// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Return Handler
//!
//! Intercepting processor placed right before the publish step of an outbound flow.
//! For every event it builds a `DispatchingReturnListener` bound to the event and
//! hands it to the publisher through the `PublishOptions` of that publish, then
//! forwards the event unchanged.

use crate::{
    bus::{Event, MessageProcessor},
    errors::AmqpError,
    listener::{DispatchingReturnListener, ReturnListener, ReturnProcessors},
};
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Options of a single publish, passed along the outbound chain.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Listener for a message the broker returns; the process-wide logging
    /// listener is used when absent.
    pub return_listener: Option<ReturnListener>,
    /// Overrides the mandatory flag of the endpoint.
    pub mandatory: Option<bool>,
}

impl PublishOptions {
    pub fn with_return_listener(mut self, listener: ReturnListener) -> Self {
        self.return_listener = Some(listener);
        self
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = Some(mandatory);
        self
    }
}

/// A step of the outbound chain, ending with the publish itself.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OutboundProcessor: Send + Sync {
    async fn process(&self, event: Event, options: PublishOptions) -> Result<Event, AmqpError>;
}

/// Attaches a fresh dispatching return listener to every outbound event.
pub struct ReturnHandler {
    processors: OnceLock<ReturnProcessors>,
    next: Arc<dyn OutboundProcessor>,
}

impl ReturnHandler {
    /// Creates a return handler.
    ///
    /// # Parameters
    /// * `next` - Next outbound step, usually the publisher
    pub fn new(next: Arc<dyn OutboundProcessor>) -> Self {
        ReturnHandler {
            processors: OnceLock::new(),
            next,
        }
    }

    /// Sets the processors receiving returned messages. Allowed once, before the
    /// first event goes through; a handler used unconfigured keeps an empty chain.
    pub fn set_message_processors(
        &self,
        processors: Vec<Arc<dyn MessageProcessor>>,
    ) -> Result<(), AmqpError> {
        self.processors
            .set(Arc::from(processors))
            .map_err(|_| AmqpError::ProcessorsAlreadyConfigured)
    }

    /// Processors handed to every listener this handler creates.
    ///
    /// # Returns
    /// The configured processors; first use freezes an empty chain when none is set
    pub fn processors(&self) -> &ReturnProcessors {
        self.processors.get_or_init(|| Arc::from(Vec::new()))
    }
}

#[async_trait]
impl OutboundProcessor for ReturnHandler {
    async fn process(&self, event: Event, options: PublishOptions) -> Result<Event, AmqpError> {
        let listener = DispatchingReturnListener::for_event(self.processors().clone(), &event);
        debug!(event = %event.id(), "return listener attached");

        self.next
            .process(
                event,
                options.with_return_listener(ReturnListener::Dispatching(Arc::new(listener))),
            )
            .await
    }
}

#[async_trait]
impl MessageProcessor for ReturnHandler {
    async fn process(&self, event: Event) -> Result<Event, AmqpError> {
        OutboundProcessor::process(self, event, PublishOptions::default()).await
    }
}
