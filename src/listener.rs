// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Return Listeners
//!
//! Listeners receiving the messages the broker returns to a publish channel.
//!
//! Two kinds exist:
//! - `LoggingReturnListener`: counts and logs the returned message. A single
//!   process-wide instance is the default for every publish without an explicit
//!   listener, so no returned message goes unnoticed.
//! - `DispatchingReturnListener`: turns the returned message back into a bus event
//!   and pushes it through a chain of processors. One is built per publish.
//!
//! Returns are observed out-of-band, on the task watching the publish confirmation.
//! Nothing raised while handling a returned message leaves the listener: failures
//! are logged and dropped so they can never disturb the channel.

use crate::{
    bus::{Endpoint, Event, FlowConstruct, MessageProcessor, Session},
    connector::AmqpConnector,
    errors::AmqpError,
    otel,
    returned::ReturnedMessage,
};
use futures_util::FutureExt;
use opentelemetry::{
    global,
    trace::{Span, Status},
};
use std::{
    any::Any,
    borrow::Cow,
    fmt,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
};
use tracing::{debug, error, warn};

/// Ordered processors receiving returned messages. Shared read-only between a
/// return handler and every listener it creates.
pub type ReturnProcessors = Arc<[Arc<dyn MessageProcessor>]>;

static DEFAULT_RETURN_LISTENER: OnceLock<Arc<LoggingReturnListener>> = OnceLock::new();

/// The process-wide logging listener used when a publish carries no listener.
pub fn default_return_listener() -> &'static Arc<LoggingReturnListener> {
    DEFAULT_RETURN_LISTENER.get_or_init(|| Arc::new(LoggingReturnListener::default()))
}

/// A listener for messages returned by the broker.
#[derive(Debug, Clone)]
pub enum ReturnListener {
    Logging(Arc<LoggingReturnListener>),
    Dispatching(Arc<DispatchingReturnListener>),
}

impl Default for ReturnListener {
    fn default() -> Self {
        ReturnListener::Logging(default_return_listener().clone())
    }
}

impl ReturnListener {
    /// Entry point for a message returned on the channel this listener is set on.
    pub async fn on_return(&self, returned: ReturnedMessage) {
        let error_message = returned.error_message();

        match self {
            ReturnListener::Logging(listener) => listener.on_return(&error_message, &returned),
            ReturnListener::Dispatching(listener) => {
                listener.on_return(&error_message, &returned).await
            }
        }
    }

    /// Binds the connector into a dispatching listener that has none yet.
    ///
    /// Clones of the same listener may race here from concurrent publishes: the
    /// first connector wins and the others are left untouched.
    ///
    /// # Parameters
    /// * `connector` - Connector of the publisher about to send on the channel
    pub fn ensure_connector(&self, connector: &Arc<AmqpConnector>) {
        if let ReturnListener::Dispatching(listener) = self {
            listener.connector.get_or_init(|| connector.clone());
        }
    }
}

/// Counts and logs returned messages.
#[derive(Debug, Default)]
pub struct LoggingReturnListener {
    hit_count: AtomicU64,
}

impl LoggingReturnListener {
    pub fn on_return(&self, error_message: &str, returned: &ReturnedMessage) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        warn!(
            reply_code = returned.reply_code(),
            "{}: {}", error_message, returned
        );
    }

    /// Number of returned messages seen so far.
    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }
}

/// Redispatches returned messages to a chain of processors.
///
/// The connector is either bound when the listener is built, or later through
/// `bind_connector`, which the publisher does before sending. A listener still
/// unbound when a message comes back reports a configuration error.
pub struct DispatchingReturnListener {
    endpoint: Option<Arc<Endpoint>>,
    flow_construct: Option<Arc<FlowConstruct>>,
    processors: ReturnProcessors,
    connector: OnceLock<Arc<AmqpConnector>>,
}

/// First phase of a `DispatchingReturnListener`.
pub struct DispatchingReturnListenerBuilder {
    endpoint: Option<Arc<Endpoint>>,
    flow_construct: Option<Arc<FlowConstruct>>,
    processors: ReturnProcessors,
}

impl DispatchingReturnListenerBuilder {
    /// Captures the endpoint and flow construct of the triggering event.
    pub fn event(mut self, event: &Event) -> Self {
        self.endpoint = event.endpoint().cloned();
        self.flow_construct = event.flow_construct().cloned();
        self
    }

    /// Finalizes the listener with its connector.
    pub fn connector(self, connector: Arc<AmqpConnector>) -> DispatchingReturnListener {
        let listener = self.build();
        let _ = listener.connector.set(connector);
        listener
    }

    /// Finalizes the listener without connector; it must be bound before use.
    pub fn build(self) -> DispatchingReturnListener {
        DispatchingReturnListener {
            endpoint: self.endpoint,
            flow_construct: self.flow_construct,
            processors: self.processors,
            connector: OnceLock::new(),
        }
    }
}

impl DispatchingReturnListener {
    /// Starts building a listener.
    ///
    /// # Parameters
    /// * `processors` - Processors receiving the returned messages, in order
    ///
    /// # Returns
    /// A builder to finalize with or without connector
    pub fn builder(processors: ReturnProcessors) -> DispatchingReturnListenerBuilder {
        DispatchingReturnListenerBuilder {
            endpoint: None,
            flow_construct: None,
            processors,
        }
    }

    /// Listener bound to the context of an outbound event, connector pending.
    pub fn for_event(processors: ReturnProcessors, event: &Event) -> Self {
        Self::builder(processors).event(event).build()
    }

    /// Listener bound to a connector only, for global contexts.
    pub fn for_connector(processors: ReturnProcessors, connector: Arc<AmqpConnector>) -> Self {
        Self::builder(processors).connector(connector)
    }

    /// Binds the connector of a listener built without one.
    ///
    /// # Parameters
    /// * `connector` - Connector providing the message factory and bus context
    ///
    /// # Returns
    /// Ok(()) on success or `ListenerAlreadyBound` when a connector is already set
    pub fn bind_connector(&self, connector: Arc<AmqpConnector>) -> Result<(), AmqpError> {
        self.connector
            .set(connector)
            .map_err(|_| AmqpError::ListenerAlreadyBound)
    }

    /// Whether a connector is bound; returns can only be dispatched once it is.
    pub fn is_bound(&self) -> bool {
        self.connector.get().is_some()
    }

    /// Connector bound to the listener, if any.
    pub fn connector(&self) -> Option<&Arc<AmqpConnector>> {
        self.connector.get()
    }

    /// Processors a returned message is dispatched through.
    pub fn processors(&self) -> &ReturnProcessors {
        &self.processors
    }

    pub fn endpoint(&self) -> Option<&Arc<Endpoint>> {
        self.endpoint.as_ref()
    }

    pub fn flow_construct(&self) -> Option<&Arc<FlowConstruct>> {
        self.flow_construct.as_ref()
    }

    pub async fn on_return(&self, error_message: &str, returned: &ReturnedMessage) {
        let tracer = global::tracer("amqp return listener");
        let (_ctx, mut span) = otel::new_return_span(returned.properties(), &tracer);

        let err = match AssertUnwindSafe(self.dispatch(returned))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {
                span.set_status(Status::Ok);
                return;
            }
            Ok(Err(err)) => err,
            Err(panic) => AmqpError::ProcessorError(panic_message(panic.as_ref())),
        };

        error!(
            error = err.to_string(),
            "{}, impossible to dispatch the following message to the configured processor(s): {}",
            error_message,
            returned
        );
        span.record_error(&err);
        span.set_status(Status::Error {
            description: Cow::from("failure to dispatch returned message"),
        });
    }

    async fn dispatch(&self, returned: &ReturnedMessage) -> Result<(), AmqpError> {
        let connector = self.connector.get().ok_or(AmqpError::UnboundListener)?;

        let message = connector
            .message_factory()
            .create(returned, &connector.context().default_encoding)?;

        for processor in self.processors.iter() {
            let endpoint = processor.endpoint().or_else(|| self.endpoint.clone());
            let session = Session::new(self.flow_construct.clone(), connector.context().clone());

            let mut event = Event::new(message.clone(), endpoint, session);
            event.apply_transformers(connector.receive_transformers())?;

            processor.process(event).await?;
        }

        debug!(
            processors = self.processors.len(),
            "returned message dispatched"
        );
        Ok(())
    }
}

impl fmt::Debug for DispatchingReturnListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchingReturnListener")
            .field("endpoint", &self.endpoint)
            .field("flow_construct", &self.flow_construct)
            .field("processors", &self.processors.len())
            .field("connector", &self.connector.get())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "processor panicked".to_owned()
    }
}
