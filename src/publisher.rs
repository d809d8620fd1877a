// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Publisher
//!
//! Terminal step of an outbound flow: publishes the event's message to the exchange
//! of its endpoint. The return listener of the publish is bound to the connector
//! before sending, then a task awaits the publisher confirmation and hands any
//! message the broker returned to that listener, out-of-band from the caller.

use crate::{
    bus::{BusMessage, Event},
    connector::AmqpConnector,
    errors::AmqpError,
    headers,
    listener::ReturnListener,
    otel,
    return_handler::{OutboundProcessor, PublishOptions},
    returned::ReturnedMessage,
};
use async_trait::async_trait;
use lapin::{
    options::BasicPublishOptions,
    publisher_confirm::{Confirmation, PublisherConfirm},
    types::{AMQPValue, FieldTable, ShortString},
    BasicProperties, Channel,
};
use opentelemetry::Context;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Default content type for published messages
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Publishes outbound events on an AMQP channel with confirms enabled.
pub struct AmqpPublisher {
    channel: Arc<Channel>,
    connector: Arc<AmqpConnector>,
}

impl AmqpPublisher {
    /// Creates a new publisher.
    ///
    /// # Parameters
    /// * `channel` - A channel to the RabbitMQ server, in confirm mode
    /// * `connector` - Connector bound into return listeners created without one
    pub fn new(channel: Arc<Channel>, connector: Arc<AmqpConnector>) -> Arc<AmqpPublisher> {
        Arc::new(AmqpPublisher { channel, connector })
    }
}

#[async_trait]
impl OutboundProcessor for AmqpPublisher {
    async fn process(&self, event: Event, options: PublishOptions) -> Result<Event, AmqpError> {
        let Some(endpoint) = event.endpoint().cloned() else {
            error!(event = %event.id(), "outbound event without endpoint");
            return Err(AmqpError::MissingEndpoint);
        };

        let listener = resolve_listener(options.return_listener, &self.connector);

        let mut trace_headers = BTreeMap::default();
        otel::inject(&Context::current(), &mut trace_headers);
        let props = basic_properties(event.message(), trace_headers);

        let confirm = match self
            .channel
            .basic_publish(
                &endpoint.exchange,
                &endpoint.routing_key,
                BasicPublishOptions {
                    immediate: false,
                    mandatory: options.mandatory.unwrap_or(endpoint.mandatory),
                },
                &event.message().payload,
                props,
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error publishing message");
                Err(AmqpError::PublishingError)
            }
            Ok(confirm) => Ok(confirm),
        }?;

        tokio::spawn(route_return(confirm, listener));

        debug!(
            exchange = %endpoint.exchange,
            routing_key = %endpoint.routing_key,
            "message published"
        );
        Ok(event)
    }
}

/// Builds the AMQP properties of a published message.
///
/// Outbound properties of the message are layered over the trace headers, so a
/// header set explicitly by a flow wins over the injected trace context.
///
/// # Parameters
/// * `message` - The message about to be published
/// * `trace_headers` - Headers already holding the injected trace context
///
/// # Returns
/// The properties to publish the message with
pub fn basic_properties(
    message: &BusMessage,
    trace_headers: BTreeMap<ShortString, AMQPValue>,
) -> BasicProperties {
    let mut btree = trace_headers;
    headers::to_btree_map(&message.outbound_properties, &mut btree);

    BasicProperties::default()
        .with_content_type(ShortString::from(JSON_CONTENT_TYPE))
        .with_content_encoding(ShortString::from(message.encoding.clone()))
        .with_message_id(ShortString::from(Uuid::new_v4().to_string()))
        .with_headers(FieldTable::from(btree))
}

/// Listener of a publish: the one carried by the options, bound to the publisher
/// connector when it has none, or the process-wide logging listener.
pub(crate) fn resolve_listener(
    listener: Option<ReturnListener>,
    connector: &Arc<AmqpConnector>,
) -> ReturnListener {
    let listener = listener.unwrap_or_default();
    listener.ensure_connector(connector);
    listener
}

async fn route_return(confirm: PublisherConfirm, listener: ReturnListener) {
    match confirm.await {
        Ok(confirmation) => notify_listener(confirmation, &listener).await,
        Err(err) => error!(error = err.to_string(), "failure awaiting publisher confirm"),
    }
}

/// Hands the message carried by a publisher confirmation, if any, to the listener.
pub(crate) async fn notify_listener(confirmation: Confirmation, listener: &ReturnListener) {
    if let Some(returned) = returned_message(confirmation) {
        listener.on_return(returned).await;
    }
}

fn returned_message(confirmation: Confirmation) -> Option<ReturnedMessage> {
    if confirmation.is_nack() {
        warn!("publisher confirm NACK");
    }

    confirmation.take_message().map(ReturnedMessage::from)
}
