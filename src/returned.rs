// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Returned Messages
//!
//! A message the broker could not route and handed back to the publishing channel
//! through a `basic.return`.

use lapin::{message::BasicReturnMessage, BasicProperties};
use std::fmt;

/// An unroutable message returned by the broker. Immutable once built.
#[derive(Debug, Clone)]
pub struct ReturnedMessage {
    reply_code: u16,
    reply_text: String,
    exchange: String,
    routing_key: String,
    properties: BasicProperties,
    body: Vec<u8>,
}

impl ReturnedMessage {
    /// Creates a returned message from the arguments of a `basic.return`.
    ///
    /// # Parameters
    /// * `reply_code` - AMQP code explaining why the message was undeliverable
    /// * `reply_text` - Text explaining why the message was undeliverable
    /// * `exchange` - Exchange the message was published to
    /// * `routing_key` - Routing key the message was published with
    /// * `properties` - Properties of the published message
    /// * `body` - Content of the published message
    pub fn new(
        reply_code: u16,
        reply_text: String,
        exchange: String,
        routing_key: String,
        properties: BasicProperties,
        body: Vec<u8>,
    ) -> Self {
        ReturnedMessage {
            reply_code,
            reply_text,
            exchange,
            routing_key,
            properties,
            body,
        }
    }

    /// AMQP reply code, e.g. 312 (NO_ROUTE).
    pub fn reply_code(&self) -> u16 {
        self.reply_code
    }

    /// Broker explanation of the return.
    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    /// Exchange the message was published to; empty for the default exchange.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Routing key the message was published with.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Properties of the message as published, headers included.
    pub fn properties(&self) -> &BasicProperties {
        &self.properties
    }

    /// Raw content of the message.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Human readable summary of why the broker returned the message.
    pub fn error_message(&self) -> String {
        format!(
            "AMQP returned message with code: {}, reason: {}, exchange: {}, routing key: {}",
            self.reply_code, self.reply_text, self.exchange, self.routing_key
        )
    }
}

impl From<BasicReturnMessage> for ReturnedMessage {
    fn from(returned: BasicReturnMessage) -> Self {
        let delivery = returned.delivery;
        ReturnedMessage {
            reply_code: returned.reply_code,
            reply_text: returned.reply_text.to_string(),
            exchange: delivery.exchange.to_string(),
            routing_key: delivery.routing_key.to_string(),
            properties: delivery.properties,
            body: delivery.data,
        }
    }
}

impl fmt::Display for ReturnedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReturnedMessage[exchange={}, routing_key={}, message_id={}, content_type={}, body_size={}]",
            self.exchange,
            self.routing_key,
            self.properties
                .message_id()
                .as_ref()
                .map(|id| id.as_str())
                .unwrap_or_default(),
            self.properties
                .content_type()
                .as_ref()
                .map(|ct| ct.as_str())
                .unwrap_or_default(),
            self.body.len()
        )
    }
}
