// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Connector
//!
//! The connector holds the collaborators a returned message needs once it is back
//! in the bus: the bus context, the message factory that materializes bus messages
//! from broker messages, and the receive transformers applied before dispatch.

use crate::{
    bus::{
        BusContext, BusMessage, PropertyValue, Transformer, RETURN_EXCHANGE, RETURN_REPLY_CODE,
        RETURN_REPLY_TEXT, RETURN_ROUTING_KEY,
    },
    errors::AmqpError,
    headers,
    returned::ReturnedMessage,
};
use lapin::types::ShortString;
use std::{fmt, sync::Arc};

#[cfg(test)]
use mockall::automock;

/// Materializes bus messages from messages returned by the broker.
#[cfg_attr(test, automock)]
pub trait MessageFactory: Send + Sync {
    /// Creates a bus message from a returned message.
    ///
    /// # Parameters
    /// * `returned` - The message returned by the broker
    /// * `encoding` - Text encoding of the created message
    ///
    /// # Returns
    /// The bus message, or `ConversionError` when the message can't be materialized
    fn create(&self, returned: &ReturnedMessage, encoding: &str) -> Result<BusMessage, AmqpError>;
}

/// Default factory: the body becomes the payload, AMQP headers and standard
/// properties become inbound properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmqpMessageFactory;

impl MessageFactory for AmqpMessageFactory {
    fn create(&self, returned: &ReturnedMessage, encoding: &str) -> Result<BusMessage, AmqpError> {
        let props = returned.properties();
        let mut message = BusMessage::new(returned.body(), encoding);

        if let Some(table) = props.headers() {
            headers::from_field_table(table, &mut message.inbound_properties);
        }

        let standard: [(&str, &Option<ShortString>); 8] = [
            ("content-type", props.content_type()),
            ("content-encoding", props.content_encoding()),
            ("correlation-id", props.correlation_id()),
            ("reply-to", props.reply_to()),
            ("expiration", props.expiration()),
            ("message-id", props.message_id()),
            ("type", props.kind()),
            ("app-id", props.app_id()),
        ];
        for (key, value) in standard {
            if let Some(value) = value {
                message
                    .inbound_properties
                    .insert(key.to_owned(), PropertyValue::Text(value.to_string()));
            }
        }
        if let Some(mode) = props.delivery_mode() {
            message
                .inbound_properties
                .insert("delivery-mode".to_owned(), PropertyValue::UInt(u64::from(*mode)));
        }
        if let Some(priority) = props.priority() {
            message
                .inbound_properties
                .insert("priority".to_owned(), PropertyValue::UInt(u64::from(*priority)));
        }
        if let Some(timestamp) = props.timestamp() {
            message
                .inbound_properties
                .insert("timestamp".to_owned(), PropertyValue::UInt(*timestamp));
        }

        Ok(message
            .with_inbound_property(
                RETURN_REPLY_CODE,
                PropertyValue::UInt(u64::from(returned.reply_code())),
            )
            .with_inbound_property(RETURN_REPLY_TEXT, returned.reply_text().into())
            .with_inbound_property(RETURN_EXCHANGE, returned.exchange().into())
            .with_inbound_property(RETURN_ROUTING_KEY, returned.routing_key().into()))
    }
}

/// Collaborators of the AMQP transport shared by every flow using it.
pub struct AmqpConnector {
    name: String,
    context: Arc<BusContext>,
    message_factory: Arc<dyn MessageFactory>,
    receive_transformers: Vec<Arc<dyn Transformer>>,
}

impl AmqpConnector {
    /// Creates a connector using the default message factory and no transformers.
    pub fn new(name: &str, context: Arc<BusContext>) -> Self {
        AmqpConnector {
            name: name.to_owned(),
            context,
            message_factory: Arc::new(AmqpMessageFactory),
            receive_transformers: vec![],
        }
    }

    /// Replaces the message factory used for returned messages.
    pub fn with_message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.message_factory = factory;
        self
    }

    /// Appends a transformer to the receive chain.
    pub fn with_receive_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.receive_transformers.push(transformer);
        self
    }

    /// Name of the connector.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus context sessions of redispatched events are created in.
    pub fn context(&self) -> &Arc<BusContext> {
        &self.context
    }

    /// Factory materializing bus messages from returned messages.
    pub fn message_factory(&self) -> &Arc<dyn MessageFactory> {
        &self.message_factory
    }

    /// Transformers applied to a message before it reaches a processor.
    ///
    /// # Returns
    /// The transformers, in application order
    pub fn receive_transformers(&self) -> &[Arc<dyn Transformer>] {
        &self.receive_transformers
    }
}

impl fmt::Debug for AmqpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmqpConnector")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("receive_transformers", &self.receive_transformers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::{
        types::{AMQPValue, FieldTable, LongString},
        BasicProperties,
    };
    use std::collections::BTreeMap;

    #[test]
    fn test_factory_copies_body_and_headers() {
        let mut table = BTreeMap::new();
        table.insert(
            ShortString::from("customer"),
            AMQPValue::LongString(LongString::from("acme")),
        );
        let returned = ReturnedMessage::new(
            312,
            "NO_ROUTE".to_owned(),
            "orders".to_owned(),
            "orders.created".to_owned(),
            BasicProperties::default()
                .with_headers(FieldTable::from(table))
                .with_content_type(ShortString::from("application/json"))
                .with_delivery_mode(2),
            b"{\"id\":1}".to_vec(),
        );

        let message = AmqpMessageFactory.create(&returned, "UTF-8").unwrap();

        assert_eq!(message.payload, b"{\"id\":1}".to_vec());
        assert_eq!(message.encoding, "UTF-8");
        assert_eq!(message.inbound_property("customer"), Some(&"acme".into()));
        assert_eq!(
            message.inbound_property("content-type"),
            Some(&"application/json".into())
        );
        assert_eq!(
            message.inbound_property("delivery-mode"),
            Some(&PropertyValue::UInt(2))
        );
        assert_eq!(
            message.inbound_property(RETURN_REPLY_CODE),
            Some(&PropertyValue::UInt(312))
        );
        assert_eq!(
            message.inbound_property(RETURN_ROUTING_KEY),
            Some(&"orders.created".into())
        );
        assert!(message.outbound_properties.is_empty());
    }
}
