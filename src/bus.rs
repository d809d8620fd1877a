// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Service Bus Model
//!
//! The slice of the service bus event model the connector works with: messages,
//! endpoints, flow constructs, sessions and events, plus the contracts of the
//! message processors and receive transformers events are pushed through.

use crate::{configs::AmqpConfigs, errors::AmqpError};
use async_trait::async_trait;
use lapin::Channel;
use std::{collections::HashMap, fmt, sync::Arc};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Inbound property holding the broker delivery tag of a consumed message
pub const DELIVERY_TAG: &str = "amqp.delivery-tag";
/// Inbound property holding the reply code of a returned message
pub const RETURN_REPLY_CODE: &str = "amqp.return.reply-code";
/// Inbound property holding the reply text of a returned message
pub const RETURN_REPLY_TEXT: &str = "amqp.return.reply-text";
/// Inbound property holding the exchange a returned message was published to
pub const RETURN_EXCHANGE: &str = "amqp.return.exchange";
/// Inbound property holding the routing key a returned message was published with
pub const RETURN_ROUTING_KEY: &str = "amqp.return.routing-key";

/// Value of a message property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_owned())
    }
}

pub type Properties = HashMap<String, PropertyValue>;

/// A message travelling through the bus.
///
/// Inbound properties describe where the message came from (AMQP headers,
/// delivery metadata), outbound properties are copied to the AMQP headers on publish.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BusMessage {
    pub payload: Vec<u8>,
    pub encoding: String,
    pub inbound_properties: Properties,
    pub outbound_properties: Properties,
}

impl BusMessage {
    pub fn new(payload: impl Into<Vec<u8>>, encoding: &str) -> Self {
        BusMessage {
            payload: payload.into(),
            encoding: encoding.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_outbound_property(mut self, key: &str, value: PropertyValue) -> Self {
        self.outbound_properties.insert(key.to_owned(), value);
        self
    }

    pub fn with_inbound_property(mut self, key: &str, value: PropertyValue) -> Self {
        self.inbound_properties.insert(key.to_owned(), value);
        self
    }

    pub fn inbound_property(&self, key: &str) -> Option<&PropertyValue> {
        self.inbound_properties.get(key)
    }

    pub fn outbound_property(&self, key: &str) -> Option<&PropertyValue> {
        self.outbound_properties.get(key)
    }
}

/// An addressable AMQP endpoint: where a flow publishes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub exchange: String,
    pub routing_key: String,
    pub mandatory: bool,
}

impl Endpoint {
    pub fn new(name: &str, exchange: &str, routing_key: &str) -> Self {
        Endpoint {
            name: name.to_owned(),
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            mandatory: true,
        }
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }
}

/// The processing pipeline instance an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConstruct {
    pub name: String,
}

impl FlowConstruct {
    pub fn new(name: &str) -> Self {
        FlowConstruct {
            name: name.to_owned(),
        }
    }
}

/// Bus-wide settings shared by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusContext {
    pub default_encoding: String,
}

impl BusContext {
    pub fn new(cfg: &AmqpConfigs) -> Arc<Self> {
        Arc::new(BusContext {
            default_encoding: cfg.default_encoding.clone(),
        })
    }
}

/// The session an event runs in.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    flow_construct: Option<Arc<FlowConstruct>>,
    context: Arc<BusContext>,
    channel: Option<Arc<Channel>>,
}

impl Session {
    pub fn new(flow_construct: Option<Arc<FlowConstruct>>, context: Arc<BusContext>) -> Self {
        Session {
            id: Uuid::new_v4(),
            flow_construct,
            context,
            channel: None,
        }
    }

    /// Attaches the channel an inbound message was consumed from.
    pub fn with_channel(mut self, channel: Arc<Channel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn flow_construct(&self) -> Option<&Arc<FlowConstruct>> {
        self.flow_construct.as_ref()
    }

    pub fn context(&self) -> &Arc<BusContext> {
        &self.context
    }

    pub fn channel(&self) -> Option<&Arc<Channel>> {
        self.channel.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("flow_construct", &self.flow_construct)
            .field("context", &self.context)
            .field("channel", &self.channel.as_ref().map(|c| c.id()))
            .finish()
    }
}

/// A message plus the endpoint and session it is processed with.
#[derive(Debug, Clone)]
pub struct Event {
    id: Uuid,
    message: BusMessage,
    endpoint: Option<Arc<Endpoint>>,
    session: Session,
}

impl Event {
    pub fn new(message: BusMessage, endpoint: Option<Arc<Endpoint>>, session: Session) -> Self {
        Event {
            id: Uuid::new_v4(),
            message,
            endpoint,
            session,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message(&self) -> &BusMessage {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut BusMessage {
        &mut self.message
    }

    pub fn endpoint(&self) -> Option<&Arc<Endpoint>> {
        self.endpoint.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn flow_construct(&self) -> Option<&Arc<FlowConstruct>> {
        self.session.flow_construct()
    }

    /// Runs the transformers over the message of this event, in order.
    pub fn apply_transformers(
        &mut self,
        transformers: &[Arc<dyn Transformer>],
    ) -> Result<(), AmqpError> {
        for transformer in transformers {
            transformer.transform(self)?;
        }

        Ok(())
    }
}

/// A step of a flow.
///
/// Processors receiving returned messages may be invoked concurrently from several
/// publish channels and must tolerate it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, event: Event) -> Result<Event, AmqpError>;

    /// Endpoint identity of the processor, when it is itself an endpoint.
    fn endpoint(&self) -> Option<Arc<Endpoint>> {
        None
    }
}

/// A receive-side transformation of the message held by an event.
#[cfg_attr(test, automock)]
pub trait Transformer: Send + Sync {
    fn transform(&self, event: &mut Event) -> Result<(), AmqpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        let ctx = BusContext::new(&AmqpConfigs::default());
        Event::new(
            BusMessage::new("payload", "UTF-8"),
            None,
            Session::new(Some(Arc::new(FlowConstruct::new("orders"))), ctx),
        )
    }

    #[test]
    fn test_apply_transformers_in_order() {
        let mut first = MockTransformer::new();
        first.expect_transform().times(1).returning(|event| {
            event.message_mut().payload.extend_from_slice(b"-a");
            Ok(())
        });
        let mut second = MockTransformer::new();
        second.expect_transform().times(1).returning(|event| {
            event.message_mut().payload.extend_from_slice(b"-b");
            Ok(())
        });

        let mut event = event();
        let transformers: Vec<Arc<dyn Transformer>> = vec![Arc::new(first), Arc::new(second)];
        event.apply_transformers(&transformers).unwrap();

        assert_eq!(event.message().payload, b"payload-a-b".to_vec());
    }

    #[test]
    fn test_apply_transformers_stops_on_failure() {
        let mut first = MockTransformer::new();
        first
            .expect_transform()
            .times(1)
            .returning(|_| Err(AmqpError::TransformerError("boom".to_owned())));
        let mut second = MockTransformer::new();
        second.expect_transform().never();

        let mut event = event();
        let transformers: Vec<Arc<dyn Transformer>> = vec![Arc::new(first), Arc::new(second)];
        let res = event.apply_transformers(&transformers);

        assert_eq!(res, Err(AmqpError::TransformerError("boom".to_owned())));
    }

    #[test]
    fn test_event_exposes_session_flow() {
        let event = event();
        assert_eq!(event.flow_construct().unwrap().name, "orders");
        assert!(event.session().channel().is_none());
    }
}
