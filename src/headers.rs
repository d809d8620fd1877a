// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Header Conversion
//!
//! Converts bus message properties to AMQP header values and back.

use crate::bus::{Properties, PropertyValue};
use lapin::types::{AMQPValue, ByteArray, FieldTable, LongString, ShortString};
use std::collections::BTreeMap;

impl From<&PropertyValue> for AMQPValue {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Bool(v) => AMQPValue::Boolean(*v),
            PropertyValue::Int(v) => AMQPValue::LongLongInt(*v),
            PropertyValue::UInt(v) => match (u32::try_from(*v), i64::try_from(*v)) {
                (Ok(small), _) => AMQPValue::LongUInt(small),
                (_, Ok(large)) => AMQPValue::LongLongInt(large),
                // AMQP has no unsigned 64 bit integer besides the timestamp
                _ => AMQPValue::Timestamp(*v),
            },
            PropertyValue::Text(v) => AMQPValue::LongString(LongString::from(v.clone())),
            PropertyValue::Bytes(v) => AMQPValue::ByteArray(ByteArray::from(v.clone())),
        }
    }
}

impl PropertyValue {
    /// Maps an AMQP header value, `None` for nested tables, arrays and floats.
    pub fn from_amqp(value: &AMQPValue) -> Option<PropertyValue> {
        let converted = match value {
            AMQPValue::Boolean(v) => PropertyValue::Bool(*v),
            AMQPValue::ShortShortInt(v) => PropertyValue::Int(i64::from(*v)),
            AMQPValue::ShortInt(v) => PropertyValue::Int(i64::from(*v)),
            AMQPValue::LongInt(v) => PropertyValue::Int(i64::from(*v)),
            AMQPValue::LongLongInt(v) => PropertyValue::Int(*v),
            AMQPValue::ShortShortUInt(v) => PropertyValue::UInt(u64::from(*v)),
            AMQPValue::ShortUInt(v) => PropertyValue::UInt(u64::from(*v)),
            AMQPValue::LongUInt(v) => PropertyValue::UInt(u64::from(*v)),
            AMQPValue::Timestamp(v) => PropertyValue::UInt(*v),
            AMQPValue::ShortString(v) => PropertyValue::Text(v.to_string()),
            AMQPValue::LongString(v) => {
                PropertyValue::Text(String::from_utf8_lossy(v.as_bytes()).into_owned())
            }
            AMQPValue::ByteArray(v) => PropertyValue::Bytes(v.as_slice().to_vec()),
            _ => return None,
        };

        Some(converted)
    }
}

/// Copies bus properties into an AMQP header map.
pub(crate) fn to_btree_map(properties: &Properties, btree: &mut BTreeMap<ShortString, AMQPValue>) {
    for (key, value) in properties {
        btree.insert(ShortString::from(key.clone()), AMQPValue::from(value));
    }
}

/// Copies the convertible entries of an AMQP header table into bus properties.
pub(crate) fn from_field_table(table: &FieldTable, properties: &mut Properties) {
    for (key, value) in table.inner() {
        if let Some(converted) = PropertyValue::from_amqp(value) {
            properties.insert(key.to_string(), converted);
        }
    }
}
