// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Conversions between bridge values and `opcua` variants.

use std::str::FromStr;

use bridge_core::{StatusCode, TagId, Value};
use chrono::{DateTime, Utc};
use opcua::types::{Array, ByteString, UAString, Variant, VariantTypeId};

use crate::session::RawRead;

/// Namespace used for tags that are not written as full node ids.
pub const DEFAULT_NAMESPACE: u16 = 2;

/// Converts a bridge value to a variant.
pub fn to_variant(value: &Value) -> Variant {
    match value {
        Value::Null => Variant::Empty,
        Value::Bool(v) => Variant::Boolean(*v),
        Value::Int8(v) => Variant::SByte(*v),
        Value::Int16(v) => Variant::Int16(*v),
        Value::Int32(v) => Variant::Int32(*v),
        Value::Int64(v) => Variant::Int64(*v),
        Value::UInt8(v) => Variant::Byte(*v),
        Value::UInt16(v) => Variant::UInt16(*v),
        Value::UInt32(v) => Variant::UInt32(*v),
        Value::UInt64(v) => Variant::UInt64(*v),
        Value::Float32(v) => Variant::Float(*v),
        Value::Float64(v) => Variant::Double(*v),
        Value::String(v) => Variant::String(UAString::from(v.as_str())),
        Value::Bytes(v) => Variant::ByteString(ByteString::from(v.as_slice())),
        Value::DateTime(v) => Variant::DateTime(Box::new(opcua::types::DateTime::from(*v))),
        Value::Array(items) => {
            let variants: Vec<Variant> = items.iter().map(to_variant).collect();
            match Array::new(VariantTypeId::Variant, variants) {
                Ok(array) => Variant::Array(Box::new(array)),
                Err(status) => {
                    tracing::debug!(status = ?status, "Array not representable, sending empty");
                    Variant::Empty
                }
            }
        }
    }
}

/// Converts a variant to a bridge value.
///
/// Structured types without a bridge counterpart become their debug string.
pub fn from_variant(variant: &Variant) -> Value {
    match variant {
        Variant::Empty => Value::Null,
        Variant::Boolean(v) => Value::Bool(*v),
        Variant::SByte(v) => Value::Int8(*v),
        Variant::Byte(v) => Value::UInt8(*v),
        Variant::Int16(v) => Value::Int16(*v),
        Variant::UInt16(v) => Value::UInt16(*v),
        Variant::Int32(v) => Value::Int32(*v),
        Variant::UInt32(v) => Value::UInt32(*v),
        Variant::Int64(v) => Value::Int64(*v),
        Variant::UInt64(v) => Value::UInt64(*v),
        Variant::Float(v) => Value::Float32(*v),
        Variant::Double(v) => Value::Float64(*v),
        Variant::String(v) => Value::String(v.as_ref().to_string()),
        Variant::DateTime(v) => Value::DateTime(to_chrono(v)),
        Variant::ByteString(v) => Value::Bytes(v.value.clone().unwrap_or_default()),
        Variant::Array(array) => Value::Array(array.values.iter().map(from_variant).collect()),
        other => Value::String(format!("{:?}", other)),
    }
}

/// Converts a UA timestamp.
pub fn to_chrono(dt: &opcua::types::DateTime) -> DateTime<Utc> {
    dt.as_chrono()
}

/// Parses a tag as a node id.
///
/// `ns=3;i=1001` style tags are taken verbatim; anything else is a string
/// identifier in [`DEFAULT_NAMESPACE`].
pub fn tag_to_node_id(tag: &TagId) -> opcua::types::NodeId {
    opcua::types::NodeId::from_str(tag.as_str())
        .unwrap_or_else(|_| opcua::types::NodeId::new(DEFAULT_NAMESPACE, tag.as_str()))
}

/// Converts a data value reported for `tag`.
pub fn from_data_value(tag: TagId, data_value: &opcua::types::DataValue) -> RawRead {
    RawRead {
        tag,
        value: data_value
            .value
            .as_ref()
            .map(from_variant)
            .unwrap_or(Value::Null),
        status: StatusCode(data_value.status.as_ref().map(|s| s.bits()).unwrap_or(0)),
        source_timestamp: data_value.source_timestamp.as_ref().map(to_chrono),
        server_timestamp: data_value.server_timestamp.as_ref().map(to_chrono),
    }
}
