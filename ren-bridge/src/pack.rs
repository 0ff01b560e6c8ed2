// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed pack values: the tagged encoding RenVM uses for transaction inputs
//! and outputs.
//!
//! The binary form feeds the transaction hash, so it must be canonical:
//!
//! - `bool`: 1 byte (0 or 1)
//! - `u8`..`u256`: big endian, exactly `N / 8` bytes
//! - `string`, `bytes`: 4 byte big endian length, then the raw bytes
//! - `b20`, `b32`, `b65`: exactly that many raw bytes, no length prefix
//! - struct: field encodings concatenated in declaration order
//! - `ext_*`: 4 byte length, then the canonical JSON of the value
//!
//! The type itself is marshalled ahead of the value (see [`marshal_type`]) so
//! that two inputs with the same bytes but different schemas hash apart.

use crate::error::{BridgeError, BridgeResult};
use crate::utils::{from_base64, to_url_base64};
use ethers::types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;

const STRUCT_TYPE_ID: u8 = 20;
const EXTENSION_TYPE_ID: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackPrimitive {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Str,
    Bytes,
    Bytes20,
    Bytes32,
    Bytes65,
}

impl PackPrimitive {
    pub const ALL: [PackPrimitive; 12] = [
        PackPrimitive::Bool,
        PackPrimitive::U8,
        PackPrimitive::U16,
        PackPrimitive::U32,
        PackPrimitive::U64,
        PackPrimitive::U128,
        PackPrimitive::U256,
        PackPrimitive::Str,
        PackPrimitive::Bytes,
        PackPrimitive::Bytes20,
        PackPrimitive::Bytes32,
        PackPrimitive::Bytes65,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            PackPrimitive::Bool => "bool",
            PackPrimitive::U8 => "u8",
            PackPrimitive::U16 => "u16",
            PackPrimitive::U32 => "u32",
            PackPrimitive::U64 => "u64",
            PackPrimitive::U128 => "u128",
            PackPrimitive::U256 => "u256",
            PackPrimitive::Str => "str",
            PackPrimitive::Bytes => "b",
            PackPrimitive::Bytes20 => "b20",
            PackPrimitive::Bytes32 => "b32",
            PackPrimitive::Bytes65 => "b65",
        }
    }

    /// Also accepts the long `string` / `bytes` spellings.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(PackPrimitive::Str),
            "bytes" => Some(PackPrimitive::Bytes),
            tag => PackPrimitive::ALL.into_iter().find(|p| p.tag() == tag),
        }
    }

    fn type_id(&self) -> u8 {
        match self {
            PackPrimitive::Bool => 1,
            PackPrimitive::U8 => 2,
            PackPrimitive::U16 => 3,
            PackPrimitive::U32 => 4,
            PackPrimitive::U64 => 5,
            PackPrimitive::U128 => 6,
            PackPrimitive::U256 => 7,
            PackPrimitive::Str => 10,
            PackPrimitive::Bytes => 11,
            PackPrimitive::Bytes32 => 12,
            PackPrimitive::Bytes65 => 13,
            PackPrimitive::Bytes20 => 14,
        }
    }

    /// Bit width of unsigned integer tags.
    pub fn uint_bits(&self) -> Option<usize> {
        match self {
            PackPrimitive::U8 => Some(8),
            PackPrimitive::U16 => Some(16),
            PackPrimitive::U32 => Some(32),
            PackPrimitive::U64 => Some(64),
            PackPrimitive::U128 => Some(128),
            PackPrimitive::U256 => Some(256),
            _ => None,
        }
    }

    /// Length of fixed-width byte array tags.
    pub fn byte_array_len(&self) -> Option<usize> {
        match self {
            PackPrimitive::Bytes20 => Some(20),
            PackPrimitive::Bytes32 => Some(32),
            PackPrimitive::Bytes65 => Some(65),
            _ => None,
        }
    }

    /// Encoded size for tags without a length prefix.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            PackPrimitive::Bool => Some(1),
            p => p
                .uint_bits()
                .map(|bits| bits / 8)
                .or_else(|| p.byte_array_len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackField {
    pub name: String,
    pub ty: PackType,
}

impl PackField {
    pub fn new(name: impl Into<String>, ty: impl Into<PackType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackType {
    Primitive(PackPrimitive),
    Struct(Vec<PackField>),
    /// Chain specific tags (`ext_*`). Values are carried opaquely.
    Extension(String),
}

impl From<PackPrimitive> for PackType {
    fn from(p: PackPrimitive) -> Self {
        PackType::Primitive(p)
    }
}

impl PackType {
    /// Parses a scalar tag such as `u64`, `b32` or `ext_btcCompatUTXO`.
    pub fn from_tag(tag: &str) -> BridgeResult<Self> {
        if let Some(p) = PackPrimitive::from_tag(tag) {
            return Ok(PackType::Primitive(p));
        }
        if tag.starts_with("ext_") {
            return Ok(PackType::Extension(tag.to_string()));
        }
        Err(BridgeError::decoding(tag, "unrecognized type tag"))
    }

    pub fn tag(&self) -> String {
        match self {
            PackType::Primitive(p) => p.tag().to_string(),
            PackType::Struct(_) => "struct".to_string(),
            PackType::Extension(tag) => tag.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PackType::Primitive(p) => Value::String(p.tag().to_string()),
            PackType::Extension(tag) => Value::String(tag.clone()),
            PackType::Struct(fields) => {
                let fields: Vec<Value> = fields
                    .iter()
                    .map(|f| {
                        let mut entry = Map::new();
                        entry.insert(f.name.clone(), f.ty.to_json());
                        Value::Object(entry)
                    })
                    .collect();
                json!({ "struct": fields })
            }
        }
    }

    pub fn from_json(value: &Value) -> BridgeResult<Self> {
        match value {
            Value::String(tag) => PackType::from_tag(tag),
            Value::Object(obj) => {
                let fields = obj
                    .get("struct")
                    .and_then(Value::as_array)
                    .ok_or_else(|| BridgeError::decoding("struct", format!("{}", value)))?;
                let mut parsed = Vec::with_capacity(fields.len());
                for entry in fields {
                    let entry = entry
                        .as_object()
                        .filter(|e| e.len() == 1)
                        .ok_or_else(|| {
                            BridgeError::decoding("struct", format!("bad field {}", entry))
                        })?;
                    // filter above guarantees exactly one entry
                    for (name, ty) in entry {
                        parsed.push(PackField::new(name.clone(), PackType::from_json(ty)?));
                    }
                }
                Ok(PackType::Struct(parsed))
            }
            other => Err(BridgeError::decoding("type", format!("{}", other))),
        }
    }
}

impl fmt::Display for PackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl Serialize for PackType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PackType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PackType::from_json(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackValue {
    Bool(bool),
    Uint(U256),
    Str(String),
    Bytes(Vec<u8>),
    Struct(Vec<(String, PackValue)>),
    /// Opaque payload of an extension tag.
    Raw(Value),
}

impl PackValue {
    pub fn uint(value: impl Into<U256>) -> Self {
        PackValue::Uint(value.into())
    }

    /// Parses a decimal string, the JSON form of every integer tag.
    pub fn uint_from_decimal(decimal: &str) -> BridgeResult<Self> {
        U256::from_dec_str(decimal)
            .map(PackValue::Uint)
            .map_err(|e| BridgeError::decoding("uint", format!("{:?}: {:?}", decimal, e)))
    }

    fn kind(&self) -> &'static str {
        match self {
            PackValue::Bool(_) => "bool",
            PackValue::Uint(_) => "uint",
            PackValue::Str(_) => "string",
            PackValue::Bytes(_) => "bytes",
            PackValue::Struct(_) => "struct",
            PackValue::Raw(_) => "raw",
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PackValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            PackValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PackValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a struct field by name.
    pub fn field(&self, name: &str) -> Option<&PackValue> {
        match self {
            PackValue::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

pub fn encode_string(s: &str) -> Vec<u8> {
    encode_length_prefixed(s.as_bytes())
}

fn encode_length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
    out
}

/// Binary form of a type, hashed ahead of the value.
pub fn marshal_type(ty: &PackType) -> Vec<u8> {
    match ty {
        PackType::Primitive(p) => vec![p.type_id()],
        PackType::Extension(tag) => {
            let mut out = vec![EXTENSION_TYPE_ID];
            out.extend_from_slice(&encode_string(tag));
            out
        }
        PackType::Struct(fields) => {
            let mut out = vec![STRUCT_TYPE_ID];
            out.extend_from_slice(&(fields.len() as u32).to_be_bytes());
            for field in fields {
                out.extend_from_slice(&encode_string(&field.name));
                out.extend_from_slice(&marshal_type(&field.ty));
            }
            out
        }
    }
}

/// Canonical binary encoding of `value` under `ty`.
pub fn encode_value(ty: &PackType, value: &PackValue) -> BridgeResult<Vec<u8>> {
    let mut out = Vec::new();
    encode_into("value", ty, value, &mut out)?;
    Ok(out)
}

fn encode_into(field: &str, ty: &PackType, value: &PackValue, out: &mut Vec<u8>) -> BridgeResult<()> {
    match (ty, value) {
        (PackType::Primitive(PackPrimitive::Bool), PackValue::Bool(b)) => {
            out.push(u8::from(*b));
        }
        (PackType::Primitive(p), PackValue::Uint(v)) if p.uint_bits().is_some() => {
            let bits = p.uint_bits().unwrap_or(256);
            if v.bits() > bits {
                return Err(BridgeError::encoding(
                    field,
                    p.tag(),
                    format!("{} does not fit in {} bits", v, bits),
                ));
            }
            let mut be = [0u8; 32];
            v.to_big_endian(&mut be);
            out.extend_from_slice(&be[32 - bits / 8..]);
        }
        (PackType::Primitive(PackPrimitive::Str), PackValue::Str(s)) => {
            out.extend_from_slice(&encode_string(s));
        }
        (PackType::Primitive(PackPrimitive::Bytes), PackValue::Bytes(b)) => {
            out.extend_from_slice(&encode_length_prefixed(b));
        }
        (PackType::Primitive(p), PackValue::Bytes(b)) if p.byte_array_len().is_some() => {
            let expected = p.byte_array_len().unwrap_or_default();
            if b.len() != expected {
                return Err(BridgeError::encoding(
                    field,
                    p.tag(),
                    format!("expected {} bytes, got {}", expected, b.len()),
                ));
            }
            out.extend_from_slice(b);
        }
        (PackType::Struct(fields), PackValue::Struct(values)) => {
            if fields.len() != values.len() {
                return Err(BridgeError::encoding(
                    field,
                    "struct",
                    format!("expected {} fields, got {}", fields.len(), values.len()),
                ));
            }
            for (def, (name, inner)) in fields.iter().zip(values) {
                if &def.name != name {
                    return Err(BridgeError::encoding(
                        field,
                        "struct",
                        format!("expected field `{}`, got `{}`", def.name, name),
                    ));
                }
                encode_into(name, &def.ty, inner, out)?;
            }
        }
        (PackType::Extension(_), PackValue::Raw(raw)) => {
            let bytes = serde_json::to_vec(raw)
                .map_err(|e| BridgeError::encoding(field, ty.tag(), e))?;
            out.extend_from_slice(&encode_length_prefixed(&bytes));
        }
        (PackType::Extension(_), PackValue::Bytes(b)) => {
            out.extend_from_slice(&encode_length_prefixed(b));
        }
        (ty, value) => {
            return Err(BridgeError::encoding(
                field,
                ty.tag(),
                format!("{} value does not match type", value.kind()),
            ));
        }
    }
    Ok(())
}

/// Decodes `bytes` produced by [`encode_value`]. The whole input must be
/// consumed.
pub fn decode_value(ty: &PackType, bytes: &[u8]) -> BridgeResult<PackValue> {
    let mut reader = Reader { bytes, pos: 0 };
    let value = reader.read(ty)?;
    if reader.pos != bytes.len() {
        return Err(BridgeError::decoding(
            ty.tag(),
            format!(
                "expected {} bytes, got {}",
                reader.pos,
                bytes.len()
            ),
        ));
    }
    Ok(value)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, tag: &str, len: usize) -> BridgeResult<&'a [u8]> {
        let remaining = self.bytes.len() - self.pos;
        if remaining < len {
            return Err(BridgeError::decoding(
                tag,
                format!("expected {} bytes, got {}", len, remaining),
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_length_prefixed(&mut self, tag: &str) -> BridgeResult<&'a [u8]> {
        let mut len = [0u8; 4];
        len.copy_from_slice(self.take(tag, 4)?);
        self.take(tag, u32::from_be_bytes(len) as usize)
    }

    fn read(&mut self, ty: &PackType) -> BridgeResult<PackValue> {
        match ty {
            PackType::Primitive(PackPrimitive::Bool) => match self.take("bool", 1)?[0] {
                0 => Ok(PackValue::Bool(false)),
                1 => Ok(PackValue::Bool(true)),
                b => Err(BridgeError::decoding("bool", format!("invalid byte {}", b))),
            },
            PackType::Primitive(PackPrimitive::Str) => {
                let raw = self.take_length_prefixed("string")?;
                String::from_utf8(raw.to_vec())
                    .map(PackValue::Str)
                    .map_err(|e| BridgeError::decoding("string", e))
            }
            PackType::Primitive(PackPrimitive::Bytes) => {
                Ok(PackValue::Bytes(self.take_length_prefixed("bytes")?.to_vec()))
            }
            PackType::Primitive(p) => {
                let width = p.fixed_width().unwrap_or_default();
                let raw = self.take(p.tag(), width)?;
                if p.uint_bits().is_some() {
                    Ok(PackValue::Uint(U256::from_big_endian(raw)))
                } else {
                    Ok(PackValue::Bytes(raw.to_vec()))
                }
            }
            PackType::Struct(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    values.push((field.name.clone(), self.read(&field.ty)?));
                }
                Ok(PackValue::Struct(values))
            }
            PackType::Extension(tag) => {
                let raw = self.take_length_prefixed(tag)?;
                Ok(serde_json::from_slice(raw)
                    .map(PackValue::Raw)
                    .unwrap_or_else(|_| PackValue::Bytes(raw.to_vec())))
            }
        }
    }
}

/// JSON form of a value: byte tags as URL-safe base64, integers as decimal
/// strings.
pub fn value_to_json(ty: &PackType, value: &PackValue) -> BridgeResult<Value> {
    // Validate widths up front so JSON never carries a value the binary
    // encoder would reject.
    encode_value(ty, value)?;
    Ok(value_to_json_unchecked(ty, value))
}

fn value_to_json_unchecked(ty: &PackType, value: &PackValue) -> Value {
    match (ty, value) {
        (PackType::Struct(fields), PackValue::Struct(values)) => {
            let mut obj = Map::new();
            for (def, (name, inner)) in fields.iter().zip(values) {
                obj.insert(name.clone(), value_to_json_unchecked(&def.ty, inner));
            }
            Value::Object(obj)
        }
        (_, PackValue::Bool(b)) => Value::Bool(*b),
        (_, PackValue::Uint(v)) => Value::String(v.to_string()),
        (_, PackValue::Str(s)) => Value::String(s.clone()),
        (_, PackValue::Bytes(b)) => Value::String(to_url_base64(b)),
        (_, PackValue::Raw(raw)) => raw.clone(),
        (_, PackValue::Struct(_)) => Value::Null,
    }
}

pub fn value_from_json(ty: &PackType, json: &Value) -> BridgeResult<PackValue> {
    value_from_json_named("value", ty, json)
}

fn value_from_json_named(field: &str, ty: &PackType, json: &Value) -> BridgeResult<PackValue> {
    let mismatch = || {
        BridgeError::decoding(
            ty.tag(),
            format!("field `{}` has unexpected JSON {}", field, json),
        )
    };
    let value = match ty {
        PackType::Primitive(PackPrimitive::Bool) => PackValue::Bool(json.as_bool().ok_or_else(mismatch)?),
        PackType::Primitive(PackPrimitive::Str) => {
            PackValue::Str(json.as_str().ok_or_else(mismatch)?.to_string())
        }
        PackType::Primitive(p) if p.uint_bits().is_some() => match json {
            Value::String(s) => PackValue::uint_from_decimal(s)?,
            Value::Number(n) => PackValue::uint(n.as_u64().ok_or_else(mismatch)?),
            _ => return Err(mismatch()),
        },
        PackType::Primitive(_) => PackValue::Bytes(from_base64(json.as_str().ok_or_else(mismatch)?)?),
        PackType::Struct(fields) => {
            let obj = json.as_object().ok_or_else(mismatch)?;
            let mut values = Vec::with_capacity(fields.len());
            for def in fields {
                let inner = obj.get(&def.name).ok_or_else(|| {
                    BridgeError::decoding("struct", format!("missing field `{}`", def.name))
                })?;
                values.push((
                    def.name.clone(),
                    value_from_json_named(&def.name, &def.ty, inner)?,
                ));
            }
            PackValue::Struct(values)
        }
        PackType::Extension(_) => PackValue::Raw(json.clone()),
    };
    // Reject wrong widths at the boundary rather than at hash time.
    encode_value(ty, &value).map_err(|e| match e {
        BridgeError::Encoding { tag, reason, .. } => BridgeError::Encoding {
            field: field.to_string(),
            tag,
            reason,
        },
        other => other,
    })?;
    Ok(value)
}

/// A value together with its type, `{ "t": .., "v": .. }` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedPackValue {
    t: PackType,
    v: PackValue,
}

impl TypedPackValue {
    /// Fails if `v` cannot be encoded under `t`.
    pub fn new(t: PackType, v: PackValue) -> BridgeResult<Self> {
        encode_value(&t, &v)?;
        Ok(Self { t, v })
    }

    pub fn ty(&self) -> &PackType {
        &self.t
    }

    pub fn value(&self) -> &PackValue {
        &self.v
    }

    /// Type marshalling followed by the value encoding.
    pub fn encode(&self) -> BridgeResult<Vec<u8>> {
        let mut out = marshal_type(&self.t);
        out.extend_from_slice(&encode_value(&self.t, &self.v)?);
        Ok(out)
    }

    pub fn to_json(&self) -> BridgeResult<Value> {
        Ok(json!({
            "t": self.t.to_json(),
            "v": value_to_json(&self.t, &self.v)?,
        }))
    }

    pub fn from_json(json: &Value) -> BridgeResult<Self> {
        let t = PackType::from_json(
            json.get("t")
                .ok_or_else(|| BridgeError::decoding("typed value", "missing `t`"))?,
        )?;
        let v = value_from_json(
            &t,
            json.get("v")
                .ok_or_else(|| BridgeError::decoding("typed value", "missing `v`"))?,
        )?;
        Ok(Self { t, v })
    }

    /// Renders a struct value as the `[{type, name, value}]` argument list.
    pub fn to_args(&self) -> BridgeResult<Vec<Arg>> {
        let (PackType::Struct(fields), PackValue::Struct(values)) = (&self.t, &self.v) else {
            return Err(BridgeError::encoding(
                "args",
                self.t.tag(),
                "only struct values can be rendered as arguments",
            ));
        };
        fields
            .iter()
            .zip(values)
            .map(|(def, (name, value))| {
                Ok(Arg {
                    ty: def.ty.tag(),
                    name: name.clone(),
                    value: value_to_json(&def.ty, value)?,
                })
            })
            .collect()
    }

    /// Parses an argument list back into a struct value.
    pub fn from_args(args: &[Arg]) -> BridgeResult<Self> {
        let mut fields = Vec::with_capacity(args.len());
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let ty = arg_type(&arg.ty).map_err(|e| arg.unmarshal_error(e))?;
            let value = value_from_json_named(&arg.name, &ty, &arg.value)
                .map_err(|e| arg.unmarshal_error(e))?;
            fields.push(PackField::new(arg.name.clone(), ty));
            values.push((arg.name.clone(), value));
        }
        Self::new(PackType::Struct(fields), PackValue::Struct(values))
    }
}

/// Legacy argument tags also accept `bN` widths the struct schema does not
/// name.
fn arg_type(tag: &str) -> BridgeResult<PackType> {
    if let Ok(ty) = PackType::from_tag(tag) {
        return Ok(ty);
    }
    if tag.starts_with('b') && tag[1..].chars().all(|c| c.is_ascii_digit()) {
        return Ok(PackType::Primitive(PackPrimitive::Bytes));
    }
    Err(BridgeError::decoding(tag, "unrecognized type tag"))
}

impl Serialize for TypedPackValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TypedPackValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        TypedPackValue::from_json(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
    pub value: Value,
}

impl Arg {
    fn unmarshal_error(&self, err: BridgeError) -> BridgeError {
        BridgeError::decoding(
            self.ty.clone(),
            format!(
                "unable to unmarshal {} of type {} from RenVM: {} - {}",
                self.name, self.ty, self.value, err
            ),
        )
    }
}
