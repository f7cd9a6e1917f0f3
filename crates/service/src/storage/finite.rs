//! Pre-encoding walk that rejects numbers JSON cannot represent.
//!
//! `serde_json` writes NaN and the infinities as `null`, which would store a
//! different value than the caller handed in. Values are walked once with a
//! serializer that produces nothing and fails on the first non-finite float.

use std::fmt::Display;

use serde::ser::{self, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum EncodeCheck {
    #[error("non-finite number {0} has no JSON representation")]
    NonFinite(f64),
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for EncodeCheck {
    fn custom<T: Display>(msg: T) -> Self {
        EncodeCheck::Custom(msg.to_string())
    }
}

/// Fails when `value` contains a NaN or infinite `f32`/`f64` anywhere.
pub(crate) fn ensure_finite<V: Serialize + ?Sized>(value: &V) -> Result<(), EncodeCheck> {
    value.serialize(FiniteCheck)
}

struct FiniteCheck;

type Checked = Result<(), EncodeCheck>;

impl Serializer for FiniteCheck {
    type Ok = ();
    type Error = EncodeCheck;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_f32(self, v: f32) -> Checked {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Checked {
        if v.is_finite() {
            Ok(())
        } else {
            Err(EncodeCheck::NonFinite(v))
        }
    }

    fn serialize_bool(self, _: bool) -> Checked { Ok(()) }
    fn serialize_i8(self, _: i8) -> Checked { Ok(()) }
    fn serialize_i16(self, _: i16) -> Checked { Ok(()) }
    fn serialize_i32(self, _: i32) -> Checked { Ok(()) }
    fn serialize_i64(self, _: i64) -> Checked { Ok(()) }
    fn serialize_i128(self, _: i128) -> Checked { Ok(()) }
    fn serialize_u8(self, _: u8) -> Checked { Ok(()) }
    fn serialize_u16(self, _: u16) -> Checked { Ok(()) }
    fn serialize_u32(self, _: u32) -> Checked { Ok(()) }
    fn serialize_u64(self, _: u64) -> Checked { Ok(()) }
    fn serialize_u128(self, _: u128) -> Checked { Ok(()) }
    fn serialize_char(self, _: char) -> Checked { Ok(()) }
    fn serialize_str(self, _: &str) -> Checked { Ok(()) }
    fn serialize_bytes(self, _: &[u8]) -> Checked { Ok(()) }
    fn serialize_none(self) -> Checked { Ok(()) }
    fn serialize_unit(self) -> Checked { Ok(()) }
    fn serialize_unit_struct(self, _: &'static str) -> Checked { Ok(()) }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _: &'static str, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self, EncodeCheck> { Ok(self) }
    fn serialize_tuple(self, _: usize) -> Result<Self, EncodeCheck> { Ok(self) }
    fn serialize_map(self, _: Option<usize>) -> Result<Self, EncodeCheck> { Ok(self) }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, EncodeCheck> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, EncodeCheck> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, EncodeCheck> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, EncodeCheck> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = EncodeCheck;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked { Ok(()) }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = EncodeCheck;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked { Ok(()) }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = EncodeCheck;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked { Ok(()) }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = EncodeCheck;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked { Ok(()) }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = EncodeCheck;
    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Checked {
        key.serialize(FiniteCheck)
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked { Ok(()) }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = EncodeCheck;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked { Ok(()) }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = EncodeCheck;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Checked {
        value.serialize(FiniteCheck)
    }
    fn end(self) -> Checked { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(serde::Serialize)]
    struct Sample {
        name: &'static str,
        weights: Vec<f32>,
        nested: Option<(u8, f64)>,
    }

    #[test]
    fn finite_values_pass_and_nested_nan_is_found() {
        let ok = Sample { name: "a", weights: vec![0.5, -1.0], nested: Some((1, 2.5)) };
        assert!(ensure_finite(&ok).is_ok());
        assert!(ensure_finite(&serde_json::json!({"a": [1.5, null]})).is_ok());

        let deep = Sample { name: "b", weights: vec![], nested: Some((1, f64::NAN)) };
        assert!(matches!(ensure_finite(&deep), Err(EncodeCheck::NonFinite(v)) if v.is_nan()));

        let mut map = BTreeMap::new();
        map.insert("w", vec![1.0_f32, f32::INFINITY]);
        assert!(matches!(ensure_finite(&map), Err(EncodeCheck::NonFinite(v)) if v == f64::INFINITY));
    }
}
