use crate::error::StoreError;
use serde::Serialize;
use serde::ser;
use std::fmt;

/// Encodes an opaque payload for its text column.
///
/// `serde_json` writes NaN and infinities as `null`, so those are refused
/// here instead of being stored as something the caller never wrote.
pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    value.serialize(FiniteCheck)?;
    Ok(serde_json::to_string(value)?)
}

impl ser::Error for StoreError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        StoreError::InvalidPayload(msg.to_string())
    }
}

/// Walks a value without producing output, failing on non-finite floats.
#[derive(Clone, Copy)]
struct FiniteCheck;

fn check_float(value: f64) -> Result<(), StoreError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(StoreError::InvalidPayload(format!(
            "{value} has no JSON representation"
        )))
    }
}

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = StoreError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_i8(self, _v: i8) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_i16(self, _v: i16) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_i32(self, _v: i32) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_i64(self, _v: i64) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_i128(self, _v: i128) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_u8(self, _v: u8) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_u16(self, _v: u16) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_u32(self, _v: u32) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_u64(self, _v: u64) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_u128(self, _v: u128) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> Result<(), StoreError> {
        check_float(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Result<(), StoreError> {
        check_float(v)
    }
    fn serialize_char(self, _v: char) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_str(self, _v: &str) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_bytes(self, _v: &[u8]) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_none(self) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), StoreError> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), StoreError> {
        Ok(())
    }
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        value.serialize(self)
    }
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, StoreError> {
        Ok(self)
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self, StoreError> {
        Ok(self)
    }
    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self, StoreError> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, StoreError> {
        Ok(self)
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self, StoreError> {
        Ok(self)
    }
    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, StoreError> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, StoreError> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = StoreError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), StoreError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = StoreError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), StoreError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = StoreError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), StoreError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = StoreError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), StoreError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = StoreError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), StoreError> {
        key.serialize(*self)
    }
    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), StoreError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = StoreError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = StoreError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), StoreError> {
        Ok(())
    }
}
