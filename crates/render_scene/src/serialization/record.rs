//! Named-field component records
//!
//! A record is an ordered list of `(name, value)` pairs written by one
//! component's serializer and read back in the same order. Reading checks each
//! field name so a record from another component kind fails loudly instead of
//! being misread.

use super::{Result, SerializationError};
use crate::ecs::{entity_from_i32, entity_to_i32, Entity};
use crate::foundation::math::{Quat, Quaternion, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// One typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Boolean
    Bool(bool),
    /// Signed integer
    I32(i32),
    /// Unsigned integer
    U32(u32),
    /// 64-bit unsigned integer (masks, GUIDs)
    U64(u64),
    /// Float
    F32(f32),
    /// String or resource path
    Str(String),
    /// Vector
    Vec3([f32; 3]),
    /// 4-vector
    Vec4([f32; 4]),
    /// Rotation as x, y, z, w
    Quat([f32; 4]),
    /// Optional entity, -1 for none
    Entity(i32),
}

impl PropertyValue {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::Str(_) => "string",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Quat(_) => "quat",
            Self::Entity(_) => "entity",
        }
    }
}

/// Serialized state of one component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Component kind name
    pub component: String,
    /// Fields in write order
    pub fields: Vec<(String, PropertyValue)>,
}

impl ComponentRecord {
    /// Empty record for a component kind
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            fields: Vec::new(),
        }
    }

    fn push(&mut self, name: &str, value: PropertyValue) {
        self.fields.push((name.to_string(), value));
    }

    /// Append a bool
    pub fn write_bool(&mut self, name: &str, value: bool) {
        self.push(name, PropertyValue::Bool(value));
    }

    /// Append an i32
    pub fn write_i32(&mut self, name: &str, value: i32) {
        self.push(name, PropertyValue::I32(value));
    }

    /// Append a u32
    pub fn write_u32(&mut self, name: &str, value: u32) {
        self.push(name, PropertyValue::U32(value));
    }

    /// Append a u64
    pub fn write_u64(&mut self, name: &str, value: u64) {
        self.push(name, PropertyValue::U64(value));
    }

    /// Append an f32
    pub fn write_f32(&mut self, name: &str, value: f32) {
        self.push(name, PropertyValue::F32(value));
    }

    /// Append a string
    pub fn write_str(&mut self, name: &str, value: &str) {
        self.push(name, PropertyValue::Str(value.to_string()));
    }

    /// Append a vector
    pub fn write_vec3(&mut self, name: &str, value: &Vec3) {
        self.push(name, PropertyValue::Vec3([value.x, value.y, value.z]));
    }

    /// Append a 4-vector
    pub fn write_vec4(&mut self, name: &str, value: &Vec4) {
        self.push(name, PropertyValue::Vec4([value.x, value.y, value.z, value.w]));
    }

    /// Append a rotation
    pub fn write_quat(&mut self, name: &str, value: &Quat) {
        let q = value.quaternion();
        self.push(name, PropertyValue::Quat([q.i, q.j, q.k, q.w]));
    }

    /// Append an optional entity
    pub fn write_entity(&mut self, name: &str, value: Option<Entity>) {
        self.push(name, PropertyValue::Entity(entity_to_i32(value)));
    }

    /// Sequential reader over the fields
    pub const fn reader(&self) -> RecordReader<'_> {
        RecordReader { record: self, cursor: 0 }
    }

    /// Pretty RON text, for clipboard and undo storage
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SerializationError::Text(e.to_string()))
    }

    /// Parse RON text written by [`Self::to_ron`]
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| SerializationError::Text(e.to_string()))
    }
}

/// Reads a [`ComponentRecord`] field by field
pub struct RecordReader<'a> {
    record: &'a ComponentRecord,
    cursor: usize,
}

macro_rules! read_scalar {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Read the next field as `", stringify!($ty), "`")]
        pub fn $fn_name(&mut self, name: &str) -> Result<$ty> {
            match self.next(name)? {
                PropertyValue::$variant(value) => Ok(value.clone()),
                other => Err(Self::type_mismatch(name, stringify!($variant), other)),
            }
        }
    };
}

impl<'a> RecordReader<'a> {
    fn next(&mut self, name: &str) -> Result<&'a PropertyValue> {
        let Some((field_name, value)) = self.record.fields.get(self.cursor) else {
            return Err(SerializationError::CorruptData(format!(
                "{}: missing field {name}",
                self.record.component
            )));
        };
        if field_name != name {
            return Err(SerializationError::CorruptData(format!(
                "{}: expected field {name}, found {field_name}",
                self.record.component
            )));
        }
        self.cursor += 1;
        Ok(value)
    }

    fn type_mismatch(name: &str, expected: &str, found: &PropertyValue) -> SerializationError {
        SerializationError::CorruptData(format!(
            "field {name}: expected {expected}, found {}",
            found.type_name()
        ))
    }

    read_scalar!(read_bool, Bool, bool);
    read_scalar!(read_i32, I32, i32);
    read_scalar!(read_u32, U32, u32);
    read_scalar!(read_u64, U64, u64);
    read_scalar!(read_f32, F32, f32);
    read_scalar!(read_string, Str, String);

    /// Read the next field as a vector
    pub fn read_vec3(&mut self, name: &str) -> Result<Vec3> {
        match self.next(name)? {
            PropertyValue::Vec3([x, y, z]) => Ok(Vec3::new(*x, *y, *z)),
            other => Err(Self::type_mismatch(name, "vec3", other)),
        }
    }

    /// Read the next field as a 4-vector
    pub fn read_vec4(&mut self, name: &str) -> Result<Vec4> {
        match self.next(name)? {
            PropertyValue::Vec4([x, y, z, w]) => Ok(Vec4::new(*x, *y, *z, *w)),
            other => Err(Self::type_mismatch(name, "vec4", other)),
        }
    }

    /// Read the next field as a rotation
    pub fn read_quat(&mut self, name: &str) -> Result<Quat> {
        match self.next(name)? {
            PropertyValue::Quat([x, y, z, w]) => Ok(Quat::new_unchecked(Quaternion::new(*w, *x, *y, *z))),
            other => Err(Self::type_mismatch(name, "quat", other)),
        }
    }

    /// Read the next field as an optional entity
    pub fn read_entity(&mut self, name: &str) -> Result<Option<Entity>> {
        match self.next(name)? {
            PropertyValue::Entity(value) => Ok(entity_from_i32(*value)),
            other => Err(Self::type_mismatch(name, "entity", other)),
        }
    }

    /// Read an array length written with `write_i32`
    pub fn read_count(&mut self, name: &str) -> Result<usize> {
        let count = self.read_i32(name)?;
        usize::try_from(count).map_err(|_| SerializationError::CorruptData(format!("field {name}: negative count")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_like() -> ComponentRecord {
        let mut record = ComponentRecord::new("camera");
        record.write_f32("far", 100.0);
        record.write_bool("is_ortho", true);
        record.write_str("slot", "main");
        record.write_entity("parent", None);
        record
    }

    #[test]
    fn test_fields_read_back_in_order() {
        let record = camera_like();
        let mut reader = record.reader();
        assert_eq!(reader.read_f32("far").unwrap(), 100.0);
        assert!(reader.read_bool("is_ortho").unwrap());
        assert_eq!(reader.read_string("slot").unwrap(), "main");
        assert_eq!(reader.read_entity("parent").unwrap(), None);
        assert!(reader.read_f32("near").is_err());
    }

    #[test]
    fn test_name_and_type_mismatch_are_errors() {
        let record = camera_like();
        assert!(record.reader().read_f32("near").is_err());
        assert!(record.reader().read_i32("far").is_err());
    }

    #[test]
    fn test_ron_text_round_trip() {
        let record = camera_like();
        let text = record.to_ron().unwrap();
        assert!(text.contains("is_ortho"));
        assert_eq!(ComponentRecord::from_ron(&text).unwrap(), record);
    }
}
