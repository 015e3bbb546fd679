//! Binary stream primitives
//!
//! ```text
//! scalars   little-endian, fixed width
//! bool      u8 (0 or 1)
//! string    u32 byte length + UTF-8 bytes
//! entity    i32, -1 for none
//! vec3/vec4 consecutive f32
//! quat      x, y, z, w as f32
//! ```

use super::{Result, SerializationError};
use crate::ecs::{entity_from_i32, entity_to_i32, Entity};
use crate::foundation::math::{Quat, Quaternion, Vec3, Vec4};
use std::io::{ErrorKind, Read, Write};

/// Longest string accepted when reading, guards against corrupt lengths
pub const MAX_STRING_LENGTH: u32 = 1 << 20;

/// Writes scene primitives to a byte sink
pub struct BinaryWriter<W: Write> {
    inner: W,
}

impl<W: Write> BinaryWriter<W> {
    /// Wrap a sink
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the sink
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write a byte
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_all(&[value])?;
        Ok(())
    }

    /// Write a bool as one byte
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    /// Write a u32
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Write an i32
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Write a u64
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Write an f32
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Write a section or array length
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| SerializationError::CorruptData(format!("count {count} does not fit in i32")))?;
        self.write_i32(count)
    }

    /// Write a length-prefixed UTF-8 string
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        let len = u32::try_from(value.len())
            .map_err(|_| SerializationError::CorruptData("string too long".to_string()))?;
        self.write_u32(len)?;
        self.inner.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Write an optional entity
    pub fn write_entity(&mut self, entity: Option<Entity>) -> Result<()> {
        self.write_i32(entity_to_i32(entity))
    }

    /// Write a vector
    pub fn write_vec3(&mut self, value: &Vec3) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    /// Write a 4-vector
    pub fn write_vec4(&mut self, value: &Vec4) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)?;
        self.write_f32(value.w)
    }

    /// Write a rotation
    pub fn write_quat(&mut self, value: &Quat) -> Result<()> {
        let q = value.quaternion();
        self.write_f32(q.i)?;
        self.write_f32(q.j)?;
        self.write_f32(q.k)?;
        self.write_f32(q.w)
    }
}

/// Reads scene primitives from a byte source
///
/// A source that ends early yields [`SerializationError::CorruptData`].
pub struct BinaryReader<R: Read> {
    inner: R,
}

impl<R: Read> BinaryReader<R> {
    /// Wrap a source
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => SerializationError::CorruptData("unexpected end of stream".to_string()),
            _ => SerializationError::Io(e),
        })?;
        Ok(buf)
    }

    /// Read a byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes::<1>()?[0])
    }

    /// Read a bool written as one byte
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerializationError::CorruptData(format!("invalid bool byte {other}"))),
        }
    }

    /// Read a u32
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_bytes()?))
    }

    /// Read an i32
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_bytes()?))
    }

    /// Read a u64
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_bytes()?))
    }

    /// Read an f32
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_bytes()?))
    }

    /// Read a section or array length; negative counts are corrupt
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| SerializationError::CorruptData(format!("negative count {count}")))
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()?;
        if len > MAX_STRING_LENGTH {
            return Err(SerializationError::CorruptData(format!("string length {len} too large")));
        }
        let mut bytes = vec![0u8; len as usize];
        self.inner.read_exact(&mut bytes).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => SerializationError::CorruptData("unexpected end of stream".to_string()),
            _ => SerializationError::Io(e),
        })?;
        String::from_utf8(bytes).map_err(|e| SerializationError::CorruptData(e.to_string()))
    }

    /// Read an optional entity
    pub fn read_entity(&mut self) -> Result<Option<Entity>> {
        let value = self.read_i32()?;
        if value < -1 {
            return Err(SerializationError::CorruptData(format!("invalid entity {value}")));
        }
        Ok(entity_from_i32(value))
    }

    /// Read an entity that must be present
    pub fn read_required_entity(&mut self) -> Result<Entity> {
        self.read_entity()?
            .ok_or_else(|| SerializationError::CorruptData("missing entity".to_string()))
    }

    /// Read a vector
    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read a 4-vector
    pub fn read_vec4(&mut self) -> Result<Vec4> {
        Ok(Vec4::new(self.read_f32()?, self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read a rotation
    pub fn read_quat(&mut self) -> Result<Quat> {
        let (x, y, z, w) = (self.read_f32()?, self.read_f32()?, self.read_f32()?, self.read_f32()?);
        Ok(Quat::new_unchecked(Quaternion::new(w, x, y, z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_primitives() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_count(3).unwrap();
        writer.write_str("models/tree.fbx").unwrap();
        writer.write_entity(None).unwrap();
        writer.write_bool(true).unwrap();
        writer.write_vec3(&Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[0..4], &3i32.to_le_bytes());

        let mut reader = BinaryReader::new(bytes.as_slice());
        assert_eq!(reader.read_count().unwrap(), 3);
        assert_eq!(reader.read_string().unwrap(), "models/tree.fbx");
        assert_eq!(reader.read_entity().unwrap(), None);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_vec3().unwrap(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_str("materials/grass.mat").unwrap();
        let bytes = writer.into_inner();

        let mut reader = BinaryReader::new(&bytes[..bytes.len() - 3]);
        assert!(matches!(reader.read_string(), Err(SerializationError::CorruptData(_))));

        let mut empty = BinaryReader::new(&[][..]);
        assert!(matches!(empty.read_i32(), Err(SerializationError::CorruptData(_))));
    }

    #[test]
    fn test_negative_count_is_corrupt() {
        let bytes = (-5i32).to_le_bytes();
        let mut reader = BinaryReader::new(&bytes[..]);
        assert!(matches!(reader.read_count(), Err(SerializationError::CorruptData(_))));
    }
}
