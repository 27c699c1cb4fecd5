//! Binary codec for values, objects, time lists and name lists.
//!
//! Every encoded value starts with a one-byte type tag followed by its
//! little-endian payload. Containers (vectors, compounds) carry a `u32`
//! element count; strings carry a `u32` byte length.

use std::collections::BTreeMap;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{SceneObject, Value};
use crate::util::{Box3d, DMat4, DVec3, Error, Result};

const TAG_BOOL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_DOUBLE: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_V3D: u8 = 4;
const TAG_M44D: u8 = 5;
const TAG_BOX3D: u8 = 6;
const TAG_STRING_VECTOR: u8 = 7;
const TAG_PATH_VECTOR: u8 = 8;
const TAG_DOUBLE_VECTOR: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_OBJECT: u8 = 11;

const OBJECT_SPHERE: u8 = 0;
const OBJECT_POINTS: u8 = 1;
const OBJECT_MESH: u8 = 2;

// ============================================================================
// Encoding
// ============================================================================

#[inline]
fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[inline]
fn push_f64(buf: &mut Vec<u8>, value: f64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_f64s(buf: &mut Vec<u8>, values: &[f64]) {
    for &v in values {
        push_f64(buf, v);
    }
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    push_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

fn push_strings(buf: &mut Vec<u8>, strings: &[String]) {
    push_u32(buf, strings.len() as u32);
    for s in strings {
        push_str(buf, s);
    }
}

fn push_points(buf: &mut Vec<u8>, points: &[DVec3]) {
    push_u32(buf, points.len() as u32);
    push_f64s(buf, bytemuck::cast_slice(points));
}

fn push_u32s(buf: &mut Vec<u8>, values: &[u32]) {
    push_u32(buf, values.len() as u32);
    for &v in values {
        push_u32(buf, v);
    }
}

fn push_object(buf: &mut Vec<u8>, obj: &SceneObject) {
    match obj {
        SceneObject::Sphere { radius } => {
            buf.push(OBJECT_SPHERE);
            push_f64(buf, *radius);
        }
        SceneObject::Points { positions } => {
            buf.push(OBJECT_POINTS);
            push_points(buf, positions);
        }
        SceneObject::Mesh {
            vertices_per_face,
            vertex_ids,
            positions,
        } => {
            buf.push(OBJECT_MESH);
            push_u32s(buf, vertices_per_face);
            push_u32s(buf, vertex_ids);
            push_points(buf, positions);
        }
    }
}

fn push_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Bool(v) => {
            buf.push(TAG_BOOL);
            buf.push(*v as u8);
        }
        Value::Int(v) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Value::Double(v) => {
            buf.push(TAG_DOUBLE);
            push_f64(buf, *v);
        }
        Value::String(s) => {
            buf.push(TAG_STRING);
            push_str(buf, s);
        }
        Value::V3d(v) => {
            buf.push(TAG_V3D);
            push_f64s(buf, &v.to_array());
        }
        Value::M44d(m) => {
            buf.push(TAG_M44D);
            push_f64s(buf, &m.to_cols_array());
        }
        Value::Box3d(b) => {
            buf.push(TAG_BOX3D);
            push_f64s(buf, bytemuck::cast_slice(std::slice::from_ref(b)));
        }
        Value::StringVector(v) => {
            buf.push(TAG_STRING_VECTOR);
            push_strings(buf, v);
        }
        Value::PathVector(v) => {
            buf.push(TAG_PATH_VECTOR);
            push_strings(buf, v);
        }
        Value::DoubleVector(v) => {
            buf.push(TAG_DOUBLE_VECTOR);
            push_u32(buf, v.len() as u32);
            push_f64s(buf, v);
        }
        Value::Compound(map) => {
            buf.push(TAG_COMPOUND);
            push_u32(buf, map.len() as u32);
            for (name, v) in map {
                push_str(buf, name);
                push_value(buf, v);
            }
        }
        Value::Object(obj) => {
            buf.push(TAG_OBJECT);
            push_object(buf, obj);
        }
    }
}

/// Encode a value into a self-describing blob.
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    push_value(&mut buf, value);
    buf
}

/// Encode an ascending list of sample times.
pub fn encode_times(times: &[f64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + times.len() * 8);
    push_u32(&mut buf, times.len() as u32);
    push_f64s(&mut buf, times);
    buf
}

/// Encode a list of names (tags, path segments).
pub fn encode_names(names: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    push_strings(&mut buf, names);
    buf
}

// ============================================================================
// Decoding
// ============================================================================

struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buf),
        }
    }

    fn truncated(&self) -> Error {
        Error::invalid(format!("value blob truncated at byte {}", self.cursor.position()))
    }

    fn finish(&self) -> Result<()> {
        let len = self.cursor.get_ref().len() as u64;
        if self.cursor.position() != len {
            return Err(Error::invalid(format!(
                "{} trailing bytes after value",
                len - self.cursor.position()
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| self.truncated())
    }

    fn u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(|_| self.truncated())
    }

    fn i64(&mut self) -> Result<i64> {
        self.cursor.read_i64::<LittleEndian>().map_err(|_| self.truncated())
    }

    fn f64(&mut self) -> Result<f64> {
        self.cursor.read_f64::<LittleEndian>().map_err(|_| self.truncated())
    }

    /// Element count, checked against the bytes left so corrupt counts fail
    /// before allocating.
    fn count(&mut self, min_element_size: usize) -> Result<usize> {
        let n = self.u32()? as usize;
        let remaining = self.cursor.get_ref().len() - self.cursor.position() as usize;
        if n.saturating_mul(min_element_size) > remaining {
            return Err(self.truncated());
        }
        Ok(n)
    }

    fn f64s(&mut self, n: usize) -> Result<Vec<f64>> {
        (0..n).map(|_| self.f64()).collect()
    }

    fn string(&mut self) -> Result<String> {
        let len = self.count(1)?;
        let start = self.cursor.position() as usize;
        let bytes = self.cursor.get_ref()[start..start + len].to_vec();
        self.cursor.set_position((start + len) as u64);
        Ok(String::from_utf8(bytes)?)
    }

    fn strings(&mut self) -> Result<Vec<String>> {
        let n = self.count(4)?;
        (0..n).map(|_| self.string()).collect()
    }

    fn u32s(&mut self) -> Result<Vec<u32>> {
        let n = self.count(4)?;
        (0..n).map(|_| self.u32()).collect()
    }

    fn points(&mut self) -> Result<Vec<DVec3>> {
        let n = self.count(24)?;
        let flat = self.f64s(n * 3)?;
        Ok(flat.chunks_exact(3).map(DVec3::from_slice).collect())
    }

    fn object(&mut self) -> Result<SceneObject> {
        match self.u8()? {
            OBJECT_SPHERE => Ok(SceneObject::Sphere { radius: self.f64()? }),
            OBJECT_POINTS => Ok(SceneObject::Points {
                positions: self.points()?,
            }),
            OBJECT_MESH => {
                let vertices_per_face = self.u32s()?;
                let vertex_ids = self.u32s()?;
                let positions = self.points()?;
                SceneObject::mesh(vertices_per_face, vertex_ids, positions)
                    .map_err(|e| Error::invalid(format!("stored mesh is malformed: {}", e)))
            }
            tag => Err(Error::invalid(format!("unknown object tag {}", tag))),
        }
    }

    fn value(&mut self) -> Result<Value> {
        let tag = self.u8()?;
        let value = match tag {
            TAG_BOOL => Value::Bool(self.u8()? != 0),
            TAG_INT => Value::Int(self.i64()?),
            TAG_DOUBLE => Value::Double(self.f64()?),
            TAG_STRING => Value::String(self.string()?),
            TAG_V3D => Value::V3d(DVec3::from_slice(&self.f64s(3)?)),
            TAG_M44D => Value::M44d(DMat4::from_cols_slice(&self.f64s(16)?)),
            TAG_BOX3D => {
                let c = self.f64s(6)?;
                Value::Box3d(Box3d::new(DVec3::from_slice(&c[0..3]), DVec3::from_slice(&c[3..6])))
            }
            TAG_STRING_VECTOR => Value::StringVector(self.strings()?),
            TAG_PATH_VECTOR => Value::PathVector(self.strings()?),
            TAG_DOUBLE_VECTOR => {
                let n = self.count(8)?;
                Value::DoubleVector(self.f64s(n)?)
            }
            TAG_COMPOUND => {
                let n = self.count(5)?;
                let mut map = BTreeMap::new();
                for _ in 0..n {
                    let name = self.string()?;
                    let v = self.value()?;
                    map.insert(name, v);
                }
                Value::Compound(map)
            }
            TAG_OBJECT => Value::Object(self.object()?),
            other => return Err(Error::invalid(format!("unknown value tag {}", other))),
        };
        Ok(value)
    }
}

/// Decode a blob written by [`encode_value`].
pub fn decode_value(buf: &[u8]) -> Result<Value> {
    let mut d = Decoder::new(buf);
    let value = d.value()?;
    d.finish()?;
    Ok(value)
}

/// Decode a list written by [`encode_times`], checking it ascends strictly.
pub fn decode_times(buf: &[u8]) -> Result<Vec<f64>> {
    let mut d = Decoder::new(buf);
    let n = d.count(8)?;
    let times = d.f64s(n)?;
    d.finish()?;
    if times.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::invalid("stored sample times are not ascending"));
    }
    Ok(times)
}

/// Decode a list written by [`encode_names`].
pub fn decode_names(buf: &[u8]) -> Result<Vec<String>> {
    let mut d = Decoder::new(buf);
    let names = d.strings()?;
    d.finish()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_with_nested_values() {
        let value = Value::compound([
            ("fileName", Value::from("a.scc")),
            ("root", Value::PathVector(vec!["A".into(), "B".into()])),
            ("time", Value::Double(10.0)),
            ("xform", Value::M44d(DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0)))),
        ]);
        assert_eq!(decode_value(&encode_value(&value)).unwrap(), value);
    }

    #[test]
    fn test_objects() {
        let mesh = SceneObject::mesh(
            vec![3],
            vec![0, 1, 2],
            vec![DVec3::ZERO, DVec3::X, DVec3::new(0.5, 1.0, -2.0)],
        )
        .unwrap();
        let value = Value::Object(mesh);
        assert_eq!(decode_value(&encode_value(&value)).unwrap(), value);

        let bound = Value::Box3d(Box3d::new(DVec3::splat(-1.0), DVec3::new(1.0, 2.0, 3.0)));
        assert_eq!(decode_value(&encode_value(&bound)).unwrap(), bound);
    }

    #[test]
    fn test_corrupt_blobs() {
        assert!(decode_value(&[]).is_err());
        assert!(decode_value(&[99]).is_err());
        assert!(decode_value(&[TAG_DOUBLE, 0, 0]).is_err());

        // Huge element count must not allocate
        let mut buf = vec![TAG_STRING_VECTOR];
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(decode_value(&buf).is_err());

        let mut trailing = encode_value(&Value::Bool(true));
        trailing.push(0);
        assert!(decode_value(&trailing).is_err());
    }

    #[test]
    fn test_times() {
        let times = vec![0.0, 0.5, 2.0];
        assert_eq!(decode_times(&encode_times(&times)).unwrap(), times);
        assert!(decode_times(&encode_times(&[1.0, 1.0])).is_err());
    }

    #[test]
    fn test_names() {
        let names = vec!["tags".to_string(), "test".to_string()];
        assert_eq!(decode_names(&encode_names(&names)).unwrap(), names);
    }
}
