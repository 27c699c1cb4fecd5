//! Typed sample values.

use std::collections::BTreeMap;

use super::SceneObject;
use crate::util::{lerp_matrix, Box3d, DMat4, DVec3, Error, Result};

/// A typed sample stored in a channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    V3d(DVec3),
    M44d(DMat4),
    Box3d(Box3d),
    StringVector(Vec<String>),
    /// Ordered list of path segments.
    PathVector(Vec<String>),
    DoubleVector(Vec<f64>),
    Compound(BTreeMap<String, Value>),
    Object(SceneObject),
}

impl Value {
    /// Build a compound value from `(name, value)` pairs.
    pub fn compound<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Compound(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "BoolData",
            Self::Int(_) => "IntData",
            Self::Double(_) => "DoubleData",
            Self::String(_) => "StringData",
            Self::V3d(_) => "V3dData",
            Self::M44d(_) => "M44dData",
            Self::Box3d(_) => "Box3dData",
            Self::StringVector(_) => "StringVectorData",
            Self::PathVector(_) => "InternedStringVectorData",
            Self::DoubleVector(_) => "DoubleVectorData",
            Self::Compound(_) => "CompoundData",
            Self::Object(obj) => obj.type_name(),
        }
    }

    /// Blend two samples of one channel.
    ///
    /// Numeric values of the same type blend linearly; everything else
    /// (and mismatched pairs) holds the nearest sample.
    pub fn interpolate(a: &Value, b: &Value, alpha: f64) -> Value {
        match (a, b) {
            (Self::Double(x), Self::Double(y)) => Self::Double(x + (y - x) * alpha),
            (Self::V3d(x), Self::V3d(y)) => Self::V3d(x.lerp(*y, alpha)),
            (Self::M44d(x), Self::M44d(y)) => Self::M44d(lerp_matrix(x, y, alpha)),
            (Self::Box3d(x), Self::Box3d(y)) => Self::Box3d(x.lerp(y, alpha)),
            (Self::DoubleVector(x), Self::DoubleVector(y)) if x.len() == y.len() => Self::DoubleVector(
                x.iter().zip(y).map(|(p, q)| p + (q - p) * alpha).collect(),
            ),
            _ => {
                if alpha < 0.5 {
                    a.clone()
                } else {
                    b.clone()
                }
            }
        }
    }

    pub fn as_box3d(&self) -> Result<Box3d> {
        match self {
            Self::Box3d(b) => Ok(*b),
            other => Err(Error::type_mismatch("Box3dData", other.type_name())),
        }
    }

    pub fn as_m44d(&self) -> Result<DMat4> {
        match self {
            Self::M44d(m) => Ok(*m),
            other => Err(Error::type_mismatch("M44dData", other.type_name())),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(Error::type_mismatch("StringData", other.type_name())),
        }
    }

    pub fn as_double(&self) -> Result<f64> {
        match self {
            Self::Double(d) => Ok(*d),
            other => Err(Error::type_mismatch("DoubleData", other.type_name())),
        }
    }

    pub fn as_compound(&self) -> Result<&BTreeMap<String, Value>> {
        match self {
            Self::Compound(c) => Ok(c),
            other => Err(Error::type_mismatch("CompoundData", other.type_name())),
        }
    }

    pub fn into_object(self) -> Result<SceneObject> {
        match self {
            Self::Object(obj) => Ok(obj),
            other => Err(Error::type_mismatch("Object", other.type_name())),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DVec3> for Value {
    fn from(v: DVec3) -> Self {
        Self::V3d(v)
    }
}

impl From<DMat4> for Value {
    fn from(v: DMat4) -> Self {
        Self::M44d(v)
    }
}

impl From<Box3d> for Value {
    fn from(v: Box3d) -> Self {
        Self::Box3d(v)
    }
}

impl From<SceneObject> for Value {
    fn from(v: SceneObject) -> Self {
        Self::Object(v)
    }
}
