//! Geometric object payloads.

use crate::util::{Box3d, DVec3, Error, Result};

/// Object stored at a scene location.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneObject {
    /// Implicit sphere centred at the origin.
    Sphere { radius: f64 },
    /// Point cloud.
    Points { positions: Vec<DVec3> },
    /// Polygon mesh with per-face vertex counts.
    Mesh {
        vertices_per_face: Vec<u32>,
        vertex_ids: Vec<u32>,
        positions: Vec<DVec3>,
    },
}

impl SceneObject {
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    pub fn points(positions: Vec<DVec3>) -> Self {
        Self::Points { positions }
    }

    /// Build a mesh, checking that the topology matches the point count.
    pub fn mesh(vertices_per_face: Vec<u32>, vertex_ids: Vec<u32>, positions: Vec<DVec3>) -> Result<Self> {
        let expected: u64 = vertices_per_face.iter().map(|&n| n as u64).sum();
        if expected != vertex_ids.len() as u64 {
            return Err(Error::invalid_argument(format!(
                "mesh faces reference {} vertices but {} ids were given",
                expected,
                vertex_ids.len()
            )));
        }
        if let Some(&bad) = vertex_ids.iter().find(|&&id| id as usize >= positions.len()) {
            return Err(Error::invalid_argument(format!(
                "vertex id {} out of range for {} points",
                bad,
                positions.len()
            )));
        }
        Ok(Self::Mesh {
            vertices_per_face,
            vertex_ids,
            positions,
        })
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Sphere { .. } => "SpherePrimitive",
            Self::Points { .. } => "PointsPrimitive",
            Self::Mesh { .. } => "MeshPrimitive",
        }
    }

    /// Object-space bound.
    pub fn bound(&self) -> Box3d {
        match self {
            Self::Sphere { radius } => {
                let r = radius.abs();
                Box3d::new(DVec3::splat(-r), DVec3::splat(r))
            }
            Self::Points { positions } | Self::Mesh { positions, .. } => {
                let mut b = Box3d::EMPTY;
                for p in positions {
                    b.expand_by_point(*p);
                }
                b
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_bound() {
        let b = SceneObject::sphere(2.0).bound();
        assert_eq!(b, Box3d::new(DVec3::splat(-2.0), DVec3::splat(2.0)));
    }

    #[test]
    fn test_points_bound() {
        let obj = SceneObject::points(vec![DVec3::new(1.0, 2.0, 3.0), DVec3::new(-1.0, 0.0, 5.0)]);
        assert_eq!(obj.bound(), Box3d::new(DVec3::new(-1.0, 0.0, 3.0), DVec3::new(1.0, 2.0, 5.0)));
        assert!(SceneObject::points(Vec::new()).bound().is_empty());
    }

    #[test]
    fn test_mesh_validation() {
        let positions = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
        assert!(SceneObject::mesh(vec![3], vec![0, 1, 2], positions.clone()).is_ok());
        assert!(SceneObject::mesh(vec![4], vec![0, 1, 2], positions.clone()).is_err());
        assert!(SceneObject::mesh(vec![3], vec![0, 1, 7], positions).is_err());
    }
}
