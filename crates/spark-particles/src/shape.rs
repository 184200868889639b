//! Emission shapes: where particles spawn and which way they head
//!
//! A shape is split into sub-surfaces (triangles for [`TriangleMesh`]). Each
//! spawn selects one, samples a point on it and derives a direction from its
//! orientation. Static particles re-select their recorded sub-surface every
//! frame, so a shape can animate underneath them.

use crate::rand::ParticleRng;
use serde::{Deserialize, Serialize};
use spark_core::{Result, SparkError, Vec3};

/// How the next sub-surface is chosen on spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    Random,
    Sequential,
    /// Sequential, visiting every other sub-surface
    SequentialSkip,
}

/// Which point of the selected sub-surface particles spawn at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionPoint {
    #[default]
    Center,
    EdgeTop,
    EdgeBottom,
}

/// Initial particle direction relative to the selected sub-surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionType {
    Normal,
    NormalNegate,
    #[default]
    Random,
    RandomTangent,
}

/// Sampling contract consumed by the emitter
pub trait EmitterShape: std::fmt::Debug {
    /// Number of independently selectable sub-surfaces
    fn subsurface_count(&self) -> usize;

    /// Advance the selection cursor according to `policy`
    fn select_next(&mut self, policy: SelectionPolicy, rng: &mut ParticleRng);

    /// Select a specific sub-surface; ids past the end wrap around
    fn select(&mut self, id: usize);

    fn current_subsurface(&self) -> usize;

    /// Deterministic spawn point on the current sub-surface
    fn translation(&self, point: EmissionPoint) -> Vec3;

    /// Jitter within the current sub-surface, relative to its center
    fn random_offset(&self, rng: &mut ParticleRng) -> Vec3;

    /// Unit direction for the current sub-surface
    fn direction(&self, direction_type: DirectionType, rng: &mut ParticleRng) -> Vec3;

    /// Move the vertices of an animated shape. Topology is kept, so
    /// sub-surface ids stay valid.
    fn set_positions(&mut self, positions: Vec<Vec3>) -> Result<()>;
}

/// Triangle-soup emission shape
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    positions: Vec<Vec3>,
    triangles: Vec<[usize; 3]>,
    current: usize,
    cursor: usize,
}

impl TriangleMesh {
    /// Build from vertex positions and a triangle index list.
    pub fn new(positions: Vec<Vec3>, indices: &[u32]) -> Result<Self> {
        if indices.is_empty() || indices.len() % 3 != 0 {
            return Err(SparkError::InvalidConfig(format!(
                "shape index count must be a non-zero multiple of 3, got {}",
                indices.len()
            )));
        }
        let triangles = indices
            .chunks_exact(3)
            .map(|tri| [tri[0] as usize, tri[1] as usize, tri[2] as usize])
            .collect::<Vec<_>>();
        check_indices(&triangles, positions.len())?;

        Ok(Self {
            positions,
            triangles,
            current: 0,
            cursor: 0,
        })
    }

    /// A single degenerate triangle at the origin. Normal directions fall
    /// back to +Y.
    pub fn point() -> Self {
        Self {
            positions: vec![Vec3::ZERO; 3],
            triangles: vec![[0, 1, 2]],
            current: 0,
            cursor: 0,
        }
    }

    /// A `width` × `height` quad in the XZ plane facing +Y.
    pub fn quad(width: f32, height: f32) -> Self {
        let mut positions = Vec::with_capacity(4);
        let mut triangles = Vec::with_capacity(2);
        push_face(
            &mut positions,
            &mut triangles,
            Vec3::ZERO,
            Vec3::new(width * 0.5, 0.0, 0.0),
            Vec3::new(0.0, 0.0, height * 0.5),
        );
        Self {
            positions,
            triangles,
            current: 0,
            cursor: 0,
        }
    }

    /// An axis-aligned box with outward-facing triangles.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let (ex, ey, ez) = (half_extents.x, half_extents.y, half_extents.z);
        let x = Vec3::new(ex, 0.0, 0.0);
        let y = Vec3::new(0.0, ey, 0.0);
        let z = Vec3::new(0.0, 0.0, ez);

        let mut positions = Vec::with_capacity(24);
        let mut triangles = Vec::with_capacity(12);
        // (center, a, b) with b × a pointing outward
        let faces = [(y, x, z), (-y, z, x), (x, z, y), (-x, y, z), (z, y, x), (-z, x, y)];
        for (center, a, b) in faces {
            push_face(&mut positions, &mut triangles, center, a, b);
        }
        Self {
            positions,
            triangles,
            current: 0,
            cursor: 0,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    fn corners(&self) -> (Vec3, Vec3, Vec3) {
        let [a, b, c] = self.triangles[self.current];
        (self.positions[a], self.positions[b], self.positions[c])
    }

    fn centroid(&self) -> Vec3 {
        let (a, b, c) = self.corners();
        (a + b + c) * (1.0 / 3.0)
    }

    fn normal(&self) -> Vec3 {
        let (a, b, c) = self.corners();
        let n = (b - a).cross(&(c - a)).normalized();
        if n == Vec3::ZERO {
            Vec3::UP
        } else {
            n
        }
    }
}

impl EmitterShape for TriangleMesh {
    fn subsurface_count(&self) -> usize {
        self.triangles.len()
    }

    fn select_next(&mut self, policy: SelectionPolicy, rng: &mut ParticleRng) {
        let count = self.triangles.len();
        match policy {
            SelectionPolicy::Random => {
                self.current = rng.range_inclusive(0, count - 1);
            }
            SelectionPolicy::Sequential => {
                self.current = self.cursor;
                self.cursor = (self.cursor + 1) % count;
            }
            SelectionPolicy::SequentialSkip => {
                self.current = self.cursor;
                self.cursor += 2;
                if self.cursor >= count {
                    self.cursor = 0;
                }
            }
        }
    }

    fn select(&mut self, id: usize) {
        self.current = id % self.triangles.len();
    }

    fn current_subsurface(&self) -> usize {
        self.current
    }

    fn translation(&self, point: EmissionPoint) -> Vec3 {
        match point {
            EmissionPoint::Center => self.centroid(),
            EmissionPoint::EdgeTop | EmissionPoint::EdgeBottom => {
                let (a, b, _) = self.corners();
                (a + b) * 0.5
            }
        }
    }

    fn random_offset(&self, rng: &mut ParticleRng) -> Vec3 {
        let (a, b, c) = self.corners();
        let mut u = rng.next_f32();
        let mut v = rng.next_f32();
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        a + (b - a) * u + (c - a) * v - self.centroid()
    }

    fn direction(&self, direction_type: DirectionType, rng: &mut ParticleRng) -> Vec3 {
        match direction_type {
            DirectionType::Normal => self.normal(),
            DirectionType::NormalNegate => -self.normal(),
            DirectionType::Random => rng.random_direction(),
            DirectionType::RandomTangent => rng.random_tangent(self.normal()),
        }
    }

    fn set_positions(&mut self, positions: Vec<Vec3>) -> Result<()> {
        check_indices(&self.triangles, positions.len())?;
        self.positions = positions;
        Ok(())
    }
}

fn check_indices(triangles: &[[usize; 3]], vertex_count: usize) -> Result<()> {
    for &index in triangles.iter().flatten() {
        if index >= vertex_count {
            return Err(SparkError::index("shape vertex", index, vertex_count));
        }
    }
    Ok(())
}

fn push_face(
    positions: &mut Vec<Vec3>,
    triangles: &mut Vec<[usize; 3]>,
    center: Vec3,
    a: Vec3,
    b: Vec3,
) {
    let base = positions.len();
    positions.extend([center - a - b, center - a + b, center + a + b, center + a - b]);
    triangles.push([base, base + 1, base + 2]);
    triangles.push([base, base + 2, base + 3]);
}

/// Serializable shape description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDefinition {
    Point,
    Quad {
        width: f32,
        height: f32,
    },
    Cuboid {
        half_extents: [f32; 3],
    },
    Mesh {
        positions: Vec<[f32; 3]>,
        indices: Vec<u32>,
    },
}

impl ShapeDefinition {
    pub fn build(&self) -> Result<TriangleMesh> {
        match self {
            ShapeDefinition::Point => Ok(TriangleMesh::point()),
            ShapeDefinition::Quad { width, height } => Ok(TriangleMesh::quad(*width, *height)),
            ShapeDefinition::Cuboid { half_extents } => {
                Ok(TriangleMesh::cuboid(Vec3::from_array(*half_extents)))
            }
            ShapeDefinition::Mesh { positions, indices } => TriangleMesh::new(
                positions.iter().copied().map(Vec3::from_array).collect(),
                indices,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_rejects_bad_indices() {
        let positions = vec![Vec3::ZERO, Vec3::UP, Vec3::RIGHT];
        assert!(TriangleMesh::new(positions.clone(), &[0, 1]).is_err());
        assert!(matches!(
            TriangleMesh::new(positions.clone(), &[0, 1, 3]),
            Err(SparkError::IndexOutOfRange { index: 3, len: 3, .. })
        ));
        assert!(TriangleMesh::new(positions, &[0, 1, 2]).is_ok());
    }

    #[test]
    fn quad_faces_up() {
        let mut quad = TriangleMesh::quad(2.0, 2.0);
        let mut rng = ParticleRng::new(1);
        assert_eq!(quad.subsurface_count(), 2);
        for id in 0..2 {
            quad.select(id);
            let n = quad.direction(DirectionType::Normal, &mut rng);
            assert!((n.y - 1.0).abs() < 1e-6);
            let neg = quad.direction(DirectionType::NormalNegate, &mut rng);
            assert!((neg.y + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn cuboid_normals_point_outward() {
        let mut cube = TriangleMesh::cuboid(Vec3::new(1.0, 2.0, 3.0));
        let mut rng = ParticleRng::new(1);
        assert_eq!(cube.subsurface_count(), 12);
        for id in 0..12 {
            cube.select(id);
            let center = cube.translation(EmissionPoint::Center);
            let n = cube.direction(DirectionType::Normal, &mut rng);
            assert!(center.dot(&n) > 0.0, "triangle {id} faces inward");
        }
    }

    #[test]
    fn sequential_selection_wraps() {
        let mut cube = TriangleMesh::cuboid(Vec3::ONE);
        let mut rng = ParticleRng::new(1);
        let seen: Vec<usize> = (0..14)
            .map(|_| {
                cube.select_next(SelectionPolicy::Sequential, &mut rng);
                cube.current_subsurface()
            })
            .collect();
        assert_eq!(&seen[..3], &[0, 1, 2]);
        assert_eq!(&seen[12..], &[0, 1]);
    }

    #[test]
    fn sequential_skip_visits_every_other() {
        let mut cube = TriangleMesh::cuboid(Vec3::ONE);
        let mut rng = ParticleRng::new(1);
        let seen: Vec<usize> = (0..7)
            .map(|_| {
                cube.select_next(SelectionPolicy::SequentialSkip, &mut rng);
                cube.current_subsurface()
            })
            .collect();
        assert_eq!(seen, vec![0, 2, 4, 6, 8, 10, 0]);
    }

    #[test]
    fn random_selection_stays_in_range() {
        let mut cube = TriangleMesh::cuboid(Vec3::ONE);
        let mut rng = ParticleRng::new(5);
        for _ in 0..200 {
            cube.select_next(SelectionPolicy::Random, &mut rng);
            assert!(cube.current_subsurface() < 12);
        }
    }

    #[test]
    fn random_offset_stays_on_triangle_plane() {
        let quad = TriangleMesh::quad(4.0, 4.0);
        let mut rng = ParticleRng::new(9);
        for _ in 0..100 {
            let offset = quad.random_offset(&mut rng);
            let p = quad.translation(EmissionPoint::Center) + offset;
            assert!(p.y.abs() < 1e-6);
            assert!(p.x.abs() <= 2.0 + 1e-5 && p.z.abs() <= 2.0 + 1e-5);
        }
    }

    #[test]
    fn point_shape_falls_back_to_up() {
        let point = TriangleMesh::point();
        let mut rng = ParticleRng::new(1);
        assert_eq!(point.translation(EmissionPoint::Center), Vec3::ZERO);
        assert_eq!(point.direction(DirectionType::Normal, &mut rng), Vec3::UP);
    }

    #[test]
    fn select_wraps_out_of_range_ids() {
        let mut quad = TriangleMesh::quad(1.0, 1.0);
        quad.select(5);
        assert_eq!(quad.current_subsurface(), 1);
    }

    #[test]
    fn definition_from_toml() {
        let def: ShapeDefinition = toml::from_str(
            r#"
type = "mesh"
positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]
indices = [0, 1, 2]
"#,
        )
        .unwrap();
        let mesh = def.build().unwrap();
        assert_eq!(mesh.subsurface_count(), 1);
        assert_eq!(mesh.positions().len(), 3);
    }

    #[test]
    fn moved_vertices_keep_topology() {
        let mut quad = TriangleMesh::quad(2.0, 2.0);
        let shifted: Vec<Vec3> = quad
            .positions()
            .iter()
            .map(|&p| p + Vec3::new(0.0, 3.0, 0.0))
            .collect();
        assert!(quad.set_positions(shifted[..3].to_vec()).is_err());
        assert_eq!(quad.positions()[0].y, 0.0);

        quad.set_positions(shifted).unwrap();
        quad.select(1);
        assert!((quad.translation(EmissionPoint::Center).y - 3.0).abs() < 1e-6);
    }
}
