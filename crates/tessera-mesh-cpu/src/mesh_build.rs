use tessera_geom::{Vec2, Vec3};

/// Per-vertex normals of a finished mesh.
#[derive(Clone, Debug, PartialEq)]
pub enum Normals {
    /// Smooth normals that already account for the neighbouring chunk via the border ring.
    Baked(Vec<Vec3>),
    /// Flat-shaded output; every triangle owns its vertices, so normals follow from winding.
    RecomputeOnLoad,
}

/// Finished terrain mesh, ready to be handed to a renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshBuildResult {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub uvs: Vec<Vec2>,
    pub normals: Normals,
}

impl Default for MeshBuildResult {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            uvs: Vec::new(),
            normals: Normals::Baked(Vec::new()),
        }
    }
}

impl MeshBuildResult {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Flat index buffer, three entries per triangle.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.triangles.iter().flat_map(|t| t.iter().copied())
    }

    /// Baked normals if present, otherwise per-triangle face normals written to each corner.
    pub fn resolved_normals(&self) -> Vec<Vec3> {
        match &self.normals {
            Normals::Baked(n) => n.clone(),
            Normals::RecomputeOnLoad => self.flat_normals(),
        }
    }

    /// Face normal of each triangle written to its corners. Shared corners keep the last write.
    pub fn flat_normals(&self) -> Vec<Vec3> {
        let mut out = vec![Vec3::ZERO; self.vertices.len()];
        for tri in &self.triangles {
            let n = face_normal(
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            );
            for &i in tri {
                out[i as usize] = n;
            }
        }
        out
    }
}

#[inline]
pub(crate) fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalized()
}

/// Mesh under construction. Border vertices live in a side store addressed by negative
/// indices (`-1, -2, ...`); they shape normals but never reach the output.
#[derive(Default)]
pub(crate) struct MeshBuild {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<[i32; 3]>,
    border_vertices: Vec<Vec3>,
    border_triangles: Vec<[i32; 3]>,
}

impl MeshBuild {
    pub(crate) fn with_capacity(verts: usize, border_verts: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(verts),
            uvs: Vec::with_capacity(verts),
            triangles: Vec::with_capacity(verts * 2),
            border_vertices: Vec::with_capacity(border_verts),
            border_triangles: Vec::with_capacity(border_verts * 2),
        }
    }

    pub(crate) fn add_vertex(&mut self, index: i32, position: Vec3, uv: Vec2) {
        if index < 0 {
            let slot = (-index - 1) as usize;
            if self.border_vertices.len() <= slot {
                self.border_vertices.resize(slot + 1, Vec3::ZERO);
            }
            self.border_vertices[slot] = position;
        } else {
            let slot = index as usize;
            if self.vertices.len() <= slot {
                self.vertices.resize(slot + 1, Vec3::ZERO);
                self.uvs.resize(slot + 1, Vec2::ZERO);
            }
            self.vertices[slot] = position;
            self.uvs[slot] = uv;
        }
    }

    pub(crate) fn add_triangle(&mut self, a: i32, b: i32, c: i32) {
        if a < 0 || b < 0 || c < 0 {
            self.border_triangles.push([a, b, c]);
        } else {
            self.triangles.push([a, b, c]);
        }
    }

    #[inline]
    fn position(&self, index: i32) -> Vec3 {
        if index < 0 {
            self.border_vertices[(-index - 1) as usize]
        } else {
            self.vertices[index as usize]
        }
    }

    fn smooth_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        let mut accumulate = |tri: &[i32; 3]| {
            let n = face_normal(
                self.position(tri[0]),
                self.position(tri[1]),
                self.position(tri[2]),
            );
            for &i in tri {
                if i >= 0 {
                    normals[i as usize] += n;
                }
            }
        };
        self.triangles.iter().for_each(&mut accumulate);
        self.border_triangles.iter().for_each(&mut accumulate);
        for n in &mut normals {
            *n = n.normalized();
        }
        normals
    }

    // Duplicate every corner so no two triangles share a vertex.
    fn explode(self) -> MeshBuildResult {
        let mut vertices = Vec::with_capacity(self.triangles.len() * 3);
        let mut uvs = Vec::with_capacity(self.triangles.len() * 3);
        let mut triangles = Vec::with_capacity(self.triangles.len());
        for tri in &self.triangles {
            let base = vertices.len() as u32;
            for &i in tri {
                vertices.push(self.vertices[i as usize]);
                uvs.push(self.uvs[i as usize]);
            }
            triangles.push([base, base + 1, base + 2]);
        }
        MeshBuildResult {
            vertices,
            triangles,
            uvs,
            normals: Normals::RecomputeOnLoad,
        }
    }

    pub(crate) fn finish(self, flat_shaded: bool) -> MeshBuildResult {
        if flat_shaded {
            return self.explode();
        }
        let normals = self.smooth_normals();
        let triangles = self
            .triangles
            .iter()
            .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
            .collect();
        MeshBuildResult {
            vertices: self.vertices,
            triangles,
            uvs: self.uvs,
            normals: Normals::Baked(normals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_triangles_are_kept_out_of_the_output() {
        let mut b = MeshBuild::default();
        b.add_vertex(-1, Vec3::new(-1.0, 0.0, 0.0), Vec2::ZERO);
        b.add_vertex(0, Vec3::new(0.0, 0.0, 0.0), Vec2::ZERO);
        b.add_vertex(1, Vec3::new(1.0, 0.0, -1.0), Vec2::ONE);
        b.add_vertex(2, Vec3::new(0.0, 0.0, -1.0), Vec2::ONE);
        b.add_triangle(0, 1, 2);
        b.add_triangle(-1, 0, 2);
        let m = b.finish(false);
        assert_eq!(m.vertex_count(), 3);
        assert_eq!(m.triangles, vec![[0, 1, 2]]);
        match m.normals {
            Normals::Baked(n) => assert!(n.iter().all(|v| (v.y - 1.0).abs() < 1e-6)),
            Normals::RecomputeOnLoad => panic!("expected baked normals"),
        }
    }

    #[test]
    fn flat_shading_gives_each_triangle_its_own_corners() {
        let mut b = MeshBuild::default();
        b.add_vertex(0, Vec3::new(0.0, 0.0, 0.0), Vec2::ZERO);
        b.add_vertex(1, Vec3::new(1.0, 0.0, -1.0), Vec2::ONE);
        b.add_vertex(2, Vec3::new(0.0, 0.0, -1.0), Vec2::ZERO);
        b.add_vertex(3, Vec3::new(1.0, 0.0, 0.0), Vec2::ONE);
        b.add_triangle(0, 1, 2);
        b.add_triangle(1, 0, 3);
        let m = b.finish(true);
        assert_eq!(m.vertex_count(), 6);
        assert_eq!(m.triangles, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(m.normals, Normals::RecomputeOnLoad);
        assert!(m.flat_normals().iter().all(|n| (n.y - 1.0).abs() < 1e-6));
    }
}
