use tessera_geom::{Vec2, Vec3};
use tessera_world::HeightField;

use crate::mesh_build::{MeshBuild, MeshBuildResult};
use crate::settings::{MeshSettings, lod_increment};

/// Triangulates a bordered height field into a chunk mesh centered on the origin.
///
/// The outermost ring of `field` is border: it only contributes to normals so that edge
/// shading matches the neighbouring chunk. At LOD 0 the mesh has `(N - 2)²` vertices for an
/// `N × N` field; higher LODs visit every `lod_increment(lod)`th cell and are stretched so the
/// first and last visited interior cells land on the tile edges. Heights are used as world Y
/// directly, X/Z are scaled by `settings.mesh_scale`.
pub fn build_terrain_mesh(field: &HeightField, settings: &MeshSettings, lod: u8) -> MeshBuildResult {
    let n = field.width().min(field.height());
    if n < 3 {
        log::warn!("height field {}x{} too small to mesh", field.width(), field.height());
        return MeshBuildResult::default();
    }

    let inc = lod_increment(lod);
    let last = n - 1;
    // Cells between the two border rings at full resolution.
    let span = (n - 3).max(1) as f32;
    let top_left = Vec2::new(-span / 2.0, span / 2.0);
    // Distance between the first and last interior cell visited at this step.
    let reach = (n - 1).saturating_sub(2 * inc).max(1) as f32;
    let scale = settings.mesh_scale;

    let mut slots = vec![0i32; n * n];
    let mut mesh_count = 0i32;
    let mut border_count = 0i32;
    for x in (0..n).step_by(inc) {
        for y in (0..n).step_by(inc) {
            let is_border = x == 0 || y == 0 || x == last || y == last;
            slots[x * n + y] = if is_border {
                border_count += 1;
                -border_count
            } else {
                mesh_count += 1;
                mesh_count - 1
            };
        }
    }

    let mut build = MeshBuild::with_capacity(mesh_count as usize, border_count as usize);
    for x in (0..n).step_by(inc) {
        for y in (0..n).step_by(inc) {
            let percent = Vec2::new(
                (x as f32 - inc as f32) / reach,
                (y as f32 - inc as f32) / reach,
            );
            let position = Vec3::new(
                (top_left.x + percent.x * span) * scale,
                field.get(x, y),
                (top_left.y - percent.y * span) * scale,
            );
            build.add_vertex(slots[x * n + y], position, percent);

            // The last visited row and column only close quads.
            if x + inc <= last && y + inc <= last {
                let a = slots[x * n + y];
                let b = slots[(x + inc) * n + y];
                let c = slots[x * n + y + inc];
                let d = slots[(x + inc) * n + y + inc];
                build.add_triangle(a, d, c);
                build.add_triangle(d, a, b);
            }
        }
    }

    let mesh = build.finish(settings.use_flat_shading);
    log::trace!(
        "meshed {}x{} field at lod {} -> {} verts, {} tris",
        n,
        n,
        lod,
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    mesh
}
