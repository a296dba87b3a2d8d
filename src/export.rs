use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::{ImageBuffer, Luma, Rgb};
use tessera_mesh_cpu::MeshBuildResult;
use tessera_world::FieldGrid;

use crate::config::RegionConfig;

fn to_gray(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Colour of the first band whose upper bound is at or above `v`; black above every band.
pub fn region_color(regions: &[RegionConfig], v: f32) -> [u8; 3] {
    regions
        .iter()
        .find(|r| v <= r.height)
        .map(|r| r.color)
        .unwrap_or([0, 0, 0])
}

/// Writes a [0, 1] grid as an 8-bit grayscale image. Cell (x, y) becomes pixel (x, y).
pub fn write_grayscale_png(grid: &FieldGrid, path: &Path) -> Result<(), Box<dyn Error>> {
    let img = ImageBuffer::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        Luma([to_gray(grid.get(x as usize, y as usize))])
    });
    img.save(path)?;
    log::info!("wrote {}x{} grayscale map to {}", grid.width(), grid.height(), path.display());
    Ok(())
}

pub fn write_color_map_png(
    grid: &FieldGrid,
    regions: &[RegionConfig],
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let img = ImageBuffer::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        Rgb(region_color(regions, grid.get(x as usize, y as usize)))
    });
    img.save(path)?;
    log::info!(
        "wrote {}x{} colour map ({} regions) to {}",
        grid.width(),
        grid.height(),
        regions.len(),
        path.display()
    );
    Ok(())
}

/// Wavefront OBJ with positions, uvs and normals. Indices are 1-based.
pub fn write_obj<W: Write>(mesh: &MeshBuildResult, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "# tessera terrain chunk")?;
    writeln!(
        out,
        "# {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    )?;
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for uv in &mesh.uvs {
        writeln!(out, "vt {} {}", uv.x, uv.y)?;
    }
    for n in mesh.resolved_normals() {
        writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
    }
    for [a, b, c] in &mesh.triangles {
        let (a, b, c) = (a + 1, b + 1, c + 1);
        writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
    }
    Ok(())
}

pub fn write_obj_file(mesh: &MeshBuildResult, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut out = BufWriter::new(File::create(path)?);
    write_obj(mesh, &mut out)?;
    out.flush()?;
    log::info!(
        "wrote mesh ({} vertices, {} triangles) to {}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        path.display()
    );
    Ok(())
}
