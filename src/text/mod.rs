//! Extruded 3D text.
//!
//! A string is laid out with a [`typeface::Typeface`], its glyph contours are
//! grouped into [`shape::Shape`]s and those are extruded into a single mesh
//! with the origin at the start of the first baseline.

pub mod extrude;
pub mod shape;
pub mod typeface;

use crate::{
    config::TextConfig,
    data_structures::model::MeshData,
    error::TextError,
    text::{
        extrude::{Bevel, ExtrudeOptions},
        shape::{Shape, shapes_from_contours},
        typeface::Typeface,
    },
};

pub struct TextMesh;

impl TextMesh {
    pub fn build(typeface: &Typeface, config: &TextConfig) -> Result<MeshData, TextError> {
        let glyphs = typeface.layout(&config.text, config.size, config.curve_segments)?;
        let mut shapes: Vec<Shape> = Vec::new();
        for glyph in &glyphs {
            let glyph_shapes = shapes_from_contours(&glyph.contours);
            if glyph_shapes.is_empty() && !glyph.contours.is_empty() {
                log::warn!(
                    "Glyph '{}' has no closed outline and is left out of {:?}.",
                    glyph.character,
                    config.text
                );
            }
            shapes.extend(glyph_shapes);
        }

        let options = ExtrudeOptions {
            depth: config.height,
            bevel: config.bevel.as_ref().map(Bevel::from),
        };
        let mut mesh = extrude::extrude(&shapes, &options)?;
        mesh.name = config.text.clone();
        log::debug!(
            "Built text {:?}: {} glyphs, {} shapes, {} triangles",
            config.text,
            glyphs.len(),
            shapes.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }
}
