use approx::assert_relative_eq;
use bouquet::{
    config::{BevelConfig, TextConfig},
    text::TextMesh,
};

mod common;

fn text(content: &str) -> TextConfig {
    let mut config = TextConfig::new(content);
    config.height = 0.5;
    config
}

#[test]
fn ring_glyph_keeps_its_hole_open() {
    let mesh = TextMesh::build(&common::tiny_typeface(), &text("o")).unwrap();

    // 8 wall quads plus a ring cap of 8 triangles on each side
    assert_eq!(mesh.triangle_count(), 16 + 16);

    let front_cap = mesh.indices.chunks(3).filter(|t| {
        t.iter()
            .all(|&i| mesh.vertices[i as usize].position[2] == 0.0)
    });
    for triangle in front_cap {
        let centroid = triangle.iter().fold([0.0f32; 2], |acc, &i| {
            let p = mesh.vertices[i as usize].position;
            [acc[0] + p[0] / 3.0, acc[1] + p[1] / 3.0]
        });
        let inside_hole = (0.3..0.7).contains(&centroid[0]) && (0.3..0.7).contains(&centroid[1]);
        assert!(!inside_hole, "cap covers the hole at {centroid:?}");
    }
}

#[test]
fn text_is_laid_out_from_the_origin_and_extruded_backwards() {
    let mut config = text("lo");
    config.size = 10.0;
    let mesh = TextMesh::build(&common::tiny_typeface(), &config).unwrap();
    let bounds = mesh.bounds();
    assert_relative_eq!(bounds.min.x, 0.0, epsilon = 1e-5);
    // "l" advances 40 units, "o" is 100 wide, scaled by 10 / 100
    assert_relative_eq!(bounds.max.x, 14.0, epsilon = 1e-4);
    assert_relative_eq!(bounds.max.y, 10.0, epsilon = 1e-4);
    assert_relative_eq!(bounds.min.z, 0.0);
    assert_relative_eq!(bounds.max.z, 0.5);
    assert_eq!(mesh.name, "lo");
}

#[test]
fn bevel_widens_and_deepens_the_text() {
    let mut config = text("l");
    config.bevel = Some(BevelConfig {
        thickness: 0.1,
        size: 0.05,
        offset: 0.0,
        segments: 3,
    });
    let mesh = TextMesh::build(&common::tiny_typeface(), &config).unwrap();
    let bounds = mesh.bounds();
    assert_relative_eq!(bounds.min.z, -0.1, epsilon = 1e-5);
    assert_relative_eq!(bounds.max.z, 0.6, epsilon = 1e-5);
    assert_relative_eq!(bounds.min.x, -0.05, epsilon = 1e-4);
    assert_relative_eq!(bounds.max.x, 0.25, epsilon = 1e-4);
}

#[test]
fn unknown_characters_render_as_question_marks() {
    let typeface = common::tiny_typeface();
    let fallback = TextMesh::build(&typeface, &text("é")).unwrap();
    let question = TextMesh::build(&typeface, &text("?")).unwrap();
    assert_eq!(fallback.triangle_count(), question.triangle_count());
    assert!(fallback.triangle_count() > 0);
}

#[test]
fn blank_text_builds_an_empty_mesh() {
    let mesh = TextMesh::build(&common::tiny_typeface(), &text("  ")).unwrap();
    assert_eq!(mesh.triangle_count(), 0);
}

#[test]
fn every_vertex_has_a_unit_normal() {
    let mesh = TextMesh::build(&common::tiny_typeface(), &text("ol")).unwrap();
    for vertex in &mesh.vertices {
        let [x, y, z] = vertex.normal;
        assert_relative_eq!((x * x + y * y + z * z).sqrt(), 1.0, epsilon = 1e-4);
    }
}
