//! Typeface JSON fonts as exported by facetype.js.
//!
//! Each glyph stores its outline as a flat command string in font units:
//! `m x y` (move), `l x y` (line), `q x y cx cy` (quadratic, end point
//! first) and `b x y c1x c1y c2x c2y` (cubic, end point first).

use std::collections::HashMap;

use cgmath::Vector2;
use serde::Deserialize;

use crate::{error::TextError, text::shape::Contour};

#[derive(Clone, Debug, Deserialize)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub ha: f32,
    #[serde(default)]
    pub x_min: Option<f32>,
    #[serde(default)]
    pub x_max: Option<f32>,
    /// Outline commands. Absent for blank glyphs such as space.
    #[serde(default)]
    pub o: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typeface {
    pub glyphs: HashMap<char, Glyph>,
    #[serde(default)]
    pub family_name: Option<String>,
    pub resolution: f32,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub underline_thickness: f32,
}

/// The contours of one laid-out glyph, already scaled and positioned.
#[derive(Clone, Debug, Default)]
pub struct GlyphOutline {
    pub character: char,
    pub contours: Vec<Contour>,
}

impl Typeface {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let typeface: Typeface = serde_json::from_str(json)?;
        if !(typeface.resolution > 0.0) {
            return Err(TextError::InvalidResolution(typeface.resolution).into());
        }
        Ok(typeface)
    }

    pub fn line_height(&self, size: f32) -> f32 {
        let scale = size / self.resolution;
        (self.bounding_box.y_max - self.bounding_box.y_min + self.underline_thickness) * scale
    }

    /// Lays out `text` on a baseline starting at the origin.
    ///
    /// Characters without a glyph fall back to `?` and are skipped when the
    /// font has no `?` either. Curves are flattened into `curve_segments`
    /// line segments each.
    pub fn layout(
        &self,
        text: &str,
        size: f32,
        curve_segments: u32,
    ) -> Result<Vec<GlyphOutline>, TextError> {
        let scale = size / self.resolution;
        let line_height = self.line_height(size);
        let segments = curve_segments.max(1);

        let mut offset = Vector2::new(0.0f32, 0.0f32);
        let mut outlines = Vec::new();
        for character in text.chars() {
            if character == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }
            let glyph = match self.glyphs.get(&character) {
                Some(glyph) => glyph,
                None => match self.glyphs.get(&'?') {
                    Some(fallback) => {
                        log::warn!(
                            "Character '{}' is missing from font {:?}; using '?'.",
                            character,
                            self.family_name
                        );
                        fallback
                    }
                    None => {
                        log::warn!(
                            "Character '{}' is missing from font {:?}; skipping it.",
                            character,
                            self.family_name
                        );
                        continue;
                    }
                },
            };
            let contours = match &glyph.o {
                Some(outline) => parse_outline(character, outline, scale, offset, segments)?,
                None => Vec::new(),
            };
            outlines.push(GlyphOutline {
                character,
                contours,
            });
            offset.x += glyph.ha * scale;
        }
        Ok(outlines)
    }
}

fn parse_outline(
    glyph: char,
    outline: &str,
    scale: f32,
    offset: Vector2<f32>,
    segments: u32,
) -> Result<Vec<Contour>, TextError> {
    let tokens: Vec<&str> = outline.split_whitespace().collect();
    let mut i = 0;
    let mut contours: Vec<Contour> = Vec::new();
    let mut current: Contour = Vec::new();

    let point = |tokens: &[&str], i: &mut usize, command: &str| -> Result<Vector2<f32>, TextError> {
        let malformed = || TextError::MalformedOutline {
            glyph,
            command: command.to_string(),
        };
        let x: f32 = tokens.get(*i).ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        let y: f32 = tokens.get(*i + 1).ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        *i += 2;
        Ok(Vector2::new(x * scale + offset.x, y * scale + offset.y))
    };

    while i < tokens.len() {
        let command = tokens[i];
        i += 1;
        match command {
            "m" => {
                let p = point(&tokens, &mut i, command)?;
                if current.len() > 1 {
                    contours.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                current.push(p);
            }
            "l" => {
                let p = point(&tokens, &mut i, command)?;
                current.push(p);
            }
            "q" => {
                let end = point(&tokens, &mut i, command)?;
                let control = point(&tokens, &mut i, command)?;
                let start = current.last().copied().unwrap_or(end);
                for step in 1..=segments {
                    let t = step as f32 / segments as f32;
                    let u = 1.0 - t;
                    current.push(start * (u * u) + control * (2.0 * u * t) + end * (t * t));
                }
            }
            "b" => {
                let end = point(&tokens, &mut i, command)?;
                let c1 = point(&tokens, &mut i, command)?;
                let c2 = point(&tokens, &mut i, command)?;
                let start = current.last().copied().unwrap_or(end);
                for step in 1..=segments {
                    let t = step as f32 / segments as f32;
                    let u = 1.0 - t;
                    current.push(
                        start * (u * u * u)
                            + c1 * (3.0 * u * u * t)
                            + c2 * (3.0 * u * t * t)
                            + end * (t * t * t),
                    );
                }
            }
            "z" => {
                if current.len() > 1 {
                    contours.push(std::mem::take(&mut current));
                }
            }
            other => {
                return Err(TextError::MalformedOutline {
                    glyph,
                    command: other.to_string(),
                });
            }
        }
    }
    if current.len() > 1 {
        contours.push(current);
    }
    Ok(contours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FONT: &str = r#"{
        "glyphs": {
            "I": { "ha": 300, "x_min": 0, "x_max": 200, "o": "m 0 0 l 0 700 l 200 700 l 200 0 l 0 0 " },
            "?": { "ha": 500, "o": "m 0 0 l 100 0 l 100 100 " },
            " ": { "ha": 250 },
            "c": { "ha": 400, "o": "m 0 0 q 100 100 50 200 " }
        },
        "familyName": "Test Sans",
        "resolution": 1000,
        "boundingBox": { "xMin": 0, "xMax": 500, "yMin": -200, "yMax": 800 },
        "underlineThickness": 50
    }"#;

    fn font() -> Typeface {
        Typeface::from_json(FONT).unwrap()
    }

    #[test]
    fn glyphs_advance_by_scaled_ha() {
        let outlines = font().layout("I I", 10.0, 4).unwrap();
        assert_eq!(outlines.len(), 3);
        // second 'I' starts after 300 + 250 font units at scale 0.01
        let second = &outlines[2].contours[0];
        assert_relative_eq!(second[0].x, 5.5, epsilon = 1e-5);
        assert_relative_eq!(outlines[0].contours[0][1].y, 7.0, epsilon = 1e-5);
    }

    #[test]
    fn newline_resets_x_and_drops_one_line() {
        let typeface = font();
        let outlines = typeface.layout("I\nI", 10.0, 4).unwrap();
        let second = &outlines[1].contours[0][0];
        assert_relative_eq!(second.x, 0.0);
        // (800 - -200 + 50) * 0.01
        assert_relative_eq!(second.y, -10.5, epsilon = 1e-5);
        assert_relative_eq!(typeface.line_height(10.0), 10.5, epsilon = 1e-5);
    }

    #[test]
    fn missing_glyph_falls_back_to_question_mark() {
        let outlines = font().layout("<", 1.0, 4).unwrap();
        assert_eq!(outlines.len(), 1);
        // the outline is '?' but it still stands for the requested character
        assert_eq!(outlines[0].character, '<');
        assert_eq!(outlines[0].contours[0].len(), 3);
    }

    #[test]
    fn quadratic_reads_end_point_before_control() {
        let outlines = font().layout("c", 1000.0, 2).unwrap();
        let contour = &outlines[0].contours[0];
        // start, midpoint, end
        assert_eq!(contour.len(), 3);
        assert_relative_eq!(contour[2].x, 100.0);
        assert_relative_eq!(contour[2].y, 100.0);
        // B(0.5) = 0.25*start + 0.5*control + 0.25*end
        assert_relative_eq!(contour[1].x, 0.5 * 50.0 + 0.25 * 100.0);
        assert_relative_eq!(contour[1].y, 0.5 * 200.0 + 0.25 * 100.0);
    }

    #[test]
    fn blank_glyphs_have_no_contours() {
        let outlines = font().layout(" ", 1.0, 4).unwrap();
        assert!(outlines[0].contours.is_empty());
    }

    #[test]
    fn rejects_zero_resolution() {
        let json = FONT.replace("\"resolution\": 1000", "\"resolution\": 0");
        assert!(Typeface::from_json(&json).is_err());
    }

    #[test]
    fn reports_truncated_commands() {
        let json = FONT.replace("m 0 0 q 100 100 50 200 ", "m 0 0 q 100 ");
        let err = Typeface::from_json(&json).unwrap().layout("c", 1.0, 2).unwrap_err();
        assert!(matches!(err, TextError::MalformedOutline { glyph: 'c', .. }));
    }
}
