use bouquet::text::typeface::Typeface;

/// A tiny typeface with 100 units per em.
///
/// `o` is a square ring, `l` a solid bar, `?` a triangle and space is blank.
pub const TINY_TYPEFACE: &str = r#"{
    "familyName": "Tiny",
    "resolution": 100,
    "boundingBox": { "xMin": 0, "xMax": 100, "yMin": -20, "yMax": 100 },
    "underlineThickness": 10,
    "glyphs": {
        "o": {
            "ha": 110, "x_min": 0, "x_max": 100,
            "o": "m 0 0 l 0 100 l 100 100 l 100 0 z m 25 25 l 75 25 l 75 75 l 25 75 z"
        },
        "l": { "ha": 40, "x_min": 0, "x_max": 20, "o": "m 0 0 l 0 100 l 20 100 l 20 0 z" },
        "?": { "ha": 60, "x_min": 0, "x_max": 50, "o": "m 0 0 l 25 50 l 50 0 z" },
        " ": { "ha": 50 }
    }
}"#;

pub fn tiny_typeface() -> Typeface {
    Typeface::from_json(TINY_TYPEFACE).unwrap()
}
