use crate::color::Color;

/// What fills an object's interior.
#[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Paint {
    Solid(Color),
    Gradient(Gradient),
}
impl Paint {
    #[must_use]
    pub fn is_gradient(&self) -> bool {
        matches!(self, Self::Gradient(_))
    }
    /// The color that best stands for this paint: itself, or the first gradient stop.
    #[must_use]
    pub fn representative(&self) -> Option<Color> {
        match self {
            Self::Solid(color) => Some(*color),
            Self::Gradient(gradient) => gradient.color_stops.first().map(|stop| stop.color),
        }
    }
}
impl From<Color> for Paint {
    fn from(value: Color) -> Self {
        Self::Solid(value)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GradientKind {
    Linear,
    Radial,
}

#[derive(Copy, Clone, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GradientCoords {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r2: Option<f64>,
}

#[derive(Copy, Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Color,
    #[serde(default = "opaque")]
    pub opacity: f64,
}
fn opaque() -> f64 {
    1.0
}

/// A gradient with ordered color stops, in the persisted object-space convention.
#[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    #[serde(rename = "type")]
    pub kind: GradientKind,
    #[serde(default)]
    pub coords: GradientCoords,
    #[serde(default)]
    pub color_stops: Vec<ColorStop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_transform: Option<[f64; 6]>,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
}
impl Gradient {
    /// Two-stop left-to-right linear gradient.
    #[must_use]
    pub fn linear(from: Color, to: Color) -> Self {
        Self {
            kind: GradientKind::Linear,
            coords: GradientCoords {
                x2: 1.0,
                ..Default::default()
            },
            color_stops: vec![
                ColorStop {
                    offset: 0.0,
                    color: from,
                    opacity: 1.0,
                },
                ColorStop {
                    offset: 1.0,
                    color: to,
                    opacity: 1.0,
                },
            ],
            gradient_units: None,
            gradient_transform: None,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
    /// Set the color of stop `index`, if there is one. Returns whether anything changed.
    pub fn set_stop(&mut self, index: usize, color: Color) -> bool {
        match self.color_stops.get_mut(index) {
            Some(stop) => {
                stop.color = color;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Gradient, GradientKind, Paint};
    use crate::color::Color;

    #[test]
    fn parses_solid_and_gradient() {
        let solid: Paint = serde_json::from_str(r##""#112233""##).unwrap();
        assert_eq!(solid, Paint::Solid(Color::rgb(0x11, 0x22, 0x33)));

        let gradient: Paint = serde_json::from_str(
            r##"{"type":"linear","coords":{"x1":0,"y1":0,"x2":100,"y2":0},
                "colorStops":[{"offset":0,"color":"#ff0000"},{"offset":1,"color":"rgb(0,0,255)","opacity":0.5}]}"##,
        )
        .unwrap();
        let Paint::Gradient(gradient) = gradient else {
            panic!("expected a gradient");
        };
        assert_eq!(gradient.kind, GradientKind::Linear);
        assert_eq!(gradient.color_stops[1].color, Color::rgb(0, 0, 255));
        assert_eq!(gradient.color_stops[0].opacity, 1.0);
    }
    #[test]
    fn set_stop_out_of_range() {
        let mut gradient = Gradient::linear(Color::WHITE, Color::BLACK);
        assert!(gradient.set_stop(1, Color::rgb(1, 2, 3)));
        assert!(!gradient.set_stop(2, Color::rgb(1, 2, 3)));
        assert_eq!(gradient.color_stops[1].color, Color::rgb(1, 2, 3));
    }
}
