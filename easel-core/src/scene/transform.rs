/// Which point of the object's box `left` refers to.
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Default, serde::Serialize, serde::Deserialize, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OriginX {
    #[default]
    Left,
    Center,
    Right,
}
/// Which point of the object's box `top` refers to.
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Default, serde::Serialize, serde::Deserialize, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OriginY {
    #[default]
    Top,
    Center,
    Bottom,
}
impl OriginX {
    /// Offset from the origin point to the box centre, as a fraction of the scaled width.
    fn to_center(self) -> f64 {
        match self {
            Self::Left => 0.5,
            Self::Center => 0.0,
            Self::Right => -0.5,
        }
    }
}
impl OriginY {
    fn to_center(self) -> f64 {
        match self {
            Self::Top => 0.5,
            Self::Center => 0.0,
            Self::Bottom => -0.5,
        }
    }
}

/// Placement of an object: position of its origin point, scale, and rotation in degrees
/// clockwise about that origin.
#[derive(Copy, Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub angle: f64,
    pub origin_x: OriginX,
    pub origin_y: OriginY,
}
impl Default for Placement {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            origin_x: OriginX::Left,
            origin_y: OriginY::Top,
        }
    }
}
impl Placement {
    /// Centre of a `width` x `height` box placed here, accounting for rotation.
    #[must_use]
    pub fn center(&self, width: f64, height: f64) -> [f64; 2] {
        let offset = [
            self.origin_x.to_center() * width * self.scale_x,
            self.origin_y.to_center() * height * self.scale_y,
        ];
        let rotated = rotate(offset, self.angle);
        [self.left + rotated[0], self.top + rotated[1]]
    }
    /// Move so that the box centre lands on `center`, keeping origin, scale and angle.
    pub fn set_center(&mut self, width: f64, height: f64, center: [f64; 2]) {
        let offset = [
            self.origin_x.to_center() * width * self.scale_x,
            self.origin_y.to_center() * height * self.scale_y,
        ];
        let rotated = rotate(offset, self.angle);
        self.left = center[0] - rotated[0];
        self.top = center[1] - rotated[1];
    }
    /// The matrix taking box-centred local coordinates into parent coordinates.
    #[must_use]
    pub fn matrix(&self, width: f64, height: f64) -> Matrix {
        Matrix::from_parts(
            self.center(width, height),
            self.angle,
            [self.scale_x, self.scale_y],
        )
    }
    /// Replace centre, rotation and scale with those of `matrix`. Shear is discarded.
    pub fn set_matrix(&mut self, width: f64, height: f64, matrix: &Matrix) {
        let (center, angle, scale) = matrix.decompose();
        self.angle = angle;
        self.scale_x = scale[0];
        self.scale_y = scale[1];
        self.set_center(width, height, center);
    }
}

fn rotate([x, y]: [f64; 2], degrees: f64) -> [f64; 2] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [x * cos - y * sin, x * sin + y * cos]
}

/// An arbitrary 2D affine transform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Matrix {
    /// Column-major matrix elements
    pub elements: [[f64; 2]; 3],
}
impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
impl Matrix {
    pub const IDENTITY: Self = Self {
        elements: [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
    };
    /// Scale, then rotate by `degrees` clockwise, then translate.
    #[must_use]
    pub fn from_parts(translation: [f64; 2], degrees: f64, [sx, sy]: [f64; 2]) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            elements: [[sx * cos, sx * sin], [sy * -sin, sy * cos], translation],
        }
    }
    /// `self` applied after `other`.
    #[must_use]
    pub fn then(&self, other: &Self) -> Self {
        let [[a, b], [c, d], [e, f]] = other.elements;
        let [[pa, pb], [pc, pd], [pe, pf]] = self.elements;
        Self {
            elements: [
                [pa * a + pc * b, pb * a + pd * b],
                [pa * c + pc * d, pb * c + pd * d],
                [pa * e + pc * f + pe, pb * e + pd * f + pf],
            ],
        }
    }
    #[must_use]
    pub fn apply(&self, [x, y]: [f64; 2]) -> [f64; 2] {
        let [[a, b], [c, d], [e, f]] = self.elements;
        [a * x + c * y + e, b * x + d * y + f]
    }
    /// Split into translation, clockwise rotation in degrees, and per-axis scale.
    #[must_use]
    pub fn decompose(&self) -> ([f64; 2], f64, [f64; 2]) {
        let [[a, b], [c, d], translation] = self.elements;
        let scale_x = a.hypot(b);
        let determinant = a * d - b * c;
        let scale_y = if scale_x == 0.0 {
            c.hypot(d)
        } else {
            determinant / scale_x
        };
        let angle = b.atan2(a).to_degrees();
        (translation, angle, [scale_x, scale_y])
    }
}

#[cfg(test)]
mod test {
    use super::{Matrix, OriginX, OriginY, Placement};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn center_respects_origin_and_scale() {
        let placement = Placement {
            left: 10.0,
            top: 20.0,
            scale_x: 2.0,
            ..Default::default()
        };
        assert_eq!(placement.center(50.0, 40.0), [60.0, 40.0]);

        let centered = Placement {
            origin_x: OriginX::Center,
            origin_y: OriginY::Center,
            ..placement
        };
        assert_eq!(centered.center(50.0, 40.0), [10.0, 20.0]);
    }
    #[test]
    fn rotated_center_round_trips() {
        let mut placement = Placement {
            left: 100.0,
            top: 100.0,
            angle: 90.0,
            ..Default::default()
        };
        // 90 degrees clockwise swings the (w/2, h/2) offset to (-h/2, w/2).
        let [cx, cy] = placement.center(20.0, 10.0);
        assert!(close(cx, 95.0) && close(cy, 110.0));
        placement.set_center(20.0, 10.0, [0.0, 0.0]);
        let [cx, cy] = placement.center(20.0, 10.0);
        assert!(close(cx, 0.0) && close(cy, 0.0));
    }
    #[test]
    fn composed_matrix_decomposes() {
        let parent = Matrix::from_parts([100.0, 50.0], 90.0, [2.0, 2.0]);
        let child = Matrix::from_parts([10.0, 0.0], 30.0, [0.5, 1.5]);
        let (translation, angle, scale) = parent.then(&child).decompose();
        assert!(close(translation[0], 100.0) && close(translation[1], 70.0));
        assert!(close(angle, 120.0));
        assert!(close(scale[0], 1.0) && close(scale[1], 3.0));
        let point = parent.apply([10.0, 0.0]);
        assert!(close(point[0], 100.0) && close(point[1], 70.0));
    }
}
