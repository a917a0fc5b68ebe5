use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Unit, Vector3};

use super::*;

/// The operation of a [`Transform`] element.
#[derive(Clone, Debug, PartialEq)]
pub enum TransformKind {
    /// `<lookat>`: eye position, interest point and up direction.
    LookAt(Box<[f32; 9]>),
    /// `<matrix>`: a 4x4 matrix, written row by row.
    Matrix(Box<[f32; 16]>),
    /// `<rotate>`: an axis followed by an angle in degrees.
    Rotate([f32; 4]),
    /// `<scale>`
    Scale([f32; 3]),
    /// `<skew>`: an angle in degrees, the rotation axis and the translation axis.
    Skew(Box<[f32; 7]>),
    /// `<translate>`
    Translate([f32; 3]),
}

/// One element of the transformation list of a [`Node`].
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    /// The scoped identifier, used by animation targets like `node/sid`.
    pub sid: Option<String>,
    /// What the element does.
    pub kind: TransformKind,
}

impl Transform {
    /// Parse a [`Transform`] from an XML element, if it is one of the transformation elements.
    pub fn parse(e: &Element) -> Result<Option<Self>> {
        let kind = match e.name() {
            "lookat" => TransformKind::LookAt(parse_array_n(e)?),
            "matrix" => TransformKind::Matrix(parse_array_n(e)?),
            "rotate" => TransformKind::Rotate(*parse_array_n(e)?),
            "scale" => TransformKind::Scale(*parse_array_n(e)?),
            "skew" => TransformKind::Skew(parse_array_n(e)?),
            "translate" => TransformKind::Translate(*parse_array_n(e)?),
            _ => return Ok(None),
        };
        Ok(Some(Transform {
            sid: e.attr("sid").map(Into::into),
            kind,
        }))
    }

    /// Convert this transformation to a matrix, acting on column vectors.
    pub fn as_matrix(&self) -> Matrix4<f32> {
        match &self.kind {
            TransformKind::LookAt(v) => {
                let eye = Point3::new(v[0], v[1], v[2]);
                let target = Point3::new(v[3], v[4], v[5]);
                let up = Vector3::new(v[6], v[7], v[8]);
                // `look_at_rh` is a view matrix; the node transform is its inverse
                Matrix4::look_at_rh(&eye, &target, &up)
                    .try_inverse()
                    .unwrap_or_else(Matrix4::identity)
            }
            TransformKind::Matrix(m) => Matrix4::from_row_slice(&**m),
            TransformKind::Rotate([x, y, z, angle]) => {
                let axis = Unit::new_normalize(Vector3::new(*x, *y, *z));
                Matrix4::from_axis_angle(&axis, angle.to_radians())
            }
            TransformKind::Scale(s) => Matrix4::new_nonuniform_scaling(&Vector3::from(*s)),
            TransformKind::Skew(v) => skew(v[0], [v[1], v[2], v[3]], [v[4], v[5], v[6]]),
            TransformKind::Translate(t) => Matrix4::new_translation(&Vector3::from(*t)),
        }
    }
}

/// The RenderMan skew: points are shifted along `trans`, so that points on `rot` end up on a
/// line at `angle` degrees from `rot`.
fn skew(angle: f32, rot: [f32; 3], trans: [f32; 3]) -> Matrix4<f32> {
    let d1 = Vector3::from(rot).normalize();
    let d2 = Vector3::from(trans).normalize();
    let par = d1.dot(&d2);
    let perp = (1. - par * par).max(0.).sqrt();
    let angle = angle.to_radians();
    if perp < 1e-6 || angle >= par.acos() || angle <= par.acos() - std::f32::consts::PI {
        log::warn!("ignoring degenerate <skew>");
        return Matrix4::identity();
    }
    let d1_orth = (d1 - d2 * par) / perp;
    let s = (angle + perp.acos()).tan() * perp - par;
    let shear: Matrix3<f32> = Matrix3::identity() + d2 * d1_orth.transpose() * s;
    shear.to_homogeneous()
}

/// A matrix split into the `translation`, `rotation` and `scale` fields of an X3D `Transform`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    /// The translation.
    pub translation: [f32; 3],
    /// Axis and angle in radians.
    pub rotation: [f32; 4],
    /// The scale along the local axes.
    pub scale: [f32; 3],
}

impl Decomposed {
    /// Decompose an affine matrix. Shear, if any, is lost.
    pub fn new(m: &Matrix4<f32>) -> Self {
        let linear = m.fixed_view::<3, 3>(0, 0).into_owned();
        let mut scale = [
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        ];
        if linear.determinant() < 0. {
            scale[0] = -scale[0];
        }
        let mut rot = linear;
        for (i, &s) in scale.iter().enumerate() {
            if s != 0. {
                rot.column_mut(i).unscale_mut(s);
            }
        }
        Decomposed {
            translation: [m[(0, 3)], m[(1, 3)], m[(2, 3)]],
            rotation: axis_angle(&Rotation3::from_matrix(&rot)),
            scale,
        }
    }
}

/// The X3D `SFRotation` form of a rotation, `0 0 1 0` for the identity.
pub fn axis_angle(r: &Rotation3<f32>) -> [f32; 4] {
    match r.axis_angle() {
        Some((axis, angle)) => [axis.x, axis.y, axis.z, angle],
        None => [0., 0., 1., 0.],
    }
}
