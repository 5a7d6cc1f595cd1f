//! Rigid-body poses with six degrees of freedom.

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::units::{Quantity, Unit};

/// Names of the six degrees of freedom, translations first.
pub const DOF_NAMES: [&str; 6] = ["dx", "dy", "dz", "rx", "ry", "rz"];

pub type Vec3 = [f64; 3];

/// Translation (mm) and rotation (rad, applied x then y then z) of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

impl Pose {
    pub fn is_identity(&self) -> bool {
        *self == Pose::default()
    }

    fn slot(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "dx" => Some(&mut self.dx),
            "dy" => Some(&mut self.dy),
            "dz" => Some(&mut self.dz),
            "rx" => Some(&mut self.rx),
            "ry" => Some(&mut self.ry),
            "rz" => Some(&mut self.rz),
            _ => None,
        }
    }

    /// Build a pose from named quantities. Translations must be lengths and
    /// rotations angles; missing DOF stay zero.
    pub fn from_quantities<'a, I>(values: I) -> Result<Pose, SimError>
    where
        I: IntoIterator<Item = (&'a str, Quantity)>,
    {
        let mut pose = Pose::default();
        for (name, quantity) in values {
            let is_rotation = name.starts_with('r');
            let target = if is_rotation { Unit::Radian } else { Unit::Millimeter };
            let value = quantity.to(target)?.value;
            let slot = pose
                .slot(name)
                .ok_or_else(|| SimError::invalid_value(name, "not a degree of freedom"))?;
            *slot = value;
        }
        Ok(pose)
    }

    /// Component-wise sum. Rotations add in the small-angle limit.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            dx: self.dx + other.dx,
            dy: self.dy + other.dy,
            dz: self.dz + other.dz,
            rx: self.rx + other.rx,
            ry: self.ry + other.ry,
            rz: self.rz + other.rz,
        }
    }

    /// Rotate `point` about `center` by this pose's rotation, then translate.
    pub fn move_point(&self, point: Vec3, center: Vec3) -> Vec3 {
        let rel = [
            point[0] - center[0],
            point[1] - center[1],
            point[2] - center[2],
        ];
        let r = rotate(rel, self.rx, self.ry, self.rz);
        [
            center[0] + r[0] + self.dx,
            center[1] + r[1] + self.dy,
            center[2] + r[2] + self.dz,
        ]
    }
}

/// Apply `R = Rz * Ry * Rx` to `v`.
pub fn rotate(v: Vec3, rx: f64, ry: f64, rz: f64) -> Vec3 {
    let (sx, cx) = rx.sin_cos();
    let (sy, cy) = ry.sin_cos();
    let (sz, cz) = rz.sin_cos();
    // about x
    let a = [v[0], cx * v[1] - sx * v[2], sx * v[1] + cx * v[2]];
    // about y
    let b = [cy * a[0] + sy * a[2], a[1], -sy * a[0] + cy * a[2]];
    // about z
    [cz * b[0] - sz * b[1], sz * b[0] + cz * b[1], b[2]]
}
