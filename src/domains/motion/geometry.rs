use serde::{Deserialize, Serialize};

/// World-space vector. `y` is up; the ground plane is `x`/`z`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn ground(x: f64, z: f64) -> Self {
        Self { x, y: 0.0, z }
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        self.sub(other).length()
    }

    /// Squared distance ignoring height.
    pub fn ground_distance_sq(self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    pub fn ground_distance(self, other: Vec3) -> f64 {
        self.ground_distance_sq(other).sqrt()
    }

    pub fn with_y(self, y: f64) -> Vec3 {
        Vec3::new(self.x, y, self.z)
    }

    /// Projection onto the ground plane.
    pub fn flat(self) -> Vec3 {
        self.with_y(0.0)
    }

    pub fn lerp(self, target: Vec3, t: f64) -> Vec3 {
        self.add(target.sub(self).scale(t))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Unit quaternion using the Y-up, Z-forward convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn from_yaw_deg(yaw_deg: f64) -> Quat {
        let half = yaw_deg.to_radians() * 0.5;
        Quat { x: 0.0, y: half.sin(), z: 0.0, w: half.cos() }
    }

    pub fn from_axis_angle_deg(axis: Vec3, angle_deg: f64) -> Quat {
        let len = axis.length();
        if len < f64::EPSILON {
            return Quat::IDENTITY;
        }
        let n = axis.scale(1.0 / len);
        let half = angle_deg.to_radians() * 0.5;
        let s = half.sin();
        Quat { x: n.x * s, y: n.y * s, z: n.z * s, w: half.cos() }
    }

    /// Rotation whose forward axis points along `direction` on the ground plane.
    pub fn look_along(direction: Vec3) -> Option<Quat> {
        let flat = direction.flat();
        if flat.length() < 1e-9 {
            return None;
        }
        Some(Quat::from_yaw_deg(flat.x.atan2(flat.z).to_degrees()))
    }

    pub fn mul(self, o: Quat) -> Quat {
        Quat {
            w: self.w * o.w - self.x * o.x - self.y * o.y - self.z * o.z,
            x: self.w * o.x + self.x * o.w + self.y * o.z - self.z * o.y,
            y: self.w * o.y - self.x * o.z + self.y * o.w + self.z * o.x,
            z: self.w * o.z + self.x * o.y - self.y * o.x + self.z * o.w,
        }
    }

    pub fn conjugate(self) -> Quat {
        Quat { x: -self.x, y: -self.y, z: -self.z, w: self.w }
    }

    pub fn rotate(self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v).scale(2.0);
        v.add(t.scale(self.w)).add(u.cross(t))
    }

    pub fn forward(self) -> Vec3 {
        self.rotate(Vec3::new(0.0, 0.0, 1.0))
    }

    /// Heading of the forward axis around +Y, in degrees.
    pub fn yaw_deg(self) -> f64 {
        let f = self.forward();
        f.x.atan2(f.z).to_degrees()
    }

    /// Drops pitch and roll, keeping only the heading.
    pub fn yaw_only(self) -> Quat {
        Quat::from_yaw_deg(self.yaw_deg())
    }

    fn normalized(self) -> Quat {
        let n = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if n < f64::EPSILON {
            return Quat::IDENTITY;
        }
        Quat { x: self.x / n, y: self.y / n, z: self.z / n, w: self.w / n }
    }

    /// Normalized linear interpolation along the shorter arc.
    pub fn nlerp(self, target: Quat, t: f64) -> Quat {
        let dot = self.x * target.x + self.y * target.y + self.z * target.z + self.w * target.w;
        let sign = if dot < 0.0 { -1.0 } else { 1.0 };
        Quat {
            x: self.x + (target.x * sign - self.x) * t,
            y: self.y + (target.y * sign - self.y) * t,
            z: self.z + (target.z * sign - self.z) * t,
            w: self.w + (target.w * sign - self.w) * t,
        }
        .normalized()
    }
}

/// Position and orientation of an agent body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

/// Signed shortest difference `to - from`, in (-180, 180].
pub fn delta_angle_deg(from: f64, to: f64) -> f64 {
    let mut d = (to - from) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Unsigned angle between two ground-plane directions, in degrees.
/// `None` when either vector is degenerate.
pub fn ground_angle_deg(a: Vec3, b: Vec3) -> Option<f64> {
    let a = a.flat();
    let b = b.flat();
    let la = a.length();
    let lb = b.length();
    if la < 1e-9 || lb < 1e-9 {
        return None;
    }
    let cos = (a.dot(b) / (la * lb)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Steps `current` toward `target` by at most `max_step` degrees.
pub fn rotate_towards_deg(current: f64, target: f64, max_step: f64) -> f64 {
    let d = delta_angle_deg(current, target);
    if d.abs() <= max_step {
        target
    } else {
        current + max_step * d.signum()
    }
}
