//! 四元数扩展
//!
//! 欧拉角按 MMD 习惯使用 (pitch, head, roll)，即绕 X / Y / Z 轴的角度。
//! 乘法、向量旋转、与矩阵互转直接用 glam。

use super::{deg_to_rad, rad_to_deg, Quaternion, Vec3};

/// 小于该长度平方的四元数视为退化
const DEGENERATE_LENGTH_SQUARED: f64 = 1e-10;

pub trait QuaternionExt: Sized {
    /// 由欧拉角（弧度）构造
    fn from_radians(pitch: f64, head: f64, roll: f64) -> Self;

    fn from_degrees(pitch: f64, head: f64, roll: f64) -> Self;

    /// 转为欧拉角（弧度），万向节锁时 roll 归零
    fn to_radians(self) -> Vec3;

    fn to_degrees(self) -> Vec3;

    /// 长度过小时返回单位四元数
    fn normalize_or_identity(self) -> Self;

    /// 共轭除以长度平方，退化时返回单位四元数
    fn inverse_or_identity(self) -> Self;

    fn is_ident(self) -> bool;

    /// 最短弧球面插值，夹角很小时退化为单位化的线性插值
    fn slerp_shortest(self, other: Self, t: f64) -> Self;

    /// 黄金分割搜索 t，使 `q1.slerp_shortest(q2, t)` 最接近 `qt`
    ///
    /// q1 与 q2 几乎相同时直接返回 `initial`。
    fn find_slerp_t(q1: Self, q2: Self, qt: Self, initial: f64) -> f64;
}

impl QuaternionExt for Quaternion {
    fn from_radians(pitch: f64, head: f64, roll: f64) -> Self {
        let (sx, cx) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (head * 0.5).sin_cos();
        let (sz, cz) = (roll * 0.5).sin_cos();

        Quaternion::from_xyzw(
            sx * cy * cz + cx * sy * sz,
            cx * sy * cz - sx * cy * sz,
            cx * cy * sz + sx * sy * cz,
            cx * cy * cz - sx * sy * sz,
        )
        .normalize_or_identity()
    }

    fn from_degrees(pitch: f64, head: f64, roll: f64) -> Self {
        Self::from_radians(deg_to_rad(pitch), deg_to_rad(head), deg_to_rad(roll))
    }

    fn to_radians(self) -> Vec3 {
        let Quaternion { x, y, z, w } = self;
        let sx = -(2.0 * y * z - 2.0 * x * w);
        let pitch = sx.clamp(-1.0, 1.0).asin();
        if sx.abs() < 0.99999 {
            let head = (2.0 * x * z + 2.0 * y * w).atan2(2.0 * w * w + 2.0 * z * z - 1.0);
            let roll = (2.0 * x * y + 2.0 * z * w).atan2(2.0 * w * w + 2.0 * y * y - 1.0);
            Vec3::new(pitch, head, roll)
        } else {
            let head = (-(2.0 * x * z - 2.0 * y * w)).atan2(2.0 * w * w + 2.0 * x * x - 1.0);
            Vec3::new(pitch, head, 0.0)
        }
    }

    fn to_degrees(self) -> Vec3 {
        let r = self.to_radians();
        Vec3::new(rad_to_deg(r.x), rad_to_deg(r.y), rad_to_deg(r.z))
    }

    fn normalize_or_identity(self) -> Self {
        if self.length_squared() < DEGENERATE_LENGTH_SQUARED {
            return Quaternion::IDENTITY;
        }
        self.normalize()
    }

    fn inverse_or_identity(self) -> Self {
        let len_sq = self.length_squared();
        if len_sq < DEGENERATE_LENGTH_SQUARED {
            return Quaternion::IDENTITY;
        }
        self.conjugate() * (1.0 / len_sq)
    }

    fn is_ident(self) -> bool {
        self.abs_diff_eq(Quaternion::IDENTITY, 1e-6)
    }

    fn slerp_shortest(self, other: Self, t: f64) -> Self {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }
        if self.abs_diff_eq(other, 1e-8) {
            return self;
        }

        let mut cos_omega = self.dot(other);
        let mut target = other;
        if cos_omega < 0.0 {
            cos_omega = -cos_omega;
            target = -other;
        }

        if cos_omega > 0.9999 {
            return self.lerp(target, t).normalize_or_identity();
        }

        let sin_omega = (1.0 - cos_omega * cos_omega).sqrt();
        let omega = sin_omega.atan2(cos_omega);
        let k1 = ((1.0 - t) * omega).sin() / sin_omega;
        let k2 = (t * omega).sin() / sin_omega;
        self * k1 + target * k2
    }

    fn find_slerp_t(q1: Self, q2: Self, qt: Self, initial: f64) -> f64 {
        const TOLERANCE: f64 = 1e-10;
        const MAX_ITERATIONS: usize = 100;
        let phi = (1.0 + 5f64.sqrt()) / 2.0;

        if q1.dot(q2).abs() > 0.9999 {
            return initial;
        }

        let q2c = if q1.dot(q2) < 0.0 { -q2 } else { q2 };
        let error = |t: f64| q1.slerp_shortest(q2c, t).dot(qt).clamp(-1.0, 1.0).acos();

        let (mut a, mut b) = (0.0, 1.0);
        let mut c = b - (b - a) / phi;
        let mut d = a + (b - a) / phi;
        let mut fc = error(c);
        let mut fd = error(d);

        for _ in 0..MAX_ITERATIONS {
            if (b - a).abs() < TOLERANCE || fc.min(fd) < TOLERANCE {
                break;
            }
            if fc < fd {
                b = d;
                d = c;
                fd = fc;
                c = b - (b - a) / phi;
                fc = error(c);
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + (b - a) / phi;
                fd = error(d);
            }
        }

        (a + b) / 2.0
    }
}
