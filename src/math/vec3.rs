//! 三维向量扩展

use super::Vec3;

pub trait Vec3Ext {
    /// 单位化后沿大圆插值，再按自身长度缩放
    fn slerp_scaled(self, other: Self, t: f64) -> Self;
}

impl Vec3Ext for Vec3 {
    fn slerp_scaled(self, other: Vec3, t: f64) -> Vec3 {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }
        if self.abs_diff_eq(other, 1e-8) {
            return self;
        }

        let v0 = self.normalize_or_zero();
        let v1 = other.normalize_or_zero();
        let theta = v0.angle_between(v1);
        let sin_theta = theta.sin();
        if sin_theta.abs() < 1e-12 {
            return self.lerp(other, t);
        }
        let s0 = ((1.0 - t) * theta).sin() / sin_theta;
        let s1 = (t * theta).sin() / sin_theta;
        (v0 * s0 + v1 * s1) * self.length()
    }
}
