//! 4x4 矩阵扩展（列主序，glam::DMat4）

use super::{Mat4, Vec3};

pub trait Mat4Ext {
    /// 逆矩阵，奇异或结果非有限时返回单位矩阵
    fn inverse_or_identity(&self) -> Self;

    /// 变换点，w 不为 0 和 1 时做透视除法
    fn mul_point(&self, v: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn inverse_or_identity(&self) -> Mat4 {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < 1e-10 {
            return Mat4::IDENTITY;
        }
        let inverse = self.inverse();
        if !inverse.is_finite() {
            return Mat4::IDENTITY;
        }
        inverse
    }

    fn mul_point(&self, v: Vec3) -> Vec3 {
        let p = *self * v.extend(1.0);
        if p.w != 0.0 && p.w != 1.0 {
            p.truncate() / p.w
        } else {
            p.truncate()
        }
    }
}
