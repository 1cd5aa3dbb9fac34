//! 数学基础类型
//!
//! 向量、四元数和矩阵直接使用 glam 的 f64 类型。MMD 特有的约定
//! （欧拉角顺序、球面插值的退化阈值、逆矩阵/单位化的兜底）放在扩展 trait 里。

mod mat4;
mod quaternion;
mod scalar;
mod vec3;

pub use mat4::Mat4Ext;
pub use quaternion::QuaternionExt;
pub use scalar::{
    deg_to_rad, effective, is_almost_all_same_values, lerp, near_equals, rad_to_deg, round,
};
pub use vec3::Vec3Ext;

pub type Vec2 = glam::DVec2;
pub type Vec3 = glam::DVec3;
pub type Vec4 = glam::DVec4;
pub type Quaternion = glam::DQuat;
pub type Mat4 = glam::DMat4;
