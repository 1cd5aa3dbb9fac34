//! 剛体与关节参数覆盖关键帧
//!
//! 按剛体名/关节名分轨道保存，线性插值。缺省的向量按零处理。

use crate::math::{lerp, Vec3};

use super::track::{linear_t, Keyframe};
use super::Frame;

fn lerp_opt(prev: Option<Vec3>, next: Option<Vec3>, t: f64) -> Option<Vec3> {
    Some(prev.unwrap_or(Vec3::ZERO).lerp(next.unwrap_or(Vec3::ZERO), t))
}

/// 剛体覆盖关键帧
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RigidBodyKeyframe {
    pub frame: Frame,
    pub read: bool,
    /// 位置偏移
    pub position: Option<Vec3>,
    pub size: Option<Vec3>,
    pub mass: f64,
}

impl RigidBodyKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, ..Default::default() }
    }
}

impl Keyframe for RigidBodyKeyframe {
    fn frame(&self) -> Frame {
        self.frame
    }

    fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    fn default_at(frame: Frame) -> Self {
        Self::new(frame)
    }

    fn lerp(prev: &Self, next: &Self, frame: Frame) -> Self {
        let t = linear_t(prev.frame, frame, next.frame);
        Self {
            frame,
            read: false,
            position: lerp_opt(prev.position, next.position, t),
            size: lerp_opt(prev.size, next.size, t),
            mass: lerp(prev.mass, next.mass, t),
        }
    }
}

/// 关节覆盖关键帧
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JointKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub translation_limit_min: Option<Vec3>,
    pub translation_limit_max: Option<Vec3>,
    pub rotation_limit_min: Option<Vec3>,
    pub rotation_limit_max: Option<Vec3>,
    pub spring_constant_translation: Option<Vec3>,
    pub spring_constant_rotation: Option<Vec3>,
}

impl JointKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, ..Default::default() }
    }
}

impl Keyframe for JointKeyframe {
    fn frame(&self) -> Frame {
        self.frame
    }

    fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    fn default_at(frame: Frame) -> Self {
        Self::new(frame)
    }

    fn lerp(prev: &Self, next: &Self, frame: Frame) -> Self {
        let t = linear_t(prev.frame, frame, next.frame);
        Self {
            frame,
            read: false,
            translation_limit_min: lerp_opt(prev.translation_limit_min, next.translation_limit_min, t),
            translation_limit_max: lerp_opt(prev.translation_limit_max, next.translation_limit_max, t),
            rotation_limit_min: lerp_opt(prev.rotation_limit_min, next.rotation_limit_min, t),
            rotation_limit_max: lerp_opt(prev.rotation_limit_max, next.rotation_limit_max, t),
            spring_constant_translation: lerp_opt(
                prev.spring_constant_translation,
                next.spring_constant_translation,
                t,
            ),
            spring_constant_rotation: lerp_opt(prev.spring_constant_rotation, next.spring_constant_rotation, t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::track::Track;
    use approx::assert_relative_eq;

    #[test]
    fn test_rigid_body_lerp() {
        let mut track = Track::new();
        let mut a = RigidBodyKeyframe::new(0.0);
        a.mass = 1.0;
        a.size = Some(Vec3::new(1.0, 1.0, 1.0));
        let mut b = RigidBodyKeyframe::new(10.0);
        b.mass = 3.0;
        b.position = Some(Vec3::new(10.0, 0.0, 0.0));
        b.size = Some(Vec3::new(3.0, 1.0, 1.0));
        track.append(a);
        track.append(b);

        let mid = track.get(5.0);
        assert_relative_eq!(mid.mass, 2.0, epsilon = 1e-10);
        assert_relative_eq!(mid.position.unwrap().x, 5.0, epsilon = 1e-10);
        assert_relative_eq!(mid.size.unwrap().x, 2.0, epsilon = 1e-10);
        assert!(!mid.read);
    }

    #[test]
    fn test_joint_lerp_missing_as_zero() {
        let mut track = Track::new();
        track.append(JointKeyframe::new(0.0));
        let mut b = JointKeyframe::new(4.0);
        b.rotation_limit_max = Some(Vec3::new(0.0, 4.0, 0.0));
        track.append(b);

        let key = track.get(1.0);
        assert_relative_eq!(key.rotation_limit_max.unwrap().y, 1.0, epsilon = 1e-10);
        assert_eq!(key.translation_limit_min, Some(Vec3::ZERO));
    }

    #[test]
    fn test_empty_default() {
        let key = Track::<JointKeyframe>::new().get(3.0);
        assert_eq!(key, JointKeyframe::new(3.0));
    }
}
