//! 关键帧数据结构
//!
//! 骨骼、表情、相机、照明、阴影、IK 六类关键帧及其插值规则。

use crate::math::{effective, lerp, Quaternion, QuaternionExt, Vec3};

use super::curves::{BoneCurves, CameraCurves};
use super::track::{linear_t, Keyframe};
use super::Frame;

/// 骨骼关键帧
///
/// 位置、旋转、曲线缺省时分别按零向量、单位四元数、线性曲线处理。
#[derive(Clone, Debug, PartialEq)]
pub struct BoneKeyframe {
    pub frame: Frame,
    /// 是否来自文件（区别于插值生成的帧）
    pub read: bool,
    pub position: Option<Vec3>,
    pub rotation: Option<Quaternion>,
    pub curves: Option<BoneCurves>,
    /// 物理关闭标记，写出时转为插值记录里的 99/15
    pub disable_physics: Option<bool>,
}

impl BoneKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            read: false,
            position: None,
            rotation: None,
            curves: None,
            disable_physics: None,
        }
    }

    pub fn with_transform(frame: Frame, position: Vec3, rotation: Quaternion) -> Self {
        Self {
            position: Some(position),
            rotation: Some(rotation),
            ..Self::new(frame)
        }
    }

    pub fn position_or_zero(&self) -> Vec3 {
        self.position.unwrap_or(Vec3::ZERO)
    }

    pub fn rotation_or_identity(&self) -> Quaternion {
        self.rotation.unwrap_or(Quaternion::IDENTITY)
    }

    pub fn curves_or_default(&self) -> BoneCurves {
        self.curves.clone().unwrap_or_default()
    }

    pub fn is_physics_disabled(&self) -> bool {
        self.disable_physics == Some(true)
    }
}

impl Keyframe for BoneKeyframe {
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
        let (xt, yt, zt, rt) = match &next.curves {
            Some(curves) => curves.evaluate(prev.frame, frame, next.frame),
            None => {
                let t = linear_t(prev.frame, frame, next.frame);
                (t, t, t, t)
            }
        };

        let p0 = prev.position_or_zero();
        let p1 = next.position_or_zero();
        let position = Vec3::new(lerp(p0.x, p1.x, xt), lerp(p0.y, p1.y, yt), lerp(p0.z, p1.z, zt));
        let rotation = prev.rotation_or_identity().slerp_shortest(next.rotation_or_identity(), rt);

        Self {
            position: Some(position),
            rotation: Some(rotation),
            disable_physics: prev.disable_physics.or(next.disable_physics),
            ..Self::new(frame)
        }
    }

    fn split_curves(&self, prev: &Self, next: &Self) -> Option<(Self, Self)> {
        let mut inserted = self.clone();
        let Some(next_curves) = &next.curves else {
            inserted.curves = Some(BoneCurves::default());
            return Some((inserted, next.clone()));
        };

        let (left, right) = next_curves.split(prev.frame, self.frame, next.frame);
        let mut next = next.clone();
        inserted.curves = Some(left);
        next.curves = Some(right);
        Some((inserted, next))
    }
}

/// 表情关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct MorphKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub ratio: f64,
}

impl MorphKeyframe {
    pub fn new(frame: Frame, ratio: f64) -> Self {
        Self { frame, read: false, ratio }
    }
}

impl Keyframe for MorphKeyframe {
    fn frame(&self) -> Frame {
        self.frame
    }

    fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    fn default_at(frame: Frame) -> Self {
        Self::new(frame, 0.0)
    }

    fn lerp(prev: &Self, next: &Self, frame: Frame) -> Self {
        let t = linear_t(prev.frame, frame, next.frame);
        Self::new(frame, effective(lerp(prev.ratio, next.ratio, t)))
    }
}

/// 相机关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct CameraKeyframe {
    pub frame: Frame,
    pub read: bool,
    /// 注视点
    pub position: Vec3,
    /// 欧拉角（度）
    pub degrees: Vec3,
    /// 插值时由 degrees 求得的旋转
    pub quaternion: Option<Quaternion>,
    pub distance: f64,
    /// 视角（度）
    pub view_of_angle: i32,
    /// 透视关闭
    pub perspective_off: bool,
    pub curves: CameraCurves,
}

impl CameraKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            read: false,
            position: Vec3::ZERO,
            degrees: Vec3::ZERO,
            quaternion: None,
            distance: 0.0,
            view_of_angle: 0,
            perspective_off: true,
            curves: CameraCurves::default(),
        }
    }

    /// 是否与新建帧的内容相同
    pub fn is_default(&self) -> bool {
        self.position.abs_diff_eq(Vec3::ZERO, 1e-8)
            && self.degrees.abs_diff_eq(Vec3::ZERO, 1e-8)
            && self.distance == 0.0
            && self.view_of_angle == 0
            && self.perspective_off
            && self.curves.is_linear()
    }
}

impl Keyframe for CameraKeyframe {
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
        let [xt, yt, zt, rt, dt, vt] = next.curves.evaluate(prev.frame, frame, next.frame);

        let q0 = Quaternion::from_degrees(prev.degrees.x, prev.degrees.y, prev.degrees.z);
        let q1 = Quaternion::from_degrees(next.degrees.x, next.degrees.y, next.degrees.z);
        let q = q0.slerp_shortest(q1, rt);

        let p0 = prev.position;
        let p1 = next.position;

        Self {
            position: Vec3::new(lerp(p0.x, p1.x, xt), lerp(p0.y, p1.y, yt), lerp(p0.z, p1.z, zt)),
            degrees: q.to_degrees(),
            quaternion: Some(q),
            distance: lerp(prev.distance, next.distance, dt),
            view_of_angle: lerp(prev.view_of_angle as f64, next.view_of_angle as f64, vt) as i32,
            perspective_off: next.perspective_off,
            ..Self::new(frame)
        }
    }

    fn split_curves(&self, prev: &Self, next: &Self) -> Option<(Self, Self)> {
        let (left, right) = next.curves.split(prev.frame, self.frame, next.frame);
        let mut inserted = self.clone();
        let mut next = next.clone();
        inserted.curves = left;
        next.curves = right;
        Some((inserted, next))
    }
}

/// 照明关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct LightKeyframe {
    pub frame: Frame,
    pub read: bool,
    /// RGB 0..1
    pub color: Vec3,
    /// 光照方向
    pub position: Vec3,
}

impl LightKeyframe {
    /// MMD 的初始照明
    pub const DEFAULT_COLOR: Vec3 = Vec3::new(0.6, 0.6, 0.6);
    pub const DEFAULT_POSITION: Vec3 = Vec3::new(-0.5, -1.0, 0.5);

    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            read: false,
            color: Self::DEFAULT_COLOR,
            position: Self::DEFAULT_POSITION,
        }
    }

    pub fn is_default(&self) -> bool {
        self.color.abs_diff_eq(Self::DEFAULT_COLOR, 1e-6)
            && self.position.abs_diff_eq(Self::DEFAULT_POSITION, 1e-6)
    }
}

impl Keyframe for LightKeyframe {
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
            color: prev.color.lerp(next.color, t),
            position: prev.position.lerp(next.position, t),
            ..Self::new(frame)
        }
    }
}

/// 阴影关键帧
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowKeyframe {
    pub frame: Frame,
    pub read: bool,
    /// 0: 关闭, 1: 模式1, 2: 模式2
    pub mode: u8,
    pub distance: f64,
}

impl ShadowKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            read: false,
            mode: 0,
            distance: 0.0,
        }
    }

    pub fn is_default(&self) -> bool {
        self.mode == 0 && self.distance == 0.0
    }
}

impl Keyframe for ShadowKeyframe {
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
            mode: prev.mode,
            distance: lerp(prev.distance, next.distance, t),
            ..Self::new(frame)
        }
    }
}

/// 单个 IK 骨骼的开关
#[derive(Clone, Debug, PartialEq)]
pub struct IkEnabledFrame {
    pub bone_name: String,
    pub enabled: bool,
}

impl IkEnabledFrame {
    pub fn new(bone_name: &str, enabled: bool) -> Self {
        Self {
            bone_name: bone_name.to_string(),
            enabled,
        }
    }
}

/// IK 关键帧（显示开关与各 IK 的启用状态）
#[derive(Clone, Debug, PartialEq)]
pub struct IkKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub visible: bool,
    pub ik_list: Vec<IkEnabledFrame>,
}

impl IkKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            read: false,
            visible: true,
            ik_list: Vec::new(),
        }
    }

    /// 未记录的 IK 视为启用
    pub fn is_enabled(&self, bone_name: &str) -> bool {
        self.ik_list
            .iter()
            .find(|ik| ik.bone_name == bone_name)
            .map_or(true, |ik| ik.enabled)
    }

    pub fn is_default(&self) -> bool {
        self.visible && self.ik_list.is_empty()
    }
}

impl Keyframe for IkKeyframe {
    fn frame(&self) -> Frame {
        self.frame
    }

    fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    fn default_at(frame: Frame) -> Self {
        Self::new(frame)
    }

    fn lerp(prev: &Self, _next: &Self, frame: Frame) -> Self {
        let mut out = prev.restamped(frame);
        out.read = false;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::bezier::Curve;
    use crate::animation::track::Track;
    use crate::math::Vec2;

    #[test]
    fn test_bone_linear_interpolation() {
        let target = Quaternion::from_degrees(0.0, 90.0, 0.0);
        let mut first = BoneKeyframe::with_transform(0.0, Vec3::ZERO, Quaternion::IDENTITY);
        first.curves = Some(BoneCurves::default());
        let mut second = BoneKeyframe::with_transform(10.0, Vec3::new(10.0, 0.0, 0.0), target);
        second.curves = Some(BoneCurves::default());

        let mut track = Track::new();
        track.append(first);
        track.append(second);

        let mid = track.get(5.0);
        let x = mid.position_or_zero().x;
        assert!((4.9..=5.1).contains(&x), "x = {}", x);
        let expected = Quaternion::IDENTITY.slerp_shortest(target, 0.5);
        assert!(mid.rotation_or_identity().abs_diff_eq(expected, 1e-6));
        assert_eq!(mid.frame, 5.0);
        assert!(!mid.read);
    }

    #[test]
    fn test_bone_without_curves_is_linear() {
        let mut track = Track::new();
        track.append(BoneKeyframe::with_transform(0.0, Vec3::ZERO, Quaternion::IDENTITY));
        track.append(BoneKeyframe::with_transform(4.0, Vec3::new(0.0, 8.0, 0.0), Quaternion::IDENTITY));
        let mid = track.get(1.0);
        assert!(mid.position_or_zero().abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-12));
    }

    #[test]
    fn test_bone_uses_next_curves() {
        let ease = Curve::new(Vec2::new(64.0, 0.0), Vec2::new(64.0, 127.0));
        let mut next = BoneKeyframe::with_transform(10.0, Vec3::new(10.0, 0.0, 0.0), Quaternion::IDENTITY);
        next.curves = Some(BoneCurves::uniform(ease));

        let mut track = Track::new();
        track.append(BoneKeyframe::with_transform(0.0, Vec3::ZERO, Quaternion::IDENTITY));
        track.append(next);

        let (_, y, _) = ease.evaluate(0.0, 2.0, 10.0);
        let sampled = track.get(2.0).position_or_zero().x;
        assert!((sampled - 10.0 * y).abs() < 1e-12);
        assert!(sampled < 2.0);
    }

    #[test]
    fn test_bone_disable_physics_inherits() {
        let mut prev = BoneKeyframe::new(0.0);
        prev.disable_physics = Some(true);
        let next = BoneKeyframe::new(10.0);
        let mid = BoneKeyframe::lerp(&prev, &next, 5.0);
        assert_eq!(mid.disable_physics, Some(true));

        let mut next = BoneKeyframe::new(10.0);
        next.disable_physics = Some(false);
        let mid = BoneKeyframe::lerp(&BoneKeyframe::new(0.0), &next, 5.0);
        assert_eq!(mid.disable_physics, Some(false));
    }

    #[test]
    fn test_bone_insert_splits_curves() {
        let mut next = BoneKeyframe::with_transform(10.0, Vec3::ONE, Quaternion::IDENTITY);
        next.curves = Some(BoneCurves::uniform(Curve::new(Vec2::new(89.0, 2.0), Vec2::new(52.0, 106.0))));

        let mut track = Track::new();
        track.append(BoneKeyframe::new(0.0));
        track.append(next);
        track.insert(BoneKeyframe::new(2.0));

        let inserted = track.stored(2.0).and_then(|k| k.curves.clone()).unwrap();
        let next = track.stored(10.0).and_then(|k| k.curves.clone()).unwrap();
        assert!(inserted.translate_x.start.abs_diff_eq(Vec2::new(50.0, 7.0), 1e-1));
        assert!(next.rotate.end.abs_diff_eq(Vec2::new(44.0, 108.0), 1e-1));
    }

    #[test]
    fn test_bone_insert_without_next_curves() {
        let mut track = Track::new();
        track.append(BoneKeyframe::new(0.0));
        track.append(BoneKeyframe::new(10.0));
        track.insert(BoneKeyframe::new(5.0));
        assert_eq!(track.stored(5.0).and_then(|k| k.curves.clone()), Some(BoneCurves::default()));
        assert_eq!(track.stored(10.0).and_then(|k| k.curves.clone()), None);
    }

    #[test]
    fn test_bone_after_last_key() {
        let mut track = Track::new();
        let mut last = BoneKeyframe::with_transform(3.0, Vec3::ONE, Quaternion::IDENTITY);
        last.read = true;
        track.append(last.clone());
        let sampled = track.get(30.0);
        assert_eq!(sampled, last.restamped(30.0));
    }

    #[test]
    fn test_morph_lerp() {
        let mut track = Track::new();
        track.append(MorphKeyframe::new(0.0, 0.0));
        track.append(MorphKeyframe::new(10.0, 1.0));
        assert!((track.get(3.0).ratio - 0.3).abs() < 1e-6);
        assert_eq!(Track::<MorphKeyframe>::new().get(3.0), MorphKeyframe::new(3.0, 0.0));
    }

    #[test]
    fn test_morph_sanitizes() {
        let prev = MorphKeyframe::new(0.0, f64::NAN);
        let next = MorphKeyframe::new(10.0, 1.0);
        assert_eq!(MorphKeyframe::lerp(&prev, &next, 5.0).ratio, 0.0);
    }

    #[test]
    fn test_camera_lerp() {
        let mut prev = CameraKeyframe::new(0.0);
        prev.distance = -10.0;
        prev.view_of_angle = 30;
        let mut next = CameraKeyframe::new(10.0);
        next.position = Vec3::new(10.0, 0.0, 0.0);
        next.degrees = Vec3::new(0.0, 90.0, 0.0);
        next.distance = -20.0;
        next.view_of_angle = 40;
        next.perspective_off = false;

        let mid = CameraKeyframe::lerp(&prev, &next, 5.0);
        assert!(mid.position.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-9));
        assert!(mid.degrees.abs_diff_eq(Vec3::new(0.0, 45.0, 0.0), 1e-9));
        assert!((mid.distance + 15.0).abs() < 1e-9);
        assert_eq!(mid.view_of_angle, 35);
        assert!(!mid.perspective_off);
        assert!(mid.quaternion.is_some());
    }

    #[test]
    fn test_camera_is_default() {
        let mut c = CameraKeyframe::new(0.0);
        assert!(c.is_default());
        c.view_of_angle = 30;
        assert!(!c.is_default());
    }

    #[test]
    fn test_camera_insert_splits_curves() {
        let mut next = CameraKeyframe::new(10.0);
        next.curves.distance = Curve::new(Vec2::new(89.0, 2.0), Vec2::new(52.0, 106.0));
        let mut track = Track::new();
        track.append(CameraKeyframe::new(0.0));
        track.append(next);
        track.insert(CameraKeyframe::new(2.0));
        let inserted = track.get(2.0);
        assert!(inserted.curves.distance.start.abs_diff_eq(Vec2::new(50.0, 7.0), 1e-1));
        assert_eq!(inserted.curves.translate_x, Curve::linear());
    }

    #[test]
    fn test_light_lerp() {
        let mut prev = LightKeyframe::new(0.0);
        prev.color = Vec3::ZERO;
        let mut next = LightKeyframe::new(4.0);
        next.color = Vec3::ONE;
        let mid = LightKeyframe::lerp(&prev, &next, 1.0);
        assert!(mid.color.abs_diff_eq(Vec3::new(0.25, 0.25, 0.25), 1e-12));
        assert!(LightKeyframe::new(0.0).is_default());
    }

    #[test]
    fn test_shadow_mode_steps() {
        let mut prev = ShadowKeyframe::new(0.0);
        prev.mode = 1;
        prev.distance = 0.0;
        let mut next = ShadowKeyframe::new(10.0);
        next.mode = 2;
        next.distance = 1.0;
        let mid = ShadowKeyframe::lerp(&prev, &next, 9.0);
        assert_eq!(mid.mode, 1);
        assert!((mid.distance - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_ik_step() {
        let mut prev = IkKeyframe::new(0.0);
        prev.ik_list.push(IkEnabledFrame::new("左足ＩＫ", false));
        let mut next = IkKeyframe::new(10.0);
        next.visible = false;

        let mut track = Track::new();
        track.append(prev);
        track.append(next);
        let mid = track.get(9.0);
        assert!(mid.visible);
        assert!(!mid.is_enabled("左足ＩＫ"));
        assert!(mid.is_enabled("右足ＩＫ"));
        assert_eq!(mid.frame, 9.0);
        assert!(IkKeyframe::new(0.0).is_default());
    }
}
