//! Motion 核心数据结构
//!
//! 存储完整的动画数据：按名称的骨骼、表情、剛体、关节轨道，
//! 以及相机、照明、阴影、IK、物理、风等全局轨道。

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use super::keyframe::{
    BoneKeyframe, CameraKeyframe, IkKeyframe, LightKeyframe, MorphKeyframe, ShadowKeyframe,
};
use super::name_map::NameMap;
use super::override_frames::{JointKeyframe, RigidBodyKeyframe};
use super::physics_frames::{
    FixedTimeStepKeyframe, GravityKeyframe, MaxSubStepsKeyframe, PhysicsResetKeyframe,
};
use super::track::{Keyframe, Track};
use super::wind_frames::{
    WindDirectionKeyframe, WindDragCoeffKeyframe, WindEnabledKeyframe, WindLiftCoeffKeyframe,
    WindRandomnessKeyframe, WindSpeedKeyframe, WindTurbulenceFreqHzKeyframe,
};
use super::Frame;
use crate::math::{Quaternion, Vec3};

pub type BoneTrack = Track<BoneKeyframe>;
pub type MorphTrack = Track<MorphKeyframe>;
pub type CameraTrack = Track<CameraKeyframe>;
pub type LightTrack = Track<LightKeyframe>;
pub type ShadowTrack = Track<ShadowKeyframe>;
pub type IkTrack = Track<IkKeyframe>;
pub type RigidBodyTrack = Track<RigidBodyKeyframe>;
pub type JointTrack = Track<JointKeyframe>;

/// 判定是否有效的容差
const ACTIVE_TOLERANCE: f64 = 1e-2;

/// 复制时混入哈希，保证副本与原件不同
static COPY_SALT: AtomicU64 = AtomicU64::new(1);

/// 动画数据
///
/// 容器本身不加锁，并发修改需由调用方串行化。
#[derive(Debug, Clone, Default)]
pub struct Motion {
    /// 文件头签名（读取时原样保存）
    pub signature: String,
    /// 模型名称
    pub name: String,
    /// 来源路径，仅作记录
    pub path: String,
    /// 标识哈希
    pub hash: String,

    /// 骨骼轨道（按首次出现顺序）
    pub bones: NameMap<BoneTrack>,
    /// 表情轨道（按首次出现顺序）
    pub morphs: NameMap<MorphTrack>,
    pub camera: CameraTrack,
    pub light: LightTrack,
    pub shadow: ShadowTrack,
    pub ik: IkTrack,

    pub max_sub_steps: Track<MaxSubStepsKeyframe>,
    pub fixed_time_step: Track<FixedTimeStepKeyframe>,
    pub gravity: Track<GravityKeyframe>,
    pub physics_reset: Track<PhysicsResetKeyframe>,
    /// 剛体参数覆盖（按剛体名）
    pub rigid_bodies: NameMap<RigidBodyTrack>,
    /// 关节参数覆盖（按关节名）
    pub joints: NameMap<JointTrack>,

    pub wind_enabled: Track<WindEnabledKeyframe>,
    pub wind_direction: Track<WindDirectionKeyframe>,
    pub wind_lift_coeff: Track<WindLiftCoeffKeyframe>,
    pub wind_drag_coeff: Track<WindDragCoeffKeyframe>,
    pub wind_randomness: Track<WindRandomnessKeyframe>,
    pub wind_turbulence_freq_hz: Track<WindTurbulenceFreqHzKeyframe>,
    pub wind_speed: Track<WindSpeedKeyframe>,
}

impl Motion {
    /// 创建空的 Motion，path 只作记录
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// 来源是否为 VPD
    pub fn is_vpd(&self) -> bool {
        self.path.to_lowercase().contains(".vpd")
    }

    /// 各节关键帧数量，用于哈希
    fn hash_parts(&self) -> String {
        format!(
            "{:08}{:08}{:08}{:08}{:08}{:08}",
            self.bone_frame_count(),
            self.morph_frame_count(),
            self.camera.len(),
            self.light.len(),
            self.shadow.len(),
            self.ik.len(),
        )
    }

    fn compute_hash(&self, salt: u64) -> String {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.path.hash(&mut hasher);
        self.hash_parts().hash(&mut hasher);
        salt.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// 由名称、路径、关键帧数量重新计算哈希
    pub fn update_hash(&mut self) {
        self.hash = self.compute_hash(0);
    }

    /// 骨骼关键帧总数
    pub fn bone_frame_count(&self) -> usize {
        self.bones.values().map(Track::len).sum()
    }

    /// 表情关键帧总数
    pub fn morph_frame_count(&self) -> usize {
        self.morphs.values().map(Track::len).sum()
    }

    /// 最大帧号，只看骨骼和表情；两者都为空时看相机
    pub fn max_frame(&self) -> Frame {
        if self.bone_frame_count() == 0 && self.morph_frame_count() == 0 {
            return self.camera.max_frame();
        }
        let bone_max = self.bones.values().map(Track::max_frame).fold(0.0, Frame::max);
        let morph_max = self.morphs.values().map(Track::max_frame).fold(0.0, Frame::max);
        bone_max.max(morph_max)
    }

    /// 最小帧号，只看骨骼和表情
    pub fn min_frame(&self) -> Frame {
        self.bones
            .values()
            .filter(|t| !t.is_empty())
            .map(Track::min_frame)
            .chain(self.morphs.values().filter(|t| !t.is_empty()).map(Track::min_frame))
            .reduce(Frame::min)
            .unwrap_or(0.0)
    }

    /// 骨骼和表情的所有帧号（升序、去重）
    pub fn indexes(&self) -> Vec<u32> {
        let mut indexes: Vec<u32> = self
            .bones
            .values()
            .flat_map(|t| t.frames())
            .chain(self.morphs.values().flat_map(|t| t.frames()))
            .map(|f| f as u32)
            .collect();
        indexes.sort_unstable();
        indexes.dedup();
        indexes
    }

    pub fn append_bone_frame(&mut self, name: &str, key: BoneKeyframe) {
        self.bones.get_or_insert_with(name, Track::new).append(key);
    }

    /// 插入骨骼关键帧，落在两帧之间时拆分曲线
    pub fn insert_bone_frame(&mut self, name: &str, key: BoneKeyframe) {
        self.bones.get_or_insert_with(name, Track::new).insert(key);
    }

    pub fn append_morph_frame(&mut self, name: &str, key: MorphKeyframe) {
        self.morphs.get_or_insert_with(name, Track::new).append(key);
    }

    pub fn insert_morph_frame(&mut self, name: &str, key: MorphKeyframe) {
        self.morphs.get_or_insert_with(name, Track::new).insert(key);
    }

    pub fn append_camera_frame(&mut self, key: CameraKeyframe) {
        self.camera.append(key);
    }

    pub fn insert_camera_frame(&mut self, key: CameraKeyframe) {
        self.camera.insert(key);
    }

    pub fn append_light_frame(&mut self, key: LightKeyframe) {
        self.light.append(key);
    }

    pub fn insert_light_frame(&mut self, key: LightKeyframe) {
        self.light.insert(key);
    }

    pub fn append_shadow_frame(&mut self, key: ShadowKeyframe) {
        self.shadow.append(key);
    }

    pub fn insert_shadow_frame(&mut self, key: ShadowKeyframe) {
        self.shadow.insert(key);
    }

    pub fn append_ik_frame(&mut self, key: IkKeyframe) {
        self.ik.append(key);
    }

    pub fn insert_ik_frame(&mut self, key: IkKeyframe) {
        self.ik.insert(key);
    }

    pub fn append_max_sub_steps_frame(&mut self, key: MaxSubStepsKeyframe) {
        self.max_sub_steps.append(key);
    }

    pub fn append_fixed_time_step_frame(&mut self, key: FixedTimeStepKeyframe) {
        self.fixed_time_step.append(key);
    }

    pub fn append_gravity_frame(&mut self, key: GravityKeyframe) {
        self.gravity.append(key);
    }

    pub fn append_physics_reset_frame(&mut self, key: PhysicsResetKeyframe) {
        self.physics_reset.append(key);
    }

    pub fn append_rigid_body_frame(&mut self, name: &str, key: RigidBodyKeyframe) {
        self.rigid_bodies.get_or_insert_with(name, Track::new).append(key);
    }

    pub fn insert_rigid_body_frame(&mut self, name: &str, key: RigidBodyKeyframe) {
        self.rigid_bodies.get_or_insert_with(name, Track::new).insert(key);
    }

    pub fn append_joint_frame(&mut self, name: &str, key: JointKeyframe) {
        self.joints.get_or_insert_with(name, Track::new).append(key);
    }

    pub fn insert_joint_frame(&mut self, name: &str, key: JointKeyframe) {
        self.joints.get_or_insert_with(name, Track::new).insert(key);
    }

    pub fn append_wind_enabled_frame(&mut self, key: WindEnabledKeyframe) {
        self.wind_enabled.append(key);
    }

    pub fn append_wind_direction_frame(&mut self, key: WindDirectionKeyframe) {
        self.wind_direction.append(key);
    }

    pub fn append_wind_lift_coeff_frame(&mut self, key: WindLiftCoeffKeyframe) {
        self.wind_lift_coeff.append(key);
    }

    pub fn append_wind_drag_coeff_frame(&mut self, key: WindDragCoeffKeyframe) {
        self.wind_drag_coeff.append(key);
    }

    pub fn append_wind_randomness_frame(&mut self, key: WindRandomnessKeyframe) {
        self.wind_randomness.append(key);
    }

    pub fn append_wind_turbulence_freq_hz_frame(&mut self, key: WindTurbulenceFreqHzKeyframe) {
        self.wind_turbulence_freq_hz.append(key);
    }

    pub fn append_wind_speed_frame(&mut self, key: WindSpeedKeyframe) {
        self.wind_speed.append(key);
    }

    /// 删除没有实际变化的轨道
    pub fn clean(&mut self) {
        self.bones.retain(|_, track| is_bone_track_active(track));
        self.morphs.retain(|_, track| is_morph_track_active(track));
        clear_if_only_default(&mut self.camera, CameraKeyframe::is_default);
        clear_if_only_default(&mut self.light, LightKeyframe::is_default);
        clear_if_only_default(&mut self.shadow, ShadowKeyframe::is_default);
        clear_if_only_default(&mut self.ik, IkKeyframe::is_default);
    }

    /// 深拷贝，并为副本生成新的哈希
    pub fn copy(&self) -> Motion {
        let mut copied = self.clone();
        let salt = COPY_SALT.fetch_add(1, Ordering::Relaxed);
        copied.hash = copied.compute_hash(salt);
        copied
    }
}

/// 任一帧有位移/旋转，或相邻两帧不同时为有效
fn is_bone_track_active(track: &BoneTrack) -> bool {
    let mut active = false;
    let mut prev: Option<(Vec3, Quaternion)> = None;
    track.for_each(|_, key| {
        let position = key.position_or_zero();
        let rotation = key.rotation_or_identity();
        if !position.abs_diff_eq(Vec3::ZERO, ACTIVE_TOLERANCE)
            || !rotation.abs_diff_eq(Quaternion::IDENTITY, ACTIVE_TOLERANCE)
        {
            active = true;
            return false;
        }
        if let Some((p, r)) = prev {
            if !p.abs_diff_eq(position, ACTIVE_TOLERANCE) || !r.abs_diff_eq(rotation, ACTIVE_TOLERANCE) {
                active = true;
                return false;
            }
        }
        prev = Some((position, rotation));
        true
    });
    active
}

fn is_morph_track_active(track: &MorphTrack) -> bool {
    track.iter().any(|key| key.ratio.abs() > ACTIVE_TOLERANCE)
}

/// 只有一帧且为默认值时清空
fn clear_if_only_default<K: Keyframe>(track: &mut Track<K>, is_default: fn(&K) -> bool) {
    if track.len() == 1 && track.iter().all(is_default) {
        track.clear();
    }
}
