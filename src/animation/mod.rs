//! 动作数据
//!
//! 关键帧轨道、贝塞尔插值、VMD/VPD 读写以及骨骼关键帧精简。

/// 帧号，允许小数帧
pub type Frame = f32;

/// 为取后一帧值的关键帧类型实现 Keyframe（物理、风）
macro_rules! next_wins_keyframe {
    ($ty:ident) => {
        impl $crate::animation::track::Keyframe for $ty {
            fn frame(&self) -> $crate::animation::Frame {
                self.frame
            }

            fn set_frame(&mut self, frame: $crate::animation::Frame) {
                self.frame = frame;
            }

            fn default_at(frame: $crate::animation::Frame) -> Self {
                Self::new(frame)
            }

            fn lerp(_prev: &Self, next: &Self, _frame: $crate::animation::Frame) -> Self {
                next.clone()
            }
        }
    };
}

mod bezier;
mod curves;
mod frame_index;
mod keyframe;
mod motion;
mod name_map;
mod override_frames;
mod physics_frames;
mod reduce;
mod repository;
mod sjis;
mod track;
mod vmd_loader;
mod vmd_writer;
mod vpd_file;
mod wind_frames;

pub use bezier::{Curve, CURVE_MAX};
pub use curves::{BoneCurves, CameraCurves, BONE_CURVES_LEN, CAMERA_CURVES_LEN};
pub use frame_index::{FrameIndex, FrameKey};
pub use keyframe::{
    BoneKeyframe, CameraKeyframe, IkEnabledFrame, IkKeyframe, LightKeyframe, MorphKeyframe,
    ShadowKeyframe,
};
pub use motion::{
    BoneTrack, CameraTrack, IkTrack, JointTrack, LightTrack, Motion, MorphTrack, RigidBodyTrack,
    ShadowTrack,
};
pub use name_map::NameMap;
pub use override_frames::{JointKeyframe, RigidBodyKeyframe};
pub use physics_frames::{
    FixedTimeStepKeyframe, GravityKeyframe, MaxSubStepsKeyframe, PhysicsResetKeyframe,
    PhysicsResetType,
};
pub use repository::{VmdRepository, VpdRepository};
pub use track::{linear_t, Keyframe, Track};
pub use vmd_loader::{TrailerPolicy, VmdReader};
pub use vmd_writer::{SaveOptions, VmdWriter, VMD_SIGNATURE};
pub use vpd_file::VpdReader;
pub use wind_frames::{
    WindDirectionKeyframe, WindDragCoeffKeyframe, WindEnabledKeyframe, WindLiftCoeffKeyframe,
    WindRandomnessKeyframe, WindSpeedKeyframe, WindTurbulenceFreqHzKeyframe,
};
