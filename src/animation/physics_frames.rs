//! 物理设置关键帧
//!
//! 这些轨道不插值：两帧之间取后一帧。

use crate::math::Vec3;

use super::Frame;

/// 默认最大子步数
pub const DEFAULT_MAX_SUB_STEPS: i32 = 2;
/// 默认每秒物理步数
pub const DEFAULT_FIXED_TIME_STEP_NUM: f64 = 60.0;

/// 最大子步数
#[derive(Clone, Debug, PartialEq)]
pub struct MaxSubStepsKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub max_sub_steps: i32,
}

impl MaxSubStepsKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, max_sub_steps: DEFAULT_MAX_SUB_STEPS }
    }
}

/// 固定时间步（以每秒步数保存）
#[derive(Clone, Debug, PartialEq)]
pub struct FixedTimeStepKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub fixed_time_step_num: f64,
}

impl FixedTimeStepKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, fixed_time_step_num: DEFAULT_FIXED_TIME_STEP_NUM }
    }

    /// 时间步（秒），步数非正时按 60
    pub fn fixed_time_step(&self) -> f64 {
        if self.fixed_time_step_num <= 0.0 {
            return 1.0 / DEFAULT_FIXED_TIME_STEP_NUM;
        }
        1.0 / self.fixed_time_step_num
    }
}

/// 重力
#[derive(Clone, Debug, PartialEq)]
pub struct GravityKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub gravity: Vec3,
}

impl GravityKeyframe {
    pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);

    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, gravity: Self::DEFAULT_GRAVITY }
    }
}

/// 物理重置方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhysicsResetType {
    #[default]
    None,
    /// 连续帧重置
    ContinueFrame,
    /// 起始帧重置
    StartFrame,
    /// 起始帧重置（Y 字站姿）
    StartFitFrame,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsResetKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub reset_type: PhysicsResetType,
}

impl PhysicsResetKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, reset_type: PhysicsResetType::None }
    }
}

next_wins_keyframe!(MaxSubStepsKeyframe);
next_wins_keyframe!(FixedTimeStepKeyframe);
next_wins_keyframe!(GravityKeyframe);
next_wins_keyframe!(PhysicsResetKeyframe);
