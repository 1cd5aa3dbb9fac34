//! 风设置关键帧
//!
//! 与物理设置相同，两帧之间取后一帧。系数类保存的是倒数前的值。

use crate::math::Vec3;

use super::Frame;

/// 系数默认值
pub const DEFAULT_WIND_COEFF: f64 = 60.0;

/// 1/x，x 非正时返回 fallback
fn reciprocal_or(x: f64, fallback: f64) -> f64 {
    if x <= 0.0 {
        fallback
    } else {
        1.0 / x
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindEnabledKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub enabled: bool,
}

impl WindEnabledKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, enabled: false }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindDirectionKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub direction: Vec3,
}

impl WindDirectionKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, direction: Vec3::ZERO }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindLiftCoeffKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub lift_coeff: f64,
}

impl WindLiftCoeffKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, lift_coeff: DEFAULT_WIND_COEFF }
    }

    pub fn wind_lift_coeff(&self) -> f64 {
        reciprocal_or(self.lift_coeff, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindDragCoeffKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub drag_coeff: f64,
}

impl WindDragCoeffKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, drag_coeff: DEFAULT_WIND_COEFF }
    }

    pub fn wind_drag_coeff(&self) -> f64 {
        reciprocal_or(self.drag_coeff, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindRandomnessKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub randomness: f64,
}

impl WindRandomnessKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, randomness: 0.0 }
    }

    /// 0 表示无随机
    pub fn wind_randomness(&self) -> f64 {
        reciprocal_or(self.randomness, 0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindTurbulenceFreqHzKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub turbulence_freq_hz: f64,
}

impl WindTurbulenceFreqHzKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, turbulence_freq_hz: 0.0 }
    }

    /// 0 表示无湍流
    pub fn wind_turbulence_freq_hz(&self) -> f64 {
        reciprocal_or(self.turbulence_freq_hz, 0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindSpeedKeyframe {
    pub frame: Frame,
    pub read: bool,
    pub speed: f64,
}

impl WindSpeedKeyframe {
    pub fn new(frame: Frame) -> Self {
        Self { frame, read: false, speed: DEFAULT_WIND_COEFF }
    }

    pub fn wind_speed(&self) -> f64 {
        reciprocal_or(self.speed, 1.0)
    }
}

next_wins_keyframe!(WindEnabledKeyframe);
next_wins_keyframe!(WindDirectionKeyframe);
next_wins_keyframe!(WindLiftCoeffKeyframe);
next_wins_keyframe!(WindDragCoeffKeyframe);
next_wins_keyframe!(WindRandomnessKeyframe);
next_wins_keyframe!(WindTurbulenceFreqHzKeyframe);
next_wins_keyframe!(WindSpeedKeyframe);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::track::Track;

    #[test]
    fn test_defaults() {
        assert!(!Track::<WindEnabledKeyframe>::new().get(0.0).enabled);
        assert_eq!(Track::<WindDirectionKeyframe>::new().get(0.0).direction, Vec3::ZERO);
        assert_eq!(WindLiftCoeffKeyframe::new(0.0).wind_lift_coeff(), 1.0 / 60.0);
        assert_eq!(WindDragCoeffKeyframe::new(0.0).wind_drag_coeff(), 1.0 / 60.0);
        assert_eq!(WindSpeedKeyframe::new(0.0).wind_speed(), 1.0 / 60.0);
        assert_eq!(WindRandomnessKeyframe::new(0.0).wind_randomness(), 0.0);
        assert_eq!(WindTurbulenceFreqHzKeyframe::new(0.0).wind_turbulence_freq_hz(), 0.0);
    }

    #[test]
    fn test_non_positive_coeff() {
        let mut speed = WindSpeedKeyframe::new(0.0);
        speed.speed = -1.0;
        assert_eq!(speed.wind_speed(), 1.0);

        let mut freq = WindTurbulenceFreqHzKeyframe::new(0.0);
        freq.turbulence_freq_hz = 4.0;
        assert_eq!(freq.wind_turbulence_freq_hz(), 0.25);
    }

    #[test]
    fn test_next_wins() {
        let mut track = Track::new();
        let mut on = WindEnabledKeyframe::new(30.0);
        on.enabled = true;
        track.append(WindEnabledKeyframe::new(0.0));
        track.append(on);
        assert!(track.get(1.0).enabled);
        assert!(!track.get(0.0).enabled);
    }
}
