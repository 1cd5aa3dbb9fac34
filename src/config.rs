//! 动作读写配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 动作读写配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct MotionConfig {
    // ========== VMD 读取 ==========
    /// 相机/照明/阴影/IK 段读取失败时是否报错，默认 false
    /// false 时保留已读取的部分并记录警告
    pub strict_trailers: bool,

    // ========== 曲线拟合 ==========
    /// 最大迭代次数，默认 1000
    pub fit_max_iterations: usize,
    /// 最大函数求值次数，默认 10000
    pub fit_max_evaluations: usize,
    /// 梯度收敛阈值，默认 1e-6
    pub fit_gradient_threshold: f64,

    // ========== 关键帧精简 ==========
    /// 位置容差，默认 1e-2
    pub reduce_position_tolerance: f64,
    /// 旋转容差（四元数点积与 1 的差），默认 1e-3
    pub reduce_rotation_tolerance: f64,

    // ========== 调试 ==========
    /// 输出各段的调试日志，默认 false
    pub verbose_log: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            strict_trailers: false,

            fit_max_iterations: 1000,
            fit_max_evaluations: 10000,
            fit_gradient_threshold: 1e-6,

            reduce_position_tolerance: 1e-2,
            reduce_rotation_tolerance: 1e-3,

            verbose_log: false,
        }
    }
}

/// 全局配置
static MOTION_CONFIG: Lazy<RwLock<MotionConfig>> =
    Lazy::new(|| RwLock::new(MotionConfig::default()));

/// 获取当前配置
pub fn get_config() -> MotionConfig {
    MOTION_CONFIG
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// 替换配置
pub fn set_config(config: MotionConfig) {
    *MOTION_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 恢复默认配置
pub fn reset_config() {
    set_config(MotionConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = MotionConfig::default();
        assert!(!config.strict_trailers);
        assert_eq!(config.fit_max_iterations, 1000);
        assert_eq!(config.fit_max_evaluations, 10000);
        assert_eq!(config.fit_gradient_threshold, 1e-6);
    }
}
