//! MMD Motion - Rust 实现的 MMD 动作数据库
//!
//! 提供：
//! - VMD 动作文件读写、VPD 姿势文件读取
//! - 骨骼/表情/相机/照明/阴影/IK 关键帧轨道与插值
//! - 物理与风设置、剛体/关节参数覆盖轨道
//! - 贝塞尔插值曲线的求值、拆分与拟合
//! - 关键帧削减

pub mod animation;
pub mod config;
pub mod math;

pub use animation::{
    Motion, SaveOptions, TrailerPolicy, VmdReader, VmdRepository, VmdWriter, VpdRepository,
};
pub use config::{get_config, reset_config, set_config, MotionConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid extension: {path} (expected {expected})")]
    ExtensionInvalid { path: String, expected: String },

    #[error("Parse error: {0}")]
    ParseFailed(String),

    #[error("Name decode error: {0}")]
    NameDecodeFailed(String),

    #[error("Name encode error: {0}")]
    NameEncodeFailed(String),

    #[error("Save error: {0}")]
    SaveFailed(String),

    #[error("Encode error: {0}")]
    EncodeFailed(String),
}

pub type Result<T> = std::result::Result<T, MotionError>;
