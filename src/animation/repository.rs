//! 动作文件仓库
//!
//! 按扩展名判断能否读取，负责打开/创建文件并交给读写器处理。

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::{MotionError, Result};

use super::motion::Motion;
use super::vmd_loader::{TrailerPolicy, VmdReader};
use super::vmd_writer::{SaveOptions, VmdWriter};
use super::vpd_file::VpdReader;

fn has_extension(path: &str, ext: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(ext))
}

/// 去掉扩展名的文件名
fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// 检查扩展名与文件是否存在
fn check_loadable(path: &str, ext: &str) -> Result<()> {
    if !has_extension(path, ext) {
        return Err(MotionError::ExtensionInvalid {
            path: path.to_string(),
            expected: format!(".{}", ext),
        });
    }
    if !Path::new(path).is_file() {
        return Err(MotionError::FileNotFound(path.to_string()));
    }
    Ok(())
}

/// VMD 仓库
#[derive(Debug, Clone, Copy)]
pub struct VmdRepository {
    reader: VmdReader,
}

impl Default for VmdRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl VmdRepository {
    /// 读取策略取自全局配置
    pub fn new() -> Self {
        Self::with_policy(TrailerPolicy::from_config())
    }

    pub fn with_policy(policy: TrailerPolicy) -> Self {
        Self {
            reader: VmdReader::new(policy),
        }
    }

    pub fn can_load(&self, path: &str) -> bool {
        has_extension(path, "vmd")
    }

    pub fn infer_name(&self, path: &str) -> String {
        file_stem(path)
    }

    /// 加载 VMD 文件
    pub fn load(&self, path: &str) -> Result<Motion> {
        check_loadable(path, "vmd")?;
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let motion = self.reader.read_from_reader(&mut reader, path)?;
        log::info!(
            "VMD 加载完成: {} (骨骼 {} 帧, 表情 {} 帧, 相机 {} 帧)",
            path,
            motion.bone_frame_count(),
            motion.morph_frame_count(),
            motion.camera.len()
        );
        Ok(motion)
    }

    /// 只读取模型名
    pub fn load_name(&self, path: &str) -> Result<String> {
        check_loadable(path, "vmd")?;
        let file = File::open(path)?;
        self.reader.read_name(&mut BufReader::new(file))
    }

    /// 保存为 VMD，path 为空时使用 Motion::path
    pub fn save(&self, path: &str, motion: &Motion, options: SaveOptions) -> Result<()> {
        let path = if path.is_empty() { motion.path.as_str() } else { path };
        if !has_extension(path, "vmd") {
            return Err(MotionError::EncodeFailed(format!("not a VMD path: {}", path)));
        }

        let file = File::create(path).map_err(|e| MotionError::SaveFailed(format!("{}: {}", path, e)))?;
        let mut writer = BufWriter::new(file);
        VmdWriter::new(options).write_to(&mut writer, motion)?;
        log::info!(
            "VMD 保存完成: {} (骨骼 {} 帧, 表情 {} 帧)",
            path,
            motion.bone_frame_count(),
            motion.morph_frame_count()
        );
        Ok(())
    }
}

/// VPD 仓库（只读）
#[derive(Debug, Clone, Copy, Default)]
pub struct VpdRepository;

impl VpdRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn can_load(&self, path: &str) -> bool {
        has_extension(path, "vpd")
    }

    pub fn infer_name(&self, path: &str) -> String {
        file_stem(path)
    }

    /// 加载 VPD 文件
    pub fn load(&self, path: &str) -> Result<Motion> {
        check_loadable(path, "vpd")?;
        let bytes = std::fs::read(path)?;
        let motion = VpdReader.read_from_bytes(&bytes, path)?;
        log::info!("VPD 加载完成: {} (骨骼 {} 个)", path, motion.bones.len());
        Ok(motion)
    }

    /// 不支持写出 VPD
    pub fn save(&self, path: &str, _motion: &Motion, _options: SaveOptions) -> Result<()> {
        Err(MotionError::EncodeFailed(format!("VPD writing is not supported: {}", path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::curves::BoneCurves;
    use crate::animation::keyframe::BoneKeyframe;
    use crate::animation::vmd_loader::{BONE_NAME_LEN, MODEL_NAME_LEN, SIGNATURE_LEN};
    use crate::math::{Quaternion, QuaternionExt, Vec3};
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[test]
    fn test_can_load_and_infer_name() {
        let vmd = VmdRepository::default();
        assert!(vmd.can_load("motion/dance.VMD"));
        assert!(!vmd.can_load("pose.vpd"));
        assert_eq!(vmd.infer_name("motion/ダンス.vmd"), "ダンス");

        let vpd = VpdRepository::new();
        assert!(vpd.can_load("pose.Vpd"));
        assert!(!vpd.can_load("pose.txt"));
        assert_eq!(vpd.infer_name("a/b/pose.vpd"), "pose");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let repo = VmdRepository::default();

        let missing = dir.path().join("missing.vmd");
        let err = repo.load(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, MotionError::FileNotFound(_)));

        let err = repo.load("motion.txt").unwrap_err();
        assert!(matches!(err, MotionError::ExtensionInvalid { .. }));
    }

    #[test]
    fn test_vmd_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_output.vmd");
        let path = path.to_str().unwrap();

        let mut motion = Motion::new(path);
        motion.name = "Null_00".to_string();
        motion.append_bone_frame(
            "センター",
            BoneKeyframe::with_transform(0.0, Vec3::new(1.0, 2.0, 3.0), Quaternion::from_degrees(10.0, 20.0, 30.0)),
        );

        let repo = VmdRepository::default();
        repo.save("", &motion, SaveOptions::default()).unwrap();
        assert_eq!(repo.load_name(path).unwrap(), "Null_00");

        let loaded = repo.load(path).unwrap();
        assert_eq!(loaded.name, "Null_00");
        assert_eq!(loaded.path, path);
        let track = loaded.bones.get("センター").unwrap();
        assert_eq!(track.len(), 1);
        let position = track.get(0.0).position_or_zero();
        assert_relative_eq!(position.x, 1.0, epsilon = 1e-8);
        assert_relative_eq!(position.y, 2.0, epsilon = 1e-8);
        assert_relative_eq!(position.z, 3.0, epsilon = 1e-8);

        // 长度稳定
        let first = std::fs::metadata(path).unwrap().len();
        repo.save(path, &loaded, SaveOptions::default()).unwrap();
        assert_eq!(std::fs::metadata(path).unwrap().len(), first);
    }

    #[test]
    fn test_disable_physics_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("physics.vmd");
        let path = path.to_str().unwrap();

        let mut motion = Motion::new(path);
        let mut key = BoneKeyframe::with_transform(0.0, Vec3::ZERO, Quaternion::IDENTITY);
        key.curves = Some(BoneCurves::default());
        key.disable_physics = Some(true);
        motion.append_bone_frame("髪", key);

        let repo = VmdRepository::default();
        repo.save(path, &motion, SaveOptions::default()).unwrap();

        let bytes = std::fs::read(path).unwrap();
        let offset = SIGNATURE_LEN + MODEL_NAME_LEN + 4 + BONE_NAME_LEN + 4 + 12 + 16;
        let blob = &bytes[offset..offset + 64];
        assert_eq!(blob[2], 99);
        assert_eq!(blob[3], 15);
        let linear = BoneCurves::linear_values();
        for (i, (a, b)) in blob.iter().zip(linear.iter()).enumerate() {
            if i != 2 && i != 3 {
                assert_eq!(a, b, "byte {}", i);
            }
        }

        let loaded = repo.load(path).unwrap();
        let key = loaded.bones.get("髪").unwrap().get(0.0);
        assert!(key.is_physics_disabled());
        let curves = key.curves.unwrap();
        assert!(curves.translate_x.is_linear());
        assert!(curves.translate_y.is_linear());
        assert!(curves.translate_z.is_linear());
        assert!(curves.rotate.is_linear());
    }

    #[test]
    fn test_save_rejects_other_extension() {
        let motion = Motion::new("pose.vpd");
        let err = VmdRepository::default()
            .save("", &motion, SaveOptions::default())
            .unwrap_err();
        assert!(matches!(err, MotionError::EncodeFailed(_)));

        let err = VpdRepository::new()
            .save("pose.vpd", &motion, SaveOptions::default())
            .unwrap_err();
        assert!(matches!(err, MotionError::EncodeFailed(_)));
    }

    #[test]
    fn test_vpd_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pose.vpd");
        let text = "Vocaloid Pose Data file\r\n\r\nSample.osm;\t\t// 親ファイル名\r\n1;\r\n\r\nBone0{センター\r\n  0.5,1.25,2.75;  // trans x,y,z\r\n  0,0,0,1;  // Quaternion x,y,z,w\r\n}\r\n";
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(text);
        std::fs::write(&path, &bytes).unwrap();

        let motion = VpdRepository::new().load(path.to_str().unwrap()).unwrap();
        assert_eq!(motion.name, "Sample");
        let key = motion.bones.get("センター").unwrap().get(0.0);
        assert_relative_eq!(key.position_or_zero().z, 2.75, epsilon = 1e-8);
    }
}
