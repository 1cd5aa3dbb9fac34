//! VPD (Vocaloid Pose Data) 文件解析
//!
//! VPD 是 Shift-JIS 编码的文本文件，只包含一帧姿势，读入后放在第 0 帧。
//! Morph 块是 MMM (MikuMikuMoving) 的扩展，同样读取。

use crate::math::{Quaternion, Vec3};
use crate::{MotionError, Result};

use super::keyframe::{BoneKeyframe, MorphKeyframe};
use super::motion::Motion;
use super::sjis::decode_text;

const VPD_SIGNATURE: &str = "Vocaloid Pose Data file";
const MODEL_NAME_MARKER: &str = ".osm;";
const MODEL_NAME_COMMENT: &str = "// 親ファイル名";

fn parse_failed(section: &str) -> MotionError {
    MotionError::ParseFailed(section.to_string())
}

/// VPD 读取器
#[derive(Debug, Clone, Copy, Default)]
pub struct VpdReader;

impl VpdReader {
    pub fn read_from_bytes(&self, bytes: &[u8], path: &str) -> Result<Motion> {
        let content = decode_text(bytes, "VPD text")?;
        let lines: Vec<String> = content
            .lines()
            .map(|line| line.replace('\t', "    "))
            .collect();

        let mut motion = Motion::new(path);
        if lines.len() < 3 {
            return Err(parse_failed("VPD header"));
        }
        if !lines[0].contains(VPD_SIGNATURE) {
            return Err(parse_failed("VPD signature"));
        }
        motion.name = parse_model_name(&lines[2])?;

        let mut rest = lines[3..].iter().map(|line| line.trim()).filter(|line| !line.is_empty());
        while let Some(line) = rest.next() {
            let Some((kind, name)) = parse_block_start(line) else {
                continue;
            };
            match kind {
                BlockKind::Bone => {
                    let position = rest
                        .next()
                        .and_then(|l| parse_numbers::<3>(l))
                        .ok_or_else(|| parse_failed("VPD bone position"))?;
                    let rotation = rest
                        .next()
                        .and_then(|l| parse_numbers::<4>(l))
                        .ok_or_else(|| parse_failed("VPD bone rotation"))?;

                    let [x, y, z] = position;
                    let [qx, qy, qz, qw] = rotation;
                    let mut key = BoneKeyframe::with_transform(
                        0.0,
                        Vec3::new(x, y, z),
                        Quaternion::from_xyzw(qx, qy, qz, qw),
                    );
                    key.read = true;
                    motion.append_bone_frame(name, key);
                }
                BlockKind::Morph => {
                    let [ratio] = rest
                        .next()
                        .and_then(|l| parse_numbers::<1>(l))
                        .ok_or_else(|| parse_failed("VPD morph ratio"))?;
                    let mut key = MorphKeyframe::new(0.0, ratio);
                    key.read = true;
                    motion.append_morph_frame(name, key);
                }
            }
        }

        log::info!(
            "VPD 解析完成: {} 个骨骼, {} 个表情",
            motion.bones.len(),
            motion.morphs.len()
        );
        motion.update_hash();
        Ok(motion)
    }
}

/// 从 "Sample.osm;    // 親ファイル名" 取出 "Sample"
fn parse_model_name(line: &str) -> Result<String> {
    let marker = line
        .find(MODEL_NAME_MARKER)
        .ok_or_else(|| parse_failed("VPD model name"))?;
    if !line[marker..].contains(MODEL_NAME_COMMENT) {
        return Err(parse_failed("VPD model name"));
    }
    Ok(line[..marker].trim().to_string())
}

enum BlockKind {
    Bone,
    Morph,
}

/// "Bone0{センター" → (Bone, "センター")
fn parse_block_start(line: &str) -> Option<(BlockKind, &str)> {
    let (head, name) = line.split_once('{')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let kind = if head.starts_with("Bone") {
        BlockKind::Bone
    } else if head.starts_with("Morph") {
        BlockKind::Morph
    } else {
        return None;
    };
    Some((kind, name))
}

/// 从 "0.5,1.25,2.75;    // trans x,y,z" 这样的行取 N 个数
fn parse_numbers<const N: usize>(line: &str) -> Option<[f64; N]> {
    let (values, _) = line.split_once(';')?;
    let parts: Vec<&str> = values.split(',').collect();
    if parts.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.trim().parse().ok()?;
    }
    Some(out)
}
