//! VMD 文件读取
//!
//! 解析 VMD 动作文件并转换为 Motion 数据

use std::io::{Cursor, ErrorKind, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::config::get_config;
use crate::math::{Quaternion, Vec3};
use crate::{MotionError, Result};

use super::curves::{BoneCurves, CameraCurves, BONE_CURVES_LEN, CAMERA_CURVES_LEN};
use super::keyframe::{
    BoneKeyframe, CameraKeyframe, IkEnabledFrame, IkKeyframe, LightKeyframe, MorphKeyframe,
    ShadowKeyframe,
};
use super::motion::Motion;
use super::sjis::decode_fixed;
use super::Frame;

pub(crate) const SIGNATURE_LEN: usize = 30;
pub(crate) const MODEL_NAME_LEN: usize = 20;
pub(crate) const BONE_NAME_LEN: usize = 15;
pub(crate) const MORPH_NAME_LEN: usize = 15;
pub(crate) const IK_NAME_LEN: usize = 20;

/// 相机之后各节（相机、照明、阴影、IK）的读取策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrailerPolicy {
    /// 读取失败时保留已读内容并返回成功
    #[default]
    Lenient,
    /// 只允许在节边界处干净结束，其余失败都报错
    Strict,
}

impl TrailerPolicy {
    pub fn from_config() -> Self {
        if get_config().strict_trailers {
            TrailerPolicy::Strict
        } else {
            TrailerPolicy::Lenient
        }
    }
}

fn parse_err(section: &'static str) -> impl Fn(std::io::Error) -> MotionError {
    move |e| MotionError::ParseFailed(format!("{}: {}", section, e))
}

/// VMD 读取器
#[derive(Debug, Clone, Copy, Default)]
pub struct VmdReader {
    pub policy: TrailerPolicy,
}

impl VmdReader {
    pub fn new(policy: TrailerPolicy) -> Self {
        Self { policy }
    }

    /// 从字节切片读取，path 只记录在 Motion 上
    pub fn read_from_bytes(&self, bytes: &[u8], path: &str) -> Result<Motion> {
        let mut reader = Cursor::new(bytes);
        self.read_from_reader(&mut reader, path)
    }

    /// 从 Reader 读取
    pub fn read_from_reader<R: Read>(&self, reader: &mut R, path: &str) -> Result<Motion> {
        let verbose = get_config().verbose_log;
        let mut motion = Motion::new(path);

        read_header(reader, &mut motion)?;
        read_bone_frames(reader, &mut motion)?;
        read_morph_frames(reader, &mut motion)?;
        if verbose {
            log::debug!(
                "VMD 必需节读取完成: 骨骼 {} 帧, 表情 {} 帧",
                motion.bone_frame_count(),
                motion.morph_frame_count()
            );
        }

        let trailers: [(&str, TrailerFn<R>); 4] = [
            ("camera", read_camera_frames),
            ("light", read_light_frames),
            ("shadow", read_shadow_frames),
            ("ik", read_ik_frames),
        ];
        for (section, read) in trailers {
            match read(reader, &mut motion) {
                Ok(true) => {
                    if verbose {
                        log::debug!("VMD {} 节读取完成", section);
                    }
                }
                // 干净结束，后面的节都不存在
                Ok(false) => break,
                Err(e) => match self.policy {
                    TrailerPolicy::Strict => return Err(e),
                    TrailerPolicy::Lenient => {
                        log::warn!("VMD {} 节读取失败，保留已读取内容: {}", section, e);
                        break;
                    }
                },
            }
        }

        motion.update_hash();
        Ok(motion)
    }

    /// 只读文件头，返回模型名
    pub fn read_name<R: Read>(&self, reader: &mut R) -> Result<String> {
        let mut motion = Motion::new("");
        read_header(reader, &mut motion)?;
        Ok(motion.name)
    }
}

/// 返回 Ok(false) 表示在节开头遇到文件末尾
type TrailerFn<R> = fn(&mut R, &mut Motion) -> Result<bool>;

fn read_header<R: Read>(reader: &mut R, motion: &mut Motion) -> Result<()> {
    let mut signature = [0u8; SIGNATURE_LEN];
    reader
        .read_exact(&mut signature)
        .map_err(parse_err("VMD signature"))?;
    // 签名只保存不校验
    motion.signature = decode_fixed(&signature, "VMD signature")?;

    let mut model_name = [0u8; MODEL_NAME_LEN];
    reader
        .read_exact(&mut model_name)
        .map_err(parse_err("VMD model name"))?;
    motion.name = decode_fixed(&model_name, "VMD model name")?;
    Ok(())
}

fn read_vec3<R: Read>(reader: &mut R, section: &'static str) -> Result<Vec3> {
    let x = reader.read_f32::<LittleEndian>().map_err(parse_err(section))?;
    let y = reader.read_f32::<LittleEndian>().map_err(parse_err(section))?;
    let z = reader.read_f32::<LittleEndian>().map_err(parse_err(section))?;
    Ok(Vec3::new(x as f64, y as f64, z as f64))
}

fn read_frame_index<R: Read>(reader: &mut R, section: &'static str) -> Result<Frame> {
    let index = reader.read_u32::<LittleEndian>().map_err(parse_err(section))?;
    Ok(index as Frame)
}

/// 读取节的数量；开头就是文件末尾时返回 None
fn read_section_count<R: Read>(reader: &mut R, section: &'static str) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(parse_err(section)(e)),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(u32::from_le_bytes(buf))),
        _ => Err(MotionError::ParseFailed(format!("{}: truncated", section))),
    }
}

fn read_bone_frames<R: Read>(reader: &mut R, motion: &mut Motion) -> Result<()> {
    let count = reader
        .read_u32::<LittleEndian>()
        .map_err(parse_err("VMD bone frame count"))?;

    for _ in 0..count {
        let mut name_bytes = [0u8; BONE_NAME_LEN];
        reader
            .read_exact(&mut name_bytes)
            .map_err(parse_err("VMD bone name"))?;
        let name = decode_fixed(&name_bytes, "VMD bone name")?;

        let frame = read_frame_index(reader, "VMD bone frame index")?;
        let position = read_vec3(reader, "VMD bone position")?;

        let mut rotation = [0f32; 4];
        reader
            .read_f32_into::<LittleEndian>(&mut rotation)
            .map_err(parse_err("VMD bone rotation"))?;

        let mut curves = [0u8; BONE_CURVES_LEN];
        reader
            .read_exact(&mut curves)
            .map_err(parse_err("VMD bone curves"))?;

        // 旋转不做归一化
        let [x, y, z, w] = rotation.map(|v| v as f64);
        let mut key = BoneKeyframe::with_transform(frame, position, Quaternion::from_xyzw(x, y, z, w));
        key.read = true;
        key.curves = Some(BoneCurves::from_values(&curves));
        if BoneCurves::has_disable_physics_marker(&curves) {
            key.disable_physics = Some(true);
        }
        motion.append_bone_frame(&name, key);
    }
    Ok(())
}

fn read_morph_frames<R: Read>(reader: &mut R, motion: &mut Motion) -> Result<()> {
    let count = reader
        .read_u32::<LittleEndian>()
        .map_err(parse_err("VMD morph frame count"))?;

    for _ in 0..count {
        let mut name_bytes = [0u8; MORPH_NAME_LEN];
        reader
            .read_exact(&mut name_bytes)
            .map_err(parse_err("VMD morph name"))?;
        let name = decode_fixed(&name_bytes, "VMD morph name")?;

        let frame = read_frame_index(reader, "VMD morph frame index")?;
        let ratio = reader
            .read_f32::<LittleEndian>()
            .map_err(parse_err("VMD morph ratio"))?;

        let mut key = MorphKeyframe::new(frame, ratio as f64);
        key.read = true;
        motion.append_morph_frame(&name, key);
    }
    Ok(())
}

/// VMD 相机数据: 61 字节/帧
fn read_camera_frames<R: Read>(reader: &mut R, motion: &mut Motion) -> Result<bool> {
    let Some(count) = read_section_count(reader, "VMD camera frame count")? else {
        return Ok(false);
    };

    for _ in 0..count {
        let mut key = CameraKeyframe::new(read_frame_index(reader, "VMD camera frame index")?);
        key.read = true;
        key.distance = reader
            .read_f32::<LittleEndian>()
            .map_err(parse_err("VMD camera distance"))? as f64;
        key.position = read_vec3(reader, "VMD camera position")?;
        key.degrees = read_vec3(reader, "VMD camera rotation")?;

        let mut curves = [0u8; CAMERA_CURVES_LEN];
        reader
            .read_exact(&mut curves)
            .map_err(parse_err("VMD camera curves"))?;
        key.curves = CameraCurves::from_values(&curves);

        key.view_of_angle = reader
            .read_u32::<LittleEndian>()
            .map_err(parse_err("VMD camera view angle"))? as i32;
        key.perspective_off = reader
            .read_u8()
            .map_err(parse_err("VMD camera perspective"))?
            == 1;
        motion.append_camera_frame(key);
    }
    Ok(true)
}

fn read_light_frames<R: Read>(reader: &mut R, motion: &mut Motion) -> Result<bool> {
    let Some(count) = read_section_count(reader, "VMD light frame count")? else {
        return Ok(false);
    };

    for _ in 0..count {
        let mut key = LightKeyframe::new(read_frame_index(reader, "VMD light frame index")?);
        key.read = true;
        key.color = read_vec3(reader, "VMD light color")?;
        key.position = read_vec3(reader, "VMD light position")?;
        motion.append_light_frame(key);
    }
    Ok(true)
}

fn read_shadow_frames<R: Read>(reader: &mut R, motion: &mut Motion) -> Result<bool> {
    let Some(count) = read_section_count(reader, "VMD shadow frame count")? else {
        return Ok(false);
    };

    for _ in 0..count {
        let mut key = ShadowKeyframe::new(read_frame_index(reader, "VMD shadow frame index")?);
        key.read = true;
        key.mode = reader.read_u8().map_err(parse_err("VMD shadow mode"))?;
        key.distance = reader
            .read_f32::<LittleEndian>()
            .map_err(parse_err("VMD shadow distance"))? as f64;
        motion.append_shadow_frame(key);
    }
    Ok(true)
}

fn read_ik_frames<R: Read>(reader: &mut R, motion: &mut Motion) -> Result<bool> {
    let Some(count) = read_section_count(reader, "VMD ik frame count")? else {
        return Ok(false);
    };

    for _ in 0..count {
        let mut key = IkKeyframe::new(read_frame_index(reader, "VMD ik frame index")?);
        key.read = true;
        key.visible = reader.read_u8().map_err(parse_err("VMD ik visible"))? == 1;

        let ik_count = reader
            .read_u32::<LittleEndian>()
            .map_err(parse_err("VMD ik count"))?;
        for _ in 0..ik_count {
            let mut name_bytes = [0u8; IK_NAME_LEN];
            reader
                .read_exact(&mut name_bytes)
                .map_err(parse_err("VMD ik bone name"))?;
            let name = decode_fixed(&name_bytes, "VMD ik bone name")?;
            let enabled = reader.read_u8().map_err(parse_err("VMD ik enabled"))? == 1;
            key.ik_list.push(IkEnabledFrame::new(&name, enabled));
        }
        motion.append_ik_frame(key);
    }
    Ok(true)
}
