//! VMD 文件写出

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::math::Vec3;
use crate::{MotionError, Result};

use super::curves::BoneCurves;
use super::keyframe::{BoneKeyframe, CameraKeyframe, IkKeyframe, LightKeyframe, ShadowKeyframe};
use super::motion::Motion;
use super::sjis::encode_fixed;
use super::vmd_loader::{BONE_NAME_LEN, IK_NAME_LEN, MODEL_NAME_LEN, MORPH_NAME_LEN, SIGNATURE_LEN};
use super::Frame;

/// 写出时总是使用的签名
pub const VMD_SIGNATURE: &str = "Vocaloid Motion Data 0002";

/// 保存选项
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// 写出的模型名，None 时使用 Motion::name
    pub overwrite_name: Option<String>,
}

fn save_err(section: &'static str) -> impl Fn(std::io::Error) -> MotionError {
    move |e| MotionError::SaveFailed(format!("{}: {}", section, e))
}

/// VMD 写出器
#[derive(Debug, Clone, Default)]
pub struct VmdWriter {
    pub options: SaveOptions,
}

impl VmdWriter {
    pub fn new(options: SaveOptions) -> Self {
        Self { options }
    }

    /// 写出到任意 Writer
    pub fn write_to<W: Write>(&self, writer: &mut W, motion: &Motion) -> Result<()> {
        let name = self.options.overwrite_name.as_deref().unwrap_or(&motion.name);
        write_header(writer, name)?;
        write_bone_frames(writer, motion)?;
        write_morph_frames(writer, motion)?;
        write_camera_frames(writer, motion)?;
        write_light_frames(writer, motion)?;
        write_shadow_frames(writer, motion)?;
        write_ik_frames(writer, motion)?;
        writer.flush().map_err(save_err("VMD flush"))?;
        Ok(())
    }

    /// 写出到内存
    pub fn write_to_bytes(&self, motion: &Motion) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes, motion)?;
        Ok(bytes)
    }
}

fn write_header<W: Write>(writer: &mut W, name: &str) -> Result<()> {
    let signature = encode_fixed(VMD_SIGNATURE, SIGNATURE_LEN, "VMD signature")?;
    writer.write_all(&signature).map_err(save_err("VMD signature"))?;
    let name = encode_fixed(name, MODEL_NAME_LEN, "VMD model name")?;
    writer.write_all(&name).map_err(save_err("VMD model name"))?;
    Ok(())
}

/// 帧号四舍五入为整数
fn write_frame_index<W: Write>(writer: &mut W, frame: Frame) -> Result<()> {
    writer
        .write_u32::<LittleEndian>(frame.round() as u32)
        .map_err(save_err("VMD frame index"))
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3, section: &'static str) -> Result<()> {
    for value in [v.x, v.y, v.z] {
        writer
            .write_f32::<LittleEndian>(value as f32)
            .map_err(save_err(section))?;
    }
    Ok(())
}

fn write_count<W: Write>(writer: &mut W, count: usize, section: &'static str) -> Result<()> {
    writer
        .write_u32::<LittleEndian>(count as u32)
        .map_err(save_err(section))
}

fn bone_curve_bytes(key: &BoneKeyframe) -> [u8; 64] {
    let disable_physics = key.is_physics_disabled();
    match &key.curves {
        Some(curves) => curves.merge(!disable_physics),
        None if disable_physics => BoneCurves::disable_physics_values(),
        None => BoneCurves::linear_values(),
    }
}

/// 骨骼节：各骨骼的最后一帧先写，其余帧按升序写在后面。
/// 部分读取端依赖这个顺序。
fn write_bone_frames<W: Write>(writer: &mut W, motion: &Motion) -> Result<()> {
    write_count(writer, motion.bone_frame_count(), "VMD bone frame count")?;

    for (name, track) in motion.bones.iter() {
        if let Some(last) = track.stored(track.max_frame()) {
            write_bone_frame(writer, name, last)?;
        }
    }
    for (name, track) in motion.bones.iter() {
        let max_frame = track.max_frame();
        for key in track.iter().filter(|key| key.frame < max_frame) {
            write_bone_frame(writer, name, key)?;
        }
    }
    Ok(())
}

fn write_bone_frame<W: Write>(writer: &mut W, name: &str, key: &BoneKeyframe) -> Result<()> {
    let name_bytes = encode_fixed(name, BONE_NAME_LEN, "VMD bone name")?;
    writer.write_all(&name_bytes).map_err(save_err("VMD bone name"))?;
    write_frame_index(writer, key.frame)?;
    write_vec3(writer, key.position_or_zero(), "VMD bone position")?;

    let rotation = key.rotation_or_identity();
    for value in [rotation.x, rotation.y, rotation.z, rotation.w] {
        writer
            .write_f32::<LittleEndian>(value as f32)
            .map_err(save_err("VMD bone rotation"))?;
    }
    writer
        .write_all(&bone_curve_bytes(key))
        .map_err(save_err("VMD bone curves"))
}

fn write_morph_frames<W: Write>(writer: &mut W, motion: &Motion) -> Result<()> {
    write_count(writer, motion.morph_frame_count(), "VMD morph frame count")?;

    for (name, track) in motion.morphs.iter() {
        let name_bytes = encode_fixed(name, MORPH_NAME_LEN, "VMD morph name")?;
        for key in track.iter() {
            writer.write_all(&name_bytes).map_err(save_err("VMD morph name"))?;
            write_frame_index(writer, key.frame)?;
            writer
                .write_f32::<LittleEndian>(key.ratio as f32)
                .map_err(save_err("VMD morph ratio"))?;
        }
    }
    Ok(())
}

fn write_camera_frames<W: Write>(writer: &mut W, motion: &Motion) -> Result<()> {
    write_count(writer, motion.camera.len(), "VMD camera frame count")?;
    for key in motion.camera.iter() {
        write_camera_frame(writer, key)?;
    }
    Ok(())
}

fn write_camera_frame<W: Write>(writer: &mut W, key: &CameraKeyframe) -> Result<()> {
    write_frame_index(writer, key.frame)?;
    writer
        .write_f32::<LittleEndian>(key.distance as f32)
        .map_err(save_err("VMD camera distance"))?;
    write_vec3(writer, key.position, "VMD camera position")?;
    write_vec3(writer, key.degrees, "VMD camera rotation")?;
    writer
        .write_all(&key.curves.merge())
        .map_err(save_err("VMD camera curves"))?;
    writer
        .write_u32::<LittleEndian>(key.view_of_angle as u32)
        .map_err(save_err("VMD camera view angle"))?;
    writer
        .write_u8(key.perspective_off as u8)
        .map_err(save_err("VMD camera perspective"))
}

fn write_light_frames<W: Write>(writer: &mut W, motion: &Motion) -> Result<()> {
    write_count(writer, motion.light.len(), "VMD light frame count")?;
    for key in motion.light.iter() {
        write_light_frame(writer, key)?;
    }
    Ok(())
}

fn write_light_frame<W: Write>(writer: &mut W, key: &LightKeyframe) -> Result<()> {
    write_frame_index(writer, key.frame)?;
    write_vec3(writer, key.color, "VMD light color")?;
    write_vec3(writer, key.position, "VMD light position")
}

fn write_shadow_frames<W: Write>(writer: &mut W, motion: &Motion) -> Result<()> {
    write_count(writer, motion.shadow.len(), "VMD shadow frame count")?;
    for key in motion.shadow.iter() {
        write_shadow_frame(writer, key)?;
    }
    Ok(())
}

fn write_shadow_frame<W: Write>(writer: &mut W, key: &ShadowKeyframe) -> Result<()> {
    write_frame_index(writer, key.frame)?;
    writer.write_u8(key.mode).map_err(save_err("VMD shadow mode"))?;
    writer
        .write_f32::<LittleEndian>(key.distance as f32)
        .map_err(save_err("VMD shadow distance"))
}

fn write_ik_frames<W: Write>(writer: &mut W, motion: &Motion) -> Result<()> {
    write_count(writer, motion.ik.len(), "VMD ik frame count")?;
    for key in motion.ik.iter() {
        write_ik_frame(writer, key)?;
    }
    Ok(())
}

fn write_ik_frame<W: Write>(writer: &mut W, key: &IkKeyframe) -> Result<()> {
    write_frame_index(writer, key.frame)?;
    writer.write_u8(key.visible as u8).map_err(save_err("VMD ik visible"))?;
    write_count(writer, key.ik_list.len(), "VMD ik count")?;
    for ik in &key.ik_list {
        let name = encode_fixed(&ik.bone_name, IK_NAME_LEN, "VMD ik bone name")?;
        writer.write_all(&name).map_err(save_err("VMD ik bone name"))?;
        writer.write_u8(ik.enabled as u8).map_err(save_err("VMD ik enabled"))?;
    }
    Ok(())
}
