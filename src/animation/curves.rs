//! VMD 插值记录
//!
//! 骨骼关键帧带 64 字节插值记录，相机关键帧带 24 字节插值记录。

use super::bezier::{Curve, CURVE_MAX};
use super::Frame;

pub const BONE_CURVES_LEN: usize = 64;
pub const CAMERA_CURVES_LEN: usize = 24;

/// 物理关闭标记所在的字节位置与取值
pub const DISABLE_PHYSICS_MARKER: [(usize, u8); 2] = [(2, 99), (3, 15)];

/// 骨骼插值记录的默认值
pub const INITIAL_BONE_CURVES: [u8; BONE_CURVES_LEN] = [
    20, 20, 0, 0, 20, 20, 20, 20, 107, 107, 107, 107, 107, 107, 107, 107, //
    20, 20, 20, 20, 20, 20, 20, 107, 107, 107, 107, 107, 107, 107, 107, 0, //
    20, 20, 20, 20, 20, 20, 107, 107, 107, 107, 107, 107, 107, 107, 0, 0, //
    20, 20, 20, 20, 20, 107, 107, 107, 107, 107, 107, 107, 107, 0, 0, 0,
];

/// 相机插值记录的默认值
pub const INITIAL_CAMERA_CURVES: [u8; CAMERA_CURVES_LEN] = [
    20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, //
    107, 107, 107, 107, 107, 107, 107, 107, 107, 107, 107, 107,
];

/// 控制点坐标写出为 0..127 的整数
fn to_byte(v: f64) -> u8 {
    v.round().clamp(0.0, CURVE_MAX) as u8
}

fn curve_at(values: &[u8], offsets: [usize; 4]) -> Curve {
    Curve::from_vmd_data([
        values[offsets[0]],
        values[offsets[1]],
        values[offsets[2]],
        values[offsets[3]],
    ])
}

/// 骨骼插值曲线：X/Y/Z 平移与旋转
#[derive(Clone, Debug, PartialEq)]
pub struct BoneCurves {
    pub translate_x: Curve,
    pub translate_y: Curve,
    pub translate_z: Curve,
    pub rotate: Curve,
    /// 读取时的原始字节，写出时用来保留辅助字节
    pub values: [u8; BONE_CURVES_LEN],
}

impl Default for BoneCurves {
    fn default() -> Self {
        Self::from_values(&INITIAL_BONE_CURVES)
    }
}

impl BoneCurves {
    /// 从 VMD 字节解析，长度不足时使用默认值
    pub fn from_values(values: &[u8]) -> Self {
        let mut raw = INITIAL_BONE_CURVES;
        if values.len() >= BONE_CURVES_LEN {
            raw.copy_from_slice(&values[..BONE_CURVES_LEN]);
        }
        Self {
            translate_x: curve_at(&raw, [0, 4, 8, 12]),
            translate_y: curve_at(&raw, [16, 20, 24, 28]),
            translate_z: curve_at(&raw, [32, 36, 40, 44]),
            rotate: curve_at(&raw, [48, 52, 56, 60]),
            values: raw,
        }
    }

    /// 四条曲线都取同一条
    pub fn uniform(curve: Curve) -> Self {
        Self {
            translate_x: curve,
            translate_y: curve,
            translate_z: curve,
            rotate: curve,
            ..Self::default()
        }
    }

    /// 字节中是否带物理关闭标记
    pub fn has_disable_physics_marker(values: &[u8]) -> bool {
        DISABLE_PHYSICS_MARKER
            .iter()
            .all(|&(i, v)| values.get(i) == Some(&v))
    }

    /// 求四个通道的插值系数 (x, y, z, rotate)
    pub fn evaluate(&self, prev: Frame, now: Frame, next: Frame) -> (f64, f64, f64, f64) {
        (
            self.translate_x.evaluate(prev, now, next).1,
            self.translate_y.evaluate(prev, now, next).1,
            self.translate_z.evaluate(prev, now, next).1,
            self.rotate.evaluate(prev, now, next).1,
        )
    }

    /// 在 `now` 处拆分全部曲线，返回 (左半, 右半)
    pub fn split(&self, prev: Frame, now: Frame, next: Frame) -> (BoneCurves, BoneCurves) {
        let (x0, x1) = self.translate_x.split(prev, now, next);
        let (y0, y1) = self.translate_y.split(prev, now, next);
        let (z0, z1) = self.translate_z.split(prev, now, next);
        let (r0, r1) = self.rotate.split(prev, now, next);
        (
            Self { translate_x: x0, translate_y: y0, translate_z: z0, rotate: r0, values: self.values },
            Self { translate_x: x1, translate_y: y1, translate_z: z1, rotate: r1, values: self.values },
        )
    }

    /// 按 VMD 的错位布局生成 64 字节
    pub fn merge(&self, enable_physics: bool) -> [u8; BONE_CURVES_LEN] {
        let (tx, ty, tz, r) = (&self.translate_x, &self.translate_y, &self.translate_z, &self.rotate);
        let v = &self.values;

        let (c02, c03) = if enable_physics {
            (to_byte(tz.start.x), to_byte(r.start.x))
        } else {
            (DISABLE_PHYSICS_MARKER[0].1, DISABLE_PHYSICS_MARKER[1].1)
        };

        let start_y = [tx.start.y, ty.start.y, tz.start.y, r.start.y].map(to_byte);
        let end_x = [tx.end.x, ty.end.x, tz.end.x, r.end.x].map(to_byte);
        let end_y = [tx.end.y, ty.end.y, tz.end.y, r.end.y].map(to_byte);

        let mut out = [0u8; BONE_CURVES_LEN];
        let mut i = 0;
        let mut push = |bytes: &[u8]| {
            out[i..i + bytes.len()].copy_from_slice(bytes);
            i += bytes.len();
        };

        push(&[to_byte(tx.start.x), to_byte(ty.start.x), c02, c03]);
        push(&start_y);
        push(&end_x);
        push(&end_y);

        push(&[to_byte(ty.start.x), to_byte(tz.start.x), to_byte(r.start.x)]);
        push(&start_y);
        push(&end_x);
        push(&end_y);
        push(&[v[31]]);

        push(&[to_byte(tz.start.x), to_byte(r.start.x)]);
        push(&start_y);
        push(&end_x);
        push(&end_y);
        push(&[v[46], v[47]]);

        push(&[to_byte(r.start.x)]);
        push(&start_y);
        push(&end_x);
        push(&end_y);
        push(&[v[61], v[62], v[63]]);

        out
    }

    /// 线性曲线、物理有效时的标准字节
    pub fn linear_values() -> [u8; BONE_CURVES_LEN] {
        Self::default().merge(true)
    }

    /// 物理关闭时写出的字节：标准线性字节加上标记
    pub fn disable_physics_values() -> [u8; BONE_CURVES_LEN] {
        let mut values = Self::linear_values();
        for (i, v) in DISABLE_PHYSICS_MARKER {
            values[i] = v;
        }
        values
    }
}

/// 相机插值曲线
#[derive(Clone, Debug, PartialEq)]
pub struct CameraCurves {
    pub translate_x: Curve,
    pub translate_y: Curve,
    pub translate_z: Curve,
    pub rotate: Curve,
    pub distance: Curve,
    pub view_of_angle: Curve,
}

impl Default for CameraCurves {
    fn default() -> Self {
        Self::from_values(&INITIAL_CAMERA_CURVES)
    }
}

impl CameraCurves {
    /// 从 VMD 字节解析，长度不足时使用默认值
    pub fn from_values(values: &[u8]) -> Self {
        let raw: &[u8] = if values.len() >= CAMERA_CURVES_LEN {
            values
        } else {
            &INITIAL_CAMERA_CURVES
        };
        Self {
            translate_x: curve_at(raw, [0, 6, 12, 18]),
            translate_y: curve_at(raw, [1, 7, 13, 19]),
            translate_z: curve_at(raw, [2, 8, 14, 20]),
            rotate: curve_at(raw, [3, 9, 15, 21]),
            distance: curve_at(raw, [4, 10, 16, 22]),
            view_of_angle: curve_at(raw, [5, 11, 17, 23]),
        }
    }

    fn curves(&self) -> [&Curve; 6] {
        [
            &self.translate_x,
            &self.translate_y,
            &self.translate_z,
            &self.rotate,
            &self.distance,
            &self.view_of_angle,
        ]
    }

    pub fn is_linear(&self) -> bool {
        self.curves().iter().all(|c| **c == Curve::linear())
    }

    /// 求六个通道的插值系数 (x, y, z, rotate, distance, view_of_angle)
    pub fn evaluate(&self, prev: Frame, now: Frame, next: Frame) -> [f64; 6] {
        self.curves().map(|c| c.evaluate(prev, now, next).1)
    }

    /// 在 `now` 处拆分全部曲线，返回 (左半, 右半)
    pub fn split(&self, prev: Frame, now: Frame, next: Frame) -> (CameraCurves, CameraCurves) {
        let [x, y, z, r, d, v] = self.curves().map(|c| c.split(prev, now, next));
        (
            Self {
                translate_x: x.0,
                translate_y: y.0,
                translate_z: z.0,
                rotate: r.0,
                distance: d.0,
                view_of_angle: v.0,
            },
            Self {
                translate_x: x.1,
                translate_y: y.1,
                translate_z: z.1,
                rotate: r.1,
                distance: d.1,
                view_of_angle: v.1,
            },
        )
    }

    /// 按行生成 24 字节：start.x 行、start.y 行、end.x 行、end.y 行
    pub fn merge(&self) -> [u8; CAMERA_CURVES_LEN] {
        let curves = self.curves();
        let mut out = [0u8; CAMERA_CURVES_LEN];
        for (i, c) in curves.iter().enumerate() {
            out[i] = to_byte(c.start.x);
            out[6 + i] = to_byte(c.start.y);
            out[12 + i] = to_byte(c.end.x);
            out[18 + i] = to_byte(c.end.y);
        }
        out
    }
}
