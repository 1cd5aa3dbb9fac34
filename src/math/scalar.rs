//! 标量工具

/// NaN / 无穷大视为 0
pub fn effective(v: f64) -> f64 {
    if v.is_nan() || v.is_infinite() {
        0.0
    } else {
        v
    }
}

/// 线性插值，t 在两端截断
pub fn lerp(v1: f64, v2: f64, t: f64) -> f64 {
    if t <= 0.0 {
        return v1;
    }
    if t >= 1.0 {
        return v2;
    }
    v1 + (v2 - v1) * t
}

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

pub fn rad_to_deg(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// 四舍五入到 threshold 的整数倍
pub fn round(v: f64, threshold: f64) -> f64 {
    if threshold == 0.0 {
        return v;
    }
    (v / threshold).round() * threshold
}

pub fn near_equals(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// 所有值与首个值的差都不超过 threshold
pub fn is_almost_all_same_values(values: &[f64], threshold: f64) -> bool {
    match values.first() {
        None => true,
        Some(&first) => values.iter().all(|&v| (v - first).abs() <= threshold),
    }
}
