//! 骨骼关键帧削减
//!
//! 逐帧采样后找出拐点，拐点之间用拟合曲线的一个关键帧代替；
//! 拟合结果无法在容差内复现采样时二分区间，最短为一帧。

use crate::config::get_config;
use crate::math::{is_almost_all_same_values, lerp, near_equals, round, Quaternion, QuaternionExt, Vec3};

use super::bezier::Curve;
use super::curves::BoneCurves;
use super::keyframe::BoneKeyframe;
use super::motion::BoneTrack;
use super::Frame;

const POSITION_INFLECTION_THRESHOLD: f64 = 1e-4;
const ROTATION_INFLECTION_THRESHOLD: f64 = 1e-6;

struct Samples {
    xs: Vec<f64>,
    ys: Vec<f64>,
    zs: Vec<f64>,
    quats: Vec<Quaternion>,
}

impl Samples {
    fn collect(track: &BoneTrack, last: usize) -> Self {
        let mut samples = Self {
            xs: Vec::with_capacity(last + 1),
            ys: Vec::with_capacity(last + 1),
            zs: Vec::with_capacity(last + 1),
            quats: Vec::with_capacity(last + 1),
        };
        for i in 0..=last {
            let key = track.get(i as Frame);
            let position = key.position_or_zero();
            samples.xs.push(position.x);
            samples.ys.push(position.y);
            samples.zs.push(position.z);
            samples.quats.push(key.rotation_or_identity());
        }
        samples
    }

    fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.xs[i], self.ys[i], self.zs[i])
    }

    fn inflection_frames(&self) -> Vec<usize> {
        let fix_rs: Vec<f64> = self.quats.iter().map(|q| Quaternion::IDENTITY.dot(*q)).collect();
        let channels = [
            (&self.xs, POSITION_INFLECTION_THRESHOLD),
            (&self.ys, POSITION_INFLECTION_THRESHOLD),
            (&self.zs, POSITION_INFLECTION_THRESHOLD),
            (&fix_rs, ROTATION_INFLECTION_THRESHOLD),
        ];

        let mut frames = Vec::new();
        for (values, threshold) in channels {
            if !is_almost_all_same_values(values, 0.0) {
                frames.extend(find_inflection_frames(values, threshold));
            }
        }
        frames.sort_unstable();
        frames.dedup();
        frames
    }
}

struct Tolerance {
    position: f64,
    rotation: f64,
}

impl BoneTrack {
    /// 削减关键帧
    ///
    /// 拐点不超过两个（或只有一帧）时原样返回副本。
    pub fn reduce(&self) -> BoneTrack {
        if self.is_empty() || self.max_frame() < 1.0 {
            return self.clone();
        }
        let last = self.max_frame().floor() as usize;
        let samples = Samples::collect(self, last);

        let inflections = samples.inflection_frames();
        if inflections.len() <= 2 {
            return self.clone();
        }

        let config = get_config();
        let tolerance = Tolerance {
            position: config.reduce_position_tolerance,
            rotation: config.reduce_rotation_tolerance,
        };

        let mut reduced = BoneTrack::new();
        let first = inflections[0];
        let mut first_key = self.get(first as Frame);
        first_key.frame = first as Frame;
        first_key.position = Some(samples.position(first));
        first_key.rotation = Some(samples.quats[first]);
        reduced.append(first_key);

        for window in inflections.windows(2) {
            self.reduce_range(window[0], window[1], &samples, &tolerance, &mut reduced);
        }

        log::debug!("关键帧削减: {} -> {}", self.len(), reduced.len());
        reduced
    }

    fn reduce_range(
        &self,
        start: usize,
        end: usize,
        samples: &Samples,
        tolerance: &Tolerance,
        reduced: &mut BoneTrack,
    ) {
        if end <= start + 1 {
            reduced.append(self.kept_key(start, end, samples));
            return;
        }

        if let Some(curves) = fit_range(start, end, samples, tolerance) {
            let mut key = BoneKeyframe::with_transform(end as Frame, samples.position(end), samples.quats[end]);
            key.curves = Some(curves);
            key.disable_physics = self.get(end as Frame).disable_physics;
            reduced.append(key);
            return;
        }

        let mid = (start + end) / 2;
        self.reduce_range(start, mid, samples, tolerance, reduced);
        self.reduce_range(mid, end, samples, tolerance, reduced);
    }

    /// 一帧区间：保留采样值，原曲线正好覆盖该区间时沿用
    fn kept_key(&self, start: usize, end: usize, samples: &Samples) -> BoneKeyframe {
        let frame = end as Frame;
        let mut key = BoneKeyframe::with_transform(frame, samples.position(end), samples.quats[end]);
        if let Some(stored) = self.stored(frame) {
            let (prev, has_prev) = self.prev_frame(frame);
            if has_prev && prev == start as Frame {
                key.curves = stored.curves.clone();
            }
            key.read = stored.read;
            key.disable_physics = stored.disable_physics;
        }
        key
    }
}

/// 拟合 [start, end] 的四条曲线并逐帧验证
fn fit_range(start: usize, end: usize, samples: &Samples, tolerance: &Tolerance) -> Option<BoneCurves> {
    let (q_start, q_end) = (samples.quats[start], samples.quats[end]);
    let rs: Vec<f64> = samples.quats[start..=end]
        .iter()
        .map(|q| Quaternion::find_slerp_t(q_start, q_end, *q, 0.0))
        .collect();

    let x_curve = Curve::try_fit(&samples.xs[start..=end], tolerance.position)?;
    let y_curve = Curve::try_fit(&samples.ys[start..=end], tolerance.position)?;
    let z_curve = Curve::try_fit(&samples.zs[start..=end], tolerance.position)?;
    let r_curve = Curve::try_fit(&rs, tolerance.rotation)?;

    let (s, e) = (start as Frame, end as Frame);
    for i in start + 1..end {
        let now = i as Frame;
        let channels = [
            (&x_curve, &samples.xs),
            (&y_curve, &samples.ys),
            (&z_curve, &samples.zs),
        ];
        for (curve, values) in channels {
            let (_, y, _) = curve.evaluate(s, now, e);
            if !near_equals(lerp(values[start], values[end], y), values[i], tolerance.position) {
                return None;
            }
        }

        let (_, ry, _) = r_curve.evaluate(s, now, e);
        let check = q_start.slerp_shortest(q_end, ry);
        let actual = samples.quats[i];
        if !check.abs_diff_eq(actual, tolerance.rotation) && !check.abs_diff_eq(-actual, tolerance.rotation) {
            return None;
        }
    }

    Some(BoneCurves {
        translate_x: x_curve,
        translate_y: y_curve,
        translate_z: z_curve,
        rotate: r_curve,
        ..BoneCurves::default()
    })
}

/// 极值点与二阶差分变号处，首尾帧总是包含
fn find_inflection_frames(values: &[f64], threshold: f64) -> Vec<usize> {
    let n = values.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let mut frames = vec![0];
    for i in 2..n {
        let delta = values[i] - values[i - 1];
        if (delta > threshold && values[i - 1] < values[i - 2])
            || (delta < -threshold && values[i - 1] > values[i - 2])
        {
            frames.push(i - 1);
        }
    }

    let second = gradient(&gradient(values));
    for i in 1..second.len() {
        let d1 = round(second[i - 1], threshold);
        let d2 = round(second[i], threshold);
        if d1 * d2 < 0.0 || (d1 == 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 == 0.0) {
            frames.push(i);
        }
    }

    frames.push(n - 1);
    frames.sort_unstable();
    frames.dedup();
    frames
}

/// 一阶差分（两端单侧，中间中心差分）
fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mut out = Vec::with_capacity(n);
    out.push(values[1] - values[0]);
    for i in 1..n - 1 {
        out.push((values[i + 1] - values[i - 1]) / 2.0);
    }
    out.push(values[n - 1] - values[n - 2]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_track() -> BoneTrack {
        let mut track = BoneTrack::new();
        for i in 0..=20 {
            let x = if i <= 10 { i as f64 } else { 20.0 - i as f64 };
            track.append(BoneKeyframe::with_transform(
                i as Frame,
                Vec3::new(x, 0.0, 0.0),
                Quaternion::IDENTITY,
            ));
        }
        track
    }

    #[test]
    fn test_find_inflection_frames() {
        let found = find_inflection_frames(&[0.0, 1.0, 0.0, 1.0], 1e-4);
        assert!(found.len() > 2);
        assert_eq!(found.first(), Some(&0));
        assert_eq!(found.last(), Some(&3));
    }

    #[test]
    fn test_gradient() {
        assert_eq!(gradient(&[0.0, 1.0, 4.0]), vec![1.0, 2.0, 3.0]);
        assert_eq!(gradient(&[5.0]), vec![0.0]);
    }

    #[test]
    fn test_reduce_without_inflection() {
        let mut track = BoneTrack::new();
        track.append(BoneKeyframe::new(0.0));
        track.append(BoneKeyframe::new(1.0));
        let reduced = track.reduce();
        assert_eq!(reduced.frames(), track.frames());
    }

    #[test]
    fn test_reduce_ramp() {
        let track = ramp_track();
        let reduced = track.reduce();
        assert!(reduced.len() < track.len());
        assert_eq!(reduced.min_frame(), 0.0);
        assert_eq!(reduced.max_frame(), 20.0);

        for i in 0..=20 {
            let frame = i as Frame;
            let expected = track.get(frame).position_or_zero();
            let actual = reduced.get(frame).position_or_zero();
            assert!(
                expected.abs_diff_eq(actual, 1e-2),
                "frame {}: {:?} != {:?}",
                i,
                expected,
                actual
            );
        }
    }

    #[test]
    fn test_reduce_rotation() {
        let mut track = BoneTrack::new();
        for i in 0..=10 {
            let degrees = if i <= 5 { i as f64 * 10.0 } else { (10 - i) as f64 * 10.0 };
            track.append(BoneKeyframe::with_transform(
                i as Frame,
                Vec3::ZERO,
                Quaternion::from_degrees(0.0, degrees, 0.0),
            ));
        }
        let reduced = track.reduce();
        assert!(reduced.len() <= track.len());
        for i in 0..=10 {
            let frame = i as Frame;
            let expected = track.get(frame).rotation_or_identity();
            let actual = reduced.get(frame).rotation_or_identity();
            assert!(expected.abs_diff_eq(actual, 1e-2) || expected.abs_diff_eq(-actual, 1e-2));
        }
    }
}
