//! 贝塞尔曲线插值
//!
//! VMD 的插值曲线是端点固定为 (0,0) 和 (127,127) 的三次贝塞尔，
//! 只保存两个控制点，坐标量化到 0..127。

use crate::config::get_config;
use crate::math::{is_almost_all_same_values, Vec2};

use super::Frame;

/// 控制点坐标上限
pub const CURVE_MAX: f64 = 127.0;

const NEWTON_EPS: f64 = 1e-15;
const NEWTON_ERR: f64 = 1e-20;
const NEWTON_ITERATIONS: usize = 20;

/// 一维贝塞尔插值曲线（控制点范围 0..127）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Curve {
    pub start: Vec2,
    pub end: Vec2,
}

impl Default for Curve {
    fn default() -> Self {
        Self::linear()
    }
}

impl Curve {
    pub const fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// 标准线性曲线 (20,20)-(107,107)
    pub const fn linear() -> Self {
        Self::new(Vec2::new(20.0, 20.0), Vec2::new(107.0, 107.0))
    }

    /// 两个控制点都在对角线上
    pub fn is_linear(&self) -> bool {
        self.start.x == self.start.y && self.end.x == self.end.y
    }

    /// 从 VMD 插值字节创建 (x1, y1, x2, y2)
    pub fn from_vmd_data(data: [u8; 4]) -> Self {
        Self::new(
            Vec2::new(data[0] as f64, data[1] as f64),
            Vec2::new(data[2] as f64, data[3] as f64),
        )
    }

    /// 以 [begin, finish] 为区间重新映射到 0..127
    pub fn normalize(&mut self, begin: Vec2, finish: Vec2) {
        let diff = finish - begin;

        let mut start = ((self.start - begin) / diff).clamp(Vec2::ZERO, Vec2::ONE);
        let mut end = ((self.end - begin) / diff).clamp(Vec2::ZERO, Vec2::ONE);

        if (start.x - start.y).abs() <= 1e-6 && (end.x - end.y).abs() <= 1e-6 {
            start = Vec2::new(20.0 / CURVE_MAX, 20.0 / CURVE_MAX);
            end = Vec2::new(107.0 / CURVE_MAX, 107.0 / CURVE_MAX);
        }

        self.start = (start * CURVE_MAX).round();
        self.end = (end * CURVE_MAX).round();
    }

    /// 在 `now` 处求值，返回 (x, y, t)
    ///
    /// x 是帧区间内的线性进度，y 是曲线输出，t 是贝塞尔参数。
    pub fn evaluate(&self, start: Frame, now: Frame, end: Frame) -> (f64, f64, f64) {
        if now - start == 0.0 || end - start == 0.0 {
            return (0.0, 0.0, 0.0);
        }

        let x = (now - start) as f64 / (end - start) as f64;
        if x >= 1.0 {
            return (1.0, 1.0, 1.0);
        }

        if self.is_linear() {
            return (x, x, x);
        }

        let x1 = self.start.x / CURVE_MAX;
        let y1 = self.start.y / CURVE_MAX;
        let x2 = self.end.x / CURVE_MAX;
        let y2 = self.end.y / CURVE_MAX;

        let t = newton(x1, x2, x, x);
        (x, bezier_y(y1, y2, t), t)
    }

    /// 在 `now` 处把曲线一分为二
    ///
    /// 左半段属于 [start, now]，右半段属于 [now, end]。
    pub fn split(&self, start: Frame, now: Frame, end: Frame) -> (Curve, Curve) {
        if now - start == 0.0 || end - start == 0.0 {
            return (Self::linear(), Self::linear());
        }

        let (_, _, t) = self.evaluate(start, now, end);

        // de Casteljau
        let a = Vec2::ZERO;
        let b = self.start / CURVE_MAX;
        let c = self.end / CURVE_MAX;
        let d = Vec2::ONE;

        let e = a * (1.0 - t) + b * t;
        let f = b * (1.0 - t) + c * t;
        let g = c * (1.0 - t) + d * t;
        let h = e * (1.0 - t) + f * t;
        let i = f * (1.0 - t) + g * t;
        let j = h * (1.0 - t) + i * t;

        let mut first = Curve::new(e, h);
        first.normalize(a, j);
        let mut second = Curve::new(i, g);
        second.normalize(j, d);

        if first.is_linear() && second.is_linear() {
            return (Self::linear(), Self::linear());
        }
        (first, second)
    }

    /// 由等间隔采样值拟合曲线，失败时退回线性曲线
    pub fn fit(values: &[f64], threshold: f64) -> Curve {
        Self::try_fit(values, threshold).unwrap_or_else(|| {
            log::debug!("曲线拟合失败，使用线性曲线: {} 个采样", values.len());
            Self::linear()
        })
    }

    /// 由等间隔采样值拟合曲线
    ///
    /// 输入含 NaN / 无穷大，或优化结果超出 0..127 时返回 `None`。
    pub fn try_fit(values: &[f64], threshold: f64) -> Option<Curve> {
        if values.len() <= 2 {
            return Some(Self::linear());
        }
        if values.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let n = values.len();
        let decreasing = values[0] > values[n - 1];

        let xs: Vec<f64> = (0..n)
            .map(|i| {
                let x = i as f64 / (n - 1) as f64;
                if decreasing {
                    1.0 - x
                } else {
                    x
                }
            })
            .collect();

        let y_min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if y_min == y_max {
            return Some(Self::linear());
        }
        let ys: Vec<f64> = values.iter().map(|v| (v - y_min) / (y_max - y_min)).collect();

        if is_linear_interpolation(&ys, threshold) {
            return Some(Self::linear());
        }

        let p0 = Vec2::new(xs[0], ys[0]);
        let p3 = Vec2::new(xs[n - 1], ys[n - 1]);
        let p1 = Vec2::new(xs[n / 3], ys[n / 3]);
        let p2 = Vec2::new(xs[2 * n / 3], ys[2 * n / 3]);

        let settings = FitSettings::from_config();
        let (p1, p2) = optimize_points(&xs, &ys, p1, p2, &settings)?;
        try_normalize(p0, p1, p2, p3, decreasing)
    }
}

/// 拟合优化器的迭代上限
#[derive(Clone, Copy, Debug)]
struct FitSettings {
    max_iterations: usize,
    max_evaluations: usize,
    gradient_threshold: f64,
}

impl FitSettings {
    fn from_config() -> Self {
        let config = get_config();
        Self {
            max_iterations: config.fit_max_iterations,
            max_evaluations: config.fit_max_evaluations,
            gradient_threshold: config.fit_gradient_threshold,
        }
    }
}

fn bezier_coeffs(p1: f64, p2: f64) -> (f64, f64, f64) {
    (3.0 * p1 - 3.0 * p2 + 1.0, -6.0 * p1 + 3.0 * p2, 3.0 * p1)
}

fn bezier_y(y1: f64, y2: f64, t: f64) -> f64 {
    let s = 1.0 - t;
    3.0 * s * s * t * y1 + 3.0 * s * t * t * y2 + t * t * t
}

/// 牛顿法求 bezier_x(t) == x 的 t
fn newton(x1: f64, x2: f64, x: f64, t0: f64) -> f64 {
    let (a, b, c) = bezier_coeffs(x1, x2);
    let mut t = t0;
    for _ in 0..NEWTON_ITERATIONS {
        let f = ((a * t + b) * t + c) * t - x;
        let mut df = (3.0 * a * t + 2.0 * b) * t + c;
        if df.abs() < NEWTON_EPS {
            df = 1.0;
        }
        let next = t - f / df;
        if (next - t).abs() <= NEWTON_ERR {
            return next;
        }
        t = next;
    }
    t
}

fn is_linear_interpolation(ys: &[f64], threshold: f64) -> bool {
    if is_almost_all_same_values(ys, threshold) {
        return true;
    }
    let diffs: Vec<f64> = ys.windows(2).map(|w| w[1] - w[0]).collect();
    is_almost_all_same_values(&diffs, threshold)
}

fn fit_error(xs: &[f64], ys: &[f64], p: &[f64; 4]) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let t = newton(p[0], p[2], x, x);
            let dy = y - bezier_y(p[1], p[3], t);
            dy * dy
        })
        .sum()
}

/// 最小二乘求两个控制点（BFGS + 差分梯度）
fn optimize_points(
    xs: &[f64],
    ys: &[f64],
    p1: Vec2,
    p2: Vec2,
    settings: &FitSettings,
) -> Option<(Vec2, Vec2)> {
    let objective = |p: &[f64; 4]| fit_error(xs, ys, p);
    let x = bfgs_minimize(objective, [p1.x, p1.y, p2.x, p2.y], settings)?;
    Some((Vec2::new(x[0], x[1]), Vec2::new(x[2], x[3])))
}

fn gradient<F: Fn(&[f64; 4]) -> f64>(f: &F, x: &[f64; 4], evaluations: &mut usize) -> [f64; 4] {
    let mut grad = [0.0; 4];
    for i in 0..4 {
        let h = 1e-7 * x[i].abs().max(1.0);
        let mut forward = *x;
        let mut backward = *x;
        forward[i] += h;
        backward[i] -= h;
        grad[i] = (f(&forward) - f(&backward)) / (2.0 * h);
        *evaluations += 2;
    }
    grad
}

fn dot4(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn bfgs_minimize<F: Fn(&[f64; 4]) -> f64>(
    f: F,
    initial: [f64; 4],
    settings: &FitSettings,
) -> Option<[f64; 4]> {
    let mut evaluations = 0usize;
    let mut x = initial;
    let mut fx = f(&x);
    evaluations += 1;
    if !fx.is_finite() {
        return None;
    }
    let mut g = gradient(&f, &x, &mut evaluations);

    // 逆 Hessian 近似
    let mut h = [[0.0; 4]; 4];
    for (i, row) in h.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..settings.max_iterations {
        let grad_norm = g.iter().map(|v| v.abs()).fold(0.0, f64::max);
        if grad_norm < settings.gradient_threshold {
            break;
        }
        if evaluations >= settings.max_evaluations {
            break;
        }

        let mut dir = [0.0; 4];
        for i in 0..4 {
            dir[i] = -(0..4).map(|j| h[i][j] * g[j]).sum::<f64>();
        }
        let mut slope = dot4(&dir, &g);
        if slope >= 0.0 {
            // 方向不再下降时重置为最速下降
            h = [[0.0; 4]; 4];
            for i in 0..4 {
                h[i][i] = 1.0;
                dir[i] = -g[i];
            }
            slope = dot4(&dir, &g);
        }

        // Armijo 回溯
        let mut step = 1.0;
        let mut next = x;
        let mut f_next = fx;
        let mut accepted = false;
        for _ in 0..40 {
            for i in 0..4 {
                next[i] = x[i] + step * dir[i];
            }
            f_next = f(&next);
            evaluations += 1;
            if f_next.is_finite() && f_next <= fx + 1e-4 * step * slope {
                accepted = true;
                break;
            }
            step *= 0.5;
        }
        if !accepted {
            break;
        }

        let g_next = gradient(&f, &next, &mut evaluations);
        let mut s = [0.0; 4];
        let mut y = [0.0; 4];
        for i in 0..4 {
            s[i] = next[i] - x[i];
            y[i] = g_next[i] - g[i];
        }
        let sy = dot4(&s, &y);
        if sy > 1e-12 {
            let rho = 1.0 / sy;
            let mut hy = [0.0; 4];
            for i in 0..4 {
                hy[i] = (0..4).map(|j| h[i][j] * y[j]).sum();
            }
            let yhy = dot4(&y, &hy);
            for i in 0..4 {
                for j in 0..4 {
                    h[i][j] += (1.0 + yhy * rho) * rho * s[i] * s[j]
                        - rho * (hy[i] * s[j] + s[i] * hy[j]);
                }
            }
        }

        x = next;
        fx = f_next;
        g = g_next;
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// 把优化后的控制点映射回 0..127，超出范围视为失败
fn try_normalize(p0: Vec2, c1: Vec2, c2: Vec2, p3: Vec2, decreasing: bool) -> Option<Curve> {
    let mut diff = p3 - p0;
    if diff.x == 0.0 {
        diff.x = 1.0;
    }
    if diff.y == 0.0 {
        diff.y = 1.0;
    }

    let mut p1 = (c1 - p0) / diff;
    let mut p2 = (c2 - p0) / diff;

    if (p1.x - p1.y).abs() <= 1e-6 && (p2.x - p2.y).abs() <= 1e-6 {
        return Some(Curve::linear());
    }

    if decreasing {
        std::mem::swap(&mut p1, &mut p2);
    }

    let curve = Curve::new((p1 * CURVE_MAX).round(), (p2 * CURVE_MAX).round());
    let in_range = |v: f64| (0.0..=CURVE_MAX).contains(&v);
    if in_range(curve.start.x) && in_range(curve.start.y) && in_range(curve.end.x) && in_range(curve.end.y) {
        Some(curve)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_curve() {
        let c = Curve::linear();
        assert_eq!(c.start, Vec2::new(20.0, 20.0));
        assert_eq!(c.end, Vec2::new(107.0, 107.0));
        assert!(c.is_linear());
    }

    #[test]
    fn test_normalize_clamps_and_resets_linear() {
        let mut c = Curve::new(Vec2::new(-1.0, -1.0), Vec2::new(2.0, 2.0));
        c.normalize(Vec2::ZERO, Vec2::ONE);
        assert_eq!(c, Curve::linear());

        let mut c = Curve::new(Vec2::new(0.5, 0.5), Vec2::new(0.5, 0.5));
        c.normalize(Vec2::ZERO, Vec2::ONE);
        assert_eq!(c, Curve::linear());
    }

    #[test]
    fn test_evaluate_edges() {
        let c = Curve::new(Vec2::new(10.0, 30.0), Vec2::new(100.0, 80.0));
        assert_eq!(c.evaluate(0.0, 0.0, 10.0), (0.0, 0.0, 0.0));
        assert_eq!(c.evaluate(0.0, 10.0, 0.0), (0.0, 0.0, 0.0));
        assert_eq!(c.evaluate(0.0, 10.0, 10.0), (1.0, 1.0, 1.0));
        assert_eq!(c.evaluate(0.0, 12.0, 10.0), (1.0, 1.0, 1.0));
    }

    #[test]
    fn test_evaluate_linear() {
        for &(s, n, e) in &[(0.0f32, 25.0f32, 100.0f32), (3.0, 4.0, 7.0), (10.0, 19.0, 20.0)] {
            let (x, y, t) = Curve::linear().evaluate(s, n, e);
            let expected = ((n - s) / (e - s)) as f64;
            assert_abs_diff_eq!(x, expected, epsilon = 1e-12);
            assert_eq!(x, y);
            assert_eq!(x, t);
        }
    }

    #[test]
    fn test_evaluate_newton() {
        let c = Curve::new(Vec2::new(10.0, 30.0), Vec2::new(100.0, 80.0));
        let (x, y, t) = c.evaluate(0.0, 2.0, 10.0);
        assert_abs_diff_eq!(x, 0.2, epsilon = 1e-10);
        assert_abs_diff_eq!(y, 0.24085271757748078, epsilon = 1e-10);
        assert_abs_diff_eq!(t, 0.2900272452240925, epsilon = 1e-10);
    }

    #[test]
    fn test_evaluate_non_linear() {
        let c = Curve::new(Vec2::new(20.0, 107.0), Vec2::new(107.0, 20.0));
        let (x, y, _) = c.evaluate(0.0, 25.0, 100.0);
        assert!((y - x).abs() > 1e-3);
    }

    #[test]
    fn test_split() {
        let c = Curve::new(Vec2::new(89.0, 2.0), Vec2::new(52.0, 106.0));
        let (first, second) = c.split(0.0, 2.0, 10.0);
        assert!(first.start.abs_diff_eq(Vec2::new(50.0, 7.0), 1e-1), "{:?}", first);
        assert!(second.end.abs_diff_eq(Vec2::new(44.0, 108.0), 1e-1), "{:?}", second);
        assert_eq!(first.end, Vec2::new(91.0, 52.0));
        assert_eq!(second.start, Vec2::new(71.0, 21.0));
    }

    #[test]
    fn test_split_degenerate() {
        let c = Curve::new(Vec2::new(89.0, 2.0), Vec2::new(52.0, 106.0));
        assert_eq!(c.split(0.0, 0.0, 10.0), (Curve::linear(), Curve::linear()));
        assert_eq!(Curve::linear().split(0.0, 5.0, 10.0), (Curve::linear(), Curve::linear()));
    }

    #[test]
    fn test_split_halves_follow_original() {
        let c = Curve::new(Vec2::new(40.0, 10.0), Vec2::new(90.0, 120.0));
        let (first, second) = c.split(0.0, 4.0, 10.0);
        let (_, y_mid, _) = c.evaluate(0.0, 4.0, 10.0);
        for &f in &[1.0f32, 2.0, 3.0] {
            let (_, y, _) = c.evaluate(0.0, f, 10.0);
            let (_, yh, _) = first.evaluate(0.0, f, 4.0);
            assert!((y - yh * y_mid).abs() < 1e-3, "frame {}: {} vs {}", f, y, yh * y_mid);
        }
        for &f in &[5.0f32, 7.0, 9.0] {
            let (_, y, _) = c.evaluate(0.0, f, 10.0);
            let (_, yh, _) = second.evaluate(4.0, f, 10.0);
            let mapped = y_mid + yh * (1.0 - y_mid);
            assert!((y - mapped).abs() < 1e-3, "frame {}: {} vs {}", f, y, mapped);
        }
    }

    #[test]
    fn test_newton_zero() {
        assert_eq!(newton(0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_try_normalize() {
        let linear = try_normalize(Vec2::ZERO, Vec2::ZERO, Vec2::ZERO, Vec2::ONE, false);
        assert_eq!(linear, Some(Curve::linear()));
        assert!(try_normalize(Vec2::ZERO, Vec2::new(0.0, 1.0), Vec2::new(0.0, 2.0), Vec2::new(0.0, 3.0), false).is_some());
        assert!(try_normalize(Vec2::ZERO, Vec2::new(2.0, 0.0), Vec2::new(0.0, 2.0), Vec2::ONE, false).is_none());
        assert!(try_normalize(Vec2::ZERO, Vec2::new(0.2, 0.8), Vec2::new(0.8, 0.2), Vec2::ONE, true).is_some());
    }

    #[test]
    fn test_fit_trivial_inputs() {
        assert_eq!(Curve::fit(&[1.0, 2.0], 1e-3), Curve::linear());
        assert_eq!(Curve::fit(&[1.0, 1.0, 1.0], 1e-3), Curve::linear());
        assert_eq!(Curve::fit(&[0.0, 1.0, 2.0, 3.0], 1e-6), Curve::linear());
        assert_eq!(Curve::fit(&[3.0, 2.0, 1.0, 0.0], 1e-6), Curve::linear());
    }

    #[test]
    fn test_fit_rejects_nan() {
        assert!(Curve::try_fit(&[f64::NAN, 0.0, 1.0], 1e-6).is_none());
        assert_eq!(Curve::fit(&[f64::NAN, 0.0, 1.0], 1e-6), Curve::linear());
    }

    #[test]
    fn test_fit_recovers_ease_curve() {
        let source = Curve::new(Vec2::new(64.0, 0.0), Vec2::new(64.0, 127.0));
        let values: Vec<f64> = (0..=20)
            .map(|f| source.evaluate(0.0, f as Frame, 20.0).1)
            .collect();
        let fitted = Curve::fit(&values, 1e-6);
        assert!(!fitted.is_linear());
        for f in 1..20 {
            let (_, expected, _) = source.evaluate(0.0, f as Frame, 20.0);
            let (_, actual, _) = fitted.evaluate(0.0, f as Frame, 20.0);
            assert!((expected - actual).abs() < 0.03, "frame {}: {} vs {}", f, expected, actual);
        }
    }

    #[test]
    fn test_from_vmd_data() {
        let c = Curve::from_vmd_data([10, 30, 100, 80]);
        assert_eq!(c, Curve::new(Vec2::new(10.0, 30.0), Vec2::new(100.0, 80.0)));
    }
}
