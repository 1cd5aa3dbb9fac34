//! 关键帧轨道
//!
//! 存储单个目标（骨骼、表情或全局项）的所有关键帧，并提供查找和插值功能

use std::collections::HashMap;

use super::frame_index::{FrameIndex, FrameKey};
use super::Frame;

/// 可放入轨道的关键帧
pub trait Keyframe: Clone + std::fmt::Debug {
    fn frame(&self) -> Frame;

    fn set_frame(&mut self, frame: Frame);

    /// 空轨道采样时返回的默认帧
    fn default_at(frame: Frame) -> Self;

    /// 在 prev 与 next 之间合成 frame 处的关键帧
    fn lerp(prev: &Self, next: &Self, frame: Frame) -> Self;

    /// 插入到 prev 与 next 之间时拆分曲线
    ///
    /// 返回 (插入帧, 新的 next)；没有曲线的类型返回 `None`。
    fn split_curves(&self, _prev: &Self, _next: &Self) -> Option<(Self, Self)> {
        None
    }

    /// 带帧号复制
    fn restamped(&self, frame: Frame) -> Self {
        let mut copied = self.clone();
        copied.set_frame(frame);
        copied
    }
}

/// 线性插值系数，prev 与 next 重合时为 0
pub fn linear_t(prev: Frame, now: Frame, next: Frame) -> f64 {
    let denom = (next - prev) as f64;
    if denom == 0.0 {
        return 0.0;
    }
    (now - prev) as f64 / denom
}

/// 关键帧轨道
///
/// 所有写操作返回前都会确定帧号索引，随后的查询能立即看到修改。
#[derive(Clone, Debug)]
pub struct Track<K: Keyframe> {
    frames: HashMap<FrameKey, K>,
    index: FrameIndex,
}

impl<K: Keyframe> Default for Track<K> {
    fn default() -> Self {
        Self {
            frames: HashMap::new(),
            index: FrameIndex::new(),
        }
    }
}

impl<K: Keyframe> Track<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入关键帧但不确定索引
    fn upsert(&mut self, key: K) {
        let Some(frame_key) = FrameKey::new(key.frame()) else {
            return;
        };
        if self.frames.insert(frame_key, key).is_none() {
            self.index.push(frame_key.frame());
        }
    }

    /// 追加或替换同帧关键帧，负帧号和 NaN 忽略
    pub fn append(&mut self, key: K) {
        self.upsert(key);
        self.index.finalize();
    }

    /// 批量追加，只确定一次索引
    pub fn extend<I: IntoIterator<Item = K>>(&mut self, keys: I) {
        for key in keys {
            self.upsert(key);
        }
        self.index.finalize();
    }

    /// 插入关键帧，落在两帧之间时拆分后一帧的曲线
    pub fn insert(&mut self, key: K) {
        let frame = key.frame();
        if FrameKey::new(frame).is_none() {
            return;
        }

        let mut key = key;
        if !self.frames.is_empty() && !self.has(frame) {
            let (prev, has_prev) = self.index.prev(frame);
            let (next, has_next) = self.index.next(frame);
            if has_prev && has_next && prev < frame && frame < next {
                let split = match (self.stored(prev), self.stored(next)) {
                    (Some(p), Some(n)) => key.split_curves(p, n),
                    _ => None,
                };
                if let Some((inserted, next_key)) = split {
                    key = inserted;
                    self.upsert(next_key);
                }
            }
        }

        self.upsert(key);
        self.index.finalize();
    }

    /// 替换或追加，不拆分曲线
    pub fn update(&mut self, key: K) {
        self.append(key);
    }

    pub fn delete(&mut self, frame: Frame) {
        let Some(frame_key) = FrameKey::new(frame) else {
            return;
        };
        if self.frames.remove(&frame_key).is_some() {
            self.index.remove(frame_key.frame());
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.index.clear();
    }

    /// 确定索引，可重复调用
    pub fn finalize(&mut self) {
        self.index.finalize();
    }

    pub fn has(&self, frame: Frame) -> bool {
        FrameKey::new(frame).map_or(false, |k| self.frames.contains_key(&k))
    }

    /// 已存储的关键帧
    pub fn stored(&self, frame: Frame) -> Option<&K> {
        FrameKey::new(frame).and_then(|k| self.frames.get(&k))
    }

    pub fn stored_mut(&mut self, frame: Frame) -> Option<&mut K> {
        FrameKey::new(frame).and_then(move |k| self.frames.get_mut(&k))
    }

    /// 采样 frame 处的关键帧
    ///
    /// 有关键帧时返回副本；空轨道返回默认帧；超出最后一帧时返回最后一帧的副本；
    /// 其余情况由前后两帧合成。
    pub fn get(&self, frame: Frame) -> K {
        if let Some(key) = self.stored(frame) {
            return key.clone();
        }
        if self.frames.is_empty() || frame.is_nan() {
            return K::default_at(frame);
        }

        let (prev, _) = self.index.prev(frame);
        let (next, has_next) = self.index.next(frame);
        if !has_next {
            return match self.index.max().and_then(|f| self.stored(f)) {
                Some(last) => last.restamped(frame),
                None => K::default_at(frame),
            };
        }

        match (self.stored(prev), self.stored(next)) {
            (Some(p), Some(n)) => K::lerp(p, n, frame),
            _ => K::default_at(frame),
        }
    }

    /// 小于 frame 的最近帧号；没有时返回 (最小帧号, false)
    pub fn prev_frame(&self, frame: Frame) -> (Frame, bool) {
        self.index.prev(frame)
    }

    /// 大于 frame 的最近帧号；没有时返回 (frame, false)
    pub fn next_frame(&self, frame: Frame) -> (Frame, bool) {
        self.index.next(frame)
    }

    /// 最小帧号，空轨道为 0
    pub fn min_frame(&self) -> Frame {
        self.index.min().unwrap_or(0.0)
    }

    /// 最大帧号，空轨道为 0
    pub fn max_frame(&self) -> Frame {
        self.index.max().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 升序遍历，回调返回 false 时停止
    pub fn for_each<F: FnMut(Frame, &K) -> bool>(&self, mut f: F) {
        for frame in self.index.iter() {
            if let Some(key) = self.stored(frame) {
                if !f(frame, key) {
                    break;
                }
            }
        }
    }

    /// 升序迭代关键帧
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.index.iter().filter_map(move |f| self.stored(f))
    }

    /// 升序的帧号列表
    pub fn frames(&self) -> Vec<Frame> {
        self.index.iter().collect()
    }
}
