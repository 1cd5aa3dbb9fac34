//! 帧号索引
//!
//! 保存一条轨道里所有关键帧的帧号，按升序排列。写入只追加并置脏，
//! `finalize` 统一排序去重。查询要求索引已确定（`is_dirty() == false`）。

use super::Frame;

/// 可作为哈希键的帧号
///
/// 只接受有限的非负帧号，非负 f32 的位序与数值序一致。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey(u32);

impl FrameKey {
    pub fn new(frame: Frame) -> Option<Self> {
        if !frame.is_finite() || frame < 0.0 {
            return None;
        }
        // -0.0 归一为 0.0
        Some(Self((frame + 0.0).to_bits()))
    }

    pub fn frame(self) -> Frame {
        f32::from_bits(self.0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameIndex {
    frames: Vec<Frame>,
    dirty: bool,
}

impl FrameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 追加帧号（调用方保证不重复），之后需要 `finalize`
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
        self.dirty = true;
    }

    pub fn remove(&mut self, frame: Frame) {
        if self.dirty {
            self.frames.retain(|f| *f != frame);
        } else if let Ok(pos) = self.search(frame) {
            self.frames.remove(pos);
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.dirty = false;
    }

    /// 排序去重，可重复调用
    pub fn finalize(&mut self) {
        if !self.dirty {
            return;
        }
        self.frames.sort_by(|a, b| a.total_cmp(b));
        self.frames.dedup();
        self.dirty = false;
    }

    fn search(&self, frame: Frame) -> Result<usize, usize> {
        debug_assert!(!self.dirty, "frame index queried before finalize");
        self.frames.binary_search_by(|f| f.total_cmp(&frame))
    }

    /// 小于 frame 的最大帧号；没有时返回 (最小帧号, false)
    pub fn prev(&self, frame: Frame) -> (Frame, bool) {
        debug_assert!(!self.dirty, "frame index queried before finalize");
        if self.frames.is_empty() {
            return (0.0, false);
        }
        let pos = self.frames.partition_point(|f| *f < frame);
        if pos == 0 {
            (self.frames[0], false)
        } else {
            (self.frames[pos - 1], true)
        }
    }

    /// 大于 frame 的最小帧号；没有时返回 (frame, false)
    pub fn next(&self, frame: Frame) -> (Frame, bool) {
        debug_assert!(!self.dirty, "frame index queried before finalize");
        let pos = self.frames.partition_point(|f| *f <= frame);
        match self.frames.get(pos) {
            Some(&f) => (f, true),
            None => (frame, false),
        }
    }

    pub fn min(&self) -> Option<Frame> {
        self.frames.first().copied()
    }

    pub fn max(&self) -> Option<Frame> {
        self.frames.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Frame> + '_ {
        debug_assert!(!self.dirty, "frame index queried before finalize");
        self.frames.iter().copied()
    }
}
