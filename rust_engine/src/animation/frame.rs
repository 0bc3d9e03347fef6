//! 动捕帧数据

use glam::Vec3;

/// 单个表演者的标记点数量（所有已知文件都是 28）
pub const PLAYER_POINTS: usize = 28;

/// 每帧记录的 float 数：1 个帧头 + 每个点 3 个分量
pub const fn frame_stride_floats(points_per_frame: usize) -> usize {
    1 + points_per_frame * 3
}

/// 单帧标记点位置
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    points: Vec<Vec3>,
}

impl Frame {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    /// 创建全部位于原点的帧
    pub fn zeroed(points_per_frame: usize) -> Self {
        Self {
            points: vec![Vec3::ZERO; points_per_frame],
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// 获取标记点（marker 编号从 1 开始）
    pub fn marker(&self, marker_index: usize) -> Option<Vec3> {
        marker_index
            .checked_sub(1)
            .and_then(|i| self.points.get(i))
            .copied()
    }

    /// 在两帧之间逐点线性插值，结果写入自身
    ///
    /// 两帧的点数必须与自身一致，多余的点保持不变。
    pub fn interpolate_from(&mut self, from: &Frame, to: &Frame, t: f32) {
        for ((out, a), b) in self.points.iter_mut().zip(&from.points).zip(&to.points) {
            *out = a.lerp(*b, t);
        }
    }

    /// 直接复制另一帧（不插值）
    pub fn copy_from(&mut self, other: &Frame) {
        self.points.clear();
        self.points.extend_from_slice(&other.points);
    }
}

/// 按时间顺序排列的已解码帧
///
/// 每次加载文件时整体重建，解码后不再修改。
#[derive(Clone, Debug, Default)]
pub struct FrameStore {
    frames: Vec<Frame>,
    points_per_frame: usize,
}

impl FrameStore {
    pub fn new(frames: Vec<Frame>, points_per_frame: usize) -> Self {
        debug_assert!(frames.iter().all(|f| f.point_count() == points_per_frame));
        Self {
            frames,
            points_per_frame,
        }
    }

    /// 空帧库
    pub fn empty(points_per_frame: usize) -> Self {
        Self::new(Vec::new(), points_per_frame)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn points_per_frame(&self) -> usize {
        self.points_per_frame
    }

    /// 首帧副本；空帧库返回全零帧
    pub fn first_or_zeroed(&self) -> Frame {
        self.frames
            .first()
            .cloned()
            .unwrap_or_else(|| Frame::zeroed(self.points_per_frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_one_based() {
        let frame = Frame::new(vec![Vec3::X, Vec3::Y]);
        assert_eq!(frame.marker(0), None);
        assert_eq!(frame.marker(1), Some(Vec3::X));
        assert_eq!(frame.marker(2), Some(Vec3::Y));
        assert_eq!(frame.marker(3), None);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = Frame::new(vec![Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0)]);
        let b = Frame::new(vec![Vec3::new(10.0, 0.0, 0.0), Vec3::new(4.0, 2.0, 0.0)]);
        let mut out = Frame::zeroed(2);
        out.interpolate_from(&a, &b, 0.5);
        assert!(out.points()[0].abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-6));
        assert!(out.points()[1].abs_diff_eq(Vec3::new(3.0, 2.0, 1.0), 1e-6));
    }

    #[test]
    fn test_first_or_zeroed() {
        let store = FrameStore::empty(3);
        assert_eq!(store.first_or_zeroed(), Frame::zeroed(3));

        let store = FrameStore::new(vec![Frame::new(vec![Vec3::ONE])], 1);
        assert_eq!(store.first_or_zeroed().points(), &[Vec3::ONE]);
    }

    #[test]
    fn test_stride() {
        assert_eq!(frame_stride_floats(PLAYER_POINTS), 85);
        assert_eq!(frame_stride_floats(1), 4);
    }
}
