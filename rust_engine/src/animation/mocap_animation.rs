//! 动捕动画运行时
//!
//! 组合帧库、回放时钟和骨骼图，对外提供渲染和界面所需的全部查询与命令。

use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::skeleton::{Connectivity, MocapNode, SkeletonGraph};
use crate::{MocapError, Result};

use super::frame::{Frame, FrameStore};
use super::mocap_loader::MocapFile;
use super::playback::{PlaybackClock, DEFAULT_FPS};

/// 动捕动画
pub struct MocapAnimation {
    file: MocapFile,
    frames: Arc<FrameStore>,
    clock: PlaybackClock,
    /// 当前显示帧（插值结果）
    current_frame: Frame,
    skeleton: SkeletonGraph,
}

impl MocapAnimation {
    /// 以默认帧率创建
    pub fn new(file: MocapFile, connectivity: Connectivity) -> Result<Self> {
        Self::with_fps(file, connectivity, DEFAULT_FPS)
    }

    /// 创建动画；连接表在此处校验，非法时返回 `Configuration`
    pub fn with_fps(file: MocapFile, connectivity: Connectivity, fps: f64) -> Result<Self> {
        let points_per_frame = file.points_per_frame();
        let skeleton = SkeletonGraph::new(points_per_frame, connectivity)?;
        let frames = Arc::clone(file.frames());
        let clock = PlaybackClock::new(frames.len(), fps)?;

        let mut animation = Self {
            current_frame: frames.first_or_zeroed(),
            file,
            frames,
            clock,
            skeleton,
        };
        animation.rebuild_skeleton();
        Ok(animation)
    }

    /// 加载新文件并重置回放
    ///
    /// 解码失败时帧库和回放位置都保持不变。
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let store = self.file.load(path)?;
        self.frames = store;
        self.reset_after_new_file_load();
        Ok(())
    }

    /// 从内存字节加载
    pub fn load_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let store = self.file.load_from_bytes(bytes)?;
        self.frames = store;
        self.reset_after_new_file_load();
        Ok(())
    }

    /// 替换为已在其他线程解码好的帧库
    pub fn set_frame_store(&mut self, store: Arc<FrameStore>) -> Result<()> {
        if store.points_per_frame() != self.skeleton.marker_count() {
            return Err(MocapError::InvalidArgument(format!(
                "frame store has {} points per frame, animation expects {}",
                store.points_per_frame(),
                self.skeleton.marker_count()
            )));
        }
        self.frames = store;
        self.reset_after_new_file_load();
        Ok(())
    }

    /// 推进回放并刷新显示帧和骨骼
    pub fn update(&mut self, delta_seconds: f64) {
        if self.frames.is_empty() {
            return;
        }
        self.clock.advance(delta_seconds);

        let (previous, next) = self.clock.frame_pair();
        let t = self.clock.interpolation_factor() as f32;
        if let (Some(from), Some(to)) = (self.frames.get(previous), self.frames.get(next)) {
            self.current_frame.interpolate_from(from, to, t);
        }
        self.rebuild_skeleton();
    }

    pub fn set_fps(&mut self, fps: f64) -> Result<()> {
        self.clock.set_fps(fps).map_err(|e| {
            log::warn!("拒绝修改回放帧率: {}", e);
            e
        })
    }

    /// 跳到指定帧，显示帧直接取存储的帧数据并重建骨骼
    pub fn set_to_frame(&mut self, frame_index: usize) -> Result<()> {
        if let Err(e) = self.clock.seek_to_frame(frame_index) {
            log::warn!("拒绝跳转: {}", e);
            return Err(e);
        }
        if let Some(frame) = self.frames.get(frame_index) {
            self.current_frame.copy_from(frame);
        }
        self.populate_skeleton()
    }

    /// 新文件加载后回到第 0 帧
    pub fn reset_after_new_file_load(&mut self) {
        self.clock.reset(self.frames.len());
        self.current_frame = self.frames.first_or_zeroed();
        self.rebuild_skeleton();
        log::debug!(
            "回放已重置: {} 帧, {:.2} 秒",
            self.clock.frame_count(),
            self.clock.length_seconds()
        );
    }

    /// 用当前显示帧重建骨骼
    pub fn populate_skeleton(&mut self) -> Result<()> {
        self.skeleton.populate(&self.current_frame)
    }

    fn rebuild_skeleton(&mut self) {
        if let Err(e) = self.populate_skeleton() {
            log::error!("骨骼重建失败: {}", e);
        }
    }

    pub fn current_frame(&self) -> &Frame {
        &self.current_frame
    }

    /// 当前帧号（插值帧对中的前一帧）
    pub fn current_frame_number(&self) -> usize {
        self.clock.previous_frame()
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn current_length_seconds(&self) -> f64 {
        self.clock.length_seconds()
    }

    pub fn animation_progress_seconds(&self) -> f64 {
        self.clock.progress_seconds()
    }

    pub fn fps(&self) -> f64 {
        self.clock.fps()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn frames(&self) -> &Arc<FrameStore> {
        &self.frames
    }

    pub fn file(&self) -> &MocapFile {
        &self.file
    }

    pub fn skeleton(&self) -> &SkeletonGraph {
        &self.skeleton
    }

    pub fn skeleton_mut(&mut self) -> &mut SkeletonGraph {
        &mut self.skeleton
    }

    pub fn skeleton_root(&self) -> &MocapNode {
        self.skeleton.root()
    }

    pub fn node_world_position(&self, index: usize) -> Option<Vec3> {
        self.skeleton.world_position(index)
    }

    pub fn node_world_transform(&self, index: usize) -> Option<&Mat4> {
        self.skeleton.world_transform(index)
    }
}
