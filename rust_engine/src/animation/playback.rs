//! 回放时钟
//!
//! 把外部传入的时间增量换算成当前插值帧对和插值系数。
//! 回放帧率与采集帧率无关：任意 fps 下都在相邻两帧之间线性插值。

use crate::{MocapError, Result};

/// 原工具的初始回放帧率
pub const DEFAULT_FPS: f64 = 16.0;

/// 帧周期比较的相对容差
const PERIOD_TOLERANCE: f64 = 1e-9;

/// 回放时钟状态
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    fps: f64,
    frame_period: f64,
    previous_frame: usize,
    next_frame: usize,
    /// 当前帧区间内已经过的时间，范围 [0, frame_period)
    accumulator: f64,
    /// 自上次循环边界以来的时间
    progress_seconds: f64,
    frame_count: usize,
    length_seconds: f64,
}

impl PlaybackClock {
    pub fn new(frame_count: usize, fps: f64) -> Result<Self> {
        validate_fps(fps)?;
        let mut clock = Self {
            fps,
            frame_period: 1.0 / fps,
            previous_frame: 0,
            next_frame: 0,
            accumulator: 0.0,
            progress_seconds: 0.0,
            frame_count: 0,
            length_seconds: 0.0,
        };
        clock.reset(frame_count);
        Ok(clock)
    }

    /// 加载新文件后重置到第 0 帧
    pub fn reset(&mut self, frame_count: usize) {
        self.frame_count = frame_count;
        self.previous_frame = 0;
        self.next_frame = if frame_count > 1 { 1 } else { 0 };
        self.accumulator = 0.0;
        self.progress_seconds = 0.0;
        self.update_length();
    }

    /// 推进时间
    ///
    /// 每跨过一个帧周期，前后帧索引各加一并循环；任一索引回绕到 0 即为循环边界，
    /// 此时进度时间归零。返回本次是否切换了帧对。
    pub fn advance(&mut self, delta_seconds: f64) -> bool {
        if self.frame_count == 0 || !delta_seconds.is_finite() || delta_seconds < 0.0 {
            return false;
        }

        self.progress_seconds += delta_seconds;
        self.accumulator += delta_seconds;

        // 帧周期 1/fps 一般不能精确表示，累计误差在容差内视为已满一个周期
        let tolerance = self.frame_period * PERIOD_TOLERANCE;
        let mut stepped = false;
        while self.accumulator + tolerance >= self.frame_period {
            self.accumulator = (self.accumulator - self.frame_period).max(0.0);
            self.previous_frame = (self.previous_frame + 1) % self.frame_count;
            self.next_frame = (self.next_frame + 1) % self.frame_count;
            if self.previous_frame == 0 || self.next_frame == 0 {
                self.progress_seconds = 0.0;
            }
            stepped = true;
        }
        stepped
    }

    /// 直接跳到指定帧，插值系数清零
    ///
    /// 越界时返回 `OutOfRange`，状态不变。
    pub fn seek_to_frame(&mut self, frame_index: usize) -> Result<()> {
        if frame_index >= self.frame_count {
            return Err(MocapError::OutOfRange {
                index: frame_index,
                frame_count: self.frame_count,
            });
        }
        self.previous_frame = frame_index;
        self.next_frame = (frame_index + 1) % self.frame_count;
        self.accumulator = 0.0;
        Ok(())
    }

    /// 修改回放帧率，不改变当前回放位置
    ///
    /// 帧内相位按比例保留，插值系数不会跳变。
    pub fn set_fps(&mut self, fps: f64) -> Result<()> {
        validate_fps(fps)?;
        let t = self.interpolation_factor();
        self.fps = fps;
        self.frame_period = 1.0 / fps;
        self.accumulator = t * self.frame_period;
        self.update_length();
        Ok(())
    }

    /// 插值系数 t ∈ [0, 1)
    pub fn interpolation_factor(&self) -> f64 {
        self.accumulator / self.frame_period
    }

    /// 当前插值帧对 (previous, next)
    pub fn frame_pair(&self) -> (usize, usize) {
        (self.previous_frame, self.next_frame)
    }

    pub fn previous_frame(&self) -> usize {
        self.previous_frame
    }

    pub fn next_frame(&self) -> usize {
        self.next_frame
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_period(&self) -> f64 {
        self.frame_period
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// 动画总时长（秒）= 帧数 / fps
    pub fn length_seconds(&self) -> f64 {
        self.length_seconds
    }

    pub fn progress_seconds(&self) -> f64 {
        self.progress_seconds
    }

    fn update_length(&mut self) {
        self.length_seconds = self.frame_count as f64 / self.fps;
    }
}

fn validate_fps(fps: f64) -> Result<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(MocapError::InvalidArgument(format!(
            "fps must be positive, got {}",
            fps
        )))
    }
}
