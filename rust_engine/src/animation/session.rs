//! 工具会话
//!
//! 回放/编辑两种模式的控制逻辑，不含任何绘制代码。
//! 播放模式下按时间推进；编辑模式下暂停并允许逐帧拖动。

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, MocapConfig};
use crate::skeleton::Connectivity;
use crate::{MocapError, Result};

use super::mocap_animation::MocapAnimation;
use super::mocap_loader::MocapFile;

/// 工具模式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolMode {
    #[default]
    Play,
    Edit,
}

/// 工具会话状态
pub struct ToolSession {
    animation: MocapAnimation,
    mode: ToolMode,
    paused: bool,
    files_directory: PathBuf,
    loaded_file: Option<String>,
}

impl ToolSession {
    pub fn new(config: &MocapConfig, connectivity: Connectivity) -> Result<Self> {
        config.validate()?;
        let file = MocapFile::from_config(config);
        let animation = MocapAnimation::with_fps(file, connectivity, config.playback_fps)?;

        Ok(Self {
            animation,
            mode: ToolMode::Play,
            paused: false,
            files_directory: config.mocap_files_directory.clone(),
            loaded_file: None,
        })
    }

    /// 使用全局配置创建
    pub fn from_global_config(connectivity: Connectivity) -> Result<Self> {
        Self::new(&config::get_config(), connectivity)
    }

    /// 每帧调用；暂停时不推进
    pub fn update(&mut self, delta_seconds: f64) {
        if !self.paused {
            self.animation.update(delta_seconds);
        }
    }

    /// 切换暂停，暂停时用当前帧重建骨骼
    pub fn toggle_pause(&mut self) -> bool {
        if self.paused {
            self.paused = false;
        } else {
            if let Err(e) = self.animation.populate_skeleton() {
                log::error!("暂停时重建骨骼失败: {}", e);
            }
            self.paused = true;
        }
        self.paused
    }

    /// 切换回放/编辑模式
    ///
    /// 进入编辑模式会暂停并对齐到当前帧；回到回放模式会继续播放。
    pub fn toggle_mode(&mut self) -> ToolMode {
        match self.mode {
            ToolMode::Play => {
                self.mode = ToolMode::Edit;
                self.paused = true;
                let current = self.animation.current_frame_number();
                if self.animation.num_frames() > 0 {
                    if let Err(e) = self.animation.set_to_frame(current) {
                        log::error!("进入编辑模式时对齐帧 {} 失败: {}", current, e);
                    }
                }
            }
            ToolMode::Edit => {
                self.mode = ToolMode::Play;
                self.paused = false;
            }
        }
        log::debug!("切换到 {:?} 模式", self.mode);
        self.mode
    }

    /// 编辑模式下跳到指定帧
    pub fn scrub_to(&mut self, frame_index: usize) -> Result<()> {
        if self.mode != ToolMode::Edit {
            return Err(MocapError::InvalidArgument(
                "frame scrubbing is only available in edit mode".to_string(),
            ));
        }
        self.animation.set_to_frame(frame_index)
    }

    /// 加载文件目录下的动捕文件
    pub fn load_file(&mut self, file_name: &str) -> Result<()> {
        let path = self.files_directory.join(file_name);
        self.animation.load(&path)?;
        self.loaded_file = Some(file_name.to_string());
        Ok(())
    }

    /// 文件目录下可加载的文件名（按名称排序）
    pub fn available_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.files_directory)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn set_fps(&mut self, fps: f64) -> Result<()> {
        self.animation.set_fps(fps)
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn loaded_file(&self) -> Option<&str> {
        self.loaded_file.as_deref()
    }

    pub fn files_directory(&self) -> &Path {
        &self.files_directory
    }

    pub fn animation(&self) -> &MocapAnimation {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut MocapAnimation {
        &mut self.animation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::mocap_loader::encode_frames;
    use crate::animation::Frame;
    use glam::Vec3;

    fn session_with_file(xs: &[f32]) -> (tempfile::TempDir, ToolSession) {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<Frame> = xs.iter().map(|&x| Frame::new(vec![Vec3::new(x, 0.0, 0.0)])).collect();
        fs::write(dir.path().join("walk.bin"), encode_frames(&frames, false)).unwrap();

        let config = MocapConfig {
            mocap_files_directory: dir.path().to_path_buf(),
            playback_fps: 10.0,
            points_per_frame: 1,
            ..MocapConfig::default()
        };
        let mut session = ToolSession::new(&config, Connectivity::default()).unwrap();
        session.load_file("walk.bin").unwrap();
        (dir, session)
    }

    #[test]
    fn test_load_file_from_directory() {
        let (_dir, session) = session_with_file(&[0.0, 1.0, 2.0]);
        assert_eq!(session.loaded_file(), Some("walk.bin"));
        assert_eq!(session.animation().num_frames(), 3);
        assert_eq!(session.available_files().unwrap(), vec!["walk.bin".to_string()]);
    }

    #[test]
    fn test_failed_load_keeps_loaded_name() {
        let (_dir, mut session) = session_with_file(&[0.0, 1.0]);
        assert!(session.load_file("missing.bin").is_err());
        assert_eq!(session.loaded_file(), Some("walk.bin"));
        assert_eq!(session.animation().num_frames(), 2);
    }

    #[test]
    fn test_pause_stops_playback() {
        let (_dir, mut session) = session_with_file(&[0.0, 1.0, 2.0]);
        session.update(0.1);
        assert_eq!(session.animation().current_frame_number(), 1);

        assert!(session.toggle_pause());
        session.update(0.1);
        assert_eq!(session.animation().current_frame_number(), 1);

        assert!(!session.toggle_pause());
        session.update(0.1);
        assert_eq!(session.animation().current_frame_number(), 2);
    }

    #[test]
    fn test_edit_mode_snaps_and_scrubs() {
        let (_dir, mut session) = session_with_file(&[0.0, 1.0, 2.0]);
        session.update(0.15);
        assert!(session.scrub_to(0).is_err());

        assert_eq!(session.toggle_mode(), ToolMode::Edit);
        assert!(session.is_paused());
        assert_eq!(
            session.animation().current_frame().points(),
            &[Vec3::new(1.0, 0.0, 0.0)]
        );

        session.scrub_to(2).unwrap();
        assert_eq!(session.animation().current_frame_number(), 2);
        assert!(matches!(
            session.scrub_to(3),
            Err(MocapError::OutOfRange { .. })
        ));

        assert_eq!(session.toggle_mode(), ToolMode::Play);
        assert!(!session.is_paused());
    }

    #[test]
    fn test_edit_mode_without_frames() {
        let config = MocapConfig {
            points_per_frame: 1,
            ..MocapConfig::default()
        };
        let mut session = ToolSession::new(&config, Connectivity::default()).unwrap();
        assert_eq!(session.toggle_mode(), ToolMode::Edit);
        assert!(session.is_paused());
        assert_eq!(session.animation().current_frame_number(), 0);
        assert!(session.scrub_to(0).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MocapConfig {
            playback_fps: 0.0,
            ..MocapConfig::default()
        };
        assert!(ToolSession::new(&config, Connectivity::actua_default()).is_err());
    }

    #[test]
    fn test_set_fps() {
        let (_dir, mut session) = session_with_file(&[0.0, 1.0]);
        session.set_fps(20.0).unwrap();
        assert_eq!(session.animation().fps(), 20.0);
        assert!(session.set_fps(-1.0).is_err());
    }
}
