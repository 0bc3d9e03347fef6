//! 动捕工具配置
//!
//! 配置文件每行一个 `键 值`，以空白分隔。条目数不是 2 的行会被跳过。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::animation::{DEFAULT_FPS, PLAYER_POINTS};
use crate::{MocapError, Result};

/// 工具配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct MocapConfig {
    /// 文件来自字节序相反的机器时为 true，默认 false
    pub reverse_byte_order: bool,
    /// 动捕文件目录，默认当前目录
    pub mocap_files_directory: PathBuf,
    /// 回放帧率，默认 16.0
    pub playback_fps: f64,
    /// 每帧标记点数，默认 28
    pub points_per_frame: usize,
    /// 界面主题（界面层使用）
    pub theme: Option<String>,
    /// 界面字体（界面层使用）
    pub font: Option<String>,
}

impl Default for MocapConfig {
    fn default() -> Self {
        Self {
            reverse_byte_order: false,
            mocap_files_directory: PathBuf::from("."),
            playback_fps: DEFAULT_FPS,
            points_per_frame: PLAYER_POINTS,
            theme: None,
            font: None,
        }
    }
}

impl MocapConfig {
    /// 解析配置文本；无法识别的行只记录日志
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();

        for (line_number, line) in text.lines().enumerate() {
            let line_number = line_number + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            let entries: Vec<&str> = line.split_whitespace().collect();
            let (key, value) = match entries.as_slice() {
                [key, value] => (*key, *value),
                _ => {
                    log::warn!(
                        "配置第 {} 行应为两个以空白分隔的条目，实际 {} 个，已跳过",
                        line_number,
                        entries.len()
                    );
                    continue;
                }
            };

            if let Err(e) = config.apply(key, value) {
                log::warn!("配置第 {} 行: {}", line_number, e);
            }
        }

        config
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::parse(&text);
        log::info!("加载配置 {}", path.display());
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "SourceEndiannessReversed" => {
                let flag: i64 = value.parse().map_err(|_| invalid_value(key, value))?;
                self.reverse_byte_order = flag != 0;
            }
            "BaseMocapFilesDirectory" => {
                self.mocap_files_directory = PathBuf::from(value);
            }
            "PlaybackFps" => {
                self.playback_fps = value.parse().map_err(|_| invalid_value(key, value))?;
            }
            "PlayerPoints" => {
                self.points_per_frame = value.parse().map_err(|_| invalid_value(key, value))?;
            }
            "Theme" => self.theme = Some(value.to_string()),
            "Font" => self.font = Some(value.to_string()),
            _ => log::debug!("忽略未知配置项 {}", key),
        }
        Ok(())
    }

    /// 检查数值范围
    pub fn validate(&self) -> Result<()> {
        if !(self.playback_fps.is_finite() && self.playback_fps > 0.0) {
            return Err(MocapError::InvalidArgument(format!(
                "playback fps must be positive, got {}",
                self.playback_fps
            )));
        }
        if self.points_per_frame == 0 {
            return Err(MocapError::InvalidArgument(
                "points per frame must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn invalid_value(key: &str, value: &str) -> MocapError {
    MocapError::Configuration(format!("invalid value '{}' for {}", value, key))
}

// ========== 全局配置 ==========

static MOCAP_CONFIG: Lazy<RwLock<MocapConfig>> = Lazy::new(|| RwLock::new(MocapConfig::default()));

/// 获取当前配置（只读副本）
pub fn get_config() -> MocapConfig {
    MOCAP_CONFIG
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// 替换全局配置
pub fn set_config(config: MocapConfig) {
    *MOCAP_CONFIG
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    set_config(MocapConfig::default());
}
