//! Mocap Engine - 动作捕捉数据回放引擎
//!
//! 提供以下功能：
//! - 二进制动捕文件解码（可选字节序反转）
//! - 帧间插值回放、循环和逐帧定位
//! - 基于连接表的标记点骨骼层级和世界变换
//! - 配置文件解析

pub mod animation;
pub mod config;
pub mod skeleton;

pub use animation::{
    Frame, FrameStore, MocapAnimation, MocapFile, PlaybackClock, ToolMode, ToolSession,
    PLAYER_POINTS,
};
pub use config::MocapConfig;
pub use skeleton::{Connectivity, DecomposedTransform, MocapNode, SkeletonGraph, ROOT_NODE};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MocapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed input: {0} bytes is not a multiple of 4")]
    MalformedInput(usize),

    #[error("Truncated frame: {available} floats available, one record needs {required}")]
    TruncatedFrame { available: usize, required: usize },

    #[error("Frame index {index} out of range (animation has {frame_count} frames)")]
    OutOfRange { index: usize, frame_count: usize },

    #[error("Node index {index} out of range (skeleton has {node_count} nodes)")]
    NodeOutOfRange { index: usize, node_count: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, MocapError>;
