//! 动捕动画系统
//!
//! 提供二进制动捕文件解码、帧库、回放时钟和回放/编辑会话。

mod frame;
mod mocap_animation;
mod mocap_loader;
mod playback;
mod session;

pub use frame::{frame_stride_floats, Frame, FrameStore, PLAYER_POINTS};
pub use mocap_animation::MocapAnimation;
pub use mocap_loader::{assemble_frames, decode_floats, encode_floats, encode_frames, MocapFile};
pub use playback::{PlaybackClock, DEFAULT_FPS};
pub use session::{ToolMode, ToolSession};
