//! 动捕二进制文件加载器
//!
//! 文件是连续的 IEEE-754 32 位浮点数，字节序不在文件中描述，由配置决定是否反转。
//! 每 `1 + points * 3` 个浮点数构成一帧：第一个是历史遗留的帧头（总是等于点数），
//! 后面是按文件顺序排列的 (x, y, z) 三元组。

use std::fs;
use std::path::Path;
use std::sync::Arc;

use byteorder::{ByteOrder, NativeEndian};
use glam::Vec3;
use rayon::prelude::*;

use crate::config::MocapConfig;
use crate::{MocapError, Result};

use super::frame::{frame_stride_floats, Frame, FrameStore};

/// 与本机相反的字节序
#[cfg(target_endian = "little")]
type ReversedEndian = byteorder::BigEndian;
#[cfg(target_endian = "big")]
type ReversedEndian = byteorder::LittleEndian;

const FLOAT_SIZE: usize = 4;

/// 将字节流解码为浮点数
///
/// 长度必须是 4 的倍数，否则返回 `MalformedInput`。
/// `reverse_byte_order` 为 true 时，每 4 个字节在解释前先反转。
pub fn decode_floats(bytes: &[u8], reverse_byte_order: bool) -> Result<Vec<f32>> {
    if bytes.len() % FLOAT_SIZE != 0 {
        return Err(MocapError::MalformedInput(bytes.len()));
    }

    let mut floats = vec![0.0f32; bytes.len() / FLOAT_SIZE];
    if reverse_byte_order {
        ReversedEndian::read_f32_into(bytes, &mut floats);
    } else {
        NativeEndian::read_f32_into(bytes, &mut floats);
    }
    Ok(floats)
}

/// 将浮点数编码为字节流（`decode_floats` 的逆操作）
pub fn encode_floats(floats: &[f32], reverse_byte_order: bool) -> Vec<u8> {
    let mut bytes = vec![0u8; floats.len() * FLOAT_SIZE];
    if reverse_byte_order {
        ReversedEndian::write_f32_into(floats, &mut bytes);
    } else {
        NativeEndian::write_f32_into(floats, &mut bytes);
    }
    bytes
}

/// 将浮点序列按固定长度记录组装为帧
///
/// - 不足一条完整记录时返回 `TruncatedFrame`
/// - 末尾不完整的记录直接丢弃（兼容略大的旧文件）
/// - 帧头与点数不一致只记录警告，不中止
pub fn assemble_frames(floats: &[f32], stride: usize, points_per_frame: usize) -> Result<Vec<Frame>> {
    if points_per_frame == 0 {
        return Err(MocapError::InvalidArgument(
            "points per frame must be positive".to_string(),
        ));
    }
    if stride != frame_stride_floats(points_per_frame) {
        return Err(MocapError::InvalidArgument(format!(
            "frame stride {} does not match {} points per frame",
            stride, points_per_frame
        )));
    }
    if floats.len() < stride {
        return Err(MocapError::TruncatedFrame {
            available: floats.len(),
            required: stride,
        });
    }

    let expected_header = points_per_frame as f32;
    let bad_headers = floats
        .par_chunks_exact(stride)
        .filter(|record| record[0] != expected_header)
        .count();
    if bad_headers > 0 {
        log::warn!(
            "{} 帧的帧头不等于点数 {}，按原样继续解析",
            bad_headers,
            points_per_frame
        );
    }

    let tail = floats.len() % stride;
    if tail > 0 {
        log::warn!("丢弃文件末尾不完整的记录: {} 个浮点数", tail);
    }

    let frames = floats
        .par_chunks_exact(stride)
        .map(|record| {
            let points = record[1..]
                .chunks_exact(3)
                .map(|xyz| Vec3::new(xyz[0], xyz[1], xyz[2]))
                .collect();
            Frame::new(points)
        })
        .collect();

    Ok(frames)
}

/// 将帧编码为文件字节（帧头写入点数）
pub fn encode_frames(frames: &[Frame], reverse_byte_order: bool) -> Vec<u8> {
    let mut floats = Vec::new();
    for frame in frames {
        floats.push(frame.point_count() as f32);
        for point in frame.points() {
            floats.extend_from_slice(&point.to_array());
        }
    }
    encode_floats(&floats, reverse_byte_order)
}

/// 动捕文件（加载组件，独占帧库）
#[derive(Clone, Debug)]
pub struct MocapFile {
    reverse_byte_order: bool,
    points_per_frame: usize,
    frames: Arc<FrameStore>,
}

impl MocapFile {
    pub fn new(reverse_byte_order: bool, points_per_frame: usize) -> Self {
        Self {
            reverse_byte_order,
            points_per_frame,
            frames: Arc::new(FrameStore::empty(points_per_frame)),
        }
    }

    pub fn from_config(config: &MocapConfig) -> Self {
        Self::new(config.reverse_byte_order, config.points_per_frame)
    }

    /// 从文件路径加载
    ///
    /// 全部解码成功后才替换帧库，失败时保留之前的数据。
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<FrameStore>> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let store = self.load_from_bytes(&bytes)?;
        log::info!("加载动捕文件 {}: {} 帧", path.display(), store.len());
        Ok(store)
    }

    /// 从字节加载
    pub fn load_from_bytes(&mut self, bytes: &[u8]) -> Result<Arc<FrameStore>> {
        let store = Self::decode(bytes, self.reverse_byte_order, self.points_per_frame)?;
        self.frames = Arc::new(store);
        Ok(Arc::clone(&self.frames))
    }

    /// 解码为独立的帧库，不修改任何状态
    ///
    /// 可以在其他线程调用，然后通过 `MocapAnimation::set_frame_store` 交给回放。
    pub fn decode(
        bytes: &[u8],
        reverse_byte_order: bool,
        points_per_frame: usize,
    ) -> Result<FrameStore> {
        let floats = decode_floats(bytes, reverse_byte_order)?;
        let frames = assemble_frames(
            &floats,
            frame_stride_floats(points_per_frame),
            points_per_frame,
        )?;
        Ok(FrameStore::new(frames, points_per_frame))
    }

    /// 只读帧库
    pub fn frames(&self) -> &Arc<FrameStore> {
        &self.frames
    }

    pub fn reverse_byte_order(&self) -> bool {
        self.reverse_byte_order
    }

    pub fn points_per_frame(&self) -> usize {
        self.points_per_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(points: &[[f32; 3]]) -> Vec<f32> {
        let mut floats = vec![points.len() as f32];
        for p in points {
            floats.extend_from_slice(p);
        }
        floats
    }

    #[test]
    fn test_decode_rejects_partial_word() {
        match decode_floats(&[0, 0, 128, 63, 1], false) {
            Err(MocapError::MalformedInput(5)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_round_trip_both_orders() {
        let values = [0.0f32, 1.0, -2.5, 28.0, f32::MAX, f32::MIN_POSITIVE, 1e-30];
        for reverse in [false, true] {
            let bytes = encode_floats(&values, reverse);
            assert_eq!(bytes.len(), values.len() * 4);
            let decoded = decode_floats(&bytes, reverse).unwrap();
            assert_eq!(decoded, values);
        }
    }

    #[test]
    fn test_reverse_swaps_each_word() {
        let native = encode_floats(&[1.0, 28.0], false);
        let reversed = encode_floats(&[1.0, 28.0], true);
        for (a, b) in native.chunks_exact(4).zip(reversed.chunks_exact(4)) {
            let mut a = a.to_vec();
            a.reverse();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_decode_big_endian_source() {
        // 1.0f32 的大端表示
        let bytes = [0x3f, 0x80, 0x00, 0x00];
        let reversed = decode_floats(&bytes, true).unwrap()[0];
        let native = decode_floats(&bytes, false).unwrap()[0];
        if cfg!(target_endian = "little") {
            assert_eq!(reversed, 1.0);
            assert_ne!(native, 1.0);
        } else {
            assert_eq!(native, 1.0);
            assert_ne!(reversed, 1.0);
        }
    }

    #[test]
    fn test_assemble_maps_triplets_in_order() {
        let mut floats = record(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        floats.extend(record(&[[7.0, 8.0, 9.0], [10.0, 11.0, 12.0]]));
        let frames = assemble_frames(&floats, 7, 2).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].points(), &[Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
        assert_eq!(frames[1].points(), &[Vec3::new(7.0, 8.0, 9.0), Vec3::new(10.0, 11.0, 12.0)]);
    }

    #[test]
    fn test_assemble_drops_ragged_tail() {
        let mut floats = record(&[[1.0, 1.0, 1.0]]);
        floats.extend_from_slice(&[1.0, 9.0, 9.0]);
        let frames = assemble_frames(&floats, 4, 1).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].points(), &[Vec3::ONE]);
    }

    #[test]
    fn test_assemble_requires_one_full_record() {
        match assemble_frames(&[1.0, 2.0, 3.0], 4, 1) {
            Err(MocapError::TruncatedFrame { available: 3, required: 4 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            assemble_frames(&[], 4, 1),
            Err(MocapError::TruncatedFrame { .. })
        ));
    }

    #[test]
    fn test_assemble_tolerates_bad_header() {
        let floats = [99.0, 1.0, 2.0, 3.0];
        let frames = assemble_frames(&floats, 4, 1).unwrap();
        assert_eq!(frames[0].points(), &[Vec3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn test_assemble_rejects_mismatched_stride() {
        assert!(matches!(
            assemble_frames(&[0.0; 8], 8, 1),
            Err(MocapError::InvalidArgument(_))
        ));
        assert!(matches!(
            assemble_frames(&[0.0; 8], 1, 0),
            Err(MocapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_encode_frames_round_trip() {
        let frames = vec![
            Frame::new(vec![Vec3::new(0.5, -1.0, 2.0)]),
            Frame::new(vec![Vec3::new(10.0, 0.0, 0.0)]),
        ];
        let bytes = encode_frames(&frames, true);
        let store = MocapFile::decode(&bytes, true, 1).unwrap();
        assert_eq!(store.frames(), frames.as_slice());
    }

    #[test]
    fn test_failed_load_keeps_previous_frames() {
        let mut file = MocapFile::new(false, 1);
        let good = encode_frames(&[Frame::new(vec![Vec3::X])], false);
        file.load_from_bytes(&good).unwrap();
        assert_eq!(file.frames().len(), 1);

        assert!(file.load_from_bytes(&good[..good.len() - 1]).is_err());
        assert!(file.load_from_bytes(&good[..8]).is_err());
        assert_eq!(file.frames().len(), 1);
        assert_eq!(file.frames().frames()[0].points(), &[Vec3::X]);
    }

    #[test]
    fn test_load_from_path() {
        let frames = vec![
            Frame::new(vec![Vec3::ZERO, Vec3::ONE]),
            Frame::new(vec![Vec3::X, Vec3::Y]),
            Frame::new(vec![Vec3::Z, Vec3::NEG_ONE]),
        ];
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&encode_frames(&frames, true)).unwrap();
        tmp.flush().unwrap();

        let mut file = MocapFile::new(true, 2);
        let store = file.load(tmp.path()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.frames(), frames.as_slice());
        assert!(Arc::ptr_eq(&store, file.frames()));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let mut file = MocapFile::new(false, 1);
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            file.load(dir.path().join("missing.comap")),
            Err(MocapError::Io(_))
        ));
    }
}
