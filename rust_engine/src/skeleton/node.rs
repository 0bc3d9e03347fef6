//! 骨骼节点

use glam::{Mat4, Vec3};

use super::decompose::{decompose, DecomposedTransform};

/// 骨骼节点
///
/// 节点之间只通过索引相互引用，节点本身由 `SkeletonGraph` 统一持有。
#[derive(Clone, Debug)]
pub struct MocapNode {
    pub index: usize,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,

    // 本地状态
    local_position: Vec3,
    /// 欧拉角（弧度），按 Y、X、Z 顺序应用
    local_eulers: Vec3,
    dirty: bool,

    // 变换结果
    local_transform: Mat4,
    world_transform: Mat4,
}

impl MocapNode {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            parent: None,
            children: Vec::new(),
            local_position: Vec3::ZERO,
            local_eulers: Vec3::ZERO,
            dirty: true,
            local_transform: Mat4::IDENTITY,
            world_transform: Mat4::IDENTITY,
        }
    }

    pub fn set_local_position(&mut self, position: Vec3) {
        self.local_position = position;
        self.dirty = true;
    }

    /// 设置本地欧拉角（弧度）
    pub fn set_local_eulers(&mut self, eulers: Vec3) {
        self.local_eulers = eulers;
        self.dirty = true;
    }

    pub fn local_position(&self) -> Vec3 {
        self.local_position
    }

    pub fn local_eulers(&self) -> Vec3 {
        self.local_eulers
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// 重新计算本地变换并与父节点世界变换组合
    ///
    /// 组合顺序：平移 → 绕 Y → 绕 X → 绕 Z，缩放恒为 1。
    pub(crate) fn recompute(&mut self, parent_world: &Mat4) {
        self.local_transform = Mat4::from_translation(self.local_position)
            * Mat4::from_rotation_y(self.local_eulers.y)
            * Mat4::from_rotation_x(self.local_eulers.x)
            * Mat4::from_rotation_z(self.local_eulers.z);
        self.world_transform = *parent_world * self.local_transform;
        self.dirty = false;
    }

    pub fn local_transform(&self) -> &Mat4 {
        &self.local_transform
    }

    pub fn world_transform(&self) -> &Mat4 {
        &self.world_transform
    }

    /// 分解世界变换
    pub fn decomposed_transform(&self) -> Option<DecomposedTransform> {
        decompose(&self.world_transform)
    }

    /// 世界空间位置（分解世界变换得到的平移分量）
    pub fn world_position(&self) -> Vec3 {
        match self.decomposed_transform() {
            Some(decomposed) => decomposed.translation,
            None => {
                log::warn!("节点 {} 的世界变换无法分解，直接取平移列", self.index);
                self.world_transform.w_axis.truncate()
            }
        }
    }
}
