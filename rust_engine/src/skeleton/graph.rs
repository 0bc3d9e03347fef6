//! 骨骼图

use glam::{Mat4, Vec3};

use crate::animation::Frame;
use crate::{MocapError, Result};

use super::{Connectivity, DecomposedTransform, MocapNode};

/// 合成根节点索引，世界变换恒为单位矩阵
pub const ROOT_NODE: usize = 0;

/// 骨骼图
///
/// 节点存放在按索引寻址的数组中：索引 0 是根节点，1..=N 对应同编号的标记点。
/// 父子关系只保存索引。
pub struct SkeletonGraph {
    nodes: Vec<MocapNode>,
    connectivity: Connectivity,
    /// 不作为任何节点子节点出现的父节点，构建时直接挂到根节点下
    top_level: Vec<bool>,
}

impl SkeletonGraph {
    /// 创建骨骼图，连接表非法时返回 `Configuration`
    pub fn new(marker_count: usize, connectivity: Connectivity) -> Result<Self> {
        connectivity.validate(marker_count)?;

        let nodes: Vec<MocapNode> = (0..=marker_count).map(MocapNode::new).collect();
        let top_level = (0..=marker_count)
            .map(|i| connectivity.is_top_level(i))
            .collect();

        let mut graph = Self {
            nodes,
            connectivity,
            top_level,
        };
        graph.update_world_transforms();
        Ok(graph)
    }

    /// 标记点数量（不含根节点）
    pub fn marker_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn root(&self) -> &MocapNode {
        &self.nodes[ROOT_NODE]
    }

    pub fn get_node(&self, index: usize) -> Option<&MocapNode> {
        self.nodes.get(index)
    }

    /// 获取可变节点；根节点的变换固定，不可修改
    pub fn get_node_mut(&mut self, index: usize) -> Option<&mut MocapNode> {
        if index == ROOT_NODE {
            return None;
        }
        self.nodes.get_mut(index)
    }

    /// 添加子节点
    ///
    /// 重复添加到同一父节点不会产生重复引用；换父节点时从旧父节点移除。
    /// 索引越界返回 `NodeOutOfRange`；根节点作子节点、或父节点是子节点自身/其后代时返回 `InvalidArgument`。
    pub fn add_child(&mut self, parent: usize, child: usize) -> Result<()> {
        for index in [parent, child] {
            if index >= self.nodes.len() {
                return Err(MocapError::NodeOutOfRange {
                    index,
                    node_count: self.nodes.len(),
                });
            }
        }
        if child == ROOT_NODE {
            return Err(MocapError::InvalidArgument(
                "the root node cannot be attached as a child".to_string(),
            ));
        }
        if self.nodes[child].parent == Some(parent) {
            return Ok(());
        }
        if self.is_self_or_ancestor(child, parent) {
            return Err(MocapError::InvalidArgument(format!(
                "attaching node {} under node {} would create a cycle",
                child, parent
            )));
        }

        if let Some(current) = self.nodes[child].parent {
            self.nodes[current].children.retain(|&c| c != child);
        }
        if !self.nodes[parent].children.contains(&child) {
            self.nodes[parent].children.push(child);
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[child].mark_dirty();
        Ok(())
    }

    /// `node` 是否为 `descendant` 自身或其祖先
    fn is_self_or_ancestor(&self, node: usize, descendant: usize) -> bool {
        let mut current = Some(descendant);
        while let Some(index) = current {
            if index == node {
                return true;
            }
            current = self.nodes[index].parent;
        }
        false
    }

    /// 从父节点上摘下
    fn detach(&mut self, child: usize) {
        if let Some(parent) = self.nodes[child].parent.take() {
            self.nodes[parent].children.retain(|&c| c != child);
            self.nodes[child].mark_dirty();
        }
    }

    /// 根据当前帧重建骨骼
    ///
    /// 子节点的本地位置 = 子标记点 - 父节点已解析的世界位置，
    /// 所以每个节点在设置位置后立即解析世界变换，供后续条目使用。
    pub fn populate(&mut self, frame: &Frame) -> Result<()> {
        if frame.point_count() < self.marker_count() {
            return Err(MocapError::InvalidArgument(format!(
                "frame has {} points, skeleton needs {}",
                frame.point_count(),
                self.marker_count()
            )));
        }

        // 连接表管理的节点先全部摘下，手动改过的父子关系不会与连接表形成环
        let managed: Vec<usize> = self
            .connectivity
            .entries()
            .iter()
            .flat_map(|(parent, children)| std::iter::once(*parent).chain(children.iter().copied()))
            .filter(|&index| index != ROOT_NODE)
            .collect();
        for index in managed {
            self.detach(index);
        }

        for entry in 0..self.connectivity.entries().len() {
            let parent = self.connectivity.entries()[entry].0;

            if self.top_level[parent] {
                let marker = marker_position(frame, parent);
                let root_position = self.nodes[ROOT_NODE].world_position();
                self.add_child(ROOT_NODE, parent)?;
                self.nodes[parent].set_local_position(marker - root_position);
                self.resolve(parent);
            }

            let parent_position = self.nodes[parent].world_position();
            for i in 0..self.connectivity.entries()[entry].1.len() {
                let child = self.connectivity.entries()[entry].1[i];
                let marker = marker_position(frame, child);
                self.add_child(parent, child)?;
                self.nodes[child].set_local_position(marker - parent_position);
                self.resolve(child);
            }
        }

        self.update_world_transforms();
        Ok(())
    }

    /// 延迟更新世界变换
    ///
    /// 脏节点重新计算并把所有子节点标记为脏；干净节点跳过自身，但仍遍历子树。
    pub fn update_world_transforms(&mut self) {
        let mut stack: Vec<usize> = (0..self.nodes.len())
            .rev()
            .filter(|&i| self.nodes[i].parent.is_none())
            .collect();

        while let Some(index) = stack.pop() {
            if self.nodes[index].is_dirty() {
                self.resolve(index);
            }
            stack.extend(self.nodes[index].children.iter().rev().copied());
        }
    }

    /// 重新计算单个节点，并使其子节点失效
    fn resolve(&mut self, index: usize) {
        let parent_world = match self.nodes[index].parent {
            Some(parent) => *self.nodes[parent].world_transform(),
            None => Mat4::IDENTITY,
        };
        self.nodes[index].recompute(&parent_world);

        for i in 0..self.nodes[index].children.len() {
            let child = self.nodes[index].children[i];
            self.nodes[child].mark_dirty();
        }
    }

    pub fn world_transform(&self, index: usize) -> Option<&Mat4> {
        self.nodes.get(index).map(|node| node.world_transform())
    }

    pub fn world_position(&self, index: usize) -> Option<Vec3> {
        self.nodes.get(index).map(|node| node.world_position())
    }

    pub fn decomposed_transform(&self, index: usize) -> Option<DecomposedTransform> {
        self.nodes.get(index).and_then(|node| node.decomposed_transform())
    }

    /// 所有非根父子连线的世界坐标端点，供渲染绘制骨骼线
    pub fn bone_segments(&self) -> Vec<(Vec3, Vec3)> {
        self.nodes
            .iter()
            .filter_map(|node| match node.parent {
                Some(parent) if parent != ROOT_NODE => {
                    Some((self.nodes[parent].world_position(), node.world_position()))
                }
                _ => None,
            })
            .collect()
    }
}

fn marker_position(frame: &Frame, marker_index: usize) -> Vec3 {
    frame.marker(marker_index).unwrap_or(Vec3::ZERO)
}
