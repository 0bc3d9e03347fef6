//! 骨骼连接表
//!
//! 有序的 (父标记点, [子标记点]) 列表。标记点编号从 1 开始，0 表示合成根节点。
//! 构建骨骼时按表顺序处理，因此每个父节点必须在它作为子节点出现的条目之后才能被引用。

use std::collections::HashMap;

use crate::{MocapError, Result};

/// 骨骼连接表
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Connectivity {
    entries: Vec<(usize, Vec<usize>)>,
}

impl Connectivity {
    pub fn new(entries: Vec<(usize, Vec<usize>)>) -> Self {
        Self { entries }
    }

    /// Actua Soccer 28 点标记集的默认连接表
    pub fn actua_default() -> Self {
        Self::new(vec![
            (25, vec![6]),          // 肩 → 右肘
            (6, vec![7]),           // 右肘 → 右手
            (24, vec![9]),          // 肩 → 左肘
            (9, vec![10]),          // 左肘 → 左手
            (13, vec![14]),         // 右髋 → 右膝
            (14, vec![21]),         // 右膝 → 右脚
            (21, vec![16, 15, 11]), // 右脚
            (17, vec![18]),         // 左髋 → 左膝
            (18, vec![22]),         // 左膝 → 左脚
            (22, vec![20, 19, 12]), // 左脚
        ])
    }

    pub fn entries(&self) -> &[(usize, Vec<usize>)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 父节点不是任何节点的子节点（直接挂在根节点下）
    pub fn is_top_level(&self, marker_index: usize) -> bool {
        marker_index != 0
            && !self
                .entries
                .iter()
                .any(|(_, children)| children.contains(&marker_index))
    }

    /// 检查连接表
    ///
    /// - 标记点编号必须在 `1..=marker_count` 内（父节点可以是 0）
    /// - 每个节点最多只有一个父节点
    /// - 父节点若作为子节点出现，那个条目必须更靠前
    pub fn validate(&self, marker_count: usize) -> Result<()> {
        let mut attached_in: HashMap<usize, usize> = HashMap::new();

        for (entry, (parent, children)) in self.entries.iter().enumerate() {
            if *parent > marker_count {
                return Err(MocapError::Configuration(format!(
                    "entry {}: parent marker {} out of range 0..={}",
                    entry, parent, marker_count
                )));
            }
            for &child in children {
                if child == 0 || child > marker_count {
                    return Err(MocapError::Configuration(format!(
                        "entry {}: child marker {} out of range 1..={}",
                        entry, child, marker_count
                    )));
                }
                if let Some(previous) = attached_in.insert(child, entry) {
                    return Err(MocapError::Configuration(format!(
                        "marker {} is attached twice (entries {} and {})",
                        child, previous, entry
                    )));
                }
            }
        }

        for (entry, (parent, _)) in self.entries.iter().enumerate() {
            if let Some(&attached) = attached_in.get(parent) {
                if attached >= entry {
                    return Err(MocapError::Configuration(format!(
                        "entry {}: parent marker {} is only attached in entry {}",
                        entry, parent, attached
                    )));
                }
            }
        }

        Ok(())
    }
}

impl From<Vec<(usize, Vec<usize>)>> for Connectivity {
    fn from(entries: Vec<(usize, Vec<usize>)>) -> Self {
        Self::new(entries)
    }
}
