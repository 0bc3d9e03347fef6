//! 标记点骨骼层级
//!
//! 按连接表把每帧的标记点组织成父子层级，节点保存相对父节点的本地变换，
//! 世界变换延迟计算。

mod connectivity;
mod decompose;
mod graph;
mod node;

pub use connectivity::Connectivity;
pub use decompose::{decompose, DecomposedTransform};
pub use graph::{SkeletonGraph, ROOT_NODE};
pub use node::MocapNode;
