//! 4×4 矩阵分解
//!
//! 把稠密的变换矩阵拆成缩放、旋转、平移、斜切和透视分量（Shoemake / Graphics Gems II 方法）。
//! 纯函数，不依赖骨骼结构，便于用手工构造的矩阵测试。

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

const EPSILON: f32 = 1e-6;

/// 矩阵分解结果
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecomposedTransform {
    pub scale: Vec3,
    pub rotation: Quat,
    pub translation: Vec3,
    pub skew: Vec3,
    pub perspective: Vec4,
}

/// 分解变换矩阵
///
/// 矩阵退化（齐次分量为 0 或透视部分不可逆）时返回 `None`。
pub fn decompose(matrix: &Mat4) -> Option<DecomposedTransform> {
    let mut local = *matrix;
    let w = local.w_axis.w;
    if w.abs() < EPSILON {
        return None;
    }
    // 归一化，使 [3][3] = 1
    local *= 1.0 / w;

    // 透视部分：去掉最后一行的透视项
    let mut perspective_matrix = local;
    perspective_matrix.x_axis.w = 0.0;
    perspective_matrix.y_axis.w = 0.0;
    perspective_matrix.z_axis.w = 0.0;
    perspective_matrix.w_axis.w = 1.0;
    if perspective_matrix.determinant().abs() < EPSILON {
        return None;
    }

    let perspective = if local.x_axis.w != 0.0 || local.y_axis.w != 0.0 || local.z_axis.w != 0.0 {
        let rhs = Vec4::new(local.x_axis.w, local.y_axis.w, local.z_axis.w, local.w_axis.w);
        let solved = perspective_matrix.inverse().transpose() * rhs;
        local.x_axis.w = 0.0;
        local.y_axis.w = 0.0;
        local.z_axis.w = 0.0;
        local.w_axis.w = 1.0;
        solved
    } else {
        Vec4::W
    };

    let translation = local.w_axis.truncate();

    let mut col0 = local.x_axis.truncate();
    let mut col1 = local.y_axis.truncate();
    let mut col2 = local.z_axis.truncate();

    // X 缩放并归一化第一列
    let mut scale = Vec3::ZERO;
    let mut skew = Vec3::ZERO;
    scale.x = col0.length();
    col0 /= scale.x;

    // XY 斜切，使第二列与第一列正交
    skew.z = col0.dot(col1);
    col1 -= col0 * skew.z;

    scale.y = col1.length();
    col1 /= scale.y;
    skew.z /= scale.y;

    // XZ / YZ 斜切
    skew.y = col0.dot(col2);
    col2 -= col0 * skew.y;
    skew.x = col1.dot(col2);
    col2 -= col1 * skew.x;

    scale.z = col2.length();
    col2 /= scale.z;
    skew.y /= scale.z;
    skew.x /= scale.z;

    // 坐标系翻转时取负
    if col0.dot(col1.cross(col2)) < 0.0 {
        scale = -scale;
        col0 = -col0;
        col1 = -col1;
        col2 = -col2;
    }

    let rotation = Quat::from_mat3(&Mat3::from_cols(col0, col1, col2)).normalize();

    Some(DecomposedTransform {
        scale,
        rotation,
        translation,
        skew,
        perspective,
    })
}
