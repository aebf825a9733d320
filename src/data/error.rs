//! 数据加载错误类型定义

use std::path::PathBuf;
use thiserror::Error;

/// 数据加载相关错误
#[derive(Debug, Error)]
pub enum DataError {
    /// 文件未找到
    #[error("文件未找到: {0}")]
    FileNotFound(PathBuf),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 格式错误（如 magic number 不匹配）
    #[error("格式错误: {0}")]
    FormatError(String),

    /// 图像的类别超出数据集的类别数
    #[error("类别{category}超出范围（共{count}个类别）")]
    InvalidCategory { category: usize, count: usize },

    /// 图像尺寸与数据集不一致
    #[error("图像形状不匹配: 期望 {expected:?}, 实际 {got:?}")]
    ShapeMismatch { expected: [usize; 4], got: [usize; 4] },

    /// 未知的数据集名
    #[error("未知的数据集: {0}")]
    UnknownDataset(String),
}
