//! 网络构建、训练与持久化相关错误类型定义

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    /// 层的先后顺序不合法（如全连接层之后接卷积层）
    #[error("层的顺序不合法：{0}")]
    InvalidLayerOrder(String),

    /// 层或网络的超参数不合法
    #[error("参数不合法：{0}")]
    InvalidParameter(String),

    /// 输出层不满足训练要求
    #[error("输出层不合法：{0}")]
    InvalidOutputLayer(String),

    /// 网络中还没有任何层
    #[error("网络中还没有任何层")]
    EmptyNetwork,

    /// 线程数超过数据集大小
    #[error("线程数{threads}不能超过训练集大小{training}或测试集大小{test}")]
    ThreadCount {
        threads: usize,
        training: usize,
        test: usize,
    },

    /// 网络文件内容不合法
    #[error("网络文件格式错误：{0}")]
    Format(String),

    /// 网络文件版本过新
    #[error("网络文件版本{found}高于当前支持的版本{supported}")]
    UnsupportedVersion { found: u16, supported: u16 },

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
}
