//! 训练任务相关错误类型定义

use std::io;
use thiserror::Error;

use crate::data::DataError;
use crate::nn::NetworkError;

#[derive(Debug, Error)]
pub enum JobError {
    /// 任务文件不是合法的JSON或缺少必填字段
    #[error("任务文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),

    /// 某个任务的配置不合法（`job`从1开始计数）
    #[error("第{job}个任务不合法: {message}")]
    Invalid { job: usize, message: String },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Data(#[from] DataError),
}
