//! 数据加载模块
//!
//! 把磁盘上的数据集解析为网络训练所用的图像集。
//!
//! # 主要组件
//!
//! - [`Image`]: 带类别标签的单张图像
//! - [`ImageSet`]: 训练集 + 测试集 + 类别名 + 每个类别的one-hot目标
//! - [`ImageSetLoader`]: 按名字载入并缓存图像集
//! - [`datasets`]: MNIST（IDX格式）、CIFAR-10（二进制格式）与人脸数据集（PGM格式）的解析
//! - [`DataError`]: 数据加载错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use fishnet::data::ImageSetLoader;
//!
//! let mut loader = ImageSetLoader::new("./data");
//! let mnist = loader.load("mnist")?;
//! println!("{}个训练样本", mnist.training.len());
//! ```

pub mod datasets;
mod error;
mod image_set;
mod loader;

#[cfg(test)]
mod tests;

pub use error::DataError;
pub use image_set::{Image, ImageSet};
pub use loader::{DatasetInfo, ImageSetLoader};
