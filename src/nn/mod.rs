//! # 神经网络模块
//!
//! 由全连接层、卷积层、最大池化层线性堆叠而成的前馈网络，用带dropout、权重衰减和学习率衰减的
//! mini-batch随机梯度下降训练。
//!
//! # 主要组件
//!
//! - [`Network`]: 网络本体，负责构建、训练、推理与持久化
//! - [`Layer`]: 三种层的和类型，公共接口为[`TraitLayer`]
//! - [`ActivationFunction`]、[`CostFunction`]、[`DropoutMask`]
//! - [`NetworkError`]: 网络相关错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use fishnet::nn::{ActivationFunction, Network, TrainingOptions};
//!
//! let mut network = Network::new("mnist_cnn", 1, 28, 28)?;
//! network.add_convolutional_layer(8, 5, 1, 2, Some(ActivationFunction::ReLU))?;
//! network.add_max_pooling_layer()?;
//! network.add_fully_connected_layer(10, Some(ActivationFunction::Sigmoid), 1.0)?;
//! network.validate_output_layer(image_set.categories.len())?;
//! network.train(&image_set, &TrainingOptions::new(10, 32))?;
//! ```

mod activation;
mod cost;
mod dropout;
mod error;
pub mod layer;
mod network;
mod worker;

pub use activation::ActivationFunction;
pub use cost::CostFunction;
pub use dropout::DropoutMask;
pub use error::NetworkError;
pub use layer::{
    ConvolutionalLayer, FullyConnectedLayer, Gradients, Layer, LayerKind, MaxPoolingLayer, Shape3,
    TraitLayer, WeightMode, WeightsAndBiases,
};
pub use network::{Network, TrainingOptions, TrainingSummary};
pub use worker::partition_shares;

#[cfg(test)]
mod tests;
