/*
 * @Author       : 老董
 * @Date         : 2024-03-02
 * @Description  : 网络层：全连接层、卷积层、最大池化层
 *
 * 三种层构成一个封闭的和类型`Layer`，通过`enum_dispatch`分发到`TraitLayer`。
 * 梯度累积是带权重层的可选能力：池化层使用默认的空实现，`parameters()`返回`None`。
 */

mod convolutional;
mod fully_connected;
mod max_pooling;
mod weights;

pub use convolutional::ConvolutionalLayer;
pub use fully_connected::FullyConnectedLayer;
pub use max_pooling::MaxPoolingLayer;
pub use weights::{Gradients, WeightsAndBiases};

use std::fmt;
use std::io::{self, Write};

use enum_dispatch::enum_dispatch;
use rand::RngCore;

use super::activation::ActivationFunction;
use super::dropout::DropoutMask;
use crate::tensor::Tensor;

/// 层的持久化标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    FullyConnected,
    Convolutional,
    MaxPooling,
}

impl LayerKind {
    pub fn tag(self) -> u8 {
        match self {
            LayerKind::FullyConnected => 0,
            LayerKind::Convolutional => 1,
            LayerKind::MaxPooling => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(LayerKind::FullyConnected),
            1 => Some(LayerKind::Convolutional),
            2 => Some(LayerKind::MaxPooling),
            _ => None,
        }
    }
}

/// 前向传播使用的权重：训练用的原始权重，或测试（推理）用的按dropout缩放后的权重
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightMode {
    Training,
    Testing,
}

/// 层的输入/输出形状：平面（通道）数、行数、列数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape3 {
    pub planes: usize,
    pub rows: usize,
    pub columns: usize,
}

impl Shape3 {
    pub fn new(planes: usize, rows: usize, columns: usize) -> Self {
        Self {
            planes,
            rows,
            columns,
        }
    }

    /// 全连接层的输出：`1x1xN`
    pub fn flat(size: usize) -> Self {
        Self::new(1, 1, size)
    }

    pub fn size(&self) -> usize {
        self.planes * self.rows * self.columns
    }

    /// 对应的张量形状`[1, planes, rows, columns]`
    pub fn tensor_shape(&self) -> [usize; 4] {
        [1, self.planes, self.rows, self.columns]
    }
}

impl fmt::Display for Shape3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.planes, self.rows, self.columns)
    }
}

#[enum_dispatch]
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    FullyConnected(FullyConnectedLayer),
    Convolutional(ConvolutionalLayer),
    MaxPooling(MaxPoolingLayer),
}

#[enum_dispatch(Layer)]
pub trait TraitLayer {
    fn kind(&self) -> LayerKind;

    fn input_shape(&self) -> Shape3;

    fn output_shape(&self) -> Shape3;

    fn activation(&self) -> Option<&ActivationFunction> {
        None
    }

    /// 本层输出的保留概率（1 - dropout率），只有全连接层可能小于1
    fn keep_probability(&self) -> f64 {
        1.0
    }

    /// 前向传播，`output`中写入的是施加激活函数之前的原始激活值
    fn feed_forward(
        &self,
        input: &Tensor,
        output: &mut Tensor,
        mask: Option<&DropoutMask>,
        mode: WeightMode,
    );

    /// 将本层输出端的误差`error_out`反向传播为输入端的误差`error_in`。
    /// `input`/`output`为本次前向传播时本层的输入和输出激活值（池化层据此找到最大值的位置）
    fn backpropagate_error(
        &self,
        error_out: &Tensor,
        error_in: &mut Tensor,
        input: &Tensor,
        output: &Tensor,
        mask: Option<&DropoutMask>,
    );

    /// 把本样本对nablaW、nablaB的贡献累加进`gradients`
    fn update_weight_and_bias_errors(
        &self,
        _delta: &Tensor,
        _prev_activations: &Tensor,
        _gradients: &mut Gradients,
        _mask: Option<&DropoutMask>,
    ) {
    }

    /// 返回该层的可训练参数，无参数的层返回`None`
    fn parameters(&self) -> Option<&WeightsAndBiases> {
        None
    }

    fn parameters_mut(&mut self) -> Option<&mut WeightsAndBiases> {
        None
    }

    /// 尚未初始化的参数按各层的规则随机初始化，已初始化（或从文件载入）的保持不变
    fn initialize_weights(&mut self, _rng: &mut dyn RngCore) {}

    /// 写入层记录（含1字节类型标签）
    fn save(&self, writer: &mut dyn Write) -> io::Result<()>;

    /// 人类可读的单行描述
    fn description(&self) -> String;

    /// 架构统计表中的一行：`Layer,Layer Size,Filter Count,Filter Size,Stride,Padding,Dropout,Activation,Leakiness`
    fn architecture_row(&self) -> String;
}

/// 架构统计表的最后两列：激活函数简称、泄露系数（没有则留空）
pub(crate) fn activation_columns(activation: Option<&ActivationFunction>) -> String {
    match activation {
        Some(activation) => match activation.leakiness() {
            Some(leakiness) => format!("{},{}", activation.name(), leakiness),
            None => format!("{},", activation.name()),
        },
        None => ",".to_string(),
    }
}

/// 描述中的激活函数部分，没有则为`None`
pub(crate) fn activation_description(activation: Option<&ActivationFunction>) -> String {
    activation.map_or_else(|| "None".to_string(), |a| a.to_string())
}

/// dropout率（`1 - keep_probability`），保留6位小数以免出现`0.19999999999999996`这样的输出
pub(crate) fn dropout_rate_text(keep_probability: f64) -> String {
    (((1.0 - keep_probability) * 1e6).round() / 1e6).to_string()
}

impl Layer {
    pub fn is_weighted(&self) -> bool {
        self.parameters().is_some()
    }
}
