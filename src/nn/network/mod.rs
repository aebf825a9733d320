/*
 * @Author       : 老董
 * @Date         : 2024-03-16
 * @Description  : 前馈网络：有序的层序列 + 代价函数 + 全局超参数
 *
 * 第一层的输入形状在构造网络时确定，之后每一层的输入形状都由上一层的输出形状推出。
 * 卷积层和最大池化层都不能跟在全连接层之后（展平后空间结构已不复存在）。
 */

mod model_io;
mod report;
mod train;

pub use train::{TrainingOptions, TrainingSummary};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use super::NetworkError;
use super::activation::ActivationFunction;
use super::cost::CostFunction;
use super::layer::{
    ConvolutionalLayer, FullyConnectedLayer, Layer, LayerKind, MaxPoolingLayer, Shape3,
    TraitLayer, WeightMode,
};
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct Network {
    name: String,
    input_shape: Shape3,
    layers: Vec<Layer>,
    cost_function: CostFunction,
    thread_count: usize,
    epochs_trained: u32,
    learning_rate: f64,
    weight_decay: f64,
    rng: StdRng,
}

impl Network {
    /// 默认学习率
    pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

    /// 创建一个还没有任何层的网络
    ///
    /// # 参数
    /// - `name`: 网络名，用于日志和保存的文件名
    /// - `channels`/`rows`/`columns`: 输入图像的通道数与尺寸
    pub fn new(
        name: impl Into<String>,
        channels: usize,
        rows: usize,
        columns: usize,
    ) -> Result<Self, NetworkError> {
        if channels == 0 || rows == 0 || columns == 0 {
            return Err(NetworkError::InvalidParameter(format!(
                "网络的输入尺寸须都≥1，当前为{channels}x{rows}x{columns}"
            )));
        }
        Ok(Self {
            name: name.into(),
            input_shape: Shape3::new(channels, rows, columns),
            layers: Vec::new(),
            cost_function: CostFunction::CrossEntropy,
            thread_count: 1,
            epochs_trained: 0,
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            weight_decay: 0.0,
            rng: StdRng::from_entropy(),
        })
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓属性↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn input_shape(&self) -> Shape3 {
        self.input_shape
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn cost_function(&self) -> CostFunction {
        self.cost_function
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn set_thread_count(&mut self, thread_count: usize) -> Result<(), NetworkError> {
        if thread_count == 0 {
            return Err(NetworkError::InvalidParameter("线程数须≥1".to_string()));
        }
        self.thread_count = thread_count;
        Ok(())
    }

    pub fn epochs_trained(&self) -> u32 {
        self.epochs_trained
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<(), NetworkError> {
        if learning_rate <= 0.0 || !learning_rate.is_finite() {
            return Err(NetworkError::InvalidParameter(format!(
                "学习率须>0，当前为{learning_rate}"
            )));
        }
        self.learning_rate = learning_rate;
        Ok(())
    }

    pub fn weight_decay(&self) -> f64 {
        self.weight_decay
    }

    pub fn set_weight_decay(&mut self, weight_decay: f64) -> Result<(), NetworkError> {
        if !(0.0..1.0).contains(&weight_decay) {
            return Err(NetworkError::InvalidParameter(format!(
                "权重衰减须在[0, 1)内，当前为{weight_decay}"
            )));
        }
        self.weight_decay = weight_decay;
        Ok(())
    }

    /// 固定随机种子（权重初始化、打乱训练集、dropout采样都由它派生），便于复现
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑属性↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓添加层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    /// 下一个被添加的层的输入形状
    fn next_input_shape(&self) -> Shape3 {
        self.layers
            .last()
            .map_or(self.input_shape, |layer| layer.output_shape())
    }

    /// 检查`next`类型的层能否追加在当前最后一层之后
    fn check_next_layer(&self, next: LayerKind) -> Result<(), NetworkError> {
        check_layer_order(self.layers.last().map(|layer| layer.kind()), next)
    }

    /// 添加全连接层
    ///
    /// # 参数
    /// - `size`: 神经元个数
    /// - `activation`: 激活函数，`None`表示不使用
    /// - `keep_probability`: 本层输出的保留概率（1 - dropout率），须在(0, 1]内
    pub fn add_fully_connected_layer(
        &mut self,
        size: usize,
        activation: Option<ActivationFunction>,
        keep_probability: f64,
    ) -> Result<(), NetworkError> {
        let prev_keep_probability = self.layers.last().map_or(1.0, |l| l.keep_probability());
        let layer = FullyConnectedLayer::new(
            self.next_input_shape(),
            size,
            activation,
            keep_probability,
            prev_keep_probability,
        )?;
        self.push_layer(layer.into());
        Ok(())
    }

    /// 添加卷积层
    ///
    /// # 参数
    /// - `filter_count`: 滤波器个数
    /// - `filter_size`: 正方形卷积核的边长
    /// - `stride`: 步长
    /// - `padding`: 零填充宽度，须小于`filter_size`
    /// - `activation`: 激活函数，`None`表示不使用
    pub fn add_convolutional_layer(
        &mut self,
        filter_count: usize,
        filter_size: usize,
        stride: usize,
        padding: usize,
        activation: Option<ActivationFunction>,
    ) -> Result<(), NetworkError> {
        self.check_next_layer(LayerKind::Convolutional)?;
        let layer = ConvolutionalLayer::new(
            self.next_input_shape(),
            filter_count,
            filter_size,
            stride,
            padding,
            activation,
        )?;
        self.push_layer(layer.into());
        Ok(())
    }

    /// 添加2x2最大池化层
    pub fn add_max_pooling_layer(&mut self) -> Result<(), NetworkError> {
        self.check_next_layer(LayerKind::MaxPooling)?;
        let layer = MaxPoolingLayer::new(self.next_input_shape())?;
        self.push_layer(layer.into());
        Ok(())
    }

    /// 直接追加一个已构建好的层（载入网络文件时使用），输入形状须与上一层的输出一致，
    /// 层的先后顺序由调用方用[`check_layer_order`]检查
    pub(crate) fn push_layer(&mut self, layer: Layer) {
        debug_assert_eq!(layer.input_shape().size(), self.next_input_shape().size());
        debug!("第{}层: {}", self.layers.len(), layer.description());
        self.layers.push(layer);
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑添加层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /// 检查输出层：须为全连接层，神经元个数等于类别数，且使用Sigmoid激活函数
    pub fn validate_output_layer(&self, category_count: usize) -> Result<(), NetworkError> {
        let last = self.layers.last().ok_or(NetworkError::EmptyNetwork)?;
        if last.kind() != LayerKind::FullyConnected || last.output_shape().size() != category_count {
            return Err(NetworkError::InvalidOutputLayer(format!(
                "输出层须为全连接层，且每个类别对应一个神经元（共{category_count}个）"
            )));
        }
        if !matches!(last.activation(), Some(ActivationFunction::Sigmoid)) {
            return Err(NetworkError::InvalidOutputLayer(
                "输出层须使用Sigmoid激活函数".to_string(),
            ));
        }
        Ok(())
    }

    /// 随机初始化尚未初始化的层参数（已初始化或从文件载入的参数保持不变）
    pub fn initialize_weights(&mut self) {
        for layer in &mut self.layers {
            layer.initialize_weights(&mut self.rng);
        }
    }

    /// 对单个输入做一次完整的前向传播（不使用dropout），返回输出层的激活值
    pub fn feed_forward(&self, input: &Tensor, mode: WeightMode) -> Tensor {
        let mut current = input.clone();
        for layer in &self.layers {
            let mut output = Tensor::zeros(layer.output_shape().tensor_shape());
            layer.feed_forward(&current, &mut output, None, mode);
            if let Some(activation) = layer.activation() {
                activation.apply_in_place(&mut output);
            }
            current = output;
        }
        current
    }

    /// 多行的网络结构描述，每层一行
    pub fn description(&self) -> String {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, layer)| format!("\tLayer {i}: {}\n", layer.description()))
            .collect()
    }
}

/// 层的先后顺序规则：最大池化层不能作为第一层，卷积层和最大池化层都不能跟在全连接层之后
///
/// # 参数
/// - `previous`: 当前最后一层的类型，网络为空时为`None`
/// - `next`: 要追加的层的类型
pub(crate) fn check_layer_order(
    previous: Option<LayerKind>,
    next: LayerKind,
) -> Result<(), NetworkError> {
    let message = match (previous, next) {
        (None, LayerKind::MaxPooling) => "最大池化层不能作为网络的第一层",
        (Some(LayerKind::FullyConnected), LayerKind::Convolutional) => "卷积层不能跟在全连接层之后",
        (Some(LayerKind::FullyConnected), LayerKind::MaxPooling) => "最大池化层不能跟在全连接层之后",
        _ => return Ok(()),
    };
    Err(NetworkError::InvalidLayerOrder(message.to_string()))
}
