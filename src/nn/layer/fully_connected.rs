/*
 * @Author       : 老董
 * @Date         : 2024-03-02
 * @Description  : 全连接层
 *
 * 权重形状为`[1, 1, 输出数, 输入数]`，偏置形状为`[1, 1, 1, 输出数]`。输入张量不论形状都按扁平向量处理。
 *
 * dropout：本层的`keep_probability`作用于本层输出（由调用方传入的掩码决定哪些神经元被丢弃）；
 * 若上一层使用了dropout（`prev_keep_probability < 1`），则测试模式下本层的有效权重为原始权重乘以上一层的保留概率，
 * 原始权重本身从不被修改。
 */

use std::borrow::Cow;
use std::io::{self, Write};

use rand::RngCore;

use super::weights::{Gradients, WeightsAndBiases};
use super::{
    LayerKind, Shape3, TraitLayer, WeightMode, activation_columns, activation_description,
    dropout_rate_text,
};
use crate::nn::NetworkError;
use crate::nn::activation::ActivationFunction;
use crate::nn::dropout::DropoutMask;
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq)]
pub struct FullyConnectedLayer {
    input_shape: Shape3,
    output_size: usize,
    activation: Option<ActivationFunction>,
    keep_probability: f64,
    prev_keep_probability: f64,
    params: WeightsAndBiases,
}

impl FullyConnectedLayer {
    /// 创建参数尚未初始化的全连接层
    ///
    /// # 参数
    /// - `input_shape`: 上一层的输出形状（或网络输入形状）
    /// - `output_size`: 神经元个数
    /// - `activation`: 激活函数，`None`表示不使用
    /// - `keep_probability`: 本层输出的保留概率，须在(0, 1]内
    /// - `prev_keep_probability`: 上一层的保留概率
    pub fn new(
        input_shape: Shape3,
        output_size: usize,
        activation: Option<ActivationFunction>,
        keep_probability: f64,
        prev_keep_probability: f64,
    ) -> Result<Self, NetworkError> {
        if output_size == 0 {
            return Err(NetworkError::InvalidParameter(
                "全连接层的神经元个数须≥1".to_string(),
            ));
        }
        validate_keep_probability(keep_probability)?;
        Ok(Self {
            input_shape,
            output_size,
            activation,
            keep_probability,
            prev_keep_probability,
            params: WeightsAndBiases::zeros([1, 1, output_size, input_shape.size()], output_size),
        })
    }

    /// 用已有的权重和偏置创建全连接层（从文件载入或测试时使用）
    pub fn with_parameters(
        input_shape: Shape3,
        weights: Tensor,
        biases: Tensor,
        activation: Option<ActivationFunction>,
        keep_probability: f64,
        prev_keep_probability: f64,
    ) -> Result<Self, NetworkError> {
        validate_keep_probability(keep_probability)?;
        let output_size = weights.rows();
        if weights.hyperplanes() != 1 || weights.planes() != 1 {
            return Err(NetworkError::Format(format!(
                "全连接层的权重须为矩阵，实际形状为{:?}",
                weights.shape()
            )));
        }
        if weights.columns() != input_shape.size() {
            return Err(NetworkError::Format(format!(
                "全连接层的权重有{}列，但输入大小为{}",
                weights.columns(),
                input_shape.size()
            )));
        }
        if biases.size() != output_size {
            return Err(NetworkError::Format(format!(
                "全连接层有{}个神经元，但偏置有{}个",
                output_size,
                biases.size()
            )));
        }
        let biases = Tensor::from_vec(biases.as_slice().to_vec(), [1, 1, 1, output_size]);
        Ok(Self {
            input_shape,
            output_size,
            activation,
            keep_probability,
            prev_keep_probability,
            params: WeightsAndBiases::loaded(weights, biases),
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_shape.size()
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn prev_keep_probability(&self) -> f64 {
        self.prev_keep_probability
    }

    /// 指定模式下前向传播实际使用的权重：
    /// 训练模式为原始权重；测试模式下若上一层使用了dropout，则为原始权重乘以上一层的保留概率
    pub fn weights_for(&self, mode: WeightMode) -> Cow<'_, Tensor> {
        match self.testing_scale(mode) {
            Some(scale) => Cow::Owned(&self.params.weights * scale),
            None => Cow::Borrowed(&self.params.weights),
        }
    }

    fn testing_scale(&self, mode: WeightMode) -> Option<f64> {
        match mode {
            WeightMode::Testing if self.prev_keep_probability < 1.0 => {
                Some(self.prev_keep_probability)
            }
            _ => None,
        }
    }
}

fn validate_keep_probability(keep_probability: f64) -> Result<(), NetworkError> {
    if keep_probability > 0.0 && keep_probability <= 1.0 {
        Ok(())
    } else {
        Err(NetworkError::InvalidParameter(format!(
            "保留概率须在(0, 1]内，当前为{keep_probability}"
        )))
    }
}

impl TraitLayer for FullyConnectedLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::FullyConnected
    }

    fn input_shape(&self) -> Shape3 {
        self.input_shape
    }

    fn output_shape(&self) -> Shape3 {
        Shape3::flat(self.output_size)
    }

    fn activation(&self) -> Option<&ActivationFunction> {
        self.activation.as_ref()
    }

    fn keep_probability(&self) -> f64 {
        self.keep_probability
    }

    fn feed_forward(
        &self,
        input: &Tensor,
        output: &mut Tensor,
        mask: Option<&DropoutMask>,
        mode: WeightMode,
    ) {
        let input_size = self.input_size();
        debug_assert_eq!(input.size(), input_size);
        debug_assert_eq!(output.size(), self.output_size);

        let weights = self.params.weights.as_slice();
        let biases = self.params.biases.as_slice();
        let inputs = input.as_slice();
        let scale = self.testing_scale(mode);
        for (i, out) in output.as_slice_mut().iter_mut().enumerate() {
            if mask.is_some_and(|m| !m[i]) {
                *out = 0.0;
                continue;
            }
            let row = &weights[i * input_size..(i + 1) * input_size];
            let sum: f64 = match scale {
                Some(scale) => row.iter().zip(inputs).map(|(&w, &x)| (w * scale) * x).sum(),
                None => row.iter().zip(inputs).map(|(&w, &x)| w * x).sum(),
            };
            *out = biases[i] + sum;
        }
    }

    fn backpropagate_error(
        &self,
        error_out: &Tensor,
        error_in: &mut Tensor,
        _input: &Tensor,
        _output: &Tensor,
        mask: Option<&DropoutMask>,
    ) {
        let input_size = self.input_size();
        debug_assert_eq!(error_out.size(), self.output_size);
        debug_assert_eq!(error_in.size(), input_size);

        let weights = self.params.weights.as_slice();
        let errors_in = error_in.as_slice_mut();
        errors_in.fill(0.0);
        for (i, &error) in error_out.as_slice().iter().enumerate() {
            if mask.is_some_and(|m| !m[i]) {
                continue;
            }
            let row = &weights[i * input_size..(i + 1) * input_size];
            for (e, &w) in errors_in.iter_mut().zip(row) {
                *e += w * error;
            }
        }
    }

    fn update_weight_and_bias_errors(
        &self,
        delta: &Tensor,
        prev_activations: &Tensor,
        gradients: &mut Gradients,
        mask: Option<&DropoutMask>,
    ) {
        let input_size = self.input_size();
        debug_assert_eq!(prev_activations.size(), input_size);

        let activations = prev_activations.as_slice();
        let nabla_w = gradients.weights.as_slice_mut();
        let nabla_b = gradients.biases.as_slice_mut();
        for (i, &d) in delta.as_slice().iter().enumerate() {
            if mask.is_some_and(|m| !m[i]) {
                continue;
            }
            nabla_b[i] += d;
            let row = &mut nabla_w[i * input_size..(i + 1) * input_size];
            for (nw, &a) in row.iter_mut().zip(activations) {
                *nw += d * a;
            }
        }
    }

    fn parameters(&self) -> Option<&WeightsAndBiases> {
        Some(&self.params)
    }

    fn parameters_mut(&mut self) -> Option<&mut WeightsAndBiases> {
        Some(&mut self.params)
    }

    fn initialize_weights(&mut self, rng: &mut dyn RngCore) {
        if self.params.initialized {
            return;
        }
        let std_dev = 1.0 / (self.input_size() as f64).sqrt();
        self.params.weights.fill_normal(0.0, std_dev, rng);
        self.params.biases.fill_normal(0.0, std_dev, rng);
        self.params.initialized = true;
    }

    fn save(&self, writer: &mut dyn Write) -> io::Result<()> {
        writer.write_all(&[self.kind().tag()])?;
        ActivationFunction::save(self.activation.as_ref(), writer)?;
        writer.write_all(&self.keep_probability.to_le_bytes())?;
        self.params.weights.save(writer)?;
        self.params.biases.save(writer)
    }

    fn description(&self) -> String {
        let mut description = format!(
            "Fully Connected, input size: {}, output size: {}, activation: {}",
            self.input_size(),
            self.output_size,
            activation_description(self.activation.as_ref())
        );
        if self.keep_probability < 1.0 {
            description += &format!(
                ", dropout with probability {}",
                dropout_rate_text(self.keep_probability)
            );
        }
        description
    }

    fn architecture_row(&self) -> String {
        let dropout = if self.keep_probability < 1.0 {
            dropout_rate_text(self.keep_probability)
        } else {
            String::new()
        };
        format!(
            "Fully Connected,{},,,,,{},{}",
            self.output_size,
            dropout,
            activation_columns(self.activation.as_ref())
        )
    }
}
