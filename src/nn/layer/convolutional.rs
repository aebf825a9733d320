/*
 * @Author       : 老董
 * @Date         : 2024-03-09
 * @Description  : 卷积层（二维互相关，不翻转卷积核），支持步长与零填充
 *
 * 权重形状为`[滤波器数, 输入通道数, 核大小, 核大小]`，偏置形状为`[1, 1, 1, 滤波器数]`。
 * 输出边长 = (输入边长 + 2·填充 - 核大小) / 步长 + 1（向下取整）。
 *
 * 零填充区域既不参与前向求和，也不接收反向传播的误差和梯度。
 * 为此在构造时为核的每一行、每一列预先算好“有效区间”（`FilterSpan`）：
 * 核偏移为`k`时，哪些输出位置对应的输入位置落在图像内部。
 * 无填充时前向传播走单独的、更紧凑的循环。
 */

use std::io::{self, Write};

use rand::RngCore;

use super::weights::{Gradients, WeightsAndBiases};
use super::{
    LayerKind, Shape3, TraitLayer, WeightMode, activation_columns, activation_description,
};
use crate::nn::NetworkError;
use crate::nn::activation::ActivationFunction;
use crate::nn::dropout::DropoutMask;
use crate::tensor::Tensor;

/// 核在某一轴上偏移为`k`时的有效区间：
/// 第`n`个有效输出位置为`output_start + n`，对应的输入位置为`input_start + n·stride`
#[derive(Debug, Clone, Copy, PartialEq)]
struct FilterSpan {
    input_start: usize,
    output_start: usize,
    output_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionalLayer {
    input_shape: Shape3,
    output_shape: Shape3,
    filter_size: usize,
    stride: usize,
    padding: usize,
    activation: Option<ActivationFunction>,
    params: WeightsAndBiases,
    row_spans: Vec<FilterSpan>,
    column_spans: Vec<FilterSpan>,
}

impl ConvolutionalLayer {
    /// 创建参数尚未初始化的卷积层
    ///
    /// # 参数
    /// - `input_shape`: 输入的通道数与尺寸
    /// - `filter_count`: 滤波器（输出通道）个数
    /// - `filter_size`: 正方形卷积核的边长，不能超过输入尺寸
    /// - `stride`: 步长，须≥1
    /// - `padding`: 零填充宽度，须小于`filter_size`
    /// - `activation`: 激活函数，`None`表示不使用
    pub fn new(
        input_shape: Shape3,
        filter_count: usize,
        filter_size: usize,
        stride: usize,
        padding: usize,
        activation: Option<ActivationFunction>,
    ) -> Result<Self, NetworkError> {
        if filter_count == 0 {
            return Err(NetworkError::InvalidParameter(
                "卷积层的滤波器个数须≥1".to_string(),
            ));
        }
        let params = WeightsAndBiases::zeros(
            [filter_count, input_shape.planes, filter_size, filter_size],
            filter_count,
        );
        Self::build(input_shape, filter_size, stride, padding, activation, params)
    }

    /// 用已有的权重和偏置创建卷积层（从文件载入或测试时使用）
    pub fn with_parameters(
        input_shape: Shape3,
        weights: Tensor,
        biases: Tensor,
        stride: usize,
        padding: usize,
        activation: Option<ActivationFunction>,
    ) -> Result<Self, NetworkError> {
        let [filter_count, channels, filter_rows, filter_columns] = weights.shape();
        if filter_rows != filter_columns {
            return Err(NetworkError::Format(format!(
                "卷积核的宽（{filter_columns}）与高（{filter_rows}）须相等"
            )));
        }
        if channels != input_shape.planes {
            return Err(NetworkError::Format(format!(
                "卷积核有{channels}个通道，但输入有{}个通道",
                input_shape.planes
            )));
        }
        if biases.size() != filter_count {
            return Err(NetworkError::Format(format!(
                "卷积层有{filter_count}个滤波器，但偏置有{}个",
                biases.size()
            )));
        }
        let biases = Tensor::from_vec(biases.as_slice().to_vec(), [1, 1, 1, filter_count]);
        let params = WeightsAndBiases::loaded(weights, biases);
        Self::build(input_shape, filter_rows, stride, padding, activation, params)
    }

    fn build(
        input_shape: Shape3,
        filter_size: usize,
        stride: usize,
        padding: usize,
        activation: Option<ActivationFunction>,
        params: WeightsAndBiases,
    ) -> Result<Self, NetworkError> {
        if filter_size == 0 || stride == 0 {
            return Err(NetworkError::InvalidParameter(
                "卷积核大小与步长都须≥1".to_string(),
            ));
        }
        if padding >= filter_size {
            return Err(NetworkError::InvalidParameter(format!(
                "零填充（{padding}）须小于卷积核大小（{filter_size}）"
            )));
        }
        if filter_size > input_shape.rows || filter_size > input_shape.columns {
            return Err(NetworkError::InvalidParameter(format!(
                "卷积核大小（{filter_size}）不能超过输入尺寸（{}x{}）",
                input_shape.rows, input_shape.columns
            )));
        }

        let output_rows = (input_shape.rows + 2 * padding - filter_size) / stride + 1;
        let output_columns = (input_shape.columns + 2 * padding - filter_size) / stride + 1;
        let filter_count = params.weights.hyperplanes();
        Ok(Self {
            input_shape,
            output_shape: Shape3::new(filter_count, output_rows, output_columns),
            filter_size,
            stride,
            padding,
            activation,
            params,
            row_spans: filter_spans(filter_size, stride, padding, input_shape.rows, output_rows),
            column_spans: filter_spans(
                filter_size,
                stride,
                padding,
                input_shape.columns,
                output_columns,
            ),
        })
    }

    pub fn filter_count(&self) -> usize {
        self.output_shape.planes
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    /// 无填充时的前向传播：逐个输出位置直接在感受野上求和
    fn feed_forward_unpadded(&self, input: &[f64], output: &mut [f64]) {
        let Shape3 {
            planes: channels,
            rows: input_rows,
            columns: input_columns,
        } = self.input_shape;
        let Shape3 {
            planes: filter_count,
            rows: output_rows,
            columns: output_columns,
        } = self.output_shape;
        let size = self.filter_size;
        let weights = self.params.weights.as_slice();
        let biases = self.params.biases.as_slice();

        for f in 0..filter_count {
            for out_row in 0..output_rows {
                for out_col in 0..output_columns {
                    let mut sum = biases[f];
                    for c in 0..channels {
                        let weight_base = (f * channels + c) * size * size;
                        let input_base = c * input_rows * input_columns;
                        for kr in 0..size {
                            let in_start = input_base
                                + (out_row * self.stride + kr) * input_columns
                                + out_col * self.stride;
                            let in_row = &input[in_start..in_start + size];
                            let w_row = &weights[weight_base + kr * size..weight_base + (kr + 1) * size];
                            sum += in_row.iter().zip(w_row).map(|(&x, &w)| x * w).sum::<f64>();
                        }
                    }
                    output[(f * output_rows + out_row) * output_columns + out_col] = sum;
                }
            }
        }
    }

    /// 按有效区间遍历“(滤波器, 通道, 核行, 核列) × 有效输出位置”，
    /// 对每一对输入/输出偏移调用`visit(权重下标, 输入下标, 输出下标)`
    #[inline]
    fn for_each_connection(&self, mut visit: impl FnMut(usize, usize, usize)) {
        let Shape3 {
            planes: channels,
            rows: input_rows,
            columns: input_columns,
        } = self.input_shape;
        let Shape3 {
            planes: filter_count,
            rows: output_rows,
            columns: output_columns,
        } = self.output_shape;
        let size = self.filter_size;

        for f in 0..filter_count {
            for c in 0..channels {
                for (kr, row_span) in self.row_spans.iter().enumerate() {
                    for (kc, column_span) in self.column_spans.iter().enumerate() {
                        let weight_index = ((f * channels + c) * size + kr) * size + kc;
                        for n in 0..row_span.output_count {
                            let out_base = (f * output_rows + row_span.output_start + n)
                                * output_columns
                                + column_span.output_start;
                            let in_base = (c * input_rows + row_span.input_start + n * self.stride)
                                * input_columns
                                + column_span.input_start;
                            for m in 0..column_span.output_count {
                                visit(weight_index, in_base + m * self.stride, out_base + m);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// 计算核在某一轴上每个偏移的有效区间
fn filter_spans(
    filter_size: usize,
    stride: usize,
    padding: usize,
    input_extent: usize,
    output_extent: usize,
) -> Vec<FilterSpan> {
    (0..filter_size)
        .map(|k| {
            // 输入位置 = 输出位置·stride + k - padding，须落在[0, input_extent)内
            let output_start = if padding > k {
                (padding - k).div_ceil(stride)
            } else {
                0
            };
            let input_start = (output_start * stride + k).saturating_sub(padding);
            let output_end = ((input_extent - 1 + padding - k) / stride + 1).min(output_extent);
            FilterSpan {
                input_start,
                output_start,
                output_count: output_end.saturating_sub(output_start),
            }
        })
        .collect()
}

impl TraitLayer for ConvolutionalLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Convolutional
    }

    fn input_shape(&self) -> Shape3 {
        self.input_shape
    }

    fn output_shape(&self) -> Shape3 {
        self.output_shape
    }

    fn activation(&self) -> Option<&ActivationFunction> {
        self.activation.as_ref()
    }

    fn feed_forward(
        &self,
        input: &Tensor,
        output: &mut Tensor,
        _mask: Option<&DropoutMask>,
        _mode: WeightMode,
    ) {
        debug_assert_eq!(input.size(), self.input_shape.size());
        debug_assert_eq!(output.size(), self.output_shape.size());

        if self.padding == 0 {
            self.feed_forward_unpadded(input.as_slice(), output.as_slice_mut());
            return;
        }

        let weights = self.params.weights.as_slice();
        let inputs = input.as_slice();
        let outputs = output.as_slice_mut();
        let plane_size = self.output_shape.rows * self.output_shape.columns;
        for (plane, &bias) in outputs
            .chunks_exact_mut(plane_size)
            .zip(self.params.biases.as_slice())
        {
            plane.fill(bias);
        }
        self.for_each_connection(|w, i, o| outputs[o] += weights[w] * inputs[i]);
    }

    fn backpropagate_error(
        &self,
        error_out: &Tensor,
        error_in: &mut Tensor,
        _input: &Tensor,
        _output: &Tensor,
        _mask: Option<&DropoutMask>,
    ) {
        debug_assert_eq!(error_out.size(), self.output_shape.size());
        debug_assert_eq!(error_in.size(), self.input_shape.size());

        let weights = self.params.weights.as_slice();
        let errors_out = error_out.as_slice();
        let errors_in = error_in.as_slice_mut();
        errors_in.fill(0.0);
        self.for_each_connection(|w, i, o| errors_in[i] += weights[w] * errors_out[o]);
    }

    fn update_weight_and_bias_errors(
        &self,
        delta: &Tensor,
        prev_activations: &Tensor,
        gradients: &mut Gradients,
        _mask: Option<&DropoutMask>,
    ) {
        debug_assert_eq!(delta.size(), self.output_shape.size());
        debug_assert_eq!(prev_activations.size(), self.input_shape.size());

        let deltas = delta.as_slice();
        let activations = prev_activations.as_slice();
        let nabla_w = gradients.weights.as_slice_mut();
        self.for_each_connection(|w, i, o| nabla_w[w] += deltas[o] * activations[i]);

        let plane_size = self.output_shape.rows * self.output_shape.columns;
        for (nabla_b, plane) in gradients
            .biases
            .as_slice_mut()
            .iter_mut()
            .zip(deltas.chunks_exact(plane_size))
        {
            *nabla_b += plane.iter().sum::<f64>();
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
        let fan_in = (self.filter_size * self.filter_size * self.input_shape.planes) as f64;
        self.params.weights.fill_normal(0.0, 2.0 / fan_in.sqrt(), rng);
        // 偏置从0开始
        self.params.biases.set_all_to_zero();
        self.params.initialized = true;
    }

    fn save(&self, writer: &mut dyn Write) -> io::Result<()> {
        writer.write_all(&[self.kind().tag()])?;
        ActivationFunction::save(self.activation.as_ref(), writer)?;
        writer.write_all(&(self.stride as u32).to_le_bytes())?;
        writer.write_all(&(self.padding as u32).to_le_bytes())?;
        self.params.weights.save(writer)?;
        self.params.biases.save(writer)
    }

    fn description(&self) -> String {
        let mut description = format!(
            "Convolutional, {} filters, input dimensions: {}, filter size: {}x{}, stride: {}",
            self.filter_count(),
            self.input_shape,
            self.filter_size,
            self.filter_size,
            self.stride
        );
        if self.padding != 0 {
            description += &format!(", zero padding: {}", self.padding);
        }
        description += &format!(
            ", activation: {}",
            activation_description(self.activation.as_ref())
        );
        description
    }

    fn architecture_row(&self) -> String {
        format!(
            "Convolutional,,{},{},{},{},,{}",
            self.filter_count(),
            self.filter_size,
            self.stride,
            self.padding,
            activation_columns(self.activation.as_ref())
        )
    }
}
