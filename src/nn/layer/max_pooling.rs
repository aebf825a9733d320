/*
 * @Author       : 老董
 * @Date         : 2024-03-09
 * @Description  : 2x2最大池化层（步长2，无填充，无参数）
 *
 * 反向传播时，误差会被送到所有激活值恰好等于该块最大值的输入位置（若有并列，则并列的位置都会收到误差）。
 */

use std::io::{self, Write};

use super::{LayerKind, Shape3, TraitLayer, WeightMode};
use crate::nn::NetworkError;
use crate::nn::dropout::DropoutMask;
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq)]
pub struct MaxPoolingLayer {
    input_shape: Shape3,
}

impl MaxPoolingLayer {
    pub fn new(input_shape: Shape3) -> Result<Self, NetworkError> {
        if input_shape.rows % 2 != 0 || input_shape.columns % 2 != 0 {
            return Err(NetworkError::InvalidParameter(format!(
                "最大池化层的输入尺寸须能被2整除，当前为{input_shape}"
            )));
        }
        Ok(Self { input_shape })
    }
}

impl TraitLayer for MaxPoolingLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::MaxPooling
    }

    fn input_shape(&self) -> Shape3 {
        self.input_shape
    }

    fn output_shape(&self) -> Shape3 {
        Shape3::new(
            self.input_shape.planes,
            self.input_shape.rows / 2,
            self.input_shape.columns / 2,
        )
    }

    fn feed_forward(
        &self,
        input: &Tensor,
        output: &mut Tensor,
        _mask: Option<&DropoutMask>,
        _mode: WeightMode,
    ) {
        debug_assert_eq!(input.size(), self.input_shape.size());
        let output_shape = self.output_shape();
        debug_assert_eq!(output.size(), output_shape.size());

        let input_columns = self.input_shape.columns;
        let inputs = input.as_slice();
        let outputs = output.as_slice_mut();
        for p in 0..output_shape.planes {
            for r in 0..output_shape.rows {
                let top = (p * self.input_shape.rows + 2 * r) * input_columns;
                let bottom = top + input_columns;
                for c in 0..output_shape.columns {
                    let left = 2 * c;
                    outputs[(p * output_shape.rows + r) * output_shape.columns + c] = inputs[top + left]
                        .max(inputs[top + left + 1])
                        .max(inputs[bottom + left])
                        .max(inputs[bottom + left + 1]);
                }
            }
        }
    }

    fn backpropagate_error(
        &self,
        error_out: &Tensor,
        error_in: &mut Tensor,
        input: &Tensor,
        output: &Tensor,
        _mask: Option<&DropoutMask>,
    ) {
        let output_shape = self.output_shape();
        debug_assert_eq!(error_out.size(), output_shape.size());
        debug_assert_eq!(output.size(), output_shape.size());
        debug_assert_eq!(error_in.size(), self.input_shape.size());
        debug_assert_eq!(input.size(), self.input_shape.size());

        let input_columns = self.input_shape.columns;
        let inputs = input.as_slice();
        let outputs = output.as_slice();
        let errors_out = error_out.as_slice();
        let errors_in = error_in.as_slice_mut();
        for p in 0..output_shape.planes {
            for r in 0..output_shape.rows {
                let top = (p * self.input_shape.rows + 2 * r) * input_columns;
                for c in 0..output_shape.columns {
                    let pooled_index = (p * output_shape.rows + r) * output_shape.columns + c;
                    let pooled = outputs[pooled_index];
                    let error = errors_out[pooled_index];
                    for row_start in [top, top + input_columns] {
                        for i in row_start + 2 * c..row_start + 2 * c + 2 {
                            errors_in[i] = if inputs[i] == pooled { error } else { 0.0 };
                        }
                    }
                }
            }
        }
    }

    fn save(&self, writer: &mut dyn Write) -> io::Result<()> {
        writer.write_all(&[self.kind().tag()])
    }

    fn description(&self) -> String {
        format!("Max pooling 2 by 2, input dimensions: {}", self.input_shape)
    }

    fn architecture_row(&self) -> String {
        "Max pooling,,,,,,,,".to_string()
    }
}
