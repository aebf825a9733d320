/*
 * @Author       : 老董
 * @Date         : 2024-03-02
 * @Description  : 激活函数（ReLU、Leaky ReLU、Sigmoid、TanH）
 *
 * 带权重的层在前向传播时只输出原始激活值，由调用方再对其施加激活函数，
 * 这样原始值和变换后的值都可用于反向传播时的导数计算。
 * “无激活函数”用`Option<ActivationFunction>`的`None`表示。
 */

use std::fmt;
use std::io::{self, Read, Write};

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

/// 激活函数的持久化标签
const TAG_NONE: u8 = 0;
const TAG_RELU: u8 = 1;
const TAG_LEAKY_RELU: u8 = 2;
const TAG_SIGMOID: u8 = 3;
const TAG_TANH: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationFunction {
    ReLU,
    /// 泄露系数须在(0, 1)内
    LeakyReLU {
        leakiness: f64,
    },
    Sigmoid,
    TanH,
}

impl ActivationFunction {
    /// 对单个数施加激活函数
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        match *self {
            ActivationFunction::ReLU => {
                if x > 0.0 {
                    x
                } else {
                    0.0
                }
            }
            ActivationFunction::LeakyReLU { leakiness } => {
                if x >= 0.0 {
                    x
                } else {
                    x * leakiness
                }
            }
            ActivationFunction::Sigmoid => sigmoid(x),
            ActivationFunction::TanH => tanh(x),
        }
    }

    /// 激活函数在`x`（即输入，而非输出）处的导数
    #[inline]
    pub fn derivative(&self, x: f64) -> f64 {
        match *self {
            // x == 0 处的导数定义为0
            ActivationFunction::ReLU => {
                if x <= 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            ActivationFunction::LeakyReLU { leakiness } => {
                if x <= 0.0 {
                    leakiness
                } else {
                    1.0
                }
            }
            ActivationFunction::Sigmoid => {
                let s = sigmoid(x);
                s * (1.0 - s)
            }
            ActivationFunction::TanH => {
                let t = tanh(x);
                1.0 - t * t
            }
        }
    }

    /// 原地对张量的每个元素施加激活函数
    pub fn apply_in_place(&self, tensor: &mut Tensor) {
        for value in tensor.as_slice_mut() {
            *value = self.apply(*value);
        }
    }

    /// 将`input`每个元素处的导数写入`output`，两者形状须一致
    pub fn apply_derivative(&self, input: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
        if !input.dimensions_match(output) {
            return Err(TensorError::OperatorError {
                operator: Operator::Derivative,
                tensor1_shape: input.shape(),
                tensor2_shape: output.shape(),
            });
        }
        for (out, &x) in output.as_slice_mut().iter_mut().zip(input.as_slice()) {
            *out = self.derivative(x);
        }
        Ok(())
    }

    /// 简称（不含参数），用于架构统计表
    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::ReLU => "ReLU",
            ActivationFunction::LeakyReLU { .. } => "Leaky ReLU",
            ActivationFunction::Sigmoid => "Sigmoid",
            ActivationFunction::TanH => "TanH",
        }
    }

    pub fn leakiness(&self) -> Option<f64> {
        match *self {
            ActivationFunction::LeakyReLU { leakiness } => Some(leakiness),
            _ => None,
        }
    }

    /// 写入激活函数：1字节标签，Leaky ReLU另加8字节泄露系数
    pub fn save<W: Write + ?Sized>(activation: Option<&Self>, writer: &mut W) -> io::Result<()> {
        match activation {
            None => writer.write_all(&[TAG_NONE]),
            Some(ActivationFunction::ReLU) => writer.write_all(&[TAG_RELU]),
            Some(ActivationFunction::LeakyReLU { leakiness }) => {
                writer.write_all(&[TAG_LEAKY_RELU])?;
                writer.write_all(&leakiness.to_le_bytes())
            }
            Some(ActivationFunction::Sigmoid) => writer.write_all(&[TAG_SIGMOID]),
            Some(ActivationFunction::TanH) => writer.write_all(&[TAG_TANH]),
        }
    }

    pub fn load<R: Read + ?Sized>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag)?;
        match tag[0] {
            TAG_NONE => Ok(None),
            TAG_RELU => Ok(Some(ActivationFunction::ReLU)),
            TAG_LEAKY_RELU => {
                let mut raw = [0u8; 8];
                reader.read_exact(&mut raw)?;
                Ok(Some(ActivationFunction::LeakyReLU {
                    leakiness: f64::from_le_bytes(raw),
                }))
            }
            TAG_SIGMOID => Ok(Some(ActivationFunction::Sigmoid)),
            TAG_TANH => Ok(Some(ActivationFunction::TanH)),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("未知的激活函数标签: {other}"),
            )),
        }
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationFunction::ReLU => write!(f, "ReLU"),
            ActivationFunction::LeakyReLU { leakiness } => {
                write!(f, "Leaky ReLU, leakiness {leakiness}")
            }
            ActivationFunction::Sigmoid => write!(f, "Sigmoid"),
            ActivationFunction::TanH => write!(f, "TanH"),
        }
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
fn tanh(x: f64) -> f64 {
    2.0 / (1.0 + (-2.0 * x).exp()) - 1.0
}
