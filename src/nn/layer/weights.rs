/*
 * @Author       : 老董
 * @Date         : 2024-03-16
 * @Description  : 带权重的层（全连接、卷积）共用的权重、偏置及其梯度
 */

use crate::tensor::{Tensor, TensorStatistics};

/// 带权重的层（全连接、卷积）的可训练参数
#[derive(Debug, Clone, PartialEq)]
pub struct WeightsAndBiases {
    pub(crate) weights: Tensor,
    pub(crate) biases: Tensor,
    /// 是否已被随机初始化或从文件载入
    pub(crate) initialized: bool,
}

/// 单个工作线程对某个带权重层累积的梯度（nablaW、nablaB），形状与参数一致
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub weights: Tensor,
    pub biases: Tensor,
}

impl WeightsAndBiases {
    pub(crate) fn zeros(weight_shape: [usize; 4], bias_count: usize) -> Self {
        Self {
            weights: Tensor::zeros(weight_shape),
            biases: Tensor::zeros([1, 1, 1, bias_count]),
            initialized: false,
        }
    }

    pub(crate) fn loaded(weights: Tensor, biases: Tensor) -> Self {
        Self {
            weights,
            biases,
            initialized: true,
        }
    }

    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    pub fn biases(&self) -> &Tensor {
        &self.biases
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// `w -= nablaW * scalar`，`b -= nablaB * scalar`
    pub fn update_weights_and_biases(&mut self, nabla_w: &Tensor, nabla_b: &Tensor, scalar: f64) {
        self.weights.sub_scaled(nabla_w, scalar);
        self.biases.sub_scaled(nabla_b, scalar);
    }

    /// 权重衰减：`w *= factor`（偏置不衰减）
    pub fn decay_weights(&mut self, factor: f64) {
        self.weights *= factor;
    }

    pub fn weight_statistics(&self) -> TensorStatistics {
        self.weights.statistics()
    }

    pub fn bias_statistics(&self) -> TensorStatistics {
        self.biases.statistics()
    }

    /// 与参数同形状的全零梯度
    pub fn zero_gradients(&self) -> Gradients {
        Gradients {
            weights: Tensor::zeros(self.weights.shape()),
            biases: Tensor::zeros(self.biases.shape()),
        }
    }
}

impl Gradients {
    pub fn set_all_to_zero(&mut self) {
        self.weights.set_all_to_zero();
        self.biases.set_all_to_zero();
    }
}
