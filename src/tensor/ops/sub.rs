/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @Description  : 张量的减法，实现了两个形状相同的张量“逐元素”相减的运算。
 *                 输出层误差`actual - target`即由此得到。
 */

use ndarray::Zip;
use std::ops::{Sub, SubAssign};

use super::add::assert_same_shape;
use crate::errors::Operator;
use crate::tensor::Tensor;

impl Sub<&Tensor> for &Tensor {
    type Output = Tensor;

    fn sub(self, other: &Tensor) -> Tensor {
        let mut result = Tensor::zeros(self.shape());
        self.sub_into(other, &mut result);
        result
    }
}

impl Sub<&Tensor> for Tensor {
    type Output = Tensor;

    fn sub(mut self, other: &Tensor) -> Tensor {
        self -= other;
        self
    }
}

impl SubAssign<&Tensor> for Tensor {
    fn sub_assign(&mut self, other: &Tensor) {
        assert_same_shape(Operator::SubAssign, self, other);
        self.data -= &other.data;
    }
}

impl Tensor {
    /// `result = self - other`，三者形状须一致
    pub fn sub_into(&self, other: &Tensor, result: &mut Tensor) {
        assert_same_shape(Operator::Sub, self, other);
        assert_same_shape(Operator::Sub, self, result);
        Zip::from(&mut result.data)
            .and(&self.data)
            .and(&other.data)
            .for_each(|r, &a, &b| *r = a - b);
    }

    /// `self -= other * scalar`，权重更新用
    pub fn sub_scaled(&mut self, other: &Tensor, scalar: f64) {
        assert_same_shape(Operator::SubAssign, self, other);
        self.data.scaled_add(-scalar, &other.data);
    }
}
