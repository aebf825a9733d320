/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @Description  : 张量的乘法，实现了两个形状相同的张量“逐元素”相乘（Hadamard积），以及张量与纯数相乘。
 *                 注意：这里不是矩阵乘法。
 */

use ndarray::Zip;
use std::ops::{Mul, MulAssign};

use super::add::assert_same_shape;
use crate::errors::Operator;
use crate::tensor::Tensor;

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓张量 * 张量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Mul<&Tensor> for &Tensor {
    type Output = Tensor;

    fn mul(self, other: &Tensor) -> Tensor {
        let mut result = Tensor::zeros(self.shape());
        self.mul_into(other, &mut result);
        result
    }
}

impl Mul<&Tensor> for Tensor {
    type Output = Tensor;

    fn mul(mut self, other: &Tensor) -> Tensor {
        self *= other;
        self
    }
}

impl MulAssign<&Tensor> for Tensor {
    fn mul_assign(&mut self, other: &Tensor) {
        assert_same_shape(Operator::MulAssign, self, other);
        self.data *= &other.data;
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑张量 * 张量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓张量 * f64↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Mul<f64> for &Tensor {
    type Output = Tensor;

    fn mul(self, scalar: f64) -> Tensor {
        Tensor {
            data: &self.data * scalar,
        }
    }
}

impl MulAssign<f64> for Tensor {
    fn mul_assign(&mut self, scalar: f64) {
        self.data *= scalar;
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑张量 * f64↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

impl Tensor {
    /// `result = self * other`（逐元素），三者形状须一致
    pub fn mul_into(&self, other: &Tensor, result: &mut Tensor) {
        assert_same_shape(Operator::Mul, self, other);
        assert_same_shape(Operator::Mul, self, result);
        Zip::from(&mut result.data)
            .and(&self.data)
            .and(&other.data)
            .for_each(|r, &a, &b| *r = a * b);
    }
}
