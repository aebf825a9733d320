/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @Description  : 张量的加法，实现了两个形状相同的张量“逐元素”相加的运算。
 *                 提供三种形式：返回新张量（`+`）、原地相加（`+=`）、写入预先分配好的结果张量（`add_into`）。
 *                 形状不一致属于编程错误，会直接panic。
 */

use ndarray::Zip;
use std::ops::{Add, AddAssign};

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 + 带引用的张量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Add<&Tensor> for &Tensor {
    type Output = Tensor;

    fn add(self, other: &Tensor) -> Tensor {
        let mut result = Tensor::zeros(self.shape());
        self.add_into(other, &mut result);
        result
    }
}

impl Add<&Tensor> for Tensor {
    type Output = Tensor;

    fn add(mut self, other: &Tensor) -> Tensor {
        self += other;
        self
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 + 带引用的张量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

impl AddAssign<&Tensor> for Tensor {
    fn add_assign(&mut self, other: &Tensor) {
        assert_same_shape(Operator::AddAssign, self, other);
        self.data += &other.data;
    }
}

impl Tensor {
    /// `result = self + other`，三者形状须一致
    pub fn add_into(&self, other: &Tensor, result: &mut Tensor) {
        assert_same_shape(Operator::Add, self, other);
        assert_same_shape(Operator::Add, self, result);
        Zip::from(&mut result.data)
            .and(&self.data)
            .and(&other.data)
            .for_each(|r, &a, &b| *r = a + b);
    }
}

pub(in crate::tensor) fn assert_same_shape(operator: Operator, a: &Tensor, b: &Tensor) {
    debug_assert!(
        a.dimensions_match(b),
        "{}",
        TensorError::OperatorError {
            operator,
            tensor1_shape: a.shape(),
            tensor2_shape: b.shape(),
        }
    );
}
