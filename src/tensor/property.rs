/*
 * @Author       : 老董
 * @Date         : 2024-03-14
 * @Description  : 张量的只读属性与统计量，不含任何运算
 */

use super::Tensor;

/// 张量所有元素的简单统计量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TensorStatistics {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
}

impl Tensor {
    /// 最大值、最小值与平均值
    pub fn statistics(&self) -> TensorStatistics {
        let slice = self.as_slice();
        let (max, min, sum) = slice.iter().fold(
            (f64::NEG_INFINITY, f64::INFINITY, 0.0),
            |(max, min, sum), &v| (max.max(v), min.min(v), sum + v),
        );
        TensorStatistics {
            max,
            min,
            mean: sum / slice.len() as f64,
        }
    }
}
