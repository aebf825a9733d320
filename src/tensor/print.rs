use std::fmt;

use super::Tensor;

/// 只打印形状，如`3x5x5`；为1的高维会被省略（但至少保留列数）
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = self.shape();
        let first = shape[..3].iter().position(|&d| d != 1).unwrap_or(3);
        let dims = shape[first..]
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", dims.join("x"))
    }
}
