/*
 * @Author       : 老董
 * @Date         : 2024-03-02
 * @Description  : 代价函数。目前只有交叉熵，输出层须为Sigmoid，此时对激活值的导数恰好化简为`actual - target`。
 */

use std::fmt;
use std::io::{self, Read, Write};

use crate::tensor::Tensor;

const TAG_CROSS_ENTROPY: u8 = 1;

/// 激活值与1的距离小于该值时，`ln(1 - actual)`一项按0计
const CLAMP_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostFunction {
    #[default]
    CrossEntropy,
}

impl CostFunction {
    /// 单个样本的总代价
    pub fn total_cost(&self, actual: &Tensor, target: &Tensor) -> f64 {
        debug_assert!(actual.dimensions_match(target));
        match self {
            CostFunction::CrossEntropy => actual
                .as_slice()
                .iter()
                .zip(target.as_slice())
                .map(|(&a, &t)| cross_entropy_term(a, t))
                .sum(),
        }
    }

    /// 代价对输出层激活值的导数，写入`output`
    pub fn calculate_derivatives(&self, actual: &Tensor, target: &Tensor, output: &mut Tensor) {
        match self {
            CostFunction::CrossEntropy => actual.sub_into(target, output),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            CostFunction::CrossEntropy => TAG_CROSS_ENTROPY,
        }
    }

    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[self.tag()])
    }

    pub fn load<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag)?;
        match tag[0] {
            TAG_CROSS_ENTROPY => Ok(CostFunction::CrossEntropy),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("未知的代价函数标签: {other}"),
            )),
        }
    }
}

fn cross_entropy_term(actual: f64, target: f64) -> f64 {
    if actual >= 1.0 - CLAMP_EPSILON {
        return 0.0;
    }
    // 0·ln0 按0计
    let mut term = 0.0;
    if target != 0.0 {
        term -= target * actual.ln();
    }
    if target != 1.0 {
        term -= (1.0 - target) * (1.0 - actual).ln();
    }
    term
}

impl fmt::Display for CostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostFunction::CrossEntropy => write!(f, "Cross Entropy"),
        }
    }
}
