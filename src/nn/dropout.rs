/*
 * @Author       : 老董
 * @Date         : 2024-03-02
 * @Description  : 全连接层输出的dropout掩码。每个训练样本重新采样一次，不做持久化。
 */

use std::ops::Index;

use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct DropoutMask {
    keep_probability: f64,
    kept: Vec<bool>,
}

impl DropoutMask {
    /// 创建含`size`个神经元的掩码，初始时全部保留
    pub fn new(keep_probability: f64, size: usize) -> Self {
        assert!(
            keep_probability > 0.0 && keep_probability <= 1.0,
            "保留概率须在(0, 1]内，当前为{keep_probability}"
        );
        Self {
            keep_probability,
            kept: vec![true; size],
        }
    }

    /// 用固定的保留/丢弃模式创建掩码（测试用）
    pub fn from_pattern(pattern: &[bool]) -> Self {
        let kept_count = pattern.iter().filter(|&&k| k).count();
        Self {
            keep_probability: kept_count as f64 / pattern.len().max(1) as f64,
            kept: pattern.to_vec(),
        }
    }

    /// 每个神经元独立地以`keep_probability`的概率被保留
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let p = self.keep_probability;
        for kept in self.kept.iter_mut() {
            *kept = rng.gen_bool(p);
        }
    }

    pub fn keep_probability(&self) -> f64 {
        self.keep_probability
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

impl Index<usize> for DropoutMask {
    type Output = bool;

    fn index(&self, index: usize) -> &bool {
        &self.kept[index]
    }
}
