/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @Description  : 四维张量（超平面、平面、行、列），网络中所有计算的基本单元。
 *                 内部用ndarray的`Array4<f64>`存储，始终保持行优先的连续布局，
 *                 因此卷积等热点循环可以直接拿到扁平切片做偏移运算。
 */

use ndarray::Array4;
use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::errors::TensorError;

mod ops {
    pub mod add;
    pub mod mul;
    pub mod sub;
}

mod index;
mod print;
mod property;
mod save_load;
mod shape;

pub use property::TensorStatistics;


/// 定义张量的结构体。形状固定为4维：`[超平面数, 平面数, 行数, 列数]`，每一维都≥1。
/// 向量即形状为`[1, 1, 1, n]`的张量，矩阵为`[1, 1, rows, cols]`，多通道图像为`[1, c, rows, cols]`。
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Array4<f64>,
}

impl Tensor {
    /// 用扁平数据和形状创建张量，`data`的长度必须与`shape`中所有元素的乘积相等。
    pub fn new(data: &[f64], shape: [usize; 4]) -> Tensor {
        Tensor::from_vec(data.to_vec(), shape)
    }

    pub fn from_vec(data: Vec<f64>, shape: [usize; 4]) -> Tensor {
        assert!(
            shape.iter().all(|&d| d >= 1),
            "{}",
            TensorError::InvalidShape(shape)
        );
        let data_len = data.len();
        let data = Array4::from_shape_vec(shape, data).unwrap_or_else(|_| {
            panic!("{}", TensorError::DataLengthMismatch { data_len, shape })
        });
        Tensor { data }
    }

    /// 创建全零张量
    pub fn zeros(shape: [usize; 4]) -> Tensor {
        assert!(
            shape.iter().all(|&d| d >= 1),
            "{}",
            TensorError::InvalidShape(shape)
        );
        Tensor {
            data: Array4::zeros(shape),
        }
    }

    /// 创建形状为`[1, 1, 1, n]`的向量
    pub fn new_vector(data: &[f64]) -> Tensor {
        Tensor::new(data, [1, 1, 1, data.len()])
    }

    /// 创建形状为`[1, 1, rows, columns]`的矩阵
    pub fn new_matrix(data: &[f64], rows: usize, columns: usize) -> Tensor {
        Tensor::new(data, [1, 1, rows, columns])
    }

    /// 创建形状为`[1, planes, rows, columns]`的三维张量（如多通道图像）
    pub fn new_volume(data: &[f64], planes: usize, rows: usize, columns: usize) -> Tensor {
        Tensor::new(data, [1, planes, rows, columns])
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间
    pub fn new_random<R: Rng + ?Sized>(min: f64, max: f64, shape: [usize; 4], rng: &mut R) -> Tensor {
        let uniform = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| uniform.sample(rng))
            .collect::<Vec<_>>();
        Tensor::from_vec(data, shape)
    }

    /// 创建一个服从正态分布的随机张量
    pub fn new_normal<R: Rng + ?Sized>(mean: f64, std_dev: f64, shape: [usize; 4], rng: &mut R) -> Tensor {
        let mut tensor = Tensor::zeros(shape);
        tensor.fill_normal(mean, std_dev, rng);
        tensor
    }

    /// 用正态分布的随机数原地填充张量（Box-Muller变换）
    pub fn fill_normal<R: Rng + ?Sized>(&mut self, mean: f64, std_dev: f64, rng: &mut R) {
        let uniform = Uniform::new(f64::EPSILON, 1.0);
        let slice = self.as_slice_mut();
        let mut chunks = slice.chunks_exact_mut(2);
        for pair in &mut chunks {
            let (z0, z1) = box_muller(uniform.sample(rng), uniform.sample(rng));
            pair[0] = mean + std_dev * z0;
            pair[1] = mean + std_dev * z1;
        }
        if let [last] = chunks.into_remainder() {
            let (z0, _) = box_muller(uniform.sample(rng), uniform.sample(rng));
            *last = mean + std_dev * z0;
        }
    }

    /// 将所有元素置为`value`
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn set_all_to_zero(&mut self) {
        self.fill(0.0);
    }

    /// 按存储顺序（行优先）的只读扁平切片，供需要偏移运算的热点循环使用
    pub fn as_slice(&self) -> &[f64] {
        self.data
            .as_slice()
            .expect("张量内部始终为行优先的连续存储")
    }

    pub fn as_slice_mut(&mut self) -> &mut [f64] {
        self.data
            .as_slice_mut()
            .expect("张量内部始终为行优先的连续存储")
    }
}

fn box_muller(u1: f64, u2: f64) -> (f64, f64) {
    let radius = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    (radius * theta.cos(), radius * theta.sin())
}
