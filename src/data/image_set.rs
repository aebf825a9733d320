/*
 * @Author       : 老董
 * @Date         : 2024-03-18
 * @Description  : 带类别标签的图像，以及由训练集、测试集和类别名组成的图像集
 */

use super::DataError;
use crate::tensor::Tensor;

/// 一张带类别的图像，`data`形状为`[1, 通道, 行, 列]`，像素已缩放到[0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub data: Tensor,
    pub category: usize,
}

impl Image {
    pub fn new(data: Tensor, category: usize) -> Self {
        Self { data, category }
    }
}

#[derive(Debug, Clone)]
pub struct ImageSet {
    pub name: String,
    pub categories: Vec<String>,
    pub channels: usize,
    pub rows: usize,
    pub columns: usize,
    pub training: Vec<Image>,
    pub test: Vec<Image>,
    /// `targets[c]`为类别`c`的one-hot目标向量（对应类别的神经元为1，其余为0）
    pub targets: Vec<Tensor>,
}

impl ImageSet {
    /// 创建空的图像集并生成每个类别的one-hot目标
    pub fn new(
        name: impl Into<String>,
        categories: Vec<String>,
        channels: usize,
        rows: usize,
        columns: usize,
    ) -> Self {
        let count = categories.len();
        let targets = (0..count)
            .map(|category| {
                let mut target = Tensor::zeros([1, 1, 1, count]);
                target[category] = 1.0;
                target
            })
            .collect();
        Self {
            name: name.into(),
            categories,
            channels,
            rows,
            columns,
            training: Vec::new(),
            test: Vec::new(),
            targets,
        }
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// 单张图像的张量形状
    pub fn image_shape(&self) -> [usize; 4] {
        [1, self.channels, self.rows, self.columns]
    }

    /// 加入一张图像，`is_test`决定放入测试集还是训练集
    pub fn add_image(&mut self, image: Image, is_test: bool) -> Result<(), DataError> {
        if image.category >= self.categories.len() {
            return Err(DataError::InvalidCategory {
                category: image.category,
                count: self.categories.len(),
            });
        }
        if image.data.shape() != self.image_shape() {
            return Err(DataError::ShapeMismatch {
                expected: self.image_shape(),
                got: image.data.shape(),
            });
        }
        if is_test {
            self.test.push(image);
        } else {
            self.training.push(image);
        }
        Ok(())
    }
}
