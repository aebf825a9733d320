/*
 * @Author       : 老董
 * @Date         : 2024-03-18
 * @Description  : 按数据集名载入图像集，并缓存已载入的图像集
 *
 * 多个训练任务可能使用同一个数据集，缓存避免重复解析；图像集载入后只读共享。
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use super::datasets::{
    CIFAR10_NAME, FACES_DIR, FaceClassification, MNIST_NAME, face_image_shape, load_cifar10,
    load_faces, load_mnist,
};
use super::{DataError, ImageSet};

/// 数据集的图像形状与类别数，无需载入数据即可得知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetInfo {
    pub channels: usize,
    pub rows: usize,
    pub columns: usize,
    pub category_count: usize,
}

#[derive(Debug)]
pub struct ImageSetLoader {
    data_dir: PathBuf,
    cache: HashMap<String, Arc<ImageSet>>,
}

impl ImageSetLoader {
    /// 支持的数据集名
    pub const DATASETS: [&'static str; 7] = [
        MNIST_NAME,
        CIFAR10_NAME,
        "emotions",
        "face-directions",
        "people",
        "sunglasses",
        "directions-sunglasses",
    ];
    /// 人脸图像默认不缩小
    pub const DEFAULT_FACE_SCALE: usize = 1;

    /// # 参数
    /// - `data_dir`: 数据根目录，每个数据集位于以数据集名命名的子目录中
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 数据集名是否受支持（不区分大小写）
    pub fn is_known(name: &str) -> bool {
        Self::DATASETS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(name))
    }

    /// 已知数据集的形状与类别数（人脸图像为原尺寸），未知的数据集返回`None`
    pub fn describe(name: &str) -> Option<DatasetInfo> {
        Self::describe_scaled(name, Self::DEFAULT_FACE_SCALE)
    }

    /// 同[`describe`](Self::describe)，人脸图像按`face_scale`（1、2或4）缩小；其余数据集忽略`face_scale`
    pub fn describe_scaled(name: &str, face_scale: usize) -> Option<DatasetInfo> {
        let key = name.to_ascii_lowercase();
        let (channels, rows, columns, category_count) = match key.as_str() {
            MNIST_NAME => (1, 28, 28, 10),
            CIFAR10_NAME => (3, 32, 32, 10),
            _ => {
                let classification = FaceClassification::from_name(&key)?;
                let (rows, columns) = face_image_shape(face_scale)?;
                (1, rows, columns, classification.categories().len())
            }
        };
        Some(DatasetInfo {
            channels,
            rows,
            columns,
            category_count,
        })
    }

    /// 载入（或从缓存取出）名为`name`的图像集，人脸图像为原尺寸
    pub fn load(&mut self, name: &str) -> Result<Arc<ImageSet>, DataError> {
        self.load_scaled(name, Self::DEFAULT_FACE_SCALE)
    }

    /// 载入（或从缓存取出）名为`name`的图像集，人脸图像按`face_scale`缩小
    pub fn load_scaled(&mut self, name: &str, face_scale: usize) -> Result<Arc<ImageSet>, DataError> {
        let name_key = name.to_ascii_lowercase();
        let face_classification = FaceClassification::from_name(&name_key);
        // 同一人脸数据集的不同尺寸分别缓存
        let key = match face_classification {
            Some(_) => format!("{name_key}@{face_scale}"),
            None => name_key.clone(),
        };
        if let Some(image_set) = self.cache.get(&key) {
            return Ok(Arc::clone(image_set));
        }

        let image_set = match face_classification {
            Some(classification) => {
                let dir = self.data_dir.join(FACES_DIR);
                info!("从{}载入人脸数据集{classification}", dir.display());
                load_faces(&dir, classification, face_scale)?
            }
            None if Self::is_known(&name_key) => {
                let dir = self.data_dir.join(&name_key);
                info!("从{}载入数据集{name_key}", dir.display());
                match name_key.as_str() {
                    MNIST_NAME => load_mnist(&dir)?,
                    _ => load_cifar10(&dir)?,
                }
            }
            None => return Err(DataError::UnknownDataset(name.to_string())),
        };
        let image_set = Arc::new(image_set);
        self.cache.insert(key, Arc::clone(&image_set));
        Ok(image_set)
    }
}
