//! CIFAR-10 数据集（二进制版本）
//!
//! 每条记录为 1 字节类别 + 3072 字节像素（R、G、B 三个 32x32 平面，行优先）。
//! 训练集为`data_batch_1.bin`到`data_batch_5.bin`，测试集为`test_batch.bin`，
//! 类别名来自`batches.meta.txt`（每行一个）。

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use tracing::info;

use crate::data::{DataError, Image, ImageSet};
use crate::tensor::Tensor;

/// 数据集名
pub const CIFAR10_NAME: &str = "cifar-10";

const CHANNELS: usize = 3;
const IMAGE_SIZE: usize = 32;
const PIXEL_COUNT: usize = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;
const TRAINING_BATCHES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_BATCH: &str = "test_batch.bin";
const META_FILE: &str = "batches.meta.txt";

/// 从`data_dir`载入CIFAR-10
pub fn load_cifar10(data_dir: &Path) -> Result<ImageSet, DataError> {
    let categories = read_categories(&data_dir.join(META_FILE))?;
    let mut image_set = ImageSet::new(CIFAR10_NAME, categories, CHANNELS, IMAGE_SIZE, IMAGE_SIZE);

    for batch in TRAINING_BATCHES {
        read_batch(&data_dir.join(batch), &mut image_set, false)?;
    }
    read_batch(&data_dir.join(TEST_BATCH), &mut image_set, true)?;

    info!(
        "已载入CIFAR-10：{}个训练样本，{}个测试样本",
        image_set.training.len(),
        image_set.test.len()
    );
    Ok(image_set)
}

fn read_categories(path: &Path) -> Result<Vec<String>, DataError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataError::FileNotFound(path.to_path_buf()),
        _ => DataError::IoError(e),
    })?;
    let categories: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if categories.is_empty() {
        return Err(DataError::FormatError(format!(
            "{}中没有任何类别名",
            path.display()
        )));
    }
    Ok(categories)
}

/// 读取一个批次文件中的全部记录
pub(crate) fn read_batch(
    path: &Path,
    image_set: &mut ImageSet,
    is_test: bool,
) -> Result<(), DataError> {
    let file = File::open(path).map_err(|_| DataError::FileNotFound(path.to_path_buf()))?;
    let mut reader = BufReader::new(file);
    let mut record = [0u8; 1 + PIXEL_COUNT];
    let mut index = 0usize;
    loop {
        // 在记录边界处读到文件末尾即为正常结束
        let mut label = [0u8; 1];
        match reader.read(&mut label) {
            Ok(0) => break,
            Ok(_) => record[0] = label[0],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
        reader.read_exact(&mut record[1..]).map_err(|e| {
            DataError::FormatError(format!(
                "{}的第{index}条记录不完整: {e}",
                path.display()
            ))
        })?;
        let pixels = record[1..].iter().map(|&p| f64::from(p) / 255.0).collect();
        let data = Tensor::from_vec(pixels, [1, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]);
        image_set.add_image(Image::new(data, record[0] as usize), is_test)?;
        index += 1;
    }
    Ok(())
}
