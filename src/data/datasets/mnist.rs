//! MNIST 手写数字数据集
//!
//! 支持：
//! - IDX 二进制格式解析（支持 .gz 压缩）
//! - 像素归一化 (0-255 → 0-1)
//!
//! 包含 60,000 个训练样本和 10,000 个测试样本，每个样本是 28x28 的灰度图像，类别为 0-9。

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::info;

use crate::data::{DataError, Image, ImageSet};
use crate::tensor::Tensor;

/// 数据集名
pub const MNIST_NAME: &str = "mnist";

const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;
const IMAGE_SIZE: usize = 28;
const CATEGORY_COUNT: usize = 10;

/// 从`data_dir`载入MNIST，文件可以是解压后的IDX文件，也可以是同名的`.gz`
///
/// # 参数
/// - `data_dir`: 存放4个IDX文件的目录
pub fn load_mnist(data_dir: &Path) -> Result<ImageSet, DataError> {
    let categories = (0..CATEGORY_COUNT).map(|c| c.to_string()).collect();
    let mut image_set = ImageSet::new(MNIST_NAME, categories, 1, IMAGE_SIZE, IMAGE_SIZE);

    for (images_file, labels_file, is_test) in [
        ("train-images-idx3-ubyte", "train-labels-idx1-ubyte", false),
        ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte", true),
    ] {
        let images = parse_idx_images(&find_file(data_dir, images_file)?)?;
        let labels = parse_idx_labels(&find_file(data_dir, labels_file)?)?;
        if images.len() != labels.len() {
            return Err(DataError::FormatError(format!(
                "{images_file}有{}张图像，但{labels_file}有{}个标签",
                images.len(),
                labels.len()
            )));
        }
        for (pixels, label) in images.into_iter().zip(labels) {
            let data = Tensor::from_vec(pixels, [1, 1, IMAGE_SIZE, IMAGE_SIZE]);
            image_set.add_image(Image::new(data, label as usize), is_test)?;
        }
    }

    info!(
        "已载入MNIST：{}个训练样本，{}个测试样本",
        image_set.training.len(),
        image_set.test.len()
    );
    Ok(image_set)
}

/// 优先使用解压后的文件，其次是`.gz`文件
fn find_file(data_dir: &Path, base_name: &str) -> Result<PathBuf, DataError> {
    let uncompressed_path = data_dir.join(base_name);
    if uncompressed_path.exists() {
        return Ok(uncompressed_path);
    }
    let gz_path = data_dir.join(format!("{base_name}.gz"));
    if gz_path.exists() {
        return Ok(gz_path);
    }
    Err(DataError::FileNotFound(uncompressed_path))
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>, DataError> {
    let file = File::open(path).map_err(|_| DataError::FileNotFound(path.to_path_buf()))?;
    Ok(if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

fn read_be_u32(reader: &mut dyn Read) -> Result<u32, DataError> {
    let mut raw = [0u8; 4];
    reader
        .read_exact(&mut raw)
        .map_err(|e| DataError::FormatError(format!("读取头部失败: {e}")))?;
    Ok(u32::from_be_bytes(raw))
}

/// 解析 IDX 图像文件，返回每张图像归一化后的像素
///
/// IDX 格式：
/// - [0-3] magic number (0x00000803 = 2051)
/// - [4-7] number of images
/// - [8-11] number of rows
/// - [12-15] number of columns
/// - [16+] pixel data (unsigned byte)
pub(crate) fn parse_idx_images(path: &Path) -> Result<Vec<Vec<f64>>, DataError> {
    let mut reader = open_reader(path)?;

    // 头部为大端序
    let magic = read_be_u32(&mut reader)?;
    if magic != IMAGE_MAGIC {
        return Err(DataError::FormatError(format!(
            "无效的 magic number: {magic} (期望 {IMAGE_MAGIC})"
        )));
    }
    let num_images = read_be_u32(&mut reader)? as usize;
    let num_rows = read_be_u32(&mut reader)? as usize;
    let num_cols = read_be_u32(&mut reader)? as usize;
    if num_rows != IMAGE_SIZE || num_cols != IMAGE_SIZE {
        return Err(DataError::FormatError(format!(
            "无效的图像尺寸: {num_rows}x{num_cols} (期望 28x28)"
        )));
    }

    let mut pixels = vec![0u8; IMAGE_SIZE * IMAGE_SIZE];
    let mut images = Vec::with_capacity(num_images);
    for i in 0..num_images {
        reader
            .read_exact(&mut pixels)
            .map_err(|e| DataError::FormatError(format!("读取第{i}张图像的像素失败: {e}")))?;
        images.push(pixels.iter().map(|&p| f64::from(p) / 255.0).collect());
    }
    Ok(images)
}

/// 解析 IDX 标签文件
///
/// IDX 格式：
/// - [0-3] magic number (0x00000801 = 2049)
/// - [4-7] number of labels
/// - [8+] label data (unsigned byte, 0-9)
pub(crate) fn parse_idx_labels(path: &Path) -> Result<Vec<u8>, DataError> {
    let mut reader = open_reader(path)?;

    let magic = read_be_u32(&mut reader)?;
    if magic != LABEL_MAGIC {
        return Err(DataError::FormatError(format!(
            "无效的 magic number: {magic} (期望 {LABEL_MAGIC})"
        )));
    }
    let num_labels = read_be_u32(&mut reader)? as usize;

    let mut labels = vec![0u8; num_labels];
    reader
        .read_exact(&mut labels)
        .map_err(|e| DataError::FormatError(format!("读取标签数据失败: {e}")))?;
    if let Some(&bad) = labels.iter().find(|&&label| label as usize >= CATEGORY_COUNT) {
        return Err(DataError::FormatError(format!(
            "无效的标签: {bad} (期望 0-9)"
        )));
    }
    Ok(labels)
}
