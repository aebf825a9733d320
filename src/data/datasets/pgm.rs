//! PGM 灰度图像解码
//!
//! 支持文本（`P2`）与二进制（`P5`）两种格式，由`image`的PNM解码器解析；
//! 像素按`maxval`缩放到[0, 1]（`image`先把样本放大到满量程，这里再除以满量程）。

use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::data::DataError;
use crate::tensor::Tensor;

/// 读取一个PGM文件，返回形状为`[1, 1, 高, 宽]`的张量
pub fn load_pgm(path: &Path) -> Result<Tensor, DataError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::FileNotFound(path.to_path_buf()),
        _ => DataError::IoError(e),
    })?;
    parse_pgm(&bytes).map_err(|message| {
        DataError::FormatError(format!("{}: {message}", path.display()))
    })
}

/// 解析PGM文件的全部字节
pub(crate) fn parse_pgm(bytes: &[u8]) -> Result<Tensor, String> {
    // PNM还包括彩色与二值格式，这里只收灰度图
    let magic = bytes.get(..2).unwrap_or_default();
    if magic != b"P2" && magic != b"P5" {
        return Err(format!(
            "无法识别的magic number: {}",
            String::from_utf8_lossy(magic)
        ));
    }
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Pnm)
        .map_err(|e| e.to_string())?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    if width == 0 || height == 0 {
        return Err(format!("图像尺寸{width}x{height}不合法"));
    }

    let pixels = match image {
        DynamicImage::ImageLuma8(gray) => gray
            .into_raw()
            .into_iter()
            .map(|p| f64::from(p) / f64::from(u8::MAX))
            .collect(),
        other => other
            .into_luma16()
            .into_raw()
            .into_iter()
            .map(|p| f64::from(p) / f64::from(u16::MAX))
            .collect(),
    };
    Ok(Tensor::from_vec(pixels, [1, 1, height, width]))
}
