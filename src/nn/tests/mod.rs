mod activation;
mod convolutional;
mod dropout;
mod fully_connected;
mod max_pooling;
mod train;

use crate::data::{Image, ImageSet};
use crate::tensor::Tensor;

/// 两类4x4玩具数据：类别0左半边亮，类别1右半边亮，叠加少量确定性的扰动
pub(super) fn toy_image_set(training: usize, test: usize) -> ImageSet {
    let categories = vec!["left".to_string(), "right".to_string()];
    let mut image_set = ImageSet::new("toy", categories, 1, 4, 4);
    for i in 0..training + test {
        let category = i % 2;
        let data: Vec<f64> = (0..16)
            .map(|p| {
                let bright = (p % 4 < 2) == (category == 0);
                let noise = ((i * 7 + p * 3) % 10) as f64 * 0.02;
                if bright { 0.8 + noise } else { noise }
            })
            .collect();
        let image = Image::new(Tensor::new_volume(&data, 1, 4, 4), category);
        image_set.add_image(image, i >= training).unwrap();
    }
    image_set
}
