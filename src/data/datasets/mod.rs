//! 内置数据集
//!
//! - MNIST：手写数字（1x28x28，10类）
//! - CIFAR-10：彩色小图（3x32x32，10类）
//! - CMU人脸：灰度PGM图像（1x120x128，可缩小为1/2或1/4），按5种方式分类

mod cifar;
mod faces;
mod mnist;
mod pgm;

pub use cifar::{CIFAR10_NAME, load_cifar10};
pub use faces::{FACES_DIR, FaceClassification, face_image_shape, load_faces};
pub use mnist::{MNIST_NAME, load_mnist};
pub use pgm::load_pgm;

#[cfg(test)]
pub(crate) use cifar::read_batch;
#[cfg(test)]
pub(crate) use mnist::{parse_idx_images, parse_idx_labels};
#[cfg(test)]
pub(crate) use pgm::parse_pgm;
