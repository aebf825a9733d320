
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

/// 写一个IDX图像文件，`pixels`中每个元素对应一张图像（所有像素同值）
pub(super) fn write_idx_images(path: &Path, pixels: &[u8], gzip: bool) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&2051u32.to_be_bytes());
    bytes.extend_from_slice(&(pixels.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&28u32.to_be_bytes());
    bytes.extend_from_slice(&28u32.to_be_bytes());
    for &p in pixels {
        bytes.extend(std::iter::repeat(p).take(28 * 28));
    }
    write_bytes(path, &bytes, gzip);
}

pub(super) fn write_idx_labels(path: &Path, labels: &[u8], gzip: bool) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&2049u32.to_be_bytes());
    bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    bytes.extend_from_slice(labels);
    write_bytes(path, &bytes, gzip);
}

fn write_bytes(path: &Path, bytes: &[u8], gzip: bool) {
    if gzip {
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap();
    } else {
        std::fs::write(path, bytes).unwrap();
    }
}

/// 写一个MNIST目录：训练集3张、测试集2张，训练集用`.gz`
pub(super) fn write_mnist_dir(dir: &Path) {
    write_idx_images(&dir.join("train-images-idx3-ubyte.gz"), &[0, 255, 51], true);
    write_idx_labels(&dir.join("train-labels-idx1-ubyte.gz"), &[3, 7, 0], true);
    write_idx_images(&dir.join("t10k-images-idx3-ubyte"), &[102, 255], false);
    write_idx_labels(&dir.join("t10k-labels-idx1-ubyte"), &[9, 1], false);
}

/// 写一个CIFAR-10批次文件，每条记录的三个平面分别填充`(r, g, b)`
pub(super) fn write_cifar_batch(path: &Path, records: &[(u8, [u8; 3])]) {
    let mut bytes = Vec::new();
    for (label, planes) in records {
        bytes.push(*label);
        for &value in planes {
            bytes.extend(std::iter::repeat(value).take(32 * 32));
        }
    }
    std::fs::write(path, bytes).unwrap();
}

/// 写一个二进制（P5）PGM文件，所有像素同值
pub(super) fn write_pgm(path: &Path, rows: usize, columns: usize, value: u8) {
    let mut bytes = format!("P5\n# fishnet\n{columns} {rows}\n255\n").into_bytes();
    bytes.extend(std::iter::repeat(value).take(rows * columns));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// 写一个人脸目录：训练集3张、测试集1张，只有1/4尺寸（30x32）的图像
pub(super) fn write_faces_dir(dir: &Path) {
    let training = ["an2i/an2i_left_angry_open", "bpm/bpm_up_happy_sunglasses", "ch4f/ch4f_straight_sad_open"];
    let test = ["night/night_right_neutral_sunglasses"];
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("training_faces.txt"), training.join("\n") + "\n\n").unwrap();
    std::fs::write(dir.join("test_faces.txt"), test.join("\n")).unwrap();
    for (i, image) in training.iter().chain(&test).enumerate() {
        write_pgm(&dir.join(format!("{image}_4.pgm")), 30, 32, 50 * i as u8);
    }
}
