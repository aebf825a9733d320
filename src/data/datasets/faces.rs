//! CMU 人脸数据集（PGM 格式）
//!
//! 同一批人脸图像按5种方式分类，每种方式是一个独立的数据集：
//! `emotions`、`face-directions`、`people`、`sunglasses`、`directions-sunglasses`。
//!
//! 目录布局（`<数据根目录>/faces/`）：
//! - `training_faces.txt`、`test_faces.txt`：每行一个图像的相对路径（不含后缀）
//! - 图像文件：`<相对路径>.pgm`、`<相对路径>_2.pgm`、`<相对路径>_4.pgm`，分别为原尺寸、1/2、1/4
//!
//! 类别由文件名决定，例如`an2i/an2i_left_angry_open`属于`left`方向、`angry`表情、`an2i`这个人。

use std::fmt;
use std::path::Path;

use tracing::info;

use super::pgm::load_pgm;
use crate::data::{DataError, Image, ImageSet};

/// 人脸数据集共用的子目录名
pub const FACES_DIR: &str = "faces";
/// 原尺寸图像的宽、高
pub const FACE_WIDTH: usize = 128;
pub const FACE_HEIGHT: usize = 120;

const TRAINING_LIST: &str = "training_faces.txt";
const TEST_LIST: &str = "test_faces.txt";
const DIRECTIONS: [&str; 4] = ["left", "right", "straight", "up"];
const EMOTIONS: [&str; 4] = ["angry", "happy", "neutral", "sad"];
const PEOPLE: [&str; 20] = [
    "an2i", "at33", "boland", "bpm", "ch4f", "cheyer", "choon", "danieln", "glickman", "karyadi",
    "kawamura", "kk49", "megak", "mitchell", "night", "phoebe", "saavik", "steffi", "sz24", "tammo",
];
const SUNGLASSES: &str = "sunglasses";

/// 人脸图像的分类方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceClassification {
    Emotions,
    Directions,
    People,
    Sunglasses,
    DirectionsSunglasses,
}

impl FaceClassification {
    pub const ALL: [FaceClassification; 5] = [
        FaceClassification::Emotions,
        FaceClassification::Directions,
        FaceClassification::People,
        FaceClassification::Sunglasses,
        FaceClassification::DirectionsSunglasses,
    ];

    /// 数据集名
    pub fn name(self) -> &'static str {
        match self {
            FaceClassification::Emotions => "emotions",
            FaceClassification::Directions => "face-directions",
            FaceClassification::People => "people",
            FaceClassification::Sunglasses => "sunglasses",
            FaceClassification::DirectionsSunglasses => "directions-sunglasses",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|classification| classification.name().eq_ignore_ascii_case(name))
    }

    pub fn categories(self) -> Vec<String> {
        match self {
            FaceClassification::Emotions => EMOTIONS.iter().map(|c| c.to_string()).collect(),
            FaceClassification::Directions => DIRECTIONS.iter().map(|c| c.to_string()).collect(),
            FaceClassification::People => PEOPLE.iter().map(|c| c.to_string()).collect(),
            FaceClassification::Sunglasses => vec!["no sunglasses".to_string(), SUNGLASSES.to_string()],
            FaceClassification::DirectionsSunglasses => DIRECTIONS
                .iter()
                .map(|c| c.to_string())
                .chain(DIRECTIONS.iter().map(|c| format!("{c} {SUNGLASSES}")))
                .collect(),
        }
    }

    /// 由图像的相对路径推出类别，路径须恰好包含一个类别名
    pub fn category_of(self, image_path: &str) -> Result<usize, String> {
        let wears_sunglasses = image_path.contains(SUNGLASSES);
        if self == FaceClassification::Sunglasses {
            return Ok(usize::from(wears_sunglasses));
        }

        let keywords: &[&str] = match self {
            FaceClassification::Emotions => &EMOTIONS,
            FaceClassification::People => &PEOPLE,
            _ => &DIRECTIONS,
        };
        let mut found = None;
        for (i, keyword) in keywords.iter().enumerate() {
            if !image_path.contains(keyword) {
                continue;
            }
            if let Some(previous) = found {
                return Err(format!(
                    "{image_path}同时属于{}和{keyword}两个类别",
                    keywords[previous]
                ));
            }
            found = Some(i);
        }
        let category = found.ok_or_else(|| format!("{image_path}不属于任何类别"))?;
        Ok(match self {
            FaceClassification::DirectionsSunglasses if wears_sunglasses => category + DIRECTIONS.len(),
            _ => category,
        })
    }
}

impl fmt::Display for FaceClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 缩小倍数（1、2、4）对应的图像尺寸`(行, 列)`，其余倍数返回`None`
pub fn face_image_shape(scale: usize) -> Option<(usize, usize)> {
    matches!(scale, 1 | 2 | 4).then(|| (FACE_HEIGHT / scale, FACE_WIDTH / scale))
}

fn file_suffix(scale: usize) -> String {
    match scale {
        1 => ".pgm".to_string(),
        _ => format!("_{scale}.pgm"),
    }
}

/// 载入人脸数据集
///
/// # 参数
/// - `data_dir`: 人脸目录（含两个列表文件）
/// - `classification`: 分类方式
/// - `scale`: 图像缩小倍数，1、2或4
pub fn load_faces(
    data_dir: &Path,
    classification: FaceClassification,
    scale: usize,
) -> Result<ImageSet, DataError> {
    let (rows, columns) = face_image_shape(scale).ok_or_else(|| {
        DataError::FormatError(format!("人脸图像的缩小倍数须为1、2或4，当前为{scale}"))
    })?;
    let mut image_set = ImageSet::new(
        format!("{classification} ({columns}x{rows})"),
        classification.categories(),
        1,
        rows,
        columns,
    );

    let suffix = file_suffix(scale);
    for (list_file, is_test) in [(TRAINING_LIST, false), (TEST_LIST, true)] {
        let list_path = data_dir.join(list_file);
        let list = std::fs::read_to_string(&list_path)
            .map_err(|_| DataError::FileNotFound(list_path.clone()))?;
        for (line_number, line) in list.lines().enumerate() {
            let image_path = line.trim();
            if image_path.is_empty() {
                continue;
            }
            let category = classification.category_of(image_path).map_err(|message| {
                DataError::FormatError(format!(
                    "{}第{}行: {message}",
                    list_path.display(),
                    line_number + 1
                ))
            })?;
            let data = load_pgm(&data_dir.join(format!("{image_path}{suffix}")))?;
            image_set.add_image(Image::new(data, category), is_test)?;
        }
    }

    info!(
        "已载入{}：{}个训练样本，{}个测试样本",
        image_set.name,
        image_set.training.len(),
        image_set.test.len()
    );
    Ok(image_set)
}
