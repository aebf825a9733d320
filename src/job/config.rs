/*
 * @Author       : 老董
 * @Date         : 2024-03-19
 * @Description  : JSON任务文件：数据集、超参数以及网络结构（或要继续训练的网络文件）
 *
 * 任务文件的顶层为`{ "jobs": [ ... ] }`，所有任务在开始训练前都会先被校验一遍。
 */

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::JobError;
use crate::data::datasets::face_image_shape;
use crate::data::{DatasetInfo, ImageSetLoader};
use crate::nn::{ActivationFunction, Network, TrainingOptions};

/// Leaky ReLU未指定泄露系数时的默认值
pub const DEFAULT_LEAKINESS: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// 数据集名：`mnist`或`cifar-10`
    pub dataset: String,
    pub epochs: u32,
    /// 连续多少轮准确率没有提高就停止，不指定则从不提前停止
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub give_up_after: Option<u32>,
    pub minibatch_size: usize,
    pub learning_rate: f64,
    #[serde(default)]
    pub learning_rate_decay: f64,
    #[serde(default)]
    pub learning_rate_decay_point: f64,
    #[serde(default)]
    pub weight_decay: f64,
    /// 人脸数据集的图像缩小倍数（1、2或4），对其余数据集无效
    #[serde(default = "default_face_image_size")]
    pub face_image_size: usize,
    /// 随机种子，不指定则取自系统熵
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// 新网络的结构，与`network_file`二选一
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
    /// 要继续训练的网络文件，与`network`二选一
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// 网络名，不指定则由数据集名和任务序号生成
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum LayerConfig {
    FullyConnected {
        layer_size: usize,
        /// 丢弃概率，保留概率为`1 - dropout`
        #[serde(default)]
        dropout: f64,
        #[serde(default)]
        activation: ActivationName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        leakiness: Option<f64>,
    },
    Convolutional {
        filter_count: usize,
        filter_size: usize,
        #[serde(default)]
        padding: usize,
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default)]
        activation: ActivationName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        leakiness: Option<f64>,
    },
    MaxPooling,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivationName {
    #[default]
    Sigmoid,
    Relu,
    LeakyRelu,
    Tanh,
    None,
}

fn default_stride() -> usize {
    1
}

fn default_face_image_size() -> usize {
    ImageSetLoader::DEFAULT_FACE_SCALE
}

impl ActivationName {
    /// 转为激活函数，`None`表示不使用激活函数
    pub fn to_activation(
        self,
        leakiness: Option<f64>,
    ) -> Result<Option<ActivationFunction>, String> {
        if leakiness.is_some() && self != ActivationName::LeakyRelu {
            return Err("只有leaky_relu激活函数可以指定leakiness".to_string());
        }
        Ok(match self {
            ActivationName::Sigmoid => Some(ActivationFunction::Sigmoid),
            ActivationName::Relu => Some(ActivationFunction::ReLU),
            ActivationName::Tanh => Some(ActivationFunction::TanH),
            ActivationName::None => None,
            ActivationName::LeakyRelu => {
                let leakiness = leakiness.unwrap_or(DEFAULT_LEAKINESS);
                if !(leakiness > 0.0 && leakiness < 1.0) {
                    return Err(format!("leakiness须在(0, 1)内，当前为{leakiness}"));
                }
                Some(ActivationFunction::LeakyReLU { leakiness })
            }
        })
    }
}

impl JobFile {
    pub fn from_json(json: &str) -> Result<Self, JobError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// 校验所有任务，返回第一个不合法的任务的错误
    pub fn validate(&self) -> Result<(), JobError> {
        if self.jobs.is_empty() {
            return Err(JobError::Invalid {
                job: 0,
                message: "任务文件中没有任何任务".to_string(),
            });
        }
        for (i, job) in self.jobs.iter().enumerate() {
            job.validate(i + 1)?;
        }
        Ok(())
    }
}

impl JobConfig {
    /// 校验超参数和网络结构（不载入数据集）
    ///
    /// # 参数
    /// - `job`: 任务序号（从1开始），用于错误信息
    pub fn validate(&self, job: usize) -> Result<(), JobError> {
        let invalid = |message: String| JobError::Invalid { job, message };

        if self.epochs == 0 {
            return Err(invalid("epochs须≥1".to_string()));
        }
        if self.give_up_after == Some(0) {
            return Err(invalid("give_up_after须≥1".to_string()));
        }
        if self.minibatch_size == 0 {
            return Err(invalid("minibatch_size须≥1".to_string()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(invalid(format!(
                "learning_rate须>0，当前为{}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.learning_rate_decay) {
            return Err(invalid(format!(
                "learning_rate_decay须在[0, 1)内，当前为{}",
                self.learning_rate_decay
            )));
        }
        if !(self.learning_rate_decay_point >= 0.0) {
            return Err(invalid(format!(
                "learning_rate_decay_point须≥0，当前为{}",
                self.learning_rate_decay_point
            )));
        }
        if !(0.0..1.0).contains(&self.weight_decay) {
            return Err(invalid(format!(
                "weight_decay须在[0, 1)内，当前为{}",
                self.weight_decay
            )));
        }
        if face_image_shape(self.face_image_size).is_none() {
            return Err(invalid(format!(
                "face_image_size须为1、2或4，当前为{}",
                self.face_image_size
            )));
        }
        self.build_network(job).map(|_| ())
    }

    /// 数据集的形状与类别数
    pub fn dataset_info(&self, job: usize) -> Result<DatasetInfo, JobError> {
        if !ImageSetLoader::is_known(&self.dataset) {
            return Err(JobError::Invalid {
                job,
                message: format!(
                    "未知的数据集{}，可选: {}",
                    self.dataset,
                    ImageSetLoader::DATASETS.join(", ")
                ),
            });
        }
        ImageSetLoader::describe_scaled(&self.dataset, self.face_image_size).ok_or_else(|| {
            JobError::Invalid {
                job,
                message: format!("face_image_size须为1、2或4，当前为{}", self.face_image_size),
            }
        })
    }

    /// 按配置构建新网络或载入网络文件，并设置学习率、权重衰减和随机种子
    pub fn build_network(&self, job: usize) -> Result<Network, JobError> {
        let invalid = |message: String| JobError::Invalid { job, message };
        let info = self.dataset_info(job)?;

        let mut network = match (&self.network, &self.network_file) {
            (Some(config), None) => config
                .build(&self.default_name(job), info)
                .map_err(invalid)?,
            (None, Some(path)) => {
                let network = Network::load(path)
                    .map_err(|e| invalid(format!("无法载入{}: {e}", path.display())))?;
                let shape = network.input_shape();
                if (shape.planes, shape.rows, shape.columns)
                    != (info.channels, info.rows, info.columns)
                {
                    return Err(invalid(format!(
                        "{}的输入为{shape}，与数据集{}不符",
                        path.display(),
                        self.dataset
                    )));
                }
                network
            }
            _ => {
                return Err(invalid(
                    "network与network_file须指定且只能指定其中一个".to_string(),
                ));
            }
        };

        network
            .validate_output_layer(info.category_count)
            .map_err(|e| invalid(e.to_string()))?;
        network
            .set_learning_rate(self.learning_rate)
            .map_err(|e| invalid(e.to_string()))?;
        network
            .set_weight_decay(self.weight_decay)
            .map_err(|e| invalid(e.to_string()))?;
        if let Some(seed) = self.seed {
            network.set_seed(seed);
        }
        Ok(network)
    }

    pub fn training_options(&self, save_dir: &Path) -> TrainingOptions {
        TrainingOptions::new(self.epochs, self.minibatch_size)
            .give_up_after(self.give_up_after.unwrap_or(u32::MAX))
            .learning_rate_decay(self.learning_rate_decay, self.learning_rate_decay_point)
            .save_dir(save_dir)
    }

    fn default_name(&self, job: usize) -> String {
        format!("{}_job{job}", self.dataset.to_ascii_lowercase())
    }
}

impl NetworkConfig {
    fn build(&self, default_name: &str, info: DatasetInfo) -> Result<Network, String> {
        if self.layers.is_empty() {
            return Err("网络中没有任何层".to_string());
        }
        let name = self.name.as_deref().unwrap_or(default_name);
        let mut network = Network::new(name, info.channels, info.rows, info.columns)
            .map_err(|e| e.to_string())?;
        for (i, layer) in self.layers.iter().enumerate() {
            let layer_error = |message: String| format!("第{}层: {message}", i + 1);
            let added = match *layer {
                LayerConfig::FullyConnected {
                    layer_size,
                    dropout,
                    activation,
                    leakiness,
                } => {
                    if !(0.0..1.0).contains(&dropout) {
                        return Err(layer_error(format!("dropout须在[0, 1)内，当前为{dropout}")));
                    }
                    let activation = activation.to_activation(leakiness).map_err(layer_error)?;
                    network.add_fully_connected_layer(layer_size, activation, 1.0 - dropout)
                }
                LayerConfig::Convolutional {
                    filter_count,
                    filter_size,
                    padding,
                    stride,
                    activation,
                    leakiness,
                } => {
                    let activation = activation.to_activation(leakiness).map_err(layer_error)?;
                    network.add_convolutional_layer(
                        filter_count,
                        filter_size,
                        stride,
                        padding,
                        activation,
                    )
                }
                LayerConfig::MaxPooling => network.add_max_pooling_layer(),
            };
            added.map_err(|e| layer_error(e.to_string()))?;
        }
        Ok(network)
    }
}
