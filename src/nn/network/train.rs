/*
 * @Author       : 老董
 * @Date         : 2024-03-17
 * @Description  : 训练、测试与分类
 *
 * 每轮：打乱训练集 → 按mini-batch切分（最后一批可能较短）→ 各工作线程并行反向传播 →
 * 串行合并梯度并更新权重 → 用测试权重在测试集上评估。
 * 测试集上预测正确的个数严格提高时保存一次网络；连续`give_up_after`轮没有提高则提前停止；
 * 本轮训练代价与上一轮之比超过`learning_rate_decay_point`时，学习率乘以`1 - learning_rate_decay`。
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rand::seq::SliceRandom;
use tracing::{info, warn};

use super::Network;
use crate::data::{Image, ImageSet};
use crate::nn::NetworkError;
use crate::nn::layer::TraitLayer;
use crate::nn::worker::WorkerPool;
use crate::tensor::Tensor;

/// 训练过程中汇报剩余样本数的时间间隔
const PROGRESS_INTERVAL: Duration = Duration::from_secs(120);

/// 让第一轮之后不会触发学习率衰减的初始“上一轮代价”
const INITIAL_PREVIOUS_COST: f64 = 1e6;

/// 一次训练的选项
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    /// 本次训练的轮数（网络已训练过时在已有轮数的基础上追加）
    pub epochs: u32,
    /// 连续多少轮测试准确率没有提高就提前停止
    pub give_up_after: u32,
    pub mini_batch_size: usize,
    /// 学习率衰减比例，0表示不衰减
    pub learning_rate_decay: f64,
    /// 触发学习率衰减的代价比（本轮/上一轮）阈值
    pub learning_rate_decay_point: f64,
    /// 统计表与检查点的保存目录，`None`表示不写任何文件
    pub save_dir: Option<PathBuf>,
}

impl TrainingOptions {
    pub fn new(epochs: u32, mini_batch_size: usize) -> Self {
        Self {
            epochs,
            give_up_after: u32::MAX,
            mini_batch_size,
            learning_rate_decay: 0.0,
            learning_rate_decay_point: 0.0,
            save_dir: None,
        }
    }

    pub fn give_up_after(mut self, epochs: u32) -> Self {
        self.give_up_after = epochs;
        self
    }

    pub fn learning_rate_decay(mut self, decay: f64, decay_point: f64) -> Self {
        self.learning_rate_decay = decay;
        self.learning_rate_decay_point = decay_point;
        self
    }

    pub fn save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    fn validate(&self) -> Result<(), NetworkError> {
        if self.mini_batch_size == 0 {
            return Err(NetworkError::InvalidParameter(
                "mini-batch大小须≥1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.learning_rate_decay) {
            return Err(NetworkError::InvalidParameter(format!(
                "学习率衰减须在[0, 1)内，当前为{}",
                self.learning_rate_decay
            )));
        }
        Ok(())
    }
}

/// 一次训练的结果
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// 测试准确率最高的一轮（全局轮次，从1开始；一轮都没有提高时为训练开始前的轮数）
    pub best_epoch: u32,
    pub best_correct: usize,
    /// 本次实际训练的轮数
    pub epochs_run: u32,
    pub final_learning_rate: f64,
    /// 每轮的平均训练代价
    pub training_costs: Vec<f64>,
    /// 统计表路径（没有指定保存目录时为`None`）
    pub stats_file: Option<PathBuf>,
}

impl Network {
    /// 在`image_set`的训练集上训练，每轮结束后在测试集上评估
    pub fn train(
        &mut self,
        image_set: &ImageSet,
        options: &TrainingOptions,
    ) -> Result<TrainingSummary, NetworkError> {
        options.validate()?;
        if self.layers.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        self.check_image_shape(image_set)?;
        let (training_size, test_size) = (image_set.training.len(), image_set.test.len());
        if self.thread_count > training_size || self.thread_count > test_size {
            return Err(NetworkError::ThreadCount {
                threads: self.thread_count,
                training: training_size,
                test: test_size,
            });
        }

        info!("在{}上训练{}轮", image_set.name, options.epochs);
        let target_epochs = self.epochs_trained.saturating_add(options.epochs);
        if self.epochs_trained > 0 {
            info!("网络此前已训练{}轮", self.epochs_trained);
        }
        if options.give_up_after < options.epochs {
            info!("连续{}轮准确率没有提高时停止训练", options.give_up_after);
        }
        info!(
            "线程数: {}, 学习率: {}, 学习率衰减: {}, 权重衰减: {}",
            self.thread_count, self.learning_rate, options.learning_rate_decay, self.weight_decay
        );
        info!("网络结构:\n{}", self.description());

        let file_name_base = options
            .save_dir
            .as_deref()
            .map(|dir| file_name_base(dir, &self.name));
        let stats_file = file_name_base.as_deref().map(|base| with_suffix(base, ".csv"));
        let mut stats = match &stats_file {
            Some(path) => Some(self.create_stats_file(path, image_set, options)?),
            None => None,
        };

        self.initialize_weights();
        let mut pool = WorkerPool::new(&self.layers, self.thread_count, &mut self.rng)?;
        let mut training_data: Vec<&Image> = image_set.training.iter().collect();

        let mut weight_decay_multiplier = 1.0 - self.weight_decay * self.learning_rate;
        let mut previous_cost = INITIAL_PREVIOUS_COST;
        let mut best_correct = 0;
        let mut best_epoch = self.epochs_trained;
        let mut training_costs = Vec::new();

        while self.epochs_trained < target_epochs {
            let training_start = Instant::now();
            training_data.shuffle(&mut self.rng);
            let training_cost = self.train_for_one_epoch(
                &mut pool,
                &training_data,
                &image_set.targets,
                options.mini_batch_size,
                weight_decay_multiplier,
            );
            training_costs.push(training_cost);
            info!(
                "第{}轮训练完成，用时{}ms，平均训练代价: {training_cost}",
                self.epochs_trained,
                training_start.elapsed().as_millis()
            );

            let testing_start = Instant::now();
            let (correct, total_cost) = pool.evaluate_accuracy(
                &self.layers,
                self.cost_function,
                &image_set.test,
                &image_set.targets,
            );
            let testing_cost = total_cost / test_size as f64;
            info!(
                "测试完成，用时{}ms，正确{correct}/{test_size}，平均测试代价: {testing_cost}",
                testing_start.elapsed().as_millis()
            );
            if let Some(writer) = stats.as_mut() {
                writeln!(
                    writer,
                    "{},{training_cost},{testing_cost},{correct}",
                    self.epochs_trained
                )?;
                writer.flush()?;
            }

            if correct > best_correct {
                best_correct = correct;
                best_epoch = self.epochs_trained;
                if let Some(base) = &file_name_base {
                    let checkpoint = with_suffix(base, &format!("_{}.fish", self.epochs_trained));
                    // 保存失败不影响继续训练
                    if let Err(e) = self.save(&checkpoint) {
                        warn!("保存{}失败: {e}", checkpoint.display());
                    }
                }
            } else if self.epochs_trained - best_epoch >= options.give_up_after {
                info!(
                    "连续{}轮准确率没有提高，停止训练",
                    options.give_up_after
                );
                break;
            }

            if options.learning_rate_decay != 0.0
                && training_cost / previous_cost > options.learning_rate_decay_point
            {
                self.learning_rate *= 1.0 - options.learning_rate_decay;
                weight_decay_multiplier = 1.0 - self.weight_decay * self.learning_rate;
                info!("学习率降为{}", self.learning_rate);
            }
            previous_cost = training_cost;
        }

        if let Some(mut writer) = stats {
            writeln!(writer)?;
            let predictions = pool.classify(&self.layers, &image_set.test);
            self.write_classification_statistics(image_set, &predictions, &mut writer)?;
            writer.flush()?;
        }

        Ok(TrainingSummary {
            best_epoch,
            best_correct,
            epochs_run: training_costs.len() as u32,
            final_learning_rate: self.learning_rate,
            training_costs,
            stats_file,
        })
    }

    /// 用测试权重在`images`上评估，返回`(预测正确的个数, 平均代价)`
    pub fn evaluate(
        &mut self,
        images: &[Image],
        targets: &[Tensor],
    ) -> Result<(usize, f64), NetworkError> {
        self.check_batch_size(images.len())?;
        let mut pool = WorkerPool::new(&self.layers, self.thread_count, &mut self.rng)?;
        let (correct, total_cost) =
            pool.evaluate_accuracy(&self.layers, self.cost_function, images, targets);
        Ok((correct, total_cost / images.len() as f64))
    }

    /// 用测试权重给出每张图像的预测类别
    pub fn classify(&mut self, images: &[Image]) -> Result<Vec<usize>, NetworkError> {
        self.check_batch_size(images.len())?;
        let mut pool = WorkerPool::new(&self.layers, self.thread_count, &mut self.rng)?;
        Ok(pool.classify(&self.layers, images))
    }

    /// 训练一轮，返回平均训练代价
    fn train_for_one_epoch(
        &mut self,
        pool: &mut WorkerPool,
        training_data: &[&Image],
        targets: &[Tensor],
        mini_batch_size: usize,
        weight_decay_multiplier: f64,
    ) -> f64 {
        pool.reset_statistics();
        let mut remaining = training_data.len();
        let mut last_report = Instant::now();

        for batch in training_data.chunks(mini_batch_size) {
            let active = pool.train_mini_batch(&self.layers, self.cost_function, batch, targets);
            let scalar = self.learning_rate / batch.len() as f64;
            for (li, layer) in self.layers.iter_mut().enumerate() {
                let Some(params) = layer.parameters_mut() else {
                    continue;
                };
                if weight_decay_multiplier != 1.0 {
                    params.decay_weights(weight_decay_multiplier);
                }
                for worker in pool.active_workers(active) {
                    if let Some(gradients) = &worker.gradients()[li] {
                        params.update_weights_and_biases(
                            &gradients.weights,
                            &gradients.biases,
                            scalar,
                        );
                    }
                }
            }

            remaining -= batch.len();
            if remaining > 0 && last_report.elapsed() >= PROGRESS_INTERVAL {
                info!("本轮还剩{remaining}个训练样本");
                last_report = Instant::now();
            }
        }

        self.epochs_trained += 1;
        pool.total_training_cost() / training_data.len() as f64
    }

    fn check_image_shape(&self, image_set: &ImageSet) -> Result<(), NetworkError> {
        let (channels, rows, columns) = (image_set.channels, image_set.rows, image_set.columns);
        let shape = self.input_shape;
        if (shape.planes, shape.rows, shape.columns) != (channels, rows, columns) {
            return Err(NetworkError::InvalidParameter(format!(
                "数据集{}的图像为{channels}x{rows}x{columns}，但网络的输入为{shape}",
                image_set.name
            )));
        }
        if self.layers.last().map(|l| l.output_shape().size()) != Some(image_set.categories.len())
        {
            return Err(NetworkError::InvalidOutputLayer(format!(
                "数据集{}有{}个类别，与输出层的神经元个数不一致",
                image_set.name,
                image_set.categories.len()
            )));
        }
        Ok(())
    }

    fn check_batch_size(&self, image_count: usize) -> Result<(), NetworkError> {
        if self.layers.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        if self.thread_count > image_count {
            return Err(NetworkError::ThreadCount {
                threads: self.thread_count,
                training: image_count,
                test: image_count,
            });
        }
        Ok(())
    }

    /// 统计表的开头：数据集与超参数、网络结构、每轮统计的表头
    fn create_stats_file(
        &self,
        path: &Path,
        image_set: &ImageSet,
        options: &TrainingOptions,
    ) -> Result<BufWriter<File>, NetworkError> {
        let file = File::create(path).map_err(|e| {
            NetworkError::Format(format!("无法创建统计文件{}: {e}", path.display()))
        })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "Dataset,{}", image_set.name)?;
        writeln!(writer, "Learning rate,{}", self.learning_rate)?;
        if options.learning_rate_decay != 0.0 {
            writeln!(writer, "Learning rate decay,{}", options.learning_rate_decay)?;
            writeln!(
                writer,
                "Learning rate decay point,{}",
                options.learning_rate_decay_point
            )?;
        }
        if self.weight_decay != 0.0 {
            writeln!(writer, "Weight decay,{}", self.weight_decay)?;
        }
        writeln!(writer, "Minibatch size,{}", options.mini_batch_size)?;
        writeln!(writer)?;
        self.write_architecture(&mut writer)?;
        writeln!(writer)?;
        writeln!(writer, "Epoch,Training Loss,Testing Loss,Accuracy")?;
        Ok(writer)
    }
}

/// `<目录>/<网络名>_<unix秒>`，统计表与检查点共用这一前缀
fn file_name_base(dir: &Path, name: &str) -> PathBuf {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    dir.join(format!("{name}_{seconds}"))
}

/// 在前缀后直接拼接后缀（网络名里可能有`.`，不能用`with_extension`）
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut file_name = base.as_os_str().to_os_string();
    file_name.push(suffix);
    PathBuf::from(file_name)
}
