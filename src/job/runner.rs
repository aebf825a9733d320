/*
 * @Author       : 老董
 * @Date         : 2024-03-19
 * @Description  : 依次执行任务文件中的训练任务
 */

use std::path::{Path, PathBuf};

use tracing::info;

use super::{JobConfig, JobError, JobFile};
use crate::data::ImageSetLoader;
use crate::nn::TrainingSummary;

pub struct JobRunner {
    loader: ImageSetLoader,
    save_dir: PathBuf,
    thread_count: usize,
}

impl JobRunner {
    /// # 参数
    /// - `data_dir`: 数据根目录
    /// - `save_dir`: 统计表与检查点的保存目录
    /// - `thread_count`: 每个任务使用的工作线程数
    pub fn new(
        data_dir: impl Into<PathBuf>,
        save_dir: impl Into<PathBuf>,
        thread_count: usize,
    ) -> Self {
        Self {
            loader: ImageSetLoader::new(data_dir),
            save_dir: save_dir.into(),
            thread_count,
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// 先校验全部任务，再依次执行
    pub fn run_all(&mut self, job_file: &JobFile) -> Result<Vec<TrainingSummary>, JobError> {
        job_file.validate()?;
        job_file
            .jobs
            .iter()
            .enumerate()
            .map(|(i, job)| self.run(i + 1, job))
            .collect()
    }

    /// 执行一个任务（`index`从1开始）
    pub fn run(&mut self, index: usize, job: &JobConfig) -> Result<TrainingSummary, JobError> {
        let mut network = job.build_network(index)?;
        network
            .set_thread_count(self.thread_count)
            .map_err(|e| JobError::Invalid {
                job: index,
                message: e.to_string(),
            })?;
        let image_set = self.loader.load_scaled(&job.dataset, job.face_image_size)?;

        info!("开始第{index}个任务：在{}上训练{}", job.dataset, network.name());
        std::fs::create_dir_all(&self.save_dir)?;
        let summary = network.train(&image_set, &job.training_options(&self.save_dir))?;
        info!(
            "第{index}个任务完成：最佳为第{}轮，正确{}/{}",
            summary.best_epoch,
            summary.best_correct,
            image_set.test.len()
        );
        Ok(summary)
    }
}
