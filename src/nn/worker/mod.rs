/*
 * @Author       : 老董
 * @Date         : 2024-03-16
 * @Description  : 固定线程数的fork/join工作池
 *
 * 每个mini-batch（或测试批次）按线程数切分：每份`总数 / 线程数`个，余数依次分给前面的工作线程。
 * 各工作线程在rayon线程池中并行处理各自的一份，调用方阻塞直到全部完成（即一次两阶段屏障：分发、等待排空）。
 * 没有工作窃取：每个工作线程只处理分给自己的切片，且只写自己的私有状态。
 * 合并梯度并更新权重由调用方在并行阶段结束后串行完成。
 */

mod trainer;

pub(crate) use trainer::Worker;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::NetworkError;
use super::cost::CostFunction;
use super::layer::Layer;
use crate::data::Image;
use crate::tensor::Tensor;

/// 将`total`个样本分给`workers`个工作线程时每个线程的份额：
/// 每份为`total / workers`，余数依次多分1个给前`total % workers`个线程
pub fn partition_shares(total: usize, workers: usize) -> Vec<usize> {
    let per_worker = total / workers;
    let remainder = total % workers;
    (0..workers)
        .map(|i| per_worker + usize::from(i < remainder))
        .collect()
}

/// 按份额把切片切成连续的若干段（份额为0的段也保留）
fn split_by_shares<'a, T>(mut items: &'a [T], shares: &[usize]) -> Vec<&'a [T]> {
    shares
        .iter()
        .map(|&share| {
            let (head, tail) = items.split_at(share);
            items = tail;
            head
        })
        .collect()
}

fn split_by_shares_mut<'a, T>(mut items: &'a mut [T], shares: &[usize]) -> Vec<&'a mut [T]> {
    let mut parts = Vec::with_capacity(shares.len());
    for &share in shares {
        let (head, tail) = std::mem::take(&mut items).split_at_mut(share);
        parts.push(head);
        items = tail;
    }
    parts
}

pub(crate) struct WorkerPool {
    pool: ThreadPool,
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// 创建`thread_count`个工作线程，每个都有由`rng`派生出的独立随机数发生器
    pub(crate) fn new(
        layers: &[Layer],
        thread_count: usize,
        rng: &mut StdRng,
    ) -> Result<Self, NetworkError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("fishnet-worker-{i}"))
            .build()
            .map_err(|e| NetworkError::InvalidParameter(format!("无法创建线程池: {e}")))?;
        let workers = (0..thread_count)
            .map(|_| Worker::new(layers, StdRng::seed_from_u64(rng.next_u64())))
            .collect();
        Ok(Self { pool, workers })
    }

    pub(crate) fn reset_statistics(&mut self) {
        for worker in &mut self.workers {
            worker.reset_statistics();
        }
    }

    /// 并行地对一个mini-batch做反向传播，返回实际分到样本的工作线程个数（它们总是排在最前面）
    pub(crate) fn train_mini_batch(
        &mut self,
        layers: &[Layer],
        cost_function: CostFunction,
        batch: &[&Image],
        targets: &[Tensor],
    ) -> usize {
        let shares = partition_shares(batch.len(), self.workers.len());
        let active = shares.iter().take_while(|&&share| share > 0).count();
        let slices = split_by_shares(batch, &shares[..active]);

        let Self { pool, workers } = self;
        pool.install(|| {
            workers[..active]
                .par_iter_mut()
                .zip(slices)
                .for_each(|(worker, slice)| {
                    worker.train_on_mini_batch(layers, cost_function, slice, targets)
                });
        });
        active
    }

    /// 前`active`个工作线程（即参与了上一个mini-batch的那些）
    pub(crate) fn active_workers(&self, active: usize) -> &[Worker] {
        &self.workers[..active]
    }

    /// 整个训练集上累计的训练代价
    pub(crate) fn total_training_cost(&self) -> f64 {
        self.workers.iter().map(|w| w.training_cost).sum()
    }

    /// 并行地在`images`上评估，返回`(预测正确的个数, 总代价)`
    pub(crate) fn evaluate_accuracy(
        &mut self,
        layers: &[Layer],
        cost_function: CostFunction,
        images: &[Image],
        targets: &[Tensor],
    ) -> (usize, f64) {
        let shares = partition_shares(images.len(), self.workers.len());
        let slices = split_by_shares(images, &shares);

        let Self { pool, workers } = self;
        pool.install(|| {
            workers
                .par_iter_mut()
                .zip(slices)
                .for_each(|(worker, slice)| {
                    worker.number_correct = 0;
                    worker.testing_cost = 0.0;
                    worker.evaluate_accuracy(layers, cost_function, slice, targets);
                });
        });
        workers.iter().fold((0, 0.0), |(correct, cost), w| {
            (correct + w.number_correct, cost + w.testing_cost)
        })
    }

    /// 并行地给出每张图像的预测类别
    pub(crate) fn classify(&mut self, layers: &[Layer], images: &[Image]) -> Vec<usize> {
        let mut results = vec![0; images.len()];
        let shares = partition_shares(images.len(), self.workers.len());
        let slices = split_by_shares(images, &shares);
        let result_slices = split_by_shares_mut(&mut results, &shares);

        let Self { pool, workers } = self;
        pool.install(|| {
            workers
                .par_iter_mut()
                .zip(slices)
                .zip(result_slices)
                .for_each(|((worker, slice), result)| worker.classify(layers, slice, result));
        });
        results
    }
}
