//! # FishNet
//!
//! `fishnet`是一个用纯rust实现的前馈神经网络引擎：由全连接层、卷积层、2x2最大池化层线性堆叠成网络，
//! 以交叉熵为代价函数，用带dropout、权重衰减与学习率衰减的mini-batch随机梯度下降训练，
//! 每个mini-batch在固定数目的工作线程间fork/join并行。训练好的网络可保存为二进制文件并重新载入。
//!

pub mod data;
pub mod errors;
pub mod job;
pub mod nn;
pub mod tensor;
pub mod utils;
