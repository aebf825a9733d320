//! # 训练任务模块
//!
//! 从JSON任务文件读取一个或多个训练任务，校验后依次执行。
//!
//! # 任务文件示例
//!
//! ```json
//! {
//!   "jobs": [
//!     {
//!       "dataset": "mnist",
//!       "epochs": 30,
//!       "give_up_after": 5,
//!       "minibatch_size": 10,
//!       "learning_rate": 0.1,
//!       "learning_rate_decay": 0.2,
//!       "learning_rate_decay_point": 0.99,
//!       "network": {
//!         "name": "mnist_cnn",
//!         "layers": [
//!           { "layer": "convolutional", "filter_count": 8, "filter_size": 5, "padding": 2, "activation": "relu" },
//!           { "layer": "max_pooling" },
//!           { "layer": "fully_connected", "layer_size": 100, "dropout": 0.5, "activation": "relu" },
//!           { "layer": "fully_connected", "layer_size": 10 }
//!         ]
//!       }
//!     }
//!   ]
//! }
//! ```

mod config;
mod error;
mod runner;


pub use config::{
    ActivationName, DEFAULT_LEAKINESS, JobConfig, JobFile, LayerConfig, NetworkConfig,
};
pub use error::JobError;
pub use runner::JobRunner;
