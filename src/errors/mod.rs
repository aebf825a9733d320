use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: [usize; 4],
        tensor2_shape: [usize; 4],
    },

    #[error("数据长度{data_len}与形状{shape:?}所需的元素个数不一致")]
    DataLengthMismatch { data_len: usize, shape: [usize; 4] },
    #[error("张量形状的每一维都须≥1，当前形状为{0:?}")]
    InvalidShape([usize; 4]),
    #[error("索引{index:?}超出了形状{shape:?}的范围")]
    IndexOutOfBounds { index: Vec<usize>, shape: [usize; 4] },
    #[error("用{dims}维索引访问时，前{leading}维须为1，当前形状为{shape:?}")]
    IndexDimsMismatch {
        dims: usize,
        leading: usize,
        shape: [usize; 4],
    },
}
