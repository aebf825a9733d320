/*
 * @Author       : 老董
 * @Description  : 张量的下标访问。
 *                 `tensor[i]`按存储顺序访问；`tensor[[r, c]]`、`tensor[[p, r, c]]`、`tensor[[h, p, r, c]]`
 *                 分别按2、3、4维访问（低维访问时，被省略的高维须为1）。
 *                 每一维的越界检查只在debug构建中进行；release构建中仍有切片自身的总长度检查。
 */

use std::ops::{Index, IndexMut};

use super::Tensor;
use crate::errors::TensorError;

impl Tensor {
    /// 4维下标对应的扁平存储偏移
    #[inline]
    pub fn offset(&self, index: [usize; 4]) -> usize {
        let [h, p, r, c] = index;
        let shape = self.shape();
        debug_assert!(
            h < shape[0] && p < shape[1] && r < shape[2] && c < shape[3],
            "{}",
            TensorError::IndexOutOfBounds {
                index: index.to_vec(),
                shape
            }
        );
        ((h * shape[1] + p) * shape[2] + r) * shape[3] + c
    }

    #[inline]
    fn offset_with_leading_ones(&self, index: &[usize]) -> usize {
        let shape = self.shape();
        let leading = 4 - index.len();
        debug_assert!(
            shape[..leading].iter().all(|&d| d == 1),
            "{}",
            TensorError::IndexDimsMismatch {
                dims: index.len(),
                leading,
                shape
            }
        );
        let mut full = [0; 4];
        full[leading..].copy_from_slice(index);
        self.offset(full)
    }

    /// 最大值所在的扁平下标，若有多个最大值则取存储顺序中的第一个
    pub fn highest_value_index(&self) -> usize {
        let mut best_index = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, &value) in self.as_slice().iter().enumerate() {
            if value > best_value {
                best_value = value;
                best_index = i;
            }
        }
        best_index
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓扁平下标↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Index<usize> for Tensor {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.as_slice()[index]
    }
}

impl IndexMut<usize> for Tensor {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.as_slice_mut()[index]
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑扁平下标↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓多维下标↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
macro_rules! impl_multi_dim_index {
    ($($dims:literal),*) => {$(
        impl Index<[usize; $dims]> for Tensor {
            type Output = f64;

            fn index(&self, index: [usize; $dims]) -> &f64 {
                let offset = self.offset_with_leading_ones(&index);
                &self.as_slice()[offset]
            }
        }

        impl IndexMut<[usize; $dims]> for Tensor {
            fn index_mut(&mut self, index: [usize; $dims]) -> &mut f64 {
                let offset = self.offset_with_leading_ones(&index);
                &mut self.as_slice_mut()[offset]
            }
        }
    )*};
}

impl_multi_dim_index!(2, 3, 4);
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑多维下标↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
