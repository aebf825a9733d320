use super::Tensor;

impl Tensor {
    /// 形状：`[超平面数, 平面数, 行数, 列数]`
    pub fn shape(&self) -> [usize; 4] {
        let dims = self.data.dim();
        [dims.0, dims.1, dims.2, dims.3]
    }

    pub fn hyperplanes(&self) -> usize {
        self.data.dim().0
    }

    pub fn planes(&self) -> usize {
        self.data.dim().1
    }

    pub fn rows(&self) -> usize {
        self.data.dim().2
    }

    pub fn columns(&self) -> usize {
        self.data.dim().3
    }

    /// 元素总数
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 单个平面（行×列）的元素个数
    pub fn plane_size(&self) -> usize {
        self.rows() * self.columns()
    }

    /// 单个超平面（平面×行×列）的元素个数
    pub fn hyperplane_size(&self) -> usize {
        self.planes() * self.plane_size()
    }

    /// 两个张量的形状是否完全一致
    pub fn dimensions_match(&self, other: &Tensor) -> bool {
        self.shape() == other.shape()
    }
}
