/*
 * @Author       : 老董
 * @Date         : 2024-03-16
 * @Description  : 单个工作线程的私有状态与逐样本算法
 *
 * 每个`Worker`独占一整套逐层的临时张量（激活值、导数、误差、梯度累加器、dropout掩码），
 * 在整个训练过程中被反复覆写；工作线程之间没有任何共享的可变张量。
 */

use rand::rngs::StdRng;

use crate::data::Image;
use crate::nn::cost::CostFunction;
use crate::nn::dropout::DropoutMask;
use crate::nn::layer::{Gradients, Layer, TraitLayer, WeightMode};
use crate::tensor::Tensor;

pub(crate) struct Worker {
    /// 每层施加激活函数之后的输出
    activations: Vec<Tensor>,
    /// 带权重层的激活函数导数（无激活函数时恒为1），池化层为`None`
    derivatives: Vec<Option<Tensor>>,
    /// 每层输出端的误差
    deltas: Vec<Tensor>,
    /// 带权重层的梯度累加器
    gradients: Vec<Option<Gradients>>,
    /// 使用dropout的全连接层的掩码
    masks: Vec<Option<DropoutMask>>,
    rng: StdRng,

    pub(crate) training_cost: f64,
    pub(crate) testing_cost: f64,
    pub(crate) number_correct: usize,
}

impl Worker {
    pub(crate) fn new(layers: &[Layer], rng: StdRng) -> Self {
        let mut activations = Vec::with_capacity(layers.len());
        let mut derivatives = Vec::with_capacity(layers.len());
        let mut deltas = Vec::with_capacity(layers.len());
        let mut gradients = Vec::with_capacity(layers.len());
        let mut masks = Vec::with_capacity(layers.len());

        for layer in layers {
            let shape = layer.output_shape().tensor_shape();
            activations.push(Tensor::zeros(shape));
            deltas.push(Tensor::zeros(shape));
            match layer.parameters() {
                Some(params) => {
                    let mut derivative = Tensor::zeros(shape);
                    derivative.fill(1.0);
                    derivatives.push(Some(derivative));
                    gradients.push(Some(params.zero_gradients()));
                }
                None => {
                    derivatives.push(None);
                    gradients.push(None);
                }
            }
            let keep_probability = layer.keep_probability();
            masks.push(
                (keep_probability < 1.0)
                    .then(|| DropoutMask::new(keep_probability, layer.output_shape().size())),
            );
        }

        Self {
            activations,
            derivatives,
            deltas,
            gradients,
            masks,
            rng,
            training_cost: 0.0,
            testing_cost: 0.0,
            number_correct: 0,
        }
    }

    pub(crate) fn gradients(&self) -> &[Option<Gradients>] {
        &self.gradients
    }

    pub(crate) fn reset_statistics(&mut self) {
        self.training_cost = 0.0;
        self.testing_cost = 0.0;
        self.number_correct = 0;
    }

    /// 输出层的激活值
    fn outputs(&self) -> &Tensor {
        &self.activations[self.activations.len() - 1]
    }

    /// 清零梯度累加器后，对本工作线程分到的每个样本做一次反向传播并累积梯度
    pub(crate) fn train_on_mini_batch(
        &mut self,
        layers: &[Layer],
        cost_function: CostFunction,
        images: &[&Image],
        targets: &[Tensor],
    ) {
        for gradients in self.gradients.iter_mut().flatten() {
            gradients.set_all_to_zero();
        }
        for image in images {
            self.back_propagate(layers, cost_function, &image.data, &targets[image.category]);
        }
    }

    /// 用测试权重逐个前向传播，累计预测正确的个数与总代价
    pub(crate) fn evaluate_accuracy(
        &mut self,
        layers: &[Layer],
        cost_function: CostFunction,
        images: &[Image],
        targets: &[Tensor],
    ) {
        for image in images {
            self.feed_forward(layers, &image.data, WeightMode::Testing);
            let outputs = self.outputs();
            let correct = outputs.highest_value_index() == image.category;
            let cost = cost_function.total_cost(outputs, &targets[image.category]);
            if correct {
                self.number_correct += 1;
            }
            self.testing_cost += cost;
        }
    }

    /// 用测试权重对每张图像给出预测的类别
    pub(crate) fn classify(&mut self, layers: &[Layer], images: &[Image], results: &mut [usize]) {
        debug_assert_eq!(images.len(), results.len());
        for (image, result) in images.iter().zip(results.iter_mut()) {
            self.feed_forward(layers, &image.data, WeightMode::Testing);
            *result = self.outputs().highest_value_index();
        }
    }

    /// 推理用的前向传播（不使用dropout，不计算导数）
    fn feed_forward(&mut self, layers: &[Layer], input: &Tensor, mode: WeightMode) {
        for (li, layer) in layers.iter().enumerate() {
            let (before, rest) = self.activations.split_at_mut(li);
            let layer_input = if li == 0 { input } else { &before[li - 1] };
            let output = &mut rest[0];
            layer.feed_forward(layer_input, output, None, mode);
            if let Some(activation) = layer.activation() {
                activation.apply_in_place(output);
            }
        }
    }

    /// 单个训练样本：带dropout的前向传播 → 计算代价 → 逐层反向传播误差并累积梯度
    fn back_propagate(
        &mut self,
        layers: &[Layer],
        cost_function: CostFunction,
        input: &Tensor,
        target: &Tensor,
    ) {
        let Self {
            activations,
            derivatives,
            deltas,
            gradients,
            masks,
            rng,
            training_cost,
            ..
        } = self;

        for (li, layer) in layers.iter().enumerate() {
            let (before, rest) = activations.split_at_mut(li);
            let layer_input = if li == 0 { input } else { &before[li - 1] };
            let output = &mut rest[0];
            let mask = masks[li].as_mut().map(|mask| {
                mask.randomize(rng);
                &*mask
            });
            layer.feed_forward(layer_input, output, mask, WeightMode::Training);
            if let Some(activation) = layer.activation() {
                if let Some(derivative) = derivatives[li].as_mut() {
                    for (d, &x) in derivative.as_slice_mut().iter_mut().zip(output.as_slice()) {
                        *d = activation.derivative(x);
                    }
                }
                activation.apply_in_place(output);
            }
        }

        let last = layers.len() - 1;
        *training_cost += cost_function.total_cost(&activations[last], target);
        // 交叉熵配合Sigmoid输出时，该导数已经是对输出层原始激活值的误差，不再乘以激活函数的导数
        cost_function.calculate_derivatives(&activations[last], target, &mut deltas[last]);

        for li in (0..=last).rev() {
            let layer = &layers[li];
            let mask = masks[li].as_ref();
            if li != last {
                if let Some(derivative) = derivatives[li].as_ref() {
                    deltas[li] *= derivative;
                }
            }
            if let Some(gradients) = gradients[li].as_mut() {
                let prev_activations = if li == 0 { input } else { &activations[li - 1] };
                layer.update_weight_and_bias_errors(&deltas[li], prev_activations, gradients, mask);
            }
            if li > 0 {
                let (before, rest) = deltas.split_at_mut(li);
                layer.backpropagate_error(
                    &rest[0],
                    &mut before[li - 1],
                    &activations[li - 1],
                    &activations[li],
                    mask,
                );
            }
        }
    }
}
