use std::borrow::Cow;

use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assert_err;
use crate::nn::{
    ActivationFunction, DropoutMask, FullyConnectedLayer, NetworkError, Shape3, TraitLayer,
    WeightMode,
};
use crate::tensor::Tensor;

#[rustfmt::skip]
const WEIGHTS: [f64; 12] = [
    0.838504, 0.422149, 0.288635, 0.907155,
    0.792704, 0.847105, 0.265283, 0.122859,
    0.184963, 0.261111, 0.743236, 0.174590,
];
const BIASES: [f64; 3] = [-0.1, 0.5, 0.0];
const INPUT: [f64; 4] = [2.0, 3.0, 4.0, 5.0];
const EXPECTED_OUTPUT: [f64; 3] = [8.53377, 6.30215, 4.999153];

fn fixture_layer(prev_keep_probability: f64) -> FullyConnectedLayer {
    FullyConnectedLayer::with_parameters(
        Shape3::flat(4),
        Tensor::new_matrix(&WEIGHTS, 3, 4),
        Tensor::new_vector(&BIASES),
        Some(ActivationFunction::Sigmoid),
        1.0,
        prev_keep_probability,
    )
    .unwrap()
}

/// 3个神经元的全部8种保留/丢弃组合
fn all_masks() -> Vec<DropoutMask> {
    (0..8)
        .map(|bits| DropoutMask::from_pattern(&[bits & 1 != 0, bits & 2 != 0, bits & 4 != 0]))
        .collect()
}

#[test]
fn test_feed_forward() {
    let layer = fixture_layer(1.0);
    let input = Tensor::new_vector(&INPUT);
    let mut output = Tensor::zeros([1, 1, 1, 3]);
    layer.feed_forward(&input, &mut output, None, WeightMode::Training);
    for (actual, expected) in output.as_slice().iter().zip(EXPECTED_OUTPUT) {
        assert_abs_diff_eq!(*actual, expected, epsilon = 1e-9);
    }
}

#[test]
fn test_feed_forward_takes_any_input_shape() {
    // 2x2的输入与长度为4的向量等价
    let layer = fixture_layer(1.0);
    let input = Tensor::new_matrix(&INPUT, 2, 2);
    let mut output = Tensor::zeros([1, 1, 1, 3]);
    layer.feed_forward(&input, &mut output, None, WeightMode::Training);
    assert_abs_diff_eq!(output[0], EXPECTED_OUTPUT[0], epsilon = 1e-9);
}

#[test]
fn test_feed_forward_with_masks() {
    let layer = fixture_layer(1.0);
    let input = Tensor::new_vector(&INPUT);
    for mask in all_masks() {
        let mut output = Tensor::zeros([1, 1, 1, 3]);
        output.fill(7.0);
        layer.feed_forward(&input, &mut output, Some(&mask), WeightMode::Training);
        for i in 0..3 {
            let expected = if mask[i] { EXPECTED_OUTPUT[i] } else { 0.0 };
            assert_abs_diff_eq!(output[i], expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_testing_weights() {
    let layer = fixture_layer(0.6);
    let input = Tensor::new_vector(&INPUT);

    let mut output = Tensor::zeros([1, 1, 1, 3]);
    layer.feed_forward(&input, &mut output, None, WeightMode::Testing);
    for (actual, expected) in output.as_slice().iter().zip([5.080262, 3.98129, 2.9994918]) {
        assert_abs_diff_eq!(*actual, expected, epsilon = 1e-9);
    }

    // 训练模式仍使用原始权重
    layer.feed_forward(&input, &mut output, None, WeightMode::Training);
    assert_abs_diff_eq!(output[0], EXPECTED_OUTPUT[0], epsilon = 1e-9);

    assert!(matches!(layer.weights_for(WeightMode::Training), Cow::Borrowed(_)));
    let scaled = layer.weights_for(WeightMode::Testing);
    assert!(matches!(scaled, Cow::Owned(_)));
    assert_abs_diff_eq!(scaled[0], WEIGHTS[0] * 0.6, epsilon = 1e-12);
    // 原始权重从不被修改
    assert_eq!(layer.parameters().unwrap().weights().as_slice(), &WEIGHTS);

    // 上一层没有dropout时，测试模式与训练模式一致
    let plain = fixture_layer(1.0);
    assert!(matches!(plain.weights_for(WeightMode::Testing), Cow::Borrowed(_)));
}

#[test]
fn test_backpropagate_error() {
    let layer = fixture_layer(1.0);
    let error_out = Tensor::new_vector(&[0.3, -0.015, 0.677]);
    let mut error_in = Tensor::zeros([1, 1, 1, 4]);
    let unused = Tensor::zeros([1, 1, 1, 4]);
    layer.backpropagate_error(&error_out, &mut error_in, &unused, &unused, None);
    let expected = [0.364880591, 0.290710272, 0.585782027, 0.388501045];
    for (actual, expected) in error_in.as_slice().iter().zip(expected) {
        assert_abs_diff_eq!(*actual, expected, epsilon = 1e-9);
    }
}

#[test]
fn test_backpropagate_error_with_masks() {
    let layer = fixture_layer(1.0);
    let errors = [0.3, -0.015, 0.677];
    let error_out = Tensor::new_vector(&errors);
    let unused = Tensor::zeros([1, 1, 1, 4]);
    for mask in all_masks() {
        let mut error_in = Tensor::zeros([1, 1, 1, 4]);
        error_in.fill(3.0);
        layer.backpropagate_error(&error_out, &mut error_in, &unused, &unused, Some(&mask));
        for j in 0..4 {
            let expected: f64 = (0..3)
                .filter(|&i| mask[i])
                .map(|i| WEIGHTS[i * 4 + j] * errors[i])
                .sum();
            assert_abs_diff_eq!(error_in[j], expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_update_weight_and_bias_errors() {
    let layer = fixture_layer(1.0);
    let delta = [0.092, 0.765, 0.624];
    let prev = [0.32, 0.0635, 0.71, 0.10034];
    let delta_tensor = Tensor::new_vector(&delta);
    let prev_tensor = Tensor::new_vector(&prev);
    let mut gradients = layer.parameters().unwrap().zero_gradients();

    layer.update_weight_and_bias_errors(&delta_tensor, &prev_tensor, &mut gradients, None);
    assert_abs_diff_eq!(gradients.weights[0], 0.02944, epsilon = 1e-12);
    for k in 0..3 {
        assert_abs_diff_eq!(gradients.biases[k], delta[k], epsilon = 1e-12);
        for j in 0..4 {
            assert_abs_diff_eq!(gradients.weights[k * 4 + j], delta[k] * prev[j], epsilon = 1e-12);
        }
    }

    // 第二个样本的贡献累加上去
    layer.update_weight_and_bias_errors(&delta_tensor, &prev_tensor, &mut gradients, None);
    for k in 0..3 {
        assert_abs_diff_eq!(gradients.biases[k], 2.0 * delta[k], epsilon = 1e-12);
        for j in 0..4 {
            assert_abs_diff_eq!(
                gradients.weights[k * 4 + j],
                2.0 * delta[k] * prev[j],
                epsilon = 1e-12
            );
        }
    }

    // 被丢弃的神经元没有梯度
    gradients.set_all_to_zero();
    let mask = DropoutMask::from_pattern(&[true, false, true]);
    layer.update_weight_and_bias_errors(&delta_tensor, &prev_tensor, &mut gradients, Some(&mask));
    assert_eq!(gradients.biases[1], 0.0);
    assert!((4..8).all(|i| gradients.weights[i] == 0.0));
    assert_abs_diff_eq!(gradients.biases[2], delta[2], epsilon = 1e-12);
}

#[test]
fn test_initialize_weights() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut layer =
        FullyConnectedLayer::new(Shape3::new(1, 20, 20), 50, Some(ActivationFunction::ReLU), 1.0, 1.0)
            .unwrap();
    assert!(!layer.parameters().unwrap().is_initialized());
    layer.initialize_weights(&mut rng);

    let params = layer.parameters().unwrap();
    assert!(params.is_initialized());
    let weights = params.weights().as_slice();
    let mean = weights.iter().sum::<f64>() / weights.len() as f64;
    let variance = weights.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / weights.len() as f64;
    // 标准差为1/sqrt(400)
    assert!(mean.abs() < 0.005, "均值为{mean}");
    assert!((variance.sqrt() - 0.05).abs() < 0.005, "方差为{variance}");

    // 已初始化的参数不会被再次初始化
    let before = layer.clone();
    layer.initialize_weights(&mut rng);
    assert_eq!(layer, before);

    let mut loaded = fixture_layer(1.0);
    loaded.initialize_weights(&mut rng);
    assert_eq!(loaded.parameters().unwrap().weights().as_slice(), &WEIGHTS);
}

#[test]
fn test_invalid_parameters() {
    assert_err!(
        FullyConnectedLayer::new(Shape3::flat(4), 0, None, 1.0, 1.0),
        NetworkError::InvalidParameter(_)
    );
    assert_err!(
        FullyConnectedLayer::new(Shape3::flat(4), 3, None, 0.0, 1.0),
        NetworkError::InvalidParameter(_)
    );
    assert_err!(
        FullyConnectedLayer::with_parameters(
            Shape3::flat(5),
            Tensor::new_matrix(&WEIGHTS, 3, 4),
            Tensor::new_vector(&BIASES),
            None,
            1.0,
            1.0,
        ),
        NetworkError::Format(_)
    );
    assert_err!(
        FullyConnectedLayer::with_parameters(
            Shape3::flat(4),
            Tensor::new_matrix(&WEIGHTS, 3, 4),
            Tensor::new_vector(&[0.0, 0.0]),
            None,
            1.0,
            1.0,
        ),
        NetworkError::Format(_)
    );
}

#[test]
fn test_description() {
    let layer = fixture_layer(1.0);
    assert_eq!(layer.output_shape(), Shape3::flat(3));
    assert_eq!(
        layer.description(),
        "Fully Connected, input size: 4, output size: 3, activation: Sigmoid"
    );
    assert_eq!(layer.architecture_row(), "Fully Connected,3,,,,,,Sigmoid,");

    let dropout = FullyConnectedLayer::new(
        Shape3::flat(4),
        3,
        Some(ActivationFunction::LeakyReLU { leakiness: 0.01 }),
        0.8,
        1.0,
    )
    .unwrap();
    assert_eq!(dropout.keep_probability(), 0.8);
    assert_eq!(
        dropout.description(),
        "Fully Connected, input size: 4, output size: 3, activation: Leaky ReLU, leakiness 0.01, dropout with probability 0.2"
    );
    assert_eq!(
        dropout.architecture_row(),
        "Fully Connected,3,,,,,0.2,Leaky ReLU,0.01"
    );

    let linear = FullyConnectedLayer::new(Shape3::flat(4), 2, None, 1.0, 1.0).unwrap();
    assert!(linear.description().ends_with("activation: None"));
    assert_eq!(linear.architecture_row(), "Fully Connected,2,,,,,,,");
}
