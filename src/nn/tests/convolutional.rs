use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assert_err;
use crate::nn::{
    ActivationFunction, ConvolutionalLayer, NetworkError, Shape3, TraitLayer, WeightMode,
};
use crate::tensor::Tensor;

const INPUT_SIZE: usize = 7;
const FILTER_COUNT: usize = 2;
const BIASES: [f64; FILTER_COUNT] = [0.1, -0.2];

/// 逐个输出位置直接求和的参考实现所得的输出、输入端误差、nablaW与nablaB
struct Reference {
    output: Vec<f64>,
    error_in: Vec<f64>,
    nabla_w: Vec<f64>,
    nabla_b: Vec<f64>,
}

fn reference(
    input: &[f64],
    weights: &[f64],
    error_out: &[f64],
    channels: usize,
    filter_size: usize,
    stride: usize,
    padding: usize,
) -> Reference {
    let n = INPUT_SIZE;
    let out = (n + 2 * padding - filter_size) / stride + 1;
    let mut result = Reference {
        output: vec![0.0; FILTER_COUNT * out * out],
        error_in: vec![0.0; channels * n * n],
        nabla_w: vec![0.0; weights.len()],
        nabla_b: vec![0.0; FILTER_COUNT],
    };
    for f in 0..FILTER_COUNT {
        for r in 0..out {
            for c in 0..out {
                let o = (f * out + r) * out + c;
                result.output[o] = BIASES[f];
                result.nabla_b[f] += error_out[o];
                for ch in 0..channels {
                    for kr in 0..filter_size {
                        for kc in 0..filter_size {
                            let ir = (r * stride + kr) as isize - padding as isize;
                            let ic = (c * stride + kc) as isize - padding as isize;
                            if ir < 0 || ic < 0 || ir >= n as isize || ic >= n as isize {
                                continue;
                            }
                            let i = (ch * n + ir as usize) * n + ic as usize;
                            let w = ((f * channels + ch) * filter_size + kr) * filter_size + kc;
                            result.output[o] += weights[w] * input[i];
                            result.error_in[i] += weights[w] * error_out[o];
                            result.nabla_w[w] += error_out[o] * input[i];
                        }
                    }
                }
            }
        }
    }
    result
}

fn assert_close(actual: &[f64], expected: &[f64], what: &str) {
    assert_eq!(actual.len(), expected.len(), "{what}的长度不一致");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-10, "{what}[{i}]: {a} != {e}");
    }
}

#[test]
fn test_against_reference() {
    let mut rng = StdRng::seed_from_u64(2024);
    for stride in [1, 2] {
        for channels in [1, 2, 4] {
            for filter_size in [3, 4] {
                for padding in 0..filter_size {
                    let case = format!(
                        "stride {stride}, channels {channels}, filter {filter_size}, padding {padding}"
                    );
                    let input_shape = Shape3::new(channels, INPUT_SIZE, INPUT_SIZE);
                    let weights = Tensor::new_random(
                        -1.0,
                        1.0,
                        [FILTER_COUNT, channels, filter_size, filter_size],
                        &mut rng,
                    );
                    let layer = ConvolutionalLayer::with_parameters(
                        input_shape,
                        weights.clone(),
                        Tensor::new_vector(&BIASES),
                        stride,
                        padding,
                        None,
                    )
                    .unwrap();
                    let output_shape = layer.output_shape();
                    let expected_side = (INPUT_SIZE + 2 * padding - filter_size) / stride + 1;
                    assert_eq!(
                        output_shape,
                        Shape3::new(FILTER_COUNT, expected_side, expected_side),
                        "{case}"
                    );

                    let input = Tensor::new_random(-1.0, 1.0, input_shape.tensor_shape(), &mut rng);
                    let error_out =
                        Tensor::new_random(-1.0, 1.0, output_shape.tensor_shape(), &mut rng);
                    let expected = reference(
                        input.as_slice(),
                        weights.as_slice(),
                        error_out.as_slice(),
                        channels,
                        filter_size,
                        stride,
                        padding,
                    );

                    let mut output = Tensor::zeros(output_shape.tensor_shape());
                    layer.feed_forward(&input, &mut output, None, WeightMode::Training);
                    assert_close(output.as_slice(), &expected.output, &format!("输出（{case}）"));

                    let mut error_in = Tensor::zeros(input_shape.tensor_shape());
                    error_in.fill(5.0);
                    layer.backpropagate_error(&error_out, &mut error_in, &input, &output, None);
                    assert_close(error_in.as_slice(), &expected.error_in, &format!("误差（{case}）"));

                    let mut gradients = layer.parameters().unwrap().zero_gradients();
                    layer.update_weight_and_bias_errors(&error_out, &input, &mut gradients, None);
                    assert_close(
                        gradients.weights.as_slice(),
                        &expected.nabla_w,
                        &format!("nablaW（{case}）"),
                    );
                    assert_close(
                        gradients.biases.as_slice(),
                        &expected.nabla_b,
                        &format!("nablaB（{case}）"),
                    );
                }
            }
        }
    }
}

#[test]
fn test_feed_forward_literal() {
    #[rustfmt::skip]
    let weights = [
        -0.838504, 0.422149, 0.288635,
        0.792704, -0.847105, 0.265283,
        -0.184963, 0.261111, -0.743236,
    ];
    #[rustfmt::skip]
    let input = [
        0.00544, -0.83437, -0.87491, -0.51001, 0.64589,
        0.15090, 0.03972, -0.98896, -0.46934, -0.10584,
        -0.45019, -0.43087, 0.59682, -0.66041, 0.06119,
        0.27070, 0.69443, 0.88276, 0.63734, 0.84105,
        -0.39515, -0.42934, -0.38812, 0.88456, 0.30129,
    ];
    #[rustfmt::skip]
    let expected = [
        -1.1585163365399997, 1.75417646659, 0.06198339942999996,
        -0.653605231, -1.8802184714, 1.12737716594,
        0.5778164745900001, -0.18498898261000013, -0.19974944195000002,
    ];
    let layer = ConvolutionalLayer::with_parameters(
        Shape3::new(1, 5, 5),
        Tensor::new(&weights, [1, 1, 3, 3]),
        Tensor::new_vector(&[0.1]),
        1,
        0,
        None,
    )
    .unwrap();
    let mut output = Tensor::zeros([1, 1, 3, 3]);
    layer.feed_forward(
        &Tensor::new_volume(&input, 1, 5, 5),
        &mut output,
        None,
        WeightMode::Training,
    );
    for (actual, expected) in output.as_slice().iter().zip(expected) {
        assert_abs_diff_eq!(*actual, expected, epsilon = 1e-12);
    }
}

#[test]
fn test_initialize_weights() {
    let mut layer = ConvolutionalLayer::new(
        Shape3::new(4, 12, 12),
        64,
        5,
        1,
        2,
        Some(ActivationFunction::ReLU),
    )
    .unwrap();
    layer.initialize_weights(&mut StdRng::seed_from_u64(3));
    let params = layer.parameters().unwrap();
    assert!(params.is_initialized());
    assert!(params.biases().as_slice().iter().all(|&b| b == 0.0));

    let weights = params.weights().as_slice();
    assert_eq!(weights.len(), 64 * 4 * 5 * 5);
    let mean = weights.iter().sum::<f64>() / weights.len() as f64;
    let std_dev =
        (weights.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / weights.len() as f64).sqrt();
    // 标准差为2/sqrt(5·5·4)
    assert!((std_dev - 0.2).abs() < 0.01, "标准差为{std_dev}");
}

#[test]
fn test_invalid_parameters() {
    let shape = Shape3::new(1, 7, 7);
    assert_err!(
        ConvolutionalLayer::new(shape, 0, 3, 1, 0, None),
        NetworkError::InvalidParameter(_)
    );
    assert_err!(
        ConvolutionalLayer::new(shape, 2, 3, 0, 0, None),
        NetworkError::InvalidParameter(_)
    );
    assert_err!(
        ConvolutionalLayer::new(shape, 2, 3, 1, 3, None),
        NetworkError::InvalidParameter(_)
    );
    assert_err!(
        ConvolutionalLayer::new(shape, 2, 8, 1, 0, None),
        NetworkError::InvalidParameter(_)
    );
    // 卷积核的通道数与输入不一致
    assert_err!(
        ConvolutionalLayer::with_parameters(
            shape,
            Tensor::zeros([2, 3, 3, 3]),
            Tensor::new_vector(&BIASES),
            1,
            0,
            None,
        ),
        NetworkError::Format(_)
    );
}

#[test]
fn test_description() {
    let plain = ConvolutionalLayer::new(Shape3::new(1, 7, 7), 2, 3, 1, 0, None).unwrap();
    assert_eq!(plain.output_shape(), Shape3::new(2, 5, 5));
    assert_eq!(
        plain.description(),
        "Convolutional, 2 filters, input dimensions: 1x7x7, filter size: 3x3, stride: 1, activation: None"
    );
    assert_eq!(plain.architecture_row(), "Convolutional,,2,3,1,0,,,");

    let padded = ConvolutionalLayer::new(
        Shape3::new(3, 8, 8),
        4,
        3,
        2,
        1,
        Some(ActivationFunction::LeakyReLU { leakiness: 0.05 }),
    )
    .unwrap();
    assert_eq!(padded.output_shape(), Shape3::new(4, 4, 4));
    assert_eq!(
        padded.description(),
        "Convolutional, 4 filters, input dimensions: 3x8x8, filter size: 3x3, stride: 2, zero padding: 1, activation: Leaky ReLU, leakiness 0.05"
    );
    assert_eq!(padded.architecture_row(), "Convolutional,,4,3,2,1,,Leaky ReLU,0.05");
}
