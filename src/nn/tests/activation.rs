use std::io::Cursor;

use approx::assert_abs_diff_eq;

use crate::assert_err;
use crate::errors::TensorError;
use crate::nn::ActivationFunction;
use crate::tensor::Tensor;

const INPUTS: [f64; 7] = [-3.0, -1.0, -0.25, 0.0, 0.25, 1.0, 3.0];

#[test]
fn test_relu() {
    let relu = ActivationFunction::ReLU;
    assert_eq!(relu.apply(-2.0), 0.0);
    assert_eq!(relu.apply(0.0), 0.0);
    assert_eq!(relu.apply(1.5), 1.5);
    assert_eq!(relu.derivative(-2.0), 0.0);
    // 0处的导数为0
    assert_eq!(relu.derivative(0.0), 0.0);
    assert_eq!(relu.derivative(1e-9), 1.0);
}

#[test]
fn test_leaky_relu() {
    let leaky = ActivationFunction::LeakyReLU { leakiness: 0.1 };
    assert_abs_diff_eq!(leaky.apply(-2.0), -0.2);
    assert_eq!(leaky.apply(0.0), 0.0);
    assert_eq!(leaky.apply(3.0), 3.0);
    assert_eq!(leaky.derivative(-2.0), 0.1);
    assert_eq!(leaky.derivative(0.0), 0.1);
    assert_eq!(leaky.derivative(2.0), 1.0);
}

#[test]
fn test_sigmoid_identities() {
    let sigmoid = ActivationFunction::Sigmoid;
    assert_abs_diff_eq!(sigmoid.apply(0.0), 0.5);
    for x in INPUTS {
        let s = sigmoid.apply(x);
        assert_abs_diff_eq!(s, 1.0 / (1.0 + (-x).exp()), epsilon = 1e-12);
        // σ(-x) = 1 - σ(x)
        assert_abs_diff_eq!(sigmoid.apply(-x), 1.0 - s, epsilon = 1e-12);
        assert_abs_diff_eq!(sigmoid.derivative(x), s * (1.0 - s), epsilon = 1e-12);
    }
}

#[test]
fn test_tanh_fixtures() {
    let tanh = ActivationFunction::TanH;
    #[rustfmt::skip]
    let expected = [
        -0.9950547536867305, -0.7615941559557649, -0.24491866240370913,
        0.0, 0.24491866240370913, 0.7615941559557649, 0.9950547536867305,
    ];
    for (x, e) in INPUTS.into_iter().zip(expected) {
        assert_abs_diff_eq!(tanh.apply(x), e, epsilon = 1e-12);
        assert_abs_diff_eq!(tanh.derivative(x), 1.0 - e * e, epsilon = 1e-12);
    }
}

#[test]
fn test_apply_derivative() {
    let input = Tensor::new_vector(&[-1.0, 0.0, 2.0]);
    let mut output = Tensor::zeros([1, 1, 1, 3]);
    ActivationFunction::ReLU
        .apply_derivative(&input, &mut output)
        .unwrap();
    assert_eq!(output, Tensor::new_vector(&[0.0, 0.0, 1.0]));

    let mut wrong = Tensor::zeros([1, 1, 1, 4]);
    assert_err!(
        ActivationFunction::Sigmoid.apply_derivative(&input, &mut wrong),
        TensorError::OperatorError { .. }
    );
}

#[test]
fn test_apply_in_place() {
    let mut tensor = Tensor::new_matrix(&[-1.0, 0.5, 2.0, -0.5], 2, 2);
    ActivationFunction::ReLU.apply_in_place(&mut tensor);
    assert_eq!(tensor, Tensor::new_matrix(&[0.0, 0.5, 2.0, 0.0], 2, 2));
}

#[test]
fn test_names_and_display() {
    let leaky = ActivationFunction::LeakyReLU { leakiness: 0.01 };
    assert_eq!(leaky.name(), "Leaky ReLU");
    assert_eq!(leaky.to_string(), "Leaky ReLU, leakiness 0.01");
    assert_eq!(leaky.leakiness(), Some(0.01));
    assert_eq!(ActivationFunction::TanH.to_string(), "TanH");
    assert_eq!(ActivationFunction::Sigmoid.leakiness(), None);
}

#[test]
fn test_save_load() {
    let cases = [
        None,
        Some(ActivationFunction::ReLU),
        Some(ActivationFunction::LeakyReLU { leakiness: 0.2 }),
        Some(ActivationFunction::Sigmoid),
        Some(ActivationFunction::TanH),
    ];
    let mut bytes = Vec::new();
    for activation in &cases {
        ActivationFunction::save(activation.as_ref(), &mut bytes).unwrap();
    }
    // 5个标签 + 1个泄露系数
    assert_eq!(bytes.len(), 5 + 8);
    assert_eq!(&bytes[..2], &[0, 1]);

    let mut reader = Cursor::new(bytes);
    for activation in cases {
        assert_eq!(ActivationFunction::load(&mut reader).unwrap(), activation);
    }
    assert!(ActivationFunction::load(&mut Cursor::new(vec![9u8])).is_err());
}
