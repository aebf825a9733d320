use crate::assert_err;
use crate::nn::{MaxPoolingLayer, NetworkError, Shape3, TraitLayer, WeightMode};
use crate::tensor::Tensor;

#[rustfmt::skip]
const INPUT: [f64; 16] = [
    1.0, 2.0, 5.0, 3.0,
    4.0, 0.0, 1.0, 1.0,
    -1.0, -2.0, 7.0, 7.0,
    -3.0, -4.0, 7.0, 0.0,
];

fn pooled(layer: &MaxPoolingLayer, input: &Tensor) -> Tensor {
    let mut output = Tensor::zeros(layer.output_shape().tensor_shape());
    layer.feed_forward(input, &mut output, None, WeightMode::Training);
    output
}

#[test]
fn test_feed_forward() {
    let layer = MaxPoolingLayer::new(Shape3::new(1, 4, 4)).unwrap();
    assert_eq!(layer.output_shape(), Shape3::new(1, 2, 2));
    let output = pooled(&layer, &Tensor::new_volume(&INPUT, 1, 4, 4));
    assert_eq!(output.as_slice(), &[4.0, 5.0, -1.0, 7.0]);
}

#[test]
fn test_feed_forward_multiple_planes() {
    let layer = MaxPoolingLayer::new(Shape3::new(2, 4, 4)).unwrap();
    let mut data = INPUT.to_vec();
    data.extend(INPUT.iter().map(|x| -x));
    let output = pooled(&layer, &Tensor::new_volume(&data, 2, 4, 4));
    assert_eq!(output.shape(), [1, 2, 2, 2]);
    assert_eq!(output.as_slice(), &[4.0, 5.0, -1.0, 7.0, 0.0, -1.0, 4.0, 0.0]);
}

#[test]
fn test_backpropagate_error() {
    let layer = MaxPoolingLayer::new(Shape3::new(1, 4, 4)).unwrap();
    let input = Tensor::new_volume(&INPUT, 1, 4, 4);
    let output = pooled(&layer, &input);
    let error_out = Tensor::new_volume(&[0.1, 0.2, 0.3, 0.4], 1, 2, 2);
    let mut error_in = Tensor::zeros([1, 1, 4, 4]);
    error_in.fill(9.0);
    layer.backpropagate_error(&error_out, &mut error_in, &input, &output, None);

    // 并列的最大值（右下块中的三个7）都收到误差
    #[rustfmt::skip]
    let expected = [
        0.0, 0.0, 0.2, 0.0,
        0.1, 0.0, 0.0, 0.0,
        0.3, 0.0, 0.4, 0.4,
        0.0, 0.0, 0.4, 0.0,
    ];
    assert_eq!(error_in.as_slice(), &expected);
}

#[test]
fn test_odd_dimensions() {
    assert_err!(
        MaxPoolingLayer::new(Shape3::new(1, 5, 4)),
        NetworkError::InvalidParameter(_)
    );
    assert_err!(
        MaxPoolingLayer::new(Shape3::new(3, 4, 7)),
        NetworkError::InvalidParameter(_)
    );
}

#[test]
fn test_description() {
    let layer = MaxPoolingLayer::new(Shape3::new(3, 8, 6)).unwrap();
    assert_eq!(layer.output_shape(), Shape3::new(3, 4, 3));
    assert!(layer.parameters().is_none());
    assert_eq!(layer.keep_probability(), 1.0);
    assert_eq!(
        layer.description(),
        "Max pooling 2 by 2, input dimensions: 3x8x6"
    );
    assert_eq!(layer.architecture_row(), "Max pooling,,,,,,,,");
}
