use approx::assert_abs_diff_eq;

use super::toy_image_set;
use crate::assert_err;
use crate::data::{Image, ImageSet};
use crate::nn::{ActivationFunction, Network, NetworkError, TrainingOptions};
use crate::tensor::Tensor;

fn toy_network(seed: u64) -> Network {
    let mut network = Network::new("toy", 1, 4, 4).unwrap();
    network
        .add_fully_connected_layer(8, Some(ActivationFunction::Sigmoid), 1.0)
        .unwrap();
    network
        .add_fully_connected_layer(2, Some(ActivationFunction::Sigmoid), 1.0)
        .unwrap();
    network.set_learning_rate(0.5).unwrap();
    network.set_thread_count(2).unwrap();
    network.set_seed(seed);
    network
}

/// 测试集中的图像完全相同而类别各占一半：无论怎么训练，预测正确的个数都恰好是一半
fn constant_test_set() -> ImageSet {
    let mut image_set = toy_image_set(20, 0);
    let data = Tensor::new_volume(&[0.5; 16], 1, 4, 4);
    for i in 0..10 {
        image_set.add_image(Image::new(data.clone(), i % 2), true).unwrap();
    }
    image_set
}

#[test]
fn test_train_learns_toy_problem() {
    let image_set = toy_image_set(40, 10);
    let mut network = toy_network(1);
    let summary = network
        .train(&image_set, &TrainingOptions::new(30, 4))
        .unwrap();

    assert_eq!(summary.epochs_run, 30);
    assert_eq!(summary.training_costs.len(), 30);
    assert_eq!(network.epochs_trained(), 30);
    assert!(summary.stats_file.is_none());
    assert!(
        summary.training_costs[29] < summary.training_costs[0],
        "训练代价没有下降: {:?}",
        summary.training_costs
    );
    assert!(summary.best_correct >= 9, "最好只分对{}个", summary.best_correct);
    assert!((1..=30).contains(&summary.best_epoch));
    assert_eq!(summary.final_learning_rate, 0.5);

    let (correct, _) = network.evaluate(&image_set.test, &image_set.targets).unwrap();
    assert!(correct >= 8);
}

#[test]
fn test_train_is_reproducible() {
    let image_set = toy_image_set(16, 6);
    let run = || {
        let mut network = Network::new("toy", 1, 4, 4).unwrap();
        network
            .add_fully_connected_layer(6, Some(ActivationFunction::ReLU), 0.5)
            .unwrap();
        network
            .add_fully_connected_layer(2, Some(ActivationFunction::Sigmoid), 1.0)
            .unwrap();
        network.set_thread_count(3).unwrap();
        network.set_weight_decay(0.01).unwrap();
        network.set_seed(77);
        let summary = network.train(&image_set, &TrainingOptions::new(3, 5)).unwrap();
        (summary.training_costs, network.layers().to_vec())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_continue_training() {
    let image_set = toy_image_set(12, 4);
    let mut network = toy_network(2);
    network.train(&image_set, &TrainingOptions::new(2, 3)).unwrap();
    let summary = network.train(&image_set, &TrainingOptions::new(1, 3)).unwrap();
    assert_eq!(network.epochs_trained(), 3);
    assert_eq!(summary.epochs_run, 1);
    assert_eq!(summary.training_costs.len(), 1);
}

#[test]
fn test_give_up() {
    let image_set = constant_test_set();
    let mut network = toy_network(3);
    let options = TrainingOptions::new(10, 4).give_up_after(1);
    let summary = network.train(&image_set, &options).unwrap();

    // 第1轮正确5个即为最好成绩，第2轮没有提高便停止
    assert_eq!(summary.best_correct, 5);
    assert_eq!(summary.best_epoch, 1);
    assert_eq!(summary.epochs_run, 2);
    assert_eq!(network.epochs_trained(), 2);
}

#[test]
fn test_learning_rate_decay() {
    let image_set = toy_image_set(12, 4);

    // 阈值为0时每轮都衰减
    let mut network = toy_network(4);
    network.set_learning_rate(0.1).unwrap();
    let options = TrainingOptions::new(3, 4).learning_rate_decay(0.5, 0.0);
    let summary = network.train(&image_set, &options).unwrap();
    assert_abs_diff_eq!(summary.final_learning_rate, 0.0125, epsilon = 1e-15);
    assert_abs_diff_eq!(network.learning_rate(), 0.0125, epsilon = 1e-15);

    // 代价比从未超过阈值时不衰减
    let mut network = toy_network(4);
    network.set_learning_rate(0.1).unwrap();
    let options = TrainingOptions::new(3, 4).learning_rate_decay(0.5, 10.0);
    let summary = network.train(&image_set, &options).unwrap();
    assert_eq!(summary.final_learning_rate, 0.1);
}

#[test]
fn test_stats_file_and_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let image_set = constant_test_set();
    let mut network = toy_network(5);
    network.set_weight_decay(0.001).unwrap();
    let options = TrainingOptions::new(2, 4)
        .learning_rate_decay(0.1, 2.0)
        .save_dir(dir.path());
    let summary = network.train(&image_set, &options).unwrap();

    let stats_file = summary.stats_file.unwrap();
    let file_name = stats_file.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("toy_") && file_name.ends_with(".csv"), "{file_name}");
    let text = std::fs::read_to_string(&stats_file).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 27, "{text}");
    assert_eq!(
        &lines[..13],
        &[
            "Dataset,toy",
            "Learning rate,0.5",
            "Learning rate decay,0.1",
            "Learning rate decay point,2",
            "Weight decay,0.001",
            "Minibatch size,4",
            "",
            "Network",
            "Layer,Layer Size,Filter Count,Filter Size,Stride,Padding,Dropout,Activation,Leakiness",
            "Fully Connected,8,,,,,,Sigmoid,",
            "Fully Connected,2,,,,,,Sigmoid,",
            "",
            "Epoch,Training Loss,Testing Loss,Accuracy",
        ]
    );
    for (epoch, line) in [(1usize, lines[13]), (2, lines[14])] {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], epoch.to_string());
        assert_abs_diff_eq!(
            fields[1].parse::<f64>().unwrap(),
            summary.training_costs[epoch - 1]
        );
        assert_eq!(fields[3], "5");
    }

    assert_eq!(&lines[15..18], &[
        "",
        "Weight and Bias Statistics",
        "Layer,Maximum Weight,Minimum Weight,Average Weight,Maximum Bias,Minimum Bias,Average Bias",
    ]);
    assert!(lines[18].starts_with("0,") && lines[19].starts_with("1,"));
    assert_eq!(&lines[20..23], &[
        "",
        "Network Classifications",
        "Actual Category,Predicted left,Predicted right",
    ]);
    // 所有测试图像都被预测为同一类
    let rows = [lines[23], lines[24]];
    assert!(rows == ["left,5,0", "right,5,0"] || rows == ["left,0,5", "right,0,5"], "{rows:?}");
    assert_eq!(&lines[25..], &["", "Overall accuracy,5"]);

    // 只有第1轮有提高，因此只有一个检查点
    let checkpoints: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "fish"))
        .collect();
    assert_eq!(checkpoints.len(), 1);
    assert!(checkpoints[0].to_string_lossy().ends_with("_1.fish"));
    let checkpoint = Network::load(&checkpoints[0]).unwrap();
    assert_eq!(checkpoint.epochs_trained(), 1);
    assert_eq!(checkpoint.name(), "toy");
}

#[test]
fn test_train_errors() {
    let image_set = toy_image_set(6, 4);

    let mut empty = Network::new("empty", 1, 4, 4).unwrap();
    assert_err!(
        empty.train(&image_set, &TrainingOptions::new(1, 2)),
        NetworkError::EmptyNetwork
    );

    let mut network = toy_network(6);
    assert_err!(
        network.train(&image_set, &TrainingOptions::new(1, 0)),
        NetworkError::InvalidParameter(_)
    );
    assert_err!(
        network.train(&image_set, &TrainingOptions::new(1, 2).learning_rate_decay(1.0, 0.5)),
        NetworkError::InvalidParameter(_)
    );

    network.set_thread_count(5).unwrap();
    assert_err!(
        network.train(&image_set, &TrainingOptions::new(1, 2)),
        NetworkError::ThreadCount { threads: 5, training: 6, test: 4 }
    );

    let mut wrong_shape = Network::new("wrong", 1, 5, 5).unwrap();
    wrong_shape
        .add_fully_connected_layer(2, Some(ActivationFunction::Sigmoid), 1.0)
        .unwrap();
    assert_err!(
        wrong_shape.train(&image_set, &TrainingOptions::new(1, 2)),
        NetworkError::InvalidParameter(_)
    );

    let mut wrong_categories = Network::new("wrong", 1, 4, 4).unwrap();
    wrong_categories
        .add_fully_connected_layer(3, Some(ActivationFunction::Sigmoid), 1.0)
        .unwrap();
    assert_err!(
        wrong_categories.train(&image_set, &TrainingOptions::new(1, 2)),
        NetworkError::InvalidOutputLayer(_)
    );
    assert_eq!(network.epochs_trained(), 0);
}
