/*
 * @Author       : 老董
 * @Date         : 2024-03-17
 * @Description  : 训练统计表（CSV）：网络结构、权重与偏置统计、测试集上的混淆矩阵
 */

use std::io::{self, Write};

use super::Network;
use crate::data::{Image, ImageSet};
use crate::nn::NetworkError;
use crate::nn::layer::TraitLayer;

impl Network {
    /// 网络结构表：每层一行
    pub fn write_architecture<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "Network")?;
        writeln!(
            writer,
            "Layer,Layer Size,Filter Count,Filter Size,Stride,Padding,Dropout,Activation,Leakiness"
        )?;
        for layer in &self.layers {
            writeln!(writer, "{}", layer.architecture_row())?;
        }
        Ok(())
    }

    /// 每个带权重层的权重与偏置的最大值、最小值、平均值
    pub fn write_weight_statistics<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "Weight and Bias Statistics")?;
        writeln!(
            writer,
            "Layer,Maximum Weight,Minimum Weight,Average Weight,Maximum Bias,Minimum Bias,Average Bias"
        )?;
        for (i, layer) in self.layers.iter().enumerate() {
            if let Some(params) = layer.parameters() {
                let w = params.weight_statistics();
                let b = params.bias_statistics();
                writeln!(
                    writer,
                    "{i},{},{},{},{},{},{}",
                    w.max, w.min, w.mean, b.max, b.min, b.mean
                )?;
            }
        }
        Ok(())
    }

    /// 对测试集分类，写出混淆矩阵（行为实际类别，列为预测类别）以及预测正确的总数
    pub fn write_accuracy_statistics<W: Write + ?Sized>(
        &mut self,
        image_set: &ImageSet,
        writer: &mut W,
    ) -> Result<(), NetworkError> {
        let predictions = self.classify(&image_set.test)?;
        write_confusion_matrix(&image_set.categories, &image_set.test, &predictions, writer)?;
        Ok(())
    }

    /// 已保存网络在测试集上的报告：数据集与已训练轮数，随后是网络结构、权重统计和混淆矩阵
    ///
    /// `predictions`是对`image_set.test`的分类结果，返回预测正确的个数
    pub fn write_test_report<W: Write + ?Sized>(
        &self,
        image_set: &ImageSet,
        predictions: &[usize],
        writer: &mut W,
    ) -> io::Result<usize> {
        writeln!(writer, "Dataset,{}", image_set.name)?;
        writeln!(writer, "Training epochs,{}", self.epochs_trained)?;
        writeln!(writer)?;
        self.write_architecture(writer)?;
        writeln!(writer)?;
        self.write_classification_statistics(image_set, predictions, writer)
    }

    /// 统计表的结尾：权重统计与混淆矩阵
    pub(crate) fn write_classification_statistics<W: Write + ?Sized>(
        &self,
        image_set: &ImageSet,
        predictions: &[usize],
        writer: &mut W,
    ) -> io::Result<usize> {
        self.write_weight_statistics(writer)?;
        writeln!(writer)?;
        writeln!(writer, "Network Classifications")?;
        write_confusion_matrix(&image_set.categories, &image_set.test, predictions, writer)
    }
}

/// 混淆矩阵，返回预测正确的个数
fn write_confusion_matrix<W: Write + ?Sized>(
    categories: &[String],
    images: &[Image],
    predictions: &[usize],
    writer: &mut W,
) -> io::Result<usize> {
    let category_count = categories.len();
    let mut counts = vec![vec![0usize; category_count]; category_count];
    let mut correct = 0;
    for (image, &predicted) in images.iter().zip(predictions) {
        counts[image.category][predicted] += 1;
        if predicted == image.category {
            correct += 1;
        }
    }

    write!(writer, "Actual Category")?;
    for category in categories {
        write!(writer, ",Predicted {category}")?;
    }
    writeln!(writer)?;
    for (category, row) in categories.iter().zip(&counts) {
        write!(writer, "{category}")?;
        for count in row {
            write!(writer, ",{count}")?;
        }
        writeln!(writer)?;
    }
    writeln!(writer)?;
    writeln!(writer, "Overall accuracy,{correct}")?;
    Ok(correct)
}
