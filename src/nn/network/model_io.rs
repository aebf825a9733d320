/*
 * @Author       : 老董
 * @Date         : 2024-03-17
 * @Description  : 网络文件（.fish）的保存与载入
 *
 * 文件布局（全部小端）：
 * "FishNet123"(10字节) | 版本(u16) | 名字长度(u16) + 名字 | 输入通道、行、列(u32 x3) |
 * 代价函数标签(1字节) | 已训练轮数(u32) | 学习率(f64) | 权重衰减(f64) | 层数(u16) | 各层记录
 *
 * 载入时兼容旧版本：
 * - 版本<6：没有名字，使用文件名（不含扩展名）
 * - 版本<5：已训练轮数为u16
 * - 版本<4：没有权重衰减
 */

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::info;

use super::{Network, check_layer_order};
use crate::nn::NetworkError;
use crate::nn::activation::ActivationFunction;
use crate::nn::cost::CostFunction;
use crate::nn::layer::{
    ConvolutionalLayer, FullyConnectedLayer, LayerKind, MaxPoolingLayer, Shape3, TraitLayer,
};
use crate::tensor::Tensor;

impl Network {
    /// 文件魔数
    pub const FILE_MAGIC: &'static [u8; 10] = b"FishNet123";
    /// 当前写出的文件版本
    pub const FILE_VERSION: u16 = 6;

    /// 保存网络（结构、超参数、权重）到二进制文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            NetworkError::Format(format!("无法创建网络文件{}: {e}", path.display()))
        })?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer
            .flush()
            .map_err(|e| NetworkError::Format(format!("刷新缓冲区失败: {e}")))?;
        info!("网络已保存到{}", path.display());
        Ok(())
    }

    /// 把网络写入任意输出流
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), NetworkError> {
        let name = self.name.as_bytes();
        let name_length = u16::try_from(name.len())
            .map_err(|_| NetworkError::Format(format!("网络名过长（{}字节）", name.len())))?;
        let layer_count = u16::try_from(self.layers.len())
            .map_err(|_| NetworkError::Format(format!("层数过多（{}）", self.layers.len())))?;

        writer
            .write_all(Self::FILE_MAGIC)
            .map_err(|e| NetworkError::Format(format!("写入魔数失败: {e}")))?;
        writer.write_all(&Self::FILE_VERSION.to_le_bytes())?;
        writer.write_all(&name_length.to_le_bytes())?;
        writer.write_all(name)?;
        for extent in [
            self.input_shape.planes,
            self.input_shape.rows,
            self.input_shape.columns,
        ] {
            writer.write_all(&(extent as u32).to_le_bytes())?;
        }
        self.cost_function.save(writer)?;
        writer.write_all(&self.epochs_trained.to_le_bytes())?;
        writer.write_all(&self.learning_rate.to_le_bytes())?;
        writer.write_all(&self.weight_decay.to_le_bytes())?;
        writer.write_all(&layer_count.to_le_bytes())?;
        for (i, layer) in self.layers.iter().enumerate() {
            layer
                .save(writer)
                .map_err(|e| NetworkError::Format(format!("写入第{i}层失败: {e}")))?;
        }
        Ok(())
    }

    /// 从文件载入网络，线程数为1、随机种子取自系统熵
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Network, NetworkError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            NetworkError::Format(format!("无法打开网络文件{}: {e}", path.display()))
        })?;
        let fallback_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let network = Self::read_from(&mut BufReader::new(file), &fallback_name)?;
        info!("已载入网络{}", path.display());
        Ok(network)
    }

    /// 从任意输入流读取网络；旧版本文件没有名字时使用`fallback_name`
    pub fn read_from<R: Read>(reader: &mut R, fallback_name: &str) -> Result<Network, NetworkError> {
        let mut magic = [0u8; 10];
        reader
            .read_exact(&mut magic)
            .map_err(|e| NetworkError::Format(format!("读取魔数失败: {e}")))?;
        if &magic != Self::FILE_MAGIC {
            return Err(NetworkError::Format("这不是FishNet网络文件".to_string()));
        }

        let version = read_u16(reader, "版本")?;
        if version > Self::FILE_VERSION {
            return Err(NetworkError::UnsupportedVersion {
                found: version,
                supported: Self::FILE_VERSION,
            });
        }

        let name = if version >= 6 {
            let length = read_u16(reader, "名字长度")? as usize;
            let mut raw = vec![0u8; length];
            reader
                .read_exact(&mut raw)
                .map_err(|e| NetworkError::Format(format!("读取名字失败: {e}")))?;
            String::from_utf8(raw)
                .map_err(|e| NetworkError::Format(format!("网络名不是合法的UTF-8: {e}")))?
        } else {
            fallback_name.to_string()
        };

        let channels = read_u32(reader, "输入通道数")? as usize;
        let rows = read_u32(reader, "输入行数")? as usize;
        let columns = read_u32(reader, "输入列数")? as usize;
        if channels.checked_mul(rows).and_then(|n| n.checked_mul(columns)).is_none() {
            return Err(NetworkError::Format(format!(
                "输入尺寸{channels}x{rows}x{columns}超出范围"
            )));
        }
        let cost_function = CostFunction::load(reader)
            .map_err(|e| NetworkError::Format(format!("读取代价函数失败: {e}")))?;
        let epochs_trained = if version < 5 {
            read_u16(reader, "已训练轮数")? as u32
        } else {
            read_u32(reader, "已训练轮数")?
        };
        let learning_rate = read_f64(reader, "学习率")?;
        let weight_decay = if version >= 4 {
            read_f64(reader, "权重衰减")?
        } else {
            0.0
        };

        let mut network = Network::new(name, channels, rows, columns)?;
        network.cost_function = cost_function;
        network.epochs_trained = epochs_trained;
        network.set_learning_rate(learning_rate)?;
        network.set_weight_decay(weight_decay)?;

        let layer_count = read_u16(reader, "层数")?;
        let mut input_shape = network.input_shape;
        let mut prev_keep_probability = 1.0;
        for i in 0..layer_count {
            let mut tag = [0u8; 1];
            reader
                .read_exact(&mut tag)
                .map_err(|e| NetworkError::Format(format!("读取第{i}层的类型失败: {e}")))?;
            let kind = LayerKind::from_tag(tag[0]).ok_or_else(|| {
                NetworkError::Format(format!("第{i}层的类型标签{}未知", tag[0]))
            })?;
            check_layer_order(network.layers.last().map(|layer| layer.kind()), kind)?;
            let layer = read_layer(reader, kind, input_shape, prev_keep_probability)
                .map_err(|e| NetworkError::Format(format!("读取第{i}层失败: {e}")))?;
            input_shape = layer.output_shape();
            prev_keep_probability = layer.keep_probability();
            network.push_layer(layer);
        }
        Ok(network)
    }
}

fn read_layer<R: Read>(
    reader: &mut R,
    kind: LayerKind,
    input_shape: Shape3,
    prev_keep_probability: f64,
) -> Result<crate::nn::Layer, NetworkError> {
    let layer = match kind {
        LayerKind::FullyConnected => {
            let activation = ActivationFunction::load(reader)?;
            let keep_probability = read_f64(reader, "保留概率")?;
            let weights = read_tensor(reader, "权重", |shape| {
                matches!(shape, [1, 1, _, columns] if *columns == input_shape.size())
            })?;
            let output_size = weights.rows();
            let biases = read_tensor(reader, "偏置", |shape| {
                element_count(shape) == Some(output_size)
            })?;
            FullyConnectedLayer::with_parameters(
                input_shape,
                weights,
                biases,
                activation,
                keep_probability,
                prev_keep_probability,
            )?
            .into()
        }
        LayerKind::Convolutional => {
            let activation = ActivationFunction::load(reader)?;
            let stride = read_u32(reader, "步长")? as usize;
            let padding = read_u32(reader, "零填充")? as usize;
            let weights = read_tensor(reader, "卷积核", |shape| {
                let [_, channels, filter_rows, filter_columns] = *shape;
                channels == input_shape.planes
                    && filter_rows == filter_columns
                    && filter_rows <= input_shape.rows.min(input_shape.columns)
            })?;
            let filter_count = weights.hyperplanes();
            let biases = read_tensor(reader, "偏置", |shape| {
                element_count(shape) == Some(filter_count)
            })?;
            ConvolutionalLayer::with_parameters(
                input_shape,
                weights,
                biases,
                stride,
                padding,
                activation,
            )?
            .into()
        }
        LayerKind::MaxPooling => MaxPoolingLayer::new(input_shape)?.into(),
    };
    Ok(layer)
}

/// 先读形状并用`matches_layer`校验，通过后才读取数据
fn read_tensor<R: Read>(
    reader: &mut R,
    what: &str,
    matches_layer: impl FnOnce(&[usize; 4]) -> bool,
) -> Result<Tensor, NetworkError> {
    let shape = Tensor::load_shape(reader)?;
    if !matches_layer(&shape) {
        return Err(NetworkError::Format(format!("{what}的形状{shape:?}与本层不符")));
    }
    Ok(Tensor::load_data(reader, shape)?)
}

fn element_count(shape: &[usize; 4]) -> Option<usize> {
    shape.iter().try_fold(1usize, |count, &d| count.checked_mul(d))
}

fn read_u16<R: Read>(reader: &mut R, what: &str) -> Result<u16, NetworkError> {
    let mut raw = [0u8; 2];
    reader
        .read_exact(&mut raw)
        .map_err(|e| NetworkError::Format(format!("读取{what}失败: {e}")))?;
    Ok(u16::from_le_bytes(raw))
}

fn read_u32<R: Read>(reader: &mut R, what: &str) -> Result<u32, NetworkError> {
    let mut raw = [0u8; 4];
    reader
        .read_exact(&mut raw)
        .map_err(|e| NetworkError::Format(format!("读取{what}失败: {e}")))?;
    Ok(u32::from_le_bytes(raw))
}

fn read_f64<R: Read>(reader: &mut R, what: &str) -> Result<f64, NetworkError> {
    let mut raw = [0u8; 8];
    reader
        .read_exact(&mut raw)
        .map_err(|e| NetworkError::Format(format!("读取{what}失败: {e}")))?;
    Ok(f64::from_le_bytes(raw))
}
