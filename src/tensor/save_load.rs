/*
 * @Author       : 老董
 * @Description  : 张量的二进制读写：4个u32（小端）形状 + 逐元素f64（小端）原始数据
 */

use std::io::{self, Read, Write};

use super::Tensor;

impl Tensor {
    /// 将单个张量写入`writer`
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        for dim in self.shape() {
            let dim = u32::try_from(dim)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "张量维度超出u32范围"))?;
            writer.write_all(&dim.to_le_bytes())?;
        }
        for value in self.as_slice() {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// 从`reader`读取单个张量
    pub fn load<R: Read + ?Sized>(reader: &mut R) -> io::Result<Tensor> {
        let shape = Tensor::load_shape(reader)?;
        Tensor::load_data(reader, shape)
    }

    /// 只读取张量记录开头的形状，调用方可以在读取数据前先校验形状
    pub fn load_shape<R: Read + ?Sized>(reader: &mut R) -> io::Result<[usize; 4]> {
        let mut shape = [0usize; 4];
        let mut buffer = [0u8; 4];
        for dim in shape.iter_mut() {
            reader.read_exact(&mut buffer)?;
            *dim = u32::from_le_bytes(buffer) as usize;
        }
        if shape.iter().any(|&d| d == 0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("张量形状{shape:?}中存在为0的维度"),
            ));
        }
        Ok(shape)
    }

    /// 读取形状为`shape`的张量数据（紧跟在形状之后的f64序列）
    pub fn load_data<R: Read + ?Sized>(reader: &mut R, shape: [usize; 4]) -> io::Result<Tensor> {
        let byte_count = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .and_then(|size| size.checked_mul(8))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("张量形状{shape:?}的元素个数超出范围"),
                )
            })?;

        // 按实际读到的字节增长缓冲区，损坏的形状不会触发巨量分配
        let mut bytes = Vec::new();
        (&mut *reader).take(byte_count as u64).read_to_end(&mut bytes)?;
        if bytes.len() != byte_count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("张量数据不完整：需要{byte_count}字节，只读到{}字节", bytes.len()),
            ));
        }
        let data = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect::<Vec<_>>();
        Ok(Tensor::from_vec(data, shape))
    }
}
