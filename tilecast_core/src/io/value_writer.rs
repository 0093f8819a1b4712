//! The [`ValueWriter`] trait writes the same framing [`super::ValueReader`]
//! reads: varints, zigzag svarints, floats and protobuf-style
//! length-prefixed fields.

use super::ValueWriterBlob;
use crate::Blob;
use anyhow::{Context, Result};
use byteorder::{ByteOrder, WriteBytesExt};
use std::io::Write;

pub trait ValueWriter<E: ByteOrder> {
	fn get_writer(&mut self) -> &mut dyn Write;

	fn position(&mut self) -> Result<u64>;

	fn is_empty(&mut self) -> Result<bool> {
		Ok(self.position()? == 0)
	}

	fn write_varint(&mut self, mut value: u64) -> Result<()> {
		while value >= 0x80 {
			self.get_writer().write_all(&[((value & 0x7F) as u8) | 0x80])?;
			value >>= 7;
		}
		self.get_writer().write_all(&[value as u8])?;
		Ok(())
	}

	fn write_svarint(&mut self, value: i64) -> Result<()> {
		self.write_varint(((value << 1) ^ (value >> 63)) as u64)
	}

	fn write_u8(&mut self, value: u8) -> Result<()> {
		Ok(self.get_writer().write_u8(value)?)
	}

	fn write_f32(&mut self, value: f32) -> Result<()> {
		Ok(self.get_writer().write_f32::<E>(value)?)
	}

	fn write_f64(&mut self, value: f64) -> Result<()> {
		Ok(self.get_writer().write_f64::<E>(value)?)
	}

	fn write_blob(&mut self, blob: &Blob) -> Result<()> {
		self.get_writer().write_all(blob.as_slice())?;
		Ok(())
	}

	fn write_slice(&mut self, buf: &[u8]) -> Result<()> {
		self.get_writer().write_all(buf)?;
		Ok(())
	}

	fn write_string(&mut self, text: &str) -> Result<()> {
		self.get_writer().write_all(text.as_bytes())?;
		Ok(())
	}

	fn write_pbf_key(&mut self, field_number: u32, wire_type: u8) -> Result<()> {
		self
			.write_varint((u64::from(field_number) << 3) | u64::from(wire_type))
			.context("failed to write PBF key")
	}

	fn write_pbf_packed_uint32(&mut self, data: &[u32]) -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		for &value in data {
			writer
				.write_varint(u64::from(value))
				.context("failed to write packed uint32")?;
		}
		self
			.write_pbf_blob(&writer.into_blob())
			.context("failed to write packed uint32 blob")
	}

	fn write_pbf_blob(&mut self, blob: &Blob) -> Result<()> {
		self
			.write_varint(blob.len())
			.context("failed to write varint for blob length")?;
		self.write_blob(blob).context("failed to write PBF blob")
	}

	fn write_pbf_string(&mut self, text: &str) -> Result<()> {
		self
			.write_varint(text.len() as u64)
			.context("failed to write varint for string length")?;
		self.write_string(text).context("failed to write PBF string")
	}
}

#[cfg(test)]
mod tests {
	use super::super::ValueWriterBlob;
	use super::*;

	#[test]
	fn write_varint() {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_varint(300).unwrap();
		assert_eq!(writer.into_blob().into_vec(), vec![0b1010_1100, 0b0000_0010]);
	}

	#[test]
	fn write_svarint() {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_svarint(-75).unwrap();
		assert_eq!(writer.into_blob().into_vec(), vec![149, 1]);
	}

	#[test]
	fn write_pbf_key() {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_pbf_key(1, 0).unwrap();
		assert_eq!(writer.into_blob().into_vec(), vec![0x08]);
	}

	#[test]
	fn write_pbf_packed_uint32() {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_pbf_packed_uint32(&[100, 150, 300]).unwrap();
		assert_eq!(writer.into_blob().into_vec(), vec![5, 100, 150, 1, 172, 2]);
	}

	#[test]
	fn write_pbf_string() {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_pbf_string("hello").unwrap();
		assert_eq!(writer.into_blob().into_vec(), vec![0x05, b'h', b'e', b'l', b'l', b'o']);
	}

	#[test]
	fn write_pbf_blob() {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_pbf_blob(&Blob::from(vec![0x01, 0x02, 0x03])).unwrap();
		assert_eq!(writer.into_blob().into_vec(), vec![0x03, 0x01, 0x02, 0x03]);
	}
}
