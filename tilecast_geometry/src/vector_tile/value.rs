//! PBF codec for [`GeoValue`]: the `Value` message of the attribute table.

use crate::GeoValue;
use anyhow::{anyhow, bail, Context, Result};
use byteorder::LE;
use tilecast_core::{
	io::{ValueReader, ValueWriter, ValueWriterBlob},
	Blob,
};

pub trait GeoValuePbf<'a> {
	fn read(reader: &mut dyn ValueReader<'a, LE>) -> Result<GeoValue>;
	fn to_blob(&self) -> Result<Blob>;
}

impl<'a> GeoValuePbf<'a> for GeoValue {
	fn read(reader: &mut dyn ValueReader<'a, LE>) -> Result<GeoValue> {
		use GeoValue::*;
		let mut value: Option<GeoValue> = None;

		while reader.has_remaining() {
			value = Some(match reader.read_pbf_key().context("failed to read PBF key")? {
				(1, 2) => String(reader.read_pbf_string().context("failed to read string value")?),
				(2, 5) => Float(reader.read_f32().context("failed to read float value")?),
				(3, 1) => Double(reader.read_f64().context("failed to read double value")?),
				(4, 0) => Int(reader.read_varint().context("failed to read int value")? as i64),
				(5, 0) => UInt(reader.read_varint().context("failed to read uint value")?),
				(6, 0) => Int(reader.read_svarint().context("failed to read sint value")?),
				(7, 0) => Bool(reader.read_varint().context("failed to read bool value")? != 0),
				(f, w) => bail!("unexpected combination of field number ({f}) and wire type ({w})"),
			});
		}

		value.ok_or_else(|| anyhow!("empty value message"))
	}

	fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();

		match self {
			GeoValue::String(s) => {
				writer.write_pbf_key(1, 2)?;
				writer.write_pbf_string(s)?;
			}
			GeoValue::Float(f) => {
				writer.write_pbf_key(2, 5)?;
				writer.write_f32(*f)?;
			}
			GeoValue::Double(f) => {
				writer.write_pbf_key(3, 1)?;
				writer.write_f64(*f)?;
			}
			GeoValue::UInt(u) => {
				writer.write_pbf_key(5, 0)?;
				writer.write_varint(*u)?;
			}
			GeoValue::Int(i) => {
				writer.write_pbf_key(6, 0)?;
				writer.write_svarint(*i)?;
			}
			GeoValue::Bool(b) => {
				writer.write_pbf_key(7, 0)?;
				writer.write_varint(u64::from(*b))?;
			}
		}

		Ok(writer.into_blob())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tilecast_core::io::ValueReaderSlice;

	fn round_trip(value: GeoValue) {
		let blob = value.to_blob().unwrap();
		let mut reader = ValueReaderSlice::new_le(blob.as_slice());
		assert_eq!(GeoValue::read(&mut reader).unwrap(), value);
	}

	#[test]
	fn string_wire_bytes() {
		let blob = GeoValue::from("hello").to_blob().unwrap();
		assert_eq!(blob.into_vec(), vec![0x0A, 0x05, b'h', b'e', b'l', b'l', b'o']);
	}

	#[test]
	fn int_is_zigzag_encoded() {
		let blob = GeoValue::Int(75).to_blob().unwrap();
		assert_eq!(blob.into_vec(), vec![0x30, 0x96, 0x01]);
	}

	#[test]
	fn uint_wire_bytes() {
		let blob = GeoValue::UInt(150).to_blob().unwrap();
		assert_eq!(blob.into_vec(), vec![0x28, 0x96, 0x01]);
	}

	#[test]
	fn bool_wire_bytes() {
		let blob = GeoValue::Bool(true).to_blob().unwrap();
		assert_eq!(blob.into_vec(), vec![0x38, 0x01]);
	}

	#[test]
	fn all_variants_round_trip() {
		round_trip(GeoValue::from("text"));
		round_trip(GeoValue::Float(1.5));
		round_trip(GeoValue::Double(-2.25));
		round_trip(GeoValue::Int(-75));
		round_trip(GeoValue::UInt(12345));
		round_trip(GeoValue::Bool(false));
	}

	#[test]
	fn empty_message_is_an_error() {
		let mut reader = ValueReaderSlice::new_le(&[]);
		assert!(GeoValue::read(&mut reader).is_err());
	}

	#[test]
	fn unknown_field_is_an_error() {
		// field 9, wire type 0
		let mut reader = ValueReaderSlice::new_le(&[0x48, 0x01]);
		assert!(GeoValue::read(&mut reader).is_err());
	}
}
