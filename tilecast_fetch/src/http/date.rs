//! HTTP date handling. RFC 7231 dates are RFC 2822 dates with a literal
//! `GMT` zone, which the RFC 2822 parser/formatter does not speak, so both
//! directions translate the suffix.

use anyhow::{Context, Result};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

pub fn parse_http_date(text: &str) -> Option<OffsetDateTime> {
	let text = text.trim();
	let normalized = match text.strip_suffix("GMT") {
		Some(stripped) => format!("{stripped}+0000"),
		None => text.to_string(),
	};
	OffsetDateTime::parse(&normalized, &Rfc2822).ok()
}

pub fn format_http_date(date: OffsetDateTime) -> Result<String> {
	let formatted = date
		.to_offset(UtcOffset::UTC)
		.format(&Rfc2822)
		.context("failed to format HTTP date")?;
	Ok(match formatted.strip_suffix("+0000") {
		Some(stripped) => format!("{stripped}GMT"),
		None => formatted,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use time::macros::datetime;

	#[test]
	fn parses_the_gmt_suffix() {
		let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
		assert_eq!(parsed, datetime!(1994-11-06 08:49:37 UTC));
	}

	#[test]
	fn parses_numeric_offsets_too() {
		let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 +0000").unwrap();
		assert_eq!(parsed, datetime!(1994-11-06 08:49:37 UTC));
	}

	#[test]
	fn rejects_garbage() {
		assert!(parse_http_date("last tuesday").is_none());
	}

	#[test]
	fn formats_round_trip() {
		let date = datetime!(2024-02-29 12:00:00 UTC);
		let text = format_http_date(date).unwrap();
		assert!(text.ends_with("GMT"), "{text}");
		assert_eq!(parse_http_date(&text).unwrap(), date);
	}
}
