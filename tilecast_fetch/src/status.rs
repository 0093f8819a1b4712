//! [`FetchStatus`] models fetch failures as data. The values mirror HTTP
//! status codes so a glance at a log line tells you what happened.

use std::fmt::{self, Display};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchStatus {
	/// Conditional fetch short-circuit; the caller's copy is still valid.
	/// Not an error.
	NotModified,
	/// The request was malformed, e.g. x or y out of range for the given
	/// zoom. Never retried.
	BadRequest,
	/// The requested tile could not be found; possibly it does not exist.
	/// May trigger overzoom fallback.
	NotFound,
	/// An unspecified and unexpected kind of error occurred. It may, or may
	/// not, be temporary.
	ServerError,
	/// The source does not support this capability.
	NotImplemented,
}

impl FetchStatus {
	#[must_use]
	pub fn as_u16(&self) -> u16 {
		match self {
			FetchStatus::NotModified => 304,
			FetchStatus::BadRequest => 400,
			FetchStatus::NotFound => 404,
			FetchStatus::ServerError => 500,
			FetchStatus::NotImplemented => 501,
		}
	}
}

impl Display for FetchStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			FetchStatus::NotModified => "not modified",
			FetchStatus::BadRequest => "bad request",
			FetchStatus::NotFound => "not found",
			FetchStatus::ServerError => "server error",
			FetchStatus::NotImplemented => "not implemented",
		};
		write!(f, "{} ({})", name, self.as_u16())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_codes() {
		assert_eq!(FetchStatus::NotModified.as_u16(), 304);
		assert_eq!(FetchStatus::BadRequest.as_u16(), 400);
		assert_eq!(FetchStatus::NotFound.as_u16(), 404);
		assert_eq!(FetchStatus::ServerError.as_u16(), 500);
		assert_eq!(FetchStatus::NotImplemented.as_u16(), 501);
	}

	#[test]
	fn display_includes_the_code() {
		assert_eq!(FetchStatus::NotFound.to_string(), "not found (404)");
	}
}
