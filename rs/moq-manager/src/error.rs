/// Stable integer result codes for the manager's public operations.
///
/// Mirrors the convention used at FFI boundaries elsewhere in this codebase: zero is success,
/// negative values are specific failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ResultCode {
	Success = 0,
	InvalidParameter = -1,
	NotConnected = -2,
	AlreadyConnected = -3,
	Internal = -4,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("invalid parameter: {0}")]
	InvalidParameter(String),

	#[error("not connected")]
	NotConnected,

	#[error("already connected")]
	AlreadyConnected,

	#[error(transparent)]
	Session(#[from] moq_core::Error),

	#[error(transparent)]
	Catalog(#[from] moq_catalog::Error),

	#[error(transparent)]
	Connect(#[from] anyhow::Error),
}

impl Error {
	pub fn code(&self) -> ResultCode {
		match self {
			Self::InvalidParameter(_) => ResultCode::InvalidParameter,
			Self::NotConnected => ResultCode::NotConnected,
			Self::AlreadyConnected => ResultCode::AlreadyConnected,
			Self::Session(_) | Self::Catalog(_) | Self::Connect(_) => ResultCode::Internal,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
