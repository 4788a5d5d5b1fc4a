#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("invalid catalog json: {0}")]
	Invalid(#[from] serde_json::Error),

	#[error("catalog does not match a known format")]
	UnknownFormat,

	#[error(transparent)]
	Session(#[from] moq_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
