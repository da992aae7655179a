use reqwest::StatusCode;

use crate::move_types::{AccountAddress, ParseError};

pub type Result<T, E = RestError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
	#[error("http request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("invalid url: {0}")]
	Url(#[from] url::ParseError),

	#[error("base url {0} cannot have path segments")]
	BaseUrl(String),

	#[error("request failed with {status}: {body}")]
	Api { status: StatusCode, body: String },

	#[error("transaction rejected with {status}: {body}")]
	Rejected { status: StatusCode, body: String },

	#[error("timed out waiting for transaction {hash}")]
	Timeout { hash: String },

	#[error("transaction {hash} aborted: {vm_status}")]
	Aborted { hash: String, vm_status: String },

	#[error("account {0} has no signing key")]
	MissingKey(AccountAddress),

	#[error("invalid entry call: {0}")]
	InvalidCall(#[from] ParseError),

	#[error("bcs encoding failed: {0}")]
	Bcs(#[from] bcs::Error),

	#[error("unexpected response body: {0}")]
	Decode(#[from] serde_json::Error),
}
