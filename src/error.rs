// MIT License
//
// Copyright (c) 2019-2021 Tobias Pfeiffer
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use {crate::sys, std::{io, path::PathBuf}};

pub type Result<T, E = LoaderError> = std::result::Result<T, E>;

/// Everything that can go wrong inside the loader itself.
///
/// None of these ever cross the C ABI; the trampolines translate them into
/// a `sys::Result` through [`LoaderError::result`].
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
	#[error("failed allocating memory")]
	OutOfMemory,
	#[error("unexpected failure: {0}")]
	Unexpected(String),
	#[error("invalid manifest `{path}`: {reason}")]
	Manifest { path: PathBuf, reason: String },
	#[error("io error: {0}")]
	Io(#[from] io::Error),
	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),
	#[error("failed to load `{path}`: {source}")]
	Library { path: PathBuf, source: libloading::Error },
	#[error("negotiation with `{name}` failed: {reason}")]
	Negotiation { name: String, reason: String },
	#[error("no active runtime found")]
	RuntimeUnavailable,
	#[error("api layer `{0}` not present")]
	ApiLayerNotPresent(String),
	#[error("extension `{0}` not present")]
	ExtensionNotPresent(String),
	#[error("xr: {0}")]
	Xr(sys::Result)
}

impl LoaderError {
	/// The result code an application sees for this error.
	pub fn result(&self) -> sys::Result {
		match self {
			Self::OutOfMemory            => sys::Result::ERROR_OUT_OF_MEMORY,
			Self::Unexpected(_)          => sys::Result::ERROR_INITIALIZATION_FAILED,
			Self::Manifest { .. }
			| Self::Json(_)              => sys::Result::ERROR_FILE_CONTENTS_INVALID,
			Self::Io(_)                  => sys::Result::ERROR_FILE_ACCESS_ERROR,
			Self::Library { .. }
			| Self::Negotiation { .. }
			| Self::RuntimeUnavailable   => sys::Result::ERROR_RUNTIME_UNAVAILABLE,
			Self::ApiLayerNotPresent(_)  => sys::Result::ERROR_API_LAYER_NOT_PRESENT,
			Self::ExtensionNotPresent(_) => sys::Result::ERROR_EXTENSION_NOT_PRESENT,
			Self::Xr(result)             => *result
		}
	}
	
	/// Faults are failures the entry point's fault policy decides the result
	/// code for. Every other error carries its own code.
	pub fn is_fault(&self) -> bool {
		matches!(self, Self::OutOfMemory | Self::Unexpected(_))
	}
	
	/// Turns a caught panic payload back into an error.
	///
	/// A payload that is itself a `LoaderError` keeps its category, so an
	/// allocation failure raised deep inside a forwarded call still reports
	/// `ERROR_OUT_OF_MEMORY`.
	pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
		let payload = match payload.downcast::<LoaderError>() {
			Ok(err) => return *err,
			Err(payload) => payload
		};
		
		if payload.is::<std::collections::TryReserveError>() {
			return Self::OutOfMemory;
		}
		
		match payload.downcast::<String>() {
			Ok(msg) => Self::Unexpected(*msg),
			Err(payload) => match payload.downcast::<&'static str>() {
				Ok(msg) => Self::Unexpected(msg.to_string()),
				Err(_) => Self::Unexpected("unknown panic payload".to_string())
			}
		}
	}
}

impl From<std::collections::TryReserveError> for LoaderError {
	fn from(_: std::collections::TryReserveError) -> Self {
		Self::OutOfMemory
	}
}

impl From<sys::Result> for LoaderError {
	fn from(result: sys::Result) -> Self {
		Self::Xr(result)
	}
}

pub trait ToResult {
	fn result(self) -> Result<Self, Self>
	where
		Self: Sized + Copy
	{
		ToResult::result2(self, self)
	}
	
	fn result2<T>(self, ok: T) -> Result<T, Self>
	where
		Self: Sized + Copy;
}

impl ToResult for sys::Result {
	fn result2<T>(self, ok: T) -> Result<T, Self> {
		if self.into_raw() >= 0 {
			Ok(ok)
		} else {
			Err(self)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	
	#[test]
	fn panic_payloads_keep_their_category() {
		let oom = std::panic::catch_unwind(|| std::panic::panic_any(LoaderError::OutOfMemory))
			.unwrap_err();
		assert!(matches!(LoaderError::from_panic(oom), LoaderError::OutOfMemory));
		
		let msg = std::panic::catch_unwind(|| panic!("runtime blew up: {}", 42))
			.unwrap_err();
		match LoaderError::from_panic(msg) {
			LoaderError::Unexpected(msg) => assert_eq!(msg, "runtime blew up: 42"),
			other => panic!("unexpected category: {:?}", other)
		}
	}
	
	#[test]
	fn negative_codes_are_errors() {
		assert_eq!(sys::Result::SUCCESS.result(), Ok(sys::Result::SUCCESS));
		assert_eq!(sys::Result::EVENT_UNAVAILABLE.result(), Ok(sys::Result::EVENT_UNAVAILABLE));
		assert_eq!(sys::Result::ERROR_HANDLE_INVALID.result(), Err(sys::Result::ERROR_HANDLE_INVALID));
	}
	
	#[test]
	fn errors_map_to_result_codes() {
		assert_eq!(LoaderError::OutOfMemory.result(), sys::Result::ERROR_OUT_OF_MEMORY);
		assert_eq!(LoaderError::RuntimeUnavailable.result(), sys::Result::ERROR_RUNTIME_UNAVAILABLE);
		assert_eq!(LoaderError::ApiLayerNotPresent("x".into()).result(), sys::Result::ERROR_API_LAYER_NOT_PRESENT);
		assert_eq!(LoaderError::Xr(sys::Result::ERROR_SESSION_LOST).result(), sys::Result::ERROR_SESSION_LOST);
		assert!(LoaderError::Unexpected(String::new()).is_fault());
		assert!(!LoaderError::RuntimeUnavailable.is_fault());
	}
}
