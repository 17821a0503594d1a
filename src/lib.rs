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

//! The dispatch core of an OpenXR loader.
//!
//! Applications link against the exported `xr*` symbols. Every handle they
//! pass in is looked up in a [`HandleRegistry`] to find the [`LoaderInstance`]
//! it belongs to, whose [`DispatchTable`] names the function that actually
//! implements the call: the top of the api layer chain, a loader
//! [terminator](terminator) or the runtime.
//!
//! Embedding the loader with a runtime that is already in the process:
//! ```rust
//! use xrloader::{Loader, RuntimeInterface, sys};
//!
//! unsafe fn install(gipa: sys::pfn::GetInstanceProcAddr) -> xrloader::Result<()> {
//! 	Loader::global().install_runtime(RuntimeInterface::new("in-process runtime", gipa)?);
//! 	Ok(())
//! }
//! ```

pub use openxr_sys as sys;

pub use self::{
	api_layer::{ApiLayerInterface, ApiLayerProperties},
	config::{Environment, LoaderSettings},
	dispatch::DispatchTable,
	error::{LoaderError, Result, ToResult},
	handle::{HandleType, LoaderHandle, TypedHandle},
	instance::LoaderInstance,
	loader::Loader,
	logger::{LogRecord, LogRecorder, LoaderLogger, MessageKind, Severity},
	registry::{HandleRegistry, Registration},
	runtime::RuntimeInterface,
	trampoline::{Effect, EntryPoint, FaultPolicy}
};

#[macro_use]
mod macros;

pub mod api_layer;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extension;
pub mod handle;
pub mod instance;
pub mod interfaces;
pub mod loader;
pub mod logger;
pub mod manifest;
pub mod names;
pub mod registry;
pub mod runtime;
pub mod terminator;
pub mod trampoline;
pub mod two_call;
