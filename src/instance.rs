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

use {
	crate::{dispatch::DispatchTable, extension::ExtensionSet, sys},
	std::fmt
};

/// Loader-side state of one `XrInstance`.
///
/// Immutable once created; the registry hands out shared references to it
/// for as long as any handle of the instance is registered.
pub struct LoaderInstance {
	handle:     sys::Instance,
	/// What application calls go through: the top of the api layer chain, or
	/// terminators and runtime functions when no layer is enabled.
	dispatch:   DispatchTable,
	/// The runtime's own functions, used by the terminators.
	runtime:    DispatchTable,
	extensions: ExtensionSet,
	api_layers: Vec<String>,
	runtime_debug_utils: bool
}

impl LoaderInstance {
	pub fn new(handle: sys::Instance, dispatch: DispatchTable, runtime: DispatchTable, extensions: ExtensionSet) -> Self {
		Self { handle, dispatch, runtime, extensions, api_layers: Vec::new(), runtime_debug_utils: false }
	}
	
	pub fn with_api_layers(mut self, api_layers: Vec<String>) -> Self {
		self.api_layers = api_layers;
		self
	}
	
	/// Marks `XR_EXT_debug_utils` as enabled on the runtime, so the
	/// terminators forward instead of emulating it.
	pub fn with_runtime_debug_utils(mut self, enabled: bool) -> Self {
		self.runtime_debug_utils = enabled;
		self
	}
	
	pub fn handle(&self) -> sys::Instance {
		self.handle
	}
	
	pub fn dispatch(&self) -> &DispatchTable {
		&self.dispatch
	}
	
	pub fn runtime(&self) -> &DispatchTable {
		&self.runtime
	}
	
	pub fn extensions(&self) -> &ExtensionSet {
		&self.extensions
	}
	
	pub fn api_layers(&self) -> &[String] {
		&self.api_layers
	}
	
	pub fn runtime_debug_utils(&self) -> bool {
		self.runtime_debug_utils
	}
}

impl fmt::Debug for LoaderInstance {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("LoaderInstance")
			.field("handle", &format_args!("{:#x}", self.handle.into_raw()))
			.field("dispatch", &self.dispatch)
			.field("extensions", &self.extensions)
			.field("api_layers", &self.api_layers)
			.field("runtime_debug_utils", &self.runtime_debug_utils)
			.finish()
	}
}
