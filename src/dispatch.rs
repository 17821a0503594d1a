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

//! Populating a [`DispatchTable`].
//!
//! A table is filled once while its instance is created and read without
//! locking afterwards.

pub use crate::commands::DispatchTable;

use {crate::{sys, terminator}, std::{ffi::CStr, fmt}};

/// Asks `gipa` for `name`, treating any failure as "not available".
///
/// # Safety
///
/// `gipa` must be a valid `xrGetInstanceProcAddr`.
pub unsafe fn resolve(gipa: sys::pfn::GetInstanceProcAddr, instance: sys::Instance, name: &CStr) -> Option<sys::pfn::VoidFunction> {
	let mut function = None;
	match gipa(instance, name.as_ptr(), &mut function) {
		result if result.into_raw() < 0 => None,
		_ => function
	}
}

impl DispatchTable {
	/// Resolves every slot through `gipa`.
	///
	/// # Safety
	///
	/// See [`resolve`].
	pub unsafe fn resolve_all(instance: sys::Instance, gipa: sys::pfn::GetInstanceProcAddr) -> Self {
		let mut table = Self::default();
		table.update_each(|name| Some(resolve(gipa, instance, name)));
		table
	}
	
	/// The table of an instance created without api layers: the loader's
	/// terminators for the commands it intercepts, the runtime for the rest.
	///
	/// # Safety
	///
	/// See [`resolve`].
	pub unsafe fn populate(instance: sys::Instance, runtime_gipa: sys::pfn::GetInstanceProcAddr) -> Self {
		let mut table = Self::default();
		table.install_terminators();
		table.update_each(|name| match terminator::is_intercepted(name) {
			true  => None,
			false => Some(resolve(runtime_gipa, instance, name))
		});
		table
	}
	
	/// The table of an instance created with api layers. Every slot comes
	/// from the top of the chain, so a name the layers do not resolve stays
	/// empty instead of reaching the runtime behind their back.
	///
	/// # Safety
	///
	/// See [`resolve`].
	pub unsafe fn populate_from_layer(instance: sys::Instance, top_gipa: sys::pfn::GetInstanceProcAddr) -> Self {
		Self::resolve_all(instance, top_gipa)
	}
	
	pub fn install_terminators(&mut self) {
		unsafe { self.update_each(|name| terminator::intercept(name).map(Some)) }
	}
}

impl fmt::Debug for DispatchTable {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("DispatchTable")
			.field("slots", &Self::SLOT_NAMES.len())
			.field("resolved", &self.resolved_count())
			.finish()
	}
}
