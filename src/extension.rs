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

//! Extension names and the per-instance enabled set.

use std::collections::HashSet;

/// Extension gate of an entry point: `None` for core commands.
pub type Gate = Option<&'static str>;

pub const CORE: Gate = None;

pub const EXT_DEBUG_UTILS_NAME:          &str = "XR_EXT_debug_utils";
pub const KHR_VULKAN_ENABLE_NAME:        &str = "XR_KHR_vulkan_enable";
pub const KHR_OPENGL_ENABLE_NAME:        &str = "XR_KHR_opengl_enable";
pub const KHR_D3D11_ENABLE_NAME:         &str = "XR_KHR_D3D11_enable";
pub const KHR_VISIBILITY_MASK_NAME:      &str = "XR_KHR_visibility_mask";
pub const EXT_PERFORMANCE_SETTINGS_NAME: &str = "XR_EXT_performance_settings";
pub const EXT_THERMAL_QUERY_NAME:        &str = "XR_EXT_thermal_query";
pub const MSFT_SPATIAL_ANCHOR_NAME:      &str = "XR_MSFT_spatial_anchor";

pub const EXT_DEBUG_UTILS:          Gate = Some(EXT_DEBUG_UTILS_NAME);
pub const KHR_VULKAN_ENABLE:        Gate = Some(KHR_VULKAN_ENABLE_NAME);
pub const KHR_OPENGL_ENABLE:        Gate = Some(KHR_OPENGL_ENABLE_NAME);
pub const KHR_D3D11_ENABLE:         Gate = Some(KHR_D3D11_ENABLE_NAME);
pub const KHR_VISIBILITY_MASK:      Gate = Some(KHR_VISIBILITY_MASK_NAME);
pub const EXT_PERFORMANCE_SETTINGS: Gate = Some(EXT_PERFORMANCE_SETTINGS_NAME);
pub const EXT_THERMAL_QUERY:        Gate = Some(EXT_THERMAL_QUERY_NAME);
pub const MSFT_SPATIAL_ANCHOR:      Gate = Some(MSFT_SPATIAL_ANCHOR_NAME);

/// Extensions the loader implements itself, with their extension versions.
pub const LOADER_EXTENSIONS: &[(&str, u32)] = &[
	(EXT_DEBUG_UTILS_NAME, 4)
];

/// The extensions enabled on one instance. Fixed once the instance exists.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExtensionSet(HashSet<String>);

impl ExtensionSet {
	pub fn new() -> Self {
		Self::default()
	}
	
	#[inline]
	pub fn is_enabled(&self, name: &str) -> bool {
		self.0.contains(name)
	}
	
	/// Whether an entry point with the given gate may be forwarded.
	#[inline]
	pub fn permits(&self, gate: Gate) -> bool {
		gate.map_or(true, |name| self.is_enabled(name))
	}
	
	pub fn len(&self) -> usize {
		self.0.len()
	}
	
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
	
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}
}

impl<S: Into<String>> FromIterator<S> for ExtensionSet {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self(iter.into_iter().map(Into::into).collect())
	}
}
