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

//! The active runtime: its library, negotiated `xrGetInstanceProcAddr` and the
//! global functions the loader calls directly.

use {
	crate::{
		error::{LoaderError, Result, ToResult},
		interfaces::*,
		manifest::RuntimeManifest,
		names,
		sys,
		two_call
	},
	std::{ffi::{CStr, CString}, fmt, os::raw::c_char, ptr}
};

pub struct RuntimeInterface {
	name:                                    String,
	get_instance_proc_addr:                  sys::pfn::GetInstanceProcAddr,
	create_instance:                         sys::pfn::CreateInstance,
	enumerate_instance_extension_properties: sys::pfn::EnumerateInstanceExtensionProperties,
	lib:                                     Option<libloading::Library>
}

impl RuntimeInterface {
	/// Wraps an already negotiated runtime.
	///
	/// # Safety
	///
	/// `gipa` must be a valid `xrGetInstanceProcAddr` for the lifetime of the
	/// returned value.
	pub unsafe fn new(name: impl Into<String>, gipa: sys::pfn::GetInstanceProcAddr) -> Result<Self> {
		let name = name.into();
		
		macro_rules! global {
			($name:literal) => {
				resolve_global(gipa, concat!($name, "\0")).ok_or_else(|| LoaderError::Negotiation {
					name: name.clone(),
					reason: concat!("runtime does not provide `", $name, "`").to_string()
				})?
			};
		}
		
		Ok(Self {
			create_instance:                         std::mem::transmute::<sys::pfn::VoidFunction, sys::pfn::CreateInstance>(global!("xrCreateInstance")),
			enumerate_instance_extension_properties: std::mem::transmute::<sys::pfn::VoidFunction, sys::pfn::EnumerateInstanceExtensionProperties>(
				global!("xrEnumerateInstanceExtensionProperties")),
			get_instance_proc_addr:                  gipa,
			lib:                                     None,
			name
		})
	}
	
	/// Opens the runtime library named by `manifest` and negotiates with it.
	pub fn load(manifest: &RuntimeManifest) -> Result<Self> {
		let path = &manifest.library_path;
		let library_error = |source| LoaderError::Library { path: path.clone(), source };
		let negotiation_error = |reason: String| LoaderError::Negotiation { name: manifest.name(), reason };
		
		unsafe {
			let lib = libloading::Library::new(path).map_err(library_error)?;
			let symbol = CString::new(manifest.negotiate_function())
				.map_err(|e| negotiation_error(e.to_string()))?;
			let negotiate: FnNegotiateLoaderRuntimeInterface = *lib.get(symbol.as_bytes_with_nul())
				.map_err(library_error)?;
			
			let loader_info = NegotiateLoaderInfo::runtime();
			let mut request = NegotiateRuntimeRequest::new();
			negotiate(&loader_info, &mut request).result()
				.map_err(|e| negotiation_error(format!("negotiation returned {}", names::result_to_string(e))))?;
			
			if !loader_info.accepts(request.runtime_interface_version, request.runtime_api_version) {
				let version = request.runtime_api_version;
				return Err(negotiation_error(format!("unsupported interface version {} / api version {}.{}.{}",
					request.runtime_interface_version, version.major(), version.minor(), version.patch())));
			}
			
			let gipa = request.get_instance_proc_addr
				.ok_or_else(|| negotiation_error("no xrGetInstanceProcAddr returned".to_string()))?;
			
			let mut runtime = Self::new(manifest.name(), gipa)?;
			runtime.lib = Some(lib);
			Ok(runtime)
		}
	}
	
	pub fn name(&self) -> &str {
		&self.name
	}
	
	pub fn get_instance_proc_addr(&self) -> sys::pfn::GetInstanceProcAddr {
		self.get_instance_proc_addr
	}
	
	/// # Safety
	///
	/// Same contract as `xrCreateInstance`.
	pub unsafe fn create_instance(&self, info: *const sys::InstanceCreateInfo, instance: *mut sys::Instance) -> sys::Result {
		(self.create_instance)(info, instance)
	}
	
	/// # Safety
	///
	/// Same contract as `xrEnumerateInstanceExtensionProperties`.
	pub unsafe fn enumerate_instance_extension_properties(
		&self,
		layer_name: *const c_char,
		capacity:   u32,
		count:      *mut u32,
		properties: *mut sys::ExtensionProperties
	) -> sys::Result {
		(self.enumerate_instance_extension_properties)(layer_name, capacity, count, properties)
	}
	
	/// Names and versions of every extension the runtime offers.
	pub fn instance_extensions(&self) -> Result<Vec<(String, u32)>> {
		let empty = sys::ExtensionProperties {
			ty:                sys::ExtensionProperties::TYPE,
			next:              ptr::null_mut(),
			extension_name:    [0; sys::MAX_EXTENSION_NAME_SIZE],
			extension_version: 0
		};
		
		let properties = unsafe { two_call::enumerate(|capacity, count, buffer|
			self.enumerate_instance_extension_properties(ptr::null(), capacity, count, buffer), empty) }?;
		
		Ok(properties.iter()
			.map(|p| (unsafe { CStr::from_ptr(p.extension_name.as_ptr()) }.to_string_lossy().into_owned(), p.extension_version))
			.collect())
	}
}

unsafe fn resolve_global(gipa: sys::pfn::GetInstanceProcAddr, name: &str) -> Option<sys::pfn::VoidFunction> {
	let mut function = None;
	gipa(sys::Instance::NULL, name.as_ptr() as *const c_char, &mut function).result().ok()?;
	function
}

impl fmt::Debug for RuntimeInterface {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("RuntimeInterface")
			.field("name", &self.name)
			.field("loaded", &self.lib.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	
	unsafe extern "system" fn create_instance(_info: *const sys::InstanceCreateInfo, instance: *mut sys::Instance) -> sys::Result {
		*instance = sys::Instance::from_raw(7);
		sys::Result::SUCCESS
	}
	
	unsafe extern "system" fn enumerate_extensions(
		_layer:     *const c_char,
		capacity:   u32,
		count:      *mut u32,
		properties: *mut sys::ExtensionProperties
	) -> sys::Result {
		two_call::fill_with(2, capacity, count, properties, |i, p| {
			let name = ["XR_KHR_vulkan_enable", "XR_EXT_debug_utils"][i];
			names::write_c_str(p.extension_name.as_mut_ptr(), p.extension_name.len(), name);
			p.extension_version = i as u32 + 1;
		})
	}
	
	unsafe extern "system" fn gipa(_instance: sys::Instance, name: *const c_char, function: *mut Option<sys::pfn::VoidFunction>) -> sys::Result {
		*function = match CStr::from_ptr(name).to_bytes() {
			b"xrCreateInstance" => Some(std::mem::transmute::<sys::pfn::CreateInstance, sys::pfn::VoidFunction>(create_instance)),
			b"xrEnumerateInstanceExtensionProperties" => Some(std::mem::transmute::<
				sys::pfn::EnumerateInstanceExtensionProperties, sys::pfn::VoidFunction>(enumerate_extensions)),
			_ => None
		};
		match *function {
			Some(_) => sys::Result::SUCCESS,
			None => sys::Result::ERROR_FUNCTION_UNSUPPORTED
		}
	}
	
	unsafe extern "system" fn empty_gipa(_instance: sys::Instance, _name: *const c_char, function: *mut Option<sys::pfn::VoidFunction>) -> sys::Result {
		*function = None;
		sys::Result::ERROR_FUNCTION_UNSUPPORTED
	}
	
	#[test]
	fn resolves_globals_and_lists_extensions() {
		let runtime = unsafe { RuntimeInterface::new("fake", gipa) }.unwrap();
		assert_eq!(runtime.name(), "fake");
		assert_eq!(runtime.instance_extensions().unwrap(), vec![
			("XR_KHR_vulkan_enable".to_string(), 1),
			("XR_EXT_debug_utils".to_string(), 2)
		]);
		
		let mut instance = sys::Instance::NULL;
		assert_eq!(unsafe { runtime.create_instance(ptr::null(), &mut instance) }, sys::Result::SUCCESS);
		assert_eq!(instance.into_raw(), 7);
	}
	
	#[test]
	fn missing_globals_fail_negotiation() {
		let err = unsafe { RuntimeInterface::new("empty", empty_gipa) }.unwrap_err();
		assert!(matches!(err, LoaderError::Negotiation { .. }));
		assert_eq!(err.result(), sys::Result::ERROR_RUNTIME_UNAVAILABLE);
	}
	
	#[test]
	fn missing_libraries_are_reported() {
		let manifest = RuntimeManifest {
			path:         "runtime.json".into(),
			library_path: "/nonexistent/libxrloader_missing_runtime.so".into(),
			name:         None,
			functions:    Default::default()
		};
		assert!(matches!(RuntimeInterface::load(&manifest), Err(LoaderError::Library { .. })));
	}
}
