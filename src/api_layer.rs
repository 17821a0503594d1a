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

//! Explicit api layers.

use {
	crate::{
		error::{LoaderError, Result, ToResult},
		interfaces::*,
		manifest::ApiLayerManifest,
		names,
		sys
	},
	std::{ffi::CString, fmt}
};

/// What `xrEnumerateApiLayerProperties` reports for a layer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiLayerProperties {
	pub name:          String,
	pub description:   String,
	pub spec_version:  sys::Version,
	pub layer_version: u32,
	pub extensions:    Vec<(String, u32)>
}

impl From<&ApiLayerManifest> for ApiLayerProperties {
	fn from(manifest: &ApiLayerManifest) -> Self {
		let (major, minor) = manifest.api_version;
		Self {
			name:          manifest.name.clone(),
			description:   manifest.description.clone(),
			spec_version:  sys::Version::new(major as u16, minor as u16, 0),
			layer_version: manifest.implementation_version,
			extensions:    manifest.instance_extensions.iter()
				.map(|ext| (ext.name.clone(), ext.extension_version))
				.collect()
		}
	}
}

impl ApiLayerProperties {
	/// # Safety
	///
	/// `out` must point to a writable `XrApiLayerProperties`.
	pub unsafe fn write(&self, out: &mut sys::ApiLayerProperties) {
		names::write_c_str(out.layer_name.as_mut_ptr(), out.layer_name.len(), &self.name);
		names::write_c_str(out.description.as_mut_ptr(), out.description.len(), &self.description);
		out.spec_version = self.spec_version;
		out.layer_version = self.layer_version;
	}
}

pub struct ApiLayerInterface {
	properties:                ApiLayerProperties,
	get_instance_proc_addr:    sys::pfn::GetInstanceProcAddr,
	create_api_layer_instance: FnCreateApiLayerInstance,
	lib:                       Option<libloading::Library>
}

impl ApiLayerInterface {
	pub fn new(properties: ApiLayerProperties, gipa: sys::pfn::GetInstanceProcAddr, create: FnCreateApiLayerInstance) -> Self {
		Self { properties, get_instance_proc_addr: gipa, create_api_layer_instance: create, lib: None }
	}
	
	/// Opens the layer library named by `manifest` and negotiates with it.
	pub fn load(manifest: &ApiLayerManifest) -> Result<Self> {
		let path = &manifest.library_path;
		let library_error = |source| LoaderError::Library { path: path.clone(), source };
		let negotiation_error = |reason: String| LoaderError::Negotiation { name: manifest.name.clone(), reason };
		
		unsafe {
			let lib = libloading::Library::new(path).map_err(library_error)?;
			let symbol = CString::new(manifest.negotiate_function())
				.map_err(|e| negotiation_error(e.to_string()))?;
			let negotiate: FnNegotiateLoaderApiLayerInterface = *lib.get(symbol.as_bytes_with_nul())
				.map_err(library_error)?;
			let layer_name = CString::new(manifest.name.as_str())
				.map_err(|e| negotiation_error(e.to_string()))?;
			
			let loader_info = NegotiateLoaderInfo::api_layer();
			let mut request = NegotiateApiLayerRequest::new();
			negotiate(&loader_info, layer_name.as_ptr(), &mut request).result()
				.map_err(|e| negotiation_error(format!("negotiation returned {}", names::result_to_string(e))))?;
			
			if !loader_info.accepts(request.layer_interface_version, request.layer_api_version) {
				return Err(negotiation_error(format!("unsupported interface version {}", request.layer_interface_version)));
			}
			
			let (Some(gipa), Some(create)) = (request.get_instance_proc_addr, request.create_api_layer_instance) else {
				return Err(negotiation_error("incomplete negotiation request".to_string()));
			};
			
			let mut layer = Self::new(ApiLayerProperties::from(manifest), gipa, create);
			layer.lib = Some(lib);
			Ok(layer)
		}
	}
	
	pub fn name(&self) -> &str {
		&self.properties.name
	}
	
	pub fn properties(&self) -> &ApiLayerProperties {
		&self.properties
	}
	
	pub fn get_instance_proc_addr(&self) -> sys::pfn::GetInstanceProcAddr {
		self.get_instance_proc_addr
	}
	
	pub fn create_api_layer_instance(&self) -> FnCreateApiLayerInstance {
		self.create_api_layer_instance
	}
}

impl fmt::Debug for ApiLayerInterface {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("ApiLayerInterface")
			.field("properties", &self.properties)
			.field("loaded", &self.lib.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use {super::*, crate::manifest::ManifestExtension, std::{collections::HashMap, ffi::CStr, path::PathBuf}};
	
	fn manifest() -> ApiLayerManifest {
		ApiLayerManifest {
			path:                   PathBuf::from("layer.json"),
			name:                   "XR_APILAYER_test_trace".to_string(),
			library_path:           PathBuf::from("/nonexistent/libxrloader_missing_layer.so"),
			api_version:            (1, 0),
			implementation_version: 5,
			description:            "traces calls".to_string(),
			functions:              HashMap::new(),
			instance_extensions:    vec![ManifestExtension { name: "XR_EXT_trace".to_string(), extension_version: 1 }],
			disable_environment:    None
		}
	}
	
	#[test]
	fn properties_from_manifest() {
		let properties = ApiLayerProperties::from(&manifest());
		assert_eq!(properties.spec_version, sys::Version::new(1, 0, 0));
		assert_eq!(properties.layer_version, 5);
		assert_eq!(properties.extensions, vec![("XR_EXT_trace".to_string(), 1)]);
		
		let mut out = sys::ApiLayerProperties {
			ty:            sys::ApiLayerProperties::TYPE,
			next:          std::ptr::null_mut(),
			layer_name:    [0; sys::MAX_API_LAYER_NAME_SIZE],
			spec_version:  sys::Version::from_raw(0),
			layer_version: 0,
			description:   [0; sys::MAX_API_LAYER_DESCRIPTION_SIZE]
		};
		unsafe { properties.write(&mut out) };
		assert_eq!(unsafe { CStr::from_ptr(out.layer_name.as_ptr()) }.to_str().unwrap(), "XR_APILAYER_test_trace");
		assert_eq!(unsafe { CStr::from_ptr(out.description.as_ptr()) }.to_str().unwrap(), "traces calls");
		assert_eq!(out.layer_version, 5);
	}
	
	#[test]
	fn missing_libraries_are_reported() {
		let err = ApiLayerInterface::load(&manifest()).unwrap_err();
		assert!(matches!(err, LoaderError::Library { .. }));
	}
}
