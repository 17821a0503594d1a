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

//! Structures of the loader <-> runtime and loader <-> api layer interfaces.

use {crate::sys, std::{mem, os::raw::{c_char, c_void}, ptr}};

pub const CURRENT_LOADER_API_LAYER_VERSION: u32 = 1;
pub const CURRENT_LOADER_RUNTIME_VERSION:   u32 = 1;

pub const LOADER_INFO_STRUCT_VERSION:           u32 = 1;
pub const API_LAYER_INFO_STRUCT_VERSION:        u32 = 1;
pub const RUNTIME_INFO_STRUCT_VERSION:          u32 = 1;
pub const API_LAYER_CREATE_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_NEXT_INFO_STRUCT_VERSION:   u32 = 1;

pub const API_LAYER_MAX_SETTINGS_PATH_SIZE: usize = 512;

pub const MIN_API_VERSION: sys::Version = sys::Version::new(1, 0, 0);
pub const MAX_API_VERSION: sys::Version = sys::Version::new(1, 0x3ff, 0xfff);

/// `XrLoaderInterfaceStructs`
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct LoaderInterfaceStruct(u32);

impl LoaderInterfaceStruct {
	pub const UNINITIALIZED:         Self = Self(0);
	pub const LOADER_INFO:           Self = Self(1);
	pub const API_LAYER_REQUEST:     Self = Self(2);
	pub const RUNTIME_REQUEST:       Self = Self(3);
	pub const API_LAYER_CREATE_INFO: Self = Self(4);
	pub const API_LAYER_NEXT_INFO:   Self = Self(5);
}

pub type FnCreateApiLayerInstance = unsafe extern "system" fn(
	info:           *const sys::InstanceCreateInfo,
	api_layer_info: *const ApiLayerCreateInfo,
	instance:       *mut sys::Instance
) -> sys::Result;

pub type FnNegotiateLoaderRuntimeInterface = unsafe extern "system" fn(
	loader_info:     *const NegotiateLoaderInfo,
	runtime_request: *mut NegotiateRuntimeRequest
) -> sys::Result;

pub type FnNegotiateLoaderApiLayerInterface = unsafe extern "system" fn(
	loader_info:       *const NegotiateLoaderInfo,
	api_layer_name:    *const c_char,
	api_layer_request: *mut NegotiateApiLayerRequest
) -> sys::Result;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct NegotiateLoaderInfo {
	pub ty:                    LoaderInterfaceStruct,
	pub struct_version:        u32,
	pub struct_size:           usize,
	pub min_interface_version: u32,
	pub max_interface_version: u32,
	pub min_api_version:       sys::Version,
	pub max_api_version:       sys::Version
}

impl NegotiateLoaderInfo {
	pub fn runtime() -> Self {
		Self::new(CURRENT_LOADER_RUNTIME_VERSION)
	}
	
	pub fn api_layer() -> Self {
		Self::new(CURRENT_LOADER_API_LAYER_VERSION)
	}
	
	fn new(interface_version: u32) -> Self {
		Self {
			ty:                    LoaderInterfaceStruct::LOADER_INFO,
			struct_version:        LOADER_INFO_STRUCT_VERSION,
			struct_size:           mem::size_of::<Self>(),
			min_interface_version: 1,
			max_interface_version: interface_version,
			min_api_version:       MIN_API_VERSION,
			max_api_version:       MAX_API_VERSION
		}
	}
	
	/// Whether `version` was offered by this info.
	pub fn accepts(&self, interface_version: u32, api_version: sys::Version) -> bool {
		(self.min_interface_version..=self.max_interface_version).contains(&interface_version)
			&& api_version.major() == self.min_api_version.major()
	}
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct NegotiateRuntimeRequest {
	pub ty:                        LoaderInterfaceStruct,
	pub struct_version:            u32,
	pub struct_size:               usize,
	pub runtime_interface_version: u32,
	pub runtime_api_version:       sys::Version,
	pub get_instance_proc_addr:    Option<sys::pfn::GetInstanceProcAddr>
}

impl NegotiateRuntimeRequest {
	pub fn new() -> Self {
		Self {
			ty:                        LoaderInterfaceStruct::RUNTIME_REQUEST,
			struct_version:            RUNTIME_INFO_STRUCT_VERSION,
			struct_size:               mem::size_of::<Self>(),
			runtime_interface_version: 0,
			runtime_api_version:       sys::Version::from_raw(0),
			get_instance_proc_addr:    None
		}
	}
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct NegotiateApiLayerRequest {
	pub ty:                        LoaderInterfaceStruct,
	pub struct_version:            u32,
	pub struct_size:               usize,
	pub layer_interface_version:   u32,
	pub layer_api_version:         sys::Version,
	pub get_instance_proc_addr:    Option<sys::pfn::GetInstanceProcAddr>,
	pub create_api_layer_instance: Option<FnCreateApiLayerInstance>
}

impl NegotiateApiLayerRequest {
	pub fn new() -> Self {
		Self {
			ty:                        LoaderInterfaceStruct::API_LAYER_REQUEST,
			struct_version:            API_LAYER_INFO_STRUCT_VERSION,
			struct_size:               mem::size_of::<Self>(),
			layer_interface_version:   0,
			layer_api_version:         sys::Version::from_raw(0),
			get_instance_proc_addr:    None,
			create_api_layer_instance: None
		}
	}
}

/// One link of the api layer chain. The last link names the loader's
/// terminators.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ApiLayerNextInfo {
	pub ty:                             LoaderInterfaceStruct,
	pub struct_version:                 u32,
	pub struct_size:                    usize,
	pub layer_name:                     [c_char; sys::MAX_API_LAYER_NAME_SIZE],
	pub next_get_instance_proc_addr:    sys::pfn::GetInstanceProcAddr,
	pub next_create_api_layer_instance: FnCreateApiLayerInstance,
	pub next:                           *mut ApiLayerNextInfo
}

impl ApiLayerNextInfo {
	pub fn new(layer_name: &str, gipa: sys::pfn::GetInstanceProcAddr, create: FnCreateApiLayerInstance, next: *mut Self) -> Self {
		let mut info = Self {
			ty:                             LoaderInterfaceStruct::API_LAYER_NEXT_INFO,
			struct_version:                 API_LAYER_NEXT_INFO_STRUCT_VERSION,
			struct_size:                    mem::size_of::<Self>(),
			layer_name:                     [0; sys::MAX_API_LAYER_NAME_SIZE],
			next_get_instance_proc_addr:    gipa,
			next_create_api_layer_instance: create,
			next
		};
		unsafe { crate::names::write_c_str(info.layer_name.as_mut_ptr(), info.layer_name.len(), layer_name) };
		info
	}
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ApiLayerCreateInfo {
	pub ty:                     LoaderInterfaceStruct,
	pub struct_version:         u32,
	pub struct_size:            usize,
	pub loader_instance:        *const c_void,
	pub settings_file_location: [c_char; API_LAYER_MAX_SETTINGS_PATH_SIZE],
	pub next_info:              *mut ApiLayerNextInfo
}

impl ApiLayerCreateInfo {
	pub fn new(next_info: *mut ApiLayerNextInfo) -> Self {
		Self {
			ty:                     LoaderInterfaceStruct::API_LAYER_CREATE_INFO,
			struct_version:         API_LAYER_CREATE_INFO_STRUCT_VERSION,
			struct_size:            mem::size_of::<Self>(),
			loader_instance:        ptr::null(),
			settings_file_location: [0; API_LAYER_MAX_SETTINGS_PATH_SIZE],
			next_info
		}
	}
}
