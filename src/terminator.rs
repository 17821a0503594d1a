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

//! The bottom of every call chain.
//!
//! Most commands go straight to the runtime. The ones listed in
//! [`INTERCEPTED`] end here instead, because the loader has work of its own to
//! do for them or implements them itself when the runtime does not.

use {
	crate::{
		commands::entry,
		error::Result,
		extension::LOADER_EXTENSIONS,
		interfaces::ApiLayerCreateInfo,
		loader::Loader,
		logger::{self, DebugUtilsRecorder, LogRecord, LogRecorder},
		names,
		sys,
		trampoline::{self, EntryPoint}
	},
	std::{ffi::CStr, mem::transmute, os::raw::c_char, slice, sync::Arc}
};

/// Commands the terminator `xrGetInstanceProcAddr` hands out itself.
pub const INTERCEPTED: &[&str] = &[
	"xrGetInstanceProcAddr",
	"xrDestroyInstance",
	"xrResultToString",
	"xrStructureTypeToString",
	"xrCreateDebugUtilsMessengerEXT",
	"xrDestroyDebugUtilsMessengerEXT",
	"xrSubmitDebugUtilsMessageEXT",
	"xrSetDebugUtilsObjectNameEXT",
	"xrSessionBeginDebugUtilsLabelRegionEXT",
	"xrSessionEndDebugUtilsLabelRegionEXT",
	"xrSessionInsertDebugUtilsLabelEXT"
];

macro_rules! void {
	($f:expr, $ty:ty) => { unsafe { transmute::<$ty, sys::pfn::VoidFunction>($f) } };
}

/// The terminator for `name`, if the loader intercepts it.
pub fn intercept(name: &CStr) -> Option<sys::pfn::VoidFunction> {
	Some(match name.to_bytes() {
		b"xrGetInstanceProcAddr"                  => void!(get_instance_proc_addr, sys::pfn::GetInstanceProcAddr),
		b"xrDestroyInstance"                      => void!(destroy_instance, sys::pfn::DestroyInstance),
		b"xrResultToString"                       => void!(result_to_string, sys::pfn::ResultToString),
		b"xrStructureTypeToString"                => void!(structure_type_to_string, sys::pfn::StructureTypeToString),
		b"xrCreateDebugUtilsMessengerEXT"         => void!(create_debug_utils_messenger, sys::pfn::CreateDebugUtilsMessengerEXT),
		b"xrDestroyDebugUtilsMessengerEXT"        => void!(destroy_debug_utils_messenger, sys::pfn::DestroyDebugUtilsMessengerEXT),
		b"xrSubmitDebugUtilsMessageEXT"           => void!(submit_debug_utils_message, sys::pfn::SubmitDebugUtilsMessageEXT),
		b"xrSetDebugUtilsObjectNameEXT"           => void!(set_debug_utils_object_name, sys::pfn::SetDebugUtilsObjectNameEXT),
		b"xrSessionBeginDebugUtilsLabelRegionEXT" => void!(session_begin_label_region, sys::pfn::SessionBeginDebugUtilsLabelRegionEXT),
		b"xrSessionEndDebugUtilsLabelRegionEXT"   => void!(session_end_label_region, sys::pfn::SessionEndDebugUtilsLabelRegionEXT),
		b"xrSessionInsertDebugUtilsLabelEXT"      => void!(session_insert_label, sys::pfn::SessionInsertDebugUtilsLabelEXT),
		_ => return None
	})
}

pub fn is_intercepted(name: &CStr) -> bool {
	intercept(name).is_some()
}

/// Runs a terminator body on behalf of the instance owning `handle`.
fn terminate<H: crate::handle::LoaderHandle>(
	entry:  &EntryPoint,
	handle: H,
	body:   impl FnOnce(&Loader, &Arc<crate::instance::LoaderInstance>) -> Result<sys::Result>
) -> sys::Result {
	let loader = Loader::global();
	trampoline::guard(loader, entry.name, entry.policy, || match loader.registry().lookup(handle) {
		Some(instance) => body(loader, &instance),
		None => Ok(trampoline::invalid_handle(loader, entry, handle))
	})
}

pub unsafe extern "system" fn get_instance_proc_addr(
	instance: sys::Instance,
	name:     *const c_char,
	function: *mut Option<sys::pfn::VoidFunction>
) -> sys::Result {
	let loader = Loader::global();
	trampoline::guard(loader, "xrGetInstanceProcAddr", entry::xrGetInstanceProcAddr.policy, || {
		if name.is_null() || function.is_null() {
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		if let Some(f) = intercept(CStr::from_ptr(name)) {
			*function = Some(f);
			return Ok(sys::Result::SUCCESS);
		}
		
		Ok((loader.runtime()?.get_instance_proc_addr())(instance, name, function))
	})
}

/// Calls the runtime's `xrCreateInstance`, leaving out loader-implemented
/// extensions the runtime does not know about.
pub unsafe extern "system" fn create_api_layer_instance(
	info:            *const sys::InstanceCreateInfo,
	_api_layer_info: *const ApiLayerCreateInfo,
	instance:        *mut sys::Instance
) -> sys::Result {
	let loader = Loader::global();
	trampoline::guard(loader, "xrCreateApiLayerInstance", trampoline::FaultPolicy::CreationStyle, || {
		if info.is_null() || instance.is_null() {
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		let runtime = loader.runtime()?;
		let offered = runtime.instance_extensions()?;
		let requested = c_str_array((*info).enabled_extension_names, (*info).enabled_extension_count);
		
		let mut enabled = Vec::new();
		enabled.try_reserve(requested.len())?;
		for ptr in requested {
			let name = CStr::from_ptr(*ptr).to_string_lossy();
			match runtime_knows(&name, &offered) {
				true => enabled.push(*ptr),
				false => loader.logger().log_verbose_message("xrCreateApiLayerInstance",
					&format!("{} is implemented by the loader, not passing it to the runtime", name))
			}
		}
		
		let mut runtime_info = *info;
		runtime_info.enabled_extension_count = enabled.len() as u32;
		runtime_info.enabled_extension_names = enabled.as_ptr();
		
		Ok(runtime.create_instance(&runtime_info, instance))
	})
}

pub unsafe extern "system" fn destroy_instance(instance: sys::Instance) -> sys::Result {
	terminate(&entry::xrDestroyInstance, instance, |_, inst| Ok(match inst.runtime().xrDestroyInstance {
		Some(destroy) => destroy(instance),
		None => sys::Result::SUCCESS
	}))
}

pub unsafe extern "system" fn result_to_string(instance: sys::Instance, value: sys::Result, buffer: *mut c_char) -> sys::Result {
	terminate(&entry::xrResultToString, instance, |_, inst| {
		if buffer.is_null() {
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		if let Some(name) = names::result_name(value) {
			names::write_c_str(buffer, sys::MAX_RESULT_STRING_SIZE, name);
			return Ok(sys::Result::SUCCESS);
		}
		
		if let Some(runtime) = inst.runtime().xrResultToString {
			if runtime(instance, value, buffer) == sys::Result::SUCCESS {
				return Ok(sys::Result::SUCCESS);
			}
		}
		
		names::write_c_str(buffer, sys::MAX_RESULT_STRING_SIZE, &names::result_to_string(value));
		Ok(sys::Result::SUCCESS)
	})
}

pub unsafe extern "system" fn structure_type_to_string(instance: sys::Instance, value: sys::StructureType, buffer: *mut c_char) -> sys::Result {
	terminate(&entry::xrStructureTypeToString, instance, |_, inst| {
		if buffer.is_null() {
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		if let Some(name) = names::structure_type_name(value) {
			names::write_c_str(buffer, sys::MAX_STRUCTURE_NAME_SIZE, name);
			return Ok(sys::Result::SUCCESS);
		}
		
		if let Some(runtime) = inst.runtime().xrStructureTypeToString {
			if runtime(instance, value, buffer) == sys::Result::SUCCESS {
				return Ok(sys::Result::SUCCESS);
			}
		}
		
		names::write_c_str(buffer, sys::MAX_STRUCTURE_NAME_SIZE, &names::structure_type_to_string(value));
		Ok(sys::Result::SUCCESS)
	})
}

pub unsafe extern "system" fn create_debug_utils_messenger(
	instance:    sys::Instance,
	create_info: *const sys::DebugUtilsMessengerCreateInfoEXT,
	messenger:   *mut sys::DebugUtilsMessengerEXT
) -> sys::Result {
	terminate(&entry::xrCreateDebugUtilsMessengerEXT, instance, |loader, inst| {
		if create_info.is_null() || messenger.is_null() {
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		let runtime_owned = inst.runtime_debug_utils() && inst.runtime().xrCreateDebugUtilsMessengerEXT.is_some();
		let handle = match inst.runtime().xrCreateDebugUtilsMessengerEXT {
			Some(create) if runtime_owned => {
				let result = create(instance, create_info, messenger);
				if result.into_raw() < 0 {
					return Ok(result);
				}
				*messenger
			}
			_ => sys::DebugUtilsMessengerEXT::from_raw(logger::next_loader_id())
		};
		
		let Some(recorder) = DebugUtilsRecorder::new(handle.into_raw(), Some(instance), &*create_info) else {
			loader.logger().log_validation_error_message(
				"VUID-XrDebugUtilsMessengerCreateInfoEXT-userCallback-parameter",
				"xrCreateDebugUtilsMessengerEXT",
				"userCallback must be a valid function pointer",
				&[]
			);
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		};
		
		loader.logger().add_recorder(Arc::new(recorder));
		*messenger = handle;
		Ok(sys::Result::SUCCESS)
	})
}

pub unsafe extern "system" fn destroy_debug_utils_messenger(messenger: sys::DebugUtilsMessengerEXT) -> sys::Result {
	let loader = Loader::global();
	let entry = &entry::xrDestroyDebugUtilsMessengerEXT;
	trampoline::guard(loader, entry.name, entry.policy, || {
		// the trampoline already unregistered the handle, the recorder knows its instance
		let Some(recorder) = loader.logger().remove_recorder(messenger.into_raw()) else {
			return Ok(trampoline::invalid_handle(loader, entry, messenger));
		};
		
		let inst = recorder.instance().and_then(|instance| loader.registry().lookup(instance));
		match inst {
			Some(inst) if inst.runtime_debug_utils() => Ok(match inst.runtime().xrDestroyDebugUtilsMessengerEXT {
				Some(destroy) => destroy(messenger),
				None => sys::Result::SUCCESS
			}),
			_ => Ok(sys::Result::SUCCESS)
		}
	})
}

pub unsafe extern "system" fn submit_debug_utils_message(
	instance:      sys::Instance,
	severity:      sys::DebugUtilsMessageSeverityFlagsEXT,
	types:         sys::DebugUtilsMessageTypeFlagsEXT,
	callback_data: *const sys::DebugUtilsMessengerCallbackDataEXT
) -> sys::Result {
	terminate(&entry::xrSubmitDebugUtilsMessageEXT, instance, |loader, inst| {
		if callback_data.is_null() {
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		match inst.runtime().xrSubmitDebugUtilsMessageEXT {
			Some(submit) if inst.runtime_debug_utils() => Ok(submit(instance, severity, types, callback_data)),
			_ => {
				loader.logger().log_for_instance(instance, LogRecord::from_callback_data(severity, types, &*callback_data));
				Ok(sys::Result::SUCCESS)
			}
		}
	})
}

pub unsafe extern "system" fn set_debug_utils_object_name(
	instance:  sys::Instance,
	name_info: *const sys::DebugUtilsObjectNameInfoEXT
) -> sys::Result {
	terminate(&entry::xrSetDebugUtilsObjectNameEXT, instance, |loader, inst| {
		if name_info.is_null() {
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		let info = &*name_info;
		let name = (!info.object_name.is_null()).then(|| logger::c_str_lossy(info.object_name));
		loader.logger().set_object_name(instance, info.object_type, info.object_handle, name);
		
		match inst.runtime().xrSetDebugUtilsObjectNameEXT {
			Some(set) if inst.runtime_debug_utils() => Ok(set(instance, name_info)),
			_ => Ok(sys::Result::SUCCESS)
		}
	})
}

pub unsafe extern "system" fn session_begin_label_region(session: sys::Session, label_info: *const sys::DebugUtilsLabelEXT) -> sys::Result {
	terminate(&entry::xrSessionBeginDebugUtilsLabelRegionEXT, session, |_, inst| {
		match inst.runtime().xrSessionBeginDebugUtilsLabelRegionEXT {
			Some(begin) if inst.runtime_debug_utils() => Ok(begin(session, label_info)),
			_ => Ok(sys::Result::SUCCESS)
		}
	})
}

pub unsafe extern "system" fn session_end_label_region(session: sys::Session) -> sys::Result {
	terminate(&entry::xrSessionEndDebugUtilsLabelRegionEXT, session, |_, inst| {
		match inst.runtime().xrSessionEndDebugUtilsLabelRegionEXT {
			Some(end) if inst.runtime_debug_utils() => Ok(end(session)),
			_ => Ok(sys::Result::SUCCESS)
		}
	})
}

pub unsafe extern "system" fn session_insert_label(session: sys::Session, label_info: *const sys::DebugUtilsLabelEXT) -> sys::Result {
	terminate(&entry::xrSessionInsertDebugUtilsLabelEXT, session, |_, inst| {
		match inst.runtime().xrSessionInsertDebugUtilsLabelEXT {
			Some(insert) if inst.runtime_debug_utils() => Ok(insert(session, label_info)),
			_ => Ok(sys::Result::SUCCESS)
		}
	})
}

/// # Safety
///
/// `ptr` must be null or point to `count` C strings.
pub unsafe fn c_str_array<'a>(ptr: *const *const c_char, count: u32) -> &'a [*const c_char] {
	match ptr.is_null() || count == 0 {
		true  => &[],
		false => slice::from_raw_parts(ptr, count as usize)
	}
}

/// Whether `name` may be passed to the runtime unchanged.
pub fn runtime_knows(name: &str, runtime_extensions: &[(String, u32)]) -> bool {
	runtime_extensions.iter().any(|(ext, _)| ext == name)
		|| !LOADER_EXTENSIONS.iter().any(|(ext, _)| *ext == name)
}

#[cfg(test)]
mod tests {
	use {super::*, crate::extension};
	
	#[test]
	fn intercepts_exactly_the_listed_commands() {
		for name in INTERCEPTED {
			let name = std::ffi::CString::new(*name).unwrap();
			assert!(is_intercepted(&name), "{:?}", name);
		}
		
		assert!(!is_intercepted(CStr::from_bytes_with_nul(b"xrCreateSession\0").unwrap()));
		assert!(!is_intercepted(CStr::from_bytes_with_nul(b"xrCreateInstance\0").unwrap()));
	}
	
	#[test]
	fn loader_extensions_are_only_stripped_when_unknown() {
		let runtime = vec![("XR_KHR_vulkan_enable".to_string(), 8)];
		assert!(runtime_knows(extension::KHR_VULKAN_ENABLE_NAME, &runtime));
		assert!(!runtime_knows(extension::EXT_DEBUG_UTILS_NAME, &runtime));
		
		let runtime = vec![(extension::EXT_DEBUG_UTILS_NAME.to_string(), 4)];
		assert!(runtime_knows(extension::EXT_DEBUG_UTILS_NAME, &runtime));
	}
}
