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

//! An in-process runtime for driving the exported entry points.

#![allow(dead_code)]

use {
	parking_lot::Mutex,
	xrloader::{*, names, two_call},
	std::{
		ffi::{CStr, CString},
		os::raw::c_char,
		ptr,
		sync::{atomic::{AtomicU64, AtomicUsize, Ordering}, Once}
	}
};

pub const RUNTIME_EXTENSIONS: &[(&str, u32)] = &[
	("XR_KHR_vulkan_enable", 8),
	("XR_KHR_opengl_enable", 10),
	("XR_MSFT_spatial_anchor", 2)
];

/// Names the runtime knows. The loader's own spelling wins for core values.
pub const RUNTIME_RESULT_NAMES: &[(i32, &str)] = &[
	(0,           "XR_SUCCESS_AS_THE_RUNTIME_SPELLS_IT"),
	(-1000999000, "XR_ERROR_VENDOR_THING_FAKE")
];

pub const RUNTIME_STRUCTURE_TYPE_NAMES: &[(i32, &str)] = &[
	(1,          "XR_TYPE_API_LAYER_PROPERTIES_AS_THE_RUNTIME_SPELLS_IT"),
	(1000999000, "XR_TYPE_VENDOR_THING_FAKE")
];

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

pub static DESTROYED_INSTANCES: AtomicUsize = AtomicUsize::new(0);
pub static VULKAN_QUERIES: AtomicUsize = AtomicUsize::new(0);

/// Instances whose `xrDestroyInstance` panics in the runtime.
pub static FAILING_DESTROYS: Mutex<Vec<u64>> = parking_lot::const_mutex(Vec::new());

/// Extension lists the runtime's `xrCreateInstance` was called with.
pub static CREATED_WITH: Mutex<Vec<Vec<String>>> = parking_lot::const_mutex(Vec::new());

/// The runtime side of the fake.
mod runtime {
	use super::*;
	
	fn next_handle() -> u64 {
		NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
	}
	
	unsafe extern "system" fn create_instance(info: *const sys::InstanceCreateInfo, instance: *mut sys::Instance) -> sys::Result {
		let info = &*info;
		let extensions = std::slice::from_raw_parts(info.enabled_extension_names, info.enabled_extension_count as usize)
			.iter()
			.map(|name| CStr::from_ptr(*name).to_string_lossy().into_owned())
			.collect::<Vec<_>>();
		CREATED_WITH.lock().push(extensions);
		*instance = sys::Instance::from_raw(next_handle());
		sys::Result::SUCCESS
	}
	
	unsafe extern "system" fn enumerate_instance_extension_properties(
		_layer_name: *const c_char,
		capacity:    u32,
		count:       *mut u32,
		properties:  *mut sys::ExtensionProperties
	) -> sys::Result {
		two_call::fill_with(RUNTIME_EXTENSIONS.len(), capacity, count, properties, |i, out| {
			let (name, version) = RUNTIME_EXTENSIONS[i];
			names::write_c_str(out.extension_name.as_mut_ptr(), out.extension_name.len(), name);
			out.extension_version = version;
		})
	}
	
	unsafe extern "system-unwind" fn destroy_instance(instance: sys::Instance) -> sys::Result {
		if FAILING_DESTROYS.lock().contains(&instance.into_raw()) {
			panic!("runtime exploded in xrDestroyInstance")
		}
		
		DESTROYED_INSTANCES.fetch_add(1, Ordering::SeqCst);
		sys::Result::SUCCESS
	}
	
	unsafe extern "system-unwind" fn create_session(_instance: sys::Instance, _info: *const sys::SessionCreateInfo, session: *mut sys::Session) -> sys::Result {
		*session = sys::Session::from_raw(next_handle());
		sys::Result::SUCCESS
	}
	
	unsafe extern "system-unwind" fn destroy_session(_session: sys::Session) -> sys::Result {
		sys::Result::SUCCESS
	}
	
	unsafe extern "system-unwind" fn create_reference_space(
		_session: sys::Session,
		_info:    *const sys::ReferenceSpaceCreateInfo,
		space:    *mut sys::Space
	) -> sys::Result {
		*space = sys::Space::from_raw(next_handle());
		sys::Result::SUCCESS
	}
	
	unsafe extern "system-unwind" fn destroy_space(_space: sys::Space) -> sys::Result {
		sys::Result::SUCCESS
	}
	
	unsafe extern "system-unwind" fn create_action_set(
		_instance:  sys::Instance,
		_info:      *const sys::ActionSetCreateInfo,
		action_set: *mut sys::ActionSet
	) -> sys::Result {
		*action_set = sys::ActionSet::from_raw(next_handle());
		sys::Result::SUCCESS
	}
	
	unsafe extern "system-unwind" fn create_action(_action_set: sys::ActionSet, _info: *const sys::ActionCreateInfo, action: *mut sys::Action) -> sys::Result {
		*action = sys::Action::from_raw(next_handle());
		sys::Result::SUCCESS
	}
	
	unsafe extern "system-unwind" fn poll_event(_instance: sys::Instance, _event: *mut sys::EventDataBuffer) -> sys::Result {
		sys::Result::EVENT_UNAVAILABLE
	}
	
	unsafe extern "system-unwind" fn get_vulkan_graphics_requirements(
		_instance:    sys::Instance,
		_system_id:   sys::SystemId,
		requirements: *mut sys::GraphicsRequirementsVulkanKHR
	) -> sys::Result {
		VULKAN_QUERIES.fetch_add(1, Ordering::SeqCst);
		(*requirements).min_api_version_supported = sys::Version::new(1, 1, 0);
		(*requirements).max_api_version_supported = sys::Version::new(1, 3, 0);
		sys::Result::SUCCESS
	}
	
	unsafe extern "system-unwind" fn result_to_string(_instance: sys::Instance, value: sys::Result, buffer: *mut c_char) -> sys::Result {
		spell(RUNTIME_RESULT_NAMES, value.into_raw(), buffer, sys::MAX_RESULT_STRING_SIZE)
	}
	
	unsafe extern "system-unwind" fn structure_type_to_string(_instance: sys::Instance, value: sys::StructureType, buffer: *mut c_char) -> sys::Result {
		spell(RUNTIME_STRUCTURE_TYPE_NAMES, value.into_raw(), buffer, sys::MAX_STRUCTURE_NAME_SIZE)
	}
	
	unsafe fn spell(table: &[(i32, &str)], value: i32, buffer: *mut c_char, capacity: usize) -> sys::Result {
		match table.iter().find(|(raw, _)| *raw == value) {
			Some((_, name)) => {
				names::write_c_str(buffer, capacity, name);
				sys::Result::SUCCESS
			}
			None => sys::Result::ERROR_VALIDATION_FAILURE
		}
	}
	
	/// Faults the runtime raises on purpose.
	unsafe extern "system-unwind" fn request_exit_session(_session: sys::Session) -> sys::Result {
		panic!("runtime exploded in xrRequestExitSession")
	}
	
	unsafe extern "system-unwind" fn create_swapchain(
		_session:   sys::Session,
		_info:      *const sys::SwapchainCreateInfo,
		_swapchain: *mut sys::Swapchain
	) -> sys::Result {
		panic!("runtime exploded in xrCreateSwapchain")
	}
	
	unsafe extern "system-unwind" fn create_action_space(
		_session: sys::Session,
		_info:    *const sys::ActionSpaceCreateInfo,
		_space:   *mut sys::Space
	) -> sys::Result {
		std::panic::panic_any(LoaderError::OutOfMemory)
	}
	
	macro_rules! pfn {
		($f:expr) => { Some(std::mem::transmute::<*const (), sys::pfn::VoidFunction>($f as *const ())) };
	}
	
	pub(super) unsafe extern "system" fn get_instance_proc_addr(
		_instance: sys::Instance,
		name:      *const c_char,
		function:  *mut Option<sys::pfn::VoidFunction>
	) -> sys::Result {
		*function = match CStr::from_ptr(name).to_bytes() {
			b"xrGetInstanceProcAddr"                  => pfn!(get_instance_proc_addr),
			b"xrCreateInstance"                       => pfn!(create_instance),
			b"xrEnumerateInstanceExtensionProperties" => pfn!(enumerate_instance_extension_properties),
			b"xrDestroyInstance"                      => pfn!(destroy_instance),
			b"xrPollEvent"                            => pfn!(poll_event),
			b"xrResultToString"                       => pfn!(result_to_string),
			b"xrStructureTypeToString"                => pfn!(structure_type_to_string),
			b"xrCreateSession"                        => pfn!(create_session),
			b"xrDestroySession"                       => pfn!(destroy_session),
			b"xrRequestExitSession"                   => pfn!(request_exit_session),
			b"xrCreateReferenceSpace"                 => pfn!(create_reference_space),
			b"xrCreateActionSpace"                    => pfn!(create_action_space),
			b"xrDestroySpace"                         => pfn!(destroy_space),
			b"xrCreateSwapchain"                      => pfn!(create_swapchain),
			b"xrCreateActionSet"                      => pfn!(create_action_set),
			b"xrCreateAction"                         => pfn!(create_action),
			b"xrGetVulkanGraphicsRequirementsKHR"     => pfn!(get_vulkan_graphics_requirements),
			_ => None
		};
		
		match *function {
			Some(_) => sys::Result::SUCCESS,
			None => sys::Result::ERROR_FUNCTION_UNSUPPORTED
		}
	}
}

/// Installs the fake runtime into the global loader, once per test binary.
pub fn install() -> &'static Loader {
	static INSTALL: Once = Once::new();
	INSTALL.call_once(|| {
		let runtime = unsafe { RuntimeInterface::new("fake runtime", runtime::get_instance_proc_addr) }
			.expect("fake runtime provides its globals");
		Loader::global().install_runtime(runtime);
	});
	Loader::global()
}

/// Owns the strings an `XrInstanceCreateInfo` points at.
pub struct CreateInfo {
	_extensions:    Vec<CString>,
	_layers:        Vec<CString>,
	extension_ptrs: Vec<*const c_char>,
	layer_ptrs:     Vec<*const c_char>,
	pub info:       sys::InstanceCreateInfo
}

impl CreateInfo {
	pub fn new(extensions: &[&str], layers: &[&str]) -> Box<Self> {
		let extensions = extensions.iter().map(|s| CString::new(*s).unwrap()).collect::<Vec<_>>();
		let layers = layers.iter().map(|s| CString::new(*s).unwrap()).collect::<Vec<_>>();
		let extension_ptrs = extensions.iter().map(|s| s.as_ptr()).collect::<Vec<_>>();
		let layer_ptrs = layers.iter().map(|s| s.as_ptr()).collect::<Vec<_>>();
		
		let mut application_info: sys::ApplicationInfo = unsafe { std::mem::zeroed() };
		unsafe { names::write_c_str(application_info.application_name.as_mut_ptr(), application_info.application_name.len(), "xrloader tests") };
		application_info.api_version = sys::Version::new(1, 0, 0);
		
		let info = sys::InstanceCreateInfo {
			ty:                      sys::InstanceCreateInfo::TYPE,
			next:                    ptr::null(),
			create_flags:            sys::InstanceCreateFlags::EMPTY,
			application_info,
			enabled_api_layer_count: layer_ptrs.len() as u32,
			enabled_api_layer_names: layer_ptrs.as_ptr(),
			enabled_extension_count: extension_ptrs.len() as u32,
			enabled_extension_names: extension_ptrs.as_ptr()
		};
		
		Box::new(Self { _extensions: extensions, _layers: layers, extension_ptrs, layer_ptrs, info })
	}
}

pub fn create_instance(extensions: &[&str]) -> (sys::Result, sys::Instance) {
	let info = CreateInfo::new(extensions, &[]);
	let mut instance = sys::Instance::NULL;
	let result = unsafe { loader::xrCreateInstance(&info.info, &mut instance) };
	(result, instance)
}

pub fn create_session(instance: sys::Instance) -> (sys::Result, sys::Session) {
	let info = sys::SessionCreateInfo {
		ty:           sys::SessionCreateInfo::TYPE,
		next:         ptr::null(),
		create_flags: sys::SessionCreateFlags::EMPTY,
		system_id:    sys::SystemId::from_raw(1)
	};
	let mut session = sys::Session::NULL;
	let result = unsafe { commands::xrCreateSession(instance, &info, &mut session) };
	(result, session)
}

pub fn create_reference_space(session: sys::Session) -> (sys::Result, sys::Space) {
	let info = sys::ReferenceSpaceCreateInfo {
		ty:                      sys::ReferenceSpaceCreateInfo::TYPE,
		next:                    ptr::null(),
		reference_space_type:    sys::ReferenceSpaceType::LOCAL,
		pose_in_reference_space: sys::Posef {
			orientation: sys::Quaternionf { x: 0.0, y: 0.0, z: 0.0, w: 1.0 },
			position:    sys::Vector3f { x: 0.0, y: 0.0, z: 0.0 }
		}
	};
	let mut space = sys::Space::NULL;
	let result = unsafe { commands::xrCreateReferenceSpace(session, &info, &mut space) };
	(result, space)
}

/// Collects every record the global logger delivers.
pub struct Capture {
	id:      u64,
	records: Mutex<Vec<LogRecord>>
}

impl Capture {
	pub fn install(loader: &Loader) -> std::sync::Arc<Self> {
		let capture = std::sync::Arc::new(Self { id: logger::next_loader_id(), records: Mutex::new(Vec::new()) });
		loader.logger().add_recorder(capture.clone());
		capture
	}
	
	/// Records that mention `handle`.
	pub fn about(&self, handle: u64) -> Vec<LogRecord> {
		self.records.lock().iter()
			.filter(|r| r.objects.iter().any(|o| o.handle == handle))
			.cloned()
			.collect()
	}
	
	pub fn with_message_id(&self, message_id: &str) -> Vec<LogRecord> {
		self.records.lock().iter()
			.filter(|r| r.message_id == message_id)
			.cloned()
			.collect()
	}
	
	pub fn uninstall(&self, loader: &Loader) {
		loader.logger().remove_recorder(self.id);
	}
}

impl LogRecorder for Capture {
	fn id(&self) -> u64 {
		self.id
	}
	
	fn accepts(&self, _severity: Severity, _kind: MessageKind) -> bool {
		true
	}
	
	fn record(&self, record: &LogRecord) {
		self.records.lock().push(record.clone());
	}
}
