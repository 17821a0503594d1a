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

//! The loader service and the entry points that do not dispatch on a handle.

use {
	crate::{
		api_layer::{ApiLayerInterface, ApiLayerProperties},
		commands::entry,
		config::LoaderSettings,
		dispatch::DispatchTable,
		error::{LoaderError, Result},
		extension::{self, ExtensionSet, LOADER_EXTENSIONS},
		instance::LoaderInstance,
		interfaces::{ApiLayerCreateInfo, ApiLayerNextInfo, FnCreateApiLayerInstance},
		logger::{self, DebugUtilsRecorder, LoaderLogger},
		manifest::{ApiLayerManifest, RuntimeManifest},
		names,
		registry::HandleRegistry,
		runtime::RuntimeInterface,
		sys,
		terminator,
		trampoline::{self, FaultPolicy},
		two_call
	},
	once_cell::sync::Lazy,
	parking_lot::RwLock,
	std::{ffi::CStr, mem::transmute, os::raw::c_char, ptr, sync::Arc}
};

static LOADER: Lazy<Loader> = Lazy::new(|| Loader::new(LoaderSettings::from_env()));

/// Owns everything the exported entry points share: the handle registry, the
/// logger, the active runtime and the known api layers.
pub struct Loader {
	settings:   LoaderSettings,
	logger:     LoaderLogger,
	registry:   HandleRegistry<LoaderInstance>,
	runtime:    RwLock<Option<Arc<RuntimeInterface>>>,
	api_layers: RwLock<Vec<Arc<ApiLayerInterface>>>
}

impl Loader {
	pub fn new(settings: LoaderSettings) -> Self {
		Self {
			logger:     LoaderLogger::with_log_level(settings.log_level),
			registry:   HandleRegistry::new(),
			runtime:    RwLock::new(None),
			api_layers: RwLock::new(Vec::new()),
			settings
		}
	}
	
	/// The loader behind the exported `xr*` symbols.
	pub fn global() -> &'static Self {
		&LOADER
	}
	
	pub fn settings(&self) -> &LoaderSettings {
		&self.settings
	}
	
	pub fn logger(&self) -> &LoaderLogger {
		&self.logger
	}
	
	pub fn registry(&self) -> &HandleRegistry<LoaderInstance> {
		&self.registry
	}
	
	/// Makes `runtime` the active runtime, replacing any discovered one.
	/// Existing instances keep the functions they resolved.
	pub fn install_runtime(&self, runtime: RuntimeInterface) -> Option<Arc<RuntimeInterface>> {
		self.runtime.write().replace(Arc::new(runtime))
	}
	
	/// The active runtime, discovering and loading it on first use.
	pub fn runtime(&self) -> Result<Arc<RuntimeInterface>> {
		if let Some(runtime) = &*self.runtime.read() {
			return Ok(runtime.clone());
		}
		
		let mut slot = self.runtime.write();
		if let Some(runtime) = &*slot {
			return Ok(runtime.clone());
		}
		
		let manifest = RuntimeManifest::discover(&self.settings)?;
		let runtime = Arc::new(RuntimeInterface::load(&manifest)?);
		self.logger.log_info_message("xrCreateInstance", &format!(
			"loaded runtime `{}` from `{}`", runtime.name(), manifest.path.display()));
		*slot = Some(runtime.clone());
		Ok(runtime)
	}
	
	/// Makes an already negotiated api layer available to `xrCreateInstance`.
	/// Registered layers shadow discovered layers of the same name.
	pub fn register_api_layer(&self, layer: ApiLayerInterface) {
		let mut layers = self.api_layers.write();
		layers.retain(|l| l.name() != layer.name());
		layers.push(Arc::new(layer));
	}
	
	/// Registered layers followed by discovered ones.
	pub fn api_layer_properties(&self) -> Vec<ApiLayerProperties> {
		let mut properties = self.api_layers.read().iter()
			.map(|layer| layer.properties().clone())
			.collect::<Vec<_>>();
		
		for manifest in ApiLayerManifest::discover(&self.settings, &self.logger) {
			if !properties.iter().any(|p| p.name == manifest.name) {
				properties.push(ApiLayerProperties::from(&manifest));
			}
		}
		
		properties
	}
	
	fn api_layer(&self, name: &str) -> Result<Arc<ApiLayerInterface>> {
		if let Some(layer) = self.api_layers.read().iter().find(|l| l.name() == name) {
			return Ok(layer.clone());
		}
		
		let manifest = ApiLayerManifest::discover(&self.settings, &self.logger)
			.into_iter()
			.find(|m| m.name == name)
			.ok_or_else(|| LoaderError::ApiLayerNotPresent(name.to_string()))?;
		let layer = Arc::new(ApiLayerInterface::load(&manifest)?);
		
		let mut layers = self.api_layers.write();
		match layers.iter().find(|l| l.name() == name) {
			Some(existing) => Ok(existing.clone()),
			None => {
				layers.push(layer.clone());
				Ok(layer)
			}
		}
	}
	
	/// Extensions offered by the runtime and the loader, or by one api layer.
	pub fn instance_extensions(&self, layer_name: Option<&str>) -> Result<Vec<(String, u32)>> {
		if let Some(name) = layer_name {
			return self.api_layer_properties()
				.into_iter()
				.find(|p| p.name == name)
				.map(|p| p.extensions)
				.ok_or_else(|| LoaderError::ApiLayerNotPresent(name.to_string()));
		}
		
		let mut extensions = self.runtime()?.instance_extensions()?;
		for (name, version) in LOADER_EXTENSIONS {
			if !extensions.iter().any(|(ext, _)| ext == name) {
				extensions.push((name.to_string(), *version));
			}
		}
		Ok(extensions)
	}
	
	/// The body of `xrCreateInstance`.
	///
	/// # Safety
	///
	/// Same contract as `xrCreateInstance`.
	pub unsafe fn create_instance(&self, info: *const sys::InstanceCreateInfo, out: *mut sys::Instance) -> Result<sys::Result> {
		if info.is_null() || (*info).ty != sys::InstanceCreateInfo::TYPE {
			self.logger.log_validation_error_message("VUID-xrCreateInstance-createInfo-parameter", "xrCreateInstance",
				"createInfo must be a valid XrInstanceCreateInfo", &[]);
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		if out.is_null() {
			self.logger.log_validation_error_message("VUID-xrCreateInstance-instance-parameter", "xrCreateInstance",
				"instance must be a valid pointer", &[]);
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		
		let _creation_messengers = CreationMessengers::install(&self.logger, (*info).next);
		
		let layer_names = self.enabled_layer_names(&*info);
		let layers = layer_names.iter()
			.map(|name| self.api_layer(name))
			.collect::<Result<Vec<_>>>()?;
		
		let runtime = self.runtime()?;
		let runtime_extensions = runtime.instance_extensions()?;
		
		let requested = terminator::c_str_array((*info).enabled_extension_names, (*info).enabled_extension_count)
			.iter()
			.map(|ptr| logger::c_str_lossy(*ptr))
			.collect::<ExtensionSet>();
		
		for name in requested.iter() {
			let offered = runtime_extensions.iter().any(|(ext, _)| ext == name)
				|| LOADER_EXTENSIONS.iter().any(|(ext, _)| *ext == name)
				|| layers.iter().any(|layer| layer.properties().extensions.iter().any(|(ext, _)| ext == name));
			if !offered {
				return Err(LoaderError::ExtensionNotPresent(name.to_string()));
			}
		}
		
		// chain links point at each other, so the vector must not move once they are linked
		let mut links = layers.iter()
			.enumerate()
			.map(|(i, layer)| match layers.get(i + 1) {
				Some(next) => ApiLayerNextInfo::new(layer.name(), next.get_instance_proc_addr(), next.create_api_layer_instance(), ptr::null_mut()),
				None => ApiLayerNextInfo::new(layer.name(), terminator::get_instance_proc_addr, terminator::create_api_layer_instance, ptr::null_mut())
			})
			.collect::<Vec<_>>();
		let base = links.as_mut_ptr();
		for i in 1..links.len() {
			(*base.add(i - 1)).next = base.add(i);
		}
		
		let api_layer_info = ApiLayerCreateInfo::new(if links.is_empty() { ptr::null_mut() } else { base });
		let (top_gipa, top_create): (sys::pfn::GetInstanceProcAddr, FnCreateApiLayerInstance) = match layers.first() {
			Some(layer) => (layer.get_instance_proc_addr(), layer.create_api_layer_instance()),
			None => (terminator::get_instance_proc_addr, terminator::create_api_layer_instance)
		};
		
		let mut handle = sys::Instance::NULL;
		let result = top_create(info, &api_layer_info, &mut handle);
		if result.into_raw() < 0 {
			self.logger.log_error_message("xrCreateInstance", &format!(
				"instance creation failed with {}", names::result_to_string(result)));
			return Ok(result);
		}
		
		let runtime_table = DispatchTable::resolve_all(handle, runtime.get_instance_proc_addr());
		let dispatch = match layers.is_empty() {
			true  => DispatchTable::populate(handle, runtime.get_instance_proc_addr()),
			false => DispatchTable::populate_from_layer(handle, top_gipa)
		};
		
		let runtime_debug_utils = requested.is_enabled(extension::EXT_DEBUG_UTILS_NAME)
			&& runtime_extensions.iter().any(|(ext, _)| ext == extension::EXT_DEBUG_UTILS_NAME);
		
		let instance = Arc::new(LoaderInstance::new(handle, dispatch, runtime_table, requested)
			.with_api_layers(layer_names)
			.with_runtime_debug_utils(runtime_debug_utils));
		
		if let Err(e) = self.registry.insert(handle, &instance) {
			if let Some(destroy) = runtime_table.xrDestroyInstance {
				destroy(handle);
			}
			return Err(e);
		}
		
		self.logger.log_info_message("xrCreateInstance", &format!(
			"created instance {:#x} on runtime `{}` with {} api layer(s)", handle.into_raw(), runtime.name(), layers.len()));
		*out = handle;
		Ok(result)
	}
	
	/// Layers forced on by the environment, then the application's, without
	/// duplicates. The first one is closest to the application.
	unsafe fn enabled_layer_names(&self, info: &sys::InstanceCreateInfo) -> Vec<String> {
		let mut names = self.settings.enable_api_layers.clone();
		for ptr in terminator::c_str_array(info.enabled_api_layer_names, info.enabled_api_layer_count) {
			let name = logger::c_str_lossy(*ptr);
			if !names.contains(&name) {
				names.push(name);
			}
		}
		names
	}
	
	/// Forgets an instance and everything created from it.
	pub fn teardown(&self, instance: &Arc<LoaderInstance>) {
		let removed = self.registry.erase_all_for_instance(instance, &self.logger);
		self.logger.remove_instance(instance.handle());
		self.logger.log_verbose_message("xrDestroyInstance", &format!(
			"released instance {:#x} and {} registered handle(s)", instance.handle().into_raw(), removed));
	}
}

/// Messengers chained to an `XrInstanceCreateInfo`. They see everything the
/// loader logs until creation returns.
struct CreationMessengers<'a> {
	logger: &'a LoaderLogger,
	ids:    Vec<u64>
}

impl<'a> CreationMessengers<'a> {
	unsafe fn install(logger: &'a LoaderLogger, mut next: *const std::os::raw::c_void) -> Self {
		let mut ids = Vec::new();
		while !next.is_null() {
			let base = &*(next as *const sys::BaseInStructure);
			if base.ty == sys::DebugUtilsMessengerCreateInfoEXT::TYPE {
				let info = &*(next as *const sys::DebugUtilsMessengerCreateInfoEXT);
				let id = logger::next_loader_id();
				if let Some(recorder) = DebugUtilsRecorder::new(id, None, info) {
					logger.add_recorder(Arc::new(recorder));
					ids.push(id);
				}
			}
			next = base.next as *const _;
		}
		Self { logger, ids }
	}
}

impl Drop for CreationMessengers<'_> {
	fn drop(&mut self) {
		for id in &self.ids {
			self.logger.remove_recorder(*id);
		}
	}
}

macro_rules! void {
	($f:expr, $ty:ty) => { Some(unsafe { transmute::<$ty, sys::pfn::VoidFunction>($f) }) };
}

/// Global commands, resolvable without an instance.
fn global_command(name: &[u8]) -> Option<Option<sys::pfn::VoidFunction>> {
	Some(match name {
		b"xrGetInstanceProcAddr"                  => void!(xrGetInstanceProcAddr, sys::pfn::GetInstanceProcAddr),
		b"xrCreateInstance"                       => void!(xrCreateInstance, sys::pfn::CreateInstance),
		b"xrEnumerateInstanceExtensionProperties" => void!(xrEnumerateInstanceExtensionProperties, sys::pfn::EnumerateInstanceExtensionProperties),
		b"xrEnumerateApiLayerProperties"          => void!(xrEnumerateApiLayerProperties, sys::pfn::EnumerateApiLayerProperties),
		_ => return None
	})
}

#[no_mangle]
pub unsafe extern "system" fn xrGetInstanceProcAddr(
	instance: sys::Instance,
	name:     *const c_char,
	function: *mut Option<sys::pfn::VoidFunction>
) -> sys::Result {
	let loader = Loader::global();
	let entry = &entry::xrGetInstanceProcAddr;
	trampoline::guard(loader, entry.name, entry.policy, || {
		if function.is_null() {
			loader.logger().log_validation_error_message("VUID-xrGetInstanceProcAddr-function-parameter",
				entry.name, "function must be a valid pointer", &[]);
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		*function = None;
		
		if name.is_null() {
			loader.logger().log_validation_error_message("VUID-xrGetInstanceProcAddr-name-parameter",
				entry.name, "name must be a null-terminated UTF-8 string", &[]);
			return Ok(sys::Result::ERROR_VALIDATION_FAILURE);
		}
		let name_bytes = CStr::from_ptr(name).to_bytes();
		
		if let Some(global) = global_command(name_bytes) {
			*function = global;
			return Ok(sys::Result::SUCCESS);
		}
		
		if instance == sys::Instance::NULL {
			loader.logger().log_validation_error_message(&entry.handle_vuid(), entry.name, &format!(
				"{} can only be resolved with a valid instance", String::from_utf8_lossy(name_bytes)), &[]);
			return Ok(sys::Result::ERROR_HANDLE_INVALID);
		}
		
		let Some(inst) = loader.registry().lookup(instance) else {
			return Ok(trampoline::invalid_handle(loader, entry, instance));
		};
		
		let command = std::str::from_utf8(name_bytes).ok().and_then(crate::commands::entry_point);
		match command {
			Some(command) if !inst.extensions().permits(command.extension) => {
				loader.logger().log_warning_message(entry.name, &format!(
					"{} requires {}, which is not enabled", command.name, command.extension.unwrap_or_default()));
				Ok(sys::Result::ERROR_FUNCTION_UNSUPPORTED)
			}
			Some(command) => {
				*function = command.trampoline;
				Ok(sys::Result::SUCCESS)
			}
			None => match inst.dispatch().xrGetInstanceProcAddr {
				Some(next) => Ok(next(instance, name, function)),
				None => Ok(sys::Result::ERROR_FUNCTION_UNSUPPORTED)
			}
		}
	})
}

#[no_mangle]
pub unsafe extern "system" fn xrCreateInstance(create_info: *const sys::InstanceCreateInfo, instance: *mut sys::Instance) -> sys::Result {
	let loader = Loader::global();
	trampoline::guard(loader, "xrCreateInstance", FaultPolicy::CreationStyle, || loader.create_instance(create_info, instance))
}

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateApiLayerProperties(
	property_capacity_input: u32,
	property_count_output:   *mut u32,
	properties:              *mut sys::ApiLayerProperties
) -> sys::Result {
	let loader = Loader::global();
	trampoline::guard(loader, "xrEnumerateApiLayerProperties", FaultPolicy::CreationStyle, || {
		let layers = loader.api_layer_properties();
		Ok(two_call::fill_with(layers.len(), property_capacity_input, property_count_output, properties,
			|i, out| layers[i].write(out)))
	})
}

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateInstanceExtensionProperties(
	layer_name:              *const c_char,
	property_capacity_input: u32,
	property_count_output:   *mut u32,
	properties:              *mut sys::ExtensionProperties
) -> sys::Result {
	let loader = Loader::global();
	trampoline::guard(loader, "xrEnumerateInstanceExtensionProperties", FaultPolicy::CreationStyle, || {
		let layer_name = (!layer_name.is_null()).then(|| logger::c_str_lossy(layer_name));
		let extensions = loader.instance_extensions(layer_name.as_deref())?;
		Ok(two_call::fill_with(extensions.len(), property_capacity_input, property_count_output, properties, |i, out| {
			let (name, version) = &extensions[i];
			names::write_c_str(out.extension_name.as_mut_ptr(), out.extension_name.len(), name);
			out.extension_version = *version;
		}))
	})
}
