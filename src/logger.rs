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

//! Structured diagnostics sink.
//!
//! Every validation failure and loader error is turned into a [`LogRecord`] and
//! handed to each installed [`LogRecorder`]. The `log` crate recorder is always
//! present; debug-utils messengers add one recorder each for as long as they
//! live. Recording never unwinds into the caller.

use {
	crate::{handle::TypedHandle, sys},
	parking_lot::{Mutex, RwLock},
	std::{
		collections::HashMap,
		ffi::{c_void, CStr, CString},
		fmt,
		os::raw::c_char,
		panic::{self, AssertUnwindSafe},
		ptr,
		sync::{Arc, atomic::{AtomicU64, Ordering}}
	}
};

pub const LOADER_MESSAGE_ID: &str = "OpenXR-Loader";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
	Verbose,
	Info,
	Warning,
	Error
}

impl Severity {
	pub fn flags(self) -> sys::DebugUtilsMessageSeverityFlagsEXT {
		match self {
			Self::Verbose => sys::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
			Self::Info    => sys::DebugUtilsMessageSeverityFlagsEXT::INFO,
			Self::Warning => sys::DebugUtilsMessageSeverityFlagsEXT::WARNING,
			Self::Error   => sys::DebugUtilsMessageSeverityFlagsEXT::ERROR
		}
	}
	
	/// The most severe level present in `flags`.
	pub fn from_flags(flags: sys::DebugUtilsMessageSeverityFlagsEXT) -> Self {
		[Self::Error, Self::Warning, Self::Info]
			.into_iter()
			.find(|s| flags.into_raw() & s.flags().into_raw() != 0)
			.unwrap_or(Self::Verbose)
	}
	
	fn level(self) -> log::Level {
		match self {
			Self::Verbose => log::Level::Trace,
			Self::Info    => log::Level::Info,
			Self::Warning => log::Level::Warn,
			Self::Error   => log::Level::Error
		}
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MessageKind {
	General,
	Validation,
	Performance,
	Conformance
}

impl MessageKind {
	pub fn flags(self) -> sys::DebugUtilsMessageTypeFlagsEXT {
		match self {
			Self::General     => sys::DebugUtilsMessageTypeFlagsEXT::GENERAL,
			Self::Validation  => sys::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
			Self::Performance => sys::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
			Self::Conformance => sys::DebugUtilsMessageTypeFlagsEXT::CONFORMANCE
		}
	}
	
	pub fn from_flags(flags: sys::DebugUtilsMessageTypeFlagsEXT) -> Self {
		[Self::Validation, Self::Performance, Self::Conformance]
			.into_iter()
			.find(|k| flags.into_raw() & k.flags().into_raw() != 0)
			.unwrap_or(Self::General)
	}
}

/// An object a record refers to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoggedObject {
	pub object_type: sys::ObjectType,
	pub handle:      u64,
	pub name:        Option<String>
}

impl From<TypedHandle> for LoggedObject {
	fn from(handle: TypedHandle) -> Self {
		Self { object_type: handle.ty.object_type(), handle: handle.raw, name: None }
	}
}

#[derive(Clone, Debug)]
pub struct LogRecord {
	pub severity:   Severity,
	pub kind:       MessageKind,
	/// Validation rule id, or [`LOADER_MESSAGE_ID`] for loader messages.
	pub message_id: String,
	pub command:    String,
	pub message:    String,
	pub objects:    Vec<LoggedObject>
}

impl fmt::Display for LogRecord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "[{}] {}: {}", self.message_id, self.command, self.message)?;
		for (i, obj) in self.objects.iter().enumerate() {
			write!(f, "{}{:?} {:#x}", if i == 0 { " (objects: " } else { ", " }, obj.object_type, obj.handle)?;
			if let Some(name) = &obj.name {
				write!(f, " \"{}\"", name)?;
			}
		}
		if !self.objects.is_empty() {
			f.write_str(")")?;
		}
		Ok(())
	}
}

/// A destination for log records.
pub trait LogRecorder: Send + Sync {
	/// Unique id, used to remove the recorder again.
	fn id(&self) -> u64;
	
	/// The instance this recorder belongs to, if any.
	fn instance(&self) -> Option<sys::Instance> {
		None
	}
	
	fn accepts(&self, severity: Severity, kind: MessageKind) -> bool;
	
	fn record(&self, record: &LogRecord);
}

static NEXT_LOADER_ID: AtomicU64 = AtomicU64::new(1);

/// Hands out handle values for objects the loader creates itself. The top bit
/// keeps them apart from recorder ids derived from runtime handles.
pub fn next_loader_id() -> u64 {
	(1 << 63) | NEXT_LOADER_ID.fetch_add(1, Ordering::Relaxed)
}

struct ObjectName {
	instance: u64,
	name:     String
}

pub struct LoaderLogger {
	recorders: RwLock<Vec<Arc<dyn LogRecorder>>>,
	names:     Mutex<HashMap<(i32, u64), ObjectName>>
}

impl LoaderLogger {
	/// A logger without any recorders.
	pub fn new() -> Self {
		Self {
			recorders: RwLock::new(Vec::new()),
			names:     Mutex::new(HashMap::new())
		}
	}
	
	/// A logger forwarding everything at or above `min` to the `log` crate.
	pub fn with_log_level(min: Option<Severity>) -> Self {
		let logger = Self::new();
		if let Some(min) = min {
			logger.add_recorder(Arc::new(LogCrateRecorder { min }));
		}
		logger
	}
	
	pub fn add_recorder(&self, recorder: Arc<dyn LogRecorder>) {
		self.recorders.write().push(recorder);
	}
	
	pub fn remove_recorder(&self, id: u64) -> Option<Arc<dyn LogRecorder>> {
		let mut recorders = self.recorders.write();
		let i = recorders.iter().position(|r| r.id() == id)?;
		Some(recorders.remove(i))
	}
	
	/// Drops every recorder and object name belonging to `instance`.
	pub fn remove_instance(&self, instance: sys::Instance) {
		self.recorders.write().retain(|r| r.instance() != Some(instance));
		self.names.lock().retain(|_, n| n.instance != instance.into_raw());
	}
	
	pub fn recorder_count(&self) -> usize {
		self.recorders.read().len()
	}
	
	pub fn set_object_name(&self, instance: sys::Instance, object_type: sys::ObjectType, handle: u64, name: Option<String>) {
		let key = (object_type.into_raw(), handle);
		let mut names = self.names.lock();
		match name {
			Some(name) => { names.insert(key, ObjectName { instance: instance.into_raw(), name }); }
			None => { names.remove(&key); }
		}
	}
	
	pub fn object_name(&self, object_type: sys::ObjectType, handle: u64) -> Option<String> {
		self.names.lock().get(&(object_type.into_raw(), handle)).map(|n| n.name.clone())
	}
	
	/// Hands `record` to every interested recorder.
	pub fn log(&self, record: LogRecord) {
		self.deliver(record, |_| true)
	}
	
	/// Hands `record` only to recorders of `instance`.
	pub fn log_for_instance(&self, instance: sys::Instance, record: LogRecord) {
		self.deliver(record, |r| r.instance() == Some(instance))
	}
	
	fn deliver(&self, mut record: LogRecord, filter: impl Fn(&dyn LogRecorder) -> bool) {
		for obj in record.objects.iter_mut().filter(|o| o.name.is_none()) {
			obj.name = self.object_name(obj.object_type, obj.handle);
		}
		
		// recorders may call back into the loader, so no lock is held while recording
		let recorders = self.recorders.read().clone();
		for recorder in recorders.iter().filter(|r| filter(r.as_ref())) {
			if !recorder.accepts(record.severity, record.kind) {
				continue;
			}
			
			if panic::catch_unwind(AssertUnwindSafe(|| recorder.record(&record))).is_err() {
				log::error!(target: "xrloader", "log recorder {:#x} panicked while recording", recorder.id());
			}
		}
	}
	
	pub fn log_message(&self, severity: Severity, command: &str, message: &str) {
		self.log(LogRecord {
			severity,
			kind:       MessageKind::General,
			message_id: LOADER_MESSAGE_ID.to_string(),
			command:    command.to_string(),
			message:    message.to_string(),
			objects:    Vec::new()
		})
	}
	
	pub fn log_error_message(&self, command: &str, message: &str) {
		self.log_message(Severity::Error, command, message)
	}
	
	pub fn log_warning_message(&self, command: &str, message: &str) {
		self.log_message(Severity::Warning, command, message)
	}
	
	pub fn log_info_message(&self, command: &str, message: &str) {
		self.log_message(Severity::Info, command, message)
	}
	
	pub fn log_verbose_message(&self, command: &str, message: &str) {
		self.log_message(Severity::Verbose, command, message)
	}
	
	pub fn log_validation_error_message(&self, message_id: &str, command: &str, message: &str, objects: &[TypedHandle]) {
		self.log(LogRecord {
			severity:   Severity::Error,
			kind:       MessageKind::Validation,
			message_id: message_id.to_string(),
			command:    command.to_string(),
			message:    message.to_string(),
			objects:    objects.iter().copied().map(LoggedObject::from).collect()
		})
	}
}

impl Default for LoaderLogger {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for LoaderLogger {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("LoaderLogger")
			.field("recorders", &self.recorder_count())
			.finish()
	}
}

/// Forwards records to the `log` facade.
pub struct LogCrateRecorder {
	min: Severity
}

impl LogRecorder for LogCrateRecorder {
	fn id(&self) -> u64 {
		0
	}
	
	fn accepts(&self, severity: Severity, _kind: MessageKind) -> bool {
		severity >= self.min
	}
	
	fn record(&self, record: &LogRecord) {
		log::log!(target: "xrloader", record.severity.level(), "{}", record);
	}
}

#[derive(Copy, Clone)]
struct UserData(*mut c_void);

// the pointer is only ever handed back to the application's callback
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

/// Delivers records to an application's `XrDebugUtilsMessengerEXT` callback.
pub struct DebugUtilsRecorder {
	id:         u64,
	instance:   Option<sys::Instance>,
	severities: sys::DebugUtilsMessageSeverityFlagsEXT,
	types:      sys::DebugUtilsMessageTypeFlagsEXT,
	callback:   sys::pfn::DebugUtilsMessengerCallbackEXT,
	user_data:  UserData
}

impl DebugUtilsRecorder {
	/// # Safety
	///
	/// `info.user_callback` must stay callable for as long as the recorder is
	/// installed.
	pub unsafe fn new(id: u64, instance: Option<sys::Instance>, info: &sys::DebugUtilsMessengerCreateInfoEXT) -> Option<Self> {
		Some(Self {
			id,
			instance,
			severities: info.message_severities,
			types:      info.message_types,
			callback:   info.user_callback?,
			user_data:  UserData(info.user_data)
		})
	}
}

impl LogRecorder for DebugUtilsRecorder {
	fn id(&self) -> u64 {
		self.id
	}
	
	fn instance(&self) -> Option<sys::Instance> {
		self.instance
	}
	
	fn accepts(&self, severity: Severity, kind: MessageKind) -> bool {
		self.severities.into_raw() & severity.flags().into_raw() != 0
			&& self.types.into_raw() & kind.flags().into_raw() != 0
	}
	
	fn record(&self, record: &LogRecord) {
		let message_id = to_c_string(&record.message_id);
		let command    = to_c_string(&record.command);
		let message    = to_c_string(&record.message);
		let names      = record.objects.iter()
			.map(|o| o.name.as_deref().map(to_c_string))
			.collect::<Vec<_>>();
		let mut objects = record.objects.iter()
			.zip(&names)
			.map(|(o, name)| sys::DebugUtilsObjectNameInfoEXT {
				ty:            sys::StructureType::DEBUG_UTILS_OBJECT_NAME_INFO_EXT,
				next:          ptr::null(),
				object_type:   o.object_type,
				object_handle: o.handle,
				object_name:   name.as_ref().map_or(ptr::null(), |n| n.as_ptr())
			})
			.collect::<Vec<_>>();
		
		let data = sys::DebugUtilsMessengerCallbackDataEXT {
			ty:                  sys::StructureType::DEBUG_UTILS_MESSENGER_CALLBACK_DATA_EXT,
			next:                ptr::null(),
			message_id:          message_id.as_ptr(),
			function_name:       command.as_ptr(),
			message:             message.as_ptr(),
			object_count:        objects.len() as u32,
			objects:             if objects.is_empty() { ptr::null_mut() } else { objects.as_mut_ptr() },
			session_label_count: 0,
			session_labels:      ptr::null_mut()
		};
		
		unsafe {
			(self.callback)(record.severity.flags(), record.kind.flags(), &data, self.user_data.0);
		}
	}
}

fn to_c_string(s: &str) -> CString {
	CString::new(s.replace('\0', " ")).unwrap_or_default()
}

/// Copies a possibly-null C string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub unsafe fn c_str_lossy(ptr: *const c_char) -> String {
	if ptr.is_null() {
		String::new()
	} else {
		CStr::from_ptr(ptr).to_string_lossy().into_owned()
	}
}

impl LogRecord {
	/// Reads an application-submitted `XrDebugUtilsMessengerCallbackDataEXT`.
	///
	/// # Safety
	///
	/// `data` must be a valid callback data struct.
	pub unsafe fn from_callback_data(
		severity: sys::DebugUtilsMessageSeverityFlagsEXT,
		types:    sys::DebugUtilsMessageTypeFlagsEXT,
		data:     &sys::DebugUtilsMessengerCallbackDataEXT
	) -> Self {
		let objects = if data.objects.is_null() {
			Vec::new()
		} else {
			std::slice::from_raw_parts(data.objects, data.object_count as usize)
				.iter()
				.map(|o| LoggedObject {
					object_type: o.object_type,
					handle:      o.object_handle,
					name:        (!o.object_name.is_null()).then(|| c_str_lossy(o.object_name))
				})
				.collect()
		};
		
		Self {
			severity:   Severity::from_flags(severity),
			kind:       MessageKind::from_flags(types),
			message_id: c_str_lossy(data.message_id),
			command:    c_str_lossy(data.function_name),
			message:    c_str_lossy(data.message),
			objects
		}
	}
}
