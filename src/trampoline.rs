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

//! The one generic trampoline every generated entry point goes through.
//!
//! Per call: look the handle up (copying the owner out of the registry),
//! validate it, check the extension gate, forward to the dispatch table, apply
//! the post-effect, and turn anything that went wrong into a result code the
//! entry point's [`FaultPolicy`] allows.

use {
	crate::{
		error::{LoaderError, Result},
		extension::Gate,
		handle::{HandleType, LoaderHandle, TypedHandle},
		instance::LoaderInstance,
		loader::Loader,
		registry::Registration,
		sys
	},
	std::{fmt, panic::{self, AssertUnwindSafe}, sync::Arc}
};

/// Which result codes an entry point may report for a fault inside the
/// loader or the forwarded call.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FaultPolicy {
	/// `ERROR_OUT_OF_MEMORY` for allocation failures, `ERROR_INITIALIZATION_FAILED`
	/// for anything else.
	CreationStyle,
	/// The call reports `SUCCESS`; the fault is only logged.
	SuccessOnly
}

impl FaultPolicy {
	pub fn on_fault(self, err: &LoaderError) -> sys::Result {
		match (self, err) {
			(Self::CreationStyle, LoaderError::OutOfMemory) => sys::Result::ERROR_OUT_OF_MEMORY,
			(Self::CreationStyle, _)                        => sys::Result::ERROR_INITIALIZATION_FAILED,
			(Self::SuccessOnly, _)                          => sys::Result::SUCCESS
		}
	}
}

/// What a successful call does to the registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Effect {
	None,
	/// Registers the handle written to the output parameter.
	Create,
	/// Unregisters the dispatching handle before forwarding.
	Destroy,
	/// Sweeps every handle of the instance after forwarding.
	Teardown,
	/// Hand-written trampoline.
	Manual
}

/// Static description of one handle-dispatched entry point.
pub struct EntryPoint {
	pub name:         &'static str,
	pub handle_param: &'static str,
	pub handle_type:  HandleType,
	pub extension:    Gate,
	pub policy:       FaultPolicy,
	pub effect:       Effect,
	/// Address of the exported trampoline, `None` for manual entries.
	pub trampoline:   Option<sys::pfn::VoidFunction>
}

impl EntryPoint {
	pub fn handle_vuid(&self) -> String {
		format!("VUID-{}-{}-parameter", self.name, self.handle_param)
	}
}

impl fmt::Debug for EntryPoint {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("EntryPoint")
			.field("name", &self.name)
			.field("handle_type", &self.handle_type)
			.field("extension", &self.extension)
			.field("policy", &self.policy)
			.field("effect", &self.effect)
			.finish()
	}
}

/// Runs `f`, turning a panic into an error.
pub fn contain<R>(f: impl FnOnce() -> Result<R>) -> Result<R> {
	panic::catch_unwind(AssertUnwindSafe(f))
		.unwrap_or_else(|payload| Err(LoaderError::from_panic(payload)))
}

/// Runs the body of an entry point and maps every failure to a result code.
pub fn guard(loader: &Loader, name: &str, policy: FaultPolicy, body: impl FnOnce() -> Result<sys::Result>) -> sys::Result {
	match contain(body) {
		Ok(result) => result,
		Err(err) if err.is_fault() => {
			let result = policy.on_fault(&err);
			loader.logger().log_error_message(name, &format!("{}, reporting {:?}", err, result));
			result
		}
		Err(err) => {
			loader.logger().log_error_message(name, &err.to_string());
			err.result()
		}
	}
}

/// The generic trampoline.
pub fn dispatch<H: LoaderHandle>(
	loader:  &Loader,
	entry:   &EntryPoint,
	handle:  H,
	forward: impl FnOnce(&Arc<LoaderInstance>) -> Result<sys::Result>
) -> sys::Result {
	guard(loader, entry.name, entry.policy, || {
		let Some(instance) = loader.registry().lookup(handle) else {
			return Ok(invalid_handle(loader, entry, handle));
		};
		
		if !instance.extensions().permits(entry.extension) {
			return Ok(extension_not_enabled(loader, entry, handle));
		}
		
		if entry.effect == Effect::Destroy && loader.registry().erase(handle).is_none() {
			// lost a race against another destroy of the same handle
			return Ok(invalid_handle(loader, entry, handle));
		}
		
		let forwarded = contain(|| forward(&instance));
		
		if entry.effect == Effect::Teardown {
			loader.teardown(&instance);
		}
		
		forwarded
	})
}

pub fn invalid_handle<H: LoaderHandle>(loader: &Loader, entry: &EntryPoint, handle: H) -> sys::Result {
	loader.logger().log_validation_error_message(
		&entry.handle_vuid(),
		entry.name,
		&format!("{} is not a valid {}", entry.handle_param, H::TYPE),
		&[TypedHandle::new(handle)]
	);
	sys::Result::ERROR_HANDLE_INVALID
}

fn extension_not_enabled<H: LoaderHandle>(loader: &Loader, entry: &EntryPoint, handle: H) -> sys::Result {
	loader.logger().log_validation_error_message(
		&format!("VUID-{}-extension-notenabled", entry.name),
		entry.name,
		&format!("the {} extension has not been enabled prior to calling {}",
			entry.extension.unwrap_or_default(), entry.name),
		&[TypedHandle::new(handle)]
	);
	sys::Result::ERROR_FUNCTION_UNSUPPORTED
}

/// Reported when the dispatch slot of an entry point is empty.
pub fn unsupported(loader: &Loader, entry: &EntryPoint) -> sys::Result {
	loader.logger().log_error_message(entry.name,
		"not supported by the runtime or any enabled api layer");
	sys::Result::ERROR_FUNCTION_UNSUPPORTED
}

/// Registers a handle produced by a successful creation call.
pub fn register<H: LoaderHandle>(loader: &Loader, entry: &EntryPoint, handle: H, instance: &Arc<LoaderInstance>) -> Result<()> {
	match loader.registry().insert(handle, instance)? {
		Registration::Reassigned(previous) => loader.logger().log_error_message(entry.name, &format!(
			"runtime returned {} which was still registered to instance {:#x}",
			TypedHandle::new(handle), previous.handle().into_raw())),
		Registration::Ignored => loader.logger().log_warning_message(entry.name,
			"call succeeded but returned a null handle"),
		Registration::New | Registration::Duplicate => ()
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::{config::LoaderSettings, dispatch::DispatchTable, extension::{self, ExtensionSet}, logger::tests::CaptureRecorder},
		std::sync::atomic::{AtomicBool, Ordering}
	};
	
	static DESTROY_SESSION: EntryPoint = EntryPoint {
		name:         "xrDestroySession",
		handle_param: "session",
		handle_type:  HandleType::Session,
		extension:    extension::CORE,
		policy:       FaultPolicy::SuccessOnly,
		effect:       Effect::Destroy,
		trampoline:   None
	};
	
	static CREATE_SPACE: EntryPoint = EntryPoint {
		name:         "xrCreateReferenceSpace",
		handle_param: "session",
		handle_type:  HandleType::Session,
		extension:    extension::CORE,
		policy:       FaultPolicy::CreationStyle,
		effect:       Effect::Create,
		trampoline:   None
	};
	
	static VULKAN_REQUIREMENTS: EntryPoint = EntryPoint {
		name:         "xrGetVulkanGraphicsRequirementsKHR",
		handle_param: "instance",
		handle_type:  HandleType::Instance,
		extension:    extension::KHR_VULKAN_ENABLE,
		policy:       FaultPolicy::CreationStyle,
		effect:       Effect::None,
		trampoline:   None
	};
	
	fn loader() -> (Loader, Arc<CaptureRecorder>) {
		let loader = Loader::new(LoaderSettings::default());
		let capture = CaptureRecorder::install(loader.logger());
		(loader, capture)
	}
	
	fn instance(loader: &Loader, raw: u64, extensions: &[&str]) -> Arc<LoaderInstance> {
		let instance = Arc::new(LoaderInstance::new(
			sys::Instance::from_raw(raw),
			DispatchTable::default(),
			DispatchTable::default(),
			extensions.iter().copied().collect::<ExtensionSet>()
		));
		loader.registry().insert(instance.handle(), &instance).unwrap();
		instance
	}
	
	#[test]
	fn unknown_handle_never_forwards() {
		let (loader, capture) = loader();
		let forwarded = AtomicBool::new(false);
		
		let result = dispatch(&loader, &DESTROY_SESSION, sys::Session::from_raw(0xdead), |_| {
			forwarded.store(true, Ordering::SeqCst);
			Ok(sys::Result::SUCCESS)
		});
		
		assert_eq!(result, sys::Result::ERROR_HANDLE_INVALID);
		assert!(!forwarded.load(Ordering::SeqCst));
		
		let records = capture.records();
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].message_id, "VUID-xrDestroySession-session-parameter");
		assert_eq!(records[0].objects[0].object_type, sys::ObjectType::SESSION);
		assert_eq!(records[0].objects[0].handle, 0xdead);
	}
	
	#[test]
	fn disabled_extension_is_unsupported() {
		let (loader, capture) = loader();
		let inst = instance(&loader, 1, &[]);
		let forwarded = AtomicBool::new(false);
		
		let result = dispatch(&loader, &VULKAN_REQUIREMENTS, inst.handle(), |_| {
			forwarded.store(true, Ordering::SeqCst);
			Ok(sys::Result::SUCCESS)
		});
		
		assert_eq!(result, sys::Result::ERROR_FUNCTION_UNSUPPORTED);
		assert!(!forwarded.load(Ordering::SeqCst));
		assert_eq!(capture.records()[0].message_id, "VUID-xrGetVulkanGraphicsRequirementsKHR-extension-notenabled");
		
		let enabled = instance(&loader, 2, &[extension::KHR_VULKAN_ENABLE_NAME]);
		let result = dispatch(&loader, &VULKAN_REQUIREMENTS, enabled.handle(), |_| Ok(sys::Result::SUCCESS));
		assert_eq!(result, sys::Result::SUCCESS);
	}
	
	#[test]
	fn destroy_erases_before_forwarding() {
		let (loader, _) = loader();
		let inst = instance(&loader, 1, &[]);
		let session = sys::Session::from_raw(0x20);
		loader.registry().insert(session, &inst).unwrap();
		
		let result = dispatch(&loader, &DESTROY_SESSION, session, |_| {
			assert!(loader.registry().lookup(session).is_none());
			Ok(sys::Result::SUCCESS)
		});
		assert_eq!(result, sys::Result::SUCCESS);
		
		let again = dispatch(&loader, &DESTROY_SESSION, session, |_| Ok(sys::Result::SUCCESS));
		assert_eq!(again, sys::Result::ERROR_HANDLE_INVALID);
	}
	
	#[test]
	fn faults_follow_the_entry_policy() {
		let (loader, capture) = loader();
		let inst = instance(&loader, 1, &[extension::KHR_VULKAN_ENABLE_NAME]);
		let session = sys::Session::from_raw(0x30);
		loader.registry().insert(session, &inst).unwrap();
		
		let oom = dispatch(&loader, &CREATE_SPACE, session, |_| std::panic::panic_any(LoaderError::OutOfMemory));
		assert_eq!(oom, sys::Result::ERROR_OUT_OF_MEMORY);
		
		let other = dispatch(&loader, &CREATE_SPACE, session, |_| panic!("runtime exploded"));
		assert_eq!(other, sys::Result::ERROR_INITIALIZATION_FAILED);
		
		let bookkeeping = dispatch(&loader, &VULKAN_REQUIREMENTS, inst.handle(), |_| Err(LoaderError::OutOfMemory));
		assert_eq!(bookkeeping, sys::Result::ERROR_OUT_OF_MEMORY);
		
		let swallowed = dispatch(&loader, &DESTROY_SESSION, session, |_| panic!("runtime exploded"));
		assert_eq!(swallowed, sys::Result::SUCCESS);
		assert!(loader.registry().lookup(session).is_none());
		
		assert_eq!(capture.records().len(), 4);
	}
	
	#[test]
	fn expected_errors_pass_through_unchanged() {
		let (loader, _) = loader();
		let inst = instance(&loader, 1, &[]);
		let session = sys::Session::from_raw(0x40);
		loader.registry().insert(session, &inst).unwrap();
		
		let result = dispatch(&loader, &CREATE_SPACE, session, |_| Ok(sys::Result::ERROR_REFERENCE_SPACE_UNSUPPORTED));
		assert_eq!(result, sys::Result::ERROR_REFERENCE_SPACE_UNSUPPORTED);
		
		let result = dispatch(&loader, &CREATE_SPACE, session, |_| Err(LoaderError::Xr(sys::Result::ERROR_SESSION_LOST)));
		assert_eq!(result, sys::Result::ERROR_SESSION_LOST);
	}
	
	#[test]
	fn register_reports_reused_handles() {
		let (loader, capture) = loader();
		let a = instance(&loader, 1, &[]);
		let b = instance(&loader, 2, &[]);
		let space = sys::Space::from_raw(0x50);
		
		register(&loader, &CREATE_SPACE, space, &a).unwrap();
		register(&loader, &CREATE_SPACE, space, &a).unwrap();
		assert!(capture.records().is_empty());
		
		register(&loader, &CREATE_SPACE, space, &b).unwrap();
		assert!(Arc::ptr_eq(&loader.registry().lookup(space).unwrap(), &b));
		assert_eq!(capture.records().len(), 1);
	}
}
