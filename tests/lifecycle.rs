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

mod common;

use {
	xrloader::{*, commands},
	std::{ptr, sync::atomic::Ordering}
};

#[test]
fn instance_and_session_lifecycle() {
	let loader = common::install();
	
	let (result, instance) = common::create_instance(&[]);
	assert_eq!(result, sys::Result::SUCCESS);
	assert_ne!(instance, sys::Instance::NULL);
	let owner = loader.registry().lookup(instance).expect("instance is registered");
	assert_eq!(owner.handle(), instance);
	
	let (result, session) = common::create_session(instance);
	assert_eq!(result, sys::Result::SUCCESS);
	assert_eq!(loader.registry().lookup(session).map(|i| i.handle()), Some(instance));
	
	assert_eq!(unsafe { commands::xrDestroySession(session) }, sys::Result::SUCCESS);
	assert!(loader.registry().lookup(session).is_none());
	
	let destroyed = common::DESTROYED_INSTANCES.load(Ordering::SeqCst);
	assert_eq!(unsafe { commands::xrDestroyInstance(instance) }, sys::Result::SUCCESS);
	assert!(common::DESTROYED_INSTANCES.load(Ordering::SeqCst) > destroyed);
	assert!(loader.registry().lookup(instance).is_none());
}

#[test]
fn creation_on_unknown_instance_is_rejected() {
	let loader = common::install();
	let capture = common::Capture::install(loader);
	
	let bogus = sys::Instance::from_raw(0x0bad_0001);
	let (result, session) = common::create_session(bogus);
	assert_eq!(result, sys::Result::ERROR_HANDLE_INVALID);
	assert_eq!(session, sys::Session::NULL);
	
	let records = capture.about(bogus.into_raw());
	assert_eq!(records.len(), 1, "{:?}", records);
	assert_eq!(records[0].message_id, "VUID-xrCreateSession-instance-parameter");
	assert_eq!(records[0].severity, Severity::Error);
	assert_eq!(records[0].kind, MessageKind::Validation);
	capture.uninstall(loader);
}

#[test]
fn destroyed_handle_is_rejected() {
	let loader = common::install();
	let capture = common::Capture::install(loader);
	
	let (_, instance) = common::create_instance(&[]);
	let (_, session) = common::create_session(instance);
	assert_eq!(unsafe { commands::xrDestroySession(session) }, sys::Result::SUCCESS);
	assert_eq!(unsafe { commands::xrDestroySession(session) }, sys::Result::ERROR_HANDLE_INVALID);
	assert_eq!(unsafe { commands::xrRequestExitSession(session) }, sys::Result::ERROR_HANDLE_INVALID);
	assert_eq!(capture.with_message_id("VUID-xrDestroySession-session-parameter").iter()
		.filter(|r| r.objects.iter().any(|o| o.handle == session.into_raw()))
		.count(), 1);
	
	unsafe { commands::xrDestroyInstance(instance) };
	capture.uninstall(loader);
}

#[test]
fn destroy_instance_releases_every_child() {
	let loader = common::install();
	
	let (_, instance) = common::create_instance(&[]);
	let owner = loader.registry().lookup(instance).expect("instance is registered");
	
	let (_, session) = common::create_session(instance);
	let (result, space) = common::create_reference_space(session);
	assert_eq!(result, sys::Result::SUCCESS);
	
	let action_set_info: sys::ActionSetCreateInfo = unsafe { std::mem::zeroed() };
	let mut action_set = sys::ActionSet::NULL;
	assert_eq!(unsafe { commands::xrCreateActionSet(instance, &action_set_info, &mut action_set) }, sys::Result::SUCCESS);
	
	let action_info: sys::ActionCreateInfo = unsafe { std::mem::zeroed() };
	let mut action = sys::Action::NULL;
	assert_eq!(unsafe { commands::xrCreateAction(action_set, &action_info, &mut action) }, sys::Result::SUCCESS);
	
	assert_eq!(loader.registry().handles_owned_by(&owner).len(), 5);
	
	assert_eq!(unsafe { commands::xrDestroyInstance(instance) }, sys::Result::SUCCESS);
	assert!(loader.registry().handles_owned_by(&owner).is_empty());
	assert!(loader.registry().lookup(instance).is_none());
	assert!(loader.registry().lookup(session).is_none());
	assert!(loader.registry().lookup(space).is_none());
	assert!(loader.registry().lookup(action_set).is_none());
	assert!(loader.registry().lookup(action).is_none());
}

#[test]
fn instances_do_not_share_children() {
	let loader = common::install();
	
	let (_, first) = common::create_instance(&[]);
	let (_, second) = common::create_instance(&[]);
	let (_, first_session) = common::create_session(first);
	let (_, second_session) = common::create_session(second);
	
	unsafe { commands::xrDestroyInstance(first) };
	assert!(loader.registry().lookup(first_session).is_none());
	assert_eq!(loader.registry().lookup(second_session).map(|i| i.handle()), Some(second));
	
	unsafe { commands::xrDestroyInstance(second) };
}

#[test]
fn concurrent_creation_and_lookup() {
	const CREATORS: usize = 4;
	const READERS: usize = 4;
	const PER_THREAD: usize = 32;
	
	let loader = common::install();
	let (_, instance) = common::create_instance(&[]);
	let existing = (0..PER_THREAD)
		.map(|_| common::create_session(instance).1)
		.collect::<Vec<_>>();
	
	let created = std::thread::scope(|scope| {
		let creators = (0..CREATORS)
			.map(|_| scope.spawn(|| (0..PER_THREAD)
				.map(|_| {
					let (result, session) = common::create_session(instance);
					assert_eq!(result, sys::Result::SUCCESS);
					session
				})
				.collect::<Vec<_>>()))
			.collect::<Vec<_>>();
		
		for _ in 0..READERS {
			scope.spawn(|| for session in &existing {
				assert_eq!(loader.registry().lookup(*session).map(|i| i.handle()), Some(instance));
			});
		}
		
		creators.into_iter()
			.flat_map(|t| t.join().expect("creator thread"))
			.collect::<Vec<_>>()
	});
	
	assert_eq!(created.len(), CREATORS * PER_THREAD);
	for session in created.iter().chain(&existing) {
		assert_eq!(loader.registry().lookup(*session).map(|i| i.handle()), Some(instance));
	}
	
	unsafe { commands::xrDestroyInstance(instance) };
	assert!(created.iter().all(|s| loader.registry().lookup(*s).is_none()));
}

#[test]
fn invalid_create_info_is_a_validation_failure() {
	common::install();
	let mut instance = sys::Instance::NULL;
	assert_eq!(unsafe { loader::xrCreateInstance(ptr::null(), &mut instance) }, sys::Result::ERROR_VALIDATION_FAILURE);
	assert_eq!(instance, sys::Instance::NULL);
}

#[test]
fn unknown_extension_fails_creation() {
	common::install();
	let (result, instance) = common::create_instance(&["XR_FB_not_a_real_extension"]);
	assert_eq!(result, sys::Result::ERROR_EXTENSION_NOT_PRESENT);
	assert_eq!(instance, sys::Instance::NULL);
}
