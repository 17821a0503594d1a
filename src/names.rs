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

//! Name tables behind `xrResultToString` and `xrStructureTypeToString`.

use {crate::sys, std::{borrow::Cow, os::raw::c_char}};

static RESULT_NAMES: &[(i32, &str)] = &[
	(0,           "XR_SUCCESS"),
	(1,           "XR_TIMEOUT_EXPIRED"),
	(3,           "XR_SESSION_LOSS_PENDING"),
	(4,           "XR_EVENT_UNAVAILABLE"),
	(7,           "XR_SPACE_BOUNDS_UNAVAILABLE"),
	(8,           "XR_SESSION_NOT_FOCUSED"),
	(9,           "XR_FRAME_DISCARDED"),
	(-1,          "XR_ERROR_VALIDATION_FAILURE"),
	(-2,          "XR_ERROR_RUNTIME_FAILURE"),
	(-3,          "XR_ERROR_OUT_OF_MEMORY"),
	(-4,          "XR_ERROR_API_VERSION_UNSUPPORTED"),
	(-6,          "XR_ERROR_INITIALIZATION_FAILED"),
	(-7,          "XR_ERROR_FUNCTION_UNSUPPORTED"),
	(-8,          "XR_ERROR_FEATURE_UNSUPPORTED"),
	(-9,          "XR_ERROR_EXTENSION_NOT_PRESENT"),
	(-10,         "XR_ERROR_LIMIT_REACHED"),
	(-11,         "XR_ERROR_SIZE_INSUFFICIENT"),
	(-12,         "XR_ERROR_HANDLE_INVALID"),
	(-13,         "XR_ERROR_INSTANCE_LOST"),
	(-14,         "XR_ERROR_SESSION_RUNNING"),
	(-16,         "XR_ERROR_SESSION_NOT_RUNNING"),
	(-17,         "XR_ERROR_SESSION_LOST"),
	(-18,         "XR_ERROR_SYSTEM_INVALID"),
	(-19,         "XR_ERROR_PATH_INVALID"),
	(-20,         "XR_ERROR_PATH_COUNT_EXCEEDED"),
	(-21,         "XR_ERROR_PATH_FORMAT_INVALID"),
	(-22,         "XR_ERROR_PATH_UNSUPPORTED"),
	(-23,         "XR_ERROR_LAYER_INVALID"),
	(-24,         "XR_ERROR_LAYER_LIMIT_EXCEEDED"),
	(-25,         "XR_ERROR_SWAPCHAIN_RECT_INVALID"),
	(-26,         "XR_ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED"),
	(-27,         "XR_ERROR_ACTION_TYPE_MISMATCH"),
	(-28,         "XR_ERROR_SESSION_NOT_READY"),
	(-29,         "XR_ERROR_SESSION_NOT_STOPPING"),
	(-30,         "XR_ERROR_TIME_INVALID"),
	(-31,         "XR_ERROR_REFERENCE_SPACE_UNSUPPORTED"),
	(-32,         "XR_ERROR_FILE_ACCESS_ERROR"),
	(-33,         "XR_ERROR_FILE_CONTENTS_INVALID"),
	(-34,         "XR_ERROR_FORM_FACTOR_UNSUPPORTED"),
	(-35,         "XR_ERROR_FORM_FACTOR_UNAVAILABLE"),
	(-36,         "XR_ERROR_API_LAYER_NOT_PRESENT"),
	(-37,         "XR_ERROR_CALL_ORDER_INVALID"),
	(-38,         "XR_ERROR_GRAPHICS_DEVICE_INVALID"),
	(-39,         "XR_ERROR_POSE_INVALID"),
	(-40,         "XR_ERROR_INDEX_OUT_OF_RANGE"),
	(-41,         "XR_ERROR_VIEW_CONFIGURATION_TYPE_UNSUPPORTED"),
	(-42,         "XR_ERROR_ENVIRONMENT_BLEND_MODE_UNSUPPORTED"),
	(-44,         "XR_ERROR_NAME_DUPLICATED"),
	(-45,         "XR_ERROR_NAME_INVALID"),
	(-46,         "XR_ERROR_ACTIONSET_NOT_ATTACHED"),
	(-47,         "XR_ERROR_ACTIONSETS_ALREADY_ATTACHED"),
	(-48,         "XR_ERROR_LOCALIZED_NAME_DUPLICATED"),
	(-49,         "XR_ERROR_LOCALIZED_NAME_INVALID"),
	(-50,         "XR_ERROR_GRAPHICS_REQUIREMENTS_CALL_MISSING"),
	(-51,         "XR_ERROR_RUNTIME_UNAVAILABLE"),
	(-1000039001, "XR_ERROR_CREATE_SPATIAL_ANCHOR_FAILED_MSFT")
];

static STRUCTURE_TYPE_NAMES: &[(i32, &str)] = &[
	(0,          "XR_TYPE_UNKNOWN"),
	(1,          "XR_TYPE_API_LAYER_PROPERTIES"),
	(2,          "XR_TYPE_EXTENSION_PROPERTIES"),
	(3,          "XR_TYPE_INSTANCE_CREATE_INFO"),
	(4,          "XR_TYPE_SYSTEM_GET_INFO"),
	(5,          "XR_TYPE_SYSTEM_PROPERTIES"),
	(6,          "XR_TYPE_VIEW_LOCATE_INFO"),
	(7,          "XR_TYPE_VIEW"),
	(8,          "XR_TYPE_SESSION_CREATE_INFO"),
	(9,          "XR_TYPE_SWAPCHAIN_CREATE_INFO"),
	(10,         "XR_TYPE_SESSION_BEGIN_INFO"),
	(11,         "XR_TYPE_VIEW_STATE"),
	(12,         "XR_TYPE_FRAME_END_INFO"),
	(13,         "XR_TYPE_HAPTIC_VIBRATION"),
	(16,         "XR_TYPE_EVENT_DATA_BUFFER"),
	(17,         "XR_TYPE_EVENT_DATA_INSTANCE_LOSS_PENDING"),
	(18,         "XR_TYPE_EVENT_DATA_SESSION_STATE_CHANGED"),
	(23,         "XR_TYPE_ACTION_STATE_BOOLEAN"),
	(24,         "XR_TYPE_ACTION_STATE_FLOAT"),
	(25,         "XR_TYPE_ACTION_STATE_VECTOR2F"),
	(27,         "XR_TYPE_ACTION_STATE_POSE"),
	(28,         "XR_TYPE_ACTION_SET_CREATE_INFO"),
	(29,         "XR_TYPE_ACTION_CREATE_INFO"),
	(32,         "XR_TYPE_INSTANCE_PROPERTIES"),
	(33,         "XR_TYPE_FRAME_WAIT_INFO"),
	(35,         "XR_TYPE_COMPOSITION_LAYER_PROJECTION"),
	(36,         "XR_TYPE_COMPOSITION_LAYER_QUAD"),
	(37,         "XR_TYPE_REFERENCE_SPACE_CREATE_INFO"),
	(38,         "XR_TYPE_ACTION_SPACE_CREATE_INFO"),
	(40,         "XR_TYPE_EVENT_DATA_REFERENCE_SPACE_CHANGE_PENDING"),
	(41,         "XR_TYPE_VIEW_CONFIGURATION_VIEW"),
	(42,         "XR_TYPE_SPACE_LOCATION"),
	(43,         "XR_TYPE_SPACE_VELOCITY"),
	(44,         "XR_TYPE_FRAME_STATE"),
	(45,         "XR_TYPE_VIEW_CONFIGURATION_PROPERTIES"),
	(46,         "XR_TYPE_FRAME_BEGIN_INFO"),
	(48,         "XR_TYPE_COMPOSITION_LAYER_PROJECTION_VIEW"),
	(49,         "XR_TYPE_EVENT_DATA_EVENTS_LOST"),
	(51,         "XR_TYPE_INTERACTION_PROFILE_SUGGESTED_BINDING"),
	(52,         "XR_TYPE_EVENT_DATA_INTERACTION_PROFILE_CHANGED"),
	(53,         "XR_TYPE_INTERACTION_PROFILE_STATE"),
	(55,         "XR_TYPE_SWAPCHAIN_IMAGE_ACQUIRE_INFO"),
	(56,         "XR_TYPE_SWAPCHAIN_IMAGE_WAIT_INFO"),
	(57,         "XR_TYPE_SWAPCHAIN_IMAGE_RELEASE_INFO"),
	(58,         "XR_TYPE_ACTION_STATE_GET_INFO"),
	(59,         "XR_TYPE_HAPTIC_ACTION_INFO"),
	(60,         "XR_TYPE_SESSION_ACTION_SETS_ATTACH_INFO"),
	(61,         "XR_TYPE_ACTIONS_SYNC_INFO"),
	(62,         "XR_TYPE_BOUND_SOURCES_FOR_ACTION_ENUMERATE_INFO"),
	(63,         "XR_TYPE_INPUT_SOURCE_LOCALIZED_NAME_GET_INFO"),
	(1000015000, "XR_TYPE_EVENT_DATA_PERF_SETTINGS_EXT"),
	(1000019000, "XR_TYPE_DEBUG_UTILS_OBJECT_NAME_INFO_EXT"),
	(1000019001, "XR_TYPE_DEBUG_UTILS_MESSENGER_CALLBACK_DATA_EXT"),
	(1000019002, "XR_TYPE_DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT"),
	(1000019003, "XR_TYPE_DEBUG_UTILS_LABEL_EXT"),
	(1000023000, "XR_TYPE_GRAPHICS_BINDING_OPENGL_WIN32_KHR"),
	(1000023001, "XR_TYPE_GRAPHICS_BINDING_OPENGL_XLIB_KHR"),
	(1000023002, "XR_TYPE_GRAPHICS_BINDING_OPENGL_XCB_KHR"),
	(1000023003, "XR_TYPE_GRAPHICS_BINDING_OPENGL_WAYLAND_KHR"),
	(1000023004, "XR_TYPE_SWAPCHAIN_IMAGE_OPENGL_KHR"),
	(1000023005, "XR_TYPE_GRAPHICS_REQUIREMENTS_OPENGL_KHR"),
	(1000025000, "XR_TYPE_GRAPHICS_BINDING_VULKAN_KHR"),
	(1000025001, "XR_TYPE_SWAPCHAIN_IMAGE_VULKAN_KHR"),
	(1000025002, "XR_TYPE_GRAPHICS_REQUIREMENTS_VULKAN_KHR"),
	(1000027000, "XR_TYPE_GRAPHICS_BINDING_D3D11_KHR"),
	(1000027001, "XR_TYPE_SWAPCHAIN_IMAGE_D3D11_KHR"),
	(1000027002, "XR_TYPE_GRAPHICS_REQUIREMENTS_D3D11_KHR"),
	(1000031000, "XR_TYPE_VISIBILITY_MASK_KHR"),
	(1000031001, "XR_TYPE_EVENT_DATA_VISIBILITY_MASK_CHANGED_KHR"),
	(1000039000, "XR_TYPE_SPATIAL_ANCHOR_CREATE_INFO_MSFT"),
	(1000039001, "XR_TYPE_SPATIAL_ANCHOR_SPACE_CREATE_INFO_MSFT")
];

fn find(table: &'static [(i32, &'static str)], raw: i32) -> Option<&'static str> {
	table.iter().find(|(value, _)| *value == raw).map(|(_, name)| *name)
}

pub fn result_name(value: sys::Result) -> Option<&'static str> {
	find(RESULT_NAMES, value.into_raw())
}

pub fn structure_type_name(value: sys::StructureType) -> Option<&'static str> {
	find(STRUCTURE_TYPE_NAMES, value.into_raw())
}

/// The name for `value`, or the placeholder used when neither the loader nor
/// the runtime knows it.
pub fn result_to_string(value: sys::Result) -> Cow<'static, str> {
	match result_name(value) {
		Some(name) => Cow::Borrowed(name),
		None if value.into_raw() >= 0 => Cow::Owned(format!("XR_UNKNOWN_SUCCESS_{}", value.into_raw())),
		None => Cow::Owned(format!("XR_UNKNOWN_FAILURE_{}", value.into_raw()))
	}
}

pub fn structure_type_to_string(value: sys::StructureType) -> Cow<'static, str> {
	match structure_type_name(value) {
		Some(name) => Cow::Borrowed(name),
		None => Cow::Owned(format!("XR_UNKNOWN_STRUCTURE_TYPE_{}", value.into_raw()))
	}
}

/// Copies `s` into a fixed size C buffer, truncating and always terminating.
///
/// # Safety
///
/// `buffer` must be valid for `capacity` bytes.
pub unsafe fn write_c_str(buffer: *mut c_char, capacity: usize, s: &str) {
	if buffer.is_null() || capacity == 0 {
		return;
	}
	
	let len = s.len().min(capacity - 1);
	std::ptr::copy_nonoverlapping(s.as_ptr() as *const c_char, buffer, len);
	*buffer.add(len) = 0;
}
