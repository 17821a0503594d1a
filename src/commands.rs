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

//! The entry point table: every handle-dispatched OpenXR command the loader
//! exports, with its gating extension, fault policy and registry effect.

#![allow(non_snake_case, clippy::too_many_arguments)]

use {crate::sys, std::os::raw::c_char};

commands! {
	// XR_VERSION_1_0
	
	fn xrGetInstanceProcAddr(instance: sys::Instance, name: *const c_char, function: *mut Option<sys::pfn::VoidFunction>)
		=> CORE, CreationStyle, manual;
	fn xrDestroyInstance(instance: sys::Instance)
		=> CORE, SuccessOnly, teardown;
	fn xrGetInstanceProperties(instance: sys::Instance, instance_properties: *mut sys::InstanceProperties)
		=> CORE, CreationStyle, none;
	fn xrPollEvent(instance: sys::Instance, event_data: *mut sys::EventDataBuffer)
		=> CORE, SuccessOnly, none;
	fn xrResultToString(instance: sys::Instance, value: sys::Result, buffer: *mut c_char)
		=> CORE, CreationStyle, none;
	fn xrStructureTypeToString(instance: sys::Instance, value: sys::StructureType, buffer: *mut c_char)
		=> CORE, CreationStyle, none;
	fn xrGetSystem(instance: sys::Instance, get_info: *const sys::SystemGetInfo, system_id: *mut sys::SystemId)
		=> CORE, CreationStyle, none;
	fn xrGetSystemProperties(instance: sys::Instance, system_id: sys::SystemId, properties: *mut sys::SystemProperties)
		=> CORE, CreationStyle, none;
	fn xrEnumerateEnvironmentBlendModes(
		instance: sys::Instance,
		system_id: sys::SystemId,
		view_configuration_type: sys::ViewConfigurationType,
		environment_blend_mode_capacity_input: u32,
		environment_blend_mode_count_output: *mut u32,
		environment_blend_modes: *mut sys::EnvironmentBlendMode
	) => CORE, CreationStyle, none;
	fn xrCreateSession(instance: sys::Instance, create_info: *const sys::SessionCreateInfo, session: *mut sys::Session)
		=> CORE, CreationStyle, create(session);
	fn xrDestroySession(session: sys::Session)
		=> CORE, SuccessOnly, destroy;
	fn xrEnumerateReferenceSpaces(
		session: sys::Session,
		space_capacity_input: u32,
		space_count_output: *mut u32,
		spaces: *mut sys::ReferenceSpaceType
	) => CORE, CreationStyle, none;
	fn xrCreateReferenceSpace(session: sys::Session, create_info: *const sys::ReferenceSpaceCreateInfo, space: *mut sys::Space)
		=> CORE, CreationStyle, create(space);
	fn xrGetReferenceSpaceBoundsRect(session: sys::Session, reference_space_type: sys::ReferenceSpaceType, bounds: *mut sys::Extent2Df)
		=> CORE, CreationStyle, none;
	fn xrCreateActionSpace(session: sys::Session, create_info: *const sys::ActionSpaceCreateInfo, space: *mut sys::Space)
		=> CORE, CreationStyle, create(space);
	fn xrLocateSpace(space: sys::Space, base_space: sys::Space, time: sys::Time, location: *mut sys::SpaceLocation)
		=> CORE, CreationStyle, none;
	fn xrDestroySpace(space: sys::Space)
		=> CORE, SuccessOnly, destroy;
	fn xrEnumerateViewConfigurations(
		instance: sys::Instance,
		system_id: sys::SystemId,
		view_configuration_type_capacity_input: u32,
		view_configuration_type_count_output: *mut u32,
		view_configuration_types: *mut sys::ViewConfigurationType
	) => CORE, CreationStyle, none;
	fn xrGetViewConfigurationProperties(
		instance: sys::Instance,
		system_id: sys::SystemId,
		view_configuration_type: sys::ViewConfigurationType,
		configuration_properties: *mut sys::ViewConfigurationProperties
	) => CORE, CreationStyle, none;
	fn xrEnumerateViewConfigurationViews(
		instance: sys::Instance,
		system_id: sys::SystemId,
		view_configuration_type: sys::ViewConfigurationType,
		view_capacity_input: u32,
		view_count_output: *mut u32,
		views: *mut sys::ViewConfigurationView
	) => CORE, CreationStyle, none;
	fn xrEnumerateSwapchainFormats(session: sys::Session, format_capacity_input: u32, format_count_output: *mut u32, formats: *mut i64)
		=> CORE, CreationStyle, none;
	fn xrCreateSwapchain(session: sys::Session, create_info: *const sys::SwapchainCreateInfo, swapchain: *mut sys::Swapchain)
		=> CORE, CreationStyle, create(swapchain);
	fn xrDestroySwapchain(swapchain: sys::Swapchain)
		=> CORE, SuccessOnly, destroy;
	fn xrEnumerateSwapchainImages(
		swapchain: sys::Swapchain,
		image_capacity_input: u32,
		image_count_output: *mut u32,
		images: *mut sys::SwapchainImageBaseHeader
	) => CORE, CreationStyle, none;
	fn xrAcquireSwapchainImage(swapchain: sys::Swapchain, acquire_info: *const sys::SwapchainImageAcquireInfo, index: *mut u32)
		=> CORE, SuccessOnly, none;
	fn xrWaitSwapchainImage(swapchain: sys::Swapchain, wait_info: *const sys::SwapchainImageWaitInfo)
		=> CORE, SuccessOnly, none;
	fn xrReleaseSwapchainImage(swapchain: sys::Swapchain, release_info: *const sys::SwapchainImageReleaseInfo)
		=> CORE, SuccessOnly, none;
	fn xrBeginSession(session: sys::Session, begin_info: *const sys::SessionBeginInfo)
		=> CORE, SuccessOnly, none;
	fn xrEndSession(session: sys::Session)
		=> CORE, SuccessOnly, none;
	fn xrRequestExitSession(session: sys::Session)
		=> CORE, SuccessOnly, none;
	fn xrWaitFrame(session: sys::Session, frame_wait_info: *const sys::FrameWaitInfo, frame_state: *mut sys::FrameState)
		=> CORE, SuccessOnly, none;
	fn xrBeginFrame(session: sys::Session, frame_begin_info: *const sys::FrameBeginInfo)
		=> CORE, SuccessOnly, none;
	fn xrEndFrame(session: sys::Session, frame_end_info: *const sys::FrameEndInfo)
		=> CORE, SuccessOnly, none;
	fn xrLocateViews(
		session: sys::Session,
		view_locate_info: *const sys::ViewLocateInfo,
		view_state: *mut sys::ViewState,
		view_capacity_input: u32,
		view_count_output: *mut u32,
		views: *mut sys::View
	) => CORE, CreationStyle, none;
	fn xrStringToPath(instance: sys::Instance, path_string: *const c_char, path: *mut sys::Path)
		=> CORE, CreationStyle, none;
	fn xrPathToString(
		instance: sys::Instance,
		path: sys::Path,
		buffer_capacity_input: u32,
		buffer_count_output: *mut u32,
		buffer: *mut c_char
	) => CORE, CreationStyle, none;
	fn xrCreateActionSet(instance: sys::Instance, create_info: *const sys::ActionSetCreateInfo, action_set: *mut sys::ActionSet)
		=> CORE, CreationStyle, create(action_set);
	fn xrDestroyActionSet(action_set: sys::ActionSet)
		=> CORE, SuccessOnly, destroy;
	fn xrCreateAction(action_set: sys::ActionSet, create_info: *const sys::ActionCreateInfo, action: *mut sys::Action)
		=> CORE, CreationStyle, create(action);
	fn xrDestroyAction(action: sys::Action)
		=> CORE, SuccessOnly, destroy;
	fn xrSuggestInteractionProfileBindings(instance: sys::Instance, suggested_bindings: *const sys::InteractionProfileSuggestedBinding)
		=> CORE, CreationStyle, none;
	fn xrAttachSessionActionSets(session: sys::Session, attach_info: *const sys::SessionActionSetsAttachInfo)
		=> CORE, CreationStyle, none;
	fn xrGetCurrentInteractionProfile(session: sys::Session, top_level_user_path: sys::Path, interaction_profile: *mut sys::InteractionProfileState)
		=> CORE, CreationStyle, none;
	fn xrGetActionStateBoolean(session: sys::Session, get_info: *const sys::ActionStateGetInfo, state: *mut sys::ActionStateBoolean)
		=> CORE, CreationStyle, none;
	fn xrGetActionStateFloat(session: sys::Session, get_info: *const sys::ActionStateGetInfo, state: *mut sys::ActionStateFloat)
		=> CORE, CreationStyle, none;
	fn xrGetActionStateVector2f(session: sys::Session, get_info: *const sys::ActionStateGetInfo, state: *mut sys::ActionStateVector2f)
		=> CORE, CreationStyle, none;
	fn xrGetActionStatePose(session: sys::Session, get_info: *const sys::ActionStateGetInfo, state: *mut sys::ActionStatePose)
		=> CORE, CreationStyle, none;
	fn xrSyncActions(session: sys::Session, sync_info: *const sys::ActionsSyncInfo)
		=> CORE, SuccessOnly, none;
	fn xrEnumerateBoundSourcesForAction(
		session: sys::Session,
		enumerate_info: *const sys::BoundSourcesForActionEnumerateInfo,
		source_capacity_input: u32,
		source_count_output: *mut u32,
		sources: *mut sys::Path
	) => CORE, CreationStyle, none;
	fn xrGetInputSourceLocalizedName(
		session: sys::Session,
		get_info: *const sys::InputSourceLocalizedNameGetInfo,
		buffer_capacity_input: u32,
		buffer_count_output: *mut u32,
		buffer: *mut c_char
	) => CORE, CreationStyle, none;
	fn xrApplyHapticFeedback(session: sys::Session, haptic_action_info: *const sys::HapticActionInfo, haptic_feedback: *const sys::HapticBaseHeader)
		=> CORE, SuccessOnly, none;
	fn xrStopHapticFeedback(session: sys::Session, haptic_action_info: *const sys::HapticActionInfo)
		=> CORE, SuccessOnly, none;
	
	// XR_EXT_debug_utils
	
	fn xrSetDebugUtilsObjectNameEXT(instance: sys::Instance, name_info: *const sys::DebugUtilsObjectNameInfoEXT)
		=> EXT_DEBUG_UTILS, CreationStyle, none;
	fn xrCreateDebugUtilsMessengerEXT(
		instance: sys::Instance,
		create_info: *const sys::DebugUtilsMessengerCreateInfoEXT,
		messenger: *mut sys::DebugUtilsMessengerEXT
	) => EXT_DEBUG_UTILS, CreationStyle, create(messenger);
	fn xrDestroyDebugUtilsMessengerEXT(messenger: sys::DebugUtilsMessengerEXT)
		=> EXT_DEBUG_UTILS, SuccessOnly, destroy;
	fn xrSubmitDebugUtilsMessageEXT(
		instance: sys::Instance,
		message_severity: sys::DebugUtilsMessageSeverityFlagsEXT,
		message_types: sys::DebugUtilsMessageTypeFlagsEXT,
		callback_data: *const sys::DebugUtilsMessengerCallbackDataEXT
	) => EXT_DEBUG_UTILS, SuccessOnly, none;
	fn xrSessionBeginDebugUtilsLabelRegionEXT(session: sys::Session, label_info: *const sys::DebugUtilsLabelEXT)
		=> EXT_DEBUG_UTILS, SuccessOnly, none;
	fn xrSessionEndDebugUtilsLabelRegionEXT(session: sys::Session)
		=> EXT_DEBUG_UTILS, SuccessOnly, none;
	fn xrSessionInsertDebugUtilsLabelEXT(session: sys::Session, label_info: *const sys::DebugUtilsLabelEXT)
		=> EXT_DEBUG_UTILS, SuccessOnly, none;
	
	// XR_KHR_vulkan_enable
	
	#[cfg(feature = "XR_KHR_vulkan_enable")]
	fn xrGetVulkanInstanceExtensionsKHR(
		instance: sys::Instance,
		system_id: sys::SystemId,
		buffer_capacity_input: u32,
		buffer_count_output: *mut u32,
		buffer: *mut c_char
	) => KHR_VULKAN_ENABLE, CreationStyle, none;
	#[cfg(feature = "XR_KHR_vulkan_enable")]
	fn xrGetVulkanDeviceExtensionsKHR(
		instance: sys::Instance,
		system_id: sys::SystemId,
		buffer_capacity_input: u32,
		buffer_count_output: *mut u32,
		buffer: *mut c_char
	) => KHR_VULKAN_ENABLE, CreationStyle, none;
	#[cfg(feature = "XR_KHR_vulkan_enable")]
	fn xrGetVulkanGraphicsDeviceKHR(
		instance: sys::Instance,
		system_id: sys::SystemId,
		vk_instance: sys::platform::VkInstance,
		vk_physical_device: *mut sys::platform::VkPhysicalDevice
	) => KHR_VULKAN_ENABLE, CreationStyle, none;
	#[cfg(feature = "XR_KHR_vulkan_enable")]
	fn xrGetVulkanGraphicsRequirementsKHR(
		instance: sys::Instance,
		system_id: sys::SystemId,
		graphics_requirements: *mut sys::GraphicsRequirementsVulkanKHR
	) => KHR_VULKAN_ENABLE, CreationStyle, none;
	
	// XR_KHR_opengl_enable
	
	#[cfg(feature = "XR_KHR_opengl_enable")]
	fn xrGetOpenGLGraphicsRequirementsKHR(
		instance: sys::Instance,
		system_id: sys::SystemId,
		graphics_requirements: *mut sys::GraphicsRequirementsOpenGLKHR
	) => KHR_OPENGL_ENABLE, CreationStyle, none;
	
	// XR_KHR_D3D11_enable
	
	#[cfg(all(windows, feature = "XR_KHR_D3D11_enable"))]
	fn xrGetD3D11GraphicsRequirementsKHR(
		instance: sys::Instance,
		system_id: sys::SystemId,
		graphics_requirements: *mut sys::GraphicsRequirementsD3D11KHR
	) => KHR_D3D11_ENABLE, CreationStyle, none;
	
	// XR_KHR_visibility_mask
	
	#[cfg(feature = "XR_KHR_visibility_mask")]
	fn xrGetVisibilityMaskKHR(
		session: sys::Session,
		view_configuration_type: sys::ViewConfigurationType,
		view_index: u32,
		visibility_mask_type: sys::VisibilityMaskTypeKHR,
		visibility_mask: *mut sys::VisibilityMaskKHR
	) => KHR_VISIBILITY_MASK, CreationStyle, none;
	
	// XR_EXT_performance_settings
	
	#[cfg(feature = "XR_EXT_performance_settings")]
	fn xrPerfSettingsSetPerformanceLevelEXT(session: sys::Session, domain: sys::PerfSettingsDomainEXT, level: sys::PerfSettingsLevelEXT)
		=> EXT_PERFORMANCE_SETTINGS, CreationStyle, none;
	
	// XR_EXT_thermal_query
	
	#[cfg(feature = "XR_EXT_thermal_query")]
	fn xrThermalGetTemperatureTrendEXT(
		session: sys::Session,
		domain: sys::PerfSettingsDomainEXT,
		notification_level: *mut sys::PerfSettingsNotificationLevelEXT,
		temp_headroom: *mut f32,
		temp_slope: *mut f32
	) => EXT_THERMAL_QUERY, CreationStyle, none;
	
	// XR_MSFT_spatial_anchor
	
	#[cfg(feature = "XR_MSFT_spatial_anchor")]
	fn xrCreateSpatialAnchorMSFT(
		session: sys::Session,
		create_info: *const sys::SpatialAnchorCreateInfoMSFT,
		anchor: *mut sys::SpatialAnchorMSFT
	) => MSFT_SPATIAL_ANCHOR, CreationStyle, create(anchor);
	#[cfg(feature = "XR_MSFT_spatial_anchor")]
	fn xrCreateSpatialAnchorSpaceMSFT(
		session: sys::Session,
		create_info: *const sys::SpatialAnchorSpaceCreateInfoMSFT,
		space: *mut sys::Space
	) => MSFT_SPATIAL_ANCHOR, CreationStyle, create(space);
	#[cfg(feature = "XR_MSFT_spatial_anchor")]
	fn xrDestroySpatialAnchorMSFT(anchor: sys::SpatialAnchorMSFT)
		=> MSFT_SPATIAL_ANCHOR, SuccessOnly, destroy;
}

/// The entry point descriptor for `name`, if this build exports it.
pub fn entry_point(name: &str) -> Option<&'static crate::trampoline::EntryPoint> {
	ENTRY_POINTS.iter().copied().find(|entry| entry.name == name)
}

#[cfg(test)]
mod tests {
	use {super::*, crate::{handle::HandleType, trampoline::{Effect, FaultPolicy}}};
	
	#[test]
	fn only_creation_calls_may_report_faults() {
		for entry in ENTRY_POINTS {
			let destroys = matches!(entry.effect, Effect::Destroy | Effect::Teardown);
			if destroys {
				assert_eq!(entry.policy, FaultPolicy::SuccessOnly, "{}", entry.name);
			}
			if entry.effect == Effect::Create {
				assert_eq!(entry.policy, FaultPolicy::CreationStyle, "{}", entry.name);
			}
		}
		
		assert_eq!(entry::xrPollEvent.policy, FaultPolicy::SuccessOnly);
		assert_eq!(entry::xrSubmitDebugUtilsMessageEXT.policy, FaultPolicy::SuccessOnly);
		assert_eq!(entry::xrWaitFrame.policy, FaultPolicy::SuccessOnly);
		assert_eq!(entry::xrGetSystem.policy, FaultPolicy::CreationStyle);
		assert_eq!(entry::xrStringToPath.policy, FaultPolicy::CreationStyle);
	}
	
	#[test]
	fn descriptors_match_their_signatures() {
		assert_eq!(entry::xrCreateSession.handle_type, HandleType::Instance);
		assert_eq!(entry::xrCreateSession.handle_vuid(), "VUID-xrCreateSession-instance-parameter");
		assert_eq!(entry::xrLocateSpace.handle_type, HandleType::Space);
		assert_eq!(entry::xrCreateAction.handle_type, HandleType::ActionSet);
		assert_eq!(entry::xrDestroyDebugUtilsMessengerEXT.handle_type, HandleType::DebugMessenger);
		assert_eq!(entry::xrSetDebugUtilsObjectNameEXT.extension, Some("XR_EXT_debug_utils"));
		assert_eq!(entry::xrDestroyInstance.effect, Effect::Teardown);
	}
	
	#[test]
	fn every_exported_entry_has_a_slot_and_an_address() {
		assert_eq!(ENTRY_POINTS.len(), DispatchTable::SLOT_NAMES.len());
		for (entry, slot) in ENTRY_POINTS.iter().zip(DispatchTable::SLOT_NAMES) {
			assert_eq!(entry.name, *slot);
			assert_eq!(entry.trampoline.is_none(), entry.effect == Effect::Manual, "{}", entry.name);
		}
		
		assert!(entry_point("xrCreateReferenceSpace").is_some());
		assert!(entry_point("xrCreateInstance").is_none());
	}
	
	#[cfg(feature = "XR_MSFT_spatial_anchor")]
	#[test]
	fn spatial_anchors_are_gated() {
		assert_eq!(entry::xrCreateSpatialAnchorMSFT.extension, Some("XR_MSFT_spatial_anchor"));
		assert_eq!(entry::xrDestroySpatialAnchorMSFT.handle_type, HandleType::SpatialAnchor);
	}
}
