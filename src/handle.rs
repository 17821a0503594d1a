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

//! Handle categories tracked by the loader.
//!
//! The loader never looks inside a handle, it only uses the raw 64 bit value as
//! a key in the [`HandleRegistry`](crate::registry::HandleRegistry) map for the
//! handle's category.

use {crate::sys, std::fmt};

/// The distinct handle categories the registry keeps a map for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum HandleType {
	Instance,
	Session,
	Space,
	Action,
	Swapchain,
	ActionSet,
	DebugMessenger,
	SpatialAnchor
}

impl HandleType {
	pub const COUNT: usize = 8;
	
	pub const ALL: [Self; Self::COUNT] = [
		Self::Instance,
		Self::Session,
		Self::Space,
		Self::Action,
		Self::Swapchain,
		Self::ActionSet,
		Self::DebugMessenger,
		Self::SpatialAnchor
	];
	
	#[inline]
	pub const fn index(self) -> usize {
		self as usize
	}
	
	/// The C type name, as used in validation messages.
	pub const fn type_name(self) -> &'static str {
		match self {
			Self::Instance       => "XrInstance",
			Self::Session        => "XrSession",
			Self::Space          => "XrSpace",
			Self::Action         => "XrAction",
			Self::Swapchain      => "XrSwapchain",
			Self::ActionSet      => "XrActionSet",
			Self::DebugMessenger => "XrDebugUtilsMessengerEXT",
			Self::SpatialAnchor  => "XrSpatialAnchorMSFT"
		}
	}
	
	pub fn object_type(self) -> sys::ObjectType {
		match self {
			Self::Instance       => sys::ObjectType::INSTANCE,
			Self::Session        => sys::ObjectType::SESSION,
			Self::Space          => sys::ObjectType::SPACE,
			Self::Action         => sys::ObjectType::ACTION,
			Self::Swapchain      => sys::ObjectType::SWAPCHAIN,
			Self::ActionSet      => sys::ObjectType::ACTION_SET,
			Self::DebugMessenger => sys::ObjectType::DEBUG_UTILS_MESSENGER_EXT,
			Self::SpatialAnchor  => sys::ObjectType::SPATIAL_ANCHOR_MSFT
		}
	}
}

impl fmt::Display for HandleType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.type_name())
	}
}

/// A handle type the loader can register.
pub trait LoaderHandle: Copy + Send + 'static {
	const TYPE: HandleType;
	
	fn raw(self) -> u64;
	
	#[inline]
	fn is_null(self) -> bool {
		self.raw() == 0
	}
}

macro_rules! impl_loader_handle {
	( $( $handle:ident => $ty:ident ),* $(,)? ) => { $(
		impl LoaderHandle for sys::$handle {
			const TYPE: HandleType = HandleType::$ty;
			
			#[inline]
			fn raw(self) -> u64 { self.into_raw() }
		}
	)* };
}

impl_loader_handle! {
	Instance               => Instance,
	Session                => Session,
	Space                  => Space,
	Action                 => Action,
	Swapchain              => Swapchain,
	ActionSet              => ActionSet,
	DebugUtilsMessengerEXT => DebugMessenger,
	SpatialAnchorMSFT      => SpatialAnchor
}

/// A handle together with its category, for log records.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TypedHandle {
	pub ty:  HandleType,
	pub raw: u64
}

impl TypedHandle {
	pub fn new<H: LoaderHandle>(handle: H) -> Self {
		Self { ty: H::TYPE, raw: handle.raw() }
	}
}

impl fmt::Display for TypedHandle {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} {:#x}", self.ty, self.raw)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	
	#[test]
	fn indices_follow_declaration_order() {
		for (i, ty) in HandleType::ALL.iter().enumerate() {
			assert_eq!(ty.index(), i);
		}
	}
	
	#[test]
	fn typed_handle_display() {
		let handle = TypedHandle::new(sys::Session::from_raw(0x2a));
		assert_eq!(handle.ty, HandleType::Session);
		assert_eq!(handle.to_string(), "XrSession 0x2a");
		assert!(sys::Space::NULL.is_null());
	}
}
