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

//! Expands the entry point table in [`crate::commands`].
//!
//! Every row looks like
//!
//! ```text
//! fn xrCreateSession(instance: sys::Instance, info: *const sys::SessionCreateInfo, session: *mut sys::Session)
//!     => CORE, CreationStyle, create(session);
//! ```
//!
//! and contributes a slot to [`DispatchTable`](crate::dispatch::DispatchTable),
//! an [`EntryPoint`](crate::trampoline::EntryPoint) descriptor in `entry` and,
//! unless the effect is `manual`, an exported trampoline of the same name.
//! The first parameter is always the dispatching handle.

macro_rules! commands {
	(@effect none)     => { $crate::trampoline::Effect::None };
	(@effect create)   => { $crate::trampoline::Effect::Create };
	(@effect destroy)  => { $crate::trampoline::Effect::Destroy };
	(@effect teardown) => { $crate::trampoline::Effect::Teardown };
	(@effect manual)   => { $crate::trampoline::Effect::Manual };
	
	(@address manual $name:ident ($($ty:ty),*)) => { None };
	(@address $effect:ident $name:ident ($($ty:ty),*)) => {
		Some(unsafe { std::mem::transmute::<
			unsafe extern "system" fn($($ty),*) -> $crate::sys::Result,
			$crate::sys::pfn::VoidFunction
		>(super::$name) })
	};
	
	(@trampoline manual ($($out:ident)?) [$(#[$attr:meta])*] $($rest:tt)*) => {};
	(@trampoline $effect:ident ($($out:ident)?) [$(#[$attr:meta])*] $name:ident ($handle:ident: $hty:ty $(, $arg:ident: $aty:ty)*)) => {
		$(#[$attr])*
		#[no_mangle]
		pub unsafe extern "system" fn $name($handle: $hty $(, $arg: $aty)*) -> $crate::sys::Result {
			let loader = $crate::loader::Loader::global();
			$crate::trampoline::dispatch(loader, &self::entry::$name, $handle, |instance| {
				let Some(pfn) = instance.dispatch().$name else {
					return Ok($crate::trampoline::unsupported(loader, &self::entry::$name));
				};
				
				let result = pfn($handle $(, $arg)*);
				
				$(if result.into_raw() >= 0 && !$out.is_null() {
					$crate::trampoline::register(loader, &self::entry::$name, *$out, instance)?;
				})?
				
				Ok(result)
			})
		}
	};
	
	($(
		$(#[$attr:meta])*
		fn $name:ident($handle:ident: $hty:ty $(, $arg:ident: $aty:ty)*) => $ext:ident, $policy:ident, $effect:ident $(($out:ident))?;
	)*) => {
		/// One slot per entry point, filled from a `xrGetInstanceProcAddr`.
		#[derive(Copy, Clone, Default)]
		pub struct DispatchTable {
			$(
				$(#[$attr])*
				pub $name: Option<unsafe extern "system-unwind" fn($hty $(, $aty)*) -> $crate::sys::Result>,
			)*
		}
		
		impl DispatchTable {
			pub const SLOT_NAMES: &'static [&'static str] = &[$(
				$(#[$attr])*
				stringify!($name),
			)*];
			
			/// Calls `resolve` once per slot with the entry point's name. `Some`
			/// overwrites the slot, `None` leaves it as it is.
			///
			/// # Safety
			///
			/// Every non-null function returned for a name must have the
			/// signature OpenXR defines for it.
			pub unsafe fn update_each(&mut self, mut resolve: impl FnMut(&std::ffi::CStr) -> Option<Option<$crate::sys::pfn::VoidFunction>>) {
				$(
					$(#[$attr])*
					{
						let name = std::ffi::CStr::from_bytes_with_nul_unchecked(concat!(stringify!($name), "\0").as_bytes());
						if let Some(pfn) = resolve(name) {
							self.$name = std::mem::transmute::<
								Option<$crate::sys::pfn::VoidFunction>,
								Option<unsafe extern "system-unwind" fn($hty $(, $aty)*) -> $crate::sys::Result>
							>(pfn);
						}
					}
				)*
			}
			
			pub fn resolved_count(&self) -> usize {
				let mut count = 0;
				$(
					$(#[$attr])*
					{ count += self.$name.is_some() as usize; }
				)*
				count
			}
		}
		
		pub mod entry {
			#![allow(non_upper_case_globals)]
			use super::*;
			
			$(
				$(#[$attr])*
				pub static $name: $crate::trampoline::EntryPoint = $crate::trampoline::EntryPoint {
					name:         stringify!($name),
					handle_param: stringify!($handle),
					handle_type:  <$hty as $crate::handle::LoaderHandle>::TYPE,
					extension:    $crate::extension::$ext,
					policy:       $crate::trampoline::FaultPolicy::$policy,
					effect:       commands!(@effect $effect),
					trampoline:   commands!(@address $effect $name ($hty $(, $aty)*))
				};
			)*
		}
		
		/// Every entry point compiled into this build.
		pub static ENTRY_POINTS: &[&$crate::trampoline::EntryPoint] = &[$(
			$(#[$attr])*
			&entry::$name,
		)*];
		
		$(
			commands!(@trampoline $effect ($($out)?) [$(#[$attr])*] $name ($handle: $hty $(, $arg: $aty)*));
		)*
	};
}
