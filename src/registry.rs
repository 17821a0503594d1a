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

//! Handle → owning instance maps.
//!
//! One map per [`HandleType`], each behind its own lock, so a space lookup on
//! one thread never waits for an action lookup on another. Locks are held for
//! the map access only; callers copy the owner out and release before calling
//! into a runtime.

use {
	crate::{error::{LoaderError, Result}, handle::{HandleType, LoaderHandle, TypedHandle}, logger::LoaderLogger},
	parking_lot::Mutex,
	std::{collections::{HashMap, hash_map::Entry}, panic::{self, AssertUnwindSafe}, sync::Arc}
};

/// Outcome of [`HandleRegistry::insert`].
#[derive(Debug)]
pub enum Registration<T> {
	/// The handle was not known before.
	New,
	/// The handle was already registered to the same owner.
	Duplicate,
	/// The handle was registered to a different owner, which has been replaced.
	Reassigned(Arc<T>),
	/// Null handles are never registered.
	Ignored
}

struct HandleMap<T> {
	ty:      HandleType,
	entries: Mutex<HashMap<u64, Arc<T>>>
}

impl<T> HandleMap<T> {
	fn new(ty: HandleType) -> Self {
		Self { ty, entries: Mutex::new(HashMap::new()) }
	}
}

/// Maps every live handle the application got from the loader to the
/// instance it was created through.
pub struct HandleRegistry<T> {
	maps: [HandleMap<T>; HandleType::COUNT]
}

impl<T> HandleRegistry<T> {
	pub fn new() -> Self {
		Self { maps: HandleType::ALL.map(HandleMap::new) }
	}
	
	#[inline]
	fn map(&self, ty: HandleType) -> &HandleMap<T> {
		&self.maps[ty.index()]
	}
	
	/// Returns the owner of `handle`, or `None` for null and unknown handles.
	pub fn lookup<H: LoaderHandle>(&self, handle: H) -> Option<Arc<T>> {
		self.lookup_raw(H::TYPE, handle.raw())
	}
	
	pub fn lookup_raw(&self, ty: HandleType, raw: u64) -> Option<Arc<T>> {
		if raw == 0 {
			return None;
		}
		
		self.map(ty).entries.lock().get(&raw).cloned()
	}
	
	/// Registers `handle` as owned by `owner`.
	pub fn insert<H: LoaderHandle>(&self, handle: H, owner: &Arc<T>) -> Result<Registration<T>> {
		self.insert_raw(H::TYPE, handle.raw(), owner)
	}
	
	pub fn insert_raw(&self, ty: HandleType, raw: u64, owner: &Arc<T>) -> Result<Registration<T>> {
		if raw == 0 {
			return Ok(Registration::Ignored);
		}
		
		let mut entries = self.map(ty).entries.lock();
		entries.try_reserve(1).map_err(LoaderError::from)?;
		
		Ok(match entries.entry(raw) {
			Entry::Vacant(e) => {
				e.insert(owner.clone());
				Registration::New
			}
			Entry::Occupied(e) if Arc::ptr_eq(e.get(), owner) => Registration::Duplicate,
			Entry::Occupied(mut e) => Registration::Reassigned(e.insert(owner.clone()))
		})
	}
	
	/// Removes `handle` and returns the owner it had.
	///
	/// Of two threads racing to destroy the same handle exactly one gets the
	/// owner back, the other sees `None`.
	pub fn erase<H: LoaderHandle>(&self, handle: H) -> Option<Arc<T>> {
		self.erase_raw(H::TYPE, handle.raw())
	}
	
	pub fn erase_raw(&self, ty: HandleType, raw: u64) -> Option<Arc<T>> {
		if raw == 0 {
			return None;
		}
		
		self.map(ty).entries.lock().remove(&raw)
	}
	
	/// Removes every entry owned by `owner` from every map and returns how many
	/// were removed.
	///
	/// Each map is swept on its own; a panic while sweeping one map is logged
	/// and the remaining maps are still swept.
	pub fn erase_all_for_instance(&self, owner: &Arc<T>, logger: &LoaderLogger) -> usize {
		self.erase_all_with(owner, logger, |_, entries, owner| {
			let before = entries.len();
			entries.retain(|_, v| !Arc::ptr_eq(v, owner));
			before - entries.len()
		})
	}
	
	pub(crate) fn erase_all_with(
		&self,
		owner:  &Arc<T>,
		logger: &LoaderLogger,
		sweep:  impl Fn(HandleType, &mut HashMap<u64, Arc<T>>, &Arc<T>) -> usize
	) -> usize {
		let mut removed = 0;
		
		for map in &self.maps {
			let swept = panic::catch_unwind(AssertUnwindSafe(|| {
				let mut entries = map.entries.lock();
				sweep(map.ty, &mut entries, owner)
			}));
			
			match swept {
				Ok(n) => removed += n,
				Err(payload) => logger.log_error_message(
					"xrDestroyInstance",
					&format!("failed to remove {} handles of a destroyed instance: {}",
						map.ty, LoaderError::from_panic(payload))
				)
			}
		}
		
		removed
	}
	
	/// Number of live entries of one category.
	pub fn len(&self, ty: HandleType) -> usize {
		self.map(ty).entries.lock().len()
	}
	
	pub fn is_empty(&self) -> bool {
		self.maps.iter().all(|map| map.entries.lock().is_empty())
	}
	
	/// All handles, of every category, that are owned by `owner`.
	pub fn handles_owned_by(&self, owner: &Arc<T>) -> Vec<TypedHandle> {
		self.maps.iter()
			.flat_map(|map| map.entries.lock()
				.iter()
				.filter(|(_, v)| Arc::ptr_eq(v, owner))
				.map(|(raw, _)| TypedHandle { ty: map.ty, raw: *raw })
				.collect::<Vec<_>>())
			.collect()
	}
}

impl<T> Default for HandleRegistry<T> {
	fn default() -> Self {
		Self::new()
	}
}
