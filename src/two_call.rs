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

//! The two-call idiom, split into its two halves: reporting how much
//! capacity a result needs and filling a caller provided buffer.

use crate::{error::ToResult, sys};

/// Writes `len` into `count_output` and, unless this is a size query, fills
/// `buffer` through `write`.
///
/// # Safety
///
/// `count_output` must be null or valid for writes and `buffer` must be
/// valid for `capacity_input` elements.
pub unsafe fn fill_with<T>(
	len:            usize,
	capacity_input: u32,
	count_output:   *mut u32,
	buffer:         *mut T,
	mut write:      impl FnMut(usize, &mut T)
) -> sys::Result {
	if count_output.is_null() {
		return sys::Result::ERROR_VALIDATION_FAILURE;
	}
	
	let Ok(count) = u32::try_from(len) else {
		return sys::Result::ERROR_LIMIT_REACHED;
	};
	*count_output = count;
	
	if capacity_input == 0 {
		return sys::Result::SUCCESS;
	}
	
	if capacity_input < count {
		return sys::Result::ERROR_SIZE_INSUFFICIENT;
	}
	
	if buffer.is_null() {
		return sys::Result::ERROR_VALIDATION_FAILURE;
	}
	
	for i in 0..len {
		write(i, &mut *buffer.add(i));
	}
	
	sys::Result::SUCCESS
}

/// The caller side: asks for the size, then for the contents, retrying if the
/// result grew in between.
///
/// # Safety
///
/// `f` must follow the two-call contract.
pub unsafe fn enumerate<T: Clone>(
	mut f: impl FnMut(u32, *mut u32, *mut T) -> sys::Result,
	init:  T
) -> Result<Vec<T>, sys::Result> {
	loop {
		let mut count = 0;
		f(0, &mut count, std::ptr::null_mut()).result()?;
		
		let mut buffer = vec![init.clone(); count as usize];
		let result = f(count, &mut count, buffer.as_mut_ptr());
		if result == sys::Result::ERROR_SIZE_INSUFFICIENT {
			continue;
		}
		result.result()?;
		
		buffer.truncate(count as usize);
		return Ok(buffer);
	}
}

#[cfg(test)]
mod tests {
	use {super::*, std::ptr};
	
	unsafe fn fill<T: Copy>(items: &[T], capacity_input: u32, count_output: *mut u32, buffer: *mut T) -> sys::Result {
		fill_with(items.len(), capacity_input, count_output, buffer, |i, out| *out = items[i])
	}
	
	#[test]
	fn size_query_reports_the_count() {
		let mut count = 0;
		let result = unsafe { fill(&[1u32, 2, 3], 0, &mut count, ptr::null_mut()) };
		assert_eq!(result, sys::Result::SUCCESS);
		assert_eq!(count, 3);
	}
	
	#[test]
	fn small_buffers_are_rejected_untouched() {
		let mut count = 0;
		let mut buffer = [0u32; 2];
		let result = unsafe { fill(&[1u32, 2, 3], 2, &mut count, buffer.as_mut_ptr()) };
		assert_eq!(result, sys::Result::ERROR_SIZE_INSUFFICIENT);
		assert_eq!(count, 3);
		assert_eq!(buffer, [0, 0]);
	}
	
	#[test]
	fn fills_and_validates_pointers() {
		let mut count = 0;
		let mut buffer = [0u32; 4];
		let result = unsafe { fill(&[1u32, 2, 3], 4, &mut count, buffer.as_mut_ptr()) };
		assert_eq!(result, sys::Result::SUCCESS);
		assert_eq!(buffer, [1, 2, 3, 0]);
		
		assert_eq!(unsafe { fill(&[1u32], 1, ptr::null_mut(), buffer.as_mut_ptr()) }, sys::Result::ERROR_VALIDATION_FAILURE);
		assert_eq!(unsafe { fill(&[1u32], 1, &mut count, ptr::null_mut()) }, sys::Result::ERROR_VALIDATION_FAILURE);
	}
	
	#[test]
	fn enumerate_retries_when_the_result_grows() {
		let mut calls = 0;
		let items = unsafe { enumerate(|capacity, count, buffer| {
			calls += 1;
			let source: &[u8] = if calls == 1 { &[1, 2] } else { &[1, 2, 3] };
			fill(source, capacity, count, buffer)
		}, 0u8) };
		
		assert_eq!(items, Ok(vec![1, 2, 3]));
		assert_eq!(calls, 4);
	}
}
