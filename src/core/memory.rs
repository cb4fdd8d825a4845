// rxcn-miner - Free and Open Source Software Statement
//
// This project, rxcn-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/memory.rs
//
// Scratchpad allocator, ported from original_source's Mem_unix.cpp. Tries a
// huge-page mmap first, falls back to a plain 4 KiB-aligned allocation, then
// advises and optionally locks the region.

use crate::error::{MinerError, Result};

const PAGE_4K: usize = 4096;

pub struct Allocation {
    ptr: *mut u8,
    len: usize,
    huge_pages: bool,
    locked: bool,
}

unsafe impl Send for Allocation {}

impl Allocation {
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    pub fn huge_pages_granted(&self) -> bool {
        self.huge_pages
    }

    pub fn locked(&self) -> bool {
        self.locked
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        release(self);
    }
}

/// Allocates `size` bytes, requesting huge pages when `huge_pages_requested`
/// is set. Returns the allocation plus whether huge pages were actually
/// granted. Fails with `AllocError` only if the 4 KiB fallback also fails.
#[cfg(unix)]
pub fn allocate(size: usize, huge_pages_requested: bool) -> Result<Allocation> {
    if huge_pages_requested {
        if let Some(alloc) = try_huge_pages(size) {
            return Ok(alloc);
        }
    }
    allocate_default(size)
}

#[cfg(unix)]
fn try_huge_pages(size: usize) -> Option<Allocation> {
    // Huge pages must be a multiple of the platform's huge page size; round
    // up conservatively to 2 MiB, matching VirtualMemory::allocateLargePagesMemory.
    const HUGE_PAGE: usize = 2 * 1024 * 1024;
    let len = (size + HUGE_PAGE - 1) / HUGE_PAGE * HUGE_PAGE;

    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_HUGETLB,
            -1,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        return None;
    }

    let mut alloc = Allocation {
        ptr: ptr as *mut u8,
        len,
        huge_pages: true,
        locked: false,
    };
    advise(&alloc);
    alloc.locked = lock(&alloc);
    Some(alloc)
}

#[cfg(unix)]
fn allocate_default(size: usize) -> Result<Allocation> {
    let len = (size + PAGE_4K - 1) / PAGE_4K * PAGE_4K;
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(MinerError::Alloc(format!(
            "mmap of {len} bytes failed: {}",
            std::io::Error::last_os_error()
        )));
    }
    let mut alloc = Allocation {
        ptr: ptr as *mut u8,
        len,
        huge_pages: false,
        locked: false,
    };
    advise(&alloc);
    alloc.locked = lock(&alloc);
    Ok(alloc)
}

#[cfg(unix)]
fn advise(alloc: &Allocation) {
    unsafe {
        libc::madvise(
            alloc.ptr as *mut libc::c_void,
            alloc.len,
            libc::MADV_RANDOM | libc::MADV_WILLNEED,
        );
    }
}

#[cfg(unix)]
fn lock(alloc: &Allocation) -> bool {
    unsafe { libc::mlock(alloc.ptr as *const libc::c_void, alloc.len) == 0 }
}

#[cfg(unix)]
fn release(alloc: &mut Allocation) {
    if alloc.ptr.is_null() {
        return;
    }
    unsafe {
        if alloc.locked {
            libc::munlock(alloc.ptr as *const libc::c_void, alloc.len);
        }
        libc::munmap(alloc.ptr as *mut libc::c_void, alloc.len);
    }
    alloc.ptr = std::ptr::null_mut();
}

/// Non-Unix targets get a plain heap allocation; huge pages and mlock are
/// no-op shims, matching the REDESIGN note's "direct no-op shim" language.
#[cfg(not(unix))]
pub fn allocate(size: usize, _huge_pages_requested: bool) -> Result<Allocation> {
    let len = (size + PAGE_4K - 1) / PAGE_4K * PAGE_4K;
    let layout = std::alloc::Layout::from_size_align(len, PAGE_4K)
        .map_err(|e| MinerError::Alloc(e.to_string()))?;
    let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(MinerError::Alloc(format!("allocation of {len} bytes failed")));
    }
    Ok(Allocation {
        ptr,
        len,
        huge_pages: false,
        locked: false,
    })
}

#[cfg(not(unix))]
fn release(alloc: &mut Allocation) {
    if alloc.ptr.is_null() {
        return;
    }
    let layout = std::alloc::Layout::from_size_align(alloc.len, PAGE_4K).unwrap();
    unsafe { std::alloc::dealloc(alloc.ptr, layout) };
    alloc.ptr = std::ptr::null_mut();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_pages_fallback_succeeds() {
        let alloc = allocate(1024, false).unwrap();
        assert!(!alloc.huge_pages_granted());
        assert_eq!(alloc.as_slice().len() >= 1024, true);
    }

    #[test]
    fn huge_page_request_never_errors() {
        // Huge pages may not be configured on the test host; the contract
        // is that this never fails, only falls back.
        let alloc = allocate(2 * 1024 * 1024, true);
        assert!(alloc.is_ok());
    }
}
