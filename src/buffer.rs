//! Process-wide free list of codec read buffers.
//!
//! Every codec borrows one fixed-size scratch buffer for the duration of a
//! command exchange and returns it on drop, so steady-state traffic does not
//! allocate per request.

use std::sync::Mutex;

pub(crate) const BUF_CAPACITY: usize = 4096;

static FREE_LIST: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

pub(crate) fn take() -> Vec<u8> {
    let recycled = FREE_LIST.lock().expect("buffer free list poisoned").pop();
    recycled.unwrap_or_else(|| vec![0; BUF_CAPACITY])
}

pub(crate) fn put(buf: Vec<u8>) {
    // Only full-size buffers go back; anything else is dropped.
    if buf.len() != BUF_CAPACITY {
        return;
    }
    FREE_LIST.lock().expect("buffer free list poisoned").push(buf);
}
