// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-thread last error message.

use std::cell::RefCell;
use std::os::raw::c_char;

use typebridge::BridgeError;

use crate::TbStatus;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record `err` for this thread and return its status.
pub(crate) fn fail(err: BridgeError) -> TbStatus {
    log::debug!("[ffi] {}", err);
    let status = TbStatus::from(&err);
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err.to_string()));
    status
}

/// Record a failure that exists only on the C side (no `BridgeError`).
pub(crate) fn fail_status(status: TbStatus, message: String) -> TbStatus {
    log::debug!("[ffi] {:?}: {}", status, message);
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
    status
}

pub(crate) fn clear() {
    LAST_ERROR.with(|slot| slot.borrow_mut().take());
}

/// Copy the calling thread's last error message into `buf`.
///
/// The message is null-terminated. `out_len` (optional) receives the message
/// length in bytes, excluding the terminator, even when the buffer is too
/// small. An empty string is written when no error was recorded.
///
/// # Safety
/// - `buf` must be valid for `buf_len` bytes, or NULL with `buf_len == 0`.
/// - `out_len` must be NULL or valid for writes.
///
/// # Returns
/// `TbStatus::TbOk`, or `TbStatus::TbBufferTooSmall` when `buf_len` cannot
/// hold the message and its terminator (the recorded message is kept).
#[no_mangle]
pub unsafe extern "C" fn tb_last_error_message(
    buf: *mut c_char,
    buf_len: usize,
    out_len: *mut usize,
) -> TbStatus {
    let message = LAST_ERROR.with(|slot| slot.borrow().clone()).unwrap_or_default();
    let bytes = message.as_bytes();
    if !out_len.is_null() {
        *out_len = bytes.len();
    }
    if buf.is_null() || buf_len <= bytes.len() {
        return TbStatus::TbBufferTooSmall;
    }
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), bytes.len());
    *buf.add(bytes.len()) = 0;
    TbStatus::TbOk
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_round_trip() {
        assert_eq!(
            fail(BridgeError::UnknownType("Abacus".into())),
            TbStatus::TbUnknownType
        );

        let mut len = 0usize;
        let mut tiny = [0 as c_char; 4];
        let status = unsafe { tb_last_error_message(tiny.as_mut_ptr(), tiny.len(), &mut len) };
        assert_eq!(status, TbStatus::TbBufferTooSmall);
        assert_eq!(len, "Unknown type: Abacus".len());

        let mut buf = [0 as c_char; 64];
        let status = unsafe { tb_last_error_message(buf.as_mut_ptr(), buf.len(), &mut len) };
        assert_eq!(status, TbStatus::TbOk);
        let text = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
        assert_eq!(text.to_str(), Ok("Unknown type: Abacus"));

        clear();
        let status = unsafe { tb_last_error_message(buf.as_mut_ptr(), buf.len(), &mut len) };
        assert_eq!(status, TbStatus::TbOk);
        assert_eq!(len, 0);
    }
}
