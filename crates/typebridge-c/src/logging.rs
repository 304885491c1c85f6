// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging initialization for the typebridge C surface

use std::os::raw::c_char;

use crate::{error, str_arg, TbStatus};

/// Log level for typebridge logging
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TbLogLevel {
    TbLogOff = 0,
    TbLogError = 1,
    TbLogWarn = 2,
    TbLogInfo = 3,
    TbLogDebug = 4,
    TbLogTrace = 5,
}

impl From<TbLogLevel> for log::LevelFilter {
    fn from(level: TbLogLevel) -> Self {
        match level {
            TbLogLevel::TbLogOff => log::LevelFilter::Off,
            TbLogLevel::TbLogError => log::LevelFilter::Error,
            TbLogLevel::TbLogWarn => log::LevelFilter::Warn,
            TbLogLevel::TbLogInfo => log::LevelFilter::Info,
            TbLogLevel::TbLogDebug => log::LevelFilter::Debug,
            TbLogLevel::TbLogTrace => log::LevelFilter::Trace,
        }
    }
}

fn already_initialized() -> TbStatus {
    error::fail_status(
        TbStatus::TbAlreadyInitialized,
        "logger already initialized".into(),
    )
}

/// Initialize console logging at `level`.
///
/// # Returns
/// `TbStatus::TbOk` on success, `TbStatus::TbAlreadyInitialized` if a
/// logger is already installed.
///
/// # Example (C)
/// ```c
/// tb_logging_init(TB_LOG_INFO);
/// ```
#[no_mangle]
pub extern "C" fn tb_logging_init(level: TbLogLevel) -> TbStatus {
    let filter: log::LevelFilter = level.into();

    match env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp_millis()
        .try_init()
    {
        Ok(()) => TbStatus::TbOk,
        Err(_) => already_initialized(),
    }
}

/// Initialize logging from `RUST_LOG`, falling back to `default_level`.
#[no_mangle]
pub extern "C" fn tb_logging_init_env(default_level: TbLogLevel) -> TbStatus {
    let filter: log::LevelFilter = default_level.into();

    match env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(filter.to_string()),
    )
    .format_timestamp_millis()
    .try_init()
    {
        Ok(()) => TbStatus::TbOk,
        Err(_) => already_initialized(),
    }
}

/// Initialize logging with an `env_logger` filter string.
///
/// # Safety
/// - `filter` must be a valid null-terminated C string.
///
/// # Example (C)
/// ```c
/// tb_logging_init_with_filter("typebridge=debug,warn");
/// ```
#[no_mangle]
pub unsafe extern "C" fn tb_logging_init_with_filter(filter: *const c_char) -> TbStatus {
    let filter = match str_arg(filter, "log filter") {
        Ok(filter) => filter,
        Err(status) => return status,
    };

    match env_logger::Builder::new()
        .parse_filters(filter)
        .format_timestamp_millis()
        .try_init()
    {
        Ok(()) => TbStatus::TbOk,
        Err(_) => already_initialized(),
    }
}
