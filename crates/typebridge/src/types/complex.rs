// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::Describe;

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Floating point component of a [`Complex`] number (`f32` or `f64`).
pub trait ComplexComponent: Describe + Copy + Default + PartialEq + sealed::Sealed {}

impl ComplexComponent for f32 {}
impl ComplexComponent for f64 {}

/// Complex number with the `{ re, im }` layout foreign callers expect.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex<T: ComplexComponent> {
    pub re: T,
    pub im: T,
}

impl<T: ComplexComponent> Complex<T> {
    #[must_use]
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T: ComplexComponent> From<(T, T)> for Complex<T> {
    fn from((re, im): (T, T)) -> Self {
        Self { re, im }
    }
}
