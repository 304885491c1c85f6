// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Integration tests for the invocation engine.

use crate::config::BridgeConfig;
use crate::{
    descriptor_of, reflect_methods, BridgeError, MemberKind, OuterType, RawValue, Reflect,
    TypeRegistry,
};
use std::mem::MaybeUninit;
use std::ptr;

#[derive(Clone, Default, Reflect)]
#[reflect(methods)]
struct Calculator {
    value: f64,
}

#[reflect_methods]
impl Calculator {
    pub fn add(&mut self, x: f64) -> f64 {
        self.value += x;
        self.value
    }

    pub fn multiply(&mut self, x: f64) -> f64 {
        self.value *= x;
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    #[reflect(rename = "getValue")]
    pub fn get_value(&self) -> f64 {
        self.value
    }

    #[reflect(rename = "setValue")]
    pub fn set_value(&mut self, v: f64) {
        self.value = v;
    }

    pub fn compute(&self, a: f64, b: f64, c: f64) -> f64 {
        a * self.value + b * self.value + c
    }

    pub fn describe(&self) -> String {
        format!("Calculator with value: {}", self.value)
    }

    pub fn greet(&self, name: &str) -> String {
        format!("hello {}", name)
    }

    pub fn explode(&self) -> f64 {
        panic!("calculator exploded")
    }
}

#[derive(Clone, Default, Reflect)]
#[reflect(methods)]
struct MathUtils {
    x: f64,
    y: f64,
}

#[reflect_methods]
impl MathUtils {
    pub fn distance(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn scale(&mut self, factor: f64) {
        self.x *= factor;
        self.y *= factor;
    }

    pub fn offset(&mut self, dx: f64, dy: f64) -> f64 {
        self.x += dx;
        self.y += dy;
        self.distance()
    }
}

fn setup() -> TypeRegistry {
    let registry = TypeRegistry::new();
    registry
        .register::<Calculator>("Calculator")
        .expect("register Calculator");
    registry
        .register::<MathUtils>("MathUtils")
        .expect("register MathUtils");
    registry
}

fn cfg() -> BridgeConfig {
    BridgeConfig::default()
}

unsafe fn call(
    registry: &TypeRegistry,
    instance: *mut u8,
    type_name: &str,
    member: &str,
    args: &[*const u8],
    out: *mut u8,
) -> crate::Result<()> {
    registry.call_method_with_config(&cfg(), instance, type_name, member, args, out)
}

fn arg<T>(v: &T) -> *const u8 {
    (v as *const T).cast()
}

fn inst<T>(v: &mut T) -> *mut u8 {
    (v as *mut T).cast()
}

#[test]
fn test_calculator_members() {
    let registry = setup();
    let sd = registry.lookup("Calculator").expect("Calculator");
    let names: Vec<&str> = sd.members().iter().map(|m| m.name()).collect();
    assert_eq!(
        names,
        [
            "value", "add", "multiply", "reset", "getValue", "setValue", "compute", "describe",
            "greet", "explode"
        ]
    );
    let value = sd.member("value").expect("value");
    assert_eq!(value.kind(), MemberKind::Data);
    assert_eq!(value.type_desc().outer_type(), OuterType::F64);

    let add = sd.member("add").expect("add").function_descriptor().expect("fn");
    assert_eq!(add.signature(), "fn(f64) -> f64");
    let get = sd.member("getValue").expect("getValue").function_descriptor().expect("fn");
    assert!(get.is_const());
    assert!(sd.member("reset").and_then(|m| m.function_descriptor()).expect("fn").is_void());
}

#[test]
fn test_add_accumulates() {
    let registry = setup();
    let mut calc = Calculator::default();
    let mut out = 0.0f64;

    unsafe {
        call(&registry, inst(&mut calc), "Calculator", "add", &[arg(&5.0f64)], inst(&mut out))
            .expect("add 5");
    }
    assert_eq!(out, 5.0);
    assert_eq!(calc.value, 5.0);

    unsafe {
        call(&registry, inst(&mut calc), "Calculator", "add", &[arg(&3.0f64)], inst(&mut out))
            .expect("add 3");
    }
    assert_eq!(out, 8.0);
    assert_eq!(calc.value, 8.0);
}

#[test]
fn test_void_and_multi_arg_calls() {
    let registry = setup();
    let mut calc = Calculator::default();
    unsafe {
        call(&registry, inst(&mut calc), "Calculator", "setValue", &[arg(&2.0f64)], ptr::null_mut())
            .expect("setValue");
    }
    assert_eq!(calc.value, 2.0);

    let mut out = 0.0f64;
    let args = [arg(&1.0f64), arg(&3.0f64), arg(&0.5f64)];
    unsafe {
        call(&registry, inst(&mut calc), "Calculator", "compute", &args, inst(&mut out))
            .expect("compute");
    }
    assert_eq!(out, 8.5);

    unsafe {
        call(&registry, inst(&mut calc), "Calculator", "reset", &[], ptr::null_mut())
            .expect("reset");
    }
    assert_eq!(calc.value, 0.0);
}

#[test]
fn test_string_result_is_placement_constructed() {
    let registry = setup();
    let sd = registry.lookup("Calculator").expect("Calculator");
    let mut calc = Calculator { value: 1.5 };
    let mut slot = MaybeUninit::<String>::uninit();
    let describe = sd.member("describe").expect("describe");
    unsafe {
        registry
            .call_member_function_with_config(
                &cfg(),
                inst(&mut calc),
                "Calculator",
                describe,
                &[],
                slot.as_mut_ptr().cast(),
            )
            .expect("describe");
        let text = slot.assume_init();
        assert_eq!(text, "Calculator with value: 1.5");
    }
}

#[test]
fn test_borrowed_parameter_travels_owned() {
    let registry = setup();
    let sd = registry.lookup("Calculator").expect("Calculator");
    let greet = sd.member("greet").and_then(|m| m.function_descriptor()).expect("fn");
    assert_eq!(greet.params()[0].outer_type(), OuterType::String);

    let mut calc = Calculator::default();
    let name = String::from("bridge");
    let mut slot = MaybeUninit::<String>::uninit();
    unsafe {
        call(&registry, inst(&mut calc), "Calculator", "greet", &[arg(&name)], slot.as_mut_ptr().cast())
            .expect("greet");
        let result = RawValue::new(descriptor_of::<String>(), slot.as_mut_ptr().cast()).expect("view");
        assert_eq!(result.string(), Ok("hello bridge"));
        result.drop_in_place().expect("release");
    }
    assert_eq!(name, "bridge");
}

#[test]
fn test_arity_mismatch_leaves_instance_untouched() {
    let registry = setup();
    let mut calc = Calculator { value: 7.0 };
    let mut out = 0.0f64;
    for args in [vec![], vec![arg(&1.0f64), arg(&2.0f64)]] {
        let err = unsafe {
            call(&registry, inst(&mut calc), "Calculator", "add", &args, inst(&mut out))
        };
        assert_eq!(
            err,
            Err(BridgeError::ArityMismatch {
                member: "add".into(),
                expected: 1,
                got: args.len(),
            })
        );
    }
    assert_eq!(calc.value, 7.0);
    assert_eq!(out, 0.0);
}

#[test]
fn test_two_parameter_arity() {
    let registry = setup();
    let mut utils = MathUtils { x: 0.0, y: 0.0 };
    let mut out = -1.0f64;
    let (dx, dy, extra) = (3.0f64, 4.0f64, 5.0f64);
    for args in [vec![arg(&dx)], vec![arg(&dx), arg(&dy), arg(&extra)]] {
        let err = unsafe {
            call(&registry, inst(&mut utils), "MathUtils", "offset", &args, inst(&mut out))
        };
        assert_eq!(
            err,
            Err(BridgeError::ArityMismatch {
                member: "offset".into(),
                expected: 2,
                got: args.len(),
            })
        );
    }
    assert_eq!((utils.x, utils.y), (0.0, 0.0));
    assert_eq!(out, -1.0);

    unsafe {
        call(&registry, inst(&mut utils), "MathUtils", "offset", &[arg(&dx), arg(&dy)], inst(&mut out))
            .expect("offset");
    }
    assert_eq!(out, 5.0);
}

#[test]
fn test_data_member_is_not_callable() {
    let registry = setup();
    let sd = registry.lookup("Calculator").expect("Calculator");
    let mut calc = Calculator::default();
    let err = unsafe {
        registry.call_member_function_with_config(
            &cfg(),
            inst(&mut calc),
            "Calculator",
            sd.member("value").expect("value"),
            &[],
            ptr::null_mut(),
        )
    };
    assert_eq!(
        err,
        Err(BridgeError::WrongMemberKind {
            member: "value".into(),
            expected: MemberKind::Function,
        })
    );
}

#[test]
fn test_lookup_failures() {
    let registry = setup();
    let mut calc = Calculator::default();
    let unknown_type = unsafe {
        call(&registry, inst(&mut calc), "Abacus", "add", &[], ptr::null_mut())
    };
    assert_eq!(unknown_type, Err(BridgeError::UnknownType("Abacus".into())));

    let unknown_member = unsafe {
        call(&registry, inst(&mut calc), "Calculator", "divide", &[], ptr::null_mut())
    };
    assert_eq!(
        unknown_member,
        Err(BridgeError::UnknownMember {
            type_name: "Calculator".into(),
            member: "divide".into(),
        })
    );
}

#[test]
fn test_member_of_other_type_is_mismatch() {
    let registry = setup();
    let math = registry.lookup("MathUtils").expect("MathUtils");
    let scale = math.member("scale").expect("scale");
    let mut calc = Calculator { value: 3.0 };
    let err = unsafe {
        registry.call_member_function_with_config(
            &cfg(),
            inst(&mut calc),
            "Calculator",
            scale,
            &[arg(&2.0f64)],
            ptr::null_mut(),
        )
    };
    assert!(matches!(err, Err(BridgeError::TypeMismatch { .. })));
    assert_eq!(calc.value, 3.0);
}

#[test]
fn test_null_pointers_rejected() {
    let registry = setup();
    let mut calc = Calculator::default();
    let null_instance = unsafe {
        call(&registry, ptr::null_mut(), "Calculator", "reset", &[], ptr::null_mut())
    };
    assert!(matches!(null_instance, Err(BridgeError::InvalidArgument(_))));

    let null_arg = unsafe {
        call(&registry, inst(&mut calc), "Calculator", "setValue", &[ptr::null()], ptr::null_mut())
    };
    assert!(matches!(null_arg, Err(BridgeError::InvalidArgument(_))));

    let null_result = unsafe {
        call(&registry, inst(&mut calc), "Calculator", "add", &[arg(&1.0f64)], ptr::null_mut())
    };
    assert!(matches!(null_result, Err(BridgeError::InvalidArgument(_))));
    assert_eq!(calc.value, 0.0);
}

#[test]
fn test_void_result_buffer_policy() {
    let registry = setup();
    let mut calc = Calculator { value: 4.0 };
    let mut unused = 99.0f64;
    unsafe {
        call(&registry, inst(&mut calc), "Calculator", "reset", &[], inst(&mut unused))
            .expect("lenient");
    }
    assert_eq!(calc.value, 0.0);
    assert_eq!(unused, 99.0);

    let strict = BridgeConfig {
        strict_void_result: true,
        ..BridgeConfig::default()
    };
    calc.value = 4.0;
    let err = unsafe {
        registry.call_method_with_config(&strict, inst(&mut calc), "Calculator", "reset", &[], inst(&mut unused))
    };
    assert!(matches!(err, Err(BridgeError::InvalidArgument(_))));
    assert_eq!(calc.value, 4.0);
}

#[test]
fn test_panic_is_contained() {
    let registry = setup();
    let mut calc = Calculator::default();
    let mut out = 0.0f64;
    let err = unsafe {
        call(&registry, inst(&mut calc), "Calculator", "explode", &[], inst(&mut out))
    };
    assert_eq!(
        err,
        Err(BridgeError::Panicked {
            member: "explode".into(),
            message: "calculator exploded".into(),
        })
    );
}

#[test]
fn test_const_member_on_other_type() {
    let registry = setup();
    let mut utils = MathUtils { x: 3.0, y: 4.0 };
    let mut out = 0.0f64;
    unsafe {
        call(&registry, inst(&mut utils), "MathUtils", "distance", &[], inst(&mut out))
            .expect("distance");
        call(&registry, inst(&mut utils), "MathUtils", "scale", &[arg(&2.0f64)], ptr::null_mut())
            .expect("scale");
    }
    assert_eq!(out, 5.0);
    assert_eq!((utils.x, utils.y), (6.0, 8.0));
}
