// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Drive the tb_* entry points the way a C host would: records, raw
// pointers and status codes only.

use std::alloc::Layout;
use std::collections::HashMap;
use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::os::raw::c_void;
use std::ptr;
use std::sync::OnceLock;
use std::time::Duration;

use typebridge::{reflect_methods, OuterType, Reflect, SharedFuture};
use typebridge_c::*;

#[derive(Clone, Debug, Default, PartialEq, Reflect)]
struct Address {
    street: String,
    city: String,
    zipcode: i32,
}

#[derive(Clone, Debug, PartialEq, Reflect)]
enum Reading {
    Count(i32),
    Label(String),
}

#[derive(Clone, Debug, Reflect)]
#[reflect(methods)]
struct Sensor {
    id: u32,
    address: Address,
    samples: Vec<f64>,
    limits: HashMap<String, i32>,
    calibration: Option<f64>,
    last: Reading,
}

#[reflect_methods]
impl Sensor {
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn record(&mut self, sample: f64) {
        self.samples.push(sample);
    }

    pub fn describe(&self, prefix: &str) -> String {
        format!("{prefix}#{}", self.id)
    }

    pub fn relabel(&mut self, reading: Reading) {
        self.last = reading;
    }

    pub fn calibrate(&mut self, offset: Option<f64>) -> bool {
        self.calibration = offset;
        offset.is_some()
    }

    #[reflect(rename = "averageAsync")]
    pub fn average_async(&self, delay_ms: i32) -> SharedFuture<f64> {
        let avg = self.average();
        SharedFuture::spawn(move || {
            std::thread::sleep(Duration::from_millis(delay_ms as u64));
            avg
        })
    }
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            id: 7,
            address: Address::default(),
            samples: Vec::new(),
            limits: HashMap::new(),
            calibration: None,
            last: Reading::Count(0),
        }
    }
}

fn init() {
    static ONCE: OnceLock<()> = OnceLock::new();
    ONCE.get_or_init(|| {
        typebridge::register_type::<Address>("Address").expect("register Address");
        typebridge::register_type::<Sensor>("Sensor").expect("register Sensor");
    });
}

fn type_info(name: &CStr) -> &'static TbStructInfo {
    let mut info = ptr::null();
    assert_eq!(unsafe { tb_get_type_info(name.as_ptr(), &mut info) }, TbStatus::TbOk);
    unsafe { &*info }
}

fn member(info: &TbStructInfo, name: &CStr) -> &'static TbMemberInfo {
    let mut found = ptr::null();
    assert_eq!(
        unsafe { tb_find_member(info, name.as_ptr(), &mut found) },
        TbStatus::TbOk
    );
    unsafe { &*found }
}

fn field(m: &TbMemberInfo, obj: &mut Sensor) -> *mut c_void {
    let mut out = ptr::null_mut();
    assert_eq!(
        unsafe { tb_member_get(m, (obj as *mut Sensor).cast(), &mut out) },
        TbStatus::TbOk
    );
    out
}

/// Storage sized and aligned from a type record, the way a C host
/// allocates argument and result buffers.
struct Slot {
    ptr: *mut u8,
    layout: Layout,
}

impl Slot {
    fn new(desc: *const TbTypeDescriptor) -> Self {
        let desc = unsafe { &*desc };
        let layout = Layout::from_size_align(desc.size.max(1), desc.align).expect("layout");
        let ptr = unsafe { std::alloc::alloc(layout) };
        assert!(!ptr.is_null());
        Self { ptr, layout }
    }

    fn as_ptr(&self) -> *mut c_void {
        self.ptr.cast()
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        unsafe { std::alloc::dealloc(self.ptr, self.layout) };
    }
}

fn string_slot(desc: *const TbTypeDescriptor, text: &str) -> Slot {
    let slot = Slot::new(desc);
    assert_eq!(
        unsafe { tb_string_construct(desc, slot.as_ptr(), text.as_ptr(), text.len()) },
        TbStatus::TbOk
    );
    slot
}

fn last_error() -> String {
    let mut buf = [0u8; 256];
    let mut len = 0usize;
    unsafe { tb_last_error_message(buf.as_mut_ptr().cast(), buf.len(), &mut len) };
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

#[test]
fn test_struct_records() {
    init();
    assert!(tb_type_count() >= 2);
    let info = type_info(c"Sensor");
    assert_eq!(unsafe { CStr::from_ptr(info.type_name) }.to_str(), Ok("Sensor"));
    assert_eq!(info.size, std::mem::size_of::<Sensor>());
    assert_eq!(info.member_count, 12);

    let address = member(info, c"address");
    assert_eq!(address.kind, 0);
    let address_type = unsafe { &*address.type_desc };
    assert_eq!(address_type.outer_type, OuterType::Struct as u32);

    let mut resolved = ptr::null();
    assert_eq!(
        unsafe { tb_get_type_info_by_hash(address_type.struct_hash, &mut resolved) },
        TbStatus::TbOk
    );
    assert_eq!(
        unsafe { CStr::from_ptr((*resolved).type_name) }.to_str(),
        Ok("Address")
    );

    let describe = member(info, c"describe");
    assert_eq!(describe.kind, 1);
    let sig = unsafe { &*describe.function };
    assert_eq!(sig.param_count, 1);
    assert!(sig.is_const);
    assert_eq!(unsafe { (*sig.return_type).outer_type }, OuterType::String as u32);

    let record = member(info, c"record");
    assert!(unsafe { (*record.function).return_type }.is_null());
}

#[test]
fn test_lookup_failures_set_last_error() {
    init();
    let mut info = ptr::null();
    assert_eq!(
        unsafe { tb_get_type_info(c"Thermostat".as_ptr(), &mut info) },
        TbStatus::TbUnknownType
    );
    assert!(info.is_null());
    assert_eq!(last_error(), "Unknown type: Thermostat");

    let sensor = type_info(c"Sensor");
    let mut found = ptr::null();
    assert_eq!(
        unsafe { tb_find_member(sensor, c"humidity".as_ptr(), &mut found) },
        TbStatus::TbUnknownMember
    );
    assert_eq!(
        unsafe { tb_get_type_info(ptr::null(), &mut info) },
        TbStatus::TbInvalidArgument
    );
}

#[test]
fn test_calls_through_c_surface() {
    init();
    let mut sensor = Sensor::default();
    let instance = (&mut sensor as *mut Sensor).cast::<c_void>();

    for sample in [1.0f64, 2.0, 6.0] {
        let args = [(&sample as *const f64).cast::<c_void>()];
        let status = unsafe {
            tb_call_method(instance, c"Sensor".as_ptr(), c"record".as_ptr(), args.as_ptr(), 1, ptr::null_mut())
        };
        assert_eq!(status, TbStatus::TbOk);
    }

    let info = type_info(c"Sensor");
    let average = member(info, c"average");
    let mut out = 0.0f64;
    let status = unsafe {
        tb_call_member_function(
            instance,
            c"Sensor".as_ptr(),
            average,
            ptr::null(),
            0,
            (&mut out as *mut f64).cast(),
        )
    };
    assert_eq!(status, TbStatus::TbOk);
    assert_eq!(out, 3.0);

    let describe = unsafe { &*member(info, c"describe").function };
    let param_desc = unsafe { *describe.params };
    let prefix = string_slot(param_desc, "sensor");
    let args = [prefix.as_ptr().cast_const()];
    let text = Slot::new(describe.return_type);
    let status = unsafe {
        tb_call_method(instance, c"Sensor".as_ptr(), c"describe".as_ptr(), args.as_ptr(), 1, text.as_ptr())
    };
    assert_eq!(status, TbStatus::TbOk);
    let mut buf = [0u8; 32];
    let mut len = 0;
    unsafe {
        assert_eq!(
            tb_string_copy(describe.return_type, text.as_ptr(), buf.as_mut_ptr(), buf.len(), &mut len),
            TbStatus::TbOk
        );
        assert_eq!(tb_value_drop(describe.return_type, text.as_ptr()), TbStatus::TbOk);
        assert_eq!(tb_value_drop(param_desc, prefix.as_ptr()), TbStatus::TbOk);
    }
    assert_eq!(&buf[..len], b"sensor#7");

    let status = unsafe {
        tb_call_method(instance, c"Sensor".as_ptr(), c"record".as_ptr(), ptr::null(), 0, ptr::null_mut())
    };
    assert_eq!(status, TbStatus::TbArityMismatch);
    assert_eq!(sensor.samples, [1.0, 2.0, 6.0]);
}

#[test]
fn test_value_helpers_on_members() {
    init();
    let info = type_info(c"Sensor");
    let mut sensor = Sensor::default();

    let samples = member(info, c"samples");
    let vec_ptr = field(samples, &mut sensor);
    let x = 4.5f64;
    unsafe {
        assert_eq!(tb_vector_push(samples.type_desc, vec_ptr, (&x as *const f64).cast()), TbStatus::TbOk);
        let mut len = 0;
        assert_eq!(tb_vector_len(samples.type_desc, vec_ptr, &mut len), TbStatus::TbOk);
        assert_eq!(len, 1);
        let mut elem = ptr::null_mut();
        assert_eq!(tb_vector_at(samples.type_desc, vec_ptr, 0, &mut elem), TbStatus::TbOk);
        assert_eq!(*elem.cast::<f64>(), 4.5);
        assert_eq!(tb_vector_at(samples.type_desc, vec_ptr, 5, &mut elem), TbStatus::TbInvalidArgument);
    }

    let limits = member(info, c"limits");
    let map_ptr = field(limits, &mut sensor);
    let key_desc = unsafe { (*limits.type_desc).key };
    let key = string_slot(key_desc, "max");
    let missing = string_slot(key_desc, "min");
    let value = 90i32;
    unsafe {
        assert_eq!(
            tb_map_insert(limits.type_desc, map_ptr, key.as_ptr(), (&value as *const i32).cast()),
            TbStatus::TbOk
        );
        let mut found = ptr::null_mut();
        assert_eq!(tb_map_find(limits.type_desc, map_ptr, key.as_ptr(), &mut found), TbStatus::TbOk);
        assert_eq!(*found.cast::<i32>(), 90);
        assert_eq!(tb_map_find(limits.type_desc, map_ptr, missing.as_ptr(), &mut found), TbStatus::TbOk);
        assert!(found.is_null());
        assert_eq!(tb_value_drop(key_desc, key.as_ptr()), TbStatus::TbOk);
        assert_eq!(tb_value_drop(key_desc, missing.as_ptr()), TbStatus::TbOk);
    }

    let calibration = member(info, c"calibration");
    let opt_ptr = field(calibration, &mut sensor);
    let offset = 0.25f64;
    unsafe {
        let mut has = true;
        assert_eq!(tb_optional_has_value(calibration.type_desc, opt_ptr, &mut has), TbStatus::TbOk);
        assert!(!has);
        assert_eq!(tb_optional_emplace(calibration.type_desc, opt_ptr, (&offset as *const f64).cast()), TbStatus::TbOk);
    }

    let last = member(info, c"last");
    let variant_ptr = field(last, &mut sensor);
    let alternatives =
        unsafe { std::slice::from_raw_parts((*last.type_desc).alternatives, (*last.type_desc).alternative_count) };
    assert_eq!(unsafe { (*alternatives[1]).outer_type }, OuterType::String as u32);
    let label = string_slot(alternatives[1], "overheat");
    unsafe {
        assert_eq!(tb_variant_emplace(last.type_desc, variant_ptr, 1, label.as_ptr()), TbStatus::TbOk);
        let mut index = 0usize;
        assert_eq!(tb_variant_index(last.type_desc, variant_ptr, &mut index), TbStatus::TbOk);
        assert_eq!(index, 1);
        assert_eq!(tb_value_drop(alternatives[1], label.as_ptr()), TbStatus::TbOk);
    }

    // Wrong shape for the helper.
    let mut len = 0;
    assert_eq!(
        unsafe { tb_map_len(samples.type_desc, vec_ptr, &mut len) },
        TbStatus::TbTypeMismatch
    );

    let zipcode = type_info(c"Address");
    let address = member(info, c"address");
    let address_ptr = field(address, &mut sensor);
    let zip = member(zipcode, c"zipcode");
    let code = 12345i32;
    assert_eq!(
        unsafe { tb_member_set(zip, address_ptr, (&code as *const i32).cast()) },
        TbStatus::TbOk
    );

    assert_eq!(sensor.samples, [4.5]);
    assert_eq!(sensor.limits.get("max"), Some(&90));
    assert_eq!(sensor.calibration, Some(0.25));
    assert_eq!(sensor.last, Reading::Label("overheat".into()));
    assert_eq!(sensor.address.zipcode, 12345);
}

#[test]
fn test_instances_and_futures() {
    init();
    let sensor: &'static mut Sensor = Box::leak(Box::new(Sensor {
        samples: vec![2.0, 4.0],
        ..Sensor::default()
    }));
    let address = (sensor as *mut Sensor).cast::<c_void>();
    assert_eq!(
        unsafe { tb_register_instance(c"sensor.main".as_ptr(), address, c"Sensor".as_ptr()) },
        TbStatus::TbOk
    );

    let mut found = ptr::null_mut();
    let mut type_name = ptr::null();
    let mut info = ptr::null();
    assert_eq!(
        unsafe { tb_get_instance(c"sensor.main".as_ptr(), &mut found, &mut type_name, &mut info) },
        TbStatus::TbOk
    );
    assert_eq!(found, address);
    assert_eq!(unsafe { CStr::from_ptr(type_name) }.to_str(), Ok("Sensor"));
    assert!(!info.is_null());

    // The name survives even when its type was never registered.
    let mut spare = 0u64;
    assert_eq!(
        unsafe {
            tb_register_instance(c"sensor.spare".as_ptr(), (&mut spare as *mut u64).cast(), c"Hygrometer".as_ptr())
        },
        TbStatus::TbOk
    );
    assert_eq!(
        unsafe { tb_get_instance(c"sensor.spare".as_ptr(), &mut found, &mut type_name, &mut info) },
        TbStatus::TbOk
    );
    assert_eq!(unsafe { CStr::from_ptr(type_name) }.to_str(), Ok("Hygrometer"));
    assert!(info.is_null());

    assert_eq!(
        unsafe { tb_get_instance(c"nobody".as_ptr(), &mut found, &mut type_name, &mut info) },
        TbStatus::TbNotFound
    );
    assert!(type_name.is_null());
    assert_eq!(last_error(), "No instance named 'nobody'");

    let average_async = member(type_info(c"Sensor"), c"averageAsync");
    let future_desc = unsafe { (*average_async.function).return_type };
    assert_eq!(unsafe { (*future_desc).outer_type }, OuterType::SharedFuture as u32);
    assert_eq!(unsafe { (*future_desc).value_type }, OuterType::F64 as u32);

    let delay = 50i32;
    let args = [(&delay as *const i32).cast::<c_void>()];
    let mut handle = MaybeUninit::<SharedFuture<f64>>::uninit();
    let status = unsafe {
        tb_call_member_function(address, c"Sensor".as_ptr(), average_async, args.as_ptr(), 1, handle.as_mut_ptr().cast())
    };
    assert_eq!(status, TbStatus::TbOk);

    let mut out = 0.0f64;
    unsafe {
        assert_eq!(
            tb_future_get(future_desc, handle.as_ptr().cast(), (&mut out as *mut f64).cast(), 10_000),
            TbStatus::TbOk
        );
        let mut ready = false;
        assert_eq!(tb_future_is_ready(future_desc, handle.as_ptr().cast(), &mut ready), TbStatus::TbOk);
        assert!(ready);
        assert_eq!(tb_value_drop(future_desc, handle.as_mut_ptr().cast()), TbStatus::TbOk);
    }
    assert_eq!(out, 3.0);

    let invalid = SharedFuture::<f64>::invalid();
    assert_eq!(
        unsafe { tb_future_get(future_desc, (&invalid as *const SharedFuture<f64>).cast(), (&mut out as *mut f64).cast(), 0) },
        TbStatus::TbFutureInvalid
    );
}

#[test]
fn test_arguments_built_in_c_storage() {
    init();
    let info = type_info(c"Sensor");
    let mut sensor = Sensor::default();
    let instance = (&mut sensor as *mut Sensor).cast::<c_void>();

    // Variant argument in {index, payload} form.
    let relabel = unsafe { &*member(info, c"relabel").function };
    let reading_desc = unsafe { *relabel.params };
    let alternatives = unsafe { std::slice::from_raw_parts((*reading_desc).alternatives, 2) };
    let text = string_slot(alternatives[1], "drift");
    let reading = Slot::new(reading_desc);
    unsafe {
        assert_eq!(tb_variant_construct(reading_desc, reading.as_ptr(), 1, text.as_ptr()), TbStatus::TbOk);
        let args = [reading.as_ptr().cast_const()];
        assert_eq!(
            tb_call_method(instance, c"Sensor".as_ptr(), c"relabel".as_ptr(), args.as_ptr(), 1, ptr::null_mut()),
            TbStatus::TbOk
        );
        assert_eq!(tb_value_drop(reading_desc, reading.as_ptr()), TbStatus::TbOk);
        assert_eq!(
            tb_variant_construct(reading_desc, reading.as_ptr(), 2, text.as_ptr()),
            TbStatus::TbInvalidArgument
        );
        assert_eq!(tb_value_drop(alternatives[1], text.as_ptr()), TbStatus::TbOk);
    }
    assert_eq!(sensor.last, Reading::Label("drift".into()));

    // Optional argument: absent without any payload, then present.
    let calibrate = unsafe { &*member(info, c"calibrate").function };
    let offset_desc = unsafe { *calibrate.params };
    let offset = Slot::new(offset_desc);
    let mut applied = true;
    unsafe {
        assert_eq!(tb_optional_construct(offset_desc, offset.as_ptr(), ptr::null()), TbStatus::TbOk);
        let args = [offset.as_ptr().cast_const()];
        assert_eq!(
            tb_call_method(
                instance,
                c"Sensor".as_ptr(),
                c"calibrate".as_ptr(),
                args.as_ptr(),
                1,
                (&mut applied as *mut bool).cast()
            ),
            TbStatus::TbOk
        );
        assert!(!applied);
        assert_eq!(tb_value_drop(offset_desc, offset.as_ptr()), TbStatus::TbOk);

        let value = 0.5f64;
        assert_eq!(
            tb_optional_construct(offset_desc, offset.as_ptr(), (&value as *const f64).cast()),
            TbStatus::TbOk
        );
        assert_eq!(
            tb_call_method(
                instance,
                c"Sensor".as_ptr(),
                c"calibrate".as_ptr(),
                args.as_ptr(),
                1,
                (&mut applied as *mut bool).cast()
            ),
            TbStatus::TbOk
        );
        assert!(applied);
        assert_eq!(tb_value_drop(offset_desc, offset.as_ptr()), TbStatus::TbOk);
    }
    assert_eq!(sensor.calibration, Some(0.5));

    // Empty vector built in place, filled, then stored into the member.
    let samples = member(info, c"samples");
    let list = Slot::new(samples.type_desc);
    let sample = 1.5f64;
    unsafe {
        assert_eq!(tb_value_construct_empty(samples.type_desc, list.as_ptr()), TbStatus::TbOk);
        assert_eq!(tb_vector_push(samples.type_desc, list.as_ptr(), (&sample as *const f64).cast()), TbStatus::TbOk);
        assert_eq!(tb_member_set(samples, instance, list.as_ptr()), TbStatus::TbOk);
        assert_eq!(tb_value_drop(samples.type_desc, list.as_ptr()), TbStatus::TbOk);
    }
    assert_eq!(sensor.samples, [1.5]);

    let id = member(info, c"id");
    let scratch = Slot::new(id.type_desc);
    assert_eq!(
        unsafe { tb_value_construct_empty(id.type_desc, scratch.as_ptr()) },
        TbStatus::TbTypeMismatch
    );
}
