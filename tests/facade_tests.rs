//! Stream, command and attribute paths against one loaded device

use sharedbuf_core::config::DeviceConfig;
use sharedbuf_core::error::{errno, DeviceError};
use sharedbuf_device::command::{IocFields, CLEAR_BUF, GET_SIZE, IOC_MAGIC, SET_SIZE};
use sharedbuf_device::device::Stage;
use sharedbuf_device::{BadAddress, Device, LoadError, LocalRegistrar};

fn load() -> (Device, LocalRegistrar) {
    let mut reg = LocalRegistrar::new();
    let dev = Device::load(DeviceConfig::default(), &mut reg).expect("load");
    (dev, reg)
}

#[test]
fn test_command_codes_match_linux_layout() {
    assert_eq!(CLEAR_BUF, 0x0000_6b01);
    assert_eq!(GET_SIZE, 0x8004_6b02);
    assert_eq!(SET_SIZE, 0x4004_6b03);

    let f = IocFields::decode(SET_SIZE);
    assert_eq!(f.ty, IOC_MAGIC);
    assert_eq!(f.nr, 3);
    assert_eq!(f.size, 4);
}

#[test]
fn test_zero_size_command_accepted_attribute_rejected() {
    let (dev, _reg) = load();

    assert_eq!(
        dev.attribute().store(b"0"),
        Err(DeviceError::InvalidArgument)
    );
    assert_eq!(dev.attribute().show(), "64\n");

    dev.commands().set_size(0).expect("command path allows zero");
    assert_eq!(dev.commands().get_size().unwrap(), 0);
    assert_eq!(dev.attribute().show(), "0\n");

    // Any positioned access on an empty buffer is out of space
    let mut s = dev.open(0);
    assert!(matches!(
        s.read_vec(1),
        Err(DeviceError::OutOfSpace { offset: 0, capacity: 0 })
    ));
}

#[test]
fn test_attribute_store_then_command_get() {
    let (dev, _reg) = load();

    assert_eq!(dev.attribute().store(b"0x80\n").unwrap(), 5);
    assert_eq!(dev.commands().get_size().unwrap(), 128);

    assert_eq!(dev.attribute().store(b"010").unwrap(), 3);
    assert_eq!(dev.commands().get_size().unwrap(), 8);

    for bad in [&b"abc"[..], b"", b"-1", b"12 ", b"4294967296", b"0x"] {
        assert_eq!(
            dev.attribute().store(bad),
            Err(DeviceError::InvalidArgument),
            "{:?}",
            String::from_utf8_lossy(bad)
        );
    }
    assert_eq!(dev.attribute().show(), "8\n");
}

#[test]
fn test_session_cursor_advances_across_calls() {
    let (dev, _reg) = load();
    let mut s = dev.open(0);

    assert_eq!(s.write_bytes(b"hello ").unwrap(), 6);
    assert_eq!(s.write_bytes(b"world").unwrap(), 5);
    assert_eq!(s.position(), 11);

    // A second session starts at zero and sees the first one's writes
    let mut other = dev.open(0);
    assert_eq!(other.read_vec(11).unwrap(), b"hello world");
    assert_eq!(other.position(), 11);
    assert_eq!(s.position(), 11);
}

#[test]
fn test_stale_cursor_after_shrink_is_out_of_space() {
    let (dev, _reg) = load();
    let mut s = dev.open(0);
    s.seek(50);
    assert_eq!(s.write_bytes(b"tail").unwrap(), 4);
    assert_eq!(s.position(), 54);

    dev.commands().set_size(16).unwrap();

    assert_eq!(
        s.read_vec(4),
        Err(DeviceError::OutOfSpace {
            offset: 54,
            capacity: 16
        })
    );
    assert_eq!(s.position(), 54);

    // Growing again brings the position back into range, now zero-filled
    dev.commands().set_size(64).unwrap();
    s.seek(50);
    assert_eq!(s.read_vec(4).unwrap(), vec![0u8; 4]);
}

#[test]
fn test_clear_via_raw_ioctl_keeps_size() {
    let (dev, _reg) = load();
    let mut s = dev.open(0);
    s.write_bytes(&[0xaa; 64]).unwrap();

    dev.commands().ioctl(CLEAR_BUF, &mut BadAddress).unwrap();
    s.seek(0);
    assert_eq!(s.read_vec(64).unwrap(), vec![0u8; 64]);
    assert_eq!(dev.commands().get_size().unwrap(), 64);
}

#[test]
fn test_raw_ioctl_with_byte_slot() {
    let (dev, _reg) = load();

    let mut slot = 200u32.to_ne_bytes();
    dev.commands().ioctl(SET_SIZE, &mut slot).unwrap();

    let mut out = [0u8; 4];
    dev.commands().ioctl(GET_SIZE, &mut out).unwrap();
    assert_eq!(u32::from_ne_bytes(out), 200);
}

#[test]
fn test_bad_argument_address_faults() {
    let (dev, _reg) = load();
    assert_eq!(
        dev.commands().ioctl(GET_SIZE, &mut BadAddress),
        Err(DeviceError::Fault)
    );
    assert_eq!(
        dev.commands().ioctl(SET_SIZE, &mut BadAddress),
        Err(DeviceError::Fault)
    );
    assert_eq!(dev.commands().get_size().unwrap(), 64);
}

#[test]
fn test_unknown_command_is_unsupported() {
    let (dev, _reg) = load();
    let mut arg = 0u32;
    let err = dev.commands().ioctl(0x6b04, &mut arg).unwrap_err();
    assert_eq!(err, DeviceError::UnsupportedOperation { cmd: 0x6b04 });
    assert_eq!(err.errno(), -errno::ENOTTY);
}

#[test]
fn test_errno_values() {
    let cases = [
        (
            DeviceError::OutOfSpace {
                offset: 1,
                capacity: 1,
            },
            28,
        ),
        (DeviceError::Fault, 14),
        (DeviceError::OutOfMemory { requested: 1 }, 12),
        (DeviceError::InvalidArgument, 22),
        (DeviceError::UnsupportedOperation { cmd: 0 }, 25),
    ];
    for (err, code) in cases {
        assert_eq!(err.errno(), -code, "{err}");
    }
}

#[test]
fn test_out_of_memory_through_every_path() {
    let mut reg = LocalRegistrar::new();
    let cfg = DeviceConfig {
        mem_cap_bytes: 256,
        ..Default::default()
    };
    let dev = Device::load(cfg, &mut reg).unwrap();

    assert_eq!(
        dev.commands().set_size(257),
        Err(DeviceError::OutOfMemory { requested: 257 })
    );
    assert_eq!(
        dev.attribute().store(b"1000\n"),
        Err(DeviceError::OutOfMemory { requested: 1000 })
    );
    assert_eq!(dev.attribute().show(), "64\n");
}

#[test]
fn test_load_unwinds_on_registration_failure() {
    for stage in [Stage::StreamNode, Stage::AttributeDir, Stage::AttributeGroup] {
        let mut reg = LocalRegistrar::failing_at(stage);
        match Device::load(DeviceConfig::default(), &mut reg) {
            Err(LoadError::Register { stage: s, .. }) => assert_eq!(s, stage),
            other => panic!("expected register failure at {stage}, got {other:?}"),
        }
        assert!(reg.is_empty());
    }
}

#[test]
fn test_two_devices_get_distinct_majors() {
    let mut reg = LocalRegistrar::new();
    let a = Device::load(DeviceConfig::default(), &mut reg).unwrap();
    let b = Device::load(
        DeviceConfig {
            name: "second".into(),
            ..Default::default()
        },
        &mut reg,
    )
    .unwrap();
    assert_ne!(a.major(), b.major());

    // Same name twice is refused and leaves the first registration alone
    assert!(Device::load(DeviceConfig::default(), &mut reg).is_err());
    assert_eq!(reg.stream_major("hello_cdev"), Some(a.major()));

    a.unload(&mut reg);
    b.unload(&mut reg);
    assert!(reg.is_empty());
}
