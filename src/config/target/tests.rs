use super::*;

#[test]
fn test_parse_full_string() {
    let t = Target::parse("x86-64-linux-avx2").unwrap();
    assert_eq!(t.arch, Arch::X86);
    assert_eq!(t.bits, 64);
    assert_eq!(t.os, Os::Linux);
    assert!(t.has_feature(Feature::Avx2));
    assert_eq!(t.natural_vector_bytes(), 32);
    assert_eq!(t.to_string(), "x86-64-linux-avx2");
}

#[test]
fn test_parse_host_with_features() {
    let t = Target::parse("host-hvx_128").unwrap();
    assert_eq!(t.arch, Target::host().arch);
    assert!(t.has_feature(Feature::Hvx128));
    assert_eq!(t.natural_vector_bytes(), 128);
}

#[test]
fn test_parse_rejects_unknown_token() {
    let err = Target::parse("x86-64-linux-sse9").unwrap_err();
    assert!(err.message.contains("sse9"));
    assert!(err.help.unwrap().contains("hvx_128"));
}

#[test]
fn test_parse_requires_arch_bits_os() {
    assert!(Target::parse("x86-linux").is_err());
    assert!(Target::parse("avx2").is_err());
}

#[test]
fn test_natural_vector_size_per_type() {
    let t = Target::new(Arch::Arm, 64, Os::Android);
    assert_eq!(t.natural_vector_size(Type::uint(8)), 16);
    assert_eq!(t.natural_vector_size(Type::int(16)), 8);
    assert_eq!(t.natural_vector_size(Type::float(32)), 4);
    let t = t.with_feature(Feature::Hvx64);
    assert_eq!(t.natural_vector_size(Type::uint(16)), 32);
}

#[test]
fn test_hexagon_device_widths() {
    let host = Target::parse("x86-64-linux").unwrap();
    assert_eq!(host.device_vector_bytes(DeviceApi::Host).unwrap(), None);
    let t = host.clone().with_feature(Feature::Hvx64);
    assert_eq!(t.device_vector_bytes(DeviceApi::Hexagon).unwrap(), Some(64));
    let t = t.with_feature(Feature::Hvx128);
    assert_eq!(t.device_vector_bytes(DeviceApi::Hexagon).unwrap(), Some(128));
    let err = host.device_vector_bytes(DeviceApi::Hexagon).unwrap_err();
    assert!(err.is_internal());
    assert_eq!(err.message, "Unknown HVX mode");
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target.toml");
    std::fs::write(
        &path,
        r#"
# Snapdragon DSP
[target]
name = "dsp"
arch = "hexagon"
bits = 32
os = "qurt"
features = ["hvx_64", "no_asserts"]

[vector]
natural_bytes = 64
"#,
    )
    .unwrap();

    let t = Target::load(&path).unwrap();
    assert_eq!(t.arch, Arch::Hexagon);
    assert_eq!(t.bits, 32);
    assert_eq!(t.os, Os::Qurt);
    assert!(t.has_feature(Feature::Hvx64));
    assert!(t.has_feature(Feature::NoAsserts));
    assert_eq!(t.natural_vector_bytes(), 64);

    let resolved = Target::resolve(&format!("@{}", path.display())).unwrap();
    assert_eq!(resolved, t);
}

#[test]
fn test_natural_bytes_override_wins() {
    let t = Target::parse_toml(
        "[target]\narch = \"x86\"\nbits = 64\nos = \"linux\"\nfeatures = [\"avx512\"]\n[vector]\nnatural_bytes = 16\n",
    )
    .unwrap();
    assert_eq!(t.natural_vector_bytes(), 16);
}

#[test]
fn test_file_error_points_at_line() {
    let src = "[target]\narch = \"sparc\"\nbits = 64\nos = \"linux\"\n";
    let err = Target::parse_toml(src).unwrap_err();
    assert_eq!(err.message, "unknown arch 'sparc'");
    assert_eq!(&src[err.span.start as usize..err.span.end as usize], "arch = \"sparc\"");
}

#[test]
fn test_file_rejects_bad_width() {
    let src = "[target]\narch = \"x86\"\nbits = 64\nos = \"linux\"\n[vector]\nnatural_bytes = 48\n";
    let err = Target::parse_toml(src).unwrap_err();
    assert!(err.message.contains("power of two"));
}

#[test]
fn test_file_rejects_oversized_width() {
    let src = "[target]\narch = \"x86\"\nbits = 64\nos = \"linux\"\n[vector]\nnatural_bytes = 4294967296\n";
    let err = Target::parse_toml(src).unwrap_err();
    assert!(err.message.contains("at most 256"), "{}", err.message);
    assert_eq!(
        &src[err.span.start as usize..err.span.end as usize],
        "natural_bytes = 4294967296"
    );

    let widest = src.replace("4294967296", "256");
    assert_eq!(Target::parse_toml(&widest).unwrap().natural_vector_bytes(), 256);
}

#[test]
fn test_file_missing_os() {
    let err = Target::parse_toml("[target]\narch = \"arm\"\nbits = 64\n").unwrap_err();
    assert_eq!(err.message, "missing target.os");
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Target::load(&dir.path().join("nope.toml")).is_err());
}

#[test]
fn test_parse_string_array() {
    assert_eq!(parse_string_array(r#"["a", "b"]"#), vec!["a", "b"]);
    assert!(parse_string_array("[]").is_empty());
    assert!(parse_string_array("a").is_empty());
}
