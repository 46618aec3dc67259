use super::*;
use crate::generator::builtin::HostAlignment;
use crate::generator::{register_builtin_generators, Generator};

fn host_alignment(offset: i64) -> Pipeline {
    let mut g = HostAlignment::new();
    g.set_param("offset", &offset.to_string()).unwrap();
    g.build(&Target::parse("x86-64-linux").unwrap()).unwrap()
}

fn registry() -> GeneratorRegistry {
    let r = GeneratorRegistry::new();
    register_builtin_generators(&r).unwrap();
    r
}

#[test]
fn test_compile_rewrites_only_provably_aligned_inputs() {
    let target = Target::parse("x86-64-linux").unwrap();
    let compiled = compile_pipeline(&host_alignment(3), &target).unwrap();
    // i1 (128) and i2 (32) are known; i3 has no declared alignment.
    assert_eq!(compiled.report.unaligned, 2);
    assert_eq!(compiled.report.unchanged, 1);
    assert_ne!(compiled.aligned, compiled.lowered);
    assert_eq!(compiled.name, "host_alignment");
}

#[test]
fn test_compile_aligned_offset_is_identity() {
    let target = Target::parse("x86-64-linux").unwrap();
    let compiled = compile_pipeline(&host_alignment(0), &target).unwrap();
    assert_eq!(compiled.report.rewrites(), 0);
    assert_eq!(compiled.aligned, compiled.lowered);
}

#[test]
fn test_compile_for_targets_keeps_order() {
    let targets = vec![
        Target::parse("x86-64-linux").unwrap(),
        Target::parse("x86-64-linux-avx2").unwrap(),
        Target::parse("arm-64-android-hvx_128").unwrap(),
    ];
    let results = compile_for_targets(&host_alignment(16), &targets);
    assert_eq!(results.len(), 3);
    for (r, t) in results.iter().zip(&targets) {
        assert_eq!(&r.as_ref().unwrap().target, t);
    }
    // The 16-lane loads are native on the first target and narrow on
    // the wider ones.
    assert_eq!(results[0].as_ref().unwrap().report.rewrites(), 0);
    assert_eq!(results[1].as_ref().unwrap().report.narrowed, 3);
    assert_eq!(results[2].as_ref().unwrap().report.narrowed, 3);
}

#[test]
fn test_generate_single_target() {
    let dir = tempfile::tempdir().unwrap();
    let request = GenerateRequest {
        generator: "deinterleave".to_string(),
        function_name: "demo::split".to_string(),
        file_base_name: String::new(),
        output_dir: dir.path().to_path_buf(),
        params: GeneratorParamValues::new(),
        targets: vec![Target::parse("x86-64-linux").unwrap()],
        emit: EmitOptions::parse("stmt,report", "").unwrap(),
    };
    let written = generate(&registry(), &request).unwrap();
    assert_eq!(
        written,
        vec![dir.path().join("split.stmt"), dir.path().join("split.align.txt")]
    );
    let stmt = std::fs::read_to_string(dir.path().join("split.stmt")).unwrap();
    assert!(stmt.contains("func demo::split(input, even, odd) {"));
    assert!(stmt.contains("shuffle_vector"));
    let report = std::fs::read_to_string(dir.path().join("split.align.txt")).unwrap();
    assert!(report.contains("deinterleaved: 2"));
}

#[test]
fn test_generate_multi_target_suffixes_stems() {
    let dir = tempfile::tempdir().unwrap();
    let request = GenerateRequest {
        generator: "host_alignment".to_string(),
        function_name: String::new(),
        file_base_name: "ha".to_string(),
        output_dir: dir.path().to_path_buf(),
        params: GeneratorParamValues::from([("offset".to_string(), "5".to_string())]),
        targets: vec![
            Target::parse("x86-64-linux").unwrap(),
            Target::parse("x86-64-linux-avx2").unwrap(),
        ],
        emit: EmitOptions::default(),
    };
    let written = generate(&registry(), &request).unwrap();
    assert_eq!(
        written,
        vec![
            dir.path().join("ha-x86-64-linux.stmt"),
            dir.path().join("ha-x86-64-linux-avx2.stmt"),
        ]
    );
}

#[test]
fn test_generate_unknown_generator() {
    let dir = tempfile::tempdir().unwrap();
    let request = GenerateRequest {
        generator: "blur".to_string(),
        function_name: String::new(),
        file_base_name: String::new(),
        output_dir: dir.path().to_path_buf(),
        params: GeneratorParamValues::new(),
        targets: vec![Target::parse("x86-64-linux").unwrap()],
        emit: EmitOptions::default(),
    };
    let err = generate(&registry(), &request).unwrap_err();
    assert_eq!(err.message, "Generator not found: blur");
    assert!(!err.is_internal());
}

#[test]
fn test_generate_requires_a_target() {
    let request = GenerateRequest {
        generator: "host_alignment".to_string(),
        function_name: String::new(),
        file_base_name: String::new(),
        output_dir: PathBuf::from("unused"),
        params: GeneratorParamValues::new(),
        targets: Vec::new(),
        emit: EmitOptions::default(),
    };
    assert_eq!(generate(&registry(), &request).unwrap_err().message, "Target missing");
}
