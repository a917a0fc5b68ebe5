use std::{fs, path::PathBuf};

use x3d_filter::{driver, ExitCode, Options};

const BOX: &str = r#"<X3D xmlns="http://www.web3d.org/specifications/x3d-namespace" profile="Interchange" version="3.1">
  <Scene>
    <Shape><Box size="1 2 3"/></Shape>
  </Scene>
</X3D>"#;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("x3dfilter-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn options(line: &str) -> Options {
    let args: Vec<String> = line.split_whitespace().map(Into::into).collect();
    Options::parse(&args).unwrap()
}

#[test]
fn converts_a_file() {
    let input = scratch("box.x3d");
    let output = scratch("box.x3dv");
    fs::write(&input, BOX).unwrap();
    let opts = options(&format!(
        "Material {} {} -exportVersion 3.3 -maxRunTime 5",
        input.display(),
        output.display()
    ));
    driver::run(&opts).unwrap();
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("#X3D V3.3 utf8\nPROFILE Interchange\n"), "{}", text);
    assert!(text.contains("diffuseColor 0.8 0.8 0.8"));
    assert!(text.contains("size 1 2 3"));
}

#[test]
fn failures_map_to_exit_codes() {
    let input = scratch("bad.x3d");
    fs::write(&input, "<X3D").unwrap();
    let out = scratch("bad.x3dv");
    let cases = [
        (
            format!("Identity {} {}", input.display(), out.display()),
            ExitCode::InvalidInputFile,
        ),
        (format!("Identity {} out.x3db", input.display()), ExitCode::UnsupportedFormat),
        ("Identity in.obj out.x3dv".to_owned(), ExitCode::UnsupportedFormat),
        (
            format!("Identity {} out.x3dv -outputType binary", input.display()),
            ExitCode::UnsupportedFormat,
        ),
    ];
    for (line, code) in cases {
        let err = driver::run(&options(&line)).unwrap_err();
        assert_eq!(err.exit_code(), code, "{}", line);
    }
    assert_eq!(ExitCode::MaxRunTimeExceeded.code(), 10);
}

#[test]
fn unwritable_output() {
    let input = scratch("ok.x3d");
    fs::write(&input, BOX).unwrap();
    let output = scratch("missing-dir/out.x3dv");
    let err = driver::run(&options(&format!("Identity {} {}", input.display(), output.display())))
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::CannotWriteOutputFile);
}
