mod common;

use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, SystemTime};

use common::mem_context;
use serde::Serialize;
use serde_json::json;
use stencil::error::{StencilError, StencilResult};
use stencil::file::{Chown, Contents, File, Format, Mode, Template, Touch};
use stencil::fs::{Filesystem, MemFs};
use stencil::generator::{Data, Sequence};

fn uppercase(source: &[u8]) -> StencilResult<Vec<u8>> {
    Ok(source.to_ascii_uppercase())
}

fn reject(_source: &[u8]) -> StencilResult<Vec<u8>> {
    Err(StencilError::FormatError("unexpected token".to_string()))
}

#[test]
fn test_contents_text() {
    let fs = MemFs::new();
    let (mut ctx, _out) = mem_context(&fs);

    ctx.run(&File::new("a.txt").with(Contents::from("plain text\n")))
        .unwrap();

    assert_eq!(fs.read_file("a.txt").unwrap(), b"plain text\n");
}

#[test]
fn test_contents_bytes() {
    let fs = MemFs::new();
    let (mut ctx, _out) = mem_context(&fs);
    let bytes = vec![0u8, 159, 146, 150];

    ctx.run(&File::new("a.bin").with(Contents::from(bytes.clone())))
        .unwrap();

    assert_eq!(fs.read_file("a.bin").unwrap(), bytes);
}

#[test]
fn test_contents_reader() {
    let fs = MemFs::new();
    let (mut ctx, _out) = mem_context(&fs);
    let file = File::new("stream.txt").with(Contents::reader(Cursor::new(b"streamed".to_vec())));

    ctx.run(&file).unwrap();
    assert_eq!(fs.read_file("stream.txt").unwrap(), b"streamed");

    // The drained stream is reused, so a second run stays identical.
    let (mut ctx, out) = mem_context(&fs);
    ctx.run(&file).unwrap();
    assert_eq!(out.contents(), "   identical  stream.txt\n");
}

#[test]
fn test_contents_value_is_indented_json() {
    let fs = MemFs::new();
    let (mut ctx, _out) = mem_context(&fs);
    let value = json!({"name": "demo", "tags": ["a", "b"]});

    ctx.run(&File::new("data.json").with(Contents::from(value.clone())))
        .unwrap();

    let written = fs.read_file("data.json").unwrap();
    assert_eq!(written, serde_json::to_vec_pretty(&value).unwrap());
    assert!(String::from_utf8(written).unwrap().contains("\n  \"name\": \"demo\""));
}

#[test]
fn test_contents_json_serializable() {
    #[derive(Serialize)]
    struct Manifest {
        name: String,
        version: u32,
    }

    let fs = MemFs::new();
    let (mut ctx, _out) = mem_context(&fs);
    let contents = Contents::json(&Manifest {
        name: "demo".to_string(),
        version: 1,
    })
    .unwrap();

    ctx.run(&File::new("manifest.json").with(contents)).unwrap();

    assert_eq!(
        fs.read_file("manifest.json").unwrap(),
        b"{\n  \"name\": \"demo\",\n  \"version\": 1\n}"
    );
}

#[test]
fn test_template_uses_bindings_and_extra_pairs() {
    let fs = MemFs::new();
    let (mut ctx, out) = mem_context(&fs);
    let tree = Sequence::new().with(Data::new("name", "demo")).with(
        File::new("hello.txt").with(Template::new("{{ name }} says {{ word }}").bind("word", "hi")),
    );

    ctx.run(&tree).unwrap();

    assert_eq!(fs.read_file("hello.txt").unwrap(), b"demo says hi");
    assert_eq!(ctx.vars().get("word"), Some(&json!("hi")));
    assert_eq!(out.contents(), "      create  hello.txt\n");
}

#[test]
fn test_template_with_pairs() {
    let fs = MemFs::new();
    let (mut ctx, _out) = mem_context(&fs);
    let template = Template::with_pairs("{{ a }}-{{ b }}", &[json!("a"), json!(1), json!("b"), json!(true)])
        .unwrap();

    ctx.run(&File::new("pairs.txt").with(template)).unwrap();

    assert_eq!(fs.read_file("pairs.txt").unwrap(), b"1-true");
}

#[test]
fn test_template_with_odd_pairs_is_misuse() {
    let result = Template::with_pairs("{{ a }}", &[json!("a")]);
    assert!(matches!(result, Err(StencilError::MisuseError(_))));
}

#[test]
fn test_template_failure_is_reported_and_propagated() {
    let fs = MemFs::new();
    let (mut ctx, out) = mem_context(&fs);

    let result = ctx.run(&File::new("bad.txt").with(Template::new("{{ nothing() }}")));

    assert!(matches!(
        result,
        Err(StencilError::TemplateError(_)) | Err(StencilError::TemplateParseError(_))
    ));
    assert_eq!(out.contents(), "       error  bad.txt\n");
    assert!(fs.read_file("bad.txt").is_none());
}

#[test]
fn test_format_rewrites_written_contents() {
    let fs = MemFs::new();
    let (mut ctx, out) = mem_context(&fs);

    ctx.run(
        &File::new("shout.txt")
            .with(Contents::text("quiet"))
            .with(Format::new(uppercase)),
    )
    .unwrap();

    assert_eq!(fs.read_file("shout.txt").unwrap(), b"QUIET");
    assert_eq!(out.contents(), "      create  shout.txt\n");
}

#[test]
fn test_format_error_aborts_pipeline() {
    let fs = MemFs::new();
    let (mut ctx, out) = mem_context(&fs);

    let result = ctx.run(
        &File::new("main.rs")
            .with(Contents::text("fn main( {"))
            .with(Format::new(reject))
            .with(Mode::executable()),
    );

    assert!(matches!(result, Err(StencilError::FormatError(_))));
    assert_eq!(out.contents(), "       error  main.rs\n");
    assert_eq!(fs.mode("main.rs"), Some(0o644));
}

#[test]
fn test_touch_creates_missing_file() {
    let fs = MemFs::new();
    let (mut ctx, out) = mem_context(&fs);

    ctx.run(&File::new("empty.txt").with(Touch)).unwrap();

    assert_eq!(fs.read_file("empty.txt").unwrap(), b"");
    assert_eq!(out.contents(), "      create  empty.txt\n");
}

#[test]
fn test_touch_updates_times_of_existing_file() {
    let fs = MemFs::new();
    fs.add_file("old.txt", "keep").unwrap();
    let long_ago = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
    fs.chtimes(Path::new("old.txt"), long_ago, long_ago).unwrap();
    let (mut ctx, out) = mem_context(&fs);

    ctx.run(&File::new("old.txt").with(Touch)).unwrap();

    assert!(fs.modified("old.txt").unwrap() > long_ago);
    assert!(fs.accessed("old.txt").unwrap() > long_ago);
    assert_eq!(fs.read_file("old.txt").unwrap(), b"keep");
    assert_eq!(out.contents(), "   identical  old.txt\n");
}

#[test]
fn test_mode_presets_and_bits() {
    let fs = MemFs::new();
    let (mut ctx, _out) = mem_context(&fs);
    let tree = Sequence::new()
        .with(File::new("run.sh").with(Contents::text("#!/bin/sh\n")).with(Mode::executable()))
        .with(File::new("LICENSE").with(Contents::text("MIT\n")).with(Mode::read_only()))
        .with(File::new("secret").with(Contents::text("s")).with(Mode(0o600)));

    ctx.run(&tree).unwrap();

    assert_eq!(fs.mode("run.sh"), Some(0o755));
    assert_eq!(fs.mode("LICENSE"), Some(0o444));
    assert_eq!(fs.mode("secret"), Some(0o600));
}

#[test]
fn test_chown() {
    let fs = MemFs::new();
    let (mut ctx, _out) = mem_context(&fs);

    ctx.run(
        &File::new("owned.txt")
            .with(Contents::text("x"))
            .with(Chown { uid: 1000, gid: 100 }),
    )
    .unwrap();

    assert_eq!(fs.owner("owned.txt"), Some((1000, 100)));
}

#[test]
fn test_dry_run_computes_report_without_writing() {
    let fs = MemFs::new();
    fs.add_file("existing.txt", "existing contents").unwrap();
    let (ctx, out) = mem_context(&fs);
    let mut ctx = ctx.dry_run(true).overwrite(true);
    let tree = Sequence::new()
        .with(File::new("existing.txt").with(Contents::text("difference")))
        .with(File::new("nested/new.txt").with(Contents::text("new")))
        .with(File::new("same.txt").with(Touch));

    ctx.run(&tree).unwrap();

    assert_eq!(
        out.contents(),
        "   overwrite  existing.txt (dry-run)\n      create  nested/new.txt (dry-run)\n      create  same.txt (dry-run)\n"
    );
    assert_eq!(fs.read_file("existing.txt").unwrap(), b"existing contents");
    assert!(fs.stat(Path::new("nested")).is_err());
    assert!(fs.read_file("same.txt").is_none());
}

#[test]
fn test_dry_run_leaves_metadata_alone() {
    let fs = MemFs::new();
    fs.add_file("tool.sh", "echo hi\n").unwrap();
    let long_ago = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
    fs.chtimes(Path::new("tool.sh"), long_ago, long_ago).unwrap();
    let (ctx, out) = mem_context(&fs);
    let mut ctx = ctx.dry_run(true);

    ctx.run(
        &File::new("tool.sh")
            .with(Mode::executable())
            .with(Chown { uid: 7, gid: 7 })
            .with(Touch),
    )
    .unwrap();

    assert_eq!(out.contents(), "   identical  tool.sh (dry-run)\n");
    assert_eq!(fs.mode("tool.sh"), Some(0o644));
    assert_eq!(fs.owner("tool.sh"), Some((0, 0)));
    assert_eq!(fs.modified("tool.sh"), Some(long_ago));
}

#[test]
fn test_dry_run_format_sees_staged_contents() {
    let fs = MemFs::new();
    let (ctx, out) = mem_context(&fs);
    let mut ctx = ctx.dry_run(true);

    ctx.run(
        &File::new("src/lib.rs")
            .with(Contents::text("pub fn a() {}"))
            .with(Format::new(uppercase)),
    )
    .unwrap();

    assert_eq!(out.contents(), "      create  src/lib.rs (dry-run)\n");
    assert_eq!(
        ctx.read(Path::new("src/lib.rs")).unwrap(),
        Some(b"PUB FN A() {}".to_vec())
    );
    assert!(fs.paths().is_empty());
}
