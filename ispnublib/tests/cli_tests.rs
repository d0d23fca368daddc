#![cfg(feature = "cli")]
#![allow(clippy::expect_used)]

use ispnublib::{Layout, MemoryImage};
use std::path::PathBuf;
use std::process::Command;

const ISPNUBCREATOR_EXE: &str = env!("CARGO_BIN_EXE_ispnubcreator");

fn out_path(name: &str) -> PathBuf {
    // Tests run the binary from the fixtures directory, so outputs need an absolute path
    std::env::current_dir()
        .expect("Failed to get current dir")
        .join("build")
        .join(name)
        .join("ispnub.hex")
}

#[test]
fn test_ispnubcreator_shows_usage_without_script() {
    // Act
    let output = Command::new(ISPNUBCREATOR_EXE)
        .output()
        .expect("Failed to run ispnubcreator");

    // Assert
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Usage") && stdout.contains("ISPnubCreator"),
        "stdout did not look like usage text:\n{stdout}"
    );
}

#[test]
fn test_ispnubcreator_compiles_script() {
    // Arrange
    let out = out_path("t1-cli");
    let _ = std::fs::remove_file(&out);

    // Act
    let output = Command::new(ISPNUBCREATOR_EXE)
        .current_dir("tests/fixtures")
        .args(["program.isp", &out.to_string_lossy(), "--base", "base.hex"])
        .output()
        .expect("Failed to run ispnubcreator");

    // Assert
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Parse script file \"program.isp\"... done.")
            && stdout.contains("avrdude"),
        "stdout did not look like progress text:\n{stdout}"
    );

    let layout = Layout::default();
    let image = MemoryImage::from_hex(&out, layout.controller_memory_size)
        .expect("Output is not a valid hex file");
    assert_eq!(image.as_slice()[0], 0x0C);
    assert_eq!(&image.as_slice()[layout.script_start..layout.script_start + 2], &[0x01, 0x05]);
}

#[test]
fn test_ispnubcreator_default_output_name() {
    // Arrange
    let out = PathBuf::from("tests/fixtures/ispnub.hex");
    let _ = std::fs::remove_file(&out);

    // Act
    let output = Command::new(ISPNUBCREATOR_EXE)
        .current_dir("tests/fixtures")
        .arg("unknown_command.isp")
        .output()
        .expect("Failed to run ispnubcreator");

    // Assert
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out.exists());
    let _ = std::fs::remove_file(&out);
}

#[test]
fn test_ispnubcreator_fails_on_missing_hex() {
    // Arrange
    let out = out_path("t2-cli");
    let _ = std::fs::remove_file(&out);

    // Act
    let output = Command::new(ISPNUBCREATOR_EXE)
        .current_dir("tests/fixtures")
        .args(["missing_file.isp", &out.to_string_lossy()])
        .output()
        .expect("Failed to run ispnubcreator");

    // Assert
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("nothing_here.hex"),
        "stderr did not contain expected error text:\n{stderr}"
    );
    assert!(!out.exists());
}
