use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

type StdResult = Result<(), Box<dyn std::error::Error>>;

fn write_fixture(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn compress_then_decompress_round_trips() -> StdResult {
    let dir = tempfile::tempdir()?;
    let input = b"the quick brown fox jumps over the lazy dog the quick brown fox";
    let in_path = write_fixture(&dir, "plain.bin", input);
    let packed_path = dir.path().join("packed.bd");
    let out_path = dir.path().join("roundtrip.bin");

    Command::cargo_bin("dkcomp")?
        .arg("compress")
        .arg("-f").arg("bd")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success();

    Command::cargo_bin("dkcomp")?
        .arg("decompress")
        .arg("-f").arg("bd")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();

    assert_eq!(std::fs::read(out_path)?, input);
    Ok(())
}

#[test]
fn compress_with_verify_succeeds_on_well_formed_input() -> StdResult {
    let dir = tempfile::tempdir()?;
    let input = b"Donkey Kong Country 2: Diddy's Kong Quest";
    let in_path = write_fixture(&dir, "plain.bin", input);
    let packed_path = dir.path().join("packed.bd");

    Command::cargo_bin("dkcomp")?
        .arg("compress")
        .arg("-f").arg("bd")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .arg("--verify")
        .assert()
        .success();
    Ok(())
}

#[test]
fn size_reports_the_decompressed_length() -> StdResult {
    let dir = tempfile::tempdir()?;
    let input = vec![0xABu8; 512];
    let in_path = write_fixture(&dir, "plain.bin", &input);
    let packed_path = dir.path().join("packed.bd");

    Command::cargo_bin("dkcomp")?
        .arg("compress")
        .arg("-f").arg("bd")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success();

    Command::cargo_bin("dkcomp")?
        .arg("size")
        .arg("-f").arg("bd")
        .arg("-i").arg(&packed_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("512"));
    Ok(())
}

#[test]
fn unrecognised_format_fails_with_a_nonzero_exit() -> StdResult {
    let dir = tempfile::tempdir()?;
    let in_path = write_fixture(&dir, "plain.bin", b"anything");

    Command::cargo_bin("dkcomp")?
        .arg("compress")
        .arg("-f").arg("not-a-real-format")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(dir.path().join("out.bin"))
        .assert()
        .failure();
    Ok(())
}

#[test]
fn gba_auto_detect_selects_the_right_sub_format() -> StdResult {
    let dir = tempfile::tempdir()?;
    let input = b"a small buffer to exercise GBA LZ77";
    let in_path = write_fixture(&dir, "plain.bin", input);
    let packed_path = dir.path().join("packed.lz77");
    let out_path = dir.path().join("roundtrip.bin");

    Command::cargo_bin("dkcomp")?
        .arg("compress")
        .arg("-f").arg("gba-lz77")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success();

    Command::cargo_bin("dkcomp")?
        .arg("decompress")
        .arg("-f").arg("gba")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();

    assert_eq!(std::fs::read(out_path)?, input);
    Ok(())
}
