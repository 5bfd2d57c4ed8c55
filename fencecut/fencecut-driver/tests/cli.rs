use std::path::PathBuf;

use expect_test::expect;
use xshell::{cmd, Shell};

fn test_data() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../test_data")
}

fn shell() -> Shell {
    let sh = Shell::new().unwrap();
    sh.change_dir(test_data());
    sh
}

const FENCECUT: &str = env!("CARGO_BIN_EXE_fencecut");

#[test]
fn mitigate_spectre_fixtures() {
    let sh = shell();
    let stdout = cmd!(sh, "{FENCECUT} --alias-policy sound spectre.fir").read().unwrap();
    let expected = expect![[r#"
        function %victim(v0:ptr, v1:ptr, v2) {
        block0:
            v3:ptr = gep v0, v2
            v4 = load v3
            lfence "fencecut-mitigate"
            v5:ptr = gep v1, v4
            v6 = load v5
            ret v6
        }

        function %bounds(v0:ptr, v1:ptr, v2, v3) {
        block0:
            v4 = iult v2, v3
            br v4, block1, block2

        block1:
            v5:ptr = gep v0, v2
            v6 = load v5
            lfence "fencecut-mitigate"
            v7:ptr = gep v1, v6
            v8 = load v7
            jmp block2

        block2:
            ret
        }

        function %spill(v0:ptr, v1:ptr, v2) {
            fn0 = fn %log(1) -> 0

        block0:
            v3:ptr = gep v0, v2
            v4 = load v3
            lfence "fencecut-mitigate"
            v5:ptr = gep v1, v2
            store v4, v5
            lfence "fencecut-mitigate"
            call fn0(v2)
            ret
        }"#]];
    expected.assert_eq(&stdout);
}

#[test]
fn skip_and_disable() {
    let sh = shell();
    let stdout = cmd!(
        sh,
        "{FENCECUT} -a sound --skip victim --skip bounds --disable load-transmitter spectre.fir"
    )
    .read()
    .unwrap();
    assert_eq!(stdout.matches("lfence").count(), 1);
    assert!(stdout.contains("lfence \"fencecut-mitigate\"\n    call fn0(v2)"));
}

#[test]
fn every_strategy_mitigates() {
    let sh = shell();
    for args in [
        &["--strategy", "exact"][..],
        &["--strategy", "greedy"],
        &["--strategy", "greedy", "--greedy-order", "criticality"],
        &["--strategy", "auto", "--exact-limit", "0"],
        &["--weighted", "--loop-weight", "2", "--dominator-weight", "0.5"],
        &["--strict-calling-conv", "--timeout", "60"],
    ] {
        let stdout = cmd!(sh, "{FENCECUT} --alias-policy optimistic {args...} spectre.fir")
            .read()
            .unwrap();
        assert!(stdout.contains("lfence"), "no barriers with {args:?}");
    }
}

#[test]
fn stats_and_output_file() {
    let sh = shell();
    let dir = sh.create_temp_dir().unwrap();
    let out = dir.path().join("mitigated.fir");
    let stdout =
        cmd!(sh, "{FENCECUT} --alias-policy sound --stats -o {out} spectre.fir").read().unwrap();
    assert!(stdout.starts_with('['));
    assert!(stdout.contains("\"function\": \"spill\""));
    assert!(stdout.contains("\"fences\": 2"));

    let mitigated = sh.read_file(&out).unwrap();
    assert_eq!(mitigated.matches("lfence").count(), 4);
}

#[test]
fn alias_policy_is_required() {
    let sh = shell();
    let output = cmd!(sh, "{FENCECUT} spectre.fir").ignore_status().quiet().output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--alias-policy"), "{stderr}");
}

#[test]
fn unhandled_instructions_are_data_errors() {
    let sh = shell();
    let output = cmd!(sh, "{FENCECUT} --alias-policy sound unhandled.fir")
        .ignore_status()
        .quiet()
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(65));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to mitigate %varargs in unhandled.fir"), "{stderr}");
    assert!(stderr.contains("unhandled instruction 'va_arg' (inst1)"), "{stderr}");

    // the other functions are still printed, the failing one unchanged
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("function %varargs"));
    assert!(stdout.contains("function %ok"));
    assert!(!stdout.contains("lfence"));
}
