use pretty_assertions::assert_eq;
use tpstitch_test::{CommandExt, tool, transcript};

#[test]
fn test_single_and_multi_frame() {
    let input = "\
        7E803123456\n\
        1FF1008112233445566\n\
        1FF21778899\n\
    ";
    let expected = "\
        7E8: 123456\n\
        1FF: 1122334455667788\n\
    ";

    let stdout = tool!("isotpdump")
        .write_stdin(input)
        .captured_stdout()
        .unwrap();
    assert_eq!(stdout, expected);
}

#[test]
fn test_whitespace_within_lines() {
    let input = "7E8 0312 3456\n";
    let stdout = tool!("isotpdump")
        .write_stdin(input)
        .captured_stdout()
        .unwrap();
    assert_eq!(stdout, "7E8: 123456\n");
}

#[test]
fn test_interleaved_sessions() {
    let input = "\
        7E0101401020304050600\n\
        7E81009AAAAAAAAAAAA\n\
        7E0210708090A0B0C0D\n\
        7E821BBBBBBBBBBBB\n\
        7E0220E0F1011121314\n\
    ";
    let expected = "\
        7E8: AAAAAAAAAAAABBBBBB\n\
        7E0: 0102030405060708090A0B0C0D0E0F1011121314\n\
    ";

    let stdout = tool!("isotpdump")
        .write_stdin(input)
        .captured_stdout()
        .unwrap();
    assert_eq!(stdout, expected);
}

#[test]
fn test_errors_are_skipped() {
    let input = "\
        7E8XYZ\n\
        1FF21778899\n\
        7E8051234\n\
        7E84000\n\
        1FF1008112233445566\n\
        1FF22778899\n\
        1FF30000000\n\
        1FF21778899\n\
    ";
    let expected = "1FF: 1122334455667788\n";

    let output = tool!("isotpdump")
        .write_stdin(input)
        .captured_output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, expected);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse line 1"));
    assert!(stderr.contains("0x1FF: Invalid CF Frame!"));
    assert!(stderr.contains("Invalid frame data size"));
    assert!(stderr.contains("0x7E8: Unknown frame type"));
    assert!(stderr.contains("0x1FF: invalid CF frame sequence"));
}

#[test]
fn test_single_frame_resets_session() {
    let input = "\
        1FF1008112233445566\n\
        1FF0199\n\
        1FF21778899\n\
        1FF0199\n\
    ";
    let output = tool!("isotpdump")
        .write_stdin(input)
        .captured_output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "1FF: 99\n");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("0x1FF: Message reset!"));
    assert!(stderr.contains("0x1FF: Invalid CF Frame!"));
}

#[test]
fn test_in_flight_sessions_are_reported() {
    let input = "7E81014112233445566\n";
    let output = tool!("isotpdump")
        .write_stdin(input)
        .captured_output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("still-active sessions: [7E8]"));
}

#[test]
fn test_csv_format() {
    let input = "\
        7E803123456\n\
        1FF1008112233445566\n\
        1FF21778899\n\
    ";
    let expected = "\
        id,len,data\n\
        0x7E8,3,123456\n\
        0x1FF,8,1122334455667788\n\
    ";

    let stdout = tool!("isotpdump")
        .arg("--format=csv")
        .write_stdin(input)
        .captured_stdout()
        .unwrap();
    assert_eq!(stdout, expected);
}

#[test]
fn test_input_and_output_files() {
    let input = transcript("7E803123456\n\n7E8021234\n").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("messages.txt");

    let output = tool!("isotpdump")
        .arg(input.path())
        .arg(&output_path)
        .captured_output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "");

    let contents = std::fs::read_to_string(&output_path).unwrap();
    assert_eq!(contents, "7E8: 123456\n7E8: 1234\n");
}

#[test]
fn test_missing_input_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = tool!("isotpdump")
        .arg(dir.path().join("missing.txt"))
        .captured_output()
        .unwrap();
    assert!(!output.status.success());
}
