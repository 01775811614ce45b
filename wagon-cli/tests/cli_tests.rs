use std::fs;
use std::process::Command;

#[test]
fn table_then_word_cli() {
	let exe = env!("CARGO_BIN_EXE_wagon");
	let dir = tempfile::tempdir().unwrap();
	let text = dir.path().join("names.txt");
	let table = dir.path().join("names.bin");

	fs::write(&text, "banana bandana cabana\nanna nab").unwrap();

	let status = Command::new(exe)
		.args(["table", text.to_str().unwrap(), "--output", table.to_str().unwrap()])
		.status()
		.expect("table failed");
	assert!(status.success());
	assert!(table.exists());

	let output = Command::new(exe)
		.args(["word", table.to_str().unwrap(), "--length", "7", "--count", "5", "--seed", "7"])
		.output()
		.expect("word failed");
	assert!(output.status.success());
	let stdout = String::from_utf8(output.stdout).unwrap();
	let words: Vec<&str> = stdout.lines().collect();
	assert_eq!(words.len(), 5);
	assert!(words.iter().all(|word| word.chars().count() == 7));
}

#[test]
fn word_cli_is_reproducible_from_text() {
	let exe = env!("CARGO_BIN_EXE_wagon");
	let dir = tempfile::tempdir().unwrap();
	let text = dir.path().join("corpus.txt");
	fs::write(&text, "wagon wander window widow woden").unwrap();

	let run = || {
		Command::new(exe)
			.args(["word", text.to_str().unwrap(), "-l", "5", "-c", "3", "--start", "--seed", "11"])
			.output()
			.expect("word failed")
	};
	let first = run();
	let second = run();
	assert!(first.status.success());
	assert_eq!(first.stdout, second.stdout);
}

#[test]
fn zero_length_is_rejected() {
	let exe = env!("CARGO_BIN_EXE_wagon");
	let dir = tempfile::tempdir().unwrap();
	let text = dir.path().join("corpus.txt");
	fs::write(&text, "abc").unwrap();

	let status = Command::new(exe)
		.args(["word", text.to_str().unwrap(), "--length", "0"])
		.status()
		.expect("word failed");
	assert!(!status.success());
}

#[test]
fn unreachable_length_fails() {
	let exe = env!("CARGO_BIN_EXE_wagon");
	let dir = tempfile::tempdir().unwrap();
	let text = dir.path().join("corpus.txt");
	fs::write(&text, "ab").unwrap();

	let output = Command::new(exe)
		.args(["word", text.to_str().unwrap(), "--length", "5", "--count", "1"])
		.output()
		.expect("word failed");
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("cannot generate a word of length 5"));
}
