use std::fmt::Write;
use std::path::Path;

const AGREEMENT_FILES: [&str; 4] = ["LICENSE", "TERMS.md", "PRIVACY.md", "CONTRIBUTING.md"];

const NOTICE: &str = "\
bili-dl is provided for personal study and research.

Terms of use:
  1. Only download content you are entitled to access
  2. Downloaded content is for personal use; do not redistribute it
  3. Do not use downloaded content commercially
  4. Respect the rights of content creators
  5. Follow the Bilibili terms of service

Privacy:
  - All data is processed locally
  - No personal information is collected or uploaded
  - Cookies are stored only in the local config directory

Disclaimer:
  - The authors are not responsible for how the software is used
  - Users bear the consequences of violating laws or platform terms
  - The software comes without warranty of any kind";

/// The notice followed by the presence of each agreement file in `dir`.
pub fn legal_text(dir: &Path) -> String {
    let mut text = String::from(NOTICE);
    text.push_str("\n\nAgreement files:\n");
    for file in AGREEMENT_FILES {
        let status = if dir.join(file).is_file() { "present" } else { "missing" };
        // writing into a String cannot fail
        let _ = writeln!(text, "  {:<16} {}", file, status);
    }
    text.push_str("\nContinuing to use bili-dl means you accept these terms.");
    text
}

pub fn run() {
    println!("{}", legal_text(Path::new(".")));
}
