const UNKNOWN: &str = "unknown";

pub fn build_info() -> String {
    format!(
        "{} {}\nBuild time: {}\nGit commit: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("BILI_DL_BUILD_TIME").unwrap_or(UNKNOWN),
        option_env!("BILI_DL_GIT_COMMIT").unwrap_or(UNKNOWN),
    )
}

pub fn run() {
    println!("{}", build_info());
}
