use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let fallback = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output();

    let version = match output {
        Ok(o) if o.status.success() => {
            let git_output = String::from_utf8(o.stdout)
                .unwrap_or_default()
                .trim()
                .to_string();

            // Tags are "v1.2.0"; the reported version carries no prefix
            match git_output.strip_prefix('v') {
                Some(tagged) if tagged.starts_with(|c: char| c.is_ascii_digit()) => {
                    tagged.to_string()
                }
                // Bare commit hash or untagged tree
                _ => fallback,
            }
        }
        _ => fallback,
    };

    println!("cargo:rustc-env=DEVX_INSTALL_VERSION={}", version);
}
