// External tool discovery

use std::path::{Path, PathBuf};
use std::process::Command;

/// Install locations checked before falling back to `which`
const COMMON_DIRS: [&str; 3] = ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

/// Absolute path of `binary`, if installed
pub fn locate_binary(binary: &str) -> Option<PathBuf> {
    if let Some(path) = COMMON_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(binary))
        .find(|p| p.is_file())
    {
        return Some(path);
    }

    let output = Command::new("which").arg(binary).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// `<program> <version_arg>` exits successfully
pub fn runs_ok(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_locates_shell() {
        let sh = locate_binary("sh").unwrap();
        assert!(sh.is_absolute());
    }

    #[test]
    fn test_missing_binary() {
        assert_eq!(locate_binary("arbor-no-such-binary"), None);
        assert!(!runs_ok("arbor-no-such-binary", &["--version"]));
    }
}
