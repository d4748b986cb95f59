#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::path::Path;

    fn nativefy() -> Command {
        let mut cmd = Command::cargo_bin("nativefy").unwrap();
        cmd.env_remove("NATIVEFY_OUTPUT").env_remove("RUST_LOG");
        cmd
    }

    fn viewer(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("viewer");
        std::fs::write(&path, b"#!/bin/sh\necho viewer\n").unwrap();
        path
    }

    #[test]
    fn test_help_lists_flags() {
        nativefy()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--title"))
            .stdout(predicate::str::contains("--no-icon"))
            .stdout(predicate::str::contains("--strict-icon"));
    }

    #[test]
    fn test_title_is_required() {
        nativefy()
            .arg("example.com")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--title"));
    }

    #[test]
    fn test_bundle_without_icon() {
        let dir = tempfile::tempdir().unwrap();
        let binary = viewer(dir.path());
        let out = dir.path().join("dist");

        nativefy()
            .args(["--title", "Example", "--no-icon", "--platform", "macos"])
            .arg("--binary")
            .arg(&binary)
            .arg("--output")
            .arg(&out)
            .arg("example.com")
            .assert()
            .success()
            .stdout(predicate::str::contains("Example.app"))
            .stdout(predicate::str::contains("sha256"));

        let contents = out.join("Example.app/Contents");
        assert_eq!(
            std::fs::read(contents.join("MacOS/viewer")).unwrap(),
            std::fs::read(&binary).unwrap()
        );
        assert!(contents.join("Info.plist").is_file());
        assert!(contents.join("Resources").is_dir());
        assert!(!contents.join("Resources/icon.icns").exists());

        let config: serde_json::Value =
            serde_json::from_slice(&std::fs::read(contents.join("MacOS/config.json")).unwrap())
                .unwrap();
        assert_eq!(config["URL"], "https://www.example.com/");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(contents.join("MacOS/viewer"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_output_from_environment() {
        let dir = tempfile::tempdir().unwrap();
        let binary = viewer(dir.path());
        let out = dir.path().join("from-env");

        nativefy()
            .env("NATIVEFY_OUTPUT", &out)
            .args(["-q", "-t", "Env", "--no-icon", "--platform", "darwin"])
            .arg("--binary")
            .arg(&binary)
            .arg("www.example.com")
            .assert()
            .success();

        assert!(out.join("Env.app/Contents/Info.plist").is_file());
    }

    #[test]
    fn test_title_with_parent_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let binary = viewer(dir.path());
        let out = dir.path().join("dist");

        nativefy()
            .args(["-t", "../escaped", "--no-icon", "--platform", "macos"])
            .arg("--binary")
            .arg(&binary)
            .arg("--output")
            .arg(&out)
            .arg("example.com")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Invalid arguments: --title"))
            .stderr(predicate::str::contains("--help"));

        assert!(!out.exists());
        assert!(!dir.path().join("escaped.app").exists());
    }

    #[test]
    fn test_unsupported_platform_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let binary = viewer(dir.path());
        let out = dir.path().join("dist");

        nativefy()
            .args(["-t", "Example", "--no-icon", "--platform", "windows"])
            .arg("--binary")
            .arg(&binary)
            .arg("--output")
            .arg(&out)
            .arg("example.com")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("no bundler implemented for windows"));

        assert!(!out.exists());
    }
}
