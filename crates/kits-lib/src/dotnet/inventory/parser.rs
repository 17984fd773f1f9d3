//! Parsers for `dotnet --list-sdks` and `dotnet --list-runtimes` output.
//!
//! Lines that do not match the expected shape are skipped.

use super::models::{InstallationOrigin, InstalledArtifact};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

// `8.0.100 [/usr/share/dotnet/sdk]`
static SDK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<version>\S+)\s+\[(?P<path>.+)\]$").expect("valid SDK line pattern")
});

// `Microsoft.NETCore.App 8.0.1 [/usr/share/dotnet/shared/Microsoft.NETCore.App]`
static RUNTIME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<component>\S+)\s+(?P<version>\S+)\s+\[(?P<path>.+)\]$")
        .expect("valid runtime line pattern")
});

pub fn parse_sdk_line(line: &str, origin: InstallationOrigin) -> Option<InstalledArtifact> {
    let caps = SDK_LINE.captures(line.trim())?;
    let version = &caps["version"];
    let install_path = PathBuf::from(&caps["path"]).join(version);
    Some(InstalledArtifact::sdk(version, install_path, origin))
}

pub fn parse_runtime_line(line: &str, origin: InstallationOrigin) -> Option<InstalledArtifact> {
    let caps = RUNTIME_LINE.captures(line.trim())?;
    let version = &caps["version"];
    let install_path = PathBuf::from(&caps["path"]).join(version);
    Some(InstalledArtifact::runtime(
        &caps["component"],
        version,
        install_path,
        origin,
    ))
}

pub fn parse_sdks(output: &str, origin: InstallationOrigin) -> Vec<InstalledArtifact> {
    output
        .lines()
        .filter_map(|line| parse_sdk_line(line, origin))
        .collect()
}

pub fn parse_runtimes(output: &str, origin: InstallationOrigin) -> Vec<InstalledArtifact> {
    output
        .lines()
        .filter_map(|line| parse_runtime_line(line, origin))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_sdk_line() {
        let sdk = parse_sdk_line("8.0.100 [/usr/share/dotnet/sdk]", InstallationOrigin::Default).unwrap();
        assert_eq!(sdk.version, "8.0.100");
        assert_eq!(sdk.triplet(), (8, 0, 100));
        assert_eq!(sdk.pre_release(), None);
        assert_eq!(sdk.install_path, Path::new("/usr/share/dotnet/sdk/8.0.100"));
        assert!(sdk.is_sdk());
    }

    #[test]
    fn parses_runtime_line() {
        let runtime = parse_runtime_line(
            "Microsoft.NETCore.App 8.0.1 [/usr/share/dotnet/shared/Microsoft.NETCore.App]",
            InstallationOrigin::Manual,
        )
        .unwrap();
        assert_eq!(runtime.component(), Some("Microsoft.NETCore.App"));
        assert_eq!(runtime.version, "8.0.1");
        assert!(runtime.install_path.ends_with("8.0.1"));
        assert_eq!(runtime.origin, InstallationOrigin::Manual);
    }

    #[test]
    fn keeps_pre_release_and_windows_paths() {
        let output = "9.0.100-rc.2.24474.11 [C:\\Program Files\\dotnet\\sdk]\r\n8.0.404 [C:\\Program Files\\dotnet\\sdk]\r\n";
        let sdks = parse_sdks(output, InstallationOrigin::Default);
        assert_eq!(sdks.len(), 2);
        assert_eq!(sdks[0].pre_release(), Some("rc.2.24474.11"));
        assert!(sdks[1].install_path.to_string_lossy().contains("Program Files"));
    }

    #[test]
    fn skips_noise() {
        let output = "\nWelcome to .NET!\n8.0.100 [/usr/share/dotnet/sdk]\n";
        assert_eq!(parse_sdks(output, InstallationOrigin::Default).len(), 1);

        let output = "Microsoft.AspNetCore.App 8.0.1 [/opt/dotnet/shared/Microsoft.AspNetCore.App]\nnot a runtime\n";
        let runtimes = parse_runtimes(output, InstallationOrigin::Default);
        assert_eq!(runtimes.len(), 1);
        assert_eq!(runtimes[0].component(), Some("Microsoft.AspNetCore.App"));
    }
}
