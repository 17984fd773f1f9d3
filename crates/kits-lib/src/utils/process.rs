#[cfg(windows)]
use std::os::windows::process::CommandExt;

/// Environment that keeps the dotnet CLI from printing first-run banners or
/// sending telemetry, so its stdout stays machine-readable.
pub const QUIET_DOTNET_ENV: [(&str, &str); 3] = [
    ("DOTNET_SKIP_FIRST_TIME_EXPERIENCE", "true"),
    ("DOTNET_NOLOGO", "true"),
    ("DOTNET_CLI_TELEMETRY_OPTOUT", "true"),
];

/// Extension trait for dotnet command execution, providing unified
/// console suppression and a quiet CLI environment.
pub trait KitsCommandExt {
    /// Hides the console window on Windows. No-op on other platforms.
    fn suppress_console(&mut self) -> &mut Self;

    /// Applies [`QUIET_DOTNET_ENV`].
    fn quiet_dotnet(&mut self) -> &mut Self;
}

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

impl KitsCommandExt for std::process::Command {
    fn suppress_console(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }

    fn quiet_dotnet(&mut self) -> &mut Self {
        self.envs(QUIET_DOTNET_ENV)
    }
}

impl KitsCommandExt for tokio::process::Command {
    fn suppress_console(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }

    fn quiet_dotnet(&mut self) -> &mut Self {
        self.envs(QUIET_DOTNET_ENV)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_env_is_applied_to_std_command() {
        let mut cmd = std::process::Command::new("dotnet");
        cmd.quiet_dotnet().suppress_console();

        let envs: Vec<_> = cmd
            .get_envs()
            .filter_map(|(k, v)| Some((k.to_str()?.to_string(), v?.to_str()?.to_string())))
            .collect();

        for (key, value) in QUIET_DOTNET_ENV {
            assert!(envs.contains(&(key.to_string(), value.to_string())), "missing {}", key);
        }
    }
}
