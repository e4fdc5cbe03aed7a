#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    Unknown(String),
}

impl Os {
    pub fn as_str(&self) -> &str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "macos",
            Os::Windows => "windows",
            Os::Unknown(value) => value.as_str(),
        }
    }

    /// Name used by Go toolchains (`GOOS`), which most release URLs follow.
    pub fn go_name(&self) -> &str {
        match self {
            Os::MacOs => "darwin",
            other => other.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
    Armv7,
    Unknown(String),
}

impl Arch {
    pub fn as_str(&self) -> &str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Armv7 => "armv7",
            Arch::Unknown(value) => value.as_str(),
        }
    }

    pub fn go_name(&self) -> &str {
        match self {
            Arch::X86_64 => "amd64",
            Arch::Aarch64 => "arm64",
            Arch::Armv7 => "arm",
            Arch::Unknown(value) => value.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            other => Os::Unknown(other.to_string()),
        };

        let arch = match std::env::consts::ARCH {
            "x86_64" => Arch::X86_64,
            "aarch64" => Arch::Aarch64,
            "arm" | "armv7" => Arch::Armv7,
            other => Arch::Unknown(other.to_string()),
        };

        Self { os, arch }
    }

    /// Manifest URL keys for this platform, most preferred first.
    pub fn keys(&self) -> Vec<String> {
        let go_style = format!("{}-{}", self.os.go_name(), self.arch.go_name());
        let rust_style = format!("{}-{}", self.os.as_str(), self.arch.as_str());
        if go_style == rust_style {
            vec![go_style]
        } else {
            vec![go_style, rust_style]
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os.go_name(), self.arch.go_name())
    }
}
