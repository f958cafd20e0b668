//! Built-in defaults for the companion apps the launcher knows about.
//!
//! A profile is picked once at startup from the launcher's own file stem, so
//! renaming `relaunch` to `obsidian-launcher` is enough to get Obsidian
//! defaults written on first run.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDefaults {
    pub os: &'static str,
    pub file_pattern: &'static str,
    pub app_file: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub id: &'static str,
    pub repo_api: &'static str,
    pub platforms: &'static [PlatformDefaults],
}

impl Profile {
    /// Defaults for `os` (as in `std::env::consts::OS`), or the profile's
    /// first entry when the OS has no dedicated one.
    pub fn defaults_for(&self, os: &str) -> PlatformDefaults {
        self.platforms
            .iter()
            .find(|platform| platform.os == os)
            .copied()
            .unwrap_or(self.platforms[0])
    }
}

pub const PROFILES: &[Profile] = &[
    Profile {
        id: "freetube",
        repo_api: "https://api.github.com/repos/FreeTubeApp/FreeTube/releases",
        platforms: &[
            PlatformDefaults {
                os: "linux",
                file_pattern: r"^freetube_.*_amd64\.AppImage$",
                app_file: "FreeTube.AppImage",
            },
            PlatformDefaults {
                os: "windows",
                file_pattern: r"^freetube-.*-win-x64-portable\.exe$",
                app_file: "FreeTube.exe",
            },
        ],
    },
    Profile {
        id: "obsidian",
        repo_api: "https://api.github.com/repos/obsidianmd/obsidian-releases/releases",
        platforms: &[
            PlatformDefaults {
                os: "linux",
                file_pattern: r"^Obsidian-\d+\.\d+\.\d+\.AppImage$",
                app_file: "Obsidian.AppImage",
            },
            PlatformDefaults {
                os: "windows",
                file_pattern: r"^Obsidian-\d+\.\d+\.\d+\.exe$",
                app_file: "Obsidian.exe",
            },
        ],
    },
    Profile {
        id: "joplin",
        repo_api: "https://api.github.com/repos/laurent22/joplin/releases",
        platforms: &[
            PlatformDefaults {
                os: "linux",
                file_pattern: r"^Joplin-\d+\.\d+\.\d+\.AppImage$",
                app_file: "Joplin.AppImage",
            },
            PlatformDefaults {
                os: "windows",
                file_pattern: r"^JoplinPortable\.exe$",
                app_file: "Joplin.exe",
            },
        ],
    },
];

pub fn resolve(launcher_stem: &str) -> &'static Profile {
    let stem = launcher_stem.to_ascii_lowercase();
    PROFILES
        .iter()
        .find(|profile| stem.contains(profile.id))
        .unwrap_or(&PROFILES[0])
}
