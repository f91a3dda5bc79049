//! Java Deployment exception site list.
//!
//! Java keeps its allow-list in a plain text file, one URL per line:
//! `%USERPROFILE%\AppData\LocalLow\Sun\Java\Deployment\security\exception.sites`.
//! Nothing is created here; when the file is missing the list is treated as
//! unavailable and edits are skipped.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::Result;
use crate::settings::SecuritySettings;
use crate::tree::{Hive, KeyTree};

/// Location of `exception.sites` relative to the user profile.
pub const EXCEPTION_SITES_PATH: [&str; 7] = [
    "AppData",
    "LocalLow",
    "Sun",
    "Java",
    "Deployment",
    "security",
    "exception.sites",
];

/// Java Runtime Environment registration under `HKLM`.
pub const JRE_PATH: &str = r"Software\JavaSoft\Java Runtime Environment";

#[cfg(target_os = "windows")]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(target_os = "windows"))]
const LINE_ENDING: &str = "\n";

/// The `exception.sites` file.
#[derive(Debug, Clone)]
pub struct ExceptionSites {
    path: PathBuf,
}

impl ExceptionSites {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The list in the current user's profile.
    pub fn for_current_user() -> Option<Self> {
        let dirs = UserDirs::new()?;
        Some(Self::new(Self::default_path(dirs.home_dir())))
    }

    /// The list in the profile of `user_name`.
    ///
    /// Profiles are assumed to share a parent with the current user's
    /// (`C:\Users\<name>`).
    pub fn for_user(user_name: &str) -> Option<Self> {
        let dirs = UserDirs::new()?;
        let profiles = dirs.home_dir().parent()?;
        Some(Self::in_profiles_dir(profiles, user_name))
    }

    /// The list of `user_name` below a directory of user profiles.
    pub fn in_profiles_dir(profiles: &Path, user_name: &str) -> Self {
        Self::new(Self::default_path(&profiles.join(user_name)))
    }

    /// Path of the list below a given profile directory.
    pub fn default_path(home: &Path) -> PathBuf {
        EXCEPTION_SITES_PATH
            .iter()
            .fold(home.to_path_buf(), |path, segment| path.join(segment))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads every line, or `None` if the file does not exist.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD.
    pub fn query(&self) -> Result<Option<Vec<String>>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let content = String::from_utf8_lossy(&bytes);
        Ok(Some(content.lines().map(str::to_string).collect()))
    }

    /// Appends `site` as a new line. Duplicates are not filtered.
    pub fn add(&self, site: &str) -> Result<()> {
        if !self.exists() {
            debug!("{} missing, not adding {}", self.path.display(), site);
            return Ok(());
        }

        let needs_newline = fs::read(&self.path)?
            .last()
            .is_some_and(|last| *last != b'\n');

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        if needs_newline {
            file.write_all(LINE_ENDING.as_bytes())?;
        }
        write!(file, "{site}{LINE_ENDING}")?;

        info!("Added {} to Java exception sites", site);
        Ok(())
    }

    /// Removes every line equal to `site`, returning whether any matched.
    ///
    /// The file is rewritten into a sibling temporary file which then
    /// replaces the original, so a failed write leaves the old list intact.
    /// A list without a match is left untouched.
    pub fn delete(&self, site: &str) -> Result<bool> {
        let Some(lines) = self.query()? else {
            debug!("{} missing, not deleting {}", self.path.display(), site);
            return Ok(false);
        };
        if !lines.iter().any(|line| line == site) {
            debug!("{} not in {}", site, self.path.display());
            return Ok(false);
        }

        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        for line in lines.iter().filter(|line| line.as_str() != site) {
            write!(temp, "{line}{LINE_ENDING}")?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        info!("Removed {} from Java exception sites", site);
        Ok(true)
    }
}

impl SecuritySettings for ExceptionSites {
    fn query_sites(&self) -> Result<Vec<String>> {
        Ok(self.query()?.unwrap_or_default())
    }

    fn add_site(&self, site: &str) -> Result<()> {
        self.add(site)
    }

    fn delete_site(&self, site: &str) -> Result<bool> {
        self.delete(site)
    }
}

/// Home directory of the registered Java runtime, if any.
///
/// Reads `CurrentVersion` from the JRE key, then `JavaHome` from the
/// subkey named after that version.
pub fn java_home<T: KeyTree>(tree: &T) -> Result<Option<PathBuf>> {
    let Some(jre) = tree.open_path(Hive::LocalMachine, JRE_PATH, false)? else {
        return Ok(None);
    };

    let Some(version) = tree
        .get_value(&jre, "CurrentVersion")?
        .and_then(|value| value.as_str().map(str::to_string))
    else {
        return Ok(None);
    };

    let Some(home_key) = tree.open_child(&jre, &version, false)? else {
        return Ok(None);
    };

    Ok(tree
        .get_value(&home_key, "JavaHome")?
        .and_then(|value| value.as_str().map(PathBuf::from)))
}

/// A detected Java runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaRuntime {
    home: PathBuf,
}

impl JavaRuntime {
    /// Looks the runtime up once; keep the result to avoid repeat lookups.
    pub fn detect<T: KeyTree>(tree: &T) -> Result<Option<Self>> {
        Ok(java_home(tree)?.map(|home| Self { home }))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{MemoryTree, TreeValue};
    use tempfile::TempDir;

    fn list_with(lines: &str) -> (TempDir, ExceptionSites) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exception.sites");
        fs::write(&path, lines).unwrap();
        (dir, ExceptionSites::new(path))
    }

    #[test]
    fn query_reads_lines() {
        let (_dir, list) = list_with("a.com\r\nb.com\n");
        assert_eq!(list.query().unwrap().unwrap(), ["a.com", "b.com"]);
    }

    #[test]
    fn query_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let list = ExceptionSites::new(dir.path().join("exception.sites"));
        assert_eq!(list.query().unwrap(), None);
        assert!(list.query_sites().unwrap().is_empty());
    }

    #[test]
    fn add_appends_line() {
        let (_dir, list) = list_with("a.com\nb.com\n");
        list.add("foo.com").unwrap();
        assert_eq!(
            list.query().unwrap().unwrap(),
            ["a.com", "b.com", "foo.com"]
        );
    }

    #[test]
    fn add_after_unterminated_last_line() {
        let (_dir, list) = list_with("a.com");
        list.add("b.com").unwrap();
        assert_eq!(list.query().unwrap().unwrap(), ["a.com", "b.com"]);
    }

    #[test]
    fn add_keeps_duplicates() {
        let (_dir, list) = list_with("a.com\n");
        list.add("a.com").unwrap();
        assert_eq!(list.query().unwrap().unwrap(), ["a.com", "a.com"]);
    }

    #[test]
    fn delete_rewrites_without_matches() {
        let (_dir, list) = list_with("a.com\nb.com\n");
        list.add("foo.com").unwrap();
        list.delete("a.com").unwrap();
        assert_eq!(list.query().unwrap().unwrap(), ["b.com", "foo.com"]);
    }

    #[test]
    fn delete_removes_every_exact_match() {
        let (_dir, list) = list_with("a.com\nhttp://a.com\na.com\n");
        assert!(list.delete("a.com").unwrap());
        assert_eq!(list.query().unwrap().unwrap(), ["http://a.com"]);
    }

    #[test]
    fn delete_without_match_reports_nothing_removed() {
        let (dir, list) = list_with("a.com\r\nb.com");
        assert!(!list.delete("c.com").unwrap());
        assert!(!list.delete_site("A.COM").unwrap());

        // Untouched, including line endings
        let path = dir.path().join("exception.sites");
        assert_eq!(fs::read_to_string(path).unwrap(), "a.com\r\nb.com");
    }

    #[test]
    fn query_replaces_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exception.sites");
        fs::write(&path, b"a.com\r\nb\xe9.com\r\nc.com\r\n").unwrap();
        let list = ExceptionSites::new(path);

        assert_eq!(
            list.query().unwrap().unwrap(),
            ["a.com", "b\u{fffd}.com", "c.com"]
        );
        assert!(list.delete("a.com").unwrap());
        assert_eq!(list.query_sites().unwrap(), ["b\u{fffd}.com", "c.com"]);
    }

    #[test]
    fn delete_leaves_no_temp_files() {
        let (dir, list) = list_with("a.com\nb.com\n");
        list.delete("b.com").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn edits_on_missing_file_are_noops() {
        let dir = TempDir::new().unwrap();
        let list = ExceptionSites::new(dir.path().join("exception.sites"));

        list.add("a.com").unwrap();
        assert!(!list.delete("a.com").unwrap());
        assert!(!list.exists());
    }

    #[test]
    fn default_path_is_under_profile() {
        let path = ExceptionSites::default_path(Path::new("home"));
        assert!(path.ends_with("Deployment/security/exception.sites")
            || path.ends_with(r"Deployment\security\exception.sites"));
        assert!(path.starts_with("home"));
    }

    #[test]
    fn profile_list_is_named_after_the_user() {
        let list = ExceptionSites::in_profiles_dir(Path::new("profiles"), "alice");
        assert_eq!(
            list.path(),
            ExceptionSites::default_path(&Path::new("profiles").join("alice"))
        );

        if let Some(list) = ExceptionSites::for_user("alice") {
            let profile = list.path().ancestors().nth(EXCEPTION_SITES_PATH.len()).unwrap();
            assert!(profile.ends_with("alice"));
        }
    }

    #[test]
    fn java_home_reads_current_version() {
        let tree = MemoryTree::new();
        let jre = tree.create_path(Hive::LocalMachine, JRE_PATH).unwrap();
        tree.set_value(&jre, "CurrentVersion", &TreeValue::String("1.8".into()))
            .unwrap();
        let version = tree.open_or_create_child(&jre, "1.8").unwrap();
        tree.set_value(
            &version,
            "JavaHome",
            &TreeValue::String(r"C:\Program Files\Java\jre1.8.0_202".into()),
        )
        .unwrap();

        let runtime = JavaRuntime::detect(&tree).unwrap().unwrap();
        assert_eq!(
            runtime.home(),
            Path::new(r"C:\Program Files\Java\jre1.8.0_202")
        );
    }

    #[test]
    fn java_home_absent_when_not_installed() {
        let tree = MemoryTree::new();
        assert_eq!(java_home(&tree).unwrap(), None);

        let jre = tree.create_path(Hive::LocalMachine, JRE_PATH).unwrap();
        tree.set_value(&jre, "CurrentVersion", &TreeValue::String("11".into()))
            .unwrap();
        assert_eq!(java_home(&tree).unwrap(), None);
    }
}
