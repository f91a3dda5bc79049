//! Current user identity.
//!
//! The per-user policy location of the zone map lives under
//! `HKEY_USERS\<SID>`, so locating it needs the user's security identifier.
//! The Java exception list lives in the profile named after the user.

use crate::error::{Result, TrustieError};

/// Source of the current user's name and SID.
pub trait UserIdentity {
    fn user_name(&self) -> Result<String>;

    /// Security identifier in string form (`S-1-5-21-...`).
    fn user_sid(&self) -> Result<String>;
}

/// Identity supplied up front (configuration, tests, non-Windows hosts).
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity {
    name: Option<String>,
    sid: Option<String>,
}

impl FixedIdentity {
    pub fn new(name: Option<String>, sid: Option<String>) -> Self {
        Self { name, sid }
    }

    /// An identity that knows nothing; SID lookups fail.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl UserIdentity for FixedIdentity {
    fn user_name(&self) -> Result<String> {
        self.name
            .clone()
            .ok_or_else(|| TrustieError::Identity("no user name configured".to_string()))
    }

    fn user_sid(&self) -> Result<String> {
        self.sid
            .clone()
            .ok_or_else(|| TrustieError::Identity("no user SID configured".to_string()))
    }
}

/// Image name of the desktop shell; its owner is the interactive user.
pub const SHELL_EXECUTABLE: &str = "explorer.exe";

/// Whether a process image (bare name or full path) is the desktop shell.
pub fn is_shell_executable(image: &str) -> bool {
    let file_name = image.rsplit(['\\', '/']).next().unwrap_or(image);
    file_name.eq_ignore_ascii_case(SHELL_EXECUTABLE)
}

#[cfg(target_os = "windows")]
pub use windows::DesktopUser;

#[cfg(target_os = "windows")]
mod windows {
    use std::{mem, ptr};

    use tracing::debug;
    use windows_sys::Win32::Foundation::{
        CloseHandle, GetLastError, LocalFree, HANDLE, INVALID_HANDLE_VALUE,
    };
    use windows_sys::Win32::Security::Authorization::ConvertSidToStringSidW;
    use windows_sys::Win32::Security::{
        GetTokenInformation, LookupAccountSidW, TokenUser, SID_NAME_USE, TOKEN_QUERY, TOKEN_USER,
    };
    use windows_sys::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
        TH32CS_SNAPPROCESS,
    };
    use windows_sys::Win32::System::Threading::{
        GetCurrentProcess, OpenProcess, OpenProcessToken, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    use super::{is_shell_executable, UserIdentity, SHELL_EXECUTABLE};
    use crate::error::{Result, TrustieError};

    /// The interactive user: the account owning the desktop shell.
    ///
    /// Run elevated under another account, the process token names the
    /// administrator rather than the user whose settings are being edited.
    /// Without a shell process that can be queried (services, no one logged
    /// on) the current process token is used instead.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct DesktopUser;

    /// Closes a Win32 handle on drop.
    struct OwnedHandle(HANDLE);

    impl Drop for OwnedHandle {
        fn drop(&mut self) {
            // SAFETY: the handle was returned open by Win32 and is closed once.
            unsafe {
                CloseHandle(self.0);
            }
        }
    }

    fn last_error(call: &str) -> TrustieError {
        // SAFETY: reads thread-local error state only.
        let code = unsafe { GetLastError() };
        TrustieError::Identity(format!("{call} failed with error {code}"))
    }

    fn from_wide(buf: &[u16]) -> String {
        let len = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
        String::from_utf16_lossy(&buf[..len])
    }

    /// Process id of the first running shell.
    fn shell_process_id() -> Option<u32> {
        // SAFETY: `entry` is a zeroed PROCESSENTRY32W with `dwSize` set, as
        // Process32FirstW/NextW require; the snapshot stays open meanwhile.
        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0);
            if snapshot == INVALID_HANDLE_VALUE {
                debug!("CreateToolhelp32Snapshot failed with error {}", GetLastError());
                return None;
            }
            let snapshot = OwnedHandle(snapshot);

            let mut entry: PROCESSENTRY32W = mem::zeroed();
            entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as u32;

            let mut more = Process32FirstW(snapshot.0, &mut entry) != 0;
            while more {
                if is_shell_executable(&from_wide(&entry.szExeFile)) {
                    return Some(entry.th32ProcessID);
                }
                more = Process32NextW(snapshot.0, &mut entry) != 0;
            }
            None
        }
    }

    fn shell_token() -> Option<OwnedHandle> {
        let pid = shell_process_id()?;

        // SAFETY: the process handle outlives the OpenProcessToken call and
        // `token` is a live local.
        unsafe {
            let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if process.is_null() {
                debug!(pid, "Cannot open {}: error {}", SHELL_EXECUTABLE, GetLastError());
                return None;
            }
            let process = OwnedHandle(process);

            let mut token: HANDLE = ptr::null_mut();
            if OpenProcessToken(process.0, TOKEN_QUERY, &mut token) == 0 {
                debug!(pid, "Cannot read the {} token: error {}", SHELL_EXECUTABLE, GetLastError());
                return None;
            }
            Some(OwnedHandle(token))
        }
    }

    /// Token of the shell owner, else of this process.
    fn user_token() -> Result<OwnedHandle> {
        if let Some(token) = shell_token() {
            return Ok(token);
        }
        debug!("No {} token, using the current process", SHELL_EXECUTABLE);

        // SAFETY: `token` is a live local; the pseudo handle needs no closing.
        unsafe {
            let mut token: HANDLE = ptr::null_mut();
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
                return Err(last_error("OpenProcessToken"));
            }
            Ok(OwnedHandle(token))
        }
    }

    /// Reads the `TOKEN_USER` block of the user token.
    ///
    /// Backed by `u64`s so the SID pointer inside is suitably aligned.
    fn token_user() -> Result<Vec<u64>> {
        let token = user_token()?;

        // SAFETY: every pointer handed to GetTokenInformation points into
        // live locals or `buf`, sized from the first call.
        unsafe {
            let mut len = 0u32;
            GetTokenInformation(token.0, TokenUser, ptr::null_mut(), 0, &mut len);
            let mut buf = vec![0u64; (len as usize).div_ceil(8)];
            let ok = GetTokenInformation(
                token.0,
                TokenUser,
                buf.as_mut_ptr().cast(),
                (buf.len() * 8) as u32,
                &mut len,
            );

            if ok == 0 {
                return Err(last_error("GetTokenInformation"));
            }
            Ok(buf)
        }
    }

    impl UserIdentity for DesktopUser {
        fn user_name(&self) -> Result<String> {
            let buf = token_user()?;
            // SAFETY: `buf` holds a TOKEN_USER written by GetTokenInformation.
            unsafe {
                let user = &*(buf.as_ptr() as *const TOKEN_USER);
                let mut name = [0u16; 256];
                let mut name_len = name.len() as u32;
                let mut domain = [0u16; 256];
                let mut domain_len = domain.len() as u32;
                let mut use_kind: SID_NAME_USE = 0;

                if LookupAccountSidW(
                    ptr::null(),
                    user.User.Sid,
                    name.as_mut_ptr(),
                    &mut name_len,
                    domain.as_mut_ptr(),
                    &mut domain_len,
                    &mut use_kind,
                ) == 0
                {
                    return Err(last_error("LookupAccountSidW"));
                }

                Ok(from_wide(&name))
            }
        }

        fn user_sid(&self) -> Result<String> {
            let buf = token_user()?;
            // SAFETY: `buf` holds a TOKEN_USER written by GetTokenInformation;
            // the string returned by ConvertSidToStringSidW is freed below.
            unsafe {
                let user = &*(buf.as_ptr() as *const TOKEN_USER);
                let mut wide = ptr::null_mut();
                if ConvertSidToStringSidW(user.User.Sid, &mut wide) == 0 {
                    return Err(last_error("ConvertSidToStringSidW"));
                }

                let mut len = 0;
                while *wide.add(len) != 0 {
                    len += 1;
                }
                let sid = String::from_utf16_lossy(std::slice::from_raw_parts(wide, len));
                LocalFree(wide.cast());
                Ok(sid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_identity_returns_configured_values() {
        let identity = FixedIdentity::new(Some("alice".into()), Some("S-1-5-21-1".into()));
        assert_eq!(identity.user_name().unwrap(), "alice");
        assert_eq!(identity.user_sid().unwrap(), "S-1-5-21-1");
    }

    #[test]
    fn shell_matches_image_name_only() {
        assert!(is_shell_executable("explorer.exe"));
        assert!(is_shell_executable("EXPLORER.EXE"));
        assert!(is_shell_executable(r"C:\Windows\Explorer.exe"));

        assert!(!is_shell_executable("iexplore.exe"));
        assert!(!is_shell_executable("explorer.exe.old"));
        assert!(!is_shell_executable(r"C:\explorer.exe\cmd.exe"));
        assert!(!is_shell_executable(""));
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn desktop_user_resolves_an_account() {
        let user = DesktopUser;
        assert!(user.user_sid().unwrap().starts_with("S-1-"));
        assert!(!user.user_name().unwrap().is_empty());
    }

    #[test]
    fn anonymous_identity_fails() {
        let identity = FixedIdentity::anonymous();
        assert!(matches!(identity.user_sid(), Err(TrustieError::Identity(_))));
        assert!(identity.user_name().is_err());
    }
}
