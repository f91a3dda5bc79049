//! [`KeyTree`] over the Windows Registry.

use std::io;

use winreg::enums::*;
use winreg::types::FromRegValue;
use winreg::RegKey;

use super::{Hive, KeyTree, TreeResult, TreeValue};

/// The native registry, always addressed through the 64-bit view.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryTree;

const VIEW: u32 = KEY_WOW64_64KEY;

fn not_found_as_none<T>(result: io::Result<T>) -> TreeResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl KeyTree for RegistryTree {
    type Key = RegKey;

    fn open_hive(&self, hive: Hive) -> TreeResult<RegKey> {
        let predef = match hive {
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::Users => HKEY_USERS,
        };
        Ok(RegKey::predef(predef))
    }

    fn open_child(&self, parent: &RegKey, name: &str, writable: bool) -> TreeResult<Option<RegKey>> {
        let access = if writable { KEY_READ | KEY_WRITE } else { KEY_READ };
        not_found_as_none(parent.open_subkey_with_flags(name, access | VIEW))
    }

    fn open_or_create_child(&self, parent: &RegKey, name: &str) -> TreeResult<RegKey> {
        let (key, _disposition) =
            parent.create_subkey_with_flags(name, KEY_READ | KEY_WRITE | VIEW)?;
        Ok(key)
    }

    fn delete_child(&self, parent: &RegKey, name: &str) -> TreeResult<()> {
        parent.delete_subkey_with_flags(name, VIEW)?;
        Ok(())
    }

    fn get_value(&self, key: &RegKey, name: &str) -> TreeResult<Option<TreeValue>> {
        let Some(raw) = not_found_as_none(key.get_raw_value(name))? else {
            return Ok(None);
        };

        let value = match raw.vtype {
            REG_DWORD => Some(TreeValue::Dword(u32::from_reg_value(&raw)?)),
            REG_SZ | REG_EXPAND_SZ => Some(TreeValue::String(String::from_reg_value(&raw)?)),
            _ => {
                tracing::debug!("Ignoring registry value {} of type {:?}", name, raw.vtype);
                None
            }
        };

        Ok(value)
    }

    fn set_value(&self, key: &RegKey, name: &str, value: &TreeValue) -> TreeResult<()> {
        match value {
            TreeValue::Dword(v) => key.set_value(name, v)?,
            TreeValue::String(s) => key.set_value(name, s)?,
        }
        Ok(())
    }

    fn delete_value(&self, key: &RegKey, name: &str) -> TreeResult<()> {
        key.delete_value(name)?;
        Ok(())
    }

    fn value_names(&self, key: &RegKey) -> TreeResult<Vec<String>> {
        let names = key
            .enum_values()
            .map(|entry| entry.map(|(name, _)| name))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn child_names(&self, key: &RegKey) -> TreeResult<Vec<String>> {
        let names = key.enum_keys().collect::<io::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn value_count(&self, key: &RegKey) -> TreeResult<usize> {
        Ok(key.query_info()?.values as usize)
    }

    fn child_count(&self, key: &RegKey) -> TreeResult<usize> {
        Ok(key.query_info()?.sub_keys as usize)
    }
}
