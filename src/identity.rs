// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Numeric user/group id to name resolution from the account databases.

use crate::environment::Environment;

use std::fs;

use log::debug;

const PASSWD: &str = "/etc/passwd";
const GROUP: &str = "/etc/group";

// Both databases share the `name:password:id:...` layout.
fn find_name(contents: &str, id: u32) -> Option<String> {
    contents
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let mut parts = line.split(':');
            let name = parts.next()?;
            let _password = parts.next()?;
            let entry_id = parts.next()?.parse::<u32>().ok()?;
            (entry_id == id && !name.is_empty()).then(|| name.to_string())
        })
}

/// Account databases of the scanned system, read once per check.
#[derive(Debug, Clone, Default)]
pub struct Accounts {
    passwd: Option<String>,
    group: Option<String>,
}

impl Accounts {
    pub fn new(passwd: Option<String>, group: Option<String>) -> Self {
        Self { passwd, group }
    }

    /// Reads `/etc/passwd` and `/etc/group` as mapped by `env`, so that a
    /// mounted host is resolved against its own databases.
    pub fn load(env: &dyn Environment) -> Self {
        let read = |db: &str| {
            let path = env.normalize_to_host_root(db);
            fs::read_to_string(&path)
                .map_err(|e| debug!("cannot read {path}: {e}"))
                .ok()
        };
        Self::new(read(PASSWD), read(GROUP))
    }

    pub fn lookup_user(&self, uid: u32) -> Option<String> {
        find_name(self.passwd.as_deref()?, uid)
    }

    pub fn lookup_group(&self, gid: u32) -> Option<String> {
        find_name(self.group.as_deref()?, gid)
    }

    /// User name for `uid`, or the numeric id when it cannot be resolved.
    pub fn user_name(&self, uid: u32) -> String {
        self.lookup_user(uid).unwrap_or_else(|| uid.to_string())
    }

    /// Group name for `gid`, or the numeric id when it cannot be resolved.
    pub fn group_name(&self, gid: u32) -> String {
        self.lookup_group(gid).unwrap_or_else(|| gid.to_string())
    }
}
