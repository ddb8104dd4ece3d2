#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// Translate between user/group names and numeric ids.
///
/// Used by [`crate::FileAttrsBuilder::build`], never while decoding.
pub trait IdResolver {
    fn uid_of(&self, owner: &str) -> Option<u32>;

    fn gid_of(&self, group: &str) -> Option<u32>;

    fn owner_of(&self, uid: u32) -> Option<Box<str>>;

    fn group_of(&self, gid: u32) -> Option<Box<str>>;
}

/// Resolves nothing.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoopResolver;

impl IdResolver for NoopResolver {
    fn uid_of(&self, _owner: &str) -> Option<u32> {
        None
    }

    fn gid_of(&self, _group: &str) -> Option<u32> {
        None
    }

    fn owner_of(&self, _uid: u32) -> Option<Box<str>> {
        None
    }

    fn group_of(&self, _gid: u32) -> Option<Box<str>> {
        None
    }
}

#[derive(Debug, Clone, Default)]
struct Table {
    by_name: HashMap<Box<str>, u32>,
    by_id: HashMap<u32, Box<str>>,
}

impl Table {
    /// Parse `name:password:id:...` lines, as found in both `passwd(5)`
    /// and `group(5)`.
    ///
    /// Comments, blank and malformed lines are skipped. For duplicated
    /// entries the first one wins, like `getpwnam(3)`.
    fn parse(contents: &str) -> Self {
        let mut table = Self::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split(':');
            let (Some(name), Some(_password), Some(id)) = (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            let Ok(id) = id.parse::<u32>() else {
                continue;
            };

            table.by_name.entry(name.into()).or_insert(id);
            table.by_id.entry(id).or_insert_with(|| name.into());
        }

        table
    }
}

/// Resolves names with the local user and group databases.
#[derive(Debug, Clone, Default)]
pub struct SystemIdResolver {
    users: Table,
    groups: Table,
}

impl SystemIdResolver {
    /// Load `/etc/passwd` and `/etc/group`.
    pub fn load() -> Result<Self, io::Error> {
        Self::from_paths("/etc/passwd", "/etc/group")
    }

    pub fn from_paths(
        passwd: impl AsRef<Path>,
        group: impl AsRef<Path>,
    ) -> Result<Self, io::Error> {
        Ok(Self::from_contents(
            &fs::read_to_string(passwd)?,
            &fs::read_to_string(group)?,
        ))
    }

    pub fn from_contents(passwd: &str, group: &str) -> Self {
        Self {
            users: Table::parse(passwd),
            groups: Table::parse(group),
        }
    }
}

impl IdResolver for SystemIdResolver {
    fn uid_of(&self, owner: &str) -> Option<u32> {
        self.users.by_name.get(owner).copied()
    }

    fn gid_of(&self, group: &str) -> Option<u32> {
        self.groups.by_name.get(group).copied()
    }

    fn owner_of(&self, uid: u32) -> Option<Box<str>> {
        self.users.by_id.get(&uid).cloned()
    }

    fn group_of(&self, gid: u32) -> Option<Box<str>> {
        self.groups.by_id.get(&gid).cloned()
    }
}
