use std::fmt;
use std::str::FromStr;

/// Kind of filesystem change reported for a watched path.
///
/// The names follow the usual watcher vocabulary (`add`, `addDir`, `change`,
/// `unlink`, `unlinkDir`) and are what the console output prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    AddDir,
    Change,
    Unlink,
    UnlinkDir,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::AddDir => "addDir",
            ChangeKind::Change => "change",
            ChangeKind::Unlink => "unlink",
            ChangeKind::UnlinkDir => "unlinkDir",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "add" => Ok(ChangeKind::Add),
            "addDir" => Ok(ChangeKind::AddDir),
            "change" => Ok(ChangeKind::Change),
            "unlink" => Ok(ChangeKind::Unlink),
            "unlinkDir" => Ok(ChangeKind::UnlinkDir),
            other => Err(format!(
                "invalid change kind: {other} (expected add, addDir, change, unlink or unlinkDir)"
            )),
        }
    }
}
